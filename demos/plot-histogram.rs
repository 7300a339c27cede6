use std::str::FromStr;

use klima::{
    bin_bands, percentile_rank_band, BaselineSpec, Series, SeriesFile, TemperatureUnit,
    KELVIN_OFFSET,
};
use plotters::prelude::*;

fn main() {
    let input = std::env::args().nth(1).expect("Missing observation file");
    let basepath = std::env::args().nth(2).expect("Missing baseline path");
    let location = std::env::args().nth(3).unwrap_or_else(|| String::from("Hamburg"));

    let spec = BaselineSpec {
        basepath: basepath.into(),
        dataset: "era5".into(),
        resolution: "native".into(),
        variable: "tasmax".into(),
        window: 1,
        start_year: 1940,
        end_year: 2023,
    };
    let mut baseline = spec.load().unwrap();

    println!("opening {input}");
    let text = std::fs::read_to_string(&input).unwrap();
    let file = SeriesFile::from_str(&text).unwrap();
    let Series::Calendar(mut series) = file.series else {
        panic!("expected a time-indexed observation file");
    };

    let kelvin = match file.unit {
        Some(unit) => unit == TemperatureUnit::Kelvin,
        None => series.looks_like_kelvin(),
    };
    if kelvin {
        series.shift(-KELVIN_OFFSET);
        baseline.shift(-KELVIN_OFFSET);
    }

    let year = series.single_year().unwrap();
    let observations = Series::Calendar(series).into_day_of_year(true);

    let bands = percentile_rank_band(&observations, &baseline.percentiles).unwrap();
    let histogram = bin_bands(&bands);
    let width = histogram.uniform_width().unwrap();
    let frequencies = histogram.frequencies();
    let top = frequencies
        .iter()
        .map(|&(_, frequency)| frequency)
        .fold(0.0f64, f64::max);

    let dir = format!("figures/{location}/{year}/b{}_w{}", spec.period(), spec.window);
    std::fs::create_dir_all(&dir).unwrap();
    let output = format!(
        "{dir}/histogram_b{}_w{}_{location}_{year}.png",
        spec.period(),
        spec.window
    );

    let root = BitMapBackend::new(&output, (1440, 720)).into_drawing_area();
    root.fill(&WHITE).unwrap();
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{year} {location} daily percentile classes"),
            ("sans-serif", 40).into_font(),
        )
        .margin(5)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(-5.0..105.0, 0.0..(top + 5.0))
        .unwrap();

    chart
        .configure_mesh()
        .x_desc(format!("{} percentile", spec.period()))
        .y_desc("Frequency (%)")
        .draw()
        .unwrap();

    let darkred = RGBColor(139, 0, 0);

    chart
        .draw_series(
            frequencies
                .iter()
                .filter(|(band, _)| !band.is_extreme())
                .map(|&(band, frequency)| {
                    Rectangle::new(
                        [(band.lower, 0.0), (band.lower + width, frequency)],
                        darkred.filled(),
                    )
                }),
        )
        .unwrap();

    // new records have no interior bin, mark them just outside the range
    for &(band, frequency) in frequencies.iter().filter(|(band, _)| band.is_extreme()) {
        let x = if band.is_new_low() { -2.5 } else { 102.5 };
        chart
            .draw_series(std::iter::once(TriangleMarker::new(
                (x, frequency),
                7,
                darkred.filled(),
            )))
            .unwrap();
    }

    // frequency each interior class would have in the reference period
    let classes = baseline.percentiles.ranks().len() - 1;
    if classes > 0 {
        let expected = 100.0 / classes as f64;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(0.0, expected), (100.0, expected)],
                BLACK,
            )))
            .unwrap();
    }

    root.present().unwrap();
    println!("Wrote {output}");
}
