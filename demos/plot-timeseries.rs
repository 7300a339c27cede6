use std::str::FromStr;

use klima::{
    annotation, summarize_last, BaselineSpec, Language, Series, SeriesFile, TemperatureUnit,
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
    let summary = summarize_last(&series, &baseline).unwrap();
    let observations = Series::Calendar(series).into_day_of_year(true);

    let date = format!(
        "{}-{:02}-{:02}",
        summary.date.year(),
        u8::from(summary.date.month()),
        summary.date.day()
    );
    let dir = format!("figures/{location}/{year}/b{}_w{}", spec.period(), spec.window);
    std::fs::create_dir_all(&dir).unwrap();
    let output = format!(
        "{dir}/timeseries_b{}_w{}_{location}_{date}.png",
        spec.period(),
        spec.window
    );

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for (_, thresholds) in baseline.percentiles.days() {
        low = low.min(thresholds[0]);
        high = high.max(*thresholds.last().unwrap());
    }
    for value in observations.values() {
        low = low.min(value);
        high = high.max(value);
    }

    let root = BitMapBackend::new(&output, (1440, 720)).into_drawing_area();
    root.fill(&WHITE).unwrap();
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{year} {location} daily maximum temperature"),
            ("sans-serif", 40).into_font(),
        )
        .margin(5)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(1.0..365.0, (low - 2.0)..(high + 2.0))
        .unwrap();

    chart
        .configure_mesh()
        .x_desc("Day of year")
        .y_desc("Temperature (°C)")
        .draw()
        .unwrap();

    // percentile fan, outermost pair first
    let pairs = [
        (0.0, 100.0, "Min-Max"),
        (10.0, 90.0, "80%"),
        (30.0, 70.0, "40%"),
    ];
    for (low_rank, high_rank, label) in pairs {
        let (Some(lower), Some(upper)) = (
            baseline.percentiles.rank_curve(low_rank),
            baseline.percentiles.rank_curve(high_rank),
        ) else {
            continue;
        };
        let mut polygon: Vec<(f64, f64)> = upper
            .points
            .iter()
            .map(|&(doy, value)| (doy as f64, value))
            .collect();
        polygon.extend(lower.points.iter().rev().map(|&(doy, value)| (doy as f64, value)));
        chart
            .draw_series(std::iter::once(Polygon::new(polygon, BLACK.mix(0.1))))
            .unwrap()
            .label(label)
            .legend(|(x, y)| {
                Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLACK.mix(0.2).filled())
            });
    }

    chart
        .draw_series(LineSeries::new(
            baseline
                .mean
                .points
                .iter()
                .map(|&(doy, value)| (doy as f64, value)),
            BLACK,
        ))
        .unwrap()
        .label("Mean")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    let darkred = RGBColor(139, 0, 0);
    chart
        .draw_series(LineSeries::new(
            observations
                .points
                .iter()
                .map(|&(doy, value)| (doy as f64, value)),
            darkred,
        ))
        .unwrap()
        .label(format!("{year}"))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], darkred));

    // highlight the most recent day and connect it to the mean
    let last_doy = summary.date.ordinal() as f64;
    let mean_last = baseline.mean.get(summary.date.ordinal()).unwrap();
    chart
        .draw_series(std::iter::once(Circle::new(
            (last_doy, summary.value),
            4,
            darkred.filled(),
        )))
        .unwrap();
    chart
        .draw_series(LineSeries::new(
            vec![(last_doy, summary.value), (last_doy, mean_last)],
            darkred.stroke_width(1),
        ))
        .unwrap();

    let text_x = (last_doy + 5.0).min(340.0);
    let text_y = summary.value - summary.anomaly / 2.0;
    chart
        .draw_series(std::iter::once(Text::new(
            annotation(&summary, Language::English).replace('\n', "  "),
            (text_x, text_y),
            ("sans-serif", 18).into_font().color(&darkred),
        )))
        .unwrap();

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .unwrap();

    root.present().unwrap();
    println!("Wrote {output}");
}
