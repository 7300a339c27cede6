use std::str::FromStr;

use klima::{
    annotation, bin_bands, percentile_rank_band, summarize_last, BaselineSpec, Language, Series,
    SeriesFile, TemperatureUnit, KELVIN_OFFSET,
};
use miette::{bail, miette, IntoDiagnostic};

fn main() -> miette::Result<()> {
    let input = std::env::args().nth(1).expect("Missing observation file");
    let basepath = std::env::args().nth(2).expect("Missing baseline path");
    let language: Language = std::env::args()
        .nth(3)
        .as_deref()
        .unwrap_or("en")
        .parse()
        .map_err(|e| miette!("{e}"))?;

    let spec = BaselineSpec {
        basepath: basepath.into(),
        dataset: "era5".into(),
        resolution: "native".into(),
        variable: "tasmax".into(),
        window: 1,
        start_year: 1940,
        end_year: 2023,
    };
    let mut baseline = spec.load()?;

    println!("opening {input}");
    let text = std::fs::read_to_string(&input).into_diagnostic()?;
    let file = SeriesFile::from_str(&text)?;
    let Series::Calendar(mut series) = file.series else {
        bail!("expected a time-indexed observation file");
    };

    // Kelvin sources are shifted together with the baseline, the
    // first-value heuristic decides when no unit is declared.
    let kelvin = match file.unit {
        Some(unit) => unit == TemperatureUnit::Kelvin,
        None => series.looks_like_kelvin(),
    };
    if kelvin {
        series.shift(-KELVIN_OFFSET);
        baseline.shift(-KELVIN_OFFSET);
    }

    let year = series.single_year()?;
    let summary = summarize_last(&series, &baseline)?;
    println!(
        "{year}, day {} of the year: {:.1}°C",
        summary.date.ordinal(),
        summary.value
    );
    println!("{}", annotation(&summary, language).replace('\n', "  "));
    println!(
        "percentile band: [{:.1}, {:.1})",
        summary.band.lower, summary.band.upper
    );

    let observations = Series::Calendar(series).into_day_of_year(true);
    let bands = percentile_rank_band(&observations, &baseline.percentiles)?;
    let histogram = bin_bands(&bands);
    println!("\n{} percentile classes over {} days:", spec.period(), histogram.total());
    for (band, frequency) in histogram.frequencies() {
        println!(
            "  [{:>6.1}, {:>6.1}): {:>5.1}%{}",
            band.lower,
            band.upper,
            frequency,
            if band.is_extreme() { "  (outside the tracked range)" } else { "" }
        );
    }

    Ok(())
}
