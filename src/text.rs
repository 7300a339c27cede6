use std::str::FromStr;

use time::Month;

use crate::baseline::BaselineSpec;
use crate::stats::{DaySummary, Histogram};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    German,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::English),
            "de" => Ok(Self::German),
            s => Err(format!("Unknown language {s}. Expecting `en` or `de`")),
        }
    }
}

pub fn month_abbrev(month: Month, language: Language) -> &'static str {
    if language == Language::German {
        match month {
            Month::May => return "Mai",
            Month::October => return "Okt",
            Month::December => return "Dez",
            _ => (),
        }
    }
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

/// Annotation block next to the last observation: date, anomaly in degrees
/// and anomaly in standard deviations.
pub fn annotation(summary: &DaySummary, language: Language) -> String {
    format!(
        "{:02}. {}\n{:+.1}°C\n{:+.1} SD",
        summary.date.day(),
        month_abbrev(summary.date.month(), language),
        summary.anomaly,
        summary.std_anomaly,
    )
}

/// Post caption for the time-series figure.
pub fn caption(
    location: &str,
    summary: &DaySummary,
    spec: &BaselineSpec,
    language: Language,
) -> String {
    let day = summary.date.day();
    let month = month_abbrev(summary.date.month(), language);
    let note = extreme_note(summary, language);
    match language {
        Language::English => format!(
            "{location}, {day:02}. {month}: daily maximum temperature {:+.1}°C ({:+.1} SD) relative to the {} average{note}",
            summary.anomaly,
            summary.std_anomaly,
            spec.period(),
        ),
        Language::German => format!(
            "{location}, {day:02}. {month}: Tagesmaximumtemperatur {:+.1}°C ({:+.1} SD) relativ zum Mittel {}{note}",
            summary.anomaly,
            summary.std_anomaly,
            spec.period(),
        ),
    }
}

fn extreme_note(summary: &DaySummary, language: Language) -> &'static str {
    if summary.band.is_new_high() {
        match language {
            Language::English => ", a new record high for this day",
            Language::German => ", ein neuer Tagesrekord",
        }
    } else if summary.band.is_new_low() {
        match language {
            Language::English => ", a new record low for this day",
            Language::German => ", ein neuer Tagestiefstrekord",
        }
    } else {
        ""
    }
}

/// Screen-reader description of the time-series figure.
pub fn alt_text_timeseries(location: &str, spec: &BaselineSpec, language: Language) -> String {
    match language {
        Language::English => format!(
            "Daily maximum temperature in {location} against the {} climatology: percentile range, mean and the current year.",
            spec.period(),
        ),
        Language::German => format!(
            "Tagesmaximumtemperatur in {location} im Vergleich zur Klimatologie {}: Perzentilbereich, Mittel und das laufende Jahr.",
            spec.period(),
        ),
    }
}

/// Screen-reader description of the histogram figure.
pub fn alt_text_histogram(
    location: &str,
    histogram: &Histogram,
    spec: &BaselineSpec,
    language: Language,
) -> String {
    let extremes: usize = histogram
        .bins
        .iter()
        .filter(|(band, _)| band.is_extreme())
        .map(|&(_, count)| count)
        .sum();
    match language {
        Language::English => format!(
            "Histogram of daily percentile classes in {location} relative to {}. {extremes} of {} days fall outside the tracked percentile range.",
            spec.period(),
            histogram.total(),
        ),
        Language::German => format!(
            "Histogramm der täglichen Perzentilklassen in {location} relativ zu {}. {extremes} von {} Tagen liegen außerhalb des erfassten Perzentilbereichs.",
            spec.period(),
            histogram.total(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Band, ABOVE_RANGE};
    use std::path::PathBuf;
    use time::Date;

    fn spec() -> BaselineSpec {
        BaselineSpec {
            basepath: PathBuf::from("."),
            dataset: "era5".into(),
            resolution: "native".into(),
            variable: "tasmax".into(),
            window: 1,
            start_year: 1940,
            end_year: 2023,
        }
    }

    fn summary() -> DaySummary {
        DaySummary {
            date: Date::from_calendar_date(2025, Month::May, 5).unwrap(),
            value: 18.0,
            anomaly: 1.53,
            std_anomaly: 0.84,
            band: Band::new(25.0, ABOVE_RANGE),
        }
    }

    #[test]
    fn language_from_str() {
        assert_eq!("en".parse(), Ok(Language::English));
        assert_eq!("de".parse(), Ok(Language::German));
        assert!("dt".parse::<Language>().is_err());
    }

    #[test]
    fn month_abbrevs_differ_by_language() {
        assert_eq!(month_abbrev(Month::May, Language::English), "May");
        assert_eq!(month_abbrev(Month::May, Language::German), "Mai");
        assert_eq!(month_abbrev(Month::January, Language::German), "Jan");
    }

    #[test]
    fn annotation_carries_signed_anomalies() {
        let text = annotation(&summary(), Language::English);
        assert_eq!(text, "05. May\n+1.5°C\n+0.8 SD");
    }

    #[test]
    fn caption_names_the_reference_period() {
        let text = caption("Hamburg", &summary(), &spec(), Language::English);
        assert!(text.contains("1940-2023"));
        assert!(text.contains("a new record high"));

        let text = caption("Hamburg", &summary(), &spec(), Language::German);
        assert!(text.contains("05. Mai"));
    }

    #[test]
    fn histogram_alt_text_counts_extremes() {
        let histogram = Histogram {
            bins: vec![
                (Band::new(10.0, 20.0), 3),
                (Band::new(90.0, ABOVE_RANGE), 2),
            ],
        };
        let text = alt_text_histogram("Hamburg", &histogram, &spec(), Language::English);
        assert!(text.contains("2 of 5 days"));
    }
}
