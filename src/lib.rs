//! Daily temperature anomalies relative to a multi-decade climatology.
//!
//! An observation year is compared against day-of-year baseline statistics
//! (mean, standard deviation, percentile thresholds) to classify every day
//! into its percentile band. The bands feed the time-series and histogram
//! figures, the derived anomalies feed the annotations and post captions.

pub mod baseline;
pub mod parse;
pub mod series;
pub mod stats;
pub mod text;

pub use baseline::{Baseline, BaselineError, BaselineSpec, LoadError, PercentileTable};
pub use parse::{ParseError, SeriesFile};
pub use series::{
    CalendarSeries, DoySeries, SelectionError, Series, TemperatureUnit, KELVIN_OFFSET,
};
pub use stats::{
    bin_bands, difference_to_mean, percentile_band, percentile_rank_band, standardized_anomaly,
    statistics, summarize_last, Band, DaySummary, Histogram, Statistics, StatsError, SummaryError,
    ABOVE_RANGE, BELOW_RANGE,
};
pub use text::{
    alt_text_histogram, alt_text_timeseries, annotation, caption, month_abbrev, Language,
};
