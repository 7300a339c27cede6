//! The statistical core: percentile-exceedance bands, their histogram and
//! the anomaly series derived from a day-of-year baseline.

use miette::Diagnostic;
use thiserror::Error;
use time::Date;

use crate::baseline::{Baseline, PercentileTable};
use crate::series::{CalendarSeries, DoySeries, SelectionError};

/// Stands in for the lower bound when an observation falls below every
/// tracked threshold: a new cold record.
pub const BELOW_RANGE: f64 = -999.0;
/// Stands in for the upper bound when an observation exceeds every tracked
/// threshold: a new heat record.
pub const ABOVE_RANGE: f64 = 999.0;

// Ties at the historical minimum count as "at or above the minimum", never
// as a new cold extreme, so the lowest threshold is compared slightly
// lowered.
const MIN_THRESHOLD_EPSILON: f64 = 1e-5;

/// The pair of adjacent percentile thresholds (or ranks) bracketing one
/// observation within its day-of-year distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Below every tracked threshold.
    pub fn is_new_low(&self) -> bool {
        self.lower == BELOW_RANGE
    }

    /// Above every tracked threshold.
    pub fn is_new_high(&self) -> bool {
        self.upper == ABOVE_RANGE
    }

    pub fn is_extreme(&self) -> bool {
        self.is_new_low() || self.is_new_high()
    }

    /// Width of the band, `None` when either side is a sentinel.
    pub fn width(&self) -> Option<f64> {
        (!self.is_extreme()).then(|| self.upper - self.lower)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum StatsError {
    #[error("day of year {0} is missing from the baseline")]
    #[diagnostic(code(klima::missing_baseline_day))]
    MissingBaselineDay(u16),
    #[error("expected a single bin width, found {0:?}")]
    #[diagnostic(code(klima::inconsistent_bin_width))]
    InconsistentBinWidth(Vec<f64>),
}

// How many thresholds the value strictly exceeds. Equality does not count,
// except at the lowered minimum.
fn exceedance_count(thresholds: &[f64], value: f64) -> usize {
    thresholds
        .iter()
        .enumerate()
        .filter(|&(idx, &threshold)| {
            let threshold = if idx == 0 {
                threshold - MIN_THRESHOLD_EPSILON
            } else {
                threshold
            };
            value > threshold
        })
        .count()
}

fn bands_with(
    observations: &DoySeries,
    percentiles: &PercentileTable,
    bound: impl Fn(&[f64], usize) -> f64,
) -> Result<Vec<Band>, StatsError> {
    observations
        .points
        .iter()
        .map(|&(doy, value)| {
            let thresholds = percentiles
                .thresholds(doy)
                .ok_or(StatsError::MissingBaselineDay(doy))?;
            let count = exceedance_count(thresholds, value);
            Ok(Band {
                lower: if count > 0 {
                    bound(thresholds, count - 1)
                } else {
                    BELOW_RANGE
                },
                upper: if count < thresholds.len() {
                    bound(thresholds, count)
                } else {
                    ABOVE_RANGE
                },
            })
        })
        .collect()
}

/// The adjacent percentile thresholds bracketing each observation, one band
/// per observation in input order.
pub fn percentile_band(
    observations: &DoySeries,
    percentiles: &PercentileTable,
) -> Result<Vec<Band>, StatsError> {
    bands_with(observations, percentiles, |thresholds, idx| thresholds[idx])
}

/// Like [`percentile_band`], but the bounds are percentile ranks instead of
/// threshold values. Rank bands fall into equally wide classes when the
/// tracked ranks are equally spaced, which is what the histogram expects.
pub fn percentile_rank_band(
    observations: &DoySeries,
    percentiles: &PercentileTable,
) -> Result<Vec<Band>, StatsError> {
    let ranks = percentiles.ranks().to_vec();
    bands_with(observations, percentiles, |_, idx| ranks[idx])
}

/// Exceedance-band histogram: the distinct bands of a series with their
/// occurrence counts, ordered ascending by lower bound. The -999 sentinel
/// sorts below every real bound and 999 above.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    pub bins: Vec<(Band, usize)>,
}

pub fn bin_bands(bands: &[Band]) -> Histogram {
    let mut sorted = bands.to_vec();
    sorted.sort_by(|left, right| {
        left.lower
            .total_cmp(&right.lower)
            .then(left.upper.total_cmp(&right.upper))
    });

    let mut bins: Vec<(Band, usize)> = Vec::new();
    for band in sorted {
        match bins.last_mut() {
            Some((last, count)) if *last == band => *count += 1,
            _ => bins.push((band, 1)),
        }
    }
    Histogram { bins }
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|&(_, count)| count).sum()
    }

    /// Share of observations per bin, in percent.
    pub fn frequencies(&self) -> Vec<(Band, f64)> {
        let total = self.total();
        self.bins
            .iter()
            .map(|&(band, count)| (band, count as f64 / total as f64 * 100.0))
            .collect()
    }

    /// The single width shared by all interior bins. Zero-width bins (two
    /// identical thresholds) are trivial and ignored. Zero or several
    /// distinct widths point at an inconsistently constructed percentile
    /// table.
    pub fn uniform_width(&self) -> Result<f64, StatsError> {
        let mut widths: Vec<f64> = self
            .bins
            .iter()
            .filter_map(|&(band, _)| band.width())
            .filter(|&width| width > 0.0)
            .collect();
        widths.sort_by(f64::total_cmp);
        widths.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        if widths.len() == 1 {
            Ok(widths[0])
        } else {
            Err(StatsError::InconsistentBinWidth(widths))
        }
    }
}

/// Elementwise observation minus baseline mean, aligned by day of year.
pub fn difference_to_mean(
    observations: &DoySeries,
    mean: &DoySeries,
) -> Result<DoySeries, StatsError> {
    aligned(observations, mean, |value, mean| value - mean)
}

/// Anomaly in units of the baseline standard deviation. A zero standard
/// deviation is not guarded: the quotient follows IEEE-754 and comes back
/// infinite, or NaN for a zero anomaly.
pub fn standardized_anomaly(
    observations: &DoySeries,
    mean: &DoySeries,
    std: &DoySeries,
) -> Result<DoySeries, StatsError> {
    let diff = difference_to_mean(observations, mean)?;
    aligned(&diff, std, |anomaly, std| anomaly / std)
}

fn aligned(
    left: &DoySeries,
    right: &DoySeries,
    op: impl Fn(f64, f64) -> f64,
) -> Result<DoySeries, StatsError> {
    let points = left
        .points
        .iter()
        .map(|&(doy, value)| {
            let reference = right.get(doy).ok_or(StatsError::MissingBaselineDay(doy))?;
            Ok((doy, op(value, reference)))
        })
        .collect::<Result<Vec<(u16, f64)>, StatsError>>()?;
    Ok(DoySeries::new(points))
}

/// Everything the figures need about one observation series.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub difference_to_mean: DoySeries,
    pub standardized_anomaly: DoySeries,
    pub percentile_band: Vec<Band>,
}

pub fn statistics(observations: &DoySeries, baseline: &Baseline) -> Result<Statistics, StatsError> {
    Ok(Statistics {
        difference_to_mean: difference_to_mean(observations, &baseline.mean)?,
        standardized_anomaly: standardized_anomaly(observations, &baseline.mean, &baseline.std)?,
        percentile_band: percentile_band(observations, &baseline.percentiles)?,
    })
}

/// The last observed day, condensed for annotations and post captions.
#[derive(Debug, Clone)]
pub struct DaySummary {
    pub date: Date,
    pub value: f64,
    pub anomaly: f64,
    pub std_anomaly: f64,
    pub band: Band,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SummaryError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Summarize the most recent observation against the baseline. The leap
/// day (ordinal 366) has no baseline entry and is skipped, matching the
/// day-of-year normalization.
pub fn summarize_last(
    observations: &CalendarSeries,
    baseline: &Baseline,
) -> Result<DaySummary, SummaryError> {
    let (date, value) = observations
        .points
        .iter()
        .rev()
        .find(|(date, _)| date.ordinal() != 366)
        .copied()
        .ok_or(SelectionError::EmptySelection)?;
    let doy = date.ordinal();

    let mean = baseline
        .mean
        .get(doy)
        .ok_or(StatsError::MissingBaselineDay(doy))?;
    let std = baseline
        .std
        .get(doy)
        .ok_or(StatsError::MissingBaselineDay(doy))?;
    let thresholds = baseline
        .percentiles
        .thresholds(doy)
        .ok_or(StatsError::MissingBaselineDay(doy))?;

    let count = exceedance_count(thresholds, value);
    let band = Band {
        lower: if count > 0 {
            thresholds[count - 1]
        } else {
            BELOW_RANGE
        },
        upper: if count < thresholds.len() {
            thresholds[count]
        } else {
            ABOVE_RANGE
        },
    };
    let anomaly = value - mean;

    Ok(DaySummary {
        date,
        value,
        anomaly,
        std_anomaly: anomaly / std,
        band,
    })
}
