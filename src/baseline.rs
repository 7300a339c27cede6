//! Day-of-year climatological baseline: mean, standard deviation and
//! percentile thresholds over a multi-decade reference period.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::parse::{ParseError, SeriesFile};
use crate::series::{DoySeries, KELVIN_OFFSET};

#[derive(Debug, Error, Diagnostic)]
pub enum BaselineError {
    #[error("at least one percentile rank is required")]
    EmptyRanks,
    #[error("percentile ranks must be strictly increasing")]
    UnorderedRanks,
    #[error("percentile ranks must lie in 0..=100, found {0}")]
    RankOutOfRange(f64),
    #[error("expected {expected} thresholds on day {doy}, found {found}")]
    RowLengthMismatch {
        doy: u16,
        expected: usize,
        found: usize,
    },
    #[error("thresholds on day {doy} are not ascending")]
    UnorderedThresholds { doy: u16 },
}

/// Percentile thresholds per day of year. All days share one ascending rank
/// vector and carry one threshold per rank.
#[derive(Debug, Clone)]
pub struct PercentileTable {
    ranks: Vec<f64>,
    days: BTreeMap<u16, Vec<f64>>,
}

impl PercentileTable {
    pub fn new(ranks: Vec<f64>, days: BTreeMap<u16, Vec<f64>>) -> Result<Self, BaselineError> {
        if ranks.is_empty() {
            return Err(BaselineError::EmptyRanks);
        }
        if ranks.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(BaselineError::UnorderedRanks);
        }
        if let Some(&rank) = ranks.iter().find(|rank| !(0.0..=100.0).contains(*rank)) {
            return Err(BaselineError::RankOutOfRange(rank));
        }
        for (&doy, thresholds) in &days {
            if thresholds.len() != ranks.len() {
                return Err(BaselineError::RowLengthMismatch {
                    doy,
                    expected: ranks.len(),
                    found: thresholds.len(),
                });
            }
            if thresholds.windows(2).any(|pair| pair[1] < pair[0]) {
                return Err(BaselineError::UnorderedThresholds { doy });
            }
        }
        Ok(Self { ranks, days })
    }

    pub fn ranks(&self) -> &[f64] {
        &self.ranks
    }

    pub fn thresholds(&self, doy: u16) -> Option<&[f64]> {
        self.days.get(&doy).map(Vec::as_slice)
    }

    pub fn days(&self) -> impl Iterator<Item = (u16, &[f64])> + '_ {
        self.days
            .iter()
            .map(|(&doy, thresholds)| (doy, thresholds.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Threshold curve of a single rank across all days, for the fan plot.
    pub fn rank_curve(&self, rank: f64) -> Option<DoySeries> {
        let idx = self.ranks.iter().position(|&r| r == rank)?;
        Some(DoySeries::new(
            self.days
                .iter()
                .map(|(&doy, thresholds)| (doy, thresholds[idx]))
                .collect(),
        ))
    }

    pub fn shift(&mut self, offset: f64) {
        for thresholds in self.days.values_mut() {
            for threshold in thresholds {
                *threshold += offset;
            }
        }
    }
}

/// The baseline statistics an observation series is evaluated against. All
/// three parts cover the same day-of-year keys.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub mean: DoySeries,
    pub std: DoySeries,
    pub percentiles: PercentileTable,
}

impl Baseline {
    /// Shift the mean and the percentile thresholds by a constant offset.
    /// The standard deviation is invariant under a constant offset and
    /// stays untouched.
    pub fn shift(&mut self, offset: f64) {
        self.mean.shift(offset);
        self.percentiles.shift(offset);
    }

    pub fn kelvin_to_celsius(&mut self) {
        self.shift(-KELVIN_OFFSET);
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Where a baseline lives on disk and how its metric files are named.
#[derive(Debug, Clone)]
pub struct BaselineSpec {
    pub basepath: PathBuf,
    pub dataset: String,
    pub resolution: String,
    pub variable: String,
    pub window: u32,
    pub start_year: i32,
    pub end_year: i32,
}

impl BaselineSpec {
    /// Directory holding the metric files of this baseline.
    pub fn dir(&self) -> PathBuf {
        self.basepath.join(format!(
            "base_distributions/{}_{}_b{}-{}_w{}",
            self.dataset, self.resolution, self.start_year, self.end_year, self.window
        ))
    }

    pub fn metric_path(&self, metric: &str) -> PathBuf {
        self.dir().join(format!(
            "{}_day_{}_b{}-{}_w{}_{}.txt",
            self.variable, self.dataset, self.start_year, self.end_year, self.window, metric
        ))
    }

    /// Short label of the reference period for legends and captions.
    pub fn period(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year)
    }

    pub fn load(&self) -> Result<Baseline, LoadError> {
        let mean = self.load_series("ydrunmean")?;
        let std = self.load_series("std")?;
        let path = self.metric_path("percentiles");
        let percentiles: PercentileTable = read(&path)?
            .parse()
            .map_err(|source| LoadError::Parse { path, source })?;
        Ok(Baseline {
            mean,
            std,
            percentiles,
        })
    }

    fn load_series(&self, metric: &str) -> Result<DoySeries, LoadError> {
        let path = self.metric_path(metric);
        let file: SeriesFile = read(&path)?
            .parse()
            .map_err(|source| LoadError::Parse { path, source })?;
        Ok(file.series.into_day_of_year(true))
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PercentileTable {
        let mut days = BTreeMap::new();
        days.insert(1, vec![5.0, 15.0, 25.0]);
        days.insert(2, vec![6.0, 16.0, 26.0]);
        PercentileTable::new(vec![10.0, 50.0, 90.0], days).unwrap()
    }

    #[test]
    fn ranks_must_increase() {
        assert!(matches!(
            PercentileTable::new(vec![], BTreeMap::new()),
            Err(BaselineError::EmptyRanks)
        ));
        assert!(matches!(
            PercentileTable::new(vec![50.0, 50.0], BTreeMap::new()),
            Err(BaselineError::UnorderedRanks)
        ));
        assert!(matches!(
            PercentileTable::new(vec![-1.0, 50.0], BTreeMap::new()),
            Err(BaselineError::RankOutOfRange(_))
        ));
    }

    #[test]
    fn threshold_rows_must_match_the_ranks() {
        let mut days = BTreeMap::new();
        days.insert(7, vec![1.0, 2.0]);
        assert!(matches!(
            PercentileTable::new(vec![10.0, 50.0, 90.0], days),
            Err(BaselineError::RowLengthMismatch { doy: 7, expected: 3, found: 2 })
        ));

        let mut days = BTreeMap::new();
        days.insert(7, vec![2.0, 1.0, 3.0]);
        assert!(matches!(
            PercentileTable::new(vec![10.0, 50.0, 90.0], days),
            Err(BaselineError::UnorderedThresholds { doy: 7 })
        ));
    }

    #[test]
    fn rank_curve_extracts_one_rank() {
        let curve = table().rank_curve(50.0).unwrap();
        assert_eq!(curve.points, vec![(1, 15.0), (2, 16.0)]);
        assert!(table().rank_curve(42.0).is_none());
    }

    #[test]
    fn shift_leaves_std_untouched() {
        let mut baseline = Baseline {
            mean: DoySeries::new(vec![(1, 276.55)]),
            std: DoySeries::new(vec![(1, 3.1)]),
            percentiles: table(),
        };
        baseline.shift(-KELVIN_OFFSET);
        assert!((baseline.mean.get(1).unwrap() - 3.4).abs() < 1e-9);
        assert!((baseline.std.get(1).unwrap() - 3.1).abs() < 1e-9);
        assert!((baseline.percentiles.thresholds(1).unwrap()[0] - (5.0 - KELVIN_OFFSET)).abs() < 1e-9);
    }

    #[test]
    fn metric_paths_follow_the_naming_scheme() {
        let spec = BaselineSpec {
            basepath: PathBuf::from("/work/klima"),
            dataset: "era5".into(),
            resolution: "native".into(),
            variable: "tasmax".into(),
            window: 1,
            start_year: 1940,
            end_year: 2023,
        };
        assert_eq!(
            spec.metric_path("std"),
            PathBuf::from(
                "/work/klima/base_distributions/era5_native_b1940-2023_w1/tasmax_day_era5_b1940-2023_w1_std.txt"
            )
        );
        assert_eq!(spec.period(), "1940-2023");
    }
}
