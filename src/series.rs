use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;
use time::Date;

/// Offset between Kelvin and degree Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Kelvin,
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ºC" | "degC" | "celsius" => Ok(Self::Celsius),
            "K" | "kelvin" => Ok(Self::Kelvin),
            s => Err(format!(
                "Unknown temperature unit {s}. Expecting `degC` or `K`"
            )),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum SelectionError {
    #[error("no time steps selected")]
    #[diagnostic(code(klima::empty_selection))]
    EmptySelection,
    #[error("more than one year of data: {0:?}")]
    MultipleYears(Vec<i32>),
}

/// A daily series indexed by calendar date, for one location and variable.
#[derive(Debug, Clone, Default)]
pub struct CalendarSeries {
    // Points should be sorted by date
    pub points: Vec<(Date, f64)>,
}

impl CalendarSeries {
    pub fn new(points: Vec<(Date, f64)>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<(Date, f64)> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<(Date, f64)> {
        self.points.last().copied()
    }

    /// Distinct years covered, in order of first appearance.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = Vec::new();
        for (date, _) in &self.points {
            if !years.contains(&date.year()) {
                years.push(date.year());
            }
        }
        years
    }

    /// The single year this series covers.
    pub fn single_year(&self) -> Result<i32, SelectionError> {
        let years = self.years();
        if years.len() > 1 {
            return Err(SelectionError::MultipleYears(years));
        }
        years.first().copied().ok_or(SelectionError::EmptySelection)
    }

    pub fn select_year(&self, year: i32) -> Result<CalendarSeries, SelectionError> {
        let points: Vec<_> = self
            .points
            .iter()
            .copied()
            .filter(|(date, _)| date.year() == year)
            .collect();
        if points.is_empty() {
            return Err(SelectionError::EmptySelection);
        }
        Ok(CalendarSeries { points })
    }

    /// Keep only the points up to and including `end`.
    pub fn truncate_after(&self, end: Date) -> Result<CalendarSeries, SelectionError> {
        let points: Vec<_> = self
            .points
            .iter()
            .copied()
            .filter(|(date, _)| *date <= end)
            .collect();
        if points.is_empty() {
            return Err(SelectionError::EmptySelection);
        }
        Ok(CalendarSeries { points })
    }

    /// Reanalysis exports often store temperatures in Kelvin without saying
    /// so. A first observation above 100 cannot be a daily temperature in
    /// degree Celsius, so it decides. Callers applying this policy must
    /// shift the observations, the baseline mean and the percentile
    /// thresholds together.
    pub fn looks_like_kelvin(&self) -> bool {
        matches!(self.first(), Some((_, value)) if value > 100.0)
    }

    pub fn shift(&mut self, offset: f64) {
        for (_, value) in &mut self.points {
            *value += offset;
        }
    }
}

/// A series re-indexed by day of year, aligning years on 1..=365.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoySeries {
    // Points should be sorted by day of year
    pub points: Vec<(u16, f64)>,
}

impl DoySeries {
    pub fn new(points: Vec<(u16, f64)>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, doy: u16) -> Option<f64> {
        self.points
            .binary_search_by_key(&doy, |&(d, _)| d)
            .ok()
            .map(|idx| self.points[idx].1)
    }

    pub fn last(&self) -> Option<(u16, f64)> {
        self.points.last().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, value)| value)
    }

    pub fn shift(&mut self, offset: f64) {
        for (_, value) in &mut self.points {
            *value += offset;
        }
    }
}

/// A daily series on either of the two recognized axes.
#[derive(Debug, Clone)]
pub enum Series {
    Calendar(CalendarSeries),
    DayOfYear(DoySeries),
}

impl Series {
    /// Re-index on day of year. `drop_leap_day` removes ordinal 366, the
    /// last day of a leap year, so that every year aligns on 1..=365.
    /// Input that is already day-of-year indexed passes through unchanged,
    /// so applying this twice is a no-op.
    pub fn into_day_of_year(self, drop_leap_day: bool) -> DoySeries {
        let mut series = match self {
            Series::Calendar(series) => {
                let mut points = Vec::with_capacity(series.points.len());
                for (date, value) in series.points {
                    let doy = date.ordinal();
                    if let Some(&(last, _)) = points.last() {
                        if last >= doy {
                            eprintln!("days of year are not strictly increasing, select a single year first");
                        }
                    }
                    points.push((doy, value));
                }
                DoySeries { points }
            }
            Series::DayOfYear(series) => series,
        };
        if drop_leap_day {
            series.points.retain(|&(doy, _)| doy != 366);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn date(year: i32, month: Month, day: u8) -> Date {
        Date::from_calendar_date(year, month, day).unwrap()
    }

    #[test]
    fn calendar_dates_map_to_ordinals() {
        let series = CalendarSeries::new(vec![
            (date(2025, Month::January, 1), 1.0),
            (date(2025, Month::March, 1), 2.0),
        ]);
        let doy = Series::Calendar(series).into_day_of_year(true);
        assert_eq!(doy.points, vec![(1, 1.0), (60, 2.0)]);
    }

    #[test]
    fn leap_day_is_dropped() {
        let series = CalendarSeries::new(vec![
            (date(2024, Month::December, 30), 1.0),
            (date(2024, Month::December, 31), 2.0),
        ]);
        let doy = Series::Calendar(series).into_day_of_year(true);
        assert_eq!(doy.points, vec![(365, 1.0)]);
    }

    #[test]
    fn leap_day_survives_without_the_flag() {
        let series = CalendarSeries::new(vec![(date(2024, Month::December, 31), 2.0)]);
        let doy = Series::Calendar(series).into_day_of_year(false);
        assert_eq!(doy.points, vec![(366, 2.0)]);
    }

    #[test]
    fn day_of_year_input_passes_through() {
        let doy = DoySeries::new(vec![(1, 1.0), (2, 2.0)]);
        let once = Series::DayOfYear(doy.clone()).into_day_of_year(true);
        let twice = Series::DayOfYear(once).into_day_of_year(true);
        assert_eq!(twice, doy);
    }

    #[test]
    fn select_year_filters() {
        let series = CalendarSeries::new(vec![
            (date(2024, Month::June, 1), 1.0),
            (date(2025, Month::June, 1), 2.0),
        ]);
        let selected = series.select_year(2025).unwrap();
        assert_eq!(selected.points, vec![(date(2025, Month::June, 1), 2.0)]);
        assert!(matches!(
            series.select_year(1999),
            Err(SelectionError::EmptySelection)
        ));
    }

    #[test]
    fn multiple_years_are_rejected() {
        let series = CalendarSeries::new(vec![
            (date(2024, Month::June, 1), 1.0),
            (date(2025, Month::June, 1), 2.0),
        ]);
        assert!(matches!(
            series.single_year(),
            Err(SelectionError::MultipleYears(years)) if years == vec![2024, 2025]
        ));
        assert_eq!(series.select_year(2024).unwrap().single_year().unwrap(), 2024);
    }

    #[test]
    fn truncate_after_end_date() {
        let series = CalendarSeries::new(vec![
            (date(2025, Month::June, 1), 1.0),
            (date(2025, Month::June, 2), 2.0),
            (date(2025, Month::June, 3), 3.0),
        ]);
        let truncated = series.truncate_after(date(2025, Month::June, 2)).unwrap();
        assert_eq!(truncated.len(), 2);
        assert!(matches!(
            series.truncate_after(date(2025, Month::May, 31)),
            Err(SelectionError::EmptySelection)
        ));
    }

    #[test]
    fn kelvin_heuristic_and_shift() {
        let mut series = CalendarSeries::new(vec![(date(2025, Month::January, 1), 274.15)]);
        assert!(series.looks_like_kelvin());
        series.shift(-KELVIN_OFFSET);
        assert!((series.points[0].1 - 1.0).abs() < 1e-9);
        assert!(!series.looks_like_kelvin());
    }

    #[test]
    fn unit_from_str() {
        assert_eq!("degC".parse(), Ok(TemperatureUnit::Celsius));
        assert_eq!("K".parse(), Ok(TemperatureUnit::Kelvin));
        assert!("km/hr".parse::<TemperatureUnit>().is_err());
    }
}
