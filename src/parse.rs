use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::FromStr;

use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;
use time::{Date, Month};

use crate::baseline::{BaselineError, PercentileTable};
use crate::series::{CalendarSeries, DoySeries, Series, TemperatureUnit};

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("axis:")]
    Axis,
    #[token("unit:")]
    Unit,
    #[token("percentiles:")]
    Percentiles,

    #[regex(r"[0-9]{4}-[0-9]{2}-[0-9]{2}", priority = 3)]
    Date,
    #[regex(r"-?[0-9]+(\.[0-9]+)?")]
    Number,
    #[regex("[a-zA-Z]+")]
    String,

    #[token("---")]
    MissingData,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("missing `axis:` header")]
    MissingAxis,
    #[error("either `time` or `dayofyear` must be the axis, found: {0}")]
    #[diagnostic(code(klima::invalid_dimension))]
    InvalidDimension(String),
    #[error("percentile files must be indexed by dayofyear, found a time axis")]
    TimeAxisPercentiles,
    #[error("bad unit: {0}")]
    BadUnit(String),
    #[error("invalid date `{date}`: {source}")]
    InvalidDate {
        date: String,
        source: time::error::ComponentRange,
    },
    #[error("bad day of year: {0}")]
    BadDayOfYear(String),
    #[error("bad row: {0}")]
    BadRow(String),
    #[error("missing `percentiles:` header")]
    MissingPercentiles,
    #[error("expected {expected} thresholds on day {doy}, found {found}")]
    ShortRow {
        doy: u16,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Baseline(#[from] BaselineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Time,
    DayOfYear,
}

/// A parsed daily-series file: an optional declared unit and the series on
/// whichever axis the file declares.
#[derive(Debug, Clone)]
pub struct SeriesFile {
    pub unit: Option<TemperatureUnit>,
    pub series: Series,
}

impl FromStr for SeriesFile {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines().filter(|line| !line.trim().is_empty()).peekable();
        let axis = parse_axis(lines.next().ok_or(ParseError::MissingAxis)?)?;
        let unit = parse_unit(&mut lines)?;

        match axis {
            Axis::Time => {
                let mut points: Vec<(Date, f64)> = Vec::new();
                for line in lines {
                    let Some((date, value)) = parse_dated_row(line)? else {
                        continue;
                    };
                    if let Some(&(last, _)) = points.last() {
                        if last >= date {
                            eprintln!("days are not ordered");
                        }
                    }
                    points.push((date, value));
                }
                Ok(SeriesFile {
                    unit,
                    series: Series::Calendar(CalendarSeries { points }),
                })
            }
            Axis::DayOfYear => {
                let mut points: Vec<(u16, f64)> = Vec::new();
                for line in lines {
                    let Some((doy, value)) = parse_doy_row(line)? else {
                        continue;
                    };
                    if let Some(&(last, _)) = points.last() {
                        if last >= doy {
                            eprintln!("days are not ordered");
                        }
                    }
                    points.push((doy, value));
                }
                Ok(SeriesFile {
                    unit,
                    series: Series::DayOfYear(DoySeries { points }),
                })
            }
        }
    }
}

impl FromStr for PercentileTable {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines().filter(|line| !line.trim().is_empty()).peekable();
        let axis = parse_axis(lines.next().ok_or(ParseError::MissingAxis)?)?;
        if axis != Axis::DayOfYear {
            return Err(ParseError::TimeAxisPercentiles);
        }
        parse_unit(&mut lines)?;

        let header = lines.next().ok_or(ParseError::MissingPercentiles)?;
        let mut lex = Token::lexer(header);
        match lex.next() {
            Some(Ok(Token::Percentiles)) => (),
            _ => return Err(ParseError::MissingPercentiles),
        }
        let mut ranks: Vec<f64> = Vec::new();
        loop {
            match lex.next() {
                // the lexer only accepts digits here, parse cannot fail
                Some(Ok(Token::Number)) => ranks.push(lex.slice().parse().unwrap()),
                None => break,
                _ => return Err(ParseError::BadRow(header.to_string())),
            }
        }

        let mut days: BTreeMap<u16, Vec<f64>> = BTreeMap::new();
        for line in lines {
            let mut lex = Token::lexer(line);
            let doy = match lex.next() {
                Some(Ok(Token::Number)) => parse_doy(lex.slice())?,
                _ => return Err(ParseError::BadRow(line.to_string())),
            };

            let mut thresholds: Vec<f64> = Vec::with_capacity(ranks.len());
            let mut missing = false;
            loop {
                match lex.next() {
                    Some(Ok(Token::Number)) => thresholds.push(lex.slice().parse().unwrap()),
                    Some(Ok(Token::MissingData)) => {
                        missing = true;
                        break;
                    }
                    None => break,
                    _ => return Err(ParseError::BadRow(line.to_string())),
                }
            }
            if missing {
                continue;
            }
            if thresholds.len() != ranks.len() {
                return Err(ParseError::ShortRow {
                    doy,
                    expected: ranks.len(),
                    found: thresholds.len(),
                });
            }
            days.insert(doy, thresholds);
        }

        Ok(PercentileTable::new(ranks, days)?)
    }
}

fn parse_axis(line: &str) -> Result<Axis, ParseError> {
    let mut lex = Token::lexer(line);
    match lex.next() {
        Some(Ok(Token::Axis)) => (),
        _ => return Err(ParseError::MissingAxis),
    }
    match lex.next() {
        Some(Ok(Token::String)) => match lex.slice() {
            "time" => Ok(Axis::Time),
            "dayofyear" => Ok(Axis::DayOfYear),
            s => Err(ParseError::InvalidDimension(s.to_string())),
        },
        _ => Err(ParseError::InvalidDimension(line.to_string())),
    }
}

fn parse_unit<'a, I: Iterator<Item = &'a str>>(
    lines: &mut Peekable<I>,
) -> Result<Option<TemperatureUnit>, ParseError> {
    let Some(&line) = lines.peek() else {
        return Ok(None);
    };
    let mut lex = Token::lexer(line);
    if !matches!(lex.next(), Some(Ok(Token::Unit))) {
        return Ok(None);
    }
    let unit = match lex.next() {
        Some(Ok(Token::String)) => lex.slice().parse().map_err(ParseError::BadUnit)?,
        _ => return Err(ParseError::BadUnit(line.to_string())),
    };
    lines.next();
    Ok(Some(unit))
}

fn parse_dated_row(line: &str) -> Result<Option<(Date, f64)>, ParseError> {
    let mut lex = Token::lexer(line);
    let date = match lex.next() {
        Some(Ok(Token::Date)) => parse_date(lex.slice())?,
        _ => return Err(ParseError::BadRow(line.to_string())),
    };
    match lex.next() {
        // the lexer only accepts numbers here, parse cannot fail
        Some(Ok(Token::Number)) => Ok(Some((date, lex.slice().parse().unwrap()))),
        Some(Ok(Token::MissingData)) => Ok(None),
        _ => Err(ParseError::BadRow(line.to_string())),
    }
}

fn parse_doy_row(line: &str) -> Result<Option<(u16, f64)>, ParseError> {
    let mut lex = Token::lexer(line);
    let doy = match lex.next() {
        Some(Ok(Token::Number)) => parse_doy(lex.slice())?,
        _ => return Err(ParseError::BadRow(line.to_string())),
    };
    match lex.next() {
        Some(Ok(Token::Number)) => Ok(Some((doy, lex.slice().parse().unwrap()))),
        Some(Ok(Token::MissingData)) => Ok(None),
        _ => Err(ParseError::BadRow(line.to_string())),
    }
}

fn parse_date(s: &str) -> Result<Date, ParseError> {
    // the lexer guarantees the 0000-00-00 shape
    let year: i32 = s[0..4].parse().unwrap();
    let month: u8 = s[5..7].parse().unwrap();
    let day: u8 = s[8..10].parse().unwrap();
    let month = Month::try_from(month).map_err(|source| ParseError::InvalidDate {
        date: s.to_string(),
        source,
    })?;
    Date::from_calendar_date(year, month, day).map_err(|source| ParseError::InvalidDate {
        date: s.to_string(),
        source,
    })
}

fn parse_doy(s: &str) -> Result<u16, ParseError> {
    let doy: u16 = s.parse().map_err(|_| ParseError::BadDayOfYear(s.to_string()))?;
    if !(1..=366).contains(&doy) {
        return Err(ParseError::BadDayOfYear(s.to_string()));
    }
    Ok(doy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_dated_series() {
        let file: SeriesFile = "axis: time\nunit: degC\n2025-01-01 3.4\n2025-01-02 ---\n2025-01-03 -1.5\n"
            .parse()
            .unwrap();
        assert_eq!(file.unit, Some(TemperatureUnit::Celsius));
        let Series::Calendar(series) = file.series else {
            panic!("expected a calendar axis");
        };
        // the missing day is skipped
        assert_eq!(series.len(), 2);
        assert_eq!(series.points[1].1, -1.5);
        assert_eq!(series.points[1].0.ordinal(), 3);
    }

    #[test]
    fn parses_a_day_of_year_series() {
        let file: SeriesFile = "axis: dayofyear\n1 3.4\n2 4.0\n366 9.9\n".parse().unwrap();
        assert_eq!(file.unit, None);
        let Series::DayOfYear(series) = file.series else {
            panic!("expected a day-of-year axis");
        };
        assert_eq!(series.points, vec![(1, 3.4), (2, 4.0), (366, 9.9)]);
    }

    #[test]
    fn unknown_axis_is_rejected() {
        let result = "axis: pressure\n1 2.0\n".parse::<SeriesFile>();
        assert!(matches!(
            result,
            Err(ParseError::InvalidDimension(axis)) if axis == "pressure"
        ));
    }

    #[test]
    fn kelvin_unit_is_recognized() {
        let file: SeriesFile = "axis: time\nunit: K\n2025-01-01 276.55\n".parse().unwrap();
        assert_eq!(file.unit, Some(TemperatureUnit::Kelvin));
    }

    #[test]
    fn parses_a_percentile_table() {
        let table: PercentileTable =
            "axis: dayofyear\nunit: degC\npercentiles: 10 50 90\n1 5.0 15.0 25.0\n2 6.0 16.0 26.0\n"
                .parse()
                .unwrap();
        assert_eq!(table.ranks(), &[10.0, 50.0, 90.0]);
        assert_eq!(table.thresholds(2), Some(&[6.0, 16.0, 26.0][..]));
        assert_eq!(table.thresholds(3), None);
    }

    #[test]
    fn missing_percentile_days_are_skipped() {
        let table: PercentileTable = "axis: dayofyear\npercentiles: 10 90\n1 5.0 25.0\n2 ---\n"
            .parse()
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn short_threshold_rows_are_rejected() {
        let result = "axis: dayofyear\npercentiles: 10 50 90\n1 5.0 15.0\n".parse::<PercentileTable>();
        assert!(matches!(
            result,
            Err(ParseError::ShortRow { doy: 1, expected: 3, found: 2 })
        ));
    }

    #[test]
    fn percentile_tables_need_a_day_of_year_axis() {
        let result = "axis: time\npercentiles: 10 90\n".parse::<PercentileTable>();
        assert!(matches!(result, Err(ParseError::TimeAxisPercentiles)));
    }
}
