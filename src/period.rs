use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Calendar quarter a return is filed for.
/// Parsed from tokens like `2023-q1`, which also name the downloaded exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quarter {
    year: i32,
    quarter: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid reporting period '{0}', expected e.g. 2023-q1")]
pub struct ParseQuarterError(String);

impl Quarter {
    /// `None` unless the quarter and the whole year are representable dates
    pub fn new(year: i32, quarter: u32) -> Option<Self> {
        let next_year = year.checked_add(1)?;
        NaiveDate::from_ymd_opt(year, 1, 1)?;
        NaiveDate::from_ymd_opt(next_year, 1, 1)?;
        (1..=4).contains(&quarter).then_some(Quarter { year, quarter })
    }

    /// First day of the quarter
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, (self.quarter - 1) * 3 + 1, 1)
            .expect("quarter start is a valid date")
    }

    /// Last day of the quarter
    pub fn end_date(&self) -> NaiveDate {
        let next = if self.quarter == 4 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.quarter * 3 + 1, 1)
        };
        next.and_then(|d| d.pred_opt())
            .expect("quarter end is a valid date")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// Token used in export file names, e.g. `2023-q1`
    pub fn file_token(&self) -> String {
        format!("{}-q{}", self.year, self.quarter)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q{}", self.year, self.quarter)
    }
}

impl FromStr for Quarter {
    type Err = ParseQuarterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseQuarterError(s.to_string());
        let lower = s.trim().to_ascii_lowercase();
        let (year, quarter) = lower.split_once('-').ok_or_else(err)?;
        let year = year.parse::<i32>().map_err(|_| err())?;
        let quarter = quarter
            .strip_prefix('q')
            .and_then(|q| q.parse::<u32>().ok())
            .ok_or_else(err)?;
        Quarter::new(year, quarter).ok_or_else(err)
    }
}
