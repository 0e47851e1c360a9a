use chrono::{Datelike, NaiveDate};

use crate::error::{CagnotteError, Result};

/// A calendar month, the unit every savings figure is keyed by.
/// Serialized everywhere as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CagnotteError::InvalidMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 2 {
            return Err(CagnotteError::InvalidMonth(s.to_string()));
        }
        let year: i32 = parts[0]
            .parse()
            .map_err(|_| CagnotteError::InvalidMonth(s.to_string()))?;
        let month: u32 = parts[1]
            .parse()
            .map_err(|_| CagnotteError::InvalidMonth(s.to_string()))?;
        if parts[0].len() != 4 || parts[1].len() != 2 {
            return Err(CagnotteError::InvalidMonth(s.to_string()));
        }
        Self::new(year, month)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse the month out of a `YYYY-MM-DD` date string.
    pub fn from_date_str(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| CagnotteError::InvalidDate(s.to_string()))?;
        Ok(Self::from_date(date))
    }

    pub fn first_day(&self) -> NaiveDate {
        // Month is validated on construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid month")
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .expect("month start has a predecessor")
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Inclusive month count from `self` through `other`.
    /// Zero when `other` is earlier than `self`.
    pub fn months_through(&self, other: MonthKey) -> i64 {
        let span =
            (other.year as i64 - self.year as i64) * 12 + other.month as i64 - self.month as i64 + 1;
        span.max(0)
    }

    /// SQL LIKE pattern matching every `YYYY-MM-DD` date in this month.
    pub fn date_pattern(&self) -> String {
        format!("{self}%")
    }

    /// Every month from `self` through `other`, oldest first.
    /// Empty when `other` is earlier than `self`.
    pub fn through(&self, other: MonthKey) -> Vec<MonthKey> {
        let mut months = Vec::new();
        let mut m = *self;
        while m <= other {
            months.push(m);
            m = m.next();
        }
        months
    }

    /// The `count` months ending at `self`, oldest first.
    pub fn trailing(&self, count: u32) -> Vec<MonthKey> {
        let mut months = Vec::with_capacity(count as usize);
        let mut m = *self;
        for _ in 0..count {
            months.push(m);
            m = m.prev();
        }
        months.reverse();
        months
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
