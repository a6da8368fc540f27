//! Calendar-day keys for daily posts.
//!
//! Keys are written zero-padded (`2024_01_05`) so that string order and calendar order agree.
//! The unpadded form (`2024_1_5`) is still accepted on input and can be produced for looking up
//! documents written before the padding rule.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ValidationError;

/// Which calendar decides what "today" is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Calendar {
    /// Process-local time zone.
    #[default]
    Local,
    Utc,
}

impl Calendar {
    pub fn today(self) -> NaiveDate {
        match self {
            Calendar::Local => Local::now().date_naive(),
            Calendar::Utc => Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn today(calendar: Calendar) -> Self {
        Self(calendar.today())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The unpadded spelling used by older documents, e.g. `2024_1_5`.
    pub fn legacy_form(&self) -> String {
        format!("{}_{}_{}", self.0.year(), self.0.month(), self.0.day())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}_{:02}_{:02}", self.0.year(), self.0.month(), self.0.day())
    }
}

impl FromStr for DateKey {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ValidationError::single(
                "date_key",
                "validation.date_key",
                format!("'{raw}' is not a <year>_<month>_<day> key"),
            )
        };
        let mut parts = raw.trim().split('_');
        let (Some(year), Some(month), Some(day), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        DateKey::from_ymd(year, month, day).ok_or_else(invalid)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|err: ValidationError| serde::de::Error::custom(err.summary()))
    }
}
