//! Common types used across the platform

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used on the wire and in storage keys
pub const DATE_FORMAT: &str = "%Y-%m-%d";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Opaque product identifier issued by the backend
    ProductId
);
string_id!(
    /// Opaque bar (venue) identifier issued by the backend
    BarId
);
string_id!(
    /// Opaque transfer identifier issued by the backend
    TransferId
);

/// One bar on one business day.
///
/// Everything the client keeps between page loads (pending edits, the
/// counted cash) is scoped by this key so edits never leak across bars or
/// dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayKey {
    pub bar_id: BarId,
    pub date: NaiveDate,
}

impl DayKey {
    pub fn new(bar_id: impl Into<BarId>, date: NaiveDate) -> Self {
        Self {
            bar_id: bar_id.into(),
            date,
        }
    }

    /// Storage key for the pending edit buffer of this day
    pub fn edits_key(&self) -> String {
        format!("inventory-edits:{}:{}", self.bar_id, format_date(self.date))
    }

    /// Storage key for the counted cash of this day
    pub fn cash_count_key(&self) -> String {
        format!("cash-count:{}:{}", self.bar_id, format_date(self.date))
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.bar_id, format_date(self.date))
    }
}

/// Parse a business date.
///
/// Accepts a plain `YYYY-MM-DD` string or anything that starts with one,
/// such as an RFC 3339 timestamp. Only the calendar day is kept.
pub fn parse_business_date(raw: &str) -> Result<NaiveDate, &'static str> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| "Date must be in YYYY-MM-DD format")
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Serde adapter for `YYYY-MM-DD` dates
pub mod business_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_business_date(&raw).map_err(serde::de::Error::custom)
    }
}
