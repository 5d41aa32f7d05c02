//! String formats recognised in field definitions

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

static URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").unwrap_or_else(|e| panic!("uri regex: {e}"))
});

/// A named string format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
    /// RFC 3339 timestamp
    DateTime,
    /// `YYYY-MM-DD`
    Date,
    Uri,
    Uuid,
}

impl Format {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Self::Email),
            "date-time" => Some(Self::DateTime),
            "date" => Some(Self::Date),
            "uri" => Some(Self::Uri),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Uri => "uri",
            Self::Uuid => "uuid",
        }
    }

    /// Whether `value` is shaped like this format.
    pub fn check(&self, value: &str) -> bool {
        match self {
            Self::Email => EMAIL.is_match(value),
            Self::DateTime => DateTime::parse_from_rfc3339(value).is_ok(),
            Self::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            Self::Uri => URI.is_match(value),
            Self::Uuid => uuid::Uuid::parse_str(value).is_ok(),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
