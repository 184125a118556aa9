use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LinksError;

fn is_valid_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = LinksError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !is_valid_id(trimmed) {
            return Err(LinksError::InvalidFileId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Identifier of the project (container) that owns a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContainerId {
    type Err = LinksError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !is_valid_id(trimmed) {
            return Err(LinksError::InvalidContainerId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMode {
    #[default]
    Glob,
    Regex,
}

impl fmt::Display for NameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMode::Glob => write!(f, "glob"),
            NameMode::Regex => write!(f, "regex"),
        }
    }
}

/// A file-name query sent to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    value: String,
    mode: NameMode,
}

impl NamePattern {
    pub fn new(value: &str, mode: NameMode) -> Result<Self, LinksError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(LinksError::InvalidPattern {
                pattern: value.to_string(),
                message: "pattern is empty".to_string(),
            });
        }
        if mode == NameMode::Regex {
            Regex::new(value).map_err(|err| LinksError::InvalidPattern {
                pattern: value.to_string(),
                message: err.to_string(),
            })?;
        }
        Ok(Self {
            value: value.to_string(),
            mode,
        })
    }

    pub fn glob(value: &str) -> Result<Self, LinksError> {
        Self::new(value, NameMode::Glob)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn mode(&self) -> NameMode {
        self.mode
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Relative(Duration),
    Since(DateTime<Utc>),
}

/// How far back the catalog search reaches, e.g. `-12w` or `2024-01-31`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecencyWindow {
    raw: String,
    bound: Bound,
}

impl RecencyWindow {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Absolute cutoff for `now`; fails when the window reaches past the representable range.
    pub fn created_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, LinksError> {
        match self.bound {
            Bound::Relative(duration) => now
                .checked_sub_signed(duration)
                .ok_or_else(|| LinksError::InvalidRecency(self.raw.clone())),
            Bound::Since(since) => Ok(since),
        }
    }
}

impl fmt::Display for RecencyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for RecencyWindow {
    type Err = LinksError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || LinksError::InvalidRecency(value.to_string());
        if trimmed.is_empty() {
            return Err(invalid());
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            let since = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc();
            return Ok(Self {
                raw: trimmed.to_string(),
                bound: Bound::Since(since),
            });
        }
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self {
                raw: trimmed.to_string(),
                bound: Bound::Since(timestamp.with_timezone(&Utc)),
            });
        }

        let relative = trimmed.strip_prefix('-').unwrap_or(trimmed).trim_start();
        let split = relative
            .find(|ch: char| !ch.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (amount, unit) = relative.split_at(split);
        let amount: i64 = amount.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        let unit_seconds = unit_seconds(unit.trim()).ok_or_else(invalid)?;
        let seconds = amount.checked_mul(unit_seconds).ok_or_else(invalid)?;
        let duration = Duration::try_seconds(seconds).ok_or_else(invalid)?;

        Ok(Self {
            raw: trimmed.to_string(),
            bound: Bound::Relative(duration),
        })
    }
}

fn unit_seconds(unit: &str) -> Option<i64> {
    // single letters are case sensitive so that m (minutes) and M (months) differ
    match unit {
        "s" => return Some(1),
        "m" => return Some(60),
        "h" => return Some(3_600),
        "d" => return Some(86_400),
        "w" => return Some(604_800),
        "M" => return Some(30 * 86_400),
        "y" => return Some(365 * 86_400),
        _ => {}
    }
    match unit.to_ascii_lowercase().as_str() {
        "sec" | "secs" | "second" | "seconds" => Some(1),
        "min" | "mins" | "minute" | "minutes" => Some(60),
        "hr" | "hrs" | "hour" | "hours" => Some(3_600),
        "day" | "days" => Some(86_400),
        "wk" | "wks" | "week" | "weeks" => Some(604_800),
        "month" | "months" => Some(30 * 86_400),
        "yr" | "yrs" | "year" | "years" => Some(365 * 86_400),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
