use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CirculanteError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    pub fn is_descending(self) -> bool {
        matches!(self, SortOrder::Descending)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order '{other}', expected asc or desc")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("asc"),
            SortOrder::Descending => f.write_str("desc"),
        }
    }
}

/// Closed date interval `[start, end]` plus the order rows are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
    order: SortOrder,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, order: SortOrder) -> Result<Self> {
        if end < start {
            return Err(CirculanteError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end, order })
    }

    /// Builds a window from raw query strings. Missing, empty or malformed
    /// dates fall back to `today`, each field independently.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        order: SortOrder,
        today: NaiveDate,
    ) -> Result<Self> {
        let start = parse_date_or(start, today);
        let end = parse_date_or(end, today);
        Self::new(start, end, order)
    }

    /// Same as [`DateWindow::resolve`] with the local calendar date as the fallback.
    pub fn resolve_today(start: Option<&str>, end: Option<&str>, order: SortOrder) -> Result<Self> {
        Self::resolve(start, end, order, Local::now().date_naive())
    }

    pub fn single_day(day: NaiveDate, order: SortOrder) -> Self {
        Self {
            start: day,
            end: day,
            order,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn with_order(self, order: SortOrder) -> Self {
        Self { order, ..self }
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

fn parse_date_or(raw: Option<&str>, fallback: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return fallback;
    };
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(day) => day,
        Err(err) => {
            debug!(raw, %err, "unparseable date, falling back to {fallback}");
            fallback
        }
    }
}

/// Parses the leading `YYYY-MM-DD` of an upstream `Data` field. Olinda serves
/// plain dates for some series and `YYYY-MM-DDTHH:MM:SS` stamps for others.
pub fn parse_upstream_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(head, DATE_FORMAT).map_err(|err| {
        CirculanteError::UpstreamSchemaMismatch(format!("unparseable date '{raw}': {err}"))
    })
}
