// crates/circulante-core/src/error.rs

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CirculanteError {
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("rolling window must be a positive number of days, got {0}")]
    InvalidRollingWindow(usize),

    #[error("invalid denomination: {0}")]
    InvalidDenomination(String),

    #[error("upstream data source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream payload did not match the expected schema: {0}")]
    UpstreamSchemaMismatch(String),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CirculanteError {
    /// True for errors caused by the caller's parameters rather than by the
    /// upstream source or the server itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDateRange { .. }
                | Self::InvalidRollingWindow(_)
                | Self::InvalidDenomination(_)
        )
    }

    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable(_) | Self::UpstreamSchemaMismatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CirculanteError>;
