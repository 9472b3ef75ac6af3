//! Error types for the Pension Engine.
//!
//! Errors fall into two families.  [`CalcError`] covers problems with a
//! subject's data: some are recovered locally (a malformed period is
//! skipped and noted), others are fatal to one downstream calculation
//! only.  [`ConfigError`] covers loading the read-only configuration
//! at startup.

use thiserror::Error;

/// Failure raised while normalising or evaluating one subject.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    /// A date field could not be parsed.  For period dates the period
    /// is skipped and the run continues.
    #[error("malformed date in {field}: {value:?}")]
    MalformedDate {
        /// Name of the offending field, e.g. `"start"`.
        field: String,
        /// The raw text that failed to parse.
        value: String,
    },

    /// A period parsed correctly but is internally inconsistent.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// No authoritative total-weeks figure exists, so no conservation
    /// formula can be applied.
    #[error("total weeks figure is missing")]
    MissingTotalWeeks,

    /// The subject's first registration date was not reported, so the
    /// legal regime cannot be selected.
    #[error("first registration date is missing")]
    MissingFirstRegistration,

    /// There are no periods from which to take a cessation date.
    #[error("no cessation date could be determined")]
    MissingCessationDate,

    /// The expiration date lies beyond the representable calendar.
    #[error("expiration date out of range: {weeks} weeks after {cessation}")]
    ExpirationOutOfRange { cessation: chrono::NaiveDate, weeks: u32 },
}

/// Failure raised while building an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid wage cap table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("wage cap table has no entries")]
    EmptyTable,

    #[error("wage cap for {year} must be positive, got {value}")]
    InvalidCap { year: i32, value: f64 },

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}
