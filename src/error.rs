//! Error types for validation, per-day fetches and whole runs.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::product::Product;

/// Raised before any request is issued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Unsupported product `{0}` (expected reanalysis, forecast-physics or forecast-biogeochem)")]
    UnknownProduct(String),

    #[error("Longitude values must be between -180 and 360")]
    LongitudeRange,

    #[error("Latitude values must be between -90 and 90")]
    LatitudeRange,

    #[error("West ({west}) must be less than east ({east})")]
    InvertedLongitude { west: f64, east: f64 },

    #[error("South ({south}) must be less than north ({north})")]
    InvertedLatitude { south: f64, north: f64 },

    #[error("At least one variable is required")]
    NoVariables,

    #[error("Variable `{variable}` is not available for {product}")]
    UnknownVariable { variable: String, product: Product },

    #[error("Variables `{first}` and `{second}` are served by different {product} datasets")]
    MixedDatasets {
        first: String,
        second: String,
        product: Product,
    },

    #[error("Depth range {min} to {max} m must be ordered and within 0 to {limit} m")]
    DepthRange { min: f64, max: f64, limit: f64 },

    #[error("{date} is outside the {product} coverage window ({start} to {end})")]
    OutsideCoverage {
        date: NaiveDate,
        product: Product,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Monthly files are not available for {0}")]
    MonthlyUnsupported(Product),

    #[error("Date range starting {0} runs past the representable calendar")]
    DateOverflow(NaiveDate),
}

/// A single request's failure, recorded against its date.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Authentication rejected: {0}")]
    Authentication(String),

    #[error("Invalid request parameter: {0}")]
    InvalidParameter(String),

    #[error("Fetch failed: {0}")]
    Transient(String),

    #[error("Could not replace existing output: {0}")]
    Output(String),
}

impl FetchError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, FetchError::Authentication(_))
    }
}

/// Errors that abort a run before the first request.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Output directory '{0}' is not writable")]
    OutputWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to read credentials")]
    Credentials(#[source] std::io::Error),
}
