//! Error types for the choropleth core and its data feeds.

use thiserror::Error;

/// Errors raised by scale construction, feed parsing and boundary loading.
///
/// Per-record problems (a feature without a name, a company with an
/// unparsable coordinate) are reported as [`MapError::MissingData`] to the
/// logging layer and skipped; only whole-domain violations reach the caller.
#[derive(Debug, Error)]
pub enum MapError {
    /// A record lacks a required field.
    #[error("missing data: {0}")]
    MissingData(String),

    /// The value set cannot form a color domain.
    #[error("invalid color domain: {0}")]
    InvalidDomain(String),

    /// A feed request failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A feed answered with a non-success status.
    #[error("feed {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Boundary data is not usable polygon GeoJSON.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON error: {0}")]
    SimdJson(#[from] simd_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
