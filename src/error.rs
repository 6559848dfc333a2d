//! Error types for the Sunflow exporter.
//!
//! Only stream-level failures surface here. Problems with individual scene
//! entities (unresolvable textures, unsupported lamps, unknown material
//! prefixes) are logged and replaced by fallback records instead.

use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for scene export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error while creating or writing an output or sidecar file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a JSON scene description.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse a TOML configuration file.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Failed to serialize a configuration file.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Host scene data violates a structural invariant.
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// Animation frame range is empty.
    #[error("Invalid frame range: {start}..={end}")]
    InvalidFrameRange { start: i32, end: i32 },
}
