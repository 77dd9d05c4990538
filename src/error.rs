//! Error types for raster adapter operations

use thiserror::Error;

/// Main error type for raster/array-file operations
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected at bind time: duplicate bindings, COLUMNS/ROWS rebinding
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Variable cannot be mapped onto a raster (e.g. fewer than two dimensions)
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// A section read or write failed; carries enough context to diagnose
    /// without inspecting the file.
    #[error(
        "Section transfer failed for variable '{variable}' (band {band}, origin {origin:?}, shape {shape:?}): {source}"
    )]
    Section {
        variable: String,
        band: usize,
        origin: Vec<usize>,
        shape: Vec<usize>,
        #[source]
        source: Box<RasterError>,
    },

    /// Failure reported by the array-file library
    #[error("Array file backend error: {0}")]
    Backend(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Image index {index} out of range ({count} images)")]
    InvalidImageIndex { index: usize, count: usize },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Specialized Result type for raster adapter operations
pub type Result<T> = std::result::Result<T, RasterError>;

impl RasterError {
    /// Wrap an error with the section context it occurred in.
    pub fn in_section(
        self,
        variable: impl Into<String>,
        band: usize,
        origin: &[usize],
        shape: &[usize],
    ) -> Self {
        RasterError::Section {
            variable: variable.into(),
            band,
            origin: origin.to_vec(),
            shape: shape.to_vec(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for RasterError {
    fn from(err: serde_json::Error) -> Self {
        RasterError::Serialization(err.to_string())
    }
}
