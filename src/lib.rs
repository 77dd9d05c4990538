//! ncraster - banded rasters over N-dimensional array files
//!
//! Reads two-dimensional, banded raster images out of self-describing
//! N-dimensional array files (NetCDF-style variables, dimensions and
//! coordinate axes) and writes rasters back into them.
//!
//! # Features
//!
//! - Column and row roles on the two fastest-varying dimensions; bands and
//!   image index bound by axis name, direction or explicit index
//! - Fixed slices for every other dimension (time, depth, ...)
//! - Row-order flip per file family
//! - Coordinate sequences from axis values, grid indices or an affine
//!   pixel-to-coordinate transform
//! - Buffered sample writes sized to a divisor of the image height
//! - Cooperative cancellation and progress callbacks while reading
//!
//! The array-file library itself sits behind the [`ArrayFile`] and
//! [`ArrayFileMut`] traits. [`MemoryArrayFile`] implements both in memory
//! and persists as JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use ncraster::{AdapterConfig, MemoryArrayFile, RasterReader, ReadParams};
//!
//! let mut reader = RasterReader::<MemoryArrayFile>::new(AdapterConfig::default())?;
//! reader.open_path("ocean.json")?;
//! let raster = reader.read_image_at(0, &ReadParams::default())?;
//! println!("{} bands of {}x{}", raster.num_bands(), raster.width(), raster.height());
//! ```

pub mod axes;
pub mod config;
pub mod error;
pub mod format;
pub mod metadata;
pub mod raster;
pub mod reader;
pub mod roles;
pub mod sequence;
pub mod slices;
pub mod store;
pub mod temporal;
pub mod transform;
pub mod types;
pub mod variables;
pub mod writer;

// Re-exports
pub use axes::{AxisCatalog, AxisValues, CoordinateAxis};
pub use config::AdapterConfig;
pub use error::{RasterError, Result};
pub use format::{FileFamily, RowOrder};
pub use raster::{CastConverter, FnConverter, ImageGrid, Raster, SampleConverter};
pub use reader::{AbortHandle, RasterReader, ReadListener, ReadParams, ReaderState};
pub use roles::{AxisMatcher, DimensionRoleRegistry, DimensionSelector};
pub use slices::{SliceKey, SliceOverrides};
pub use store::{ArrayFile, ArrayFileMut, MemoryArrayFile, SectionRange, SectionSink};
pub use transform::{AffineTransform, GridToCrs};
pub use types::{AxisDescriptor, AxisDirection, BandDescription, DataType, LogicalRole, Region};
pub use writer::{RasterWriter, WriteParams, WriterState};

/// Version of the ncraster crate
pub const NCRASTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!NCRASTER_VERSION.is_empty());
    }
}
