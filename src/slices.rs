//! Fixed indices for array dimensions the raster does not iterate

use crate::error::{RasterError, Result};
use crate::types::{AxisDescriptor, AxisDirection};
use serde::{Deserialize, Serialize};

/// What a slice override is correlated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceKey {
    /// Axis name, compared case-insensitively
    Axis(String),
    Direction(AxisDirection),
    /// Storage index of the dimension
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceOverride {
    pub key: SliceKey,
    pub index: usize,
}

/// Requested slice positions for non-raster dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceOverrides {
    entries: Vec<SliceOverride>,
}

impl SliceOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slice for `key`, replacing an earlier value for the same key
    pub fn set(&mut self, key: SliceKey, index: usize) {
        self.entries.retain(|entry| entry.key != key);
        self.entries.push(SliceOverride { key, index });
    }

    pub fn with(mut self, key: SliceKey, index: usize) -> Self {
        self.set(key, index);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of `other` take precedence over entries of `self`
    pub fn merged_with(&self, other: &SliceOverrides) -> SliceOverrides {
        let mut merged = self.clone();
        for entry in &other.entries {
            merged.set(entry.key.clone(), entry.index);
        }
        merged
    }

    /// Requested slice for storage dimension `dimension`, correlated by axis
    /// identity first and by position otherwise.
    pub fn lookup(&self, axis: Option<&AxisDescriptor>, dimension: usize) -> Option<usize> {
        if let Some(axis) = axis {
            let by_name = self.entries.iter().find(|entry| {
                matches!(&entry.key, SliceKey::Axis(name) if name.eq_ignore_ascii_case(&axis.name))
            });
            let by_direction = || {
                self.entries.iter().find(
                    |entry| matches!(entry.key, SliceKey::Direction(d) if d == axis.direction),
                )
            };
            if let Some(entry) = by_name.or_else(by_direction) {
                return Some(entry.index);
            }
        }
        self.entries
            .iter()
            .find(|entry| entry.key == SliceKey::Index(dimension))
            .map(|entry| entry.index)
    }
}

/// The image dimension and the image index to substitute there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSlice {
    pub dimension: usize,
    pub index: usize,
}

/// One index per storage dimension of a variable.
///
/// `raster_dims` (COLUMNS, ROWS and BANDS) are left at 0 for the caller to
/// fill from the requested region. Every other dimension takes its requested
/// slice or 0; the IMAGES dimension takes the image index.
pub fn indices_for(
    overrides: &SliceOverrides,
    axes: &[AxisDescriptor],
    shape: &[usize],
    raster_dims: &[usize],
    image: Option<ImageSlice>,
) -> Result<Vec<usize>> {
    let mut indices = vec![0; shape.len()];
    for (dimension, (slot, &len)) in indices.iter_mut().zip(shape).enumerate() {
        if raster_dims.contains(&dimension) {
            continue;
        }
        let axis = axes.iter().find(|axis| axis.dimension == dimension);
        let index = match image {
            Some(image) if image.dimension == dimension => image.index,
            _ => overrides.lookup(axis, dimension).unwrap_or(0),
        };
        if index >= len {
            let name = axis.map(|a| a.name.as_str()).unwrap_or("<unnamed>");
            return Err(RasterError::OutOfBounds(format!(
                "slice {} of dimension {} ('{}') exceeds length {}",
                index, dimension, name, len
            )));
        }
        *slot = index;
    }
    Ok(indices)
}
