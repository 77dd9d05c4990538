//! File families recognized by suffix, and their row-order conventions

use crate::error::{RasterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Families of array files the adapter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFamily {
    NetCdf,
    NcMl,
    Grib,
    /// Gridded binary dumps (`.grd`)
    Grid,
    /// JSON dumps of the in-memory backend
    Json,
}

/// Accepted filename suffixes, compared case-insensitively
const SUFFIXES: &[(&str, FileFamily)] = &[
    ("nc", FileFamily::NetCdf),
    ("nc4", FileFamily::NetCdf),
    ("netcdf", FileFamily::NetCdf),
    ("cdf", FileFamily::NetCdf),
    ("ncml", FileFamily::NcMl),
    ("grib", FileFamily::Grib),
    ("grb", FileFamily::Grib),
    ("grib1", FileFamily::Grib),
    ("grib2", FileFamily::Grib),
    ("grb2", FileFamily::Grib),
    ("grd", FileFamily::Grid),
    ("json", FileFamily::Json),
];

impl FileFamily {
    /// Family for a suffix, with or without the leading dot
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let suffix = suffix.trim_start_matches('.');
        SUFFIXES
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(suffix))
            .map(|(_, family)| *family)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_suffix)
            .ok_or_else(|| {
                RasterError::UnsupportedFormat(format!(
                    "'{}' does not have a recognized array-file suffix",
                    path.display()
                ))
            })
    }

    pub fn can_decode(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }

    /// Row order the family stores its data in when not configured otherwise
    pub fn default_row_order(&self) -> RowOrder {
        match self {
            FileFamily::Grib => RowOrder::Ascending,
            _ => RowOrder::Flipped,
        }
    }
}

impl fmt::Display for FileFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileFamily::NetCdf => "NetCDF",
            FileFamily::NcMl => "NcML",
            FileFamily::Grib => "GRIB",
            FileFamily::Grid => "GRD",
            FileFamily::Json => "JSON",
        };
        f.write_str(name)
    }
}

/// How stored rows relate to the raster's top-down rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowOrder {
    /// Storage row 0 is the bottom raster row
    #[default]
    Flipped,
    /// Storage row 0 is the top raster row
    Ascending,
}

impl RowOrder {
    pub fn needs_flip(&self) -> bool {
        matches!(self, RowOrder::Flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_allowlist() {
        assert_eq!(FileFamily::from_suffix(".NC"), Some(FileFamily::NetCdf));
        assert_eq!(FileFamily::from_suffix("grb2"), Some(FileFamily::Grib));
        assert_eq!(FileFamily::from_suffix("tif"), None);
        assert!(FileFamily::can_decode(Path::new("/data/ocean.Nc4")));
        assert!(!FileFamily::can_decode(Path::new("/data/ocean")));
        assert!(matches!(
            FileFamily::from_path(Path::new("image.png")),
            Err(RasterError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_row_order_defaults() {
        assert!(FileFamily::NetCdf.default_row_order().needs_flip());
        assert!(!FileFamily::Grib.default_row_order().needs_flip());
    }
}
