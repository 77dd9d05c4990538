//! Core data types shared by the reader and writer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data types a pixel variable can be declared with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    I64,
    F32,
    #[default]
    F64,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Raster-facing meaning of a physical array dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalRole {
    /// Pixel columns, the fastest-varying dimension
    Columns,
    /// Pixel rows
    Rows,
    /// Sample bands of one image
    Bands,
    /// Image index within the file
    Images,
    /// Not iterated by the raster; addressed through a slice index
    None,
}

impl fmt::Display for LogicalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalRole::Columns => "COLUMNS",
            LogicalRole::Rows => "ROWS",
            LogicalRole::Bands => "BANDS",
            LogicalRole::Images => "IMAGES",
            LogicalRole::None => "NONE",
        };
        f.write_str(name)
    }
}

/// Direction of a coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisDirection {
    East,
    North,
    Up,
    Down,
    Future,
    Other,
}

impl AxisDirection {
    /// Derive a direction from the conventional `axis`, `positive` and
    /// `units` attributes of a coordinate variable.
    pub fn from_attributes(axis: Option<&str>, positive: Option<&str>, units: Option<&str>) -> Self {
        let down = positive.is_some_and(|p| p.eq_ignore_ascii_case("down"));
        if let Some(axis) = axis {
            match axis.trim().to_ascii_uppercase().as_str() {
                "X" => return AxisDirection::East,
                "Y" => return AxisDirection::North,
                "Z" if down => return AxisDirection::Down,
                "Z" => return AxisDirection::Up,
                "T" => return AxisDirection::Future,
                _ => {}
            }
        }
        if positive.is_some() {
            return if down { AxisDirection::Down } else { AxisDirection::Up };
        }
        match units.map(|u| u.trim().to_ascii_lowercase()) {
            Some(u) if u.contains(" since ") => AxisDirection::Future,
            Some(u) if u.starts_with("degrees_east") || u.starts_with("degree_e") => {
                AxisDirection::East
            }
            Some(u) if u.starts_with("degrees_north") || u.starts_with("degree_n") => {
                AxisDirection::North
            }
            _ => AxisDirection::Other,
        }
    }

    /// Conventional single-letter `axis` attribute, when one applies
    pub fn axis_letter(&self) -> Option<&'static str> {
        match self {
            AxisDirection::East => Some("X"),
            AxisDirection::North => Some("Y"),
            AxisDirection::Up | AxisDirection::Down => Some("Z"),
            AxisDirection::Future => Some("T"),
            AxisDirection::Other => None,
        }
    }
}

/// Axis descriptor with name, direction, unit and storage position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisDescriptor {
    /// Name of the axis (e.g. "lon", "time", "depth")
    pub name: String,
    /// Direction of increasing values
    pub direction: AxisDirection,
    /// Unit of measurement; empty when unknown
    pub unit: String,
    /// Position of the described dimension in the variable's storage order
    pub dimension: usize,
}

impl AxisDescriptor {
    /// Create a new axis descriptor
    pub fn new(
        name: impl Into<String>,
        direction: AxisDirection,
        unit: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            unit: unit.into(),
            dimension,
        }
    }

    /// Same axis identity (name, direction and unit), ignoring storage position
    pub fn same_identity(&self, other: &AxisDescriptor) -> bool {
        self.name == other.name && self.direction == other.direction && self.unit == other.unit
    }
}

/// Value of a variable or global attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Numbers(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::Number(v) => Some(vec![*v]),
            AttrValue::Numbers(v) => Some(v.clone()),
            AttrValue::Text(_) => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::Numbers(value)
    }
}

/// Value range of a band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Pixel region of a raster, in raster (top-down) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width` x `height` raster
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Check that the region is non-empty and fits in `width` x `height`
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.x + self.width <= width
            && self.y + self.height <= height
    }
}

/// Linear conversion from stored samples to geophysical values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleTransfer {
    pub scale: f64,
    pub offset: f64,
}

impl SampleTransfer {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: 0.0,
    };

    pub fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    pub fn apply(&self, sample: f64) -> f64 {
        sample * self.scale + self.offset
    }
}

impl Default for SampleTransfer {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Descriptive metadata of one raster band
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandDescription {
    /// Variable-safe identifier of the band
    pub name: Option<String>,
    /// Free-text description (`long_name`)
    pub description: Option<String>,
    pub unit: Option<String>,
    pub fill_value: Option<f64>,
    pub range: Option<ValueRange>,
    pub transfer: SampleTransfer,
}

impl BandDescription {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_transfer(mut self, transfer: SampleTransfer) -> Self {
        self.transfer = transfer;
        self
    }
}
