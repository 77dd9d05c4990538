//! Array-file access traits and an in-memory backend
//!
//! The adapter never parses array files itself. It talks to the array-file
//! library through [`ArrayFile`] (reading) and [`ArrayFileMut`] (writing).
//! [`MemoryArrayFile`] implements both over `ndarray` arrays and can be
//! persisted as a JSON document.

use crate::axes::{AxisValues, CoordinateAxis};
use crate::error::{RasterError, Result};
use crate::types::{AttrValue, AxisDescriptor, AxisDirection, DataType};
use ndarray::{ArrayD, ArrayViewD, IxDyn, Slice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A named dimension and its length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub len: usize,
}

/// Structural description of a variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    /// Dimension names in storage order (slowest varying first)
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub data_type: DataType,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl VariableInfo {
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// One-dimensional variable named after its own dimension
    pub fn is_coordinate(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0] == self.name
    }
}

/// Strided range along one dimension of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    pub start: usize,
    pub count: usize,
    pub stride: usize,
}

impl SectionRange {
    pub fn new(start: usize, count: usize, stride: usize) -> Self {
        Self {
            start,
            count,
            stride,
        }
    }

    /// A single fixed index
    pub fn single(index: usize) -> Self {
        Self::new(index, 1, 1)
    }

    /// Last index covered (inclusive)
    pub fn last(&self) -> usize {
        self.start + self.count.saturating_sub(1) * self.stride
    }
}

/// Read side of the array-file library
pub trait ArrayFile {
    fn global_attributes(&self) -> BTreeMap<String, AttrValue>;

    fn dimensions(&self) -> Vec<DimensionInfo>;

    fn variables(&self) -> Vec<VariableInfo>;

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.variables().into_iter().find(|v| v.name == name)
    }

    /// Coordinate axes describing the dimensions of `variable`
    fn coordinate_axes(&self, variable: &str) -> Result<Vec<CoordinateAxis>>;

    /// Read a strided hyper-rectangle, one range per dimension
    fn read_section(&self, variable: &str, section: &[SectionRange]) -> Result<ArrayD<f64>>;
}

/// Destination of hyper-rectangular writes
pub trait SectionSink {
    fn write_section(&mut self, variable: &str, origin: &[usize], data: ArrayViewD<'_, f64>)
        -> Result<()>;
}

/// Write side of the array-file library
pub trait ArrayFileMut: SectionSink {
    fn put_global_attribute(&mut self, name: &str, value: AttrValue) -> Result<()>;

    fn add_dimension(&mut self, name: &str, len: usize) -> Result<()>;

    fn add_variable(&mut self, name: &str, dimensions: &[String], data_type: DataType)
        -> Result<()>;

    fn put_attribute(&mut self, variable: &str, name: &str, value: AttrValue) -> Result<()>;

    fn has_dimension(&self, name: &str) -> bool;

    fn has_variable(&self, name: &str) -> bool;

    /// Leave definition mode; no more structure may be declared
    fn end_define(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Array files that can be opened from a filesystem path
pub trait OpenPath: Sized {
    fn open_path(path: &Path) -> Result<Self>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryVariable {
    name: String,
    dimensions: Vec<String>,
    data_type: DataType,
    #[serde(default)]
    attributes: BTreeMap<String, AttrValue>,
    data: ArrayD<f64>,
}

/// In-memory array file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryArrayFile {
    #[serde(default)]
    attributes: BTreeMap<String, AttrValue>,
    dimensions: Vec<DimensionInfo>,
    variables: Vec<MemoryVariable>,
    #[serde(skip)]
    define_mode: bool,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl MemoryArrayFile {
    /// Empty file, not in definition mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty file in definition mode, kept in memory
    pub fn create() -> Self {
        Self {
            define_mode: true,
            ..Self::default()
        }
    }

    /// Empty file in definition mode, saved to `path` on close
    pub fn create_path(path: impl AsRef<Path>) -> Self {
        Self {
            define_mode: true,
            path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Load a file previously saved with [`MemoryArrayFile::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(fs::File::open(path)?);
        let file: MemoryArrayFile = serde_json::from_reader(reader)?;
        debug!(path = %path.display(), variables = file.variables.len(), "Loaded array file");
        Ok(file)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn is_define_mode(&self) -> bool {
        self.define_mode
    }

    pub fn with_global_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        self.dimensions.retain(|d| d.name != name);
        self.dimensions.push(DimensionInfo {
            name: name.to_string(),
            len,
        });
        self
    }

    /// Add a variable with data; its shape must match the named dimensions
    pub fn with_variable(mut self, name: &str, dimensions: &[&str], data: ArrayD<f64>) -> Self {
        self.variables.retain(|v| v.name != name);
        self.variables.push(MemoryVariable {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            data_type: DataType::F64,
            attributes: BTreeMap::new(),
            data,
        });
        self
    }

    pub fn with_attribute(mut self, variable: &str, name: &str, value: impl Into<AttrValue>) -> Self {
        if let Some(var) = self.variables.iter_mut().find(|v| v.name == variable) {
            var.attributes.insert(name.to_string(), value.into());
        }
        self
    }

    /// Add a coordinate variable over the dimension of the same name
    pub fn with_coordinate(
        self,
        name: &str,
        values: Vec<f64>,
        units: &str,
        axis: Option<&str>,
    ) -> Self {
        let len = values.len();
        let data = ArrayD::from_shape_vec(IxDyn(&[len]), values)
            .unwrap_or_else(|_| ArrayD::zeros(IxDyn(&[len])));
        let mut file = self
            .with_variable(name, &[name], data)
            .with_attribute(name, "long_name", name);
        if !units.is_empty() {
            file = file.with_attribute(name, "units", units);
        }
        match axis {
            Some(letter) => file.with_attribute(name, "axis", letter),
            None => file,
        }
    }

    /// Full data of a variable
    pub fn data(&self, variable: &str) -> Option<&ArrayD<f64>> {
        self.find(variable).ok().map(|v| &v.data)
    }

    fn find(&self, variable: &str) -> Result<&MemoryVariable> {
        self.variables
            .iter()
            .find(|v| v.name == variable)
            .ok_or_else(|| RasterError::NotFound(format!("variable '{}'", variable)))
    }

    fn find_mut(&mut self, variable: &str) -> Result<&mut MemoryVariable> {
        self.variables
            .iter_mut()
            .find(|v| v.name == variable)
            .ok_or_else(|| RasterError::NotFound(format!("variable '{}'", variable)))
    }

    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().find(|d| d.name == name).map(|d| d.len)
    }

    fn require_define_mode(&self, action: &str) -> Result<()> {
        if self.define_mode {
            Ok(())
        } else {
            Err(RasterError::IllegalState(format!(
                "cannot {} outside definition mode",
                action
            )))
        }
    }

    fn info(&self, var: &MemoryVariable) -> VariableInfo {
        VariableInfo {
            name: var.name.clone(),
            dimensions: var.dimensions.clone(),
            shape: var.data.shape().to_vec(),
            data_type: var.data_type,
            attributes: var.attributes.clone(),
        }
    }
}

impl ArrayFile for MemoryArrayFile {
    fn global_attributes(&self) -> BTreeMap<String, AttrValue> {
        self.attributes.clone()
    }

    fn dimensions(&self) -> Vec<DimensionInfo> {
        self.dimensions.clone()
    }

    fn variables(&self) -> Vec<VariableInfo> {
        self.variables.iter().map(|v| self.info(v)).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.find(name).ok().map(|v| self.info(v))
    }

    fn coordinate_axes(&self, variable: &str) -> Result<Vec<CoordinateAxis>> {
        let var = self.find(variable)?;
        let mut axes = Vec::new();
        for (position, dim) in var.dimensions.iter().enumerate() {
            let Ok(coord) = self.find(dim) else {
                continue;
            };
            if coord.dimensions.len() != 1 || &coord.dimensions[0] != dim {
                continue;
            }
            let text = |key: &str| coord.attributes.get(key).and_then(AttrValue::as_str);
            let units = text("units").unwrap_or("");
            let direction = AxisDirection::from_attributes(text("axis"), text("positive"), Some(units));
            let raw: Vec<f64> = coord.data.iter().copied().collect();
            axes.push(CoordinateAxis::new(
                AxisDescriptor::new(dim.clone(), direction, units, position),
                AxisValues::from_raw(raw, units),
            ));
        }
        Ok(axes)
    }

    fn read_section(&self, variable: &str, section: &[SectionRange]) -> Result<ArrayD<f64>> {
        let var = self.find(variable)?;
        let shape = var.data.shape();
        if section.len() != shape.len() {
            return Err(RasterError::InvalidDimensions(format!(
                "section has {} ranges but '{}' has rank {}",
                section.len(),
                variable,
                shape.len()
            )));
        }
        for (dim, (range, &len)) in section.iter().zip(shape).enumerate() {
            if range.count == 0 || range.stride == 0 || range.last() >= len {
                return Err(RasterError::OutOfBounds(format!(
                    "dimension {} ('{}'): range {:?} exceeds length {}",
                    dim, var.dimensions[dim], range, len
                )));
            }
        }
        let view = var.data.slice_each_axis(|axis| {
            let range = section[axis.axis.index()];
            Slice::new(
                range.start as isize,
                Some(range.last() as isize + 1),
                range.stride as isize,
            )
        });
        Ok(view.to_owned())
    }
}

impl SectionSink for MemoryArrayFile {
    fn write_section(
        &mut self,
        variable: &str,
        origin: &[usize],
        data: ArrayViewD<'_, f64>,
    ) -> Result<()> {
        if self.define_mode {
            return Err(RasterError::IllegalState(
                "cannot write values in definition mode".to_string(),
            ));
        }
        let var = self.find_mut(variable)?;
        let shape = var.data.shape().to_vec();
        if origin.len() != shape.len() || data.ndim() != shape.len() {
            return Err(RasterError::InvalidDimensions(format!(
                "write of rank {} at origin {:?} into '{}' of rank {}",
                data.ndim(),
                origin,
                variable,
                shape.len()
            )));
        }
        for (dim, ((&start, &count), &len)) in origin.iter().zip(data.shape()).zip(&shape).enumerate() {
            if start + count > len {
                return Err(RasterError::OutOfBounds(format!(
                    "dimension {} ('{}'): {}..{} exceeds length {}",
                    dim,
                    var.dimensions[dim],
                    start,
                    start + count,
                    len
                )));
            }
        }
        let extent = data.shape().to_vec();
        var.data
            .slice_each_axis_mut(|axis| {
                let dim = axis.axis.index();
                Slice::from(origin[dim]..origin[dim] + extent[dim])
            })
            .assign(&data);
        Ok(())
    }
}

impl ArrayFileMut for MemoryArrayFile {
    fn put_global_attribute(&mut self, name: &str, value: AttrValue) -> Result<()> {
        self.require_define_mode("add a global attribute")?;
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        self.require_define_mode("add a dimension")?;
        if self.has_dimension(name) {
            return Err(RasterError::Backend(format!(
                "dimension '{}' already defined",
                name
            )));
        }
        self.dimensions.push(DimensionInfo {
            name: name.to_string(),
            len,
        });
        Ok(())
    }

    fn add_variable(
        &mut self,
        name: &str,
        dimensions: &[String],
        data_type: DataType,
    ) -> Result<()> {
        self.require_define_mode("add a variable")?;
        if self.has_variable(name) {
            return Err(RasterError::Backend(format!(
                "variable '{}' already defined",
                name
            )));
        }
        let shape = dimensions
            .iter()
            .map(|d| {
                self.dimension_len(d)
                    .ok_or_else(|| RasterError::NotFound(format!("dimension '{}'", d)))
            })
            .collect::<Result<Vec<_>>>()?;
        self.variables.push(MemoryVariable {
            name: name.to_string(),
            dimensions: dimensions.to_vec(),
            data_type,
            attributes: BTreeMap::new(),
            data: ArrayD::zeros(IxDyn(&shape)),
        });
        Ok(())
    }

    fn put_attribute(&mut self, variable: &str, name: &str, value: AttrValue) -> Result<()> {
        self.require_define_mode("add an attribute")?;
        self.find_mut(variable)?
            .attributes
            .insert(name.to_string(), value);
        Ok(())
    }

    fn has_dimension(&self, name: &str) -> bool {
        self.dimension_len(name).is_some()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    fn end_define(&mut self) -> Result<()> {
        self.require_define_mode("leave definition mode")?;
        self.define_mode = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.define_mode = false;
        if let Some(path) = self.path.take() {
            self.save(&path)?;
            info!(path = %path.display(), "Saved array file");
        }
        Ok(())
    }
}

impl OpenPath for MemoryArrayFile {
    fn open_path(path: &Path) -> Result<Self> {
        MemoryArrayFile::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};
    use tempfile::TempDir;

    fn grid_file() -> MemoryArrayFile {
        let data = Array::from_shape_fn(IxDyn(&[3, 4]), |ix| (ix[0] * 10 + ix[1]) as f64);
        MemoryArrayFile::new()
            .with_dimension("y", 3)
            .with_dimension("x", 4)
            .with_variable("grid", &["y", "x"], data)
    }

    #[test]
    fn test_strided_section_read() {
        let file = grid_file();
        let section = [SectionRange::new(1, 2, 1), SectionRange::new(0, 2, 2)];
        let values = file.read_section("grid", &section).unwrap();
        assert_eq!(values.shape(), &[2, 2]);
        assert_eq!(values.iter().copied().collect::<Vec<_>>(), vec![10.0, 12.0, 20.0, 22.0]);
    }

    #[test]
    fn test_out_of_range_section() {
        let file = grid_file();
        let section = [SectionRange::single(3), SectionRange::new(0, 4, 1)];
        assert!(matches!(
            file.read_section("grid", &section),
            Err(RasterError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_definition_mode_rules() {
        let mut file = MemoryArrayFile::create();
        assert!(file.is_define_mode());
        file.add_dimension("x", 2).unwrap();
        file.add_variable("v", &["x".to_string()], DataType::F32).unwrap();
        let data = array![1.0, 2.0].into_dyn();
        assert!(matches!(
            file.write_section("v", &[0], data.view()),
            Err(RasterError::IllegalState(_))
        ));

        file.end_define().unwrap();
        assert!(!file.is_define_mode());
        file.write_section("v", &[0], data.view()).unwrap();
        assert!(file.add_dimension("y", 1).is_err());
        assert_eq!(file.data("v").unwrap(), &data);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grid.json");
        let file = grid_file().with_global_attribute("title", "test grid");
        file.save(&path).unwrap();

        let loaded = MemoryArrayFile::open_path(&path).unwrap();
        assert_eq!(loaded.data("grid"), file.data("grid"));
        assert_eq!(
            loaded.global_attributes().get("title"),
            Some(&AttrValue::from("test grid"))
        );
    }
}
