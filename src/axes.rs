//! Coordinate axes of array-file variables, cached per variable

use crate::error::Result;
use crate::store::ArrayFile;
use crate::temporal::TemporalConverter;
use crate::types::AxisDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Discrete values carried by a coordinate axis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum AxisValues {
    /// No values known; only the axis identity is available
    #[default]
    None,
    Numeric(Vec<f64>),
    /// Instants decoded from `raw`, the offsets as stored in the file
    Temporal {
        instants: Vec<DateTime<Utc>>,
        raw: Vec<f64>,
        converter: TemporalConverter,
    },
}

impl AxisValues {
    pub fn len(&self) -> usize {
        match self {
            AxisValues::None => 0,
            AxisValues::Numeric(values) => values.len(),
            AxisValues::Temporal { instants, .. } => instants.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric value at `index`. Temporal values give back their stored
    /// offset, falling back to the converter when none was kept.
    pub fn numeric_at(&self, index: usize) -> Option<f64> {
        match self {
            AxisValues::None => None,
            AxisValues::Numeric(values) => values.get(index).copied(),
            AxisValues::Temporal {
                instants,
                raw,
                converter,
            } => raw
                .get(index)
                .copied()
                .or_else(|| instants.get(index).map(|t| converter.to_numeric(t))),
        }
    }

    /// Values at `start, start+stride, ...` (`count` of them)
    pub fn subsample(&self, start: usize, count: usize, stride: usize) -> AxisValues {
        self.select((0..count).map(|i| start + i * stride))
    }

    /// Values at the given indices; indices past the end are skipped
    pub fn select(&self, indices: impl IntoIterator<Item = usize>) -> AxisValues {
        let indices = indices.into_iter();
        match self {
            AxisValues::None => AxisValues::None,
            AxisValues::Numeric(values) => {
                AxisValues::Numeric(indices.filter_map(|i| values.get(i).copied()).collect())
            }
            AxisValues::Temporal {
                instants,
                raw,
                converter,
            } => {
                let (instants, raw) = indices
                    .filter_map(|i| Some((*instants.get(i)?, raw.get(i).copied())))
                    .unzip::<_, _, Vec<_>, Vec<_>>();
                AxisValues::Temporal {
                    instants,
                    // a partial raw list would misalign with the instants
                    raw: raw.into_iter().collect::<Option<Vec<_>>>().unwrap_or_default(),
                    converter: converter.clone(),
                }
            }
        }
    }

    /// Interpret raw numbers using `units`, producing temporal values when the
    /// units describe an offset from an epoch.
    pub fn from_raw(raw: Vec<f64>, units: &str) -> AxisValues {
        if let Some(converter) = TemporalConverter::parse(units) {
            let instants: Option<Vec<_>> = raw.iter().map(|&v| converter.to_instant(v)).collect();
            if let Some(instants) = instants {
                return AxisValues::Temporal {
                    instants,
                    raw,
                    converter,
                };
            }
        }
        AxisValues::Numeric(raw)
    }
}

/// A coordinate axis: its identity plus any values it carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateAxis {
    pub descriptor: AxisDescriptor,
    pub values: AxisValues,
}

impl CoordinateAxis {
    pub fn new(descriptor: AxisDescriptor, values: AxisValues) -> Self {
        Self { descriptor, values }
    }
}

/// Per-variable cache of coordinate axes, in storage order
#[derive(Debug, Default)]
pub struct AxisCatalog {
    cache: HashMap<String, Vec<CoordinateAxis>>,
}

impl AxisCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinate axes of `variable`, discovered once then served from cache
    pub fn axes<F: ArrayFile + ?Sized>(
        &mut self,
        file: &F,
        variable: &str,
    ) -> Result<&[CoordinateAxis]> {
        if !self.cache.contains_key(variable) {
            let mut axes = file.coordinate_axes(variable)?;
            axes.sort_by_key(|axis| axis.descriptor.dimension);
            debug!(variable, count = axes.len(), "Discovered coordinate axes");
            self.cache.insert(variable.to_string(), axes);
        }
        Ok(self.cache.get(variable).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Axis descriptors of `variable` without their values
    pub fn descriptors<F: ArrayFile + ?Sized>(
        &mut self,
        file: &F,
        variable: &str,
    ) -> Result<Vec<AxisDescriptor>> {
        Ok(self
            .axes(file, variable)?
            .iter()
            .map(|axis| axis.descriptor.clone())
            .collect())
    }

    pub fn is_cached(&self, variable: &str) -> bool {
        self.cache.contains_key(variable)
    }

    /// Drop every cached entry (file closed or reset)
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}

/// The axis describing storage dimension `dimension`, if any
pub fn axis_for_dimension(axes: &[CoordinateAxis], dimension: usize) -> Option<&CoordinateAxis> {
    axes.iter().find(|axis| axis.descriptor.dimension == dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryArrayFile;
    use crate::types::AxisDirection;
    use ndarray::{ArrayD, IxDyn};

    fn sample_file() -> MemoryArrayFile {
        MemoryArrayFile::new()
            .with_dimension("time", 2)
            .with_dimension("lat", 3)
            .with_dimension("lon", 4)
            .with_coordinate("time", vec![0.0, 24.0], "hours since 2020-01-01 00:00:00", Some("T"))
            .with_coordinate("lat", vec![10.0, 20.0, 30.0], "degrees_north", None)
            .with_coordinate("lon", vec![1.0, 2.0, 3.0, 4.0], "degrees_east", None)
            .with_variable(
                "sst",
                &["time", "lat", "lon"],
                ArrayD::zeros(IxDyn(&[2, 3, 4])),
            )
    }

    #[test]
    fn test_catalog_discovers_and_caches() {
        let file = sample_file();
        let mut catalog = AxisCatalog::new();
        let axes = catalog.axes(&file, "sst").unwrap();
        assert_eq!(axes.len(), 3);
        assert_eq!(axes[0].descriptor.direction, AxisDirection::Future);
        assert_eq!(axes[1].descriptor.direction, AxisDirection::North);
        assert_eq!(axes[2].descriptor.name, "lon");
        assert!(matches!(axes[0].values, AxisValues::Temporal { .. }));
        assert!(catalog.is_cached("sst"));

        catalog.invalidate();
        assert!(!catalog.is_cached("sst"));
    }

    #[test]
    fn test_temporal_values_convert_back() {
        let values = AxisValues::from_raw(vec![0.0, 36.0], "hours since 2020-01-01 00:00:00");
        assert_eq!(values.numeric_at(1), Some(36.0));
        assert_eq!(values.select([1, 0]).numeric_at(0), Some(36.0));
    }

    #[test]
    fn test_temporal_values_keep_sub_millisecond_offsets() {
        let raw = vec![0.0, 0.123456789, 1.0000001];
        let values = AxisValues::from_raw(raw.clone(), "hours since 2024-01-01 00:00:00");
        assert!(matches!(values, AxisValues::Temporal { .. }));
        let stored: Vec<f64> = (0..3).filter_map(|i| values.numeric_at(i)).collect();
        assert_eq!(stored, raw);
        assert_eq!(values.subsample(1, 2, 1).numeric_at(0), Some(0.123456789));
    }

    #[test]
    fn test_temporal_values_without_raw_use_converter() {
        let converter = TemporalConverter::parse("days since 2020-01-01").unwrap();
        let instant = converter.to_instant(2.5).unwrap();
        let values = AxisValues::Temporal {
            instants: vec![instant],
            raw: Vec::new(),
            converter,
        };
        assert_eq!(values.numeric_at(0), Some(2.5));
    }

    #[test]
    fn test_subsample() {
        let values = AxisValues::Numeric(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            values.subsample(1, 2, 2),
            AxisValues::Numeric(vec![1.0, 3.0])
        );
    }
}
