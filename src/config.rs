//! Adapter configuration
//!
//! Everything the reader and writer can be told up front: role bindings,
//! default slices, which variables are images, per-family row order and the
//! write buffer budget. Loadable from JSON.

use crate::error::{RasterError, Result};
use crate::format::{FileFamily, RowOrder};
use crate::roles::{DimensionRoleRegistry, DimensionSelector};
use crate::slices::{SliceKey, SliceOverrides};
use crate::types::LogicalRole;
use crate::variables::DEFAULT_BUFFER_ELEMENTS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A role and the selector that finds its dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub role: LogicalRole,
    pub selector: DimensionSelector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub bindings: Vec<RoleBinding>,
    /// Default slices applied to every read; per-read slices take precedence
    pub slices: SliceOverrides,
    /// Variables read as images, in order
    pub image_names: Option<Vec<String>>,
    /// Variables read as the bands of a single image
    pub band_names: Option<Vec<String>>,
    pub row_order: BTreeMap<FileFamily, RowOrder>,
    /// Target element count of one write buffer
    pub buffer_elements: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            slices: SliceOverrides::new(),
            image_names: None,
            band_names: None,
            row_order: BTreeMap::new(),
            buffer_elements: DEFAULT_BUFFER_ELEMENTS,
        }
    }
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `role`, replacing an earlier binding of the same role
    pub fn with_binding(mut self, role: LogicalRole, selector: DimensionSelector) -> Self {
        self.bindings.retain(|b| b.role != role);
        self.bindings.push(RoleBinding { role, selector });
        self
    }

    pub fn with_slice(mut self, key: SliceKey, index: usize) -> Self {
        self.slices.set(key, index);
        self
    }

    pub fn with_image_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_band_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.band_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_row_order(mut self, family: FileFamily, order: RowOrder) -> Self {
        self.row_order.insert(family, order);
        self
    }

    pub fn with_buffer_elements(mut self, elements: usize) -> Self {
        self.buffer_elements = elements;
        self
    }

    /// Configured row order of `family`, or the family default
    pub fn row_order_for(&self, family: FileFamily) -> RowOrder {
        self.row_order
            .get(&family)
            .copied()
            .unwrap_or_else(|| family.default_row_order())
    }

    /// Registry holding the configured bindings
    pub fn registry(&self) -> Result<DimensionRoleRegistry> {
        let mut registry = DimensionRoleRegistry::new();
        for binding in &self.bindings {
            registry.bind(binding.role, binding.selector.clone())?;
        }
        Ok(registry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_elements == 0 {
            return Err(RasterError::Configuration(
                "buffer_elements must be positive".to_string(),
            ));
        }
        if self.image_names.is_some() && self.band_names.is_some() {
            return Err(RasterError::Configuration(
                "image_names and band_names are mutually exclusive".to_string(),
            ));
        }
        self.registry().map(|_| ())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AdapterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::AxisMatcher;
    use crate::types::AxisDirection;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.buffer_elements, DEFAULT_BUFFER_ELEMENTS);
        assert_eq!(config.row_order_for(FileFamily::Grib), RowOrder::Ascending);
        assert_eq!(config.row_order_for(FileFamily::NetCdf), RowOrder::Flipped);

        let config = config.with_row_order(FileFamily::NetCdf, RowOrder::Ascending);
        assert_eq!(config.row_order_for(FileFamily::NetCdf), RowOrder::Ascending);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "bindings": [
                {"role": "images", "selector": {"axis": {"names": ["time"], "directions": ["future"]}}},
                {"role": "bands", "selector": {"index": 1}}
            ],
            "slices": [{"key": {"axis": "depth"}, "index": 1}],
            "row_order": {"grid": "ascending"},
            "buffer_elements": 1024
        }"#;
        let config = AdapterConfig::from_json_str(json).unwrap();
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(
            config.bindings[0].selector,
            DimensionSelector::Axis(
                AxisMatcher::names(["time"]).or_direction(AxisDirection::Future)
            )
        );
        assert_eq!(config.row_order_for(FileFamily::Grid), RowOrder::Ascending);
        assert_eq!(config.buffer_elements, 1024);
        assert!(!config.slices.is_empty());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("adapter.json");
        fs::write(&path, r#"{"image_names": ["sst"], "buffer_elements": 512}"#).unwrap();
        let config = AdapterConfig::from_file(&path).unwrap();
        assert_eq!(config.image_names, Some(vec!["sst".to_string()]));
        assert_eq!(config.buffer_elements, 512);
        assert!(matches!(
            AdapterConfig::from_file(temp_dir.path().join("missing.json")),
            Err(RasterError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let json = r#"{"bindings": [{"role": "rows", "selector": {"index": 0}}]}"#;
        assert!(matches!(
            AdapterConfig::from_json_str(json),
            Err(RasterError::Configuration(_))
        ));
        assert!(matches!(
            AdapterConfig::from_json_str(r#"{"buffer_elements": 0}"#),
            Err(RasterError::Configuration(_))
        ));
        assert!(matches!(
            AdapterConfig::from_json_str("{not json"),
            Err(RasterError::Serialization(_))
        ));
    }

    #[test]
    fn test_rebinding_replaces() {
        let config = AdapterConfig::new()
            .with_binding(LogicalRole::Bands, DimensionSelector::Index(0))
            .with_binding(LogicalRole::Bands, DimensionSelector::Index(1));
        assert_eq!(config.bindings.len(), 1);
        let registry = config.registry().unwrap();
        assert_eq!(
            registry.binding(LogicalRole::Bands),
            Some(&DimensionSelector::Index(1))
        );
    }
}
