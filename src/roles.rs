//! Binding of logical raster roles to physical array dimensions
//!
//! COLUMNS and ROWS are always the two fastest-varying storage dimensions.
//! BANDS and IMAGES may be bound to any other dimension, either by explicit
//! storage index or by correlating axis names and directions.

use crate::error::{RasterError, Result};
use crate::types::{AxisDescriptor, AxisDirection, LogicalRole};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Identifiers an axis is correlated against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMatcher {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub directions: Vec<AxisDirection>,
}

impl AxisMatcher {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            directions: Vec::new(),
        }
    }

    pub fn direction(direction: AxisDirection) -> Self {
        Self {
            names: Vec::new(),
            directions: vec![direction],
        }
    }

    pub fn or_direction(mut self, direction: AxisDirection) -> Self {
        self.directions.push(direction);
        self
    }

    /// Name comparison is case-insensitive; direction is the fallback
    pub fn matches(&self, axis: &AxisDescriptor) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(&axis.name))
            || self.directions.contains(&axis.direction)
    }
}

/// How a role finds its dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionSelector {
    /// First axis, from the fastest-varying dimension down, matching the identifiers
    Axis(AxisMatcher),
    /// Explicit dimension index in storage order
    Index(usize),
}

impl DimensionSelector {
    pub fn axis_named(name: impl Into<String>) -> Self {
        DimensionSelector::Axis(AxisMatcher::names([name.into()]))
    }
}

/// Role bindings plus a per-variable resolution memo
#[derive(Debug, Default)]
pub struct DimensionRoleRegistry {
    bindings: BTreeMap<LogicalRole, DimensionSelector>,
    memo: HashMap<(String, LogicalRole), Option<usize>>,
}

impl DimensionRoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a correlation rule for `role`, replacing any previous one.
    pub fn bind(&mut self, role: LogicalRole, selector: DimensionSelector) -> Result<()> {
        match role {
            LogicalRole::Columns | LogicalRole::Rows => {
                return Err(RasterError::Configuration(format!(
                    "{} is fixed to the fastest-varying dimensions and cannot be bound",
                    role
                )));
            }
            LogicalRole::None => {
                return Err(RasterError::Configuration(
                    "NONE is the default role and cannot be bound".to_string(),
                ));
            }
            LogicalRole::Bands | LogicalRole::Images => {}
        }
        if let Some((other, _)) = self
            .bindings
            .iter()
            .find(|(bound, existing)| **bound != role && **existing == selector)
        {
            return Err(RasterError::Configuration(format!(
                "{:?} is already bound to {}",
                selector, other
            )));
        }
        debug!(%role, ?selector, "Bound dimension role");
        self.bindings.insert(role, selector);
        self.memo.clear();
        Ok(())
    }

    pub fn binding(&self, role: LogicalRole) -> Option<&DimensionSelector> {
        self.bindings.get(&role)
    }

    /// Storage indices of the (COLUMNS, ROWS) dimensions for a variable of `rank`
    pub fn raster_dimensions(rank: usize) -> Result<(usize, usize)> {
        if rank < 2 {
            return Err(RasterError::InvalidDimensions(format!(
                "a raster needs at least two dimensions, variable has {}",
                rank
            )));
        }
        Ok((rank - 1, rank - 2))
    }

    /// Storage index of the dimension bound to `role` in `variable`, if any.
    pub fn resolve(
        &mut self,
        role: LogicalRole,
        variable: &str,
        axes: &[AxisDescriptor],
        rank: usize,
    ) -> Result<Option<usize>> {
        if matches!(role, LogicalRole::Columns | LogicalRole::Rows) {
            return Err(RasterError::Configuration(format!(
                "{} cannot be resolved through axis correlation",
                role
            )));
        }
        let key = (variable.to_string(), role);
        if let Some(&cached) = self.memo.get(&key) {
            return Ok(cached);
        }
        let (_, row_dim) = Self::raster_dimensions(rank)?;
        let resolved = match self.bindings.get(&role) {
            None => None,
            Some(DimensionSelector::Index(index)) if *index >= row_dim && *index < rank => {
                return Err(RasterError::Configuration(format!(
                    "{} bound to dimension {} which is a raster dimension of '{}'",
                    role, index, variable
                )));
            }
            Some(DimensionSelector::Index(index)) => (*index < rank).then_some(*index),
            Some(DimensionSelector::Axis(matcher)) => axes
                .iter()
                .filter(|axis| axis.dimension < row_dim)
                .rev()
                .find(|axis| matcher.matches(axis))
                .map(|axis| axis.dimension),
        };
        debug!(%role, variable, ?resolved, "Resolved dimension role");
        self.memo.insert(key, resolved);
        Ok(resolved)
    }

    /// Forget memoized resolutions (file closed or reset)
    pub fn clear_memo(&mut self) {
        self.memo.clear();
    }
}
