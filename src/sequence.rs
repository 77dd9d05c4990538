//! Coordinate sequences for output dimensions
//!
//! On write every output dimension gets a coordinate sequence. The sequence is
//! produced by the first applicable strategy:
//!
//! 1. the axis's own discrete values (exact round trip of a previous read),
//! 2. plain grid indices when no pixel-to-coordinate transform covers the dimension,
//! 3. the transform evaluated at pixel centers.
//!
//! The row dimension is then reversed, since array files store rows in the
//! opposite order of the raster's top-down convention.

use crate::axes::AxisValues;
use crate::error::{RasterError, Result};
use crate::transform::GridToCrs;
use serde::{Deserialize, Serialize};

/// How the values of a sequence were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Discrete,
    Index,
    Computed,
}

/// Coordinate sequence of one output dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSpec {
    pub length: usize,
    pub stride: usize,
    pub start: usize,
    pub kind: SequenceKind,
    pub flipped: bool,
    pub values: Vec<f64>,
}

/// Inputs for building the sequence of one grid dimension
#[derive(Debug, Clone, Copy)]
pub struct SequenceRequest<'a> {
    /// Logical grid dimension (0 = columns, 1 = rows, ...)
    pub dimension: usize,
    /// Number of grid cells along this dimension in the source grid
    pub extent: usize,
    pub start: usize,
    /// Number of source cells covered
    pub span: usize,
    pub stride: usize,
    /// Discrete values carried by the axis, one per grid cell when known
    pub values: &'a AxisValues,
    pub transform: Option<&'a dyn GridToCrs>,
    /// Source region as `(start, span)` per grid dimension
    pub region: &'a [(usize, usize)],
    /// Ignore discrete values and recompute coordinates
    pub resample: bool,
    pub flip: bool,
}

impl SequenceRequest<'_> {
    pub fn output_length(&self) -> usize {
        sequence_length(self.span, self.stride)
    }

    fn source_index(&self, i: usize) -> usize {
        self.start + i * self.stride
    }

    fn transform_covers_dimension(&self) -> bool {
        self.transform.is_some_and(|t| {
            self.dimension < t.source_dimensions() && self.dimension < t.target_dimensions()
        })
    }
}

/// `ceil(span / stride)`
pub fn sequence_length(span: usize, stride: usize) -> usize {
    let stride = stride.max(1);
    (span + stride - 1) / stride
}

type Strategy = fn(&SequenceRequest<'_>) -> Result<Option<Vec<f64>>>;

const STRATEGIES: &[(SequenceKind, Strategy)] = &[
    (SequenceKind::Discrete, discrete_values),
    (SequenceKind::Index, index_sequence),
    (SequenceKind::Computed, computed_coordinates),
];

/// Copy the axis's discrete values, one per output cell.
pub fn discrete_values(request: &SequenceRequest<'_>) -> Result<Option<Vec<f64>>> {
    if request.resample || request.values.is_empty() || request.values.len() != request.extent {
        return Ok(None);
    }
    let values = (0..request.output_length())
        .map(|i| request.values.numeric_at(request.source_index(i)))
        .collect::<Option<Vec<f64>>>();
    Ok(values)
}

/// Plain grid indices `start, start+stride, ...`.
pub fn index_sequence(request: &SequenceRequest<'_>) -> Result<Option<Vec<f64>>> {
    if request.transform_covers_dimension() {
        return Ok(None);
    }
    Ok(Some(
        (0..request.output_length())
            .map(|i| request.source_index(i) as f64)
            .collect(),
    ))
}

/// Transform evaluated at the center of each output cell along this
/// dimension, other dimensions held at the source region center.
pub fn computed_coordinates(request: &SequenceRequest<'_>) -> Result<Option<Vec<f64>>> {
    let Some(transform) = request.transform else {
        return Ok(None);
    };
    if !request.transform_covers_dimension() {
        return Ok(None);
    }
    let mut point: Vec<f64> = (0..transform.source_dimensions())
        .map(|d| {
            request
                .region
                .get(d)
                .map(|&(start, span)| start as f64 + span as f64 / 2.0)
                .unwrap_or(0.0)
        })
        .collect();
    let mut values = Vec::with_capacity(request.output_length());
    for i in 0..request.output_length() {
        point[request.dimension] = request.start as f64 + (i as f64 + 0.5) * request.stride as f64;
        let coords = transform.transform(&point).map_err(|e| {
            RasterError::Metadata(format!(
                "cannot compute coordinate {} of dimension {}: {}",
                i, request.dimension, e
            ))
        })?;
        values.push(coords[request.dimension]);
    }
    Ok(Some(values))
}

/// Build the coordinate sequence for one output dimension.
pub fn build(request: &SequenceRequest<'_>) -> Result<SequenceSpec> {
    let length = request.output_length();
    for (kind, strategy) in STRATEGIES {
        if let Some(mut values) = strategy(request)? {
            debug_assert_eq!(values.len(), length);
            if request.flip {
                values.reverse();
            }
            return Ok(SequenceSpec {
                length,
                stride: request.stride,
                start: request.start,
                kind: *kind,
                flipped: request.flip,
                values,
            });
        }
    }
    Err(RasterError::Metadata(format!(
        "no coordinate sequence applies to dimension {}",
        request.dimension
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::AffineTransform;

    fn request<'a>(
        values: &'a AxisValues,
        transform: Option<&'a dyn GridToCrs>,
        region: &'a [(usize, usize)],
        dimension: usize,
    ) -> SequenceRequest<'a> {
        let (start, span) = region[dimension];
        SequenceRequest {
            dimension,
            extent: span,
            start,
            span,
            stride: 1,
            values,
            transform,
            region,
            resample: false,
            flip: false,
        }
    }

    #[test]
    fn test_length_is_ceiling() {
        assert_eq!(sequence_length(10, 1), 10);
        assert_eq!(sequence_length(10, 3), 4);
        assert_eq!(sequence_length(9, 3), 3);
        assert_eq!(sequence_length(1, 5), 1);
    }

    #[test]
    fn test_index_sequence_with_stride() {
        let none = AxisValues::None;
        let region = [(0, 20), (0, 5)];
        for stride in 1..=7 {
            let mut req = request(&none, None, &region, 0);
            req.start = 2;
            req.span = 17;
            req.stride = stride;
            let spec = build(&req).unwrap();
            assert_eq!(spec.kind, SequenceKind::Index);
            assert_eq!(spec.length, (17 + stride - 1) / stride);
            for (i, value) in spec.values.iter().enumerate() {
                assert_eq!(*value, (2 + i * stride) as f64);
            }
        }
    }

    #[test]
    fn test_discrete_values_preferred() {
        let values = AxisValues::Numeric(vec![5.0, 6.0, 7.0]);
        let transform = AffineTransform::north_up(0.0, 1.0, 0.0, 1.0);
        let region = [(0, 3), (0, 2)];
        let spec = build(&request(&values, Some(&transform), &region, 0)).unwrap();
        assert_eq!(spec.kind, SequenceKind::Discrete);
        assert_eq!(spec.values, vec![5.0, 6.0, 7.0]);

        let mut resampled = request(&values, Some(&transform), &region, 0);
        resampled.resample = true;
        assert_eq!(build(&resampled).unwrap().kind, SequenceKind::Computed);
    }

    #[test]
    fn test_computed_row_sequence_is_flipped() {
        let none = AxisValues::None;
        let transform = AffineTransform::north_up(100.0, 2.0, 50.0, 2.0);
        let region = [(0, 10), (0, 5)];

        let columns = build(&request(&none, Some(&transform), &region, 0)).unwrap();
        assert_eq!(columns.kind, SequenceKind::Computed);
        assert_eq!(columns.values[0], 101.0);
        assert_eq!(columns.length, 10);

        let unflipped = build(&request(&none, Some(&transform), &region, 1)).unwrap();
        let mut flipped_req = request(&none, Some(&transform), &region, 1);
        flipped_req.flip = true;
        let flipped = build(&flipped_req).unwrap();

        let mut reversed = unflipped.values.clone();
        reversed.reverse();
        assert_eq!(flipped.values, reversed);
        assert_eq!(flipped.values, vec![41.0, 43.0, 45.0, 47.0, 49.0]);
    }

    #[derive(Debug)]
    struct FailingTransform;

    impl GridToCrs for FailingTransform {
        fn source_dimensions(&self) -> usize {
            2
        }
        fn target_dimensions(&self) -> usize {
            2
        }
        fn transform(&self, _point: &[f64]) -> Result<Vec<f64>> {
            Err(RasterError::Metadata("singular".to_string()))
        }
    }

    #[test]
    fn test_transform_failure_is_fatal() {
        let none = AxisValues::None;
        let region = [(0, 4), (0, 4)];
        let failing = FailingTransform;
        assert!(matches!(
            build(&request(&none, Some(&failing), &region, 0)),
            Err(RasterError::Metadata(_))
        ));
    }

    #[test]
    fn test_dimension_beyond_transform_uses_indices() {
        let none = AxisValues::None;
        let transform = AffineTransform::north_up(0.0, 1.0, 0.0, 1.0);
        let region = [(0, 4), (0, 4), (0, 1)];
        let spec = build(&request(&none, Some(&transform), &region, 2)).unwrap();
        assert_eq!(spec.kind, SequenceKind::Index);
        assert_eq!(spec.values, vec![0.0]);
    }
}
