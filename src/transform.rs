//! Pixel-to-coordinate transforms

use crate::error::{RasterError, Result};
use ndarray::{Array1, Array2};
use std::fmt;

/// Maps grid (pixel) coordinates to coordinate-system values
pub trait GridToCrs: fmt::Debug {
    /// Number of grid dimensions accepted by [`GridToCrs::transform`]
    fn source_dimensions(&self) -> usize;

    /// Number of coordinates produced
    fn target_dimensions(&self) -> usize;

    /// Transform one grid point
    fn transform(&self, point: &[f64]) -> Result<Vec<f64>>;

    fn is_identity(&self) -> bool {
        false
    }
}

/// Affine transform stored as a homogeneous `(target+1) x (source+1)` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    matrix: Array2<f64>,
}

impl AffineTransform {
    /// Create from a homogeneous matrix whose last row is `[0, .., 0, 1]`
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        let (rows, cols) = matrix.dim();
        if rows < 2 || cols < 2 {
            return Err(RasterError::Metadata(format!(
                "Affine matrix must be at least 2x2, got {}x{}",
                rows, cols
            )));
        }
        let last = matrix.row(rows - 1);
        let homogeneous = last
            .iter()
            .enumerate()
            .all(|(i, &v)| if i == cols - 1 { v == 1.0 } else { v == 0.0 });
        if !homogeneous {
            return Err(RasterError::Metadata(
                "Affine matrix last row must be [0, .., 0, 1]".to_string(),
            ));
        }
        Ok(Self { matrix })
    }

    /// Per-dimension scale and translation: `c[i] = translations[i] + g[i] * scales[i]`
    pub fn from_scale_translate(scales: &[f64], translations: &[f64]) -> Self {
        let n = scales.len().min(translations.len());
        let mut matrix = Array2::zeros((n + 1, n + 1));
        for i in 0..n {
            matrix[[i, i]] = scales[i];
            matrix[[i, n]] = translations[i];
        }
        matrix[[n, n]] = 1.0;
        Self { matrix }
    }

    /// Two-dimensional transform of a north-up raster whose pixel corner
    /// `(0, 0)` lies at `(origin_x, origin_y)`.
    pub fn north_up(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self::from_scale_translate(&[pixel_width, -pixel_height], &[origin_x, origin_y])
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl GridToCrs for AffineTransform {
    fn source_dimensions(&self) -> usize {
        self.matrix.ncols() - 1
    }

    fn target_dimensions(&self) -> usize {
        self.matrix.nrows() - 1
    }

    fn transform(&self, point: &[f64]) -> Result<Vec<f64>> {
        let source = self.source_dimensions();
        if point.len() != source {
            return Err(RasterError::Metadata(format!(
                "Transform expects {} grid coordinates, got {}",
                source,
                point.len()
            )));
        }
        let mut homogeneous: Array1<f64> = Array1::ones(source + 1);
        for (slot, &value) in homogeneous.iter_mut().zip(point) {
            *slot = value;
        }
        let result = self.matrix.dot(&homogeneous);
        let target = self.target_dimensions();
        let coords: Vec<f64> = result.iter().take(target).copied().collect();
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(RasterError::Metadata(format!(
                "Transform produced a non-finite coordinate at {:?}",
                point
            )));
        }
        Ok(coords)
    }

    fn is_identity(&self) -> bool {
        let (rows, cols) = self.matrix.dim();
        rows == cols
            && self
                .matrix
                .indexed_iter()
                .all(|((r, c), &v)| if r == c { v == 1.0 } else { v == 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_north_up_transform() {
        let transform = AffineTransform::north_up(100.0, 0.5, 50.0, 0.25);
        assert_eq!(transform.source_dimensions(), 2);
        assert_eq!(transform.transform(&[0.5, 0.5]).unwrap(), vec![100.25, 49.875]);
        assert!(!transform.is_identity());
    }

    #[test]
    fn test_identity_detection() {
        let transform = AffineTransform::from_scale_translate(&[1.0, 1.0], &[0.0, 0.0]);
        assert!(transform.is_identity());
    }

    #[test]
    fn test_rejects_non_homogeneous_matrix() {
        let matrix = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0]];
        assert!(AffineTransform::new(matrix).is_err());
    }

    #[test]
    fn test_wrong_point_dimension() {
        let transform = AffineTransform::north_up(0.0, 1.0, 0.0, 1.0);
        assert!(matches!(
            transform.transform(&[1.0]),
            Err(RasterError::Metadata(_))
        ));
    }
}
