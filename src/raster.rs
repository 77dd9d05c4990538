//! Banded raster images and sample conversion

use crate::axes::{AxisValues, CoordinateAxis};
use crate::transform::AffineTransform;
use crate::types::{AxisDescriptor, AxisDirection, BandDescription};
use ndarray::{Array3, Axis};
use num_traits::{NumCast, Zero};

/// Converts a stored sample to the destination sample type
pub trait SampleConverter<T> {
    fn convert(&self, sample: f64) -> T;
}

/// Numeric cast following the destination type's own rules; unrepresentable
/// samples become zero. The identity for `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CastConverter;

impl<T: NumCast + Zero> SampleConverter<T> for CastConverter {
    fn convert(&self, sample: f64) -> T {
        T::from(sample).unwrap_or_else(T::zero)
    }
}

/// Converter backed by a closure
#[derive(Debug, Clone, Copy)]
pub struct FnConverter<F>(pub F);

impl<T, F: Fn(f64) -> T> SampleConverter<T> for FnConverter<F> {
    fn convert(&self, sample: f64) -> T {
        (self.0)(sample)
    }
}

/// Geometry of a raster image: one coordinate axis per logical dimension
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGrid {
    /// Columns, rows, then any non-raster dimensions, in logical order
    pub axes: Vec<CoordinateAxis>,
    /// Present when the bands come from a band dimension
    pub band_axis: Option<CoordinateAxis>,
    pub transform: Option<AffineTransform>,
}

impl ImageGrid {
    /// Plain `x`/`y` grid without coordinate values
    pub fn new() -> Self {
        Self {
            axes: vec![
                CoordinateAxis::new(
                    AxisDescriptor::new("x", AxisDirection::East, "", 1),
                    AxisValues::None,
                ),
                CoordinateAxis::new(
                    AxisDescriptor::new("y", AxisDirection::North, "", 0),
                    AxisValues::None,
                ),
            ],
            band_axis: None,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: AffineTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Replace the axis of logical dimension `dimension` (0 = columns, 1 = rows)
    pub fn with_axis(mut self, dimension: usize, axis: CoordinateAxis) -> Self {
        if dimension < self.axes.len() {
            self.axes[dimension] = axis;
        } else {
            self.axes.push(axis);
        }
        self
    }

    /// Append a non-raster dimension of length one
    pub fn with_extra_axis(mut self, axis: CoordinateAxis) -> Self {
        self.axes.push(axis);
        self
    }

    pub fn with_band_axis(mut self, axis: CoordinateAxis) -> Self {
        self.band_axis = Some(axis);
        self
    }
}

impl Default for ImageGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// A banded raster: samples indexed `[band, row, column]`, rows top-down
#[derive(Debug, Clone)]
pub struct Raster<T = f64> {
    pub data: Array3<T>,
    pub bands: Vec<BandDescription>,
    pub grid: ImageGrid,
    /// Name of the variable the raster was read from, if any
    pub name: Option<String>,
    /// Number of bands fully copied; less than the band count after an abort
    pub bands_read: usize,
    pub aborted: bool,
}

impl<T: Clone + Zero> Raster<T> {
    pub fn zeros(bands: usize, height: usize, width: usize) -> Self {
        Self::from_array(Array3::zeros((bands, height, width)))
    }
}

impl<T> Raster<T> {
    pub fn from_array(data: Array3<T>) -> Self {
        let bands = data.len_of(Axis(0));
        Self {
            data,
            bands: vec![BandDescription::default(); bands],
            grid: ImageGrid::new(),
            name: None,
            bands_read: bands,
            aborted: false,
        }
    }

    pub fn with_grid(mut self, grid: ImageGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_bands(mut self, bands: Vec<BandDescription>) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn num_bands(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Band description, or a default one when none was supplied
    pub fn band_description(&self, band: usize) -> BandDescription {
        self.bands.get(band).cloned().unwrap_or_default()
    }
}
