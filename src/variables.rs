//! Pixel variables of written images and the buffered sample writer
//!
//! An image becomes either one variable with an internal band dimension, or
//! one variable per band. Samples are written in a single forward pass
//! (band, then row, then pixel) through a buffer holding a whole number of
//! rows. The number of rows is a divisor of the image height, so every flush
//! has the same extent and no flush degenerates into a length-1 trailing
//! section.

use crate::error::{RasterError, Result};
use crate::metadata::band_attributes;
use crate::store::{ArrayFileMut, SectionSink};
use crate::types::{BandDescription, DataType};
use ndarray::{ArrayView3, ArrayViewD, Axis, IxDyn};
use tracing::debug;

/// Default target element count of one write buffer
pub const DEFAULT_BUFFER_ELEMENTS: usize = 65_536;

/// Largest divisor of `height` whose rows hold at most `budget` elements,
/// never less than one row.
pub fn buffer_rows(height: usize, width: usize, budget: usize) -> usize {
    let max_rows = (budget / width.max(1)).max(1).min(height.max(1));
    (1..=max_rows)
        .rev()
        .find(|rows| height % rows == 0)
        .unwrap_or(1)
}

/// Variable-safe form of `raw`: letters, digits and underscores, starting
/// with a letter. `None` when nothing usable remains.
pub fn safe_name(raw: &str) -> Option<String> {
    let mapped: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = mapped.trim_matches('_');
    let first = trimmed.chars().next()?;
    if first.is_ascii_alphabetic() {
        Some(trimmed.to_string())
    } else {
        Some(format!("v{}", trimmed))
    }
}

/// `base`, or `base_2`, `base_3`, ... when taken
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Sample organisation of one image to be written
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLayout {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<BandDescription>,
    pub data_type: DataType,
    pub image_name: Option<String>,
    /// Registered band dimension; `None` stores each band as its own variable
    pub band_dimension: Option<String>,
}

impl SampleLayout {
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandStorage {
    /// One variable; bands along the named dimension
    Internal { dimension: String },
    /// One variable per band
    Separate,
}

/// The variables realizing one image
#[derive(Debug, Clone, PartialEq)]
pub struct VariableGroup {
    pub variables: Vec<String>,
    /// Storage-order dimensions of every variable in the group
    pub dimensions: Vec<String>,
    /// Storage-order shape including the band axis, implicit when bands are
    /// separate variables
    pub shape: Vec<usize>,
    pub band_storage: BandStorage,
}

impl VariableGroup {
    pub fn variable_for_band(&self, band: usize) -> Option<&str> {
        match self.band_storage {
            BandStorage::Internal { .. } => self.variables.first(),
            BandStorage::Separate => self.variables.get(band),
        }
        .map(String::as_str)
    }

    /// Position of the band axis in `shape`
    pub fn band_axis(&self) -> usize {
        self.shape.len() - 3
    }

    pub fn row_axis(&self) -> usize {
        self.shape.len() - 2
    }

    pub fn height(&self) -> usize {
        self.shape[self.row_axis()]
    }

    pub fn width(&self) -> usize {
        self.shape[self.shape.len() - 1]
    }

    pub fn num_bands(&self) -> usize {
        self.shape[self.band_axis()]
    }

    /// Shape of one write into a variable of this group, for `rows` rows
    fn section_shape(&self, rows: usize) -> Vec<usize> {
        let mut shape = vec![1; self.shape.len()];
        let (row_axis, last) = (self.row_axis(), self.shape.len() - 1);
        shape[row_axis] = rows;
        shape[last] = self.width();
        if self.band_storage == BandStorage::Separate {
            shape.remove(self.band_axis());
        }
        shape
    }

    fn section_origin(&self, band: usize, row: usize) -> Vec<usize> {
        let mut origin = vec![0; self.shape.len()];
        let row_axis = self.row_axis();
        origin[row_axis] = row;
        if self.band_storage == BandStorage::Separate {
            origin.remove(self.band_axis());
        } else {
            let band_axis = self.band_axis();
            origin[band_axis] = band;
        }
        origin
    }
}

pub struct VariableSetBuilder;

impl VariableSetBuilder {
    /// Declare the variables of one image.
    ///
    /// `dimensions` and `lengths` are the image's non-band dimensions in
    /// storage order: extra dimensions first, then rows, then columns.
    pub fn create_variables<F: ArrayFileMut + ?Sized>(
        file: &mut F,
        layout: &SampleLayout,
        dimensions: &[String],
        lengths: &[usize],
    ) -> Result<VariableGroup> {
        if dimensions.len() < 2 || dimensions.len() != lengths.len() {
            return Err(RasterError::InvalidDimensions(format!(
                "an image needs at least two dimensions with lengths, got {:?} / {:?}",
                dimensions, lengths
            )));
        }
        if layout.bands.is_empty() {
            return Err(RasterError::InvalidDimensions(
                "an image needs at least one band".to_string(),
            ));
        }
        let band_position = dimensions.len() - 2;
        let mut shape = lengths.to_vec();
        shape.insert(band_position, layout.num_bands());

        let (band_storage, storage_dims) = match &layout.band_dimension {
            Some(dimension) => {
                let mut dims = dimensions.to_vec();
                dims.insert(band_position, dimension.clone());
                (
                    BandStorage::Internal {
                        dimension: dimension.clone(),
                    },
                    dims,
                )
            }
            None => (BandStorage::Separate, dimensions.to_vec()),
        };

        let image_name = layout.image_name.as_deref().and_then(safe_name);
        let mut variables = Vec::new();
        match band_storage {
            BandStorage::Internal { .. } => {
                let base = image_name.unwrap_or_else(|| "data".to_string());
                let name = unique_name(&base, |n| file.has_variable(n));
                Self::declare(file, &name, &storage_dims, layout.data_type, &layout.bands[0])?;
                variables.push(name);
            }
            BandStorage::Separate => {
                for (index, band) in layout.bands.iter().enumerate() {
                    let base = band
                        .name
                        .as_deref()
                        .and_then(safe_name)
                        .or_else(|| image_name.clone().filter(|_| layout.num_bands() == 1))
                        .unwrap_or_else(|| format!("band_{}", index + 1));
                    let name = unique_name(&base, |n| file.has_variable(n));
                    Self::declare(file, &name, &storage_dims, layout.data_type, band)?;
                    variables.push(name);
                }
            }
        }

        Ok(VariableGroup {
            variables,
            dimensions: storage_dims,
            shape,
            band_storage,
        })
    }

    fn declare<F: ArrayFileMut + ?Sized>(
        file: &mut F,
        name: &str,
        dimensions: &[String],
        data_type: DataType,
        band: &BandDescription,
    ) -> Result<()> {
        file.add_variable(name, dimensions, data_type)?;
        for (attribute, value) in band_attributes(band) {
            file.put_attribute(name, attribute, value)?;
        }
        debug!(variable = name, ?dimensions, %data_type, "Declared pixel variable");
        Ok(())
    }
}

/// Writes the samples of one image into its variable group.
///
/// `samples` is indexed `[band, row, column]` with rows top-down. When
/// `flip` is set the rows are stored bottom-up.
pub struct SampleWriter<'a> {
    group: &'a VariableGroup,
    samples: ArrayView3<'a, f64>,
    flip: bool,
    buffer_rows: usize,
    buffer: Vec<f64>,
    remaining: usize,
}

impl<'a> SampleWriter<'a> {
    pub fn new(
        group: &'a VariableGroup,
        samples: ArrayView3<'a, f64>,
        flip: bool,
        budget: usize,
    ) -> Result<Self> {
        let (bands, height, width) = samples.dim();
        if bands != group.num_bands() || height != group.height() || width != group.width() {
            return Err(RasterError::InvalidDimensions(format!(
                "samples of shape {:?} do not fit variable shape {:?}",
                samples.shape(),
                group.shape
            )));
        }
        let buffer_rows = buffer_rows(height, width, budget);
        Ok(Self {
            group,
            samples,
            flip,
            buffer_rows,
            buffer: Vec::with_capacity(buffer_rows * width),
            remaining: bands * height * width,
        })
    }

    pub fn buffer_rows(&self) -> usize {
        self.buffer_rows
    }

    /// Samples not yet flushed
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn write_all<S: SectionSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let samples = self.samples;
        let width = self.group.width();
        for (band, plane) in samples.axis_iter(Axis(0)).enumerate() {
            let mut first_row = 0;
            for (row, line) in plane.axis_iter(Axis(0)).enumerate() {
                self.buffer.extend(line.iter().copied());
                if self.buffer.len() == self.buffer_rows * width {
                    self.flush(sink, band, first_row)?;
                    first_row = row + 1;
                }
            }
            if !self.buffer.is_empty() {
                self.flush(sink, band, first_row)?;
            }
        }
        Ok(())
    }

    fn flush<S: SectionSink + ?Sized>(
        &mut self,
        sink: &mut S,
        band: usize,
        first_row: usize,
    ) -> Result<()> {
        let group = self.group;
        let width = group.width();
        let rows = self.buffer.len() / width;
        let start_row = if self.flip {
            reverse_rows(&mut self.buffer, width);
            group.height() - (first_row + rows)
        } else {
            first_row
        };
        let variable = group
            .variable_for_band(band)
            .ok_or_else(|| RasterError::NotFound(format!("variable for band {}", band)))?;
        let origin = group.section_origin(band, start_row);
        let shape = group.section_shape(rows);
        let result = ArrayViewD::from_shape(IxDyn(&shape), &self.buffer)
            .map_err(|e| RasterError::Backend(e.to_string()))
            .and_then(|data| sink.write_section(variable, &origin, data));
        self.buffer.clear();
        result.map_err(|e| e.in_section(variable, band, &origin, &shape))?;
        self.remaining -= rows * width;
        debug!(variable, band, ?origin, rows, remaining = self.remaining, "Flushed sample buffer");
        Ok(())
    }
}

fn reverse_rows(buffer: &mut [f64], width: usize) {
    let rows = buffer.len() / width;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        for column in 0..width {
            buffer.swap(top * width + column, bottom * width + column);
        }
    }
}
