//! Writing raster images into array files
//!
//! Writing is a three step session: [`RasterWriter::prepare`] declares global
//! attributes, [`RasterWriter::append_image`] declares the dimensions and
//! variables of each image, and [`RasterWriter::finish`] leaves definition
//! mode, writes every coordinate sequence and then every image's samples.

use crate::axes::CoordinateAxis;
use crate::config::AdapterConfig;
use crate::error::{RasterError, Result};
use crate::format::FileFamily;
use crate::raster::Raster;
use crate::sequence::{self, sequence_length, SequenceRequest, SequenceSpec};
use crate::store::{ArrayFileMut, SectionSink};
use crate::transform::GridToCrs;
use crate::types::{AttrValue, AxisDescriptor, AxisDirection, DataType, Region};
use crate::variables::{
    safe_name, unique_name, SampleLayout, SampleWriter, VariableGroup, VariableSetBuilder,
};
use ndarray::{Array3, ArrayView1};
use num_traits::ToPrimitive;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-image write parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteParams {
    /// Source region; the whole raster when `None`
    pub region: Option<Region>,
    /// Column and row subsampling periods; `(1, 1)` when `None`
    pub subsampling: Option<(usize, usize)>,
    /// Recompute coordinates from the transform instead of copying axis values
    pub resample: bool,
    /// Target element count of one write buffer, over the configured budget
    pub buffer_elements: Option<usize>,
    /// Name of the pixel variable; defaults to the raster's name
    pub image_name: Option<String>,
    pub data_type: Option<DataType>,
}

impl WriteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_subsampling(mut self, x: usize, y: usize) -> Self {
        self.subsampling = Some((x, y));
        self
    }

    pub fn with_resample(mut self, resample: bool) -> Self {
        self.resample = resample;
        self
    }

    pub fn with_buffer_elements(mut self, elements: usize) -> Self {
        self.buffer_elements = Some(elements);
        self
    }

    pub fn with_image_name(mut self, name: impl Into<String>) -> Self {
        self.image_name = Some(name.into());
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Defining,
    Finished,
}

/// A physical dimension and the coordinate sequence stored in its variable
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredDimension {
    pub name: String,
    pub descriptor: AxisDescriptor,
    pub sequence: SequenceSpec,
}

impl RegisteredDimension {
    fn matches(&self, descriptor: &AxisDescriptor, sequence: &SequenceSpec) -> bool {
        self.descriptor.same_identity(descriptor) && self.sequence.values == sequence.values
    }
}

struct PendingImage {
    group: VariableGroup,
    samples: Array3<f64>,
    flip: bool,
    budget: usize,
}

/// Writes raster images into an [`ArrayFileMut`]
pub struct RasterWriter<F: ArrayFileMut> {
    file: F,
    family: FileFamily,
    config: AdapterConfig,
    state: WriterState,
    dimensions: Vec<RegisteredDimension>,
    images: Vec<PendingImage>,
}

impl<F: ArrayFileMut> RasterWriter<F> {
    /// `file` must be in definition mode
    pub fn new(file: F, family: FileFamily, config: AdapterConfig) -> Self {
        Self {
            file,
            family,
            config,
            state: WriterState::Idle,
            dimensions: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn file(&self) -> &F {
        &self.file
    }

    pub fn into_inner(self) -> F {
        self.file
    }

    pub fn dimensions(&self) -> &[RegisteredDimension] {
        &self.dimensions
    }

    /// Start a write session, declaring `metadata` as global attributes
    pub fn prepare(&mut self, metadata: &BTreeMap<String, AttrValue>) -> Result<()> {
        match self.state {
            WriterState::Idle => {}
            WriterState::Defining => {
                return Err(RasterError::IllegalState(
                    "prepare called twice without finish".to_string(),
                ))
            }
            WriterState::Finished => return Err(finished()),
        }
        for (name, value) in metadata {
            self.file.put_global_attribute(name, value.clone())?;
        }
        self.state = WriterState::Defining;
        info!(family = %self.family, attributes = metadata.len(), "Prepared write session");
        Ok(())
    }

    /// Declare the dimensions and variables of one image and queue its samples
    pub fn append_image<T>(
        &mut self,
        raster: &Raster<T>,
        params: &WriteParams,
    ) -> Result<VariableGroup>
    where
        T: Clone + ToPrimitive,
    {
        match self.state {
            WriterState::Defining => {}
            WriterState::Idle => {
                return Err(RasterError::IllegalState(
                    "append_image called before prepare".to_string(),
                ))
            }
            WriterState::Finished => return Err(finished()),
        }
        let (width, height) = (raster.width(), raster.height());
        let region = params.region.unwrap_or_else(|| Region::full(width, height));
        if !region.fits_within(width, height) {
            return Err(RasterError::OutOfBounds(format!(
                "region {:?} outside raster of {}x{}",
                region, width, height
            )));
        }
        let (sx, sy) = params.subsampling.unwrap_or((1, 1));
        if sx == 0 || sy == 0 {
            return Err(RasterError::Configuration(format!(
                "subsampling periods must be positive, got ({}, {})",
                sx, sy
            )));
        }
        let flip = self.config.row_order_for(self.family).needs_flip();
        let out_w = sequence_length(region.width, sx);
        let out_h = sequence_length(region.height, sy);

        let axes = &raster.grid.axes;
        let mut source_region = vec![(region.x, region.width), (region.y, region.height)];
        source_region.extend(axes.iter().skip(2).map(|_| (0, 1)));
        let transform = raster.grid.transform.as_ref().map(|t| t as &dyn GridToCrs);

        // Every sequence is built before anything is declared, so a failed
        // transform leaves the file untouched.
        let mut specs = Vec::with_capacity(axes.len());
        for (dimension, axis) in axes.iter().enumerate() {
            let (start, span) = source_region[dimension];
            let (extent, stride) = match dimension {
                0 => (width, sx),
                1 => (height, sy),
                _ => (1, 1),
            };
            let request = SequenceRequest {
                dimension,
                extent,
                start,
                span,
                stride,
                values: &axis.values,
                transform,
                region: &source_region,
                resample: params.resample,
                flip: flip && dimension == 1,
            };
            specs.push(sequence::build(&request)?);
        }
        let band_spec = match &raster.grid.band_axis {
            Some(axis) => Some((axis, band_sequence(axis, raster.num_bands())?)),
            None => None,
        };

        let registered = self.dimensions.len();
        let declared = self.declare_image(raster, params, axes, specs, band_spec, (out_w, out_h));
        let group = match declared {
            Ok(group) => group,
            Err(e) => {
                // Partially declared dimensions are not reused or written
                self.dimensions.truncate(registered);
                return Err(e);
            }
        };

        let samples = Array3::from_shape_fn((raster.num_bands(), out_h, out_w), |(b, r, c)| {
            raster.data[[b, region.y + r * sy, region.x + c * sx]]
                .to_f64()
                .unwrap_or(f64::NAN)
        });
        info!(variables = ?group.variables, width = out_w, height = out_h, "Appended image");
        self.images.push(PendingImage {
            group: group.clone(),
            samples,
            flip,
            budget: params.buffer_elements.unwrap_or(self.config.buffer_elements),
        });
        Ok(group)
    }

    /// Register the dimensions of one image and create its variables
    fn declare_image<T>(
        &mut self,
        raster: &Raster<T>,
        params: &WriteParams,
        axes: &[CoordinateAxis],
        specs: Vec<SequenceSpec>,
        band_spec: Option<(&CoordinateAxis, SequenceSpec)>,
        (out_w, out_h): (usize, usize),
    ) -> Result<VariableGroup> {
        let mut logical_dims = Vec::with_capacity(specs.len());
        for (axis, spec) in axes.iter().zip(specs) {
            logical_dims.push(self.register_dimension(&axis.descriptor, spec)?);
        }
        let band_dimension = match band_spec {
            Some((axis, spec)) => Some(self.register_dimension(&axis.descriptor, spec)?.0),
            None => None,
        };

        let storage_dims: Vec<String> =
            logical_dims.iter().rev().map(|(name, _)| name.clone()).collect();
        let lengths: Vec<usize> = logical_dims.iter().rev().map(|(_, len)| *len).collect();
        let layout = SampleLayout {
            width: out_w,
            height: out_h,
            bands: (0..raster.num_bands()).map(|b| raster.band_description(b)).collect(),
            data_type: params.data_type.unwrap_or_default(),
            image_name: params.image_name.clone().or_else(|| raster.name.clone()),
            band_dimension,
        };
        VariableSetBuilder::create_variables(&mut self.file, &layout, &storage_dims, &lengths)
    }

    /// Reuse a structurally equal dimension, or declare a new one with its
    /// coordinate variable. Returns the dimension name and length.
    fn register_dimension(
        &mut self,
        descriptor: &AxisDescriptor,
        sequence: SequenceSpec,
    ) -> Result<(String, usize)> {
        if let Some(existing) = self.dimensions.iter().find(|d| d.matches(descriptor, &sequence)) {
            debug!(dimension = %existing.name, "Reusing dimension");
            return Ok((existing.name.clone(), existing.sequence.length));
        }
        let base = safe_name(&descriptor.name).unwrap_or_else(|| "dim".to_string());
        let file = &self.file;
        let name = unique_name(&base, |n| file.has_dimension(n) || file.has_variable(n));
        let length = sequence.length;

        self.file.add_dimension(&name, length)?;
        self.file.add_variable(&name, &[name.clone()], DataType::F64)?;
        self.file
            .put_attribute(&name, "long_name", AttrValue::from(descriptor.name.as_str()))?;
        if !descriptor.unit.is_empty() {
            self.file
                .put_attribute(&name, "units", AttrValue::from(descriptor.unit.as_str()))?;
        }
        if let Some(letter) = descriptor.direction.axis_letter() {
            self.file.put_attribute(&name, "axis", AttrValue::from(letter))?;
        }
        match descriptor.direction {
            AxisDirection::Up => self.file.put_attribute(&name, "positive", AttrValue::from("up"))?,
            AxisDirection::Down => {
                self.file.put_attribute(&name, "positive", AttrValue::from("down"))?
            }
            _ => {}
        }
        debug!(dimension = %name, length, kind = ?sequence.kind, "Registered dimension");
        self.dimensions.push(RegisteredDimension {
            name: name.clone(),
            descriptor: descriptor.clone(),
            sequence,
        });
        Ok((name, length))
    }

    /// Leave definition mode, write coordinates then samples, and close
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            WriterState::Defining => {}
            WriterState::Idle => {
                return Err(RasterError::IllegalState(
                    "finish called before prepare".to_string(),
                ))
            }
            WriterState::Finished => return Err(finished()),
        }
        self.state = WriterState::Finished;
        self.file.end_define()?;

        for dimension in &self.dimensions {
            let values = ArrayView1::from(dimension.sequence.values.as_slice()).into_dyn();
            self.file
                .write_section(&dimension.name, &[0], values)
                .map_err(|e| {
                    e.in_section(dimension.name.as_str(), 0, &[0], &[dimension.sequence.length])
                })?;
        }
        for image in &self.images {
            let mut writer =
                SampleWriter::new(&image.group, image.samples.view(), image.flip, image.budget)?;
            writer.write_all(&mut self.file)?;
        }
        self.file.close()?;
        info!(
            dimensions = self.dimensions.len(),
            images = self.images.len(),
            "Finished write session"
        );
        Ok(())
    }
}

fn band_sequence(axis: &CoordinateAxis, bands: usize) -> Result<SequenceSpec> {
    sequence::build(&SequenceRequest {
        dimension: 0,
        extent: bands,
        start: 0,
        span: bands,
        stride: 1,
        values: &axis.values,
        transform: None,
        region: &[(0, bands)],
        resample: false,
        flip: false,
    })
}

fn finished() -> RasterError {
    RasterError::IllegalState("write session already finished".to_string())
}
