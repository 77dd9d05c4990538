//! Reading raster images out of array files
//!
//! A [`RasterReader`] moves through three states: unopened, opened (a file
//! handle is held) and variable-ready (a [`VariableSession`] describes the
//! variable backing the last requested image). The session is rebuilt
//! whenever an image index maps to a different image source.

use crate::axes::{axis_for_dimension, AxisCatalog, AxisValues, CoordinateAxis};
use crate::config::AdapterConfig;
use crate::error::{RasterError, Result};
use crate::format::FileFamily;
use crate::metadata;
use crate::raster::{CastConverter, ImageGrid, Raster, SampleConverter};
use crate::roles::{DimensionRoleRegistry, DimensionSelector};
use crate::sequence::sequence_length;
use crate::slices::{indices_for, ImageSlice, SliceKey, SliceOverrides};
use crate::store::{ArrayFile, OpenPath, SectionRange, VariableInfo};
use crate::types::{AxisDescriptor, AxisDirection, LogicalRole, Region};
use ndarray::Array3;
use num_traits::Zero;
use serde_json::Value;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Per-read parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ReadParams {
    /// Source region in raster coordinates; the whole image when `None`
    pub region: Option<Region>,
    /// Column and row subsampling periods
    pub subsampling: (usize, usize),
    /// Source bands to read, in destination order; every band when `None`
    pub bands: Option<Vec<usize>>,
    /// Slices for non-raster dimensions, over the configured defaults
    pub slices: SliceOverrides,
}

impl Default for ReadParams {
    fn default() -> Self {
        Self {
            region: None,
            subsampling: (1, 1),
            bands: None,
            slices: SliceOverrides::new(),
        }
    }
}

impl ReadParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_subsampling(mut self, x: usize, y: usize) -> Self {
        self.subsampling = (x, y);
        self
    }

    pub fn with_bands(mut self, bands: Vec<usize>) -> Self {
        self.bands = Some(bands);
        self
    }

    pub fn with_slice(mut self, key: SliceKey, index: usize) -> Self {
        self.slices.set(key, index);
        self
    }
}

/// Callbacks issued while an image is read
pub trait ReadListener {
    fn started(&mut self, _image: usize) {}

    /// `fraction` of the requested bands copied so far
    fn progress(&mut self, _image: usize, _fraction: f32) {}

    fn aborted(&mut self, _image: usize) {}

    fn complete(&mut self, _image: usize) {}
}

/// Cooperative cancellation flag, settable from any thread
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Externally visible reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unopened,
    Opened,
    VariableReady,
}

/// Variables supplying a run of consecutive images
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    /// One variable, or one per band when bands are separate variables
    pub variables: Vec<String>,
    pub first_image: usize,
    pub image_count: usize,
}

impl ImageSource {
    fn contains(&self, image: usize) -> bool {
        image >= self.first_image && image < self.first_image + self.image_count
    }
}

/// Everything resolved for the variable backing the current image source
#[derive(Debug, Clone)]
pub struct VariableSession {
    pub source: usize,
    pub variables: Vec<String>,
    pub info: VariableInfo,
    pub axes: Vec<CoordinateAxis>,
    pub column_dim: usize,
    pub row_dim: usize,
    pub band_dim: Option<usize>,
    pub image_dim: Option<usize>,
    pub first_image: usize,
}

impl VariableSession {
    pub fn rank(&self) -> usize {
        self.info.rank()
    }

    pub fn width(&self) -> usize {
        self.info.shape[self.column_dim]
    }

    pub fn height(&self) -> usize {
        self.info.shape[self.row_dim]
    }

    pub fn num_bands(&self) -> usize {
        if self.variables.len() > 1 {
            self.variables.len()
        } else {
            self.band_dim.map(|d| self.info.shape[d]).unwrap_or(1)
        }
    }

    fn descriptors(&self) -> Vec<AxisDescriptor> {
        self.axes.iter().map(|a| a.descriptor.clone()).collect()
    }

    fn raster_dims(&self) -> Vec<usize> {
        let mut dims = vec![self.column_dim, self.row_dim];
        dims.extend(self.band_dim);
        dims
    }

    /// Fixed index of every storage dimension for image `image`
    fn slice_indices(&self, slices: &SliceOverrides, image: usize) -> Result<Vec<usize>> {
        let image_slice = self.image_dim.map(|dimension| ImageSlice {
            dimension,
            index: image - self.first_image,
        });
        indices_for(
            slices,
            &self.descriptors(),
            &self.info.shape,
            &self.raster_dims(),
            image_slice,
        )
    }
}

struct OpenFile<F> {
    file: F,
    family: FileFamily,
    sources: Option<Vec<ImageSource>>,
    // Keeps a materialized stream alive while the file is open
    _temp: Option<NamedTempFile>,
}

enum State<F> {
    Unopened,
    Opened(OpenFile<F>),
    VariableReady(OpenFile<F>, VariableSession),
}

/// Pixel window of one read, in raster coordinates
#[derive(Debug, Clone, Copy)]
struct Window {
    region: Region,
    sx: usize,
    sy: usize,
    out_w: usize,
    out_h: usize,
    flip: bool,
}

impl Window {
    fn column_range(&self) -> SectionRange {
        SectionRange::new(self.region.x, self.out_w, self.sx)
    }

    fn row_range(&self, height: usize) -> SectionRange {
        if self.flip {
            let last = self.region.y + (self.out_h - 1) * self.sy;
            SectionRange::new(height - 1 - last, self.out_h, self.sy)
        } else {
            SectionRange::new(self.region.y, self.out_h, self.sy)
        }
    }

    /// Storage row of output row `row`
    fn storage_row(&self, row: usize, height: usize) -> usize {
        let raster_row = self.region.y + row * self.sy;
        if self.flip {
            height - 1 - raster_row
        } else {
            raster_row
        }
    }
}

/// Reads raster images from an [`ArrayFile`]
pub struct RasterReader<F: ArrayFile> {
    config: AdapterConfig,
    registry: DimensionRoleRegistry,
    catalog: AxisCatalog,
    state: State<F>,
    abort: AbortHandle,
    listeners: Vec<Box<dyn ReadListener>>,
}

impl<F: ArrayFile> RasterReader<F> {
    pub fn new(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let registry = config.registry()?;
        Ok(Self {
            config,
            registry,
            catalog: AxisCatalog::new(),
            state: State::Unopened,
            abort: AbortHandle::new(),
            listeners: Vec::new(),
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn state(&self) -> ReaderState {
        match self.state {
            State::Unopened => ReaderState::Unopened,
            State::Opened(_) => ReaderState::Opened,
            State::VariableReady(..) => ReaderState::VariableReady,
        }
    }

    /// Open an already constructed file handle; no-op when a file is open
    pub fn open_handle(&mut self, file: F, family: FileFamily) -> Result<()> {
        self.open_with(file, family, None);
        Ok(())
    }

    fn open_with(&mut self, file: F, family: FileFamily, temp: Option<NamedTempFile>) {
        if !matches!(self.state, State::Unopened) {
            debug!("Reader already open, ignoring open request");
            return;
        }
        info!(%family, "Opened array file");
        self.state = State::Opened(OpenFile {
            file,
            family,
            sources: None,
            _temp: temp,
        });
    }

    pub fn file(&self) -> Option<&F> {
        match &self.state {
            State::Unopened => None,
            State::Opened(open) | State::VariableReady(open, _) => Some(&open.file),
        }
    }

    pub fn family(&self) -> Option<FileFamily> {
        match &self.state {
            State::Unopened => None,
            State::Opened(open) | State::VariableReady(open, _) => Some(open.family),
        }
    }

    /// Release the file and everything derived from it
    pub fn close(&mut self) {
        if !matches!(self.state, State::Unopened) {
            info!("Closed array file");
        }
        self.state = State::Unopened;
        self.catalog.invalidate();
        self.registry.clear_memo();
    }

    /// Close, and drop bindings made since construction
    pub fn reset(&mut self) -> Result<()> {
        self.close();
        self.registry = self.config.registry()?;
        self.abort.clear();
        Ok(())
    }

    /// Bind a role for subsequent reads; invalidates the current session
    pub fn bind(&mut self, role: LogicalRole, selector: DimensionSelector) -> Result<()> {
        self.registry.bind(role, selector)?;
        self.state = match std::mem::replace(&mut self.state, State::Unopened) {
            State::Unopened => State::Unopened,
            State::Opened(mut open) | State::VariableReady(mut open, _) => {
                open.sources = None;
                State::Opened(open)
            }
        };
        Ok(())
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn add_listener(&mut self, listener: Box<dyn ReadListener>) {
        self.listeners.push(listener);
    }

    fn open_file_mut(&mut self) -> Result<&mut OpenFile<F>> {
        match &mut self.state {
            State::Unopened => Err(not_open()),
            State::Opened(open) | State::VariableReady(open, _) => Ok(open),
        }
    }

    fn sources(&mut self) -> Result<Vec<ImageSource>> {
        let open = match &mut self.state {
            State::Unopened => return Err(not_open()),
            State::Opened(open) | State::VariableReady(open, _) => open,
        };
        if open.sources.is_none() {
            let sources =
                enumerate_sources(&open.file, &self.config, &mut self.catalog, &mut self.registry)?;
            debug!(count = sources.len(), "Enumerated image sources");
            open.sources = Some(sources);
        }
        Ok(open.sources.clone().unwrap_or_default())
    }

    /// Total number of images in the file
    pub fn num_images(&mut self) -> Result<usize> {
        Ok(self
            .sources()?
            .last()
            .map(|s| s.first_image + s.image_count)
            .unwrap_or(0))
    }

    /// Make the session for `image` current
    fn select(&mut self, image: usize) -> Result<&VariableSession> {
        let sources = self.sources()?;
        let count = sources.last().map(|s| s.first_image + s.image_count).unwrap_or(0);
        let Some(index) = sources.iter().position(|s| s.contains(image)) else {
            return Err(RasterError::InvalidImageIndex { index: image, count });
        };
        let current = matches!(&self.state, State::VariableReady(_, s) if s.source == index);
        if !current {
            let open = match std::mem::replace(&mut self.state, State::Unopened) {
                State::Unopened => return Err(not_open()),
                State::Opened(open) | State::VariableReady(open, _) => open,
            };
            match build_session(
                &open.file,
                &sources[index],
                index,
                &mut self.catalog,
                &mut self.registry,
            ) {
                Ok(session) => {
                    debug!(image, variables = ?session.variables, "Selected variable");
                    self.state = State::VariableReady(open, session);
                }
                Err(e) => {
                    self.state = State::Opened(open);
                    return Err(e);
                }
            }
        }
        match &self.state {
            State::VariableReady(_, session) => Ok(session),
            _ => Err(not_open()),
        }
    }

    pub fn width(&mut self, image: usize) -> Result<usize> {
        Ok(self.select(image)?.width())
    }

    pub fn height(&mut self, image: usize) -> Result<usize> {
        Ok(self.select(image)?.height())
    }

    pub fn num_bands(&mut self, image: usize) -> Result<usize> {
        Ok(self.select(image)?.num_bands())
    }

    pub fn dimension_count(&mut self, image: usize) -> Result<usize> {
        Ok(self.select(image)?.rank())
    }

    /// Coordinate axes of the whole image, in raster order
    pub fn image_grid(&mut self, image: usize) -> Result<ImageGrid> {
        self.select(image)?;
        let State::VariableReady(open, session) = &self.state else {
            return Err(not_open());
        };
        let window = Window {
            region: Region::full(session.width(), session.height()),
            sx: 1,
            sy: 1,
            out_w: session.width(),
            out_h: session.height(),
            flip: self.config.row_order_for(open.family).needs_flip(),
        };
        let indices = session.slice_indices(&self.config.slices, image)?;
        let bands: Vec<usize> = (0..session.num_bands()).collect();
        Ok(image_grid(session, &window, &indices, &bands))
    }

    pub fn image_metadata(&mut self, image: usize) -> Result<Value> {
        let session = self.select(image)?;
        Ok(metadata::image_metadata(&session.info, &session.axes))
    }

    pub fn stream_metadata(&mut self) -> Result<Value> {
        Ok(metadata::stream_metadata(&self.open_file_mut()?.file))
    }

    /// Read image `image` as `f64` samples
    pub fn read_image_at(&mut self, image: usize, params: &ReadParams) -> Result<Raster<f64>> {
        self.read_image_with(image, params, &CastConverter)
    }

    /// Read image `image`, converting samples with `converter`.
    ///
    /// A cancelled read returns the bands copied so far, with
    /// [`Raster::aborted`] set.
    pub fn read_image_with<T, C>(
        &mut self,
        image: usize,
        params: &ReadParams,
        converter: &C,
    ) -> Result<Raster<T>>
    where
        T: Clone + Zero,
        C: SampleConverter<T> + ?Sized,
    {
        self.abort.clear();
        self.select(image)?;
        let State::VariableReady(open, session) = &self.state else {
            return Err(not_open());
        };
        let (width, height) = (session.width(), session.height());
        let region = params.region.unwrap_or_else(|| Region::full(width, height));
        if !region.fits_within(width, height) {
            return Err(RasterError::OutOfBounds(format!(
                "region {:?} outside image of {}x{}",
                region, width, height
            )));
        }
        let (sx, sy) = params.subsampling;
        if sx == 0 || sy == 0 {
            return Err(RasterError::Configuration(format!(
                "subsampling periods must be positive, got ({}, {})",
                sx, sy
            )));
        }
        let window = Window {
            region,
            sx,
            sy,
            out_w: sequence_length(region.width, sx),
            out_h: sequence_length(region.height, sy),
            flip: self.config.row_order_for(open.family).needs_flip(),
        };
        let num_bands = session.num_bands();
        let bands = params
            .bands
            .clone()
            .unwrap_or_else(|| (0..num_bands).collect());
        if let Some(&band) = bands.iter().find(|&&b| b >= num_bands) {
            return Err(RasterError::OutOfBounds(format!(
                "band {} of an image with {} bands",
                band, num_bands
            )));
        }

        let slices = self.config.slices.merged_with(&params.slices);
        let indices = session.slice_indices(&slices, image)?;
        let mut section: Vec<SectionRange> =
            indices.iter().map(|&i| SectionRange::single(i)).collect();
        section[session.column_dim] = window.column_range();
        section[session.row_dim] = window.row_range(height);

        let mut data = Array3::<T>::zeros((bands.len(), window.out_h, window.out_w));
        let mut bands_read = 0;
        let mut aborted = false;
        for listener in self.listeners.iter_mut() {
            listener.started(image);
        }
        for (dest, &band) in bands.iter().enumerate() {
            if self.abort.is_aborted() {
                aborted = true;
                break;
            }
            let variable = if session.variables.len() > 1 {
                &session.variables[band]
            } else {
                &session.variables[0]
            };
            if let Some(band_dim) = session.band_dim {
                section[band_dim] = SectionRange::single(band);
            }
            let values = open.file.read_section(variable, &section).map_err(|e| {
                let origin: Vec<usize> = section.iter().map(|r| r.start).collect();
                let shape: Vec<usize> = section.iter().map(|r| r.count).collect();
                e.in_section(variable.as_str(), band, &origin, &shape)
            })?;
            if values.len() != window.out_h * window.out_w {
                return Err(RasterError::Backend(format!(
                    "section of '{}' returned {} samples, expected {}",
                    variable,
                    values.len(),
                    window.out_h * window.out_w
                )));
            }
            debug!(variable = variable.as_str(), band, "Read band section");
            // Storage rows come back in ascending order.
            for (n, value) in values.iter().enumerate() {
                let (k, column) = (n / window.out_w, n % window.out_w);
                let row = if window.flip { window.out_h - 1 - k } else { k };
                data[[dest, row, column]] = converter.convert(*value);
            }
            bands_read = dest + 1;
            let fraction = bands_read as f32 / bands.len() as f32;
            for listener in self.listeners.iter_mut() {
                listener.progress(image, fraction);
            }
        }
        if aborted {
            warn!(image, bands_read, "Read aborted");
            for listener in self.listeners.iter_mut() {
                listener.aborted(image);
            }
        } else {
            for listener in self.listeners.iter_mut() {
                listener.complete(image);
            }
        }

        let descriptions = bands
            .iter()
            .map(|&band| band_description(open, session, band))
            .collect::<Result<Vec<_>>>()?;
        let grid = image_grid(session, &window, &indices, &bands);
        let mut raster = Raster::from_array(data)
            .with_bands(descriptions)
            .with_grid(grid)
            .with_name(session.info.name.clone());
        raster.bands_read = bands_read;
        raster.aborted = aborted;
        Ok(raster)
    }
}

impl<F: ArrayFile + OpenPath> RasterReader<F> {
    /// Open the file at `path`; no-op when a file is open
    pub fn open_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if !matches!(self.state, State::Unopened) {
            debug!("Reader already open, ignoring open request");
            return Ok(());
        }
        let path = path.as_ref();
        let family = FileFamily::from_path(path)?;
        let file = F::open_path(path)?;
        info!(path = %path.display(), "Opening array file");
        self.open_with(file, family, None);
        Ok(())
    }

    /// Copy `reader` into a temporary file with suffix `suffix`, then open it
    pub fn open_stream<R: Read>(&mut self, mut reader: R, suffix: &str) -> Result<()> {
        if !matches!(self.state, State::Unopened) {
            debug!("Reader already open, ignoring open request");
            return Ok(());
        }
        let family = FileFamily::from_suffix(suffix).ok_or_else(|| {
            RasterError::UnsupportedFormat(format!("'{}' is not a recognized suffix", suffix))
        })?;
        let mut temp = tempfile::Builder::new()
            .prefix("ncraster")
            .suffix(&format!(".{}", suffix.trim_start_matches('.')))
            .tempfile()?;
        let copied = io::copy(&mut reader, &mut temp)?;
        temp.flush()?;
        debug!(bytes = copied, path = %temp.path().display(), "Materialized input stream");
        let file = F::open_path(temp.path())?;
        self.open_with(file, family, Some(temp));
        Ok(())
    }
}

fn not_open() -> RasterError {
    RasterError::IllegalState("no array file is open".to_string())
}

fn image_count(
    file: &impl ArrayFile,
    name: &str,
    catalog: &mut AxisCatalog,
    registry: &mut DimensionRoleRegistry,
) -> Result<usize> {
    let info = file
        .variable(name)
        .ok_or_else(|| RasterError::NotFound(format!("variable '{}'", name)))?;
    DimensionRoleRegistry::raster_dimensions(info.rank())?;
    let axes = catalog.descriptors(file, name)?;
    let image_dim = registry.resolve(LogicalRole::Images, name, &axes, info.rank())?;
    Ok(image_dim.map(|d| info.shape[d]).unwrap_or(1))
}

/// Image sources of a file, in image order
fn enumerate_sources(
    file: &impl ArrayFile,
    config: &AdapterConfig,
    catalog: &mut AxisCatalog,
    registry: &mut DimensionRoleRegistry,
) -> Result<Vec<ImageSource>> {
    let groups: Vec<Vec<String>> = if let Some(bands) = &config.band_names {
        vec![bands.clone()]
    } else if let Some(images) = &config.image_names {
        images.iter().map(|name| vec![name.clone()]).collect()
    } else {
        file.variables()
            .into_iter()
            .filter(|v| !v.is_coordinate() && v.rank() >= 2)
            .map(|v| vec![v.name])
            .collect()
    };
    let mut sources = Vec::with_capacity(groups.len());
    let mut first_image = 0;
    for variables in groups {
        let Some(primary) = variables.first() else {
            continue;
        };
        let image_count = image_count(file, primary, catalog, registry)?;
        sources.push(ImageSource {
            variables,
            first_image,
            image_count,
        });
        first_image += image_count;
    }
    Ok(sources)
}

fn build_session(
    file: &impl ArrayFile,
    source: &ImageSource,
    index: usize,
    catalog: &mut AxisCatalog,
    registry: &mut DimensionRoleRegistry,
) -> Result<VariableSession> {
    let primary = source
        .variables
        .first()
        .ok_or_else(|| RasterError::NotFound("image source without variables".to_string()))?;
    let info = file
        .variable(primary)
        .ok_or_else(|| RasterError::NotFound(format!("variable '{}'", primary)))?;
    let rank = info.rank();
    let (column_dim, row_dim) = DimensionRoleRegistry::raster_dimensions(rank)?;
    let axes = catalog.axes(file, primary)?.to_vec();
    let descriptors: Vec<AxisDescriptor> = axes.iter().map(|a| a.descriptor.clone()).collect();

    for other in &source.variables[1..] {
        let shape = file.variable(other).map(|v| v.shape);
        if shape.as_ref() != Some(&info.shape) {
            return Err(RasterError::InvalidDimensions(format!(
                "band variable '{}' does not share the shape {:?} of '{}'",
                other, info.shape, primary
            )));
        }
    }

    let image_dim = registry.resolve(LogicalRole::Images, primary, &descriptors, rank)?;
    let band_dim = if source.variables.len() > 1 {
        None
    } else {
        registry.resolve(LogicalRole::Bands, primary, &descriptors, rank)?
    };
    if band_dim.is_some() && band_dim == image_dim {
        return Err(RasterError::Configuration(format!(
            "BANDS and IMAGES both resolve to dimension {:?} of '{}'",
            band_dim, primary
        )));
    }
    Ok(VariableSession {
        source: index,
        variables: source.variables.clone(),
        info,
        axes,
        column_dim,
        row_dim,
        band_dim,
        image_dim,
        first_image: source.first_image,
    })
}

fn band_description<F: ArrayFile>(
    open: &OpenFile<F>,
    session: &VariableSession,
    band: usize,
) -> Result<crate::types::BandDescription> {
    if session.variables.len() > 1 {
        let name = &session.variables[band];
        let info = open
            .file
            .variable(name)
            .ok_or_else(|| RasterError::NotFound(format!("variable '{}'", name)))?;
        return Ok(metadata::band_description(&info));
    }
    let mut description = metadata::band_description(&session.info);
    if session.num_bands() > 1 {
        description.name = None;
    }
    Ok(description)
}

/// Grid of the pixels covered by `window`, axes in raster order
fn image_grid(
    session: &VariableSession,
    window: &Window,
    indices: &[usize],
    bands: &[usize],
) -> ImageGrid {
    let height = session.height();
    let mut grid = ImageGrid::new();
    if let Some(axis) = axis_for_dimension(&session.axes, session.column_dim) {
        let values = axis
            .values
            .subsample(window.region.x, window.out_w, window.sx);
        grid = grid.with_axis(0, CoordinateAxis::new(axis.descriptor.clone(), values));
    }
    if let Some(axis) = axis_for_dimension(&session.axes, session.row_dim) {
        let values = axis
            .values
            .select((0..window.out_h).map(|row| window.storage_row(row, height)));
        grid = grid.with_axis(1, CoordinateAxis::new(axis.descriptor.clone(), values));
    }
    for dimension in (0..session.rank()).rev() {
        if session.raster_dims().contains(&dimension) {
            continue;
        }
        let axis = match axis_for_dimension(&session.axes, dimension) {
            Some(axis) => CoordinateAxis::new(
                axis.descriptor.clone(),
                axis.values.select([indices[dimension]]),
            ),
            None => CoordinateAxis::new(
                AxisDescriptor::new(
                    session.info.dimensions[dimension].clone(),
                    AxisDirection::Other,
                    "",
                    dimension,
                ),
                AxisValues::None,
            ),
        };
        grid = grid.with_extra_axis(axis);
    }
    if let Some(band_dim) = session.band_dim {
        if let Some(axis) = axis_for_dimension(&session.axes, band_dim) {
            let values = axis.values.select(bands.iter().copied());
            grid = grid.with_band_axis(CoordinateAxis::new(axis.descriptor.clone(), values));
        }
    }
    grid
}
