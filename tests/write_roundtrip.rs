//! Write-path integration tests: decode, re-encode, and file-based sessions

use ncraster::{
    types::{AttrValue, ValueRange},
    variables::buffer_rows,
    AdapterConfig, AffineTransform, ArrayFile, ArrayFileMut, AxisDescriptor, AxisDirection,
    AxisValues, BandDescription, CoordinateAxis, DimensionSelector, FileFamily, ImageGrid,
    LogicalRole, MemoryArrayFile, Raster, RasterError, RasterReader, RasterWriter, ReadParams,
    ReaderState, Region, WriteParams,
};
use ndarray::{Array, Array3, IxDyn};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

fn sst_file() -> MemoryArrayFile {
    let data = Array::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| {
        (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64
    });
    MemoryArrayFile::new()
        .with_global_attribute("title", "sea surface temperature")
        .with_dimension("time", 2)
        .with_dimension("lat", 3)
        .with_dimension("lon", 4)
        .with_coordinate("time", vec![0.0, 24.0], "hours since 2020-01-01 00:00:00", Some("T"))
        .with_coordinate("lat", vec![10.0, 20.0, 30.0], "degrees_north", Some("Y"))
        .with_coordinate("lon", vec![1.0, 2.0, 3.0, 4.0], "degrees_east", Some("X"))
        .with_variable("sst", &["time", "lat", "lon"], data)
        .with_attribute("sst", "long_name", "sea surface temperature")
}

fn time_as_images() -> AdapterConfig {
    AdapterConfig::new().with_binding(LogicalRole::Images, DimensionSelector::axis_named("time"))
}

fn values(file: &MemoryArrayFile, variable: &str) -> Vec<f64> {
    file.data(variable).unwrap().iter().copied().collect()
}

#[test]
fn test_coordinate_round_trip() {
    let mut reader = RasterReader::new(time_as_images()).unwrap();
    reader.open_handle(sst_file(), FileFamily::NetCdf).unwrap();
    let raster = reader.read_image_at(1, &ReadParams::new()).unwrap();
    assert_eq!(
        raster.grid.axes[1].values,
        AxisValues::Numeric(vec![30.0, 20.0, 10.0])
    );

    let mut writer = RasterWriter::new(
        MemoryArrayFile::create(),
        FileFamily::NetCdf,
        AdapterConfig::default(),
    );
    writer.prepare(&BTreeMap::new()).unwrap();
    let group = writer.append_image(&raster, &WriteParams::new()).unwrap();
    assert_eq!(group.variables, vec!["sst"]);
    assert_eq!(group.dimensions, vec!["time", "lat", "lon"]);
    writer.finish().unwrap();

    let written = writer.into_inner();
    assert_eq!(values(&written, "lat"), vec![10.0, 20.0, 30.0]);
    assert_eq!(values(&written, "lon"), vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(values(&written, "time"), vec![24.0]);
    assert_eq!(values(&written, "sst"), values(&sst_file(), "sst")[12..].to_vec());

    let time = written.variable("time").unwrap();
    assert_eq!(
        time.attribute("units"),
        Some(&AttrValue::from("hours since 2020-01-01 00:00:00"))
    );
    assert_eq!(time.attribute("axis"), Some(&AttrValue::from("T")));

    // reading the written file gives back the same grid
    let mut reread = RasterReader::new(AdapterConfig::default()).unwrap();
    reread.open_handle(written, FileFamily::NetCdf).unwrap();
    let grid = reread.image_grid(0).unwrap();
    assert_eq!(grid.axes[0].values, raster.grid.axes[0].values);
    assert_eq!(grid.axes[1].values, raster.grid.axes[1].values);
}

#[test]
fn test_images_sharing_a_grid_share_dimensions() {
    let mut reader = RasterReader::new(time_as_images()).unwrap();
    reader.open_handle(sst_file(), FileFamily::NetCdf).unwrap();
    let first = reader.read_image_at(0, &ReadParams::new()).unwrap();
    let second = reader.read_image_at(1, &ReadParams::new()).unwrap();

    let mut writer = RasterWriter::new(
        MemoryArrayFile::create(),
        FileFamily::NetCdf,
        AdapterConfig::default(),
    );
    writer.prepare(&BTreeMap::new()).unwrap();
    let a = writer.append_image(&first, &WriteParams::new()).unwrap();
    let b = writer.append_image(&second, &WriteParams::new()).unwrap();
    // lat and lon are shared, the single time steps differ
    assert_eq!(a.dimensions, vec!["time", "lat", "lon"]);
    assert_eq!(b.dimensions, vec!["time_2", "lat", "lon"]);
    assert_eq!(b.variables, vec!["sst_2"]);
    assert_eq!(writer.dimensions().len(), 4);
    writer.finish().unwrap();
}

#[test]
fn test_banded_write_with_band_axis() {
    let data = Array3::from_shape_fn((3, 6, 8), |(b, r, c)| (b * 1000 + r * 10 + c) as f64);
    let bands = (1..=3)
        .map(|b| {
            BandDescription::named(format!("channel {}", b))
                .with_unit("counts")
                .with_range(ValueRange::new(0.0, 3000.0))
        })
        .collect();
    let band_axis = CoordinateAxis::new(
        AxisDescriptor::new("wavelength", AxisDirection::Other, "nm", 0),
        AxisValues::Numeric(vec![450.0, 550.0, 650.0]),
    );
    let raster = Raster::from_array(data)
        .with_bands(bands)
        .with_grid(
            ImageGrid::new()
                .with_transform(AffineTransform::north_up(0.0, 1.0, 6.0, 1.0))
                .with_band_axis(band_axis),
        );

    let mut writer = RasterWriter::new(
        MemoryArrayFile::create(),
        FileFamily::NetCdf,
        AdapterConfig::default().with_buffer_elements(16),
    );
    writer.prepare(&BTreeMap::new()).unwrap();
    let params = WriteParams::new().with_image_name("radiance");
    let group = writer.append_image(&raster, &params).unwrap();
    assert_eq!(group.dimensions, vec!["wavelength", "y", "x"]);
    assert_eq!(group.variables, vec!["radiance"]);
    writer.finish().unwrap();

    let file = writer.into_inner();
    assert_eq!(values(&file, "wavelength"), vec![450.0, 550.0, 650.0]);
    assert_eq!(values(&file, "y"), vec![0.5, 1.5, 2.5, 3.5, 4.5, 5.5]);
    let stored = file.data("radiance").unwrap();
    assert_eq!(stored[[2, 5, 7]], 2007.0);
    assert_eq!(stored[[1, 0, 3]], 1053.0);
    // identity transfer: only the description survives as an attribute
    let radiance = file.variable("radiance").unwrap();
    assert!(radiance.attribute("units").is_none());
}

#[test]
fn test_buffer_rows_bound_every_flush() {
    let cases = [
        (100, 200, 65_536),
        (360, 720, 65_536),
        (7, 3, 5),
        (64, 64, 1000),
    ];
    for (height, width, budget) in cases {
        let rows = buffer_rows(height, width, budget);
        assert_eq!(height % rows, 0);
        assert!(rows == 1 || rows * width <= budget);
    }
}

#[test]
fn test_path_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.json");

    let ramp = Array3::from_shape_fn((1, 4, 5), |(_, r, c)| (r * 5 + c) as f64);
    let raster = Raster::from_array(ramp).with_name("ramp");
    let mut writer = RasterWriter::new(
        MemoryArrayFile::create_path(&path),
        FileFamily::Json,
        AdapterConfig::default(),
    );
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), AttrValue::from("unit test"));
    writer.prepare(&metadata).unwrap();
    writer
        .append_image(&raster, &WriteParams::new().with_region(Region::new(1, 1, 3, 2)))
        .unwrap();
    writer.finish().unwrap();
    assert!(path.exists());

    let mut reader = RasterReader::<MemoryArrayFile>::new(AdapterConfig::default()).unwrap();
    reader.open_path(&path).unwrap();
    // opening again is a no-op
    reader.open_path(temp_dir.path().join("missing.json")).unwrap();
    assert_eq!(reader.state(), ReaderState::Opened);

    let copy = reader.read_image_at(0, &ReadParams::new()).unwrap();
    assert_eq!(copy.data.dim(), (1, 2, 3));
    assert_eq!(copy.data[[0, 0, 0]], 6.0);
    assert_eq!(copy.data[[0, 1, 2]], 13.0);
    assert_eq!(reader.stream_metadata().unwrap()["attributes"]["source"], "unit test");
}

#[test]
fn test_stream_opening() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sst.json");
    sst_file().save(&path).unwrap();
    let bytes = fs::read(&path).unwrap();

    let mut reader = RasterReader::<MemoryArrayFile>::new(time_as_images()).unwrap();
    reader.open_stream(Cursor::new(bytes.clone()), "json").unwrap();
    assert_eq!(reader.num_images().unwrap(), 2);
    reader.close();

    let mut reader = RasterReader::<MemoryArrayFile>::new(time_as_images()).unwrap();
    assert!(matches!(
        reader.open_stream(Cursor::new(bytes), "tif"),
        Err(RasterError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        reader.open_path(temp_dir.path().join("sst.png")),
        Err(RasterError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_finish_is_final() {
    let mut file = MemoryArrayFile::create();
    file.add_dimension("spare", 1).unwrap();
    let mut writer = RasterWriter::new(file, FileFamily::NetCdf, AdapterConfig::default());
    writer.prepare(&BTreeMap::new()).unwrap();
    let raster = Raster::from_array(Array3::<f64>::zeros((1, 2, 2)));
    writer.append_image(&raster, &WriteParams::new()).unwrap();
    writer.finish().unwrap();
    assert!(matches!(writer.finish(), Err(RasterError::IllegalState(_))));
}

#[test]
fn test_temporal_offsets_survive_round_trip() {
    let hours = vec![0.0, 0.123456789, 1.0000001];
    let data = Array::from_shape_fn(IxDyn(&[3, 2, 2]), |ix| ix[0] as f64);
    let file = MemoryArrayFile::new()
        .with_dimension("time", 3)
        .with_dimension("y", 2)
        .with_dimension("x", 2)
        .with_coordinate("time", hours.clone(), "hours since 2024-01-01 00:00:00", Some("T"))
        .with_variable("obs", &["time", "y", "x"], data);

    let mut reader = RasterReader::new(time_as_images()).unwrap();
    reader.open_handle(file, FileFamily::NetCdf).unwrap();
    let mut writer = RasterWriter::new(
        MemoryArrayFile::create(),
        FileFamily::NetCdf,
        AdapterConfig::default(),
    );
    writer.prepare(&BTreeMap::new()).unwrap();
    for image in 1..3 {
        let raster = reader.read_image_at(image, &ReadParams::new()).unwrap();
        writer.append_image(&raster, &WriteParams::new()).unwrap();
    }
    writer.finish().unwrap();

    let written = writer.into_inner();
    assert_eq!(values(&written, "time"), vec![0.123456789]);
    assert_eq!(values(&written, "time_2"), vec![1.0000001]);
}

#[test]
fn test_transform_failure_aborts_append() {
    let raster = Raster::from_array(Array3::<f64>::zeros((1, 4, 3))).with_grid(
        ImageGrid::new().with_transform(AffineTransform::north_up(0.0, 1.0, 0.0, f64::MAX / 2.0)),
    );
    let mut writer = RasterWriter::new(
        MemoryArrayFile::create(),
        FileFamily::NetCdf,
        AdapterConfig::default(),
    );
    writer.prepare(&BTreeMap::new()).unwrap();
    assert!(matches!(
        writer.append_image(&raster, &WriteParams::new()),
        Err(RasterError::Metadata(_))
    ));
    assert!(writer.dimensions().is_empty());
    writer.finish().unwrap();
    assert!(!writer.into_inner().has_dimension("x"));
}
