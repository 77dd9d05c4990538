//! Print the images of an array file and read the first one.
//!
//! Usage: `cargo run --example inspect [file.json]`. Without an argument a
//! small sample file is generated in a temporary directory.

use anyhow::{Context, Result};
use ncraster::{
    AdapterConfig, AxisDirection, AxisMatcher, DimensionSelector, LogicalRole, MemoryArrayFile,
    RasterReader, ReadParams,
};
use ndarray::{Array, IxDyn};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn sample_file(dir: &tempfile::TempDir) -> Result<PathBuf> {
    let data = Array::from_shape_fn(IxDyn(&[3, 90, 180]), |ix| {
        20.0 + ix[0] as f64 - (ix[1] as f64 - 45.0).abs() / 3.0
    });
    let path = dir.path().join("sample.json");
    MemoryArrayFile::new()
        .with_global_attribute("title", "synthetic sea surface temperature")
        .with_dimension("time", 3)
        .with_dimension("lat", 90)
        .with_dimension("lon", 180)
        .with_coordinate("time", vec![0.0, 1.0, 2.0], "days since 2024-01-01 00:00:00", Some("T"))
        .with_coordinate("lat", (0..90).map(|i| -89.0 + 2.0 * i as f64).collect(), "degrees_north", None)
        .with_coordinate("lon", (0..180).map(|i| -179.0 + 2.0 * i as f64).collect(), "degrees_east", None)
        .with_variable("sst", &["time", "lat", "lon"], data)
        .with_attribute("sst", "units", "degC")
        .save(&path)?;
    Ok(path)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ncraster=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let temp_dir = tempfile::tempdir()?;
    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => sample_file(&temp_dir)?,
    };

    let config = AdapterConfig::new().with_binding(
        LogicalRole::Images,
        DimensionSelector::Axis(AxisMatcher::names(["time"]).or_direction(AxisDirection::Future)),
    );
    let mut reader = RasterReader::<MemoryArrayFile>::new(config)?;
    reader
        .open_path(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    let images = reader.num_images()?;
    info!(images, path = %path.display(), "Opened");
    for image in 0..images {
        println!(
            "image {}: {}x{} pixels, {} band(s), {} dimensions",
            image,
            reader.width(image)?,
            reader.height(image)?,
            reader.num_bands(image)?,
            reader.dimension_count(image)?
        );
    }
    if images == 0 {
        return Ok(());
    }

    let raster = reader.read_image_at(0, &ReadParams::new().with_subsampling(4, 4))?;
    let (min, max) = raster
        .data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    println!(
        "read image 0 at 1/4 resolution: {}x{}, values {:.2}..{:.2}",
        raster.width(),
        raster.height(),
        min,
        max
    );
    println!("{}", serde_json::to_string_pretty(&reader.image_metadata(0)?)?);
    Ok(())
}
