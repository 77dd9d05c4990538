//! Metadata trees for streams, images and bands
//!
//! Band metadata is mapped to and from variable attributes through a single
//! table of conventional attribute names. Stream and image metadata are
//! emitted as JSON trees.

use crate::axes::{AxisValues, CoordinateAxis};
use crate::store::{ArrayFile, VariableInfo};
use crate::types::{AttrValue, BandDescription, SampleTransfer, ValueRange};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Band fields an attribute maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BandField {
    Description,
    Unit,
    FillValue,
    ValidRange,
    ValidMin,
    ValidMax,
    Scale,
    Offset,
}

/// Conventional attribute names, in lookup priority order
const BAND_ATTRIBUTES: &[(&str, BandField)] = &[
    ("long_name", BandField::Description),
    ("units", BandField::Unit),
    ("_FillValue", BandField::FillValue),
    ("missing_value", BandField::FillValue),
    ("valid_range", BandField::ValidRange),
    ("valid_min", BandField::ValidMin),
    ("valid_max", BandField::ValidMax),
    ("scale_factor", BandField::Scale),
    ("add_offset", BandField::Offset),
];

/// Band description derived from the attributes of a variable
pub fn band_description(info: &VariableInfo) -> BandDescription {
    let mut band = BandDescription::named(info.name.clone());
    let (mut min, mut max) = (None, None);
    let mut transfer = SampleTransfer::IDENTITY;
    for (name, field) in BAND_ATTRIBUTES {
        let Some(value) = info.attribute(name) else {
            continue;
        };
        match field {
            BandField::Description => {
                band.description = band.description.or(value.as_str().map(str::to_string))
            }
            BandField::Unit => band.unit = band.unit.or(value.as_str().map(str::to_string)),
            BandField::FillValue => band.fill_value = band.fill_value.or(value.as_f64()),
            BandField::ValidRange => {
                if let Some([lo, hi]) = value.as_numbers().as_deref() {
                    min = Some(*lo);
                    max = Some(*hi);
                }
            }
            BandField::ValidMin => min = min.or(value.as_f64()),
            BandField::ValidMax => max = max.or(value.as_f64()),
            BandField::Scale => transfer.scale = value.as_f64().unwrap_or(1.0),
            BandField::Offset => transfer.offset = value.as_f64().unwrap_or(0.0),
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        band.range = Some(ValueRange::new(min, max));
    }
    band.transfer = transfer;
    band
}

/// Attributes to attach to the variable storing `band`.
///
/// `long_name` is always written when a description exists. The remaining
/// attributes only carry information for packed samples, so they are emitted
/// when the sample transfer is not the identity.
pub fn band_attributes(band: &BandDescription) -> Vec<(&'static str, AttrValue)> {
    let mut attributes = Vec::new();
    if let Some(description) = &band.description {
        attributes.push(("long_name", AttrValue::from(description.as_str())));
    }
    if band.transfer.is_identity() {
        return attributes;
    }
    let mut emitted = Vec::new();
    for (name, field) in BAND_ATTRIBUTES {
        if emitted.contains(field) {
            continue;
        }
        let value = match field {
            BandField::Unit => band.unit.as_deref().map(AttrValue::from),
            BandField::FillValue => band.fill_value.map(AttrValue::from),
            BandField::ValidRange => band
                .range
                .filter(ValueRange::is_valid)
                .map(|r| AttrValue::from(vec![r.min, r.max])),
            BandField::Scale => Some(AttrValue::from(band.transfer.scale)),
            BandField::Offset => Some(AttrValue::from(band.transfer.offset)),
            BandField::Description | BandField::ValidMin | BandField::ValidMax => None,
        };
        if let Some(value) = value {
            emitted.push(*field);
            attributes.push((*name, value));
        }
    }
    attributes
}

fn attr_to_json(value: &AttrValue) -> Value {
    match value {
        AttrValue::Number(v) => json!(v),
        AttrValue::Numbers(v) => json!(v),
        AttrValue::Text(s) => json!(s),
    }
}

fn attributes_to_json(attributes: &BTreeMap<String, AttrValue>) -> Value {
    Value::Object(
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), attr_to_json(v)))
            .collect::<Map<_, _>>(),
    )
}

/// Stream-level tree: global attributes, dimensions and variable names
pub fn stream_metadata<F: ArrayFile + ?Sized>(file: &F) -> Value {
    let dimensions: Map<String, Value> = file
        .dimensions()
        .into_iter()
        .map(|d| (d.name, json!(d.len)))
        .collect();
    let variables: Vec<Value> = file
        .variables()
        .iter()
        .map(|v| {
            json!({
                "name": v.name,
                "dimensions": v.dimensions,
                "type": v.data_type.to_string(),
            })
        })
        .collect();
    json!({
        "attributes": attributes_to_json(&file.global_attributes()),
        "dimensions": Value::Object(dimensions),
        "variables": variables,
    })
}

fn axis_to_json(axis: &CoordinateAxis) -> Value {
    let mut node = json!({
        "name": axis.descriptor.name,
        "direction": axis.descriptor.direction,
        "dimension": axis.descriptor.dimension,
    });
    if !axis.descriptor.unit.is_empty() {
        node["units"] = json!(axis.descriptor.unit);
    }
    match &axis.values {
        AxisValues::None => {}
        AxisValues::Numeric(values) => {
            node["length"] = json!(values.len());
            if let (Some(first), Some(last)) = (values.first(), values.last()) {
                node["range"] = json!([first, last]);
            }
        }
        AxisValues::Temporal { instants, .. } => {
            node["length"] = json!(instants.len());
            if let (Some(first), Some(last)) = (instants.first(), instants.last()) {
                node["range"] = json!([first.to_rfc3339(), last.to_rfc3339()]);
            }
        }
    }
    node
}

/// Image-level tree: variable, attributes, axes and band description
pub fn image_metadata(info: &VariableInfo, axes: &[CoordinateAxis]) -> Value {
    let band = band_description(info);
    json!({
        "variable": info.name,
        "type": info.data_type.to_string(),
        "shape": info.shape,
        "attributes": attributes_to_json(&info.attributes),
        "axes": axes.iter().map(axis_to_json).collect::<Vec<_>>(),
        "band": band,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryArrayFile;
    use ndarray::{ArrayD, IxDyn};

    fn packed_file() -> MemoryArrayFile {
        MemoryArrayFile::new()
            .with_global_attribute("title", "packed")
            .with_dimension("y", 2)
            .with_dimension("x", 2)
            .with_variable("sst", &["y", "x"], ArrayD::zeros(IxDyn(&[2, 2])))
            .with_attribute("sst", "long_name", "sea surface temperature")
            .with_attribute("sst", "units", "K")
            .with_attribute("sst", "_FillValue", -999.0)
            .with_attribute("sst", "valid_min", 0.0)
            .with_attribute("sst", "valid_max", 4000.0)
            .with_attribute("sst", "scale_factor", 0.01)
            .with_attribute("sst", "add_offset", 273.15)
    }

    #[test]
    fn test_band_description_from_attributes() {
        let file = packed_file();
        let band = band_description(&file.variable("sst").unwrap());
        assert_eq!(band.name.as_deref(), Some("sst"));
        assert_eq!(band.description.as_deref(), Some("sea surface temperature"));
        assert_eq!(band.unit.as_deref(), Some("K"));
        assert_eq!(band.fill_value, Some(-999.0));
        assert_eq!(band.range, Some(ValueRange::new(0.0, 4000.0)));
        assert_eq!(band.transfer, SampleTransfer::new(0.01, 273.15));
    }

    #[test]
    fn test_identity_transfer_omits_packing_attributes() {
        let band = BandDescription::named("t")
            .with_description("temperature")
            .with_unit("K")
            .with_fill_value(-1.0);
        let attributes = band_attributes(&band);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].0, "long_name");

        let packed = band.with_transfer(SampleTransfer::new(0.5, 1.0));
        let names: Vec<_> = band_attributes(&packed).into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["long_name", "units", "_FillValue", "scale_factor", "add_offset"]
        );
    }

    #[test]
    fn test_stream_metadata_tree() {
        let tree = stream_metadata(&packed_file());
        assert_eq!(tree["attributes"]["title"], "packed");
        assert_eq!(tree["dimensions"]["x"], 2);
        assert_eq!(tree["variables"][0]["name"], "sst");
    }
}
