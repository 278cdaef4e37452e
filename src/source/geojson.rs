use std::fs;
use std::path::Path;

use ::geojson::{GeoJson, JsonObject, Value};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use log::{info, warn};

use crate::errors::Result;

use super::{identity_reproject, DataSource, Feature, FieldDef, FieldType, FieldValue, Layer};

/// A GeoJSON document read as a single layer. Coordinates are used as they are.
pub struct GeoJsonSource {
    name: String,
    encoding: String,
    document: Option<GeoJson>,
}

impl GeoJsonSource {
    pub fn open(path: &Path, encoding: &str) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or("Could not get source file name")?;
        info!(source = name; "Opened GeoJSON source");
        GeoJsonSource::parse(name, &text, encoding)
    }

    pub fn parse(name: &str, text: &str, encoding: &str) -> Result<Self> {
        let document: GeoJson = text.parse()?;
        Ok(GeoJsonSource {
            name: name.to_string(),
            encoding: encoding.to_string(),
            document: Some(document),
        })
    }

    fn build_layer(name: &str, document: GeoJson) -> Layer {
        let raw: Vec<(Option<JsonObject>, Option<::geojson::Geometry>)> = match document {
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .map(|feature| (feature.properties, feature.geometry))
                .collect(),
            GeoJson::Feature(feature) => vec![(feature.properties, feature.geometry)],
            GeoJson::Geometry(geometry) => vec![(None, Some(geometry))],
        };

        // Fields in first-seen property order (serde_json keeps document order), typed by the
        // first non-null value.
        let mut seen: Vec<(String, Option<FieldType>)> = Vec::new();
        for (properties, _) in &raw {
            for (key, value) in properties.iter().flatten() {
                let value_type = field_value(value).map(|_| field_type(value));
                match seen.iter_mut().find(|(name, _)| name == key) {
                    Some((_, field_type)) => {
                        if field_type.is_none() {
                            *field_type = value_type;
                        }
                    },
                    None => seen.push((key.clone(), value_type)),
                }
            }
        }
        let fields: Vec<FieldDef> = seen
            .into_iter()
            .enumerate()
            .map(|(index, (name, field_type))| FieldDef {
                index,
                name,
                field_type: field_type.unwrap_or(FieldType::String),
            })
            .collect();

        let features = raw
            .into_iter()
            .map(|(properties, geometry)| Feature {
                values: fields
                    .iter()
                    .map(|field| {
                        properties
                            .as_ref()
                            .and_then(|properties| properties.get(&field.name))
                            .and_then(field_value)
                    })
                    .collect(),
                geometry: geometry.and_then(|geometry| match convert_value(&geometry.value) {
                    Some(converted) => Some(converted),
                    None => {
                        warn!(layer = name; "Dropping geometry with invalid positions");
                        None
                    },
                }),
            })
            .collect();

        Layer {
            name: name.to_string(),
            fields,
            features,
            reproject: identity_reproject(),
        }
    }
}

fn field_type(value: &serde_json::Value) -> FieldType {
    match value {
        serde_json::Value::Bool(_) => FieldType::Boolean,
        serde_json::Value::Number(number) if number.is_i64() => FieldType::Integer,
        serde_json::Value::Number(_) => FieldType::Real,
        _ => FieldType::String,
    }
}

fn field_value(value: &serde_json::Value) -> Option<FieldValue> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(value) => Some(FieldValue::Boolean(*value)),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(integer) => Some(FieldValue::Integer(integer)),
            None => number.as_f64().map(FieldValue::Real),
        },
        serde_json::Value::String(text) => Some(FieldValue::Text(text.as_bytes().to_vec())),
        other => Some(FieldValue::Text(other.to_string().into_bytes())),
    }
}

fn convert_position(position: &[f64]) -> Option<Coord<f64>> {
    match position {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn convert_line(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    positions
        .iter()
        .map(|position| convert_position(position))
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

fn convert_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| convert_line(ring));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

fn convert_value(value: &Value) -> Option<Geometry<f64>> {
    let geometry = match value {
        Value::Point(position) => Geometry::Point(Point(convert_position(position)?)),
        Value::MultiPoint(positions) => Geometry::MultiPoint(MultiPoint::new(
            positions
                .iter()
                .map(|position| convert_position(position).map(Point))
                .collect::<Option<Vec<_>>>()?,
        )),
        Value::LineString(positions) => Geometry::LineString(convert_line(positions)?),
        Value::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
            lines.iter().map(|line| convert_line(line)).collect::<Option<Vec<_>>>()?,
        )),
        Value::Polygon(rings) => Geometry::Polygon(convert_polygon(rings)?),
        Value::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
            polygons
                .iter()
                .map(|polygon| convert_polygon(polygon))
                .collect::<Option<Vec<_>>>()?,
        )),
        Value::GeometryCollection(geometries) => Geometry::GeometryCollection(GeometryCollection(
            geometries
                .iter()
                .map(|geometry| convert_value(&geometry.value))
                .collect::<Option<Vec<_>>>()?,
        )),
    };
    Some(geometry)
}

impl DataSource for GeoJsonSource {
    fn layer_count(&self) -> usize {
        1
    }

    fn layer(&mut self, index: usize) -> Result<Option<Layer>> {
        if index != 0 {
            return Ok(None);
        }
        Ok(self
            .document
            .take()
            .map(|document| GeoJsonSource::build_layer(&self.name, document)))
    }

    fn source_encoding(&self) -> &str {
        &self.encoding
    }
}
