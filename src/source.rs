use geo::Geometry;

use crate::errors::Result;

pub mod geojson;

/// Reprojects a geometry in place. Supplied per layer by the data source.
pub type Reproject = Box<dyn Fn(&mut Geometry<f64>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Real,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub index: usize,
    pub name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Raw text in the source encoding.
    Text(Vec<u8>),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn to_tag_value(&self, encoding: &str) -> String {
        match self {
            FieldValue::Text(bytes) => decode_text(bytes, encoding),
            FieldValue::Integer(value) => value.to_string(),
            FieldValue::Real(value) => value.to_string(),
            FieldValue::Boolean(value) => value.to_string(),
        }
    }
}

fn decode_text(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_ascii_lowercase().as_str() {
        "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => bytes.iter().map(|&b| b as char).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Feature {
    /// One value per layer field, `None` when unset.
    pub values: Vec<Option<FieldValue>>,
    pub geometry: Option<Geometry<f64>>,
}

pub struct Layer {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub features: Vec<Feature>,
    pub reproject: Reproject,
}

impl Layer {
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

pub fn identity_reproject() -> Reproject {
    Box::new(|_geometry: &mut Geometry<f64>| {})
}

pub trait DataSource {
    fn layer_count(&self) -> usize;

    /// `Ok(None)` for a layer that cannot be read and should be skipped.
    fn layer(&mut self, index: usize) -> Result<Option<Layer>>;

    fn source_encoding(&self) -> &str;
}
