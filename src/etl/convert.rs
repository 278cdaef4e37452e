use std::fs;
use std::path::PathBuf;

use crate::config::UserConfig;
use crate::errors::Result;
use crate::osm_data::OsmData;
use crate::source::geojson::GeoJsonSource;
use crate::translation::{DefaultTranslation, MergingTranslation, Translation};
use crate::writer::osm_xml::OsmXmlWriter;

use super::Etl;

/// Converts a GeoJSON file into an OSM XML file.
pub struct ConvertEtl<'a> {
    config: &'a UserConfig,
    translation: Option<Box<dyn Translation>>,
}

impl<'a> ConvertEtl<'a> {
    pub fn new(config: &'a UserConfig) -> Self {
        ConvertEtl {
            config,
            translation: None,
        }
    }

    /// Replaces the translation picked from `merge_duplicates`.
    pub fn with_translation(mut self, translation: Box<dyn Translation>) -> Self {
        self.translation = Some(translation);
        self
    }

    fn output_path(&self) -> PathBuf {
        output_path(self.config)
    }

    fn translation(&mut self) -> Box<dyn Translation> {
        self.translation.take().unwrap_or_else(|| {
            if self.config.merge_duplicates {
                Box::new(MergingTranslation)
            } else {
                Box::new(DefaultTranslation)
            }
        })
    }
}

/// `output_path` from the config, or the source path with an `.osm` extension.
pub fn output_path(config: &UserConfig) -> PathBuf {
    if config.output_path.is_empty() {
        PathBuf::from(&config.source_path).with_extension("osm")
    } else {
        PathBuf::from(&config.output_path)
    }
}

impl Etl for ConvertEtl<'_> {
    type Input = GeoJsonSource;
    type Output = OsmData;

    fn etl_name(&self) -> &str {
        "convert"
    }

    fn is_cached(&self) -> Result<bool> {
        Ok(!self.config.force && self.output_path().exists())
    }

    fn clean(&self) -> Result<()> {
        let path = self.output_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn extract(&mut self) -> Result<GeoJsonSource> {
        GeoJsonSource::open(PathBuf::from(&self.config.source_path).as_path(), &self.config.source_encoding)
    }

    fn transform(&mut self, mut source: GeoJsonSource) -> Result<OsmData> {
        let mut data = OsmData::new(self.translation(), self.config);
        data.process(&mut source)?;
        Ok(data)
    }

    fn load(&mut self, mut data: OsmData) -> Result<()> {
        let mut writer = OsmXmlWriter::new(&self.output_path(), self.config);
        data.output(&mut writer)
    }
}
