//! Graph store and conversion driver.
//!
//! Features are consumed strictly in source order. Deduplication relies on every element created
//! so far being visible, so all state here is owned by a single `OsmData`.

use geo::BoundingRect;
use log::{debug, info, warn};

use crate::config::UserConfig;
use crate::data::index::{NodeIndex, NodeKey, Quantizer};
use crate::data::osm::{Boundary, ElementRef, IdAllocator, NodeRef, Tags};
use crate::data::Graph;
use crate::errors::Result;
use crate::source::{DataSource, Feature, FieldDef, Reproject};
use crate::translation::{EntityMut, MergeKind, Translation};
use crate::writer::{DataWriter, WriterSession};

mod duplicates;
mod geometry;
mod split;

pub use duplicates::{ordered_nodes, verify_duplicate_relations, verify_duplicate_ways};

pub struct OsmData {
    translation: Box<dyn Translation>,
    quantizer: Quantizer,
    max_points_in_way: usize,
    add_bounds: bool,

    ids: IdAllocator,
    bounds: Boundary,
    graph: Graph,
    node_index: NodeIndex,
}

impl OsmData {
    pub fn new(translation: Box<dyn Translation>, config: &UserConfig) -> Self {
        OsmData {
            translation,
            quantizer: Quantizer::new(config.rounding_digits),
            max_points_in_way: config.max_points_in_way,
            add_bounds: config.add_bounds,
            ids: IdAllocator::new(config.id, config.positive_id),
            bounds: Boundary::default(),
            graph: Graph::default(),
            node_index: NodeIndex::default(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn bounds(&self) -> &Boundary {
        &self.bounds
    }

    /// Node at (`x`, `y`), reusing an existing one when the translation agrees to merge.
    ///
    /// Way members are keyed by their quantized position. Standalone points use the key
    /// returned by the translation.
    pub(crate) fn add_node(&mut self, x: f64, y: f64, tags: Tags, is_way_member: bool) -> NodeRef {
        let (Some(qx), Some(qy)) = (self.quantizer.quantize(x), self.quantizer.quantize(y)) else {
            warn!("Coordinate out of range for rounding, node is not deduplicated");
            return self.graph.push_node(self.ids.next_id(), x, y, tags);
        };
        let key = if is_way_member {
            NodeKey::Coordinate(qx, qy)
        } else {
            self.translation.unique_node_identifier(qx, qy, &tags)
        };

        for &candidate in self.node_index.candidates(&key) {
            let duplicate = &mut self.graph.nodes[candidate.0];
            if let Some(merged) = self.translation.merge_tags(MergeKind::Node, &duplicate.tags, &tags) {
                duplicate.tags = merged;
                return candidate;
            }
        }

        let node = self.graph.push_node(self.ids.next_id(), x, y, tags);
        self.node_index.insert(key, node);
        node
    }

    fn feature_tags(&self, feature: &Feature, fields: &[FieldDef], source_encoding: &str) -> Option<Tags> {
        let tags: Tags = fields
            .iter()
            .filter_map(|field| {
                let value = feature.values.get(field.index)?.as_ref()?;
                Some((field.name.clone(), value.to_tag_value(source_encoding).trim().to_string()))
            })
            .collect();
        self.translation.filter_tags(tags)
    }

    pub fn add_feature(&mut self, feature: Feature, fields: &[FieldDef], source_encoding: &str, reproject: &Reproject) {
        let Some(mut feature) = self.translation.filter_feature(feature, fields, reproject) else {
            debug!("Feature dropped by translation");
            return;
        };

        let Some(mut geometry) = feature.geometry.take() else {
            warn!("Feature without geometry");
            return;
        };

        let Some(tags) = self.feature_tags(&feature, fields, source_encoding) else {
            warn!("Feature without tags after filtering");
            return;
        };

        reproject(&mut geometry);

        if self.add_bounds {
            if let Some(rect) = geometry.bounding_rect() {
                self.bounds.add_envelope(rect.min().x, rect.max().x, rect.min().y, rect.max().y);
            }
        }

        let elements = self.parse_geometry(&geometry, tags);

        for element in elements {
            let entity = match element {
                ElementRef::Node(node) => EntityMut::Node(&mut self.graph.nodes[node.0]),
                ElementRef::Way(way) => EntityMut::Way(&mut self.graph.ways[way.0]),
                ElementRef::Relation(relation) => EntityMut::Relation(&mut self.graph.relations[relation.0]),
            };
            self.translation.process_feature_post(entity, &feature, &geometry);
        }
    }

    /// Converts every layer of `source`, then splits ways that grew too long.
    pub fn process(&mut self, source: &mut dyn DataSource) -> Result<()> {
        for index in 0..source.layer_count() {
            let Some(layer) = source.layer(index)? else {
                warn!(layer_index = index; "Skipping unreadable layer");
                continue;
            };
            let Some(layer) = self.translation.filter_layer(layer) else {
                continue;
            };

            info!(layer = layer.name.as_str(), features = layer.feature_count(); "Processing layer");
            for feature in layer.features {
                self.add_feature(feature, &layer.fields, source.source_encoding(), &layer.reproject);
            }
        }

        self.split_long_ways();

        info!(
            nodes = self.graph.nodes.len(),
            ways = self.graph.ways.len(),
            relations = self.graph.relations.len();
            "Conversion finished"
        );
        Ok(())
    }

    /// Hands the elements to the translation one last time and writes them out.
    pub fn output(&mut self, writer: &mut dyn DataWriter) -> Result<()> {
        self.translation.process_output(
            &mut self.graph.nodes,
            &mut self.graph.ways,
            &mut self.graph.relations,
        );

        let mut session = WriterSession::open(writer)?;
        session.write_header(&self.bounds)?;
        session.write_nodes(&self.graph)?;
        session.write_ways(&self.graph)?;
        session.write_relations(&self.graph)?;
        session.write_footer()?;
        session.close()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use geo::{Geometry, LineString, Point, Polygon};

    use super::*;
    use crate::data::osm::{Node, Relation, Way};
    use crate::source::{identity_reproject, FieldType, FieldValue, Layer};
    use crate::translation::{DefaultTranslation, MergingTranslation};
    use crate::writer::tests::RecordingWriter;

    pub(crate) fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    pub(crate) fn data_with(translation: impl Translation + 'static, max_points_in_way: usize) -> OsmData {
        let config = UserConfig {
            max_points_in_way,
            add_bounds: true,
            ..UserConfig::default()
        };
        OsmData::new(Box::new(translation), &config)
    }

    fn name_field() -> Vec<FieldDef> {
        vec![FieldDef { index: 0, name: "name".to_string(), field_type: FieldType::String }]
    }

    fn named(name: &str, geometry: Geometry<f64>) -> Feature {
        Feature {
            values: vec![Some(FieldValue::Text(format!("  {}  ", name).into_bytes()))],
            geometry: Some(geometry),
        }
    }

    #[test]
    fn test_interning_same_position_merges() {
        let mut data = data_with(MergingTranslation, 1800);

        let first = data.add_node(1.0, 2.0, tags(&[("a", "1")]), true);
        let second = data.add_node(1.000_000_01, 2.0, tags(&[("b", "2")]), true);

        assert_eq!(first, second);
        assert_eq!(data.graph().nodes().len(), 1);
        assert_eq!(data.graph().node(first).tags, tags(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_rejected_merge_keeps_nodes_apart() {
        let mut data = data_with(DefaultTranslation, 1800);

        let first = data.add_node(1.0, 2.0, Tags::new(), true);
        let second = data.add_node(1.0, 2.0, Tags::new(), true);

        assert_ne!(first, second);
        assert_ne!(data.graph().node(first).id, data.graph().node(second).id);
        assert_eq!(data.node_index.len(), 1);
        assert_eq!(
            data.node_index.candidates(&NodeKey::Coordinate(10_000_000, 20_000_000)),
            &[first, second]
        );
    }

    #[test]
    fn test_unroundable_coordinates_are_kept_apart() {
        let config = UserConfig {
            rounding_digits: 13,
            ..UserConfig::default()
        };
        let mut data = OsmData::new(Box::new(MergingTranslation), &config);

        let line = LineString::from(vec![(1e6, 0.0), (2e6, 0.0), (3e6, 0.0)]);
        let way = data.parse_linestring(&line, Tags::new()).unwrap();

        assert_eq!(data.graph().way(way).nodes().len(), 3);
        assert_eq!(data.graph().nodes().len(), 3);
        assert!(data.node_index.is_empty());
    }

    struct KeyByName;

    impl Translation for KeyByName {
        fn merge_tags(&self, _kind: MergeKind, existing: &Tags, _incoming: &Tags) -> Option<Tags> {
            Some(existing.clone())
        }

        fn unique_node_identifier(&self, _qx: i64, _qy: i64, tags: &Tags) -> NodeKey {
            NodeKey::Custom(tags.get("name").cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_point_features_use_translation_key() {
        let mut data = data_with(KeyByName, 1800);

        let a = data.add_node(0.0, 0.0, tags(&[("name", "a")]), false);
        let b = data.add_node(5.0, 5.0, tags(&[("name", "a")]), false);
        let c = data.add_node(0.0, 0.0, tags(&[("name", "c")]), false);
        let way_node = data.add_node(0.0, 0.0, Tags::new(), true);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, way_node);
        assert_ne!(c, way_node);
    }

    #[test]
    fn test_feature_tags_are_trimmed_and_bounds_grow() {
        let mut data = data_with(MergingTranslation, 1800);
        let fields = name_field();
        let reproject = identity_reproject();

        data.add_feature(
            named("square", Geometry::Polygon(Polygon::new(
                LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
                vec![],
            ))),
            &fields,
            "utf-8",
            &reproject,
        );
        data.add_feature(
            named("line", Geometry::LineString(LineString::from(vec![(5.0, -5.0), (20.0, 5.0)]))),
            &fields,
            "utf-8",
            &reproject,
        );

        assert_eq!(
            data.bounds(),
            &Boundary { min_x: 0.0, max_x: 20.0, min_y: -5.0, max_y: 10.0 }
        );
        assert_eq!(data.graph().ways().len(), 2);
        assert_eq!(data.graph().ways()[0].tags, tags(&[("name", "square")]));
    }

    #[test]
    fn test_features_without_geometry_or_tags_are_skipped() {
        struct DropEverything;
        impl Translation for DropEverything {
            fn filter_tags(&self, _tags: Tags) -> Option<Tags> {
                None
            }
        }

        let fields = name_field();
        let reproject = identity_reproject();

        let mut data = data_with(MergingTranslation, 1800);
        data.add_feature(Feature { values: vec![None], geometry: None }, &fields, "utf-8", &reproject);
        assert!(data.graph().nodes().is_empty());
        assert!(!data.bounds().is_valid());

        let mut data = data_with(DropEverything, 1800);
        data.add_feature(named("p", Geometry::Point(Point::new(1.0, 1.0))), &fields, "utf-8", &reproject);
        assert!(data.graph().nodes().is_empty());
    }

    #[test]
    fn test_reprojection_runs_before_parsing() {
        let mut data = data_with(MergingTranslation, 1800);
        let reproject: Reproject = Box::new(|geometry: &mut Geometry<f64>| {
            if let Geometry::Point(point) = geometry {
                *point = Point::new(point.x() * 2.0, point.y() * 2.0);
            }
        });

        data.add_feature(named("p", Geometry::Point(Point::new(1.0, 3.0))), &name_field(), "utf-8", &reproject);

        let node = &data.graph().nodes()[0];
        assert_eq!((node.x, node.y), (2.0, 6.0));
        assert_eq!(data.bounds().max_y, 6.0);
    }

    struct CountingPost {
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Translation for CountingPost {
        fn merge_tags(&self, _kind: MergeKind, existing: &Tags, _incoming: &Tags) -> Option<Tags> {
            Some(existing.clone())
        }

        fn process_feature_post(&mut self, mut entity: EntityMut<'_>, feature: &Feature, _geometry: &Geometry<f64>) {
            let kind = match entity {
                EntityMut::Node(_) => "node",
                EntityMut::Way(_) => "way",
                EntityMut::Relation(_) => "relation",
            };
            self.seen.borrow_mut().push(kind.to_string());
            entity
                .tags_mut()
                .insert("fields".to_string(), feature.values.len().to_string());
        }
    }

    #[test]
    fn test_post_processing_sees_every_element() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut data = data_with(CountingPost { seen: seen.clone() }, 1800);

        data.add_feature(
            named("lines", Geometry::MultiLineString(geo::MultiLineString::new(vec![
                LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
                LineString::from(vec![(2.0, 2.0), (3.0, 3.0)]),
            ]))),
            &name_field(),
            "utf-8",
            &identity_reproject(),
        );

        assert_eq!(*seen.borrow(), vec!["way", "way"]);
        assert!(data.graph().ways().iter().all(|way| way.tags.get("fields") == Some(&"1".to_string())));
    }

    struct SkipLayers;

    impl Translation for SkipLayers {
        fn filter_layer(&self, layer: Layer) -> Option<Layer> {
            if layer.name == "skip" { None } else { Some(layer) }
        }
    }

    struct VecSource {
        layers: Vec<Option<Layer>>,
    }

    impl DataSource for VecSource {
        fn layer_count(&self) -> usize {
            self.layers.len()
        }

        fn layer(&mut self, index: usize) -> Result<Option<Layer>> {
            Ok(self.layers[index].take())
        }

        fn source_encoding(&self) -> &str {
            "utf-8"
        }
    }

    fn layer(name: &str, features: Vec<Feature>) -> Layer {
        Layer {
            name: name.to_string(),
            fields: name_field(),
            features,
            reproject: identity_reproject(),
        }
    }

    #[test]
    fn test_process_walks_layers_and_splits() {
        let mut data = data_with(SkipLayers, 3);
        let long_line = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let mut source = VecSource {
            layers: vec![
                Some(layer("skip", vec![named("ignored", Geometry::Point(Point::new(9.0, 9.0)))])),
                None,
                Some(layer("roads", vec![named("long", Geometry::LineString(long_line))])),
            ],
        };

        data.process(&mut source).unwrap();

        assert_eq!(data.graph().nodes().len(), 5);
        assert_eq!(data.graph().ways().len(), 2);
        assert!(data.graph().ways().iter().all(|way| way.tags == tags(&[("name", "long")])));
    }

    struct RenameOnOutput;

    impl Translation for RenameOnOutput {
        fn process_output(&mut self, nodes: &mut [Node], _ways: &mut [Way], _relations: &mut [Relation]) {
            for node in nodes {
                node.tags.insert("checked".to_string(), "yes".to_string());
            }
        }
    }

    #[test]
    fn test_output_runs_translation_then_writer_in_order() {
        let mut data = data_with(RenameOnOutput, 1800);
        data.add_node(1.0, 1.0, Tags::new(), false);

        let mut writer = RecordingWriter::default();
        data.output(&mut writer).unwrap();

        assert_eq!(
            writer.calls,
            vec!["open", "header", "nodes", "1 nodes", "ways", "relations", "footer", "close"]
        );
        assert_eq!(data.graph().nodes()[0].tags, tags(&[("checked", "yes")]));
    }

    #[test]
    fn test_failed_write_still_closes_writer() {
        let mut data = data_with(DefaultTranslation, 1800);
        let mut writer = RecordingWriter { fail_on: Some("ways"), ..Default::default() };

        assert!(data.output(&mut writer).is_err());
        assert_eq!(writer.calls.last().map(String::as_str), Some("close"));
    }
}
