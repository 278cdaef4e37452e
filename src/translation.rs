//! Pluggable policy deciding which features are converted and how duplicate elements are merged.

use geo::Geometry;

use crate::data::index::NodeKey;
use crate::data::osm::{Node, Relation, Tags, Way};
use crate::source::{Feature, FieldDef, Layer, Reproject};

/// What kind of duplicate a merge is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Node,
    Way,
    /// A way with the same nodes in opposite order.
    ReverseWay,
    Relation,
}

impl MergeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeKind::Node => "node",
            MergeKind::Way => "way",
            MergeKind::ReverseWay => "reverse_way",
            MergeKind::Relation => "relation",
        }
    }
}

/// Mutable access to an element freshly produced from a feature.
pub enum EntityMut<'a> {
    Node(&'a mut Node),
    Way(&'a mut Way),
    Relation(&'a mut Relation),
}

impl EntityMut<'_> {
    pub fn tags_mut(&mut self) -> &mut Tags {
        match self {
            EntityMut::Node(node) => &mut node.tags,
            EntityMut::Way(way) => &mut way.tags,
            EntityMut::Relation(relation) => &mut relation.tags,
        }
    }
}

pub trait Translation {
    fn filter_layer(&self, layer: Layer) -> Option<Layer> {
        Some(layer)
    }

    fn filter_feature(&self, feature: Feature, _fields: &[FieldDef], _reproject: &Reproject) -> Option<Feature> {
        Some(feature)
    }

    /// Returning `None` drops the feature.
    fn filter_tags(&self, tags: Tags) -> Option<Tags> {
        Some(tags)
    }

    /// Merged tags for two duplicate elements, or `None` to keep them apart.
    fn merge_tags(&self, _kind: MergeKind, _existing: &Tags, _incoming: &Tags) -> Option<Tags> {
        None
    }

    /// Deduplication key for standalone point features.
    ///
    /// Legacy hook: way members are always keyed by their quantized coordinate. Kept for
    /// translations that rely on it and may be removed.
    fn unique_node_identifier(&self, qx: i64, qy: i64, _tags: &Tags) -> NodeKey {
        NodeKey::Coordinate(qx, qy)
    }

    fn process_feature_post(&mut self, _entity: EntityMut<'_>, _feature: &Feature, _geometry: &Geometry<f64>) {}

    /// Last chance to touch the elements before they are written.
    fn process_output(&mut self, _nodes: &mut [Node], _ways: &mut [Way], _relations: &mut [Relation]) {}
}

/// Keeps every feature and never merges.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTranslation;

impl Translation for DefaultTranslation {}

/// Merges every duplicate. Tags are united; a key present on both sides with different values
/// ends up with both values separated by `;`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergingTranslation;

impl Translation for MergingTranslation {
    fn merge_tags(&self, _kind: MergeKind, existing: &Tags, incoming: &Tags) -> Option<Tags> {
        let mut merged = existing.clone();
        for (key, value) in incoming {
            match merged.get_mut(key) {
                Some(current) => {
                    if !current.split(';').any(|part| part == value) {
                        current.push(';');
                        current.push_str(value);
                    }
                },
                None => {
                    merged.insert(key.clone(), value.clone());
                },
            }
        }
        Some(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_translation_never_merges() {
        let translation = DefaultTranslation;
        let existing = tags(&[("name", "a")]);
        assert_eq!(translation.merge_tags(MergeKind::Node, &existing, &existing), None);
        assert_eq!(translation.filter_tags(existing.clone()), Some(existing));
        assert_eq!(translation.unique_node_identifier(1, 2, &Tags::new()), NodeKey::Coordinate(1, 2));
    }

    #[test]
    fn test_merging_translation_unites_tags() {
        let merged = MergingTranslation
            .merge_tags(
                MergeKind::Way,
                &tags(&[("highway", "residential"), ("name", "Main")]),
                &tags(&[("name", "High"), ("lanes", "2"), ("highway", "residential")]),
            )
            .unwrap();

        assert_eq!(
            merged,
            tags(&[("highway", "residential"), ("name", "Main;High"), ("lanes", "2")])
        );
    }

    #[test]
    fn test_merge_kind_names() {
        let names: Vec<_> = [MergeKind::Node, MergeKind::Way, MergeKind::ReverseWay, MergeKind::Relation]
            .iter()
            .map(MergeKind::as_str)
            .collect();
        assert_eq!(names, vec!["node", "way", "reverse_way", "relation"]);
    }
}
