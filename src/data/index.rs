use std::collections::HashMap;

use super::osm::NodeRef;

/// Maps coordinates onto a fixed-precision integer grid so that positions coming from
/// independent copies of the same geometry compare equal.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    scale: f64,
}

impl Quantizer {
    pub fn new(digits: u32) -> Self {
        Quantizer {
            scale: 10f64.powi(digits as i32),
        }
    }

    /// `round(value * 10^digits)`, or `None` when that does not fit an `i64`.
    pub fn quantize(&self, value: f64) -> Option<i64> {
        let scaled = (value * self.scale).round();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64 {
            Some(scaled as i64)
        } else {
            None
        }
    }
}

/// Bucket key of the node deduplication index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Coordinate(i64, i64),
    /// Key produced by a translation for standalone point features.
    Custom(String),
}

/// Node candidates per key. A bucket holds several nodes when coincident nodes were kept apart
/// by the merge policy.
#[derive(Debug, Default)]
pub struct NodeIndex {
    buckets: HashMap<NodeKey, Vec<NodeRef>>,
}

impl NodeIndex {
    pub fn candidates(&self, key: &NodeKey) -> &[NodeRef] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert(&mut self, key: NodeKey, node: NodeRef) {
        self.buckets.entry(key).or_default().push(node);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
