use std::collections::{BTreeSet, HashMap};

pub type OsmId = i64;
pub type Tags = HashMap<String, String>;

pub const ROLE_OUTER: &str = "outer";
pub const ROLE_INNER: &str = "inner";
pub const ROLE_MEMBER: &str = "member";

/// Index of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WayRef(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationRef(pub usize);

/// Any element of the graph. Used both as a relation member and as the result of parsing a
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementRef {
    Node(NodeRef),
    Way(WayRef),
    Relation(RelationRef),
}

impl ElementRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ElementRef::Node(_) => "node",
            ElementRef::Way(_) => "way",
            ElementRef::Relation(_) => "relation",
        }
    }
}

/// Back-reference from a node to a container holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parent {
    Way(WayRef),
    Relation(RelationRef),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: OsmId,
    pub x: f64,
    pub y: f64,
    pub tags: Tags,
    parents: BTreeSet<Parent>,
}

impl Node {
    pub fn new(id: OsmId, x: f64, y: f64, tags: Tags) -> Self {
        Node {
            id,
            x,
            y,
            tags,
            parents: BTreeSet::new(),
        }
    }

    pub fn parents(&self) -> impl Iterator<Item = &Parent> {
        self.parents.iter()
    }

    pub fn parent_ways(&self) -> impl Iterator<Item = WayRef> + '_ {
        self.parents.iter().filter_map(|parent| match parent {
            Parent::Way(way) => Some(*way),
            Parent::Relation(_) => None,
        })
    }

    pub(crate) fn add_parent(&mut self, parent: Parent) {
        self.parents.insert(parent);
    }

    pub(crate) fn remove_parent(&mut self, parent: Parent) {
        self.parents.remove(&parent);
    }
}

#[derive(Debug, Clone)]
pub struct Way {
    pub id: OsmId,
    pub tags: Tags,
    pub(crate) nodes: Vec<NodeRef>,
    pub(crate) parents: BTreeSet<RelationRef>,
}

impl Way {
    pub fn new(id: OsmId, tags: Tags) -> Self {
        Way {
            id,
            tags,
            nodes: Vec::new(),
            parents: BTreeSet::new(),
        }
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn parents(&self) -> impl Iterator<Item = RelationRef> + '_ {
        self.parents.iter().copied()
    }

    /// A way is closed when it has at least three nodes and ends where it starts.
    pub fn is_closed(&self) -> bool {
        self.nodes.len() >= 3 && self.nodes.first() == self.nodes.last()
    }
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub id: OsmId,
    pub tags: Tags,
    pub(crate) members: Vec<(ElementRef, String)>,
    pub(crate) parents: BTreeSet<RelationRef>,
}

impl Relation {
    pub fn new(id: OsmId, tags: Tags) -> Self {
        Relation {
            id,
            tags,
            members: Vec::new(),
            parents: BTreeSet::new(),
        }
    }

    pub fn members(&self) -> &[(ElementRef, String)] {
        &self.members
    }

    pub fn parents(&self) -> impl Iterator<Item = RelationRef> + '_ {
        self.parents.iter().copied()
    }

    /// Role of the first occurrence of `member`.
    pub fn member_role(&self, member: ElementRef) -> Option<&str> {
        self.members
            .iter()
            .find(|(candidate, _)| *candidate == member)
            .map(|(_, role)| role.as_str())
    }
}

/// Running envelope of all processed geometry. Only ever grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }
}

impl Boundary {
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn add_envelope(&mut self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) {
        self.min_x = self.min_x.min(min_x);
        self.max_x = self.max_x.max(max_x);
        self.min_y = self.min_y.min(min_y);
        self.max_y = self.max_y.max(max_y);
    }
}

/// Hands out element ids. All element kinds share a single counter.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    counter: OsmId,
    step: OsmId,
}

impl IdAllocator {
    pub fn new(start: OsmId, positive: bool) -> Self {
        IdAllocator {
            counter: start,
            step: if positive { 1 } else { -1 },
        }
    }

    pub fn next_id(&mut self) -> OsmId {
        self.counter += self.step;
        self.counter
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new(0, false)
    }
}
