use self::osm::{ElementRef, Node, NodeRef, OsmId, Parent, Relation, RelationRef, Tags, Way, WayRef};

pub mod index;
pub mod osm;

/// Arena of every element produced by a conversion. Elements refer to each other by index, so
/// containers never own their members and back-references are plain indices as well.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) ways: Vec<Way>,
    pub(crate) relations: Vec<Relation>,
}

impl Graph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn node(&self, node: NodeRef) -> &Node {
        &self.nodes[node.0]
    }

    pub fn way(&self, way: WayRef) -> &Way {
        &self.ways[way.0]
    }

    pub fn relation(&self, relation: RelationRef) -> &Relation {
        &self.relations[relation.0]
    }

    pub fn element_id(&self, element: ElementRef) -> OsmId {
        match element {
            ElementRef::Node(node) => self.node(node).id,
            ElementRef::Way(way) => self.way(way).id,
            ElementRef::Relation(relation) => self.relation(relation).id,
        }
    }

    pub fn element_tags(&self, element: ElementRef) -> &Tags {
        match element {
            ElementRef::Node(node) => &self.node(node).tags,
            ElementRef::Way(way) => &self.way(way).tags,
            ElementRef::Relation(relation) => &self.relation(relation).tags,
        }
    }

    pub(crate) fn push_node(&mut self, id: OsmId, x: f64, y: f64, tags: Tags) -> NodeRef {
        self.nodes.push(Node::new(id, x, y, tags));
        NodeRef(self.nodes.len() - 1)
    }

    pub(crate) fn push_way(&mut self, id: OsmId, tags: Tags) -> WayRef {
        self.ways.push(Way::new(id, tags));
        WayRef(self.ways.len() - 1)
    }

    pub(crate) fn push_relation(&mut self, id: OsmId, tags: Tags) -> RelationRef {
        self.relations.push(Relation::new(id, tags));
        RelationRef(self.relations.len() - 1)
    }

    /// Assigns `nodes` to `way` and registers the way as parent of each of them.
    pub(crate) fn set_way_nodes(&mut self, way: WayRef, nodes: Vec<NodeRef>) {
        for node in &nodes {
            self.nodes[node.0].add_parent(Parent::Way(way));
        }
        self.ways[way.0].nodes = nodes;
    }

    pub(crate) fn add_relation_member(&mut self, relation: RelationRef, member: ElementRef, role: &str) {
        let position = self.relations[relation.0].members.len();
        self.insert_relation_member(relation, position, member, role);
    }

    pub(crate) fn insert_relation_member(
        &mut self,
        relation: RelationRef,
        position: usize,
        member: ElementRef,
        role: &str,
    ) {
        match member {
            ElementRef::Node(node) => self.nodes[node.0].add_parent(Parent::Relation(relation)),
            ElementRef::Way(way) => {
                self.ways[way.0].parents.insert(relation);
            },
            ElementRef::Relation(child) => {
                self.relations[child.0].parents.insert(relation);
            },
        }
        self.relations[relation.0]
            .members
            .insert(position, (member, role.to_string()));
    }
}
