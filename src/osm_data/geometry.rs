use geo::{Geometry, LineString, MultiPolygon, Point, Polygon};
use log::warn;

use crate::data::osm::{ElementRef, NodeRef, RelationRef, Tags, WayRef, ROLE_INNER, ROLE_MEMBER, ROLE_OUTER};
use crate::translation::MergeKind;

use super::duplicates::{verify_duplicate_relations, verify_duplicate_ways};
use super::OsmData;

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

impl OsmData {
    pub(crate) fn parse_geometry(&mut self, geometry: &Geometry<f64>, tags: Tags) -> Vec<ElementRef> {
        match geometry {
            Geometry::Point(point) => vec![ElementRef::Node(self.parse_point(point, tags))],
            Geometry::LineString(line) => self.parse_linestring(line, tags).map(ElementRef::Way).into_iter().collect(),
            Geometry::Polygon(polygon) => self.parse_polygon(polygon, tags).into_iter().collect(),
            Geometry::MultiPolygon(polygons) => self.parse_multipolygon(polygons, tags),
            Geometry::MultiLineString(lines) => lines
                .0
                .iter()
                .filter_map(|line| self.parse_linestring(line, tags.clone()))
                .map(ElementRef::Way)
                .collect(),
            Geometry::MultiPoint(points) => {
                let relation = self.new_relation(tags);
                for point in &points.0 {
                    let node = self.parse_point(point, Tags::new());
                    self.graph.add_relation_member(relation, ElementRef::Node(node), ROLE_MEMBER);
                }
                vec![ElementRef::Relation(relation)]
            },
            Geometry::GeometryCollection(collection) => {
                let relation = self.new_relation(tags);
                for part in &collection.0 {
                    for member in self.parse_geometry(part, Tags::new()) {
                        self.graph.add_relation_member(relation, member, ROLE_MEMBER);
                    }
                }
                vec![ElementRef::Relation(relation)]
            },
            other => {
                warn!(geometry_type = geometry_type_name(other); "Unhandled geometry");
                Vec::new()
            },
        }
    }

    fn new_relation(&mut self, tags: Tags) -> RelationRef {
        self.graph.push_relation(self.ids.next_id(), tags)
    }

    fn parse_point(&mut self, point: &Point<f64>, tags: Tags) -> NodeRef {
        self.add_node(point.x(), point.y(), tags, false)
    }

    /// Way through the points of `line`, or an existing way with the same nodes when the
    /// translation agrees to merge.
    pub(crate) fn parse_linestring(&mut self, line: &LineString<f64>, tags: Tags) -> Option<WayRef> {
        if line.0.is_empty() {
            warn!("Linestring without points");
            return None;
        }

        let mut nodes: Vec<NodeRef> = Vec::with_capacity(line.0.len());
        let mut potential_duplicates: Vec<WayRef> = Vec::new();
        for coord in line.coords() {
            let node = self.add_node(coord.x, coord.y, Tags::new(), true);
            if nodes.last() == Some(&node) {
                continue;
            }
            if nodes.is_empty() {
                potential_duplicates = self.graph.node(node).parent_ways().collect();
            } else if !potential_duplicates.is_empty() && self.graph.node(node).parent_ways().next().is_none() {
                // a node outside every way rules out any duplicate
                potential_duplicates.clear();
            }
            nodes.push(node);
        }

        for (duplicate, kind) in verify_duplicate_ways(&self.graph, &potential_duplicates, &nodes) {
            let way = &mut self.graph.ways[duplicate.0];
            if let Some(merged) = self.translation.merge_tags(kind, &way.tags, &tags) {
                way.tags = merged;
                return Some(duplicate);
            }
        }

        let way = self.graph.push_way(self.ids.next_id(), tags);
        self.graph.set_way_nodes(way, nodes);
        Some(way)
    }

    fn way_fits(&self, line: &LineString<f64>) -> bool {
        line.0.len() <= self.max_points_in_way
    }

    pub(crate) fn parse_polygon(&mut self, polygon: &Polygon<f64>, tags: Tags) -> Option<ElementRef> {
        let exterior_ring = polygon.exterior();
        if exterior_ring.0.is_empty() {
            warn!("Polygon with no rings");
            return None;
        }
        if polygon.interiors().is_empty() && self.way_fits(exterior_ring) {
            return self.parse_linestring(exterior_ring, tags).map(ElementRef::Way);
        }

        let exterior = self.parse_linestring(exterior_ring, Tags::new())?;
        let exterior_member = ElementRef::Way(exterior);
        let mut members = vec![(exterior_member, ROLE_OUTER.to_string())];
        let mut potential_duplicates: Vec<RelationRef> = self
            .graph
            .way(exterior)
            .parents()
            .filter(|relation| self.graph.relation(*relation).member_role(exterior_member) == Some(ROLE_OUTER))
            .collect();

        for interior_ring in polygon.interiors() {
            let Some(interior) = self.parse_linestring(interior_ring, Tags::new()) else {
                continue;
            };
            if !potential_duplicates.is_empty() && self.graph.way(interior).parents().next().is_none() {
                potential_duplicates.clear();
            }
            members.push((ElementRef::Way(interior), ROLE_INNER.to_string()));
        }

        for duplicate in verify_duplicate_relations(&self.graph, &potential_duplicates, &members) {
            let relation = &mut self.graph.relations[duplicate.0];
            if let Some(merged) = self.translation.merge_tags(MergeKind::Relation, &relation.tags, &tags) {
                relation.tags = merged;
                return Some(ElementRef::Relation(duplicate));
            }
        }

        let relation = self.new_relation(tags);
        for (member, role) in &members {
            self.graph.add_relation_member(relation, *member, role);
        }
        Some(ElementRef::Relation(relation))
    }

    fn parse_multipolygon(&mut self, polygons: &MultiPolygon<f64>, tags: Tags) -> Vec<ElementRef> {
        match polygons.0.as_slice() {
            [] => {
                warn!("MultiPolygon without parts");
                Vec::new()
            },
            [polygon] => self.parse_polygon(polygon, tags).into_iter().collect(),
            parts => {
                let relation = self.new_relation(tags);
                for polygon in parts {
                    if let Some(exterior) = self.parse_linestring(polygon.exterior(), Tags::new()) {
                        self.graph.add_relation_member(relation, ElementRef::Way(exterior), ROLE_OUTER);
                    }
                    for interior_ring in polygon.interiors() {
                        if let Some(interior) = self.parse_linestring(interior_ring, Tags::new()) {
                            self.graph.add_relation_member(relation, ElementRef::Way(interior), ROLE_INNER);
                        }
                    }
                }
                vec![ElementRef::Relation(relation)]
            },
        }
    }
}
