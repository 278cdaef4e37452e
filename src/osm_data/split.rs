use std::collections::HashSet;

use log::debug;

use crate::data::osm::{ElementRef, NodeRef, Parent, WayRef};

use super::OsmData;

/// Start offsets of the chunks a way of `len` nodes is cut into. Consecutive chunks share their
/// boundary node, and no chunk is left with a single node.
fn chunk_starts(len: usize, limit: usize) -> impl Iterator<Item = usize> {
    (0..len.saturating_sub(1)).step_by(limit - 1)
}

impl OsmData {
    pub fn split_long_ways(&mut self) {
        let limit = self.max_points_in_way;
        if limit < 2 {
            return;
        }

        debug!(max_points_in_way = limit; "Splitting long ways");

        // ways appended while splitting are short enough already
        for index in 0..self.graph.ways.len() {
            let way = WayRef(index);
            if self.graph.way(way).nodes().len() <= limit {
                continue;
            }
            let parts = self.split_way(way, limit);
            self.split_way_in_relations(way, &parts);
        }
    }

    /// Cuts `way` into chunks of at most `limit` nodes. The first chunk stays in `way`, the returned
    /// ways hold the remaining ones.
    fn split_way(&mut self, way: WayRef, limit: usize) -> Vec<WayRef> {
        let nodes = std::mem::take(&mut self.graph.ways[way.0].nodes);
        let mut chunks = chunk_starts(nodes.len(), limit).map(|start| nodes[start..nodes.len().min(start + limit)].to_vec());

        let first = chunks.next().unwrap_or_default();
        let kept: HashSet<NodeRef> = first.iter().copied().collect();
        let tags = self.graph.way(way).tags.clone();

        let mut parts = Vec::new();
        for chunk in chunks {
            let part = self.graph.push_way(self.ids.next_id(), tags.clone());
            for node in &chunk {
                if !kept.contains(node) {
                    self.graph.nodes[node.0].remove_parent(Parent::Way(way));
                }
            }
            self.graph.set_way_nodes(part, chunk);
            parts.push(part);
        }
        self.graph.ways[way.0].nodes = first;

        debug!(way_id = self.graph.way(way).id, parts = parts.len() + 1; "Split way");
        parts
    }

    /// Adds `parts` to every relation holding `way`, right after it and with the same role.
    fn split_way_in_relations(&mut self, way: WayRef, parts: &[WayRef]) {
        let relations: Vec<_> = self.graph.way(way).parents().collect();
        for relation in relations {
            let members = self.graph.relation(relation).members();
            let Some(position) = members.iter().position(|(member, _)| *member == ElementRef::Way(way)) else {
                continue;
            };
            let role = members[position].1.clone();
            for (offset, part) in parts.iter().enumerate() {
                self.graph
                    .insert_relation_member(relation, position + 1 + offset, ElementRef::Way(*part), &role);
            }
        }
    }
}
