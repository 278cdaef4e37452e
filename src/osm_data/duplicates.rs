use crate::data::osm::{ElementRef, NodeRef, RelationRef, WayRef};
use crate::data::Graph;
use crate::translation::MergeKind;

/// Canonical form of a node sequence.
///
/// A closed sequence is rotated to start (and end) at the node with the lowest id, so rings
/// drawn from different starting points compare equal. Open sequences are returned as they are.
pub fn ordered_nodes(graph: &Graph, nodes: &[NodeRef]) -> Vec<NodeRef> {
    let is_closed = nodes.len() > 2 && nodes.first() == nodes.last();
    if !is_closed {
        return nodes.to_vec();
    }

    let mut lowest = 0;
    for (index, node) in nodes.iter().enumerate().skip(1) {
        if graph.node(*node).id < graph.node(nodes[lowest]).id {
            lowest = index;
        }
    }

    let mut ordered = Vec::with_capacity(nodes.len());
    ordered.extend_from_slice(&nodes[lowest..nodes.len() - 1]);
    ordered.extend_from_slice(&nodes[..=lowest]);
    ordered
}

/// Ways among `candidates` holding exactly `nodes`, either forwards or backwards.
pub fn verify_duplicate_ways(graph: &Graph, candidates: &[WayRef], nodes: &[NodeRef]) -> Vec<(WayRef, MergeKind)> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let ordered = ordered_nodes(graph, nodes);
    let mut duplicates = Vec::new();
    for &candidate in candidates {
        let candidate_nodes = graph.way(candidate).nodes();
        if candidate_nodes.len() != nodes.len() {
            continue;
        }
        let candidate_ordered = ordered_nodes(graph, candidate_nodes);
        if candidate_ordered == ordered {
            duplicates.push((candidate, MergeKind::Way));
        } else if candidate_ordered.iter().eq(ordered.iter().rev()) {
            duplicates.push((candidate, MergeKind::ReverseWay));
        }
    }
    duplicates
}

/// Relations among `candidates` whose member list equals `members`, order and roles included.
pub fn verify_duplicate_relations(
    graph: &Graph,
    candidates: &[RelationRef],
    members: &[(ElementRef, String)],
) -> Vec<RelationRef> {
    candidates
        .iter()
        .copied()
        .filter(|candidate| graph.relation(*candidate).members() == members)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::{Tags, ROLE_INNER, ROLE_OUTER};

    /// Graph with `count` nodes (ids -1, -2, ...) and one way per entry of `ways`.
    fn graph_with(count: usize, ways: &[&[usize]]) -> (Graph, Vec<NodeRef>, Vec<WayRef>) {
        let mut graph = Graph::default();
        let mut id = 0;
        let nodes: Vec<NodeRef> = (0..count)
            .map(|index| {
                id -= 1;
                graph.push_node(id, index as f64, 0.0, Tags::new())
            })
            .collect();
        let ways = ways
            .iter()
            .map(|indices| {
                id -= 1;
                let way = graph.push_way(id, Tags::new());
                graph.set_way_nodes(way, indices.iter().map(|index| nodes[*index]).collect());
                way
            })
            .collect();
        (graph, nodes, ways)
    }

    #[test]
    fn test_rotated_rings_share_canonical_form() {
        let (graph, n, ways) = graph_with(3, &[&[0, 1, 2, 0]]);
        let rotated = vec![n[1], n[2], n[0], n[1]];

        assert_eq!(ordered_nodes(&graph, &[n[0], n[1], n[2], n[0]]), ordered_nodes(&graph, &rotated));
        // ids decrease with creation, so n2 has the lowest id
        assert_eq!(ordered_nodes(&graph, &rotated), vec![n[2], n[0], n[1], n[2]]);

        assert_eq!(verify_duplicate_ways(&graph, &ways, &rotated), vec![(ways[0], MergeKind::Way)]);

        let reversed: Vec<_> = rotated.iter().rev().copied().collect();
        assert_eq!(
            verify_duplicate_ways(&graph, &ways, &reversed),
            vec![(ways[0], MergeKind::ReverseWay)]
        );
    }

    #[test]
    fn test_open_sequences_are_not_rotated() {
        let (graph, n, ways) = graph_with(3, &[&[0, 1, 2]]);

        assert_eq!(ordered_nodes(&graph, &[n[2], n[0], n[1]]), vec![n[2], n[0], n[1]]);
        assert_eq!(ordered_nodes(&graph, &[n[0], n[0]]), vec![n[0], n[0]]);
        assert!(verify_duplicate_ways(&graph, &ways, &[n[1], n[2], n[0]]).is_empty());
        assert_eq!(
            verify_duplicate_ways(&graph, &ways, &[n[2], n[1], n[0]]),
            vec![(ways[0], MergeKind::ReverseWay)]
        );
    }

    #[test]
    fn test_way_length_must_match() {
        let (graph, n, ways) = graph_with(4, &[&[0, 1, 2], &[0, 1, 2, 3], &[0, 1, 2]]);

        assert_eq!(
            verify_duplicate_ways(&graph, &ways, &[n[0], n[1], n[2]]),
            vec![(ways[0], MergeKind::Way), (ways[2], MergeKind::Way)]
        );
        assert!(verify_duplicate_ways(&graph, &[], &[n[0], n[1], n[2]]).is_empty());
    }

    #[test]
    fn test_relation_members_are_order_sensitive() {
        let (mut graph, _, ways) = graph_with(6, &[&[0, 1, 2, 0], &[3, 4, 5, 3]]);
        let (a, b) = (ElementRef::Way(ways[0]), ElementRef::Way(ways[1]));
        let relation = graph.push_relation(-100, Tags::new());
        graph.add_relation_member(relation, a, ROLE_OUTER);
        graph.add_relation_member(relation, b, ROLE_INNER);

        let same = vec![(a, ROLE_OUTER.to_string()), (b, ROLE_INNER.to_string())];
        let swapped = vec![(b, ROLE_INNER.to_string()), (a, ROLE_OUTER.to_string())];
        let other_roles = vec![(a, ROLE_OUTER.to_string()), (b, ROLE_OUTER.to_string())];

        assert_eq!(verify_duplicate_relations(&graph, &[relation], &same), vec![relation]);
        assert!(verify_duplicate_relations(&graph, &[relation], &swapped).is_empty());
        assert!(verify_duplicate_relations(&graph, &[relation], &other_roles).is_empty());
        assert!(verify_duplicate_relations(&graph, &[relation], &same[..1]).is_empty());
    }
}
