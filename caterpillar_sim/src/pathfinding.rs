// Breadth-first shortest paths over the branch graph.
//
// The branch graph is small and unweighted, so plain BFS is exact. The
// frontier is a FIFO `VecDeque`; visited flags and back-pointers live in
// `Vec`s indexed by `NodeId` (no `HashMap`). Neighbors are expanded in their
// stored adjacency order, which makes that order, and not the graph shape,
// decide which path wins among several of equal length.
//
// See also: `branch.rs` for the graph, `planner.rs` which turns these paths
// into plan legs.
//
// **Critical constraint: determinism.** BFS is a pure function of the graph
// and the two endpoints.

use crate::branch::BranchGraph;
use crate::types::NodeId;
use std::collections::VecDeque;

/// Find a shortest path from `start` to `goal`.
///
/// The returned sequence begins with `start` and ends with `goal`. Returns
/// `Some(vec![start])` when the two are equal and `None` when either id is
/// not in the graph or `goal` is unreachable.
pub fn shortest_path(graph: &BranchGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
    let n = graph.node_count();
    if start.index() >= n || goal.index() >= n {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut visited = vec![false; n];
    let mut came_from: Vec<Option<NodeId>> = vec![None; n];
    let mut frontier = VecDeque::new();

    visited[start.index()] = true;
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        if current == goal {
            return Some(reconstruct_path(&came_from, start, goal));
        }
        for &next in graph.neighbors(current) {
            let ni = next.index();
            if ni >= n || visited[ni] {
                continue;
            }
            visited[ni] = true;
            came_from[ni] = Some(current);
            frontier.push_back(next);
        }
    }

    None
}

fn reconstruct_path(came_from: &[Option<NodeId>], start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from[current.index()] {
            Some(prev) => {
                nodes.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    nodes.reverse();
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{BranchLayout, PointKind, RestSlot, TurnRole};
    use crate::types::Vec3;
    use proptest::prelude::*;

    fn turn() -> PointKind {
        PointKind::Turn(TurnRole::Plain)
    }

    #[test]
    fn trivial_path() {
        let mut graph = BranchGraph::new();
        let a = graph.add_node("a", turn(), Vec3::ZERO);
        assert_eq!(shortest_path(&graph, a, a), Some(vec![a]));
    }

    #[test]
    fn simple_chain() {
        let mut graph = BranchGraph::new();
        let a = graph.add_node("a", turn(), Vec3::ZERO);
        let b = graph.add_node("b", turn(), Vec3::ZERO);
        let c = graph.add_node("c", turn(), Vec3::ZERO);
        graph.connect(a, b);
        graph.connect(b, c);
        assert_eq!(shortest_path(&graph, a, c), Some(vec![a, b, c]));
        assert_eq!(shortest_path(&graph, c, a), Some(vec![c, b, a]));
    }

    #[test]
    fn no_path() {
        let mut graph = BranchGraph::new();
        let a = graph.add_node("a", turn(), Vec3::ZERO);
        let b = graph.add_node("b", turn(), Vec3::ZERO);
        assert_eq!(shortest_path(&graph, a, b), None);
    }

    #[test]
    fn edges_are_directed() {
        let mut graph = BranchGraph::new();
        let a = graph.add_node("a", turn(), Vec3::ZERO);
        let b = graph.add_node("b", turn(), Vec3::ZERO);
        graph.add_neighbor(a, b);
        assert!(shortest_path(&graph, a, b).is_some());
        assert!(shortest_path(&graph, b, a).is_none());
    }

    #[test]
    fn unknown_endpoints_yield_none() {
        let mut graph = BranchGraph::new();
        let a = graph.add_node("a", turn(), Vec3::ZERO);
        assert_eq!(shortest_path(&graph, a, NodeId(5)), None);
        assert_eq!(shortest_path(&graph, NodeId(5), a), None);
    }

    #[test]
    fn adjacency_order_breaks_ties() {
        // Diamond a -> {b, c} -> d: both routes have length 3.
        let mut graph = BranchGraph::new();
        let a = graph.add_node("a", turn(), Vec3::ZERO);
        let b = graph.add_node("b", turn(), Vec3::ZERO);
        let c = graph.add_node("c", turn(), Vec3::ZERO);
        let d = graph.add_node("d", turn(), Vec3::ZERO);
        graph.add_neighbor(a, c);
        graph.add_neighbor(a, b);
        graph.add_neighbor(b, d);
        graph.add_neighbor(c, d);
        assert_eq!(shortest_path(&graph, a, d), Some(vec![a, c, d]));
    }

    #[test]
    fn every_leaf_reachable_from_both_rest_points() {
        let graph = BranchGraph::from_layout(&BranchLayout::cage_default()).unwrap();
        let leaves: Vec<NodeId> = graph.leaf_points().map(|(_, id)| id).collect();
        for slot in [RestSlot::A, RestSlot::B] {
            let rest = graph.rest_point(slot).unwrap();
            for &leaf in &leaves {
                assert!(shortest_path(&graph, rest, leaf).is_some());
                assert!(shortest_path(&graph, leaf, rest).is_some());
            }
        }
    }

    /// Reference all-pairs hop distances by repeated relaxation.
    fn hop_distances(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<Option<usize>>> {
        let mut dist = vec![vec![None; n]; n];
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = Some(0);
        }
        for _ in 0..n {
            for &(u, v) in edges {
                for row in dist.iter_mut() {
                    let Some(du) = row[u] else { continue };
                    if row[v].is_none_or(|dv| du + 1 < dv) {
                        row[v] = Some(du + 1);
                    }
                }
            }
        }
        dist
    }

    fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (1usize..10).prop_flat_map(|n| {
            (
                Just(n),
                proptest::collection::vec((0..n, 0..n), 0..(n * 3)),
            )
        })
    }

    proptest! {
        #[test]
        fn bfs_paths_are_shortest_and_valid(
            (n, edges) in arb_graph(),
            s in 0usize..10,
            g in 0usize..10,
        ) {
            let s = s % n;
            let g = g % n;
            let mut graph = BranchGraph::new();
            for i in 0..n {
                graph.add_node(format!("p{i}"), PointKind::Turn(TurnRole::Plain), Vec3::ZERO);
            }
            for &(u, v) in &edges {
                graph.add_neighbor(NodeId(u as u32), NodeId(v as u32));
            }
            let dist = hop_distances(n, &edges);
            let path = shortest_path(&graph, NodeId(s as u32), NodeId(g as u32));
            match dist[s][g] {
                None => prop_assert!(path.is_none()),
                Some(d) => {
                    let path = path.unwrap();
                    prop_assert_eq!(path.len(), d + 1);
                    prop_assert_eq!(path[0], NodeId(s as u32));
                    prop_assert_eq!(*path.last().unwrap(), NodeId(g as u32));
                    for pair in path.windows(2) {
                        prop_assert!(graph.neighbors(pair[0]).contains(&pair[1]));
                    }
                }
            }
        }
    }
}
