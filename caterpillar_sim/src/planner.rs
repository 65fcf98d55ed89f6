// Route planning: which leaves to visit today, and how to get there.
//
// `RoutePlanner::build_plan` produces a `RoutePlan`, a one-shot value the
// executor consumes. The plan has one leg per selected target leaf, in visit
// order, plus a final leg to a rest spot:
//
//   targets: [t0, t1, ..., tn-1]
//   legs:    [cursor->t0, cursor->t1, ..., cursor->rest]
//
// so `legs.len() == targets.len() + 1` always holds. A target whose leaf is
// unknown to the registry, or unreachable from the cursor, gets an empty leg
// and leaves the cursor where it was. The rest spot is chosen by the last
// leaf actually reached (see `choreography::rest_slot_for`).
//
// Target selection shuffles the registry's ids with the planner's own
// `GameRng`. Tests construct planners with a fixed seed; the cage seeds from
// its config, and `from_entropy` exists for callers that want a different
// day every run.
//
// See also: `pathfinding.rs` for BFS, `executor.rs` which plays the plan back.

use crate::branch::{BranchGraph, RestSlot};
use crate::choreography::rest_slot_for;
use crate::leaves::LeafRegistry;
use crate::pathfinding;
use crate::types::{LeafId, NodeId};
use caterpillar_prng::GameRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

/// A path through the branch graph. Index 0 is the point the actor occupies
/// when the leg starts. Empty means "skip this leg".
pub type Leg = SmallVec<[NodeId; 8]>;

/// The day's itinerary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub targets: Vec<LeafId>,
    pub legs: Vec<Leg>,
}

impl RoutePlan {
    /// The final leg, to the rest spot.
    pub fn rest_leg(&self) -> Option<&Leg> {
        self.legs.last()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutePlanner {
    rng: GameRng,
}

impl RoutePlanner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: GameRng::new(seed),
        }
    }

    /// A planner seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    /// Shuffle `ids` and keep the first `count` of them (clamped to
    /// `0..=ids.len()`).
    pub fn select_targets(&mut self, mut ids: Vec<LeafId>, count: i32) -> Vec<LeafId> {
        let take = usize::try_from(count).unwrap_or(0).min(ids.len());
        self.rng.shuffle(&mut ids);
        ids.truncate(take);
        ids
    }

    /// BFS between two optional endpoints; an absent endpoint or an
    /// unreachable goal gives an empty leg.
    pub fn shortest_path(graph: &BranchGraph, start: Option<NodeId>, goal: Option<NodeId>) -> Leg {
        let (Some(start), Some(goal)) = (start, goal) else {
            return Leg::new();
        };
        pathfinding::shortest_path(graph, start, goal)
            .map(Leg::from_vec)
            .unwrap_or_default()
    }

    /// Rest node for a day that ended at `last` (the last leaf reached, or
    /// the last one requested when none were reached). Falls back to the
    /// other rest node when the preferred one is absent.
    pub fn map_rest_node(
        last: Option<&LeafId>,
        rest_a: Option<NodeId>,
        rest_b: Option<NodeId>,
    ) -> Option<NodeId> {
        match rest_slot_for(last) {
            RestSlot::A => rest_a.or(rest_b),
            RestSlot::B => rest_b.or(rest_a),
        }
    }

    /// Plan a feeding route from `start` covering `required` randomly chosen
    /// leaves, ending at a rest node.
    pub fn build_plan(
        &mut self,
        graph: &BranchGraph,
        start: Option<NodeId>,
        required: i32,
        registry: &dyn LeafRegistry,
        rest_a: Option<NodeId>,
        rest_b: Option<NodeId>,
    ) -> RoutePlan {
        let targets = self.select_targets(registry.leaf_ids(), required);
        let mut legs = Vec::with_capacity(targets.len() + 1);
        let mut cursor = start;
        let mut last_reached: Option<&LeafId> = None;

        for target in &targets {
            let node = registry.lookup(target);
            if node.is_none() {
                warn!(leaf = %target, "plan_target_not_in_registry");
            }
            let leg = Self::shortest_path(graph, cursor, node);
            if leg.is_empty() {
                debug!(leaf = %target, "plan_target_unreachable");
            } else {
                cursor = node;
                last_reached = Some(target);
            }
            legs.push(leg);
        }

        let last = last_reached.or(targets.last());
        let rest = Self::map_rest_node(last, rest_a, rest_b);
        if rest.is_none() {
            warn!("plan_has_no_rest_node");
        }
        legs.push(Self::shortest_path(graph, cursor, rest));

        debug!(
            targets = ?targets,
            legs = legs.len(),
            rest = ?rest,
            "route_planned"
        );
        RoutePlan { targets, legs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{BranchLayout, PointKind, TurnRole};
    use crate::leaves::{LeafBoard, LeafRecord, LeafState};
    use crate::types::Vec3;
    use proptest::prelude::*;

    fn ids(names: &[&str]) -> Vec<LeafId> {
        names.iter().map(|&n| LeafId::from(n)).collect()
    }

    /// Start -- T1 -- Leaf(X), with a rest spot hanging off T1.
    struct Tiny {
        graph: BranchGraph,
        start: NodeId,
        t1: NodeId,
        x: NodeId,
        rest: NodeId,
    }

    fn tiny() -> Tiny {
        let mut graph = BranchGraph::new();
        let start = graph.add_node("Start", PointKind::Turn(TurnRole::Plain), Vec3::new(0.0, 0.0, 0.0));
        let t1 = graph.add_node("T1", PointKind::Turn(TurnRole::Plain), Vec3::new(1.0, 0.0, 0.0));
        let x = graph.add_node("X", PointKind::Leaf(LeafId::from("X")), Vec3::new(2.0, 0.0, 0.0));
        let rest = graph.add_node("RestA", PointKind::Sleep(RestSlot::A), Vec3::new(1.0, 0.0, 1.0));
        graph.connect(start, t1);
        graph.connect(t1, x);
        graph.connect(t1, rest);
        Tiny {
            graph,
            start,
            t1,
            x,
            rest,
        }
    }

    #[test]
    fn single_leaf_scenario() {
        let t = tiny();
        let board = LeafBoard::from_graph(&t.graph);
        let mut planner = RoutePlanner::new(7);
        let plan = planner.build_plan(&t.graph, Some(t.start), 1, &board, Some(t.rest), None);
        assert_eq!(plan.targets, ids(&["X"]));
        assert_eq!(plan.legs.len(), 2);
        assert_eq!(plan.legs[0].as_slice(), [t.start, t.t1, t.x]);
        assert_eq!(plan.legs[1].as_slice(), [t.x, t.t1, t.rest]);
    }

    #[test]
    fn missing_leaf_keeps_target_and_cursor() {
        let t = tiny();
        let mut board = LeafBoard::new();
        board.insert(LeafRecord {
            id: LeafId::from("Ghost"),
            state: LeafState::Fresh,
            point: None,
        });
        let mut planner = RoutePlanner::new(1);
        let plan = planner.build_plan(&t.graph, Some(t.start), 1, &board, Some(t.rest), None);
        assert_eq!(plan.targets, ids(&["Ghost"]));
        assert!(plan.legs[0].is_empty());
        // Rest leg departs from the unchanged start.
        assert_eq!(plan.legs[1].as_slice(), [t.start, t.t1, t.rest]);
    }

    #[test]
    fn unreachable_leaf_keeps_cursor() {
        let mut t = tiny();
        let island = t.graph.add_node("Island", PointKind::Leaf(LeafId::from("Y")), Vec3::ZERO);
        let mut board = LeafBoard::new();
        board.insert(LeafRecord {
            id: LeafId::from("Y"),
            state: LeafState::Fresh,
            point: Some(island),
        });
        let mut planner = RoutePlanner::new(3);
        let plan = planner.build_plan(&t.graph, Some(t.start), 1, &board, Some(t.rest), None);
        assert!(plan.legs[0].is_empty());
        assert_eq!(plan.legs[1].first(), Some(&t.start));
    }

    #[test]
    fn zero_required_goes_straight_to_rest() {
        let t = tiny();
        let board = LeafBoard::from_graph(&t.graph);
        let mut planner = RoutePlanner::new(0);
        for required in [0, -3] {
            let plan = planner.build_plan(&t.graph, Some(t.start), required, &board, Some(t.rest), None);
            assert!(plan.targets.is_empty());
            assert_eq!(plan.legs.len(), 1);
            assert_eq!(plan.legs[0].as_slice(), [t.start, t.t1, t.rest]);
        }
    }

    #[test]
    fn no_rest_node_gives_empty_final_leg() {
        let t = tiny();
        let board = LeafBoard::from_graph(&t.graph);
        let mut planner = RoutePlanner::new(0);
        let plan = planner.build_plan(&t.graph, Some(t.start), 1, &board, None, None);
        assert_eq!(plan.legs.len(), 2);
        assert!(plan.rest_leg().is_some_and(|leg| leg.is_empty()));
    }

    #[test]
    fn map_rest_node_affinity() {
        let (a, b) = (Some(NodeId(0)), Some(NodeId(1)));
        let leaf = |id: &str| LeafId::from(id);
        assert_eq!(RoutePlanner::map_rest_node(Some(&leaf("A")), a, b), b);
        assert_eq!(RoutePlanner::map_rest_node(Some(&leaf("B")), a, b), b);
        assert_eq!(RoutePlanner::map_rest_node(Some(&leaf("C")), a, b), a);
        assert_eq!(RoutePlanner::map_rest_node(None, a, b), a);
    }

    #[test]
    fn map_rest_node_falls_back() {
        let leaf = |id: &str| LeafId::from(id);
        assert_eq!(RoutePlanner::map_rest_node(Some(&leaf("A")), Some(NodeId(0)), None), Some(NodeId(0)));
        assert_eq!(RoutePlanner::map_rest_node(Some(&leaf("D")), None, Some(NodeId(1))), Some(NodeId(1)));
        assert_eq!(RoutePlanner::map_rest_node(None, None, None), None);
    }

    #[test]
    fn rest_follows_last_reached_leaf() {
        let graph = BranchGraph::from_layout(&BranchLayout::cage_default()).unwrap();
        let board = LeafBoard::from_graph(&graph);
        let rest_a = graph.rest_point(RestSlot::A);
        let rest_b = graph.rest_point(RestSlot::B);
        for seed in 0..20 {
            let mut planner = RoutePlanner::new(seed);
            let plan = planner.build_plan(&graph, rest_a, 3, &board, rest_a, rest_b);
            let expected = RoutePlanner::map_rest_node(plan.targets.last(), rest_a, rest_b);
            assert_eq!(plan.rest_leg().and_then(|leg| leg.last().copied()), expected);
        }
    }

    #[test]
    fn legs_chain_on_default_branch() {
        let graph = BranchGraph::from_layout(&BranchLayout::cage_default()).unwrap();
        let board = LeafBoard::from_graph(&graph);
        let rest_a = graph.rest_point(RestSlot::A);
        let rest_b = graph.rest_point(RestSlot::B);
        let mut planner = RoutePlanner::new(42);
        let plan = planner.build_plan(&graph, rest_a, 5, &board, rest_a, rest_b);
        assert_eq!(plan.targets.len(), 5);
        assert_eq!(plan.legs.first().and_then(|l| l.first().copied()), rest_a);
        for pair in plan.legs.windows(2) {
            assert_eq!(pair[0].last(), pair[1].first());
        }
        for (target, leg) in plan.targets.iter().zip(&plan.legs) {
            assert_eq!(leg.last().copied(), board.lookup(target));
        }
    }

    #[test]
    fn same_seed_same_plan() {
        let graph = BranchGraph::from_layout(&BranchLayout::cage_default()).unwrap();
        let board = LeafBoard::from_graph(&graph);
        let rest_a = graph.rest_point(RestSlot::A);
        let rest_b = graph.rest_point(RestSlot::B);
        let plan_1 = RoutePlanner::new(99).build_plan(&graph, rest_a, 3, &board, rest_a, rest_b);
        let plan_2 = RoutePlanner::new(99).build_plan(&graph, rest_a, 3, &board, rest_a, rest_b);
        assert_eq!(plan_1, plan_2);
    }

    proptest! {
        #[test]
        fn select_targets_is_clamped_subset(
            n_ids in 0usize..12,
            count in -5i32..20,
            seed in any::<u64>(),
        ) {
            let all: Vec<LeafId> = (0..n_ids).map(|i| LeafId::new(format!("L{i}"))).collect();
            let picked = RoutePlanner::new(seed).select_targets(all.clone(), count);
            let expected = usize::try_from(count).unwrap_or(0).min(n_ids);
            prop_assert_eq!(picked.len(), expected);
            let mut sorted = picked.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), picked.len());
            prop_assert!(picked.iter().all(|id| all.contains(id)));
        }

        #[test]
        fn select_all_is_permutation(n_ids in 0usize..12, seed in any::<u64>()) {
            let all: Vec<LeafId> = (0..n_ids).map(|i| LeafId::new(format!("L{i}"))).collect();
            let mut picked = RoutePlanner::new(seed).select_targets(all.clone(), 100);
            let mut expected = all;
            picked.sort();
            expected.sort();
            prop_assert_eq!(picked, expected);
        }

        #[test]
        fn legs_exceed_targets_by_one(required in -2i32..8, seed in any::<u64>()) {
            let graph = BranchGraph::from_layout(&BranchLayout::cage_default()).unwrap();
            let board = LeafBoard::from_graph(&graph);
            let rest_a = graph.rest_point(RestSlot::A);
            let rest_b = graph.rest_point(RestSlot::B);
            let plan = RoutePlanner::new(seed).build_plan(&graph, rest_a, required, &board, rest_a, rest_b);
            prop_assert_eq!(plan.legs.len(), plan.targets.len() + 1);
        }
    }
}
