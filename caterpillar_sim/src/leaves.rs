// Leaf registry: which leaves exist, where they hang, and whether they have
// been eaten today.
//
// `LeafRegistry` is the seam the planner and executor talk to: the planner
// asks for the known ids and resolves each to a branch point, the executor
// marks leaves eaten on arrival. `LeafBoard` is the cage's implementation,
// built from the leaf points of a `BranchGraph`, and additionally owns the
// daily lifecycle (`reset_all_fresh` at feeding time, `mark_unvisited_wilted`
// at the end of the day).
//
// State transitions: `Fresh -> Eaten` and `Fresh -> Wilted` only. The daily
// reset is the one way back to `Fresh`.
//
// Records live in a `BTreeMap` keyed by `LeafId`, so `leaf_ids()` is sorted
// and the planner's shuffle input is deterministic.

use crate::branch::BranchGraph;
use crate::types::{LeafId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Consumption state of a leaf.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafState {
    #[default]
    Fresh,
    Eaten,
    Wilted,
}

/// One leaf on the branch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeafRecord {
    pub id: LeafId,
    pub state: LeafState,
    /// The branch point the leaf hangs from. `None` for a leaf that is known
    /// but not (or no longer) attached to the graph.
    pub point: Option<NodeId>,
}

/// The leaf lookup and consumption contract used by planning and execution.
pub trait LeafRegistry {
    /// Every known leaf id, in a stable order.
    fn leaf_ids(&self) -> Vec<LeafId>;

    /// The branch point a leaf hangs from.
    fn lookup(&self, id: &LeafId) -> Option<NodeId>;

    /// Record that the caterpillar ate a leaf.
    fn mark_eaten(&mut self, id: &LeafId);
}

/// The cage's leaves and their daily state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LeafBoard {
    records: BTreeMap<LeafId, LeafRecord>,
}

impl LeafBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// One fresh record per leaf point of the graph.
    pub fn from_graph(graph: &BranchGraph) -> Self {
        let mut board = Self::new();
        for (id, point) in graph.leaf_points() {
            board.insert(LeafRecord {
                id: id.clone(),
                state: LeafState::Fresh,
                point: Some(point),
            });
        }
        board
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, record: LeafRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn state(&self, id: &LeafId) -> Option<LeafState> {
        self.records.get(id).map(|r| r.state)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &LeafRecord> {
        self.records.values()
    }

    /// Start of a feeding cycle: every leaf is fresh again.
    pub fn reset_all_fresh(&mut self) {
        for record in self.records.values_mut() {
            record.state = LeafState::Fresh;
        }
        debug!(leaves = self.records.len(), "leaves_reset_fresh");
    }

    /// End of a feeding cycle: leaves nobody ate wilt. Returns how many did.
    pub fn mark_unvisited_wilted(&mut self) -> usize {
        let mut wilted = 0;
        for record in self.records.values_mut() {
            if record.state == LeafState::Fresh {
                record.state = LeafState::Wilted;
                wilted += 1;
            }
        }
        debug!(wilted, "leaves_wilted");
        wilted
    }
}

impl LeafRegistry for LeafBoard {
    fn leaf_ids(&self) -> Vec<LeafId> {
        self.records.keys().cloned().collect()
    }

    fn lookup(&self, id: &LeafId) -> Option<NodeId> {
        self.records.get(id).and_then(|r| r.point)
    }

    fn mark_eaten(&mut self, id: &LeafId) {
        match self.records.get_mut(id) {
            Some(record) if record.state == LeafState::Fresh => {
                record.state = LeafState::Eaten;
                debug!(leaf = %id, "leaf_marked_eaten");
            }
            Some(record) => {
                debug!(leaf = %id, state = ?record.state, "leaf_not_fresh_ignoring_eat");
            }
            None => {
                warn!(leaf = %id, "mark_eaten_for_unknown_leaf");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::BranchLayout;

    fn board() -> LeafBoard {
        let graph = BranchGraph::from_layout(&BranchLayout::cage_default()).unwrap();
        LeafBoard::from_graph(&graph)
    }

    #[test]
    fn board_has_one_fresh_record_per_leaf_point() {
        let board = board();
        assert_eq!(board.len(), 5);
        assert!(board.records().all(|r| r.state == LeafState::Fresh));
        assert!(board.records().all(|r| r.point.is_some()));
    }

    #[test]
    fn leaf_ids_are_sorted() {
        let ids: Vec<String> = board().leaf_ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn eaten_leaf_does_not_wilt() {
        let mut board = board();
        board.mark_eaten(&LeafId::from("C"));
        assert_eq!(board.mark_unvisited_wilted(), 4);
        assert_eq!(board.state(&LeafId::from("C")), Some(LeafState::Eaten));
        assert_eq!(board.state(&LeafId::from("A")), Some(LeafState::Wilted));
    }

    #[test]
    fn wilted_leaf_cannot_be_eaten() {
        let mut board = board();
        board.mark_unvisited_wilted();
        board.mark_eaten(&LeafId::from("A"));
        assert_eq!(board.state(&LeafId::from("A")), Some(LeafState::Wilted));
    }

    #[test]
    fn reset_restores_every_leaf() {
        let mut board = board();
        board.mark_eaten(&LeafId::from("B"));
        board.mark_unvisited_wilted();
        board.reset_all_fresh();
        assert!(board.records().all(|r| r.state == LeafState::Fresh));
    }

    #[test]
    fn detached_leaf_has_no_point() {
        let mut board = board();
        board.insert(LeafRecord {
            id: LeafId::from("F"),
            state: LeafState::Fresh,
            point: None,
        });
        assert!(board.leaf_ids().contains(&LeafId::from("F")));
        assert_eq!(board.lookup(&LeafId::from("F")), None);
        assert!(board.lookup(&LeafId::from("A")).is_some());
    }

    #[test]
    fn unknown_leaf_is_ignored() {
        let mut board = board();
        board.mark_eaten(&LeafId::from("Z"));
        assert_eq!(board.state(&LeafId::from("Z")), None);
        assert_eq!(board.len(), 5);
    }
}
