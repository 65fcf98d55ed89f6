// The branch graph the caterpillar crawls on.
//
// The graph is a small, static set of `PointNode`s (positions on the branch)
// with ordered, directed adjacency lists. It is built once from a
// `BranchLayout` (JSON-loadable, or `BranchLayout::cage_default()`) and never
// changes afterwards. `pathfinding.rs` searches it; `executor.rs` reads node
// positions and kinds while driving the actor.
//
// Every node carries a role tag (`PointKind`) instead of relying on its
// structural name: leaves know their `LeafId`, turn points know whether they
// are a hub or a junction (and of which hub/arm), and sleep points know which
// rest slot they are. The choreography tables in `choreography.rs` match on
// these tags.
//
// Storage is a `Vec` indexed by `NodeId` for O(1) lookup and deterministic
// iteration order. Adjacency order is significant: it is the tie-break order
// for breadth-first search.
//
// See also: `pathfinding.rs` for BFS over this graph, `leaves.rs` for the
// leaf registry built from the graph's leaf points, `config.rs` which embeds
// the layout.

use crate::error::LayoutError;
use crate::types::{LeafId, NodeId, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three major turn hubs of the cage branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hub {
    A,
    B,
    C,
}

/// The arm a minor junction belongs to (the lowercase suffix of the
/// junction's structural name, e.g. the `a` in `TurnPointBa`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    A,
    B,
    C,
}

/// Which of the two rest spots a sleep point is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RestSlot {
    A,
    B,
}

/// Role of a turn point in the turn choreography.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnRole {
    /// A major hub.
    Hub(Hub),
    /// A minor junction hanging off a hub.
    Junction { hub: Hub, arm: Arm },
    /// A turn point with no choreography; the actor walks through it.
    Plain,
}

/// What kind of point a node is, together with its role tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    Leaf(LeafId),
    Turn(TurnRole),
    Sleep(RestSlot),
}

impl PointKind {
    pub fn is_sleep(&self) -> bool {
        matches!(self, Self::Sleep(_))
    }

    pub fn leaf_id(&self) -> Option<&LeafId> {
        match self {
            Self::Leaf(id) => Some(id),
            _ => None,
        }
    }
}

/// A point on the branch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PointNode {
    pub id: NodeId,
    /// Structural name from the layout (e.g. `TurnPointBa`). Used for logs and
    /// for resolving layout references, never for behavior.
    pub name: String,
    pub kind: PointKind,
    pub position: Vec3,
    /// Outgoing adjacency, in search order.
    pub neighbors: Vec<NodeId>,
}

/// The branch graph container.
#[derive(Clone, Debug, Default)]
pub struct BranchGraph {
    pub nodes: Vec<PointNode>,
}

impl BranchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point with no neighbors. Returns its ID.
    pub fn add_node(&mut self, name: impl Into<String>, kind: PointKind, position: Vec3) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PointNode {
            id,
            name: name.into(),
            kind,
            position,
            neighbors: Vec::new(),
        });
        id
    }

    /// Append `to` to the end of `from`'s adjacency list. Unknown ids are
    /// ignored.
    pub fn add_neighbor(&mut self, from: NodeId, to: NodeId) {
        if to.index() >= self.nodes.len() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(from.index()) {
            node.neighbors.push(to);
        }
    }

    /// Connect two points in both directions.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        self.add_neighbor(a, b);
        self.add_neighbor(b, a);
    }

    pub fn node(&self, id: NodeId) -> Option<&PointNode> {
        self.nodes.get(id.index())
    }

    /// Outgoing neighbors of a node, or an empty slice for an unknown id.
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.neighbors.as_slice())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// The sleep point occupying the given rest slot, if the branch has one.
    pub fn rest_point(&self, slot: RestSlot) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.kind == PointKind::Sleep(slot))
            .map(|n| n.id)
    }

    /// All leaf points, in node order.
    pub fn leaf_points(&self) -> impl Iterator<Item = (&LeafId, NodeId)> {
        self.nodes
            .iter()
            .filter_map(|n| n.kind.leaf_id().map(|leaf| (leaf, n.id)))
    }

    /// Build a graph from a layout, resolving neighbor names to ids.
    pub fn from_layout(layout: &BranchLayout) -> Result<Self, LayoutError> {
        let mut graph = Self::new();
        let mut by_name: BTreeMap<&str, NodeId> = BTreeMap::new();
        let mut leaves: BTreeMap<&LeafId, NodeId> = BTreeMap::new();

        for spec in &layout.points {
            if by_name.contains_key(spec.name.as_str()) {
                return Err(LayoutError::DuplicatePoint(spec.name.clone()));
            }
            let id = graph.add_node(spec.name.clone(), spec.kind.clone(), spec.position);
            by_name.insert(spec.name.as_str(), id);
            let duplicate = spec
                .kind
                .leaf_id()
                .filter(|&leaf| leaves.insert(leaf, id).is_some());
            if let Some(leaf) = duplicate {
                return Err(LayoutError::DuplicateLeaf(leaf.to_string()));
            }
        }

        for spec in &layout.points {
            let from = by_name[spec.name.as_str()];
            for neighbor in &spec.neighbors {
                let to = by_name.get(neighbor.as_str()).copied().ok_or_else(|| {
                    LayoutError::UnknownNeighbor {
                        point: spec.name.clone(),
                        neighbor: neighbor.clone(),
                    }
                })?;
                graph.add_neighbor(from, to);
            }
        }

        Ok(graph)
    }
}

// ---------------------------------------------------------------------------
// Layout (serializable description of a branch)
// ---------------------------------------------------------------------------

/// One point of a layout. Neighbors reference other points by name and are
/// kept in the listed order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PointSpec {
    pub name: String,
    pub kind: PointKind,
    pub position: Vec3,
    pub neighbors: Vec<String>,
}

/// A full branch description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BranchLayout {
    pub points: Vec<PointSpec>,
}

impl BranchLayout {
    /// The cage branch: two sleep points at either end, hubs A/B/C along the
    /// main stem, six junctions on the side arms and leaves A–E at the tips.
    ///
    /// ```text
    ///                LeafE    LeafD    LeafB
    ///                  |        |        |
    ///                HubB --- Jn.Bc -- Jn.Bb -- SleepB
    ///                  |                          |
    /// SleepA -- HubA -- Jn.Ba ---------------- HubC
    ///   |        |                              |
    ///   |      Jn.Aa -- Jn.Ab -- Jn.Ac ---------+
    ///   |        |        |        |
    ///   |      LeafA    LeafC      |
    ///   +--------------------------+
    /// ```
    pub fn cage_default() -> Self {
        use Arm as R;
        use Hub as H;

        let junction = |hub, arm| PointKind::Turn(TurnRole::Junction { hub, arm });
        let hub = |h| PointKind::Turn(TurnRole::Hub(h));
        let leaf = |id: &str| PointKind::Leaf(LeafId::from(id));

        let points = vec![
            point("SleepPointA", PointKind::Sleep(RestSlot::A), [-3.0, 0.0, 0.0], &["TurnPointA", "TurnPointAc"]),
            point("SleepPointB", PointKind::Sleep(RestSlot::B), [3.0, 0.0, 0.0], &["TurnPointC", "TurnPointBb"]),
            point("TurnPointA", hub(H::A), [-2.0, 0.0, 0.0], &["SleepPointA", "TurnPointBa", "TurnPointAa"]),
            point("TurnPointBa", junction(H::B, R::A), [0.0, 0.0, 0.0], &["TurnPointA", "TurnPointC", "TurnPointB"]),
            point("TurnPointC", hub(H::C), [2.0, 0.0, 0.0], &["SleepPointB", "TurnPointBa", "TurnPointAc"]),
            point("TurnPointB", hub(H::B), [0.0, 0.0, 1.0], &["TurnPointBa", "LeafPointE", "TurnPointBc"]),
            point("TurnPointBc", junction(H::B, R::C), [1.0, 0.0, 1.5], &["TurnPointB", "LeafPointD", "TurnPointBb"]),
            point("TurnPointBb", junction(H::B, R::B), [2.0, 0.0, 1.5], &["TurnPointBc", "LeafPointB", "SleepPointB"]),
            point("TurnPointAa", junction(H::A, R::A), [-2.0, 0.0, -1.0], &["TurnPointA", "LeafPointA", "TurnPointAb"]),
            point("TurnPointAb", junction(H::A, R::B), [-1.0, 0.0, -1.5], &["TurnPointAa", "LeafPointC", "TurnPointAc"]),
            point("TurnPointAc", junction(H::A, R::C), [0.0, 0.0, -1.0], &["TurnPointAb", "TurnPointC", "SleepPointA"]),
            point("LeafPointA", leaf("A"), [-2.0, 0.0, -2.0], &["TurnPointAa"]),
            point("LeafPointB", leaf("B"), [2.0, 0.0, 2.5], &["TurnPointBb"]),
            point("LeafPointC", leaf("C"), [-1.0, 0.0, -2.5], &["TurnPointAb"]),
            point("LeafPointD", leaf("D"), [1.0, 0.0, 2.5], &["TurnPointBc"]),
            point("LeafPointE", leaf("E"), [0.0, 0.0, 2.0], &["TurnPointB"]),
        ];

        Self { points }
    }
}

fn point(name: &str, kind: PointKind, pos: [f32; 3], neighbors: &[&str]) -> PointSpec {
    PointSpec {
        name: name.to_string(),
        kind,
        position: Vec3::new(pos[0], pos[1], pos[2]),
        neighbors: neighbors.iter().map(|n| n.to_string()).collect(),
    }
}
