// Static choreography tables for the cage branch.
//
// Three lookups, all expressed as `match` over the role tags in `branch.rs`:
//
// - `turn_clip_at`: which turn animation to play on arriving at a turn point,
//   given the point the actor heads for next.
// - `departure_needs_u_turn`: whether the actor must turn around before
//   leaving the point it currently occupies.
// - `rest_slot_for`: which rest spot the caterpillar retires to, given the
//   last leaf it reached.
//
// These encode the geometry of the cage branch (which way the body faces
// when it reaches each point) and are domain configuration, not derived from
// the graph.

use crate::branch::{Arm, Hub, PointKind, RestSlot, TurnRole};
use crate::types::LeafId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A directional turn animation. `trigger_name` is the name the animation
/// layer knows the clip by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnClip {
    HubAToB,
    HubAToC,
    HubBToA,
    HubBToC,
    HubCToA,
    HubCToB,
    ArmAToB,
    ArmAToC,
    ArmBToA,
    ArmBToC,
    ArmCToA,
    ArmCToB,
    UTurn,
}

impl TurnClip {
    pub fn trigger_name(self) -> &'static str {
        match self {
            Self::HubAToB => "AtoB",
            Self::HubAToC => "AtoC",
            Self::HubBToA => "BtoA",
            Self::HubBToC => "BtoC",
            Self::HubCToA => "CtoA",
            Self::HubCToB => "CtoB",
            Self::ArmAToB => "aTOb",
            Self::ArmAToC => "aTOc",
            Self::ArmBToA => "bTOa",
            Self::ArmBToC => "bTOc",
            Self::ArmCToA => "cTOa",
            Self::ArmCToB => "cTOb",
            Self::UTurn => "UTurn",
        }
    }
}

impl fmt::Display for TurnClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trigger_name())
    }
}

fn is_leaf(kind: &PointKind, ids: &[&str]) -> bool {
    kind.leaf_id().is_some_and(|id| ids.contains(&id.as_str()))
}

const JUNCTION_BA: PointKind = PointKind::Turn(TurnRole::Junction {
    hub: Hub::B,
    arm: Arm::A,
});

/// The turn to play at a turn point, heading for `next`. `None` means the
/// actor walks straight through.
pub fn turn_clip_at(turn: TurnRole, next: &PointKind) -> Option<TurnClip> {
    let clip = match turn {
        TurnRole::Hub(Hub::A) if *next == JUNCTION_BA => TurnClip::HubAToB,
        TurnRole::Hub(Hub::A) => TurnClip::HubAToC,
        TurnRole::Hub(Hub::B) if is_leaf(next, &["E"]) => TurnClip::HubBToC,
        TurnRole::Hub(Hub::B) => TurnClip::HubBToA,
        TurnRole::Hub(Hub::C) if *next == JUNCTION_BA => TurnClip::HubCToB,
        TurnRole::Hub(Hub::C) => TurnClip::HubCToA,
        TurnRole::Junction { arm: Arm::A, .. } if is_leaf(next, &["A", "C"]) => TurnClip::ArmAToB,
        TurnRole::Junction { arm: Arm::A, .. } => TurnClip::ArmAToC,
        TurnRole::Junction { arm: Arm::B, .. } if is_leaf(next, &["B", "D"]) => TurnClip::ArmBToC,
        TurnRole::Junction { arm: Arm::B, .. } => TurnClip::ArmBToA,
        TurnRole::Junction { arm: Arm::C, .. } if is_leaf(next, &["A", "C"]) => TurnClip::ArmCToB,
        TurnRole::Junction { arm: Arm::C, .. } => TurnClip::ArmCToA,
        TurnRole::Plain => return None,
    };
    Some(clip)
}

/// Whether the actor must U-turn before leaving `departure` toward
/// `first_step` (the point at index 1 of the next leg).
///
/// Leaving a leaf always needs one. Leaving rest spot A toward hub A, or rest
/// spot B toward hub C, needs one. Nothing else does.
pub fn departure_needs_u_turn(departure: &PointKind, first_step: &PointKind) -> bool {
    match (departure, first_step) {
        (PointKind::Leaf(_), _) => true,
        (PointKind::Sleep(RestSlot::A), PointKind::Turn(TurnRole::Hub(Hub::A))) => true,
        (PointKind::Sleep(RestSlot::B), PointKind::Turn(TurnRole::Hub(Hub::C))) => true,
        _ => false,
    }
}

/// Rest spot affinity: leaves A and B sit nearest rest spot B, everything
/// else (and a day with no leaf reached) goes to rest spot A.
pub fn rest_slot_for(last_leaf: Option<&LeafId>) -> RestSlot {
    match last_leaf.map(LeafId::as_str) {
        Some("A" | "B") => RestSlot::B,
        _ => RestSlot::A,
    }
}
