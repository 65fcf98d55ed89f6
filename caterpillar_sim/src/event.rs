// Narrative events emitted while the cage runs.
//
// Every observable thing the executor or the cage controller does is also
// reported as a `SimEvent`, returned from `PlanExecutor::resume` /
// `CageSim::step` in the `StepResult`. Rendering and UI layers can replay
// these; tests use them to check ordering of side effects without poking
// into executor internals.
//
// `tick` counts calls to `resume` since the executor was created, so events
// from the same tick share a number and keep their emission order.
//
// See also: `executor.rs` and `sim.rs`, the two emitters.

use crate::choreography::TurnClip;
use crate::status::LifeStage;
use crate::types::{LeafId, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

/// Why `run` turned a plan away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    AlreadyRunning,
    NoLegs,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    /// A plan was accepted and playback began.
    PlanStarted { targets: Vec<LeafId>, legs: usize },
    /// A plan was turned away; nothing changed.
    PlanRejected { reason: RejectReason },
    /// A leg had no usable path and was skipped without moving.
    LegSkipped { leg: usize, target: Option<LeafId> },
    /// A leg referenced a point that is not on the branch; the point was
    /// skipped.
    MissingPoint { leg: usize, node: NodeId },
    /// A turn animation was requested at `at`.
    TurnTriggered { at: NodeId, clip: TurnClip },
    /// The animation layer never reported the turn as active; treated as
    /// instantaneous.
    TurnActivationTimedOut { clip: TurnClip },
    /// The turn finished and control returned to the executor.
    TurnFinished { clip: TurnClip },
    /// The actor reached a point.
    ArrivedAt { node: NodeId },
    /// A target leaf was eaten.
    LeafEaten { leaf: LeafId, node: NodeId },
    /// The actor reached its rest spot and the sleep animation was fired.
    SleepStarted { node: NodeId },
    /// Playback is over; the executor is idle again.
    PlanFinished { position: Option<NodeId> },
    /// End of day: leaves nobody ate have wilted.
    LeavesWilted { count: usize },
    /// The caterpillar moved on to its next day.
    DayAdvanced { stage: LifeStage },
}
