// The boundary to the animation layer.
//
// The simulation never plays animations itself. It asks an `Animator` to
// fire named triggers (turns, falling asleep) and to toggle the walk cycle,
// and the animation layer reports back through `AnimationSignal` messages
// handed to `PlanExecutor::resume` on the next tick: turn started, turn
// finished, and the orientation the actor ended up with.
//
// `NullAnimator` ignores everything; with it, every turn falls through the
// activation timeout in the executor and is treated as instantaneous.

use crate::choreography::TurnClip;
use crate::types::Rotation;
use serde::{Deserialize, Serialize};

/// A named animation trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clip {
    Turn(TurnClip),
    Sleep,
}

/// Commands the executor sends to the animation layer.
pub trait Animator {
    /// Fire a trigger. Retriggering a clip that is already queued restarts it.
    fn trigger(&mut self, clip: Clip);

    /// Toggle the walk cycle.
    fn set_moving(&mut self, moving: bool);
}

/// Messages from the animation layer, applied in order at the start of a
/// tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnimationSignal {
    /// A turn state was entered (`true`) or left (`false`).
    TurnActive(bool),
    /// Final orientation at the end of a turn.
    Rotation(Rotation),
}

/// An animator that drops every command.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn trigger(&mut self, _clip: Clip) {}

    fn set_moving(&mut self, _moving: bool) {}
}
