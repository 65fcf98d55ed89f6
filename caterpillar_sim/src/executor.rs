// Plan executor. Plays a `RoutePlan` back one tick at a time.
//
// The executor is an explicit state machine driven by `resume(dt, signals,
// graph, ctx)`, called once per frame. Each call applies the animation
// layer's signals, then advances through as many phases as it can until it
// reaches a suspend point, and reports what it is doing in `StepResult`.
//
// Phases:
//
//   StartLeg ─┬─ empty leg ──────────────────────────────> StartLeg (next)
//             ├─ departure needs U-turn ─> Turning(Depart) ─> Moving
//             └─────────────────────────────────────────> Moving
//   Moving ───┬─ not there yet: step toward point (suspend)
//             └─ arrived: Turn ─> Turning(NextPoint) ─> next point
//                         Leaf ─> Chewing ─────────────> next point
//                         Sleep ─> trigger Sleep ──────> next point
//
// Suspend points are: a movement step, every tick spent in `Turning`, every
// tick spent in `Chewing`, and any tick where a turn is in progress while
// the actor should be walking (movement pauses, the target is kept).
//
// The turn flag (`turn_in_progress`) is written only by `on_turn_signal`,
// which the animation layer reaches through `AnimationSignal::TurnActive`.
// A turn is awaited in two stages: up to `turn_activation_timeout_secs`,
// counting the trigger tick, for the animation to report active (missing
// that, the turn is treated as instantaneous), then until it reports
// inactive.
//
// Nothing aborts a plan. Empty legs, leg points missing from the graph and
// leaves missing from the registry are skipped with a warning and an event,
// and the executor always ends up idle again.
//
// See also: `planner.rs` which builds plans, `choreography.rs` for the turn
// tables, `animation.rs` for the animation boundary, `sim.rs` which owns the
// executor.
//
// **Critical constraint: determinism.** Given the same plan, the same `dt`
// sequence and the same signals, the executor produces the same positions
// and events.

use crate::animation::{AnimationSignal, Animator, Clip};
use crate::branch::{BranchGraph, PointKind};
use crate::choreography::{TurnClip, departure_needs_u_turn, turn_clip_at};
use crate::event::{RejectReason, SimEvent, SimEventKind};
use crate::leaves::LeafRegistry;
use crate::planner::{Leg, RoutePlan};
use crate::status::FeedingCounter;
use crate::types::{LeafId, NodeId, Rotation, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// The visible actor's transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub position: Vec3,
    pub rotation: Rotation,
}

/// Movement and timing parameters. See `CageConfig` for the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutorTuning {
    /// Walking speed in scene units per second.
    pub move_speed: f32,
    /// Distance at which a point counts as reached.
    pub arrive_threshold: f32,
    /// Chewing time after eating a leaf.
    pub leaf_eat_delay_secs: f32,
    /// How long to wait for a triggered turn to report active.
    pub turn_activation_timeout_secs: f32,
}

impl Default for ExecutorTuning {
    fn default() -> Self {
        Self {
            move_speed: 0.5,
            arrive_threshold: 0.01,
            leaf_eat_delay_secs: 1.0,
            turn_activation_timeout_secs: 0.5,
        }
    }
}

/// What the executor is doing after a `resume` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutorStatus {
    /// No plan.
    Idle,
    /// Walking or chewing.
    Running,
    /// Blocked on the animation layer.
    WaitingOnAnimation,
    /// The plan finished during this call.
    Done,
}

pub struct StepResult {
    pub status: ExecutorStatus,
    /// Events emitted since the previous `resume`, including any from `run`.
    pub events: Vec<SimEvent>,
}

/// The collaborators a tick may touch.
pub struct ExecutorContext<'a> {
    pub leaves: &'a mut dyn LeafRegistry,
    pub feeding: &'a mut dyn FeedingCounter,
    pub animator: &'a mut dyn Animator,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum TurnStage {
    Activating { elapsed: f32 },
    Active,
}

/// Where to go once a turn completes.
#[derive(Clone, Copy, Debug, PartialEq)]
enum AfterTurn {
    /// Pre-departure U-turn: start walking the leg.
    Depart,
    /// Turn on arrival: continue to the next point.
    NextPoint,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    StartLeg,
    Moving,
    Chewing {
        remaining: f32,
    },
    Turning {
        clip: TurnClip,
        stage: TurnStage,
        then: AfterTurn,
    },
}

type Flow = ControlFlow<ExecutorStatus>;

pub struct PlanExecutor {
    tuning: ExecutorTuning,
    actor: Actor,
    /// Logical position: the last point arrived at (or placed on).
    current: Option<NodeId>,
    turn_in_progress: bool,
    /// Last value sent to `Animator::set_moving`.
    walking: bool,
    /// The plan being played; `Some` exactly while running.
    plan: Option<RoutePlan>,
    phase: Phase,
    leg_idx: usize,
    point_idx: usize,
    tick: u64,
    events: Vec<SimEvent>,
}

impl PlanExecutor {
    pub fn new(tuning: ExecutorTuning) -> Self {
        Self {
            tuning,
            actor: Actor::default(),
            current: None,
            turn_in_progress: false,
            walking: false,
            plan: None,
            phase: Phase::StartLeg,
            leg_idx: 0,
            point_idx: 0,
            tick: 0,
            events: Vec::new(),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.plan.is_some()
    }

    pub fn is_turn_in_progress(&self) -> bool {
        self.turn_in_progress
    }

    /// Number of `resume` calls so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Put the actor on a point. Ignored while a plan runs or for an unknown
    /// point. Returns whether the actor moved.
    pub fn place_at(&mut self, graph: &BranchGraph, node: NodeId) -> bool {
        if self.is_running() {
            warn!(node = %node, "place_at_ignored_while_running");
            return false;
        }
        let Some(point) = graph.node(node) else {
            warn!(node = %node, "place_at_unknown_point");
            return false;
        };
        self.actor.position = point.position;
        self.current = Some(node);
        true
    }

    /// Start playing `plan`. Rejected while another plan runs, or when the
    /// plan has no legs at all.
    pub fn run(&mut self, plan: RoutePlan) -> bool {
        if self.is_running() {
            warn!("plan_rejected_already_running");
            self.emit(SimEventKind::PlanRejected {
                reason: RejectReason::AlreadyRunning,
            });
            return false;
        }
        if plan.legs.is_empty() {
            warn!("plan_rejected_no_legs");
            self.emit(SimEventKind::PlanRejected {
                reason: RejectReason::NoLegs,
            });
            return false;
        }

        info!(targets = ?plan.targets, legs = plan.legs.len(), "plan_started");
        self.emit(SimEventKind::PlanStarted {
            targets: plan.targets.clone(),
            legs: plan.legs.len(),
        });
        self.plan = Some(plan);
        self.phase = Phase::StartLeg;
        self.leg_idx = 0;
        self.point_idx = 0;
        true
    }

    /// Turn started (`true`) or ended (`false`) in the animation layer.
    pub fn on_turn_signal(&mut self, active: bool) {
        self.turn_in_progress = active;
        if !active {
            return;
        }
        if let Phase::Turning { stage, .. } = &mut self.phase {
            *stage = TurnStage::Active;
        }
    }

    /// Final orientation reported at the end of a turn.
    pub fn on_rotation_snapshot(&mut self, rotation: Rotation) {
        self.actor.rotation = rotation;
    }

    /// Advance by `dt` seconds.
    pub fn resume(
        &mut self,
        dt: f32,
        signals: &[AnimationSignal],
        graph: &BranchGraph,
        mut ctx: ExecutorContext<'_>,
    ) -> StepResult {
        self.tick += 1;
        for signal in signals {
            match *signal {
                AnimationSignal::TurnActive(active) => self.on_turn_signal(active),
                AnimationSignal::Rotation(rotation) => self.on_rotation_snapshot(rotation),
            }
        }

        let status = if self.is_running() {
            loop {
                let flow = match self.phase {
                    Phase::StartLeg => self.start_leg(graph, ctx.animator),
                    Phase::Moving => self.walk(dt, graph, &mut ctx),
                    Phase::Chewing { remaining } => self.chew(remaining - dt),
                    Phase::Turning { clip, stage, then } => self.await_turn(dt, clip, stage, then),
                };
                if let ControlFlow::Break(status) = flow {
                    break status;
                }
            }
        } else {
            ExecutorStatus::Idle
        };

        StepResult {
            status,
            events: std::mem::take(&mut self.events),
        }
    }

    fn emit(&mut self, kind: SimEventKind) {
        self.events.push(SimEvent {
            tick: self.tick,
            kind,
        });
    }

    fn current_leg(&self) -> Option<&Leg> {
        self.plan.as_ref().and_then(|plan| plan.legs.get(self.leg_idx))
    }

    /// The leaf this leg was planned for; `None` on the rest leg.
    fn leg_target(&self) -> Option<&LeafId> {
        self.plan.as_ref().and_then(|plan| plan.targets.get(self.leg_idx))
    }

    fn set_walking(&mut self, animator: &mut dyn Animator, walking: bool) {
        if self.walking != walking {
            self.walking = walking;
            animator.set_moving(walking);
        }
    }

    fn start_leg(&mut self, graph: &BranchGraph, animator: &mut dyn Animator) -> Flow {
        let Some((len, first, second)) = self
            .current_leg()
            .map(|leg| (leg.len(), leg.first().copied(), leg.get(1).copied()))
        else {
            return self.finish(animator);
        };

        let (Some(first), Some(second)) = (first, second) else {
            if len == 0 {
                let target = self.leg_target().cloned();
                debug!(leg = self.leg_idx, target = ?target, "leg_skipped_no_path");
                self.emit(SimEventKind::LegSkipped {
                    leg: self.leg_idx,
                    target,
                });
            }
            self.leg_idx += 1;
            return ControlFlow::Continue(());
        };

        self.point_idx = 1;
        let from = match self.current {
            Some(from) => from,
            None => self.enter_at(first, graph),
        };
        let needs_u_turn = match (graph.node(from), graph.node(second)) {
            (Some(from), Some(next)) => departure_needs_u_turn(&from.kind, &next.kind),
            _ => false,
        };
        if needs_u_turn {
            return self.begin_turn(from, TurnClip::UTurn, AfterTurn::Depart, animator);
        }
        self.phase = Phase::Moving;
        ControlFlow::Continue(())
    }

    /// Never placed: start the actor on the first point of the first leg.
    fn enter_at(&mut self, node: NodeId, graph: &BranchGraph) -> NodeId {
        if let Some(point) = graph.node(node) {
            self.actor.position = point.position;
        }
        debug!(node = %node, "actor_entered_at_leg_start");
        self.current = Some(node);
        node
    }

    fn walk(&mut self, dt: f32, graph: &BranchGraph, ctx: &mut ExecutorContext<'_>) -> Flow {
        let Some(target) = self
            .current_leg()
            .and_then(|leg| leg.get(self.point_idx).copied())
        else {
            self.next_leg();
            return ControlFlow::Continue(());
        };
        let Some(point) = graph.node(target) else {
            warn!(leg = self.leg_idx, node = %target, "leg_point_missing_from_branch");
            self.emit(SimEventKind::MissingPoint {
                leg: self.leg_idx,
                node: target,
            });
            self.skip_point();
            return ControlFlow::Continue(());
        };

        if self.actor.position.distance(point.position) > self.tuning.arrive_threshold {
            if self.turn_in_progress {
                self.set_walking(ctx.animator, false);
                return ControlFlow::Break(ExecutorStatus::WaitingOnAnimation);
            }
            self.set_walking(ctx.animator, true);
            self.actor.position = self
                .actor
                .position
                .move_towards(point.position, self.tuning.move_speed * dt);
            return ControlFlow::Break(ExecutorStatus::Running);
        }

        self.actor.position = point.position;
        debug!(node = %target, name = %point.name, "arrived_at_point");
        self.emit(SimEventKind::ArrivedAt { node: target });
        self.arrive(target, &point.kind, graph, ctx)
    }

    fn arrive(
        &mut self,
        at: NodeId,
        kind: &PointKind,
        graph: &BranchGraph,
        ctx: &mut ExecutorContext<'_>,
    ) -> Flow {
        match kind {
            PointKind::Turn(role) => {
                let clip = self
                    .current_leg()
                    .and_then(|leg| leg.get(self.point_idx + 1))
                    .and_then(|&next| graph.node(next))
                    .and_then(|next| turn_clip_at(*role, &next.kind));
                match clip {
                    Some(clip) => self.begin_turn(at, clip, AfterTurn::NextPoint, ctx.animator),
                    None => self.next_point(),
                }
            }
            PointKind::Leaf(leaf) => {
                let is_last = self
                    .current_leg()
                    .is_some_and(|leg| self.point_idx + 1 == leg.len());
                if !is_last || self.leg_target() != Some(leaf) {
                    debug!(leaf = %leaf, "passing_leaf_without_eating");
                    return self.next_point();
                }
                ctx.leaves.mark_eaten(leaf);
                ctx.feeding.notify_eaten();
                info!(leaf = %leaf, node = %at, "leaf_eaten");
                self.emit(SimEventKind::LeafEaten {
                    leaf: leaf.clone(),
                    node: at,
                });
                self.set_walking(ctx.animator, false);
                self.phase = Phase::Chewing {
                    remaining: self.tuning.leaf_eat_delay_secs,
                };
                ControlFlow::Break(ExecutorStatus::Running)
            }
            PointKind::Sleep(slot) => {
                self.set_walking(ctx.animator, false);
                ctx.animator.trigger(Clip::Sleep);
                debug!(node = %at, slot = ?slot, "sleep_started");
                self.emit(SimEventKind::SleepStarted { node: at });
                self.next_point()
            }
        }
    }

    fn chew(&mut self, remaining: f32) -> Flow {
        if remaining > 0.0 {
            self.phase = Phase::Chewing { remaining };
            return ControlFlow::Break(ExecutorStatus::Running);
        }
        self.next_point()
    }

    fn begin_turn(
        &mut self,
        at: NodeId,
        clip: TurnClip,
        then: AfterTurn,
        animator: &mut dyn Animator,
    ) -> Flow {
        self.walking = false;
        animator.set_moving(false);
        animator.trigger(Clip::Turn(clip));
        debug!(node = %at, clip = %clip, "turn_triggered");
        self.emit(SimEventKind::TurnTriggered { at, clip });
        // The trigger tick's dt counts toward the activation timeout.
        self.phase = Phase::Turning {
            clip,
            stage: TurnStage::Activating { elapsed: 0.0 },
            then,
        };
        ControlFlow::Continue(())
    }

    fn await_turn(&mut self, dt: f32, clip: TurnClip, stage: TurnStage, then: AfterTurn) -> Flow {
        match stage {
            TurnStage::Activating { .. } if self.turn_in_progress => {
                self.phase = Phase::Turning {
                    clip,
                    stage: TurnStage::Active,
                    then,
                };
                ControlFlow::Continue(())
            }
            TurnStage::Activating { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed < self.tuning.turn_activation_timeout_secs {
                    self.phase = Phase::Turning {
                        clip,
                        stage: TurnStage::Activating { elapsed },
                        then,
                    };
                    return ControlFlow::Break(ExecutorStatus::WaitingOnAnimation);
                }
                debug!(clip = %clip, elapsed, "turn_activation_timed_out");
                self.emit(SimEventKind::TurnActivationTimedOut { clip });
                self.end_turn(clip, then)
            }
            TurnStage::Active if self.turn_in_progress => {
                ControlFlow::Break(ExecutorStatus::WaitingOnAnimation)
            }
            TurnStage::Active => self.end_turn(clip, then),
        }
    }

    fn end_turn(&mut self, clip: TurnClip, then: AfterTurn) -> Flow {
        self.emit(SimEventKind::TurnFinished { clip });
        match then {
            AfterTurn::Depart => {
                self.phase = Phase::Moving;
                ControlFlow::Continue(())
            }
            AfterTurn::NextPoint => self.next_point(),
        }
    }

    /// The point at `point_idx` was reached and handled.
    fn next_point(&mut self) -> Flow {
        if let Some(node) = self
            .current_leg()
            .and_then(|leg| leg.get(self.point_idx).copied())
        {
            self.current = Some(node);
        }
        self.skip_point();
        ControlFlow::Continue(())
    }

    fn skip_point(&mut self) {
        self.point_idx += 1;
        let leg_len = self.current_leg().map_or(0, |leg| leg.len());
        if self.point_idx >= leg_len {
            self.next_leg();
        } else {
            self.phase = Phase::Moving;
        }
    }

    fn next_leg(&mut self) {
        self.leg_idx += 1;
        self.point_idx = 0;
        self.phase = Phase::StartLeg;
    }

    fn finish(&mut self, animator: &mut dyn Animator) -> Flow {
        self.set_walking(animator, false);
        self.plan = None;
        self.phase = Phase::StartLeg;
        self.leg_idx = 0;
        self.point_idx = 0;
        info!(position = ?self.current, "plan_finished");
        self.emit(SimEventKind::PlanFinished {
            position: self.current,
        });
        ControlFlow::Break(ExecutorStatus::Done)
    }
}
