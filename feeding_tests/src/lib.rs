// Test-only harness for end-to-end cage scenarios.
//
// Wraps a real `CageSim` (from `caterpillar_sim::sim`) together with a
// `ScriptedAnimator` that stands in for the animation layer: it records
// every trigger and answers each turn with "turn active", then a final
// rotation and "turn inactive", after configurable tick delays. The signals
// are fed back into `CageSim::step` on the following ticks, the same way a
// real animation layer's callbacks would arrive.
//
// The only test-specific code here is the scripted animator and the
// day-driving loops. Planning, execution and leaf bookkeeping all run
// through the same code paths as the real cage.
//
// See also: `tests/full_day.rs` for the scenarios.

use caterpillar_sim::animation::{AnimationSignal, Animator, Clip};
use caterpillar_sim::choreography::TurnClip;
use caterpillar_sim::config::CageConfig;
use caterpillar_sim::event::{SimEvent, SimEventKind};
use caterpillar_sim::executor::ExecutorStatus;
use caterpillar_sim::sim::CageSim;
use caterpillar_sim::types::{NodeId, Rotation};
use tracing_subscriber::EnvFilter;

/// Upper bound on ticks for one day before a scenario is declared stuck.
pub const MAX_TICKS_PER_DAY: usize = 200_000;

/// Default frame time for scenarios, in seconds.
pub const TEST_DT: f32 = 0.1;

/// Install a test-writer subscriber once. `RUST_LOG` selects the filter;
/// the default is `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .compact()
        .try_init();
}

/// How the scripted animation layer answers a turn trigger.
#[derive(Clone, Copy, Debug)]
pub struct TurnTiming {
    /// Ticks between the trigger and "turn active".
    pub start_after: u32,
    /// Ticks between "turn active" and "turn inactive".
    pub lasts: u32,
}

/// Orientation the scripted layer reports at the end of a turn.
pub fn facing_after(clip: TurnClip) -> Rotation {
    match clip {
        TurnClip::UTurn => Rotation {
            x: 0.0,
            y: 1.0,
            z: 0.0,
            w: 0.0,
        },
        _ => Rotation::IDENTITY,
    }
}

/// An animation layer driven by a fixed script.
pub struct ScriptedAnimator {
    timing: Option<TurnTiming>,
    clock: u32,
    scheduled: Vec<(u32, AnimationSignal)>,
    pub triggers: Vec<Clip>,
    pub moving_changes: Vec<bool>,
}

impl ScriptedAnimator {
    /// Answers every turn with the given timing.
    pub fn responsive(timing: TurnTiming) -> Self {
        Self {
            timing: Some(timing),
            clock: 0,
            scheduled: Vec::new(),
            triggers: Vec::new(),
            moving_changes: Vec::new(),
        }
    }

    /// Records triggers but never reports a turn.
    pub fn unresponsive() -> Self {
        Self {
            timing: None,
            ..Self::responsive(TurnTiming {
                start_after: 0,
                lasts: 0,
            })
        }
    }

    /// Advance the script by one tick and return the signals now due, in
    /// the order they were scheduled.
    pub fn take_signals(&mut self) -> Vec<AnimationSignal> {
        self.clock += 1;
        let clock = self.clock;
        let (due, later): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|&(at, _)| at <= clock);
        self.scheduled = later;
        due.into_iter().map(|(_, signal)| signal).collect()
    }

    pub fn turn_triggers(&self) -> impl Iterator<Item = TurnClip> + '_ {
        self.triggers.iter().filter_map(|clip| match clip {
            Clip::Turn(turn) => Some(*turn),
            Clip::Sleep => None,
        })
    }
}

impl Animator for ScriptedAnimator {
    fn trigger(&mut self, clip: Clip) {
        self.triggers.push(clip);
        let (Clip::Turn(turn), Some(timing)) = (clip, self.timing) else {
            return;
        };
        let start = self.clock + timing.start_after.max(1);
        let end = start + timing.lasts.max(1);
        self.scheduled.push((start, AnimationSignal::TurnActive(true)));
        self.scheduled.push((end, AnimationSignal::Rotation(facing_after(turn))));
        self.scheduled.push((end, AnimationSignal::TurnActive(false)));
    }

    fn set_moving(&mut self, moving: bool) {
        self.moving_changes.push(moving);
    }
}

/// What happened during one fed day.
#[derive(Debug)]
pub struct DaySummary {
    pub eaten: u32,
    pub events: Vec<SimEventKind>,
    /// Where the caterpillar ended up.
    pub rest: Option<NodeId>,
    pub ticks: usize,
}

impl DaySummary {
    pub fn eaten_leaves(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|kind| match kind {
                SimEventKind::LeafEaten { leaf, .. } => Some(leaf.to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn planned_targets(&self) -> Vec<String> {
        self.events
            .iter()
            .find_map(|kind| match kind {
                SimEventKind::PlanStarted { targets, .. } => {
                    Some(targets.iter().map(|t| t.to_string()).collect())
                }
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// A cage plus its scripted animation layer.
pub struct TestCage {
    pub sim: CageSim,
    pub animator: ScriptedAnimator,
    pub dt: f32,
    pub log: Vec<SimEvent>,
}

impl TestCage {
    /// Default cage, animator answering turns after 2 ticks and finishing
    /// them 5 ticks later.
    pub fn new(seed: u64) -> Self {
        Self::with(
            seed,
            CageConfig::default(),
            ScriptedAnimator::responsive(TurnTiming {
                start_after: 2,
                lasts: 5,
            }),
        )
    }

    pub fn with(seed: u64, config: CageConfig, animator: ScriptedAnimator) -> Self {
        init_tracing();
        let sim = CageSim::with_config(seed, config).expect("test config must be valid");
        Self {
            sim,
            animator,
            dt: TEST_DT,
            log: Vec::new(),
        }
    }

    /// One frame: deliver due animation signals, then step the cage.
    pub fn tick(&mut self) -> ExecutorStatus {
        let signals = self.animator.take_signals();
        let result = self.sim.step(self.dt, &signals, &mut self.animator);
        self.log.extend(result.events);
        result.status
    }

    /// Tick until the running plan is done. Returns the number of ticks.
    pub fn run_until_idle(&mut self) -> usize {
        for ticks in 1..=MAX_TICKS_PER_DAY {
            match self.tick() {
                ExecutorStatus::Done | ExecutorStatus::Idle => return ticks,
                ExecutorStatus::Running | ExecutorStatus::WaitingOnAnimation => {}
            }
        }
        panic!("plan still running after {MAX_TICKS_PER_DAY} ticks");
    }

    /// Feed, play the whole plan back, and close the day.
    pub fn run_day(&mut self) -> DaySummary {
        let start = self.log.len();
        assert!(self.sim.feed(), "feed refused on day {}", self.sim.day());
        let ticks = self.run_until_idle();
        let eaten = self.sim.status.eaten_today;
        let rest = self.sim.executor().current();
        assert!(self.sim.end_day(), "end_day refused on day {}", self.sim.day());
        // Flush the end-of-day events.
        self.tick();
        DaySummary {
            eaten,
            events: self.log[start..].iter().map(|e| e.kind.clone()).collect(),
            rest,
            ticks,
        }
    }

    pub fn point_name(&self, node: NodeId) -> &str {
        self.sim.graph.node(node).map_or("?", |n| n.name.as_str())
    }
}
