// The cage controller: one caterpillar, one branch, one day at a time.
//
// `CageSim` owns everything the daily cycle needs: the config, the branch
// graph, the leaf board, the caterpillar's status, the route planner and the
// plan executor. A day runs like this:
//
//   1. `feed()`: every leaf is fresh again, the planner picks today's leaves
//      (as many as the current instar needs) and plans a route from wherever
//      the caterpillar sits, and the executor starts playing it.
//   2. `step(dt, signals, animator)` once per frame until the executor
//      reports `Done`. Leaves are marked eaten as they are reached.
//   3. `end_day()`: leaves nobody ate wilt, and the caterpillar moves on to
//      its next instar (or pupates, or emerges).
//
// `feed` and `end_day` are refused while a plan is still running. Events
// from the cage itself (wilting, day change) are queued and handed out with
// the next `step`, after any the executor had pending.
//
// See also: `planner.rs`, `executor.rs`, `leaves.rs`, `status.rs`.
//
// **Critical constraint: determinism.** The same seed, config, `dt` sequence
// and animation signals give the same days.

use crate::animation::{AnimationSignal, Animator};
use crate::branch::{BranchGraph, RestSlot};
use crate::config::CageConfig;
use crate::error::ConfigError;
use crate::event::{SimEvent, SimEventKind};
use crate::executor::{ExecutorContext, PlanExecutor, StepResult};
use crate::leaves::LeafBoard;
use crate::planner::RoutePlanner;
use crate::status::{CaterpillarStatus, FeedingCounter};
use tracing::{info, warn};

pub struct CageSim {
    pub config: CageConfig,
    pub graph: BranchGraph,
    pub leaves: LeafBoard,
    pub status: CaterpillarStatus,
    planner: RoutePlanner,
    executor: PlanExecutor,
    /// Days completed so far.
    day: u32,
    events: Vec<SimEvent>,
}

impl CageSim {
    /// A cage with the default config and the given seed.
    pub fn new(seed: u64) -> Result<Self, ConfigError> {
        Self::with_config(seed, CageConfig::default())
    }

    /// A cage with the given seed and config. The caterpillar starts on the
    /// config's start point.
    pub fn with_config(seed: u64, config: CageConfig) -> Result<Self, ConfigError> {
        Self::with_planner(RoutePlanner::new(seed), config)
    }

    /// A cage whose plans are seeded from OS entropy, so each run picks
    /// different leaves.
    pub fn from_entropy(config: CageConfig) -> Result<Self, ConfigError> {
        Self::with_planner(RoutePlanner::from_entropy(), config)
    }

    fn with_planner(planner: RoutePlanner, config: CageConfig) -> Result<Self, ConfigError> {
        config.validate_tuning()?;
        let (graph, start) = config.build_branch()?;
        let leaves = LeafBoard::from_graph(&graph);
        let status = CaterpillarStatus::new(config.species, config.leaves_per_instar);
        let mut executor = PlanExecutor::new(config.executor_tuning());
        executor.place_at(&graph, start);

        info!(
            points = graph.node_count(),
            leaves = leaves.len(),
            species = ?config.species,
            "cage_created"
        );

        Ok(Self {
            config,
            graph,
            leaves,
            status,
            planner,
            executor,
            day: 0,
            events: Vec::new(),
        })
    }

    pub fn executor(&self) -> &PlanExecutor {
        &self.executor
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_busy(&self) -> bool {
        self.executor.is_running()
    }

    /// Put out fresh leaves and send the caterpillar after them. Returns
    /// whether a plan started.
    pub fn feed(&mut self) -> bool {
        if self.executor.is_running() {
            warn!(day = self.day, "feed_ignored_plan_running");
            return false;
        }
        self.leaves.reset_all_fresh();
        let required = self.status.required_count_today();
        let plan = self.planner.build_plan(
            &self.graph,
            self.executor.current(),
            required,
            &self.leaves,
            self.graph.rest_point(RestSlot::A),
            self.graph.rest_point(RestSlot::B),
        );
        info!(day = self.day, required, targets = ?plan.targets, "caterpillar_fed");
        self.executor.run(plan)
    }

    /// Advance the cage by `dt` seconds.
    pub fn step(
        &mut self,
        dt: f32,
        signals: &[AnimationSignal],
        animator: &mut dyn Animator,
    ) -> StepResult {
        let ctx = ExecutorContext {
            leaves: &mut self.leaves,
            feeding: &mut self.status,
            animator,
        };
        let mut result = self.executor.resume(dt, signals, &self.graph, ctx);
        result.events.append(&mut self.events);
        result
    }

    /// Close the day: uneaten leaves wilt and the caterpillar ages. Refused
    /// while a plan runs.
    pub fn end_day(&mut self) -> bool {
        if self.executor.is_running() {
            warn!(day = self.day, "end_day_ignored_plan_running");
            return false;
        }
        let wilted = self.leaves.mark_unvisited_wilted();
        let eaten = self.status.eaten_today;
        self.status.advance_day();
        self.day += 1;
        info!(day = self.day, eaten, wilted, stage = ?self.status.stage, "day_ended");

        let tick = self.executor.tick();
        self.events.push(SimEvent {
            tick,
            kind: SimEventKind::LeavesWilted { count: wilted },
        });
        self.events.push(SimEvent {
            tick,
            kind: SimEventKind::DayAdvanced {
                stage: self.status.stage,
            },
        });
        true
    }
}
