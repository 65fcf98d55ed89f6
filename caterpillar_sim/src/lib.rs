// caterpillar_sim: pure Rust simulation of a caterpillar feeding cage.
//
// A caterpillar lives on a small branch of fixed points. Each day it is fed:
// it picks some of the leaves at random, walks shortest routes to each of
// them in turn, eats, and retires to one of two rest spots, while an
// external animation layer plays the turns it asks for. This crate holds all
// of that logic and nothing about rendering; the animation layer is reached
// only through the `Animator` trait and `AnimationSignal` messages.
//
// Module overview:
// - `sim.rs`:          CageSim, the daily feed / step / end-of-day controller.
// - `planner.rs`:      RoutePlanner + RoutePlan: target selection, legs, rest mapping.
// - `executor.rs`:     PlanExecutor state machine driving movement, turns and eating.
// - `choreography.rs`: Turn-clip, departure U-turn and rest-affinity tables.
// - `animation.rs`:    Animator trait, AnimationSignal, NullAnimator.
// - `branch.rs`:       BranchGraph + role-tagged points + the default cage layout.
// - `pathfinding.rs`:  BFS shortest paths over the branch graph.
// - `leaves.rs`:       LeafRegistry trait + LeafBoard (daily leaf state).
// - `status.rs`:       FeedingCounter trait + CaterpillarStatus (instar progression).
// - `event.rs`:        Narrative SimEvents.
// - `config.rs`:       CageConfig, every tunable number, loaded from JSON.
// - `error.rs`:        Load-time LayoutError / ConfigError.
// - `prng`:            Re-exported from `caterpillar_prng`: xoshiro256++ with Fisher–Yates shuffle.
// - `types.rs`:        Vec3, Rotation, NodeId, LeafId, Species.
//
// **Critical constraint: determinism.** Given a seed, the cage is a pure
// function of `(dt, signals)` per tick. All randomness in planning comes from
// a seeded `GameRng`. No `HashMap`; `BTreeMap` for ordered collections.

pub mod animation;
pub mod branch;
pub mod choreography;
pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod leaves;
pub mod pathfinding;
pub mod planner;
pub use caterpillar_prng as prng;
pub mod sim;
pub mod status;
pub mod types;
