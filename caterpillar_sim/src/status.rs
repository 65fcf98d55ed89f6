// Caterpillar status: life stage and the daily feeding count.
//
// The planner only needs to know how many leaves to pick today, and the
// executor only needs to report each leaf eaten. Both go through the
// `FeedingCounter` trait; `CaterpillarStatus` is the cage's implementation.
//
// A larva passes through five instars, one per day. The number of leaves it
// needs per day comes from the `leaves_per_instar` schedule in `CageConfig`.
// After the fifth instar it pupates, and the next day it emerges as an adult.
// Pupae and adults keep the fifth instar's count.
//
// See also: `config.rs` for the schedule, `sim.rs` which advances the day.

use crate::types::Species;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Number of larval instars before pupation.
pub const INSTAR_COUNT: u8 = 5;

/// How many leaves to eat today, and a hook to count each one.
pub trait FeedingCounter {
    fn required_count_today(&self) -> i32;
    fn notify_eaten(&mut self);
}

/// Where the caterpillar is in its life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeStage {
    /// A feeding larva, `instar` in `1..=INSTAR_COUNT`.
    Larva { instar: u8 },
    Pupa,
    Adult,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaterpillarStatus {
    pub species: Species,
    pub stage: LifeStage,
    /// Leaves required per day, indexed by `instar - 1`.
    pub leaves_per_instar: [u32; INSTAR_COUNT as usize],
    pub eaten_today: u32,
}

impl CaterpillarStatus {
    /// A first-instar larva on the given feeding schedule.
    pub fn new(species: Species, leaves_per_instar: [u32; INSTAR_COUNT as usize]) -> Self {
        Self {
            species,
            stage: LifeStage::Larva { instar: 1 },
            leaves_per_instar,
            eaten_today: 0,
        }
    }

    /// Jump to a given instar, clamped to `1..=INSTAR_COUNT`.
    pub fn set_instar(&mut self, instar: u8) {
        self.stage = LifeStage::Larva {
            instar: instar.clamp(1, INSTAR_COUNT),
        };
    }

    /// Leaves needed today for the current stage.
    pub fn needed_today(&self) -> u32 {
        let instar = match self.stage {
            LifeStage::Larva { instar } => instar.clamp(1, INSTAR_COUNT),
            LifeStage::Pupa | LifeStage::Adult => INSTAR_COUNT,
        };
        self.leaves_per_instar[instar as usize - 1]
    }

    /// Roll over to the next day: reset the count and advance the life stage.
    pub fn advance_day(&mut self) {
        self.eaten_today = 0;
        self.stage = match self.stage {
            LifeStage::Larva { instar } if instar < INSTAR_COUNT => LifeStage::Larva {
                instar: instar + 1,
            },
            LifeStage::Larva { .. } => LifeStage::Pupa,
            LifeStage::Pupa | LifeStage::Adult => LifeStage::Adult,
        };
        info!(stage = ?self.stage, needed = self.needed_today(), "caterpillar_day_advanced");
    }
}

impl FeedingCounter for CaterpillarStatus {
    fn required_count_today(&self) -> i32 {
        i32::try_from(self.needed_today()).unwrap_or(i32::MAX)
    }

    fn notify_eaten(&mut self) {
        self.eaten_today = self.eaten_today.saturating_add(1);
    }
}
