// Data-driven cage configuration.
//
// Every tunable number the cage uses lives in `CageConfig`: walking speed,
// arrival tolerance, chewing time, the turn-activation guard, the per-instar
// feeding schedule, where the caterpillar starts and the branch layout
// itself. Nothing in the executor or planner hard-codes these.
//
// `CageConfig::from_json` parses and validates in one go: the tuning numbers
// must be finite, the walking speed positive and the rest non-negative, the
// layout must build into a graph and the start point must exist on it.
// Missing fields fall back to `CageConfig::default()`.
//
// See also: `sim.rs` which builds the cage from a config, `branch.rs` for the
// layout format, `executor.rs` for `ExecutorTuning`.

use crate::branch::{BranchGraph, BranchLayout};
use crate::error::ConfigError;
use crate::executor::ExecutorTuning;
use crate::status::INSTAR_COUNT;
use crate::types::{NodeId, Species};
use serde::{Deserialize, Serialize};

/// Top-level cage configuration. Loaded from JSON, never mutated at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CageConfig {
    /// Walking speed in scene units per second.
    pub move_speed: f32,

    /// Distance at which the actor counts as having reached a point.
    pub arrive_threshold: f32,

    /// Chewing time after each leaf, in seconds.
    pub leaf_eat_delay_secs: f32,

    /// How long to wait for a triggered turn to start before treating it as
    /// instantaneous, in seconds.
    pub turn_activation_timeout_secs: f32,

    /// Leaves required per day, one entry per larval instar.
    pub leaves_per_instar: [u32; INSTAR_COUNT as usize],

    /// Name of the layout point the caterpillar starts on.
    pub start_point: String,

    pub species: Species,

    pub layout: BranchLayout,
}

impl Default for CageConfig {
    fn default() -> Self {
        let tuning = ExecutorTuning::default();
        Self {
            move_speed: tuning.move_speed,
            arrive_threshold: tuning.arrive_threshold,
            leaf_eat_delay_secs: tuning.leaf_eat_delay_secs,
            turn_activation_timeout_secs: tuning.turn_activation_timeout_secs,
            leaves_per_instar: [2, 3, 4, 5, 5],
            start_point: "SleepPointA".into(),
            species: Species::default(),
            layout: BranchLayout::cage_default(),
        }
    }
}

impl CageConfig {
    /// Parse a config from JSON and check that it describes a usable cage.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate_tuning()?;
        config.build_branch()?;
        Ok(config)
    }

    /// Reject tuning values a plan could never finish with.
    pub fn validate_tuning(&self) -> Result<(), ConfigError> {
        // (field, value, zero allowed)
        let fields = [
            ("move_speed", self.move_speed, false),
            ("arrive_threshold", self.arrive_threshold, true),
            ("leaf_eat_delay_secs", self.leaf_eat_delay_secs, true),
            ("turn_activation_timeout_secs", self.turn_activation_timeout_secs, true),
        ];
        for (field, value, zero_ok) in fields {
            let in_range = if zero_ok { value >= 0.0 } else { value > 0.0 };
            if !value.is_finite() || !in_range {
                return Err(ConfigError::InvalidTuning { field, value });
            }
        }
        Ok(())
    }

    /// Build the branch graph and resolve the start point.
    pub fn build_branch(&self) -> Result<(BranchGraph, NodeId), ConfigError> {
        let graph = BranchGraph::from_layout(&self.layout)?;
        let start = graph
            .find_by_name(&self.start_point)
            .ok_or_else(|| ConfigError::UnknownStartPoint(self.start_point.clone()))?;
        Ok((graph, start))
    }

    pub fn executor_tuning(&self) -> ExecutorTuning {
        ExecutorTuning {
            move_speed: self.move_speed,
            arrive_threshold: self.arrive_threshold,
            leaf_eat_delay_secs: self.leaf_eat_delay_secs,
            turn_activation_timeout_secs: self.turn_activation_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;

    #[test]
    fn default_config_serializes() {
        let config = CageConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = CageConfig::from_json(&json).unwrap();
        assert_eq!(config.move_speed, restored.move_speed);
        assert_eq!(config.leaves_per_instar, restored.leaves_per_instar);
        assert_eq!(config.start_point, restored.start_point);
        assert_eq!(config.layout.points.len(), restored.layout.points.len());
    }

    #[test]
    fn config_loads_from_json_string() {
        let json = r#"{
            "move_speed": 1.5,
            "leaf_eat_delay_secs": 2.0,
            "leaves_per_instar": [1, 1, 2, 2, 3],
            "start_point": "SleepPointB",
            "species": "AntheraeaYamamai"
        }"#;
        let config = CageConfig::from_json(json).unwrap();
        assert_eq!(config.move_speed, 1.5);
        assert_eq!(config.leaf_eat_delay_secs, 2.0);
        assert_eq!(config.leaves_per_instar, [1, 1, 2, 2, 3]);
        assert_eq!(config.species, Species::AntheraeaYamamai);
        // Omitted fields keep their defaults.
        assert_eq!(config.arrive_threshold, 0.01);
        assert_eq!(config.layout.points.len(), 16);
    }

    #[test]
    fn tuning_mirrors_config() {
        let config = CageConfig {
            move_speed: 2.0,
            turn_activation_timeout_secs: 0.25,
            ..CageConfig::default()
        };
        let tuning = config.executor_tuning();
        assert_eq!(tuning.move_speed, 2.0);
        assert_eq!(tuning.turn_activation_timeout_secs, 0.25);
        assert_eq!(tuning.leaf_eat_delay_secs, 1.0);
    }

    #[test]
    fn unknown_start_point_is_rejected() {
        let err = CageConfig::from_json(r#"{ "start_point": "Treetop" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStartPoint(name) if name == "Treetop"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = CageConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn broken_layout_is_rejected() {
        let mut config = CageConfig::default();
        config.layout.points[2].neighbors.push("Nowhere".into());
        let json = serde_json::to_string(&config).unwrap();
        let err = CageConfig::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Layout(LayoutError::UnknownNeighbor { .. })
        ));
    }

    fn rejected_field(json: &str) -> &'static str {
        match CageConfig::from_json(json) {
            Err(ConfigError::InvalidTuning { field, .. }) => field,
            other => panic!("expected InvalidTuning, got {other:?}"),
        }
    }

    #[test]
    fn stalled_or_backward_walk_is_rejected() {
        assert_eq!(rejected_field(r#"{ "move_speed": 0.0 }"#), "move_speed");
        assert_eq!(rejected_field(r#"{ "move_speed": -1.0 }"#), "move_speed");
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert_eq!(
            rejected_field(r#"{ "arrive_threshold": -0.01 }"#),
            "arrive_threshold"
        );
    }

    #[test]
    fn negative_eat_delay_is_rejected() {
        assert_eq!(
            rejected_field(r#"{ "leaf_eat_delay_secs": -1.0 }"#),
            "leaf_eat_delay_secs"
        );
    }

    #[test]
    fn negative_activation_timeout_is_rejected() {
        assert_eq!(
            rejected_field(r#"{ "turn_activation_timeout_secs": -0.5 }"#),
            "turn_activation_timeout_secs"
        );
    }

    #[test]
    fn non_finite_tuning_is_rejected() {
        let config = CageConfig {
            move_speed: f32::NAN,
            ..CageConfig::default()
        };
        assert!(matches!(
            config.validate_tuning(),
            Err(ConfigError::InvalidTuning { field: "move_speed", .. })
        ));
        let config = CageConfig {
            leaf_eat_delay_secs: f32::INFINITY,
            ..CageConfig::default()
        };
        assert!(matches!(
            config.validate_tuning(),
            Err(ConfigError::InvalidTuning {
                field: "leaf_eat_delay_secs",
                ..
            })
        ));
    }

    #[test]
    fn zero_delays_and_threshold_are_allowed() {
        let config = CageConfig::from_json(
            r#"{ "arrive_threshold": 0.0, "leaf_eat_delay_secs": 0.0, "turn_activation_timeout_secs": 0.0 }"#,
        )
        .unwrap();
        assert_eq!(config.leaf_eat_delay_secs, 0.0);
    }

    #[test]
    fn start_point_resolves_on_default_layout() {
        let (graph, start) = CageConfig::default().build_branch().unwrap();
        assert_eq!(graph.node(start).unwrap().name, "SleepPointA");
    }
}
