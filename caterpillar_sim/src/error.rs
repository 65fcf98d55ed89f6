// Load-time errors.
//
// Only building a branch graph from a layout and parsing a config can fail.
// Everything that happens once the cage is running degrades to "skip and
// continue" instead (see `executor.rs`), so there is no runtime error type.

use thiserror::Error;

/// A `BranchLayout` that cannot be turned into a `BranchGraph`.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("point name `{0}` appears more than once in the layout")]
    DuplicatePoint(String),

    #[error("point `{point}` lists unknown neighbor `{neighbor}`")]
    UnknownNeighbor { point: String, neighbor: String },

    #[error("leaf id `{0}` is attached to more than one point")]
    DuplicateLeaf(String),
}

/// A `CageConfig` that failed to load.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid branch layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("start point `{0}` does not exist in the branch layout")]
    UnknownStartPoint(String),

    #[error("`{field}` = {value} is out of range")]
    InvalidTuning { field: &'static str, value: f32 },
}
