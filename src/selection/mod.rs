//! Content selection: plans and the selector that builds them

pub mod plan;
mod selector;

pub use plan::{
    ContentFilter, PreferenceSets, SelectionMode, SelectionPlan, SelectionRequest, DEFAULT_LIMIT,
    MAX_EXCLUDE_IDS, MAX_LIMIT,
};
pub use selector::ContentSelector;
