// Core data models for ontrack
// Flags are persisted inputs; tasks and statuses are static/derived

pub mod flag;
pub mod task;

pub use flag::*;
pub use task::*;
