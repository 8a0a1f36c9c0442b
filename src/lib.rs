//! Ontrack - an onboarding progress tracker
//!
//! The onboarding wizards persist a handful of boolean flags. This library
//! turns those flags into a task list with derived statuses, picks the next
//! task to work on and keeps that view current as flags change:
//! - Flag and task models, plus the fixed task catalog
//! - Pure status derivation and progress aggregation
//! - Manual selection that survives unrelated refreshes
//! - A pluggable flag store (in-memory or SQLite) with change notifications
//! - Navigation handoff for starting a task
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use ontrack::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod nav;
pub mod repo;
pub mod store;
pub mod tracker;
