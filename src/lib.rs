//! Worker Harness - isolated test-program execution
//!
//! A controller hands a [`protocol::LaunchRequest`] to a worker. The worker
//! loads the named resources into its module space, resolves the program,
//! and runs it. Output, readiness and completion flow back as
//! [`protocol::StatusMessage`]s, ending in exactly one `finished`.

pub mod cli;
pub mod config;
pub mod executor;
pub mod helper;
pub mod lifecycle;
pub mod models;
pub mod output;
pub mod programs;
pub mod protocol;
pub mod registry;
pub mod utils;
