//! Test execution engine
//!
//! Runner, isolated workers, a pool for running many requests, and the
//! line-oriented front end used by `serve`.

mod context;
mod pool;
mod runner;
mod serve;
mod worker;

pub use context::ExecutionContext;
pub use pool::{Completed, WorkerPool};
pub use runner::{RunError, TestRunner};
pub use serve::serve_lines;
pub use worker::{RunHandle, WorkerError, WorkerHandle};
