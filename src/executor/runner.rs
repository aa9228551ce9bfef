//! Test execution runner
//!
//! Drives one launch request from resource loading to the terminal
//! `finished` message.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

use super::context::ExecutionContext;
use crate::models::Outcome;
use crate::protocol::{LaunchRequest, StatusSender};
use crate::registry::{ModuleSpace, ResolutionError, ResourceLoadError, ResourceLoader};

/// Why a run ended with an exception
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error(transparent)]
    ResourceLoad(#[from] ResourceLoadError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("{0}")]
    RunFailure(String),

    #[error("test program did not signal readiness within {0:?}")]
    ReadyTimeout(Duration),
}

/// Runs launch requests inside one worker's module space
pub struct TestRunner {
    space: ModuleSpace,
    ready_timeout: Option<Duration>,
}

impl TestRunner {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            space: ModuleSpace::new(loader),
            ready_timeout: None,
        }
    }

    /// Bound the wait for readiness. `None` waits indefinitely.
    pub fn with_ready_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn space(&self) -> &ModuleSpace {
        &self.space
    }

    /// Run `request`, reporting through `status`.
    ///
    /// Emits exactly one `finished`, always last.
    pub async fn run(&mut self, request: &LaunchRequest, status: StatusSender) -> Outcome {
        let started_at = Utc::now();
        let start = Instant::now();

        info!("Launching {}", request);
        let result = self.execute(request, &status).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let exception = match result {
            Ok(()) => None,
            Err(e) => {
                match &e {
                    RunError::RunFailure(msg) => warn!("{} failed: {}", request.exe, msg),
                    other => error!("{} could not run: {}", request.exe, other),
                }
                Some(e.to_string())
            }
        };

        let outcome = Outcome::from_parts(
            &request.exe,
            started_at,
            duration_ms,
            status.is_ready(),
            exception,
        );
        status.finish(outcome.exception.clone());

        info!("{}", outcome);
        outcome
    }

    async fn execute(&mut self, request: &LaunchRequest, status: &StatusSender) -> Result<(), RunError> {
        self.space.load_all(&request.scripts).await?;

        let program = self.space.instantiate(&request.exe)?;
        let context = ExecutionContext::start(&request.exe, program, status, request.args.clone());

        context.drive(status, self.ready_timeout).await
    }
}
