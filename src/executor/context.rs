//! Per-run execution context
//!
//! Owns the started program and its helper capability for the duration of
//! one run. Dropped once the run's terminal message is emitted.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::debug;

use super::runner::RunError;
use crate::helper::{ControllerHelper, OutputSink, Readiness};
use crate::protocol::StatusSender;
use crate::registry::TestProgram;

pub struct ExecutionContext {
    test_id: String,
    readiness: Readiness,
    run: LocalBoxFuture<'static, Result<(), RunError>>,
}

impl ExecutionContext {
    /// Inject a fresh helper into `program` and start its run.
    ///
    /// The run makes progress only while the context is being driven.
    pub fn start(
        test_id: &str,
        program: Box<dyn TestProgram>,
        status: &StatusSender,
        args: Vec<String>,
    ) -> Self {
        let readiness = Readiness::new();
        let helper = ControllerHelper::new(
            test_id,
            OutputSink::new(status.clone()),
            readiness.clone(),
        );

        let run = AssertUnwindSafe(async move { program.run(helper, args).await })
            .catch_unwind()
            .map(|result| match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(RunError::RunFailure(format!("{e:#}"))),
                Err(panic) => Err(RunError::RunFailure(panic_message(panic.as_ref()))),
            })
            .boxed_local();

        Self {
            test_id: test_id.to_string(),
            readiness,
            run,
        }
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Wait for readiness, emit `ready`, then drive the run to completion.
    ///
    /// A run that completes before readiness resolves ends the wait: `ready`
    /// is still emitted if the program signalled it or returned normally.
    pub async fn drive(
        self,
        status: &StatusSender,
        ready_timeout: Option<Duration>,
    ) -> Result<(), RunError> {
        let Self {
            test_id,
            readiness,
            mut run,
        } = self;

        let ready_wait = wait_ready(&readiness, ready_timeout);
        tokio::pin!(ready_wait);

        tokio::select! {
            biased;
            waited = &mut ready_wait => {
                waited?;
                status.ready();
            }
            result = &mut run => {
                debug!("{} completed before readiness was observed", test_id);
                if readiness.is_signaled() || result.is_ok() {
                    status.ready();
                }
                return result;
            }
        }

        run.await
    }
}

async fn wait_ready(readiness: &Readiness, timeout: Option<Duration>) -> Result<(), RunError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, readiness.wait())
            .await
            .map_err(|_| RunError::ReadyTimeout(limit)),
        None => {
            readiness.wait().await;
            Ok(())
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("test program panicked: {detail}")
}
