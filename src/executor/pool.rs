//! Parallel execution across workers
//!
//! Each worker runs one request at a time; concurrency comes from having
//! several workers.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::worker::{WorkerError, WorkerHandle};
use crate::models::{BatchSummary, Outcome};
use crate::protocol::{LaunchRequest, Transcript};
use crate::registry::ResourceLoader;

/// One finished request from a batch
#[derive(Debug)]
pub struct Completed {
    pub index: usize,
    pub request: LaunchRequest,
    pub worker_id: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub result: Result<Transcript, WorkerError>,
}

impl Completed {
    /// Outcome as seen from the controller
    pub fn outcome(&self) -> Outcome {
        match &self.result {
            Ok(transcript) => Outcome::from_parts(
                &self.request.exe,
                self.started_at,
                self.duration_ms,
                transcript.saw_ready(),
                transcript.exception().map(str::to_string),
            ),
            Err(e) => Outcome::error(
                &self.request.exe,
                self.started_at,
                self.duration_ms,
                e.to_string(),
            ),
        }
    }
}

/// Fixed set of workers sharing one resource loader
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    pub fn new(
        size: usize,
        loader: Arc<dyn ResourceLoader>,
        ready_timeout: Option<Duration>,
    ) -> Result<Self, WorkerError> {
        let workers = (0..size.max(1))
            .map(|id| WorkerHandle::spawn(id, Arc::clone(&loader), ready_timeout))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn worker(&self, id: usize) -> Option<&WorkerHandle> {
        self.workers.get(id)
    }

    /// Run every request, returning results in request order
    pub async fn run_all(&self, requests: Vec<LaunchRequest>) -> Vec<Completed> {
        info!(
            "Running {} requests on {} workers",
            requests.len(),
            self.workers.len()
        );

        let queue: Arc<Mutex<VecDeque<(usize, LaunchRequest)>>> =
            Arc::new(Mutex::new(requests.into_iter().enumerate().collect()));

        let lanes = self.workers.iter().map(|worker| {
            let queue = Arc::clone(&queue);
            async move {
                let mut done = Vec::new();
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some((index, request)) = next else { break };

                    debug!("Worker {} takes request {} ({})", worker.id(), index, request);
                    let started_at = Utc::now();
                    let start = Instant::now();
                    let result = match worker.launch(request.clone()) {
                        Ok(run) => run.collect().await,
                        Err(e) => Err(e),
                    };

                    done.push(Completed {
                        index,
                        request,
                        worker_id: worker.id(),
                        started_at,
                        duration_ms: start.elapsed().as_millis() as u64,
                        result,
                    });
                }
                done
            }
        });

        let mut completed: Vec<Completed> = join_all(lanes).await.into_iter().flatten().collect();
        completed.sort_by_key(|c| c.index);
        completed
    }

    /// Run every request and summarise the outcomes
    pub async fn run_batch(&self, requests: Vec<LaunchRequest>) -> BatchSummary {
        let start = Instant::now();
        let completed = self.run_all(requests).await;
        let summary = BatchSummary::new(completed.iter().map(Completed::outcome).collect());

        info!(
            "Batch completed in {}ms - Pass: {}/{} ({:.1}%)",
            start.elapsed().as_millis(),
            summary.passed,
            summary.total,
            summary.pass_rate()
        );
        summary
    }

    pub fn shutdown(self) -> Result<(), WorkerError> {
        for worker in self.workers {
            worker.shutdown()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::models::RunStatus;
    use crate::programs::builtin_catalog;

    fn pool(size: usize) -> WorkerPool {
        WorkerPool::new(size, Arc::new(builtin_catalog()), None).unwrap()
    }

    #[test]
    fn test_pool_has_at_least_one_worker() {
        let pool = pool(0);
        assert_eq!(pool.size(), 1);
        assert!(pool.worker(0).is_some());
        pool.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let pool = pool(3);
        let requests = vec![
            LaunchRequest::new("Sleepy").with_script("util.mod").with_arg("30"),
            LaunchRequest::new("Good").with_script("good.mod"),
            LaunchRequest::new("Bad").with_script("bad.mod"),
            LaunchRequest::new("Missing"),
            LaunchRequest::new("Echo").with_script("good.mod").with_arg("x"),
        ];

        let completed = pool.run_all(requests).await;
        let ids: Vec<&str> = completed.iter().map(|c| c.request.exe.as_str()).collect();
        assert_eq!(ids, vec!["Sleepy", "Good", "Bad", "Missing", "Echo"]);

        for c in &completed {
            let transcript = c.result.as_ref().unwrap();
            assert_eq!(transcript.validate(), Ok(()), "{}", c.request);
        }

        let statuses: Vec<RunStatus> = completed.iter().map(|c| c.outcome().status).collect();
        assert_eq!(
            statuses,
            vec![
                RunStatus::Pass,
                RunStatus::Pass,
                RunStatus::Fail,
                RunStatus::Error,
                RunStatus::Pass
            ]
        );

        pool.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_batch_summary() {
        let pool = pool(2);
        let summary = pool
            .run_batch(vec![
                LaunchRequest::new("Good").with_script("good.mod"),
                LaunchRequest::new("Bad").with_script("bad.mod"),
            ])
            .await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
    }
}
