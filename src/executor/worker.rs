//! Isolated workers
//!
//! Each worker owns a dedicated thread running a current-thread runtime, so
//! everything inside it is scheduled cooperatively on one thread. The
//! controller talks to it only through messages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::{debug, info};

use super::runner::TestRunner;
use crate::protocol::{
    status_channel, LaunchRequest, StatusMessage, StatusReceiver, StatusSender, Transcript,
};
use crate::registry::ResourceLoader;

/// Controller-side worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker {0} already has a run in flight")]
    Busy(usize),

    #[error("worker {0} has stopped")]
    Stopped(usize),

    #[error("worker {0} closed the status channel before finished")]
    Disconnected(usize),

    #[error("worker {0} thread panicked")]
    Panicked(usize),

    #[error("failed to start worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: std::io::Error,
    },
}

struct Launch {
    request: LaunchRequest,
    status: StatusSender,
    slot: SlotGuard,
}

/// Handle to a running worker
pub struct WorkerHandle {
    id: usize,
    tx: Option<mpsc::UnboundedSender<Launch>>,
    busy: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Start a worker thread that loads resources from `loader`
    pub fn spawn(
        id: usize,
        loader: Arc<dyn ResourceLoader>,
        ready_timeout: Option<Duration>,
    ) -> Result<Self, WorkerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| WorkerError::Spawn { id, source })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let runner = TestRunner::new(loader).with_ready_timeout(ready_timeout);

        let thread = std::thread::Builder::new()
            .name(format!("harness-worker-{id}"))
            .spawn(move || {
                let local = LocalSet::new();
                local.block_on(&runtime, worker_loop(id, runner, rx));
            })
            .map_err(|source| WorkerError::Spawn { id, source })?;

        debug!("Spawned worker {}", id);
        Ok(Self {
            id,
            tx: Some(tx),
            busy: Arc::new(AtomicBool::new(false)),
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// True while a run is in flight.
    ///
    /// A run stays in flight until the controller observes its `finished`
    /// or, if its `RunHandle` was dropped early, until the worker is done
    /// with it. An abandoned run that never ends keeps the worker busy.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Send a launch request. Fails with `Busy` while a run is in flight.
    pub fn launch(&self, request: LaunchRequest) -> Result<RunHandle, WorkerError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy(self.id));
        }
        let slot = Arc::new(RunSlot {
            busy: Arc::clone(&self.busy),
            released: AtomicBool::new(false),
        });

        let (status, rx) = status_channel();
        let launch = Launch {
            request,
            status,
            slot: SlotGuard(Arc::clone(&slot)),
        };
        // a launch that never reaches the worker releases its slot on drop
        let tx = self.tx.as_ref().ok_or(WorkerError::Stopped(self.id))?;
        tx.send(launch).map_err(|_| WorkerError::Stopped(self.id))?;

        Ok(RunHandle {
            worker_id: self.id,
            rx,
            slot,
            done: false,
        })
    }

    /// Stop accepting requests and wait for queued runs to end
    pub fn shutdown(mut self) -> Result<(), WorkerError> {
        self.tx.take();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| WorkerError::Panicked(self.id)),
            None => Ok(()),
        }
    }
}

async fn worker_loop(id: usize, mut runner: TestRunner, mut rx: mpsc::UnboundedReceiver<Launch>) {
    info!("Worker {} started", id);
    while let Some(Launch {
        request,
        status,
        slot,
    }) = rx.recv().await
    {
        let outcome = runner.run(&request, status).await;
        drop(slot);
        debug!("Worker {} finished {}", id, outcome.test_id);
    }
    info!("Worker {} stopped", id);
}

/// Busy marker for one run, released at most once.
///
/// The controller releases it on observing `finished`; the worker releases
/// it when the run returns. Whichever comes first frees the worker.
struct RunSlot {
    busy: Arc<AtomicBool>,
    released: AtomicBool,
}

impl RunSlot {
    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.busy.store(false, Ordering::Release);
        }
    }
}

/// Worker-side hold on a run slot
struct SlotGuard(Arc<RunSlot>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Controller-side view of one in-flight run
pub struct RunHandle {
    worker_id: usize,
    rx: StatusReceiver,
    slot: Arc<RunSlot>,
    done: bool,
}

impl RunHandle {
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Next status message; `None` after `finished` or if the worker went away
    pub async fn next(&mut self) -> Option<StatusMessage> {
        if self.done {
            return None;
        }

        let message = self.rx.recv().await;
        if message.as_ref().map_or(true, StatusMessage::is_terminal) {
            self.done = true;
            self.slot.release();
        }
        message
    }

    /// Wait for the run to finish and return everything it sent
    pub async fn collect(mut self) -> Result<Transcript, WorkerError> {
        let mut transcript = Transcript::new();
        while let Some(message) = self.next().await {
            transcript.push(message);
        }

        if transcript.is_complete() {
            Ok(transcript)
        } else {
            Err(WorkerError::Disconnected(self.worker_id))
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::programs::builtin_catalog;

    fn worker() -> WorkerHandle {
        WorkerHandle::spawn(0, Arc::new(builtin_catalog()), None).unwrap()
    }

    #[tokio::test]
    async fn test_scenarios_through_worker() {
        let worker = worker();

        let good = worker
            .launch(LaunchRequest::new("Good").with_script("good.mod"))
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(good.kinds(), vec!["ready", "finished"]);
        assert!(good.succeeded());

        let bad = worker
            .launch(LaunchRequest::new("Bad").with_script("bad.mod"))
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(bad.kinds(), vec!["ready", "finished"]);
        assert_eq!(bad.exception(), Some("boom"));

        let missing = worker
            .launch(LaunchRequest::new("Missing"))
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(missing.kinds(), vec!["finished"]);
        assert!(missing.exception().is_some_and(|e| !e.is_empty()));

        worker.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_one_run_at_a_time() {
        let worker = worker();

        let mut first = worker
            .launch(LaunchRequest::new("Sleepy").with_script("util.mod"))
            .unwrap();
        assert!(worker.is_busy());
        assert!(matches!(
            worker.launch(LaunchRequest::new("Good")),
            Err(WorkerError::Busy(0))
        ));

        while first.next().await.is_some() {}
        assert!(!worker.is_busy());

        let second = worker.launch(LaunchRequest::new("Good").with_script("good.mod"));
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_run_keeps_worker_busy_until_it_returns() {
        let worker = worker();

        let run = worker
            .launch(
                LaunchRequest::new("Sleepy")
                    .with_script("util.mod")
                    .with_arg("50"),
            )
            .unwrap();
        drop(run);

        assert!(worker.is_busy());
        assert!(matches!(
            worker.launch(LaunchRequest::new("Sleepy")),
            Err(WorkerError::Busy(0))
        ));

        for _ in 0..200 {
            if !worker.is_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!worker.is_busy());

        let next = worker
            .launch(LaunchRequest::new("Sleepy"))
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert!(next.succeeded());

        worker.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_abandoned_stalled_run_is_still_busy() {
        let worker = worker();

        let mut run = worker
            .launch(LaunchRequest::new("Stall").with_script("util.mod"))
            .unwrap();
        assert_eq!(run.next().await, Some(StatusMessage::write_line("stalling")));
        drop(run);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(worker.is_busy());
        assert!(matches!(
            worker.launch(LaunchRequest::new("Good")),
            Err(WorkerError::Busy(0))
        ));
    }

    #[tokio::test]
    async fn test_next_stops_after_finished() {
        let worker = worker();
        let mut run = worker
            .launch(LaunchRequest::new("Hello").with_script("good.mod"))
            .unwrap();

        assert_eq!(run.next().await, Some(StatusMessage::write_line("hello")));
        assert_eq!(run.next().await, Some(StatusMessage::Ready));
        assert_eq!(run.next().await, Some(StatusMessage::finished(None)));
        assert_eq!(run.next().await, None);
    }
}
