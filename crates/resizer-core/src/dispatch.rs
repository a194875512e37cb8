//! Job dispatch with a bounded caller-side wait.
//!
//! Jobs are submitted as messages and run on the blocking pool, at most
//! `workers` at a time. Each submission returns a [`JobHandle`]; waiting on
//! it with a timeout never cancels the job itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Semaphore};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::job::Pipeline;
use crate::types::{JobOutcome, JobRequest};

type JobResult = Result<JobOutcome, DispatchError>;

/// Bounded worker pool in front of a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl JobDispatcher {
    pub fn new(pipeline: Arc<Pipeline>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue a job. Must be called from within a tokio runtime.
    pub fn submit(&self, request: JobRequest) -> JobHandle {
        let job_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel::<JobResult>();
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);

        tracing::debug!("Submitted job {} for {:?}", job_id, request.archive);
        tokio::spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(permit) => {
                    let joined = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        pipeline.run(request)
                    })
                    .await;
                    match joined {
                        Ok(result) => result.map_err(DispatchError::from),
                        Err(e) => Err(DispatchError::WorkerLost(e.to_string())),
                    }
                }
                Err(e) => Err(DispatchError::WorkerLost(e.to_string())),
            };

            if tx.send(result).is_err() {
                tracing::debug!("Job {} finished after its handle was dropped", job_id);
            }
        });

        JobHandle {
            job_id,
            rx,
            taken: false,
        }
    }
}

/// Caller side of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    job_id: Uuid,
    rx: oneshot::Receiver<JobResult>,
    taken: bool,
}

impl JobHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Wait up to `timeout` for the result.
    ///
    /// On [`DispatchError::Timeout`] the job keeps running and the handle can
    /// be waited on again. A result is handed out once.
    pub async fn wait(&mut self, timeout: Duration) -> JobResult {
        if self.taken {
            return Err(already_taken());
        }
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(result)) => {
                self.taken = true;
                result
            }
            Ok(Err(_)) => {
                self.taken = true;
                Err(DispatchError::WorkerLost(
                    "result channel closed".to_string(),
                ))
            }
            Err(_) => Err(DispatchError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Non-blocking poll. `None` while the job is still running.
    pub fn try_result(&mut self) -> Option<JobResult> {
        if self.taken {
            return Some(Err(already_taken()));
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.taken = true;
                Some(result)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.taken = true;
                Some(Err(DispatchError::WorkerLost(
                    "result channel closed".to_string(),
                )))
            }
        }
    }
}

fn already_taken() -> DispatchError {
    DispatchError::WorkerLost("result already taken".to_string())
}
