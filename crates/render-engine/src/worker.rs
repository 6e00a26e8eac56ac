//! Bounded render worker pool.
//!
//! Each job runs on the blocking thread pool once it holds a permit, so at
//! most `max_concurrent_renders` encodes run at a time and a slow render
//! never stalls the caller's runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reelsmith_common::{AppConfig, ReelError, ReelResult};
use reelsmith_timeline_model::{RenderRequest, ScoringRequest, SubclipRequest};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::export::render_job;
use crate::scoring::scoring_job;
use crate::subclip::subclip_job;

/// A unit of work accepted by the pool.
#[derive(Debug, Clone)]
pub enum RenderJob {
    Program(RenderRequest),
    Subclip(SubclipRequest),
    Score(ScoringRequest),
}

impl RenderJob {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderJob::Program(_) => "program",
            RenderJob::Subclip(_) => "subclip",
            RenderJob::Score(_) => "score",
        }
    }

    /// Run to completion on the current thread.
    pub fn run(&self, config: &AppConfig) -> ReelResult<()> {
        match self {
            RenderJob::Program(request) => render_job(request, config, None).map(|_| ()),
            RenderJob::Score(request) => scoring_job(request, config).map(|_| ()),
            RenderJob::Subclip(request) => {
                let outcomes = subclip_job(request, config)?;
                let failed = outcomes.iter().filter(|o| !o.success).count();
                if failed > 0 {
                    return Err(ReelError::render(format!(
                        "{failed} of {} cuts failed",
                        outcomes.len()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// How one job ended.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub kind: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

pub struct RenderWorkerPool {
    permits: Arc<Semaphore>,
    config: Arc<AppConfig>,
    max_concurrent: usize,
}

impl RenderWorkerPool {
    pub fn new(config: AppConfig) -> Self {
        let max_concurrent = config.workers.max_concurrent_renders.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            config: Arc::new(config),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Queue a job. Must be called from within a Tokio runtime.
    pub fn submit(&self, job_id: impl Into<String>, job: RenderJob) -> JoinHandle<JobOutcome> {
        let kind = job.kind();
        self.submit_with(job_id, kind, move |config| job.run(config))
    }

    /// Queue arbitrary blocking work under the pool's concurrency bound.
    pub fn submit_with<F>(
        &self,
        job_id: impl Into<String>,
        kind: &'static str,
        work: F,
    ) -> JoinHandle<JobOutcome>
    where
        F: FnOnce(&AppConfig) -> ReelResult<()> + Send + 'static,
    {
        let job_id = job_id.into();
        let permits = Arc::clone(&self.permits);
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            let queued_at = Utc::now();
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    return JobOutcome {
                        job_id,
                        kind,
                        success: false,
                        error: Some(format!("worker pool closed: {err}")),
                        started_at: queued_at,
                        finished_at: Utc::now(),
                    };
                }
            };

            let started_at = Utc::now();
            tracing::info!(job_id = %job_id, kind, "Job started");
            let joined = tokio::task::spawn_blocking(move || work(&config)).await;
            drop(permit);

            let error = match joined {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(err) => Some(format!("job panicked or was cancelled: {err}")),
            };
            let outcome = JobOutcome {
                job_id,
                kind,
                success: error.is_none(),
                error,
                started_at,
                finished_at: Utc::now(),
            };
            if outcome.success {
                tracing::info!(
                    job_id = %outcome.job_id,
                    elapsed_secs = outcome.elapsed_secs(),
                    "Job finished"
                );
            } else {
                tracing::error!(
                    job_id = %outcome.job_id,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "Job failed"
                );
            }
            outcome
        })
    }

    /// Run every job and collect outcomes in submission order.
    pub async fn run_all(&self, jobs: Vec<(String, RenderJob)>) -> Vec<JobOutcome> {
        let handles: Vec<(String, &'static str, JoinHandle<JobOutcome>)> = jobs
            .into_iter()
            .map(|(id, job)| {
                let kind = job.kind();
                (id.clone(), kind, self.submit(id, job))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (job_id, kind, handle) in handles {
            let now = Utc::now();
            outcomes.push(handle.await.unwrap_or_else(|err| JobOutcome {
                job_id,
                kind,
                success: false,
                error: Some(format!("worker task failed: {err}")),
                started_at: now,
                finished_at: now,
            }));
        }
        outcomes
    }
}
