//! Drives a single analysis job from submission to retrieved results.

use log::{debug, info, warn};
use std::path::Path;
use std::time::Duration;

use crate::error::{remote_error, timeout_error, RedactError, Result};
use crate::progress::ProgressObserver;
use crate::service::{
    AnalysisJob, AnalysisResults, AnalysisService, CheckOptions, JobStatus,
};

/// Interval between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Coordinates one job against an [`AnalysisService`]
pub struct AnalysisCoordinator<'a> {
    service: &'a dyn AnalysisService,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl<'a> AnalysisCoordinator<'a> {
    pub fn new(service: &'a dyn AnalysisService) -> Self {
        Self {
            service,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound the total time [`await_completion`](Self::await_completion) may wait
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate options and upload the video, returning the pending job
    pub async fn submit(&self, video: &Path, options: &CheckOptions) -> Result<AnalysisJob> {
        options.validate()?;

        info!("Submitting {:?} for analysis (threshold {})", video, options.threshold);
        let id = self.service.submit(video, options).await?;
        debug!("Analysis job {} created", id);

        Ok(AnalysisJob {
            id,
            status: JobStatus::Pending,
            frames_complete: 0,
            frames_total: 0,
            error: None,
            total_duration_ms: None,
        })
    }

    /// Poll until the job reaches a terminal status, then fetch its results.
    ///
    /// A single failed poll is fatal. Without a timeout this waits for as
    /// long as the service keeps reporting the job as pending.
    pub async fn await_completion(
        &self,
        job_id: &str,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<AnalysisResults> {
        let wait = self.poll_until_terminal(job_id, observer);
        let job = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| timeout_error(format!("analysis job {}", job_id), limit))??,
            None => wait.await?,
        };

        match job.status {
            JobStatus::Complete => self.collect_results(&job).await,
            JobStatus::Failed => Err(RedactError::AnalysisFailed {
                message: job.error.unwrap_or_else(|| "no reason given".to_string()),
            }),
            JobStatus::Pending => Err(remote_error(format!(
                "job {} left the wait loop while pending",
                job.id
            ))),
        }
    }

    async fn poll_until_terminal(
        &self,
        job_id: &str,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<AnalysisJob> {
        loop {
            let job = self.service.status(job_id).await?;

            if let Some(observer) = observer {
                observer.on_progress(job.frames_complete, job.frames_total);
            }

            if job.status.is_terminal() {
                debug!("Job {} finished with status {:?}", job_id, job.status);
                return Ok(job);
            }

            debug!("Job {} {}% complete", job_id, job.progress_percent());
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Retrieve results for a job that has already completed
    pub async fn fetch_results(&self, job_id: &str) -> Result<AnalysisResults> {
        let job = self.service.status(job_id).await?;
        if job.status != JobStatus::Complete {
            return Err(remote_error(format!(
                "results requested for job {} in status {:?}",
                job_id, job.status
            )));
        }
        self.collect_results(&job).await
    }

    async fn collect_results(&self, job: &AnalysisJob) -> Result<AnalysisResults> {
        let total_duration_ms = job.total_duration_ms.ok_or_else(|| {
            remote_error(format!("job {} completed without a video duration", job.id))
        })?;
        let instances = self.service.results(&job.id).await?;

        info!(
            "Analysis found {} objectionable instance(s) in {}ms of video",
            instances.len(),
            total_duration_ms
        );
        Ok(AnalysisResults {
            instances,
            total_duration_ms,
        })
    }

    /// Best-effort removal of the job from the service
    pub async fn discard(&self, job_id: &str) {
        if let Err(e) = self.service.delete(job_id).await {
            warn!("Failed to delete analysis job {} (continuing regardless): {}", job_id, e);
        }
    }
}
