use crate::events::{EventBus, ServerEvent};
use skymarshal_common::progress::ProgressReporter;
use skymarshal_graph::NetworkSnapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct NetworkJob {
    pub handle: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub result: Option<NetworkSnapshot>,
    pub error: Option<String>,
}

/// In-memory registry of network fetch jobs. Jobs never persist across a
/// restart; clients poll status or follow `job:progress` events.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, NetworkJob>>,
}

impl JobRegistry {
    pub fn create(&self, handle: &str) -> String {
        let job_id = skymarshal_common::get_random_hex(16);
        self.lock().insert(
            job_id.clone(),
            NetworkJob {
                handle: handle.to_string(),
                status: JobStatus::Running,
                progress: 0,
                message: "Starting network fetch...".to_string(),
                result: None,
                error: None,
            },
        );
        job_id
    }

    pub fn progress(&self, job_id: &str) -> Option<JobProgress> {
        self.lock().get(job_id).map(|job| JobProgress {
            job_id: job_id.to_string(),
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            error: job.error.clone(),
        })
    }

    pub fn result_of(&self, job_id: &str) -> Option<(JobStatus, Option<NetworkSnapshot>)> {
        let jobs = self.lock();
        jobs.get(job_id)
            .map(|job| (job.status, job.result.clone()))
    }

    pub fn update(&self, job_id: &str, progress: u8, message: &str, bus: &EventBus) {
        let mut jobs = self.lock();
        if let Some(job) = jobs.get_mut(job_id) {
            job.progress = progress;
            job.message = message.to_string();
            let event = JobProgress {
                job_id: job_id.to_string(),
                status: job.status,
                progress: job.progress,
                message: job.message.clone(),
                error: job.error.clone(),
            };
            drop(jobs);
            bus.publish(ServerEvent::JobProgress(event));
        }
    }

    pub fn complete(&self, job_id: &str, snapshot: NetworkSnapshot, bus: &EventBus) {
        let mut jobs = self.lock();
        if let Some(job) = jobs.get_mut(job_id) {
            job.status = JobStatus::Complete;
            job.progress = 100;
            job.message = "Done".to_string();
            job.result = Some(snapshot);
            let event = JobProgress {
                job_id: job_id.to_string(),
                status: JobStatus::Complete,
                progress: 100,
                message: "Done".to_string(),
                error: None,
            };
            drop(jobs);
            bus.publish(ServerEvent::JobProgress(event));
        }
    }

    pub fn fail(&self, job_id: &str, error: &str, bus: &EventBus) {
        let mut jobs = self.lock();
        if let Some(job) = jobs.get_mut(job_id) {
            job.status = JobStatus::Error;
            job.message = format!("Error: {error}");
            job.error = Some(error.to_string());
            let event = JobProgress {
                job_id: job_id.to_string(),
                status: JobStatus::Error,
                progress: job.progress,
                message: job.message.clone(),
                error: job.error.clone(),
            };
            drop(jobs);
            bus.publish(ServerEvent::JobProgress(event));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, NetworkJob>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Progress sink that mirrors fetcher stages into the job registry and the
/// event stream.
pub struct JobProgressReporter {
    pub job_id: String,
    pub jobs: Arc<JobRegistry>,
    pub bus: EventBus,
}

impl ProgressReporter for JobProgressReporter {
    fn report(&self, operation: &str, current: usize, total: usize) {
        let percent = if total == 0 {
            0
        } else {
            ((current as f64 / total as f64) * 100.0).min(100.0) as u8
        };
        self.jobs
            .update(&self.job_id, percent, operation, &self.bus);
    }
}
