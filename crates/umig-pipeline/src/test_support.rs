//! In-memory tenant for orchestrator tests
#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use umig_common::{MigrateError, Result};

use crate::tenant::{ExportRequest, ImportRequest, TenantClient};
use crate::types::{Job, JobStatus, Record};

pub(crate) const EXPORT_LOCATION: &str = "https://download.example.com/export.json.gz";

/// Each started job follows the next script in line: a list of statuses
/// returned by successive reads, the last one repeating.
#[derive(Default)]
pub(crate) struct ScriptedTenant {
    scripts: Mutex<VecDeque<Vec<JobStatus>>>,
    jobs: Mutex<HashMap<String, VecDeque<JobStatus>>>,
    pub(crate) exports: Mutex<Vec<ExportRequest>>,
    pub(crate) imports: Mutex<Vec<(Vec<Record>, bool)>>,
    pub(crate) reads: Mutex<usize>,
    fail_start: bool,
    fail_reads: bool,
}

impl ScriptedTenant {
    pub(crate) fn with_scripts(scripts: Vec<Vec<JobStatus>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        }
    }

    /// Every export or import start is rejected
    pub(crate) fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Default::default()
        }
    }

    /// Jobs start but every status read is rejected
    pub(crate) fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }

    pub(crate) fn import_starts(&self) -> usize {
        self.imports.lock().unwrap().len()
    }

    fn start(&self, prefix: &str) -> Job {
        let mut jobs = self.jobs.lock().unwrap();
        let id = format!("{}_{}", prefix, jobs.len() + 1);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![JobStatus::Completed]);
        jobs.insert(id.clone(), script.into());
        Job::new(id, JobStatus::Pending)
    }
}

#[async_trait]
impl TenantClient for ScriptedTenant {
    async fn start_export(&self, request: &ExportRequest) -> Result<Job> {
        if self.fail_start {
            return Err(MigrateError::transport("export endpoint unavailable"));
        }
        self.exports.lock().unwrap().push(request.clone());
        Ok(self.start("export"))
    }

    async fn start_import(&self, request: &ImportRequest<'_>) -> Result<Job> {
        if self.fail_start {
            return Err(MigrateError::transport("import endpoint unavailable"));
        }
        self.imports
            .lock()
            .unwrap()
            .push((request.records.to_vec(), request.upsert));
        Ok(self.start("import"))
    }

    async fn read_job(&self, job_id: &str) -> Result<Job> {
        *self.reads.lock().unwrap() += 1;
        if self.fail_reads {
            return Err(MigrateError::transport("status endpoint unavailable"));
        }

        let mut jobs = self.jobs.lock().unwrap();
        let script = jobs
            .get_mut(job_id)
            .ok_or_else(|| MigrateError::transport(format!("unknown job {}", job_id)))?;
        let status = if script.len() > 1 {
            script.pop_front().unwrap_or(JobStatus::Pending)
        } else {
            script.front().copied().unwrap_or(JobStatus::Pending)
        };

        let job = Job::new(job_id, status);
        Ok(match status {
            JobStatus::Completed if job_id.starts_with("export") => job.with_location(EXPORT_LOCATION),
            _ => job,
        })
    }
}
