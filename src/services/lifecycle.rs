//! Job lifecycle: create, fan-out upload, dispatch, and callback resolution.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Url;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::job::JobSnapshot;
use crate::models::scan::{BodyRegion, ScanImages};
use crate::services::registry::{JobRegistry, RegistryError};
use crate::services::storage::{image_content_type, BlobStore, StorageError};
use crate::services::webhook::{WorkflowDispatch, WorkflowNotifier};

const CALLBACK_PATH: &str = "webhook-callback";

/// An accepted submission. The workflow dispatch runs in the background.
#[derive(Debug)]
pub struct Submitted {
    pub job_id: Uuid,
    pub dispatch: JoinHandle<()>,
}

/// Orchestrates every state change a job goes through.
pub struct JobController {
    registry: Arc<JobRegistry>,
    storage: Arc<dyn BlobStore>,
    notifier: Arc<dyn WorkflowNotifier>,
    upload_timeout: Duration,
    callback_token: Option<String>,
}

impl JobController {
    pub fn new(
        registry: Arc<JobRegistry>,
        storage: Arc<dyn BlobStore>,
        notifier: Arc<dyn WorkflowNotifier>,
        upload_timeout: Duration,
        callback_token: Option<String>,
    ) -> Self {
        Self {
            registry,
            storage,
            notifier,
            upload_timeout,
            callback_token,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Create a job, store its four images and hand it to the workflow.
    ///
    /// Returns as soon as the dispatch is spawned; the job stays
    /// `processing` until the workflow calls back. Any upload failure marks
    /// the job `failed` and the workflow is never contacted.
    pub async fn submit(
        &self,
        images: ScanImages,
        public_base: &str,
    ) -> Result<Submitted, SubmitError> {
        let job_id = Uuid::new_v4();
        let callback_url = self.callback_url(public_base, job_id)?;

        self.registry.create(job_id)?;
        metrics::counter!("scan_jobs_submitted_total").increment(1);
        metrics::gauge!("scan_jobs_tracked").set(self.registry.len() as f64);
        tracing::info!(job_id = %job_id, "New scan job created");

        let urls = match self.upload_all(job_id, &images).await {
            Ok(urls) => urls,
            Err(e) => {
                if let Err(mark_err) = self.registry.mark_failed(job_id) {
                    tracing::warn!(job_id = %job_id, error = %mark_err, "Could not mark job failed");
                }
                metrics::counter!("scan_jobs_failed_total").increment(1);
                tracing::error!(job_id = %job_id, error = %e, "Upload failed, job marked failed");
                return Err(SubmitError::Upload(e));
            }
        };
        if let Err(e) = self.registry.finish_submission(job_id) {
            tracing::warn!(job_id = %job_id, error = %e, "Could not release submission pin");
        }
        tracing::info!(job_id = %job_id, "All images uploaded");

        let dispatch = WorkflowDispatch {
            job_id,
            callback_url,
            lips_url: urls.lips,
            tongue_url: urls.tongue,
            eyes_url: urls.eyes,
            nails_url: urls.nails,
        };

        let notifier = Arc::clone(&self.notifier);
        let dispatch = tokio::spawn(async move {
            match notifier.notify(&dispatch).await {
                Ok(()) => tracing::info!(job_id = %dispatch.job_id, "Workflow notified"),
                Err(e) => {
                    metrics::counter!("workflow_dispatch_failures_total").increment(1);
                    tracing::error!(
                        job_id = %dispatch.job_id,
                        error = %e,
                        "Workflow dispatch failed, job will remain processing"
                    );
                }
            }
        });

        Ok(Submitted { job_id, dispatch })
    }

    /// Apply a workflow result to the job it belongs to.
    pub fn resolve_callback(
        &self,
        job_id: Uuid,
        token: Option<&str>,
        result: serde_json::Value,
    ) -> Result<(), CallbackError> {
        if let Some(expected) = &self.callback_token {
            if token != Some(expected.as_str()) {
                metrics::counter!("scan_callbacks_unknown_total").increment(1);
                tracing::warn!(job_id = %job_id, "Callback token mismatch");
                return Err(CallbackError::NotFound(job_id));
            }
        }

        match self.registry.mark_complete(job_id, result) {
            Ok(_) => {
                metrics::counter!("scan_jobs_completed_total").increment(1);
                tracing::info!(job_id = %job_id, "Job marked as complete");
                Ok(())
            }
            Err(RegistryError::NotFound(_)) => {
                metrics::counter!("scan_callbacks_unknown_total").increment(1);
                tracing::error!(job_id = %job_id, "Job ID not found in callback");
                Err(CallbackError::NotFound(job_id))
            }
            Err(e) => {
                metrics::counter!("scan_callbacks_rejected_total").increment(1);
                tracing::warn!(job_id = %job_id, error = %e, "Callback for terminal job ignored");
                Err(CallbackError::Conflict(e))
            }
        }
    }

    pub fn status(&self, job_id: Uuid) -> Option<JobSnapshot> {
        self.registry.get(job_id).map(|job| job.snapshot())
    }

    fn callback_url(&self, public_base: &str, job_id: Uuid) -> Result<String, SubmitError> {
        let raw = format!("{}/{}", public_base.trim_end_matches('/'), CALLBACK_PATH);
        let mut url = Url::parse(&raw).map_err(|e| SubmitError::CallbackBase(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("jobId", &job_id.to_string());
            if let Some(token) = &self.callback_token {
                query.append_pair("token", token);
            }
        }
        Ok(url.into())
    }

    /// Upload all four images concurrently. Waits for every upload to settle
    /// before reporting; successful uploads are not rolled back on failure.
    async fn upload_all(
        &self,
        job_id: Uuid,
        images: &ScanImages,
    ) -> Result<UploadedUrls, StorageError> {
        let (lips, tongue, eyes, nails) = tokio::join!(
            self.upload_one(job_id, BodyRegion::Lips, images),
            self.upload_one(job_id, BodyRegion::Tongue, images),
            self.upload_one(job_id, BodyRegion::Eyes, images),
            self.upload_one(job_id, BodyRegion::Nails, images),
        );

        Ok(UploadedUrls {
            lips: lips?,
            tongue: tongue?,
            eyes: eyes?,
            nails: nails?,
        })
    }

    async fn upload_one(
        &self,
        job_id: Uuid,
        region: BodyRegion,
        images: &ScanImages,
    ) -> Result<String, StorageError> {
        let data = images.get(region);
        let (content_type, ext) = image_content_type(data);
        let name = format!("{region}-{job_id}.{ext}");

        let start = Instant::now();
        let outcome = match tokio::time::timeout(
            self.upload_timeout,
            self.storage.store(&name, data, content_type),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(name.clone())),
        };
        metrics::histogram!("scan_upload_seconds").record(start.elapsed().as_secs_f64());

        match &outcome {
            Ok(_) => tracing::debug!(job_id = %job_id, region = %region, key = %name, "Image stored"),
            Err(e) => tracing::error!(job_id = %job_id, region = %region, error = %e, "Image upload failed"),
        }
        outcome
    }
}

struct UploadedUrls {
    lips: String,
    tongue: String,
    eyes: String,
    nails: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Invalid callback base URL: {0}")]
    CallbackBase(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Image upload failed: {0}")]
    Upload(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("Job ID not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Conflict(RegistryError),
}
