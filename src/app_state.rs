use std::sync::Arc;

use crate::services::lifecycle::JobController;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobController>,
    /// Overrides the Host-derived base when building callback URLs.
    pub public_base_url: Option<Arc<str>>,
}

impl AppState {
    pub fn new(jobs: JobController, public_base_url: Option<String>) -> Self {
        Self {
            jobs: Arc::new(jobs),
            public_base_url: public_base_url.map(Arc::from),
        }
    }
}
