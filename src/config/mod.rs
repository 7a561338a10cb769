use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Incoming-webhook URL of the external workflow
    pub make_webhook_url: String,

    /// Bucket that receives the uploaded images
    pub storage_bucket: String,

    /// S3-compatible endpoint URL
    pub storage_endpoint: String,

    /// Signing region ("auto" for R2)
    #[serde(default = "default_storage_region")]
    pub storage_region: String,

    /// S3 access key ID
    pub storage_access_key: String,

    /// S3 secret access key
    pub storage_secret_key: String,

    /// Lifetime of the signed read URLs handed to the workflow
    #[serde(default = "default_signed_url_expiry_secs")]
    pub signed_url_expiry_secs: u32,

    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,

    /// Externally reachable base URL used to build callback URLs.
    /// Falls back to `https://<Host header>` when unset.
    pub public_base_url: Option<String>,

    /// Extra shared secret required on callbacks, in addition to the job id.
    pub callback_token: Option<String>,

    /// Evict jobs idle for longer than this. Unset keeps jobs forever.
    pub job_ttl_secs: Option<u64>,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Maximum request body size
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_storage_region() -> String {
    "auto".to_string()
}

// Seven days, the longest expiry SigV4 presigning allows.
fn default_signed_url_expiry_secs() -> u32 {
    604_800
}

fn default_upload_timeout_secs() -> u64 {
    60
}

fn default_webhook_timeout_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_body_limit_bytes() -> usize {
    50 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Cross-field checks envy cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A job must outlive its own upload window, or a client could be
        // handed an id that has already been evicted.
        if let Some(ttl) = self.job_ttl_secs {
            if ttl <= self.upload_timeout_secs {
                return Err(ConfigError::TtlTooShort {
                    ttl,
                    upload_timeout: self.upload_timeout_secs,
                });
            }
        }
        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn job_ttl(&self) -> Option<Duration> {
        self.job_ttl_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JOB_TTL_SECS ({ttl}) must be greater than UPLOAD_TIMEOUT_SECS ({upload_timeout})")]
    TtlTooShort { ttl: u64, upload_timeout: u64 },
}
