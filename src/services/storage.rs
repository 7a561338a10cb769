use async_trait::async_trait;
use image::ImageFormat;
use s3::creds::Credentials;
use s3::{Bucket, Region};

/// Durable blob storage that hands back a locator the workflow can read
/// without credentials.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `data` under `name` and return a time-bounded read URL.
    async fn store(&self, name: &str, data: &[u8], content_type: &str)
        -> Result<String, StorageError>;
}

/// S3-compatible bucket (R2, MinIO, GCS interop) with presigned GET URLs.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    url_expiry_secs: u32,
}

impl S3BlobStore {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        url_expiry_secs: u32,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials =
            Credentials::new(Some(access_key), Some(secret_key), None, None, None)
                .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?
            .with_path_style();

        Ok(Self {
            bucket,
            url_expiry_secs,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(name, data, content_type)
            .await?;

        // Built without `fail-on-err`, so non-2xx responses arrive as Ok.
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Status {
                key: name.to_string(),
                status,
            });
        }

        let url = self
            .bucket
            .presign_get(name, self.url_expiry_secs, None)
            .await?;
        Ok(url)
    }
}

/// Content type and file extension for an uploaded image.
///
/// Sniffed from magic bytes; anything unrecognised is stored as PNG.
pub fn image_content_type(data: &[u8]) -> (&'static str, &'static str) {
    match image::guess_format(data) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP)) => (
            format.to_mime_type(),
            format.extensions_str().first().copied().unwrap_or("png"),
        ),
        _ => ("image/png", "png"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Upload of {key} rejected with HTTP {status}")]
    Status { key: String, status: u16 },

    #[error("Upload of {0} timed out")]
    Timeout(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
