use scan_relay::config::AppConfig;
use scan_relay::services::storage::{BlobStore, S3BlobStore};
use uuid::Uuid;

/// Integration test: store an object and read it back through the signed URL.
///
/// Note: This requires real bucket credentials configured via environment
/// variables (see `AppConfig`).
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_signed_url_serves_stored_object() {
    let config = AppConfig::from_env().expect("Failed to load config");

    let store = S3BlobStore::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_region,
        &config.storage_access_key,
        &config.storage_secret_key,
        300,
    )
    .expect("Failed to initialize storage");

    let name = format!("test/{}.png", Uuid::new_v4());
    let data = b"integration test payload";

    let url = store
        .store(&name, data, "image/png")
        .await
        .expect("Upload failed");

    let response = reqwest::get(&url).await.expect("Signed URL fetch failed");
    assert!(response.status().is_success(), "signed URL returned {}", response.status());
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), data);
}
