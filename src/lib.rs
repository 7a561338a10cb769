//! Scan relay
//!
//! Accepts four body-region photos per request, stores them in an
//! S3-compatible bucket, hands signed links to an external automation
//! workflow, and tracks each job until the workflow calls back with a result.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
