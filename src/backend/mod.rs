//! Sensor backend: HTTP client, payload models and the sample source seam.

pub mod client;
pub mod models;
pub mod source;

pub use client::BackendClient;
pub use source::{BackendSource, DataSource, EndpointShape, SampleSource, SyncOptions};
