//! HTTP plumbing: transport seam, configured client and endpoint modules.

pub mod api;
pub mod api_client;
pub mod config;
pub mod transport;

pub use api_client::{ApiClient, Navigator, Query};
pub use config::ApiConfig;
pub use transport::{FilePart, HttpTransport, ScriptedTransport};

#[cfg(target_arch = "wasm32")]
pub use transport::FetchTransport;
