//! HTTP surface and runtime supervisor for the batching mux/demux relay:
//! wires the configuration layer, the indexer adaptor, the supervisor,
//! and the `axum` router together.

pub mod config;
pub mod http;
pub mod supervisor;

pub use config::{AppConfig, ConfigError};
pub use http::{router, AppState};
pub use supervisor::RuntimeSupervisor;
