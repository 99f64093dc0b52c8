//! Indexer bulk adaptor: frames a batch as a bulk write to the indexing
//! backend and splits its response back into per-item outcomes. Owns all
//! transport-level resilience (retry, circuit breaking) so a flaky
//! backend never escalates straight into a whole-batch failure for the
//! batcher.

pub mod bulk;
pub mod config;
pub mod resilience;

pub use bulk::HttpBulkAdaptor;
pub use config::IndexerConfig;
pub use resilience::{CircuitBreakerAdaptor, CircuitBreakerConfig, RetryConfig, RetryingAdaptor};

/// Builds the production adaptor stack: HTTP bulk call wrapped in retry,
/// wrapped in a circuit breaker.
pub fn build_resilient_adaptor(
    config: IndexerConfig,
) -> CircuitBreakerAdaptor<RetryingAdaptor<HttpBulkAdaptor>> {
    let base = HttpBulkAdaptor::new(config);
    let retrying = RetryingAdaptor::with_defaults(base);
    CircuitBreakerAdaptor::with_defaults(retrying)
}
