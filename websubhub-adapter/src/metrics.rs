//! Adapter metrics

use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static::lazy_static! {
    /// Bootstrap attempts by outcome
    pub static ref ADAPTER_ACTIVATIONS_TOTAL: CounterVec = register_counter_vec!(
        "websubhub_adapter_activations_total",
        "Adapter bootstrap attempts",
        &["outcome"]
    )
    .unwrap();

    /// Resource retrievals by status
    pub static ref RESOURCE_FETCH_TOTAL: CounterVec = register_counter_vec!(
        "websubhub_adapter_resource_fetch_total",
        "Remote resource retrievals",
        &["status"]
    )
    .unwrap();

    /// Resource retrieval latency
    pub static ref RESOURCE_FETCH_DURATION: HistogramVec = register_histogram_vec!(
        "websubhub_adapter_resource_fetch_duration_seconds",
        "Remote resource retrieval duration",
        &["status"]
    )
    .unwrap();
}
