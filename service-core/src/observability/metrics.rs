use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder behind the `metrics` facade.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))
}

/// A handle backed by a recorder that is not installed globally.
///
/// Renders an empty exposition; used where a router needs a handle but no
/// process-wide recorder should exist (tests, tooling).
pub fn detached_prometheus_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
