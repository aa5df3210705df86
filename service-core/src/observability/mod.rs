pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::{detached_prometheus_handle, install_prometheus_recorder};
