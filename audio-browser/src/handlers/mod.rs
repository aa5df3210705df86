pub mod api;
pub mod app;
pub mod audio;
pub mod browse;
pub mod metrics;
