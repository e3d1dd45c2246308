pub mod archive;
pub mod classify;
pub mod config;
pub mod deadletter;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod report;
pub mod sink;
pub mod transform;
pub mod watermark;
pub mod window;
