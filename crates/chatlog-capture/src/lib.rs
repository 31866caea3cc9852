pub mod config;
pub mod filter;
pub mod normalize;
pub mod service;

pub use config::{CaptureConfig, ConfigError};
pub use filter::FilterPolicy;
pub use normalize::normalize;
pub use service::{CaptureOutcome, CaptureService, SkipReason};
