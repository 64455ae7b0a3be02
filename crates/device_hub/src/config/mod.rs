//! Configuration module for device_hub
//!
//! This module contains:
//! - `timing`: Timeouts for backend commands and HTTP calls
//! - `backend`: Tool paths, default endpoints and fixture defaults
//!
//! Every value can be overridden through a `DEVICE_HUB_*` environment variable.

mod backend;
mod timing;

use lazy_static::lazy_static;

pub use backend::{parse_resolution, BackendConfig};
pub use timing::TimingConfig;

/// Master configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub timing: TimingConfig,
    pub backend: BackendConfig,
}

lazy_static! {
    /// Global configuration instance, read from the environment once
    pub static ref CONFIG: Config = Config::default();
}
