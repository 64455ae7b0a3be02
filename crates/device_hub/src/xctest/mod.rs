//! XCTest module for iOS device inspection
//!
//! This module provides:
//! - `session`: the `WdaSession` and `ScreenCapture` seams
//! - `client`: WebDriverAgent HTTP session
//! - `capture`: `idevicescreenshot` fallback capture
//! - `device`: the iOS device adapter

mod capture;
mod client;
mod device;
mod session;

pub use capture::IdeviceScreenshot;
pub use client::{unwrap_value, WdaClient};
pub use device::IosDevice;
pub use session::{ScreenCapture, WdaSession};
