//! uiautomator2 automation-bridge backend
//!
//! Talks JSON-RPC to the uiautomator2 server running on the device, reached
//! either directly by URL or through an `adb forward`.

mod client;
mod device;
#[cfg(test)]
mod test_server;

pub use client::{blank_screenshot, U2DeviceInfo, UiAutomatorClient, DEFAULT_BLANK_SIZE};
pub use device::UiAutomatorDevice;
