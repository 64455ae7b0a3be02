//! ADB (Android Debug Bridge) backend
//!
//! This module provides:
//! - `client`: device discovery and the `adb` primitives (screencap, uiautomator dump, dumpsys)
//! - `device`: the raw-ADB device adapter

mod client;
mod device;

pub use client::{
    extract_hierarchy, list_devices, parse_current_focus, parse_devices, parse_wm_size,
    AdbClient, ConnectionType, DeviceInfo,
};
pub use device::AdbDevice;
