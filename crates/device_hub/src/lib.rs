//! device_hub: uniform read-only access to Android and iOS devices
//!
//! This library connects to devices through one of four backends and
//! exposes the same introspection contract for all of them:
//! - Fixture playback of recorded captures (`AndroidMock`)
//! - Raw ADB (`AndroidADB`)
//! - The uiautomator2 bridge (`Android`)
//! - WebDriverAgent (`iOS`)
//!
//! # Example
//!
//! ```no_run
//! use device_hub::Registry;
//!
//! #[tokio::main]
//! async fn main() -> device_hub::Result<()> {
//!     let registry = Registry::new();
//!     let id = registry.connect("AndroidADB", "emulator-5554").await?;
//!
//!     let device = registry.get(id.as_str()).await?;
//!     let rich = device.dump_hierarchy_rich().await?;
//!     println!("{:?} {:?}", rich.package_name, rich.window_size);
//!
//!     registry.close_all().await;
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;
pub mod platform;

// Configuration module
pub mod config;

// Device backends
pub mod adb;
pub mod fixture;
pub mod uiautomator;
pub mod xctest;

// Core functionality
pub mod device;
pub mod hierarchy;
pub mod registry;

// Re-export commonly used types and functions
pub use error::{DeviceError, Result};

pub use config::{BackendConfig, Config, TimingConfig, CONFIG};

pub use platform::{ConnectionId, Platform, ID_SEPARATOR, PLATFORM_TAGS};

pub use device::{Backend, Device, DeviceAdapter, ForegroundApp, HierarchyResult};

pub use hierarchy::{android_xml_to_tree, ios_source_to_tree, pretty_xml, Rect, UiNode};

pub use adb::{list_devices, AdbClient, AdbDevice, ConnectionType, DeviceInfo};
pub use fixture::{FixtureDevice, FixtureRecorder};
pub use uiautomator::{UiAutomatorClient, UiAutomatorDevice};
pub use xctest::{IosDevice, WdaClient, WdaSession};

pub use registry::Registry;
