//! Uniform device contract and the closed set of device adapters

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::adb::{AdbClient, AdbDevice};
use crate::config::Config;
use crate::error::Result;
use crate::fixture::FixtureDevice;
use crate::hierarchy::UiNode;
use crate::platform::Platform;
use crate::uiautomator::{UiAutomatorClient, UiAutomatorDevice};
use crate::xctest::{IosDevice, WdaSession};

/// Application currently in the foreground (Android only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundApp {
    pub package: String,
    pub activity: String,
}

/// Everything an inspector needs to render one screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyResult {
    /// Native markup: uiautomator XML on Android, WDA source JSON on iOS
    pub xml_hierarchy: String,
    pub json_hierarchy: UiNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    pub window_size: (u32, u32),
}

/// Read-only introspection contract every backend satisfies
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    /// Current frame buffer
    async fn screenshot(&self) -> Result<DynamicImage>;

    /// Native UI tree of the current screen
    async fn dump_hierarchy(&self) -> Result<String>;

    /// Native markup, normalized tree, foreground app and window size.
    ///
    /// Fails as a whole if any part fails.
    async fn dump_hierarchy_rich(&self) -> Result<HierarchyResult>;

    /// Release backend resources. Calling it twice is harmless.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A connected device of any supported platform
pub enum Device {
    Fixture(FixtureDevice),
    Adb(AdbDevice),
    UiAutomator(UiAutomatorDevice),
    Ios(IosDevice),
}

/// Raw backend access, bypassing the uniform contract.
///
/// Nothing beyond what the backend itself offers is guaranteed here.
pub enum Backend<'a> {
    Fixture(&'a Path),
    Adb(&'a AdbClient),
    UiAutomator(&'a UiAutomatorClient),
    Ios(&'a dyn WdaSession),
}

impl Device {
    /// Establish the backend connection for `platform`
    pub async fn open(platform: Platform, address: &str, config: &Config) -> Result<Self> {
        let device = match platform {
            Platform::Fixture => Device::Fixture(
                FixtureDevice::open(address, config.backend.fixture_resolution).await?,
            ),
            Platform::Adb => Device::Adb(AdbDevice::connect(address, config).await?),
            Platform::UiAutomator => {
                Device::UiAutomator(UiAutomatorDevice::connect(address, config).await?)
            }
            Platform::Ios => Device::Ios(IosDevice::connect(address, config).await?),
        };
        Ok(device)
    }

    pub fn platform(&self) -> Platform {
        match self {
            Device::Fixture(_) => Platform::Fixture,
            Device::Adb(_) => Platform::Adb,
            Device::UiAutomator(_) => Platform::UiAutomator,
            Device::Ios(_) => Platform::Ios,
        }
    }

    pub fn backend(&self) -> Backend<'_> {
        match self {
            Device::Fixture(d) => Backend::Fixture(d.data_dir()),
            Device::Adb(d) => Backend::Adb(d.client()),
            Device::UiAutomator(d) => Backend::UiAutomator(d.client()),
            Device::Ios(d) => Backend::Ios(d.session()),
        }
    }

    /// The fixture adapter, for cursor control
    pub fn as_fixture(&self) -> Option<&FixtureDevice> {
        match self {
            Device::Fixture(d) => Some(d),
            _ => None,
        }
    }

    fn adapter(&self) -> &dyn DeviceAdapter {
        match self {
            Device::Fixture(d) => d,
            Device::Adb(d) => d,
            Device::UiAutomator(d) => d,
            Device::Ios(d) => d,
        }
    }

    pub async fn screenshot(&self) -> Result<DynamicImage> {
        self.adapter().screenshot().await
    }

    pub async fn dump_hierarchy(&self) -> Result<String> {
        self.adapter().dump_hierarchy().await
    }

    pub async fn dump_hierarchy_rich(&self) -> Result<HierarchyResult> {
        self.adapter().dump_hierarchy_rich().await
    }

    pub async fn close(&self) -> Result<()> {
        self.adapter().close().await
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match self {
            Device::Fixture(d) => d.data_dir().display().to_string(),
            Device::Adb(d) => d.client().serial().to_string(),
            Device::UiAutomator(d) => d.client().base_url().to_string(),
            Device::Ios(d) => d.session().base_url().to_string(),
        };
        f.debug_struct("Device")
            .field("platform", &self.platform())
            .field("target", &target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::UiNode;

    #[test]
    fn test_hierarchy_result_schema() {
        let result = HierarchyResult {
            xml_hierarchy: "<hierarchy/>".to_string(),
            json_hierarchy: UiNode::new("hierarchy"),
            activity: Some("com.example.app/.MainActivity".to_string()),
            package_name: Some("com.example.app".to_string()),
            window_size: (1080, 2400),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["xmlHierarchy"], "<hierarchy/>");
        assert_eq!(json["jsonHierarchy"]["_type"], "hierarchy");
        assert_eq!(json["packageName"], "com.example.app");
        assert_eq!(json["windowSize"], serde_json::json!([1080, 2400]));
    }

    #[test]
    fn test_hierarchy_result_omits_android_fields_on_ios() {
        let result = HierarchyResult {
            xml_hierarchy: "{}".to_string(),
            json_hierarchy: UiNode::new("XCUIElementTypeApplication"),
            activity: None,
            package_name: None,
            window_size: (390, 844),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("activity").is_none());
        assert!(json.get("packageName").is_none());
    }
}
