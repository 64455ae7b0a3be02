//! Raw-ADB device adapter

use async_trait::async_trait;
use image::DynamicImage;

use super::AdbClient;
use crate::config::Config;
use crate::device::{DeviceAdapter, HierarchyResult};
use crate::error::Result;
use crate::hierarchy::android_xml_to_tree;

/// Android device driven directly through `adb`
pub struct AdbDevice {
    client: AdbClient,
}

impl AdbDevice {
    pub async fn connect(address: &str, config: &Config) -> Result<Self> {
        Ok(Self {
            client: AdbClient::connect(address, config).await?,
        })
    }

    pub fn client(&self) -> &AdbClient {
        &self.client
    }
}

#[async_trait]
impl DeviceAdapter for AdbDevice {
    async fn screenshot(&self) -> Result<DynamicImage> {
        self.client.screenshot().await
    }

    async fn dump_hierarchy(&self) -> Result<String> {
        self.client.dump_hierarchy().await
    }

    async fn dump_hierarchy_rich(&self) -> Result<HierarchyResult> {
        let current = self.client.app_current().await?;
        let page_xml = self.client.dump_hierarchy().await?;
        let page_json = android_xml_to_tree(page_xml.as_bytes())?;
        let window_size = self.client.window_size().await?;

        Ok(HierarchyResult {
            xml_hierarchy: page_xml,
            json_hierarchy: page_json,
            activity: Some(current.activity),
            package_name: Some(current.package),
            window_size,
        })
    }
}
