//! uiautomator2 device adapter

use async_trait::async_trait;
use image::DynamicImage;

use super::UiAutomatorClient;
use crate::config::Config;
use crate::device::{DeviceAdapter, HierarchyResult};
use crate::error::Result;
use crate::hierarchy::{android_xml_to_tree, pretty_xml};

/// Android device driven through the uiautomator2 server
pub struct UiAutomatorDevice {
    client: UiAutomatorClient,
}

impl UiAutomatorDevice {
    pub async fn connect(address: &str, config: &Config) -> Result<Self> {
        let client = UiAutomatorClient::connect(address, config).await?;
        // lock and login screens refuse capture
        client.set_fallback_to_blank_screenshot(true);
        Ok(Self { client })
    }

    pub fn client(&self) -> &UiAutomatorClient {
        &self.client
    }
}

#[async_trait]
impl DeviceAdapter for UiAutomatorDevice {
    async fn screenshot(&self) -> Result<DynamicImage> {
        self.client.screenshot().await
    }

    async fn dump_hierarchy(&self) -> Result<String> {
        let raw = self.client.dump_hierarchy().await?;
        pretty_xml(&raw)
    }

    async fn dump_hierarchy_rich(&self) -> Result<HierarchyResult> {
        let current = self.client.app_current().await?;
        let page_xml = self.dump_hierarchy().await?;
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

    async fn close(&self) -> Result<()> {
        self.client.close().await
    }
}
