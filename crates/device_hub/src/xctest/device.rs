//! iOS device adapter

use async_trait::async_trait;
use image::DynamicImage;
use tracing::warn;

use super::{IdeviceScreenshot, ScreenCapture, WdaClient, WdaSession};
use crate::config::Config;
use crate::device::{DeviceAdapter, HierarchyResult};
use crate::error::{DeviceError, Result};
use crate::hierarchy::ios_source_to_tree;

/// iOS device driven through WebDriverAgent
pub struct IosDevice {
    session: Box<dyn WdaSession>,
    fallback: Box<dyn ScreenCapture>,
}

impl IosDevice {
    pub async fn connect(address: &str, config: &Config) -> Result<Self> {
        let session = WdaClient::connect(address, config).await?;
        Ok(Self::with_backends(
            Box::new(session),
            Box::new(IdeviceScreenshot::new(config)),
        ))
    }

    pub fn with_backends(session: Box<dyn WdaSession>, fallback: Box<dyn ScreenCapture>) -> Self {
        Self { session, fallback }
    }

    pub fn session(&self) -> &dyn WdaSession {
        self.session.as_ref()
    }
}

#[async_trait]
impl DeviceAdapter for IosDevice {
    async fn screenshot(&self) -> Result<DynamicImage> {
        match self.session.screenshot().await {
            Ok(img) => Ok(img),
            Err(primary) => {
                warn!("WebDriverAgent screenshot failed, using fallback: {}", primary);
                self.fallback.capture().await.map_err(|fallback| {
                    DeviceError::Capture(format!("{}; fallback: {}", primary, fallback))
                })
            }
        }
    }

    async fn dump_hierarchy(&self) -> Result<String> {
        let source = self.session.source().await?;
        let tree = ios_source_to_tree(&source, self.session.scale())?;
        Ok(serde_json::to_string_pretty(&tree)?)
    }

    async fn dump_hierarchy_rich(&self) -> Result<HierarchyResult> {
        let source = self.session.source().await?;
        let page_json = ios_source_to_tree(&source, self.session.scale())?;
        let window_size = self.session.window_size().await?;

        Ok(HierarchyResult {
            xml_hierarchy: serde_json::to_string_pretty(&source)?,
            json_hierarchy: page_json,
            activity: None,
            package_name: None,
            window_size,
        })
    }

    async fn close(&self) -> Result<()> {
        self.session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeSession {
        screenshot_fails: bool,
    }

    #[async_trait]
    impl WdaSession for FakeSession {
        fn base_url(&self) -> &str {
            "http://fake:8100"
        }

        fn scale(&self) -> f64 {
            2.0
        }

        async fn screenshot(&self) -> Result<DynamicImage> {
            if self.screenshot_fails {
                return Err(DeviceError::Connection("injected failure".to_string()));
            }
            Ok(DynamicImage::ImageRgb8(ImageBuffer::new(1, 1)))
        }

        async fn source(&self) -> Result<Value> {
            Ok(json!({
                "type": "XCUIElementTypeApplication",
                "rect": {"x": 0, "y": 0, "width": 390, "height": 844},
                "children": [{"type": "XCUIElementTypeButton", "rect": {"x": 1, "y": 2, "width": 3, "height": 4}}]
            }))
        }

        async fn window_size(&self) -> Result<(u32, u32)> {
            Ok((390, 844))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct CountingCapture {
        calls: Arc<AtomicUsize>,
        fails: bool,
    }

    #[async_trait]
    impl ScreenCapture for CountingCapture {
        async fn capture(&self) -> Result<DynamicImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                return Err(DeviceError::Capture("no device".to_string()));
            }
            Ok(DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
                3,
                2,
                Rgb([255, 0, 0]),
            )))
        }
    }

    fn device(screenshot_fails: bool, capture: &CountingCapture) -> IosDevice {
        IosDevice::with_backends(
            Box::new(FakeSession { screenshot_fails }),
            Box::new(capture.clone()),
        )
    }

    #[tokio::test]
    async fn test_primary_capture_skips_fallback() {
        let capture = CountingCapture::default();
        let img = device(false, &capture).screenshot().await.unwrap();

        assert_eq!(img.width(), 1);
        assert_eq!(capture.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_capture_uses_fallback_once() {
        let capture = CountingCapture::default();
        let img = device(true, &capture).screenshot().await.unwrap();

        assert_eq!(capture.calls.load(Ordering::SeqCst), 1);
        assert_eq!((img.width(), img.height()), (3, 2));
        assert_eq!(img.to_rgb8().get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[tokio::test]
    async fn test_both_captures_failing() {
        let capture = CountingCapture {
            fails: true,
            ..Default::default()
        };
        let err = device(true, &capture).screenshot().await.unwrap_err();

        assert_eq!(capture.calls.load(Ordering::SeqCst), 1);
        match err {
            DeviceError::Capture(msg) => {
                assert!(msg.contains("injected failure"));
                assert!(msg.contains("no device"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_hierarchy_is_scaled() {
        let capture = CountingCapture::default();
        let dump = device(false, &capture).dump_hierarchy().await.unwrap();
        let tree: Value = serde_json::from_str(&dump).unwrap();

        assert_eq!(tree["_type"], "XCUIElementTypeApplication");
        assert_eq!(tree["rect"]["width"], 780.0);
        assert_eq!(tree["children"][0]["rect"]["height"], 8.0);
    }

    #[tokio::test]
    async fn test_rich_hierarchy_has_no_activity() {
        let capture = CountingCapture::default();
        let rich = device(false, &capture).dump_hierarchy_rich().await.unwrap();

        assert!(rich.activity.is_none());
        assert!(rich.package_name.is_none());
        assert_eq!(rich.window_size, (390, 844));
        assert_eq!(rich.json_hierarchy.children.len(), 1);
        assert!(rich.xml_hierarchy.contains("XCUIElementTypeButton"));
    }
}
