//! Offline fixture playback
//!
//! A fixture directory holds numbered captures of a real device:
//! `{n}.png` (screenshot), `{n}.xml` (uiautomator dump) and `{n}.activity`
//! (`package/activity` component). The device replays capture `index`.

mod recorder;

use async_trait::async_trait;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tracing::{debug, info};

use crate::device::{DeviceAdapter, HierarchyResult};
use crate::error::{DeviceError, Result};
use crate::hierarchy::android_xml_to_tree;

pub use recorder::FixtureRecorder;

/// Package part of a `package/activity` component
pub fn split_component(activity: &str) -> &str {
    activity.split('/').next().unwrap_or(activity)
}

/// Device that replays recorded fixture files
#[derive(Debug)]
pub struct FixtureDevice {
    data_dir: PathBuf,
    index: AtomicUsize,
    max_index: usize,
    resolution: (u32, u32),
}

impl FixtureDevice {
    /// Scan `data_dir` for numbered `.xml` captures.
    ///
    /// Only the highest index is recorded; gaps in the sequence are not checked.
    pub async fn open(data_dir: impl AsRef<Path>, resolution: (u32, u32)) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let config_err = |e: std::io::Error| {
            DeviceError::Config(format!(
                "cannot read fixture directory {}: {}",
                data_dir.display(),
                e
            ))
        };

        let mut entries = fs::read_dir(&data_dir).await.map_err(config_err)?;
        let mut max_index: Option<usize> = None;

        while let Some(entry) = entries.next_entry().await.map_err(config_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("xml") {
                continue;
            }
            if let Some(n) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<usize>().ok())
            {
                max_index = Some(max_index.map_or(n, |m| m.max(n)));
            }
        }

        let max_index = max_index.ok_or_else(|| {
            DeviceError::Config(format!(
                "no numbered .xml fixtures in {}",
                data_dir.display()
            ))
        })?;

        info!(
            "fixture device {} (max index {})",
            data_dir.display(),
            max_index
        );
        Ok(Self {
            data_dir,
            index: AtomicUsize::new(0),
            max_index,
            resolution,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Select the capture to replay. Not range-checked; missing files fail on read.
    pub fn set_index(&self, index: usize) {
        debug!("fixture {} -> index {}", self.data_dir.display(), index);
        self.index.store(index, Ordering::SeqCst);
    }

    pub fn max_index(&self) -> usize {
        self.max_index
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn fixture_path(&self, index: usize, ext: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", index, ext))
    }
}

#[async_trait]
impl DeviceAdapter for FixtureDevice {
    async fn screenshot(&self) -> Result<DynamicImage> {
        let bytes = fs::read(self.fixture_path(self.index(), "png")).await?;
        Ok(image::load_from_memory(&bytes)?)
    }

    async fn dump_hierarchy(&self) -> Result<String> {
        Ok(fs::read_to_string(self.fixture_path(self.index(), "xml")).await?)
    }

    async fn dump_hierarchy_rich(&self) -> Result<HierarchyResult> {
        // read every file from the same capture even if the cursor moves meanwhile
        let index = self.index();

        let page_xml = fs::read_to_string(self.fixture_path(index, "xml")).await?;
        let page_json = android_xml_to_tree(page_xml.as_bytes())?;

        let current_activity = fs::read_to_string(self.fixture_path(index, "activity")).await?;
        let current_activity = current_activity.trim().to_string();
        let current_package = split_component(&current_activity).to_string();

        Ok(HierarchyResult {
            xml_hierarchy: page_xml,
            json_hierarchy: page_json,
            activity: Some(current_activity),
            package_name: Some(current_package),
            window_size: self.resolution,
        })
    }
}
