//! Fixture recording from a live device

use chrono::{DateTime, Local};
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{DeviceError, Result};
use crate::platform::Platform;

/// Writes captures of a live Android device in the fixture layout
#[derive(Debug, Clone)]
pub struct FixtureRecorder {
    /// Base directory for recording sessions
    base_dir: PathBuf,
    /// Session directory (created at session start with timestamp)
    session_dir: PathBuf,
    /// Index of the next capture
    next_index: usize,
}

impl FixtureRecorder {
    /// Create a session subdirectory named `yyyy-mm-dd_HH-MM-SS-mmm` under `base_dir`
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let session_start: DateTime<Local> = Local::now();

        let session_name = session_start.format("%Y-%m-%d_%H-%M-%S-%3f").to_string();
        let session_dir = base_dir.join(&session_name);

        fs::create_dir_all(&session_dir).await?;

        info!("Fixture session directory: {}", session_dir.display());

        Ok(Self {
            base_dir,
            session_dir,
            next_index: 0,
        })
    }

    /// Capture the current screen as `{n}.png`, `{n}.xml` and `{n}.activity`.
    ///
    /// Returns the index written. A failed capture writes nothing; a failed
    /// write removes the files already written for that index.
    pub async fn record(&mut self, device: &Device) -> Result<usize> {
        if device.platform() == Platform::Ios {
            return Err(DeviceError::Config(
                "fixtures can only be recorded from Android devices".to_string(),
            ));
        }

        let screenshot = device.screenshot().await?;
        let rich = device.dump_hierarchy_rich().await?;

        let mut png = Vec::new();
        screenshot.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let activity = component(rich.package_name.as_deref(), rich.activity.as_deref());

        let index = self.next_index;
        let files: [(&str, &[u8]); 3] = [
            ("png", png.as_slice()),
            ("xml", rich.xml_hierarchy.as_bytes()),
            ("activity", activity.as_bytes()),
        ];
        for (written, (ext, contents)) in files.iter().enumerate() {
            if let Err(e) = fs::write(self.path(index, ext), contents).await {
                for (ext, _) in &files[..written] {
                    let path = self.path(index, ext);
                    if let Err(remove_err) = fs::remove_file(&path).await {
                        warn!("cannot remove partial {}: {}", path.display(), remove_err);
                    }
                }
                return Err(e.into());
            }
        }
        self.next_index += 1;

        debug!(
            "Recorded capture {} into {} ({} bytes png)",
            index,
            self.session_dir.display(),
            png.len()
        );

        Ok(index)
    }

    fn path(&self, index: usize, ext: &str) -> PathBuf {
        self.session_dir.join(format!("{}.{}", index, ext))
    }

    /// Get the session directory path
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Get the base directory path
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of captures recorded in this session
    pub fn recorded(&self) -> usize {
        self.next_index
    }
}

/// `package/activity` component as stored in `{n}.activity`
fn component(package: Option<&str>, activity: Option<&str>) -> String {
    let activity = activity.filter(|a| !a.is_empty());
    match (package, activity) {
        // fixture activities are already full components
        (_, Some(activity)) if activity.contains('/') => activity.to_string(),
        (Some(package), Some(activity)) => format!("{}/{}", package, activity),
        (Some(package), None) => package.to_string(),
        (None, activity) => activity.unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureDevice;
    use image::{ImageBuffer, Rgb};
    use tempfile::tempdir;

    fn write_source(dir: &Path) {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([9, 9, 9]));
        img.save(dir.join("0.png")).unwrap();
        std::fs::write(
            dir.join("0.xml"),
            r#"<hierarchy rotation="0"><node class="android.widget.TextView" text="hi" bounds="[0,0][10,10]"/></hierarchy>"#,
        )
        .unwrap();
        std::fs::write(dir.join("0.activity"), "com.example.app/.MainActivity").unwrap();
    }

    #[tokio::test]
    async fn test_recorder_creation() {
        let temp_dir = tempdir().unwrap();
        let recorder = FixtureRecorder::new(temp_dir.path()).await.unwrap();

        assert!(recorder.session_dir().exists());
        assert!(recorder.session_dir().starts_with(temp_dir.path()));
        assert_eq!(recorder.recorded(), 0);
    }

    #[test]
    fn test_component() {
        assert_eq!(
            component(Some("com.example.app"), Some(".MainActivity")),
            "com.example.app/.MainActivity"
        );
        assert_eq!(
            component(Some("com.example.app"), Some("com.example.app/.MainActivity")),
            "com.example.app/.MainActivity"
        );
        // uiautomator2 reached by URL knows the package only
        assert_eq!(component(Some("com.example.app"), Some("")), "com.example.app");
        assert_eq!(component(Some("com.example.app"), None), "com.example.app");
        assert_eq!(component(None, None), "");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_capture() {
        let source_dir = tempdir().unwrap();
        write_source(source_dir.path());
        let source = Device::Fixture(
            FixtureDevice::open(source_dir.path(), (1080, 2400))
                .await
                .unwrap(),
        );

        let out_dir = tempdir().unwrap();
        let mut recorder = FixtureRecorder::new(out_dir.path()).await.unwrap();
        // a directory in the way makes the hierarchy write fail after the png
        std::fs::create_dir(recorder.session_dir().join("0.xml")).unwrap();

        assert!(recorder.record(&source).await.is_err());
        assert!(!recorder.session_dir().join("0.png").exists());
        assert!(!recorder.session_dir().join("0.activity").exists());
        assert_eq!(recorder.recorded(), 0);
    }

    #[tokio::test]
    async fn test_recorded_session_replays() {
        let source_dir = tempdir().unwrap();
        write_source(source_dir.path());

        let source = Device::Fixture(
            FixtureDevice::open(source_dir.path(), (1080, 2400))
                .await
                .unwrap(),
        );

        let out_dir = tempdir().unwrap();
        let mut recorder = FixtureRecorder::new(out_dir.path()).await.unwrap();
        assert_eq!(recorder.record(&source).await.unwrap(), 0);
        assert_eq!(recorder.record(&source).await.unwrap(), 1);

        let replay = FixtureDevice::open(recorder.session_dir(), (1080, 2400))
            .await
            .unwrap();
        assert_eq!(replay.max_index(), 1);

        replay.set_index(1);
        let rich = crate::device::DeviceAdapter::dump_hierarchy_rich(&replay)
            .await
            .unwrap();
        assert_eq!(rich.activity.as_deref(), Some("com.example.app/.MainActivity"));
        let img = crate::device::DeviceAdapter::screenshot(&replay).await.unwrap();
        assert_eq!(img.width(), 4);
    }
}
