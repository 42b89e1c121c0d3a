mod memory;
mod sequence;
#[cfg(all(feature = "video", target_os = "linux"))]
mod gst;

pub use memory::MemoryFrameSource;
pub use sequence::ImageSequenceSource;
#[cfg(all(feature = "video", target_os = "linux"))]
pub use gst::GstFrameSource;

use crate::error::SourceError;
use crate::frame::FrameData;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a session's frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Video file, still image, or directory of images
    FilePath(PathBuf),
    /// Live capture device (e.g. 0 for /dev/video0)
    DeviceIndex(u32),
}

impl SourceSpec {
    /// Label used for automatic alarms when none is configured
    pub fn default_location(&self) -> String {
        match self {
            SourceSpec::FilePath(path) => format!("video file: {}", path.display()),
            SourceSpec::DeviceIndex(_) => "camera feed".to_string(),
        }
    }
}

impl std::fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceSpec::FilePath(path) => write!(f, "file {}", path.display()),
            SourceSpec::DeviceIndex(index) => write!(f, "device {}", index),
        }
    }
}

/// A decodable sequence of frames with a nominal rate
#[async_trait]
pub trait FrameSource: Send {
    /// Human-readable description of the origin
    fn name(&self) -> String;

    /// Declared frame rate, if the origin reports one
    fn nominal_fps(&self) -> Option<f64>;

    /// Pull the next frame; `Ok(None)` signals end of stream
    async fn next_frame(&mut self) -> Result<Option<FrameData>, SourceError>;

    /// Release the underlying handle; further pulls return end of stream
    async fn close(&mut self);
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

pub(crate) fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Open the frame source named by `spec`.
///
/// Paths are checked for existence before anything is opened. Directories and
/// still images open as image sequences paced at `sequence_fps`; video files
/// and devices need the `video` feature.
pub async fn open_source(
    spec: &SourceSpec,
    sequence_fps: f64,
) -> Result<Box<dyn FrameSource>, SourceError> {
    info!("Opening frame source: {}", spec);

    match spec {
        SourceSpec::FilePath(path) => {
            if !path.exists() {
                return Err(SourceError::unavailable(
                    spec.to_string(),
                    "path does not exist",
                ));
            }

            if path.is_dir() {
                let source = ImageSequenceSource::from_dir(path, Some(sequence_fps)).await?;
                return Ok(Box::new(source));
            }

            if is_image_file(path) {
                let source =
                    ImageSequenceSource::from_files(vec![path.clone()], Some(sequence_fps))?;
                return Ok(Box::new(source));
            }

            open_video_file(path).await
        }
        SourceSpec::DeviceIndex(index) => open_device(*index).await,
    }
}

#[cfg(all(feature = "video", target_os = "linux"))]
async fn open_video_file(path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    let path = path.to_path_buf();
    let source = tokio::task::spawn_blocking(move || GstFrameSource::open_file(&path))
        .await
        .map_err(|e| SourceError::unavailable("video file", e.to_string()))??;
    Ok(Box::new(source))
}

#[cfg(not(all(feature = "video", target_os = "linux")))]
async fn open_video_file(path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    Err(SourceError::unavailable(
        format!("file {}", path.display()),
        "video decoding requires the `video` feature on Linux",
    ))
}

#[cfg(all(feature = "video", target_os = "linux"))]
async fn open_device(index: u32) -> Result<Box<dyn FrameSource>, SourceError> {
    let source = tokio::task::spawn_blocking(move || GstFrameSource::open_device(index))
        .await
        .map_err(|e| SourceError::unavailable(format!("device {}", index), e.to_string()))??;
    Ok(Box::new(source))
}

#[cfg(not(all(feature = "video", target_os = "linux")))]
async fn open_device(index: u32) -> Result<Box<dyn FrameSource>, SourceError> {
    Err(SourceError::unavailable(
        format!("device {}", index),
        "camera capture requires the `video` feature on Linux",
    ))
}
