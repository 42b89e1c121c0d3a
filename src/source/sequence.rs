use super::{is_image_file, FrameSource};
use crate::error::SourceError;
use crate::frame::{frame_time, FrameData};
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Directory of still images played back as a video stream.
///
/// Files are read in name order. The first decoded image fixes the session
/// dimensions; later images of another size are scaled to match.
pub struct ImageSequenceSource {
    name: String,
    files: Vec<PathBuf>,
    position: usize,
    fps: Option<f64>,
    interval: Duration,
    next_id: u64,
    dimensions: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    /// Collect the image files of a directory
    pub async fn from_dir<P: AsRef<Path>>(dir: P, fps: Option<f64>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let source_name = format!("image sequence {}", dir.display());

        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| SourceError::unavailable(source_name.clone(), e.to_string()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::unavailable(source_name.clone(), e.to_string()))?
        {
            let path = entry.path();
            if path.is_file() && is_image_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        let mut source = Self::from_files(files, fps)?;
        source.name = source_name;
        Ok(source)
    }

    /// Play an explicit list of image files in the given order
    pub fn from_files(files: Vec<PathBuf>, fps: Option<f64>) -> Result<Self, SourceError> {
        let name = match files.first() {
            Some(first) if files.len() == 1 => format!("image {}", first.display()),
            _ => format!("image sequence ({} files)", files.len()),
        };

        if files.is_empty() {
            return Err(SourceError::unavailable(name, "no image files found"));
        }

        let interval = match fps {
            Some(f) if f.is_finite() && f > 0.0 => Duration::from_secs_f64(1.0 / f),
            _ => Duration::ZERO,
        };

        info!("Image sequence with {} frames", files.len());

        Ok(Self {
            name,
            files,
            position: 0,
            fps,
            interval,
            next_id: 0,
            dimensions: None,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn conform(&mut self, image: RgbImage) -> RgbImage {
        match self.dimensions {
            None => {
                self.dimensions = Some(image.dimensions());
                image
            }
            Some((w, h)) if image.dimensions() == (w, h) => image,
            Some((w, h)) => {
                debug!(
                    "Scaling {}x{} image to session size {}x{}",
                    image.width(),
                    image.height(),
                    w,
                    h
                );
                imageops::resize(&image, w, h, FilterType::Triangle)
            }
        }
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn nominal_fps(&self) -> Option<f64> {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<Option<FrameData>, SourceError> {
        while self.position < self.files.len() {
            let path = self.files[self.position].clone();
            self.position += 1;

            let decoded = tokio::task::spawn_blocking(move || image::open(&path).map(|img| img.to_rgb8()))
                .await
                .map_err(|e| SourceError::Read {
                    details: e.to_string(),
                })?;

            match decoded {
                Ok(image) => {
                    let image = self.conform(image);
                    let id = self.next_id;
                    self.next_id += 1;
                    return Ok(Some(FrameData::new(id, frame_time(id, self.interval), image)));
                }
                Err(e) => {
                    warn!(
                        "Skipping undecodable image {}: {}",
                        self.files[self.position - 1].display(),
                        e
                    );
                }
            }
        }

        Ok(None)
    }

    async fn close(&mut self) {
        self.position = self.files.len();
    }
}
