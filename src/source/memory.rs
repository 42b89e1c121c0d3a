use super::FrameSource;
use crate::error::SourceError;
use crate::frame::{frame_time, FrameData};
use async_trait::async_trait;
use image::RgbImage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Frames held in memory; used for synthetic streams and tests
pub struct MemoryFrameSource {
    frames: VecDeque<RgbImage>,
    fps: Option<f64>,
    interval: Duration,
    next_id: u64,
    released: Arc<AtomicBool>,
}

impl MemoryFrameSource {
    pub fn new<I: IntoIterator<Item = RgbImage>>(frames: I, fps: Option<f64>) -> Self {
        let interval = match fps {
            Some(f) if f.is_finite() && f > 0.0 => Duration::from_secs_f64(1.0 / f),
            _ => Duration::ZERO,
        };

        Self {
            frames: frames.into_iter().collect(),
            fps,
            interval,
            next_id: 0,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag set once the source has been closed
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl FrameSource for MemoryFrameSource {
    fn name(&self) -> String {
        format!("memory ({} frames)", self.frames.len() as u64 + self.next_id)
    }

    fn nominal_fps(&self) -> Option<f64> {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<Option<FrameData>, SourceError> {
        if self.released.load(Ordering::Acquire) {
            return Ok(None);
        }

        Ok(self.frames.pop_front().map(|image| {
            let id = self.next_id;
            self.next_id += 1;
            FrameData::new(id, frame_time(id, self.interval), image)
        }))
    }

    async fn close(&mut self) {
        self.frames.clear();
        self.released.store(true, Ordering::Release);
    }
}
