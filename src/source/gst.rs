use super::FrameSource;
use crate::error::SourceError;
use crate::frame::{frame_time, FrameData};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use image::RgbImage;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const PREROLL_TIMEOUT_SECONDS: u64 = 10;

/// GStreamer-decoded video file or V4L2 camera, converted to RGB
pub struct GstFrameSource {
    name: String,
    pipeline: Pipeline,
    appsink: AppSink,
    fps: Option<f64>,
    interval: Duration,
    next_id: u64,
    closed: bool,
}

impl GstFrameSource {
    /// Decode a video file with `decodebin`
    pub fn open_file(path: &Path) -> Result<Self, SourceError> {
        let name = format!("file {}", path.display());
        let pipeline_desc = "filesrc name=src ! decodebin ! videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=sink sync=false max-buffers=4 drop=false";

        let pipeline = Self::build_pipeline(&name, pipeline_desc)?;
        let filesrc = pipeline
            .by_name("src")
            .ok_or_else(|| SourceError::unavailable(name.clone(), "Failed to get filesrc element"))?;
        filesrc.set_property("location", path.to_string_lossy().as_ref());

        Self::start(name, pipeline)
    }

    /// Capture from /dev/video<index>
    pub fn open_device(index: u32) -> Result<Self, SourceError> {
        let name = format!("device {}", index);
        let pipeline_desc = format!(
            "v4l2src device=/dev/video{} do-timestamp=true ! videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=sink sync=false max-buffers=2 drop=true",
            index
        );

        let pipeline = Self::build_pipeline(&name, &pipeline_desc)?;
        Self::start(name, pipeline)
    }

    fn build_pipeline(name: &str, desc: &str) -> Result<Pipeline, SourceError> {
        gstreamer::init().map_err(|e| {
            SourceError::unavailable(name, format!("Failed to initialize GStreamer: {}", e))
        })?;

        debug!("Creating GStreamer pipeline: {}", desc);

        gstreamer::parse::launch(desc)
            .map_err(|e| SourceError::unavailable(name, format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| SourceError::unavailable(name, "Failed to downcast to Pipeline"))
    }

    fn start(name: String, pipeline: Pipeline) -> Result<Self, SourceError> {
        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| SourceError::unavailable(name.clone(), "Failed to get appsink element"))?
            .downcast::<AppSink>()
            .map_err(|_| SourceError::unavailable(name.clone(), "Failed to downcast to AppSink"))?;

        // Preroll so the negotiated caps (and frame rate) are known before playback
        pipeline.set_state(gstreamer::State::Paused).map_err(|e| {
            SourceError::unavailable(name.clone(), format!("Failed to preroll pipeline: {}", e))
        })?;
        let (state_result, _, _) =
            pipeline.state(gstreamer::ClockTime::from_seconds(PREROLL_TIMEOUT_SECONDS));
        if let Err(e) = state_result {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(SourceError::unavailable(
                name,
                format!("Source could not be opened: {}", e),
            ));
        }

        let fps = appsink
            .static_pad("sink")
            .and_then(|pad| pad.current_caps())
            .and_then(|caps| VideoInfo::from_caps(&caps).ok())
            .and_then(|info| {
                let fps = info.fps();
                if fps.denom() > 0 && fps.numer() > 0 {
                    Some(fps.numer() as f64 / fps.denom() as f64)
                } else {
                    None
                }
            });

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            let _ = pipeline.set_state(gstreamer::State::Null);
            SourceError::unavailable(name.clone(), format!("Failed to start pipeline: {}", e))
        })?;

        info!("GStreamer source {} started (reported fps: {:?})", name, fps);

        let interval = fps
            .map(|f| Duration::from_secs_f64(1.0 / f))
            .unwrap_or(Duration::ZERO);

        Ok(Self {
            name,
            pipeline,
            appsink,
            fps,
            interval,
            next_id: 0,
            closed: false,
        })
    }

    fn sample_to_frame(&self, sample: &gstreamer::Sample, id: u64) -> Result<FrameData, SourceError> {
        let caps = sample.caps().ok_or_else(|| SourceError::Decode {
            index: id,
            details: "Sample has no caps".to_string(),
        })?;
        let info = VideoInfo::from_caps(caps).map_err(|e| SourceError::Decode {
            index: id,
            details: format!("Unreadable video caps: {}", e),
        })?;
        let buffer = sample.buffer().ok_or_else(|| SourceError::Decode {
            index: id,
            details: "No buffer in sample".to_string(),
        })?;
        let map = buffer.map_readable().map_err(|e| SourceError::Decode {
            index: id,
            details: format!("Failed to map buffer: {}", e),
        })?;

        let width = info.width();
        let height = info.height();
        let stride = info.stride()[0] as usize;
        let row_bytes = width as usize * 3;
        let data = map.as_slice();

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            if end > data.len() {
                return Err(SourceError::Decode {
                    index: id,
                    details: format!("Buffer too short for row {}", row),
                });
            }
            pixels.extend_from_slice(&data[start..end]);
        }

        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| SourceError::Decode {
            index: id,
            details: "Failed to create RGB image from buffer".to_string(),
        })?;

        let timestamp = buffer
            .pts()
            .map(|pts| Duration::from_nanos(pts.nseconds()))
            .unwrap_or_else(|| frame_time(id, self.interval));

        Ok(FrameData::new(id, timestamp, image))
    }
}

#[async_trait]
impl FrameSource for GstFrameSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn nominal_fps(&self) -> Option<f64> {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<Option<FrameData>, SourceError> {
        if self.closed {
            return Ok(None);
        }

        let appsink = self.appsink.clone();
        let pulled = tokio::task::spawn_blocking(move || {
            let sample = appsink.pull_sample();
            (sample, appsink.is_eos())
        })
        .await
        .map_err(|e| SourceError::Read {
            details: e.to_string(),
        })?;

        match pulled {
            (Ok(sample), _) => {
                let id = self.next_id;
                self.next_id += 1;
                self.sample_to_frame(&sample, id).map(Some)
            }
            (Err(_), true) => {
                debug!("GStreamer source {} reached end of stream", self.name);
                Ok(None)
            }
            (Err(e), false) => {
                error!("Failed to pull sample from {}: {}", self.name, e);
                Err(SourceError::Read {
                    details: e.to_string(),
                })
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        debug!("Stopping GStreamer source {}", self.name);
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop GStreamer pipeline cleanly: {}", e);
        }
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.pipeline.set_state(gstreamer::State::Null);
        }
    }
}
