use crate::config::DetectorConfig;
use crate::detector::hsv::rgb_to_hsv;
use crate::frame::FrameData;

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::{
    distance_transform::Norm,
    morphology::{close, open},
    region_labelling::{connected_components, Connectivity},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const MASK_ON: u8 = 255;

/// Bounding rectangle of one connected evidence blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Number of mask pixels in the blob
    pub area: u32,
}

/// Per-frame detection verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub fire_detected: bool,
    pub fire_ratio: f64,
    /// Kept regions, in raster discovery order
    pub regions: Vec<Region>,
}

impl DetectionResult {
    /// Zero-evidence result
    pub fn empty() -> Self {
        Self {
            fire_detected: false,
            fire_ratio: 0.0,
            regions: Vec::new(),
        }
    }
}

/// Color-heuristic fire detector.
///
/// Holds only its configuration, so one instance can be shared across threads
/// and `detect` called on independent frames concurrently.
#[derive(Debug, Clone)]
pub struct FireDetector {
    config: DetectorConfig,
}

impl FireDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn detect(&self, frame: &FrameData) -> DetectionResult {
        detect(frame, &self.config)
    }
}

/// Run fire detection on a single frame
pub fn detect(frame: &FrameData, config: &DetectorConfig) -> DetectionResult {
    if frame.is_degenerate() {
        debug!(
            "Frame {} is degenerate ({}x{}), reporting no evidence",
            frame.id,
            frame.width(),
            frame.height()
        );
        return DetectionResult::empty();
    }

    let mask = evidence_mask(&frame.image, config);
    let total = frame.area();
    let set_pixels = mask.pixels().filter(|p| p[0] > 0).count() as u64;
    let fire_ratio = if total > 0 {
        set_pixels as f64 / total as f64
    } else {
        0.0
    };
    let fire_detected = fire_ratio > config.detection_threshold;

    let regions = extract_regions(&mask, config.min_region_area);

    trace!(
        "Frame {}: fire ratio {:.4} ({} px), {} regions",
        frame.id,
        fire_ratio,
        set_pixels,
        regions.len()
    );

    DetectionResult {
        fire_detected,
        fire_ratio,
        regions,
    }
}

/// Binary mask of fire-colored pixels after opening and closing
pub fn evidence_mask(image: &RgbImage, config: &DetectorConfig) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut mask = GrayImage::new(width, height);

    for (x, y, rgb) in image.enumerate_pixels() {
        if is_fire_colored(rgb[0], rgb[1], rgb[2], config) {
            mask.put_pixel(x, y, Luma([MASK_ON]));
        }
    }

    let radius = (config.kernel_size / 2) as u8;
    if radius == 0 {
        return mask;
    }

    let opened = open(&mask, Norm::LInf, radius);
    close(&opened, Norm::LInf, radius)
}

fn is_fire_colored(r: u8, g: u8, b: u8, config: &DetectorConfig) -> bool {
    let hsv = rgb_to_hsv(r, g, b);
    if hsv.saturation < config.min_saturation || hsv.value < config.min_value {
        return false;
    }

    let in_band = |(lo, hi): (u8, u8)| hsv.hue >= lo && hsv.hue <= hi;
    in_band(config.low_hue_band) || in_band(config.high_hue_band)
}

#[derive(Debug, Clone, Copy)]
struct RegionBounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

/// Bounding boxes of 8-connected blobs larger than `min_area`, in label order
fn extract_regions(mask: &GrayImage, min_area: u32) -> Vec<Region> {
    let components: ImageBuffer<Luma<u32>, Vec<u32>> =
        connected_components(mask, Connectivity::Eight, Luma([0u8]));

    // Labels are assigned in raster order of first appearance
    let mut bounds: Vec<Option<RegionBounds>> = Vec::new();
    for (x, y, label) in components.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if bounds.len() < label {
            bounds.resize(label, None);
        }
        let slot = &mut bounds[label - 1];
        match slot {
            Some(b) => {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
                b.area += 1;
            }
            None => {
                *slot = Some(RegionBounds {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    area: 1,
                });
            }
        }
    }

    bounds
        .into_iter()
        .flatten()
        .filter(|b| b.area > min_area)
        .map(|b| Region {
            x: b.min_x,
            y: b.min_y,
            width: b.max_x - b.min_x + 1,
            height: b.max_y - b.min_y + 1,
            area: b.area,
        })
        .collect()
}
