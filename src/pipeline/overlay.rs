use crate::config::OverlayConfig;
use crate::detector::DetectionResult;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use std::fs;
use tracing::{debug, warn};

const ALARM_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const FPS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const REGION_THICKNESS: u32 = 2;
const BORDER_THICKNESS: u32 = 3;
const ALARM_TEXT: &str = "FIRE DETECTED!";
const ALARM_TEXT_ORIGIN: (i32, i32) = (50, 50);
const FPS_TEXT_ORIGIN: (i32, i32) = (10, 30);

/// Draws alarm markers and the frame rate onto processed frames
pub struct Annotator {
    font: Option<Font<'static>>,
    font_size: f32,
    border_inset: u32,
}

impl Annotator {
    /// Load the overlay font; text markers are skipped if it can't be read
    pub fn new(config: &OverlayConfig) -> Self {
        let font = match fs::read(&config.font_path) {
            Ok(data) => {
                let font = Font::try_from_vec(data);
                if font.is_none() {
                    warn!(
                        "Failed to parse font file '{}', text overlay disabled",
                        config.font_path
                    );
                }
                font
            }
            Err(e) => {
                warn!(
                    "Failed to read font file '{}': {}, text overlay disabled",
                    config.font_path, e
                );
                None
            }
        };

        Self {
            font,
            font_size: config.font_size,
            border_inset: config.border_inset,
        }
    }

    /// Shapes only, no text
    pub fn without_font(config: &OverlayConfig) -> Self {
        Self {
            font: None,
            font_size: config.font_size,
            border_inset: config.border_inset,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn annotate(
        &self,
        image: &mut RgbImage,
        detection: &DetectionResult,
        alarm_active: bool,
        fps: f64,
    ) {
        if alarm_active {
            for region in &detection.regions {
                draw_thick_rect(
                    image,
                    region.x,
                    region.y,
                    region.width,
                    region.height,
                    REGION_THICKNESS,
                );
            }

            let (width, height) = image.dimensions();
            let inset = self.border_inset;
            let margins = inset.saturating_mul(2);
            if width > margins && height > margins {
                draw_thick_rect(
                    image,
                    inset,
                    inset,
                    width - margins,
                    height - margins,
                    BORDER_THICKNESS,
                );
            }

            self.draw_label(image, ALARM_TEXT, ALARM_TEXT_ORIGIN, ALARM_COLOR);
        }

        self.draw_label(image, &format!("FPS: {:.1}", fps), FPS_TEXT_ORIGIN, FPS_COLOR);
    }

    /// Text whose baseline sits at `origin`
    fn draw_label(&self, image: &mut RgbImage, text: &str, origin: (i32, i32), color: Rgb<u8>) {
        let Some(font) = &self.font else {
            return;
        };

        let top = origin.1 - self.font_size as i32;
        draw_text_mut(
            image,
            color,
            origin.0,
            top.max(0),
            Scale::uniform(self.font_size),
            font,
            text,
        );
        debug!("Drew overlay text '{}'", text);
    }
}

/// Outline growing inward from the given bounds
fn draw_thick_rect(image: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, thickness: u32) {
    for step in 0..thickness {
        let inner_w = width.saturating_sub(step * 2);
        let inner_h = height.saturating_sub(step * 2);
        if inner_w == 0 || inner_h == 0 {
            break;
        }

        let rect = Rect::at((x + step) as i32, (y + step) as i32).of_size(inner_w, inner_h);
        draw_hollow_rect_mut(image, rect, ALARM_COLOR);
    }
}
