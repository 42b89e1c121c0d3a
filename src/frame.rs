use image::RgbImage;
use std::time::Duration;

/// A decoded RGB frame together with its position in the stream
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Sequence number within the session, starting at 0
    pub id: u64,
    /// Frame-relative timestamp (time since the start of the stream)
    pub timestamp: Duration,
    /// Pixel data, 3 channels, 8 bits per channel
    pub image: RgbImage,
}

impl FrameData {
    /// Create a new frame from a decoded image
    pub fn new(id: u64, timestamp: Duration, image: RgbImage) -> Self {
        Self {
            id,
            timestamp,
            image,
        }
    }

    /// Create a frame from raw interleaved RGB bytes
    pub fn from_raw(
        id: u64,
        timestamp: Duration,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(|image| Self::new(id, timestamp, image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of pixels in the frame
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Zero-area or short-buffered frames carry no usable evidence
    pub fn is_degenerate(&self) -> bool {
        let expected = self.area() as usize * 3;
        self.area() == 0 || self.image.as_raw().len() < expected
    }

    /// Give up the frame, keeping only its pixels
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Frame-relative timestamp for the frame at `index` given a nominal interval
pub fn frame_time(index: u64, interval: Duration) -> Duration {
    interval.saturating_mul(index.min(u32::MAX as u64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_data_creation() {
        let frame = FrameData::from_raw(
            1,
            Duration::from_millis(33),
            64,
            48,
            vec![0u8; 64 * 48 * 3],
        )
        .unwrap();

        assert_eq!(frame.id, 1);
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.area(), 64 * 48);
        assert!(!frame.is_degenerate());
    }

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        assert!(FrameData::from_raw(0, Duration::ZERO, 64, 48, vec![0u8; 100]).is_none());
    }

    #[test]
    fn test_zero_area_frame_is_degenerate() {
        let frame = FrameData::new(0, Duration::ZERO, RgbImage::new(0, 0));
        assert!(frame.is_degenerate());
        assert_eq!(frame.area(), 0);
    }

    #[test]
    fn test_frame_time() {
        let interval = Duration::from_millis(40);
        assert_eq!(frame_time(0, interval), Duration::ZERO);
        assert_eq!(frame_time(25, interval), Duration::from_secs(1));
    }
}
