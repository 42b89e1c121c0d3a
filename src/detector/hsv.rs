/// Hue/saturation/value triple on the 8-bit scale: hue in 0..=180 (degrees / 2),
/// saturation and value in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

/// Convert one RGB sample to 8-bit HSV
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    let saturation = if max == 0 {
        0
    } else {
        (delta * 255.0 / max as f32).round() as u8
    };

    let hue = if delta == 0.0 {
        0.0
    } else {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let degrees = if max as f32 == r {
            60.0 * (g - b) / delta
        } else if max as f32 == g {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if degrees < 0.0 {
            degrees + 360.0
        } else {
            degrees
        }
    };

    Hsv {
        hue: (hue / 2.0).round().min(180.0) as u8,
        saturation,
        value: max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_colors() {
        assert_eq!(rgb_to_hsv(255, 0, 0), Hsv { hue: 0, saturation: 255, value: 255 });
        assert_eq!(rgb_to_hsv(0, 255, 0), Hsv { hue: 60, saturation: 255, value: 255 });
        assert_eq!(rgb_to_hsv(0, 0, 255), Hsv { hue: 120, saturation: 255, value: 255 });
    }

    #[test]
    fn test_grays_have_no_saturation() {
        let gray = rgb_to_hsv(128, 128, 128);
        assert_eq!(gray.hue, 0);
        assert_eq!(gray.saturation, 0);
        assert_eq!(gray.value, 128);

        assert_eq!(rgb_to_hsv(0, 0, 0), Hsv { hue: 0, saturation: 0, value: 0 });
    }

    #[test]
    fn test_orange_and_magenta_red() {
        // Flame orange sits in the low band
        let orange = rgb_to_hsv(255, 60, 0);
        assert_eq!(orange.hue, 7);

        // Crimson wraps to the top of the hue wheel
        let crimson = rgb_to_hsv(220, 20, 60);
        assert!(crimson.hue >= 170, "hue was {}", crimson.hue);
    }
}
