mod fire;
pub mod hsv;

pub use fire::{detect, evidence_mask, DetectionResult, FireDetector, Region};
