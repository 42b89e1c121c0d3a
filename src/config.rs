use crate::alarm::AlarmLabels;
use crate::pipeline::PipelineConfig;
use crate::source::SourceSpec;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FirewatchConfig {
    pub detector: DetectorConfig,
    pub pacing: PacingConfig,
    pub debounce: DebounceConfig,
    pub alarm: AlarmConfig,
    pub overlay: OverlayConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Lower warm-red hue band, inclusive, on the 0-180 hue scale
    #[serde(default = "default_low_hue_band")]
    pub low_hue_band: (u8, u8),

    /// Upper warm-red hue band, inclusive, on the 0-180 hue scale
    #[serde(default = "default_high_hue_band")]
    pub high_hue_band: (u8, u8),

    /// Minimum saturation (0-255) for a pixel to count as fire-colored
    #[serde(default = "default_min_saturation")]
    pub min_saturation: u8,

    /// Minimum value/brightness (0-255) for a pixel to count as fire-colored
    #[serde(default = "default_min_value")]
    pub min_value: u8,

    /// Side length of the square morphology kernel (odd)
    #[serde(default = "default_kernel_size")]
    pub kernel_size: u32,

    /// Fraction of the frame that must be fire-colored to raise a verdict
    #[serde(default = "default_detection_threshold")]
    pub detection_threshold: f64,

    /// Minimum pixel area for a region to be reported
    #[serde(default = "default_min_region_area")]
    pub min_region_area: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PacingConfig {
    /// Frame rate assumed when the source does not report one
    #[serde(default = "default_fps")]
    pub default_fps: f64,

    /// Floor for the inter-frame wait, in milliseconds
    #[serde(default = "default_min_wait_ms")]
    pub min_wait_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Consecutive fire verdicts needed to raise the alarm
    #[serde(default = "default_raise_after")]
    pub raise_after: u32,

    /// Consecutive clear verdicts needed to clear the alarm
    #[serde(default = "default_clear_after")]
    pub clear_after: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlarmConfig {
    /// Location label for automatic alarms; derived from the source when unset
    pub location: Option<String>,

    /// Description attached to automatic alarms
    #[serde(default = "default_alarm_description")]
    pub description: String,

    /// JSON-lines alarm log file
    pub log_path: Option<String>,

    /// Timezone used when formatting alarm log timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Per-sink dispatch timeout in milliseconds
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Path to TrueType font file for text markers
    #[serde(default = "default_font_path")]
    pub font_path: String,

    /// Font size for text markers
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Inset of the full-frame alarm border, in pixels
    #[serde(default = "default_border_inset")]
    pub border_inset: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Directory for annotated snapshots of raised alarms
    pub snapshot_dir: Option<String>,

    /// Presentation channel capacity (frames in flight)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Nominal rate for image-sequence sources
    #[serde(default = "default_sequence_fps")]
    pub sequence_fps: f64,
}

impl FirewatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("firewatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let (low_lo, low_hi) = default_low_hue_band();
        let (high_lo, high_hi) = default_high_hue_band();

        let settings = Config::builder()
            .set_default(
                "detector.low_hue_band",
                vec![low_lo as i64, low_hi as i64],
            )?
            .set_default(
                "detector.high_hue_band",
                vec![high_lo as i64, high_hi as i64],
            )?
            .set_default("detector.min_saturation", default_min_saturation() as i64)?
            .set_default("detector.min_value", default_min_value() as i64)?
            .set_default("detector.kernel_size", default_kernel_size() as i64)?
            .set_default(
                "detector.detection_threshold",
                default_detection_threshold(),
            )?
            .set_default("detector.min_region_area", default_min_region_area() as i64)?
            .set_default("pacing.default_fps", default_fps())?
            .set_default("pacing.min_wait_ms", default_min_wait_ms() as i64)?
            .set_default("debounce.raise_after", default_raise_after() as i64)?
            .set_default("debounce.clear_after", default_clear_after() as i64)?
            .set_default("alarm.description", default_alarm_description())?
            .set_default("alarm.timezone", default_timezone())?
            .set_default(
                "alarm.dispatch_timeout_ms",
                default_dispatch_timeout_ms() as i64,
            )?
            .set_default("overlay.font_path", default_font_path())?
            .set_default("overlay.font_size", default_font_size() as f64)?
            .set_default("overlay.border_inset", default_border_inset() as i64)?
            .set_default(
                "output.channel_capacity",
                default_channel_capacity() as i64,
            )?
            .set_default(
                "output.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("output.sequence_fps", default_sequence_fps())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with FIREWATCH_ prefix
            .add_source(
                Environment::with_prefix("FIREWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: FirewatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;

        if !(self.pacing.default_fps.is_finite() && self.pacing.default_fps > 0.0) {
            return Err(ConfigError::Message(
                "Pacing default_fps must be a positive number".to_string(),
            ));
        }

        if self.debounce.raise_after == 0 || self.debounce.clear_after == 0 {
            return Err(ConfigError::Message(
                "Debounce raise_after and clear_after must be at least 1".to_string(),
            ));
        }

        if self.alarm.dispatch_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Alarm dispatch_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.overlay.font_size <= 0.0 {
            return Err(ConfigError::Message(
                "Overlay font_size must be greater than 0".to_string(),
            ));
        }

        if self.output.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Output channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.output.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if !(self.output.sequence_fps.is_finite() && self.output.sequence_fps > 0.0) {
            return Err(ConfigError::Message(
                "Output sequence_fps must be a positive number".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-run settings for `source`; the alarm location falls back to a label
    /// derived from the source when none is configured
    pub fn pipeline_config(&self, source: &SourceSpec) -> PipelineConfig {
        let location = self
            .alarm
            .location
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| source.default_location());

        PipelineConfig {
            detector: self.detector.clone(),
            pacing: self.pacing.clone(),
            debounce: self.debounce,
            labels: AlarmLabels {
                location: Some(location),
                description: Some(self.alarm.description.clone()),
            },
            overlay: self.overlay.clone(),
        }
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.alarm.dispatch_timeout_ms)
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, (lo, hi)) in [
            ("low_hue_band", self.low_hue_band),
            ("high_hue_band", self.high_hue_band),
        ] {
            if lo > hi || hi > 180 {
                return Err(ConfigError::Message(format!(
                    "Detector {} must satisfy low <= high <= 180, got ({}, {})",
                    name, lo, hi
                )));
            }
        }

        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(ConfigError::Message(format!(
                "Detector kernel_size must be a positive odd integer, got {}",
                self.kernel_size
            )));
        }

        // Norm::LInf radius is a u8
        if self.kernel_size / 2 > u8::MAX as u32 {
            return Err(ConfigError::Message(format!(
                "Detector kernel_size {} is too large",
                self.kernel_size
            )));
        }

        if !(self.detection_threshold > 0.0 && self.detection_threshold <= 1.0) {
            return Err(ConfigError::Message(format!(
                "Detector detection_threshold must be in (0, 1], got {}",
                self.detection_threshold
            )));
        }

        if self.min_region_area == 0 {
            return Err(ConfigError::Message(
                "Detector min_region_area must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FirewatchConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            pacing: PacingConfig::default(),
            debounce: DebounceConfig::default(),
            alarm: AlarmConfig {
                location: None,
                description: default_alarm_description(),
                log_path: None,
                timezone: default_timezone(),
                dispatch_timeout_ms: default_dispatch_timeout_ms(),
            },
            overlay: OverlayConfig::default(),
            output: OutputConfig {
                snapshot_dir: None,
                channel_capacity: default_channel_capacity(),
                event_bus_capacity: default_event_bus_capacity(),
                sequence_fps: default_sequence_fps(),
            },
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            low_hue_band: default_low_hue_band(),
            high_hue_band: default_high_hue_band(),
            min_saturation: default_min_saturation(),
            min_value: default_min_value(),
            kernel_size: default_kernel_size(),
            detection_threshold: default_detection_threshold(),
            min_region_area: default_min_region_area(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            default_fps: default_fps(),
            min_wait_ms: default_min_wait_ms(),
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            raise_after: default_raise_after(),
            clear_after: default_clear_after(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_path: default_font_path(),
            font_size: default_font_size(),
            border_inset: default_border_inset(),
        }
    }
}

// Default value functions
fn default_low_hue_band() -> (u8, u8) {
    (0, 20)
}
fn default_high_hue_band() -> (u8, u8) {
    (160, 180)
}
fn default_min_saturation() -> u8 {
    120
}
fn default_min_value() -> u8 {
    70
}
fn default_kernel_size() -> u32 {
    5
}
fn default_detection_threshold() -> f64 {
    0.01
}
fn default_min_region_area() -> u32 {
    100
}

fn default_fps() -> f64 {
    30.0
}
fn default_min_wait_ms() -> u64 {
    1
}

fn default_raise_after() -> u32 {
    1
}
fn default_clear_after() -> u32 {
    1
}

fn default_alarm_description() -> String {
    "automatic detection found possible fire".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_dispatch_timeout_ms() -> u64 {
    2000
}

fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_font_size() -> f32 {
    24.0
}
fn default_border_inset() -> u32 {
    30
}

fn default_channel_capacity() -> usize {
    4
}
fn default_event_bus_capacity() -> usize {
    100
}
fn default_sequence_fps() -> f64 {
    30.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FirewatchConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.detector.low_hue_band, (0, 20));
        assert_eq!(config.detector.high_hue_band, (160, 180));
        assert_eq!(config.detector.kernel_size, 5);
        assert_eq!(config.detector.min_region_area, 100);
        assert_eq!(config.pacing.default_fps, 30.0);
        assert_eq!(config.debounce, DebounceConfig { raise_after: 1, clear_after: 1 });
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = FirewatchConfig::load_from_file(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.detector.detection_threshold, 0.01);
        assert!(config.alarm.location.is_none());
        assert!(config.output.snapshot_dir.is_none());
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        std::env::set_var("FIREWATCH_ALARM__TIMEZONE", "Europe/Berlin");
        std::env::set_var("FIREWATCH_OVERLAY__BORDER_INSET", "12");
        let loaded = FirewatchConfig::load_from_file(&path);
        std::env::remove_var("FIREWATCH_ALARM__TIMEZONE");
        std::env::remove_var("FIREWATCH_OVERLAY__BORDER_INSET");

        let config = loaded.unwrap();
        assert_eq!(config.alarm.timezone, "Europe/Berlin");
        assert_eq!(config.overlay.border_inset, 12);
    }

    #[test]
    fn test_optional_outputs_are_off_by_default() {
        let config = FirewatchConfig::default();
        assert!(config.alarm.log_path.is_none());
        assert!(config.output.snapshot_dir.is_none());

        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("log_path"));
        assert!(!rendered.contains("snapshot_dir"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firewatch.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[detector]
kernel_size = 3
detection_threshold = 0.05
high_hue_band = [170, 180]

[alarm]
location = "warehouse"
"#
        )
        .unwrap();

        let config = FirewatchConfig::load_from_file(&path).unwrap();
        assert_eq!(config.detector.kernel_size, 3);
        assert_eq!(config.detector.detection_threshold, 0.05);
        assert_eq!(config.detector.high_hue_band, (170, 180));
        assert_eq!(config.detector.low_hue_band, (0, 20));
        assert_eq!(config.alarm.location.as_deref(), Some("warehouse"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = FirewatchConfig::default();

        config.detector.kernel_size = 4;
        assert!(config.validate().is_err());
        config.detector.kernel_size = 5;

        config.detector.detection_threshold = 0.0;
        assert!(config.validate().is_err());
        config.detector.detection_threshold = 1.5;
        assert!(config.validate().is_err());
        config.detector.detection_threshold = 1.0;
        assert!(config.validate().is_ok());

        config.detector.min_region_area = 0;
        assert!(config.validate().is_err());
        config.detector.min_region_area = 100;

        config.detector.low_hue_band = (30, 10);
        assert!(config.validate().is_err());
        config.detector.low_hue_band = (0, 20);

        config.pacing.default_fps = 0.0;
        assert!(config.validate().is_err());
        config.pacing.default_fps = 25.0;

        config.debounce.raise_after = 0;
        assert!(config.validate().is_err());
        config.debounce.raise_after = 1;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_location_label() {
        let mut config = FirewatchConfig::default();
        let file = SourceSpec::FilePath("/clips/kitchen.mp4".into());

        let derived = config.pipeline_config(&file);
        assert_eq!(
            derived.labels.location.as_deref(),
            Some("video file: /clips/kitchen.mp4")
        );
        assert_eq!(
            config.pipeline_config(&SourceSpec::DeviceIndex(0)).labels.location.as_deref(),
            Some("camera feed")
        );

        config.alarm.location = Some("loading dock".to_string());
        let labelled = config.pipeline_config(&file);
        assert_eq!(labelled.labels.location.as_deref(), Some("loading dock"));
        assert_eq!(
            labelled.labels.description.as_deref(),
            Some("automatic detection found possible fire")
        );
        assert_eq!(labelled.detector, config.detector);
    }
}
