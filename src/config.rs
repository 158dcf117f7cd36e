use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::labels::{DEFAULT_SETTLE_DELAY, LabelInterval};
use crate::placement::{
    Candidate, Corner, DEFAULT_SAMPLE_SIZE, MAX_SAMPLE_SIZE, PlacementAnalyzer,
};

const INDEX_PLACEHOLDER: &str = "{index}";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FramesConfig {
    /// Number of frames in the sequence.
    pub count: usize,
    /// Path of each frame; `{index}` is replaced by the 1-based index.
    pub uri_template: String,
    /// Zero-pad the index to this many digits.
    #[serde(default = "FramesConfig::default_pad_width")]
    pub pad_width: usize,
}

impl FramesConfig {
    const fn default_pad_width() -> usize {
        3
    }

    pub fn uri_for_index(&self, index: usize) -> String {
        let padded = format!("{index:0width$}", width = self.pad_width);
        self.uri_template.replace(INDEX_PLACEHOLDER, &padded)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Maximum number of frame decodes in flight.
    pub max_concurrent_decodes: usize,
    /// Give up on a single frame after this long. Unset means wait forever.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_decodes: 8,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PlacementConfig {
    /// Side of the square block sampled at each candidate, in surface pixels.
    pub sample_region_size: u32,
    pub sample_candidates: Vec<Candidate>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            sample_region_size: DEFAULT_SAMPLE_SIZE,
            sample_candidates: Corner::ALL.map(Corner::candidate).to_vec(),
        }
    }
}

impl PlacementConfig {
    pub fn analyzer(&self) -> PlacementAnalyzer {
        PlacementAnalyzer::new(self.sample_candidates.clone(), self.sample_region_size)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Delay between a label's entrance and its settled mark.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PlaybackConfig {
    pub tick_rate_hz: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { tick_rate_hz: 60 }
    }
}

impl PlaybackConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Frame sequence location and length.
    pub frames: FramesConfig,
    /// Initial display surface size in device pixels.
    #[serde(default)]
    pub viewport: ViewportConfig,
    /// Frame loading behavior.
    #[serde(default)]
    pub loader: LoaderConfig,
    /// Candidate regions sampled for label placement.
    #[serde(default)]
    pub placement: PlacementConfig,
    /// Overlay timing.
    #[serde(default)]
    pub overlay: OverlayConfig,
    /// Scheduler tick rate.
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Labeled frame intervals, in priority order.
    #[serde(default)]
    pub labels: Vec<LabelInterval>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(self.frames.count > 0, "frames.count must be greater than zero");
        ensure!(
            self.frames.uri_template.contains(INDEX_PLACEHOLDER),
            "frames.uri-template must contain {INDEX_PLACEHOLDER}"
        );
        ensure!(
            self.viewport.width > 0 && self.viewport.height > 0,
            "viewport width and height must be greater than zero"
        );
        ensure!(
            self.loader.max_concurrent_decodes > 0,
            "loader.max-concurrent-decodes must be greater than zero"
        );
        if let Some(timeout) = self.loader.timeout {
            ensure!(!timeout.is_zero(), "loader.timeout must be positive when set");
        }
        ensure!(
            (1..=MAX_SAMPLE_SIZE).contains(&self.placement.sample_region_size),
            "placement.sample-region-size must be between 1 and {MAX_SAMPLE_SIZE}"
        );
        ensure!(
            !self.placement.sample_candidates.is_empty(),
            "placement.sample-candidates must not be empty"
        );
        for candidate in &self.placement.sample_candidates {
            ensure!(
                (0.0..=100.0).contains(&candidate.x_pct)
                    && (0.0..=100.0).contains(&candidate.y_pct),
                "placement candidate ({}, {}) must lie within 0..=100 percent",
                candidate.x_pct,
                candidate.y_pct
            );
        }
        ensure!(
            self.playback.tick_rate_hz > 0,
            "playback.tick-rate-hz must be greater than zero"
        );
        for label in &mut self.labels {
            ensure!(
                !label.text.trim().is_empty(),
                "label text must not be empty"
            );
            ensure!(
                label.duration_frames > 0,
                "label `{}` must span at least one frame",
                label.text
            );
            if label.id.trim().is_empty() {
                label.id = label.text.clone();
            }
        }
        let mut ids = HashSet::new();
        for label in &self.labels {
            ensure!(
                ids.insert(label.id.as_str()),
                "label id `{}` is used more than once",
                label.id
            );
        }
        Ok(self)
    }
}
