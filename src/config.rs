//! Configuration management for RansomGuard

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directories to watch
    #[serde(default)]
    pub watch: Vec<PathBuf>,

    /// Paths/patterns to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Detection thresholds and scoring weights
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Burst-rate tracking parameters
    #[serde(default)]
    pub burst: BurstConfig,

    /// In-memory event/alert log capacities
    #[serde(default)]
    pub store: StoreConfig,

    /// Notification pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch: vec![PathBuf::from("/home")],
            exclude: vec![
                "*.log".to_string(),
                "*.tmp".to_string(),
                "/tmp/**".to_string(),
                "/var/log/**".to_string(),
            ],
            detection: DetectionConfig::default(),
            burst: BurstConfig::default(),
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check if a path should be excluded from monitoring
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.exclude {
            if let Ok(glob) = globset::Glob::new(pattern) {
                if glob.compile_matcher().is_match(path) {
                    return true;
                }
            }
            // Simple string matching fallback
            if path_str.contains(pattern.trim_matches('*')) {
                return true;
            }
        }
        false
    }
}

/// Detection thresholds and scoring weights
///
/// The weights and cutoffs are hand-tuned operational constants; they are
/// kept configurable rather than baked in so deployments can recalibrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Entropy above which a buffer is considered encrypted (0.0 - 8.0)
    #[serde(default = "default_high_entropy")]
    pub high_entropy_threshold: f64,

    /// Extensions commonly appended by encrypting malware
    #[serde(default = "default_suspicious_extensions")]
    pub suspicious_extensions: Vec<String>,

    /// Extensions that score an extra penalty on their own
    #[serde(default = "default_critical_extensions")]
    pub critical_extensions: Vec<String>,

    /// Ransom-note keywords matched case-insensitively in the buffer prefix
    #[serde(default = "default_note_keywords")]
    pub note_keywords: Vec<String>,

    /// How many leading bytes are searched for note keywords
    #[serde(default = "default_note_prefix_len")]
    pub note_prefix_len: usize,

    /// Sample window size for entropy of large buffers
    #[serde(default = "default_sample_window")]
    pub sample_window: usize,

    /// Score added when entropy exceeds the high threshold
    #[serde(default = "default_weight_entropy")]
    pub weight_entropy: u32,

    /// Score added per matched indicator tag
    #[serde(default = "default_weight_indicator")]
    pub weight_indicator: u32,

    /// Score added when the burst window count exceeds the adaptive threshold
    #[serde(default = "default_weight_burst")]
    pub weight_burst: u32,

    /// Score added for a critical extension
    #[serde(default = "default_weight_extension")]
    pub weight_extension: u32,

    /// Risk score cutoff for critical severity
    #[serde(default = "default_score_critical")]
    pub score_critical: u8,

    /// Risk score cutoff for high severity
    #[serde(default = "default_score_high")]
    pub score_high: u8,

    /// Risk score cutoff for medium severity
    #[serde(default = "default_score_medium")]
    pub score_medium: u8,

    /// Risk score cutoff for low severity; below this no alert is emitted
    #[serde(default = "default_score_low")]
    pub score_low: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            high_entropy_threshold: default_high_entropy(),
            suspicious_extensions: default_suspicious_extensions(),
            critical_extensions: default_critical_extensions(),
            note_keywords: default_note_keywords(),
            note_prefix_len: default_note_prefix_len(),
            sample_window: default_sample_window(),
            weight_entropy: default_weight_entropy(),
            weight_indicator: default_weight_indicator(),
            weight_burst: default_weight_burst(),
            weight_extension: default_weight_extension(),
            score_critical: default_score_critical(),
            score_high: default_score_high(),
            score_medium: default_score_medium(),
            score_low: default_score_low(),
        }
    }
}

/// Burst-rate tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstConfig {
    /// Sliding window horizon in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Floor for the adaptive threshold
    #[serde(default = "default_base_threshold")]
    pub base_threshold: f64,

    /// Multiplier applied to the observed rate
    #[serde(default = "default_adaptation_factor")]
    pub adaptation_factor: f64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            base_threshold: default_base_threshold(),
            adaptation_factor: default_adaptation_factor(),
        }
    }
}

/// In-memory log capacities; oldest records are evicted at capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,

    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_alerts: default_max_alerts(),
            max_events: default_max_events(),
        }
    }
}

/// Notification pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Depth of the change-notification queue; excess notifications are dropped
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Maximum bytes read from a changed file for analysis
    #[serde(default = "default_read_cap")]
    pub read_cap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
            read_cap: default_read_cap(),
        }
    }
}

// Default value functions for serde

fn default_high_entropy() -> f64 {
    7.5
}

fn default_suspicious_extensions() -> Vec<String> {
    ["locked", "encrypted", "crypted", "crypto", "enc", "ransom"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_critical_extensions() -> Vec<String> {
    ["locked", "encrypted"].iter().map(|s| s.to_string()).collect()
}

fn default_note_keywords() -> Vec<String> {
    ["bitcoin", "decrypt", "ransom", "restore"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_note_prefix_len() -> usize {
    1024
}

fn default_sample_window() -> usize {
    8192
}

fn default_weight_entropy() -> u32 {
    30
}

fn default_weight_indicator() -> u32 {
    25
}

fn default_weight_burst() -> u32 {
    35
}

fn default_weight_extension() -> u32 {
    40
}

fn default_score_critical() -> u8 {
    80
}

fn default_score_high() -> u8 {
    60
}

fn default_score_medium() -> u8 {
    40
}

fn default_score_low() -> u8 {
    20
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_base_threshold() -> f64 {
    2.0
}

fn default_adaptation_factor() -> f64 {
    1.5
}

fn default_max_alerts() -> usize {
    100
}

fn default_max_events() -> usize {
    50
}

fn default_queue_depth() -> usize {
    1024
}

fn default_read_cap() -> usize {
    64 * 1024
}
