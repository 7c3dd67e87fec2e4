//! Extraction settings and stored preferences.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use threadmark_core::ExtractSettings;
//!
//! let settings = ExtractSettings::builder()
//!     .settle_delay(Duration::from_millis(50))
//!     .idle_steps(3)
//!     .build();
//! assert_eq!(settings.idle_steps, 3);
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;
use crate::style::{CitationStyle, Spacing};
use crate::{Result, ThreadmarkError};

/// Order in which the orchestrator tries strategies. Always a permutation of
/// all three kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StrategyKind>", into = "Vec<StrategyKind>")]
pub struct StrategyPriority([StrategyKind; 3]);

impl StrategyPriority {
    pub fn new(order: [StrategyKind; 3]) -> Result<Self> {
        Self::try_from(order.to_vec())
    }

    pub fn kinds(&self) -> &[StrategyKind; 3] {
        &self.0
    }
}

impl Default for StrategyPriority {
    fn default() -> Self {
        Self([StrategyKind::Export, StrategyKind::DirectScan, StrategyKind::Copy])
    }
}

impl TryFrom<Vec<StrategyKind>> for StrategyPriority {
    type Error = ThreadmarkError;

    fn try_from(kinds: Vec<StrategyKind>) -> Result<Self> {
        let order: [StrategyKind; 3] = kinds
            .clone()
            .try_into()
            .map_err(|_| ThreadmarkError::InvalidPriority(format!("expected 3 strategies, got {}", kinds.len())))?;

        for kind in StrategyKind::ALL {
            if !order.contains(&kind) {
                return Err(ThreadmarkError::InvalidPriority(format!("missing strategy: {}", kind)));
            }
        }
        Ok(Self(order))
    }
}

impl From<StrategyPriority> for Vec<StrategyKind> {
    fn from(priority: StrategyPriority) -> Self {
        priority.0.to_vec()
    }
}

impl FromStr for StrategyPriority {
    type Err = ThreadmarkError;

    fn from_str(s: &str) -> Result<Self> {
        let kinds = s
            .split(',')
            .map(|part| part.trim().parse::<StrategyKind>())
            .collect::<Result<Vec<_>>>()?;
        Self::try_from(kinds)
    }
}

impl fmt::Display for StrategyPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&names.join(","))
    }
}

/// Timing and budget knobs for the strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSettings {
    /// Pause after every scroll or click (default: 300ms).
    pub settle_delay: Duration,

    /// Consecutive steps at the bottom with nothing new before a scan stops (default: 5).
    pub idle_steps: usize,

    /// Hard cap on scan steps (default: 400).
    pub max_steps: usize,

    /// Fraction of the viewport scrolled per step (default: 0.8).
    pub scroll_step_ratio: f64,

    /// Polls for the scroll height to stop growing at the bottom (default: 10).
    pub height_poll_attempts: usize,

    /// How long to wait for an intercepted export (default: 8s).
    pub capture_timeout: Duration,

    /// Focus polls before a clipboard read gives up (default: 20).
    pub focus_retry_budget: usize,

    /// Interval between focus polls (default: 500ms).
    pub focus_poll_interval: Duration,

    /// Re-reads of an unchanged clipboard before a control is skipped (default: 3).
    pub stale_retries: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(300),
            idle_steps: 5,
            max_steps: 400,
            scroll_step_ratio: 0.8,
            height_poll_attempts: 10,
            capture_timeout: Duration::from_secs(8),
            focus_retry_budget: 20,
            focus_poll_interval: Duration::from_millis(500),
            stale_retries: 3,
        }
    }
}

impl ExtractSettings {
    pub fn builder() -> ExtractSettingsBuilder {
        ExtractSettingsBuilder::new()
    }
}

/// Builder for [`ExtractSettings`].
pub struct ExtractSettingsBuilder {
    settings: ExtractSettings,
}

impl ExtractSettingsBuilder {
    pub fn new() -> Self {
        Self { settings: ExtractSettings::default() }
    }

    pub fn settle_delay(mut self, value: Duration) -> Self {
        self.settings.settle_delay = value;
        self
    }

    pub fn idle_steps(mut self, value: usize) -> Self {
        self.settings.idle_steps = value;
        self
    }

    pub fn max_steps(mut self, value: usize) -> Self {
        self.settings.max_steps = value;
        self
    }

    /// Clamped to `0.1..=1.0` so a scan always makes progress without skipping content.
    pub fn scroll_step_ratio(mut self, value: f64) -> Self {
        self.settings.scroll_step_ratio = value.clamp(0.1, 1.0);
        self
    }

    pub fn height_poll_attempts(mut self, value: usize) -> Self {
        self.settings.height_poll_attempts = value;
        self
    }

    pub fn capture_timeout(mut self, value: Duration) -> Self {
        self.settings.capture_timeout = value;
        self
    }

    pub fn focus_retry_budget(mut self, value: usize) -> Self {
        self.settings.focus_retry_budget = value;
        self
    }

    pub fn focus_poll_interval(mut self, value: Duration) -> Self {
        self.settings.focus_poll_interval = value;
        self
    }

    pub fn stale_retries(mut self, value: usize) -> Self {
        self.settings.stale_retries = value;
        self
    }

    pub fn build(self) -> ExtractSettings {
        self.settings
    }
}

impl Default for ExtractSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the finished document goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMethod {
    #[default]
    File,
    Stdout,
}

/// Stored user preferences. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub citation_style: CitationStyle,
    pub spacing: Spacing,
    pub strategy_priority: StrategyPriority,
    pub role_headings: bool,
    pub output: OutputMethod,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            citation_style: CitationStyle::default(),
            spacing: Spacing::default(),
            strategy_priority: StrategyPriority::default(),
            role_headings: true,
            output: OutputMethod::default(),
        }
    }
}

impl Preferences {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ThreadmarkError::ConfigError(e.to_string()))
    }
}

/// `<config dir>/threadmark/preferences.json`, when the platform has one.
pub fn default_preferences_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("threadmark").join("preferences.json"))
}

/// Load preferences from `path`.
///
/// # Errors
///
/// [`ThreadmarkError::FileNotFound`] if the file is missing and
/// [`ThreadmarkError::ConfigError`] if it does not parse.
pub fn load_preferences(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Err(ThreadmarkError::FileNotFound(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    Preferences::from_json(&json)
}
