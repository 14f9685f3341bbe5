use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use teachable_knn::TieBreak;

use crate::error::SessionError;

const DEFAULT_K: usize = 3;
const DEFAULT_K_MIN: usize = 1;
const DEFAULT_K_MAX: usize = 11;
const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Session settings. Every field has a default, so an empty file is valid.
///
/// ```yaml
/// k: 5
/// k_min: 1
/// k_max: 11
/// interval_ms: 500
/// tie_break: highest_mean_similarity
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Neighbours consulted per prediction.
    pub k: usize,

    /// Lower bound applied when the user adjusts `k`.
    pub k_min: usize,

    /// Upper bound applied when the user adjusts `k`.
    pub k_max: usize,

    /// Period of the prediction ticker, in milliseconds.
    pub interval_ms: u64,

    /// Vote tie-break policy.
    pub tie_break: TieBreak,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            k_min: DEFAULT_K_MIN,
            k_max: DEFAULT_K_MAX,
            interval_ms: DEFAULT_INTERVAL_MS,
            tie_break: TieBreak::default(),
        }
    }
}

impl SessionConfig {
    /// Loads a config file. `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let cfg = if is_json {
            Self::from_json(&text)?
        } else {
            Self::from_yaml(&text)?
        };
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SessionError> {
        // An empty YAML document parses as null, not as an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self =
            serde_yaml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        let cfg: Self =
            serde_json::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_k_range(mut self, min: usize, max: usize) -> Self {
        self.k_min = min;
        self.k_max = max;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Clamps `k` into `[k_min, k_max]`.
    pub fn clamp_k(&self, k: usize) -> usize {
        k.clamp(self.k_min, self.k_max)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.k_min == 0 {
            return Err(SessionError::Config("k_min must be at least 1".into()));
        }
        if self.k_min > self.k_max {
            return Err(SessionError::Config(format!(
                "k_min ({}) exceeds k_max ({})",
                self.k_min, self.k_max
            )));
        }
        if self.interval_ms == 0 {
            return Err(SessionError::Config("interval_ms must be positive".into()));
        }
        Ok(())
    }
}
