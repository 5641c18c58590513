use std::path::PathBuf;
use std::time::Duration;

use crate::analytics_api::{DEFAULT_API_BASE, normalize_base_url};
use crate::model::PerformanceMode;
use crate::session::SessionTiming;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base: String,
    pub timing: SessionTiming,
    pub request_timeout: Duration,
    pub demo: bool,
    pub default_mode: PerformanceMode,
    pub export_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timing: SessionTiming::default(),
            request_timeout: Duration::from_secs(10),
            demo: false,
            default_mode: PerformanceMode::Fast,
            export_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_base = lookup("MATCHLENS_API_BASE")
            .map(|raw| normalize_base_url(&raw))
            .unwrap_or(defaults.api_base);
        let poll_ms = lookup("MATCHLENS_POLL_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(500)
            .clamp(100, 5_000);
        let settle_ms = lookup("MATCHLENS_SETTLE_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(1_000)
            .min(10_000);
        let timeout_secs = lookup("MATCHLENS_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(10)
            .clamp(1, 120);
        let demo = lookup("MATCHLENS_DEMO")
            .map(|val| parse_flag(&val))
            .unwrap_or(false);
        let default_mode = lookup("MATCHLENS_MODE")
            .and_then(|val| val.parse::<PerformanceMode>().ok())
            .unwrap_or(defaults.default_mode);
        let export_dir = lookup("MATCHLENS_EXPORT_DIR")
            .filter(|val| !val.trim().is_empty())
            .map(|val| PathBuf::from(val.trim()));

        Self {
            api_base,
            timing: SessionTiming {
                poll_interval: Duration::from_millis(poll_ms),
                elapsed_interval: defaults.timing.elapsed_interval,
                settle_delay: Duration::from_millis(settle_ms),
            },
            request_timeout: Duration::from_secs(timeout_secs),
            demo,
            default_mode,
            export_dir,
        }
    }
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
