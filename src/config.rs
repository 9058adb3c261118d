//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default completion endpoint on the host application.
pub const DEFAULT_COMPLETION_PATH: &str = "/mark_onboarding_complete/";

/// Delay before the overlay is measured after a scroll animation.
pub const SCROLL_SETTLE: Duration = Duration::from_millis(600);

/// Delay before a highlighted target is scrolled into view.
pub const HIGHLIGHT_SCROLL_DELAY: Duration = Duration::from_millis(100);

/// Delay between DOM ready and constructing the tour.
pub const PAGE_LOAD_DELAY: Duration = Duration::from_millis(500);

/// Distance kept between the top of the viewport and a scrolled-to target.
pub const SCROLL_TOP_OFFSET: f64 = 80.0;

/// Tour engine configuration.
#[derive(Debug, Clone)]
pub struct TourConfig {
    /// Where the `FileStore` keeps the profile's persisted cursor.
    pub store_path: PathBuf,
    /// Port for the control-surface HTTP routes (None = disabled).
    pub http_port: Option<u16>,
    /// Completion callback settings (None = no outbound call).
    pub completion: Option<CompletionConfig>,
    /// Wait after an accepted domain event before advancing.
    pub transition_delay: Duration,
    /// Wait after advancing before the debounce guard is released.
    pub debounce_release: Duration,
    /// Time the closing message stays up before teardown.
    pub teardown_delay: Duration,
    /// Fade-out before the overlay node is removed.
    pub fade_out: Duration,
    /// Viewports at or below this width get the narrow layout.
    pub narrow_viewport_px: f64,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./data/tour-state.json"),
            http_port: None,
            completion: None,
            transition_delay: Duration::from_millis(500),
            debounce_release: Duration::from_millis(2000),
            teardown_delay: Duration::from_millis(3000),
            fade_out: Duration::from_millis(300),
            narrow_viewport_px: 768.0,
        }
    }
}

impl TourConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_path = std::env::var("TOUR_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let http_port: Option<u16> = std::env::var("TOUR_HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok());

        // An explicit URL wins; otherwise the host origin plus the default path.
        let completion = std::env::var("TOUR_COMPLETION_URL")
            .ok()
            .or_else(|| {
                std::env::var("TOUR_HOST_ORIGIN").ok().map(|origin| {
                    format!("{}{}", origin.trim_end_matches('/'), DEFAULT_COMPLETION_PATH)
                })
            })
            .map(|endpoint| CompletionConfig {
                endpoint,
                csrf_token: SecretString::from(
                    std::env::var("TOUR_CSRF_TOKEN").unwrap_or_default(),
                ),
            });

        Self {
            store_path,
            http_port,
            completion,
            transition_delay: env_millis("TOUR_TRANSITION_DELAY_MS")
                .unwrap_or(defaults.transition_delay),
            debounce_release: env_millis("TOUR_DEBOUNCE_RELEASE_MS")
                .unwrap_or(defaults.debounce_release),
            teardown_delay: env_millis("TOUR_TEARDOWN_DELAY_MS")
                .unwrap_or(defaults.teardown_delay),
            fade_out: env_millis("TOUR_FADE_OUT_MS").unwrap_or(defaults.fade_out),
            narrow_viewport_px: std::env::var("TOUR_NARROW_VIEWPORT_PX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.narrow_viewport_px),
        }
    }

    /// [`TourConfig::from_env`] followed by [`TourConfig::validate`].
    pub fn load() -> crate::error::Result<Self> {
        let config = Self::from_env();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.narrow_viewport_px > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "TOUR_NARROW_VIEWPORT_PX".to_string(),
                message: format!("must be positive, got {}", self.narrow_viewport_px),
            });
        }
        if let Some(ref completion) = self.completion {
            if !completion.endpoint.starts_with("http://")
                && !completion.endpoint.starts_with("https://")
            {
                return Err(ConfigError::InvalidValue {
                    key: "TOUR_COMPLETION_URL".to_string(),
                    message: format!("expected an absolute URL, got {}", completion.endpoint),
                });
            }
        }
        Ok(())
    }

    /// How long a gated event name stays blocked after it is accepted.
    pub fn debounce_window(&self) -> Duration {
        self.transition_delay + self.debounce_release
    }
}

/// Outbound completion callback settings.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Absolute URL of the host's completion endpoint.
    pub endpoint: String,
    /// Anti-forgery token sourced from the host page's form.
    pub csrf_token: SecretString,
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let config = TourConfig::default();
        assert_eq!(config.transition_delay, Duration::from_millis(500));
        assert_eq!(config.debounce_release, Duration::from_millis(2000));
        assert_eq!(config.debounce_window(), Duration::from_millis(2500));
        assert_eq!(config.teardown_delay, Duration::from_secs(3));
        assert_eq!(config.narrow_viewport_px, 768.0);
        assert!(config.completion.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_relative_completion_url() {
        let config = TourConfig {
            completion: Some(CompletionConfig {
                endpoint: DEFAULT_COMPLETION_PATH.to_string(),
                csrf_token: SecretString::from("token"),
            }),
            ..TourConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("TOUR_COMPLETION_URL"));
    }

    #[test]
    fn validate_rejects_zero_breakpoint() {
        let config = TourConfig {
            narrow_viewport_px: 0.0,
            ..TourConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
