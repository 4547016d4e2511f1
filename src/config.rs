use crate::{
    error::{Result, StudioError},
    models::OutputFormat,
};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "https://api.stability.ai";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

#[derive(Clone)]
pub struct StabilityConfig {
    pub api_key: String,
    pub api_host: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub output_format: OutputFormat,
}

// Hand-written so the key never ends up in a log line.
impl std::fmt::Debug for StabilityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityConfig")
            .field("api_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("output_format", &self.output_format)
            .finish()
    }
}

impl StabilityConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        StabilityConfig {
            api_key: api_key.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            output_format: OutputFormat::Png,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("STABILITY_API_KEY").map_err(|_| {
            StudioError::ConfigError("STABILITY_API_KEY is not set".into())
        })?;

        let mut config = Self::new(api_key);
        if let Ok(host) = env::var("STABILITY_API_HOST") {
            config.api_host = host;
        }
        if let Some(secs) = parse_env::<u64>("STABILITY_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("STABILITY_POLL_INTERVAL_SECS")? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_env::<u32>("STABILITY_POLL_MAX_ATTEMPTS")? {
            config.max_poll_attempts = attempts;
        }
        if let Ok(format) = env::var("STABILITY_OUTPUT_FORMAT") {
            config.output_format = format.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(StudioError::ConfigError("Stability API key is empty".into()));
        }
        if !self.api_host.starts_with("http://") && !self.api_host.starts_with("https://") {
            return Err(StudioError::ConfigError(format!(
                "API host must be an http(s) URL, got '{}'",
                self.api_host
            )));
        }
        if self.max_poll_attempts == 0 {
            return Err(StudioError::ConfigError(
                "max poll attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Full URL for an endpoint below `v2beta/stable-image/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v2beta/stable-image/{}",
            self.api_host.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub log_json: bool,
    pub stability: Option<StabilityConfig>,
    // Set when a key was given but the Stability settings did not load.
    stability_error: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from("."),
            log_json: false,
            stability: None,
            stability_error: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the studio settings. A missing or blank key leaves the Stability
    /// section empty, and invalid Stability settings are only reported by
    /// [`Config::stability`], so local-only commands keep working.
    pub fn from_env() -> Result<Self> {
        let output_dir = env::var("STUDIO_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let log_json = env::var("STUDIO_LOG_JSON")
            .ok()
            .map_or(false, |val| val == "true");

        let (stability, stability_error) = match env::var("STABILITY_API_KEY") {
            Ok(key) if !key.trim().is_empty() => match StabilityConfig::from_env() {
                Ok(config) => (Some(config), None),
                Err(StudioError::ConfigError(msg)) => (None, Some(msg)),
                Err(e) => (None, Some(e.to_string())),
            },
            _ => (None, None),
        };

        Ok(Config {
            output_dir,
            log_json,
            stability,
            stability_error,
        })
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_stability(mut self, config: StabilityConfig) -> Self {
        self.stability = Some(config);
        self.stability_error = None;
        self
    }

    pub fn stability(&self) -> Result<&StabilityConfig> {
        if let Some(config) = &self.stability {
            return Ok(config);
        }
        Err(StudioError::ConfigError(match &self.stability_error {
            Some(msg) => msg.clone(),
            None => "STABILITY_API_KEY is required for this command".into(),
        }))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                StudioError::ConfigError(format!("{} has an invalid value: {}", name, raw))
            }),
        Err(_) => Ok(None),
    }
}
