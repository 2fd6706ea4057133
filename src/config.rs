//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default model used for generation.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default Messages API base URL.
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com";

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AssessConfig {
    /// Provider API key. `None` runs the workflow offline on fallback content.
    pub api_key: Option<SecretString>,
    /// Model name passed to the provider.
    pub model: String,
    /// Messages API base URL.
    pub api_url: String,
    /// Deadline for a single generation call.
    pub generation_timeout: Duration,
    /// Sampling temperature for generation calls.
    pub temperature: f32,
    /// Maximum number of generated clarification questions kept.
    pub max_questions: usize,
}

impl Default for AssessConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            generation_timeout: Duration::from_secs(30),
            temperature: 0.3,
            max_questions: 5,
        }
    }
}

impl AssessConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables take their defaults. A set but unparsable value is an
    /// error rather than a silent default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let model = std::env::var("HEALTH_ASSESS_MODEL").unwrap_or(defaults.model);
        let api_url = std::env::var("HEALTH_ASSESS_API_URL").unwrap_or(defaults.api_url);

        let timeout_secs: u64 = parse_var("HEALTH_ASSESS_TIMEOUT_SECS")?
            .unwrap_or(defaults.generation_timeout.as_secs());
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HEALTH_ASSESS_TIMEOUT_SECS".into(),
                message: "must be at least 1 second".into(),
            });
        }

        let temperature: f32 =
            parse_var("HEALTH_ASSESS_TEMPERATURE")?.unwrap_or(defaults.temperature);
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "HEALTH_ASSESS_TEMPERATURE".into(),
                message: format!("{temperature} is outside 0.0-1.0"),
            });
        }

        let max_questions: usize =
            parse_var("HEALTH_ASSESS_MAX_QUESTIONS")?.unwrap_or(defaults.max_questions);
        if max_questions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HEALTH_ASSESS_MAX_QUESTIONS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            api_key,
            model,
            api_url,
            generation_timeout: Duration::from_secs(timeout_secs),
            temperature,
            max_questions,
        })
    }

    /// Whether a provider key is configured.
    pub fn is_online(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_var<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!("{key}: {e}"))),
    }
}
