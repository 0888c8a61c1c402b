//! Configuration for the load test.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags of the `run` command
//! 2. Environment variables (prefixed with `PETSTORE__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! # Environment Variables
//!
//! Environment variables use `PETSTORE__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `PETSTORE__USERS=20` sets the number of simulated users
//! - `PETSTORE__WAIT_TIME__MAX=5s` sets the upper bound of the wait between requests
//!
//! # YAML Configuration File
//!
//! ```yaml
//! host: https://petstore.swagger.io/v2
//! users: 20
//! spawn_rate: 2
//! run_time: 5m
//!
//! wait_time:
//!   min: 1s
//!   max: 5s
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use rand::Rng;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::http::DEFAULT_HOST;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "PETSTORE__";

/// Bounds of the random pause a user takes between two requests.
///
/// The pause is drawn uniformly from `[min, max]`.
///
/// Used in: [`Config::wait_time`]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitTime {
    /// Shortest pause.
    ///
    /// # Default
    ///
    /// `1s`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__WAIT_TIME__MIN`
    #[serde(with = "humantime_serde")]
    pub min: Duration,

    /// Longest pause.
    ///
    /// # Default
    ///
    /// `3s`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__WAIT_TIME__MAX`
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl WaitTime {
    /// Draws a pause uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        let secs = rng.random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// The delay between two user starts during ramp-up.
///
/// Returns `None` if `spawn_rate` is not positive and finite, or so large that the interval
/// rounds down to zero.
pub fn spawn_interval(spawn_rate: f64) -> Option<Duration> {
    if !spawn_rate.is_finite() || spawn_rate <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(spawn_rate.recip())
        .ok()
        .filter(|interval| !interval.is_zero())
}

impl Default for WaitTime {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO petstore_loadtest::listeners: Starting Petstore API Load Test
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2025-06-04T12:10:32Z  INFO petstore_loadtest::listeners: Starting Petstore API Load Test
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2025-06-04T12:11:08.729716Z","level":"INFO","message":"Starting Petstore API Load Test","target":"petstore_loadtest::listeners"}
    /// ```
    Json,
}

/// The logging format parse error.
#[derive(Clone, Debug, Error)]
#[error(r#"error parsing "{0}" as format: expected one of "auto", "pretty", "simplified", "json""#)]
pub struct FormatParseError(String);

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, the final report goes to stdout.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable overrides this and allows per-module control.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format. See [`LogFormat`] for available options.
    ///
    /// # Default
    ///
    /// `Auto`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct of the load test.
///
/// See individual field documentation for defaults and environment variables.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the target API.
    ///
    /// # Default
    ///
    /// `https://petstore.swagger.io/v2`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__HOST`
    pub host: String,

    /// Number of concurrent simulated users.
    ///
    /// # Default
    ///
    /// `5`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__USERS`
    pub users: usize,

    /// Users started per second until [`users`](Self::users) are running.
    ///
    /// # Default
    ///
    /// `1.0`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__SPAWN_RATE`
    pub spawn_rate: f64,

    /// Stop the test after this duration.
    ///
    /// # Default
    ///
    /// `None` (run until interrupted with Ctrl-C)
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__RUN_TIME`
    #[serde(with = "humantime_serde")]
    pub run_time: Option<Duration>,

    /// Disables the interactive progress display.
    ///
    /// # Default
    ///
    /// `false`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__HEADLESS`
    pub headless: bool,

    /// Pause between two requests of the same user. See [`WaitTime`].
    pub wait_time: WaitTime,

    /// Timeout of a single request, including reading the body.
    ///
    /// # Default
    ///
    /// `30s`
    ///
    /// # Environment Variable
    ///
    /// `PETSTORE__REQUEST_TIMEOUT`
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Logging configuration. See [`Logging`].
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            users: 5,
            spawn_rate: 1.0,
            run_time: None,
            headless: false,
            wait_time: WaitTime::default(),
            request_timeout: Duration::from_secs(30),
            logging: Logging::default(),
        }
    }
}

/// Values given on the command line, which take precedence over all other sources.
///
/// Fields left as `None` do not override anything.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    /// See [`Config::host`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// See [`Config::users`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<usize>,
    /// See [`Config::spawn_rate`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_rate: Option<f64>,
    /// See [`Config::run_time`].
    #[serde(
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub run_time: Option<Duration>,
    /// See [`Config::headless`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
}

/// An invalid combination of configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The test needs at least one user.
    #[error("users must be at least 1")]
    NoUsers,

    /// The spawn rate must be positive and below one user per nanosecond.
    #[error("spawn_rate must be positive and at most 1e9, got {0}")]
    InvalidSpawnRate(f64),

    /// The wait time bounds are reversed.
    #[error("wait_time.min ({min:?}) must not exceed wait_time.max ({max:?})")]
    InvalidWaitTime {
        /// The configured lower bound.
        min: Duration,
        /// The configured upper bound.
        max: Duration,
    },

    /// The host is not an absolute HTTP(S) URL.
    #[error("invalid host `{host}`: {reason}")]
    InvalidHost {
        /// The configured host.
        host: String,
        /// Why the host was rejected.
        reason: String,
    },
}

impl Config {
    /// Loads configuration from the given file and command line overrides.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if `path` is given)
    /// 3. Environment variables (prefixed with `PETSTORE__`)
    /// 4. Command line `overrides`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain invalid values
    /// - The merged configuration fails [`validate`](Self::validate)
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users == 0 {
            return Err(ConfigError::NoUsers);
        }

        if spawn_interval(self.spawn_rate).is_none() {
            return Err(ConfigError::InvalidSpawnRate(self.spawn_rate));
        }

        let WaitTime { min, max } = self.wait_time;
        if min > max {
            return Err(ConfigError::InvalidWaitTime { min, max });
        }

        let invalid_host = |reason: &dyn fmt::Display| ConfigError::InvalidHost {
            host: self.host.clone(),
            reason: reason.to_string(),
        };
        let url = Url::parse(&self.host).map_err(|e| invalid_host(&e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid_host(&"expected an http or https URL"));
        }

        Ok(())
    }
}
