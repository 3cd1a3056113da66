#![forbid(unsafe_code)]

//! Process-wide defaults for composables.
//!
//! Option structs (`WatchOptions`, `DebounceOptions`, `IntervalOptions`, ...)
//! read their `Default` values from the active [`ComposableDefaults`]. The
//! active set is held in an [`ArcSwap`], so reading it is a lock-free
//! pointer load and replacing it never blocks readers.
//!
//! With the `policy-config` feature, defaults can be loaded from TOML or
//! JSON:
//!
//! ```toml
//! debounce_wait_ms = 150
//! throttle_wait_ms = 100
//! interval_ms = 1000
//! timeout_ms = 1000
//! watch_flush = "post"
//! ```
//!
//! Missing keys keep their built-in values.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::reactive::Flush;

/// Default timings and flush mode for composables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposableDefaults {
    pub debounce_wait: Duration,
    pub throttle_wait: Duration,
    pub interval: Duration,
    pub timeout: Duration,
    pub watch_flush: Flush,
}

impl ComposableDefaults {
    /// Built-in values: 200ms debounce/throttle, 1s interval and timeout,
    /// post-flush watchers.
    pub const BUILTIN: Self = Self {
        debounce_wait: Duration::from_millis(200),
        throttle_wait: Duration::from_millis(200),
        interval: Duration::from_secs(1),
        timeout: Duration::from_secs(1),
        watch_flush: Flush::Post,
    };
}

impl Default for ComposableDefaults {
    fn default() -> Self {
        Self::BUILTIN
    }
}

static DEFAULTS: LazyLock<ArcSwap<ComposableDefaults>> =
    LazyLock::new(|| ArcSwap::from_pointee(ComposableDefaults::BUILTIN));

/// The active defaults.
#[must_use]
pub fn defaults() -> ComposableDefaults {
    **DEFAULTS.load()
}

/// Replace the active defaults, returning the previous set.
pub fn set_defaults(defaults: ComposableDefaults) -> ComposableDefaults {
    let previous = DEFAULTS.swap(Arc::new(defaults));
    tracing::debug!(?defaults, "composable defaults replaced");
    *previous
}

/// Error produced while loading defaults from a file or string.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading the file failed.
    Io(std::io::Error),
    /// The document did not parse.
    Parse { format: &'static str, message: String },
    /// A field parsed but holds an unusable value.
    Invalid { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read defaults file: {err}"),
            Self::Parse { format, message } => write!(f, "invalid {format} defaults: {message}"),
            Self::Invalid { field, reason } => write!(f, "invalid value for {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(feature = "policy-config")]
mod file {
    use super::{ComposableDefaults, ConfigError, Flush};
    use std::path::Path;
    use std::time::Duration;

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    struct DefaultsFile {
        debounce_wait_ms: Option<u64>,
        throttle_wait_ms: Option<u64>,
        interval_ms: Option<u64>,
        timeout_ms: Option<u64>,
        watch_flush: Option<String>,
    }

    impl DefaultsFile {
        fn apply(self, base: ComposableDefaults) -> Result<ComposableDefaults, ConfigError> {
            let ms = |v: Option<u64>, fallback: Duration| v.map_or(fallback, Duration::from_millis);
            let watch_flush = match self.watch_flush.as_deref() {
                None => base.watch_flush,
                Some("post") => Flush::Post,
                Some("sync") => Flush::Sync,
                Some(other) => {
                    return Err(ConfigError::Invalid {
                        field: "watch_flush",
                        reason: format!("expected \"post\" or \"sync\", got {other:?}"),
                    });
                }
            };
            Ok(ComposableDefaults {
                debounce_wait: ms(self.debounce_wait_ms, base.debounce_wait),
                throttle_wait: ms(self.throttle_wait_ms, base.throttle_wait),
                interval: ms(self.interval_ms, base.interval),
                timeout: ms(self.timeout_ms, base.timeout),
                watch_flush,
            })
        }
    }

    impl ComposableDefaults {
        /// Parse defaults from TOML, filling missing keys from [`BUILTIN`](Self::BUILTIN).
        pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
            let file: DefaultsFile = toml::from_str(input).map_err(|err| ConfigError::Parse {
                format: "TOML",
                message: err.to_string(),
            })?;
            file.apply(Self::BUILTIN)
        }

        /// Parse defaults from JSON, filling missing keys from [`BUILTIN`](Self::BUILTIN).
        pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
            let file: DefaultsFile =
                serde_json::from_str(input).map_err(|err| ConfigError::Parse {
                    format: "JSON",
                    message: err.to_string(),
                })?;
            file.apply(Self::BUILTIN)
        }

        /// Load defaults from a file; `.json` files parse as JSON, anything
        /// else as TOML.
        pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)?;
            let is_json = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                Self::from_json_str(&text)
            } else {
                Self::from_toml_str(&text)
            }
        }
    }
}
