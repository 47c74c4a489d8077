use crate::error::{CoreError, InvalidConfiguration, Result};
use crate::texts::{StringArrays, TextSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timeout applied by declarative configuration when none is given, before
/// the host's animation allowance is added.
pub const DEFAULT_CONFIGURED_TIMEOUT_MS: i64 = 14_500;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FadeTextConfig {
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub string_arrays: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Declarative setup for one rotating text, applied once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Texts listed inline. Takes precedence over `texts_ref`.
    #[serde(default)]
    pub texts: Option<Vec<String>>,
    /// Name of an entry in `[string_arrays]`.
    #[serde(default)]
    pub texts_ref: Option<String>,
    /// Interval in milliseconds; the sign is ignored.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
    #[serde(default)]
    pub shuffle: bool,
}

const fn default_timeout_ms() -> i64 {
    DEFAULT_CONFIGURED_TIMEOUT_MS
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            texts: None,
            texts_ref: None,
            timeout_ms: default_timeout_ms(),
            shuffle: false,
        }
    }
}

impl RotationConfig {
    /// Resolve the configured texts, if any were configured.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::EmptyTexts`] for an empty list and
    /// [`InvalidConfiguration::UnknownTextArray`] for a dangling reference.
    pub fn resolve_texts<A>(
        &self,
        arrays: &A,
    ) -> std::result::Result<Option<TextSet>, InvalidConfiguration>
    where
        A: StringArrays + ?Sized,
    {
        if let Some(texts) = &self.texts {
            return TextSet::new(texts.iter().cloned()).map(Some);
        }
        let Some(id) = &self.texts_ref else {
            return Ok(None);
        };
        let texts = arrays
            .string_array(id)
            .ok_or_else(|| InvalidConfiguration::UnknownTextArray { id: id.clone() })?;
        TextSet::new(texts).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationConfig {
    #[serde(default = "default_fade_ms")]
    pub fade_in_ms: u64,
    #[serde(default = "default_fade_ms")]
    pub fade_out_ms: u64,
    /// Platform time needed to load and start an animation, added to the
    /// configured timeout.
    #[serde(default = "default_allowance_ms")]
    pub allowance_ms: u64,
}

const fn default_fade_ms() -> u64 {
    500
}

const fn default_allowance_ms() -> u64 {
    500
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: default_fade_ms(),
            fade_out_ms: default_fade_ms(),
            allowance_ms: default_allowance_ms(),
        }
    }
}

impl AnimationConfig {
    #[must_use]
    pub const fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    #[must_use]
    pub const fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }

    #[must_use]
    pub const fn allowance(&self) -> Duration {
        Duration::from_millis(self.allowance_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file
    #[serde(default)]
    pub enabled: bool,
}

impl StringArrays for FadeTextConfig {
    fn string_array(&self, id: &str) -> Option<Vec<String>> {
        self.string_arrays.string_array(id)
    }
}

impl FadeTextConfig {
    /// Get the configuration directory path (~/.config/fadetext/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/fadetext/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path or create the template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read or parsed.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path` or create the template there
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read or parsed.
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config file contents
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the rotation texts
    /// cannot be resolved.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;

        // Surface dangling references and empty lists at load time
        config.rotation.resolve_texts(&config)?;

        Ok(config)
    }
}

pub const CONFIG_TEMPLATE: &str = r#"# fadetext configuration
# ~/.config/fadetext/config.toml

[rotation]
# Texts can be listed inline:
# texts = ["Hello", "Bonjour", "Hola"]
# or taken from a named array below (ignored when `texts` is set)
texts_ref = "examples"
# Milliseconds each text stays up before fading out
timeout_ms = 2000
# Shuffle the texts once at startup
shuffle = false

[animation]
fade_in_ms = 500
fade_out_ms = 500
# Extra time added to timeout_ms so the fade-out has time to start
allowance_ms = 500

[string_arrays]
examples = [
    "Rust",
    "is",
    "fast",
    "and",
    "fearless",
]

[logging]
# Also write logs to the cache directory
enabled = false
"#;
