pub mod agenda;
pub mod config;
pub mod error;
pub mod host;
pub mod manual;
pub mod paths;
pub mod rotator;
pub mod scheduler;
pub mod texts;
pub mod time;

pub use agenda::{Agenda, TimerId};
pub use config::{
    AnimationConfig, FadeTextConfig, LoggingConfig, RotationConfig, CONFIG_TEMPLATE,
    DEFAULT_CONFIGURED_TIMEOUT_MS,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use error::{CoreError, InvalidConfiguration, Result};
pub use host::{CycleToken, Fade, Host, Wake};
pub use manual::{HostCall, ManualHost};
pub use paths::{config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use rotator::{RotationEvent, Rotator, RotatorHandle, RotatorSnapshot, TokioHost};
pub use scheduler::{LifecycleFlags, RotatingTextScheduler, SchedulerState, DEFAULT_TIMEOUT};
pub use texts::{NoStringArrays, StringArrays, TextSet};
pub use time::{DurationExt, TimeUnit};
