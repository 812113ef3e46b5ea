use std::path::Path;

use ownerless_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::CliArgs;

/// Errors raised while loading the host configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Frame loop settings for the demo host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Frames to run before exiting.
    #[serde(default = "default_frames")]
    pub frames: u64,
    /// Simulated frame length in milliseconds.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
    /// Sleep between frames instead of running flat out.
    #[serde(default)]
    pub realtime: bool,
}

fn default_frames() -> u64 {
    120
}

fn default_frame_ms() -> u64 {
    16
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            frame_ms: default_frame_ms(),
            realtime: false,
        }
    }
}

/// Host configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub host: HostConfig,
}

impl CliConfig {
    /// Load from `path` if given, otherwise start from defaults. Then the
    /// `OWNERLESS_*` environment overrides are applied to the scheduler section.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(Path::new(path))?,
            None => {
                debug!("No config file given, using defaults");
                Self::default()
            }
        };
        config.scheduler = config.scheduler.with_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Command-line flags win over file and environment.
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(frames) = args.frames {
            self.host.frames = frames;
        }
        if let Some(frame_ms) = args.frame_ms {
            self.host.frame_ms = frame_ms;
        }
        if args.realtime {
            self.host.realtime = true;
        }
        if args.trace_steps {
            self.scheduler.trace_steps = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.frames == 0 {
            return Err(ConfigError::Invalid("host.frames must be at least 1".into()));
        }
        if self.host.frame_ms == 0 {
            return Err(ConfigError::Invalid("host.frame_ms must be at least 1".into()));
        }
        Ok(())
    }
}
