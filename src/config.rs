//! Application settings
//!
//! Stored as TOML in `<config dir>/wiimo/config.toml`:
//!
//! ```text
//! [osc]
//! host = "127.0.0.1"
//! port = 12021
//!
//! [controller]
//! backend = "hid"            # or "simulated"
//! discovery_timeout_secs = 5
//! poll_timeout_ms = 100
//! greeting_rumble_ms = 200
//!
//! [consumer]
//! update_interval_ms = 16
//! config_poll_secs = 2
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every section and field is optional; missing values take their defaults.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::WorkerSettings;
use crate::osc::OscConfig;

const APP_DIR: &str = "wiimo";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid setting {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("No configuration directory available on this system")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Hid,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub backend: BackendKind,
    pub discovery_timeout_secs: u64,
    pub poll_timeout_ms: u64,
    pub greeting_rumble_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            discovery_timeout_secs: 5,
            poll_timeout_ms: 100,
            greeting_rumble_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    // tick period of the consumer loop
    pub update_interval_ms: u64,
    // how often the config file is checked for changes
    pub config_poll_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 16,
            config_poll_secs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub osc: OscConfig,
    pub controller: ControllerConfig,
    pub consumer: ConsumerConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// `<config dir>/wiimo/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &content)
    }

    /// Writes a default settings file at `path` unless one already exists.
    /// Returns true if a file was created.
    pub fn ensure_default(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(&Settings::default())?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote default configuration to {}", path.display());
        Ok(true)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.osc.validate().map_err(|e| ConfigError::Invalid {
            field: "osc",
            message: e.to_string(),
        })?;
        if self.controller.poll_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "controller.poll_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.consumer.update_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "consumer.update_interval_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.consumer.config_poll_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "consumer.config_poll_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            discovery_timeout: Duration::from_secs(self.controller.discovery_timeout_secs),
            poll_timeout: Duration::from_millis(self.controller.poll_timeout_ms),
            greeting_rumble: Duration::from_millis(self.controller.greeting_rumble_ms),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.consumer.update_interval_ms)
    }

    pub fn config_poll_interval(&self) -> Duration {
        Duration::from_secs(self.consumer.config_poll_secs)
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OscOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl OscOverrides {
    pub fn apply(&self, config: &OscConfig) -> OscConfig {
        OscConfig {
            host: self.host.clone().unwrap_or_else(|| config.host.clone()),
            port: self.port.unwrap_or(config.port),
        }
    }
}

/// Publishes the OSC target from a settings file whenever the file changes
///
/// ```text
/// config.toml ──mtime poll──► load ──overrides──► watch::Sender<OscConfig>
/// ```
///
/// A file that fails to load keeps the last good target.
pub struct ConfigWatcher {
    path: PathBuf,
    overrides: OscOverrides,
    interval: Duration,
    tx: watch::Sender<OscConfig>,
}

impl ConfigWatcher {
    pub fn new(
        path: PathBuf,
        overrides: OscOverrides,
        interval: Duration,
        initial: OscConfig,
    ) -> (Self, watch::Receiver<OscConfig>) {
        let (tx, rx) = watch::channel(overrides.apply(&initial));
        (
            Self {
                path,
                overrides,
                interval,
                tx,
            },
            rx,
        )
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run(self, cancel: CancellationToken) {
        let mut last_modified = modified(&self.path).await;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        debug!("Watching {} for changes", self.path.display());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let current = modified(&self.path).await;
            if current.is_none() || current == last_modified {
                continue;
            }
            last_modified = current;
            self.reload().await;
        }

        debug!("Config watcher stopped");
    }

    async fn reload(&self) {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read {}: {}", self.path.display(), e);
                return;
            }
        };

        match Settings::from_toml(&self.path, &content) {
            Ok(settings) => {
                let target = self.overrides.apply(&settings.osc);
                let changed = self.tx.send_if_modified(|current| {
                    if *current == target {
                        false
                    } else {
                        *current = target.clone();
                        true
                    }
                });
                if changed {
                    info!("OSC target changed to {}", target);
                }
            }
            Err(e) => warn!("Ignoring configuration change: {}", e),
        }
    }
}

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .ok()
}
