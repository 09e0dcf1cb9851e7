use crate::common::ConfigError;
use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

pub const PLACEHOLDER_PROJECT: &str = "your-project-id";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_CLI: &str = "gcloud";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

const ENV_PREFIX: &str = "GCC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project_id: String,
    pub location: String,
    pub build_bucket: String,
    pub container_registry: String,
    pub default_region: String,
    pub log_level: String,
    pub max_log_entries: u32,
    pub refresh_interval_secs: u64,
    pub command_timeout_secs: u64,
    pub cli_executable: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: std::env::var("GOOGLE_CLOUD_PROJECT")
                .unwrap_or_else(|_| PLACEHOLDER_PROJECT.to_string()),
            location: DEFAULT_LOCATION.to_string(),
            build_bucket: "your-build-bucket".to_string(),
            container_registry: "gcr.io".to_string(),
            default_region: DEFAULT_LOCATION.to_string(),
            log_level: "INFO".to_string(),
            max_log_entries: 100,
            refresh_interval_secs: 30,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            cli_executable: DEFAULT_CLI.to_string(),
        }
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, then the optional TOML file, then `GCC_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn has_placeholder_project(&self) -> bool {
        self.project_id.is_empty() || self.project_id == PLACEHOLDER_PROJECT
    }
}

/// Process-wide settings, shared by `Arc` and read by every dispatch worker.
///
/// Writers and readers never coordinate beyond the lock; consumers re-read on demand.
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: RwLock<Config>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    pub fn snapshot(&self) -> Config {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut Config) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn project_id(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .project_id
            .clone()
    }

    pub fn set_project_id(&self, project_id: impl Into<String>) {
        let project_id = project_id.into();
        self.with_mut(|c| c.project_id = project_id);
    }

    pub fn location(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .location
            .clone()
    }

    pub fn set_location(&self, location: impl Into<String>) {
        let location = location.into();
        self.with_mut(|c| c.location = location);
    }

    /// Reads one setting by name.
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self.snapshot()) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        let mut updates = Map::new();
        updates.insert(key.to_string(), value);
        self.update(updates)
    }

    /// Applies several settings at once. Either all apply or none do.
    pub fn update(&self, updates: Map<String, Value>) -> Result<(), ConfigError> {
        self.with_mut(|config| {
            let mut current = match serde_json::to_value(&*config)? {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            for (key, value) in updates {
                if !current.contains_key(&key) {
                    return Err(ConfigError::UnknownKey(key));
                }
                // Check each value on its own so the error can name the offending key.
                let mut probe = current.clone();
                probe.insert(key.clone(), value.clone());
                serde_json::from_value::<Config>(Value::Object(probe))
                    .map_err(|source| ConfigError::InvalidValue {
                        key: key.clone(),
                        source,
                    })?;
                current.insert(key, value);
            }
            *config = serde_json::from_value(Value::Object(current))?;
            Ok(())
        })
    }

    /// Writes the current settings as pretty JSON. Without a path a timestamped
    /// file name in the working directory is used.
    pub fn create_backup(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(format!(
                "gcloud_config_backup_{}.json",
                Local::now().format("%Y%m%d_%H%M%S")
            )),
        };
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load_backup(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn restore(&self, path: &Path) -> Result<(), ConfigError> {
        let restored = Self::load_backup(path)?;
        self.with_mut(|c| *c = restored);
        Ok(())
    }
}
