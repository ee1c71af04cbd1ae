use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main dockhook configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    /// Append logs to this file instead of stderr
    pub log_file: Option<PathBuf>,
    pub server: ServerConfig,
    pub hooks: HooksConfig,
    pub secret: SecretConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Directory scanned for executable hook scripts
    pub dir: PathBuf,
    /// Per-hook deadline; no deadline when unset
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretConfig {
    /// Secret name, looked up as `<secrets_dir>/<name>` then `$NAME`
    pub name: String,
    pub secrets_dir: PathBuf,
    /// Require callers to present the secret
    pub require: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// YAML repository policy file
    pub file: PathBuf,
    /// Tags allowed for repositories that declare no `tags` list
    pub default_tags: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_file: None,
            server: ServerConfig::default(),
            hooks: HooksConfig::default(),
            secret: SecretConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/app/hooks"),
            timeout_secs: None,
        }
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            name: "webhook_secret".to_string(),
            secrets_dir: PathBuf::from("/run/secrets"),
            require: false,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("config.yml"),
            default_tags: vec!["latest".to_string()],
        }
    }
}

impl HooksConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.expand_paths();
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("DOCKHOOK_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Self::load_from_file(&path)
                    .context(format!("Failed to load config from DOCKHOOK_CONFIG ({})", path.display()));
            }
            log::warn!("DOCKHOOK_CONFIG points at missing file: {}", path.display());
        }

        let local_config = PathBuf::from("dockhook.yaml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("dockhook").join("dockhook.yaml");
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;

        // An empty file is a valid "all defaults" config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply the `WEBHOOK_*` environment settings on top of the file config
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("WEBHOOK_HOOKS_DIR") {
            self.hooks.dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("WEBHOOK_POLICY_FILE") {
            self.policy.file = PathBuf::from(file);
        }
        if let Some(bind) = lookup("WEBHOOK_BIND") {
            self.server.bind = bind;
        }
    }

    fn expand_paths(&mut self) {
        self.hooks.dir = Self::expand_path(&self.hooks.dir);
        self.secret.secrets_dir = Self::expand_path(&self.secret.secrets_dir);
        self.policy.file = Self::expand_path(&self.policy.file);
        self.log_file = self.log_file.as_deref().map(Self::expand_path);
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
