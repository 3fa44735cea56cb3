use super::Config;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// `~/.qrlocal`
    pub fn default_dir() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".qrlocal"))
    }

    /// `~/.qrlocal/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::default_dir()?.join("config.toml"))
    }

    /// Resolve `--config` (with `~` expansion) or fall back to the default path.
    pub fn resolve_path(explicit: Option<&str>) -> Result<PathBuf> {
        match explicit {
            Some(raw) if !raw.trim().is_empty() => {
                Ok(PathBuf::from(shellexpand::tilde(raw.trim()).into_owned()))
            }
            _ => Self::default_path(),
        }
    }

    /// Read the config at `path`. A missing file yields the defaults; nothing
    /// is written to disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(dir) = self.config_path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(format!("failed to encode config: {e}")))?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }

    /// Write a fresh default config to `path`.
    pub fn init(path: &Path) -> Result<Self, ConfigError> {
        let config = Self {
            config_path: path.to_path_buf(),
            ..Self::default()
        };
        config.save()?;
        Ok(config)
    }

    pub fn exists(&self) -> bool {
        self.config_path.is_file()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, provider) in self.providers.iter().chain(&self.custom_providers) {
            if provider.host.trim().is_empty() || provider.user.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "provider {name}: host and user must not be empty"
                )));
            }
        }
        Ok(())
    }
}
