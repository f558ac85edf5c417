//! YAML configuration loader with caching.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config::types::TrackerConfig;
use crate::config::validator::ConfigValidator;
use crate::error::{Error, Result};

/// Configuration loader with caching.
/// Supports scanning multiple directories (e.g., bundled defaults + user overrides).
/// When names collide, later directories override earlier ones.
pub struct ConfigLoader {
    config_dirs: Vec<PathBuf>,
    cache: Arc<RwLock<HashMap<String, TrackerConfig>>>,
    validator: ConfigValidator,
}

impl ConfigLoader {
    /// Creates a new config loader for a single directory.
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self::new_with_dirs(vec![config_dir.as_ref().to_path_buf()])
    }

    /// Creates a new config loader that searches multiple directories.
    /// Later directories take priority when the same filename exists in several.
    pub fn new_with_dirs(config_dirs: Vec<PathBuf>) -> Self {
        Self {
            config_dirs,
            cache: Arc::new(RwLock::new(HashMap::new())),
            validator: ConfigValidator::new(),
        }
    }

    /// Loads a single config by filename (searches all directories).
    pub fn load(&self, filename: &str) -> Result<TrackerConfig> {
        {
            let cache = self.cache.read().map_err(|_| Error::CacheLock)?;
            if let Some(config) = cache.get(filename) {
                return Ok(config.clone());
            }
        }

        let path = self
            .config_dirs
            .iter()
            .rev()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                Error::ConfigLoad(
                    filename.to_string(),
                    "File not found in any config directory".to_string(),
                )
            })?;

        let config = Self::read_config(&path)?;
        self.validator.validate(&config)?;

        {
            let mut cache = self.cache.write().map_err(|_| Error::CacheLock)?;
            cache.insert(filename.to_string(), config.clone());
        }

        Ok(config)
    }

    /// Loads a config by filename, falling back to defaults when no directory has it.
    /// Parse and validation errors are still reported.
    pub fn load_or_default(&self, filename: &str) -> Result<TrackerConfig> {
        match self.load(filename) {
            Err(Error::ConfigLoad(name, reason)) => {
                tracing::debug!("No tracker config {} ({}), using defaults", name, reason);
                Ok(TrackerConfig::default())
            }
            other => other,
        }
    }

    /// Loads and validates config from a specific path, bypassing the cache.
    pub fn load_from_path(path: &Path) -> Result<TrackerConfig> {
        let config = Self::read_config(path)?;
        ConfigValidator::new().validate(&config)?;
        Ok(config)
    }

    /// Parses a config file, setting the source_path field.
    fn read_config(path: &Path) -> Result<TrackerConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(path.display().to_string(), e.to_string()))?;

        // serde_yaml treats an empty document as null rather than an empty mapping
        let mut config: TrackerConfig = if content.trim().is_empty() {
            TrackerConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::ConfigParse(path.display().to_string(), e.to_string()))?
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Clears the config cache.
    pub fn clear_cache(&self) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| Error::CacheLock)?;
        cache.clear();
        Ok(())
    }

    /// Returns all config directories.
    pub fn config_dirs(&self) -> &[PathBuf] {
        &self.config_dirs
    }
}
