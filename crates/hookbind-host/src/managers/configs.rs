//! File-backed script config store rooted at the configs directory.

use std::path::{Component, Path, PathBuf};

use hookbind_api::{ConfigManager, HookError, ScriptConfig};
use tracing::debug;

pub struct FileConfigStore {
    root: PathBuf,
}

impl FileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths are relative to the configs directory and may not leave it.
    fn resolve(&self, path: &str) -> Result<PathBuf, HookError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(HookError::Config(format!(
                "config path '{path}' must stay inside the configs directory"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ConfigManager for FileConfigStore {
    fn load_config(
        &mut self,
        path: &str,
        defaults: Option<&str>,
    ) -> Result<ScriptConfig, HookError> {
        let file = self.resolve(path)?;
        if !file.exists() {
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file, "")?;
            debug!("Created config file {}", file.display());
        }
        let contents = std::fs::read_to_string(&file)?;
        let config = ScriptConfig::parse(path, &contents)?;
        match defaults {
            Some(defaults) => config.with_defaults(defaults),
            None => Ok(config),
        }
    }

    fn save_config(&mut self, config: &ScriptConfig) -> Result<(), HookError> {
        let file = self.resolve(config.path())?;
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file, config.to_toml_string()?)?;
        Ok(())
    }

    fn config_exists(&self, path: &str) -> bool {
        self.resolve(path).map(|file| file.exists()).unwrap_or(false)
    }

    fn delete_config(&mut self, path: &str) -> Result<bool, HookError> {
        let file = self.resolve(path)?;
        if !file.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&file)?;
        Ok(true)
    }
}
