use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub integrations: IntegrationsSection,
    #[serde(default)]
    pub paths: PathsSection,
}

#[derive(Debug, Deserialize)]
pub struct HostSection {
    /// Milliseconds per scheduler tick. Default: 50 (20 ticks per second).
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

fn default_tick_millis() -> u64 {
    50
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            tick_millis: default_tick_millis(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Optional integrations. A disabled integration has no manager, and hooks
/// that need it fail to register.
#[derive(Debug, Deserialize)]
pub struct IntegrationsSection {
    #[serde(default = "default_true")]
    pub protocol: bool,
    #[serde(default = "default_true")]
    pub placeholders: bool,
    #[serde(default = "default_true")]
    pub pubsub: bool,
}

fn default_true() -> bool {
    true
}

impl Default for IntegrationsSection {
    fn default() -> Self {
        Self {
            protocol: true,
            placeholders: true,
            pubsub: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_configs_dir")]
    pub configs: String,
    #[serde(default = "default_scripts_file")]
    pub scripts: String,
}

fn default_configs_dir() -> String {
    "configs".into()
}

fn default_scripts_file() -> String {
    "scripts.toml".into()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            configs: default_configs_dir(),
            scripts: default_scripts_file(),
        }
    }
}

impl HostConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config() {
        let toml_str = r#"
            [host]
            tick_millis = 25

            [logging]
            level = "debug"

            [integrations]
            protocol = false
            placeholders = true
            pubsub = false

            [paths]
            configs = "data/configs"
            scripts = "data/scripts.toml"
        "#;
        let config: HostConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host.tick_millis, 25);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.integrations.protocol);
        assert!(config.integrations.placeholders);
        assert!(!config.integrations.pubsub);
        assert_eq!(config.paths.configs, "data/configs");
        assert_eq!(config.paths.scripts, "data/scripts.toml");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: HostConfig = toml::from_str("").unwrap();
        assert_eq!(config.host.tick_millis, 50);
        assert_eq!(config.logging.level, "info");
        assert!(config.integrations.protocol);
        assert!(config.integrations.placeholders);
        assert!(config.integrations.pubsub);
        assert_eq!(config.paths.configs, "configs");
        assert_eq!(config.paths.scripts, "scripts.toml");
    }

    #[test]
    fn partial_sections_fill_missing_keys() {
        let toml_str = r#"
            [integrations]
            placeholders = false
        "#;
        let config: HostConfig = toml::from_str(toml_str).unwrap();
        assert!(config.integrations.protocol);
        assert!(!config.integrations.placeholders);
    }

    #[test]
    fn load_missing_file_fails() {
        let path = std::env::temp_dir().join("hookbind_no_such_host.toml");
        assert!(HostConfig::load(&path).is_err());
    }
}
