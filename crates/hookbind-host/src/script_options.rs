//! Per-script options file parsing (scripts.toml).

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawOptionsFile {
    #[serde(default)]
    pub script: Vec<ScriptSection>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptSection {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub load_priority: i32,
    #[serde(default)]
    pub depend: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

/// Options for one script. Scripts without an entry get `Default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOptions {
    pub enabled: bool,
    /// Higher starts first among scripts whose dependencies are satisfied.
    pub load_priority: i32,
    /// Scripts that must be running before this one starts.
    pub depend: Vec<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            load_priority: 0,
            depend: Vec::new(),
        }
    }
}

/// Parsed scripts.toml.
#[derive(Debug, Default)]
pub struct ScriptOptionsFile {
    entries: Vec<(String, ScriptOptions)>,
}

impl ScriptOptionsFile {
    pub fn parse(toml_content: &str) -> Result<Self, String> {
        let raw: RawOptionsFile =
            toml::from_str(toml_content).map_err(|e| format!("invalid scripts.toml: {e}"))?;

        let mut entries: Vec<(String, ScriptOptions)> = Vec::with_capacity(raw.script.len());
        for section in raw.script {
            let name = section.name.trim().to_string();
            if name.is_empty() {
                return Err("invalid scripts.toml: script entry with empty name".into());
            }
            if entries.iter().any(|(existing, _)| *existing == name) {
                return Err(format!("invalid scripts.toml: duplicate entry for '{name}'"));
            }
            if section.depend.iter().any(|d| *d == name) {
                return Err(format!("invalid scripts.toml: '{name}' depends on itself"));
            }
            entries.push((
                name,
                ScriptOptions {
                    enabled: section.enabled,
                    load_priority: section.load_priority,
                    depend: section.depend,
                },
            ));
        }
        Ok(Self { entries })
    }

    /// A missing file means every script runs with default options.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn get(&self, name: &str) -> Option<&ScriptOptions> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, options)| options)
    }

    pub fn options_for(&self, name: &str) -> ScriptOptions {
        self.get(name).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
