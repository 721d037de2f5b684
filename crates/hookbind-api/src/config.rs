//! Script config documents: a TOML table addressed by dotted keys.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::HookError;

/// A loaded config document and the path it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptConfig {
    path: String,
    root: toml::Table,
}

impl ScriptConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            root: toml::Table::new(),
        }
    }

    pub fn parse(path: impl Into<String>, source: &str) -> Result<Self, HookError> {
        let root: toml::Table = source
            .parse()
            .map_err(|e: toml::de::Error| HookError::Config(e.to_string()))?;
        Ok(Self {
            path: path.into(),
            root,
        })
    }

    /// Path relative to the host's configs directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Copy every key of `defaults` that this document lacks. Existing values win.
    pub fn with_defaults(mut self, defaults: &str) -> Result<Self, HookError> {
        let defaults: toml::Table = defaults
            .parse()
            .map_err(|e: toml::de::Error| HookError::Config(format!("defaults: {e}")))?;
        merge_missing(&mut self.root, defaults);
        Ok(self)
    }

    /// Typed lookup by dotted key. `Ok(None)` if the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, HookError> {
        match self.value(key) {
            Some(value) => value
                .clone()
                .try_into()
                .map(Some)
                .map_err(|e: toml::de::Error| HookError::Config(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    /// Like `get`, falling back to `default` when the key is absent or has the wrong type.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).ok().flatten().unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Set a value by dotted key, creating intermediate tables.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), HookError> {
        let value = toml::Value::try_from(value)
            .map_err(|e| HookError::Config(format!("{key}: {e}")))?;
        let (parents, leaf) = split_key(key)?;

        let mut table = &mut self.root;
        for part in parents {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            table = match entry {
                toml::Value::Table(inner) => inner,
                _ => {
                    return Err(HookError::Config(format!(
                        "{key}: '{part}' is not a table"
                    )))
                }
            };
        }
        table.insert(leaf.to_string(), value);
        Ok(())
    }

    /// Remove a key. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let Ok((parents, leaf)) = split_key(key) else {
            return false;
        };
        let mut table = &mut self.root;
        for part in parents {
            match table.get_mut(part) {
                Some(toml::Value::Table(inner)) => table = inner,
                _ => return false,
            }
        }
        table.remove(leaf).is_some()
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.root.keys().cloned().collect()
    }

    pub fn to_toml_string(&self) -> Result<String, HookError> {
        toml::to_string_pretty(&self.root).map_err(|e| HookError::Config(e.to_string()))
    }

    fn value(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }
}

fn split_key(key: &str) -> Result<(Vec<&str>, &str), HookError> {
    let mut parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(HookError::Config(format!("invalid key '{key}'")));
    }
    // split always yields at least one part
    let leaf = parts.pop().unwrap_or_default();
    Ok((parts, leaf))
}

fn merge_missing(target: &mut toml::Table, defaults: toml::Table) {
    for (key, default) in defaults {
        match (target.get_mut(&key), default) {
            (None, default) => {
                target.insert(key, default);
            }
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_missing(existing, nested);
            }
            _ => {}
        }
    }
}
