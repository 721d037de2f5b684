use hookbind_api::HookError;

use crate::hooks::Hooks;

/// Script metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl ScriptInfo {
    pub fn new(name: &str, version: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
        }
    }
}

/// A script the host can start and stop.
pub trait Script {
    /// Return script metadata.
    fn info(&self) -> ScriptInfo;

    /// Called when the script starts. Everything registered through `hooks`
    /// belongs to this script and is released when it unloads, or rolled back
    /// if this returns an error.
    fn on_start(&mut self, hooks: &mut Hooks<'_>) -> Result<(), HookError>;

    /// Called before the script's registrations are released.
    fn on_stop(&mut self) {}
}
