//! Script manager: starts scripts in dependency order and unloads them again.
//!
//! Every start fires `ScriptLoadEvent` and every unload fires
//! `ScriptUnloadEvent` on the event bus, so scripts can watch each other.

use hookbind_api::{HookError, ScriptEvent};
use hookbind_core::{Hooks, RegistrationFacade, Script, ScriptInfo};
use serde_json::json;
use tracing::{error, info, warn};

use crate::actions::PendingAction;
use crate::managers::HostManagers;
use crate::script_options::{ScriptOptions, ScriptOptionsFile};

/// Fired after a script started. Data: `{"script": name}`.
pub const LOAD_EVENT: &str = "ScriptLoadEvent";
/// Fired before a script's registrations are released. Data:
/// `{"script": name, "error": bool}`, where `error` marks a failed start.
pub const UNLOAD_EVENT: &str = "ScriptUnloadEvent";

struct LoadedScript {
    info: ScriptInfo,
    script: Box<dyn Script>,
}

/// Owns every script object, running or not.
#[derive(Default)]
pub struct ScriptManager {
    scripts: Vec<LoadedScript>,
    /// Names of running scripts, in start order.
    running: Vec<String>,
    /// Queued by lifecycle event listeners, applied by the host.
    actions: Vec<PendingAction>,
}

impl ScriptManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script (call before start_all). A script with the same name replaces
    /// the old one unless it is running.
    pub fn add(&mut self, script: Box<dyn Script>) {
        let info = script.info();
        if self.is_running(&info.name) {
            warn!("Script {} is running, ignoring new copy", info.name);
            return;
        }
        self.scripts.retain(|s| s.info.name != info.name);
        info!("Added script: {} v{}", info.name, info.version);
        self.scripts.push(LoadedScript { info, script });
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.iter().any(|r| r == name)
    }

    pub fn running(&self) -> &[String] {
        &self.running
    }

    pub fn infos(&self) -> Vec<&ScriptInfo> {
        self.scripts.iter().map(|s| &s.info).collect()
    }

    pub fn info(&self, name: &str) -> Option<&ScriptInfo> {
        self.scripts.iter().map(|s| &s.info).find(|info| info.name == name)
    }

    /// Actions queued by lifecycle event listeners since the last call.
    pub fn take_actions(&mut self) -> Vec<PendingAction> {
        std::mem::take(&mut self.actions)
    }

    fn fire(&mut self, managers: &mut HostManagers, event: &str, data: serde_json::Value) {
        let tick = managers.scheduler.current_tick();
        let mut event = ScriptEvent::new(event, data);
        let actions = managers.events.dispatch(&mut event, tick);
        self.actions.extend(actions);
    }

    /// Start every enabled script that is not running yet.
    ///
    /// Dependencies start first. Among scripts whose dependencies are running,
    /// higher `load_priority` goes first, then name. Returns the scripts that
    /// failed and why.
    pub fn start_all(
        &mut self,
        facade: &mut RegistrationFacade,
        managers: &mut HostManagers,
        options: &ScriptOptionsFile,
    ) -> Vec<(String, HookError)> {
        let mut failures: Vec<(String, HookError)> = Vec::new();
        let mut pending: Vec<(String, ScriptOptions)> = Vec::new();
        for loaded in &self.scripts {
            let name = &loaded.info.name;
            if self.is_running(name) {
                continue;
            }
            let opts = options.options_for(name);
            if !opts.enabled {
                info!("Script {name} is disabled, skipping");
                continue;
            }
            pending.push((name.clone(), opts));
        }

        loop {
            self.drop_unsatisfiable(&mut pending, &mut failures);
            if pending.is_empty() {
                break;
            }

            let next = pending
                .iter()
                .enumerate()
                .filter(|(_, (_, opts))| opts.depend.iter().all(|d| self.is_running(d)))
                .min_by(|(_, (a, a_opts)), (_, (b, b_opts))| {
                    b_opts
                        .load_priority
                        .cmp(&a_opts.load_priority)
                        .then_with(|| a.cmp(b))
                })
                .map(|(i, _)| i);

            let Some(index) = next else {
                for (name, _) in pending.drain(..) {
                    let err = HookError::ScriptDependency(format!(
                        "'{name}' is blocked by a dependency cycle"
                    ));
                    error!("Cannot start script {name}: {err}");
                    failures.push((name, err));
                }
                break;
            };

            let (name, _) = pending.remove(index);
            if let Err(e) = self.start(&name, facade, managers) {
                failures.push((name, e));
            }
        }

        failures
    }

    /// Fail every pending script with a dependency that is neither running
    /// nor still pending. Repeats until nothing changes, so dependents of a
    /// failed script fail too.
    fn drop_unsatisfiable(
        &self,
        pending: &mut Vec<(String, ScriptOptions)>,
        failures: &mut Vec<(String, HookError)>,
    ) {
        let mut changed = true;
        while changed {
            changed = false;
            for i in (0..pending.len()).rev() {
                let blocker = pending[i]
                    .1
                    .depend
                    .iter()
                    .find(|d| !self.is_running(d) && !pending.iter().any(|(n, _)| n == *d))
                    .cloned();
                let Some(dep) = blocker else {
                    continue;
                };
                let (name, _) = pending.remove(i);
                let err = if failures.iter().any(|(n, _)| *n == dep) {
                    HookError::ScriptDependency(format!(
                        "'{name}' depends on '{dep}', which failed to start"
                    ))
                } else {
                    HookError::ScriptDependency(format!(
                        "'{name}' depends on '{dep}', which is missing or disabled"
                    ))
                };
                error!("Cannot start script {name}: {err}");
                failures.push((name, err));
                changed = true;
            }
        }
    }

    /// Run the script's `on_start`. On error every registration it made is
    /// rolled back and the error is returned.
    pub fn start(
        &mut self,
        name: &str,
        facade: &mut RegistrationFacade,
        managers: &mut HostManagers,
    ) -> Result<(), HookError> {
        if self.is_running(name) {
            return Ok(());
        }
        let result = {
            let loaded = self
                .scripts
                .iter_mut()
                .find(|s| s.info.name == name)
                .ok_or_else(|| HookError::ScriptDependency(format!("no script named '{name}'")))?;
            let mut hooks = Hooks::new(facade, managers, name);
            loaded.script.on_start(&mut hooks)
        };

        match result {
            Ok(()) => {
                info!(
                    "Started script {} ({} registrations)",
                    name,
                    facade.registrations(name).len()
                );
                self.running.push(name.to_string());
                self.fire(managers, LOAD_EVENT, json!({ "script": name }));
                Ok(())
            }
            Err(e) => {
                self.fire(managers, UNLOAD_EVENT, json!({ "script": name, "error": true }));
                let released = facade.unload_script(managers, name);
                error!("Failed to start script {name}: {e}");
                if released > 0 {
                    warn!("Rolled back {released} registrations of {name}");
                }
                Err(e)
            }
        }
    }

    /// Stop a running script and release all of its registrations.
    /// Returns false if it was not running.
    pub fn unload(
        &mut self,
        name: &str,
        facade: &mut RegistrationFacade,
        managers: &mut HostManagers,
    ) -> bool {
        let Some(pos) = self.running.iter().position(|r| r == name) else {
            return false;
        };
        self.fire(managers, UNLOAD_EVENT, json!({ "script": name, "error": false }));
        self.running.remove(pos);
        if let Some(loaded) = self.scripts.iter_mut().find(|s| s.info.name == name) {
            loaded.script.on_stop();
        }
        let released = facade.unload_script(managers, name);
        info!("Unloaded script {name} ({released} registrations released)");
        true
    }

    /// Start one script whose dependencies are already running. Ignores the
    /// `enabled` option, since the caller asked for this script by name.
    pub fn load(
        &mut self,
        name: &str,
        facade: &mut RegistrationFacade,
        managers: &mut HostManagers,
        options: &ScriptOptionsFile,
    ) -> Result<(), HookError> {
        let opts = options.options_for(name);
        if let Some(dep) = opts.depend.iter().find(|d| !self.is_running(d)) {
            let err = HookError::ScriptDependency(format!(
                "'{name}' depends on '{dep}', which is not running"
            ));
            error!("Cannot load script {name}: {err}");
            return Err(err);
        }
        self.start(name, facade, managers)
    }

    /// Unload `name` if it is running, then load it again.
    pub fn reload(
        &mut self,
        name: &str,
        facade: &mut RegistrationFacade,
        managers: &mut HostManagers,
        options: &ScriptOptionsFile,
    ) -> Result<(), HookError> {
        self.unload(name, facade, managers);
        self.load(name, facade, managers, options)
    }

    /// Unload every running script, last started first.
    pub fn unload_all(&mut self, facade: &mut RegistrationFacade, managers: &mut HostManagers) {
        let order: Vec<String> = self.running.iter().rev().cloned().collect();
        for name in order {
            self.unload(&name, facade, managers);
        }
    }
}
