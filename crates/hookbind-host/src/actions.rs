//! Deferred side effects requested by script callbacks.

use hookbind_api::{LogLevel, RegistrationId, ScriptApi};
use tracing::{debug, error, info, warn};

/// Side effect requested by a script during a callback, applied after it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    SendMessage {
        target: String,
        message: String,
    },
    BroadcastMessage {
        message: String,
    },
    Unregister {
        script: String,
        registration: RegistrationId,
    },
}

// ─── ScriptApiImpl ───────────────────────────────────────────────────────────

/// Implements `ScriptApi` for one callback: reads come from the tick counter,
/// writes accumulate as `PendingAction`s.
pub struct ScriptApiImpl<'a> {
    script: &'a str,
    tick: u64,
    actions: Vec<PendingAction>,
}

impl<'a> ScriptApiImpl<'a> {
    pub fn new(script: &'a str, tick: u64) -> Self {
        Self {
            script,
            tick,
            actions: Vec::new(),
        }
    }

    pub fn take_actions(self) -> Vec<PendingAction> {
        self.actions
    }
}

impl ScriptApi for ScriptApiImpl<'_> {
    fn script_name(&self) -> &str {
        self.script
    }

    fn current_tick(&self) -> u64 {
        self.tick
    }

    fn send_message(&mut self, target: &str, message: &str) {
        self.actions.push(PendingAction::SendMessage {
            target: target.to_string(),
            message: message.to_string(),
        });
    }

    fn broadcast_message(&mut self, message: &str) {
        self.actions.push(PendingAction::BroadcastMessage {
            message: message.to_string(),
        });
    }

    fn log(&self, level: LogLevel, message: &str) {
        let script = self.script;
        match level {
            LogLevel::Info => info!("[{script}] {message}"),
            LogLevel::Warn => warn!("[{script}] {message}"),
            LogLevel::Error => error!("[{script}] {message}"),
            LogLevel::Debug => debug!("[{script}] {message}"),
        }
    }

    fn unregister(&mut self, registration: RegistrationId) {
        self.actions.push(PendingAction::Unregister {
            script: self.script.to_string(),
            registration,
        });
    }
}

/// Run `f` with a fresh `ScriptApiImpl` and return the actions it queued.
pub fn with_api<R>(
    script: &str,
    tick: u64,
    f: impl FnOnce(&mut dyn ScriptApi) -> R,
) -> (R, Vec<PendingAction>) {
    let mut api = ScriptApiImpl::new(script, tick);
    let result = f(&mut api);
    (result, api.take_actions())
}
