//! The simulated host: managers, scripts and the façade in one place, plus
//! the deferred-action queue that script callbacks write to.

use std::fmt;

use hookbind_api::{
    CommandSender, HookError, PacketEvent, PluginMessage, RegistrationId, ScriptEvent,
};
use hookbind_core::{Hooks, RegistrationFacade, Script};
use tracing::{debug, info, warn};

use crate::actions::PendingAction;
use crate::config::HostConfig;
use crate::managers::commands::CommandResult;
use crate::managers::HostManagers;
use crate::script_manager::ScriptManager;
use crate::script_options::ScriptOptionsFile;

/// A message a script sent. `target == None` means broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub target: Option<String>,
    pub message: String,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "[to {target}] {}", self.message),
            None => write!(f, "[broadcast] {}", self.message),
        }
    }
}

pub struct ServerHost {
    facade: RegistrationFacade,
    managers: HostManagers,
    scripts: ScriptManager,
    options: ScriptOptionsFile,
    outbox: Vec<Delivery>,
}

impl ServerHost {
    pub fn new(config: &HostConfig, options: ScriptOptionsFile) -> Self {
        Self {
            facade: RegistrationFacade::new(),
            managers: HostManagers::new(config),
            scripts: ScriptManager::new(),
            options,
            outbox: Vec::new(),
        }
    }

    pub fn facade(&self) -> &RegistrationFacade {
        &self.facade
    }

    pub fn managers(&self) -> &HostManagers {
        &self.managers
    }

    pub fn scripts(&self) -> &ScriptManager {
        &self.scripts
    }

    pub fn current_tick(&self) -> u64 {
        self.managers.scheduler.current_tick()
    }

    /// Registration context for `script` outside of its `on_start`.
    pub fn hooks<'a>(&'a mut self, script: &'a str) -> Hooks<'a> {
        Hooks::new(&mut self.facade, &mut self.managers, script)
    }

    // ─── Script lifecycle ────────────────────────────────────────────────

    pub fn add_script(&mut self, script: Box<dyn Script>) {
        self.scripts.add(script);
    }

    pub fn start_all(&mut self) -> Vec<(String, HookError)> {
        let failures = self
            .scripts
            .start_all(&mut self.facade, &mut self.managers, &self.options);
        self.apply_lifecycle_actions();
        failures
    }

    /// Start one added script by name.
    pub fn load(&mut self, script: &str) -> Result<(), HookError> {
        let result = self
            .scripts
            .load(script, &mut self.facade, &mut self.managers, &self.options);
        self.apply_lifecycle_actions();
        result
    }

    pub fn reload(&mut self, script: &str) -> Result<(), HookError> {
        let result = self
            .scripts
            .reload(script, &mut self.facade, &mut self.managers, &self.options);
        self.apply_lifecycle_actions();
        result
    }

    /// Unload every script, then start every enabled one again.
    pub fn reload_all(&mut self) -> Vec<(String, HookError)> {
        self.scripts.unload_all(&mut self.facade, &mut self.managers);
        self.start_all()
    }

    pub fn unload(&mut self, script: &str) -> bool {
        let unloaded = self
            .scripts
            .unload(script, &mut self.facade, &mut self.managers);
        self.apply_lifecycle_actions();
        unloaded
    }

    /// Unload every running script, then release registrations made through
    /// [`hooks`](Self::hooks) under names no script manager knows about.
    pub fn unload_all(&mut self) {
        self.scripts.unload_all(&mut self.facade, &mut self.managers);
        self.apply_lifecycle_actions();
        for owner in self.facade.owners() {
            let released = self.facade.unload_script(&mut self.managers, &owner);
            info!("Released {released} registrations held by {owner}");
        }
    }

    fn apply_lifecycle_actions(&mut self) {
        let actions = self.scripts.take_actions();
        self.apply_actions(actions);
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Dispatch an event. Check `event.is_cancelled()` afterwards.
    pub fn fire_event(&mut self, event: &mut ScriptEvent) {
        let tick = self.current_tick();
        let actions = self.managers.events.dispatch(event, tick);
        self.apply_actions(actions);
    }

    /// Returns `None` when no script command owns the label.
    pub fn run_command(&mut self, sender: &CommandSender, line: &str) -> Option<CommandResult> {
        let tick = self.current_tick();
        let mut result = self.managers.commands.execute(sender, line, tick)?;
        let actions = std::mem::take(&mut result.actions);
        self.apply_actions(actions);
        Some(result)
    }

    pub fn tab_complete(&mut self, sender: &CommandSender, line: &str) -> Vec<String> {
        let tick = self.current_tick();
        self.managers.commands.tab_complete(sender, line, tick)
    }

    /// Pass a packet through the protocol listeners. Does nothing when the
    /// protocol integration is disabled.
    pub fn intercept_packet(&mut self, packet: &mut PacketEvent) {
        let tick = self.current_tick();
        let Some(protocol) = self.managers.protocol.as_mut() else {
            debug!("Protocol integration disabled, {} not intercepted", packet.packet_type);
            return;
        };
        let actions = protocol.intercept(packet, tick);
        self.apply_actions(actions);
    }

    pub fn request_placeholder(
        &mut self,
        identifier: &str,
        player: Option<&str>,
        params: &str,
    ) -> Option<String> {
        self.managers
            .placeholders
            .as_mut()?
            .request(identifier, player, params)
    }

    pub fn request_relational(
        &mut self,
        identifier: &str,
        first: &str,
        second: &str,
        params: &str,
    ) -> Option<String> {
        self.managers
            .placeholders
            .as_mut()?
            .request_relational(identifier, first, second, params)
    }

    /// Expand `%identifier_params%` placeholders in `text`. Returned unchanged
    /// when the placeholder integration is disabled.
    pub fn resolve_placeholders(&mut self, text: &str, player: Option<&str>) -> String {
        match self.managers.placeholders.as_mut() {
            Some(placeholders) => placeholders.resolve_text(text, player),
            None => text.to_string(),
        }
    }

    pub fn deliver_message(&mut self, message: &PluginMessage) {
        let tick = self.current_tick();
        let actions = self.managers.messages.deliver(message, tick);
        self.apply_actions(actions);
    }

    /// Publish on a pub/sub channel. Returns the number of subscribers the
    /// message reached, or `None` when the pub/sub integration is disabled.
    pub fn publish(&mut self, channel: &str, message: &str) -> Option<usize> {
        let tick = self.current_tick();
        let pubsub = self.managers.pubsub.as_mut()?;
        let reached = pubsub.subscribers(channel);
        let actions = pubsub.publish(channel, message, tick);
        self.apply_actions(actions);
        Some(reached)
    }

    /// Advance the scheduler one tick, then forget one-shot tasks that finished.
    pub fn tick(&mut self) {
        let actions = self.managers.scheduler.tick();
        self.apply_actions(actions);
        let reaped = self.facade.reap_finished_tasks(&mut self.managers);
        if reaped > 0 {
            debug!("Tick {}: {reaped} finished tasks released", self.current_tick());
        }
    }

    // ─── Outbox ──────────────────────────────────────────────────────────

    pub fn outbox(&self) -> &[Delivery] {
        &self.outbox
    }

    pub fn drain_outbox(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox)
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    /// Apply actions queued by script callbacks.
    pub fn apply_actions(&mut self, actions: Vec<PendingAction>) {
        for action in actions {
            match action {
                PendingAction::SendMessage { target, message } => {
                    debug!("Queued message to {target}");
                    self.outbox.push(Delivery {
                        target: Some(target),
                        message,
                    });
                }
                PendingAction::BroadcastMessage { message } => {
                    debug!("Queued broadcast");
                    self.outbox.push(Delivery {
                        target: None,
                        message,
                    });
                }
                PendingAction::Unregister {
                    script,
                    registration,
                } => self.unregister_for(&script, registration),
            }
        }
    }

    /// Scripts may only release their own registrations.
    fn unregister_for(&mut self, script: &str, id: RegistrationId) {
        let owner = self.facade.describe(id).map(|info| info.script.to_string());
        match owner {
            Some(owner) if owner == script => {
                self.facade.unregister(&mut self.managers, id);
            }
            Some(owner) => {
                warn!("Script {script} tried to unregister {id}, which belongs to {owner}");
            }
            None => debug!("Script {script} unregistered {id}, already gone"),
        }
    }
}
