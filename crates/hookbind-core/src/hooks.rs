//! `Hooks`: the registration context a script receives while it starts.
//!
//! Each method pairs a hook descriptor with a closure and registers it on
//! behalf of the script the context is bound to.

use hookbind_api::{
    Callback, CommandInvocation, CommandSpec, ConfigManager, EventPriority, ExecutionMode,
    HookDescriptor, HookError, Managers, PacketDirection, PacketEvent, PacketFlow, PacketListener,
    PlaceholderRequest, PluginMessage, PubSubMessage, RelationalRequest, ScriptApi, ScriptEvent,
};

use crate::facade::RegistrationFacade;
use crate::registration::Registration;

const DEFAULT_AUTHOR: &str = "Script Author";
const DEFAULT_VERSION: &str = "1.0.0";

/// Registration context bound to one script.
pub struct Hooks<'a> {
    facade: &'a mut RegistrationFacade,
    managers: &'a mut dyn Managers,
    script: &'a str,
}

impl<'a> Hooks<'a> {
    pub fn new(
        facade: &'a mut RegistrationFacade,
        managers: &'a mut dyn Managers,
        script: &'a str,
    ) -> Self {
        Self {
            facade,
            managers,
            script,
        }
    }

    pub fn script(&self) -> &str {
        self.script
    }

    pub fn facade(&self) -> &RegistrationFacade {
        self.facade
    }

    fn register(
        &mut self,
        descriptor: HookDescriptor,
        callback: Callback,
    ) -> Result<Registration, HookError> {
        self.facade
            .register(self.managers, self.script, descriptor, callback)
    }

    // ─── Events ──────────────────────────────────────────────────────────

    pub fn event_listener<F>(
        &mut self,
        event: &str,
        priority: EventPriority,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut ScriptEvent, &mut dyn ScriptApi) + 'static,
    {
        self.event_listener_with(event, priority, false, f)
    }

    /// Like `event_listener`, but skipped once the event has been cancelled
    /// when `ignore_cancelled` is set.
    pub fn event_listener_with<F>(
        &mut self,
        event: &str,
        priority: EventPriority,
        ignore_cancelled: bool,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut ScriptEvent, &mut dyn ScriptApi) + 'static,
    {
        self.register(
            HookDescriptor::Event {
                event: event.to_string(),
                priority,
                ignore_cancelled,
            },
            Callback::Event(Box::new(f)),
        )
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn command<F>(&mut self, spec: CommandSpec, f: F) -> Result<Registration, HookError>
    where
        F: FnMut(&CommandInvocation, &mut dyn ScriptApi) -> bool + 'static,
    {
        self.register(
            HookDescriptor::Command(spec),
            Callback::Command {
                run: Box::new(f),
                tab: None,
            },
        )
    }

    /// Attach a tab-completion function to a command this script already
    /// registered. `name` may be the command's name or one of its aliases.
    pub fn tab<F>(&mut self, name: &str, f: F) -> Result<Registration, HookError>
    where
        F: FnMut(&CommandInvocation, &mut dyn ScriptApi) -> Vec<String> + 'static,
    {
        let registration = self
            .facade
            .find_command(self.script, name)
            .ok_or_else(|| HookError::NotRegistered(format!("command '{name}'")))?;
        self.facade
            .set_tab(self.managers, registration.id(), Box::new(f))?;
        Ok(registration)
    }

    // ─── Tasks ───────────────────────────────────────────────────────────

    /// Sync task. `interval > 0` repeats, `delay > 0` runs once later,
    /// `(0, 0)` runs on the next tick.
    pub fn task<F>(&mut self, delay: i64, interval: i64, f: F) -> Result<Registration, HookError>
    where
        F: FnMut(&mut dyn ScriptApi) + 'static,
    {
        self.task_with_mode(delay, interval, ExecutionMode::Sync, f)
    }

    pub fn async_task<F>(
        &mut self,
        delay: i64,
        interval: i64,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut dyn ScriptApi) + 'static,
    {
        self.task_with_mode(delay, interval, ExecutionMode::Async, f)
    }

    fn task_with_mode<F>(
        &mut self,
        delay: i64,
        interval: i64,
        mode: ExecutionMode,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut dyn ScriptApi) + 'static,
    {
        self.register(
            HookDescriptor::Task {
                delay,
                interval,
                mode,
            },
            Callback::Task(Box::new(f)),
        )
    }

    /// Run `work` off the main tick and hand its result to `callback` on it.
    pub fn sync_callback_task<W, C>(
        &mut self,
        delay: i64,
        work: W,
        callback: C,
    ) -> Result<Registration, HookError>
    where
        W: FnOnce() -> serde_json::Value + 'static,
        C: FnOnce(serde_json::Value, &mut dyn ScriptApi) + 'static,
    {
        self.register(
            HookDescriptor::SyncCallbackTask { delay },
            Callback::SyncCallback {
                work: Box::new(work),
                callback: Box::new(callback),
            },
        )
    }

    // ─── Packets ─────────────────────────────────────────────────────────

    /// Single-sided packet listener on `flow`.
    pub fn packet_listener<F>(
        &mut self,
        packet_type: &str,
        direction: PacketDirection,
        priority: i32,
        flow: PacketFlow,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut PacketEvent, &mut dyn ScriptApi) + 'static,
    {
        self.packet_with_mode(packet_type, direction, priority, ExecutionMode::Sync, flow, f)
    }

    pub fn async_packet_listener<F>(
        &mut self,
        packet_type: &str,
        direction: PacketDirection,
        priority: i32,
        flow: PacketFlow,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut PacketEvent, &mut dyn ScriptApi) + 'static,
    {
        self.packet_with_mode(packet_type, direction, priority, ExecutionMode::Async, flow, f)
    }

    fn packet_with_mode<F>(
        &mut self,
        packet_type: &str,
        direction: PacketDirection,
        priority: i32,
        mode: ExecutionMode,
        flow: PacketFlow,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut PacketEvent, &mut dyn ScriptApi) + 'static,
    {
        self.register(
            packet_descriptor(packet_type, direction, priority, mode),
            Callback::Packet(PacketListener::single(flow, Box::new(f))),
        )
    }

    /// First half of a receive/send pair. Complete it with [`pair_with`](Self::pair_with).
    ///
    /// Paired listeners always run synchronously.
    pub fn packet_listener_receive<F>(
        &mut self,
        packet_type: &str,
        direction: PacketDirection,
        priority: i32,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut PacketEvent, &mut dyn ScriptApi) + 'static,
    {
        self.facade.begin_packet_pair(
            self.managers,
            self.script,
            packet_descriptor(packet_type, direction, priority, ExecutionMode::Sync),
            PacketFlow::Receive,
            Box::new(f),
        )
    }

    /// First half of a send/receive pair. Complete it with [`pair_with`](Self::pair_with).
    /// Sync only, like [`packet_listener_receive`](Self::packet_listener_receive).
    pub fn packet_listener_send<F>(
        &mut self,
        packet_type: &str,
        direction: PacketDirection,
        priority: i32,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&mut PacketEvent, &mut dyn ScriptApi) + 'static,
    {
        self.facade.begin_packet_pair(
            self.managers,
            self.script,
            packet_descriptor(packet_type, direction, priority, ExecutionMode::Sync),
            PacketFlow::Send,
            Box::new(f),
        )
    }

    pub fn pair_with<F>(&mut self, registration: Registration, f: F) -> Result<(), HookError>
    where
        F: FnMut(&mut PacketEvent, &mut dyn ScriptApi) + 'static,
    {
        registration.pair_with(self.facade, self.managers, Box::new(f))
    }

    // ─── Placeholders ────────────────────────────────────────────────────

    /// Placeholder expansion under `script:<name>`.
    pub fn placeholder<F>(&mut self, f: F) -> Result<Registration, HookError>
    where
        F: FnMut(&PlaceholderRequest) -> Option<String> + 'static,
    {
        self.placeholder_with(None, DEFAULT_AUTHOR, DEFAULT_VERSION, f)
    }

    pub fn placeholder_with<F>(
        &mut self,
        identifier: Option<&str>,
        author: &str,
        version: &str,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&PlaceholderRequest) -> Option<String> + 'static,
    {
        self.register(
            HookDescriptor::Placeholder {
                identifier: identifier.map(str::to_string),
                author: author.to_string(),
                version: version.to_string(),
            },
            Callback::Placeholder {
                function: Box::new(f),
                relational: None,
            },
        )
    }

    /// Attach a relational function to this script's placeholder expansion.
    pub fn relational_placeholder<F>(&mut self, f: F) -> Result<Registration, HookError>
    where
        F: FnMut(&RelationalRequest) -> Option<String> + 'static,
    {
        let registration = self
            .facade
            .find_placeholder(self.script)
            .ok_or_else(|| HookError::NotRegistered("placeholder expansion".into()))?;
        self.facade
            .set_relational(self.managers, registration.id(), Box::new(f))?;
        Ok(registration)
    }

    // ─── Plugin messages ─────────────────────────────────────────────────

    pub fn plugin_message_listener<F>(
        &mut self,
        channel: &str,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&PluginMessage, &mut dyn ScriptApi) + 'static,
    {
        self.register(
            HookDescriptor::PluginMessage {
                channel: channel.to_string(),
            },
            Callback::PluginMessage(Box::new(f)),
        )
    }

    // ─── Pub/sub ─────────────────────────────────────────────────────────

    /// Listen on a pub/sub channel. The callback runs on the main tick.
    pub fn pub_sub_listener<F>(&mut self, channel: &str, f: F) -> Result<Registration, HookError>
    where
        F: FnMut(&PubSubMessage, &mut dyn ScriptApi) + 'static,
    {
        self.pub_sub_with_mode(channel, ExecutionMode::Sync, f)
    }

    pub fn async_pub_sub_listener<F>(
        &mut self,
        channel: &str,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&PubSubMessage, &mut dyn ScriptApi) + 'static,
    {
        self.pub_sub_with_mode(channel, ExecutionMode::Async, f)
    }

    fn pub_sub_with_mode<F>(
        &mut self,
        channel: &str,
        mode: ExecutionMode,
        f: F,
    ) -> Result<Registration, HookError>
    where
        F: FnMut(&PubSubMessage, &mut dyn ScriptApi) + 'static,
    {
        self.register(
            HookDescriptor::PubSub {
                channel: channel.to_string(),
                mode,
            },
            Callback::PubSub(Box::new(f)),
        )
    }

    // ─── Handles ─────────────────────────────────────────────────────────

    pub fn unregister(&mut self, registration: Registration) -> bool {
        registration.unregister(self.facade, self.managers)
    }

    pub fn cancel(&mut self, registration: Registration) -> Result<bool, HookError> {
        registration.cancel(self.facade, self.managers)
    }

    /// Config documents, resolved from the host on each call.
    pub fn config(&mut self) -> &mut dyn ConfigManager {
        self.managers.config_manager()
    }
}

fn packet_descriptor(
    packet_type: &str,
    direction: PacketDirection,
    priority: i32,
    mode: ExecutionMode,
) -> HookDescriptor {
    HookDescriptor::Packet {
        packet_type: packet_type.to_string(),
        direction,
        priority,
        mode,
    }
}
