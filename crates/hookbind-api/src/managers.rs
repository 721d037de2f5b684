//! External manager traits.
//!
//! These are the collaborators the façade forwards to. A host implements them;
//! the façade never dispatches anything itself.

use crate::{
    CallbackFn, CommandFn, CommandSpec, EventFn, EventPriority, ExecutionMode, HookError,
    MessageFn, NativeHandle, PacketDirection, PacketListener, PlaceholderFn, PubSubFn,
    RelationalFn, ScriptConfig, TabFn, TaskFn, WorkFn,
};

/// Event dispatch.
pub trait ListenerManager {
    fn register_listener(
        &mut self,
        script: &str,
        event: &str,
        priority: EventPriority,
        ignore_cancelled: bool,
        callback: EventFn,
    ) -> NativeHandle;

    /// Returns `false` if the handle was not registered.
    fn unregister_listener(&mut self, handle: NativeHandle) -> bool;
}

/// Command dispatch and tab completion.
pub trait CommandManager {
    fn register_command(
        &mut self,
        script: &str,
        spec: &CommandSpec,
        callback: CommandFn,
        tab: Option<TabFn>,
    ) -> Result<NativeHandle, HookError>;

    fn set_tab_function(&mut self, handle: NativeHandle, tab: TabFn) -> bool;

    fn unregister_command(&mut self, handle: NativeHandle) -> bool;
}

/// Tick-based task scheduling.
pub trait TaskManager {
    /// Run on the next scheduler pass.
    fn run_task(&mut self, script: &str, mode: ExecutionMode, task: TaskFn) -> NativeHandle;

    fn run_task_later(
        &mut self,
        script: &str,
        mode: ExecutionMode,
        delay: u64,
        task: TaskFn,
    ) -> NativeHandle;

    fn schedule_repeating_task(
        &mut self,
        script: &str,
        mode: ExecutionMode,
        delay: u64,
        interval: u64,
        task: TaskFn,
    ) -> NativeHandle;

    /// Run `work` off the main tick, then hand its result to `callback` on it.
    fn run_sync_callback_task(
        &mut self,
        script: &str,
        delay: u64,
        work: WorkFn,
        callback: CallbackFn,
    ) -> NativeHandle;

    fn stop_task(&mut self, handle: NativeHandle) -> bool;

    /// `false` once a one-shot task has run or the task was stopped.
    fn is_task_active(&self, handle: NativeHandle) -> bool;
}

/// Packet interception. Optional: not every host has a protocol library.
pub trait ProtocolManager {
    fn register_packet_listener(
        &mut self,
        script: &str,
        packet_type: &str,
        direction: PacketDirection,
        priority: i32,
        mode: ExecutionMode,
        listener: PacketListener,
    ) -> NativeHandle;

    /// Hands the listener back so its halves can be re-paired.
    fn unregister_packet_listener(&mut self, handle: NativeHandle) -> Option<PacketListener>;
}

/// Placeholder expansions. Optional: not every host has a placeholder library.
pub trait PlaceholderManager {
    fn register_placeholder(
        &mut self,
        script: &str,
        identifier: &str,
        author: &str,
        version: &str,
        function: PlaceholderFn,
        relational: Option<RelationalFn>,
    ) -> Result<NativeHandle, HookError>;

    fn set_relational_function(&mut self, handle: NativeHandle, function: RelationalFn) -> bool;

    fn unregister_placeholder(&mut self, handle: NativeHandle) -> bool;
}

/// Plugin messaging channels.
pub trait MessageManager {
    fn register_listener(&mut self, script: &str, channel: &str, callback: MessageFn)
        -> NativeHandle;

    fn unregister_listener(&mut self, handle: NativeHandle) -> bool;
}

/// Pub/sub channel subscriptions. Optional: the host may run without a
/// pub/sub client.
pub trait PubSubManager {
    fn register_listener(
        &mut self,
        script: &str,
        channel: &str,
        mode: ExecutionMode,
        callback: PubSubFn,
    ) -> NativeHandle;

    /// Returns `false` if the handle was not registered.
    fn unregister_listener(&mut self, handle: NativeHandle) -> bool;
}

/// Script config documents.
pub trait ConfigManager {
    /// Load (creating an empty file if missing) and fill in `defaults` for absent keys.
    fn load_config(&mut self, path: &str, defaults: Option<&str>)
        -> Result<ScriptConfig, HookError>;

    fn save_config(&mut self, config: &ScriptConfig) -> Result<(), HookError>;

    fn config_exists(&self, path: &str) -> bool;

    fn delete_config(&mut self, path: &str) -> Result<bool, HookError>;
}

/// Accessors for the host's managers.
///
/// The façade looks a manager up on every call and never keeps it, so a host
/// may swap a manager out (on reload, say) without leaving stale bindings.
pub trait Managers {
    fn listener_manager(&mut self) -> &mut dyn ListenerManager;
    fn command_manager(&mut self) -> &mut dyn CommandManager;
    fn task_manager(&mut self) -> &mut dyn TaskManager;
    fn config_manager(&mut self) -> &mut dyn ConfigManager;
    fn message_manager(&mut self) -> &mut dyn MessageManager;
    /// `None` when the protocol integration is not loaded.
    fn protocol_manager(&mut self) -> Option<&mut dyn ProtocolManager>;
    /// `None` when the placeholder integration is not loaded.
    fn placeholder_manager(&mut self) -> Option<&mut dyn PlaceholderManager>;
    /// `None` when no pub/sub client is configured.
    fn pubsub_manager(&mut self) -> Option<&mut dyn PubSubManager>;
}
