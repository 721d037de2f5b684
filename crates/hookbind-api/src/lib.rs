//! Hook API: descriptors, payloads, callback types, and the manager traits
//! that the registration façade forwards to.
//!
//! This crate defines the vocabulary shared by the façade (hookbind-core) and
//! any host that implements the managers. It has no dependency on either.

mod config;
mod error;
mod managers;

pub use config::ScriptConfig;
pub use error::{Dependency, HookError};
pub use managers::{
    CommandManager, ConfigManager, ListenerManager, Managers, MessageManager, PlaceholderManager,
    ProtocolManager, PubSubManager, TaskManager,
};

use std::fmt;

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Opaque handle issued by an external manager.
///
/// Only the manager that issued it can interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

/// Façade-level handle for one registration. Never reused once invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Event listener priority. Listeners run from `Lowest` up to `Monitor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
    Monitor,
}

impl EventPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lowest" => Some(Self::Lowest),
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "highest" => Some(Self::Highest),
            "monitor" => Some(Self::Monitor),
            _ => None,
        }
    }
}

/// Direction a packet travels through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketDirection {
    /// Client towards server.
    Upstream,
    /// Server towards client.
    Downstream,
}

impl PacketDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "upstream" | "up" => Some(Self::Upstream),
            "downstream" | "down" => Some(Self::Downstream),
            _ => None,
        }
    }
}

/// Which half of a packet listener a packet event is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketFlow {
    Receive,
    Send,
}

impl PacketFlow {
    pub fn other(self) -> Self {
        match self {
            PacketFlow::Receive => PacketFlow::Send,
            PacketFlow::Send => PacketFlow::Receive,
        }
    }
}

/// Whether a task or listener runs on the main tick or off it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    #[default]
    Sync,
    Async,
}

/// Log level for script logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

/// The kind of hook a registration is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Event,
    Command,
    Packet,
    Task,
    Placeholder,
    PluginMessage,
    PubSub,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::Event => "event",
            HookKind::Command => "command",
            HookKind::Packet => "packet",
            HookKind::Task => "task",
            HookKind::Placeholder => "placeholder",
            HookKind::PluginMessage => "plugin message",
            HookKind::PubSub => "pub/sub",
        };
        f.write_str(name)
    }
}

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// Everything a command registration carries besides its callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub usage: String,
    pub aliases: Vec<String>,
    pub permission: Option<String>,
    /// Run the tab-completion function off the main tick.
    pub async_tab: bool,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            usage: String::new(),
            aliases: Vec::new(),
            permission: None,
            async_tab: true,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn sync_tab(mut self) -> Self {
        self.async_tab = false;
        self
    }

    /// The command name followed by its aliases.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// What a callback is attached to.
#[derive(Debug, Clone, PartialEq)]
pub enum HookDescriptor {
    Event {
        event: String,
        priority: EventPriority,
        ignore_cancelled: bool,
    },
    Command(CommandSpec),
    Packet {
        packet_type: String,
        direction: PacketDirection,
        priority: i32,
        mode: ExecutionMode,
    },
    /// Delay and interval are in ticks. Negative values are rejected.
    Task {
        delay: i64,
        interval: i64,
        mode: ExecutionMode,
    },
    /// Async work followed by a sync callback that receives its result.
    SyncCallbackTask {
        delay: i64,
    },
    Placeholder {
        /// `None` means `script:<script name>`.
        identifier: Option<String>,
        author: String,
        version: String,
    },
    PluginMessage {
        channel: String,
    },
    /// Subscription to a pub/sub channel. Async listeners run after the sync
    /// ones, outside the main tick.
    PubSub {
        channel: String,
        mode: ExecutionMode,
    },
}

impl HookDescriptor {
    pub fn kind(&self) -> HookKind {
        match self {
            HookDescriptor::Event { .. } => HookKind::Event,
            HookDescriptor::Command(_) => HookKind::Command,
            HookDescriptor::Packet { .. } => HookKind::Packet,
            HookDescriptor::Task { .. } | HookDescriptor::SyncCallbackTask { .. } => HookKind::Task,
            HookDescriptor::Placeholder { .. } => HookKind::Placeholder,
            HookDescriptor::PluginMessage { .. } => HookKind::PluginMessage,
            HookDescriptor::PubSub { .. } => HookKind::PubSub,
        }
    }

    /// The optional integration this hook needs, if any.
    pub fn requires(&self) -> Option<Dependency> {
        match self {
            HookDescriptor::Packet { .. } => Some(Dependency::Protocol),
            HookDescriptor::Placeholder { .. } => Some(Dependency::Placeholders),
            HookDescriptor::PubSub { .. } => Some(Dependency::PubSub),
            _ => None,
        }
    }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// A named event with a JSON payload, passed to event listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    pub name: String,
    pub data: serde_json::Value,
    cancellable: bool,
    cancelled: bool,
}

impl ScriptEvent {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
            cancellable: false,
            cancelled: false,
        }
    }

    pub fn cancellable(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            cancellable: true,
            ..Self::new(name, data)
        }
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Has no effect on events that cannot be cancelled.
    pub fn set_cancelled(&mut self, cancelled: bool) {
        if self.cancellable {
            self.cancelled = cancelled;
        }
    }
}

/// Who ran a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSender {
    pub name: String,
    pub permissions: Vec<String>,
    pub is_console: bool,
}

impl CommandSender {
    pub fn console() -> Self {
        Self {
            name: "CONSOLE".into(),
            permissions: Vec::new(),
            is_console: true,
        }
    }

    pub fn player(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Vec::new(),
            is_console: false,
        }
    }

    pub fn with_permission(mut self, node: impl Into<String>) -> Self {
        self.permissions.push(node.into());
        self
    }

    /// The console has every permission; `*` grants everything to a player.
    pub fn has_permission(&self, node: &str) -> bool {
        self.is_console || self.permissions.iter().any(|p| p == "*" || p == node)
    }
}

/// A parsed command line, passed to command and tab-completion callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub sender: CommandSender,
    /// The label actually typed (name or alias), lowercased.
    pub label: String,
    pub args: Vec<String>,
}

/// A packet intercepted by the protocol manager.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketEvent {
    pub packet_type: String,
    pub direction: PacketDirection,
    pub flow: PacketFlow,
    pub player: Option<String>,
    pub payload: serde_json::Value,
    cancelled: bool,
}

impl PacketEvent {
    pub fn new(
        packet_type: impl Into<String>,
        direction: PacketDirection,
        flow: PacketFlow,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            packet_type: packet_type.into(),
            direction,
            flow,
            player: None,
            payload,
            cancelled: false,
        }
    }

    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// A `%identifier_params%` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRequest {
    pub player: Option<String>,
    pub params: String,
}

/// A relational placeholder lookup between two players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalRequest {
    pub first: String,
    pub second: String,
    pub params: String,
}

/// A raw message received on a plugin messaging channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMessage {
    pub channel: String,
    pub player: Option<String>,
    pub payload: Vec<u8>,
}

/// A text message published on a pub/sub channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubMessage {
    pub channel: String,
    pub message: String,
}

// ─── Callbacks ───────────────────────────────────────────────────────────────

pub type EventFn = Box<dyn FnMut(&mut ScriptEvent, &mut dyn ScriptApi)>;
/// Returns `false` when the command was misused.
pub type CommandFn = Box<dyn FnMut(&CommandInvocation, &mut dyn ScriptApi) -> bool>;
pub type TabFn = Box<dyn FnMut(&CommandInvocation, &mut dyn ScriptApi) -> Vec<String>>;
pub type PacketFn = Box<dyn FnMut(&mut PacketEvent, &mut dyn ScriptApi)>;
pub type TaskFn = Box<dyn FnMut(&mut dyn ScriptApi)>;
pub type WorkFn = Box<dyn FnOnce() -> serde_json::Value>;
pub type CallbackFn = Box<dyn FnOnce(serde_json::Value, &mut dyn ScriptApi)>;
pub type PlaceholderFn = Box<dyn FnMut(&PlaceholderRequest) -> Option<String>>;
pub type RelationalFn = Box<dyn FnMut(&RelationalRequest) -> Option<String>>;
pub type MessageFn = Box<dyn FnMut(&PluginMessage, &mut dyn ScriptApi)>;
pub type PubSubFn = Box<dyn FnMut(&PubSubMessage, &mut dyn ScriptApi)>;

/// The receive and send halves of one packet listener.
///
/// A single-sided listener leaves the other half empty.
#[derive(Default)]
pub struct PacketListener {
    pub receive: Option<PacketFn>,
    pub send: Option<PacketFn>,
}

impl PacketListener {
    pub fn single(flow: PacketFlow, half: PacketFn) -> Self {
        let mut listener = Self::default();
        *listener.half_mut(flow) = Some(half);
        listener
    }

    pub fn paired(receive: PacketFn, send: PacketFn) -> Self {
        Self {
            receive: Some(receive),
            send: Some(send),
        }
    }

    pub fn half_mut(&mut self, flow: PacketFlow) -> &mut Option<PacketFn> {
        match flow {
            PacketFlow::Receive => &mut self.receive,
            PacketFlow::Send => &mut self.send,
        }
    }

    pub fn take(&mut self, flow: PacketFlow) -> Option<PacketFn> {
        self.half_mut(flow).take()
    }

    pub fn is_paired(&self) -> bool {
        self.receive.is_some() && self.send.is_some()
    }
}

/// A callback paired with the hook kind it can be attached to.
pub enum Callback {
    Event(EventFn),
    Command {
        run: CommandFn,
        tab: Option<TabFn>,
    },
    Packet(PacketListener),
    Task(TaskFn),
    SyncCallback {
        work: WorkFn,
        callback: CallbackFn,
    },
    Placeholder {
        function: PlaceholderFn,
        relational: Option<RelationalFn>,
    },
    PluginMessage(MessageFn),
    PubSub(PubSubFn),
}

impl Callback {
    pub fn kind(&self) -> HookKind {
        match self {
            Callback::Event(_) => HookKind::Event,
            Callback::Command { .. } => HookKind::Command,
            Callback::Packet(_) => HookKind::Packet,
            Callback::Task(_) | Callback::SyncCallback { .. } => HookKind::Task,
            Callback::Placeholder { .. } => HookKind::Placeholder,
            Callback::PluginMessage(_) => HookKind::PluginMessage,
            Callback::PubSub(_) => HookKind::PubSub,
        }
    }
}

// ─── Script API ──────────────────────────────────────────────────────────────

/// What a callback may do while it runs.
///
/// Read methods return immediately. Write methods are deferred and applied by
/// the host after the callback returns.
pub trait ScriptApi {
    /// Name of the script that owns the running callback.
    fn script_name(&self) -> &str;
    fn current_tick(&self) -> u64;
    fn send_message(&mut self, target: &str, message: &str);
    fn broadcast_message(&mut self, message: &str);
    fn log(&self, level: LogLevel, message: &str);
    /// Unregister one of the calling script's registrations.
    fn unregister(&mut self, registration: RegistrationId);
}

// ─── Tests ───────────────────────────────────────────────────────────────────
