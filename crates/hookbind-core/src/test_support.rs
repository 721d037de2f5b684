//! In-memory managers for façade tests.

use std::collections::BTreeMap;

use hookbind_api::{
    CallbackFn, CommandFn, CommandManager, CommandSpec, ConfigManager, EventFn, EventPriority,
    ExecutionMode, HookError, ListenerManager, LogLevel, Managers, MessageFn, MessageManager,
    NativeHandle, PacketDirection, PacketEvent, PacketListener, PlaceholderFn,
    PlaceholderManager, ProtocolManager, PubSubFn, PubSubManager, RegistrationId, RelationalFn,
    ScriptApi, ScriptConfig, ScriptEvent, TabFn, TaskFn, TaskManager, WorkFn,
};

/// A `ScriptApi` that drops every write.
pub struct NullApi;

impl ScriptApi for NullApi {
    fn script_name(&self) -> &str {
        "test"
    }

    fn current_tick(&self) -> u64 {
        0
    }

    fn send_message(&mut self, _target: &str, _message: &str) {}

    fn broadcast_message(&mut self, _message: &str) {}

    fn log(&self, _level: LogLevel, _message: &str) {}

    fn unregister(&mut self, _registration: RegistrationId) {}
}

pub struct MockTask {
    pub repeating: bool,
}

/// Every manager trait on one struct. Callbacks that tests invoke are kept;
/// the rest are recorded by name only.
pub struct MockManagers {
    next: u64,
    protocol: bool,
    placeholder_api: bool,
    pubsub: bool,
    pub listeners: BTreeMap<u64, (String, EventFn)>,
    /// (spec, has tab function)
    pub commands: BTreeMap<u64, (CommandSpec, bool)>,
    pub tasks: BTreeMap<u64, MockTask>,
    pub task_log: Vec<String>,
    pub packets: BTreeMap<u64, (String, PacketListener)>,
    pub packet_unregisters: usize,
    /// (identifier, has relational function)
    pub placeholders: BTreeMap<u64, (String, bool)>,
    pub channels: BTreeMap<u64, String>,
    pub subscriptions: BTreeMap<u64, (String, ExecutionMode)>,
    pub configs: BTreeMap<String, ScriptConfig>,
}

impl MockManagers {
    pub fn new() -> Self {
        Self {
            next: 0,
            protocol: true,
            placeholder_api: true,
            pubsub: true,
            listeners: BTreeMap::new(),
            commands: BTreeMap::new(),
            tasks: BTreeMap::new(),
            task_log: Vec::new(),
            packets: BTreeMap::new(),
            packet_unregisters: 0,
            placeholders: BTreeMap::new(),
            channels: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            configs: BTreeMap::new(),
        }
    }

    pub fn without_protocol(mut self) -> Self {
        self.protocol = false;
        self
    }

    pub fn without_placeholders(mut self) -> Self {
        self.placeholder_api = false;
        self
    }

    pub fn without_pubsub(mut self) -> Self {
        self.pubsub = false;
        self
    }

    fn handle(&mut self) -> NativeHandle {
        self.next += 1;
        NativeHandle(self.next)
    }

    fn add_task(&mut self, repeating: bool, log: String) -> NativeHandle {
        let handle = self.handle();
        self.tasks.insert(handle.0, MockTask { repeating });
        self.task_log.push(log);
        handle
    }

    pub fn fire(&mut self, event: &mut ScriptEvent) {
        for (name, listener) in self.listeners.values_mut() {
            if *name == event.name {
                listener(event, &mut NullApi);
            }
        }
    }

    pub fn intercept(&mut self, packet: &mut PacketEvent) {
        for (packet_type, listener) in self.packets.values_mut() {
            if *packet_type == packet.packet_type {
                if let Some(half) = listener.half_mut(packet.flow) {
                    half(packet, &mut NullApi);
                }
            }
        }
    }

    /// Pretend every one-shot task has run.
    pub fn finish_one_shot_tasks(&mut self) {
        self.tasks.retain(|_, task| task.repeating);
    }
}

impl ListenerManager for MockManagers {
    fn register_listener(
        &mut self,
        _script: &str,
        event: &str,
        _priority: EventPriority,
        _ignore_cancelled: bool,
        callback: EventFn,
    ) -> NativeHandle {
        let handle = self.handle();
        self.listeners.insert(handle.0, (event.to_string(), callback));
        handle
    }

    fn unregister_listener(&mut self, handle: NativeHandle) -> bool {
        self.listeners.remove(&handle.0).is_some()
    }
}

impl CommandManager for MockManagers {
    fn register_command(
        &mut self,
        _script: &str,
        spec: &CommandSpec,
        _callback: CommandFn,
        tab: Option<TabFn>,
    ) -> Result<NativeHandle, HookError> {
        let handle = self.handle();
        self.commands.insert(handle.0, (spec.clone(), tab.is_some()));
        Ok(handle)
    }

    fn set_tab_function(&mut self, handle: NativeHandle, _tab: TabFn) -> bool {
        match self.commands.get_mut(&handle.0) {
            Some(command) => {
                command.1 = true;
                true
            }
            None => false,
        }
    }

    fn unregister_command(&mut self, handle: NativeHandle) -> bool {
        self.commands.remove(&handle.0).is_some()
    }
}

impl TaskManager for MockManagers {
    fn run_task(&mut self, script: &str, _mode: ExecutionMode, _task: TaskFn) -> NativeHandle {
        self.add_task(false, format!("run {script}"))
    }

    fn run_task_later(
        &mut self,
        script: &str,
        _mode: ExecutionMode,
        delay: u64,
        _task: TaskFn,
    ) -> NativeHandle {
        self.add_task(false, format!("later {script} {delay}"))
    }

    fn schedule_repeating_task(
        &mut self,
        script: &str,
        _mode: ExecutionMode,
        delay: u64,
        interval: u64,
        _task: TaskFn,
    ) -> NativeHandle {
        self.add_task(true, format!("repeat {script} {delay} {interval}"))
    }

    fn run_sync_callback_task(
        &mut self,
        script: &str,
        delay: u64,
        _work: WorkFn,
        _callback: CallbackFn,
    ) -> NativeHandle {
        self.add_task(false, format!("callback {script} {delay}"))
    }

    fn stop_task(&mut self, handle: NativeHandle) -> bool {
        self.tasks.remove(&handle.0).is_some()
    }

    fn is_task_active(&self, handle: NativeHandle) -> bool {
        self.tasks.contains_key(&handle.0)
    }
}

impl ProtocolManager for MockManagers {
    fn register_packet_listener(
        &mut self,
        _script: &str,
        packet_type: &str,
        _direction: PacketDirection,
        _priority: i32,
        _mode: ExecutionMode,
        listener: PacketListener,
    ) -> NativeHandle {
        let handle = self.handle();
        self.packets
            .insert(handle.0, (packet_type.to_string(), listener));
        handle
    }

    fn unregister_packet_listener(&mut self, handle: NativeHandle) -> Option<PacketListener> {
        self.packet_unregisters += 1;
        self.packets.remove(&handle.0).map(|(_, listener)| listener)
    }
}

impl PlaceholderManager for MockManagers {
    fn register_placeholder(
        &mut self,
        _script: &str,
        identifier: &str,
        _author: &str,
        _version: &str,
        _function: PlaceholderFn,
        relational: Option<RelationalFn>,
    ) -> Result<NativeHandle, HookError> {
        let handle = self.handle();
        self.placeholders
            .insert(handle.0, (identifier.to_string(), relational.is_some()));
        Ok(handle)
    }

    fn set_relational_function(&mut self, handle: NativeHandle, _function: RelationalFn) -> bool {
        match self.placeholders.get_mut(&handle.0) {
            Some(placeholder) => {
                placeholder.1 = true;
                true
            }
            None => false,
        }
    }

    fn unregister_placeholder(&mut self, handle: NativeHandle) -> bool {
        self.placeholders.remove(&handle.0).is_some()
    }
}

impl MessageManager for MockManagers {
    fn register_listener(&mut self, _script: &str, channel: &str, _callback: MessageFn) -> NativeHandle {
        let handle = self.handle();
        self.channels.insert(handle.0, channel.to_string());
        handle
    }

    fn unregister_listener(&mut self, handle: NativeHandle) -> bool {
        self.channels.remove(&handle.0).is_some()
    }
}

impl PubSubManager for MockManagers {
    fn register_listener(
        &mut self,
        _script: &str,
        channel: &str,
        mode: ExecutionMode,
        _callback: PubSubFn,
    ) -> NativeHandle {
        let handle = self.handle();
        self.subscriptions.insert(handle.0, (channel.to_string(), mode));
        handle
    }

    fn unregister_listener(&mut self, handle: NativeHandle) -> bool {
        self.subscriptions.remove(&handle.0).is_some()
    }
}

impl ConfigManager for MockManagers {
    fn load_config(
        &mut self,
        path: &str,
        defaults: Option<&str>,
    ) -> Result<ScriptConfig, HookError> {
        let config = self
            .configs
            .get(path)
            .cloned()
            .unwrap_or_else(|| ScriptConfig::new(path));
        match defaults {
            Some(defaults) => config.with_defaults(defaults),
            None => Ok(config),
        }
    }

    fn save_config(&mut self, config: &ScriptConfig) -> Result<(), HookError> {
        self.configs.insert(config.path().to_string(), config.clone());
        Ok(())
    }

    fn config_exists(&self, path: &str) -> bool {
        self.configs.contains_key(path)
    }

    fn delete_config(&mut self, path: &str) -> Result<bool, HookError> {
        Ok(self.configs.remove(path).is_some())
    }
}

impl Managers for MockManagers {
    fn listener_manager(&mut self) -> &mut dyn ListenerManager {
        self
    }

    fn command_manager(&mut self) -> &mut dyn CommandManager {
        self
    }

    fn task_manager(&mut self) -> &mut dyn TaskManager {
        self
    }

    fn config_manager(&mut self) -> &mut dyn ConfigManager {
        self
    }

    fn message_manager(&mut self) -> &mut dyn MessageManager {
        self
    }

    fn protocol_manager(&mut self) -> Option<&mut dyn ProtocolManager> {
        if self.protocol {
            Some(self)
        } else {
            None
        }
    }

    fn placeholder_manager(&mut self) -> Option<&mut dyn PlaceholderManager> {
        if self.placeholder_api {
            Some(self)
        } else {
            None
        }
    }

    fn pubsub_manager(&mut self) -> Option<&mut dyn PubSubManager> {
        if self.pubsub {
            Some(self)
        } else {
            None
        }
    }
}
