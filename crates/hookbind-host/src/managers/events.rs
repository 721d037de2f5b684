//! Event bus: named events dispatched to listeners in priority order.

use hookbind_api::{EventFn, EventPriority, ListenerManager, NativeHandle, ScriptEvent};

use crate::actions::{with_api, PendingAction};

struct RegisteredListener {
    handle: NativeHandle,
    script: String,
    event: String,
    priority: EventPriority,
    ignore_cancelled: bool,
    callback: EventFn,
}

/// Listeners sorted by priority, registration order kept within a priority.
#[derive(Default)]
pub struct EventBus {
    next_handle: u64,
    listeners: Vec<RegisteredListener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call every listener for `event.name`. Listeners that ignore cancelled
    /// events are skipped once a lower priority has cancelled it.
    pub fn dispatch(&mut self, event: &mut ScriptEvent, tick: u64) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        for listener in self.listeners.iter_mut() {
            if listener.event != event.name || (listener.ignore_cancelled && event.is_cancelled()) {
                continue;
            }
            let callback = &mut listener.callback;
            let ((), actions) =
                with_api(&listener.script, tick, |api| callback(&mut *event, api));
            all_actions.extend(actions);
        }
        all_actions
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.iter().filter(|l| l.event == event).count()
    }

    /// (script, event, priority) of every listener, in dispatch order.
    pub fn describe(&self) -> Vec<(String, String, EventPriority)> {
        self.listeners
            .iter()
            .map(|l| (l.script.clone(), l.event.clone(), l.priority))
            .collect()
    }
}

impl ListenerManager for EventBus {
    fn register_listener(
        &mut self,
        script: &str,
        event: &str,
        priority: EventPriority,
        ignore_cancelled: bool,
        callback: EventFn,
    ) -> NativeHandle {
        self.next_handle += 1;
        let handle = NativeHandle(self.next_handle);
        self.listeners.push(RegisteredListener {
            handle,
            script: script.to_string(),
            event: event.to_string(),
            priority,
            ignore_cancelled,
            callback,
        });
        // stable: equal priorities keep registration order
        self.listeners.sort_by_key(|l| l.priority);
        handle
    }

    fn unregister_listener(&mut self, handle: NativeHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.handle != handle);
        self.listeners.len() != before
    }
}
