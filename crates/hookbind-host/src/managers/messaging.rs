//! Plugin message router: raw messages delivered by channel.

use hookbind_api::{MessageFn, MessageManager, NativeHandle, PluginMessage};

use crate::actions::{with_api, PendingAction};

struct ChannelListener {
    handle: NativeHandle,
    script: String,
    channel: String,
    callback: MessageFn,
}

#[derive(Default)]
pub struct MessageRouter {
    next_handle: u64,
    listeners: Vec<ChannelListener>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` to every listener on its channel, in registration order.
    pub fn deliver(&mut self, message: &PluginMessage, tick: u64) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        for listener in self.listeners.iter_mut() {
            if listener.channel != message.channel {
                continue;
            }
            let callback = &mut listener.callback;
            let ((), actions) = with_api(&listener.script, tick, |api| callback(message, api));
            all_actions.extend(actions);
        }
        all_actions
    }

    /// Channels with at least one listener, deduplicated and sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.listeners.iter().map(|l| l.channel.clone()).collect();
        channels.sort();
        channels.dedup();
        channels
    }
}

impl MessageManager for MessageRouter {
    fn register_listener(&mut self, script: &str, channel: &str, callback: MessageFn) -> NativeHandle {
        self.next_handle += 1;
        let handle = NativeHandle(self.next_handle);
        self.listeners.push(ChannelListener {
            handle,
            script: script.to_string(),
            channel: channel.to_string(),
            callback,
        });
        handle
    }

    fn unregister_listener(&mut self, handle: NativeHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.handle != handle);
        self.listeners.len() != before
    }
}
