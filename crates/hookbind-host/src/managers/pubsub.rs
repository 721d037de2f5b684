//! In-process pub/sub broker standing in for a Redis pub/sub client.

use hookbind_api::{ExecutionMode, NativeHandle, PubSubFn, PubSubManager, PubSubMessage};
use tracing::debug;

use crate::actions::{with_api, PendingAction};

struct Subscription {
    handle: NativeHandle,
    script: String,
    channel: String,
    mode: ExecutionMode,
    callback: PubSubFn,
}

#[derive(Default)]
pub struct PubSubBroker {
    next_handle: u64,
    subscriptions: Vec<Subscription>,
}

impl PubSubBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `message` on `channel`. Sync subscribers run first, then async
    /// ones, each group in registration order.
    pub fn publish(&mut self, channel: &str, message: &str, tick: u64) -> Vec<PendingAction> {
        let message = PubSubMessage {
            channel: channel.to_string(),
            message: message.to_string(),
        };
        let mut all_actions = self.run_phase(&message, ExecutionMode::Sync, tick);
        let async_actions = self.run_phase(&message, ExecutionMode::Async, tick);
        if !async_actions.is_empty() {
            debug!("Async subscribers on {channel} queued {} actions", async_actions.len());
        }
        all_actions.extend(async_actions);
        all_actions
    }

    fn run_phase(
        &mut self,
        message: &PubSubMessage,
        mode: ExecutionMode,
        tick: u64,
    ) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        for sub in self.subscriptions.iter_mut() {
            if sub.mode != mode || sub.channel != message.channel {
                continue;
            }
            let callback = &mut sub.callback;
            let ((), actions) = with_api(&sub.script, tick, |api| callback(message, api));
            all_actions.extend(actions);
        }
        all_actions
    }

    /// Number of listeners subscribed to `channel`.
    pub fn subscribers(&self, channel: &str) -> usize {
        self.subscriptions.iter().filter(|s| s.channel == channel).count()
    }
}

impl PubSubManager for PubSubBroker {
    fn register_listener(
        &mut self,
        script: &str,
        channel: &str,
        mode: ExecutionMode,
        callback: PubSubFn,
    ) -> NativeHandle {
        self.next_handle += 1;
        let handle = NativeHandle(self.next_handle);
        debug!("{script} subscribed to {channel}");
        self.subscriptions.push(Subscription {
            handle,
            script: script.to_string(),
            channel: channel.to_string(),
            mode,
            callback,
        });
        handle
    }

    fn unregister_listener(&mut self, handle: NativeHandle) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.handle != handle);
        self.subscriptions.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_subscribers_run_before_async() {
        let mut broker = PubSubBroker::new();
        broker.register_listener(
            "stats",
            "network:chat",
            ExecutionMode::Async,
            Box::new(|msg, api| api.broadcast_message(&format!("async {}", msg.message))),
        );
        let sync = broker.register_listener(
            "relay",
            "network:chat",
            ExecutionMode::Sync,
            Box::new(|msg, api| api.broadcast_message(&format!("sync {}", msg.message))),
        );
        broker.register_listener("other", "network:trade", ExecutionMode::Sync, Box::new(|_, _| {}));

        let actions = broker.publish("network:chat", "hi", 3);
        assert_eq!(
            actions,
            vec![
                PendingAction::BroadcastMessage {
                    message: "sync hi".into()
                },
                PendingAction::BroadcastMessage {
                    message: "async hi".into()
                },
            ]
        );
        assert_eq!(broker.subscribers("network:chat"), 2);
        assert!(broker.publish("network:none", "hi", 3).is_empty());

        assert!(broker.unregister_listener(sync));
        assert!(!broker.unregister_listener(sync));
        assert_eq!(broker.publish("network:chat", "again", 4).len(), 1);
    }
}
