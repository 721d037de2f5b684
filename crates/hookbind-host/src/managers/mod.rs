//! The host's managers, one per hook kind.

pub mod commands;
pub mod configs;
pub mod events;
pub mod messaging;
pub mod placeholders;
pub mod protocol;
pub mod pubsub;
pub mod scheduler;

use hookbind_api::{
    CommandManager, ConfigManager, ListenerManager, Managers, MessageManager, PlaceholderManager,
    ProtocolManager, PubSubManager, TaskManager,
};

use crate::config::HostConfig;
use commands::CommandMap;
use configs::FileConfigStore;
use events::EventBus;
use messaging::MessageRouter;
use placeholders::PlaceholderRegistry;
use protocol::PacketRegistry;
use pubsub::PubSubBroker;
use scheduler::TickScheduler;

pub struct HostManagers {
    pub events: EventBus,
    pub commands: CommandMap,
    pub scheduler: TickScheduler,
    pub configs: FileConfigStore,
    pub messages: MessageRouter,
    /// `None` when the protocol integration is disabled.
    pub protocol: Option<PacketRegistry>,
    /// `None` when the placeholder integration is disabled.
    pub placeholders: Option<PlaceholderRegistry>,
    /// `None` when the pub/sub integration is disabled.
    pub pubsub: Option<PubSubBroker>,
}

impl HostManagers {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            events: EventBus::new(),
            commands: CommandMap::new(),
            scheduler: TickScheduler::new(),
            configs: FileConfigStore::new(&config.paths.configs),
            messages: MessageRouter::new(),
            protocol: config.integrations.protocol.then(PacketRegistry::new),
            placeholders: config.integrations.placeholders.then(PlaceholderRegistry::new),
            pubsub: config.integrations.pubsub.then(PubSubBroker::new),
        }
    }
}

impl Managers for HostManagers {
    fn listener_manager(&mut self) -> &mut dyn ListenerManager {
        &mut self.events
    }

    fn command_manager(&mut self) -> &mut dyn CommandManager {
        &mut self.commands
    }

    fn task_manager(&mut self) -> &mut dyn TaskManager {
        &mut self.scheduler
    }

    fn config_manager(&mut self) -> &mut dyn ConfigManager {
        &mut self.configs
    }

    fn message_manager(&mut self) -> &mut dyn MessageManager {
        &mut self.messages
    }

    fn protocol_manager(&mut self) -> Option<&mut dyn ProtocolManager> {
        self.protocol
            .as_mut()
            .map(|p| p as &mut dyn ProtocolManager)
    }

    fn placeholder_manager(&mut self) -> Option<&mut dyn PlaceholderManager> {
        self.placeholders
            .as_mut()
            .map(|p| p as &mut dyn PlaceholderManager)
    }

    fn pubsub_manager(&mut self) -> Option<&mut dyn PubSubManager> {
        self.pubsub.as_mut().map(|p| p as &mut dyn PubSubManager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrations_follow_config() {
        let mut config = HostConfig::default();
        let mut managers = HostManagers::new(&config);
        assert!(managers.protocol_manager().is_some());
        assert!(managers.placeholder_manager().is_some());
        assert!(managers.pubsub_manager().is_some());

        config.integrations.protocol = false;
        config.integrations.placeholders = false;
        config.integrations.pubsub = false;
        let mut managers = HostManagers::new(&config);
        assert!(managers.protocol_manager().is_none());
        assert!(managers.placeholder_manager().is_none());
        assert!(managers.pubsub_manager().is_none());
    }
}
