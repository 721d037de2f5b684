//! Packet registry: intercepts packets and hands them to script listeners.

use hookbind_api::{
    ExecutionMode, NativeHandle, PacketDirection, PacketEvent, PacketListener, ProtocolManager,
};

use crate::actions::{with_api, PendingAction};

struct RegisteredPacketListener {
    handle: NativeHandle,
    script: String,
    packet_type: String,
    direction: PacketDirection,
    priority: i32,
    mode: ExecutionMode,
    listener: PacketListener,
}

#[derive(Default)]
pub struct PacketRegistry {
    next_handle: u64,
    /// Sorted by ascending priority, registration order kept within a priority.
    listeners: Vec<RegisteredPacketListener>,
}

impl PacketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass `packet` to the half matching its flow on every listener for its
    /// type and direction. Sync listeners run before async ones.
    pub fn intercept(&mut self, packet: &mut PacketEvent, tick: u64) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        for phase in [ExecutionMode::Sync, ExecutionMode::Async] {
            for registered in self.listeners.iter_mut() {
                if registered.mode != phase
                    || registered.packet_type != packet.packet_type
                    || registered.direction != packet.direction
                {
                    continue;
                }
                let Some(half) = registered.listener.half_mut(packet.flow) else {
                    continue;
                };
                let ((), actions) =
                    with_api(&registered.script, tick, |api| half(&mut *packet, api));
                all_actions.extend(actions);
            }
        }
        all_actions
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// (script, packet type, paired) of every listener.
    pub fn describe(&self) -> Vec<(String, String, bool)> {
        self.listeners
            .iter()
            .map(|l| (l.script.clone(), l.packet_type.clone(), l.listener.is_paired()))
            .collect()
    }
}

impl ProtocolManager for PacketRegistry {
    fn register_packet_listener(
        &mut self,
        script: &str,
        packet_type: &str,
        direction: PacketDirection,
        priority: i32,
        mode: ExecutionMode,
        listener: PacketListener,
    ) -> NativeHandle {
        self.next_handle += 1;
        let handle = NativeHandle(self.next_handle);
        self.listeners.push(RegisteredPacketListener {
            handle,
            script: script.to_string(),
            packet_type: packet_type.to_string(),
            direction,
            priority,
            mode,
            listener,
        });
        self.listeners.sort_by_key(|l| l.priority);
        handle
    }

    fn unregister_packet_listener(&mut self, handle: NativeHandle) -> Option<PacketListener> {
        let pos = self.listeners.iter().position(|l| l.handle == handle)?;
        Some(self.listeners.remove(pos).listener)
    }
}
