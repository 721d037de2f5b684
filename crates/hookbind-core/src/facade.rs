//! Registration façade: forwards registrations to the external managers and
//! keeps the handle table that lets them be released later.

use hookbind_api::{
    Callback, Dependency, HookDescriptor, HookError, HookKind, Managers, NativeHandle, PacketFlow,
    PacketFn, PacketListener, RegistrationId, RelationalFn, TabFn,
};
use tracing::{debug, warn};

use crate::handle_table::HandleTable;
use crate::registration::Registration;
use crate::schedule::SchedulePlan;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Characters a placeholder identifier may not contain.
const INVALID_IDENTIFIER_CHARS: [char; 4] = ['_', '%', '{', '}'];

struct Entry {
    script: String,
    descriptor: HookDescriptor,
    /// `None` while a packet pair is waiting for its second half.
    native: Option<NativeHandle>,
    pairing: Option<Pairing>,
}

/// State of a receive/send packet pair.
struct Pairing {
    /// The half supplied first. It is kept across re-pairing.
    anchor: PacketFlow,
    /// The anchor half, held here until the pair is complete.
    pending: Option<PacketFn>,
}

/// Read-only view of one registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationInfo<'a> {
    pub script: &'a str,
    pub descriptor: &'a HookDescriptor,
    /// `false` for a packet pair still waiting for its second half.
    pub active: bool,
}

// ─── RegistrationFacade ──────────────────────────────────────────────────────

/// Maps hook descriptors plus callbacks to registrations.
///
/// Managers are passed in on every call and never stored.
#[derive(Default)]
pub struct RegistrationFacade {
    table: HandleTable<Entry>,
}

impl RegistrationFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` on the hook `descriptor` describes, on behalf of `script`.
    pub fn register(
        &mut self,
        managers: &mut dyn Managers,
        script: &str,
        descriptor: HookDescriptor,
        callback: Callback,
    ) -> Result<Registration, HookError> {
        if !compatible(&descriptor, &callback) {
            return Err(HookError::CallbackMismatch {
                descriptor: descriptor.kind(),
                callback: callback.kind(),
            });
        }
        if let Some(dependency) = descriptor.requires() {
            check_available(managers, dependency)?;
        }
        self.check_unique(script, &descriptor)?;

        let descriptor = match descriptor {
            HookDescriptor::Placeholder {
                identifier,
                author,
                version,
            } => HookDescriptor::Placeholder {
                identifier: Some(placeholder_identifier(script, identifier.as_deref())),
                author,
                version,
            },
            other => other,
        };

        let native = forward(managers, script, &descriptor, callback)?;
        let kind = descriptor.kind();
        let id = self.table.store(Entry {
            script: script.to_string(),
            descriptor,
            native: Some(native),
            pairing: None,
        });
        debug!("Script '{script}' registered {kind} hook {id}");
        Ok(Registration::new(id, kind))
    }

    /// Start a receive/send packet pair with one half.
    ///
    /// Nothing reaches the protocol manager until [`pair_with`](Self::pair_with)
    /// supplies the other half.
    pub fn begin_packet_pair(
        &mut self,
        managers: &mut dyn Managers,
        script: &str,
        descriptor: HookDescriptor,
        anchor: PacketFlow,
        half: PacketFn,
    ) -> Result<Registration, HookError> {
        if descriptor.kind() != HookKind::Packet {
            return Err(HookError::CallbackMismatch {
                descriptor: descriptor.kind(),
                callback: HookKind::Packet,
            });
        }
        check_available(managers, Dependency::Protocol)?;
        self.check_unique(script, &descriptor)?;

        let id = self.table.store(Entry {
            script: script.to_string(),
            descriptor,
            native: None,
            pairing: Some(Pairing {
                anchor,
                pending: Some(half),
            }),
        });
        debug!("Script '{script}' started packet pair {id} ({anchor:?} half)");
        Ok(Registration::new(id, HookKind::Packet))
    }

    /// Supply the other half of a packet pair.
    ///
    /// If the pair is already active, the old listener is unregistered first
    /// and the anchor half is re-registered with `half`. Both steps happen in
    /// this call, but a dispatcher on another thread can observe the gap
    /// between them.
    pub fn pair_with(
        &mut self,
        managers: &mut dyn Managers,
        id: RegistrationId,
        half: PacketFn,
    ) -> Result<(), HookError> {
        let result = self.install_pair(managers, id, half);
        if let Err(HookError::UnknownRegistration(_)) = &result {
            // the protocol manager lost the old listener
            self.table.invalidate(id);
        }
        result
    }

    fn install_pair(
        &mut self,
        managers: &mut dyn Managers,
        id: RegistrationId,
        half: PacketFn,
    ) -> Result<(), HookError> {
        let entry = self
            .table
            .lookup_mut(id)
            .ok_or(HookError::UnknownRegistration(id))?;
        let HookDescriptor::Packet {
            packet_type,
            direction,
            priority,
            mode,
        } = &entry.descriptor
        else {
            return Err(HookError::KindMismatch {
                id,
                expected: HookKind::Packet,
                actual: entry.descriptor.kind(),
            });
        };
        let pairing = entry.pairing.as_mut().ok_or(HookError::NotPairable(id))?;
        let protocol = managers
            .protocol_manager()
            .ok_or(HookError::UnavailableDependency(Dependency::Protocol))?;

        let anchor_half = match (pairing.pending.take(), entry.native.take()) {
            (Some(pending), _) => pending,
            (None, Some(old)) => protocol
                .unregister_packet_listener(old)
                .and_then(|mut listener| listener.take(pairing.anchor))
                .ok_or(HookError::UnknownRegistration(id))?,
            (None, None) => return Err(HookError::NotPairable(id)),
        };

        let listener = match pairing.anchor {
            PacketFlow::Receive => PacketListener::paired(anchor_half, half),
            PacketFlow::Send => PacketListener::paired(half, anchor_half),
        };
        let native = protocol.register_packet_listener(
            &entry.script,
            packet_type,
            *direction,
            *priority,
            *mode,
            listener,
        );
        entry.native = Some(native);
        debug!("Script '{}' paired packet listener {id}", entry.script);
        Ok(())
    }

    /// Release a registration. Returns `false` if it was already released.
    pub fn unregister(&mut self, managers: &mut dyn Managers, id: RegistrationId) -> bool {
        let Some(entry) = self.table.invalidate(id) else {
            return false;
        };
        release(managers, id, &entry);
        debug!(
            "Script '{}' unregistered {} hook {id}",
            entry.script,
            entry.descriptor.kind()
        );
        true
    }

    /// Stop a task registration. `Ok(false)` if it is no longer registered.
    pub fn cancel(
        &mut self,
        managers: &mut dyn Managers,
        id: RegistrationId,
    ) -> Result<bool, HookError> {
        let Some(entry) = self.table.lookup(id) else {
            return Ok(false);
        };
        let actual = entry.descriptor.kind();
        if actual != HookKind::Task {
            return Err(HookError::KindMismatch {
                id,
                expected: HookKind::Task,
                actual,
            });
        }
        Ok(self.unregister(managers, id))
    }

    /// Attach a tab-completion function to a command registration.
    pub fn set_tab(
        &mut self,
        managers: &mut dyn Managers,
        id: RegistrationId,
        tab: TabFn,
    ) -> Result<(), HookError> {
        let native = self.native_of(id, HookKind::Command)?;
        if managers.command_manager().set_tab_function(native, tab) {
            Ok(())
        } else {
            Err(HookError::UnknownRegistration(id))
        }
    }

    /// Attach a relational function to a placeholder registration.
    pub fn set_relational(
        &mut self,
        managers: &mut dyn Managers,
        id: RegistrationId,
        function: RelationalFn,
    ) -> Result<(), HookError> {
        let native = self.native_of(id, HookKind::Placeholder)?;
        let placeholders = managers
            .placeholder_manager()
            .ok_or(HookError::UnavailableDependency(Dependency::Placeholders))?;
        if placeholders.set_relational_function(native, function) {
            Ok(())
        } else {
            Err(HookError::UnknownRegistration(id))
        }
    }

    /// Release everything `script` owns, pending pairs included.
    pub fn unload_script(&mut self, managers: &mut dyn Managers, script: &str) -> usize {
        let mut count = 0;
        for id in self.registrations(script) {
            if self.unregister(managers, id) {
                count += 1;
            }
        }
        if count > 0 {
            debug!("Released {count} registrations of script '{script}'");
        }
        count
    }

    /// Forget task registrations whose one-shot task already ran.
    pub fn reap_finished_tasks(&mut self, managers: &mut dyn Managers) -> usize {
        let tasks = managers.task_manager();
        let finished: Vec<RegistrationId> = self
            .table
            .iter()
            .filter(|(_, entry)| entry.descriptor.kind() == HookKind::Task)
            .filter(|(_, entry)| entry.native.is_some_and(|h| !tasks.is_task_active(h)))
            .map(|(id, _)| id)
            .collect();
        for id in &finished {
            self.table.invalidate(*id);
        }
        finished.len()
    }

    pub fn describe(&self, id: RegistrationId) -> Option<RegistrationInfo<'_>> {
        self.table.lookup(id).map(|entry| RegistrationInfo {
            script: &entry.script,
            descriptor: &entry.descriptor,
            active: entry.native.is_some(),
        })
    }

    pub fn is_registered(&self, id: RegistrationId) -> bool {
        self.table.contains(id)
    }

    /// Live registrations of `script`, oldest first.
    pub fn registrations(&self, script: &str) -> Vec<RegistrationId> {
        self.table
            .iter()
            .filter(|(_, entry)| entry.script == script)
            .map(|(id, _)| id)
            .collect()
    }

    /// Names of every script that holds at least one registration, sorted.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.table.iter().map(|(_, entry)| entry.script.clone()).collect();
        owners.sort();
        owners.dedup();
        owners
    }

    /// The command `script` registered under `name` or one of its aliases,
    /// ignoring case.
    pub fn find_command(&self, script: &str, name: &str) -> Option<Registration> {
        self.table
            .iter()
            .find(|(_, entry)| {
                entry.script == script
                    && matches!(&entry.descriptor, HookDescriptor::Command(spec)
                        if spec.labels().any(|label| label.eq_ignore_ascii_case(name)))
            })
            .map(|(id, _)| Registration::new(id, HookKind::Command))
    }

    /// The placeholder `script` registered, if any.
    pub fn find_placeholder(&self, script: &str) -> Option<Registration> {
        self.table
            .iter()
            .find(|(_, entry)| entry.script == script && entry.descriptor.kind() == HookKind::Placeholder)
            .map(|(id, _)| Registration::new(id, HookKind::Placeholder))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn native_of(&self, id: RegistrationId, expected: HookKind) -> Result<NativeHandle, HookError> {
        let entry = self
            .table
            .lookup(id)
            .ok_or(HookError::UnknownRegistration(id))?;
        let actual = entry.descriptor.kind();
        if actual != expected {
            return Err(HookError::KindMismatch {
                id,
                expected,
                actual,
            });
        }
        entry.native.ok_or(HookError::UnknownRegistration(id))
    }

    fn check_unique(&self, script: &str, descriptor: &HookDescriptor) -> Result<(), HookError> {
        let mine = self.table.iter().map(|(_, e)| e).filter(|e| e.script == script);
        for entry in mine {
            match (&entry.descriptor, descriptor) {
                (HookDescriptor::Command(existing), HookDescriptor::Command(new))
                    if existing.name.eq_ignore_ascii_case(&new.name) =>
                {
                    return Err(HookError::DuplicateCommand(new.name.clone()));
                }
                (
                    HookDescriptor::Packet {
                        packet_type: existing,
                        ..
                    },
                    HookDescriptor::Packet { packet_type, .. },
                ) if existing == packet_type => {
                    return Err(HookError::DuplicatePacketListener(packet_type.clone()));
                }
                (HookDescriptor::Placeholder { .. }, HookDescriptor::Placeholder { .. }) => {
                    return Err(HookError::DuplicatePlaceholder);
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Resolve a placeholder identifier: `script:<name>` unless one is given,
/// with `_ % { }` stripped.
pub fn placeholder_identifier(script: &str, requested: Option<&str>) -> String {
    let raw = match requested {
        Some(id) => id.to_string(),
        None => format!("script:{script}"),
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| !INVALID_IDENTIFIER_CHARS.contains(c))
        .collect();
    if cleaned != raw {
        warn!("Placeholder identifier '{raw}' of script '{script}' contained invalid characters, using '{cleaned}'");
    }
    cleaned
}

fn compatible(descriptor: &HookDescriptor, callback: &Callback) -> bool {
    matches!(
        (descriptor, callback),
        (HookDescriptor::Event { .. }, Callback::Event(_))
            | (HookDescriptor::Command(_), Callback::Command { .. })
            | (HookDescriptor::Packet { .. }, Callback::Packet(_))
            | (HookDescriptor::Task { .. }, Callback::Task(_))
            | (HookDescriptor::SyncCallbackTask { .. }, Callback::SyncCallback { .. })
            | (HookDescriptor::Placeholder { .. }, Callback::Placeholder { .. })
            | (HookDescriptor::PluginMessage { .. }, Callback::PluginMessage(_))
            | (HookDescriptor::PubSub { .. }, Callback::PubSub(_))
    )
}

fn check_available(managers: &mut dyn Managers, dependency: Dependency) -> Result<(), HookError> {
    let available = match dependency {
        Dependency::Protocol => managers.protocol_manager().is_some(),
        Dependency::Placeholders => managers.placeholder_manager().is_some(),
        Dependency::PubSub => managers.pubsub_manager().is_some(),
    };
    if available {
        Ok(())
    } else {
        Err(HookError::UnavailableDependency(dependency))
    }
}

fn forward(
    managers: &mut dyn Managers,
    script: &str,
    descriptor: &HookDescriptor,
    callback: Callback,
) -> Result<NativeHandle, HookError> {
    match (descriptor, callback) {
        (
            HookDescriptor::Event {
                event,
                priority,
                ignore_cancelled,
            },
            Callback::Event(f),
        ) => Ok(managers
            .listener_manager()
            .register_listener(script, event, *priority, *ignore_cancelled, f)),
        (HookDescriptor::Command(spec), Callback::Command { run, tab }) => {
            managers.command_manager().register_command(script, spec, run, tab)
        }
        (
            HookDescriptor::Packet {
                packet_type,
                direction,
                priority,
                mode,
            },
            Callback::Packet(listener),
        ) => {
            let protocol = managers
                .protocol_manager()
                .ok_or(HookError::UnavailableDependency(Dependency::Protocol))?;
            Ok(protocol.register_packet_listener(
                script,
                packet_type,
                *direction,
                *priority,
                *mode,
                listener,
            ))
        }
        (
            HookDescriptor::Task {
                delay,
                interval,
                mode,
            },
            Callback::Task(f),
        ) => {
            let plan = SchedulePlan::select(*delay, *interval, *mode)?;
            Ok(plan.dispatch(managers.task_manager(), script, f))
        }
        (HookDescriptor::SyncCallbackTask { delay }, Callback::SyncCallback { work, callback }) => {
            if *delay < 0 {
                return Err(HookError::InvalidScheduleParameters {
                    delay: *delay,
                    interval: 0,
                });
            }
            Ok(managers
                .task_manager()
                .run_sync_callback_task(script, *delay as u64, work, callback))
        }
        (
            HookDescriptor::Placeholder {
                identifier,
                author,
                version,
            },
            Callback::Placeholder {
                function,
                relational,
            },
        ) => {
            let placeholders = managers
                .placeholder_manager()
                .ok_or(HookError::UnavailableDependency(Dependency::Placeholders))?;
            let identifier = identifier
                .clone()
                .unwrap_or_else(|| placeholder_identifier(script, None));
            placeholders.register_placeholder(script, &identifier, author, version, function, relational)
        }
        (HookDescriptor::PluginMessage { channel }, Callback::PluginMessage(f)) => {
            Ok(managers.message_manager().register_listener(script, channel, f))
        }
        (HookDescriptor::PubSub { channel, mode }, Callback::PubSub(f)) => {
            let pubsub = managers
                .pubsub_manager()
                .ok_or(HookError::UnavailableDependency(Dependency::PubSub))?;
            Ok(pubsub.register_listener(script, channel, *mode, f))
        }
        (descriptor, callback) => Err(HookError::CallbackMismatch {
            descriptor: descriptor.kind(),
            callback: callback.kind(),
        }),
    }
}

/// Hand a registration's native handle back to the manager that issued it.
fn release(managers: &mut dyn Managers, id: RegistrationId, entry: &Entry) {
    // a pending pair never reached the protocol manager
    let Some(native) = entry.native else {
        return;
    };
    let released = match &entry.descriptor {
        HookDescriptor::Event { .. } => managers.listener_manager().unregister_listener(native),
        HookDescriptor::Command(_) => managers.command_manager().unregister_command(native),
        HookDescriptor::Task { .. } | HookDescriptor::SyncCallbackTask { .. } => {
            managers.task_manager().stop_task(native)
        }
        HookDescriptor::PluginMessage { .. } => managers.message_manager().unregister_listener(native),
        HookDescriptor::Packet { .. } => match managers.protocol_manager() {
            Some(protocol) => protocol.unregister_packet_listener(native).is_some(),
            None => {
                warn!("Cannot release packet listener {id}: protocol manager is gone");
                return;
            }
        },
        HookDescriptor::Placeholder { .. } => match managers.placeholder_manager() {
            Some(placeholders) => placeholders.unregister_placeholder(native),
            None => {
                warn!("Cannot release placeholder {id}: placeholder manager is gone");
                return;
            }
        },
        HookDescriptor::PubSub { .. } => match managers.pubsub_manager() {
            Some(pubsub) => pubsub.unregister_listener(native),
            None => {
                warn!("Cannot release pub/sub listener {id}: pub/sub client is gone");
                return;
            }
        },
    };
    if !released {
        debug!("Registration {id} was already gone from its manager");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockManagers;
    use hookbind_api::{
        CommandSpec, EventPriority, ExecutionMode, PacketDirection, PacketEvent, ScriptEvent,
    };
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event(name: &str, priority: EventPriority) -> HookDescriptor {
        HookDescriptor::Event {
            event: name.into(),
            priority,
            ignore_cancelled: false,
        }
    }

    fn packet(packet_type: &str) -> HookDescriptor {
        HookDescriptor::Packet {
            packet_type: packet_type.into(),
            direction: PacketDirection::Upstream,
            priority: 0,
            mode: ExecutionMode::Sync,
        }
    }

    fn task(delay: i64, interval: i64) -> HookDescriptor {
        HookDescriptor::Task {
            delay,
            interval,
            mode: ExecutionMode::Sync,
        }
    }

    fn counter() -> (Rc<RefCell<u32>>, Rc<RefCell<u32>>) {
        let c = Rc::new(RefCell::new(0));
        (c.clone(), c)
    }

    #[test]
    fn event_unregister_stops_delivery() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let (calls, seen) = counter();

        let reg = facade
            .register(
                &mut managers,
                "greeter",
                event("SomeEvent", EventPriority::High),
                Callback::Event(Box::new(move |_, _| *seen.borrow_mut() += 1)),
            )
            .unwrap();

        managers.fire(&mut ScriptEvent::new("SomeEvent", json!({})));
        assert_eq!(*calls.borrow(), 1);

        assert!(facade.unregister(&mut managers, reg.id()));
        managers.fire(&mut ScriptEvent::new("SomeEvent", json!({})));
        assert_eq!(*calls.borrow(), 1);
        assert!(managers.listeners.is_empty());
    }

    #[test]
    fn double_unregister_is_a_noop_and_isolated() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let a = facade
            .register(&mut managers, "s", event("A", EventPriority::Normal), Callback::Event(Box::new(|_, _| {})))
            .unwrap();
        let b = facade
            .register(&mut managers, "s", event("B", EventPriority::Normal), Callback::Event(Box::new(|_, _| {})))
            .unwrap();

        assert!(facade.unregister(&mut managers, a.id()));
        assert!(!facade.unregister(&mut managers, a.id()));
        assert!(!facade.unregister(&mut managers, a.id()));

        assert!(facade.is_registered(b.id()));
        assert_eq!(managers.listeners.len(), 1);
    }

    #[test]
    fn callback_must_match_descriptor() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let err = facade
            .register(&mut managers, "s", task(0, 0), Callback::Event(Box::new(|_, _| {})))
            .unwrap_err();
        assert!(matches!(
            err,
            HookError::CallbackMismatch {
                descriptor: HookKind::Task,
                callback: HookKind::Event
            }
        ));

        let err = facade
            .register(
                &mut managers,
                "s",
                HookDescriptor::SyncCallbackTask { delay: 0 },
                Callback::Task(Box::new(|_| {})),
            )
            .unwrap_err();
        assert!(matches!(err, HookError::CallbackMismatch { .. }));
        assert!(facade.is_empty());
    }

    #[test]
    fn task_zero_twenty_is_repeating() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let reg = facade
            .register(&mut managers, "ticker", task(0, 20), Callback::Task(Box::new(|_| {})))
            .unwrap();
        assert_eq!(reg.kind(), HookKind::Task);
        assert_eq!(managers.task_log, vec!["repeat ticker 0 20".to_string()]);

        assert!(facade.cancel(&mut managers, reg.id()).unwrap());
        assert!(!facade.cancel(&mut managers, reg.id()).unwrap());
        assert!(managers.tasks.is_empty());
    }

    #[test]
    fn negative_schedule_never_reaches_scheduler() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let err = facade
            .register(&mut managers, "s", task(-1, 20), Callback::Task(Box::new(|_| {})))
            .unwrap_err();
        assert!(matches!(err, HookError::InvalidScheduleParameters { delay: -1, interval: 20 }));

        let err = facade
            .register(
                &mut managers,
                "s",
                HookDescriptor::SyncCallbackTask { delay: -3 },
                Callback::SyncCallback {
                    work: Box::new(|| json!(null)),
                    callback: Box::new(|_, _| {}),
                },
            )
            .unwrap_err();
        assert!(matches!(err, HookError::InvalidScheduleParameters { delay: -3, .. }));

        assert!(managers.task_log.is_empty());
        assert!(facade.is_empty());
    }

    #[test]
    fn cancel_rejects_non_tasks() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let reg = facade
            .register(&mut managers, "s", event("E", EventPriority::Low), Callback::Event(Box::new(|_, _| {})))
            .unwrap();
        let err = facade.cancel(&mut managers, reg.id()).unwrap_err();
        assert!(matches!(
            err,
            HookError::KindMismatch {
                expected: HookKind::Task,
                actual: HookKind::Event,
                ..
            }
        ));
        assert!(facade.is_registered(reg.id()));
    }

    #[test]
    fn packet_requires_protocol_manager() {
        let mut managers = MockManagers::new().without_protocol();
        let mut facade = RegistrationFacade::new();
        let err = facade
            .register(
                &mut managers,
                "s",
                packet("Chat"),
                Callback::Packet(PacketListener::single(PacketFlow::Receive, Box::new(|_, _| {}))),
            )
            .unwrap_err();
        assert!(matches!(err, HookError::UnavailableDependency(Dependency::Protocol)));

        let err = facade
            .begin_packet_pair(&mut managers, "s", packet("Chat"), PacketFlow::Receive, Box::new(|_, _| {}))
            .unwrap_err();
        assert!(matches!(err, HookError::UnavailableDependency(Dependency::Protocol)));
        assert!(facade.is_empty());
    }

    #[test]
    fn receive_then_send_yields_one_handle() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let (received, r) = counter();
        let (sent, s) = counter();

        let reg = facade
            .begin_packet_pair(
                &mut managers,
                "proxy",
                packet("Chat"),
                PacketFlow::Receive,
                Box::new(move |_, _| *r.borrow_mut() += 1),
            )
            .unwrap();
        assert!(managers.packets.is_empty());
        assert!(!facade.describe(reg.id()).unwrap().active);

        facade
            .pair_with(&mut managers, reg.id(), Box::new(move |_, _| *s.borrow_mut() += 1))
            .unwrap();
        assert_eq!(managers.packets.len(), 1);
        assert!(facade.describe(reg.id()).unwrap().active);

        let mut receive = PacketEvent::new("Chat", PacketDirection::Upstream, PacketFlow::Receive, json!({}));
        let mut send = PacketEvent::new("Chat", PacketDirection::Upstream, PacketFlow::Send, json!({}));
        managers.intercept(&mut receive);
        managers.intercept(&mut send);
        assert_eq!((*received.borrow(), *sent.borrow()), (1, 1));

        assert!(facade.unregister(&mut managers, reg.id()));
        assert!(managers.packets.is_empty());
        managers.intercept(&mut receive);
        managers.intercept(&mut send);
        assert_eq!((*received.borrow(), *sent.borrow()), (1, 1));
    }

    #[test]
    fn repairing_replaces_the_send_half() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let log = Rc::new(RefCell::new(Vec::<&str>::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());

        let reg = facade
            .begin_packet_pair(
                &mut managers,
                "proxy",
                packet("Chat"),
                PacketFlow::Receive,
                Box::new(move |_, _| l1.borrow_mut().push("receive")),
            )
            .unwrap();
        facade
            .pair_with(&mut managers, reg.id(), Box::new(move |_, _| l2.borrow_mut().push("old send")))
            .unwrap();
        facade
            .pair_with(&mut managers, reg.id(), Box::new(move |_, _| l3.borrow_mut().push("new send")))
            .unwrap();

        assert_eq!(managers.packets.len(), 1);
        assert_eq!(managers.packet_unregisters, 1);

        let mut receive = PacketEvent::new("Chat", PacketDirection::Upstream, PacketFlow::Receive, json!({}));
        let mut send = PacketEvent::new("Chat", PacketDirection::Upstream, PacketFlow::Send, json!({}));
        managers.intercept(&mut receive);
        managers.intercept(&mut send);
        assert_eq!(*log.borrow(), vec!["receive", "new send"]);
    }

    #[test]
    fn single_sided_listener_is_not_pairable() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let reg = facade
            .register(
                &mut managers,
                "s",
                packet("Chat"),
                Callback::Packet(PacketListener::single(PacketFlow::Send, Box::new(|_, _| {}))),
            )
            .unwrap();
        let err = facade
            .pair_with(&mut managers, reg.id(), Box::new(|_, _| {}))
            .unwrap_err();
        assert!(matches!(err, HookError::NotPairable(_)));
        assert!(facade.is_registered(reg.id()));
    }

    #[test]
    fn lost_listener_invalidates_registration() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let reg = facade
            .begin_packet_pair(&mut managers, "s", packet("Chat"), PacketFlow::Send, Box::new(|_, _| {}))
            .unwrap();
        facade.pair_with(&mut managers, reg.id(), Box::new(|_, _| {})).unwrap();
        managers.packets.clear();

        let err = facade
            .pair_with(&mut managers, reg.id(), Box::new(|_, _| {}))
            .unwrap_err();
        assert!(matches!(err, HookError::UnknownRegistration(_)));
        assert!(!facade.is_registered(reg.id()));
    }

    #[test]
    fn duplicates_per_script() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let command = |name: &str| HookDescriptor::Command(CommandSpec::new(name));
        let run = || Callback::Command {
            run: Box::new(|_, _| true),
            tab: None,
        };

        facade.register(&mut managers, "a", command("heal"), run()).unwrap();
        let err = facade
            .register(&mut managers, "a", command("HEAL"), run())
            .unwrap_err();
        assert!(matches!(err, HookError::DuplicateCommand(name) if name == "HEAL"));

        let listener = || Callback::Packet(PacketListener::single(PacketFlow::Receive, Box::new(|_, _| {})));
        facade.register(&mut managers, "a", packet("Chat"), listener()).unwrap();
        let err = facade
            .register(&mut managers, "a", packet("Chat"), listener())
            .unwrap_err();
        assert!(matches!(err, HookError::DuplicatePacketListener(t) if t == "Chat"));
        facade.register(&mut managers, "b", packet("Chat"), listener()).unwrap();
    }

    #[test]
    fn placeholder_identifier_defaults_and_strips() {
        assert_eq!(placeholder_identifier("stats", None), "script:stats");
        assert_eq!(placeholder_identifier("my_stats", None), "script:mystats");
        assert_eq!(placeholder_identifier("x", Some("{top_%list}")), "toplist");
    }

    #[test]
    fn placeholder_registration_and_relational() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let placeholder = || HookDescriptor::Placeholder {
            identifier: None,
            author: "Script Author".into(),
            version: "1.0.0".into(),
        };
        let function = || Callback::Placeholder {
            function: Box::new(|req| Some(req.params.to_uppercase())),
            relational: None,
        };

        let reg = facade.register(&mut managers, "stats", placeholder(), function()).unwrap();
        assert!(managers.placeholders.values().any(|p| p.0 == "script:stats"));
        match facade.describe(reg.id()).unwrap().descriptor {
            HookDescriptor::Placeholder { identifier, .. } => {
                assert_eq!(identifier.as_deref(), Some("script:stats"))
            }
            other => panic!("unexpected descriptor {other:?}"),
        }

        let err = facade.register(&mut managers, "stats", placeholder(), function()).unwrap_err();
        assert!(matches!(err, HookError::DuplicatePlaceholder));

        facade
            .set_relational(&mut managers, reg.id(), Box::new(|_| Some("ally".into())))
            .unwrap();
        assert!(managers.placeholders.values().all(|p| p.1));
    }

    #[test]
    fn placeholder_requires_placeholder_manager() {
        let mut managers = MockManagers::new().without_placeholders();
        let mut facade = RegistrationFacade::new();
        let err = facade
            .register(
                &mut managers,
                "s",
                HookDescriptor::Placeholder {
                    identifier: None,
                    author: String::new(),
                    version: String::new(),
                },
                Callback::Placeholder {
                    function: Box::new(|_| None),
                    relational: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, HookError::UnavailableDependency(Dependency::Placeholders)));
    }

    #[test]
    fn set_tab_checks_kind() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let cmd = facade
            .register(
                &mut managers,
                "s",
                HookDescriptor::Command(CommandSpec::new("warp")),
                Callback::Command {
                    run: Box::new(|_, _| true),
                    tab: None,
                },
            )
            .unwrap();
        facade
            .set_tab(&mut managers, cmd.id(), Box::new(|_, _| vec!["spawn".into()]))
            .unwrap();
        assert!(managers.commands.values().all(|c| c.1));
        assert_eq!(facade.find_command("s", "WARP"), Some(cmd));
        assert_eq!(facade.find_command("other", "warp"), None);

        let ev = facade
            .register(&mut managers, "s", event("E", EventPriority::Normal), Callback::Event(Box::new(|_, _| {})))
            .unwrap();
        let err = facade
            .set_tab(&mut managers, ev.id(), Box::new(|_, _| Vec::new()))
            .unwrap_err();
        assert!(matches!(err, HookError::KindMismatch { expected: HookKind::Command, .. }));

        let err = facade
            .set_tab(&mut managers, RegistrationId(999), Box::new(|_, _| Vec::new()))
            .unwrap_err();
        assert!(matches!(err, HookError::UnknownRegistration(RegistrationId(999))));
    }

    #[test]
    fn unload_is_isolated_per_script() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        for script in ["a", "b"] {
            facade
                .register(&mut managers, script, event("E", EventPriority::Normal), Callback::Event(Box::new(|_, _| {})))
                .unwrap();
            facade
                .register(&mut managers, script, task(5, 0), Callback::Task(Box::new(|_| {})))
                .unwrap();
        }
        facade
            .begin_packet_pair(&mut managers, "a", packet("Chat"), PacketFlow::Receive, Box::new(|_, _| {}))
            .unwrap();

        assert_eq!(facade.owners(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(facade.unload_script(&mut managers, "a"), 3);
        assert!(facade.registrations("a").is_empty());
        assert_eq!(facade.owners(), vec!["b".to_string()]);
        assert_eq!(facade.registrations("b").len(), 2);
        assert_eq!(managers.listeners.len(), 1);
        assert_eq!(managers.tasks.len(), 1);
        assert_eq!(facade.unload_script(&mut managers, "a"), 0);
    }

    #[test]
    fn reap_forgets_finished_one_shot_tasks() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let once = facade
            .register(&mut managers, "s", task(0, 0), Callback::Task(Box::new(|_| {})))
            .unwrap();
        let repeating = facade
            .register(&mut managers, "s", task(0, 20), Callback::Task(Box::new(|_| {})))
            .unwrap();

        managers.finish_one_shot_tasks();
        assert_eq!(facade.reap_finished_tasks(&mut managers), 1);
        assert!(!facade.is_registered(once.id()));
        assert!(facade.is_registered(repeating.id()));
        assert!(!facade.cancel(&mut managers, once.id()).unwrap());
    }

    #[test]
    fn plugin_message_listener_registers_on_channel() {
        let mut managers = MockManagers::new();
        let mut facade = RegistrationFacade::new();
        let reg = facade
            .register(
                &mut managers,
                "bridge",
                HookDescriptor::PluginMessage {
                    channel: "bungeecord:main".into(),
                },
                Callback::PluginMessage(Box::new(|_, _| {})),
            )
            .unwrap();
        assert_eq!(managers.channels.values().collect::<Vec<_>>(), vec!["bungeecord:main"]);
        let info = facade.describe(reg.id()).unwrap();
        assert_eq!(info.script, "bridge");
        assert!(info.active);
        assert!(facade.unregister(&mut managers, reg.id()));
        assert!(managers.channels.is_empty());
    }

    #[test]
    fn pubsub_listener_needs_a_client() {
        let pubsub = |mode| HookDescriptor::PubSub {
            channel: "network:chat".into(),
            mode,
        };

        let mut managers = MockManagers::new().without_pubsub();
        let mut facade = RegistrationFacade::new();
        let err = facade
            .register(&mut managers, "relay", pubsub(ExecutionMode::Sync), Callback::PubSub(Box::new(|_, _| {})))
            .unwrap_err();
        assert!(matches!(err, HookError::UnavailableDependency(Dependency::PubSub)));
        assert!(facade.is_empty());

        let mut managers = MockManagers::new();
        let sync = facade
            .register(&mut managers, "relay", pubsub(ExecutionMode::Sync), Callback::PubSub(Box::new(|_, _| {})))
            .unwrap();
        let background = facade
            .register(&mut managers, "relay", pubsub(ExecutionMode::Async), Callback::PubSub(Box::new(|_, _| {})))
            .unwrap();
        assert_eq!(sync.kind(), HookKind::PubSub);
        assert_eq!(
            managers.subscriptions.values().cloned().collect::<Vec<_>>(),
            vec![
                ("network:chat".to_string(), ExecutionMode::Sync),
                ("network:chat".to_string(), ExecutionMode::Async),
            ]
        );

        assert!(facade.unregister(&mut managers, sync.id()));
        assert_eq!(managers.subscriptions.len(), 1);
        assert_eq!(facade.unload_script(&mut managers, "relay"), 1);
        assert!(managers.subscriptions.is_empty());
        assert!(!facade.is_registered(background.id()));
    }
}
