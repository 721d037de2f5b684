//! The handle returned for every registration.

use hookbind_api::{HookError, HookKind, Managers, PacketFn, RegistrationId, RelationalFn, TabFn};

use crate::facade::RegistrationFacade;

/// A registered callback.
///
/// Small and `Copy`: it holds no callback and no manager, only the id the
/// façade uses to find them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration {
    id: RegistrationId,
    kind: HookKind,
}

impl Registration {
    pub(crate) fn new(id: RegistrationId, kind: HookKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    /// Returns `false` if it was already unregistered.
    pub fn unregister(self, facade: &mut RegistrationFacade, managers: &mut dyn Managers) -> bool {
        facade.unregister(managers, self.id)
    }

    /// Stop a task. Fails on any other kind of registration.
    pub fn cancel(
        self,
        facade: &mut RegistrationFacade,
        managers: &mut dyn Managers,
    ) -> Result<bool, HookError> {
        facade.cancel(managers, self.id)
    }

    /// Supply the other half of a receive/send packet pair.
    pub fn pair_with(
        self,
        facade: &mut RegistrationFacade,
        managers: &mut dyn Managers,
        half: PacketFn,
    ) -> Result<(), HookError> {
        facade.pair_with(managers, self.id, half)
    }

    pub fn set_tab(
        self,
        facade: &mut RegistrationFacade,
        managers: &mut dyn Managers,
        tab: TabFn,
    ) -> Result<(), HookError> {
        facade.set_tab(managers, self.id, tab)
    }

    pub fn set_relational(
        self,
        facade: &mut RegistrationFacade,
        managers: &mut dyn Managers,
        function: RelationalFn,
    ) -> Result<(), HookError> {
        facade.set_relational(managers, self.id, function)
    }

    pub fn is_registered(&self, facade: &RegistrationFacade) -> bool {
        facade.is_registered(self.id)
    }
}
