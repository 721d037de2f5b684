//! Registration façade over a plugin host's managers.
//!
//! Scripts register callbacks on named hooks through [`Hooks`]. The
//! [`RegistrationFacade`] forwards each registration to the right external
//! manager and hands back a [`Registration`] that can release it again.

mod facade;
mod handle_table;
mod hooks;
mod registration;
mod schedule;
mod script;

#[cfg(test)]
mod test_support;

pub use facade::{placeholder_identifier, RegistrationFacade, RegistrationInfo};
pub use handle_table::HandleTable;
pub use hooks::Hooks;
pub use registration::Registration;
pub use schedule::SchedulePlan;
pub use script::{Script, ScriptInfo};
