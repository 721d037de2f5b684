//! Registration and config errors.

use std::fmt;

use thiserror::Error;

use crate::{HookKind, RegistrationId};

/// An optional integration that some hooks need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Protocol,
    Placeholders,
    PubSub,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Protocol => f.write_str("protocol manager"),
            Dependency::Placeholders => f.write_str("placeholder manager"),
            Dependency::PubSub => f.write_str("pub/sub client"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0} is not available on this server")]
    UnavailableDependency(Dependency),

    #[error("invalid schedule parameters: delay={delay}, interval={interval} (must not be negative)")]
    InvalidScheduleParameters { delay: i64, interval: i64 },

    #[error("command '{0}' is already registered by this script")]
    DuplicateCommand(String),

    #[error("command label '{label}' is already owned by script '{owner}'")]
    CommandConflict { label: String, owner: String },

    #[error("script already has a packet listener for '{0}' registered")]
    DuplicatePacketListener(String),

    #[error("script already has a placeholder expansion registered")]
    DuplicatePlaceholder,

    #[error("placeholder identifier '{0}' is already in use")]
    PlaceholderConflict(String),

    #[error("unknown registration {0}")]
    UnknownRegistration(RegistrationId),

    #[error("registration {id} is of kind {actual}, expected {expected}")]
    KindMismatch {
        id: RegistrationId,
        expected: HookKind,
        actual: HookKind,
    },

    #[error("script has no {0} registered")]
    NotRegistered(String),

    #[error("registration {0} is not a paired packet listener")]
    NotPairable(RegistrationId),

    #[error("a {callback} callback cannot be attached to a {descriptor} hook")]
    CallbackMismatch {
        descriptor: HookKind,
        callback: HookKind,
    },

    #[error("script dependency error: {0}")]
    ScriptDependency(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
