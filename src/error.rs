//! Error types for event access, signal delivery and configuration.

use std::io;

use thiserror::Error;

use crate::input::EventKind;

/// Invalid access to an event record or event buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("event index {index} out of range (buffer holds {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("payload mismatch: expected {expected}, record is {actual}")]
    KindMismatch { expected: EventKind, actual: EventKind },
}

/// Failures while managing or delivering signals.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("no guest entry point installed")]
    NoGuestEntry,
    #[error("guest entry point already installed")]
    EntryAlreadyInstalled,
    #[error("signal context table exhausted ({limit} contexts)")]
    ContextsExhausted { limit: usize },
    #[error("signal context dissolved")]
    ContextDissolved,
    #[error("entrypoint is gone")]
    EntrypointGone,
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

pub type AccessResult<T> = Result<T, AccessError>;
pub type SignalResult<T> = Result<T, SignalError>;
