//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Operations of [`Engine`](crate::Engine) return [`anyhow::Result`]; errors raised
/// by the engine itself carry one of these variants and can be recovered with
/// `err.downcast_ref::<TabularError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabularError {
    /// A training configuration violates one or more invariants.
    #[error("Invalid training config: {0}")]
    ConfigValidation(String),

    /// The environment does not follow the reset/step/action space contract.
    #[error("Environment protocol error: {0}")]
    Protocol(String),

    /// The resolved action set has no members.
    #[error("Action space is empty")]
    EmptyActionSpace,

    /// The engine was queried before any action was registered.
    #[error("Runtime state error: {0}")]
    RuntimeState(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKey(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueType(String),
}
