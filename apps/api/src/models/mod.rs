pub mod attendance;
pub mod commitment;
pub mod notification;
pub mod pod;
pub mod user;

use thiserror::Error;

/// Raised when a stored or submitted string is outside a closed enumeration.
#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
