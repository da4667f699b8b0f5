//! Error types for the instruction-set crate.

use crate::operand::OperandError;
use crate::word::WordError;
use thiserror::Error;

/// Errors raised while loading or using an opcode registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// Two descriptors claim the same normalized name or alias.
    #[error("opcode name collision: \"{name}\" is claimed by ids {first} and {second}")]
    NameCollision { name: String, first: u16, second: u16 },

    /// A descriptor's id disagrees with its table position.
    #[error("opcode id {id} does not match its table position {position}")]
    IdMismatch { id: u16, position: usize },

    #[error(transparent)]
    Operand(#[from] OperandError),

    #[error(transparent)]
    Word(#[from] WordError),
}
