//! # Rain VM Instruction-Set Description
//!
//! Declarative description of the Rain expression VM: opcode descriptors
//! with operand codecs, the indexable metadata registry, and the deployable
//! [`StateConfig`] artifact.
//!
//! ## Key Features
//! - 16-bit opcode id + 16-bit operand packed instructions
//! - Per-opcode operand codecs (bit fields, param-count derivations)
//! - Name/alias registry with normalized lookup and pseudo-opcodes
//! - 256-bit big-endian constant words

pub mod error;
pub mod instruction;
pub mod operand;
pub mod opmeta;
pub mod registry;
pub mod state_config;
pub mod word;

pub use error::SpecError;
pub use instruction::Instruction;
pub use operand::{ArgRule, BitField, OperandCodec, OperandError, OperandLayout, ParamTie};
pub use opmeta::{InputArity, OpDoc, OpMeta, OutputArity, ParamSpec};
pub use registry::{
    normalize, OpMetaRegistry, PseudoMeta, PseudoMetaPatch, PseudoOp, Resolved,
};
pub use state_config::StateConfig;
pub use word::{Word256, WordError};
