//! # Rain Expression Compiler
//!
//! Front-end for the Rain expression language: parses prefix, postfix, and
//! infix notation into an annotated tree and lowers it to the deployable
//! [`StateConfig`] artifact.
//!
//! Parsing never fails — diagnostics live inside the tree — and code
//! generation is all-or-nothing: any diagnostic yields the empty artifact.
//!
//! ## Example
//!
//! ```rust
//! use rain_compiler::parse;
//!
//! let (tree, config) = parse("add(9 5 6 mul(9 6));");
//! assert!(!tree.has_errors());
//! assert_eq!(config.constants.len(), 3);
//! assert_eq!(config.sources.len(), 1);
//! ```

pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod tree;

pub use codegen::{build_bytes, generate, update_args};
pub use error::CompileError;
pub use tree::{
    ErrorNode, OpNode, OpcodeRef, OperandArg, OperandArgs, ParseNode, ParseTree, SourceTree, Span,
    ValueNode,
};

use rain_spec::{OpMeta, OpMetaRegistry, PseudoMetaPatch, PseudoOp, SpecError, StateConfig};

/// Default placeholder character for multi-output sentinels.
pub const DEFAULT_PLACEHOLDER: char = '_';

/// Characters a placeholder may not collide with.
const DELIMITERS: &str = "()<>,;";

/// The expression compiler: an opcode registry plus parser configuration.
///
/// All parse state is per-call; a `Compiler` may be reused freely. The
/// registry may be mutated between — never during — parse calls.
pub struct Compiler {
    registry: OpMetaRegistry,
    placeholder: char,
}

impl Compiler {
    /// A compiler over the standard opcode table.
    pub fn new() -> Self {
        Compiler {
            registry: OpMetaRegistry::standard(),
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }

    pub fn with_registry(registry: OpMetaRegistry) -> Self {
        Compiler {
            registry,
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }

    pub fn registry(&self) -> &OpMetaRegistry {
        &self.registry
    }

    /// Replace the opcode metadata wholesale.
    pub fn set_opmeta(&mut self, ops: Vec<OpMeta>) -> Result<(), SpecError> {
        self.registry = OpMetaRegistry::new(ops)?;
        Ok(())
    }

    pub fn set_gte_meta(&mut self, patch: PseudoMetaPatch) {
        self.registry.patch_pseudo(PseudoOp::Gte, patch);
    }

    pub fn set_lte_meta(&mut self, patch: PseudoMetaPatch) {
        self.registry.patch_pseudo(PseudoOp::Lte, patch);
    }

    pub fn set_ineq_meta(&mut self, patch: PseudoMetaPatch) {
        self.registry.patch_pseudo(PseudoOp::Ineq, patch);
    }

    /// Change the placeholder character.
    pub fn set_placeholder(&mut self, placeholder: char) -> Result<(), CompileError> {
        if placeholder.is_alphanumeric()
            || placeholder.is_whitespace()
            || DELIMITERS.contains(placeholder)
        {
            return Err(CompileError::InvalidPlaceholder(placeholder));
        }
        self.placeholder = placeholder;
        Ok(())
    }

    /// Parse a program into its tree and artifact.
    pub fn parse(&self, text: &str) -> (ParseTree, StateConfig) {
        let tree = self.parse_tree(text);
        let config = codegen::generate(&tree, &self.registry, self.placeholder);
        (tree, config)
    }

    /// Parse a program, keeping only the tree.
    pub fn parse_tree(&self, text: &str) -> ParseTree {
        parser::Parser::new(&self.registry, self.placeholder).parse_tree(text)
    }

    /// Parse a program, keeping only the artifact.
    pub fn state_config(&self, text: &str) -> StateConfig {
        let tree = self.parse_tree(text);
        codegen::generate(&tree, &self.registry, self.placeholder)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

/// Parse with the standard opcode table and default placeholder.
pub fn parse(text: &str) -> (ParseTree, StateConfig) {
    Compiler::new().parse(text)
}

/// Parse tree only, with the standard table and default placeholder.
pub fn get_parse_tree(text: &str) -> ParseTree {
    Compiler::new().parse_tree(text)
}

/// Artifact only, with the standard table and default placeholder.
pub fn get_state_config(text: &str) -> StateConfig {
    Compiler::new().state_config(text)
}
