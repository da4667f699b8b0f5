//! Parse-tree node types.
//!
//! The parser never aborts: diagnostics are part of the tree, either as
//! free-standing [`ErrorNode`]s or as the `error` field of an [`OpNode`].
//! All spans are inclusive byte offsets into the original, untrimmed input.

use serde::Serialize;
use serde_json::Value;

/// Inclusive byte span into the original input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// A single-byte span.
    pub const fn point(at: usize) -> Self {
        Span { start: at, end: at }
    }
}

/// One node of the parse tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseNode {
    Value(ValueNode),
    Op(OpNode),
    Error(ErrorNode),
}

impl ParseNode {
    pub fn position(&self) -> Span {
        match self {
            ParseNode::Value(node) => node.position,
            ParseNode::Op(node) => node.position,
            ParseNode::Error(node) => node.position,
        }
    }

    /// True if this node or any node below it carries a diagnostic.
    pub fn has_errors(&self) -> bool {
        match self {
            ParseNode::Error(_) => true,
            ParseNode::Value(_) => false,
            ParseNode::Op(op) => op.error.is_some() || op.parameters.iter().any(ParseNode::has_errors),
        }
    }
}

/// A literal integer, placeholder, `arg(n)` reference, or sentinel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueNode {
    pub value: String,
    pub position: Span,
}

/// Name and documentation of a resolved (or unresolved) opcode reference.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpcodeRef {
    pub name: String,
    pub description: String,
    /// Span of the name token alone.
    pub position: Span,
}

/// An operator application in any of the three notations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpNode {
    pub opcode: OpcodeRef,
    /// Packed operand; `None` until resolution, or on error.
    pub operand: Option<u16>,
    /// Output arity; `None` until resolution, or on error.
    pub output: Option<usize>,
    /// Full span of the application, head through closing paren.
    pub position: Span,
    /// Offsets of the opening and closing parens.
    pub parens: Span,
    pub parameters: Vec<ParseNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand_args: Option<OperandArgs>,
    /// Opaque payload from the opcode's documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the node was written in infix notation.
    pub infix: bool,
}

impl OpNode {
    /// A fresh, unresolved node for a head named `name`.
    pub fn unresolved(name: String, name_span: Span) -> Self {
        OpNode {
            opcode: OpcodeRef {
                name,
                description: String::new(),
                position: name_span,
            },
            operand: None,
            output: None,
            position: name_span,
            parens: Span::default(),
            parameters: Vec::new(),
            operand_args: None,
            data: None,
            error: None,
            infix: false,
        }
    }
}

/// Compile-time arguments supplied with `<...>`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperandArgs {
    /// Span from `<` through `>`.
    pub position: Span,
    pub args: Vec<OperandArg>,
}

/// One integer inside `<...>`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperandArg {
    pub value: i64,
    pub position: Span,
}

/// A free-standing diagnostic.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorNode {
    pub error: String,
    pub position: Span,
}

/// The parsed form of one `;`-separated sub-expression.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SourceTree {
    /// Span of the sub-expression text.
    pub position: Span,
    pub nodes: Vec<ParseNode>,
}

/// The parsed program: one [`SourceTree`] per sub-expression, in textual
/// order. Entry index 0 becomes source 0 of the artifact.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParseTree {
    pub sources: Vec<SourceTree>,
}

impl ParseTree {
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// True if any node anywhere in the tree carries a diagnostic.
    pub fn has_errors(&self) -> bool {
        self.sources
            .iter()
            .flat_map(|source| &source.nodes)
            .any(ParseNode::has_errors)
    }
}
