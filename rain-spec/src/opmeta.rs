//! Opcode descriptors.
//!
//! An [`OpMeta`] is the complete declarative description of one VM
//! instruction: stable id, canonical name and aliases, arities, parameter
//! validity, operand codec, and a documentation payload. The registry
//! (`registry` module) indexes these by id and by normalized name.

use crate::operand::OperandCodec;
use serde_json::Value;

/// Input arity of an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputArity {
    /// Takes exactly this many parameters.
    Fixed(usize),
    /// Parameter count varies; the descriptor's [`ParamSpec`] bounds it.
    Dynamic,
}

/// Output arity as a function of the resolved operand.
#[derive(Clone, Copy, Debug)]
pub enum OutputArity {
    Fixed(usize),
    FromOperand(fn(u16) -> usize),
}

impl OutputArity {
    pub fn resolve(&self, operand: u16) -> usize {
        match self {
            OutputArity::Fixed(n) => *n,
            OutputArity::FromOperand(f) => f(operand),
        }
    }
}

/// Parameter-count validity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamSpec {
    Exact(usize),
    MoreThan(usize),
    OneOf(Vec<usize>),
    /// Odd and strictly greater than the bound.
    OddMoreThan(usize),
    Any,
}

impl ParamSpec {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            ParamSpec::Exact(n) => count == *n,
            ParamSpec::MoreThan(n) => count > *n,
            ParamSpec::OneOf(choices) => choices.contains(&count),
            ParamSpec::OddMoreThan(n) => count > *n && count % 2 == 1,
            ParamSpec::Any => true,
        }
    }
}

/// Documentation payload attached to a descriptor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpDoc {
    pub description: String,
    /// Opaque tooling payload, carried through to resolved parse nodes.
    pub data: Option<Value>,
}

impl OpDoc {
    pub fn describe(description: &str) -> Self {
        OpDoc {
            description: description.to_string(),
            data: None,
        }
    }
}

/// One opcode descriptor.
#[derive(Clone, Debug)]
pub struct OpMeta {
    /// Stable numeric tag; equals the descriptor's registry position.
    pub id: u16,
    /// Canonical name, uppercase.
    pub name: String,
    /// Alternate names; matched after normalization like the canonical one.
    pub aliases: Vec<String>,
    pub inputs: InputArity,
    pub outputs: OutputArity,
    pub params: ParamSpec,
    pub codec: OperandCodec,
    pub doc: OpDoc,
}

impl OpMeta {
    /// A zero-operand opcode with fixed arity and one output.
    pub fn fixed(id: u16, name: &str, inputs: usize, description: &str) -> Self {
        OpMeta {
            id,
            name: name.to_string(),
            aliases: Vec::new(),
            inputs: InputArity::Fixed(inputs),
            outputs: OutputArity::Fixed(1),
            params: ParamSpec::Exact(inputs),
            codec: OperandCodec::zero(),
            doc: OpDoc::describe(description),
        }
    }

    /// A dynamic-arity reducer: operand is the parameter count, which must
    /// exceed `min_params`.
    pub fn reducer(id: u16, name: &str, min_params: usize, description: &str) -> Self {
        OpMeta {
            id,
            name: name.to_string(),
            aliases: Vec::new(),
            inputs: InputArity::Dynamic,
            outputs: OutputArity::Fixed(1),
            params: ParamSpec::MoreThan(min_params),
            codec: OperandCodec::param_count(),
            doc: OpDoc::describe(description),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn with_codec(mut self, codec: OperandCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_inputs(mut self, inputs: InputArity) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: OutputArity) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_params(mut self, params: ParamSpec) -> Self {
        self.params = params;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_spec() {
        assert!(ParamSpec::Exact(2).accepts(2));
        assert!(!ParamSpec::Exact(2).accepts(3));
        assert!(ParamSpec::MoreThan(1).accepts(2));
        assert!(!ParamSpec::MoreThan(1).accepts(1));
        assert!(ParamSpec::OneOf(vec![2, 3, 10]).accepts(10));
        assert!(!ParamSpec::OneOf(vec![2, 3, 10]).accepts(4));
        assert!(ParamSpec::OddMoreThan(2).accepts(5));
        assert!(!ParamSpec::OddMoreThan(2).accepts(4));
        assert!(!ParamSpec::OddMoreThan(2).accepts(1));
        assert!(ParamSpec::Any.accepts(0));
    }

    #[test]
    fn test_output_arity_resolve() {
        assert_eq!(OutputArity::Fixed(1).resolve(7), 1);
        let from_op = OutputArity::FromOperand(|operand| operand as usize);
        assert_eq!(from_op.resolve(3), 3);
    }

    #[test]
    fn test_builders() {
        let meta = OpMeta::fixed(11, "EQUAL_TO", 2, "equality comparison").with_alias("EQ");
        assert_eq!(meta.id, 11);
        assert_eq!(meta.params, ParamSpec::Exact(2));
        assert!(meta.codec.is_zero());
        assert_eq!(meta.aliases, vec!["EQ".to_string()]);
    }
}
