//! Operand codecs.
//!
//! Every opcode carries a 16-bit operand. How that operand is built from
//! compile-time arguments (or from the parameter count) is opcode-specific;
//! an [`OperandCodec`] describes the layout declaratively and provides the
//! encoder/decoder pair over it.
//!
//! Encoders are total over the ranges their rules accept; decoders invert
//! them. For the derived layouts ([`OperandLayout::ParamCount`],
//! [`OperandLayout::ParamCountLess`], [`OperandLayout::PairCount`]) there
//! are no user-supplied arguments, so `decode` reconstructs the encoder's
//! input instead: the parameter count.

use thiserror::Error;

/// Errors from encoding operand arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperandError {
    /// An argument failed its range rule.
    #[error("out-of-bound operand argument at index {index}")]
    OutOfBound { index: usize },

    /// The number of supplied arguments does not match the layout.
    #[error("invalid operand arguments: expected {expected}, found {found}")]
    WrongArgCount { expected: usize, found: usize },
}

/// Ties an operand argument's value to the parameter count at encode time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamTie {
    /// The argument must equal the parameter count.
    EqualsParamCount,
    /// The argument must equal the parameter count minus one.
    ParamCountLessOne,
}

/// Inclusive numeric range for one operand argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgRule {
    pub min: i64,
    pub max: i64,
    pub tie: Option<ParamTie>,
}

impl ArgRule {
    pub const fn range(min: i64, max: i64) -> Self {
        ArgRule { min, max, tie: None }
    }

    pub const fn tied(min: i64, max: i64, tie: ParamTie) -> Self {
        ArgRule {
            min,
            max,
            tie: Some(tie),
        }
    }

    /// Check one argument against the rule.
    pub fn check(&self, value: i64, param_count: usize) -> bool {
        if value < self.min || value > self.max {
            return false;
        }
        match self.tie {
            Some(ParamTie::EqualsParamCount) => value == param_count as i64,
            Some(ParamTie::ParamCountLessOne) => value == param_count as i64 - 1,
            None => true,
        }
    }
}

/// One bit-packed operand field, in user-argument order.
///
/// `shift` positions the field explicitly; argument order and bit order
/// need not agree (CONTEXT takes `<column row>` but stores the row in the
/// low byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    pub shift: u32,
    pub bits: u32,
    pub rule: ArgRule,
    pub signed: bool,
}

impl BitField {
    pub const fn new(name: &'static str, shift: u32, bits: u32, rule: ArgRule) -> Self {
        BitField {
            name,
            shift,
            bits,
            rule,
            signed: false,
        }
    }

    /// A two's-complement field.
    pub const fn signed(name: &'static str, shift: u32, bits: u32, rule: ArgRule) -> Self {
        BitField {
            name,
            shift,
            bits,
            rule,
            signed: true,
        }
    }

    const fn mask(&self) -> u16 {
        ((1u32 << self.bits) - 1) as u16
    }
}

/// The operand layout of one opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperandLayout {
    /// Operand is always zero; the opcode takes no operand arguments.
    Zero,
    /// Operand is the parameter count.
    ParamCount,
    /// Operand is the parameter count minus a fixed base.
    ParamCountLess(u16),
    /// Operand is `(param_count - 1) / 2`: a leading parameter followed by
    /// pairs.
    PairCount,
    /// Operand is bit-packed from user-supplied `<...>` arguments.
    Fields(Vec<BitField>),
}

/// Per-opcode operand packing and unpacking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperandCodec {
    layout: OperandLayout,
}

impl OperandCodec {
    pub const fn zero() -> Self {
        OperandCodec {
            layout: OperandLayout::Zero,
        }
    }

    pub const fn param_count() -> Self {
        OperandCodec {
            layout: OperandLayout::ParamCount,
        }
    }

    pub const fn param_count_less(base: u16) -> Self {
        OperandCodec {
            layout: OperandLayout::ParamCountLess(base),
        }
    }

    pub const fn pair_count() -> Self {
        OperandCodec {
            layout: OperandLayout::PairCount,
        }
    }

    pub fn fields(fields: Vec<BitField>) -> Self {
        OperandCodec {
            layout: OperandLayout::Fields(fields),
        }
    }

    pub fn layout(&self) -> &OperandLayout {
        &self.layout
    }

    /// Whether the operand is fixed at zero and cannot carry arguments.
    pub fn is_zero(&self) -> bool {
        matches!(self.layout, OperandLayout::Zero)
    }

    /// The user-supplied argument rules, in argument order.
    pub fn arg_rules(&self) -> &[BitField] {
        match &self.layout {
            OperandLayout::Fields(fields) => fields,
            _ => &[],
        }
    }

    /// How many `<...>` arguments the layout expects.
    pub fn arg_count(&self) -> usize {
        self.arg_rules().len()
    }

    /// Pack arguments (plus the parameter count) into an operand.
    ///
    /// For the derived layouts a parameter count below the base saturates
    /// to zero; the opcode's parameter validator rejects such counts
    /// afterwards.
    pub fn encode(&self, args: &[i64], param_count: usize) -> Result<u16, OperandError> {
        match &self.layout {
            OperandLayout::Fields(fields) => {
                if args.len() != fields.len() {
                    return Err(OperandError::WrongArgCount {
                        expected: fields.len(),
                        found: args.len(),
                    });
                }
                let mut operand = 0u16;
                for (index, (field, &value)) in fields.iter().zip(args).enumerate() {
                    if !field.rule.check(value, param_count) {
                        return Err(OperandError::OutOfBound { index });
                    }
                    operand |= ((value as u16) & field.mask()) << field.shift;
                }
                Ok(operand)
            }
            layout => {
                if !args.is_empty() {
                    return Err(OperandError::WrongArgCount {
                        expected: 0,
                        found: args.len(),
                    });
                }
                Ok(match layout {
                    OperandLayout::Zero => 0,
                    OperandLayout::ParamCount => param_count as u16,
                    OperandLayout::ParamCountLess(base) => {
                        (param_count as u16).saturating_sub(*base)
                    }
                    OperandLayout::PairCount => (param_count as u16).saturating_sub(1) / 2,
                    OperandLayout::Fields(_) => unreachable!(),
                })
            }
        }
    }

    /// Unpack an operand into the encoder's inputs.
    ///
    /// Field layouts yield the argument tuple; derived layouts yield the
    /// parameter count they were encoded from.
    pub fn decode(&self, operand: u16) -> Vec<i64> {
        match &self.layout {
            OperandLayout::Zero => Vec::new(),
            OperandLayout::ParamCount => vec![operand as i64],
            OperandLayout::ParamCountLess(base) => vec![(operand + base) as i64],
            OperandLayout::PairCount => vec![(operand as i64) * 2 + 1],
            OperandLayout::Fields(fields) => fields
                .iter()
                .map(|field| {
                    let raw = ((operand >> field.shift) & field.mask()) as i64;
                    if field.signed && raw & (1 << (field.bits - 1)) != 0 {
                        raw - (1 << field.bits)
                    } else {
                        raw
                    }
                })
                .collect(),
        }
    }
}
