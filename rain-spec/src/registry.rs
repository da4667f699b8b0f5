//! The opcode metadata registry.
//!
//! An [`OpMetaRegistry`] is the indexable table of opcode descriptors the
//! parser and code generator consult. Descriptors live in a `Vec` whose
//! positions are the stable opcode ids; a single shared map from normalized
//! name to id serves both the canonical and alias spaces, and a collision
//! in that map is a fatal load error.
//!
//! The registry is read-only during a parse. Three pseudo-opcodes — GTE,
//! LTE, INEQ — are surface-syntax only: they carry name, aliases, and a
//! documentation payload but no id, and their metadata may be patched
//! between parses.

use crate::error::SpecError;
use crate::opmeta::{InputArity, OpDoc, OpMeta, OutputArity, ParamSpec};
use crate::operand::{ArgRule, BitField, OperandCodec, ParamTie};
use serde_json::Value;
use std::collections::HashMap;

/// Normalize an identifier for lookup: uppercase, `-` replaced by `_`.
pub fn normalize(name: &str) -> String {
    name.trim().to_uppercase().replace('-', "_")
}

/// The three comparison shorthands the parser synthesises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PseudoOp {
    Gte,
    Lte,
    Ineq,
}

impl PseudoOp {
    /// Canonical name of the comparison this pseudo-op lowers through.
    ///
    /// The full lowering is `comparison` then `ISZERO`.
    pub const fn comparison(&self) -> &'static str {
        match self {
            PseudoOp::Gte => "LESS_THAN",
            PseudoOp::Lte => "GREATER_THAN",
            PseudoOp::Ineq => "EQUAL_TO",
        }
    }
}

/// Metadata for one pseudo-opcode.
#[derive(Clone, Debug, PartialEq)]
pub struct PseudoMeta {
    pub name: String,
    pub aliases: Vec<String>,
    pub doc: OpDoc,
}

impl PseudoMeta {
    fn new(name: &str, description: &str) -> Self {
        PseudoMeta {
            name: name.to_string(),
            aliases: Vec::new(),
            doc: OpDoc::describe(description),
        }
    }
}

/// A partial update applied to a pseudo-opcode's metadata.
#[derive(Clone, Debug, Default)]
pub struct PseudoMetaPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub data: Option<Value>,
    pub aliases: Option<Vec<String>>,
}

/// Result of a registry name lookup.
#[derive(Clone, Copy, Debug)]
pub enum Resolved<'a> {
    Op(&'a OpMeta),
    Pseudo(PseudoOp),
}

/// The indexable opcode descriptor table.
#[derive(Clone, Debug)]
pub struct OpMetaRegistry {
    ops: Vec<OpMeta>,
    lookup: HashMap<String, u16>,
    gte: PseudoMeta,
    lte: PseudoMeta,
    ineq: PseudoMeta,
}

impl OpMetaRegistry {
    /// Build a registry from a descriptor table.
    ///
    /// Descriptor ids must equal their table positions, and no two
    /// descriptors may share a normalized name or alias.
    pub fn new(ops: Vec<OpMeta>) -> Result<Self, SpecError> {
        let mut lookup = HashMap::new();
        for (position, meta) in ops.iter().enumerate() {
            if meta.id as usize != position {
                return Err(SpecError::IdMismatch {
                    id: meta.id,
                    position,
                });
            }
            for name in std::iter::once(&meta.name).chain(&meta.aliases) {
                let key = normalize(name);
                if let Some(&first) = lookup.get(&key) {
                    return Err(SpecError::NameCollision {
                        name: key,
                        first,
                        second: meta.id,
                    });
                }
                lookup.insert(key, meta.id);
            }
        }
        Ok(OpMetaRegistry {
            ops,
            lookup,
            gte: PseudoMeta::new("GTE", "true if the first value is not less than the second"),
            lte: PseudoMeta::new("LTE", "true if the first value is not greater than the second"),
            ineq: PseudoMeta::new("INEQ", "true if the two values differ"),
        })
    }

    /// The standard VM descriptor table.
    pub fn standard() -> Self {
        OpMetaRegistry::new(standard_ops()).expect("standard opcode table is collision-free")
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The reserved opcode id code generation uses for unresolved `arg(n)`
    /// references: one past the last real id.
    pub fn sentinel_id(&self) -> u16 {
        self.ops.len() as u16
    }

    pub fn get(&self, id: u16) -> Option<&OpMeta> {
        self.ops.get(id as usize)
    }

    pub fn ops(&self) -> &[OpMeta] {
        &self.ops
    }

    /// Look a raw identifier up across canonical names, aliases, and the
    /// pseudo-opcodes. Real opcodes shadow pseudo-opcodes on collision.
    pub fn find(&self, raw: &str) -> Option<Resolved<'_>> {
        let key = normalize(raw);
        if let Some(&id) = self.lookup.get(&key) {
            return Some(Resolved::Op(&self.ops[id as usize]));
        }
        for (pseudo, meta) in [
            (PseudoOp::Gte, &self.gte),
            (PseudoOp::Lte, &self.lte),
            (PseudoOp::Ineq, &self.ineq),
        ] {
            if normalize(&meta.name) == key || meta.aliases.iter().any(|a| normalize(a) == key) {
                return Some(Resolved::Pseudo(pseudo));
            }
        }
        None
    }

    pub fn pseudo_meta(&self, which: PseudoOp) -> &PseudoMeta {
        match which {
            PseudoOp::Gte => &self.gte,
            PseudoOp::Lte => &self.lte,
            PseudoOp::Ineq => &self.ineq,
        }
    }

    /// Patch pseudo-opcode metadata. Only allowed between parse calls.
    pub fn patch_pseudo(&mut self, which: PseudoOp, patch: PseudoMetaPatch) {
        let meta = match which {
            PseudoOp::Gte => &mut self.gte,
            PseudoOp::Lte => &mut self.lte,
            PseudoOp::Ineq => &mut self.ineq,
        };
        if let Some(name) = patch.name {
            meta.name = name;
        }
        if let Some(description) = patch.description {
            meta.doc.description = description;
        }
        if let Some(data) = patch.data {
            meta.doc.data = Some(data);
        }
        if let Some(aliases) = patch.aliases {
            meta.aliases = aliases;
        }
    }
}

impl Default for OpMetaRegistry {
    fn default() -> Self {
        OpMetaRegistry::standard()
    }
}

fn call_outputs(operand: u16) -> usize {
    ((operand >> 3) & 0x3) as usize
}

fn operand_outputs(operand: u16) -> usize {
    operand as usize
}

/// The standard VM opcode table. Ids are table positions.
fn standard_ops() -> Vec<OpMeta> {
    vec![
        OpMeta::fixed(0, "STATE", 0, "read one value from constant or stack memory").with_codec(
            OperandCodec::fields(vec![
                BitField::new("kind", 0, 1, ArgRule::range(0, 1)),
                BitField::new("index", 1, 7, ArgRule::range(0, 127)),
            ]),
        ),
        OpMeta::fixed(1, "STORAGE", 0, "read one contract storage slot").with_codec(
            OperandCodec::fields(vec![BitField::new("index", 0, 8, ArgRule::range(0, 255))]),
        ),
        // Argument order is <column row>; the row lands in the low byte.
        OpMeta::fixed(2, "CONTEXT", 0, "read one cell of the call context grid").with_codec(
            OperandCodec::fields(vec![
                BitField::new("column", 8, 8, ArgRule::range(0, 255)),
                BitField::new("row", 0, 8, ArgRule::range(0, 255)),
            ]),
        ),
        OpMeta::fixed(3, "BLOCK_NUMBER", 0, "current block number"),
        OpMeta::fixed(4, "TIMESTAMP", 0, "current block timestamp").with_alias("BLOCK_TIMESTAMP"),
        OpMeta::fixed(5, "CALLER", 0, "caller address").with_alias("SENDER"),
        OpMeta::fixed(6, "THIS_ADDRESS", 0, "address of the executing contract"),
        OpMeta::fixed(7, "CALL", 0, "run another source over the given inputs")
            .with_inputs(InputArity::Dynamic)
            .with_outputs(OutputArity::FromOperand(call_outputs))
            .with_params(ParamSpec::Any)
            .with_codec(OperandCodec::fields(vec![
                BitField::new("input_size", 0, 3, ArgRule::tied(0, 7, ParamTie::EqualsParamCount)),
                BitField::new("output_size", 3, 2, ArgRule::range(1, 3)),
                BitField::new("source_index", 5, 11, ArgRule::range(1, 7)),
            ])),
        OpMeta::fixed(8, "LOOP_N", 0, "run a source a fixed number of times")
            .with_inputs(InputArity::Dynamic)
            .with_params(ParamSpec::Any)
            .with_codec(OperandCodec::fields(vec![
                BitField::new("n", 0, 4, ArgRule::range(0, 15)),
                BitField::new("source_index", 4, 4, ArgRule::range(1, 15)),
            ])),
        OpMeta::fixed(9, "DO_WHILE", 0, "run a source until its condition is zero")
            .with_inputs(InputArity::Dynamic)
            .with_outputs(OutputArity::FromOperand(operand_outputs))
            .with_params(ParamSpec::MoreThan(0))
            .with_codec(OperandCodec::fields(vec![BitField::new(
                "values",
                0,
                8,
                ArgRule::range(1, 255),
            )])),
        OpMeta::fixed(10, "EAGER_IF", 3, "select between two eagerly evaluated branches"),
        OpMeta::fixed(11, "EQUAL_TO", 2, "equality comparison").with_alias("EQ"),
        OpMeta::fixed(12, "LESS_THAN", 2, "strict less-than comparison").with_alias("LT"),
        OpMeta::fixed(13, "GREATER_THAN", 2, "strict greater-than comparison").with_alias("GT"),
        OpMeta::fixed(14, "ISZERO", 1, "true if the value is zero"),
        OpMeta::reducer(15, "EVERY", 1, "first zero value, or the last value"),
        OpMeta::reducer(16, "ANY", 1, "first nonzero value, or zero"),
        OpMeta::reducer(17, "ENSURE", 0, "revert unless every value is nonzero"),
        OpMeta::reducer(18, "HASH", 0, "keccak hash of the values"),
        OpMeta::reducer(19, "ADD", 1, "checked sum"),
        OpMeta::reducer(20, "SUB", 1, "checked left-to-right difference"),
        OpMeta::reducer(21, "MUL", 1, "checked product"),
        OpMeta::reducer(22, "DIV", 1, "left-to-right integer division"),
        OpMeta::reducer(23, "MOD", 1, "left-to-right modulo"),
        OpMeta::reducer(24, "EXP", 1, "left-to-right exponentiation"),
        OpMeta::reducer(25, "MIN", 1, "smallest value"),
        OpMeta::reducer(26, "MAX", 1, "largest value"),
        OpMeta::reducer(27, "SATURATING_ADD", 1, "sum, saturating at the numeric bounds")
            .with_alias("SAT_ADD"),
        OpMeta::reducer(28, "SATURATING_SUB", 1, "difference, saturating at zero")
            .with_alias("SAT_SUB"),
        OpMeta::reducer(29, "SATURATING_MUL", 1, "product, saturating at the numeric bounds")
            .with_alias("SAT_MUL"),
        OpMeta::fixed(30, "SCALE18", 1, "rescale a fixed-point value to 18 decimals")
            .with_alias("SCALE_18")
            .with_codec(OperandCodec::fields(vec![BitField::new(
                "decimals",
                0,
                8,
                ArgRule::range(0, 255),
            )])),
        OpMeta::fixed(31, "SCALE18_MUL", 2, "multiply after rescaling to 18 decimals").with_codec(
            OperandCodec::fields(vec![BitField::new("decimals", 0, 8, ArgRule::range(0, 255))]),
        ),
        OpMeta::fixed(32, "SCALE18_DIV", 2, "divide after rescaling to 18 decimals").with_codec(
            OperandCodec::fields(vec![BitField::new("decimals", 0, 8, ArgRule::range(0, 255))]),
        ),
        OpMeta::fixed(33, "SCALE_BY", 1, "rescale by a signed power of ten")
            .with_alias("SCALEBY")
            .with_codec(OperandCodec::fields(vec![BitField::signed(
                "scale",
                0,
                8,
                ArgRule::range(-128, 127),
            )])),
        OpMeta::fixed(34, "SCALEN", 1, "rescale an 18-decimal value to n decimals")
            .with_alias("SCALE_N")
            .with_codec(OperandCodec::fields(vec![BitField::new(
                "decimals",
                0,
                8,
                ArgRule::range(0, 255),
            )])),
        // Argument order is <logic mode length>; length fills the low bits
        // and is tied to the parameter count (length == param_count - 1).
        OpMeta::fixed(35, "SELECT_LTE", 0, "combine tier reports by a less-than-or-equal rule")
            .with_inputs(InputArity::Dynamic)
            .with_params(ParamSpec::MoreThan(1))
            .with_codec(OperandCodec::fields(vec![
                BitField::new("logic", 7, 1, ArgRule::range(0, 1)),
                BitField::new("mode", 5, 2, ArgRule::range(0, 2)),
                BitField::new("length", 0, 5, ArgRule::tied(1, 31, ParamTie::ParamCountLessOne)),
            ])),
        OpMeta::fixed(36, "UPDATE_TIMES_FOR_TIER_RANGE", 2, "update a tier range in a report")
            .with_codec(OperandCodec::fields(vec![
                BitField::new("start_tier", 0, 4, ArgRule::range(0, 8)),
                BitField::new("end_tier", 4, 4, ArgRule::range(0, 8)),
            ])),
        OpMeta::fixed(37, "SATURATING_DIFF", 2, "per-tier difference, saturating at zero")
            .with_alias("SAT_DIFF"),
        OpMeta::fixed(38, "ITIERV2_REPORT", 0, "tier report for an account")
            .with_inputs(InputArity::Dynamic)
            .with_params(ParamSpec::OneOf(vec![2, 3, 10]))
            .with_codec(OperandCodec::param_count_less(2)),
        OpMeta::fixed(39, "ITIERV2_REPORT_TIME_FOR_TIER", 0, "report time for one tier")
            .with_inputs(InputArity::Dynamic)
            .with_params(ParamSpec::OneOf(vec![3, 4, 11]))
            .with_codec(OperandCodec::param_count_less(3)),
        OpMeta::fixed(40, "IERC20_BALANCE_OF", 2, "ERC20 balance of an account"),
        OpMeta::fixed(41, "IERC20_TOTAL_SUPPLY", 1, "ERC20 total supply"),
        OpMeta::fixed(42, "IERC20_SNAPSHOT_BALANCE_OF_AT", 3, "ERC20 balance at a snapshot"),
        OpMeta::fixed(43, "IERC20_SNAPSHOT_TOTAL_SUPPLY_AT", 2, "ERC20 total supply at a snapshot"),
        OpMeta::fixed(44, "IERC721_BALANCE_OF", 2, "ERC721 balance of an account"),
        OpMeta::fixed(45, "IERC721_OWNER_OF", 2, "owner of an ERC721 token"),
        OpMeta::fixed(46, "IERC1155_BALANCE_OF", 3, "ERC1155 balance of an account"),
        OpMeta::fixed(47, "IERC1155_BALANCE_OF_BATCH", 0, "ERC1155 balances for account/id pairs")
            .with_inputs(InputArity::Dynamic)
            .with_outputs(OutputArity::FromOperand(operand_outputs))
            .with_params(ParamSpec::OddMoreThan(2))
            .with_codec(OperandCodec::pair_count()),
        OpMeta::fixed(48, "ISALEV2_REMAINING_TOKEN_INVENTORY", 1, "tokens left in a sale"),
        OpMeta::fixed(49, "ISALEV2_RESERVE", 1, "reserve token of a sale"),
        OpMeta::fixed(50, "ISALEV2_SALE_STATUS", 1, "status of a sale"),
        OpMeta::fixed(51, "ISALEV2_TOKEN", 1, "token being sold"),
        OpMeta::fixed(52, "ISALEV2_TOTAL_RESERVE_RECEIVED", 1, "reserve received by a sale"),
    ]
}
