//! Code generation.
//!
//! Post-order traversal over a resolved tree: literals intern into the
//! constant pool and read back through `STATE`, `arg(n)` references emit a
//! reserved sentinel opcode rewritten by [`update_args`], pseudo-ops lower
//! to their comparison followed by `ISZERO`, and every other op emits its
//! parameters then one packed instruction.
//!
//! Generation is all-or-nothing: any diagnostic anywhere in the tree yields
//! the empty artifact, leaving the tree itself for error reporting.

use crate::tree::{ParseNode, ParseTree, ValueNode};
use rain_spec::{normalize, Instruction, OpMetaRegistry, Resolved, StateConfig, Word256};

/// Memory kinds the `STATE` operand distinguishes.
const MEMORY_CONSTANT: u16 = 0;

/// What a value node means to the emitter.
enum ValueKind {
    Literal(Word256),
    Arg(u16),
    /// `_` or a spawned multi-output placeholder: the position is produced
    /// by an op, nothing to emit.
    Placeholder,
}

fn classify(value: &ValueNode, placeholder: char) -> ValueKind {
    let text = value.value.as_str();
    let mut sentinel = [0u8; 4];
    if text == &*placeholder.encode_utf8(&mut sentinel) || text.ends_with(" placeholder") {
        return ValueKind::Placeholder;
    }
    if let Some(index) = text
        .strip_prefix("arg(")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|digits| digits.trim().parse::<u16>().ok())
    {
        return ValueKind::Arg(index);
    }
    if matches!(
        normalize(text).as_str(),
        "MAXUINT256" | "MAX_UINT256" | "INFINITY"
    ) {
        return ValueKind::Literal(Word256::MAX);
    }
    ValueKind::Literal(Word256::parse(text).unwrap_or(Word256::ZERO))
}

/// Index of `word` in the pool, interning on first encounter.
fn intern(constants: &mut Vec<Word256>, word: Word256) -> usize {
    match constants.iter().position(|existing| *existing == word) {
        Some(index) => index,
        None => {
            constants.push(word);
            constants.len() - 1
        }
    }
}

fn state_operand(kind: u16, index: usize) -> u16 {
    ((index as u16) << 1) | kind
}

struct Emitter<'a> {
    registry: &'a OpMetaRegistry,
    placeholder: char,
    constants: &'a mut Vec<Word256>,
    /// Added to every `arg(n)` index: the arg counts of earlier sources.
    arg_offset: u16,
    /// Arguments this source references (max index + 1).
    args_in_source: u16,
    buf: Vec<u8>,
}

impl Emitter<'_> {
    fn push(&mut self, instruction: Instruction) {
        self.buf.extend_from_slice(&instruction.to_bytes());
    }

    fn op_id(&self, name: &str) -> Option<u16> {
        match self.registry.find(name)? {
            Resolved::Op(meta) => Some(meta.id),
            Resolved::Pseudo(_) => None,
        }
    }

    fn emit_nodes(&mut self, nodes: &[ParseNode]) {
        for node in nodes {
            self.emit_node(node);
        }
    }

    fn emit_node(&mut self, node: &ParseNode) {
        match node {
            ParseNode::Value(value) => match classify(value, self.placeholder) {
                ValueKind::Placeholder => {}
                ValueKind::Arg(index) => {
                    self.args_in_source = self.args_in_source.max(index + 1);
                    self.push(Instruction::new(
                        self.registry.sentinel_id(),
                        index + self.arg_offset,
                    ));
                }
                ValueKind::Literal(word) => {
                    let index = intern(self.constants, word);
                    if let Some(state) = self.op_id("STATE") {
                        self.push(Instruction::new(
                            state,
                            state_operand(MEMORY_CONSTANT, index),
                        ));
                    }
                }
            },
            ParseNode::Op(op) => {
                self.emit_nodes(&op.parameters);
                match self.registry.find(&op.opcode.name) {
                    Some(Resolved::Pseudo(pseudo)) => {
                        if let (Some(comparison), Some(iszero)) =
                            (self.op_id(pseudo.comparison()), self.op_id("ISZERO"))
                        {
                            self.push(Instruction::new(comparison, 0));
                            self.push(Instruction::new(iszero, 0));
                        }
                    }
                    Some(Resolved::Op(meta)) => {
                        self.push(Instruction::new(meta.id, op.operand.unwrap_or(0)));
                    }
                    None => {}
                }
            }
            ParseNode::Error(_) => {}
        }
    }
}

/// Compile one node list into a single-source artifact.
///
/// `offset` shifts `arg(n)` sentinels the way earlier sources would have;
/// `constants` seeds the pool so buffers can share one interning space.
pub fn build_bytes(
    nodes: &[ParseNode],
    registry: &OpMetaRegistry,
    placeholder: char,
    offset: u16,
    constants: Vec<Word256>,
) -> StateConfig {
    let mut constants = constants;
    let mut emitter = Emitter {
        registry,
        placeholder,
        constants: &mut constants,
        arg_offset: offset,
        args_in_source: 0,
        buf: Vec::new(),
    };
    emitter.emit_nodes(nodes);
    let buf = emitter.buf;
    StateConfig {
        constants,
        sources: vec![buf],
    }
}

/// Compile a whole resolved tree into its artifact.
///
/// Any diagnostic in the tree makes this the empty `{[], []}` artifact.
pub fn generate(tree: &ParseTree, registry: &OpMetaRegistry, placeholder: char) -> StateConfig {
    if tree.has_errors() {
        log::debug!("tree has errors, emitting empty artifact");
        return StateConfig::default();
    }
    let mut constants = Vec::new();
    let mut sources = Vec::with_capacity(tree.len());
    let mut arg_offset = 0u16;
    for source in &tree.sources {
        let mut emitter = Emitter {
            registry,
            placeholder,
            constants: &mut constants,
            arg_offset,
            args_in_source: 0,
            buf: Vec::new(),
        };
        emitter.emit_nodes(&source.nodes);
        arg_offset += emitter.args_in_source;
        sources.push(emitter.buf);
    }
    let mut config = StateConfig { constants, sources };
    update_args(&mut config, registry);
    log::debug!(
        "generated {} sources, {} constants",
        config.sources.len(),
        config.constants.len()
    );
    config
}

/// Rewrite `arg(n)` sentinels into constant reads.
///
/// Each sentinel instruction becomes `STATE(constant, n + constants.len())`
/// with the pool length taken at rewrite time: argument values are expected
/// to be appended to the pool after the compiled sources.
pub fn update_args(config: &mut StateConfig, registry: &OpMetaRegistry) {
    let sentinel = registry.sentinel_id();
    let state = match registry.find("STATE") {
        Some(Resolved::Op(meta)) => meta.id,
        _ => return,
    };
    let base = config.constants.len() as u16;
    for source in &mut config.sources {
        for record in source.chunks_exact_mut(Instruction::BYTES) {
            let mut instruction =
                Instruction::from_bytes([record[0], record[1], record[2], record[3]]);
            if instruction.opcode == sentinel {
                instruction.opcode = state;
                instruction.operand =
                    state_operand(MEMORY_CONSTANT, (instruction.operand + base) as usize);
                record.copy_from_slice(&instruction.to_bytes());
            }
        }
    }
}
