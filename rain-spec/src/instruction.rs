//! Packed VM instructions.
//!
//! One instruction is 32 bits on the wire: a 16-bit opcode id followed by a
//! 16-bit operand, both little-endian. The operand's meaning is
//! opcode-specific and defined by the opcode's operand codec.

use serde::{Deserialize, Serialize};

/// A packed instruction: opcode id plus operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: u16,
    pub operand: u16,
}

impl Instruction {
    /// Wire width of one instruction.
    pub const BYTES: usize = 4;

    pub const fn new(opcode: u16, operand: u16) -> Self {
        Instruction { opcode, operand }
    }

    /// Serialize to the 4-byte wire form.
    pub const fn to_bytes(self) -> [u8; 4] {
        let op = self.opcode.to_le_bytes();
        let arg = self.operand.to_le_bytes();
        [op[0], op[1], arg[0], arg[1]]
    }

    /// Deserialize from the 4-byte wire form.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Instruction {
            opcode: u16::from_le_bytes([bytes[0], bytes[1]]),
            operand: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }
}
