//! The deployable artifact.
//!
//! A [`StateConfig`] is what the front-end hands to deployment: the interned
//! 256-bit constants plus one packed bytecode buffer per compiled
//! sub-expression. Source index 0 is the entry point.

use crate::instruction::Instruction;
use crate::word::Word256;
use serde::{Deserialize, Serialize};

/// Compiled program state: constants plus per-source bytecode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    /// 256-bit constants, in first-encounter order.
    pub constants: Vec<Word256>,
    /// Packed instruction buffers, one per sub-expression.
    pub sources: Vec<Vec<u8>>,
}

impl StateConfig {
    /// True for the all-or-nothing failure artifact `{[], []}`.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.sources.is_empty()
    }

    /// Iterate the packed instructions of one source.
    ///
    /// Trailing bytes that do not fill a whole instruction are ignored;
    /// well-formed sources never have any.
    pub fn instructions(&self, source: usize) -> impl Iterator<Item = Instruction> + '_ {
        self.sources
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .chunks_exact(Instruction::BYTES)
            .map(|chunk| Instruction::from_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    /// SHA-256 over the full artifact: constant count and words, then each
    /// source's length and bytes.
    pub fn hash(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();

        hasher.update((self.constants.len() as u32).to_le_bytes());
        for constant in &self.constants {
            hasher.update(constant.as_be_bytes());
        }

        hasher.update((self.sources.len() as u32).to_le_bytes());
        for source in &self.sources {
            hasher.update((source.len() as u32).to_le_bytes());
            hasher.update(source);
        }

        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_artifact() {
        let config = StateConfig::default();
        assert!(config.is_empty());
        assert_eq!(config.instructions(0).count(), 0);
    }

    #[test]
    fn test_instruction_iteration() {
        let mut source = Vec::new();
        source.extend_from_slice(&Instruction::new(19, 2).to_bytes());
        source.extend_from_slice(&Instruction::new(0, 4).to_bytes());
        let config = StateConfig {
            constants: vec![Word256::from(7u64)],
            sources: vec![source],
        };
        let decoded: Vec<Instruction> = config.instructions(0).collect();
        assert_eq!(decoded, vec![Instruction::new(19, 2), Instruction::new(0, 4)]);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = StateConfig {
            constants: vec![Word256::from(1u64)],
            sources: vec![vec![1, 0, 0, 0]],
        };
        let mut b = a.clone();
        assert_eq!(a.hash(), b.hash());
        b.constants[0] = Word256::from(2u64);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_distinguishes_source_split() {
        // Same bytes, different source boundaries.
        let a = StateConfig {
            constants: vec![],
            sources: vec![vec![1, 2, 3, 4], vec![]],
        };
        let b = StateConfig {
            constants: vec![],
            sources: vec![vec![], vec![1, 2, 3, 4]],
        };
        assert_ne!(a.hash(), b.hash());
    }
}
