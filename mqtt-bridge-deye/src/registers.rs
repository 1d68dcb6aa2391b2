//! Raw register values collected during one cycle.

use std::collections::BTreeMap;
use std::fmt;

/// Register address to raw register bytes, as transmitted (big-endian).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMap {
    registers: BTreeMap<u16, [u8; 2]>,
}

impl RegisterMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from consecutive 16-bit words read starting at `start`.
    pub fn from_words(start: u16, words: &[u16]) -> Self {
        let registers = (start..=u16::MAX)
            .zip(words)
            .map(|(address, word)| (address, word.to_be_bytes()))
            .collect();
        Self { registers }
    }

    /// Bytes of one register, if it was read.
    pub fn get(&self, address: u16) -> Option<[u8; 2]> {
        self.registers.get(&address).copied()
    }

    /// One register as an unsigned big-endian word.
    pub fn word(&self, address: u16) -> Option<u16> {
        self.get(address).map(u16::from_be_bytes)
    }

    /// Add every register of `other`, replacing duplicates.
    pub fn merge(&mut self, other: RegisterMap) {
        self.registers.extend(other.registers);
    }

    /// Number of registers held.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Whether no register is held.
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl FromIterator<(u16, [u8; 2])> for RegisterMap {
    fn from_iter<T: IntoIterator<Item = (u16, [u8; 2])>>(iter: T) -> Self {
        Self {
            registers: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RegisterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (address, [hi, lo]) in &self.registers {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{:#06x}={:02x}{:02x}", address, hi, lo)?;
        }
        Ok(())
    }
}
