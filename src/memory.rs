//! Flat, word-addressable data memory.
//!
//! No caches, no TLB, no paging: one `Vec<i32>` sized to the architectural limit.
//! The low region is reserved for the program image so that data accesses can never
//! alias code, and the only job left for this module is bounds/alignment checking.

use crate::error::ExecutionError;

pub const MAX_BYTES: u32 = 1 << 20;
pub const WORD_BYTES: u32 = 4;

pub struct Memory {
    words: Vec<i32>,
    code_bytes: u32,
}

impl Memory {
    /// Builds a zeroed memory whose first `instruction_count` words are reserved for
    /// the program image and therefore off-limits to `lw`/`sw`.
    pub fn new(instruction_count: usize) -> Self {
        Self {
            words: vec![0i32; (MAX_BYTES / WORD_BYTES) as usize],
            code_bytes: instruction_count as u32 * WORD_BYTES,
        }
    }

    fn word_index(&self, address: u32) -> Result<usize, ExecutionError> {
        if address % WORD_BYTES != 0 {
            return Err(ExecutionError::InvalidAddress(address));
        }
        if address < self.code_bytes || address >= MAX_BYTES {
            return Err(ExecutionError::InvalidAddress(address));
        }
        Ok((address / WORD_BYTES) as usize)
    }

    pub fn load(&self, address: u32) -> Result<i32, ExecutionError> {
        let index = self.word_index(address)?;
        Ok(self.words[index])
    }

    /// Stores `value` at `address`. Returns `Some((word_address, value))` when the
    /// store actually changed the word, for the per-cycle memory-delta log; returns
    /// `None` when the store was a no-op (the value already matched).
    pub fn store(&mut self, address: u32, value: i32) -> Result<Option<(u32, i32)>, ExecutionError> {
        let index = self.word_index(address)?;
        if self.words[index] == value {
            return Ok(None);
        }
        self.words[index] = value;
        Ok(Some(((address / WORD_BYTES), value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_misaligned_access() {
        let mem = Memory::new(0);
        assert!(matches!(
            mem.load(2),
            Err(ExecutionError::InvalidAddress(2))
        ));
    }

    #[test]
    fn rejects_access_into_the_code_region() {
        let mem = Memory::new(4);
        assert!(matches!(
            mem.load(0),
            Err(ExecutionError::InvalidAddress(0))
        ));
        assert!(mem.load(16).is_ok());
    }

    #[test]
    fn rejects_access_past_the_addressable_limit() {
        let mem = Memory::new(0);
        assert!(matches!(
            mem.load(MAX_BYTES),
            Err(ExecutionError::InvalidAddress(_))
        ));
    }

    #[test]
    fn store_reports_word_address_and_suppresses_no_op_writes() {
        let mut mem = Memory::new(0);
        let delta = mem.store(100, 4000).unwrap();
        assert_eq!(delta, Some((25, 4000)));
        assert_eq!(mem.load(100).unwrap(), 4000);

        let delta_again = mem.store(100, 4000).unwrap();
        assert_eq!(delta_again, None);
    }
}
