//! Ordered output for one batch of blocks
//!
//! Workers call [`BatchSink::record_block`] as they finish, in any order.
//! The driving thread calls [`BatchSink::flush_all`] after the batch barrier
//! and the compressed bytes go out strictly by block index.

use crate::error::{PigzrError, PigzrResult};
use crate::slot_map::OrderedSlotMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct BatchSink {
    prepare_for: usize,
    start_from: u64,
    /// Valid compressed length per slot; 0 means nothing was recorded
    valid_bytes: Vec<AtomicUsize>,
    outputs: OrderedSlotMap<Vec<u8>>,
}

impl BatchSink {
    /// `prepare_for` slots, slot 0 holding absolute block `start_from`
    pub fn new(prepare_for: usize, start_from: u64) -> Self {
        Self {
            prepare_for,
            start_from,
            valid_bytes: (0..prepare_for).map(|_| AtomicUsize::new(0)).collect(),
            outputs: OrderedSlotMap::with_capacity(prepare_for),
        }
    }

    fn slot_for(&self, block_index: u64) -> PigzrResult<usize> {
        block_index
            .checked_sub(self.start_from)
            .map(|slot| slot as usize)
            .filter(|&slot| slot < self.prepare_for)
            .ok_or_else(|| {
                PigzrError::internal(format!(
                    "block {} outside batch [{}, {})",
                    block_index,
                    self.start_from,
                    self.start_from + self.prepare_for as u64
                ))
            })
    }

    /// Hand over a finished block. `valid_len` bytes of `compressed` are written.
    pub fn record_block(
        &self,
        block_index: u64,
        compressed: Vec<u8>,
        valid_len: usize,
    ) -> PigzrResult<()> {
        let slot = self.slot_for(block_index)?;
        if valid_len > compressed.len() {
            return Err(PigzrError::internal(format!(
                "block {} claims {} valid bytes of {}",
                block_index,
                valid_len,
                compressed.len()
            )));
        }
        self.valid_bytes[slot].store(valid_len, Ordering::Release);
        self.outputs.put(slot, compressed)
    }

    /// Write every recorded block in slot order. Slots never recorded are skipped.
    ///
    /// Returns the number of compressed bytes written.
    pub fn flush_all<W: Write>(&self, writer: &mut W) -> PigzrResult<u64> {
        let mut written = 0u64;
        for (slot, valid) in self.valid_bytes.iter().enumerate() {
            let valid = valid.load(Ordering::Acquire);
            if valid == 0 {
                continue;
            }
            let compressed = self.outputs.get(slot)?;
            writer
                .write_all(&compressed[..valid])
                .map_err(PigzrError::Output)?;
            written += valid as u64;
        }
        Ok(written)
    }
}
