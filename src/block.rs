//! One unit of parallel work: a fixed-size chunk of input
//!
//! A unit is read on the driving thread (`read_input`, strictly in block
//! order) and compressed on the worker pool (`run`). Reading updates the
//! stream checksum and snapshots the dictionary from the predecessor, so by
//! the time `run` executes the unit needs nothing from any other unit.

use crate::checksum::StreamChecksum;
use crate::deflater::with_thread_deflater;
use crate::error::PigzrResult;
use crate::sink::BatchSink;
use std::io::{self, Read};

/// Default uncompressed bytes per block (pigz default)
pub const BLOCK_SIZE: usize = 128 * 1024;

/// Deflate window size; the dictionary is the last DICT_SIZE bytes of the previous block
pub const DICT_SIZE: usize = 32 * 1024;

pub struct BlockUnit {
    index: u64,
    level: u32,
    raw: Vec<u8>,
    /// Bytes read; None until read, or after hitting end of input
    len: Option<usize>,
    dictionary: Option<Vec<u8>>,
    has_predecessor: bool,
    is_final: bool,
}

impl BlockUnit {
    pub fn new(index: u64, block_size: usize, level: u32) -> Self {
        Self {
            index,
            level,
            raw: vec![0u8; block_size],
            len: None,
            dictionary: None,
            has_predecessor: false,
            is_final: false,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn bytes_read(&self) -> usize {
        self.len.unwrap_or(0)
    }

    pub fn data(&self) -> &[u8] {
        &self.raw[..self.bytes_read()]
    }

    pub fn dictionary(&self) -> Option<&[u8]> {
        self.dictionary.as_deref()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn mark_final(&mut self) {
        self.is_final = true;
    }

    /// Fill this block from `reader`.
    ///
    /// Returns `None` at end of input, leaving the checksum untouched.
    /// Otherwise the checksum is advanced by exactly the bytes read and the
    /// predecessor's tail is copied in as dictionary when it holds a full
    /// window. Must be called in block order, one unit at a time.
    pub fn read_input<R: Read>(
        &mut self,
        reader: &mut R,
        checksum: &mut StreamChecksum,
        predecessor: Option<&BlockUnit>,
    ) -> PigzrResult<Option<usize>> {
        let filled = fill_block(reader, &mut self.raw)?;
        if filled == 0 {
            self.len = None;
            return Ok(None);
        }
        self.len = Some(filled);
        checksum.update(&self.raw[..filled]);

        self.has_predecessor = predecessor.is_some();
        self.dictionary = predecessor
            .map(BlockUnit::data)
            .filter(|prev| prev.len() >= DICT_SIZE)
            .map(|prev| prev[prev.len() - DICT_SIZE..].to_vec());

        Ok(Some(filled))
    }

    /// Compress this block and hand the result to `sink`.
    ///
    /// Non-final blocks are sync-flushed; the final block is finished and all
    /// of its finishing output is deposited as one buffer.
    pub fn run(&self, sink: &BatchSink) -> PigzrResult<()> {
        let compressed = with_thread_deflater(self.level, |deflater| {
            if self.has_predecessor {
                if let Some(dict) = self.dictionary() {
                    deflater.set_dictionary(dict)?;
                }
            }
            if self.is_final {
                deflater.finish(self.data())
            } else {
                deflater.sync_flush(self.data())
            }
        })?;

        log::trace!(
            "block {}: {} -> {} bytes{}",
            self.index,
            self.bytes_read(),
            compressed.len(),
            if self.is_final { " (final)" } else { "" }
        );

        let valid = compressed.len();
        sink.record_block(self.index, compressed, valid)
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
