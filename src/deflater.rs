//! Raw deflate compressor for one pipeline block
//!
//! Each block gets a fresh deflate state (optionally primed with the previous
//! block's tail as dictionary) and is either sync-flushed, leaving the stream
//! open and byte-aligned, or finished with BFINAL set. Concatenating the
//! outputs in block order yields a single valid deflate stream.
//!
//! Output buffers grow as needed, so one call always returns the complete
//! compressed bytes for its block, including every chunk of the finishing
//! sequence.

use crate::error::{PigzrError, PigzrResult};
use flate2::{Compress, Compression, FlushCompress, Status};
use std::cell::RefCell;

/// Extra room reserved whenever zlib fills the output buffer
const OUTPUT_CHUNK: usize = 16 * 1024;

thread_local! {
    // One compressor per worker thread, reset before every block
    static BLOCK_DEFLATER: RefCell<Option<BlockDeflater>> = const { RefCell::new(None) };
}

pub struct BlockDeflater {
    level: u32,
    inner: Compress,
}

impl BlockDeflater {
    /// Raw deflate (no zlib wrapper) at the given level
    pub fn new(level: u32) -> Self {
        Self {
            level,
            inner: Compress::new(Compression::new(level), false),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Drop all history and pending output
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Prime the window with bytes that directly precede this block's input
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> PigzrResult<()> {
        self.inner.set_dictionary(dictionary)?;
        Ok(())
    }

    /// Compress `input` and sync-flush. The deflate stream stays open.
    pub fn sync_flush(&mut self, input: &[u8]) -> PigzrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(initial_capacity(input.len()));
        self.drive(input, FlushCompress::Sync, &mut out)?;
        Ok(out)
    }

    /// Compress `input` and run the finishing sequence to stream end.
    pub fn finish(&mut self, input: &[u8]) -> PigzrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(initial_capacity(input.len()));
        self.drive(input, FlushCompress::Finish, &mut out)?;
        Ok(out)
    }

    fn drive(
        &mut self,
        mut input: &[u8],
        flush: FlushCompress,
        out: &mut Vec<u8>,
    ) -> PigzrResult<()> {
        loop {
            if out.len() == out.capacity() {
                out.reserve(OUTPUT_CHUNK);
            }

            let before_in = self.inner.total_in();
            let before_out = out.len();

            let status = self.inner.compress_vec(input, out, flush)?;

            let consumed = (self.inner.total_in() - before_in) as usize;
            let produced = out.len() - before_out;
            input = &input[consumed..];

            // zlib leaves spare output space only once it has nothing left to emit
            let drained = out.len() < out.capacity();

            match status {
                Status::StreamEnd => return Ok(()),
                Status::Ok | Status::BufError => {
                    if flush != FlushCompress::Finish && input.is_empty() && drained {
                        return Ok(());
                    }
                    if consumed == 0 && produced == 0 && drained {
                        return Err(PigzrError::compression(format!(
                            "deflate stalled with {} bytes of input left",
                            input.len()
                        )));
                    }
                }
            }
        }
    }
}

#[inline]
fn initial_capacity(input_len: usize) -> usize {
    input_len + (input_len / 10) + 1024
}

/// Run `f` with this thread's cached compressor, freshly reset.
pub fn with_thread_deflater<T>(level: u32, f: impl FnOnce(&mut BlockDeflater) -> T) -> T {
    BLOCK_DEFLATER.with(|cache| {
        let mut cache = cache.borrow_mut();
        let deflater = match cache.take() {
            Some(mut d) if d.level() == level => {
                d.reset();
                d
            }
            _ => BlockDeflater::new(level),
        };
        f(cache.insert(deflater))
    })
}
