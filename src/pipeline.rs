//! Batched parallel gzip compression of a stream
//!
//! Pigz's threading model, batch by batch:
//!
//! 1. The driving thread reads `num_threads` new blocks in order, updating the
//!    CRC and giving each block the tail of its predecessor as dictionary.
//! 2. The blocks of the batch are compressed on the worker pool, each with its
//!    own deflate state, and deposited into the batch's sink.
//! 3. After the barrier the sink writes them out by block index.
//!
//! The last block read in a batch is not compressed there; it is carried into
//! the next batch as `blocks[0]` so that end of input can still mark it final.
//! The result is one gzip member: a single deflate stream of sync-flushed
//! blocks closed by a finished one.

use crate::block::{BlockUnit, BLOCK_SIZE, DICT_SIZE};
use crate::checksum::StreamChecksum;
use crate::deflater::BlockDeflater;
use crate::error::{PigzrError, PigzrResult};
use crate::format;
use crate::scheduler::WorkerPool;
use crate::sink::BatchSink;
use std::io::{Read, Write};

/// zlib's default level
pub const DEFAULT_LEVEL: u32 = 6;

/// Host parallelism, falling back to one thread when it cannot be queried
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressConfig {
    pub num_threads: usize,
    pub block_size: usize,
    pub level: u32,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            num_threads: available_threads(),
            block_size: BLOCK_SIZE,
            level: DEFAULT_LEVEL,
        }
    }
}

impl CompressConfig {
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads,
            ..Self::default()
        }
    }

    fn validate(&self) -> PigzrResult<()> {
        if self.num_threads == 0 {
            return Err(PigzrError::invalid_argument("thread count must be positive"));
        }
        if self.block_size < DICT_SIZE {
            return Err(PigzrError::invalid_argument(format!(
                "block size {} is smaller than the {} byte window",
                self.block_size, DICT_SIZE
            )));
        }
        if self.level > 9 {
            return Err(PigzrError::invalid_argument(format!(
                "compression level {} out of range 0-9",
                self.level
            )));
        }
        Ok(())
    }
}

/// Totals for one compressed stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompressStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub blocks: u64,
    pub batches: u64,
}

pub struct StreamCompressor {
    config: CompressConfig,
    pool: WorkerPool,
}

impl StreamCompressor {
    pub fn new(config: CompressConfig) -> PigzrResult<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.num_threads)?;
        Ok(Self { config, pool })
    }

    /// Compress all of `reader` into one gzip member on `writer`.
    pub fn compress<R: Read, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
    ) -> PigzrResult<CompressStats> {
        let mut checksum = StreamChecksum::new();
        let mut stats = CompressStats::default();

        format::write_header(writer).map_err(PigzrError::Output)?;
        writer.flush().map_err(PigzrError::Output)?;
        stats.bytes_out += format::HEADER_SIZE as u64;

        let mut seed = self.new_unit(0);
        if seed.read_input(reader, &mut checksum, None)?.is_none() {
            stats.bytes_out += self.compress_empty(writer)?;
        } else {
            loop {
                match self.compress_batch(reader, writer, &mut checksum, seed, &mut stats)? {
                    Some(next) => seed = next,
                    None => break,
                }
            }
        }

        format::write_trailer(writer, checksum.crc(), checksum.isize())
            .map_err(PigzrError::Output)?;
        writer.flush().map_err(PigzrError::Output)?;
        stats.bytes_out += format::TRAILER_SIZE as u64;
        stats.bytes_in = checksum.total_in();

        log::info!(
            "compressed {} -> {} bytes in {} blocks, {} batches, {} threads",
            stats.bytes_in,
            stats.bytes_out,
            stats.blocks,
            stats.batches,
            self.pool.num_threads()
        );
        Ok(stats)
    }

    fn new_unit(&self, index: u64) -> BlockUnit {
        BlockUnit::new(index, self.config.block_size, self.config.level)
    }

    /// Compress `seed` plus up to `num_threads - 1` following blocks.
    ///
    /// Returns the already-read block to seed the next batch, or None once the
    /// final block has been written.
    fn compress_batch<R: Read, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        checksum: &mut StreamChecksum,
        seed: BlockUnit,
        stats: &mut CompressStats,
    ) -> PigzrResult<Option<BlockUnit>> {
        let num_threads = self.config.num_threads;
        let start_from = seed.index();
        let sink = BatchSink::new(num_threads, start_from);

        let mut units = Vec::with_capacity(num_threads + 1);
        units.push(seed);

        let mut reached_end = false;
        for offset in 1..=num_threads as u64 {
            let mut unit = self.new_unit(start_from + offset);
            let read = unit.read_input(reader, checksum, units.last())?;
            if read.is_none() {
                if let Some(last) = units.last_mut() {
                    last.mark_final();
                }
                reached_end = true;
                break;
            }
            units.push(unit);
        }

        // A full batch read one block past its compression slots
        let carried = if reached_end { None } else { units.pop() };

        log::debug!(
            "batch {}: blocks {}..{}{}",
            stats.batches,
            start_from,
            start_from + units.len() as u64,
            if reached_end { " (last)" } else { "" }
        );

        self.pool.run_batch(&units, |unit| unit.run(&sink))?;
        let written = sink.flush_all(writer)?;

        stats.blocks += units.len() as u64;
        stats.batches += 1;
        stats.bytes_out += written;
        log::debug!("batch {}: flushed {} bytes", stats.batches - 1, written);

        debug_assert_eq!(reached_end, units.last().is_some_and(BlockUnit::is_final));
        Ok(carried)
    }

    /// Zero-length input: a finished deflate stream with no data.
    fn compress_empty<W: Write>(&self, writer: &mut W) -> PigzrResult<u64> {
        let compressed = BlockDeflater::new(self.config.level).finish(&[])?;
        writer.write_all(&compressed).map_err(PigzrError::Output)?;
        log::debug!("empty input, wrote {} byte deflate stream", compressed.len());
        Ok(compressed.len() as u64)
    }
}
