//! pigzr - parallel gzip for streams
//!
//! Reads standard input, compresses fixed-size blocks on a pool of worker
//! threads with pigz-style dictionary sharing, and writes a single gzip
//! member to standard output.

use std::io::{self, BufWriter, Write};
use std::process;

mod block;
mod checksum;
mod cli;
mod deflater;
mod error;
mod format;
mod pipeline;
mod scheduler;
mod sink;
mod slot_map;

use cli::PigzrArgs;
use error::PigzrResult;
use pipeline::{CompressConfig, StreamCompressor};

/// Output buffer in front of stdout
const STDOUT_BUFFER: usize = 1024 * 1024;

fn install_signal_handlers() {
    // SIGPIPE: exit quietly (e.g., piping to head)
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
}

fn main() {
    install_signal_handlers();
    init_logging();

    if let Err(e) = run() {
        if !e.is_configuration() {
            log::debug!("pipeline aborted: {:?}", e);
        }
        eprintln!("pigzr: {}", e);
        process::exit(1);
    }
}

fn run() -> PigzrResult<()> {
    let args = PigzrArgs::parse()?;
    log::debug!("using {} compression threads", args.processes);

    let compressor = StreamCompressor::new(CompressConfig::with_threads(args.processes))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = BufWriter::with_capacity(STDOUT_BUFFER, io::stdout().lock());

    compressor.compress(&mut input, &mut output)?;
    output.flush().map_err(error::PigzrError::Output)?;
    Ok(())
}
