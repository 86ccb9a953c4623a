//! Command line: either no arguments or exactly `-p <processes>`

use clap::Parser;

use crate::error::{PigzrError, PigzrResult};

#[derive(Parser, Debug)]
#[command(
    name = "pigzr",
    about = "Compress standard input to gzip on standard output using multiple threads",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct RawArgs {
    /// Number of compression threads (default: all CPUs)
    #[arg(short = 'p', value_name = "PROCESSES", allow_hyphen_values = true)]
    processes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PigzrArgs {
    pub processes: usize,
}

impl PigzrArgs {
    pub fn parse() -> PigzrResult<Self> {
        Self::parse_from(std::env::args_os(), crate::pipeline::available_threads())
    }

    /// Parse `args` (program name first) against a machine with `host_threads` CPUs.
    pub fn parse_from<I, T>(args: I, host_threads: usize) -> PigzrResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args: Vec<std::ffi::OsString> = args.into_iter().map(Into::into).collect();
        // Only `pigzr` or `pigzr -p <n>`; attached forms like `-p3` are refused
        let shape_ok = match args.len() {
            0 | 1 => true,
            3 => args[1] == "-p",
            _ => false,
        };
        if !shape_ok {
            return Err(PigzrError::Usage(
                "Invalid arguments\nUsage: pigzr [-p PROCESSES]".to_string(),
            ));
        }

        let raw = RawArgs::try_parse_from(args).map_err(|e| {
            PigzrError::Usage(format!(
                "Invalid arguments\n{}\nUsage: pigzr [-p PROCESSES]",
                e.to_string().trim_end()
            ))
        })?;

        let processes = match raw.processes {
            None => host_threads,
            Some(value) => parse_processes(&value, host_threads)?,
        };
        Ok(Self { processes })
    }
}

fn parse_processes(value: &str, host_threads: usize) -> PigzrResult<usize> {
    let requested: i64 = value
        .parse()
        .map_err(|_| PigzrError::invalid_argument("-p processes must be an integer"))?;
    if requested < 1 {
        return Err(PigzrError::invalid_argument(
            "-p processes must be a positive integer",
        ));
    }
    if requested as u64 > host_threads as u64 {
        return Err(PigzrError::invalid_argument(format!(
            "-p processes more than supported by machine ({} available)",
            host_threads
        )));
    }
    Ok(requested as usize)
}
