//! hashlog CLI
//!
//! Inspect log/index files, look up keys and build indexes.
//!
//! Exit codes for `get`: 0 = found and printed, 1 = error, 2 = key not found.
//! Error messages go to stdout; stderr carries logs only.

use std::ffi::OsString;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, Subcommand};
use hashlog::hash::SLOT_SIZE_COMPACT;
use hashlog::{detect_header, Config, HashAlgorithm, HashReader, IndexBuilder, IterState};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

/// hashlog CLI
#[derive(Parser, Debug)]
#[command(name = "hashlog")]
#[command(about = "Inspect and query hashlog log/index files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the header of each file (log or index, detected automatically)
    Info {
        /// Print one JSON object per file
        #[arg(long)]
        json: bool,

        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the value stored for a key
    Get {
        /// Index file; the log is found by swapping its extension
        index: PathBuf,

        /// The key to look up, as raw argument bytes
        key: OsString,

        /// Max bytes read per chunk while streaming the value
        #[arg(long)]
        chunk_size: Option<NonZeroUsize>,
    },

    /// Build the index for a log file, next to it
    Build {
        /// Log file
        log: PathBuf,

        /// Hash seed recorded in the index
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Use 8-byte slots (u32 fingerprint and offset)
        #[arg(long)]
        compact: bool,

        /// Hash with xxh32 instead of xxh3-64
        #[arg(long)]
        xxh32: bool,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries values only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let config = Config::default();

    match args.command {
        Commands::Info { json, files } => info(&files, json),
        Commands::Get {
            index,
            key,
            chunk_size,
        } => {
            let Some(log) = config.log_path_for(&index) else {
                println!("index filename must end with .{}", config.index_extension);
                return ExitCode::from(1);
            };
            let chunk_size = chunk_size.map_or(config.value_chunk_size, NonZeroUsize::get);
            get(&index, &log, key.as_encoded_bytes(), chunk_size)
        }
        Commands::Build {
            log,
            seed,
            compact,
            xxh32,
        } => {
            let Some(index) = config.index_path_for(&log) else {
                println!("log filename must end with .{}", config.log_extension);
                return ExitCode::from(1);
            };
            let mut options = config.index;
            options.hash_seed = seed;
            if compact {
                options.slot_size = SLOT_SIZE_COMPACT;
            }
            if xxh32 {
                options.hash_algorithm = HashAlgorithm::Xxh32;
            }
            match IndexBuilder::new(options).build(&log, &index) {
                Ok(header) => {
                    println!("{}", index.display());
                    print!("{}", header);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{}", e);
                    ExitCode::from(1)
                }
            }
        }
    }
}

/// Print each file's header; exit 1 if any file is neither kind
fn info(files: &[PathBuf], as_json: bool) -> ExitCode {
    let mut code = ExitCode::SUCCESS;
    for file in files {
        match detect_header(file) {
            Ok(header) => {
                if as_json {
                    println!("{}", json!({ "file": file, "header": header }));
                } else {
                    println!("{}", file.display());
                    print!("{}", header);
                }
            }
            Err(e) => {
                if as_json {
                    println!(
                        "{}",
                        json!({
                            "file": file,
                            "error": {
                                "log": e.log_error.to_string(),
                                "index": e.index_error.to_string(),
                            }
                        })
                    );
                } else {
                    println!(
                        "{} is neither a log file ({}) nor an index file ({})",
                        file.display(),
                        e.log_error,
                        e.index_error
                    );
                }
                code = ExitCode::from(1);
            }
        }
    }
    code
}

/// Stream the value of `key` to stdout in bounded chunks
fn get(index: &Path, log: &Path, key: &[u8], chunk_size: usize) -> ExitCode {
    let reader = match HashReader::open(index, log) {
        Ok(r) => r,
        Err(e) => {
            println!("{}", e);
            return ExitCode::from(1);
        }
    };

    let mut iter = reader.log_reader().iter();
    if let Err(e) = reader.get(key, &mut iter) {
        println!("{}", e);
        return ExitCode::from(1);
    }

    if iter.state() != IterState::Active {
        return ExitCode::from(2);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result: hashlog::Result<()> = (|| {
        loop {
            let chunk = iter.value_chunk(chunk_size)?;
            if chunk.is_empty() {
                break;
            }
            out.write_all(chunk)?;
        }
        out.flush()?;
        Ok(())
    })();

    iter.close();
    reader.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", e);
            ExitCode::from(1)
        }
    }
}
