//! logcore CLI
//!
//! Appends to, reads from and inspects one segment in a data directory.

use std::process;

use clap::{Parser, Subcommand};
use logcore::segment::list_base_offsets;
use logcore::{Config, LogError, Segment};
use tracing_subscriber::{fmt, EnvFilter};

/// logcore CLI
#[derive(Parser, Debug)]
#[command(name = "logcore-cli")]
#[command(about = "Append to and read from a commit log segment")]
#[command(version)]
struct Args {
    /// Data directory holding the segment files
    #[arg(short, long, default_value = "./logcore_data")]
    dir: String,

    /// Advisory store size in bytes before the segment counts as full
    #[arg(long, default_value_t = 64 * 1024 * 1024)]
    max_store_bytes: u64,

    /// Index pre-allocation size in bytes
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    max_index_bytes: u64,

    /// Base offset of the segment
    #[arg(long, default_value_t = 0)]
    initial_offset: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one record per argument
    Append {
        /// Record payloads (stored as UTF-8 bytes)
        #[arg(required = true)]
        records: Vec<String>,
    },

    /// Read the record at an absolute offset
    Read {
        /// The offset to read
        offset: u64,
    },

    /// Print segment statistics
    Stat,

    /// Rebuild the index from the store
    Rebuild,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,logcore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match Config::builder()
        .data_dir(&args.dir)
        .max_store_bytes(args.max_store_bytes)
        .max_index_bytes(args.max_index_bytes)
        .initial_offset(args.initial_offset)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&config, args.command) {
        match e {
            LogError::OffsetNotFound(offset) => {
                eprintln!("offset {} not found", offset);
                process::exit(2);
            }
            e => {
                tracing::error!("Command failed: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run(config: &Config, command: Commands) -> logcore::Result<()> {
    let mut segment = Segment::open(&config.data_dir, &config.segment)?;

    let result = match command {
        Commands::Append { records } => {
            let mut outcome = Ok(());
            for record in records {
                match segment.append(record.as_bytes()) {
                    Ok(offset) => println!("{}", offset),
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }
            outcome
        }
        Commands::Read { offset } => segment.read(offset).map(|record| {
            println!("{}", String::from_utf8_lossy(&record));
        }),
        Commands::Stat => {
            list_base_offsets(&config.data_dir).map(|bases| print_stat(&segment, &bases))
        }
        Commands::Rebuild => {
            let (rebuilt, entries) = segment.rebuild()?;
            segment = rebuilt;
            tracing::info!("Rebuilt index with {} entries", entries);
            Ok(())
        }
    };

    // Close even on failure so the index is truncated to its used length
    segment.close()?;
    result
}

fn print_stat(segment: &Segment, bases: &[u64]) {
    let index = segment.index();
    println!("segments:      {:?}", bases);
    println!("base offset:   {}", segment.base_offset());
    println!("next offset:   {}", segment.next_offset());
    println!("store bytes:   {}", segment.store().size());
    println!("index entries: {}", index.entry_count());
    println!("index bytes:   {} / {}", index.size(), index.capacity());
    println!("store limit:   {}", segment.config().max_store_bytes);
    println!("maxed:         {}", segment.is_maxed());
}
