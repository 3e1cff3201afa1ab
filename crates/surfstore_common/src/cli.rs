//! CLI argument surfaces for the two server binaries (spec.md §6.3).

use std::path::PathBuf;

use clap::Parser;

const DEFAULT_THREADS: usize = 10;

/// `block_store <config_file> [-t THREADS]`
#[derive(Parser, Debug, Clone)]
#[command(name = "surfstore-block-store", about = "SurfStore block store server")]
pub struct BlockStoreArgs {
    /// Path to the cluster configuration file.
    pub config_file: PathBuf,

    /// Maximum number of concurrent request-handling threads.
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_THREADS)]
    pub threads: usize,
}

/// `metadata_store <config_file> -n NUMBER [-t THREADS]`
#[derive(Parser, Debug, Clone)]
#[command(name = "surfstore-metadata-store", about = "SurfStore metadata store server")]
pub struct MetadataStoreArgs {
    /// Path to the cluster configuration file.
    pub config_file: PathBuf,

    /// Which replica (1-based index into `metadata_ports`) this process is.
    #[arg(short = 'n', long = "number", default_value_t = 1)]
    pub number: u32,

    /// Maximum number of concurrent request-handling threads.
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_THREADS)]
    pub threads: usize,
}
