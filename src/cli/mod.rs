use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::options::{
    WriterOptions, DEFAULT_COMPRESSION_LEVEL, DEFAULT_FASTCDC_AVG, DEFAULT_FASTCDC_MAX, DEFAULT_FASTCDC_MIN,
    DEFAULT_SOLID_BLOCK_SIZE,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Build a container from files and directories.
    #[command(alias = "b")]
    Build {
        /// One or more input files or directories. Directories are added recursively.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// The path for the output container (e.g., site.cdcfs).
        #[arg(short, long)]
        output: PathBuf,

        /// Directory inside the container to place the inputs under.
        #[arg(short, long)]
        target: Option<String>,

        /// Do not compress chunks with zstd.
        #[arg(long)]
        no_zstd: bool,

        /// Do not hash metadata and chunks for read-time verification.
        #[arg(long)]
        no_hash: bool,

        /// Zstandard compression level.
        #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        compression_level: i32,

        /// Minimum chunk size for FastCDC.
        #[arg(long, default_value_t = DEFAULT_FASTCDC_MIN)]
        fastcdc_min: u32,

        /// Average chunk size for FastCDC.
        #[arg(long, default_value_t = DEFAULT_FASTCDC_AVG)]
        fastcdc_avg: u32,

        /// Maximum chunk size for FastCDC.
        #[arg(long, default_value_t = DEFAULT_FASTCDC_MAX)]
        fastcdc_max: u32,

        /// Files smaller than this many bytes are packed into solid blocks. [0 = disabled]
        #[arg(long, default_value_t = 0)]
        small_file_threshold: u32,

        /// Capacity of one solid block in bytes.
        #[arg(long, default_value_t = DEFAULT_SOLID_BLOCK_SIZE)]
        solid_block_size: u32,

        /// Number of compression threads. [0 = auto-detect based on CPU cores]
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },

    /// List the contents of a directory inside a container.
    #[command(alias = "l")]
    List {
        /// The container file.
        #[arg(required = true)]
        archive: PathBuf,

        /// Directory to list. Defaults to the root.
        #[arg(short, long)]
        directory: Option<String>,
    },

    /// Extract a file or a directory from a container.
    #[command(alias = "x")]
    Extract {
        /// The container file.
        #[arg(required = true)]
        archive: PathBuf,

        /// A single file to extract.
        #[arg(short, long, conflicts_with = "directory")]
        file: Option<String>,

        /// A directory to extract. Defaults to the root.
        #[arg(short, long)]
        directory: Option<String>,

        /// The directory where files will be written. Defaults to the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include subdirectories.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print the directory, file, solid-block and chunk tables.
    Dump {
        /// The container file.
        #[arg(required = true)]
        archive: PathBuf,
    },
}

impl Commands {
    /// Writer options for a `build` command, `None` for every other command.
    pub fn writer_options(&self) -> Option<WriterOptions> {
        match self {
            Commands::Build {
                no_zstd,
                no_hash,
                compression_level,
                fastcdc_min,
                fastcdc_avg,
                fastcdc_max,
                small_file_threshold,
                solid_block_size,
                threads,
                ..
            } => Some(
                WriterOptions::default()
                    .with_chunk_sizes(*fastcdc_min, *fastcdc_avg, *fastcdc_max)
                    .with_no_zstd(*no_zstd)
                    .with_no_hash(*no_hash)
                    .with_compression_level(*compression_level)
                    .with_small_file_handling(*small_file_threshold, *solid_block_size)
                    .with_threads(*threads),
            ),
            _ => None,
        }
    }
}

/// Parses command-line arguments using `clap` and returns the command to execute.
pub fn run() -> Result<Commands, Box<dyn std::error::Error>> {
    let args = Args::parse();
    Ok(args.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_flags_map_to_options() {
        let args = Args::try_parse_from([
            "cdcfs", "build", "in", "-o", "out.cdcfs", "--no-hash", "--compression-level", "5",
            "--small-file-threshold", "1024", "--solid-block-size", "8192",
        ])
        .unwrap();
        let opts = args.command.writer_options().unwrap();
        assert!(opts.no_hash && !opts.no_zstd);
        assert_eq!(opts.compression_level, 5);
        assert_eq!((opts.small_file_threshold, opts.solid_block_size), (1024, 8192));
        assert_eq!(opts.fastcdc_avg, DEFAULT_FASTCDC_AVG);
    }

    #[test]
    fn extract_rejects_file_and_directory_together() {
        let parsed = Args::try_parse_from(["cdcfs", "extract", "a.cdcfs", "-f", "x", "-d", "y"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn list_alias() {
        let args = Args::try_parse_from(["cdcfs", "l", "a.cdcfs", "-d", "dirA"]).unwrap();
        assert!(matches!(&args.command, Commands::List { directory: Some(d), .. } if d == "dirA"));
        assert!(args.command.writer_options().is_none());
    }
}
