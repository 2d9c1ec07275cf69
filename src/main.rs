//! Main entry point for the cdcfs CLI app

use cdcfs::cli::{self, Commands};
use cdcfs::{Reader, Writer};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run_app() {
        if e.downcast_ref::<clap::Error>().is_none() {
            eprintln!("Error: {}", e);
        }
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

fn run_app() -> Result<(), Box<dyn std::error::Error>> {
    let command = cli::run()?;

    match &command {
        Commands::Build { inputs, output, target, .. } => {
            let options = command.writer_options().ok_or("build options missing")?;
            let mut writer = Writer::new(options)?;

            for input in inputs {
                if input.is_dir() {
                    writer.add_directory(input, true, target.as_deref())?;
                } else {
                    let name = input
                        .file_name()
                        .ok_or_else(|| format!("'{}' has no file name", input.display()))?
                        .to_string_lossy();
                    let path = match target.as_deref() {
                        Some(root) if !root.is_empty() && root != "." => {
                            format!("{}/{}", root.trim_end_matches('/'), name)
                        }
                        _ => name.into_owned(),
                    };
                    writer.add_file_from_path(input, &path)?;
                }
            }

            let summary = writer.build_to_path(output)?;
            println!(
                "Built {} ({} bytes, {} chunks, {} solid blocks, compression {}%)",
                output.display(),
                summary.total_length,
                summary.chunk_count,
                summary.solid_block_count,
                summary.compression_ratio_percent
            );
        }
        Commands::List { archive, directory } => {
            let reader = Reader::open_path(archive)?;
            for entry in reader.list(directory.as_deref().unwrap_or(""))? {
                if entry.is_directory() {
                    println!("d {:>12} {}/", "", entry.full_name());
                } else {
                    println!("f {:>12} {}", entry.length(), entry.full_name());
                }
            }
        }
        Commands::Extract { archive, file, directory, output, recursive } => {
            let reader = Reader::open_path(archive)?;
            let dest = output.as_deref().unwrap_or(Path::new("."));
            let path = file.as_deref().or(directory.as_deref()).unwrap_or("");
            let count = reader.extract_to(path, dest, *recursive || file.is_some())?;
            println!("Extracted {} file(s) to {}", count, dest.display());
        }
        Commands::Dump { archive } => {
            let reader = Reader::open_path(archive)?;
            println!("{}", reader.dump());
        }
    }

    Ok(())
}
