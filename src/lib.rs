//! # cdcfs Core Library
//!
//! This crate builds and reads single-file, content-addressable containers: a directory tree
//! is split into content-defined chunks, deduplicated, optionally compressed with a shared
//! zstd dictionary and integrity-hashed, then serialized into one seekable blob.
//!
//! It is used by the `cdcfs` command-line application, but the [`Writer`] and [`Reader`]
//! types are the whole public surface and can be used directly.
//!
//! ## Key Modules
//!
//! - [`chunker`]: FastCDC content-defined chunking.
//! - [`store`]: Write-side chunk deduplication.
//! - [`solid`]: Packing of small files into shared solid blocks.
//! - [`compress`]: Dictionary training, parallel compression and integrity hashing.
//! - [`archive`]: The container format and the [`Writer`].
//! - [`extract`]: The [`Reader`], [`Entry`] and [`EntryStream`].
//!
//! ## Examples
//!
//! ```no_run
//! use cdcfs::{Reader, Writer, WriterOptions};
//!
//! # fn main() -> Result<(), cdcfs::CdcFsError> {
//! let mut writer = Writer::new(WriterOptions::default())?;
//! writer.add_file(b"hello", "docs/hello.txt")?;
//! writer.build_to_path("docs.cdcfs")?;
//!
//! let reader = Reader::open_path("docs.cdcfs")?;
//! assert_eq!(reader.get("docs/hello.txt")?.read_all_bytes()?, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod chunker;
pub mod cli;
pub mod common;
pub mod compress;
pub mod error;
pub mod extract;
pub mod options;
pub mod solid;
pub mod store;

pub use archive::{BuildSummary, Writer};
pub use error::{CdcFsError, ErrorKind};
pub use extract::{Entry, EntryKind, EntryStream, Reader};
pub use options::WriterOptions;
