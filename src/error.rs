use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`CdcFsError`], useful when callers only need to
/// decide between "bad file", "damaged file", "missing path" and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Corruption,
    NotFound,
    Construction,
    Io,
}

/// The primary error type for all operations in the `cdcfs` crate.
#[derive(Error, Debug)]
pub enum CdcFsError {
    /// The input is not a container, or one of its tables is malformed.
    #[error("Invalid container: {0}")]
    InvalidFormat(String),

    /// The container was written by an unknown format version.
    #[error("Unsupported container version {0}")]
    UnsupportedVersion(u8),

    /// The metadata section does not match its stored hash.
    #[error("Metadata is corrupted")]
    CorruptedMetadata,

    /// A chunk's decoded bytes do not match its stored hash.
    #[error("Data is corrupted (chunk {chunk_id})")]
    CorruptedChunk { chunk_id: u32 },

    /// No file or directory exists at the given path.
    #[error("Not found: '{0}'")]
    NotFound(String),

    /// A directory operation was requested on a file.
    #[error("Not a directory: '{0}'")]
    NotADirectory(String),

    /// A file operation was requested on a directory.
    #[error("Cannot open a directory: '{0}'")]
    NotAFile(String),

    /// The target path was already added to the writer.
    #[error("File already exists: '{0}'")]
    DuplicatePath(String),

    /// The target path has no file name component.
    #[error("Invalid target path: '{0}'")]
    InvalidPath(String),

    /// Chunk size bounds are zero, out of range or not ordered.
    #[error("Invalid chunk sizes: {0}")]
    InvalidChunkSizes(String),

    /// Any other option that failed validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened, empty for plain streams.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl CdcFsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CdcFsError::InvalidFormat(_) | CdcFsError::UnsupportedVersion(_) => ErrorKind::Format,
            CdcFsError::CorruptedMetadata | CdcFsError::CorruptedChunk { .. } => ErrorKind::Corruption,
            CdcFsError::NotFound(_) | CdcFsError::NotADirectory(_) | CdcFsError::NotAFile(_) => {
                ErrorKind::NotFound
            }
            CdcFsError::DuplicatePath(_)
            | CdcFsError::InvalidPath(_)
            | CdcFsError::InvalidChunkSizes(_)
            | CdcFsError::InvalidOptions(_) => ErrorKind::Construction,
            CdcFsError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Attach a filesystem path to an I/O error.
    pub fn io_at(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CdcFsError::Io { source, path: path.into() }
    }
}

impl From<std::io::Error> for CdcFsError {
    fn from(err: std::io::Error) -> Self {
        // Errors tunnelled through `Read` impls come back with their original variant.
        if err.get_ref().is_some_and(|inner| inner.is::<CdcFsError>()) {
            let kind = err.kind();
            return match err.into_inner().map(|inner| inner.downcast::<CdcFsError>()) {
                Some(Ok(inner)) => *inner,
                _ => CdcFsError::Io { source: kind.into(), path: PathBuf::new() },
            };
        }
        // A short read inside the container means the tables lie about their sizes.
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            return CdcFsError::InvalidFormat(format!("unexpected end of data: {}", err));
        }
        CdcFsError::Io { source: err, path: PathBuf::new() } // Generic path
    }
}

pub type Result<T> = std::result::Result<T, CdcFsError>;
