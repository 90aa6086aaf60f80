pub mod events;
pub mod format;
pub mod hash;
pub mod task;

pub use events::*;
pub use format::*;
pub use hash::*;
pub use task::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("Unsupported file type '.{extension}' (allowed: {allowed})")]
    UnsupportedExtension { extension: String, allowed: String },

    #[error("File has no extension: {0}")]
    MissingExtension(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("File is empty: {0}")]
    EmptyFile(String),

    #[error("Maximum {max} files per batch ({given} given)")]
    BatchTooLarge { max: usize, given: usize },
}
