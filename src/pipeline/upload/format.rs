use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::UploadError;
use crate::upload_config::UploadConfig;

const MB: u64 = 1024 * 1024;

/// Rough size bucket, shown next to each queued file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
}

impl SizeCategory {
    pub fn from_size(size_bytes: u64) -> Self {
        match size_bytes {
            s if s < MB => Self::Small,
            s if s < 10 * MB => Self::Medium,
            _ => Self::Large,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// A file that passed the allow-list and may become an upload task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub extension: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub size_category: SizeCategory,
}

/// A file refused before any network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub reason: String,
}

/// Check a single path against the allow-list and size limit.
///
/// Extension is checked before touching the file so a disallowed type is
/// refused even when the path does not exist.
pub fn validate_file(path: &Path, config: &UploadConfig) -> Result<ValidatedFile, UploadError> {
    let file_name = sanitize_filename(&path.to_string_lossy());

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| UploadError::MissingExtension(file_name.clone()))?;

    if !config.is_extension_allowed(&extension) {
        return Err(UploadError::UnsupportedExtension {
            extension,
            allowed: config.allowed_extensions.join(", "),
        });
    }

    if !path.exists() {
        return Err(UploadError::NotFound(path.display().to_string()));
    }
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(UploadError::NotAFile(path.display().to_string()));
    }

    let size_bytes = metadata.len();
    if size_bytes == 0 {
        return Err(UploadError::EmptyFile(file_name));
    }
    if size_bytes > config.max_file_size {
        return Err(UploadError::FileTooLarge {
            size_mb: size_bytes as f64 / MB as f64,
            max_mb: config.max_file_size / MB,
        });
    }

    Ok(ValidatedFile {
        path: path.to_path_buf(),
        mime_type: guess_mime_type(&file_name),
        file_name,
        extension,
        size_bytes,
        size_category: SizeCategory::from_size(size_bytes),
    })
}

/// Validate every path, splitting accepted files from rejected ones.
/// Only an oversized batch fails as a whole.
pub fn validate_batch(
    paths: &[PathBuf],
    config: &UploadConfig,
) -> Result<(Vec<ValidatedFile>, Vec<RejectedFile>), UploadError> {
    if paths.len() > config.max_batch_files {
        return Err(UploadError::BatchTooLarge {
            max: config.max_batch_files,
            given: paths.len(),
        });
    }

    let mut accepted = Vec::with_capacity(paths.len());
    let mut rejected = Vec::new();

    for path in paths {
        match validate_file(path, config) {
            Ok(file) => accepted.push(file),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "File rejected before upload");
                rejected.push(RejectedFile {
                    path: path.clone(),
                    file_name: sanitize_filename(&path.to_string_lossy()),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok((accepted, rejected))
}

/// MIME type for the multipart `file` part, guessed from the name.
pub fn guess_mime_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
