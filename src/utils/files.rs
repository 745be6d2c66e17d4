//! Attachment boundary: normalizes a filesystem path into the single
//! file-metadata shape stored on a medicine record.
//!
//! Only metadata crosses this boundary. The file's bytes are never
//! read, so an "attached" file is not retrievable later.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::FileMeta;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Could not read file metadata for {path}: {source}")]
    Metadata {
        path: String,
        source: std::io::Error,
    },
    #[error("{0} is not a regular file")]
    NotAFile(String),
}

/// Captures name, size, MIME type and last-modified time of the file at
/// `path`.
pub fn file_meta_from_path(path: &Path) -> Result<FileMeta, AttachmentError> {
    let metadata = fs::metadata(path).map_err(|source| AttachmentError::Metadata {
        path: path.display().to_string(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(AttachmentError::NotAFile(path.display().to_string()));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_owned();

    // Some filesystems do not report mtime; fall back to now so the
    // stored shape always has every field.
    let last_modified: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());

    Ok(FileMeta {
        name,
        size: metadata.len(),
        mime_type,
        last_modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_captures_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dossier.pdf");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.4 fake content").unwrap();

        let meta = file_meta_from_path(&path).unwrap();
        assert_eq!(meta.name, "dossier.pdf");
        assert_eq!(meta.size, 21);
        assert_eq!(meta.mime_type, "application/pdf");
    }

    #[test]
    fn test_unknown_extension_falls_back_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xyzzy");
        fs::File::create(&path).unwrap();

        let meta = file_meta_from_path(&path).unwrap();
        assert_eq!(meta.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        assert!(matches!(
            file_meta_from_path(&path),
            Err(AttachmentError::Metadata { .. })
        ));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            file_meta_from_path(dir.path()),
            Err(AttachmentError::NotAFile(_))
        ));
    }
}
