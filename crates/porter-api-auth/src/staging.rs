//! Upload staging
//!
//! Multipart upload bodies are written to unique temporary files before
//! the command is forwarded, so the backend works with paths instead of
//! request bodies. Every staged file belongs to the record of exactly one
//! request and is reclaimed when that request finishes, success or not.

use porter_core::RequestId;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::Builder;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("there is not enough free space on disk")]
    InsufficientStorage,
    #[error("the size of the uploaded file is too large")]
    PayloadTooLarge,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reports free space on the filesystem holding the staging directory.
///
/// A trait so tests can simulate a full disk without filling one.
pub trait DiskProbe: Send + Sync {
    fn available_kib(&self, path: &Path) -> io::Result<u64>;
}

/// Probe backed by `statvfs(2)`.
pub struct StatvfsProbe;

impl DiskProbe for StatvfsProbe {
    fn available_kib(&self, path: &Path) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
        Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64 / 1024)
    }
}

/// A file staged to disk.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    /// Client filename after sanitization.
    pub filename: String,
    pub content_type: Option<String>,
    pub size: u64,
}

/// Stages upload bodies into a spool directory, tracked per request.
pub struct UploadStaging {
    dir: PathBuf,
    min_free_kib: u64,
    max_file_bytes: u64,
    probe: Box<dyn DiskProbe>,
    records: RwLock<HashMap<RequestId, Vec<PathBuf>>>,
}

impl UploadStaging {
    pub fn new(dir: impl Into<PathBuf>, min_free_kib: u64, max_file_kib: u64) -> Self {
        Self::with_probe(dir, min_free_kib, max_file_kib, Box::new(StatvfsProbe))
    }

    pub fn with_probe(
        dir: impl Into<PathBuf>,
        min_free_kib: u64,
        max_file_kib: u64,
        probe: Box<dyn DiskProbe>,
    ) -> Self {
        Self {
            dir: dir.into(),
            min_free_kib,
            max_file_bytes: max_file_kib * 1024,
            probe,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Stages one upload body for `request_id`.
    ///
    /// The free-space and size checks run before anything touches disk,
    /// so a rejected upload leaves zero files behind.
    pub fn stage(
        &self,
        request_id: &RequestId,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StagedFile, StagingError> {
        let free = self.probe.available_kib(&self.dir)?;
        if free < self.min_free_kib {
            error!(
                free_kib = free,
                min_free_kib = self.min_free_kib,
                "not enough free space to stage upload"
            );
            return Err(StagingError::InsufficientStorage);
        }
        if bytes.len() as u64 > self.max_file_bytes {
            warn!(size = bytes.len(), "upload exceeds the size limit");
            return Err(StagingError::PayloadTooLarge);
        }

        let sanitized = sanitize_filename(filename);
        let mut file = Builder::new()
            .prefix(&format!("{request_id}-"))
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;

        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(*request_id)
            .or_default()
            .push(path.clone());
        debug!(request_id = %request_id, path = %path.display(), "upload staged");

        Ok(StagedFile {
            path,
            filename: sanitized,
            content_type: content_type.map(String::from),
            size: bytes.len() as u64,
        })
    }

    /// Removes every file staged for `request_id` and drops the record.
    ///
    /// Returns whether the request had staged files.
    pub fn cleanup(&self, request_id: &RequestId) -> bool {
        let paths = self
            .records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(request_id);
        let Some(paths) = paths else {
            return false;
        };
        for path in paths {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "could not remove staged upload");
            }
        }
        true
    }

    /// Whether `request_id` currently has a staging record.
    pub fn has_record(&self, request_id: &RequestId) -> bool {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(request_id)
    }
}

/// Replaces the characters a filename could use to escape the staging
/// directory.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if matches!(c, '<' | '>' | '/') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(u64);

    impl DiskProbe for FixedProbe {
        fn available_kib(&self, _path: &Path) -> io::Result<u64> {
            Ok(self.0)
        }
    }

    fn staging_in(dir: &Path, free_kib: u64, max_file_kib: u64) -> UploadStaging {
        UploadStaging::with_probe(dir, 1024, max_file_kib, Box::new(FixedProbe(free_kib)))
    }

    fn dir_entry_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_stage_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_in(dir.path(), 10_000, 64);
        let request_id = RequestId::new();

        let staged = staging
            .stage(&request_id, "report.csv", Some("text/csv"), b"a,b,c")
            .unwrap();
        assert_eq!(staged.filename, "report.csv");
        assert_eq!(staged.size, 5);
        assert!(staged.path.exists());
        assert!(staged
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&request_id.to_string()));

        assert!(staging.cleanup(&request_id));
        assert!(!staged.path.exists());
        // Second cleanup finds no record.
        assert!(!staging.cleanup(&request_id));
    }

    #[test]
    fn test_low_disk_rejects_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_in(dir.path(), 512, 64);
        let request_id = RequestId::new();

        let err = staging
            .stage(&request_id, "f.bin", None, b"data")
            .unwrap_err();
        assert!(matches!(err, StagingError::InsufficientStorage));
        assert_eq!(dir_entry_count(dir.path()), 0);
        assert!(!staging.has_record(&request_id));
    }

    #[test]
    fn test_oversize_rejects_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_in(dir.path(), 10_000, 1);
        let request_id = RequestId::new();

        let err = staging
            .stage(&request_id, "big.bin", None, &[0u8; 2048])
            .unwrap_err();
        assert!(matches!(err, StagingError::PayloadTooLarge));
        assert_eq!(dir_entry_count(dir.path()), 0);
        assert!(!staging.has_record(&request_id));
    }

    #[test]
    fn test_filename_sanitization() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("<script>.txt"), "_script_.txt");
        assert_eq!(sanitize_filename("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_multiple_files_share_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_in(dir.path(), 10_000, 64);
        let request_id = RequestId::new();

        staging.stage(&request_id, "a", None, b"1").unwrap();
        staging.stage(&request_id, "b", None, b"2").unwrap();
        assert_eq!(dir_entry_count(dir.path()), 2);

        assert!(staging.cleanup(&request_id));
        assert_eq!(dir_entry_count(dir.path()), 0);
    }
}
