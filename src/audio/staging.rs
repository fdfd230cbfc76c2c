//! # Audio Staging
//!
//! Request-scoped temporary audio files.
//!
//! The waveform tool and the container parsers both want a path on disk, so
//! every request's audio is written to its own temporary file.
//!
//! ## Lifecycle:
//! 1. [`StagedAudio::write`] creates `audio-*.tmp` in `staging.temp_dir`
//! 2. Metadata extraction and the waveform tool read it by path
//! 3. Dropping the value unlinks the file, whichever stage the request ends in

use crate::error::{AppError, AppResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A staged audio file and the number of bytes written to it.
///
/// Owns the underlying [`NamedTempFile`]; keep it alive until the last
/// reader of [`path`](Self::path) has finished.
pub struct StagedAudio {
    file: NamedTempFile,
    size: u64,
}

impl StagedAudio {
    /// Write `bytes` to a fresh `audio-*.tmp` file in `dir` (or the system temp dir).
    pub fn write(bytes: &[u8], dir: Option<&Path>) -> AppResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("audio-").suffix(".tmp");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| AppError::Processing(format!("Failed to create temporary file: {}", e)))?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| AppError::Processing(format!("Failed to save audio data: {}", e)))?;

        Ok(Self {
            file,
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Number of bytes written when the file was staged.
    pub fn size(&self) -> u64 {
        self.size
    }
}
