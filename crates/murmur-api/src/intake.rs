use anyhow::Result;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg"];

/// A file part as it arrived in the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    EmptyFilename,

    #[error("File type not allowed. Only WAV, MP3, and OGG files are accepted.")]
    UnsupportedType,

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Validates audio uploads and parks them in the transient upload directory.
///
/// Each accepted upload is stored as `{uuid}.{extension}`, so identically
/// named concurrent uploads never share a path and the on-disk name length
/// does not depend on the client's. The sanitized name rides on the handle.
pub struct BlobIntake {
    dir: PathBuf,
}

impl BlobIntake {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Transient upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub async fn accept(&self, upload: Option<UploadedFile>) -> Result<StoredBlob, IntakeError> {
        let upload = upload.ok_or(IntakeError::NoFilePart)?;
        if upload.filename.is_empty() {
            return Err(IntakeError::EmptyFilename);
        }
        let extension = allowed_extension(&upload.filename).ok_or(IntakeError::UnsupportedType)?;

        // The allow-listed extension is ASCII, so this is never empty.
        let filename = sanitize_filename(&upload.filename);

        let path = self.dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        // From here on the guard owns the file; a failed write removes it.
        let blob = StoredBlob {
            path,
            filename,
            extension,
            released: false,
        };
        file.write_all(&upload.bytes).await?;
        file.flush().await?;

        debug!("Stored {} bytes at {}", upload.bytes.len(), blob.path.display());
        Ok(blob)
    }
}

/// Handle to an accepted upload on disk.
///
/// The file lives exactly as long as this handle: `discard` removes it,
/// and dropping an undiscarded handle removes it synchronously.
#[derive(Debug)]
pub struct StoredBlob {
    path: PathBuf,
    filename: String,
    extension: &'static str,
    released: bool,
}

impl StoredBlob {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitized client filename; this is what gets recorded.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &'static str {
        match self.extension {
            "mp3" => "audio/mpeg",
            "ogg" => "audio/ogg",
            _ => "audio/wav",
        }
    }

    pub async fn discard(mut self) -> std::io::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Transient blob {} already gone", self.path.display());
            }
            // Leave `released` unset so Drop gets another go.
            Err(e) => return Err(e),
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for StoredBlob {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed transient blob {} on drop", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove transient blob {}: {}", self.path.display(), e),
        }
    }
}

/// Extension of the last dot-separated segment, if it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| allowed.eq_ignore_ascii_case(ext))
}

/// Reduce a client-supplied name to a flat, ASCII-only file name.
///
/// Compatibility decomposition (NFKD) runs first so accented letters keep
/// their base letter. Path separators become whitespace, whitespace runs
/// become `_`, anything outside `[A-Za-z0-9._-]` is dropped and
/// leading/trailing `.`/`_` are stripped. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
