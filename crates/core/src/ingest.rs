use crate::{IngestError, IngestionOutcome};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Reduces a client-supplied filename to its last path component.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

/// Writes uploads under `{root}/{request-id}/{filename}`.
///
/// Every upload gets its own directory, so same-named uploads never share a path.
#[derive(Debug, Clone)]
pub struct UploadStaging {
    root: PathBuf,
}

#[derive(Debug)]
pub struct StagedUpload {
    dir: PathBuf,
    path: PathBuf,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the request directory. Failures are logged only.
    pub async fn discard(self) {
        if let Err(error) = fs::remove_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), %error, "failed to remove staged upload");
        }
    }
}

impl UploadStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn stage(&self, filename: &str, bytes: &[u8]) -> Result<StagedUpload, IngestError> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| IngestError::MissingFileName(filename.to_string()))?;
        let dir = self.root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir).await?;

        let path = dir.join(name);
        if let Err(error) = fs::write(&path, bytes).await {
            let _ = fs::remove_dir_all(&dir).await;
            return Err(error.into());
        }

        Ok(StagedUpload { dir, path })
    }
}

pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub documents: Vec<IngestionOutcome>,
    pub skipped_files: Vec<SkippedPdf>,
}

impl IngestionReport {
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|document| document.chunk_count).sum()
    }
}
