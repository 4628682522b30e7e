//! Local side of uploads and downloads.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AppError, Result};
use crate::remote::Blob;

/// Split the text typed (or pasted by a terminal drop) into the upload
/// dialog into paths. Whitespace separates paths; single or double quotes
/// and backslash escapes keep spaces inside one path.
pub fn parse_upload_paths(input: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }
    paths
}

/// Read a local file into an upload payload named after the file.
pub async fn read_upload(path: &Path) -> Result<Blob> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::ValidationFailed(format!("{} is not a file", path.display())))?;
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(AppError::ValidationFailed(format!("{} is not a file", name)));
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(Blob::new(name, bytes))
}

/// Resolve a name collision by appending ` (1)`, ` (2)`, etc. before the
/// extension. Returns a path that does not exist yet.
pub fn resolve_collision(dest: &Path) -> PathBuf {
    if !dest.exists() {
        return dest.to_path_buf();
    }

    let parent = dest.parent().unwrap_or(Path::new("."));
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = dest.extension().map(|e| e.to_string_lossy().to_string());

    for i in 1..=1000 {
        let new_name = match &ext {
            Some(e) => format!("{} ({}).{}", stem, i, e),
            None => format!("{} ({})", stem, i),
        };
        let candidate = parent.join(&new_name);
        if !candidate.exists() {
            return candidate;
        }
    }

    dest.to_path_buf()
}

/// Write a downloaded blob into `dir`.
///
/// The bytes go to a temporary file in the same directory which is then
/// moved into place, so a failure never leaves a partial file under the
/// final name.
pub fn save_blob(dir: &Path, blob: &Blob) -> Result<PathBuf> {
    let file_name = Path::new(&blob.name)
        .file_name()
        .ok_or_else(|| AppError::ValidationFailed(format!("Invalid file name: {}", blob.name)))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".drive-download-")
        .tempfile_in(dir)?;
    tmp.write_all(&blob.bytes)?;
    tmp.flush()?;

    let dest = resolve_collision(&dir.join(file_name));
    tmp.persist_noclobber(&dest).map_err(|e| AppError::Io(e.error))?;
    debug!(path = %dest.display(), bytes = blob.len(), "download saved");
    Ok(dest)
}

/// `save_blob` off the async executor.
pub async fn save_download(dir: PathBuf, blob: Blob) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || save_blob(&dir, &blob))
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))?
}
