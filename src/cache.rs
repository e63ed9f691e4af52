use std::path::{Path, PathBuf};

use crate::error::Error;

/// Get the thumbnail cache directory.
pub fn thumbnail_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("floatreel").join("thumbnails"))
}

/// Deterministic thumbnail location for a video inside `dir`.
///
/// The name is a hash of the source path, so the same video always maps to
/// the same file and distinct videos never share one.
pub fn thumbnail_path_in(dir: &Path, source: &Path) -> PathBuf {
    let hash = blake3::hash(source.as_os_str().as_encoded_bytes());
    dir.join(format!("{}.png", &hash.to_hex()[..32]))
}

/// Clear all generated thumbnails from disk.
pub fn clear_cache(dir: &Path) -> Result<usize, Error> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::Thumbnail(format!("{}: {}", dir.display(), e))),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Could not remove thumbnail {}: {}", path.display(), e),
            }
        }
    }
    log::info!("Cleared {} thumbnails from {}", removed, dir.display());
    Ok(removed)
}
