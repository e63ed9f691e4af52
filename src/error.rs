use std::path::PathBuf;

/// Failures surfaced by the gallery, the thumbnail store and the overlay.
///
/// Cloneable, since it travels inside iced messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("could not read library folder {}: {reason}", .path.display())]
    Enumeration { path: PathBuf, reason: String },

    #[error("ffprobe failed for {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("could not delete {}: {reason}", .path.display())]
    Delete { path: PathBuf, reason: String },

    #[error("video file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("failed to load video: {0}")]
    Playback(String),

    #[error("floating player is already open")]
    AlreadyAttached,

    #[error("floating player is not open")]
    NotAttached,

    #[error("video dimensions are unknown")]
    UnknownDimensions,

    #[error("config: {0}")]
    Config(String),
}
