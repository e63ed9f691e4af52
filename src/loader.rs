use iced_video_player::Video;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use crate::error::Error;

// Global lock to prevent simultaneous GStreamer pipeline initialization
// when the player and the floating window open videos back to back.
static GSTREAMER_INIT_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Open a video for playback, positioned at `start` and paused.
pub fn open_video(path: &Path, start: Duration) -> Result<Video, Error> {
    if std::fs::metadata(path).is_err() {
        return Err(Error::SourceMissing(path.to_path_buf()));
    }

    let url = url::Url::from_file_path(path)
        .map_err(|_| Error::Playback(format!("invalid video path {}", path.display())))?;

    let mut video = {
        let _guard = GSTREAMER_INIT_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Video::new(&url).map_err(|e| Error::Playback(e.to_string()))?
    };

    video.set_looping(false);
    video.set_paused(true);
    if !start.is_zero() {
        if let Err(e) = video.seek(start, true) {
            log::warn!("Seek to {:?} failed for {}: {}", start, path.display(), e);
        }
    }

    log::info!(
        "Video loaded: path={}, start={:?}, fps={}",
        path.display(),
        start,
        video.framerate()
    );
    Ok(video)
}

/// Frame size of an opened video, if GStreamer reported one.
pub fn video_size(video: &Video) -> Option<(u32, u32)> {
    let (width, height) = video.size();
    if width > 0 && height > 0 {
        Some((width as u32, height as u32))
    } else {
        None
    }
}

