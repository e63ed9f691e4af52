//! Video enumeration, metadata probing and display helpers.

use futures::StreamExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache;
use crate::error::Error;

/// File extensions treated as playable video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "mkv", "avi", "webm"];

/// How many ffprobe processes run at once while loading the library.
const PROBE_CONCURRENCY: usize = 4;

/// A single video found in the library.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEntry {
    pub path: PathBuf,
    pub title: String,
    pub duration_ms: u64,
    /// Intrinsic frame size (width, height), when ffprobe could read it.
    pub size: Option<(u32, u32)>,
}

impl VideoEntry {
    pub fn new(path: PathBuf, duration_ms: u64, size: Option<(u32, u32)>) -> Self {
        let title = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        VideoEntry {
            path,
            title,
            duration_ms,
            size,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Walk the library folders and collect video paths, sorted and de-duplicated.
///
/// Unreadable folders are logged and skipped. It is an error only when no
/// folder could be read at all.
pub fn collect_video_paths(dirs: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    let mut paths = Vec::new();
    let mut first_error = None;
    let mut readable = 0;

    for dir in dirs {
        if let Err(e) = std::fs::read_dir(dir) {
            let error = Error::Enumeration {
                path: dir.clone(),
                reason: e.to_string(),
            };
            log::warn!("{}", error);
            first_error.get_or_insert(error);
            continue;
        }
        readable += 1;

        for entry in WalkDir::new(dir).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_video_file(entry.path()) => {
                    paths.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => log::debug!("Skipping unreadable entry under {}: {}", dir.display(), e),
            }
        }
    }

    if readable == 0 {
        if let Some(error) = first_error {
            return Err(error);
        }
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// Enumerate every video under the library folders with its metadata.
pub async fn list_videos(dirs: Vec<PathBuf>) -> Result<Vec<VideoEntry>, Error> {
    let paths = tokio::task::spawn_blocking(move || collect_video_paths(&dirs))
        .await
        .map_err(|e| Error::Enumeration {
            path: PathBuf::new(),
            reason: e.to_string(),
        })??;

    log::info!("Probing {} videos", paths.len());

    let entries: Vec<VideoEntry> = futures::stream::iter(paths)
        .map(|path| async move {
            let probed = probe(&path).await;
            match probed {
                Ok((duration_ms, size)) => VideoEntry::new(path, duration_ms, size),
                Err(e) => {
                    log::warn!("{}", e);
                    VideoEntry::new(path, 0, None)
                }
            }
        })
        .buffered(PROBE_CONCURRENCY)
        .collect()
        .await;

    Ok(entries)
}

/// Read duration (ms) and frame size of a video with ffprobe.
pub async fn probe(path: &Path) -> Result<(u64, Option<(u32, u32)>), Error> {
    let output = tokio::process::Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height:format=duration")
        .arg("-of")
        .arg("json")
        .arg(path)
        .output()
        .await
        .map_err(|e| Error::Probe {
            path: path.to_path_buf(),
            reason: format!("failed to run ffprobe: {}", e),
        })?;

    if !output.status.success() {
        return Err(Error::Probe {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_output(&output.stdout).map_err(|reason| Error::Probe {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_probe_output(stdout: &[u8]) -> Result<(u64, Option<(u32, u32)>), String> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout).map_err(|e| e.to_string())?;

    let duration_ms = parsed
        .format
        .and_then(|format| format.duration)
        .and_then(|secs| secs.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| (secs * 1000.0).round() as u64)
        .unwrap_or(0);

    let size = parsed.streams.first().and_then(|stream| {
        match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    });

    Ok((duration_ms, size))
}

/// Format a duration for the list rows, e.g. `03:07` or `1:02:03`.
pub fn format_duration(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

pub fn is_portrait(height: f64, width: f64) -> bool {
    height > width
}

pub fn density_pixels_to_pixels(dp: f32, density: f32) -> f32 {
    dp * density
}

/// Delete a video and its cached thumbnail. Other thumbnails are untouched.
pub fn delete_video(path: &Path, thumbnail_dir: Option<&Path>) -> Result<(), Error> {
    std::fs::remove_file(path).map_err(|e| Error::Delete {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    log::info!("Deleted video {}", path.display());

    if let Some(dir) = thumbnail_dir {
        let thumbnail = cache::thumbnail_path_in(dir, path);
        match std::fs::remove_file(&thumbnail) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove thumbnail {}: {}", thumbnail.display(), e),
        }
    }
    Ok(())
}
