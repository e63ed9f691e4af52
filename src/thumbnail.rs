//! Thumbnail generation and per-row binding for the video list.
//!
//! Generation grabs one decoded frame through a GStreamer `appsink`, scales it
//! with `image` and writes a PNG next to the other cached thumbnails. Rows
//! hold a token for their in-flight generation so that a completion arriving
//! after the row was rebound to another video is dropped.

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use image::imageops::FilterType;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::cache;
use crate::error::Error;

/// Where the thumbnail frame is taken from, when the video is long enough.
const FRAME_OFFSET: Duration = Duration::from_secs(1);
const PREROLL_TIMEOUT: Duration = Duration::from_secs(10);
/// Decoding pipelines allowed to run at once.
const GENERATION_CONCURRENCY: usize = 4;

static GENERATION_SLOTS: OnceLock<Semaphore> = OnceLock::new();

/// Render a thumbnail for `source` into `target` on the blocking pool.
pub async fn generate(source: PathBuf, target: PathBuf, edge: u32) -> Result<PathBuf, Error> {
    let slots = GENERATION_SLOTS.get_or_init(|| Semaphore::new(GENERATION_CONCURRENCY));
    run_limited(slots, move || render_thumbnail(&source, &target, edge)).await
}

/// Run `job` on the blocking pool once one of `slots` is free.
async fn run_limited<T, F>(slots: &Semaphore, job: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Error> + Send + 'static,
{
    let _permit = slots
        .acquire()
        .await
        .map_err(|e| Error::Thumbnail(e.to_string()))?;
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| Error::Thumbnail(e.to_string()))?
}

fn render_thumbnail(source: &Path, target: &Path, edge: u32) -> Result<PathBuf, Error> {
    let start = Instant::now();
    log::debug!("Thumbnail START: {}", source.display());

    let frame = grab_frame(source)?;
    let thumbnail = image::DynamicImage::ImageRgba8(frame).resize(edge, edge, FilterType::Triangle);

    let dir = target
        .parent()
        .ok_or_else(|| Error::Thumbnail(format!("invalid target {}", target.display())))?;
    std::fs::create_dir_all(dir).map_err(|e| Error::Thumbnail(e.to_string()))?;

    // Write to a temp file first so a reader never sees a half-written PNG.
    let mut encoded = Vec::new();
    thumbnail
        .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
        .map_err(|e| Error::Thumbnail(e.to_string()))?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::Thumbnail(e.to_string()))?;
    temp.write_all(&encoded)
        .map_err(|e| Error::Thumbnail(e.to_string()))?;
    temp.persist(target)
        .map_err(|e| Error::Thumbnail(e.to_string()))?;

    log::debug!(
        "Thumbnail COMPLETE: {} in {}ms",
        source.display(),
        start.elapsed().as_millis()
    );
    Ok(target.to_path_buf())
}

/// Decode a single RGBA frame near the start of the video.
fn grab_frame(source: &Path) -> Result<image::RgbaImage, Error> {
    gst::init().map_err(|e| Error::Thumbnail(format!("GStreamer init failed: {}", e)))?;

    let uri = url::Url::from_file_path(source)
        .map_err(|_| Error::Thumbnail(format!("invalid path {}", source.display())))?;
    let description = format!(
        "uridecodebin uri=\"{}\" ! videoconvert ! videoscale ! appsink name=sink sync=false caps=video/x-raw,format=RGBA,pixel-aspect-ratio=1/1",
        uri
    );
    let pipeline = gst::parse::launch(&description)
        .map_err(|e| Error::Thumbnail(e.to_string()))?
        .downcast::<gst::Pipeline>()
        .map_err(|_| Error::Thumbnail("not a pipeline".into()))?;

    let result = pull_frame(&pipeline);
    let _ = pipeline.set_state(gst::State::Null);
    result
}

fn pull_frame(pipeline: &gst::Pipeline) -> Result<image::RgbaImage, Error> {
    let sink = pipeline
        .by_name("sink")
        .and_then(|element| element.downcast::<gst_app::AppSink>().ok())
        .ok_or_else(|| Error::Thumbnail("appsink missing".into()))?;

    pipeline
        .set_state(gst::State::Paused)
        .map_err(|e| Error::Thumbnail(e.to_string()))?;

    let timeout = gst::ClockTime::from_mseconds(PREROLL_TIMEOUT.as_millis() as u64);
    let mut sample = sink
        .try_pull_preroll(timeout)
        .ok_or_else(|| Error::Thumbnail("no frame decoded".into()))?;

    // Short clips fail the seek; the first frame is used instead.
    let offset = gst::ClockTime::from_mseconds(FRAME_OFFSET.as_millis() as u64);
    if pipeline
        .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT, offset)
        .is_ok()
    {
        if let Some(seeked) = sink.try_pull_preroll(timeout) {
            sample = seeked;
        }
    }

    sample_to_image(&sample)
}

fn sample_to_image(sample: &gst::Sample) -> Result<image::RgbaImage, Error> {
    let caps = sample
        .caps()
        .ok_or_else(|| Error::Thumbnail("frame without caps".into()))?;
    let structure = caps
        .structure(0)
        .ok_or_else(|| Error::Thumbnail("empty caps".into()))?;
    let width = structure
        .get::<i32>("width")
        .map_err(|e| Error::Thumbnail(e.to_string()))?;
    let height = structure
        .get::<i32>("height")
        .map_err(|e| Error::Thumbnail(e.to_string()))?;

    let buffer = sample
        .buffer()
        .ok_or_else(|| Error::Thumbnail("frame without buffer".into()))?;
    let map = buffer
        .map_readable()
        .map_err(|e| Error::Thumbnail(e.to_string()))?;

    let (width, height) = (width as u32, height as u32);
    let expected = (width * height * 4) as usize;
    if map.len() < expected {
        return Err(Error::Thumbnail(format!(
            "short frame: {} bytes for {}x{}",
            map.len(),
            width,
            height
        )));
    }
    image::RgbaImage::from_raw(width, height, map[..expected].to_vec())
        .ok_or_else(|| Error::Thumbnail("frame size mismatch".into()))
}

/// A scheduled generation for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub row: usize,
    pub token: u64,
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Outcome of binding a row to a video.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    /// The thumbnail already exists on disk.
    Cached(PathBuf),
    /// A generation for this row and source is already running.
    Pending,
    /// Generation failed earlier this session; keep the placeholder.
    Failed,
    /// Start a new generation.
    Generate(Ticket),
}

#[derive(Debug)]
struct Binding {
    source: PathBuf,
    in_flight: Option<u64>,
}

/// Tracks which video each visible row shows and its in-flight thumbnail work.
#[derive(Debug)]
pub struct ThumbnailBinder {
    dir: Option<PathBuf>,
    bindings: HashMap<usize, Binding>,
    /// Token of the running generation per source, whichever row asked for it.
    generating: HashMap<PathBuf, u64>,
    failed: HashSet<PathBuf>,
    next_token: u64,
}

impl ThumbnailBinder {
    pub fn new(dir: Option<PathBuf>) -> Self {
        ThumbnailBinder {
            dir,
            bindings: HashMap::new(),
            generating: HashMap::new(),
            failed: HashSet::new(),
            next_token: 0,
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Bind `row` to `source`, deciding whether a generation must start.
    pub fn bind(&mut self, row: usize, source: &Path) -> Bind {
        let Some(dir) = &self.dir else {
            return Bind::Failed;
        };
        let target = cache::thumbnail_path_in(dir, source);

        if target.exists() {
            self.bindings.insert(
                row,
                Binding {
                    source: source.to_path_buf(),
                    in_flight: None,
                },
            );
            return Bind::Cached(target);
        }

        if self.failed.contains(source) {
            self.bindings.insert(
                row,
                Binding {
                    source: source.to_path_buf(),
                    in_flight: None,
                },
            );
            return Bind::Failed;
        }

        if let Some(&token) = self.generating.get(source) {
            self.bindings.insert(
                row,
                Binding {
                    source: source.to_path_buf(),
                    in_flight: Some(token),
                },
            );
            return Bind::Pending;
        }

        let token = self.next_token;
        self.next_token += 1;
        self.generating.insert(source.to_path_buf(), token);
        self.bindings.insert(
            row,
            Binding {
                source: source.to_path_buf(),
                in_flight: Some(token),
            },
        );
        log::trace!("Row {} bound to {} (token {})", row, source.display(), token);

        Bind::Generate(Ticket {
            row,
            token,
            source: source.to_path_buf(),
            target,
        })
    }

    /// Settle a finished generation. Returns `true` if the row still shows
    /// the ticket's video and the result should be applied.
    pub fn complete(&mut self, ticket: &Ticket, succeeded: bool) -> bool {
        if !succeeded {
            self.failed.insert(ticket.source.clone());
        }

        if self.generating.get(&ticket.source) == Some(&ticket.token) {
            self.generating.remove(&ticket.source);
        }

        let mut applied = false;
        for binding in self.bindings.values_mut() {
            if binding.in_flight == Some(ticket.token) {
                binding.in_flight = None;
                applied = true;
            }
        }
        if !applied {
            log::debug!(
                "Dropping stale thumbnail for row {} (token {})",
                ticket.row,
                ticket.token
            );
        }
        applied
    }

    /// Forget all row bindings, e.g. after the list was rebuilt.
    pub fn unbind_all(&mut self) {
        self.bindings.clear();
    }

    /// Forget bindings and remembered failures after the cache was cleared.
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.generating.clear();
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder() -> (tempfile::TempDir, ThumbnailBinder) {
        let dir = tempfile::tempdir().unwrap();
        let binder = ThumbnailBinder::new(Some(dir.path().to_path_buf()));
        (dir, binder)
    }

    fn ticket(bind: Bind) -> Ticket {
        match bind {
            Bind::Generate(ticket) => ticket,
            other => panic!("expected a generation, got {:?}", other),
        }
    }

    #[test]
    fn existing_thumbnail_is_used_directly() {
        let (dir, mut binder) = binder();
        let source = Path::new("/videos/a.mp4");
        let target = cache::thumbnail_path_in(dir.path(), source);
        std::fs::write(&target, b"png").unwrap();

        assert_eq!(binder.bind(0, source), Bind::Cached(target));
    }

    #[test]
    fn rebinding_same_source_does_not_schedule_twice() {
        let (_dir, mut binder) = binder();
        let source = Path::new("/videos/a.mp4");

        let first = ticket(binder.bind(0, source));
        assert_eq!(binder.bind(0, source), Bind::Pending);
        assert!(binder.complete(&first, true));
    }

    #[test]
    fn rebuilt_list_reuses_running_generation() {
        let (_dir, mut binder) = binder();
        let source = Path::new("/videos/a.mp4");
        let first = ticket(binder.bind(0, source));

        binder.unbind_all();
        assert_eq!(binder.bind(2, source), Bind::Pending);
        assert!(binder.complete(&first, true));
        assert!(matches!(binder.bind(2, source), Bind::Generate(_)));
    }

    #[test]
    fn generation_never_exceeds_its_slots() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let slots = Semaphore::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..8).map(|_| {
            let running = running.clone();
            let peak = peak.clone();
            run_limited(&slots, move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
        });
        let results = runtime.block_on(futures::future::join_all(jobs));

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(Result::is_ok));
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 2, "peak {}", peak);
    }

    #[test]
    fn completion_after_rebind_is_dropped() {
        let (_dir, mut binder) = binder();
        let old = ticket(binder.bind(3, Path::new("/videos/a.mp4")));
        let new = ticket(binder.bind(3, Path::new("/videos/b.mp4")));

        assert!(!binder.complete(&old, true));
        assert!(binder.complete(&new, true));
    }

    #[test]
    fn completion_after_unbind_is_dropped() {
        let (_dir, mut binder) = binder();
        let pending = ticket(binder.bind(1, Path::new("/videos/a.mp4")));
        binder.unbind_all();

        assert!(!binder.complete(&pending, true));
    }

    #[test]
    fn failed_generation_is_not_retried() {
        let (_dir, mut binder) = binder();
        let source = Path::new("/videos/broken.mp4");
        let attempt = ticket(binder.bind(0, source));

        assert!(binder.complete(&attempt, false));
        assert_eq!(binder.bind(0, source), Bind::Failed);
        assert_eq!(binder.bind(5, source), Bind::Failed);

        binder.reset();
        assert!(matches!(binder.bind(0, source), Bind::Generate(_)));
    }

    #[test]
    fn tokens_are_unique_per_generation() {
        let (_dir, mut binder) = binder();
        let a = ticket(binder.bind(0, Path::new("/videos/a.mp4")));
        let b = ticket(binder.bind(1, Path::new("/videos/b.mp4")));
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn no_cache_dir_means_placeholder() {
        let mut binder = ThumbnailBinder::new(None);
        assert_eq!(binder.bind(0, Path::new("/videos/a.mp4")), Bind::Failed);
    }
}
