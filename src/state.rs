use iced::widget::image;
use iced::{Point, touch, window};
use iced_video_player::Video;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::gallery::Gallery;
use crate::overlay::Overlay;
use crate::thumbnail::ThumbnailBinder;

/// The fullscreen playback context in the main window.
pub struct PlayerInstance {
    pub source: PathBuf,
    pub title: String,
    pub video: Video,
    pub position: f64,
    pub dragging: bool,
}

/// The floating player's window and the video it renders.
pub struct OverlayWindow {
    pub id: window::Id,
    pub video: Video,
    /// Last cursor position inside the window.
    pub cursor: Option<Point>,
    /// The finger driving the current touch gesture.
    pub finger: Option<touch::Finger>,
}

/// Application state containing the gallery, player and floating window.
pub struct App {
    pub config: Config,
    pub main_window: window::Id,
    pub gallery: Gallery,
    pub thumbnails: ThumbnailBinder,
    pub thumbnail_handles: HashMap<PathBuf, image::Handle>,
    pub player: Option<PlayerInstance>,
    pub overlay: Overlay,
    pub overlay_window: Option<OverlayWindow>,
    pub loading: bool,
    pub error: Option<String>,
    pub status: String,
}
