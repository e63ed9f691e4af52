use iced::{Point, touch, window};
use std::path::PathBuf;
use std::time::Instant;

use crate::error::Error;
use crate::gallery::{RowAction, Section};
use crate::media::VideoEntry;
use crate::thumbnail::Ticket;

/// Raw pointer input, relative to the window it happened in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pointer {
    Moved(Point),
    Pressed,
    Released,
    FingerPressed(touch::Finger, Point),
    FingerMoved(touch::Finger, Point),
    FingerLifted(touch::Finger),
    FingerLost(touch::Finger),
}

#[derive(Clone, Debug)]
pub enum Message {
    LibraryLoaded(Result<Vec<VideoEntry>, Error>),
    Rescan,
    ThumbnailReady(Ticket, Result<PathBuf, Error>),

    ToggleDrawer,
    SelectSection(Section),
    SearchChanged(String),
    SearchSubmitted,
    RowPressed(usize),
    OpenContextMenu(usize),
    CloseContextMenu,
    RowAction(usize, RowAction),
    ConfirmDelete,
    CancelDelete,
    DismissError,

    AddLibraryFolder,
    ToggleOverlayAutoplay,
    ClearCache,

    PlayerTogglePause,
    PlayerToggleMute,
    PlayerSeek(f64),
    PlayerSeekRelease,
    PlayerNewFrame,
    PlayerEnded,
    PlayerFloat,
    PlayerClose,

    OverlayClose,
    OverlayEnded,
    OverlayTick(Instant),
    ScreenPoll,
    /// Pointer event, the window it targets, and whether a widget captured it.
    Pointer(window::Id, Pointer, bool),
    EscapePressed,
    /// A window's top-left corner, as reported by the window manager.
    WindowMoved(window::Id, Point),
    WindowClosed(window::Id),
}
