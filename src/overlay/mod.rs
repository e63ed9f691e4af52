//! The floating player: an always-on-top borderless window showing one video.
//!
//! [`Overlay`] owns the session lifecycle, window placement, play/pause state
//! and gesture handling. It never touches iced or GStreamer directly; every
//! call returns [`Effect`]s that the application applies to the video and the
//! window.

pub mod gesture;

use iced::{Point, Size, window};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::media;
use crate::screen::{DisplayPower, ScreenStateListener};
use gesture::{Gesture, GestureTracker, Offset};

/// A request for floating playback.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySession {
    pub source: PathBuf,
    pub start_offset: Duration,
    /// Intrinsic width of the video.
    pub width: u32,
    /// Intrinsic height of the video.
    pub height: u32,
    pub play_on_attach: bool,
}

/// Window traits the floating player is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFlags {
    pub always_on_top: bool,
    pub focusable: bool,
    pub unconstrained: bool,
    pub translucent: bool,
    pub top_left_anchor: bool,
}

pub const OVERLAY_FLAGS: WindowFlags = WindowFlags {
    always_on_top: true,
    focusable: false,
    unconstrained: true,
    translucent: true,
    top_left_anchor: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub flags: WindowFlags,
}

impl Placement {
    pub fn offset(&self) -> Offset {
        Offset {
            x: self.x,
            y: self.y,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }

    /// iced window settings for this placement.
    pub fn window_settings(&self) -> window::Settings {
        window::Settings {
            size: Size::new(self.width as f32, self.height as f32),
            position: window::Position::Specific(self.position()),
            resizable: false,
            decorations: false,
            transparent: self.flags.translucent,
            level: if self.flags.always_on_top {
                window::Level::AlwaysOnTop
            } else {
                window::Level::Normal
            },
            exit_on_close_request: true,
            ..window::Settings::default()
        }
    }
}

/// Window size that keeps the video's aspect ratio with its longer edge at `edge_px`.
pub fn window_size(video_width: u32, video_height: u32, edge_px: f32) -> (u32, u32) {
    let (w, h) = (video_width as f64, video_height as f64);
    let edge = edge_px as f64;
    let (width, height) = if media::is_portrait(h, w) {
        (edge * w / h, edge)
    } else {
        (edge, edge * h / w)
    };
    ((width.round() as u32).max(1), (height.round() as u32).max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Detached,
    Paused,
    Playing,
}

/// Something the application must do on behalf of the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    MoveWindow(Point),
    SetPaused(bool),
    /// Open the fullscreen player for this video at the overlay's current position.
    HandOff(PathBuf),
    /// Stop playback and close the window.
    CloseWindow,
}

/// Carries out [`Effect`]s against the real window and video.
pub trait EffectSink {
    fn move_window(&mut self, position: Point);
    fn set_paused(&mut self, paused: bool);
    fn hand_off(&mut self, source: &Path) -> Result<(), Error>;
    fn close_window(&mut self);
}

/// Apply `effects` in order. A failed hand-off stops there, so the floating
/// window is not closed and one surface stays visible.
pub fn dispatch<S: EffectSink>(effects: Vec<Effect>, sink: &mut S) -> Result<(), Error> {
    for effect in effects {
        match effect {
            Effect::MoveWindow(position) => sink.move_window(position),
            Effect::SetPaused(paused) => sink.set_paused(paused),
            Effect::HandOff(source) => sink.hand_off(&source)?,
            Effect::CloseWindow => sink.close_window(),
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct Overlay {
    state: State,
    session: Option<OverlaySession>,
    /// Where the window was last asked to be.
    placement: Option<Placement>,
    /// Where the window manager last reported it. Pointer positions are
    /// relative to this, not to a move that has not landed yet.
    origin: Option<Offset>,
    gesture: GestureTracker,
    screen: ScreenStateListener,
}

impl Default for Overlay {
    fn default() -> Self {
        Overlay {
            state: State::Detached,
            session: None,
            placement: None,
            origin: None,
            gesture: GestureTracker::default(),
            screen: ScreenStateListener::default(),
        }
    }
}

impl Overlay {
    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state != State::Detached
    }

    pub fn session(&self) -> Option<&OverlaySession> {
        self.session.as_ref()
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    /// The close button is offered only while paused.
    pub fn close_visible(&self) -> bool {
        self.state == State::Paused
    }

    pub fn screen_listener_registered(&self) -> bool {
        self.screen.is_registered()
    }

    pub fn awaiting_long_press(&self) -> bool {
        self.gesture.awaiting_long_press()
    }

    /// Start a session. The returned placement describes the window to open.
    pub fn attach(&mut self, session: OverlaySession, edge_px: f32) -> Result<Placement, Error> {
        if self.is_attached() {
            return Err(Error::AlreadyAttached);
        }
        if session.width == 0 || session.height == 0 {
            return Err(Error::UnknownDimensions);
        }

        let (width, height) = window_size(session.width, session.height, edge_px);
        let placement = Placement {
            x: 0,
            y: 0,
            width,
            height,
            flags: OVERLAY_FLAGS,
        };

        self.screen.register();
        self.gesture.cancel();
        self.state = if session.play_on_attach {
            State::Playing
        } else {
            State::Paused
        };
        log::info!(
            "Overlay attached: {} at {:?}, {}x{}, state={:?}",
            session.source.display(),
            session.start_offset,
            width,
            height,
            self.state
        );
        self.session = Some(session);
        self.placement = Some(placement);
        self.origin = Some(placement.offset());
        Ok(placement)
    }

    /// End the session. Detaching twice is an error.
    pub fn detach(&mut self) -> Result<OverlaySession, Error> {
        if !self.is_attached() {
            return Err(Error::NotAttached);
        }
        self.screen.unregister();
        self.gesture.cancel();
        self.state = State::Detached;
        self.placement = None;
        self.origin = None;
        let session = self.session.take().ok_or(Error::NotAttached)?;
        log::info!("Overlay detached: {}", session.source.display());
        Ok(session)
    }

    pub fn toggle(&mut self) -> Vec<Effect> {
        match self.state {
            State::Playing => {
                self.state = State::Paused;
                vec![Effect::SetPaused(true)]
            }
            State::Paused => {
                self.state = State::Playing;
                vec![Effect::SetPaused(false)]
            }
            State::Detached => Vec::new(),
        }
    }

    /// The window manager reports the window's top-left corner at `position`.
    pub fn window_moved(&mut self, position: Point) {
        if self.is_attached() {
            self.origin = Some(Offset {
                x: position.x.round() as i32,
                y: position.y.round() as i32,
            });
        }
    }

    /// Pointer pressed at `local`, relative to the overlay window.
    pub fn pointer_down(&mut self, local: Point, now: Instant) {
        if let Some(origin) = self.origin {
            self.gesture.down(origin, to_screen(origin, local), now);
        }
    }

    pub fn pointer_moved(&mut self, local: Point) -> Vec<Effect> {
        let Some(origin) = self.origin else {
            return Vec::new();
        };
        let raw = to_screen(origin, local);
        let gesture = self.gesture.moved(raw);
        self.apply(gesture)
    }

    pub fn pointer_up(&mut self) -> Vec<Effect> {
        let gesture = self.gesture.up();
        self.apply(gesture)
    }

    pub fn pointer_cancelled(&mut self) {
        self.gesture.cancel();
    }

    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let gesture = self.gesture.tick(now);
        self.apply(gesture)
    }

    /// Close button: stop and detach.
    pub fn close(&mut self) -> Vec<Effect> {
        if self.is_attached() {
            vec![Effect::SetPaused(true), Effect::CloseWindow]
        } else {
            Vec::new()
        }
    }

    /// Natural end of the video.
    pub fn completed(&mut self) -> Vec<Effect> {
        if self.is_attached() {
            vec![Effect::CloseWindow]
        } else {
            Vec::new()
        }
    }

    /// Feed a display power sample. Screen-off pauses but never detaches.
    pub fn screen_power(&mut self, power: DisplayPower) -> Vec<Effect> {
        if !self.screen.observe(power) {
            return Vec::new();
        }
        log::info!("Screen turned off, pausing floating player");
        match self.state {
            State::Playing => {
                self.state = State::Paused;
                vec![Effect::SetPaused(true)]
            }
            _ => Vec::new(),
        }
    }

    fn apply(&mut self, gesture: Option<Gesture>) -> Vec<Effect> {
        match gesture {
            Some(Gesture::Drag(offset)) => {
                let Some(placement) = &mut self.placement else {
                    return Vec::new();
                };
                placement.x = offset.x;
                placement.y = offset.y;
                log::trace!("Overlay dragged to ({}, {})", offset.x, offset.y);
                vec![Effect::MoveWindow(placement.position())]
            }
            Some(Gesture::Tap) => self.toggle(),
            Some(Gesture::LongPress) => {
                let Some(session) = &self.session else {
                    return Vec::new();
                };
                let source = session.source.clone();
                if self.state == State::Playing {
                    self.state = State::Paused;
                }
                log::info!("Overlay long press, handing off {}", source.display());
                vec![
                    Effect::SetPaused(true),
                    Effect::HandOff(source),
                    Effect::CloseWindow,
                ]
            }
            None => Vec::new(),
        }
    }
}

fn to_screen(origin: Offset, local: Point) -> Point {
    Point::new(origin.x as f32 + local.x, origin.y as f32 + local.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesture::LONG_PRESS_TIMEOUT;

    fn session(width: u32, height: u32, play: bool) -> OverlaySession {
        OverlaySession {
            source: PathBuf::from("/videos/clip.mp4"),
            start_offset: Duration::from_secs(12),
            width,
            height,
            play_on_attach: play,
        }
    }

    fn attached(play: bool) -> Overlay {
        let mut overlay = Overlay::default();
        overlay.attach(session(1920, 1080, play), 150.0).unwrap();
        overlay
    }

    #[test]
    fn landscape_window_is_150_wide() {
        assert_eq!(window_size(1920, 1080, 150.0), (150, 84));
    }

    #[test]
    fn portrait_window_is_150_tall() {
        assert_eq!(window_size(1080, 1920, 150.0), (84, 150));
    }

    #[test]
    fn longer_edge_always_matches_and_ratio_is_kept() {
        for &(w, h) in &[(640, 480), (480, 640), (3840, 1600), (720, 1280), (500, 500), (1, 3)] {
            let (ww, wh) = window_size(w, h, 150.0);
            assert_eq!(ww.max(wh), 150, "{}x{}", w, h);
            let expected = 150.0 * w.min(h) as f64 / w.max(h) as f64;
            assert!((ww.min(wh) as f64 - expected).abs() <= 0.5, "{}x{}", w, h);
        }
    }

    #[test]
    fn extreme_ratios_keep_a_visible_window() {
        assert_eq!(window_size(1, 1000, 150.0), (1, 150));
        assert_eq!(window_size(1000, 1, 150.0), (150, 1));

        let mut overlay = Overlay::default();
        let placement = overlay.attach(session(1, 1000, true), 150.0).unwrap();
        assert_eq!((placement.width, placement.height), (1, 150));
    }

    #[test]
    fn density_scales_the_edge() {
        let edge = media::density_pixels_to_pixels(150.0, 2.0);
        assert_eq!(window_size(1920, 1080, edge), (300, 169));
    }

    #[test]
    fn attach_respects_play_on_attach() {
        assert_eq!(attached(true).state(), State::Playing);
        assert_eq!(attached(false).state(), State::Paused);
    }

    #[test]
    fn attach_places_window_top_left_with_overlay_flags() {
        let mut overlay = Overlay::default();
        let placement = overlay.attach(session(1920, 1080, true), 150.0).unwrap();
        assert_eq!((placement.x, placement.y), (0, 0));
        assert_eq!(placement.flags, OVERLAY_FLAGS);
        assert!(overlay.screen_listener_registered());

        let settings = placement.window_settings();
        assert!(!settings.decorations);
        assert!(settings.transparent);
        assert_eq!(settings.level, window::Level::AlwaysOnTop);
    }

    #[test]
    fn double_attach_and_double_detach_are_rejected() {
        let mut overlay = attached(true);
        assert_eq!(
            overlay.attach(session(640, 480, true), 150.0),
            Err(Error::AlreadyAttached)
        );

        assert!(overlay.detach().is_ok());
        assert!(!overlay.screen_listener_registered());
        assert_eq!(overlay.detach(), Err(Error::NotAttached));
    }

    #[test]
    fn unknown_dimensions_are_rejected() {
        let mut overlay = Overlay::default();
        assert_eq!(
            overlay.attach(session(0, 1080, true), 150.0),
            Err(Error::UnknownDimensions)
        );
        assert!(!overlay.is_attached());
    }

    #[test]
    fn tap_toggles_and_close_button_follows() {
        let mut overlay = attached(true);
        let now = Instant::now();
        assert!(!overlay.close_visible());

        overlay.pointer_down(Point::new(20.0, 20.0), now);
        assert_eq!(overlay.pointer_up(), vec![Effect::SetPaused(true)]);
        assert_eq!(overlay.state(), State::Paused);
        assert!(overlay.close_visible());

        overlay.pointer_down(Point::new(20.0, 20.0), now);
        assert_eq!(overlay.pointer_up(), vec![Effect::SetPaused(false)]);
        assert_eq!(overlay.state(), State::Playing);
        assert!(!overlay.close_visible());
    }

    #[test]
    fn drag_moves_window_by_delta() {
        let mut overlay = attached(true);
        overlay.pointer_down(Point::new(30.0, 30.0), Instant::now());

        let effects = overlay.pointer_moved(Point::new(70.0, 55.0));
        assert_eq!(effects, vec![Effect::MoveWindow(Point::new(40.0, 25.0))]);

        // The window moved, so the same screen point is now closer to its corner.
        overlay.window_moved(Point::new(40.0, 25.0));
        let effects = overlay.pointer_moved(Point::new(50.0, 35.0));
        assert_eq!(effects, vec![Effect::MoveWindow(Point::new(60.0, 30.0))]);

        assert_eq!(overlay.pointer_up(), Vec::new());
        assert_eq!(overlay.state(), State::Playing);
        let placement = overlay.placement().unwrap();
        assert_eq!((placement.x, placement.y), (60, 30));
    }

    #[test]
    fn pointer_events_before_the_move_lands_do_not_overshoot() {
        let mut overlay = attached(true);
        overlay.pointer_down(Point::new(100.0, 100.0), Instant::now());

        assert_eq!(
            overlay.pointer_moved(Point::new(110.0, 100.0)),
            vec![Effect::MoveWindow(Point::new(10.0, 0.0))]
        );
        // Still relative to the old origin: the move has not been applied yet.
        assert_eq!(
            overlay.pointer_moved(Point::new(112.0, 100.0)),
            vec![Effect::MoveWindow(Point::new(12.0, 0.0))]
        );

        overlay.window_moved(Point::new(12.0, 0.0));
        assert_eq!(
            overlay.pointer_moved(Point::new(100.0, 100.0)),
            vec![Effect::MoveWindow(Point::new(12.0, 0.0))]
        );
        let placement = overlay.placement().unwrap();
        assert_eq!((placement.x, placement.y), (12, 0));
    }

    #[test]
    fn window_moves_after_detach_are_ignored() {
        let mut overlay = attached(true);
        overlay.detach().unwrap();
        overlay.window_moved(Point::new(50.0, 50.0));
        overlay.pointer_down(Point::new(1.0, 1.0), Instant::now());
        assert_eq!(overlay.pointer_moved(Point::new(40.0, 40.0)), Vec::new());
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        hand_off_fails: bool,
    }

    impl EffectSink for Recorder {
        fn move_window(&mut self, position: Point) {
            self.calls.push(format!("move {} {}", position.x, position.y));
        }

        fn set_paused(&mut self, paused: bool) {
            self.calls.push(format!("paused {}", paused));
        }

        fn hand_off(&mut self, source: &Path) -> Result<(), Error> {
            if self.hand_off_fails {
                return Err(Error::SourceMissing(source.to_path_buf()));
            }
            self.calls.push("fullscreen".to_string());
            Ok(())
        }

        fn close_window(&mut self) {
            self.calls.push("close".to_string());
        }
    }

    fn long_press(overlay: &mut Overlay) -> Vec<Effect> {
        let now = Instant::now();
        overlay.pointer_down(Point::new(10.0, 10.0), now);
        overlay.tick(now + LONG_PRESS_TIMEOUT)
    }

    #[test]
    fn successful_hand_off_closes_the_floating_window() {
        let mut overlay = attached(true);
        let mut recorder = Recorder::default();

        dispatch(long_press(&mut overlay), &mut recorder).unwrap();
        assert_eq!(recorder.calls, vec!["paused true", "fullscreen", "close"]);
    }

    #[test]
    fn failed_hand_off_keeps_the_floating_window() {
        let mut overlay = attached(true);
        let mut recorder = Recorder {
            hand_off_fails: true,
            ..Recorder::default()
        };

        let result = dispatch(long_press(&mut overlay), &mut recorder);
        assert_eq!(
            result,
            Err(Error::SourceMissing(PathBuf::from("/videos/clip.mp4")))
        );
        assert_eq!(recorder.calls, vec!["paused true"]);
        assert!(overlay.is_attached());
        assert_eq!(overlay.state(), State::Paused);
    }

    #[test]
    fn long_press_hands_off_exactly_once() {
        let mut overlay = attached(true);
        let now = Instant::now();
        overlay.pointer_down(Point::new(10.0, 10.0), now);

        let effects = overlay.tick(now + LONG_PRESS_TIMEOUT);
        assert_eq!(
            effects,
            vec![
                Effect::SetPaused(true),
                Effect::HandOff(PathBuf::from("/videos/clip.mp4")),
                Effect::CloseWindow,
            ]
        );
        assert_eq!(overlay.tick(now + LONG_PRESS_TIMEOUT * 3), Vec::new());
        assert_eq!(overlay.pointer_up(), Vec::new());
    }

    #[test]
    fn screen_off_pauses_without_detaching() {
        let mut overlay = attached(true);
        assert_eq!(overlay.screen_power(DisplayPower::On), Vec::new());
        assert_eq!(
            overlay.screen_power(DisplayPower::Off),
            vec![Effect::SetPaused(true)]
        );
        assert_eq!(overlay.state(), State::Paused);
        assert!(overlay.is_attached());
    }

    #[test]
    fn screen_off_after_detach_is_ignored() {
        let mut overlay = attached(true);
        overlay.detach().unwrap();
        assert_eq!(overlay.screen_power(DisplayPower::Off), Vec::new());
    }

    #[test]
    fn close_and_completion_request_window_close() {
        let mut overlay = attached(false);
        assert_eq!(
            overlay.close(),
            vec![Effect::SetPaused(true), Effect::CloseWindow]
        );
        assert_eq!(overlay.completed(), vec![Effect::CloseWindow]);

        overlay.detach().unwrap();
        assert_eq!(overlay.close(), Vec::new());
        assert_eq!(overlay.completed(), Vec::new());
    }
}
