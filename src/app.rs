use iced::widget::image;
use iced::{Element, Event, Point, Size, Subscription, Task, event, keyboard, mouse, time, touch, window};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::cache;
use crate::config::Config;
use crate::error::Error;
use crate::gallery::{Gallery, RowAction};
use crate::loader;
use crate::media;
use crate::message::{Message, Pointer};
use crate::overlay::{self, Effect, EffectSink, Overlay, OverlaySession};
use crate::screen;
use crate::state::{App, OverlayWindow, PlayerInstance};
use crate::thumbnail::{self, Bind, ThumbnailBinder};
use crate::ui;

const LONG_PRESS_POLL: Duration = Duration::from_millis(50);
const SCREEN_POLL: Duration = Duration::from_secs(1);

fn main_window_settings() -> window::Settings {
    window::Settings {
        size: Size::new(900.0, 640.0),
        min_size: Some(Size::new(480.0, 360.0)),
        ..window::Settings::default()
    }
}

/// Map runtime events to the pointer and keyboard messages we care about.
fn map_event(event: Event, status: event::Status, window: window::Id) -> Option<Message> {
    let captured = status == event::Status::Captured;
    let pointer = match event {
        Event::Mouse(mouse::Event::CursorMoved { position }) => Pointer::Moved(position),
        Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => Pointer::Pressed,
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => Pointer::Released,
        Event::Touch(touch::Event::FingerPressed { id, position }) => {
            Pointer::FingerPressed(id, position)
        }
        Event::Touch(touch::Event::FingerMoved { id, position }) => Pointer::FingerMoved(id, position),
        Event::Touch(touch::Event::FingerLifted { id, .. }) => Pointer::FingerLifted(id),
        Event::Touch(touch::Event::FingerLost { id, .. }) => Pointer::FingerLost(id),
        Event::Keyboard(keyboard::Event::KeyPressed {
            key: keyboard::Key::Named(keyboard::key::Named::Escape),
            ..
        }) => return Some(Message::EscapePressed),
        Event::Window(window::Event::Moved(position)) => {
            return Some(Message::WindowMoved(window, position));
        }
        _ => return None,
    };
    Some(Message::Pointer(window, pointer, captured))
}

/// Applies overlay effects to the live app, collecting the window tasks.
struct EffectRunner<'a> {
    app: &'a mut App,
    tasks: Vec<Task<Message>>,
}

impl EffectSink for EffectRunner<'_> {
    fn move_window(&mut self, position: Point) {
        if let Some(overlay_window) = &self.app.overlay_window {
            self.tasks.push(window::move_to(overlay_window.id, position));
        }
    }

    fn set_paused(&mut self, paused: bool) {
        if let Some(overlay_window) = &mut self.app.overlay_window {
            overlay_window.video.set_paused(paused);
        }
    }

    fn hand_off(&mut self, source: &Path) -> Result<(), Error> {
        let position = self
            .app
            .overlay_window
            .as_ref()
            .map(|overlay_window| overlay_window.video.position())
            .unwrap_or_default();
        let task = self.app.play_video(source, position)?;
        self.tasks.push(task);
        Ok(())
    }

    fn close_window(&mut self) {
        let task = self.app.detach_overlay();
        self.tasks.push(task);
    }
}

impl App {
    /// Open the main window and start loading the library.
    pub fn new() -> (Self, Task<Message>) {
        let config = Config::load();
        let (main_window, open) = window::open(main_window_settings());

        let app = App {
            config,
            main_window,
            gallery: Gallery::default(),
            thumbnails: ThumbnailBinder::new(cache::thumbnail_dir()),
            thumbnail_handles: HashMap::new(),
            player: None,
            overlay: Overlay::default(),
            overlay_window: None,
            loading: true,
            error: None,
            status: "Loading videos...".to_string(),
        };
        let load = app.load_library();
        (app, Task::batch([open.discard(), load]))
    }

    fn load_library(&self) -> Task<Message> {
        log::info!("Loading library from {:?}", self.config.library_dirs);
        Task::perform(
            media::list_videos(self.config.library_dirs.clone()),
            Message::LibraryLoaded,
        )
    }

    /// Bind every visible row and schedule missing thumbnails.
    fn bind_visible_rows(&mut self) -> Task<Message> {
        let edge = self.config.thumbnail_edge;
        let sources: Vec<_> = self
            .gallery
            .visible()
            .into_iter()
            .map(|(_, entry)| entry.path.clone())
            .collect();

        let mut tasks = Vec::new();
        for (row, source) in sources.into_iter().enumerate() {
            match self.thumbnails.bind(row, &source) {
                Bind::Cached(path) => {
                    self.thumbnail_handles
                        .entry(source)
                        .or_insert_with(|| image::Handle::from_path(path));
                }
                Bind::Generate(ticket) => {
                    let job = thumbnail::generate(ticket.source.clone(), ticket.target.clone(), edge);
                    tasks.push(Task::perform(job, move |result| {
                        Message::ThumbnailReady(ticket, result)
                    }));
                }
                Bind::Pending | Bind::Failed => {}
            }
        }
        Task::batch(tasks)
    }

    fn show_error(&mut self, error: Error) {
        log::error!("{}", error);
        self.error = Some(error.to_string());
    }

    /// Launch the fullscreen player at `start`.
    fn play_video(&mut self, source: &Path, start: Duration) -> Result<Task<Message>, Error> {
        let mut video = loader::open_video(source, start)?;
        video.set_paused(false);

        let title = source
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        self.player = Some(PlayerInstance {
            source: source.to_path_buf(),
            title,
            video,
            position: start.as_secs_f64(),
            dragging: false,
        });
        self.error = None;
        Ok(window::set_mode(self.main_window, window::Mode::Fullscreen))
    }

    fn close_player(&mut self) -> Task<Message> {
        match self.player.take() {
            Some(player) => {
                log::info!("Player closed: {}", player.source.display());
                window::set_mode(self.main_window, window::Mode::Windowed)
            }
            None => Task::none(),
        }
    }

    /// Start a floating session and open its window.
    fn attach_overlay(&mut self, session: OverlaySession) -> Result<Task<Message>, Error> {
        if self.overlay.is_attached() {
            return Err(Error::AlreadyAttached);
        }
        let mut video = loader::open_video(&session.source, session.start_offset)?;
        let play = session.play_on_attach;
        let edge = media::density_pixels_to_pixels(
            self.config.overlay_edge_dp,
            self.config.display_density,
        );
        let placement = self.overlay.attach(session, edge)?;
        video.set_paused(!play);

        let (id, open) = window::open(placement.window_settings());
        self.overlay_window = Some(OverlayWindow {
            id,
            video,
            cursor: None,
            finger: None,
        });
        Ok(open.discard())
    }

    fn detach_overlay(&mut self) -> Task<Message> {
        if let Err(e) = self.overlay.detach() {
            log::warn!("Ignoring detach: {}", e);
            return Task::none();
        }
        match self.overlay_window.take() {
            Some(mut overlay_window) => {
                overlay_window.video.set_paused(true);
                window::close(overlay_window.id)
            }
            None => Task::none(),
        }
    }

    fn float_entry(&mut self, index: usize) -> Task<Message> {
        let Some(entry) = self.gallery.entry(index) else {
            return Task::none();
        };
        let Some((width, height)) = entry.size else {
            self.show_error(Error::UnknownDimensions);
            return Task::none();
        };
        let session = OverlaySession {
            source: entry.path.clone(),
            start_offset: Duration::ZERO,
            width,
            height,
            play_on_attach: self.config.play_overlay_on_attach,
        };
        self.attach_overlay(session).unwrap_or_else(|e| {
            self.show_error(e);
            Task::none()
        })
    }

    /// Move playback from the fullscreen player into a new floating window.
    fn float_player(&mut self) -> Result<Task<Message>, Error> {
        let Some(player) = &self.player else {
            return Ok(Task::none());
        };
        let (width, height) = loader::video_size(&player.video).ok_or(Error::UnknownDimensions)?;
        let session = OverlaySession {
            source: player.source.clone(),
            start_offset: player.video.position(),
            width,
            height,
            play_on_attach: self.config.play_overlay_on_attach,
        };
        let attach = self.attach_overlay(session)?;
        Ok(Task::batch([self.close_player(), attach]))
    }

    fn apply_overlay_effects(&mut self, effects: Vec<Effect>) -> Task<Message> {
        let mut runner = EffectRunner {
            app: self,
            tasks: Vec::new(),
        };
        let result = overlay::dispatch(effects, &mut runner);
        let tasks = runner.tasks;
        if let Err(e) = result {
            self.show_error(e);
        }
        Task::batch(tasks)
    }

    fn handle_pointer(&mut self, window: window::Id, pointer: Pointer, captured: bool) -> Task<Message> {
        let Some(overlay_window) = &mut self.overlay_window else {
            return Task::none();
        };
        if overlay_window.id != window {
            return Task::none();
        }

        let now = Instant::now();
        let effects = match pointer {
            Pointer::Moved(position) => {
                overlay_window.cursor = Some(position);
                if overlay_window.finger.is_some() {
                    Vec::new()
                } else {
                    self.overlay.pointer_moved(position)
                }
            }
            Pointer::Pressed => {
                if !captured && overlay_window.finger.is_none() {
                    if let Some(position) = overlay_window.cursor {
                        self.overlay.pointer_down(position, now);
                    }
                }
                Vec::new()
            }
            Pointer::Released => {
                if overlay_window.finger.is_none() {
                    self.overlay.pointer_up()
                } else {
                    Vec::new()
                }
            }
            Pointer::FingerPressed(finger, position) => {
                match overlay_window.finger {
                    None if !captured => {
                        overlay_window.finger = Some(finger);
                        self.overlay.pointer_down(position, now);
                    }
                    // Single finger only: a second finger aborts the gesture.
                    Some(active) if active != finger => self.overlay.pointer_cancelled(),
                    _ => {}
                }
                Vec::new()
            }
            Pointer::FingerMoved(finger, position) if overlay_window.finger == Some(finger) => {
                self.overlay.pointer_moved(position)
            }
            Pointer::FingerLifted(finger) if overlay_window.finger == Some(finger) => {
                overlay_window.finger = None;
                self.overlay.pointer_up()
            }
            Pointer::FingerLost(finger) if overlay_window.finger == Some(finger) => {
                overlay_window.finger = None;
                self.overlay.pointer_cancelled();
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.apply_overlay_effects(effects)
    }

    /// Handle UI messages and state updates.
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::LibraryLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(entries) => {
                        let count = entries.len();
                        log::info!("Library loaded: {} videos", count);
                        self.status = format!("{} video{}", count, if count == 1 { "" } else { "s" });
                        self.gallery.set_entries(entries);
                    }
                    Err(e) => {
                        log::error!("Library load failed: {}", e);
                        self.status = e.to_string();
                        self.gallery.set_entries(Vec::new());
                    }
                }
                self.thumbnails.unbind_all();
                self.bind_visible_rows()
            }
            Message::Rescan => {
                self.loading = true;
                self.status = "Loading videos...".to_string();
                self.load_library()
            }
            Message::ThumbnailReady(ticket, result) => {
                if let Err(e) = &result {
                    log::warn!("No thumbnail for {}: {}", ticket.source.display(), e);
                }
                if self.thumbnails.complete(&ticket, result.is_ok()) {
                    if let Ok(path) = result {
                        self.thumbnail_handles
                            .insert(ticket.source, image::Handle::from_path(path));
                    }
                }
                Task::none()
            }
            Message::ToggleDrawer => {
                self.gallery.toggle_drawer();
                Task::none()
            }
            Message::SelectSection(section) => {
                self.gallery.select(section);
                Task::none()
            }
            Message::SearchChanged(query) => {
                self.gallery.set_query(query);
                self.bind_visible_rows()
            }
            Message::SearchSubmitted => Task::none(),
            Message::RowPressed(index) => {
                self.gallery.context_menu = None;
                let Some(source) = self.gallery.entry(index).map(|entry| entry.path.clone()) else {
                    return Task::none();
                };
                self.play_video(&source, Duration::ZERO).unwrap_or_else(|e| {
                    self.show_error(e);
                    Task::none()
                })
            }
            Message::OpenContextMenu(index) => {
                self.gallery.context_menu = Some(index);
                Task::none()
            }
            Message::CloseContextMenu => {
                self.gallery.context_menu = None;
                Task::none()
            }
            Message::RowAction(index, action) => {
                self.gallery.context_menu = None;
                match action {
                    RowAction::Play => self.update(Message::RowPressed(index)),
                    RowAction::Float => self.float_entry(index),
                    RowAction::Delete => {
                        self.gallery.pending_delete = Some(index);
                        Task::none()
                    }
                }
            }
            Message::ConfirmDelete => {
                let Some(index) = self.gallery.pending_delete.take() else {
                    return Task::none();
                };
                match self.gallery.delete(index, self.thumbnails.dir()) {
                    Ok(entry) => {
                        self.thumbnail_handles.remove(&entry.path);
                        self.status = format!("Deleted {}", entry.title);
                        self.thumbnails.unbind_all();
                        self.bind_visible_rows()
                    }
                    Err(e) => {
                        self.show_error(e);
                        Task::none()
                    }
                }
            }
            Message::CancelDelete => {
                self.gallery.pending_delete = None;
                Task::none()
            }
            Message::DismissError => {
                self.error = None;
                Task::none()
            }
            Message::AddLibraryFolder => {
                if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                    if self.config.add_library_dir(dir) {
                        if let Err(e) = self.config.save() {
                            self.show_error(e);
                        }
                        return self.update(Message::Rescan);
                    }
                }
                Task::none()
            }
            Message::ToggleOverlayAutoplay => {
                self.config.play_overlay_on_attach = !self.config.play_overlay_on_attach;
                if let Err(e) = self.config.save() {
                    self.show_error(e);
                }
                Task::none()
            }
            Message::ClearCache => {
                let Some(dir) = self.thumbnails.dir().map(Path::to_path_buf) else {
                    return Task::none();
                };
                match cache::clear_cache(&dir) {
                    Ok(count) => self.status = format!("Cleared {} thumbnails", count),
                    Err(e) => self.show_error(e),
                }
                self.thumbnail_handles.clear();
                self.thumbnails.reset();
                self.bind_visible_rows()
            }
            Message::PlayerTogglePause => {
                if let Some(player) = &mut self.player {
                    player.video.set_paused(!player.video.paused());
                }
                Task::none()
            }
            Message::PlayerToggleMute => {
                if let Some(player) = &mut self.player {
                    let muted = player.video.muted();
                    player.video.set_muted(!muted);
                }
                Task::none()
            }
            Message::PlayerSeek(secs) => {
                if let Some(player) = &mut self.player {
                    if secs.is_finite() && secs >= 0.0 {
                        player.dragging = true;
                        player.video.set_paused(true);
                        player.position = secs;
                    }
                }
                Task::none()
            }
            Message::PlayerSeekRelease => {
                if let Some(player) = &mut self.player {
                    player.dragging = false;
                    if player.position.is_finite() && player.position >= 0.0 {
                        let target = Duration::from_secs_f64(player.position);
                        if let Err(e) = player.video.seek(target, true) {
                            log::warn!("Seek failed: {}", e);
                        }
                    }
                    player.video.set_paused(false);
                }
                Task::none()
            }
            Message::PlayerNewFrame => {
                if let Some(player) = &mut self.player {
                    if !player.dragging {
                        let pos = player.video.position().as_secs_f64();
                        if pos.is_finite() && pos >= 0.0 {
                            player.position = pos;
                        }
                    }
                }
                Task::none()
            }
            Message::PlayerEnded => {
                if let Some(player) = &mut self.player {
                    player.video.set_paused(true);
                }
                Task::none()
            }
            Message::PlayerFloat => self.float_player().unwrap_or_else(|e| {
                self.show_error(e);
                Task::none()
            }),
            Message::PlayerClose => self.close_player(),
            Message::OverlayClose => {
                let effects = self.overlay.close();
                self.apply_overlay_effects(effects)
            }
            Message::OverlayEnded => {
                let effects = self.overlay.completed();
                self.apply_overlay_effects(effects)
            }
            Message::OverlayTick(now) => {
                let effects = self.overlay.tick(now);
                self.apply_overlay_effects(effects)
            }
            Message::ScreenPoll => {
                let effects = self.overlay.screen_power(screen::read_display_power());
                self.apply_overlay_effects(effects)
            }
            Message::Pointer(window, pointer, captured) => {
                self.handle_pointer(window, pointer, captured)
            }
            Message::EscapePressed => {
                if self.player.is_some() {
                    self.close_player()
                } else {
                    self.gallery.context_menu = None;
                    self.gallery.pending_delete = None;
                    self.gallery.drawer_open = false;
                    Task::none()
                }
            }
            Message::WindowMoved(id, position) => {
                if self.overlay_window.as_ref().is_some_and(|w| w.id == id) {
                    self.overlay.window_moved(position);
                }
                Task::none()
            }
            Message::WindowClosed(id) => {
                if id == self.main_window {
                    log::info!("Main window closed, exiting");
                    return iced::exit();
                }
                if self.overlay_window.as_ref().is_some_and(|w| w.id == id) {
                    // Closed by the window manager rather than by us.
                    self.overlay_window = None;
                    if let Err(e) = self.overlay.detach() {
                        log::warn!("{}", e);
                    }
                }
                Task::none()
            }
        }
    }

    /// Subscribe to events.
    pub fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            event::listen_with(map_event),
            window::close_events().map(Message::WindowClosed),
        ];
        if self.overlay.awaiting_long_press() {
            subscriptions.push(time::every(LONG_PRESS_POLL).map(Message::OverlayTick));
        }
        if self.overlay.screen_listener_registered() {
            subscriptions.push(time::every(SCREEN_POLL).map(|_| Message::ScreenPoll));
        }
        Subscription::batch(subscriptions)
    }

    pub fn title(&self, window: window::Id) -> String {
        if self.overlay_window.as_ref().is_some_and(|w| w.id == window) {
            return self
                .overlay
                .session()
                .and_then(|session| session.source.file_stem())
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "Floatreel".to_string());
        }
        match &self.player {
            Some(player) => format!("{} - Floatreel", player.title),
            None => format!("{} - Floatreel", self.gallery.title()),
        }
    }

    /// Render the view.
    pub fn view(&self, window: window::Id) -> Element<'_, Message> {
        match &self.overlay_window {
            Some(overlay_window) if overlay_window.id == window => {
                ui::render_overlay(self, overlay_window)
            }
            _ => ui::render_main_view(self),
        }
    }
}
