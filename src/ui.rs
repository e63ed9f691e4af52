use iced::widget::text::Shaping;
use iced::widget::{
    button, center, column, container, image, mouse_area, opaque, row, scrollable, slider, stack,
    text, text_input,
};
use iced::{Color, ContentFit, Element, Length, Theme, alignment};
use iced_video_player::{Video, VideoPlayer};

use crate::gallery::{RowAction, Section};
use crate::media::{self, VideoEntry};
use crate::message::Message;
use crate::state::{App, OverlayWindow, PlayerInstance};

const THUMBNAIL_WIDTH: f32 = 112.0;
const THUMBNAIL_HEIGHT: f32 = 63.0;
/// Edge of the floating player's close button, in density-independent units.
const CLOSE_BUTTON_DP: f32 = 40.0;

/// Get the safe duration of a video, handling invalid values.
pub fn safe_duration(video: &Video) -> f64 {
    let duration = video.duration().as_secs_f64();
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        1.0 // Default to 1 second if invalid (prevents slider from breaking)
    }
}

fn panel_style(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Color::from_rgb8(0x26, 0x28, 0x2c).into()),
        text_color: Some(Color::WHITE),
        border: iced::Border {
            radius: 6.0.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn scrim_style(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Color::from_rgba(0.0, 0.0, 0.0, 0.6).into()),
        ..Default::default()
    }
}

/// Show `content` centered above `base`; clicking outside sends `on_dismiss`.
fn modal<'a>(
    base: Element<'a, Message>,
    content: Element<'a, Message>,
    on_dismiss: Message,
) -> Element<'a, Message> {
    stack![
        base,
        opaque(
            mouse_area(
                center(opaque(container(content).padding(20).style(panel_style)))
                    .style(scrim_style)
            )
            .on_press(on_dismiss)
        )
    ]
    .into()
}

/// Render the main window: the player when one is open, else the gallery.
pub fn render_main_view(app: &App) -> Element<'_, Message> {
    if let Some(player) = &app.player {
        return render_player(player);
    }

    let mut body = row![];
    if app.gallery.drawer_open {
        body = body.push(render_drawer(app));
    }
    body = body.push(
        container(match app.gallery.section {
            Section::Videos => render_video_list(app),
            Section::Settings => render_settings(app),
            Section::About => render_about(),
        })
        .width(Length::Fill)
        .height(Length::Fill),
    );

    let mut page = column![render_title_bar(app)];
    if let Some(error) = &app.error {
        page = page.push(render_error_banner(error));
    }
    let page: Element<'_, Message> = page.push(body).into();

    if app.gallery.pending_delete.is_some() {
        return modal(page, render_delete_dialog(), Message::CancelDelete);
    }
    if let Some(index) = app.gallery.context_menu {
        if let Some(entry) = app.gallery.entry(index) {
            return modal(
                page,
                render_context_menu(index, entry),
                Message::CloseContextMenu,
            );
        }
    }
    page
}

fn render_title_bar(app: &App) -> Element<'_, Message> {
    let mut bar = row![
        button(text("≡").size(18))
            .on_press(Message::ToggleDrawer)
            .padding(6),
        text(app.gallery.title()).size(20),
        container("").width(Length::Fill),
    ]
    .spacing(12)
    .align_y(alignment::Vertical::Center);

    if app.gallery.section == Section::Videos {
        bar = bar.push(
            text_input("Search", app.gallery.query())
                .on_input(Message::SearchChanged)
                .on_submit(Message::SearchSubmitted)
                .padding(6)
                .width(Length::Fixed(240.0)),
        );
    }

    container(bar).padding(8).width(Length::Fill).into()
}

fn render_error_banner(error: &str) -> Element<'_, Message> {
    container(
        row![
            text(error).color(Color::WHITE),
            container("").width(Length::Fill),
            button(text("X").size(14))
                .on_press(Message::DismissError)
                .padding(4),
        ]
        .align_y(alignment::Vertical::Center),
    )
    .padding(8)
    .width(Length::Fill)
    .style(|_theme: &Theme| container::Style {
        background: Some(Color::from_rgb8(0xb0, 0x30, 0x30).into()),
        ..Default::default()
    })
    .into()
}

fn render_drawer(app: &App) -> Element<'_, Message> {
    let items: Vec<Element<'_, Message>> = Section::ALL
        .iter()
        .map(|&section| {
            let style = if section == app.gallery.section {
                button::primary
            } else {
                button::text
            };
            button(text(section.title()).size(16))
                .on_press(Message::SelectSection(section))
                .style(style)
                .width(Length::Fill)
                .padding(10)
                .into()
        })
        .collect();

    container(column(items).spacing(4))
        .padding(8)
        .width(Length::Fixed(200.0))
        .height(Length::Fill)
        .style(panel_style)
        .into()
}

fn render_video_list(app: &App) -> Element<'_, Message> {
    if app.loading {
        return center(text("Loading videos...").size(18)).into();
    }

    let visible = app.gallery.visible();
    if visible.is_empty() {
        let headline = if app.gallery.entries().is_empty() {
            "No videos found"
        } else {
            "No videos match your search"
        };
        return center(
            column![text(headline).size(24), text(app.status.clone()).size(12)]
                .spacing(10)
                .align_x(alignment::Horizontal::Center),
        )
        .into();
    }

    let rows = visible
        .into_iter()
        .map(|(index, entry)| render_row(app, index, entry));

    scrollable(column(rows).spacing(2).padding(8))
        .height(Length::Fill)
        .into()
}

fn render_row<'a>(app: &'a App, index: usize, entry: &'a VideoEntry) -> Element<'a, Message> {
    let thumbnail: Element<'a, Message> = match app.thumbnail_handles.get(&entry.path) {
        Some(handle) => image(handle.clone())
            .width(Length::Fixed(THUMBNAIL_WIDTH))
            .height(Length::Fixed(THUMBNAIL_HEIGHT))
            .content_fit(ContentFit::Cover)
            .into(),
        None => container("")
            .width(Length::Fixed(THUMBNAIL_WIDTH))
            .height(Length::Fixed(THUMBNAIL_HEIGHT))
            .style(|_theme: &Theme| container::Style {
                background: Some(Color::from_rgb8(0x3a, 0x3c, 0x40).into()),
                ..Default::default()
            })
            .into(),
    };

    let duration = app.gallery.duration_of(index).unwrap_or_default();
    let content = row![
        thumbnail,
        column![
            text(&entry.title).size(16).shaping(Shaping::Advanced),
            text(media::format_duration(duration)).size(12),
        ]
        .spacing(4),
    ]
    .spacing(12)
    .align_y(alignment::Vertical::Center);

    mouse_area(container(content).padding(6).width(Length::Fill))
        .on_press(Message::RowPressed(index))
        .on_right_press(Message::OpenContextMenu(index))
        .into()
}

fn render_context_menu(index: usize, entry: &VideoEntry) -> Element<'_, Message> {
    let mut menu = column![text(&entry.title).size(18).shaping(Shaping::Advanced)].spacing(8);
    for action in RowAction::ALL {
        menu = menu.push(
            button(text(action.label()))
                .on_press(Message::RowAction(index, action))
                .style(button::text)
                .width(Length::Fill),
        );
    }
    menu.width(Length::Fixed(260.0)).into()
}

fn render_delete_dialog<'a>() -> Element<'a, Message> {
    column![
        text("Confirm Delete").size(20),
        text("Do you want to delete this video ?"),
        row![
            container("").width(Length::Fill),
            button(text("No"))
                .on_press(Message::CancelDelete)
                .style(button::secondary),
            button(text("Yes"))
                .on_press(Message::ConfirmDelete)
                .style(button::danger),
        ]
        .spacing(8),
    ]
    .spacing(12)
    .width(Length::Fixed(320.0))
    .into()
}

fn render_settings(app: &App) -> Element<'_, Message> {
    let folders: Vec<Element<'_, Message>> = app
        .config
        .library_dirs
        .iter()
        .map(|dir| {
            text(dir.display().to_string())
                .size(13)
                .shaping(Shaping::Advanced)
                .into()
        })
        .collect();

    let autoplay = if app.config.play_overlay_on_attach {
        "On"
    } else {
        "Off"
    };

    scrollable(
        column![
            text("Library folders").size(18),
            column(folders).spacing(4),
            row![
                button(text("[Add Folder]").size(14))
                    .on_press(Message::AddLibraryFolder)
                    .padding(5),
                button(text("[Rescan]").size(14))
                    .on_press(Message::Rescan)
                    .padding(5),
            ]
            .spacing(8),
            text("Floating player").size(18),
            row![
                text("Start playing when opened").size(14),
                button(text(autoplay).size(14))
                    .on_press(Message::ToggleOverlayAutoplay)
                    .padding(5),
            ]
            .spacing(12)
            .align_y(alignment::Vertical::Center),
            text(format!(
                "Size: {} dp at density {}",
                app.config.overlay_edge_dp, app.config.display_density
            ))
            .size(14),
            text("Thumbnails").size(18),
            button(text("[Clear Cache]").size(14))
                .on_press(Message::ClearCache)
                .padding(5),
            text(app.status.clone()).size(12),
        ]
        .spacing(12)
        .padding(16),
    )
    .into()
}

fn render_about<'a>() -> Element<'a, Message> {
    center(
        column![
            text("Floatreel").size(32),
            text(format!("Version {}", env!("CARGO_PKG_VERSION"))).size(14),
            text("Right-click a video for more actions. In the floating player, tap to pause, drag to move, hold to go fullscreen.")
                .size(14),
        ]
        .spacing(10)
        .align_x(alignment::Horizontal::Center),
    )
    .into()
}

/// Render the fullscreen player.
fn render_player(player: &PlayerInstance) -> Element<'_, Message> {
    let video_player = container(
        VideoPlayer::new(&player.video)
            .on_end_of_stream(Message::PlayerEnded)
            .on_new_frame(Message::PlayerNewFrame),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .center_x(Length::Fill)
    .center_y(Length::Fill);

    let controls = container(
        column![
            // Top bar with title and close button
            row![
                text(&player.title)
                    .size(14)
                    .shaping(Shaping::Advanced)
                    .color(Color::WHITE),
                container("").width(Length::Fill),
                button(text("X").size(20))
                    .on_press(Message::PlayerClose)
                    .padding(5)
            ]
            .padding(10),
            // Center spacer
            container("").height(Length::Fill),
            column![
                slider(0.0..=safe_duration(&player.video), player.position, Message::PlayerSeek)
                    .step(0.1)
                    .on_release(Message::PlayerSeekRelease),
                row![
                    button(text(if player.video.paused() { ">" } else { "||" }).size(12))
                        .on_press(Message::PlayerTogglePause)
                        .padding(8),
                    button(text(if player.video.muted() { "M" } else { "~" }).size(12))
                        .on_press(Message::PlayerToggleMute)
                        .padding(8),
                    button(text("Float").size(12))
                        .on_press(Message::PlayerFloat)
                        .padding(8),
                    text(media::format_duration((player.position * 1000.0) as u64))
                        .size(12)
                        .color(Color::WHITE),
                ]
                .spacing(5)
                .align_y(alignment::Vertical::Center)
            ]
            .spacing(5)
            .padding(10)
        ],
    )
    .width(Length::Fill)
    .height(Length::Fill);

    container(stack![video_player, controls])
        .style(|_theme: &Theme| container::Style {
            background: Some(Color::BLACK.into()),
            ..Default::default()
        })
        .into()
}

/// Render the floating player window.
pub fn render_overlay<'a>(app: &'a App, overlay_window: &'a OverlayWindow) -> Element<'a, Message> {
    let video_player = container(
        VideoPlayer::new(&overlay_window.video)
            .on_end_of_stream(Message::OverlayEnded)
            .content_fit(ContentFit::Cover)
            .width(Length::Fill)
            .height(Length::Fill),
    )
    .width(Length::Fill)
    .height(Length::Fill);

    let mut surface = stack![video_player];

    if app.overlay.close_visible() {
        let edge = media::density_pixels_to_pixels(CLOSE_BUTTON_DP, app.config.display_density);
        surface = surface.push(
            container(
                button(center(text("X").size(14)))
                    .on_press(Message::OverlayClose)
                    .width(Length::Fixed(edge))
                    .height(Length::Fixed(edge))
                    .padding(0),
            )
            .width(Length::Fill)
            .align_x(alignment::Horizontal::Right),
        );
    }

    surface.into()
}
