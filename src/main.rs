mod app;
mod cache;
mod config;
mod error;
mod gallery;
mod loader;
mod media;
mod message;
mod overlay;
mod screen;
mod state;
mod thumbnail;
mod ui;

use state::App;

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::daemon(App::new, App::update, App::view)
        .title(App::title)
        .subscription(App::subscription)
        .run()
}
