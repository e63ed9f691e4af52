//! Gallery screen state: the video list, search filter, drawer and dialogs.

use std::path::Path;

use crate::error::Error;
use crate::media::{self, VideoEntry};

pub const DRAWER_TITLE: &str = "Video Player";

/// Drawer destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Videos,
    Settings,
    About,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Videos, Section::Settings, Section::About];

    pub fn title(self) -> &'static str {
        match self {
            Section::Videos => "Videos",
            Section::Settings => "Settings",
            Section::About => "About",
        }
    }
}

/// Per-row context actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Play,
    Float,
    Delete,
}

impl RowAction {
    pub const ALL: [RowAction; 3] = [RowAction::Play, RowAction::Float, RowAction::Delete];

    pub fn label(self) -> &'static str {
        match self {
            RowAction::Play => "Play",
            RowAction::Float => "Float",
            RowAction::Delete => "Delete",
        }
    }
}

#[derive(Debug)]
pub struct Gallery {
    entries: Vec<VideoEntry>,
    query: String,
    pub section: Section,
    pub drawer_open: bool,
    /// Entry index the context menu is open for.
    pub context_menu: Option<usize>,
    /// Entry index awaiting delete confirmation.
    pub pending_delete: Option<usize>,
}

impl Default for Gallery {
    fn default() -> Self {
        Gallery {
            entries: Vec::new(),
            query: String::new(),
            section: Section::Videos,
            drawer_open: false,
            context_menu: None,
            pending_delete: None,
        }
    }
}

impl Gallery {
    /// Replace the list after a library load.
    pub fn set_entries(&mut self, entries: Vec<VideoEntry>) {
        self.entries = entries;
        self.context_menu = None;
        self.pending_delete = None;
    }

    pub fn entries(&self) -> &[VideoEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&VideoEntry> {
        self.entries.get(index)
    }

    pub fn duration_of(&self, index: usize) -> Option<u64> {
        self.entries.get(index).map(|entry| entry.duration_ms)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: String) {
        self.query = query;
        self.context_menu = None;
    }

    /// Entries matching the search, with their index in the full list.
    pub fn visible(&self) -> Vec<(usize, &VideoEntry)> {
        let needle = self.query.trim().to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| needle.is_empty() || entry.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// Title bar text: the app name while the drawer is open, else the section.
    pub fn title(&self) -> &'static str {
        if self.drawer_open {
            DRAWER_TITLE
        } else {
            self.section.title()
        }
    }

    pub fn select(&mut self, section: Section) {
        self.section = section;
        self.drawer_open = false;
        self.context_menu = None;
    }

    pub fn toggle_drawer(&mut self) {
        self.drawer_open = !self.drawer_open;
    }

    /// Delete the entry at `index` from disk and, only on success, from the list.
    pub fn delete(&mut self, index: usize, thumbnail_dir: Option<&Path>) -> Result<VideoEntry, Error> {
        let entry = self.entries.get(index).ok_or_else(|| Error::Delete {
            path: Default::default(),
            reason: format!("no video at position {}", index),
        })?;
        media::delete_video(&entry.path, thumbnail_dir)?;
        self.context_menu = None;
        self.pending_delete = None;
        Ok(self.entries.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache;
    use std::path::PathBuf;

    fn entry(path: &str) -> VideoEntry {
        VideoEntry::new(PathBuf::from(path), 61_000, Some((1280, 720)))
    }

    fn gallery(paths: &[&str]) -> Gallery {
        let mut gallery = Gallery::default();
        gallery.set_entries(paths.iter().map(|p| entry(p)).collect());
        gallery
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let mut gallery = gallery(&["/v/Beach Day.mp4", "/v/birthday.mkv", "/v/Concert.mov"]);
        gallery.set_query("DAY".into());

        let titles: Vec<_> = gallery.visible().iter().map(|(_, e)| e.title.clone()).collect();
        assert_eq!(titles, vec!["Beach Day", "birthday"]);
    }

    #[test]
    fn empty_query_shows_everything_with_list_indices() {
        let mut gallery = gallery(&["/v/a.mp4", "/v/b.mp4"]);
        gallery.set_query("b".into());
        assert_eq!(gallery.visible()[0].0, 1);

        gallery.set_query("   ".into());
        assert_eq!(gallery.visible().len(), 2);
    }

    #[test]
    fn title_follows_drawer_and_section() {
        let mut gallery = Gallery::default();
        assert_eq!(gallery.title(), "Videos");

        gallery.toggle_drawer();
        assert_eq!(gallery.title(), DRAWER_TITLE);

        gallery.select(Section::Settings);
        assert!(!gallery.drawer_open);
        assert_eq!(gallery.title(), "Settings");
    }

    #[test]
    fn delete_removes_exactly_one_entry_and_keeps_other_thumbnails() {
        let videos = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["a.mp4", "b.mp4", "c.mp4"]
            .iter()
            .map(|name| videos.path().join(name))
            .collect();
        for path in &paths {
            std::fs::write(path, b"").unwrap();
            std::fs::write(cache::thumbnail_path_in(thumbs.path(), path), b"").unwrap();
        }
        let mut gallery = Gallery::default();
        gallery.set_entries(paths.iter().map(|p| VideoEntry::new(p.clone(), 0, None)).collect());

        let removed = gallery.delete(1, Some(thumbs.path())).unwrap();

        assert_eq!(removed.path, paths[1]);
        assert_eq!(gallery.entries().len(), 2);
        assert!(cache::thumbnail_path_in(thumbs.path(), &paths[0]).exists());
        assert!(cache::thumbnail_path_in(thumbs.path(), &paths[2]).exists());
        assert!(!cache::thumbnail_path_in(thumbs.path(), &paths[1]).exists());
    }

    #[test]
    fn failed_delete_leaves_list_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut gallery = Gallery::default();
        gallery.set_entries(vec![VideoEntry::new(dir.path().join("ghost.mp4"), 0, None)]);
        gallery.pending_delete = Some(0);

        assert!(matches!(gallery.delete(0, None), Err(Error::Delete { .. })));
        assert_eq!(gallery.entries().len(), 1);
        assert!(gallery.delete(7, None).is_err());
    }

    #[test]
    fn duration_lookup_by_index() {
        let gallery = gallery(&["/v/a.mp4"]);
        assert_eq!(gallery.duration_of(0), Some(61_000));
        assert_eq!(gallery.duration_of(1), None);
    }
}
