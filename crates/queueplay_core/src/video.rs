use crate::error::{CoreError, Result};
use crate::index::ChapterIndex;
use crate::parse::parse_description_chapters;
use crate::types::{ChapterExport, ChapterRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub duration: Option<f64>,
    /// Parsed from the description or entered by the user. Written only by
    /// the importer.
    pub authored_chapters: Vec<ChapterRecord>,
    /// Authored chapters overlaid with external segments. Written only by
    /// merge completions.
    #[serde(default)]
    pub merged_chapters: Vec<ChapterRecord>,
    /// Per-subscription playback speed override.
    #[serde(default)]
    pub playback_speed: Option<f64>,
}

impl Video {
    pub fn new(title: impl Into<String>, duration: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            duration,
            authored_chapters: vec![],
            merged_chapters: vec![],
            playback_speed: None,
        }
    }

    /// Import a video, taking its authored chapters from description
    /// timestamps.
    pub fn from_description(
        title: impl Into<String>,
        description: &str,
        duration: Option<f64>,
    ) -> Self {
        let mut video = Self::new(title, duration);
        video.set_authored_chapters(parse_description_chapters(description));
        video
    }

    /// Install authored chapters: sorted, de-duplicated by start time (first
    /// wins) and with end times derived from their neighbors.
    pub fn set_authored_chapters(&mut self, chapters: Vec<ChapterRecord>) {
        self.authored_chapters = ChapterIndex::build(chapters)
            .dedup_start_times()
            .with_derived_end_times(self.duration)
            .into_chapters();
    }

    /// Install authored chapters from their flat form.
    pub fn import_chapters(&mut self, flat: Vec<ChapterExport>) -> Result<()> {
        if let Some(bad) = flat.iter().find(|c| c.start_time.is_nan() || c.start_time < 0.0) {
            return Err(CoreError::InvalidChapter(format!(
                "'{}' starts at {}",
                bad.title, bad.start_time
            )));
        }
        self.set_authored_chapters(flat.into_iter().map(ChapterRecord::from).collect());
        Ok(())
    }

    pub fn export_chapters(&self) -> Vec<ChapterExport> {
        self.authored_chapters.iter().map(ChapterExport::from).collect()
    }

    /// Drop the previous merged set and install `chapters` in its place.
    pub fn replace_merged_chapters(&mut self, chapters: Vec<ChapterRecord>) {
        self.merged_chapters.clear();
        self.merged_chapters = ChapterIndex::build(chapters)
            .dedup_start_times()
            .into_chapters();
    }

    /// True once a merge has produced something worth using. A merged set of
    /// zero or one entry counts as not yet computed.
    pub fn has_merged_chapters(&self) -> bool {
        self.merged_chapters.len() > 1
    }

    /// The chapter collection playback should follow.
    pub fn effective_chapters(&self, prefer_merged: bool) -> &[ChapterRecord] {
        if prefer_merged && self.has_merged_chapters() {
            &self.merged_chapters
        } else {
            &self.authored_chapters
        }
    }

    pub fn chapter_index(&self, prefer_merged: bool) -> ChapterIndex {
        ChapterIndex::build(self.effective_chapters(prefer_merged).iter().cloned())
    }

    /// Subscription override, else `default_speed`.
    pub fn playback_speed(&self, default_speed: f64) -> f64 {
        self.playback_speed
            .filter(|speed| *speed > 0.0)
            .unwrap_or(default_speed)
    }
}

// ---------------------------------------------------------------------------
// VideoStore
// ---------------------------------------------------------------------------

/// In-memory video records keyed by id.
#[derive(Debug, Clone, Default)]
pub struct VideoStore {
    videos: HashMap<Uuid, Video>,
}

impl VideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, video: Video) -> Uuid {
        let id = video.id;
        self.videos.insert(id, video);
        id
    }

    pub fn get(&self, id: Uuid) -> Result<&Video> {
        self.videos.get(&id).ok_or(CoreError::VideoNotFound(id))
    }

    pub fn get_mut(&mut self, id: Uuid) -> Result<&mut Video> {
        self.videos.get_mut(&id).ok_or(CoreError::VideoNotFound(id))
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Video> {
        self.videos.remove(&id).ok_or(CoreError::VideoNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}
