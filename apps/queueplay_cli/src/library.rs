use anyhow::{bail, Context};
use queueplay_core::{ChapterExport, Video, VideoStore};
use queueplay_merge::{Segment, StaticSegments};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

/// One video entry of a library file.
#[derive(Debug, Deserialize)]
pub struct LibraryEntry {
    pub title: String,
    pub duration: Option<f64>,
    /// Chapters are parsed from here unless `chapters` is given.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chapters: Option<Vec<ChapterExport>>,
    #[serde(default)]
    pub playback_speed: Option<f64>,
    /// External segments served to the merge provider.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryFile {
    pub videos: Vec<LibraryEntry>,
}

pub struct Library {
    pub store: VideoStore,
    pub segments: StaticSegments,
    /// Ids in file order.
    pub order: Vec<Uuid>,
}

impl Library {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading library {}", path.display()))?;
        let file: LibraryFile = serde_json::from_str(&data)
            .with_context(|| format!("parsing library {}", path.display()))?;
        Self::from_file(file)
    }

    pub fn from_file(file: LibraryFile) -> anyhow::Result<Self> {
        if file.videos.is_empty() {
            bail!("library has no videos");
        }

        let mut store = VideoStore::new();
        let mut segments = StaticSegments::new();
        let mut order = Vec::with_capacity(file.videos.len());

        for entry in file.videos {
            let mut video = match entry.chapters {
                Some(chapters) => {
                    let mut video = Video::new(entry.title, entry.duration);
                    video.import_chapters(chapters)?;
                    video
                }
                None => Video::from_description(entry.title, &entry.description, entry.duration),
            };
            video.playback_speed = entry.playback_speed;

            tracing::debug!(
                video = %video.title,
                chapters = video.authored_chapters.len(),
                segments = entry.segments.len(),
                "loaded video"
            );
            segments.insert(video.id, entry.segments);
            order.push(store.insert(video));
        }

        Ok(Self {
            store,
            segments,
            order,
        })
    }
}
