use crate::types::ChapterRecord;
use serde::Serialize;
use uuid::Uuid;

/// End time assumed for a chapter that has none when testing containment.
///
/// With a sentinel of zero an unterminated chapter never contains any
/// non-negative time. Importers derive end times up front
/// (see [`ChapterIndex::with_derived_end_times`]) so this only bites
/// chapter lists that were installed without them.
const UNTERMINATED_END_SENTINEL: f64 = 0.0;

/// Chapters of one video ordered by ascending start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChapterIndex {
    chapters: Vec<ChapterRecord>,
}

impl ChapterIndex {
    /// Stable sort of the raw chapters by start time. No other transformation.
    pub fn build(raw: impl IntoIterator<Item = ChapterRecord>) -> Self {
        let mut chapters: Vec<ChapterRecord> = raw.into_iter().collect();
        chapters.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Self { chapters }
    }

    /// Drop entries sharing a start time with an earlier entry (first wins).
    pub fn dedup_start_times(mut self) -> Self {
        self.chapters.dedup_by(|later, earlier| later.start_time == earlier.start_time);
        self
    }

    /// Fill in missing end times from the following chapter's start, and the
    /// last chapter's from the video duration when it is known.
    pub fn with_derived_end_times(mut self, video_duration: Option<f64>) -> Self {
        let starts: Vec<f64> = self.chapters.iter().map(|c| c.start_time).collect();
        for (i, chapter) in self.chapters.iter_mut().enumerate() {
            if chapter.end_time.is_some() {
                if chapter.duration.is_none() {
                    chapter.set_end_time(chapter.end_time);
                }
                continue;
            }
            let end = starts.get(i + 1).copied().or(video_duration);
            if let Some(end) = end.filter(|end| *end > chapter.start_time) {
                chapter.set_end_time(Some(end));
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn chapters(&self) -> &[ChapterRecord] {
        &self.chapters
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChapterRecord> {
        self.chapters.iter()
    }

    pub fn get(&self, id: Uuid) -> Option<&ChapterRecord> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn into_chapters(self) -> Vec<ChapterRecord> {
        self.chapters
    }

    /// First chapter with `start_time <= time < end_time`.
    pub fn containing(&self, time: f64) -> Option<&ChapterRecord> {
        self.chapters.iter().find(|c| {
            c.start_time <= time && time < c.end_time.unwrap_or(UNTERMINATED_END_SENTINEL)
        })
    }

    /// First chapter starting strictly after `chapter`.
    pub fn next_after(&self, chapter: &ChapterRecord) -> Option<&ChapterRecord> {
        self.chapters
            .iter()
            .find(|c| c.start_time > chapter.start_time)
    }

    /// Last chapter starting strictly before `chapter`.
    pub fn last_before(&self, chapter: &ChapterRecord) -> Option<&ChapterRecord> {
        self.chapters
            .iter()
            .rev()
            .find(|c| c.start_time < chapter.start_time)
    }

    /// First active chapter starting strictly after `chapter`.
    pub fn first_active_after(&self, chapter: &ChapterRecord) -> Option<&ChapterRecord> {
        self.chapters
            .iter()
            .find(|c| c.start_time > chapter.start_time && c.is_active)
    }
}
