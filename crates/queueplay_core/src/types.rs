use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ChapterCategory
// ---------------------------------------------------------------------------

/// Where a chapter came from when it was produced by an overlay merge.
///
/// Author-provided chapters carry no category. `Generated` marks an active
/// chapter the merge synthesized to cover a gap between external segments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChapterCategory {
    Sponsor,
    SelfPromo,
    Interaction,
    Intro,
    Outro,
    Preview,
    MusicOffTopic,
    Filler,
    Generated,
}

impl ChapterCategory {
    /// Human readable label, used as the title of merged segment chapters.
    pub fn label(&self) -> &'static str {
        match self {
            ChapterCategory::Sponsor => "Sponsor",
            ChapterCategory::SelfPromo => "Self Promotion",
            ChapterCategory::Interaction => "Interaction Reminder",
            ChapterCategory::Intro => "Intro",
            ChapterCategory::Outro => "Outro",
            ChapterCategory::Preview => "Preview",
            ChapterCategory::MusicOffTopic => "Non-Music",
            ChapterCategory::Filler => "Filler",
            ChapterCategory::Generated => "",
        }
    }

    /// True for categories that describe an externally sourced segment.
    pub fn is_external(&self) -> bool {
        !matches!(self, ChapterCategory::Generated)
    }
}

impl fmt::Display for ChapterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ChapterRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterRecord {
    pub id: Uuid,
    pub title: String,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub duration: Option<f64>,
    pub is_active: bool,
    pub category: Option<ChapterCategory>,
}

impl ChapterRecord {
    /// Create an active, author-provided chapter.
    pub fn new(title: impl Into<String>, start_time: f64, end_time: Option<f64>) -> Self {
        let duration = end_time.map(|end| end - start_time);
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            start_time,
            end_time,
            duration,
            is_active: true,
            category: None,
        }
    }

    /// Create an inactive chapter for an externally sourced segment.
    pub fn segment(category: ChapterCategory, start_time: f64, end_time: f64) -> Self {
        Self {
            is_active: false,
            category: Some(category),
            ..Self::new(category.label(), start_time, Some(end_time))
        }
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_category(mut self, category: ChapterCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the end time and refresh the cached duration.
    pub fn set_end_time(&mut self, end_time: Option<f64>) {
        self.end_time = end_time;
        self.duration = end_time.map(|end| end - self.start_time);
    }

    /// Cached duration, falling back to `end_time - start_time`.
    pub fn length(&self) -> Option<f64> {
        self.duration
            .or_else(|| self.end_time.map(|end| end - self.start_time))
    }

    pub fn to_export(&self) -> ChapterExport {
        ChapterExport::from(self)
    }
}

// ---------------------------------------------------------------------------
// ChapterExport
// ---------------------------------------------------------------------------

/// Flat, identity-free form of a chapter used across the merge provider
/// boundary and for persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterExport {
    pub title: String,
    pub start_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl From<&ChapterRecord> for ChapterExport {
    fn from(chapter: &ChapterRecord) -> Self {
        Self {
            title: chapter.title.clone(),
            start_time: chapter.start_time,
            end_time: chapter.end_time,
            duration: chapter.duration,
        }
    }
}

impl From<ChapterExport> for ChapterRecord {
    fn from(flat: ChapterExport) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: flat.title,
            start_time: flat.start_time,
            end_time: flat.end_time,
            duration: flat.duration,
            is_active: true,
            category: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
