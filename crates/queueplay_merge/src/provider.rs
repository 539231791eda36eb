use crate::error::Result;
use async_trait::async_trait;
use queueplay_core::{ChapterExport, ChapterRecord, Video};
use uuid::Uuid;

/// Inputs captured from a video when a merge is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub video_id: Uuid,
    /// Authored chapters in flat form, sorted by start time.
    pub authored: Vec<ChapterExport>,
    pub duration: Option<f64>,
    pub force_refresh: bool,
}

impl MergeRequest {
    pub fn for_video(video: &Video, force_refresh: bool) -> Self {
        Self {
            video_id: video.id,
            authored: video.export_chapters(),
            duration: video.duration,
            force_refresh,
        }
    }

    pub fn authored_records(&self) -> Vec<ChapterRecord> {
        self.authored.iter().cloned().map(ChapterRecord::from).collect()
    }
}

/// Produces the merged chapter list for a video.
///
/// `Ok(None)` means the provider declines, e.g. nothing changed since its
/// last answer and no refresh was forced.
#[async_trait]
pub trait MergeProvider: Send + Sync {
    async fn merge(&self, request: MergeRequest) -> Result<Option<Vec<ChapterRecord>>>;
}
