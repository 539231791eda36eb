use crate::error::{MergeError, Result};
use crate::overlay::{merge_segments, Segment};
use crate::provider::{MergeProvider, MergeRequest};
use async_trait::async_trait;
use queueplay_core::{ChapterExport, ChapterRecord};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

/// Where external segments come from. The transport is up to the
/// implementation.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    async fn segments(&self, video_id: Uuid) -> Result<Vec<Segment>>;
}

// ---------------------------------------------------------------------------
// StaticSegments
// ---------------------------------------------------------------------------

/// In-memory segment source, optionally loaded from a JSON file mapping
/// video ids to segment lists.
#[derive(Debug, Clone, Default)]
pub struct StaticSegments {
    segments: HashMap<Uuid, Vec<Segment>>,
}

impl StaticSegments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, video_id: Uuid, segments: Vec<Segment>) {
        self.segments.insert(video_id, segments);
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let segments: HashMap<Uuid, Vec<Segment>> = serde_json::from_str(&data)?;
        for (id, list) in &segments {
            if let Some(bad) = list.iter().find(|s| !s.start.is_finite() || !s.end.is_finite()) {
                return Err(MergeError::InvalidSegment(format!(
                    "video {id}: {}..{}",
                    bad.start, bad.end
                )));
            }
        }
        Ok(Self { segments })
    }
}

#[async_trait]
impl SegmentSource for StaticSegments {
    async fn segments(&self, video_id: Uuid) -> Result<Vec<Segment>> {
        Ok(self.segments.get(&video_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// OverlayProvider
// ---------------------------------------------------------------------------

/// Merge provider that overlays segments from a [`SegmentSource`] on the
/// authored chapters. Declines when neither the chapters nor the segments
/// changed since its last answer for the video, unless forced.
pub struct OverlayProvider<S: SegmentSource> {
    source: S,
    min_chapter_secs: f64,
    fingerprints: Mutex<HashMap<Uuid, u64>>,
}

impl<S: SegmentSource> OverlayProvider<S> {
    pub fn new(source: S, min_chapter_secs: f64) -> Self {
        Self {
            source,
            min_chapter_secs,
            fingerprints: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn is_unchanged(&self, video_id: Uuid, fingerprint: u64) -> bool {
        self.fingerprints
            .lock()
            .map(|cache| cache.get(&video_id) == Some(&fingerprint))
            .unwrap_or(false)
    }

    fn remember(&self, video_id: Uuid, fingerprint: u64) {
        if let Ok(mut cache) = self.fingerprints.lock() {
            cache.insert(video_id, fingerprint);
        }
    }
}

#[async_trait]
impl<S: SegmentSource> MergeProvider for OverlayProvider<S> {
    async fn merge(&self, request: MergeRequest) -> Result<Option<Vec<ChapterRecord>>> {
        let segments = self.source.segments(request.video_id).await?;
        let fingerprint = fingerprint(&request.authored, &segments, request.duration);

        if !request.force_refresh && self.is_unchanged(request.video_id, fingerprint) {
            tracing::debug!(video_id = %request.video_id, "segments unchanged, no update");
            return Ok(None);
        }

        let merged = merge_segments(
            &request.authored_records(),
            &segments,
            request.duration,
            self.min_chapter_secs,
        );
        self.remember(request.video_id, fingerprint);
        Ok(Some(merged))
    }
}

fn fingerprint(authored: &[ChapterExport], segments: &[Segment], duration: Option<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    duration.map(f64::to_bits).hash(&mut hasher);
    for chapter in authored {
        chapter.title.hash(&mut hasher);
        chapter.start_time.to_bits().hash(&mut hasher);
        chapter.end_time.map(f64::to_bits).hash(&mut hasher);
    }
    for segment in segments {
        segment.start.to_bits().hash(&mut hasher);
        segment.end.to_bits().hash(&mut hasher);
        segment.category.hash(&mut hasher);
    }
    hasher.finish()
}
