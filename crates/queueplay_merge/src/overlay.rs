use queueplay_core::{ChapterCategory, ChapterIndex, ChapterRecord};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Externally sourced interval to be skipped, e.g. a sponsor read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub category: ChapterCategory,
}

impl Segment {
    pub fn new(start: f64, end: f64, category: ChapterCategory) -> Self {
        Self {
            start,
            end,
            category,
        }
    }
}

/// Clamp segments to `[0, duration]`, drop empty ones, sort them and union
/// overlaps. A union keeps the category of its earliest segment.
pub fn normalize_segments(segments: &[Segment], duration: Option<f64>) -> Vec<Segment> {
    let limit = duration.unwrap_or(f64::INFINITY);
    let mut sorted: Vec<Segment> = segments
        .iter()
        .filter_map(|s| {
            let start = s.start.max(0.0);
            let end = s.end.min(limit);
            (end > start).then(|| Segment::new(start, end, s.category))
        })
        .collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<Segment> = Vec::with_capacity(sorted.len());
    for segment in sorted {
        if let Some(last) = merged.last_mut() {
            if segment.start <= last.end {
                last.end = last.end.max(segment.end);
                continue;
            }
        }
        merged.push(segment);
    }
    merged
}

// ---------------------------------------------------------------------------
// merge_segments
// ---------------------------------------------------------------------------

/// Overlay external segments on the authored chapters.
///
/// Each segment becomes an inactive chapter. Authored chapters are cut around
/// the segments and pieces shorter than `min_chapter_secs` are dropped. With
/// no authored chapters the stretches between segments become active
/// `Generated` chapters. No segments means nothing to overlay and yields an
/// empty list.
pub fn merge_segments(
    authored: &[ChapterRecord],
    segments: &[Segment],
    duration: Option<f64>,
    min_chapter_secs: f64,
) -> Vec<ChapterRecord> {
    let segments = normalize_segments(segments, duration);
    if segments.is_empty() {
        return vec![];
    }

    let limit = duration.unwrap_or(f64::INFINITY);
    let mut chapters: Vec<ChapterRecord> = segments
        .iter()
        .map(|s| ChapterRecord::segment(s.category, s.start, s.end))
        .collect();

    let base = if authored.is_empty() {
        vec![ChapterRecord::new("", 0.0, None).with_category(ChapterCategory::Generated)]
    } else {
        ChapterIndex::build(authored.iter().cloned()).into_chapters()
    };

    for (i, chapter) in base.iter().enumerate() {
        let end = chapter
            .end_time
            .or_else(|| base.get(i + 1).map(|next| next.start_time))
            .unwrap_or(limit)
            .min(limit);

        let mut cursor = chapter.start_time;
        for segment in &segments {
            if segment.end <= cursor {
                continue;
            }
            if segment.start >= end {
                break;
            }
            if segment.start > cursor {
                push_piece(&mut chapters, chapter, cursor, segment.start, min_chapter_secs);
            }
            cursor = cursor.max(segment.end);
        }
        if cursor < end {
            push_piece(&mut chapters, chapter, cursor, end, min_chapter_secs);
        }
    }

    // Segments were pushed first, so they win a start-time tie.
    ChapterIndex::build(chapters)
        .dedup_start_times()
        .into_chapters()
}

fn push_piece(
    out: &mut Vec<ChapterRecord>,
    source: &ChapterRecord,
    start: f64,
    end: f64,
    min_chapter_secs: f64,
) {
    if end - start < min_chapter_secs {
        return;
    }
    let end_time = end.is_finite().then_some(end);
    let mut piece = ChapterRecord::new(source.title.clone(), start, end_time)
        .with_active(source.is_active);
    piece.category = source.category;
    out.push(piece);
}
