use crate::index::ChapterIndex;
use crate::types::ChapterRecord;
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TrackerState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TrackerState {
    /// The active video has no chapters.
    Idle,
    /// A chapter containing the playback position is known.
    Tracking,
    /// Chapters exist but none contains the playback position.
    Boundaryless,
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Outcome of feeding the tracker a tick or a navigation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// A full rescan of the chapter index took place.
    pub rescanned: bool,
    /// The current chapter differs from the one before the call.
    pub chapter_changed: bool,
    /// Position the playback clock should seek to. Best effort: the tracker
    /// picks up the new position from a later tick.
    pub seek_to: Option<f64>,
}

// ---------------------------------------------------------------------------
// TrackerSnapshot
// ---------------------------------------------------------------------------

/// Pull-based view of the tracker for UI layers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackerSnapshot {
    pub state: TrackerState,
    pub current_time: Option<f64>,
    pub current: Option<ChapterRecord>,
    pub next: Option<ChapterRecord>,
    pub previous: Option<ChapterRecord>,
    pub cached_boundary: Option<f64>,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Follows the playback position across the chapters of the active video.
///
/// Owned by the playback session and driven from a single thread. Ticks are
/// O(1) until the position crosses `cached_boundary` or moves back before the
/// current chapter, at which point the index is rescanned.
#[derive(Debug, Clone)]
pub struct Tracker {
    index: ChapterIndex,
    video_duration: Option<f64>,
    skip_end_epsilon: f64,
    pub(crate) state: TrackerState,
    pub(crate) current_time: Option<f64>,
    pub(crate) current: Option<ChapterRecord>,
    pub(crate) next: Option<ChapterRecord>,
    pub(crate) previous: Option<ChapterRecord>,
    pub(crate) cached_boundary: Option<f64>,
}

impl Tracker {
    /// `skip_end_epsilon` is added to the video duration when skipping an
    /// inactive tail, so the seek lands past the end instead of exactly on it.
    pub fn new(skip_end_epsilon: f64) -> Self {
        Self {
            index: ChapterIndex::default(),
            video_duration: None,
            skip_end_epsilon,
            state: TrackerState::Idle,
            current_time: None,
            current: None,
            next: None,
            previous: None,
            cached_boundary: None,
        }
    }

    /// Clear all per-video state. Called whenever the active video changes.
    pub fn reset(&mut self) {
        self.current_time = None;
        self.current = None;
        self.next = None;
        self.previous = None;
        self.cached_boundary = None;
        self.state = TrackerState::Idle;
    }

    /// Reset and install the chapters of a newly activated video.
    /// The caller follows up with [`Tracker::recompute`].
    pub fn load(&mut self, index: ChapterIndex, video_duration: Option<f64>) {
        self.reset();
        self.index = index;
        self.video_duration = video_duration;
    }

    /// Swap the chapter index in use without losing the playback position.
    pub fn replace_index(&mut self, index: ChapterIndex) {
        self.index = index;
    }

    pub fn set_skip_end_epsilon(&mut self, skip_end_epsilon: f64) {
        self.skip_end_epsilon = skip_end_epsilon;
    }

    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = Some(time);
    }

    /// Feed a playback clock tick.
    pub fn monitor(&mut self, time: f64) -> Update {
        self.current_time = Some(time);

        let crossed_boundary = self.cached_boundary.is_some_and(|boundary| time >= boundary);
        let before_current = self
            .current
            .as_ref()
            .is_some_and(|chapter| time < chapter.start_time);
        // No boundary is cached in a gap, so keep probing until playback
        // reaches a chapter again.
        let in_gap = self.state == TrackerState::Boundaryless;

        if crossed_boundary || before_current || in_gap {
            self.recompute()
        } else {
            Update::default()
        }
    }

    /// Re-derive current/next/previous from the index at `current_time`.
    pub fn recompute(&mut self) -> Update {
        let before = self.current_id();
        self.rescan(before)
    }

    pub(crate) fn rescan(&mut self, before: Option<Uuid>) -> Update {
        let mut update = Update {
            rescanned: true,
            ..Update::default()
        };

        if self.index.is_empty() {
            self.current = None;
            self.next = None;
            self.previous = None;
            self.cached_boundary = None;
            self.state = TrackerState::Idle;
            update.chapter_changed = before.is_some();
            return update;
        }

        let time = self.current_time.unwrap_or(0.0);
        let Some(current) = self.index.containing(time).cloned() else {
            // Current/next/previous are left as they were.
            self.cached_boundary = None;
            self.state = TrackerState::Boundaryless;
            tracing::debug!(time, "no chapter contains playback position");
            return update;
        };

        let next = self.index.next_after(&current).cloned();
        let previous = self.index.last_before(&current).cloned();

        if !current.is_active {
            update.seek_to = match self.index.first_active_after(&current) {
                Some(target) => Some(target.start_time),
                None => self
                    .video_duration
                    .map(|duration| duration + self.skip_end_epsilon),
            };
            tracing::debug!(
                chapter = %current.title,
                seek_to = ?update.seek_to,
                "skipping inactive chapter"
            );
        }

        update.chapter_changed = before != Some(current.id);
        if update.chapter_changed {
            tracing::debug!(chapter = %current.title, start = current.start_time, "chapter changed");
        }

        self.cached_boundary = next.as_ref().map(|c| c.start_time);
        self.current = Some(current);
        self.next = next;
        self.previous = previous;
        self.state = TrackerState::Tracking;
        update
    }

    /// Wall-clock seconds left in the video at `playback_speed`, not counting
    /// inactive chapters that will be skipped.
    pub fn remaining_time(&self, playback_speed: f64) -> Option<f64> {
        let duration = self.video_duration?;
        let time = self.current_time?;

        let mut remaining = (duration - time).max(0.0);
        for chapter in self.index.iter().filter(|c| !c.is_active) {
            if let Some(end) = chapter.end_time {
                let skipped = end.min(duration) - chapter.start_time.max(time);
                if skipped > 0.0 {
                    remaining -= skipped;
                }
            }
        }

        let speed = if playback_speed > 0.0 { playback_speed } else { 1.0 };
        Some(remaining.max(0.0) / speed)
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            state: self.state,
            current_time: self.current_time,
            current: self.current.clone(),
            next: self.next.clone(),
            previous: self.previous.clone(),
            cached_boundary: self.cached_boundary,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn current_time(&self) -> Option<f64> {
        self.current_time
    }

    pub fn current_chapter(&self) -> Option<&ChapterRecord> {
        self.current.as_ref()
    }

    pub fn next_chapter(&self) -> Option<&ChapterRecord> {
        self.next.as_ref()
    }

    pub fn previous_chapter(&self) -> Option<&ChapterRecord> {
        self.previous.as_ref()
    }

    pub fn cached_boundary(&self) -> Option<f64> {
        self.cached_boundary
    }

    pub fn index(&self) -> &ChapterIndex {
        &self.index
    }

    pub fn video_duration(&self) -> Option<f64> {
        self.video_duration
    }

    pub(crate) fn current_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|c| c.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.1;

    fn tracker_with(chapters: Vec<ChapterRecord>, duration: Option<f64>) -> Tracker {
        let mut tracker = Tracker::new(EPSILON);
        tracker.load(ChapterIndex::build(chapters), duration);
        tracker
    }

    fn three_chapters() -> Vec<ChapterRecord> {
        vec![
            ChapterRecord::new("a", 0.0, Some(10.0)),
            ChapterRecord::new("b", 10.0, Some(25.0)),
            ChapterRecord::new("c", 25.0, Some(40.0)),
        ]
    }

    #[test]
    fn recompute_without_chapters_is_idle() {
        let mut tracker = tracker_with(vec![], Some(100.0));
        tracker.set_current_time(5.0);
        let update = tracker.recompute();
        assert!(update.rescanned);
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(tracker.current_chapter().is_none());
        assert!(tracker.cached_boundary().is_none());

        // Idle never rescans on ticks.
        assert!(!tracker.monitor(50.0).rescanned);
    }

    #[test]
    fn recompute_sets_neighbors_and_boundary() {
        let mut tracker = tracker_with(three_chapters(), Some(40.0));
        tracker.set_current_time(12.0);
        let update = tracker.recompute();

        assert!(update.chapter_changed);
        assert_eq!(update.seek_to, None);
        assert_eq!(tracker.state(), TrackerState::Tracking);
        assert_eq!(tracker.current_chapter().unwrap().title, "b");
        assert_eq!(tracker.next_chapter().unwrap().title, "c");
        assert_eq!(tracker.previous_chapter().unwrap().title, "a");
        assert_eq!(tracker.cached_boundary(), Some(25.0));
    }

    #[test]
    fn monitor_uses_cached_boundary() {
        let mut tracker = tracker_with(three_chapters(), Some(40.0));
        tracker.set_current_time(12.0);
        tracker.recompute();
        let next_id = tracker.next_chapter().unwrap().id;

        let update = tracker.monitor(24.0);
        assert!(!update.rescanned);
        assert_eq!(tracker.next_chapter().unwrap().id, next_id);
        assert_eq!(tracker.current_time(), Some(24.0));

        let update = tracker.monitor(25.0);
        assert!(update.rescanned);
        assert!(update.chapter_changed);
        assert_eq!(tracker.current_chapter().unwrap().title, "c");
        assert!(tracker.next_chapter().is_none());
        assert!(tracker.cached_boundary().is_none());
    }

    #[test]
    fn monitor_rescans_on_backward_seek() {
        let mut tracker = tracker_with(three_chapters(), Some(40.0));
        tracker.set_current_time(30.0);
        tracker.recompute();
        assert_eq!(tracker.current_chapter().unwrap().title, "c");

        let update = tracker.monitor(3.0);
        assert!(update.rescanned);
        assert_eq!(tracker.current_chapter().unwrap().title, "a");
        assert_eq!(tracker.cached_boundary(), Some(10.0));
    }

    #[test]
    fn inactive_chapter_requests_skip_to_next_active() {
        let mut tracker = tracker_with(
            vec![
                ChapterRecord::new("a", 0.0, Some(5.0)),
                ChapterRecord::new("sponsor", 5.0, Some(15.0)).with_active(false),
                ChapterRecord::new("c", 15.0, Some(30.0)),
            ],
            Some(30.0),
        );
        tracker.set_current_time(6.0);
        let update = tracker.recompute();
        assert_eq!(update.seek_to, Some(15.0));
        // The skip is only a request; the current chapter is the inactive one
        // until the clock reports the new position.
        assert_eq!(tracker.current_chapter().unwrap().title, "sponsor");

        let update = tracker.monitor(15.0);
        assert_eq!(update.seek_to, None);
        assert_eq!(tracker.current_chapter().unwrap().title, "c");
    }

    #[test]
    fn inactive_tail_seeks_past_duration() {
        let mut tracker = tracker_with(
            vec![
                ChapterRecord::new("a", 0.0, Some(50.0)),
                ChapterRecord::new("outro", 50.0, Some(60.0)).with_active(false),
            ],
            Some(60.0),
        );
        tracker.set_current_time(55.0);
        let update = tracker.recompute();
        let target = update.seek_to.unwrap();
        assert!(target > 60.0);
        assert!((target - 60.1).abs() < 1e-9);
    }

    #[test]
    fn ignored_skip_is_not_reissued_on_later_ticks() {
        let mut tracker = tracker_with(
            vec![
                ChapterRecord::new("a", 0.0, Some(5.0)),
                ChapterRecord::new("sponsor", 5.0, Some(15.0)).with_active(false),
                ChapterRecord::new("c", 15.0, Some(30.0)),
            ],
            Some(30.0),
        );
        tracker.set_current_time(6.0);
        assert_eq!(tracker.recompute().seek_to, Some(15.0));

        // The clock did not honor the seek and keeps playing the segment.
        for time in [7.0, 8.0, 14.0] {
            let update = tracker.monitor(time);
            assert!(!update.rescanned);
            assert_eq!(update.seek_to, None);
        }
        assert_eq!(tracker.current_chapter().unwrap().title, "sponsor");
    }

    #[test]
    fn skip_end_epsilon_can_be_changed() {
        let mut tracker = tracker_with(
            vec![
                ChapterRecord::new("a", 0.0, Some(50.0)),
                ChapterRecord::new("outro", 50.0, Some(60.0)).with_active(false),
            ],
            Some(60.0),
        );
        tracker.set_skip_end_epsilon(2.0);
        tracker.set_current_time(55.0);
        assert_eq!(tracker.recompute().seek_to, Some(62.0));
    }

    #[test]
    fn gap_keeps_stale_chapters_and_clears_boundary() {
        let mut tracker = tracker_with(
            vec![
                ChapterRecord::new("a", 0.0, Some(10.0)),
                ChapterRecord::new("b", 20.0, Some(30.0)),
            ],
            Some(30.0),
        );
        tracker.set_current_time(5.0);
        tracker.recompute();
        let a_id = tracker.current_chapter().unwrap().id;

        let update = tracker.monitor(12.0);
        assert!(!update.rescanned);
        tracker.recompute();
        assert_eq!(tracker.state(), TrackerState::Boundaryless);
        assert_eq!(tracker.current_chapter().unwrap().id, a_id);
        assert_eq!(tracker.next_chapter().unwrap().title, "b");
        assert!(tracker.cached_boundary().is_none());
    }

    #[test]
    fn gap_is_probed_until_playback_reaches_a_chapter() {
        let mut tracker = tracker_with(
            vec![ChapterRecord::new("late", 20.0, Some(30.0))],
            Some(30.0),
        );
        tracker.set_current_time(0.0);
        tracker.recompute();
        assert_eq!(tracker.state(), TrackerState::Boundaryless);
        assert!(tracker.current_chapter().is_none());

        assert!(tracker.monitor(10.0).rescanned);
        assert_eq!(tracker.state(), TrackerState::Boundaryless);

        let update = tracker.monitor(20.0);
        assert!(update.chapter_changed);
        assert_eq!(tracker.state(), TrackerState::Tracking);
        assert_eq!(tracker.current_chapter().unwrap().title, "late");
    }

    #[test]
    fn reset_clears_state() {
        let mut tracker = tracker_with(three_chapters(), Some(40.0));
        tracker.set_current_time(12.0);
        tracker.recompute();
        tracker.reset();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.state, TrackerState::Idle);
        assert_eq!(snapshot.current_time, None);
        assert!(snapshot.current.is_none());
        assert!(snapshot.next.is_none());
        assert!(snapshot.previous.is_none());
        assert!(snapshot.cached_boundary.is_none());
    }

    #[test]
    fn remaining_time_excludes_inactive_chapters() {
        let mut tracker = tracker_with(
            vec![
                ChapterRecord::new("a", 0.0, Some(20.0)),
                ChapterRecord::new("sponsor", 20.0, Some(30.0)).with_active(false),
                ChapterRecord::new("c", 30.0, Some(100.0)),
            ],
            Some(100.0),
        );
        assert_eq!(tracker.remaining_time(1.0), None);

        tracker.set_current_time(10.0);
        assert_eq!(tracker.remaining_time(1.0), Some(80.0));
        assert_eq!(tracker.remaining_time(2.0), Some(40.0));

        tracker.set_current_time(25.0);
        assert_eq!(tracker.remaining_time(1.0), Some(70.0));
    }

    #[test]
    fn snapshot_serializes() {
        let mut tracker = tracker_with(three_chapters(), Some(40.0));
        tracker.set_current_time(1.0);
        tracker.recompute();
        let json = serde_json::to_value(tracker.snapshot()).unwrap();
        assert_eq!(json["state"], "Tracking");
        assert_eq!(json["current"]["title"], "a");
        assert_eq!(json["cached_boundary"], 10.0);
    }
}
