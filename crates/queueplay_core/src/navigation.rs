use crate::tracker::{Tracker, Update};
use crate::types::ChapterRecord;

impl Tracker {
    /// Jump to the start of `chapter` and re-derive the neighbors.
    ///
    /// The returned seek targets the chapter start, unless the chapter is
    /// inactive, in which case the skip target replaces it.
    pub fn go_to_chapter(&mut self, chapter: &ChapterRecord) -> Update {
        let before = self.current_id();
        self.current_time = Some(chapter.start_time);
        self.current = Some(chapter.clone());

        let mut update = self.rescan(before);
        if update.seek_to.is_none() {
            update.seek_to = Some(chapter.start_time);
        }
        update
    }

    /// Jump to the next chapter. `None` when there is none.
    pub fn go_to_next(&mut self) -> Option<Update> {
        let next = self.next.clone()?;
        Some(self.go_to_chapter(&next))
    }

    /// Jump back one chapter, or restart the current one.
    ///
    /// Once playback is `hysteresis_secs` (scaled by `playback_speed`, so the
    /// window is constant in wall-clock time) into the current chapter,
    /// "previous" restarts it instead of leaving it.
    pub fn go_to_previous(&mut self, hysteresis_secs: f64, playback_speed: f64) -> Option<Update> {
        let current = self.current.clone()?;
        let elapsed = self.current_time.unwrap_or(current.start_time) - current.start_time;

        if elapsed >= hysteresis_secs * playback_speed {
            return Some(self.go_to_chapter(&current));
        }

        match self.previous.clone() {
            Some(previous) => Some(self.go_to_chapter(&previous)),
            None => Some(self.go_to_chapter(&current)),
        }
    }
}
