use crate::error::{CoreError, Result};
use crate::settings::PlaybackSettings;
use crate::tracker::{Tracker, TrackerSnapshot, Update};
use crate::types::ChapterRecord;
use crate::video::{Video, VideoStore};
use std::collections::HashMap;
use uuid::Uuid;

/// Seek side channel of the playback clock. Seeks are best effort; the
/// session never retries and learns the new position from the next tick.
pub trait PlaybackClock {
    fn seek(&mut self, to: f64);
}

/// Result of a merge job, posted back to the thread owning the session.
/// `chapters` is `None` when the merge failed or the provider had no update.
/// `generation` increases with every request, so a late outcome from an
/// older request can be told apart from a newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub video_id: Uuid,
    pub generation: u64,
    pub chapters: Option<Vec<ChapterRecord>>,
}

/// Single playback session: the active video, its chapter tracker and the
/// video records it reads from. Not shared across threads.
pub struct PlaybackSession<C: PlaybackClock> {
    store: VideoStore,
    settings: PlaybackSettings,
    tracker: Tracker,
    active: Option<Uuid>,
    clock: C,
    merge_generations: HashMap<Uuid, u64>,
}

impl<C: PlaybackClock> PlaybackSession<C> {
    pub fn new(store: VideoStore, settings: PlaybackSettings, clock: C) -> Self {
        let tracker = Tracker::new(settings.skip_end_epsilon_secs);
        Self {
            store,
            settings,
            tracker,
            active: None,
            clock,
            merge_generations: HashMap::new(),
        }
    }

    /// Make `video_id` the active video, starting at `start_at` seconds.
    pub fn play(&mut self, video_id: Uuid, start_at: f64) -> Result<Update> {
        let video = self.store.get(video_id)?;
        let index = video.chapter_index(self.settings.merge_segments);
        let duration = video.duration;
        tracing::debug!(video = %video.title, chapters = index.len(), "activating video");

        self.active = Some(video_id);
        self.tracker.load(index, duration);
        self.tracker.set_current_time(start_at);
        let update = self.tracker.recompute();
        self.dispatch(&update);
        Ok(update)
    }

    pub fn stop(&mut self) {
        self.active = None;
        self.tracker.load(Default::default(), None);
    }

    /// Playback clock tick.
    pub fn tick(&mut self, time: f64) -> Update {
        let update = self.tracker.monitor(time);
        self.dispatch(&update);
        update
    }

    pub fn next_chapter(&mut self) -> bool {
        match self.tracker.go_to_next() {
            Some(update) => {
                self.dispatch(&update);
                true
            }
            None => false,
        }
    }

    pub fn previous_chapter(&mut self) -> bool {
        let speed = self.playback_speed();
        let hysteresis = self.settings.previous_hysteresis_secs;
        match self.tracker.go_to_previous(hysteresis, speed) {
            Some(update) => {
                self.dispatch(&update);
                true
            }
            None => false,
        }
    }

    /// Jump to a chapter of the active video by id.
    pub fn go_to_chapter(&mut self, chapter_id: Uuid) -> Result<Update> {
        let chapter = self
            .tracker
            .index()
            .get(chapter_id)
            .cloned()
            .ok_or_else(|| CoreError::InvalidChapter(format!("no chapter {chapter_id}")))?;
        let update = self.tracker.go_to_chapter(&chapter);
        self.dispatch(&update);
        Ok(update)
    }

    /// Apply a finished merge. Storage is always updated; the live tracker
    /// only when the merged video is still the active one. Outcomes older
    /// than one already applied for the same video are ignored. Returns
    /// whether the tracker was refreshed.
    pub fn apply_merge(&mut self, outcome: MergeOutcome) -> Result<bool> {
        if let Some(&applied) = self.merge_generations.get(&outcome.video_id) {
            if outcome.generation <= applied {
                tracing::debug!(
                    video_id = %outcome.video_id,
                    generation = outcome.generation,
                    applied,
                    "ignoring superseded merge outcome"
                );
                return Ok(false);
            }
        }
        self.merge_generations.insert(outcome.video_id, outcome.generation);

        if let Some(chapters) = outcome.chapters {
            let video = self.store.get_mut(outcome.video_id)?;
            tracing::info!(
                video = %video.title,
                chapters = chapters.len(),
                "installing merged chapters"
            );
            video.replace_merged_chapters(chapters);
        }

        if self.active != Some(outcome.video_id) {
            tracing::debug!(video_id = %outcome.video_id, "merged video is no longer active");
            return Ok(false);
        }
        self.refresh_chapters()?;
        Ok(true)
    }

    /// Reinstall the effective chapters of the active video and re-derive
    /// the tracker state at the current position.
    pub fn refresh_chapters(&mut self) -> Result<Update> {
        let video_id = self.active.ok_or(CoreError::NoActiveVideo)?;
        let index = self
            .store
            .get(video_id)?
            .chapter_index(self.settings.merge_segments);
        self.tracker.replace_index(index);
        let update = self.tracker.recompute();
        self.dispatch(&update);
        Ok(update)
    }

    pub fn set_settings(&mut self, settings: PlaybackSettings) -> Result<()> {
        settings.validate()?;
        let merge_changed = settings.merge_segments != self.settings.merge_segments;
        self.tracker.set_skip_end_epsilon(settings.skip_end_epsilon_secs);
        self.settings = settings;
        if merge_changed && self.active.is_some() {
            self.refresh_chapters()?;
        }
        Ok(())
    }

    pub fn playback_speed(&self) -> f64 {
        let default_speed = self.settings.default_playback_speed;
        self.active_video()
            .map(|video| video.playback_speed(default_speed))
            .unwrap_or(default_speed)
    }

    pub fn remaining_time(&self) -> Option<f64> {
        self.tracker.remaining_time(self.playback_speed())
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.tracker.snapshot()
    }

    pub fn active_video_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn active_video(&self) -> Option<&Video> {
        self.active.and_then(|id| self.store.get(id).ok())
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn store(&self) -> &VideoStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut VideoStore {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    fn dispatch(&mut self, update: &Update) {
        if let Some(to) = update.seek_to {
            self.clock.seek(to);
        }
    }
}
