use crate::provider::{MergeProvider, MergeRequest};
use queueplay_core::{MergeOutcome, Video};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// What happened to a merge request.
#[derive(Debug)]
pub enum RequestStatus {
    /// Segment merging is switched off.
    Disabled,
    /// A merge for this video is already running.
    Pending,
    Started(JoinHandle<()>),
}

/// Jobs running for one video.
#[derive(Debug, Default)]
struct InFlight {
    running: usize,
    /// Generation of the most recently started job.
    latest: u64,
}

/// Runs merge jobs off the playback thread.
///
/// Completions are posted as [`MergeOutcome`]s on the channel returned by
/// [`MergeCoordinator::new`]; the thread owning the playback session drains it
/// and applies each outcome with `PlaybackSession::apply_merge`. A job posts
/// one outcome, with `chapters: None` when the provider failed or had no
/// update, unless a later job for the same video was started while it ran.
pub struct MergeCoordinator<P: MergeProvider + 'static> {
    provider: Arc<P>,
    outcomes: mpsc::UnboundedSender<MergeOutcome>,
    in_flight: Arc<Mutex<HashMap<Uuid, InFlight>>>,
    generation: AtomicU64,
    enabled: bool,
}

impl<P: MergeProvider + 'static> MergeCoordinator<P> {
    pub fn new(provider: P, enabled: bool) -> (Self, mpsc::UnboundedReceiver<MergeOutcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            provider: Arc::new(provider),
            outcomes,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            enabled,
        };
        (coordinator, rx)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Spawn a merge for `video`. Must be called from within a tokio runtime.
    ///
    /// An unforced request is declined while any job for the video is
    /// running. A forced one always starts and supersedes the running jobs.
    pub fn request(&self, video: &Video, force_refresh: bool) -> RequestStatus {
        if !self.enabled {
            return RequestStatus::Disabled;
        }

        let generation = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = in_flight.entry(video.id).or_default();
            if entry.running > 0 && !force_refresh {
                tracing::debug!(video = %video.title, running = entry.running, "merge already in flight");
                return RequestStatus::Pending;
            }
            let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
            entry.running += 1;
            entry.latest = generation;
            generation
        };

        let request = MergeRequest::for_video(video, force_refresh);
        let provider = Arc::clone(&self.provider);
        let outcomes = self.outcomes.clone();
        let in_flight = Arc::clone(&self.in_flight);

        let handle = tokio::spawn(async move {
            let video_id = request.video_id;
            let chapters = match provider.merge(request).await {
                Ok(chapters) => chapters,
                Err(e) => {
                    tracing::warn!(%video_id, error = %e, "chapter merge failed");
                    None
                }
            };

            if !finish_job(&in_flight, video_id, generation) {
                tracing::debug!(%video_id, generation, "superseded by a later merge, dropping outcome");
                return;
            }
            let outcome = MergeOutcome {
                video_id,
                generation,
                chapters,
            };
            if outcomes.send(outcome).is_err() {
                tracing::debug!(%video_id, "playback session gone, dropping merge outcome");
            }
        });

        RequestStatus::Started(handle)
    }
}

/// Mark a job as done. Returns whether it is still the latest for its video.
fn finish_job(in_flight: &Mutex<HashMap<Uuid, InFlight>>, video_id: Uuid, generation: u64) -> bool {
    let mut in_flight = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(entry) = in_flight.get_mut(&video_id) else {
        return true;
    };
    entry.running = entry.running.saturating_sub(1);
    let latest = entry.latest == generation;
    if entry.running == 0 {
        in_flight.remove(&video_id);
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MergeError, Result};
    use crate::overlay::Segment;
    use crate::provider::MergeRequest;
    use crate::source::{OverlayProvider, SegmentSource, StaticSegments};
    use async_trait::async_trait;
    use queueplay_core::{
        ChapterCategory, ChapterRecord, PlaybackClock, PlaybackSession, PlaybackSettings,
        VideoStore,
    };
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct FailingSource;

    #[async_trait]
    impl SegmentSource for FailingSource {
        async fn segments(&self, _video_id: Uuid) -> Result<Vec<Segment>> {
            Err(MergeError::Source("connection refused".into()))
        }
    }

    /// Holds every call until released so overlapping requests can be observed.
    struct GatedSource {
        inner: StaticSegments,
        gate: Arc<Notify>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SegmentSource for GatedSource {
        async fn segments(&self, video_id: Uuid) -> Result<Vec<Segment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.inner.segments(video_id).await
        }
    }

    /// Holds unforced merges until released; forced merges return at once.
    struct ScriptedProvider {
        gate: Arc<Notify>,
        unforced: Vec<ChapterRecord>,
        forced: Vec<ChapterRecord>,
    }

    #[async_trait]
    impl MergeProvider for ScriptedProvider {
        async fn merge(&self, request: MergeRequest) -> Result<Option<Vec<ChapterRecord>>> {
            if request.force_refresh {
                return Ok(Some(self.forced.clone()));
            }
            self.gate.notified().await;
            Ok(Some(self.unforced.clone()))
        }
    }

    fn scripted(gate: &Arc<Notify>) -> ScriptedProvider {
        ScriptedProvider {
            gate: Arc::clone(gate),
            unforced: vec![
                ChapterRecord::new("Stale intro", 0.0, Some(60.0)),
                ChapterRecord::new("Stale main", 60.0, Some(300.0)),
            ],
            forced: vec![
                ChapterRecord::new("Intro", 0.0, Some(60.0)),
                ChapterRecord::new("Main", 60.0, Some(100.0)),
                ChapterRecord::segment(ChapterCategory::Sponsor, 100.0, 130.0),
                ChapterRecord::new("Main", 130.0, Some(300.0)),
            ],
        }
    }

    #[derive(Debug, Default)]
    struct RecordingClock {
        seeks: Vec<f64>,
    }

    impl PlaybackClock for RecordingClock {
        fn seek(&mut self, to: f64) {
            self.seeks.push(to);
        }
    }

    fn video() -> Video {
        let mut video = Video::new("talk", Some(300.0));
        video.set_authored_chapters(vec![
            ChapterRecord::new("Intro", 0.0, None),
            ChapterRecord::new("Main", 60.0, None),
        ]);
        video
    }

    fn sponsor_source(video: &Video) -> StaticSegments {
        let mut source = StaticSegments::new();
        source.insert(
            video.id,
            vec![Segment::new(100.0, 130.0, ChapterCategory::Sponsor)],
        );
        source
    }

    async fn finish(status: RequestStatus) {
        match status {
            RequestStatus::Started(handle) => handle.await.unwrap(),
            other => panic!("expected a started job, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_coordinator_does_nothing() {
        let video = video();
        let (coordinator, mut rx) =
            MergeCoordinator::new(OverlayProvider::new(sponsor_source(&video), 1.0), false);
        assert!(matches!(coordinator.request(&video, true), RequestStatus::Disabled));
        drop(coordinator);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn completed_merge_is_posted() {
        let video = video();
        let (coordinator, mut rx) =
            MergeCoordinator::new(OverlayProvider::new(sponsor_source(&video), 1.0), true);
        finish(coordinator.request(&video, false)).await;

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.video_id, video.id);
        assert_eq!(outcome.chapters.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn provider_failure_posts_no_update() {
        let video = video();
        let (coordinator, mut rx) =
            MergeCoordinator::new(OverlayProvider::new(FailingSource, 1.0), true);
        finish(coordinator.request(&video, false)).await;

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.video_id, video.id);
        assert!(outcome.chapters.is_none());
    }

    #[tokio::test]
    async fn back_to_back_requests_swap_at_most_once() {
        let video = video();
        let gate = Arc::new(Notify::new());
        let source = GatedSource {
            inner: sponsor_source(&video),
            gate: Arc::clone(&gate),
            calls: AtomicUsize::new(0),
        };
        let (coordinator, mut rx) = MergeCoordinator::new(OverlayProvider::new(source, 1.0), true);

        let first = coordinator.request(&video, false);
        let second = coordinator.request(&video, false);
        assert!(matches!(second, RequestStatus::Pending));

        gate.notify_one();
        finish(first).await;
        assert!(rx.recv().await.unwrap().chapters.is_some());

        // Once the first merge has landed, an unforced retry reports no update.
        let third = coordinator.request(&video, false);
        gate.notify_one();
        finish(third).await;
        assert!(rx.recv().await.unwrap().chapters.is_none());
        assert_eq!(coordinator.provider().source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forced_request_keeps_unforced_requests_pending() {
        let video = video();
        let gate = Arc::new(Notify::new());
        let (coordinator, mut rx) = MergeCoordinator::new(scripted(&gate), true);

        let first = coordinator.request(&video, false);
        let forced = coordinator.request(&video, true);
        finish(forced).await;
        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.chapters.unwrap().len(), 4);

        // The first job is still running even though the forced one finished.
        assert!(matches!(coordinator.request(&video, false), RequestStatus::Pending));

        gate.notify_one();
        finish(first).await;
        assert!(rx.try_recv().is_err());

        // Nothing is running any more.
        let again = coordinator.request(&video, false);
        gate.notify_one();
        finish(again).await;
        assert!(rx.recv().await.unwrap().chapters.is_some());
    }

    #[tokio::test]
    async fn superseded_merge_never_replaces_newer_chapters() {
        let video = video();
        let video_id = video.id;
        let gate = Arc::new(Notify::new());
        let (coordinator, mut rx) = MergeCoordinator::new(scripted(&gate), true);

        let mut store = VideoStore::new();
        store.insert(video.clone());
        let mut session =
            PlaybackSession::new(store, PlaybackSettings::default(), RecordingClock::default());
        session.play(video_id, 110.0).unwrap();

        let stale = coordinator.request(&video, false);
        let fresh = coordinator.request(&video, true);
        finish(fresh).await;
        let fresh_outcome = rx.recv().await.unwrap();

        gate.notify_one();
        finish(stale).await;
        assert!(rx.try_recv().is_err());

        assert!(session.apply_merge(fresh_outcome.clone()).unwrap());
        assert_eq!(session.clock().seeks, vec![130.0]);

        // A late delivery of an older generation is ignored by the session too.
        let older = MergeOutcome {
            generation: fresh_outcome.generation - 1,
            chapters: Some(vec![
                ChapterRecord::new("Stale intro", 0.0, Some(60.0)),
                ChapterRecord::new("Stale main", 60.0, Some(300.0)),
            ]),
            ..fresh_outcome
        };
        assert!(!session.apply_merge(older).unwrap());
        let merged = &session.store().get(video_id).unwrap().merged_chapters;
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[2].title, "Sponsor");
    }

    #[tokio::test]
    async fn outcome_applied_on_owning_side_only_touches_active_video() {
        let merged_video = video();
        let merged_id = merged_video.id;
        let (coordinator, mut rx) = MergeCoordinator::new(
            OverlayProvider::new(sponsor_source(&merged_video), 1.0),
            true,
        );

        let mut store = VideoStore::new();
        store.insert(merged_video.clone());
        let other_id = store.insert(video());
        let mut session =
            PlaybackSession::new(store, PlaybackSettings::default(), RecordingClock::default());

        session.play(merged_id, 110.0).unwrap();
        finish(coordinator.request(&merged_video, false)).await;

        // The user switched videos while the merge was running.
        session.play(other_id, 110.0).unwrap();
        let before = session.snapshot();

        let outcome = rx.recv().await.unwrap();
        assert!(!session.apply_merge(outcome).unwrap());
        assert_eq!(session.snapshot(), before);
        assert!(session.clock().seeks.is_empty());
        assert_eq!(session.store().get(merged_id).unwrap().merged_chapters.len(), 4);

        // Returning to the merged video picks up the stored overlay and skips.
        session.play(merged_id, 110.0).unwrap();
        assert_eq!(session.clock().seeks, vec![130.0]);
    }
}
