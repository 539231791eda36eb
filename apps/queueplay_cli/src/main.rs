mod clock;
mod library;

use anyhow::Context;
use clap::Parser;
use clock::SimulatedClock;
use library::Library;
use queueplay_core::{PlaybackSession, PlaybackSettings, TrackerSnapshot};
use queueplay_merge::{MergeCoordinator, OverlayProvider, RequestStatus};
use std::path::PathBuf;
use std::time::Duration;

/// Play through a library of videos with a simulated clock, following
/// chapters and skipping inactive segments.
#[derive(Debug, Parser)]
#[command(name = "queueplay", version)]
struct Args {
    /// Library JSON file.
    library: PathBuf,

    /// Playback settings JSON file. Defaults apply when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Real milliseconds per simulated playback second.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Start position in seconds for every video.
    #[arg(long, default_value_t = 0.0)]
    start_at: f64,

    /// Ignore cached merge results.
    #[arg(long)]
    force_refresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => PlaybackSettings::load_from_file(path)
            .with_context(|| format!("loading settings {}", path.display()))?,
        None => PlaybackSettings::default(),
    };
    let library = Library::load(&args.library)?;
    let order = library.order.clone();

    let provider = OverlayProvider::new(library.segments, settings.min_merged_chapter_secs);
    let (coordinator, mut outcomes) = MergeCoordinator::new(provider, settings.merge_segments);
    let mut session = PlaybackSession::new(library.store, settings, SimulatedClock::default());

    for video_id in order {
        let video = session.store().get(video_id)?.clone();
        let Some(end) = video.duration else {
            tracing::warn!(video = %video.title, "no duration, skipping");
            continue;
        };

        session.clock_mut().reset(args.start_at);
        session.play(video_id, args.start_at)?;
        tracing::info!(
            video = %video.title,
            duration = ?video.duration,
            chapters = video.authored_chapters.len(),
            "now playing"
        );
        log_chapter(&session.snapshot(), session.remaining_time());

        if let RequestStatus::Disabled = coordinator.request(&video, args.force_refresh) {
            tracing::info!("segment merging disabled");
        }

        let speed = session.playback_speed();
        let mut ticker = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let position = session.clock_mut().advance(speed);
                    if position >= end {
                        break;
                    }
                    let update = session.tick(position);
                    if update.chapter_changed {
                        log_chapter(&session.snapshot(), session.remaining_time());
                    }
                }
                Some(outcome) = outcomes.recv() => {
                    let merged = outcome.chapters.as_ref().map(Vec::len);
                    match session.apply_merge(outcome) {
                        Ok(true) => {
                            tracing::info!(?merged, "chapters refreshed");
                            log_chapter(&session.snapshot(), session.remaining_time());
                        }
                        Ok(false) => {}
                        Err(e) => tracing::warn!(error = %e, "could not apply merge"),
                    }
                }
            }
        }

        tracing::info!(video = %video.title, "finished");
    }

    Ok(())
}

fn log_chapter(snapshot: &TrackerSnapshot, remaining: Option<f64>) {
    match &snapshot.current {
        Some(chapter) => tracing::info!(
            chapter = %chapter.title,
            start = chapter.start_time,
            active = chapter.is_active,
            next = ?snapshot.next.as_ref().map(|c| c.title.as_str()),
            remaining = ?remaining.map(|r| r.round()),
            "chapter"
        ),
        None => tracing::info!(state = ?snapshot.state, "no current chapter"),
    }
}
