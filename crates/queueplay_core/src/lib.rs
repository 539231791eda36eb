pub mod error;
pub mod index;
pub mod navigation;
pub mod parse;
pub mod session;
pub mod settings;
pub mod tracker;
pub mod types;
pub mod video;

pub use error::{CoreError, Result};
pub use index::ChapterIndex;
pub use session::{MergeOutcome, PlaybackClock, PlaybackSession};
pub use settings::PlaybackSettings;
pub use tracker::{Tracker, TrackerSnapshot, TrackerState, Update};
pub use types::{ChapterCategory, ChapterExport, ChapterRecord};
pub use video::{Video, VideoStore};
