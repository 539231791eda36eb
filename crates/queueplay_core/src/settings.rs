use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// "Previous chapter" restarts the current chapter once playback is this far
/// into it, in wall-clock seconds.
pub const DEFAULT_PREVIOUS_HYSTERESIS_SECS: f64 = 4.0;

/// Added to the duration when skipping an inactive tail so the seek does not
/// land exactly on the end of the video.
pub const DEFAULT_SKIP_END_EPSILON_SECS: f64 = 0.1;

pub const DEFAULT_MIN_MERGED_CHAPTER_SECS: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Merge externally sourced segments into chapters and prefer the merged
    /// set when one exists.
    pub merge_segments: bool,
    pub previous_hysteresis_secs: f64,
    pub skip_end_epsilon_secs: f64,
    pub default_playback_speed: f64,
    /// Authored chapter pieces shorter than this are dropped by the merge.
    pub min_merged_chapter_secs: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            merge_segments: true,
            previous_hysteresis_secs: DEFAULT_PREVIOUS_HYSTERESIS_SECS,
            skip_end_epsilon_secs: DEFAULT_SKIP_END_EPSILON_SECS,
            default_playback_speed: 1.0,
            min_merged_chapter_secs: DEFAULT_MIN_MERGED_CHAPTER_SECS,
        }
    }
}

impl PlaybackSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.default_playback_speed > 0.0) {
            return Err(CoreError::InvalidSettings(format!(
                "default_playback_speed must be positive, got {}",
                self.default_playback_speed
            )));
        }
        if !(self.skip_end_epsilon_secs > 0.0) {
            return Err(CoreError::InvalidSettings(
                "skip_end_epsilon_secs must be positive".into(),
            ));
        }
        if self.previous_hysteresis_secs < 0.0 || self.min_merged_chapter_secs < 0.0 {
            return Err(CoreError::InvalidSettings(
                "durations must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Save settings as pretty-printed JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let settings: PlaybackSettings = serde_json::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }
}
