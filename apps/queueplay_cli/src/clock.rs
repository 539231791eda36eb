use queueplay_core::PlaybackClock;

/// Playback clock that moves forward by the playback speed on every tick and
/// applies the most recent seek request at the next tick.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    position: f64,
    pending_seek: Option<f64>,
}

impl SimulatedClock {
    pub fn reset(&mut self, position: f64) {
        self.position = position;
        self.pending_seek = None;
    }

    pub fn advance(&mut self, speed: f64) -> f64 {
        self.position = match self.pending_seek.take() {
            Some(target) => target,
            None => self.position + speed,
        };
        self.position
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}

impl PlaybackClock for SimulatedClock {
    fn seek(&mut self, to: f64) {
        tracing::debug!(from = self.position, to, "seek");
        self.pending_seek = Some(to);
    }
}
