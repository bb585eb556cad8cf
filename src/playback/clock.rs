//! Wall-clock pacing for presentation timestamps.

use std::thread;
use std::time::{Duration, Instant};

use crate::media::Rational;

/// Maps a stream's PTS domain onto wall-clock time.
///
/// The anchor is the instant at which PTS 0 plays. It is recorded whenever a
/// zero or missing timestamp is observed, so a decoder that loses its
/// timestamps also restarts the pacing origin.
#[derive(Debug)]
pub struct PlaybackClock {
    time_base: Rational,
    anchor: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(time_base: Rational) -> Self {
        Self {
            time_base,
            anchor: None,
        }
    }

    /// Compute the delay in microseconds before the frame carrying `pts`
    /// should be presented.
    ///
    /// `None` stands for a missing timestamp and behaves like zero: the
    /// clock re-anchors to now and no wait is requested. A negative return
    /// means playback is behind schedule; the caller treats it as "no wait".
    pub fn observe(&mut self, pts: Option<i64>) -> i64 {
        let pts = pts.unwrap_or(0);

        if pts == 0 {
            self.anchor = Some(Instant::now());
            return 0;
        }

        let target = self.pts_to_micros(pts);
        let now = Instant::now();

        let Some(anchor) = self.anchor else {
            // First observed PTS is non-zero: back-date the origin so this
            // frame presents immediately and later frames pace off it.
            self.anchor = now.checked_sub(Duration::from_micros(target.max(0) as u64));
            return 0;
        };

        let elapsed = now.duration_since(anchor).as_micros() as i64;
        target - elapsed
    }

    /// Block until the delay has elapsed; late frames return at once. There
    /// is no catch-up logic and no frame dropping.
    pub fn wait(&self, delay_us: i64) {
        if delay_us > 0 {
            thread::sleep(Duration::from_micros(delay_us as u64));
        }
    }

    /// Integer PTS-to-microseconds conversion. Multiplies before dividing so
    /// truncation stays consistent across the whole session; the i128
    /// intermediate keeps long sessions away from overflow.
    fn pts_to_micros(&self, pts: i64) -> i64 {
        let num = i128::from(self.time_base.num());
        let den = i128::from(self.time_base.den());
        (i128::from(pts) * 1_000_000 * num / den) as i64
    }
}
