//! Per-plate dedup throttle.
//!
//! A camera pointed at a driveway sees the same plate on dozens of
//! consecutive frames. The throttle turns that stream into at most one
//! accepted detection per plate per cooldown window:
//!
//! - state is a map from normalized plate text to the instant it was last
//!   *accepted* (rejected sightings never touch the map)
//! - a plate with no entry, or whose last acceptance is at least one full
//!   cooldown in the past, is accepted and its entry reset to now
//! - plates are throttled independently of each other
//!
//! Entries older than [`SWEEP_COOLDOWN_MULTIPLE`] cooldowns are garbage so
//! long-running processes don't accumulate every plate ever seen; sweeping
//! them can never change an accept/reject outcome because any swept entry
//! had already aged past the window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default cooldown window between accepted detections of one plate.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// An entry this many cooldowns old is eligible for sweeping.
pub const SWEEP_COOLDOWN_MULTIPLE: u32 = 5;

/// Tracks the last accepted sighting per plate and suppresses repeats
/// inside the cooldown window.
#[derive(Debug)]
pub struct DedupThrottle {
    last_accepted: HashMap<String, Instant>,
    cooldown: Duration,
}

impl DedupThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_accepted: HashMap::new(),
            cooldown,
        }
    }

    /// Decide whether a sighting of `plate` at `now` should produce a
    /// detection event.
    ///
    /// Accepts when the plate is unseen or its last acceptance is at least
    /// one cooldown old (elapsed == cooldown accepts). Acceptance resets the
    /// plate's window to `now`; rejection leaves it untouched, so a plate
    /// parked in view reappears every cooldown rather than being suppressed
    /// for as long as it keeps being sighted.
    pub fn accept(&mut self, plate: &str, now: Instant) -> bool {
        match self.last_accepted.get(plate) {
            Some(&last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                self.last_accepted.insert(plate.to_string(), now);
                true
            }
        }
    }

    /// Drop entries whose age has reached `cooldown * SWEEP_COOLDOWN_MULTIPLE`.
    /// Returns how many entries were evicted.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let horizon = self.cooldown.saturating_mul(SWEEP_COOLDOWN_MULTIPLE);
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, &mut last| now.duration_since(last) < horizon);
        before - self.last_accepted.len()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}

impl Default for DedupThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
