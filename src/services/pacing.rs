//! Randomized waits between rounds so the remote service never sees bursts.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::info;

/// Lowest delay ever produced, in seconds.
const MIN_DELAY_SECS: u64 = 1;

/// Bounds, in whole seconds, of the delay drawn between two rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingBounds {
    min_seconds: u64,
    max_seconds: u64,
    step_seconds: u64,
}

impl PacingBounds {
    /// Build bounds from untrusted input; negative or zero values are clamped
    /// instead of rejected.
    pub fn new(min_seconds: i64, max_seconds: i64, step_seconds: i64) -> Self {
        let min_seconds = clamp_positive(min_seconds, MIN_DELAY_SECS);
        let max_seconds = clamp_positive(max_seconds, MIN_DELAY_SECS).max(min_seconds);
        let step_seconds = clamp_positive(step_seconds, 1);
        Self {
            min_seconds,
            max_seconds,
            step_seconds,
        }
    }
}

impl Default for PacingBounds {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

fn clamp_positive(value: i64, floor: u64) -> u64 {
    u64::try_from(value).unwrap_or(0).max(floor)
}

/// Draw `min + r * step` with `r` uniform in `[0, (max - min) / step)`.
///
/// When the range holds no full step the minimum is returned.
pub fn next_delay<R: Rng + ?Sized>(rng: &mut R, bounds: &PacingBounds) -> Duration {
    let slots = (bounds.max_seconds - bounds.min_seconds) / bounds.step_seconds;
    let r = if slots == 0 {
        0
    } else {
        rng.random_range(0..slots)
    };
    Duration::from_secs(bounds.min_seconds + r * bounds.step_seconds)
}

/// Sleep for a freshly drawn delay.
pub async fn pause(bounds: &PacingBounds) {
    // ThreadRng is not Send, so the draw must finish before the await.
    let delay = next_delay(&mut rand::rng(), bounds);
    info!(seconds = delay.as_secs(), "..zZz ...zZz");
    sleep(delay).await;
}
