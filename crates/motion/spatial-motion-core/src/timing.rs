//! Timing resolver: wall-clock time to animation-local time.
//!
//! Wall-clock values (`now`, `start_time`) are milliseconds; everything an
//! animation sees (duration, local time, elapsed) is seconds. This module is
//! the only place that converts between the two.
//!
//! Loop count and playback direction are never stored. They are derived from
//! `elapsed` on every call, so a `TimingState` only carries the start instant
//! and the pause bookkeeping.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Wall-clock units per second.
pub const WALL_CLOCK_SCALE: f64 = 1000.0;

/// Convert a wall-clock span to seconds.
#[inline]
pub fn wall_to_seconds(span: f64) -> f64 {
    span / WALL_CLOCK_SCALE
}

/// Convert seconds to a wall-clock span.
#[inline]
pub fn seconds_to_wall(seconds: f64) -> f64 {
    seconds * WALL_CLOCK_SCALE
}

/// Per-instance timing bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingState {
    /// Wall-clock instant at which local time 0 occurs (may lie in the future
    /// for phase-delayed instances).
    pub start_time: f64,
    /// Elapsed seconds frozen at pause; `Some` exactly while paused.
    #[serde(default)]
    pub paused_elapsed: Option<f64>,
}

impl TimingState {
    /// Fresh, running state whose local time 0 is `now`.
    #[inline]
    pub fn reset(now: f64) -> Self {
        Self {
            start_time: now,
            paused_elapsed: None,
        }
    }

    /// Running state whose local time 0 is `delay_seconds` after `now`.
    #[inline]
    pub fn delayed(now: f64, delay_seconds: f64) -> Self {
        Self::reset(now + seconds_to_wall(delay_seconds))
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused_elapsed.is_some()
    }

    /// Raw elapsed seconds. Ignores `now` while paused.
    #[inline]
    pub fn elapsed(&self, now: f64) -> f64 {
        match self.paused_elapsed {
            Some(frozen) => frozen,
            None => wall_to_seconds(now - self.start_time),
        }
    }

    /// Freeze elapsed time at `now`. Pausing twice keeps the first freeze.
    pub fn pause(&mut self, now: f64) {
        if self.paused_elapsed.is_none() {
            self.paused_elapsed = Some(wall_to_seconds(now - self.start_time));
        }
    }

    /// Continue from the frozen elapsed time. No-op when not paused.
    pub fn resume(&mut self, now: f64) {
        if let Some(frozen) = self.paused_elapsed.take() {
            self.start_time = now - seconds_to_wall(frozen);
        }
    }
}

/// Output of a single resolution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Animation-local seconds, always within `[0, duration]`.
    pub local_time: f64,
    pub loop_count: u64,
    pub is_reversed: bool,
    /// Elapsed time sits exactly on a loop boundary (excluding 0).
    pub should_loop: bool,
    /// A non-looping animation reached its end.
    pub should_stop: bool,
    /// `local_time / duration`, clamped to `[0, 1]`.
    pub progress: f64,
    pub next_state: TimingState,
}

/// Check the timing flags of an animation definition.
pub fn validate(duration: f64, looping: bool, ping_pong: bool) -> Result<(), ValidationError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ValidationError::NonPositiveDuration { duration });
    }
    if ping_pong && !looping {
        return Err(ValidationError::PingPongWithoutLoop);
    }
    Ok(())
}

/// Resolve `now` into local time for an animation of `duration` seconds.
///
/// Exact multiples of `duration` count as the start of the next loop: with
/// ping-pong, `elapsed == duration` yields `loop_count == 1`, reversed, and
/// `local_time == duration`.
///
/// Elapsed time before the start instant (phase-delayed instances) is
/// treated as 0. The caller is expected to have validated `duration > 0`.
pub fn resolve(
    now: f64,
    duration: f64,
    looping: bool,
    ping_pong: bool,
    state: &TimingState,
) -> Resolution {
    let elapsed = state.elapsed(now).max(0.0);

    let (local_time, loop_count, is_reversed, should_loop, should_stop) = if !looping {
        (elapsed.min(duration), 0, false, false, elapsed >= duration)
    } else {
        let time_in_loop = elapsed % duration;
        // Derive the count from the remainder so both agree at boundaries.
        let loop_count = ((elapsed - time_in_loop) / duration).round() as u64;
        let is_reversed = ping_pong && loop_count % 2 == 1;
        let local = if is_reversed {
            duration - time_in_loop
        } else {
            time_in_loop
        };
        let should_loop = elapsed > 0.0 && time_in_loop == 0.0;
        (local, loop_count, is_reversed, should_loop, false)
    };

    Resolution {
        local_time,
        loop_count,
        is_reversed,
        should_loop,
        should_stop,
        progress: (local_time / duration).clamp(0.0, 1.0),
        next_state: *state,
    }
}
