//! Live per-track copies of an animation.

use serde::{Deserialize, Serialize};

use crate::data::Animation;
use crate::error::MotionError;
use crate::ids::{AnimationId, TrackId};
use crate::models::MotionRegistry;
use crate::position::Position;
use crate::timing::{self, Resolution, TimingState};

/// Observable state of an active instance. Stopped instances leave the
/// active set, so they are never reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// One track's running copy of an animation.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayingInstance {
    /// Identifier the instance was played under.
    pub animation_id: AnimationId,
    pub track_id: TrackId,
    pub transport_index: u32,
    /// The track's position captured when the instance was built.
    pub initial_position: Position,
    /// Definition after per-track rebasing and materialization.
    pub animation: Animation,
    pub timing: TimingState,
    /// `initial_position - centroid`, fixed at creation in formation mode.
    pub formation_offset: Option<Position>,
}

impl PlayingInstance {
    #[inline]
    pub fn state(&self) -> PlaybackState {
        if self.timing.is_paused() {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    #[inline]
    pub fn resolve(&self, now: f64) -> Resolution {
        timing::resolve(
            now,
            self.animation.duration,
            self.animation.looping,
            self.animation.ping_pong,
            &self.timing,
        )
    }

    /// Model position at `local_time`, shifted by the formation offset.
    pub fn evaluate(&self, registry: &MotionRegistry, local_time: f64) -> Result<Position, MotionError> {
        let base = registry.evaluate(&self.animation, local_time)?;
        Ok(match self.formation_offset {
            Some(offset) => base + offset,
            None => base,
        })
    }
}

/// Host-facing snapshot of one instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceState {
    pub track_id: TrackId,
    pub state: PlaybackState,
    pub local_time: f64,
    pub loop_count: u64,
}
