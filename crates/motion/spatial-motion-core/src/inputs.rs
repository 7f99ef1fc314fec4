//! Input contract: the commands a host sends to the scheduler.

use serde::{Deserialize, Serialize};

use crate::data::{Animation, Track};
use crate::ids::AnimationId;
use crate::transform::TransformSpec;

/// One scheduler command. Wall-clock time is supplied by the caller of
/// `Scheduler::apply`, not carried in the command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    /// Replaces any instances already playing under `animation_id`.
    Play {
        animation_id: AnimationId,
        animation: Animation,
        tracks: Vec<Track>,
        #[serde(default)]
        transform: TransformSpec,
    },
    Pause {
        animation_id: AnimationId,
    },
    Resume {
        animation_id: AnimationId,
    },
    Stop {
        animation_id: AnimationId,
    },
    StopAll,
    SetTickRate {
        updates_per_second: f64,
    },
}
