//! Spatial Motion Core (engine-agnostic)
//!
//! Deterministic position engine for moving spatial-audio sources. Four parts,
//! bottom-up:
//! - `timing`: wall-clock time to animation-local time (loop, ping-pong,
//!   pause/resume, phase delays).
//! - `models`: the motion model registry, pure functions of local time.
//! - `transform`: one animation to one instance per track (identical,
//!   phase-offset, position-relative, formation).
//! - `scheduler`: the active instance table and the fixed-interval tick.
//!
//! No threads live here and animation time comes only from the `now` passed
//! in by the caller; see `spatial-motion-runtime` for the tick driver. The
//! one clock read, `Instant` in `Scheduler::tick`, only measures
//! `TickReport::compute_time` for diagnostics.

pub mod config;
pub mod data;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod instance;
pub mod models;
pub mod outputs;
pub mod position;
pub mod scheduler;
pub mod timing;
pub mod transform;

// Re-exports for hosts and adapters
pub use config::SchedulerConfig;
pub use data::{Animation, Keyframe, ParamValue, Parameters, Track};
pub use error::{ComputationError, MotionError, ValidationError};
pub use ids::{AnimationId, TrackId};
pub use inputs::Command;
pub use instance::{InstanceState, PlaybackState, PlayingInstance};
pub use models::{MotionModel, MotionRegistry};
pub use outputs::{
    Dispatcher, PositionUpdate, SchedulerEvent, SchedulerStatus, StopReason, StoppedInstance,
    TickReport,
};
pub use position::{Plane, Position};
pub use scheduler::Scheduler;
pub use timing::{Resolution, TimingState};
pub use transform::{build_instances, FormationCenter, PhaseShift, TransformSpec};

pub type Result<T> = core::result::Result<T, MotionError>;
