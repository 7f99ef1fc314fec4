//! Output contracts of the scheduler.
//!
//! Each tick produces at most one position batch and one notification per
//! instance that finished. A `Dispatcher` hands them to the outbound
//! transport, which owns formatting, retries and connection health.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ids::{AnimationId, TrackId};
use crate::position::Position;

/// One track's position this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub track_id: TrackId,
    pub animation_id: AnimationId,
    /// Opaque transport index copied from the track.
    pub transport_index: u32,
    pub position: Position,
    pub local_time: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum StopReason {
    /// A non-looping instance reached its duration.
    Completed,
    /// The model failed to produce a finite position.
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedInstance {
    pub animation_id: AnimationId,
    pub track_id: TrackId,
    #[serde(flatten)]
    pub reason: StopReason,
}

/// Receiver of scheduler output. Called from inside `Scheduler::tick`, so
/// implementations must not block.
pub trait Dispatcher {
    /// At most once per tick, never with an empty batch.
    fn on_position_batch(&mut self, updates: &[PositionUpdate], tick_timestamp: f64);

    /// Once per finalized instance. Explicit stops are not reported.
    fn on_instance_stopped(&mut self, stopped: &StoppedInstance);

    /// Retry output held back by a slow consumer. Returns true once nothing
    /// is pending.
    fn flush(&mut self) -> bool {
        true
    }
}

/// Owned form of a dispatcher call, for queues and channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SchedulerEvent {
    Positions {
        updates: Vec<PositionUpdate>,
        tick_timestamp: f64,
    },
    Stopped(StoppedInstance),
}

/// Collects every call, in order. Handy in tests and for hosts that drain
/// events after each tick.
impl Dispatcher for Vec<SchedulerEvent> {
    fn on_position_batch(&mut self, updates: &[PositionUpdate], tick_timestamp: f64) {
        self.push(SchedulerEvent::Positions {
            updates: updates.to_vec(),
            tick_timestamp,
        });
    }

    fn on_instance_stopped(&mut self, stopped: &StoppedInstance) {
        self.push(SchedulerEvent::Stopped(stopped.clone()));
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
    fn on_position_batch(&mut self, updates: &[PositionUpdate], tick_timestamp: f64) {
        (**self).on_position_batch(updates, tick_timestamp)
    }

    fn on_instance_stopped(&mut self, stopped: &StoppedInstance) {
        (**self).on_instance_stopped(stopped)
    }

    fn flush(&mut self) -> bool {
        (**self).flush()
    }
}

/// Diagnostics for one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub timestamp: f64,
    pub updates: usize,
    pub completed: usize,
    pub failed: usize,
    /// Instances still active after the tick.
    pub active: usize,
    /// Time spent inside `tick`, measured on the host's monotonic clock. It
    /// never feeds back into positions.
    pub compute_time: Duration,
}

/// Answer to `Scheduler::status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub active_instance_count: usize,
    pub tick_rate: f64,
}
