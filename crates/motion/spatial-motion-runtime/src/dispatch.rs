//! Channel-backed dispatcher for consumers on other threads.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use spatial_motion_core::{Dispatcher, PositionUpdate, SchedulerEvent, StoppedInstance};

/// Queue depth used by `ChannelDispatcher::new`: about five seconds of
/// batches at the default tick rate.
pub const DEFAULT_CAPACITY: usize = 256;

/// Forwards scheduler output as `SchedulerEvent`s over a bounded channel.
///
/// Sends never block the tick thread. When the consumer falls behind,
/// position batches are dropped; the next batch supersedes them anyway.
/// Stop notifications are held in a backlog and retried on every later
/// dispatch and on `flush`, so they are delivered in order once the
/// consumer catches up. After the receiver is dropped everything is
/// discarded.
#[derive(Debug)]
pub struct ChannelDispatcher {
    tx: SyncSender<SchedulerEvent>,
    backlog: VecDeque<StoppedInstance>,
    dropped_batches: u64,
    dropping: bool,
    disconnected: bool,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, Receiver<SchedulerEvent>) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Bounded to `capacity` queued events (at least one).
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        (
            Self {
                tx,
                backlog: VecDeque::new(),
                dropped_batches: 0,
                dropping: false,
                disconnected: false,
            },
            rx,
        )
    }

    /// Position batches discarded because the queue was full.
    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches
    }

    /// Stop notifications waiting for room in the queue.
    pub fn pending_stops(&self) -> usize {
        self.backlog.len()
    }

    /// Returns false if the queue was full. A dropped receiver counts as
    /// delivered.
    fn try_send(&mut self, event: SchedulerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("event receiver dropped; discarding scheduler output");
                self.disconnected = true;
                self.backlog.clear();
                true
            }
        }
    }

    fn drain_backlog(&mut self) -> bool {
        while let Some(front) = self.backlog.front() {
            if self.disconnected {
                self.backlog.clear();
                break;
            }
            let event = SchedulerEvent::Stopped(front.clone());
            if !self.try_send(event) {
                return false;
            }
            self.backlog.pop_front();
        }
        true
    }

    fn drop_batch(&mut self, tick_timestamp: f64) {
        self.dropped_batches += 1;
        if !self.dropping {
            log::warn!("event queue full at {tick_timestamp:.1}; dropping position batches");
            self.dropping = true;
        } else {
            log::debug!("event queue full, dropped batch at {tick_timestamp:.1}");
        }
    }
}

impl Dispatcher for ChannelDispatcher {
    fn on_position_batch(&mut self, updates: &[PositionUpdate], tick_timestamp: f64) {
        if self.disconnected {
            return;
        }
        // Batches never overtake a pending stop.
        if !self.drain_backlog() {
            self.drop_batch(tick_timestamp);
            return;
        }
        let event = SchedulerEvent::Positions {
            updates: updates.to_vec(),
            tick_timestamp,
        };
        if self.try_send(event) {
            self.dropping = false;
        } else {
            self.drop_batch(tick_timestamp);
        }
    }

    fn on_instance_stopped(&mut self, stopped: &StoppedInstance) {
        if self.disconnected {
            return;
        }
        self.backlog.push_back(stopped.clone());
        if !self.drain_backlog() {
            log::debug!(
                "event queue full; {} stop notification(s) pending",
                self.backlog.len()
            );
        }
    }

    fn flush(&mut self) -> bool {
        self.drain_backlog()
    }
}
