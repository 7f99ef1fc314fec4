//! Scheduler: owns the active instance table and drives one tick at a time.
//!
//! The scheduler never reads a clock. Every command and every tick is given
//! `now` explicitly (wall-clock milliseconds), so it can be driven by an OS
//! timer thread, a real-time callback or a test loop alike.
//!
//! All instances evaluated in one tick see the same `now`, which keeps
//! formation and phase-offset groups consistent with each other.

use std::time::Instant;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{check_tick_rate, SchedulerConfig};
use crate::data::{Animation, Track};
use crate::error::{MotionError, ValidationError};
use crate::ids::AnimationId;
use crate::inputs::Command;
use crate::instance::{InstanceState, PlayingInstance};
use crate::models::MotionRegistry;
use crate::outputs::{
    Dispatcher, PositionUpdate, SchedulerStatus, StopReason, StoppedInstance, TickReport,
};
use crate::transform::{build_instances, TransformSpec};

pub struct Scheduler<D: Dispatcher> {
    config: SchedulerConfig,
    registry: MotionRegistry,
    dispatcher: D,
    active: IndexMap<AnimationId, Vec<PlayingInstance>>,
    /// Applied at the start of the next tick.
    pending_tick_rate: Option<f64>,
    running: bool,
    seeds: StdRng,
    // Reused across ticks.
    updates: Vec<PositionUpdate>,
    stopped: Vec<StoppedInstance>,
}

impl<D: Dispatcher> Scheduler<D> {
    pub fn new(config: SchedulerConfig, dispatcher: D) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: MotionRegistry::with_builtin(),
            dispatcher,
            active: IndexMap::new(),
            pending_tick_rate: None,
            running: false,
            seeds: StdRng::from_os_rng(),
            updates: Vec::new(),
            stopped: Vec::new(),
        })
    }

    /// Replace the model registry (e.g. to add host-defined models).
    pub fn with_registry(mut self, registry: MotionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Make random-walk materialization reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seeds = StdRng::seed_from_u64(seed);
        self
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &MotionRegistry {
        &self.registry
    }

    #[inline]
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    #[inline]
    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Whether the tick loop should be running: true from the first `play`
    /// that registered instances until the active set drains.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current tick period in wall-clock units.
    #[inline]
    pub fn tick_interval(&self) -> f64 {
        self.config.tick_interval()
    }

    /// Build and register instances of `animation` on `tracks`, replacing
    /// whatever was playing under `animation_id`. Returns the number of
    /// instances registered.
    ///
    /// On error nothing changes. An empty track list clears `animation_id`
    /// and registers nothing.
    pub fn play(
        &mut self,
        animation_id: AnimationId,
        animation: &Animation,
        tracks: &[Track],
        transform: &TransformSpec,
        now: f64,
    ) -> Result<usize, MotionError> {
        let seed = self.seeds.random::<u64>();
        let instances = build_instances(
            &self.registry,
            &animation_id,
            animation,
            tracks,
            transform,
            now,
            seed,
        )?;
        let count = instances.len();
        if self.active.shift_remove(&animation_id).is_some() {
            log::debug!("{animation_id}: replacing running instances");
        }
        if count > 0 {
            self.active.insert(animation_id.clone(), instances);
        }
        log::debug!("{animation_id}: play on {count} tracks at {now}");
        self.refresh_running();
        Ok(count)
    }

    /// Freeze every instance of `animation_id`. Returns false if none exist.
    pub fn pause(&mut self, animation_id: &AnimationId, now: f64) -> bool {
        let Some(instances) = self.active.get_mut(animation_id) else {
            return false;
        };
        for inst in instances.iter_mut() {
            inst.timing.pause(now);
        }
        log::debug!("{animation_id}: paused at {now}");
        true
    }

    pub fn resume(&mut self, animation_id: &AnimationId, now: f64) -> bool {
        let Some(instances) = self.active.get_mut(animation_id) else {
            return false;
        };
        for inst in instances.iter_mut() {
            inst.timing.resume(now);
        }
        log::debug!("{animation_id}: resumed at {now}");
        true
    }

    /// Remove every instance of `animation_id` before the next tick. No stop
    /// notification is emitted.
    pub fn stop(&mut self, animation_id: &AnimationId) -> bool {
        let removed = self.active.shift_remove(animation_id).is_some();
        if removed {
            log::debug!("{animation_id}: stopped");
            self.refresh_running();
        }
        removed
    }

    /// Remove everything. Returns the number of instances dropped.
    pub fn stop_all(&mut self) -> usize {
        let count = self.active_instance_count();
        self.active.clear();
        if count > 0 {
            log::debug!("stopped all ({count} instances)");
        }
        self.refresh_running();
        count
    }

    /// Change the cadence from the next tick on.
    pub fn set_tick_rate(&mut self, updates_per_second: f64) -> Result<(), ValidationError> {
        check_tick_rate(updates_per_second, self.config.max_tick_rate)?;
        self.pending_tick_rate = Some(updates_per_second);
        Ok(())
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running,
            active_instance_count: self.active_instance_count(),
            tick_rate: self.pending_tick_rate.unwrap_or(self.config.tick_rate),
        }
    }

    pub fn active_instance_count(&self) -> usize {
        self.active.values().map(Vec::len).sum()
    }

    /// Per-track state of `animation_id` at `now`, empty if it is not active.
    pub fn instance_states(&self, animation_id: &AnimationId, now: f64) -> Vec<InstanceState> {
        self.active
            .get(animation_id)
            .map(|instances| {
                instances
                    .iter()
                    .map(|inst| {
                        let res = inst.resolve(now);
                        InstanceState {
                            track_id: inst.track_id.clone(),
                            state: inst.state(),
                            local_time: res.local_time,
                            loop_count: res.loop_count,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply one host command at `now`.
    pub fn apply(&mut self, command: Command, now: f64) -> Result<(), MotionError> {
        match command {
            Command::Play {
                animation_id,
                animation,
                tracks,
                transform,
            } => {
                self.play(animation_id, &animation, &tracks, &transform, now)?;
            }
            Command::Pause { animation_id } => {
                self.pause(&animation_id, now);
            }
            Command::Resume { animation_id } => {
                self.resume(&animation_id, now);
            }
            Command::Stop { animation_id } => {
                self.stop(&animation_id);
            }
            Command::StopAll => {
                self.stop_all();
            }
            Command::SetTickRate { updates_per_second } => {
                self.set_tick_rate(updates_per_second)?;
            }
        }
        Ok(())
    }

    /// Run one tick at wall-clock `now`.
    ///
    /// Evaluates every active instance, emits at most one position batch and
    /// one stop notification per finished instance, then drops finished
    /// instances. A model error only affects its own instance.
    pub fn tick(&mut self, now: f64) -> TickReport {
        let started = Instant::now();
        if let Some(rate) = self.pending_tick_rate.take() {
            log::debug!("tick rate {} -> {rate}", self.config.tick_rate);
            self.config.tick_rate = rate;
        }

        self.updates.clear();
        self.stopped.clear();
        let mut failed = 0;

        let registry = &self.registry;
        let emit_paused = self.config.emit_paused_positions;
        let updates = &mut self.updates;
        let stopped = &mut self.stopped;

        for instances in self.active.values_mut() {
            instances.retain(|inst| {
                let paused = inst.timing.is_paused();
                if paused && !emit_paused {
                    return true;
                }
                let res = inst.resolve(now);
                let finished = !paused && res.should_stop;
                let local_time = if finished {
                    inst.animation.duration
                } else {
                    res.local_time
                };
                match inst.evaluate(registry, local_time) {
                    Ok(position) => {
                        updates.push(PositionUpdate {
                            track_id: inst.track_id.clone(),
                            animation_id: inst.animation_id.clone(),
                            transport_index: inst.transport_index,
                            position,
                            local_time,
                        });
                        if finished {
                            stopped.push(StoppedInstance {
                                animation_id: inst.animation_id.clone(),
                                track_id: inst.track_id.clone(),
                                reason: StopReason::Completed,
                            });
                        }
                        !finished
                    }
                    Err(err) => {
                        log::warn!(
                            "{}/{}: dropping instance after {} error: {err}",
                            inst.animation_id,
                            inst.track_id,
                            err.category()
                        );
                        failed += 1;
                        stopped.push(StoppedInstance {
                            animation_id: inst.animation_id.clone(),
                            track_id: inst.track_id.clone(),
                            reason: StopReason::Error {
                                message: err.to_string(),
                            },
                        });
                        false
                    }
                }
            });
        }
        self.active.retain(|_, instances| !instances.is_empty());

        if !self.updates.is_empty() {
            self.dispatcher.on_position_batch(&self.updates, now);
        }
        for s in &self.stopped {
            self.dispatcher.on_instance_stopped(s);
        }

        let report = TickReport {
            timestamp: now,
            updates: self.updates.len(),
            completed: self.stopped.len() - failed,
            failed,
            active: self.active_instance_count(),
            compute_time: started.elapsed(),
        };
        log::trace!(
            "tick {now}: {} updates, {} completed, {} failed, {} active",
            report.updates,
            report.completed,
            report.failed,
            report.active
        );
        self.refresh_running();
        report
    }

    fn refresh_running(&mut self) {
        let should_run = !self.active.is_empty();
        if should_run != self.running {
            self.running = should_run;
            if should_run {
                log::debug!("tick loop started");
            } else {
                log::debug!("tick loop idle");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::SchedulerEvent;
    use crate::position::Position;
    use crate::transform::PhaseShift;

    fn scheduler() -> Scheduler<Vec<SchedulerEvent>> {
        Scheduler::new(SchedulerConfig::default(), Vec::new())
            .unwrap()
            .with_seed(1)
    }

    fn line(duration: f64) -> Animation {
        Animation::new("line", "linear", duration)
    }

    fn one_track() -> Vec<Track> {
        vec![Track::new("t0", Position::ORIGIN)]
    }

    fn batches(events: &[SchedulerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SchedulerEvent::Positions { .. }))
            .count()
    }

    #[test]
    fn runs_lazily_and_idles_when_empty() {
        let mut s = scheduler();
        assert!(!s.status().running);
        s.play("a".into(), &line(1.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        assert!(s.status().running);
        assert_eq!(s.status().active_instance_count, 1);

        s.tick(500.0);
        let report = s.tick(1_000.0);
        assert_eq!(report.completed, 1);
        assert!(!s.status().running);

        let stops: Vec<_> = s
            .dispatcher()
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::Stopped(st) => Some(st),
                _ => None,
            })
            .collect();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].reason, StopReason::Completed);
    }

    #[test]
    fn positions_depend_only_on_the_supplied_time() {
        let run = || {
            let mut s = scheduler();
            let orbit = Animation::new("orbit", "circular", 4.0);
            s.play("o".into(), &orbit, &one_track(), &TransformSpec::Identical, 100.0)
                .unwrap();
            let reports: Vec<TickReport> = [100.0, 600.0, 1_350.0]
                .into_iter()
                .map(|now| s.tick(now))
                .collect();
            (reports, s.dispatcher().clone())
        };
        let (first, events_a) = run();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (second, events_b) = run();
        assert_eq!(events_a, events_b);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.timestamp, b.timestamp);
            assert_eq!(a.updates, b.updates);
        }
    }

    #[test]
    fn final_position_is_at_duration() {
        let mut s = scheduler();
        s.play("a".into(), &line(1.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        s.tick(5_000.0);
        match &s.dispatcher()[0] {
            SchedulerEvent::Positions { updates, .. } => {
                assert_eq!(updates[0].local_time, 1.0);
                assert_eq!(updates[0].position, Position::new(5.0, 0.0, 0.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_ticks_emit_nothing() {
        let mut s = scheduler();
        s.tick(0.0);
        s.play("a".into(), &line(10.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        s.pause(&"a".into(), 100.0);
        s.tick(200.0);
        assert!(s.dispatcher().is_empty());
    }

    #[test]
    fn paused_positions_are_frozen_when_emitted() {
        let cfg = SchedulerConfig {
            emit_paused_positions: true,
            ..SchedulerConfig::default()
        };
        let mut s = Scheduler::new(cfg, Vec::new()).unwrap();
        s.play("a".into(), &line(10.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        s.pause(&"a".into(), 2_000.0);
        s.tick(3_000.0);
        s.tick(9_000.0);
        let times: Vec<f64> = s
            .dispatcher()
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::Positions { updates, .. } => Some(updates[0].local_time),
                _ => None,
            })
            .collect();
        assert_eq!(times, vec![2.0, 2.0]);
    }

    #[test]
    fn play_replaces_existing_instances() {
        let mut s = scheduler();
        let tracks = vec![
            Track::new("t0", Position::ORIGIN),
            Track::new("t1", Position::ORIGIN),
        ];
        s.play("a".into(), &line(10.0), &tracks, &TransformSpec::Identical, 0.0)
            .unwrap();
        s.play("a".into(), &line(10.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        assert_eq!(s.status().active_instance_count, 1);
    }

    #[test]
    fn invalid_play_leaves_state_untouched() {
        let mut s = scheduler();
        s.play("a".into(), &line(10.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        let bad = Animation::new("bad", "linear", -5.0);
        let err = s
            .play("a".into(), &bad, &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap_err();
        assert_eq!(err.to_string(), "Duration must be greater than 0");
        assert_eq!(s.status().active_instance_count, 1);
    }

    #[test]
    fn explicit_stop_is_silent() {
        let mut s = scheduler();
        s.play("a".into(), &line(10.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        assert!(s.stop(&"a".into()));
        assert!(!s.stop(&"a".into()));
        s.tick(100.0);
        assert!(s.dispatcher().is_empty());
        assert!(!s.is_running());
    }

    #[test]
    fn tick_rate_changes_on_next_tick() {
        let mut s = scheduler();
        s.set_tick_rate(100.0).unwrap();
        assert_eq!(s.tick_interval(), 20.0);
        assert_eq!(s.status().tick_rate, 100.0);
        s.tick(0.0);
        assert_eq!(s.tick_interval(), 10.0);
        assert!(s.set_tick_rate(0.0).is_err());
        assert!(s.set_tick_rate(1_000.0).is_err());
    }

    #[test]
    fn errors_are_isolated_per_instance() {
        let mut s = scheduler();
        let degenerate = Animation::new("z", "zigzag", 4.0).with_parameters(
            crate::data::Parameters::new()
                .with("zigzagStart", Position::ORIGIN)
                .with("zigzagEnd", Position::new(0.0, 0.0, 1.0)),
        );
        s.play("bad".into(), &degenerate, &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        s.play("good".into(), &line(10.0), &one_track(), &TransformSpec::Identical, 0.0)
            .unwrap();
        let report = s.tick(1_000.0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.updates, 1);
        assert_eq!(report.active, 1);
        assert!(s.dispatcher().iter().any(|e| matches!(
            e,
            SchedulerEvent::Stopped(StoppedInstance {
                reason: StopReason::Error { .. },
                ..
            })
        )));
        assert_eq!(batches(s.dispatcher()), 1);
    }

    #[test]
    fn instance_states_follow_phase_offsets() {
        let mut s = scheduler();
        let tracks = vec![
            Track::new("t0", Position::ORIGIN),
            Track::new("t1", Position::ORIGIN),
        ];
        let spec = TransformSpec::PhaseOffset(PhaseShift::uniform(1.0));
        s.play("a".into(), &line(10.0), &tracks, &spec, 0.0).unwrap();
        let states = s.instance_states(&"a".into(), 3_000.0);
        assert_eq!(states[0].local_time, 3.0);
        assert_eq!(states[1].local_time, 2.0);
        assert!(s.instance_states(&"missing".into(), 0.0).is_empty());
    }

    #[test]
    fn apply_dispatches_commands() {
        let mut s = scheduler();
        let cmd: Command = serde_json::from_str(
            r#"{
                "type": "play",
                "animationId": "a",
                "animation": {"id": "a", "type": "circular", "duration": 2.0, "loop": true},
                "tracks": [{"id": "t0", "initialPosition": {"x": 0.0, "y": 0.0, "z": 0.0}}],
                "transform": {"mode": "position-relative"}
            }"#,
        )
        .unwrap();
        s.apply(cmd, 0.0).unwrap();
        assert_eq!(s.status().active_instance_count, 1);
        s.apply(Command::Pause { animation_id: "a".into() }, 10.0).unwrap();
        assert_eq!(
            s.instance_states(&"a".into(), 99.0)[0].state,
            crate::instance::PlaybackState::Paused
        );
        s.apply(Command::SetTickRate { updates_per_second: 60.0 }, 10.0)
            .unwrap();
        s.apply(Command::StopAll, 20.0).unwrap();
        assert!(!s.status().running);
    }
}
