//! Tick driver thread.
//!
//! The scheduler lives behind one mutex shared by the driver thread and the
//! command methods on `Runtime`, so a command never runs while a tick does.
//! The thread parks on a condvar while nothing is playing and is woken by
//! `play`, `set_tick_rate` and shutdown. Before parking it flushes the
//! dispatcher, polling until held-back output has been delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use spatial_motion_core::{
    Animation, AnimationId, Command, Dispatcher, InstanceState, MotionError, Scheduler,
    SchedulerConfig, SchedulerStatus, Track, TransformSpec, ValidationError,
};

use crate::clock::Clock;

const THREAD_NAME: &str = "spatial-motion-tick";

/// Retry period for dispatcher output still pending while idle.
const FLUSH_RETRY: Duration = Duration::from_millis(10);

struct Shared<D: Dispatcher> {
    scheduler: Mutex<Scheduler<D>>,
    wake: Condvar,
    shutdown: AtomicBool,
}

impl<D: Dispatcher> Shared<D> {
    fn lock(&self) -> MutexGuard<'_, Scheduler<D>> {
        // A panicking dispatcher must not take the whole engine down.
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

/// Owns the tick thread. Dropping the runtime stops and joins it.
pub struct Runtime<D: Dispatcher + Send + 'static> {
    shared: Arc<Shared<D>>,
    clock: Arc<dyn Clock>,
    handle: Option<JoinHandle<()>>,
}

impl<D: Dispatcher + Send + 'static> Runtime<D> {
    /// Validate `config` and start the driver thread. The thread stays
    /// parked until the first `play`.
    pub fn spawn(config: SchedulerConfig, dispatcher: D, clock: impl Clock) -> Result<Self> {
        let scheduler = Scheduler::new(config, dispatcher).context("invalid scheduler config")?;
        Self::with_scheduler(scheduler, clock)
    }

    /// Start the driver around an already configured scheduler.
    pub fn with_scheduler(scheduler: Scheduler<D>, clock: impl Clock) -> Result<Self> {
        let shared = Arc::new(Shared {
            scheduler: Mutex::new(scheduler),
            wake: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let clock: Arc<dyn Clock> = Arc::new(clock);

        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn({
                let shared = Arc::clone(&shared);
                let clock = Arc::clone(&clock);
                move || run(&shared, clock.as_ref())
            })
            .context("failed to spawn tick thread")?;
        log::debug!("{THREAD_NAME}: spawned");

        Ok(Self {
            shared,
            clock,
            handle: Some(handle),
        })
    }

    /// Current time on the runtime's clock.
    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn play(
        &self,
        animation_id: AnimationId,
        animation: &Animation,
        tracks: &[Track],
        transform: &TransformSpec,
    ) -> Result<usize, MotionError> {
        let count = {
            let mut s = self.shared.lock();
            s.play(animation_id, animation, tracks, transform, self.now())?
        };
        self.shared.wake.notify_all();
        Ok(count)
    }

    pub fn pause(&self, animation_id: &AnimationId) -> bool {
        self.shared.lock().pause(animation_id, self.now())
    }

    pub fn resume(&self, animation_id: &AnimationId) -> bool {
        self.shared.lock().resume(animation_id, self.now())
    }

    pub fn stop(&self, animation_id: &AnimationId) -> bool {
        self.shared.lock().stop(animation_id)
    }

    pub fn stop_all(&self) -> usize {
        self.shared.lock().stop_all()
    }

    pub fn set_tick_rate(&self, updates_per_second: f64) -> Result<(), ValidationError> {
        self.shared.lock().set_tick_rate(updates_per_second)?;
        self.shared.wake.notify_all();
        Ok(())
    }

    pub fn status(&self) -> SchedulerStatus {
        self.shared.lock().status()
    }

    pub fn instance_states(&self, animation_id: &AnimationId) -> Vec<InstanceState> {
        self.shared.lock().instance_states(animation_id, self.now())
    }

    /// Apply a host command at the current clock time.
    pub fn apply(&self, command: Command) -> Result<(), MotionError> {
        self.shared.lock().apply(command, self.now())?;
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Run `f` with exclusive access to the scheduler, between ticks.
    pub fn with_scheduler_mut<R>(&self, f: impl FnOnce(&mut Scheduler<D>) -> R) -> R {
        f(&mut self.shared.lock())
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the driver thread and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        {
            // Set under the lock so the thread cannot miss the wakeup.
            let _guard = self.shared.lock();
            self.shared.shutdown.store(true, Ordering::Release);
        }
        self.shared.wake.notify_all();
        if handle.join().is_err() {
            log::warn!("{THREAD_NAME}: thread panicked");
        }
        log::debug!("{THREAD_NAME}: joined");
    }
}

impl<D: Dispatcher + Send + 'static> Drop for Runtime<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn millis(ms: f64) -> Duration {
    Duration::from_secs_f64(ms.max(0.0) / 1000.0)
}

fn run<D: Dispatcher>(shared: &Shared<D>, clock: &dyn Clock) {
    let mut guard = shared.lock();
    'outer: loop {
        if shared.is_shutdown() {
            break;
        }
        if !guard.is_running() {
            if !guard.dispatcher_mut().flush() {
                guard = shared
                    .wake
                    .wait_timeout(guard, FLUSH_RETRY)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
                continue;
            }
            log::debug!("{THREAD_NAME}: idle");
            guard = shared.wake.wait(guard).unwrap_or_else(PoisonError::into_inner);
            continue;
        }

        let now = clock.now_ms();
        let report = guard.tick(now);
        let interval = guard.tick_interval();
        let budget = interval * guard.config().overrun_warning_ratio;
        let spent = report.compute_time.as_secs_f64() * 1000.0;
        if spent > budget {
            log::warn!(
                "{THREAD_NAME}: tick at {now:.1} took {spent:.2} ms ({} instances, period {interval:.2} ms)",
                report.active + report.completed + report.failed
            );
        }

        // Release the lock while waiting so commands can run between ticks.
        let deadline = now + interval;
        loop {
            let remaining = deadline - clock.now_ms();
            if remaining <= 0.0 {
                break;
            }
            guard = shared
                .wake
                .wait_timeout(guard, millis(remaining))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            if shared.is_shutdown() {
                break 'outer;
            }
            if !guard.is_running() {
                break;
            }
        }
    }
    log::debug!("{THREAD_NAME}: exiting");
}
