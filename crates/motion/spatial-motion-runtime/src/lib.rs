//! Spatial Motion Runtime
//!
//! Runs a `spatial_motion_core::Scheduler` on a dedicated thread at a fixed
//! cadence, paced by a monotonic clock so ticks keep flowing when the host's
//! UI thread is busy or backgrounded.

pub mod clock;
pub mod dispatch;
pub mod driver;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use dispatch::{ChannelDispatcher, DEFAULT_CAPACITY};
pub use driver::Runtime;
