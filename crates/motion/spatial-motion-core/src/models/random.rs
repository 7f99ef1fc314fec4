//! Seeded random walk.
//!
//! The walk is drawn once, when instances are built, and stored in the
//! parameter bag as `waypoints`: offsets from `center`, one every
//! `1 / updateFrequency` seconds. Evaluation only interpolates between the
//! two waypoints bracketing the local time, so the same time always yields
//! the same position.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::{Keyframe, ParamValue, Parameters};
use crate::error::{MotionError, ValidationError};
use crate::models::{Anchor, MotionModel, Sample};
use crate::position::Position;

#[derive(Debug)]
pub struct RandomWalk;

/// Upper bound on the number of waypoints a single walk may hold.
pub const MAX_WAYPOINTS: usize = 1_000_000;

impl RandomWalk {
    const TAG: &'static str = "random";
    const BOUNDS: Position = Position::new(2.0, 2.0, 0.0);
}

/// Waypoint count needed to cover `duration` at `frequency` per second, or
/// `None` past `MAX_WAYPOINTS`.
fn waypoint_count(duration: f64, frequency: f64) -> Option<usize> {
    let steps = (duration * frequency).ceil();
    if !(steps.is_finite() && steps < MAX_WAYPOINTS as f64) {
        return None;
    }
    Some((steps.max(0.0) as usize).saturating_add(1).max(2))
}

fn checked_waypoint_count(duration: f64, frequency: f64) -> Result<usize, ValidationError> {
    waypoint_count(duration, frequency).ok_or_else(|| {
        ValidationError::invalid(
            RandomWalk::TAG,
            "updateFrequency",
            format!(
                "duration * updateFrequency must stay below {MAX_WAYPOINTS} waypoints (got {duration} s at {frequency} Hz)"
            ),
        )
    })
}

fn axis(rng: &mut StdRng, half_extent: f64) -> f64 {
    if half_extent > 0.0 {
        rng.random_range(-half_extent..=half_extent)
    } else {
        0.0
    }
}

/// Draw a walk of `count` offsets within `bounds`; the first is always the
/// origin so the walk starts on `center`.
pub fn generate_waypoints(bounds: Position, count: usize, seed: u64) -> Vec<Position> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(count);
    out.push(Position::ORIGIN);
    for _ in 1..count {
        out.push(Position::new(
            axis(&mut rng, bounds.x),
            axis(&mut rng, bounds.y),
            axis(&mut rng, bounds.z),
        ));
    }
    out
}

impl MotionModel for RandomWalk {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(
        &self,
        params: &Parameters,
        _: &[Keyframe],
        duration: f64,
    ) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("center", Position::ORIGIN)?;
        let b = r.position("bounds", Self::BOUNDS)?;
        if b.x < 0.0 || b.y < 0.0 || b.z < 0.0 {
            return Err(ValidationError::invalid(
                Self::TAG,
                "bounds",
                "half-extents must be >= 0",
            ));
        }
        let frequency =
            r.number_where("updateFrequency", 1.0, "updateFrequency > 0", |v| v > 0.0)?;
        if !params.contains("waypoints") {
            checked_waypoint_count(duration, frequency)?;
        }
        if params.contains("seed") {
            r.number_where("seed", 0.0, "seed >= 0", |v| v >= 0.0)?;
        }
        if params.contains("waypoints") && r.points("waypoints")?.is_empty() {
            return Err(ValidationError::invalid(
                Self::TAG,
                "waypoints",
                "at least 1 waypoint is required",
            ));
        }
        Ok(())
    }

    fn materialize(
        &self,
        params: &mut Parameters,
        duration: f64,
        seed: u64,
    ) -> Result<(), ValidationError> {
        if params.contains("waypoints") {
            return Ok(());
        }
        let r = params.reader(Self::TAG);
        let bounds = r.position("bounds", Self::BOUNDS)?;
        let frequency = r.number("updateFrequency", 1.0)?;
        let seed = if params.contains("seed") {
            r.number("seed", 0.0)? as u64
        } else {
            seed
        };
        let count = checked_waypoint_count(duration, frequency)?;
        let walk = generate_waypoints(bounds, count, seed);
        log::trace!("random walk: {} waypoints, seed {seed}", walk.len());
        params.set("waypoints", ParamValue::Points(walk));
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let center = r.position("center", Position::ORIGIN)?;
        let walk = r.points("waypoints")?;
        let Some(last) = walk.len().checked_sub(1) else {
            return Err(ValidationError::invalid(
                Self::TAG,
                "waypoints",
                "at least 1 waypoint is required",
            )
            .into());
        };
        let scaled = sample.time * r.number("updateFrequency", 1.0)?;
        let i = (scaled.floor() as usize).min(last);
        let j = (i + 1).min(last);
        let offset = walk[i].lerp(&walk[j], (scaled - i as f64).clamp(0.0, 1.0));
        Ok(center + offset)
    }

    fn anchors(&self) -> &'static [Anchor] {
        &[Anchor {
            param: "center",
            default: Position::ORIGIN,
            carry: &[],
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Animation;
    use crate::models::MotionRegistry;

    fn walk(seed: u64) -> Animation {
        let reg = MotionRegistry::with_builtin();
        let mut anim = Animation::new("r", "random", 5.0);
        reg.validate(&anim).unwrap();
        reg.materialize(&mut anim, seed).unwrap();
        anim
    }

    #[test]
    fn same_seed_same_walk() {
        assert_eq!(walk(7).parameters, walk(7).parameters);
        assert_ne!(walk(7).parameters, walk(8).parameters);
    }

    #[test]
    fn evaluation_is_repeatable_and_bounded() {
        let reg = MotionRegistry::with_builtin();
        let anim = walk(42);
        assert_eq!(reg.evaluate(&anim, 0.0).unwrap(), Position::ORIGIN);
        for i in 0..=50 {
            let t = i as f64 * 0.1;
            let a = reg.evaluate(&anim, t).unwrap();
            assert_eq!(a, reg.evaluate(&anim, t).unwrap());
            assert!(a.x.abs() <= 2.0 && a.y.abs() <= 2.0 && a.z == 0.0);
        }
    }

    #[test]
    fn explicit_seed_overrides_instance_seed() {
        let reg = MotionRegistry::with_builtin();
        let base = Animation::new("r", "random", 3.0)
            .with_parameters(Parameters::new().with("seed", 11.0));
        let mut a = base.clone();
        let mut b = base;
        reg.materialize(&mut a, 1).unwrap();
        reg.materialize(&mut b, 2).unwrap();
        assert_eq!(a.parameters, b.parameters);
    }

    #[test]
    fn unmaterialized_walk_is_missing_waypoints() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("r", "random", 3.0);
        assert!(matches!(
            reg.evaluate(&anim, 1.0),
            Err(MotionError::Validation(ValidationError::MissingParameter { .. }))
        ));
    }

    #[test]
    fn covers_the_whole_duration() {
        assert_eq!(waypoint_count(5.0, 1.0), Some(6));
        assert_eq!(waypoint_count(0.1, 1.0), Some(2));
        assert_eq!(waypoint_count(2.5, 2.0), Some(6));
        assert_eq!(waypoint_count(1e30, 1.0), None);
        assert_eq!(waypoint_count(1e6, 1e4), None);
    }

    #[test]
    fn oversized_walk_is_rejected_before_allocating() {
        let reg = MotionRegistry::with_builtin();
        for anim in [
            Animation::new("r", "random", 1e30),
            Animation::new("r", "random", 1e6)
                .with_parameters(Parameters::new().with("updateFrequency", 1e4)),
        ] {
            assert!(matches!(
                reg.validate(&anim),
                Err(ValidationError::InvalidParameter { ref name, .. }) if name == "updateFrequency"
            ));
            let mut raw = anim.clone();
            assert!(reg.materialize(&mut raw, 3).is_err());
        }
    }

    #[test]
    fn supplied_waypoints_skip_the_size_check() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("r", "random", 1e30).with_parameters(
            Parameters::new().with("waypoints", ParamValue::Points(vec![Position::ORIGIN])),
        );
        reg.validate(&anim).unwrap();
    }
}
