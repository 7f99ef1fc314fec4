//! Motion model registry.
//!
//! A model is a pure, total function of (parameters, local time, duration)
//! to a position. The registry only dispatches by type tag; every model owns
//! its parameter validation and declares which parameters are anchored to a
//! track's starting point for the relative and formation transforms.
//!
//! Randomness never happens at evaluation time: models that need it write a
//! pre-computed sequence into the parameter bag in `materialize`, which runs
//! once when instances are built.

pub mod curves;
pub mod easing;
pub mod oscillators;
pub mod paths;
pub mod physics;
pub mod random;

use std::fmt;

use hashbrown::HashMap;

use crate::data::{Animation, Keyframe, ParamReader, Parameters};
use crate::error::{ComputationError, MotionError, ValidationError};
use crate::position::Position;

/// Everything a model sees when evaluating one position.
#[derive(Clone, Copy)]
pub struct Sample<'a> {
    pub model: &'a str,
    pub params: &'a Parameters,
    pub keyframes: &'a [Keyframe],
    /// Local time in seconds, within `[0, duration]`.
    pub time: f64,
    pub duration: f64,
}

impl<'a> Sample<'a> {
    #[inline]
    pub fn progress(&self) -> f64 {
        (self.time / self.duration).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn reader(&self) -> ParamReader<'a> {
        self.params.reader(self.model)
    }
}

/// A point-valued parameter that follows a track's starting point.
///
/// When rebased, `param` moves to the target and every `carry` parameter is
/// translated by the same delta so the shape of the path is preserved.
/// `MotionRegistry::rebase` only touches parameters still at their default;
/// `MotionRegistry::recenter` moves them unconditionally.
#[derive(Debug)]
pub struct Anchor {
    pub param: &'static str,
    pub default: Position,
    pub carry: &'static [(&'static str, Position)],
}

pub trait MotionModel: Send + Sync + fmt::Debug {
    fn type_tag(&self) -> &'static str;

    fn validate(
        &self,
        params: &Parameters,
        keyframes: &[Keyframe],
        duration: f64,
    ) -> Result<(), ValidationError>;

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError>;

    fn anchors(&self) -> &'static [Anchor] {
        &[]
    }

    /// Write any time-dependent randomness into `params`.
    fn materialize(
        &self,
        _params: &mut Parameters,
        _duration: f64,
        _seed: u64,
    ) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Tag → model table.
#[derive(Debug)]
pub struct MotionRegistry {
    models: HashMap<&'static str, Box<dyn MotionModel>>,
}

impl Default for MotionRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl MotionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Registry with every built-in model.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(paths::Linear));
        reg.register(Box::new(curves::Circular));
        reg.register(Box::new(curves::Elliptical));
        reg.register(Box::new(curves::Spiral));
        reg.register(Box::new(curves::RoseCurve));
        reg.register(Box::new(curves::Epicycloid));
        reg.register(Box::new(oscillators::Lissajous));
        reg.register(Box::new(oscillators::Wave));
        reg.register(Box::new(oscillators::Zigzag));
        reg.register(Box::new(physics::Pendulum));
        reg.register(Box::new(physics::Spring));
        reg.register(Box::new(physics::Bounce));
        reg.register(Box::new(paths::Bezier));
        reg.register(Box::new(paths::CatmullRom));
        reg.register(Box::new(paths::Custom));
        reg.register(Box::new(random::RandomWalk));
        reg
    }

    /// Register (or replace) a model under its type tag.
    pub fn register(&mut self, model: Box<dyn MotionModel>) {
        self.models.insert(model.type_tag(), model);
    }

    pub fn get(&self, tag: &str) -> Result<&dyn MotionModel, ValidationError> {
        self.models
            .get(tag)
            .map(|m| m.as_ref())
            .ok_or_else(|| ValidationError::UnknownModelType {
                model: tag.to_string(),
            })
    }

    pub fn type_tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.models.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Full validation of a definition: timing flags, keyframes and model
    /// parameters.
    pub fn validate(&self, anim: &Animation) -> Result<(), ValidationError> {
        anim.validate_basic()?;
        self.get(&anim.model)?
            .validate(&anim.parameters, &anim.keyframes, anim.duration)
    }

    /// Pre-compute randomness for `anim` in place.
    pub fn materialize(&self, anim: &mut Animation, seed: u64) -> Result<(), ValidationError> {
        let model = self.get(&anim.model)?;
        model.materialize(&mut anim.parameters, anim.duration, seed)
    }

    /// Move the anchor parameters of `anim` that are still at their default
    /// onto `target`. Returns the number of anchors moved.
    pub fn rebase(&self, anim: &mut Animation, target: Position) -> Result<usize, ValidationError> {
        self.move_anchors(anim, target, false)
    }

    /// Move every anchor of `anim` onto `target`, explicit values included,
    /// and translate the carried points with it.
    pub fn recenter(&self, anim: &mut Animation, target: Position) -> Result<usize, ValidationError> {
        self.move_anchors(anim, target, true)
    }

    fn move_anchors(
        &self,
        anim: &mut Animation,
        target: Position,
        force: bool,
    ) -> Result<usize, ValidationError> {
        let model = self.get(&anim.model)?;
        let mut moved = 0;
        for anchor in model.anchors() {
            let current = anim
                .parameters
                .reader(model.type_tag())
                .position(anchor.param, anchor.default)?;
            if !force && current != anchor.default {
                continue;
            }
            let delta = target - current;
            anim.parameters.set(anchor.param, target);
            for (name, default) in anchor.carry {
                let value = anim
                    .parameters
                    .reader(model.type_tag())
                    .position(name, *default)?;
                if force || value == *default {
                    anim.parameters.set(name, value + delta);
                }
            }
            moved += 1;
        }
        Ok(moved)
    }

    /// Evaluate `anim` at `local_time`. Non-finite results are reported as
    /// computation errors.
    pub fn evaluate(&self, anim: &Animation, local_time: f64) -> Result<Position, MotionError> {
        let model = self.get(&anim.model)?;
        let sample = Sample {
            model: model.type_tag(),
            params: &anim.parameters,
            keyframes: &anim.keyframes,
            time: local_time.clamp(0.0, anim.duration),
            duration: anim.duration,
        };
        let pos = model.position(&sample)?;
        if !pos.is_finite() {
            return Err(ComputationError::NonFinite {
                model: anim.model.clone(),
                time: local_time,
            }
            .into());
        }
        Ok(pos)
    }
}

/// Angular sweep direction shared by the curve models.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    Counterclockwise,
}

impl Direction {
    pub(crate) fn read(r: &ParamReader<'_>, model: &str) -> Result<Self, ValidationError> {
        match r.text("direction", "counterclockwise")? {
            "clockwise" => Ok(Direction::Clockwise),
            "counterclockwise" => Ok(Direction::Counterclockwise),
            other => Err(ValidationError::invalid(
                model,
                "direction",
                format!("unknown direction '{other}'"),
            )),
        }
    }

    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Clockwise => -1.0,
            Direction::Counterclockwise => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_is_a_hard_error() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("a", "teleport", 1.0);
        assert_eq!(
            reg.validate(&anim).unwrap_err(),
            ValidationError::UnknownModelType {
                model: "teleport".into()
            }
        );
        assert!(reg.evaluate(&anim, 0.0).is_err());
    }

    #[test]
    fn builtin_tags() {
        let reg = MotionRegistry::with_builtin();
        let tags = reg.type_tags();
        for tag in [
            "linear",
            "circular",
            "elliptical",
            "spiral",
            "rose-curve",
            "epicycloid",
            "lissajous",
            "wave",
            "zigzag",
            "pendulum",
            "spring",
            "bounce",
            "bezier",
            "catmull-rom",
            "custom",
            "random",
        ] {
            assert!(tags.contains(&tag), "missing {tag}");
        }
    }

    #[test]
    fn rebase_moves_only_default_anchors() {
        let reg = MotionRegistry::with_builtin();
        let target = Position::new(5.0, 5.0, 1.0);

        let mut anim = Animation::new("c", "circular", 4.0);
        assert_eq!(reg.rebase(&mut anim, target).unwrap(), 1);
        assert_eq!(
            anim.parameters.reader("circular").position("center", Position::ORIGIN).unwrap(),
            target
        );

        let explicit = Position::new(-1.0, 0.0, 0.0);
        let mut anim = Animation::new("c", "circular", 4.0)
            .with_parameters(Parameters::new().with("center", explicit));
        assert_eq!(reg.rebase(&mut anim, target).unwrap(), 0);
        assert_eq!(
            anim.parameters.reader("circular").position("center", Position::ORIGIN).unwrap(),
            explicit
        );
    }

    #[test]
    fn rebase_carries_linear_end_point() {
        let reg = MotionRegistry::with_builtin();
        let mut anim = Animation::new("l", "linear", 2.0);
        reg.rebase(&mut anim, Position::new(1.0, 1.0, 0.0)).unwrap();
        let r = anim.parameters.reader("linear");
        let start = r.position("startPosition", Position::ORIGIN).unwrap();
        let end = r.position("endPosition", Position::ORIGIN).unwrap();
        assert_eq!(start, Position::new(1.0, 1.0, 0.0));
        assert_eq!(end - start, paths::LINEAR_END - paths::LINEAR_START);
    }

    #[test]
    fn recenter_moves_explicit_anchor_and_carries_shape() {
        let reg = MotionRegistry::with_builtin();
        let start = Position::new(3.0, 0.0, 0.0);
        let end = Position::new(4.0, 2.0, 0.0);
        let mut anim = Animation::new("l", "linear", 2.0).with_parameters(
            Parameters::new()
                .with("startPosition", start)
                .with("endPosition", end),
        );
        let target = Position::new(-1.0, 1.0, 0.0);
        assert_eq!(reg.recenter(&mut anim, target).unwrap(), 1);
        let r = anim.parameters.reader("linear");
        assert_eq!(r.position("startPosition", Position::ORIGIN).unwrap(), target);
        assert_eq!(
            r.position("endPosition", Position::ORIGIN).unwrap(),
            target + (end - start)
        );
    }
}
