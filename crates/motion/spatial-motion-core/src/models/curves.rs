//! Closed parametric curves drawn in a plane around a center point.
//!
//! Angles in parameters are degrees. The curve parameter is
//! `progress * sweep`, where the sweep defaults to a full turn.

use std::f64::consts::TAU;

use crate::data::{Keyframe, ParamReader, Parameters};
use crate::error::{MotionError, ValidationError};
use crate::models::{Anchor, Direction, MotionModel, Sample};
use crate::position::{Plane, Position};

const CENTER_ANCHOR: &[Anchor] = &[Anchor {
    param: "center",
    default: Position::ORIGIN,
    carry: &[],
}];

fn positive(v: f64) -> bool {
    v > 0.0
}

/// Angle in radians swept from `start` toward `end` (degrees) at `progress`.
fn sweep_angle(start_deg: f64, end_deg: f64, direction: Direction, progress: f64) -> f64 {
    let start = start_deg.to_radians();
    let sweep = (end_deg - start_deg).to_radians();
    start + direction.sign() * sweep * progress
}

#[derive(Debug)]
pub struct Circular;

struct CircularParams {
    center: Position,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    direction: Direction,
    plane: Plane,
}

impl Circular {
    const TAG: &'static str = "circular";

    fn read(r: &ParamReader<'_>) -> Result<CircularParams, ValidationError> {
        Ok(CircularParams {
            center: r.position("center", Position::ORIGIN)?,
            radius: r.number_where("radius", 2.0, "radius > 0", positive)?,
            start_angle: r.number("startAngle", 0.0)?,
            end_angle: r.number("endAngle", 360.0)?,
            direction: Direction::read(r, Self::TAG)?,
            plane: r.plane("plane")?,
        })
    }
}

impl MotionModel for Circular {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        Self::read(&params.reader(Self::TAG)).map(|_| ())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let p = Self::read(&sample.reader())?;
        let a = sweep_angle(p.start_angle, p.end_angle, p.direction, sample.progress());
        Ok(p.plane.embed(p.center, p.radius * a.cos(), p.radius * a.sin()))
    }

    fn anchors(&self) -> &'static [Anchor] {
        CENTER_ANCHOR
    }
}

#[derive(Debug)]
pub struct Elliptical;

impl Elliptical {
    const TAG: &'static str = "elliptical";
}

impl MotionModel for Elliptical {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.number_where("radiusX", 3.0, "radiusX > 0", positive)?;
        r.number_where("radiusY", 2.0, "radiusY > 0", positive)?;
        r.number("rotation", 0.0)?;
        r.position("center", Position::ORIGIN)?;
        r.number("startAngle", 0.0)?;
        r.number("endAngle", 360.0)?;
        Direction::read(&r, Self::TAG)?;
        r.plane("plane")?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let center = r.position("center", Position::ORIGIN)?;
        let rx = r.number_where("radiusX", 3.0, "radiusX > 0", positive)?;
        let ry = r.number_where("radiusY", 2.0, "radiusY > 0", positive)?;
        let rot = r.number("rotation", 0.0)?.to_radians();
        let a = sweep_angle(
            r.number("startAngle", 0.0)?,
            r.number("endAngle", 360.0)?,
            Direction::read(&r, Self::TAG)?,
            sample.progress(),
        );
        let (u, v) = (rx * a.cos(), ry * a.sin());
        let (s, c) = rot.sin_cos();
        Ok(r.plane("plane")?.embed(center, u * c - v * s, u * s + v * c))
    }

    fn anchors(&self) -> &'static [Anchor] {
        CENTER_ANCHOR
    }
}

#[derive(Debug)]
pub struct Spiral;

impl Spiral {
    const TAG: &'static str = "spiral";
}

impl MotionModel for Spiral {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("center", Position::ORIGIN)?;
        r.number_where("startRadius", 0.5, "startRadius >= 0", |v| v >= 0.0)?;
        r.number_where("endRadius", 3.0, "endRadius >= 0", |v| v >= 0.0)?;
        r.number_where("rotations", 3.0, "rotations > 0", positive)?;
        Direction::read(&r, Self::TAG)?;
        r.plane("plane")?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let p = sample.progress();
        let r0 = r.number("startRadius", 0.5)?;
        let r1 = r.number("endRadius", 3.0)?;
        let turns = r.number("rotations", 3.0)?;
        let dir = Direction::read(&r, Self::TAG)?;
        let radius = r0 + (r1 - r0) * p;
        let a = dir.sign() * turns * TAU * p;
        Ok(r.plane("plane")?.embed(
            r.position("center", Position::ORIGIN)?,
            radius * a.cos(),
            radius * a.sin(),
        ))
    }

    fn anchors(&self) -> &'static [Anchor] {
        CENTER_ANCHOR
    }
}

/// Rhodonea curve `r = R cos(kθ)`.
#[derive(Debug)]
pub struct RoseCurve;

impl RoseCurve {
    const TAG: &'static str = "rose-curve";
}

impl MotionModel for RoseCurve {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("center", Position::ORIGIN)?;
        r.number_where("radius", 2.0, "radius > 0", positive)?;
        r.number_where("petalCount", 4.0, "petalCount >= 1", |v| v >= 1.0)?;
        r.number("rotation", 0.0)?;
        r.plane("plane")?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let radius = r.number("radius", 2.0)?;
        let k = r.number("petalCount", 4.0)?;
        let theta = TAU * sample.progress();
        let rho = radius * (k * theta).cos();
        let a = theta + r.number("rotation", 0.0)?.to_radians();
        Ok(r.plane("plane")?.embed(
            r.position("center", Position::ORIGIN)?,
            rho * a.cos(),
            rho * a.sin(),
        ))
    }

    fn anchors(&self) -> &'static [Anchor] {
        CENTER_ANCHOR
    }
}

/// Path of a point on a circle rolling around the outside of a fixed circle.
#[derive(Debug)]
pub struct Epicycloid;

impl Epicycloid {
    const TAG: &'static str = "epicycloid";
}

impl MotionModel for Epicycloid {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("center", Position::ORIGIN)?;
        r.number_where("fixedRadius", 2.0, "fixedRadius > 0", positive)?;
        r.number_where("rollingRadius", 0.5, "rollingRadius > 0", positive)?;
        r.number_where("speed", 1.0, "speed > 0", positive)?;
        r.plane("plane")?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let big = r.number("fixedRadius", 2.0)?;
        let small = r.number("rollingRadius", 0.5)?;
        let theta = TAU * r.number("speed", 1.0)? * sample.progress();
        let ratio = (big + small) / small;
        let u = (big + small) * theta.cos() - small * (ratio * theta).cos();
        let v = (big + small) * theta.sin() - small * (ratio * theta).sin();
        Ok(r.plane("plane")?.embed(r.position("center", Position::ORIGIN)?, u, v))
    }

    fn anchors(&self) -> &'static [Anchor] {
        CENTER_ANCHOR
    }
}
