//! Periodic per-axis motions: Lissajous figures, waves and zigzags.

use std::f64::consts::TAU;

use crate::data::{Keyframe, Parameters};
use crate::error::{ComputationError, MotionError, ValidationError};
use crate::models::{Anchor, MotionModel, Sample};
use crate::position::{Plane, Position};

const CENTER_ANCHOR: &[Anchor] = &[Anchor {
    param: "center",
    default: Position::ORIGIN,
    carry: &[],
}];

/// Independent sine per axis; frequencies are cycles per animation.
#[derive(Debug)]
pub struct Lissajous;

impl Lissajous {
    const TAG: &'static str = "lissajous";
    const AMPLITUDE: Position = Position::new(2.0, 2.0, 0.0);
}

impl MotionModel for Lissajous {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("center", Position::ORIGIN)?;
        r.position("amplitude", Self::AMPLITUDE)?;
        r.number("frequencyX", 1.0)?;
        r.number("frequencyY", 2.0)?;
        r.number("frequencyZ", 0.0)?;
        r.number("phase", 90.0)?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let a = r.position("amplitude", Self::AMPLITUDE)?;
        let phase = r.number("phase", 90.0)?.to_radians();
        let theta = TAU * sample.progress();
        let wave = Position::new(
            (r.number("frequencyX", 1.0)? * theta + phase).sin(),
            (r.number("frequencyY", 2.0)? * theta).sin(),
            (r.number("frequencyZ", 0.0)? * theta).sin(),
        );
        Ok(r.position("center", Position::ORIGIN)? + a.scale(&wave))
    }

    fn anchors(&self) -> &'static [Anchor] {
        CENTER_ANCHOR
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaveShape {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl WaveShape {
    fn parse(s: &str) -> Option<WaveShape> {
        match s {
            "sine" => Some(WaveShape::Sine),
            "square" => Some(WaveShape::Square),
            "triangle" => Some(WaveShape::Triangle),
            "sawtooth" => Some(WaveShape::Sawtooth),
            _ => None,
        }
    }

    /// Value in `[-1, 1]` for phase `x` measured in cycles.
    pub fn eval(&self, x: f64) -> f64 {
        let frac = x - x.floor();
        match self {
            WaveShape::Sine => (TAU * x).sin(),
            WaveShape::Square => {
                if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveShape::Triangle => 1.0 - 4.0 * ((frac + 0.25) - (frac + 0.25).floor() - 0.5).abs(),
            WaveShape::Sawtooth => 2.0 * frac - 1.0,
        }
    }
}

/// Oscillation around `center`; `frequency` is in Hz of local time.
#[derive(Debug)]
pub struct Wave;

impl Wave {
    const TAG: &'static str = "wave";
    const AMPLITUDE: Position = Position::new(0.0, 0.0, 1.0);

    fn shape(params: &Parameters) -> Result<WaveShape, ValidationError> {
        let raw = params.reader(Self::TAG).text("waveType", "sine")?;
        WaveShape::parse(raw).ok_or_else(|| {
            ValidationError::invalid(Self::TAG, "waveType", format!("unknown wave type '{raw}'"))
        })
    }
}

impl MotionModel for Wave {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("center", Position::ORIGIN)?;
        r.position("amplitude", Self::AMPLITUDE)?;
        r.number_where("frequency", 1.0, "frequency > 0", |v| v > 0.0)?;
        r.number("phase", 0.0)?;
        Self::shape(params)?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let cycles = r.number("frequency", 1.0)? * sample.time + r.number("phase", 0.0)? / 360.0;
        let w = Self::shape(sample.params)?.eval(cycles);
        Ok(r.position("center", Position::ORIGIN)? + r.position("amplitude", Self::AMPLITUDE)? * w)
    }

    fn anchors(&self) -> &'static [Anchor] {
        CENTER_ANCHOR
    }
}

const ZIGZAG_START: Position = Position::new(-3.0, 0.0, 0.0);
const ZIGZAG_END: Position = Position::new(3.0, 0.0, 0.0);

/// Triangle-wave excursion perpendicular to a straight segment.
#[derive(Debug)]
pub struct Zigzag;

impl Zigzag {
    const TAG: &'static str = "zigzag";
}

/// Unit vector perpendicular to `dir` within `plane`, or `None` when `dir`
/// has no extent in that plane.
fn in_plane_normal(plane: Plane, dir: Position) -> Option<Position> {
    let (u, v) = match plane {
        Plane::Xy => (dir.x, dir.y),
        Plane::Xz => (dir.x, dir.z),
        Plane::Yz => (dir.y, dir.z),
    };
    let len = (u * u + v * v).sqrt();
    if len <= f64::EPSILON {
        return None;
    }
    Some(plane.embed(Position::ORIGIN, -v / len, u / len))
}

impl MotionModel for Zigzag {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("zigzagStart", ZIGZAG_START)?;
        r.position("zigzagEnd", ZIGZAG_END)?;
        r.number_where("zigzagCount", 5.0, "zigzagCount >= 1", |v| v >= 1.0)?;
        r.number("amplitude", 1.0)?;
        r.plane("plane")?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let start = r.position("zigzagStart", ZIGZAG_START)?;
        let end = r.position("zigzagEnd", ZIGZAG_END)?;
        let plane = r.plane("plane")?;
        let normal = in_plane_normal(plane, end - start).ok_or_else(|| {
            ComputationError::DegenerateGeometry {
                model: Self::TAG.to_string(),
                reason: "start and end coincide in the zigzag plane".into(),
            }
        })?;
        let p = sample.progress();
        let lateral = WaveShape::Triangle.eval(p * r.number("zigzagCount", 5.0)?);
        Ok(start.lerp(&end, p) + normal * (r.number("amplitude", 1.0)? * lateral))
    }

    fn anchors(&self) -> &'static [Anchor] {
        &[Anchor {
            param: "zigzagStart",
            default: ZIGZAG_START,
            carry: &[("zigzagEnd", ZIGZAG_END)],
        }]
    }
}
