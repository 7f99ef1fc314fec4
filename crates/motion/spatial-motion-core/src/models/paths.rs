//! Point-to-point and control-point paths: linear, cubic Bézier,
//! Catmull-Rom and user keyframes.

use crate::data::{Keyframe, ParamReader, Parameters};
use crate::error::{MotionError, ValidationError};
use crate::models::easing::Easing;
use crate::models::{Anchor, MotionModel, Sample};
use crate::position::Position;

pub const LINEAR_START: Position = Position::new(0.0, 0.0, 0.0);
pub const LINEAR_END: Position = Position::new(5.0, 0.0, 0.0);

#[derive(Debug)]
pub struct Linear;

struct LinearParams {
    start: Position,
    end: Position,
    easing: Easing,
}

impl Linear {
    const TAG: &'static str = "linear";

    fn read(r: &ParamReader<'_>) -> Result<LinearParams, ValidationError> {
        Ok(LinearParams {
            start: r.position("startPosition", LINEAR_START)?,
            end: r.position("endPosition", LINEAR_END)?,
            easing: Easing::read(r, Self::TAG)?,
        })
    }
}

impl MotionModel for Linear {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        Self::read(&params.reader(Self::TAG)).map(|_| ())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let p = Self::read(&sample.reader())?;
        Ok(p.start.lerp(&p.end, p.easing.apply(sample.progress())))
    }

    fn anchors(&self) -> &'static [Anchor] {
        &[Anchor {
            param: "startPosition",
            default: LINEAR_START,
            carry: &[("endPosition", LINEAR_END)],
        }]
    }
}

const BEZIER_START: Position = Position::new(-2.0, 0.0, 0.0);
const BEZIER_C1: Position = Position::new(-1.0, 2.0, 0.0);
const BEZIER_C2: Position = Position::new(1.0, 2.0, 0.0);
const BEZIER_END: Position = Position::new(2.0, 0.0, 0.0);

#[derive(Debug)]
pub struct Bezier;

impl Bezier {
    const TAG: &'static str = "bezier";

    fn read(r: &ParamReader<'_>) -> Result<([Position; 4], Easing), ValidationError> {
        Ok((
            [
                r.position("bezierStart", BEZIER_START)?,
                r.position("bezierControl1", BEZIER_C1)?,
                r.position("bezierControl2", BEZIER_C2)?,
                r.position("bezierEnd", BEZIER_END)?,
            ],
            Easing::read(r, Self::TAG)?,
        ))
    }
}

/// Cubic Bézier point at `t` in `[0, 1]`.
pub fn cubic_bezier(p: &[Position; 4], t: f64) -> Position {
    let u = 1.0 - t;
    p[0] * (u * u * u) + p[1] * (3.0 * u * u * t) + p[2] * (3.0 * u * t * t) + p[3] * (t * t * t)
}

impl MotionModel for Bezier {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        Self::read(&params.reader(Self::TAG)).map(|_| ())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let (points, easing) = Self::read(&sample.reader())?;
        Ok(cubic_bezier(&points, easing.apply(sample.progress())))
    }

    fn anchors(&self) -> &'static [Anchor] {
        &[Anchor {
            param: "bezierStart",
            default: BEZIER_START,
            carry: &[
                ("bezierControl1", BEZIER_C1),
                ("bezierControl2", BEZIER_C2),
                ("bezierEnd", BEZIER_END),
            ],
        }]
    }
}

#[derive(Debug)]
pub struct CatmullRom;

impl CatmullRom {
    const TAG: &'static str = "catmull-rom";

    fn read<'a>(r: &ParamReader<'a>) -> Result<(&'a [Position], f64, bool), ValidationError> {
        let points = r.points("controlPoints")?;
        if points.len() < 2 {
            return Err(ValidationError::invalid(
                Self::TAG,
                "controlPoints",
                "at least 2 points are required",
            ));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(ValidationError::invalid(
                Self::TAG,
                "controlPoints",
                "points must be finite",
            ));
        }
        let tension = r.number_where("tension", 0.0, "0 <= tension <= 1", |v| {
            (0.0..=1.0).contains(&v)
        })?;
        let closed = r.flag("closed", false)?;
        Ok((points, tension, closed))
    }
}

/// Cardinal spline through `points`; tension 0 is the classic Catmull-Rom.
pub fn cardinal_spline(points: &[Position], tension: f64, closed: bool, t: f64) -> Position {
    let n = points.len();
    if n == 1 {
        return points[0];
    }
    let segments = if closed { n } else { n - 1 };
    let scaled = t.clamp(0.0, 1.0) * segments as f64;
    let seg = (scaled.floor() as usize).min(segments - 1);
    let u = scaled - seg as f64;

    let at = |i: isize| -> Position {
        if closed {
            points[i.rem_euclid(n as isize) as usize]
        } else {
            points[i.clamp(0, n as isize - 1) as usize]
        }
    };
    let i = seg as isize;
    let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
    let s = (1.0 - tension) / 2.0;
    let m1 = (p2 - p0) * s;
    let m2 = (p3 - p1) * s;

    let u2 = u * u;
    let u3 = u2 * u;
    let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
    let h10 = u3 - 2.0 * u2 + u;
    let h01 = -2.0 * u3 + 3.0 * u2;
    let h11 = u3 - u2;
    p1 * h00 + m1 * h10 + p2 * h01 + m2 * h11
}

impl MotionModel for CatmullRom {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        Self::read(&params.reader(Self::TAG)).map(|_| ())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let (points, tension, closed) = Self::read(&sample.reader())?;
        Ok(cardinal_spline(points, tension, closed, sample.progress()))
    }
}

/// User-authored keyframes, linearly interpolated on local time.
#[derive(Debug)]
pub struct Custom;

impl Custom {
    const TAG: &'static str = "custom";
}

/// Interpolate between the keyframes bracketing `time`, clamping at the ends.
pub fn interpolate_keyframes(keyframes: &[Keyframe], time: f64) -> Option<Position> {
    let first = keyframes.first()?;
    let last = keyframes.last()?;
    if time <= first.time {
        return Some(first.position);
    }
    if time >= last.time {
        return Some(last.position);
    }
    // First keyframe strictly after `time`; always in 1..len here.
    let hi = keyframes.partition_point(|k| k.time <= time);
    let (a, b) = (&keyframes[hi - 1], &keyframes[hi]);
    let span = b.time - a.time;
    if span <= 0.0 {
        return Some(b.position);
    }
    Some(a.position.lerp(&b.position, (time - a.time) / span))
}

impl MotionModel for Custom {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, _: &Parameters, keyframes: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        if keyframes.is_empty() {
            return Err(ValidationError::InvalidKeyframes {
                reason: "custom animations need at least one keyframe".into(),
            });
        }
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        interpolate_keyframes(sample.keyframes, sample.time).ok_or_else(|| {
            ValidationError::InvalidKeyframes {
                reason: "custom animations need at least one keyframe".into(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Animation;
    use crate::models::MotionRegistry;
    use approx::assert_relative_eq;

    fn kf(time: f64, x: f64) -> Keyframe {
        Keyframe {
            time,
            position: Position::new(x, 0.0, 0.0),
        }
    }

    #[test]
    fn linear_endpoints_and_midpoint() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("l", "linear", 10.0).with_parameters(
            Parameters::new()
                .with("startPosition", Position::new(0.0, 0.0, 0.0))
                .with("endPosition", Position::new(10.0, 0.0, 0.0)),
        );
        assert_eq!(reg.evaluate(&anim, 0.0).unwrap().x, 0.0);
        assert_eq!(reg.evaluate(&anim, 5.0).unwrap().x, 5.0);
        assert_eq!(reg.evaluate(&anim, 10.0).unwrap().x, 10.0);
    }

    #[test]
    fn keyframes_interpolate_and_clamp() {
        let keys = [kf(1.0, 0.0), kf(3.0, 4.0), kf(3.0, 8.0), kf(5.0, 10.0)];
        assert_eq!(interpolate_keyframes(&keys, 0.0).unwrap().x, 0.0);
        assert_eq!(interpolate_keyframes(&keys, 2.0).unwrap().x, 2.0);
        // Coincident keys: the later one wins past the shared time.
        assert_eq!(interpolate_keyframes(&keys, 4.0).unwrap().x, 9.0);
        assert_eq!(interpolate_keyframes(&keys, 9.0).unwrap().x, 10.0);
        assert!(interpolate_keyframes(&[], 1.0).is_none());
    }

    #[test]
    fn custom_requires_keyframes() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("c", "custom", 2.0);
        assert!(matches!(
            reg.validate(&anim),
            Err(ValidationError::InvalidKeyframes { .. })
        ));
    }

    #[test]
    fn bezier_hits_its_endpoints() {
        let pts = [BEZIER_START, BEZIER_C1, BEZIER_C2, BEZIER_END];
        assert_eq!(cubic_bezier(&pts, 0.0), BEZIER_START);
        assert_eq!(cubic_bezier(&pts, 1.0), BEZIER_END);
        assert_relative_eq!(cubic_bezier(&pts, 0.5).y, 1.5);
    }

    #[test]
    fn catmull_rom_passes_through_control_points() {
        let pts = vec![
            Position::new(0.0, 0.0, 0.0),
            Position::new(1.0, 2.0, 0.0),
            Position::new(3.0, 1.0, 0.0),
        ];
        assert_eq!(cardinal_spline(&pts, 0.0, false, 0.0), pts[0]);
        let mid = cardinal_spline(&pts, 0.0, false, 0.5);
        assert_relative_eq!(mid.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(mid.y, 2.0, epsilon = 1e-12);
        assert_eq!(cardinal_spline(&pts, 0.0, false, 1.0), pts[2]);
    }

    #[test]
    fn catmull_rom_needs_two_points() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("s", "catmull-rom", 2.0).with_parameters(
            Parameters::new().with("controlPoints", vec![Position::ORIGIN]),
        );
        assert!(reg.validate(&anim).is_err());
    }
}
