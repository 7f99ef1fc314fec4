//! Damped physical analogues evaluated in closed form at local time, so a
//! position depends only on `t` and never on the previous tick.

use crate::data::{Keyframe, Parameters};
use crate::error::{MotionError, ValidationError};
use crate::models::{Anchor, MotionModel, Sample};
use crate::position::{Plane, Position};

const STANDARD_GRAVITY: f64 = 9.81;

/// Damped small-angle pendulum hanging from `anchorPoint`.
#[derive(Debug)]
pub struct Pendulum;

impl Pendulum {
    const TAG: &'static str = "pendulum";
    const ANCHOR: Position = Position::new(0.0, 0.0, 3.0);
}

/// Swing angle (radians) at time `t` for a pendulum released at rest.
pub fn pendulum_angle(initial: f64, length: f64, gravity: f64, damping: f64, t: f64) -> f64 {
    let omega = (gravity / length).sqrt();
    initial * (-damping * t).exp() * (omega * t).cos()
}

impl MotionModel for Pendulum {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("anchorPoint", Self::ANCHOR)?;
        r.number_where("length", 2.0, "length > 0", |v| v > 0.0)?;
        r.number_where("initialAngle", 45.0, "|initialAngle| <= 180", |v| v.abs() <= 180.0)?;
        r.number_where("damping", 0.1, "damping >= 0", |v| v >= 0.0)?;
        r.number_where("gravity", STANDARD_GRAVITY, "gravity > 0", |v| v > 0.0)?;
        r.plane_or("plane", Plane::Xz)?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let length = r.number("length", 2.0)?;
        let theta = pendulum_angle(
            r.number("initialAngle", 45.0)?.to_radians(),
            length,
            r.number("gravity", STANDARD_GRAVITY)?,
            r.number("damping", 0.1)?,
            sample.time,
        );
        // Hangs along the negative second axis of the plane.
        let plane = r.plane_or("plane", Plane::Xz)?;
        let anchor = r.position("anchorPoint", Self::ANCHOR)?;
        Ok(plane.embed(anchor, length * theta.sin(), -length * theta.cos()))
    }

    fn anchors(&self) -> &'static [Anchor] {
        &[Anchor {
            param: "anchorPoint",
            default: Self::ANCHOR,
            carry: &[],
        }]
    }
}

/// Mass on a spring released from `restPosition + initialDisplacement`.
#[derive(Debug)]
pub struct Spring;

impl Spring {
    const TAG: &'static str = "spring";
    const DISPLACEMENT: Position = Position::new(2.0, 0.0, 0.0);
}

/// Normalized displacement `x(t)/x(0)` of a damped oscillator released at
/// rest. Handles the under-, critically and over-damped regimes.
pub fn spring_response(stiffness: f64, damping: f64, mass: f64, t: f64) -> f64 {
    let omega0 = (stiffness / mass).sqrt();
    let zeta = damping / (2.0 * (stiffness * mass).sqrt());
    if (zeta - 1.0).abs() < 1e-9 {
        (-omega0 * t).exp() * (1.0 + omega0 * t)
    } else if zeta < 1.0 {
        let wd = omega0 * (1.0 - zeta * zeta).sqrt();
        (-zeta * omega0 * t).exp() * ((wd * t).cos() + (zeta * omega0 / wd) * (wd * t).sin())
    } else {
        let root = (zeta * zeta - 1.0).sqrt();
        let r1 = -omega0 * (zeta - root);
        let r2 = -omega0 * (zeta + root);
        (r2 * (r1 * t).exp() - r1 * (r2 * t).exp()) / (r2 - r1)
    }
}

impl MotionModel for Spring {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("restPosition", Position::ORIGIN)?;
        r.position("initialDisplacement", Self::DISPLACEMENT)?;
        r.number_where("stiffness", 10.0, "stiffness > 0", |v| v > 0.0)?;
        r.number_where("damping", 0.5, "damping >= 0", |v| v >= 0.0)?;
        r.number_where("mass", 1.0, "mass > 0", |v| v > 0.0)?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let f = spring_response(
            r.number("stiffness", 10.0)?,
            r.number("damping", 0.5)?,
            r.number("mass", 1.0)?,
            sample.time,
        );
        let rest = r.position("restPosition", Position::ORIGIN)?;
        Ok(rest + r.position("initialDisplacement", Self::DISPLACEMENT)? * f)
    }

    fn anchors(&self) -> &'static [Anchor] {
        &[Anchor {
            param: "restPosition",
            default: Position::ORIGIN,
            carry: &[],
        }]
    }
}

/// Ball dropped from `startHeight` above `groundPosition`, losing energy on
/// each impact according to `restitution`.
#[derive(Debug)]
pub struct Bounce;

impl Bounce {
    const TAG: &'static str = "bounce";
    const MAX_BOUNCES: usize = 64;
}

/// Height above ground at time `t`.
pub fn bounce_height(start_height: f64, restitution: f64, gravity: f64, t: f64) -> f64 {
    let fall = (2.0 * start_height / gravity).sqrt();
    if t < fall {
        return start_height - 0.5 * gravity * t * t;
    }
    let mut rest = t - fall;
    let mut speed = restitution * gravity * fall;
    for _ in 0..Bounce::MAX_BOUNCES {
        if speed <= 1e-6 {
            break;
        }
        let flight = 2.0 * speed / gravity;
        if rest < flight {
            return (speed * rest - 0.5 * gravity * rest * rest).max(0.0);
        }
        rest -= flight;
        speed *= restitution;
    }
    0.0
}

impl MotionModel for Bounce {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn validate(&self, params: &Parameters, _: &[Keyframe], _: f64) -> Result<(), ValidationError> {
        let r = params.reader(Self::TAG);
        r.position("groundPosition", Position::ORIGIN)?;
        r.number_where("startHeight", 3.0, "startHeight > 0", |v| v > 0.0)?;
        r.number_where("restitution", 0.7, "0 <= restitution < 1", |v| {
            (0.0..1.0).contains(&v)
        })?;
        r.number_where("gravity", STANDARD_GRAVITY, "gravity > 0", |v| v > 0.0)?;
        Ok(())
    }

    fn position(&self, sample: &Sample<'_>) -> Result<Position, MotionError> {
        let r = sample.reader();
        let h = bounce_height(
            r.number("startHeight", 3.0)?,
            r.number("restitution", 0.7)?,
            r.number("gravity", STANDARD_GRAVITY)?,
            sample.time,
        );
        Ok(r.position("groundPosition", Position::ORIGIN)? + Position::new(0.0, 0.0, h))
    }

    fn anchors(&self) -> &'static [Anchor] {
        &[Anchor {
            param: "groundPosition",
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
    use approx::assert_relative_eq;

    #[test]
    fn spring_starts_displaced_and_settles() {
        for damping in [0.5, 2.0 * 10f64.sqrt(), 20.0] {
            assert_relative_eq!(spring_response(10.0, damping, 1.0, 0.0), 1.0, epsilon = 1e-12);
            assert!(spring_response(10.0, damping, 1.0, 60.0).abs() < 1e-3, "c={damping}");
        }
    }

    #[test]
    fn spring_regimes_are_continuous_near_critical() {
        let crit = 2.0 * 10f64.sqrt();
        let a = spring_response(10.0, crit - 1e-6, 1.0, 0.7);
        let b = spring_response(10.0, crit, 1.0, 0.7);
        let c = spring_response(10.0, crit + 1e-6, 1.0, 0.7);
        assert_relative_eq!(a, b, epsilon = 1e-4);
        assert_relative_eq!(b, c, epsilon = 1e-4);
    }

    #[test]
    fn pendulum_hangs_length_below_anchor() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("p", "pendulum", 10.0);
        for i in 0..=20 {
            let p = reg.evaluate(&anim, i as f64 * 0.5).unwrap();
            assert_relative_eq!(p.distance(&Pendulum::ANCHOR), 2.0, epsilon = 1e-9);
            assert!(p.z < Pendulum::ANCHOR.z);
        }
    }

    #[test]
    fn bounce_lands_and_decays() {
        let g = STANDARD_GRAVITY;
        assert_relative_eq!(bounce_height(3.0, 0.7, g, 0.0), 3.0);
        let fall = (6.0 / g).sqrt();
        assert!(bounce_height(3.0, 0.7, g, fall).abs() < 1e-9);
        // Apex of the first rebound is restitution^2 of the drop height.
        let v = 0.7 * g * fall;
        let apex = bounce_height(3.0, 0.7, g, fall + v / g);
        assert_relative_eq!(apex, 3.0 * 0.49, epsilon = 1e-9);
        assert_eq!(bounce_height(3.0, 0.7, g, 1_000.0), 0.0);
    }

    #[test]
    fn bounce_rejects_elastic_restitution() {
        let reg = MotionRegistry::with_builtin();
        let anim = Animation::new("b", "bounce", 5.0)
            .with_parameters(Parameters::new().with("restitution", 1.0));
        assert!(reg.validate(&anim).is_err());
    }
}
