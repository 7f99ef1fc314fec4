//! Easing curves applied to normalized progress.

use std::f64::consts::PI;

use crate::data::ParamReader;
use crate::error::ValidationError;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    SineIn,
    SineOut,
    SineInOut,
}

impl Easing {
    pub fn parse(s: &str) -> Option<Easing> {
        Some(match s {
            "linear" => Easing::Linear,
            "ease-in" => Easing::EaseIn,
            "ease-out" => Easing::EaseOut,
            "ease-in-out" => Easing::EaseInOut,
            "sine-in" => Easing::SineIn,
            "sine-out" => Easing::SineOut,
            "sine-in-out" => Easing::SineInOut,
            _ => return None,
        })
    }

    pub(crate) fn read(r: &ParamReader<'_>, model: &str) -> Result<Easing, ValidationError> {
        let raw = r.text("easing", "linear")?;
        Easing::parse(raw).ok_or_else(|| {
            ValidationError::invalid(model, "easing", format!("unknown easing '{raw}'"))
        })
    }

    /// Map `t` in `[0, 1]` through the curve. Endpoints are fixed.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => -(t * PI).cos() / 2.0 + 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for e in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::SineIn,
            Easing::SineOut,
            Easing::SineInOut,
        ] {
            assert!(e.apply(0.0).abs() < 1e-12, "{e:?} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-12, "{e:?} at 1");
        }
    }

    #[test]
    fn shapes() {
        assert!(Easing::EaseIn.apply(0.5) < 0.5);
        assert!(Easing::EaseOut.apply(0.5) > 0.5);
        assert_eq!(Easing::EaseInOut.apply(0.5), 0.5);
        assert_eq!(Easing::parse("bogus"), None);
    }
}
