//! Animation definitions, tracks and the per-model parameter bag.
//!
//! An `Animation` is authored by the host and read-only to the engine. Its
//! parameter shape is decided by the model type tag; models read it through
//! `ParamReader`, which applies their defaults and reports type mismatches.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, ValidationError};
use crate::ids::{AnimationId, TrackId};
use crate::position::{Plane, Position};
use crate::timing;

/// One value in a parameter bag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Position(Position),
    Points(Vec<Position>),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "text",
            ParamValue::Position(_) => "position",
            ParamValue::Points(_) => "points",
        }
    }
}

/// Ordered, string-keyed parameter bag.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(pub IndexMap<String, ParamValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.shift_remove(name)
    }

    pub fn reader<'a>(&'a self, model: &'a str) -> ParamReader<'a> {
        ParamReader {
            model,
            params: self,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<Position> for ParamValue {
    fn from(v: Position) -> Self {
        ParamValue::Position(v)
    }
}

impl From<Vec<Position>> for ParamValue {
    fn from(v: Vec<Position>) -> Self {
        ParamValue::Points(v)
    }
}

/// Typed view over a parameter bag for one model.
#[derive(Clone, Copy)]
pub struct ParamReader<'a> {
    model: &'a str,
    params: &'a Parameters,
}

impl<'a> ParamReader<'a> {
    fn mismatch(&self, name: &str, expected: &str, got: &ParamValue) -> ValidationError {
        ValidationError::invalid(
            self.model,
            name,
            format!("expected {expected}, got {}", got.kind()),
        )
    }

    pub fn number(&self, name: &str, default: f64) -> Result<f64, ValidationError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(ParamValue::Number(v)) if v.is_finite() => Ok(*v),
            Some(ParamValue::Number(_)) => {
                Err(ValidationError::invalid(self.model, name, "must be finite"))
            }
            Some(other) => Err(self.mismatch(name, "number", other)),
        }
    }

    /// Number constrained by `check`; `rule` names the constraint in the error.
    pub fn number_where(
        &self,
        name: &str,
        default: f64,
        rule: &str,
        check: impl Fn(f64) -> bool,
    ) -> Result<f64, ValidationError> {
        let v = self.number(name, default)?;
        if check(v) {
            Ok(v)
        } else {
            Err(ValidationError::invalid(
                self.model,
                name,
                format!("{v} violates {rule}"),
            ))
        }
    }

    pub fn flag(&self, name: &str, default: bool) -> Result<bool, ValidationError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(ParamValue::Bool(v)) => Ok(*v),
            Some(other) => Err(self.mismatch(name, "bool", other)),
        }
    }

    pub fn text(&self, name: &str, default: &'a str) -> Result<&'a str, ValidationError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(ParamValue::Text(v)) => Ok(v.as_str()),
            Some(other) => Err(self.mismatch(name, "text", other)),
        }
    }

    pub fn position(&self, name: &str, default: Position) -> Result<Position, ValidationError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(ParamValue::Position(p)) if p.is_finite() => Ok(*p),
            Some(ParamValue::Position(_)) => {
                Err(ValidationError::invalid(self.model, name, "must be finite"))
            }
            Some(other) => Err(self.mismatch(name, "position", other)),
        }
    }

    /// Required list of points.
    pub fn points(&self, name: &str) -> Result<&'a [Position], ValidationError> {
        match self.params.get(name) {
            None => Err(ValidationError::MissingParameter {
                model: self.model.to_string(),
                name: name.to_string(),
            }),
            Some(ParamValue::Points(v)) => Ok(v.as_slice()),
            Some(other) => Err(self.mismatch(name, "points", other)),
        }
    }

    /// Plane parameter, defaulting to `xy`.
    pub fn plane(&self, name: &str) -> Result<Plane, ValidationError> {
        self.plane_or(name, Plane::Xy)
    }

    pub fn plane_or(&self, name: &str, default: Plane) -> Result<Plane, ValidationError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(ParamValue::Text(raw)) => Plane::parse(raw).ok_or_else(|| {
                ValidationError::invalid(self.model, name, format!("unknown plane '{raw}'"))
            }),
            Some(other) => Err(self.mismatch(name, "text", other)),
        }
    }
}

/// A (time, position) pair for the keyframe model. `time` is in seconds of
/// animation-local time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub position: Position,
}

/// Immutable animation definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub id: AnimationId,
    /// Model type tag dispatched by the registry (e.g. "circular").
    #[serde(rename = "type")]
    pub model: String,
    /// Duration in seconds.
    pub duration: f64,
    #[serde(rename = "loop", default)]
    pub looping: bool,
    #[serde(default)]
    pub ping_pong: bool,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl Animation {
    pub fn new(id: impl Into<AnimationId>, model: &str, duration: f64) -> Self {
        Self {
            id: id.into(),
            model: model.to_string(),
            duration,
            looping: false,
            ping_pong: false,
            parameters: Parameters::new(),
            keyframes: Vec::new(),
        }
    }

    pub fn looping(mut self, ping_pong: bool) -> Self {
        self.looping = true;
        self.ping_pong = ping_pong;
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_keyframes(mut self, keyframes: Vec<Keyframe>) -> Self {
        self.keyframes = keyframes;
        self
    }

    /// Validate model-independent invariants: timing flags and keyframe order.
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        timing::validate(self.duration, self.looping, self.ping_pong)?;
        let mut last = f64::NEG_INFINITY;
        for k in &self.keyframes {
            if !k.time.is_finite() || k.time < 0.0 || k.time > self.duration {
                return Err(ValidationError::InvalidKeyframes {
                    reason: format!("keyframe time {} outside [0, {}]", k.time, self.duration),
                });
            }
            if k.time < last {
                return Err(ValidationError::InvalidKeyframes {
                    reason: "keyframe times must be non-decreasing".into(),
                });
            }
            if !k.position.is_finite() {
                return Err(ValidationError::InvalidKeyframes {
                    reason: format!("keyframe at t={} has a non-finite position", k.time),
                });
            }
            last = k.time;
        }
        Ok(())
    }

    /// Parse an animation from JSON and check its basic invariants.
    pub fn from_json(text: &str) -> Result<Self, MotionError> {
        let anim: Animation = serde_json::from_str(text)?;
        anim.validate_basic()?;
        Ok(anim)
    }
}

/// A track as seen by the engine: referenced, never owned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    /// Snapshot taken when the animation starts on this track.
    pub initial_position: Position,
    /// Opaque transport index, only meaningful to the dispatcher.
    #[serde(default)]
    pub transport_index: u32,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, initial_position: Position) -> Self {
        Self {
            id: id.into(),
            initial_position,
            transport_index: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_json() {
        let anim = Animation::from_json(
            r#"{
                "id": "orbit",
                "type": "circular",
                "duration": 4.0,
                "loop": true,
                "pingPong": true,
                "parameters": {
                    "center": {"x": 1.0, "y": 2.0, "z": 0.0},
                    "radius": 3.0,
                    "plane": "xz"
                }
            }"#,
        )
        .unwrap();
        assert!(anim.looping && anim.ping_pong);
        let r = anim.parameters.reader("circular");
        assert_eq!(r.number("radius", 1.0).unwrap(), 3.0);
        assert_eq!(r.plane("plane").unwrap(), Plane::Xz);
        assert_eq!(
            r.position("center", Position::ORIGIN).unwrap(),
            Position::new(1.0, 2.0, 0.0)
        );
    }

    #[test]
    fn reader_reports_type_mismatch() {
        let params = Parameters::new().with("radius", "big");
        let err = params.reader("circular").number("radius", 1.0).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidParameter { .. }));
    }

    #[test]
    fn keyframes_must_be_ordered_and_in_range() {
        let anim = Animation::new("k", "custom", 2.0).with_keyframes(vec![
            Keyframe {
                time: 1.0,
                position: Position::ORIGIN,
            },
            Keyframe {
                time: 0.5,
                position: Position::ORIGIN,
            },
        ]);
        assert!(matches!(
            anim.validate_basic(),
            Err(ValidationError::InvalidKeyframes { .. })
        ));

        let anim = Animation::new("k", "custom", 2.0).with_keyframes(vec![Keyframe {
            time: 3.0,
            position: Position::ORIGIN,
        }]);
        assert!(anim.validate_basic().is_err());
    }

    #[test]
    fn from_json_rejects_ping_pong_without_loop() {
        let err = Animation::from_json(
            r#"{"id":"a","type":"linear","duration":1.0,"pingPong":true}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Ping-pong requires loop to be enabled");
    }
}
