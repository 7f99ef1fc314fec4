//! Multi-track transform: one animation definition to one `PlayingInstance`
//! per track.
//!
//! Everything track-dependent (phase shift, rebased anchors, formation
//! offset) is computed here, once, when instances are built. Nothing is
//! re-derived per tick.

use serde::{Deserialize, Serialize};

use crate::data::{Animation, Track};
use crate::error::{MotionError, ValidationError};
use crate::ids::AnimationId;
use crate::instance::PlayingInstance;
use crate::models::MotionRegistry;
use crate::position::Position;
use crate::timing::TimingState;

/// Per-track start delay for the phase-offset modes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseShift {
    /// Track `i` (caller order) starts `i * offset_seconds` late.
    #[serde(default)]
    pub offset_seconds: f64,
    /// Explicit per-track delays in seconds; overrides `offset_seconds`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shifts: Option<Vec<f64>>,
}

impl PhaseShift {
    pub fn uniform(offset_seconds: f64) -> Self {
        Self {
            offset_seconds,
            shifts: None,
        }
    }

    pub fn per_track(shifts: Vec<f64>) -> Self {
        Self {
            offset_seconds: 0.0,
            shifts: Some(shifts),
        }
    }

    fn validate(&self, track_count: usize) -> Result<(), ValidationError> {
        if !self.offset_seconds.is_finite() {
            return Err(ValidationError::InvalidTransform {
                reason: format!("offsetSeconds must be finite, got {}", self.offset_seconds),
            });
        }
        if let Some(shifts) = &self.shifts {
            if shifts.len() != track_count {
                return Err(ValidationError::InvalidTransform {
                    reason: format!("{} shifts given for {track_count} tracks", shifts.len()),
                });
            }
            if let Some(bad) = shifts.iter().find(|s| !s.is_finite()) {
                return Err(ValidationError::InvalidTransform {
                    reason: format!("shift {bad} is not finite"),
                });
            }
        }
        Ok(())
    }

    /// Delay in seconds for the track at `index`.
    #[inline]
    pub fn shift_for(&self, index: usize) -> f64 {
        match &self.shifts {
            Some(shifts) => shifts.get(index).copied().unwrap_or(0.0),
            None => index as f64 * self.offset_seconds,
        }
    }
}

/// How the shared formation center is chosen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "kebab-case")]
pub enum FormationCenter {
    /// Mean of the tracks' initial positions.
    #[default]
    Isobarycentric,
    Custom { center: Position },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum TransformSpec {
    /// Same parameters, same start instant.
    #[default]
    Identical,
    PhaseOffset(PhaseShift),
    /// Anchors rebased onto each track's initial position.
    PositionRelative,
    PhaseOffsetRelative(PhaseShift),
    /// Rigid formation following one trajectory around a shared center.
    Formation(FormationCenter),
}

impl TransformSpec {
    fn phase(&self) -> Option<&PhaseShift> {
        match self {
            TransformSpec::PhaseOffset(p) | TransformSpec::PhaseOffsetRelative(p) => Some(p),
            _ => None,
        }
    }

    fn relative(&self) -> bool {
        matches!(
            self,
            TransformSpec::PositionRelative | TransformSpec::PhaseOffsetRelative(_)
        )
    }
}

/// Build the instances of `animation` on `tracks`, started at wall-clock
/// `now`. `seed` feeds any randomness the model materializes; it is drawn
/// once, so every track shares the same random sequence.
///
/// The definition is validated even when `tracks` is empty; an empty track
/// list then yields no instances.
pub fn build_instances(
    registry: &MotionRegistry,
    animation_id: &AnimationId,
    animation: &Animation,
    tracks: &[Track],
    spec: &TransformSpec,
    now: f64,
    seed: u64,
) -> Result<Vec<PlayingInstance>, MotionError> {
    registry.validate(animation)?;
    if let Some(phase) = spec.phase() {
        phase.validate(tracks.len())?;
    }
    if tracks.is_empty() {
        log::debug!("{animation_id}: no tracks, nothing to build");
        return Ok(Vec::new());
    }

    let mut base = animation.clone();
    registry.materialize(&mut base, seed)?;

    let (shared, centroid) = match spec {
        TransformSpec::Formation(center) => {
            let centroid = formation_center(center, tracks)?;
            let mut shared = base.clone();
            registry.recenter(&mut shared, centroid)?;
            (shared, Some(centroid))
        }
        _ => (base, None),
    };

    let mut out = Vec::with_capacity(tracks.len());
    for (i, track) in tracks.iter().enumerate() {
        let mut anim = shared.clone();
        if spec.relative() {
            registry.rebase(&mut anim, track.initial_position)?;
        }
        let timing = match spec.phase() {
            Some(phase) => TimingState::delayed(now, phase.shift_for(i)),
            None => TimingState::reset(now),
        };
        out.push(PlayingInstance {
            animation_id: animation_id.clone(),
            track_id: track.id.clone(),
            transport_index: track.transport_index,
            initial_position: track.initial_position,
            animation: anim,
            timing,
            formation_offset: centroid.map(|c| track.initial_position - c),
        });
    }
    log::debug!(
        "{animation_id}: built {} {} instances ({:?})",
        out.len(),
        animation.model,
        spec
    );
    Ok(out)
}

fn formation_center(center: &FormationCenter, tracks: &[Track]) -> Result<Position, ValidationError> {
    match center {
        FormationCenter::Custom { center } if center.is_finite() => Ok(*center),
        FormationCenter::Custom { center } => Err(ValidationError::InvalidTransform {
            reason: format!("formation center {center:?} is not finite"),
        }),
        FormationCenter::Isobarycentric => {
            let points: Vec<Position> = tracks.iter().map(|t| t.initial_position).collect();
            Position::centroid(&points).ok_or_else(|| ValidationError::InvalidTransform {
                reason: "isobarycentric formation needs at least one track".into(),
            })
        }
    }
}
