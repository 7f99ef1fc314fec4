//! 3-component positions and the planes 2-D curves are drawn in.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[inline]
    pub fn distance(&self, other: &Position) -> f64 {
        (*self - *other).length()
    }

    #[inline]
    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Component-wise product.
    #[inline]
    pub fn scale(&self, other: &Position) -> Position {
        Position::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Arithmetic mean; `None` for an empty slice.
    pub fn centroid(points: &[Position]) -> Option<Position> {
        if points.is_empty() {
            return None;
        }
        let sum = points.iter().fold(Position::ORIGIN, |acc, p| acc + *p);
        let n = points.len() as f64;
        Some(Position::new(sum.x / n, sum.y / n, sum.z / n))
    }
}

impl Add for Position {
    type Output = Position;
    #[inline]
    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Position {
    #[inline]
    fn add_assign(&mut self, rhs: Position) {
        *self = *self + rhs;
    }
}

impl Sub for Position {
    type Output = Position;
    #[inline]
    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Position {
    type Output = Position;
    #[inline]
    fn mul(self, rhs: f64) -> Position {
        Position::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Position {
    type Output = Position;
    #[inline]
    fn neg(self) -> Position {
        Position::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f64; 3]> for Position {
    fn from(v: [f64; 3]) -> Self {
        Position::new(v[0], v[1], v[2])
    }
}

/// Plane a 2-D curve is embedded in. The first curve axis maps to the first
/// letter, the second to the second letter; the remaining axis is untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    #[default]
    Xy,
    Xz,
    Yz,
}

impl Plane {
    /// Offset `center` by `(u, v)` within this plane.
    #[inline]
    pub fn embed(&self, center: Position, u: f64, v: f64) -> Position {
        match self {
            Plane::Xy => Position::new(center.x + u, center.y + v, center.z),
            Plane::Xz => Position::new(center.x + u, center.y, center.z + v),
            Plane::Yz => Position::new(center.x, center.y + u, center.z + v),
        }
    }

    /// Offset `p` by `w` along the axis normal to this plane.
    #[inline]
    pub fn lift(&self, p: Position, w: f64) -> Position {
        match self {
            Plane::Xy => Position::new(p.x, p.y, p.z + w),
            Plane::Xz => Position::new(p.x, p.y + w, p.z),
            Plane::Yz => Position::new(p.x + w, p.y, p.z),
        }
    }

    pub fn parse(s: &str) -> Option<Plane> {
        match s {
            "xy" => Some(Plane::Xy),
            "xz" => Some(Plane::Xz),
            "yz" => Some(Plane::Yz),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_and_distance() {
        let a = Position::new(1.0, 2.0, 3.0);
        let b = Position::new(4.0, 6.0, 3.0);
        assert_eq!(b - a, Position::new(3.0, 4.0, 0.0));
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.lerp(&b, 0.5), Position::new(2.5, 4.0, 3.0));
    }

    #[test]
    fn centroid_of_triangle() {
        let c = Position::centroid(&[
            Position::new(0.0, 0.0, 0.0),
            Position::new(3.0, 0.0, 0.0),
            Position::new(0.0, 3.0, 0.0),
        ])
        .unwrap();
        assert_eq!(c, Position::new(1.0, 1.0, 0.0));
        assert!(Position::centroid(&[]).is_none());
    }

    #[test]
    fn plane_embedding() {
        let c = Position::new(1.0, 1.0, 1.0);
        assert_eq!(Plane::Xz.embed(c, 2.0, 3.0), Position::new(3.0, 1.0, 4.0));
        assert_eq!(Plane::Yz.lift(c, 2.0), Position::new(3.0, 1.0, 1.0));
    }
}
