use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

///Represents a vector in 2D space.
///
///World coordinates have the origin at the centre of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2D {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f64,
    ///Value along the y-axis.
    /// Positive direction is down, so "up" is -Y.
    pub y: f64,
}

impl Vector2D {
    pub const ZERO: Vector2D = Vector2D { x: 0.0, y: 0.0 };
    pub const UP: Vector2D = Vector2D { x: 0.0, y: -1.0 };
    pub const DOWN: Vector2D = Vector2D { x: 0.0, y: 1.0 };
    pub const LEFT: Vector2D = Vector2D { x: -1.0, y: 0.0 };
    pub const RIGHT: Vector2D = Vector2D { x: 1.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector. The zero vector is returned unchanged.
    pub fn normalize(&self) -> Vector2D {
        let mag = self.magnitude();
        if mag == 0.0 {
            *self
        } else {
            Vector2D {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f64) -> Vector2D {
        Vector2D {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the dot product of two vectors.
    pub fn dot(&self, other: &Vector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    ///Returns the clockwise angle in degrees between "up" (-Y) and this vector,
    /// in the range `[0, 360)`.
    pub fn to_angle(&self) -> f64 {
        let normalized = self.normalize();
        let degrees = normalized.x.atan2(-normalized.y).to_degrees();
        if degrees < 0.0 {
            degrees + 360.0
        } else {
            degrees
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vector2D {
    type Output = Vector2D;

    fn add(self, other: Vector2D) -> Vector2D {
        Vector2D::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, other: Vector2D) -> Vector2D {
        Vector2D::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;

    fn mul(self, scalar: f64) -> Vector2D {
        self.scale(scalar)
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;

    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}
