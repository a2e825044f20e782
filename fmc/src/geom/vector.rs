// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::ops::{Add, Mul, Neg, Sub};

/// A 2-space vector. The "null" value (NaN components) means *absent*; all
/// geometry routines return it instead of raising on degenerate input.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

/// A 3-space vector with the same null convention as [`Vec2`].
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec2 {
    pub const NULL: Vec2 = Vec2 {
        x: f64::NAN,
        y: f64::NAN,
    };
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_null(&self) -> bool {
        self.x.is_nan()
    }

    /// Vector length.
    pub fn abs(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn dist(&self, other: Vec2) -> f64 {
        (*self - other).abs()
    }

    /// Scales the vector to length `abs` without changing its orientation.
    pub fn set_abs(&self, abs: f64) -> Vec2 {
        let len = self.abs();
        if len != 0.0 {
            *self * (abs / len)
        } else {
            Vec2::ZERO
        }
    }

    /// Rotates the vector by 90 degrees, right or left. Cheaper than a full
    /// trigonometric [`rot`](Self::rot).
    pub fn norm(&self, right: bool) -> Vec2 {
        if right {
            Vec2::new(self.y, -self.x)
        } else {
            Vec2::new(-self.y, self.x)
        }
    }

    /// Rotates the vector by `angle` degrees to the right.
    pub fn rot(&self, angle: f64) -> Vec2 {
        let (sin_a, cos_a) = (-angle).to_radians().sin_cos();
        Vec2::new(
            self.x * cos_a - self.y * sin_a,
            self.x * sin_a + self.y * cos_a,
        )
    }

    /// True when both vectors point into the same half-planes on both axes.
    pub fn same_dir(&self, other: Vec2) -> bool {
        self.x * other.x >= 0.0 && self.y * other.y >= 0.0
    }
}

impl Vec3 {
    pub const NULL: Vec3 = Vec3 {
        x: f64::NAN,
        y: f64::NAN,
        z: f64::NAN,
    };
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_null(&self) -> bool {
        self.x.is_nan()
    }

    pub fn abs(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn set_abs(&self, abs: f64) -> Vec3 {
        let len = self.abs();
        if len != 0.0 {
            *self * (abs / len)
        } else {
            Vec3::ZERO
        }
    }

    /// Returns the unit vector and the original length, or `None` for a
    /// zero-length input.
    pub fn unit(&self) -> Option<(Vec3, f64)> {
        let len = self.abs();
        if len == 0.0 {
            None
        } else {
            Some((*self * (1.0 / len), len))
        }
    }

    pub fn dot(&self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// The vector pointing exactly in between `self` and `other`.
    pub fn mean(&self, other: Vec3) -> Vec3 {
        Vec3::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_rotates_by_quarter_turn() {
        let v = Vec2::new(0.0, 1.0);
        assert_eq!(v.norm(true), Vec2::new(1.0, 0.0));
        assert_eq!(v.norm(false), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn rot_matches_norm() {
        let v = Vec2::new(3.0, 4.0);
        let r = v.rot(90.0);
        let n = v.norm(true);
        assert!((r.x - n.x).abs() < 1e-12 && (r.y - n.y).abs() < 1e-12);
    }

    #[test]
    fn set_abs_preserves_direction() {
        let v = Vec2::new(3.0, 4.0).set_abs(10.0);
        assert!((v.abs() - 10.0).abs() < 1e-12);
        assert!((v.x / v.y - 0.75).abs() < 1e-12);
    }

    #[test]
    fn cross_of_axes() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn null_propagates() {
        assert!(Vec2::NULL.is_null());
        assert!((Vec2::NULL + Vec2::new(1.0, 1.0)).is_null());
    }
}
