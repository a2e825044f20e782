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

//! Vector, circle and sphere intersections plus heading helpers. These run
//! in projected plane space or raw ECEF space; none of them know about
//! geodetic coordinates.

use super::{Vec2, Vec3};

/// Tolerance for confined-range checks, to absorb rounding in the projected
/// plane (meters scale).
const ROUND_ERROR: f64 = 1e-6;

/// Given a true heading in degrees, constructs a unit vector pointing in
/// that direction. 0 degrees is parallel with the y axis and headings
/// increase clockwise.
pub fn hdg2dir(truehdg: f64) -> Vec2 {
    let r = truehdg.to_radians();
    Vec2::new(r.sin(), r.cos())
}

/// Given a direction vector, returns the true heading it points to. See
/// [`hdg2dir`] for the heading convention.
pub fn dir2hdg(dir: Vec2) -> f64 {
    let hdg = dir.x.atan2(dir.y).to_degrees();
    if hdg < 0.0 {
        hdg + 360.0
    } else {
        hdg
    }
}

/// Signed relative heading to turn from `hdg1` onto `hdg2`, in (-180, 180].
/// Positive is a right turn.
pub fn rel_hdg(hdg1: f64, hdg2: f64) -> f64 {
    let mut d = hdg2 - hdg1;
    while d > 180.0 {
        d -= 360.0;
    }
    while d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Determines whether an angle lies on an arc running from `angle1` to
/// `angle2` (all in degrees), clockwise or counter-clockwise.
pub fn is_on_arc(angle_x: f64, angle1: f64, angle2: f64, cw: bool) -> bool {
    if cw {
        if angle1 < angle2 {
            angle_x >= angle1 && angle_x <= angle2
        } else {
            angle_x >= angle1 || angle_x <= angle2
        }
    } else if angle1 < angle2 {
        angle_x <= angle1 || angle_x >= angle2
    } else {
        angle_x <= angle1 && angle_x >= angle2
    }
}

/// Determines whether and where a vector intersects the surface of a sphere.
///
/// `v` is the vector, displaced from the coordinate origin by `o`; the
/// sphere is centered at `c` with radius `r`. With `confined`, only
/// intersections between the vector's start and end points (inclusive) are
/// returned; otherwise the infinite linear extension is intersected.
pub fn vect_sph_isect(v: Vec3, o: Vec3, c: Vec3, r: f64, confined: bool) -> Vec<Vec3> {
    let Some((l, d)) = v.unit() else {
        return Vec::new();
    };

    let o_min_c = o - c;
    let l_dot_o_min_c = l.dot(o_min_c);

    // The distance along l to the intersections is
    // -(l.(o - c)) +- sqrt((l.(o - c))^2 - abs(o - c)^2 + r^2).
    // The radicand decides between zero, one and two solutions.
    let o_min_c_abs = o_min_c.abs();
    let radicand = l_dot_o_min_c * l_dot_o_min_c - o_min_c_abs * o_min_c_abs + r * r;

    let mut isects = Vec::new();
    if radicand > 0.0 {
        let sq = radicand.sqrt();
        for i_d in [-l_dot_o_min_c - sq, -l_dot_o_min_c + sq] {
            if (i_d >= 0.0 && i_d <= d) || !confined {
                isects.push(l * i_d + o);
            }
        }
    } else if radicand == 0.0 {
        let i_d = -l_dot_o_min_c;
        if (i_d >= 0.0 && i_d <= d) || !confined {
            isects.push(l * i_d + o);
        }
    }
    isects
}

/// 2-D vector/circle intersection; same contract as [`vect_sph_isect`] with
/// everything on the xy plane.
pub fn vect_circ_isect(v: Vec2, o: Vec2, c: Vec2, r: f64, confined: bool) -> Vec<Vec2> {
    vect_sph_isect(
        Vec3::new(v.x, v.y, 0.0),
        Vec3::new(o.x, o.y, 0.0),
        Vec3::new(c.x, c.y, 0.0),
        r,
        confined,
    )
    .into_iter()
    .map(|i| Vec2::new(i.x, i.y))
    .collect()
}

/// 2-D vector/vector intersection. `a` starts at `oa`, `b` at `ob`. Returns
/// `None` when the vectors are parallel (no intersection, or infinitely many
/// when they lie on top of each other). With `confined`, the intersection
/// must lie within both vectors' extents.
pub fn vect_vect_isect(a: Vec2, oa: Vec2, b: Vec2, ob: Vec2, confined: bool) -> Option<Vec2> {
    if oa == ob {
        return Some(oa);
    }

    let p1 = oa;
    let p2 = oa + a;
    let p3 = ob;
    let p4 = ob + b;

    let det = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
    if det == 0.0 {
        return None;
    }
    let ca = p1.x * p2.y - p1.y * p2.x;
    let cb = p3.x * p4.y - p3.y * p4.x;
    let r = Vec2::new(
        (ca * (p3.x - p4.x) - cb * (p1.x - p2.x)) / det,
        (ca * (p3.y - p4.y) - cb * (p1.y - p2.y)) / det,
    );

    if confined {
        let in_range = |v: f64, e1: f64, e2: f64| {
            v >= e1.min(e2) - ROUND_ERROR && v <= e1.max(e2) + ROUND_ERROR
        };
        if !in_range(r.x, p1.x, p2.x)
            || !in_range(r.x, p3.x, p4.x)
            || !in_range(r.y, p1.y, p2.y)
            || !in_range(r.y, p3.y, p4.y)
        {
            return None;
        }
    }

    Some(r)
}

/// Circle/circle intersection. Returns no points when the circles are
/// disjoint or one contains the other, one point on tangency and two
/// otherwise.
pub fn circ_circ_isect(ca: Vec2, ra: f64, cb: Vec2, rb: f64) -> Vec<Vec2> {
    let ca_cb = cb - ca;
    let d = ca_cb.abs();
    if (d == 0.0 && ra == rb) || d > ra + rb || d + ra.min(rb) < ra.max(rb) {
        return Vec::new();
    }
    let a = (ra * ra - rb * rb + d * d) / (2.0 * d);
    let h = if ra * ra - a * a < 0.0 {
        0.0
    } else {
        (ra * ra - a * a).sqrt()
    };
    let ca_p2 = ca_cb.set_abs(a);
    let p2 = ca + ca_p2;

    if h == 0.0 {
        vec![p2]
    } else {
        vec![
            p2 + ca_p2.norm(false).set_abs(h),
            p2 + ca_p2.norm(true).set_abs(h),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_direction_round_trip() {
        for hdg in [1.0, 45.0, 90.0, 179.5, 270.0, 359.0] {
            assert!((dir2hdg(hdg2dir(hdg)) - hdg).abs() < 1e-9, "hdg {hdg}");
        }
    }

    #[test]
    fn rel_hdg_wraps() {
        assert_eq!(rel_hdg(350.0, 10.0), 20.0);
        assert_eq!(rel_hdg(10.0, 350.0), -20.0);
        assert_eq!(rel_hdg(90.0, 180.0), 90.0);
    }

    #[test]
    fn arc_membership() {
        assert!(is_on_arc(45.0, 0.0, 90.0, true));
        assert!(!is_on_arc(180.0, 0.0, 90.0, true));
        assert!(is_on_arc(350.0, 270.0, 45.0, true));
        assert!(is_on_arc(180.0, 90.0, 0.0, false));
    }

    #[test]
    fn vect_circ_two_and_zero() {
        // x axis through a unit circle at the origin
        let i = vect_circ_isect(
            Vec2::new(10.0, 0.0),
            Vec2::new(-5.0, 0.0),
            Vec2::ZERO,
            1.0,
            true,
        );
        assert_eq!(i.len(), 2);
        // same line against a circle far above it
        let i = vect_circ_isect(
            Vec2::new(10.0, 0.0),
            Vec2::new(-5.0, 0.0),
            Vec2::new(0.0, 5.0),
            1.0,
            true,
        );
        assert!(i.is_empty());
    }

    #[test]
    fn vect_vect_cross_at_origin() {
        let i = vect_vect_isect(
            Vec2::new(2.0, 2.0),
            Vec2::new(-1.0, -1.0),
            Vec2::new(2.0, -2.0),
            Vec2::new(-1.0, 1.0),
            true,
        )
        .expect("diagonals should cross");
        assert!(i.abs() < 1e-12);
    }

    #[test]
    fn vect_vect_parallel_is_none() {
        let i = vect_vect_isect(
            Vec2::new(1.0, 1.0),
            Vec2::ZERO,
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 1.0),
            false,
        );
        assert!(i.is_none());
    }

    #[test]
    fn circ_circ_counts() {
        // overlapping
        assert_eq!(
            circ_circ_isect(Vec2::ZERO, 2.0, Vec2::new(3.0, 0.0), 2.0).len(),
            2
        );
        // tangent
        assert_eq!(
            circ_circ_isect(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), 1.0).len(),
            1
        );
        // disjoint
        assert!(circ_circ_isect(Vec2::ZERO, 1.0, Vec2::new(5.0, 0.0), 1.0).is_empty());
        // contained
        assert!(circ_circ_isect(Vec2::ZERO, 5.0, Vec2::new(1.0, 0.0), 1.0).is_empty());
    }
}
