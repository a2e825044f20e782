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

//! Flat-plane projections. The gnomonic projection maps great circles to
//! straight lines and is the numerical workhorse of the segment joiner.

use super::{
    ecef_to_geo, ecef_to_sph, geo_to_ecef, geo_to_sph, sph_to_ecef, vect_sph_isect, Coordinate,
    Ellipsoid, Vec2, Vec3, EARTH_MSL,
};

/// Spherical coordinate system translation: a 3x3 rotation moving a chosen
/// point to (lat 0, lon 0) plus a 2x2 in-plane rotation.
#[derive(Copy, Clone, Debug)]
pub struct SphRot {
    sph_matrix: [f64; 9],
    rot_matrix: [f64; 4],
    inv: bool,
}

fn matrix_mul_3x3_vec(m: &[f64; 9], v: Vec3) -> Vec3 {
    Vec3::new(
        m[0] * v.x + m[1] * v.y + m[2] * v.z,
        m[3] * v.x + m[4] * v.y + m[5] * v.z,
        m[6] * v.x + m[7] * v.y + m[8] * v.z,
    )
}

impl SphRot {
    /// Prepares a translation that displaces the coordinate origin by
    /// `displace` and rotates the projection plane by `rot` degrees. With
    /// `inv` the inverse translation is produced.
    pub fn new(displace: Coordinate, rot: f64, inv: bool) -> Self {
        // lat translation about the y axis, lon translation about the z
        // axis, viewport rotation about the x axis
        let alpha = if !inv {
            displace.lat.to_radians()
        } else {
            -displace.lat.to_radians()
        };
        let bravo = if !inv {
            -displace.lon.to_radians()
        } else {
            displace.lon.to_radians()
        };
        let theta = if !inv {
            rot.to_radians()
        } else {
            -rot.to_radians()
        };

        let (sin_a, cos_a) = alpha.sin_cos();
        let (sin_b, cos_b) = bravo.sin_cos();
        let (sin_t, cos_t) = theta.sin_cos();

        let r_a = [cos_a, 0.0, sin_a, 0.0, 1.0, 0.0, -sin_a, 0.0, cos_a];
        let r_b = [cos_b, -sin_b, 0.0, sin_b, cos_b, 0.0, 0.0, 0.0, 1.0];

        let mul = |x: &[f64; 9], y: &[f64; 9]| {
            let mut z = [0.0; 9];
            for row in 0..3 {
                for col in 0..3 {
                    for i in 0..3 {
                        z[row * 3 + col] += x[row * 3 + i] * y[i * 3 + col];
                    }
                }
            }
            z
        };

        let sph_matrix = if !inv { mul(&r_a, &r_b) } else { mul(&r_b, &r_a) };

        SphRot {
            sph_matrix,
            rot_matrix: [cos_t, -sin_t, sin_t, cos_t],
            inv,
        }
    }

    /// Translates a 3-space point.
    pub fn xform_vect(&self, mut p: Vec3) -> Vec3 {
        let rot = |m: &[f64; 4], v: Vec2| Vec2::new(m[0] * v.x + m[1] * v.y, m[2] * v.x + m[3] * v.y);

        if self.inv {
            // undo the projection plane rotation about the x axis first
            let s = rot(&self.rot_matrix, Vec2::new(p.y, p.z));
            p.y = s.x;
            p.z = s.y;
        }

        let mut q = matrix_mul_3x3_vec(&self.sph_matrix, p);

        if !self.inv {
            let s = rot(&self.rot_matrix, Vec2::new(q.y, q.z));
            q.y = s.x;
            q.z = s.y;
        }
        q
    }

    /// Translates a geographic point on the `EARTH_MSL` sphere.
    pub fn xform(&self, pos: Coordinate) -> Coordinate {
        let v = sph_to_ecef(pos.at_elev(0.0));
        let r = self.xform_vect(v);
        ecef_to_sph(r).to_2d()
    }
}

/// Flat-plane projection from a fixed origin along the projection axis onto
/// a plane touching the sphere at `center`.
///
/// The projection origin sits at signed distance `dist` from the plane along
/// the projection axis, positive away from the sphere center:
/// `-EARTH_MSL` is gnomonic, `-2 * EARTH_MSL` stereographic and infinity
/// orthographic. Points whose projection rays do not reach the plane map to
/// the null sentinel.
#[derive(Copy, Clone, Debug)]
pub struct FlatPlaneProj {
    xlate: SphRot,
    inv_xlate: Option<SphRot>,
    dist: f64,
    ellip: Option<Ellipsoid>,
}

impl FlatPlaneProj {
    pub fn new(
        center: Coordinate,
        rot: f64,
        dist: f64,
        ellip: Option<&Ellipsoid>,
        allow_inv: bool,
    ) -> Self {
        assert!(dist != 0.0);
        let sph_ctr = match ellip {
            Some(e) => geo_to_sph(center.at_elev(0.0), e).to_2d(),
            None => center,
        };
        FlatPlaneProj {
            xlate: SphRot::new(sph_ctr, rot, false),
            inv_xlate: if allow_inv {
                Some(SphRot::new(sph_ctr, rot, true))
            } else {
                None
            },
            dist,
            ellip: ellip.copied(),
        }
    }

    /// Orthographic projection (origin at +infinity).
    pub fn ortho(center: Coordinate, rot: f64, ellip: Option<&Ellipsoid>, allow_inv: bool) -> Self {
        Self::new(center, rot, f64::INFINITY, ellip, allow_inv)
    }

    /// Gnomonic projection (origin at the Earth's center); great circles map
    /// to straight lines.
    pub fn gnomo(center: Coordinate, rot: f64, ellip: Option<&Ellipsoid>, allow_inv: bool) -> Self {
        Self::new(center, rot, -EARTH_MSL, ellip, allow_inv)
    }

    /// Stereographic projection (origin on the surface opposite the plane).
    pub fn stereo(center: Coordinate, rot: f64, ellip: Option<&Ellipsoid>, allow_inv: bool) -> Self {
        Self::new(center, rot, -2.0 * EARTH_MSL, ellip, allow_inv)
    }

    /// Projects `pos` onto the projection plane. Returns the null vector
    /// when the point cannot be projected.
    pub fn geo2fpp(&self, pos: Coordinate) -> Vec2 {
        let pos_v = match &self.ellip {
            Some(e) => geo_to_ecef(pos.at_elev(0.0), e),
            None => sph_to_ecef(pos.at_elev(0.0)),
        };
        let pos_v = self.xlate.xform_vect(pos_v);
        if self.dist.is_finite() {
            if self.dist < 0.0 && pos_v.x <= self.dist + EARTH_MSL {
                return Vec2::NULL;
            }
            Vec2::new(
                self.dist * (pos_v.y / (self.dist + EARTH_MSL - pos_v.x)),
                self.dist * (pos_v.z / (self.dist + EARTH_MSL - pos_v.x)),
            )
        } else {
            Vec2::new(pos_v.y, pos_v.z)
        }
    }

    /// Back-projects a plane point into geographic space. Only projections
    /// with the origin inside the sphere back-project uniquely; when two
    /// solutions exist the one closer to the projection origin wins.
    pub fn fpp2geo(&self, pos: Vec2) -> Coordinate {
        let inv = self
            .inv_xlate
            .as_ref()
            .expect("projection not constructed as invertible");

        let (v, o) = if self.dist.is_finite() {
            (
                Vec3::new(-self.dist, pos.x, pos.y),
                Vec3::new(EARTH_MSL + self.dist, 0.0, 0.0),
            )
        } else {
            // For orthographic projections pretend the origin is very far
            // away; the error in the result is negligible.
            (Vec3::new(-1e14, pos.x, pos.y), Vec3::new(1e14, 0.0, 0.0))
        };
        let isects = vect_sph_isect(v, o, Vec3::ZERO, EARTH_MSL, false);
        let mut best = match isects.first() {
            // not a member of the projection
            None => return Coordinate::NULL,
            Some(&i) => i,
        };
        if isects.len() == 2 && self.dist.is_finite() {
            // pick the solution between the origin and the plane
            if self.dist >= -EARTH_MSL {
                if isects[1].x > best.x {
                    best = isects[1];
                }
            } else if isects[1].x < best.x {
                best = isects[1];
            }
        }
        let r = inv.xform_vect(best);
        match &self.ellip {
            Some(e) => ecef_to_geo(r, e).to_2d(),
            None => ecef_to_sph(r).to_2d(),
        }
    }
}

/// Lambert conformal conic projection parameters.
#[derive(Copy, Clone, Debug)]
pub struct Lcc {
    reflat: f64,
    reflon: f64,
    n: f64,
    f: f64,
    rho0: f64,
}

fn cot(x: f64) -> f64 {
    1.0 / x.tan()
}

fn sec(x: f64) -> f64 {
    1.0 / x.cos()
}

impl Lcc {
    /// Prepares projection parameters from a reference point and two
    /// standard parallels, all in degrees.
    pub fn new(reflat: f64, reflon: f64, stdpar1: f64, stdpar2: f64) -> Self {
        use std::f64::consts::FRAC_PI_4;

        let phi0 = reflat.to_radians();
        let phi1 = stdpar1.to_radians();
        let phi2 = stdpar2.to_radians();

        let n = if stdpar1 == stdpar2 {
            phi1.sin()
        } else {
            (phi1.cos() * sec(phi2)).ln()
                / ((FRAC_PI_4 + phi2 / 2.0).tan() * cot(FRAC_PI_4 + phi1 / 2.0)).ln()
        };
        let f = (phi1.cos() * (FRAC_PI_4 + phi1 / 2.0).tan().powf(n)) / n;
        let rho0 = f * cot(FRAC_PI_4 + phi0 / 2.0).powf(n);

        Lcc {
            reflat: phi0,
            reflon: reflon.to_radians(),
            n,
            f,
            rho0,
        }
    }

    /// Projects a point.
    pub fn geo2lcc(&self, pos: Coordinate) -> Vec2 {
        use std::f64::consts::FRAC_PI_4;

        let lat = pos.lat.to_radians();
        let lon = pos.lon.to_radians();
        let rho = self.f * cot(FRAC_PI_4 + lat / 2.0).powf(self.n);
        Vec2::new(
            rho * (lon - self.reflon).sin(),
            self.rho0 - rho * (self.n * (lat - self.reflat)).cos(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::gc_distance;
    use super::*;

    #[test]
    fn gnomo_round_trip_within_a_meter() {
        let ctr = Coordinate::new(50.0, 8.0);
        let fpp = FlatPlaneProj::gnomo(ctr, 0.0, None, true);
        for &(lat, lon) in &[
            (50.0, 8.0),
            (51.3, 9.1),
            (48.2, 6.4),
            (54.0, 8.0),
            (50.0, 14.5),
        ] {
            let p = Coordinate::new(lat, lon);
            let r = fpp.fpp2geo(fpp.geo2fpp(p));
            assert!(
                gc_distance(p, r) < 1.0,
                "round trip moved {p:?} by {} m",
                gc_distance(p, r)
            );
        }
    }

    #[test]
    fn gnomo_center_is_plane_origin() {
        let ctr = Coordinate::new(-10.0, 120.0);
        let fpp = FlatPlaneProj::gnomo(ctr, 0.0, None, false);
        let v = fpp.geo2fpp(ctr);
        assert!(v.abs() < 1e-6);
    }

    #[test]
    fn gnomo_rejects_far_side() {
        let fpp = FlatPlaneProj::gnomo(Coordinate::new(0.0, 0.0), 0.0, None, false);
        assert!(fpp.geo2fpp(Coordinate::new(0.0, 175.0)).is_null());
    }

    #[test]
    fn stereo_round_trip() {
        let ctr = Coordinate::new(30.0, -45.0);
        let fpp = FlatPlaneProj::stereo(ctr, 0.0, None, true);
        let p = Coordinate::new(31.5, -44.0);
        let r = fpp.fpp2geo(fpp.geo2fpp(p));
        assert!(gc_distance(p, r) < 1.0);
    }

    #[test]
    fn gnomo_north_points_up() {
        let ctr = Coordinate::new(45.0, 10.0);
        let fpp = FlatPlaneProj::gnomo(ctr, 0.0, None, false);
        let north = fpp.geo2fpp(Coordinate::new(46.0, 10.0));
        assert!(north.y > 0.0 && north.x.abs() < north.y * 1e-6);
    }
}
