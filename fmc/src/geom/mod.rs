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

//! Geodesy kernel: coordinates, vectors, projections and intersections.
//!
//! Everything downstream (the navigation databases, the route model, the
//! leg expander and the segment joiner) builds on the primitives here.

use std::fmt::{Display, Formatter};

use crate::wmm::MagModel;

mod bezier;
mod ellipsoid;
mod intersect;
mod proj;
mod vector;

pub use bezier::Bezier;
pub use ellipsoid::*;
pub use intersect::*;
pub use proj::{FlatPlaneProj, Lcc, SphRot};
pub use vector::{Vec2, Vec3};

/// Mean Earth radius of the spherical model in meters.
pub const EARTH_MSL: f64 = 6_371_000.0;

pub const FEET_IN_METER: f64 = 0.3048;
pub const NAUTICAL_MILE_IN_METER: f64 = 1852.0;
pub const KNOTS_IN_MPS: f64 = 0.514444;

/// Converts nautical miles to meters.
pub fn nm2met(nm: f64) -> f64 {
    nm * NAUTICAL_MILE_IN_METER
}

/// Converts knots to meters per second.
pub fn kt2mps(kt: f64) -> f64 {
    kt * KNOTS_IN_MPS
}

/// A 2-D geographic coordinate.
///
/// Latitude runs from -90° (south) to 90° (north) and longitude from -180°
/// (west) to 180° (east). The "null" coordinate (NaN components) means
/// *absent* and is how the geometry layer reports "no result".
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// A 3-D geographic coordinate with elevation in feet.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Coordinate3 {
    pub lat: f64,
    pub lon: f64,
    pub elev_ft: f64,
}

impl Coordinate {
    pub const NULL: Coordinate = Coordinate {
        lat: f64::NAN,
        lon: f64::NAN,
    };

    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_null(&self) -> bool {
        self.lat.is_nan()
    }

    pub fn at_elev(&self, elev_ft: f64) -> Coordinate3 {
        Coordinate3 {
            lat: self.lat,
            lon: self.lon,
            elev_ft,
        }
    }

    /// Position equality on non-null coordinates.
    pub fn pos_eq(&self, other: &Coordinate) -> bool {
        !self.is_null() && self.lat == other.lat && self.lon == other.lon
    }

    /// Bearing to `other` in degrees, from a geodesic on the WGS-84
    /// ellipsoid.
    pub fn bearing(&self, other: &Coordinate) -> f64 {
        use geo::{Bearing, Geodesic};
        Geodesic.bearing((*self).into(), (*other).into())
    }

    /// Geodesic distance to `other` in meters on the WGS-84 ellipsoid.
    /// For the spherical-model distance the projections are built on, use
    /// [`gc_distance`].
    pub fn dist(&self, other: &Coordinate) -> f64 {
        use geo::{Distance, Geodesic};
        Geodesic.distance((*self).into(), (*other).into())
    }
}

impl Coordinate3 {
    pub const NULL: Coordinate3 = Coordinate3 {
        lat: f64::NAN,
        lon: f64::NAN,
        elev_ft: f64::NAN,
    };

    pub fn new(lat: f64, lon: f64, elev_ft: f64) -> Self {
        Self { lat, lon, elev_ft }
    }

    pub fn is_null(&self) -> bool {
        self.lat.is_nan()
    }

    pub fn to_2d(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({0}, {1})", self.lat, self.lon)
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.lon, c.lat)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(p: geo::Point<f64>) -> Self {
        Coordinate {
            lat: p.y(),
            lon: p.x(),
        }
    }
}

pub fn is_valid_lat(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

pub fn is_valid_lon(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon)
}

/// Elevation of navigation entities in feet.
pub fn is_valid_elev(elev: f64) -> bool {
    (-2000.0..=30000.0).contains(&elev)
}

/// Pressure altitudes in feet.
pub fn is_valid_alt(alt: f64) -> bool {
    (-2000.0..=100_000.0).contains(&alt)
}

pub fn is_valid_spd(spd: f64) -> bool {
    (0.0..=1000.0).contains(&spd)
}

/// "0" is not a valid heading, "360" is.
pub fn is_valid_hdg(hdg: f64) -> bool {
    hdg > 0.0 && hdg <= 360.0
}

/// Procedure arc radii in NM.
pub fn is_valid_arc_radius(radius: f64) -> bool {
    (0.1..=100.0).contains(&radius)
}

/// Parses a latitude/longitude string pair into a validated coordinate.
pub fn coord_from_str(lat: &str, lon: &str) -> Option<Coordinate> {
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    (is_valid_lat(lat) && is_valid_lon(lon)).then_some(Coordinate::new(lat, lon))
}

/// Parses a latitude/longitude/elevation string triple.
pub fn coord3_from_str(lat: &str, lon: &str, elev: &str) -> Option<Coordinate3> {
    let pos = coord_from_str(lat, lon)?;
    let elev: f64 = elev.trim().parse().ok()?;
    is_valid_elev(elev).then_some(pos.at_elev(elev))
}

/// Great-circle distance between two points in meters.
///
/// Computed as `2*R*asin(chord / 2R)` from the ECEF chord, which stays
/// numerically stable for short distances.
pub fn gc_distance(start: Coordinate, end: Coordinate) -> f64 {
    let start_v = coord_to_ecef(start, &WGS84);
    let end_v = coord_to_ecef(end, &WGS84);
    let chord = (end_v - start_v).abs();
    2.0 * (chord / 2.0 / EARTH_MSL).asin() * EARTH_MSL
}

/// Midpoint of two geodetic coordinates.
pub fn geo_midpoint(a: Coordinate, b: Coordinate) -> Coordinate {
    let a_v = coord_to_ecef(a, &WGS84);
    let b_v = coord_to_ecef(b, &WGS84);
    ecef_to_geo(a_v.mean(b_v), &WGS84).to_2d()
}

/// Displaces `pos` by `dist` meters along direction vector `dir` via a
/// gnomonic projection centered at `pos`. Fails (null) for displacements
/// reaching the antipodal region (dist >= pi*R/2).
pub fn geo_displace_dir(pos: Coordinate, dir: Vec2, dist: f64) -> Coordinate {
    if dist >= std::f64::consts::PI * EARTH_MSL / 2.0 {
        return Coordinate::NULL;
    }
    let fpp = FlatPlaneProj::gnomo(pos, 0.0, Some(&WGS84), true);
    let dir = dir.set_abs((dist / EARTH_MSL).tan() * EARTH_MSL);
    fpp.fpp2geo(dir)
}

/// Displaces `pos` by `dist` meters on true heading `truehdg`.
pub fn geo_displace(pos: Coordinate, truehdg: f64, dist: f64) -> Coordinate {
    geo_displace_dir(pos, hdg2dir(truehdg), dist)
}

/// Displaces `pos` by `dist` meters on magnetic heading `maghdg`, with the
/// variation taken at `pos`.
pub fn geo_displace_mag(wmm: &MagModel, pos: Coordinate, maghdg: f64, dist: f64) -> Coordinate {
    geo_displace(pos, wmm.mag2true(maghdg, pos.at_elev(0.0)), dist)
}

/// Intersects two magnetic radials anchored at `pos1` and `pos2`.
///
/// The radials are converted to true headings at their respective anchors
/// and intersected on a gnomonic plane centered at the anchors' midpoint.
/// Returns null when the radials are parallel or the projection degenerates.
pub fn geo_mag_radial_isect(
    wmm: &MagModel,
    pos1: Coordinate,
    rad1: f64,
    pos2: Coordinate,
    rad2: f64,
) -> Coordinate {
    let fpp_pos = geo_midpoint(pos1, pos2);
    let fpp = FlatPlaneProj::gnomo(fpp_pos, 0.0, Some(&WGS84), true);

    let pos1_v = fpp.geo2fpp(pos1);
    let rad1_dir = hdg2dir(wmm.mag2true(rad1, pos1.at_elev(0.0)));
    let pos2_v = fpp.geo2fpp(pos2);
    let rad2_dir = hdg2dir(wmm.mag2true(rad2, pos2.at_elev(0.0)));
    if pos1_v.is_null() || pos2_v.is_null() {
        return Coordinate::NULL;
    }

    match vect_vect_isect(rad1_dir, pos1_v, rad2_dir, pos2_v, false) {
        Some(isect) => fpp.fpp2geo(isect),
        None => Coordinate::NULL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Benchmark distances against the published direction from the
    // Helgoland VOR (DHE) to Itzehoe Hungriger Wolf (EDHF), German AIP
    // visual operation chart (25 JUL 2024): roughly 60 NM.
    const DHE: Coordinate = Coordinate {
        lat: 54.18568611,
        lon: 7.91070000,
    };
    const EDHF: Coordinate = Coordinate {
        lat: 53.99250000,
        lon: 9.57666667,
    };

    #[test]
    fn gc_distance_dhe_to_edhf() {
        let nm = gc_distance(DHE, EDHF) / NAUTICAL_MILE_IN_METER;
        assert_eq!(nm.round(), 60.0);
    }

    #[test]
    fn bearing_dhe_to_edhf() {
        // The AIP gives a magnetic heading of 97 degrees; with roughly 4
        // degrees east variation the true bearing comes out near 100.
        assert_eq!(DHE.bearing(&EDHF).round(), 100.0);
    }

    #[test]
    fn geodesic_and_spherical_distance_agree() {
        let d = DHE.dist(&EDHF);
        let gc = gc_distance(DHE, EDHF);
        assert!((d - gc).abs() / gc < 0.01, "geodesic {d} vs spherical {gc}");
    }

    #[test]
    fn gc_distance_short_range_stable() {
        let a = Coordinate::new(50.0, 8.0);
        let b = Coordinate::new(50.0, 8.00001);
        let d = gc_distance(a, b);
        assert!(d > 0.0 && d < 1.0);
    }

    #[test]
    fn displace_north_increases_latitude() {
        let p = geo_displace(Coordinate::new(50.0, 8.0), 360.0, nm2met(60.0));
        assert!(p.lat > 50.9 && p.lat < 51.1);
        assert!((p.lon - 8.0).abs() < 0.01);
    }

    #[test]
    fn displace_round_trip_distance() {
        let from = Coordinate::new(47.0, 11.0);
        let to = geo_displace(from, 135.0, nm2met(25.0));
        assert!((gc_distance(from, to) - nm2met(25.0)).abs() < 10.0);
    }

    #[test]
    fn displace_antipodal_fails() {
        let p = geo_displace(
            Coordinate::new(0.0, 0.0),
            90.0,
            std::f64::consts::PI * EARTH_MSL / 2.0,
        );
        assert!(p.is_null());
    }

    #[test]
    fn midpoint_on_equator() {
        let m = geo_midpoint(Coordinate::new(0.0, 10.0), Coordinate::new(0.0, 20.0));
        assert!((m.lat).abs() < 1e-6);
        assert!((m.lon - 15.0).abs() < 1e-6);
    }
}
