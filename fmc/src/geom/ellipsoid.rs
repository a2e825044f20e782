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

use super::{Coordinate, Coordinate3, Vec3, EARTH_MSL, FEET_IN_METER};

/// Reference ellipsoid parameters.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Ellipsoid {
    /// Semi-major axis in meters.
    pub a: f64,
    /// Semi-minor axis in meters.
    pub b: f64,
    /// Flattening.
    pub f: f64,
    /// First eccentricity.
    pub ecc: f64,
    /// First eccentricity squared.
    pub ecc2: f64,
    /// Mean radius in meters.
    pub r: f64,
}

/// The WGS-84 ellipsoid. The one process-wide reference used by everything.
pub const WGS84: Ellipsoid = Ellipsoid {
    a: 6378137.0,
    b: 6356752.314245,
    f: 0.00335281066474748071,
    ecc: 0.08181919084296430238,
    ecc2: 0.00669437999019741354,
    r: 6371200.0,
};

/// Converts geodetic coordinates to ECEF space using the prime-vertical
/// curvature on `ellip`. Elevation is in feet, result in meters.
///
/// Axes have their origins at the globe center point, are perpendicular to
/// each other and are designated as follows:
/// - x: positive & passing through lat=0, lon=0
/// - y: positive & passing through lat=0, lon=+90
/// - z: positive & passing through lat=90
pub fn geo_to_ecef(pos: Coordinate3, ellip: &Ellipsoid) -> Vec3 {
    let h = pos.elev_ft * FEET_IN_METER;
    let lat_r = pos.lat.to_radians();
    let lon_r = pos.lon.to_radians();
    let (sin_lat, cos_lat) = lat_r.sin_cos();
    let (sin_lon, cos_lon) = lon_r.sin_cos();

    // curvature of the prime vertical
    let rc = ellip.a / (1.0 - ellip.ecc2 * sin_lat * sin_lat).sqrt();

    Vec3::new(
        (rc + h) * cos_lat * cos_lon,
        (rc + h) * cos_lat * sin_lon,
        (rc * (1.0 - ellip.ecc2) + h) * sin_lat,
    )
}

/// Inverse of [`geo_to_ecef`], the iterated closed-form solution. Round-trip
/// error is below 1e-8 of the Earth radius.
pub fn ecef_to_geo(pos: Vec3, ellip: &Ellipsoid) -> Coordinate3 {
    let b = if pos.z >= 0.0 { ellip.b } else { -ellip.b };

    let r = pos.x.hypot(pos.y);
    let a2_b2 = ellip.a * ellip.a - b * b;
    let e = (b * pos.z - a2_b2) / (ellip.a * r);
    let f = (b * pos.z + a2_b2) / (ellip.a * r);

    // solve t^4 + 2*E*t^3 + 2*F*t - 1 = 0
    let p = (4.0 / 3.0) * (e * f + 1.0);
    let q = 2.0 * (e * e - f * f);
    let d = p * p * p + q * q;

    let mut v = if d >= 0.0 {
        (d.sqrt() - q).powf(1.0 / 3.0) - (d.sqrt() + q).powf(1.0 / 3.0)
    } else {
        2.0 * (-p).sqrt() * ((q / (p * (-p).sqrt())).acos() / 3.0).cos()
    };
    // improve v near the poles
    if v * v < p.abs() {
        v = -(v * v * v + 2.0 * q) / (3.0 * p);
    }
    let g = ((e * e + v).sqrt() + e) / 2.0;
    let t = (g * g + (f - v * g) / (2.0 * g - e)).sqrt() - g;

    let lat_r = ((ellip.a * (1.0 - t * t)) / (2.0 * b * t)).atan();
    let elev_m = (r - ellip.a * t) * lat_r.cos() + (pos.z - b) * lat_r.sin();

    let mut lon = pos.y.atan2(pos.x).to_degrees();
    if lon >= 180.0 {
        lon -= 360.0;
    }

    Coordinate3::new(lat_r.to_degrees(), lon, elev_m / FEET_IN_METER)
}

/// Converts surface coordinates to 3-space on an `EARTH_MSL`-radius sphere.
/// The sphere is what the projection machinery runs on; for precise work use
/// [`geo_to_ecef`].
pub fn sph_to_ecef(pos: Coordinate3) -> Vec3 {
    let lat_r = pos.lat.to_radians();
    let lon_r = pos.lon.to_radians();

    let r = pos.elev_ft * FEET_IN_METER + EARTH_MSL;
    // radius of the parallel at the given latitude
    let r0 = r * lat_r.cos();

    Vec3::new(r0 * lon_r.cos(), r0 * lon_r.sin(), r * lat_r.sin())
}

/// Converts a 3-space vector back to geocentric coordinates on an
/// `EARTH_MSL`-radius sphere.
pub fn ecef_to_sph(v: Vec3) -> Coordinate3 {
    let mut r0 = v.x.hypot(v.y);
    let r = v.abs();
    if r0 == 0.0 {
        // prevent a div-by-zero at the poles
        r0 = 1e-9;
    }
    let lat_r = (v.z / r0).atan();
    let mut lon_r = (v.y / r0).asin();
    if v.x < 0.0 {
        if v.y >= 0.0 {
            lon_r = std::f64::consts::PI - lon_r;
        } else {
            lon_r = -std::f64::consts::PI - lon_r;
        }
    }

    Coordinate3::new(
        lat_r.to_degrees(),
        lon_r.to_degrees(),
        (r - EARTH_MSL) / FEET_IN_METER,
    )
}

/// Converts a geodetic coordinate on `ellip` to geocentric coordinates on a
/// sphere, preserving longitude.
pub fn geo_to_sph(pos: Coordinate3, ellip: &Ellipsoid) -> Coordinate3 {
    let lat_r = pos.lat.to_radians();
    let sin_lat = lat_r.sin();

    let rc = ellip.a / (1.0 - ellip.ecc2 * sin_lat * sin_lat).sqrt();
    let p = (rc + pos.elev_ft) * lat_r.cos();
    let z = (rc * (1.0 - ellip.ecc2) + pos.elev_ft) * sin_lat;

    let elev = p.hypot(z);
    Coordinate3::new((z / elev).asin().to_degrees(), pos.lon, elev)
}

/// Returns the ECEF position of a 2-D geodetic coordinate at zero elevation.
pub fn coord_to_ecef(pos: Coordinate, ellip: &Ellipsoid) -> Vec3 {
    geo_to_ecef(pos.at_elev(0.0), ellip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecef_round_trip() {
        for &(lat, lon, elev) in &[
            (0.0, 0.0, 0.0),
            (50.033306, 8.570456, 364.0),
            (-33.946111, 151.177222, 21.0),
            (71.0, -156.766, 44.0),
            (-54.843333, -68.295556, 102.0),
        ] {
            let p = Coordinate3::new(lat, lon, elev);
            let r = ecef_to_geo(geo_to_ecef(p, &WGS84), &WGS84);
            assert!(
                (r.lat - lat).abs() < 1e-6 && (r.lon - lon).abs() < 1e-6,
                "round trip failed for {p:?}: got {r:?}"
            );
        }
    }

    #[test]
    fn equator_prime_meridian_on_x_axis() {
        let v = geo_to_ecef(Coordinate3::new(0.0, 0.0, 0.0), &WGS84);
        assert!((v.x - WGS84.a).abs() < 1e-6);
        assert!(v.y.abs() < 1e-6 && v.z.abs() < 1e-6);
    }

    #[test]
    fn sph_round_trip() {
        let p = Coordinate3::new(47.26, 11.344, 0.0);
        let r = ecef_to_sph(sph_to_ecef(p));
        assert!((r.lat - p.lat).abs() < 1e-9);
        assert!((r.lon - p.lon).abs() < 1e-9);
    }
}
