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

//! Pilot waypoint-entry decoder.
//!
//! Decodes a short uppercase string into candidate fixes. The forms are
//! tried in a fixed order and the first matching form wins; a string that
//! matches no form decodes to nothing.

use log::debug;
use regex::Regex;

use crate::error::{Error, Result};
use crate::geom::{
    coord_to_ecef, geo_displace_mag, geo_mag_radial_isect, is_valid_hdg, nm2met, Coordinate,
    WGS84,
};
use crate::nd::{NavDatabase, Waypoint};

/// The decoded candidates. With more than one candidate it is the caller's
/// job to ask the user which one was meant.
#[derive(Clone, Debug)]
pub struct Decoded {
    pub wpts: Vec<Waypoint>,
    /// The entry describes a sequence of reporting waypoints rather than a
    /// single fix.
    pub is_sequence: bool,
}

/// Compiled pattern set of the decoder. Compile once, decode many.
#[derive(Debug)]
pub struct WptDecoder {
    /// "DOT", "ALPHA"
    wptname: Regex,
    /// "KJFK", "KMIA"
    arpticao: Regex,

    /// 5010N = N50 W010
    geo_nw_blw100: Regex,
    /// 50N10 = N50 W110
    geo_nw_abv100: Regex,
    /// 5010E = N50 E010
    geo_ne_blw100: Regex,
    /// 50E10 = N50 E110
    geo_ne_abv100: Regex,
    /// 5010W = S50 W010
    geo_sw_blw100: Regex,
    /// 50W10 = S50 W110
    geo_sw_abv100: Regex,
    /// 5010S = S50 E010
    geo_se_blw100: Regex,
    /// 50S10 = S50 E110
    geo_se_abv100: Regex,

    /// N47W008
    geo_long: Regex,
    /// N4715.4W00803.4
    geo_detailed: Regex,

    /// SEA330/10 = SEA VOR 330 radial, 10 DME
    radial_dme: Regex,
    /// SEA330/OLM020 = intersection of the SEA 330 and OLM 020 radials
    radial_isect: Regex,

    isect_max_range_m: f64,
}

/// Default "close enough" range for radial-intersection anchor pairs.
const WPT_ISECT_MAXRNG: f64 = 1_000_000.0;

impl Default for WptDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl WptDecoder {
    pub fn new() -> Self {
        let re = |pattern: &str| Regex::new(pattern).expect("static pattern");
        WptDecoder {
            wptname: re("^([A-Z0-9]{1,5})$"),
            arpticao: re("^([A-Z]{4})$"),
            geo_nw_blw100: re("^([0-9]{2})([0-9]{2})N$"),
            geo_nw_abv100: re("^([0-9]{2})N([0-9]{2})$"),
            geo_ne_blw100: re("^([0-9]{2})([0-9]{2})E$"),
            geo_ne_abv100: re("^([0-9]{2})E([0-9]{2})$"),
            geo_sw_blw100: re("^([0-9]{2})([0-9]{2})W$"),
            geo_sw_abv100: re("^([0-9]{2})W([0-9]{2})$"),
            geo_se_blw100: re("^([0-9]{2})([0-9]{2})S$"),
            geo_se_abv100: re("^([0-9]{2})S([0-9]{2})$"),
            geo_long: re("^([NS])([0-9]{2})([WE])([0-9]{3})$"),
            geo_detailed: re(
                "^([NS])([0-9]{2})([0-9]{2}\\.[0-9])([WE])([0-9]{3})([0-9]{2}\\.[0-9])$",
            ),
            radial_dme: re("^([A-Z]{1,5})([0-9]{3})/([0-9]{1,3})$"),
            radial_isect: re("^([A-Z]{1,5})([0-9]{3})/([A-Z]{1,5})([0-9]{3})$"),
            isect_max_range_m: WPT_ISECT_MAXRNG,
        }
    }

    /// Overrides the maximum anchor distance for radial/radial
    /// intersections.
    pub fn set_isect_max_range_m(&mut self, range_m: f64) {
        self.isect_max_range_m = range_m;
    }

    /// Decodes `name` against `navdb`. `wpt_seq` is the route's waypoint
    /// sequence counter used to name generated fixes; it increments once
    /// per successful generating decode, not per candidate.
    pub fn decode(&self, name: &str, navdb: &NavDatabase, wpt_seq: &mut u32) -> Result<Decoded> {
        debug!("wpt decode: {name:?}");

        let single = |wpt: Waypoint| {
            Ok(Decoded {
                wpts: vec![wpt],
                is_sequence: false,
            })
        };

        // 5-char quadrant-encoded lat/lon combos; the quadrant letter also
        // marks the longitude-above-100 forms
        let quadrants: [(&Regex, f64, f64, f64); 8] = [
            (&self.geo_nw_blw100, 1.0, -1.0, 0.0),
            (&self.geo_nw_abv100, 1.0, -1.0, -100.0),
            (&self.geo_ne_blw100, 1.0, 1.0, 0.0),
            (&self.geo_ne_abv100, 1.0, 1.0, 100.0),
            (&self.geo_sw_blw100, -1.0, -1.0, 0.0),
            (&self.geo_sw_abv100, -1.0, -1.0, -100.0),
            (&self.geo_se_blw100, -1.0, 1.0, 0.0),
            (&self.geo_se_abv100, -1.0, 1.0, 100.0),
        ];
        for (regex, lat_sign, lon_sign, lon_off) in quadrants {
            if let Some((lat, lon)) = parse_latlon(name, regex) {
                return single(Waypoint::new(
                    name,
                    Coordinate::new(lat_sign * lat, lon_sign * lon + lon_off),
                ));
            }
        }

        // 7-char whole-degree form
        if let Some(m) = self.geo_long.captures(name) {
            let lat: f64 = m[2].parse().unwrap_or(f64::NAN);
            let lon: f64 = m[4].parse().unwrap_or(f64::NAN);
            let lat = if &m[1] == "N" { lat } else { -lat };
            let lon = if &m[3] == "E" { lon } else { -lon };
            return single(Waypoint::new(name, Coordinate::new(lat, lon)));
        }

        // 15-char fractional-minutes form
        if let Some(m) = self.geo_detailed.captures(name) {
            let deg = |d: &str, min: &str| -> f64 {
                let d: f64 = d.parse().unwrap_or(f64::NAN);
                let min: f64 = min.parse().unwrap_or(f64::NAN);
                d + min / 0.6 / 100.0
            };
            let lat = deg(&m[2], &m[3]);
            let lon = deg(&m[5], &m[6]);
            let lat = if &m[1] == "N" { lat } else { -lat };
            let lon = if &m[4] == "E" { lon } else { -lon };
            // the generated name keeps only the whole degrees
            let gen_name = format!("{}{}{}{}", &m[1], &m[2], &m[4], &m[5]);
            return single(Waypoint::new(&gen_name, Coordinate::new(lat, lon)));
        }

        // Bare names come after the geographic forms, because those cover
        // some bare-name shapes too and not all geographic waypoints exist
        // in the fix database.
        if self.wptname.is_match(name) {
            let wpts = self.lookup_by_name(name, navdb);
            if wpts.is_empty() {
                return Err(Error::NotInDatabase);
            }
            return Ok(Decoded {
                wpts,
                is_sequence: false,
            });
        }

        if let Some(m) = self.radial_dme.captures(name) {
            let base = &m[1];
            let radial: f64 = m[2].parse().unwrap_or(0.0);
            let dist: f64 = m[3].parse().unwrap_or(0.0);
            if !is_valid_hdg(radial) || dist == 0.0 {
                return Err(Error::NotInDatabase);
            }
            let candidates = self.lookup_by_name(base, navdb);
            if candidates.is_empty() {
                return Err(Error::NotInDatabase);
            }
            // displace every candidate and rewrite its name; all candidates
            // of one decode share a freshly drawn sequence number
            let seq = *wpt_seq + 1;
            let wpts: Vec<Waypoint> = candidates
                .into_iter()
                .map(|wpt| {
                    Waypoint::new(
                        &format!("{base}{seq:02}"),
                        geo_displace_mag(navdb.wmm(), wpt.pos, radial, nm2met(dist)),
                    )
                })
                .filter(|w| !w.pos.is_null())
                .collect();
            if wpts.is_empty() {
                return Err(Error::NotInDatabase);
            }
            *wpt_seq = seq;
            return Ok(Decoded {
                wpts,
                is_sequence: false,
            });
        }

        if let Some(m) = self.radial_isect.captures(name) {
            let (name1, name2) = (&m[1], &m[3]);
            let radial1: f64 = m[2].parse().unwrap_or(0.0);
            let radial2: f64 = m[4].parse().unwrap_or(0.0);
            if !is_valid_hdg(radial1) || !is_valid_hdg(radial2) || radial1 == radial2 {
                return Err(Error::NotInDatabase);
            }
            let cands1 = self.lookup_by_name(name1, navdb);
            let cands2 = self.lookup_by_name(name2, navdb);
            if cands1.is_empty() || cands2.is_empty() {
                return Err(Error::NotInDatabase);
            }

            let seq = *wpt_seq + 1;
            let mut wpts = Vec::new();
            for w1 in &cands1 {
                let w1_v = coord_to_ecef(w1.pos, &WGS84);
                for w2 in &cands2 {
                    let w2_v = coord_to_ecef(w2.pos, &WGS84);
                    if (w2_v - w1_v).abs() > self.isect_max_range_m {
                        continue;
                    }
                    let isect =
                        geo_mag_radial_isect(navdb.wmm(), w1.pos, radial1, w2.pos, radial2);
                    if isect.is_null() {
                        continue;
                    }
                    wpts.push(Waypoint::new(&format!("{name1}{seq:02}"), isect));
                }
            }
            if wpts.is_empty() {
                return Err(Error::NotInDatabase);
            }
            *wpt_seq = seq;
            return Ok(Decoded {
                wpts,
                is_sequence: false,
            });
        }

        Err(Error::NotInDatabase)
    }

    /// Union lookup of a bare name: fix database, navaid database, then
    /// airport ICAO codes (using the reference point as the fix).
    fn lookup_by_name(&self, name: &str, navdb: &NavDatabase) -> Vec<Waypoint> {
        let mut wpts: Vec<Waypoint> = navdb
            .waypoints()
            .lookup(name)
            .iter()
            .map(|wpt| Waypoint::new(name, wpt.pos))
            .collect();
        for navaid in navdb.navaids().lookup(name) {
            let mut wpt = Waypoint::new(name, navaid.pos.to_2d());
            wpt.icao_country = navaid.icao_country.clone();
            wpts.push(wpt);
        }
        if self.arpticao.is_match(name) {
            if let Some(arpt) = navdb.airport(name) {
                wpts.push(Waypoint::new(name, arpt.refpt.to_2d()));
            }
        }
        wpts
    }
}

/// Matches a two-digit/two-digit lat/lon pair against a quadrant pattern.
fn parse_latlon(s: &str, regex: &Regex) -> Option<(f64, f64)> {
    let m = regex.captures(s)?;
    let lat: f64 = m[1].parse().ok()?;
    let lon: f64 = m[2].parse().ok()?;
    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::gc_distance;
    use crate::nd::{AirwayDb, NavaidDb, WaypointDb};
    use crate::wmm::MagModel;
    use world_magnetic_model::time::Date;

    fn navdb() -> NavDatabase {
        let wptdb = WaypointDb::parse("OLM,46.970753,-122.902661,K1\n").expect("waypoints");
        let navaiddb = NavaidDb::parse(
            "SEA,SEATTLE,116.80,0,1,0,47.435372,-122.309775,354,K1,0\n\
             OLM,OLYMPIA,113.40,0,1,0,46.970753,-122.902661,199,K1,0\n",
        )
        .expect("navaids");
        let wmm =
            MagModel::new(Date::from_ordinal_date(2026, 100).expect("date")).expect("model");
        NavDatabase::from_parts(wptdb, navaiddb, AirwayDb::default(), Vec::new(), wmm)
    }

    #[test]
    fn quadrant_forms() {
        let navdb = navdb();
        let dec = WptDecoder::new();
        let mut seq = 0;

        let cases = [
            ("5010N", 50.0, -10.0),
            ("50N10", 50.0, -110.0),
            ("5010E", 50.0, 10.0),
            ("50E10", 50.0, 110.0),
            ("5010W", -50.0, -10.0),
            ("50W10", -50.0, -110.0),
            ("5010S", -50.0, 10.0),
            ("50S10", -50.0, 110.0),
        ];
        for (s, lat, lon) in cases {
            let d = dec.decode(s, &navdb, &mut seq).expect("should decode");
            assert_eq!(d.wpts.len(), 1, "{s}");
            assert!(
                d.wpts[0].pos.pos_eq(&Coordinate::new(lat, lon)),
                "{s} decoded to {}",
                d.wpts[0].pos
            );
            assert_eq!(d.wpts[0].name, s);
        }
        assert_eq!(seq, 0, "plain geographic forms must not bump the counter");
    }

    #[test]
    fn long_form() {
        let d = WptDecoder::new()
            .decode("N47W008", &navdb(), &mut 0)
            .expect("should decode");
        assert!(d.wpts[0].pos.pos_eq(&Coordinate::new(47.0, -8.0)));
    }

    #[test]
    fn detailed_form_minutes() {
        let d = WptDecoder::new()
            .decode("N4730.0W00830.0", &navdb(), &mut 0)
            .expect("should decode");
        // 30.0 minutes is half a degree
        assert!((d.wpts[0].pos.lat - 47.5).abs() < 1e-9);
        assert!((d.wpts[0].pos.lon + 8.5).abs() < 1e-9);
        assert_eq!(d.wpts[0].name, "N47W008");
    }

    #[test]
    fn bare_name_union() {
        let navdb = navdb();
        // OLM is both a fix and a VOR at the same field
        let d = WptDecoder::new()
            .decode("OLM", &navdb, &mut 0)
            .expect("should decode");
        assert_eq!(d.wpts.len(), 2);
    }

    /// SEA330/10 yields one candidate named SEA01 (the first generating
    /// decode draws sequence number 1) displaced 10 NM out on the 330
    /// radial.
    #[test]
    fn radial_dme_displacement() {
        let navdb = navdb();
        let mut seq = 0;
        let d = WptDecoder::new()
            .decode("SEA330/10", &navdb, &mut seq)
            .expect("should decode");
        assert_eq!(d.wpts.len(), 1);
        assert_eq!(d.wpts[0].name, "SEA01");
        assert_eq!(seq, 1, "one decode bumps the counter once");

        let sea = Coordinate::new(47.435372, -122.309775);
        let dist = gc_distance(d.wpts[0].pos, sea);
        assert!((dist - nm2met(10.0)).abs() < 50.0, "dist {dist}");
        // radial 330 magnetic with the local easterly variation puts the
        // point north-west of the station
        assert!(d.wpts[0].pos.lat > sea.lat);
        assert!(d.wpts[0].pos.lon < sea.lon);
    }

    #[test]
    fn radial_isect() {
        let navdb = navdb();
        let mut seq = 0;
        let d = WptDecoder::new()
            .decode("SEA180/OLM090", &navdb, &mut seq)
            .expect("should decode");
        // OLM appears as fix and navaid at the same position: 2 pairs
        assert_eq!(d.wpts.len(), 2);
        assert!(d.wpts[0].name.starts_with("SEA"));
        assert_eq!(seq, 1);
        // south of SEA and east of OLM
        for w in &d.wpts {
            assert!(w.pos.lat < 47.435372);
            assert!(w.pos.lon > -122.902661);
        }
    }

    #[test]
    fn garbage_decodes_to_nothing() {
        assert_eq!(
            WptDecoder::new()
                .decode("!!!", &navdb(), &mut 0)
                .unwrap_err(),
            Error::NotInDatabase
        );
    }
}
