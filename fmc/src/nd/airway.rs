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

use std::collections::HashMap;
use std::rc::Rc;

use log::warn;

use crate::error::{Error, Result};
use crate::geom::coord_from_str;
use crate::nd::Waypoint;

/// One airway segment between two adjacent fixes.
#[derive(Clone, PartialEq, Debug)]
pub struct AirwaySeg {
    pub from: Waypoint,
    pub to: Waypoint,
}

/// A published airway: a chained sequence of segments
/// (`segs[i].to == segs[i+1].from`).
///
/// Bidirectional airways appear in the database as two airway objects of
/// equal name with the segment order reversed; lookups pick the correctly
/// oriented one.
#[derive(Clone, PartialEq, Debug)]
pub struct Airway {
    pub name: String,
    pub segs: Vec<AirwaySeg>,
}

impl Airway {
    /// Index of the segment starting at `wpt`, matching name and position.
    pub fn seg_starting_at(&self, wpt: &Waypoint) -> Option<usize> {
        self.segs.iter().position(|s| &s.from == wpt)
    }
}

/// The airway database, indexed both by airway name and by fix name.
/// Read-only after open.
#[derive(Clone, Debug, Default)]
pub struct AirwayDb {
    by_name: HashMap<String, Vec<Rc<Airway>>>,
    by_fix: HashMap<String, Vec<Rc<Airway>>>,
    count: usize,
}

const MAX_AWY_SEGS: usize = 1000;
const MAX_NUM_AWYS: usize = 100_000;

impl AirwayDb {
    /// Parses the contents of `ATS.txt`: `A,<name>,<num_segs>` headers, each
    /// followed by exactly `num_segs` `S,...` records with required segment
    /// adjacency. A malformed record aborts the open.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut db = AirwayDb::default();
        let err = |lineno: usize, msg: &str| Error::Parse {
            file: "ATS.txt".to_string(),
            line: lineno + 1,
            msg: msg.to_string(),
        };

        let mut lines = contents.lines().enumerate().peekable();
        while let Some((lineno, line)) = lines.next() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let comps: Vec<&str> = line.split(',').collect();
            if comps.len() != 3 || comps[0] != "A" {
                warn!("malformed airway line: {line:?}");
                return Err(err(lineno, "expected airway 'A' line"));
            }
            let name = comps[1];
            let num_segs: usize = comps[2]
                .parse()
                .map_err(|_| err(lineno, "invalid segment count"))?;
            if name.is_empty() || num_segs == 0 || num_segs > MAX_AWY_SEGS {
                return Err(err(lineno, "invalid airway header"));
            }

            let mut segs: Vec<AirwaySeg> = Vec::with_capacity(num_segs);
            for _ in 0..num_segs {
                let Some((seg_lineno, seg_line)) = lines.next() else {
                    return Err(err(lineno, "truncated airway segment list"));
                };
                let seg = Self::parse_seg_line(seg_line.trim())
                    .ok_or_else(|| err(seg_lineno, "malformed airway segment"))?;
                if let Some(prev) = segs.last() {
                    if prev.to != seg.from {
                        warn!(
                            "airway {name}: segments {} and {} are not connected",
                            prev.to.name, seg.from.name
                        );
                        return Err(err(seg_lineno, "airway segments not connected"));
                    }
                }
                segs.push(seg);
            }

            db.insert(Airway {
                name: name.to_string(),
                segs,
            });
            if db.count > MAX_NUM_AWYS {
                return Err(err(lineno, "too many airways"));
            }
        }

        Ok(db)
    }

    fn parse_seg_line(line: &str) -> Option<AirwaySeg> {
        let comps: Vec<&str> = line.split(',').collect();
        if comps.len() != 10 || comps[0] != "S" {
            return None;
        }
        let from_pos = coord_from_str(comps[2], comps[3])?;
        let to_pos = coord_from_str(comps[5], comps[6])?;
        Some(AirwaySeg {
            from: Waypoint::new(comps[1], from_pos),
            to: Waypoint::new(comps[4], to_pos),
        })
    }

    pub fn insert(&mut self, awy: Airway) {
        let awy = Rc::new(awy);
        self.by_name
            .entry(awy.name.clone())
            .or_default()
            .push(Rc::clone(&awy));
        for seg in &awy.segs {
            self.by_fix
                .entry(seg.from.name.clone())
                .or_default()
                .push(Rc::clone(&awy));
        }
        if let Some(last) = awy.segs.last() {
            self.by_fix
                .entry(last.to.name.clone())
                .or_default()
                .push(Rc::clone(&awy));
        }
        self.count += 1;
    }

    /// Looks up an airway by name, optionally constrained to contain
    /// `start_wpt` as a segment start and, downstream of it, a segment
    /// ending at `end_wpt_name`. The constraints select the correct
    /// direction of bidirectional airways. Returns the airway and, when an
    /// end name was given, the resolved end waypoint.
    pub fn lookup(
        &self,
        awyname: &str,
        start_wpt: Option<&Waypoint>,
        end_wpt_name: Option<&str>,
    ) -> Option<(Rc<Airway>, Option<Waypoint>)> {
        if matches!(end_wpt_name, Some(name) if name.is_empty()) {
            return None;
        }

        for awy in self.by_name.get(awyname)? {
            let mut i = 0;
            if let Some(start) = start_wpt {
                match awy.seg_starting_at(start) {
                    Some(idx) => i = idx,
                    None => continue,
                }
            }
            if let Some(end_name) = end_wpt_name {
                match awy.segs[i..].iter().find(|s| s.to.name == end_name) {
                    Some(seg) => return Some((Rc::clone(awy), Some(seg.to.clone()))),
                    None => continue,
                }
            }
            return Some((Rc::clone(awy), None));
        }
        None
    }

    /// Looks for the first fix after `awy1_start_name` on airway `awy1_name`
    /// that is also a segment start on airway `awy2_name`.
    pub fn awy_intersection(
        &self,
        awy1_name: &str,
        awy1_start_name: &str,
        awy2_name: &str,
    ) -> Option<Waypoint> {
        if awy1_start_name.is_empty() {
            return None;
        }
        for awy1 in self.by_name.get(awy1_name)? {
            let Some(start) = awy1.segs.iter().position(|s| s.from.name == awy1_start_name)
            else {
                continue;
            };
            for seg in &awy1.segs[start..] {
                if self.lookup(awy2_name, Some(&seg.to), None).is_some() {
                    return Some(seg.to.clone());
                }
            }
        }
        None
    }

    /// Checks whether `wpt` starts any segment of airway `awyname`.
    pub fn wpt_on_awy(&self, wpt: &Waypoint, awyname: &str) -> bool {
        self.by_fix
            .get(&wpt.name)
            .map(|awys| {
                awys.iter()
                    .any(|awy| awy.name == awyname && awy.seg_starting_at(wpt).is_some())
            })
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // J70 and J146 share PSC; J70 is bidirectional.
    const ATS: &str = "\
A,J70,2
S,SEA,47.435372,-122.309775,ELN,47.370833,-120.442500,0,0,0
S,ELN,47.370833,-120.442500,PSC,46.263333,-119.110833,0,0,0

A,J70,2
S,PSC,46.263333,-119.110833,ELN,47.370833,-120.442500,0,0,0
S,ELN,47.370833,-120.442500,SEA,47.435372,-122.309775,0,0,0

A,J146,1
S,PSC,46.263333,-119.110833,BOI,43.552500,-116.192222,0,0,0
";

    fn db() -> AirwayDb {
        AirwayDb::parse(ATS).expect("fixture should parse")
    }

    #[test]
    fn lookup_picks_direction_from_start() {
        let db = db();
        let sea = Waypoint::new("SEA", crate::geom::Coordinate::new(47.435372, -122.309775));

        let (awy, end) = db
            .lookup("J70", Some(&sea), Some("PSC"))
            .expect("SEA->PSC direction should exist");
        assert_eq!(awy.segs[0].from.name, "SEA");
        assert_eq!(end.expect("end fix").name, "PSC");

        let psc = Waypoint::new("PSC", crate::geom::Coordinate::new(46.263333, -119.110833));
        let (awy, _) = db
            .lookup("J70", Some(&psc), Some("SEA"))
            .expect("PSC->SEA direction should exist");
        assert_eq!(awy.segs[0].from.name, "PSC");
    }

    #[test]
    fn intersection_of_crossing_airways() {
        let db = db();
        let isect = db
            .awy_intersection("J70", "SEA", "J146")
            .expect("J70 and J146 should intersect");
        assert_eq!(isect.name, "PSC");
    }

    #[test]
    fn rejects_unchained_segments() {
        let broken = "\
A,J1,2
S,AAA,50.0,8.0,BBB,51.0,8.0,0,0,0
S,CCC,52.0,8.0,DDD,53.0,8.0,0,0,0
";
        assert!(AirwayDb::parse(broken).is_err());
    }

    #[test]
    fn unknown_airway_is_none() {
        assert!(db().lookup("J999", None, None).is_none());
    }
}
