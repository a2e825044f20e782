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
use crate::geom::{coord_from_str, Coordinate};

/// A named fix. Waypoint names are not unique; lookups are multi-valued.
#[derive(Clone, Debug, Default)]
pub struct Waypoint {
    pub name: String,
    pub icao_country: String,
    pub pos: Coordinate,
}

impl Waypoint {
    pub fn new(name: &str, pos: Coordinate) -> Self {
        Waypoint {
            name: name.to_string(),
            icao_country: String::new(),
            pos,
        }
    }

    /// Position-only equality, ignoring the name.
    pub fn pos_eq(&self, other: &Waypoint) -> bool {
        self.pos.pos_eq(&other.pos)
    }
}

/// Waypoint equality is name plus position.
impl PartialEq for Waypoint {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.pos.pos_eq(&other.pos)
    }
}

/// The enroute fix database, indexed by name. Read-only after open.
#[derive(Clone, Debug, Default)]
pub struct WaypointDb {
    by_name: HashMap<String, Vec<Rc<Waypoint>>>,
    count: usize,
}

/// Parse limit from the database format definition.
const MAX_NUM_WPTS: usize = 1_000_000;

impl WaypointDb {
    /// Parses the contents of `Waypoints.txt`: one `<name>,<lat>,<lon>,
    /// <country>` record per non-blank line. A malformed line aborts the
    /// open.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut db = WaypointDb::default();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(',') {
                // non-named (coordinate) waypoints get constructed on the fly
                continue;
            }
            let comps: Vec<&str> = line.split(',').collect();
            let wpt = Self::parse_line(&comps).ok_or_else(|| {
                warn!("malformed waypoint line: {line:?}");
                Error::Parse {
                    file: "Waypoints.txt".to_string(),
                    line: lineno + 1,
                    msg: "malformed waypoint line".to_string(),
                }
            })?;
            db.insert(wpt);
            if db.count > MAX_NUM_WPTS {
                return Err(Error::Parse {
                    file: "Waypoints.txt".to_string(),
                    line: lineno + 1,
                    msg: "too many waypoints".to_string(),
                });
            }
        }

        Ok(db)
    }

    fn parse_line(comps: &[&str]) -> Option<Waypoint> {
        if comps.len() != 4 {
            return None;
        }
        let pos = coord_from_str(comps[1], comps[2])?;
        Some(Waypoint {
            name: comps[0].to_string(),
            icao_country: comps[3].to_string(),
            pos,
        })
    }

    pub fn insert(&mut self, wpt: Waypoint) {
        self.by_name
            .entry(wpt.name.clone())
            .or_default()
            .push(Rc::new(wpt));
        self.count += 1;
    }

    /// All waypoints of the given name.
    pub fn lookup(&self, name: &str) -> &[Rc<Waypoint>] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
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

    const WAYPOINTS: &str = "\
ANEKI,50.046389,8.993056,ED
ROKIL,50.383333,7.716667,ED
ROKIL,-33.5,150.2,AU
";

    #[test]
    fn parses_and_indexes_by_name() {
        let db = WaypointDb::parse(WAYPOINTS).expect("should parse");
        assert_eq!(db.len(), 3);
        assert_eq!(db.lookup("ANEKI").len(), 1);
        assert_eq!(db.lookup("ROKIL").len(), 2);
        assert!(db.lookup("NOPE").is_empty());
    }

    #[test]
    fn rejects_bad_latitude() {
        assert!(WaypointDb::parse("BAD,95.0,8.0,ED\n").is_err());
    }

    #[test]
    fn equality_is_name_and_position() {
        let a = Waypoint::new("FIX", Coordinate::new(50.0, 8.0));
        let b = Waypoint::new("FIX", Coordinate::new(50.0, 8.0));
        let c = Waypoint::new("FIX", Coordinate::new(51.0, 8.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
