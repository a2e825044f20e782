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

//! Navigation databases.
//!
//! All databases are read-only after open. A [`NavDatabase`] aggregates the
//! waypoint, navaid and airway databases plus every airport of the cycle,
//! and carries the AIRAC cycle number and validity period decoded from
//! `Airports.txt`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::wmm::MagModel;

mod airport;
mod airway;
mod navaid;
mod proc;
mod waypoint;

pub use airport::{is_valid_rwy_id, Airport, Runway};
pub use airway::{Airway, AirwayDb, AirwaySeg};
pub use navaid::{
    is_valid_loc_freq, is_valid_ndb_freq, is_valid_tacan_freq, is_valid_vor_freq, Navaid,
    NavaidDb, NavaidKind,
};
pub use proc::{
    AltLimit, DmeArc, FinalKind, HdgCmd, Hold, PathTerm, ProcKind, ProcSeg, ProcTurn, Procedure,
    Radial, RadiusArc, SpeedLimit, TurnDir,
};
pub use waypoint::{Waypoint, WaypointDb};

/// AIRAC cycle number and validity period of a database.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct AiracCycle {
    /// Four-digit `YYcc` cycle number.
    pub cycle: u32,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

impl AiracCycle {
    /// Decodes the `X,<cycle>,<validity>` header of `Airports.txt`. The
    /// cycle is `YYcc` with `01 <= cc <= 13`; the validity is the combined
    /// `DDMonDDMonYY` date field in English month abbreviations. When the
    /// months come in calendar reverse order the start year rolls back.
    pub fn parse(airports_txt: &str) -> Result<AiracCycle> {
        for line in airports_txt.lines() {
            let comps: Vec<&str> = line.trim().split(',').collect();
            if comps.len() < 3 || comps[0] != "X" {
                continue;
            }

            let cycle: u32 = comps[1].trim().parse().map_err(|_| Error::Parse {
                file: "Airports.txt".to_string(),
                line: 0,
                msg: format!("malformed AIRAC cycle {:?}", comps[1]),
            })?;
            if comps[1].len() != 4 || cycle < 1 || cycle > 9913 || cycle % 100 > 13 {
                return Err(Error::Parse {
                    file: "Airports.txt".to_string(),
                    line: 0,
                    msg: format!("invalid AIRAC cycle number {:?}", comps[1]),
                });
            }

            return Self::parse_validity(comps[2]).map(|(valid_from, valid_to)| AiracCycle {
                cycle,
                valid_from,
                valid_to,
            });
        }
        Err(Error::Parse {
            file: "Airports.txt".to_string(),
            line: 0,
            msg: "no AIRAC validity header found".to_string(),
        })
    }

    fn parse_validity(s: &str) -> Result<(NaiveDate, NaiveDate)> {
        let err = || Error::Parse {
            file: "Airports.txt".to_string(),
            line: 0,
            msg: format!("invalid AIRAC validity field {s:?}"),
        };

        let s = s.trim();
        if s.len() < 12 || !s.is_ascii() {
            return Err(err());
        }
        let year = &s[s.len() - 2..];
        let start = format!("{}{}", &s[0..5], year);
        let end = format!("{}{}", &s[5..10], year);

        // chrono's %b month names are the English abbreviations, which is
        // exactly what the field uses regardless of locale
        use chrono::Datelike;
        let mut from = NaiveDate::parse_from_str(&start, "%d%b%y").map_err(|_| err())?;
        let to = NaiveDate::parse_from_str(&end, "%d%b%y").map_err(|_| err())?;
        if from > to {
            // months in calendar reverse order, validity spans new year
            from = from.with_year(from.year() - 1).ok_or_else(err)?;
        }
        Ok((from, to))
    }

    /// Whether the cycle covers `date`.
    pub fn is_current_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }

    /// Whether the cycle covers today.
    pub fn is_current(&self) -> bool {
        self.is_current_on(chrono::Utc::now().date_naive())
    }
}

/// The aggregated navigation database of one AIRAC cycle.
#[derive(Clone, Debug)]
pub struct NavDatabase {
    cycle: Option<AiracCycle>,
    wptdb: WaypointDb,
    navaiddb: NavaidDb,
    awydb: AirwayDb,
    airports: HashMap<String, Rc<Airport>>,
    wmm: MagModel,
}

impl NavDatabase {
    /// Opens a navigation database directory: `Airports.txt`,
    /// `Waypoints.txt`, `Navaids.txt`, `ATS.txt` and the per-airport
    /// `Proc/<ICAO>.txt` files.
    pub fn open(navdata_dir: &Path) -> Result<NavDatabase> {
        let wmm = MagModel::now()?;
        let read = |name: &str| -> Result<String> {
            std::fs::read_to_string(navdata_dir.join(name))
                .map_err(|e| Error::Io(format!("{name}: {e}")))
        };

        let airports_txt = read("Airports.txt")?;
        let cycle = AiracCycle::parse(&airports_txt)?;
        let wptdb = WaypointDb::parse(&read("Waypoints.txt")?)?;
        let navaiddb = NavaidDb::parse(&read("Navaids.txt")?)?;
        let awydb = AirwayDb::parse(&read("ATS.txt")?)?;

        let mut airports = HashMap::new();
        for line in airports_txt.lines() {
            let comps: Vec<&str> = line.trim().split(',').collect();
            if comps.len() != 10 || comps[0] != "A" {
                continue;
            }
            let icao = comps[1];
            let proc_path: PathBuf = navdata_dir.join("Proc").join(format!("{icao}.txt"));
            let proc_txt = std::fs::read_to_string(proc_path).ok();
            match Airport::parse(icao, &airports_txt, proc_txt.as_deref(), &wptdb, &navaiddb) {
                Ok(arpt) => {
                    airports.insert(icao.to_string(), Rc::new(arpt));
                }
                Err(e) => warn!("skipping airport {icao}: {e}"),
            }
        }

        debug!(
            "navdata open: cycle {}, {} waypoints, {} navaids, {} airways, {} airports",
            cycle.cycle,
            wptdb.len(),
            navaiddb.len(),
            awydb.len(),
            airports.len()
        );

        Ok(NavDatabase {
            cycle: Some(cycle),
            wptdb,
            navaiddb,
            awydb,
            airports,
            wmm,
        })
    }

    /// Builds a database from already-parsed parts. Used by embedders that
    /// source their data elsewhere and by tests.
    pub fn from_parts(
        wptdb: WaypointDb,
        navaiddb: NavaidDb,
        awydb: AirwayDb,
        airports: Vec<Airport>,
        wmm: MagModel,
    ) -> NavDatabase {
        NavDatabase {
            cycle: None,
            wptdb,
            navaiddb,
            awydb,
            airports: airports
                .into_iter()
                .map(|a| (a.icao.clone(), Rc::new(a)))
                .collect(),
            wmm,
        }
    }

    pub fn cycle(&self) -> Option<&AiracCycle> {
        self.cycle.as_ref()
    }

    /// Whether the database's validity period covers today. Databases built
    /// via [`from_parts`](Self::from_parts) carry no cycle and count as
    /// current.
    pub fn is_current(&self) -> bool {
        self.cycle.map(|c| c.is_current()).unwrap_or(true)
    }

    pub fn waypoints(&self) -> &WaypointDb {
        &self.wptdb
    }

    pub fn navaids(&self) -> &NavaidDb {
        &self.navaiddb
    }

    pub fn airways(&self) -> &AirwayDb {
        &self.awydb
    }

    pub fn airport(&self, icao: &str) -> Option<Rc<Airport>> {
        self.airports.get(icao).map(Rc::clone)
    }

    /// The magnetic oracle in effect for this database.
    pub fn wmm(&self) -> &MagModel {
        &self.wmm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_airac_header() {
        let c = AiracCycle::parse("X,1501,07JAN04FEB15,x,y\n").expect("header should parse");
        assert_eq!(c.cycle, 1501);
        assert_eq!(
            c.valid_from,
            NaiveDate::from_ymd_opt(2015, 1, 7).expect("date")
        );
        assert_eq!(
            c.valid_to,
            NaiveDate::from_ymd_opt(2015, 2, 4).expect("date")
        );
    }

    #[test]
    fn validity_spanning_new_year_rolls_back() {
        let c = AiracCycle::parse("X,1413,11DEC07JAN15,x,y\n").expect("header should parse");
        assert_eq!(
            c.valid_from,
            NaiveDate::from_ymd_opt(2014, 12, 11).expect("date")
        );
        assert_eq!(
            c.valid_to,
            NaiveDate::from_ymd_opt(2015, 1, 7).expect("date")
        );
    }

    #[test]
    fn rejects_bad_cycle_numbers() {
        assert!(AiracCycle::parse("X,1514,07JAN04FEB15,x,y\n").is_err());
        assert!(AiracCycle::parse("X,15,07JAN04FEB15,x,y\n").is_err());
    }

    #[test]
    fn currency_check() {
        let c = AiracCycle::parse("X,1501,07JAN04FEB15,x,y\n").expect("header should parse");
        assert!(c.is_current_on(NaiveDate::from_ymd_opt(2015, 1, 20).expect("date")));
        assert!(!c.is_current_on(NaiveDate::from_ymd_opt(2015, 3, 1).expect("date")));
    }
}
