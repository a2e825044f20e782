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

use std::rc::Rc;

use log::warn;

use crate::error::{Error, Result};
use crate::geom::{coord3_from_str, is_valid_alt, is_valid_hdg, Coordinate, Coordinate3};
use crate::nd::proc::ProcSeg;
use crate::nd::{FinalKind, NavaidDb, ProcKind, Procedure, Waypoint, WaypointDb};

const MAX_RWY_LEN: u32 = 250_000;
const GP_MAX_ANGLE: f64 = 10.0;
const MAX_PROC_SEGS: usize = 100;

/// Checks a runway designator: "01" to "36" with an optional L/C/R suffix.
pub fn is_valid_rwy_id(id: &str) -> bool {
    let b = id.as_bytes();
    if b.len() < 2 || b.len() > 3 || !b[0].is_ascii_digit() || !b[1].is_ascii_digit() {
        return false;
    }
    let hdg: u32 = id[..2].parse().unwrap_or(0);
    if hdg == 0 || hdg > 36 {
        return false;
    }
    b.len() == 2 || matches!(b[2], b'L' | b'C' | b'R')
}

#[derive(Clone, PartialEq, Debug)]
pub struct Runway {
    pub id: String,
    /// True or magnetic per the airport's reference flag.
    pub hdg: u32,
    pub len_ft: u32,
    pub width_ft: u32,
    pub loc_avail: bool,
    pub loc_freq_hz: u64,
    pub loc_fcrs: u32,
    pub thr_pos: Coordinate3,
    pub gp_angle: f64,
}

#[derive(Clone, Debug)]
pub struct Airport {
    pub icao: String,
    pub name: String,
    pub refpt: Coordinate3,
    /// Transition altitude in feet.
    pub ta: u32,
    /// Transition level in feet.
    pub tl: u32,
    pub longest_rwy_ft: u32,
    /// Runway headings are true rather than magnetic.
    pub true_hdg: bool,
    pub rwys: Vec<Runway>,
    pub procs: Vec<Rc<Procedure>>,
    pub gates: Vec<Waypoint>,
}

impl Airport {
    /// Extracts the airport `icao` from the contents of `Airports.txt` plus
    /// its optional `Proc/<ICAO>.txt` contents. A malformed runway line
    /// fails the open; a malformed procedure block is skipped.
    pub fn parse(
        icao: &str,
        airports_txt: &str,
        proc_txt: Option<&str>,
        wptdb: &WaypointDb,
        navaiddb: &NavaidDb,
    ) -> Result<Airport> {
        let mut lines = airports_txt.lines();
        let mut arpt = loop {
            let Some(line) = lines.next() else {
                return Err(Error::ArptNotFound);
            };
            if let Some(arpt) = Self::parse_arpt_line(icao, line.trim()) {
                break arpt;
            }
        };

        // runway lines follow until the block ends
        for line in lines {
            let line = line.trim();
            if line.is_empty() || !line.starts_with("R,") {
                break;
            }
            let rwy = Self::parse_rwy_line(line, arpt.true_hdg).ok_or_else(|| {
                warn!("{icao}: malformed runway line: {line:?}");
                Error::Parse {
                    file: "Airports.txt".to_string(),
                    line: 0,
                    msg: format!("malformed runway line for {icao}"),
                }
            })?;
            arpt.rwys.push(rwy);
        }
        if arpt.rwys.is_empty() {
            warn!("airport {icao} has no runways");
            return Err(Error::ArptNotFound);
        }

        if let Some(proc_txt) = proc_txt {
            arpt.parse_proc_file(proc_txt, wptdb, navaiddb);
        }

        Ok(arpt)
    }

    fn parse_arpt_line(icao: &str, line: &str) -> Option<Airport> {
        let comps: Vec<&str> = line.split(',').collect();
        if comps.len() != 10 || comps[0] != "A" || comps[1] != icao {
            return None;
        }
        let refpt = coord3_from_str(comps[3], comps[4], comps[5])?;
        let ta: u32 = comps[6].trim().parse().ok()?;
        let tl: u32 = comps[7].trim().parse().ok()?;
        let longest_rwy_ft: u32 = comps[8].trim().parse().ok()?;
        if !is_valid_alt(ta as f64)
            || !is_valid_alt(tl as f64)
            || longest_rwy_ft == 0
            || longest_rwy_ft > MAX_RWY_LEN
        {
            return None;
        }
        Some(Airport {
            icao: icao.to_string(),
            name: comps[2].to_string(),
            refpt,
            ta,
            tl,
            longest_rwy_ft,
            true_hdg: comps[9].trim() == "1",
            rwys: Vec::new(),
            procs: Vec::new(),
            gates: Vec::new(),
        })
    }

    fn parse_rwy_line(line: &str, arpt_true_hdg: bool) -> Option<Runway> {
        let comps: Vec<&str> = line.split(',').collect();
        if comps.len() != 15 || comps[0] != "R" {
            return None;
        }
        if !is_valid_rwy_id(comps[1]) {
            return None;
        }
        let mut hdg: u32 = comps[2].trim().parse().ok()?;
        if arpt_true_hdg && hdg > 360 && hdg <= 720 {
            // some airports on true headings declare runways > 360
            hdg %= 360;
        }
        let len_ft: u32 = comps[3].trim().parse().ok()?;
        // the width field is unreliable, keep whatever parses
        let width_ft: u32 = comps[4].trim().parse().unwrap_or(0);
        let loc_avail = comps[5].trim() == "1";
        let loc_freq: f64 = comps[6].trim().parse().ok()?;
        let loc_fcrs: u32 = comps[7].trim().parse().unwrap_or(0);
        let thr_pos = coord3_from_str(comps[8], comps[9], comps[10])?;
        let gp_angle: f64 = comps[11].trim().parse().ok()?;

        if !is_valid_hdg(hdg as f64)
            || len_ft == 0
            || len_ft > MAX_RWY_LEN
            || (loc_avail && !crate::nd::is_valid_loc_freq(loc_freq))
            || (loc_avail && !is_valid_hdg(loc_fcrs as f64))
            || !(0.0..=GP_MAX_ANGLE).contains(&gp_angle)
        {
            return None;
        }

        Some(Runway {
            id: comps[1].to_string(),
            hdg,
            len_ft,
            width_ft,
            loc_avail,
            loc_freq_hz: (loc_freq * 1e6) as u64,
            loc_fcrs,
            thr_pos,
            gp_angle,
        })
    }

    /// Parses the procedure blocks of `Proc/<ICAO>.txt`. Blocks are
    /// separated by blank lines; a malformed block is skipped without
    /// failing the airport.
    fn parse_proc_file(&mut self, contents: &str, wptdb: &WaypointDb, navaiddb: &NavaidDb) {
        for block in contents.split("\n\n") {
            let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
            let Some(header) = lines.next() else {
                continue;
            };
            match self.parse_proc_block(header, lines, wptdb, navaiddb) {
                Some(proc) => self.procs.push(Rc::new(proc)),
                None => warn!("{}: skipping malformed procedure block: {header:?}", self.icao),
            }
        }
    }

    fn parse_proc_block<'a>(
        &self,
        header: &str,
        seg_lines: impl Iterator<Item = &'a str>,
        wptdb: &WaypointDb,
        navaiddb: &NavaidDb,
    ) -> Option<Procedure> {
        let comps: Vec<&str> = header.split(',').collect();
        let mut proc = match comps[0] {
            "SID" | "STAR" => {
                if comps.len() != 4 {
                    return None;
                }
                let is_sid = comps[0] == "SID";
                let (kind, rwy, tr_name) = if is_valid_rwy_id(comps[2]) {
                    let rwy = self.find_rwy(comps[2])?.clone();
                    let kind = if is_sid { ProcKind::Sid } else { ProcKind::Star };
                    (kind, Some(rwy), String::new())
                } else if comps[2] == "ALL" {
                    let kind = if is_sid {
                        ProcKind::SidCommon
                    } else {
                        ProcKind::StarCommon
                    };
                    (kind, None, String::new())
                } else {
                    let kind = if is_sid {
                        ProcKind::SidTrans
                    } else {
                        ProcKind::StarTrans
                    };
                    (kind, None, comps[2].to_string())
                };
                Procedure {
                    kind,
                    name: comps[1].to_string(),
                    arpt_icao: self.icao.clone(),
                    tr_name,
                    rwy,
                    final_kind: None,
                    num_main_segs: 0,
                    segs: Vec::new(),
                }
            }
            "APPTR" => {
                if comps.len() != 4 {
                    return None;
                }
                Procedure {
                    kind: ProcKind::FinalTrans,
                    name: comps[1].to_string(),
                    arpt_icao: self.icao.clone(),
                    tr_name: comps[3].to_string(),
                    rwy: Some(self.find_rwy(comps[2])?.clone()),
                    final_kind: None,
                    num_main_segs: 0,
                    segs: Vec::new(),
                }
            }
            "FINAL" => {
                if comps.len() != 5 || !is_valid_rwy_id(comps[2]) {
                    return None;
                }
                let final_kind = match comps[3] {
                    "I" => FinalKind::Ils,
                    "D" => FinalKind::Vor,
                    "N" => FinalKind::Ndb,
                    "G" => FinalKind::Rnav,
                    "C" => FinalKind::Lda,
                    _ => return None,
                };
                let num_main_segs: usize = comps[4].trim().parse().ok()?;
                if num_main_segs > MAX_PROC_SEGS {
                    return None;
                }
                Procedure {
                    kind: ProcKind::Final,
                    name: comps[1].to_string(),
                    arpt_icao: self.icao.clone(),
                    tr_name: String::new(),
                    rwy: Some(self.find_rwy(comps[2])?.clone()),
                    final_kind: Some(final_kind),
                    num_main_segs,
                    segs: Vec::new(),
                }
            }
            _ => return None,
        };

        for line in seg_lines {
            let seg = ProcSeg::parse(line, self.refpt, wptdb, navaiddb)?;
            proc.segs.push(seg);
            if proc.segs.len() > MAX_PROC_SEGS {
                return None;
            }
        }
        if proc.segs.is_empty() {
            return None;
        }
        // all non-SID procedures must start with a definite waypoint,
        // otherwise they cannot connect to a preceding leg group
        if proc.kind != ProcKind::Sid && proc.segs[0].start_wpt().is_none() {
            return None;
        }
        Some(proc)
    }

    pub fn find_rwy(&self, id: &str) -> Option<&Runway> {
        self.rwys.iter().find(|rwy| rwy.id == id)
    }

    pub fn find_gate_pos(&self, gate_id: &str) -> Coordinate {
        self.gates
            .iter()
            .find(|g| g.name == gate_id)
            .map(|g| g.pos)
            .unwrap_or(Coordinate::NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AIRPORTS: &str = "\
A,EDDF,FRANKFURT MAIN,50.033306,8.570456,364,5000,6000,13123,0
R,25C,249,13123,197,1,110.70,249,50.040494,8.586531,362,3.00,0,0,0
R,07C,69,13123,197,1,110.55,69,50.032761,8.560106,363,3.00,0,0,0

A,EDDM,MUNich,48.353783,11.786086,1487,5000,6000,13123,0
R,08R,83,13123,197,1,108.70,83,48.350439,11.751017,1448,3.00,0,0,0
";

    fn dbs() -> (WaypointDb, NavaidDb) {
        (
            WaypointDb::parse("ANEKI,50.046389,8.993056,ED\n").expect("waypoints"),
            NavaidDb::parse("FFM,FRANKFURT,114.90,0,1,0,50.052500,8.636389,364,ED,0\n")
                .expect("navaids"),
        )
    }

    #[test]
    fn parses_airport_with_runways() {
        let (wptdb, navaiddb) = dbs();
        let arpt = Airport::parse("EDDF", AIRPORTS, None, &wptdb, &navaiddb)
            .expect("EDDF should parse");
        assert_eq!(arpt.rwys.len(), 2);
        assert!(arpt.find_rwy("25C").is_some());
        assert_eq!(arpt.ta, 5000);
    }

    #[test]
    fn missing_airport_not_found() {
        let (wptdb, navaiddb) = dbs();
        assert_eq!(
            Airport::parse("XXXX", AIRPORTS, None, &wptdb, &navaiddb).unwrap_err(),
            Error::ArptNotFound
        );
    }

    #[test]
    fn skips_broken_procedure_block() {
        let (wptdb, navaiddb) = dbs();
        let procs = "\
SID,ANEK7W,25C,4
CA,0,248.0,2,1500,0,0,0,0,0,0
TF,ANEKI,50.046389,8.993056,0, ,0,0,0,0,0,0,0,0,0,0,0,0

SID,BROKEN,25C,4
ZZ,not,a,leg
";
        let arpt = Airport::parse("EDDF", AIRPORTS, Some(procs), &wptdb, &navaiddb)
            .expect("EDDF should parse");
        assert_eq!(arpt.procs.len(), 1);
        assert_eq!(arpt.procs[0].name, "ANEK7W");
        assert_eq!(arpt.procs[0].segs.len(), 2);
    }

    #[test]
    fn rwy_id_validation() {
        assert!(is_valid_rwy_id("07"));
        assert!(is_valid_rwy_id("25C"));
        assert!(is_valid_rwy_id("36"));
        assert!(!is_valid_rwy_id("00"));
        assert!(!is_valid_rwy_id("37"));
        assert!(!is_valid_rwy_id("25X"));
        assert!(!is_valid_rwy_id("7"));
    }
}
