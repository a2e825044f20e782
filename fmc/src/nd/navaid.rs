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
use crate::geom::{coord3_from_str, Coordinate3};

/// Radio navaid kind, derived from the frequency band.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NavaidKind {
    Vor,
    VorDme,
    Loc,
    LocDme,
    Ndb,
    Tacan,
    /// Known position without a usable type.
    Unknown,
}

#[derive(Clone, Debug)]
pub struct Navaid {
    pub id: String,
    pub name: String,
    pub icao_country: String,
    pub pos: Coordinate3,
    pub kind: NavaidKind,
    /// Frequency in Hz; zero for [`NavaidKind::Unknown`].
    pub freq_hz: u64,
}

/// VOR band check: 108.00-117.95 MHz with LOC channels excluded below
/// 112 MHz (those must be multiples of 200 kHz or end in 50 kHz) and 50 kHz
/// spacing above.
pub fn is_valid_vor_freq(freq_mhz: f64) -> bool {
    let freq_khz = (freq_mhz * 1000.0).round() as i64;

    if !(108_000..=117_950).contains(&freq_khz) {
        return false;
    }
    if (108_000..=112_000).contains(&freq_khz) && freq_khz % 200 != 0 && freq_khz % 200 != 50 {
        return false;
    }
    if freq_khz == 112_000 {
        return false;
    }
    freq_khz % 50 == 0
}

/// LOC band check: 108.10-111.95 MHz, 200 kHz spacing with a 100 kHz or
/// 150 kHz remainder.
pub fn is_valid_loc_freq(freq_mhz: f64) -> bool {
    let freq_khz = (freq_mhz * 1000.0).round() as i64;
    (108_100..=111_950).contains(&freq_khz) && (freq_khz % 200 == 100 || freq_khz % 200 == 150)
}

/// NDB band check in kHz.
pub fn is_valid_ndb_freq(freq_khz: f64) -> bool {
    (190.0..=1750.0).contains(&freq_khz)
}

/// Military TACAN band check in MHz.
pub fn is_valid_tacan_freq(freq_mhz: f64) -> bool {
    (133.0..=136.0).contains(&freq_mhz)
}

/// The radio navaid database, indexed by ID. Read-only after open.
#[derive(Clone, Debug, Default)]
pub struct NavaidDb {
    by_id: HashMap<String, Vec<Rc<Navaid>>>,
    count: usize,
}

const MAX_NUM_NAVAIDS: usize = 1_000_000;

impl NavaidDb {
    /// Parses the contents of `Navaids.txt` (11-column records). A
    /// malformed line aborts the open.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut db = NavaidDb::default();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim_end();
            if line.len() <= 3 {
                continue;
            }
            let comps: Vec<&str> = line.split(',').collect();
            let navaid = Self::parse_line(&comps).ok_or_else(|| {
                warn!("malformed navaid line: {line:?}");
                Error::Parse {
                    file: "Navaids.txt".to_string(),
                    line: lineno + 1,
                    msg: "malformed navaid line".to_string(),
                }
            })?;
            db.insert(navaid);
            if db.count > MAX_NUM_NAVAIDS {
                return Err(Error::Parse {
                    file: "Navaids.txt".to_string(),
                    line: lineno + 1,
                    msg: "too many navaids".to_string(),
                });
            }
        }

        Ok(db)
    }

    fn parse_line(comps: &[&str]) -> Option<Navaid> {
        if comps.len() != 11 {
            return None;
        }
        let freq: f64 = comps[2].trim().parse().ok()?;
        let dme = comps[4].trim() == "1";

        // The frequency band determines the navaid kind and thereby the
        // frequency unit of the column (kHz for NDB, MHz otherwise).
        let (kind, freq_hz) = if is_valid_ndb_freq(freq) {
            (NavaidKind::Ndb, (freq * 1e3) as u64)
        } else if is_valid_vor_freq(freq) {
            let kind = if dme {
                NavaidKind::VorDme
            } else {
                NavaidKind::Vor
            };
            (kind, (freq * 1e6) as u64)
        } else if is_valid_loc_freq(freq) {
            let kind = if dme {
                NavaidKind::LocDme
            } else {
                NavaidKind::Loc
            };
            (kind, (freq * 1e6) as u64)
        } else if is_valid_tacan_freq(freq) {
            (NavaidKind::Tacan, (freq * 1e6) as u64)
        } else if freq == 0.0 {
            (NavaidKind::Unknown, 0)
        } else {
            return None;
        };

        let pos = coord3_from_str(comps[6], comps[7], comps[8])?;

        Some(Navaid {
            id: comps[0].to_string(),
            name: comps[1].to_string(),
            icao_country: comps[9].to_string(),
            pos,
            kind,
            freq_hz,
        })
    }

    pub fn insert(&mut self, navaid: Navaid) {
        self.by_id
            .entry(navaid.id.clone())
            .or_default()
            .push(Rc::new(navaid));
        self.count += 1;
    }

    /// All navaids with the given ID.
    pub fn lookup(&self, id: &str) -> &[Rc<Navaid>] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
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

    const NAVAIDS: &str = "\
SEA,SEATTLE,116.80,0,1,0,47.435372,-122.309775,354,US,0
OLM,OLYMPIA,113.40,0,1,0,46.970753,-122.902661,199,US,0
HH,HELGOLAND,278.00,0,0,0,54.185686,7.910700,89,ED,0
";

    #[test]
    fn kind_from_frequency_band() {
        let db = NavaidDb::parse(NAVAIDS).expect("should parse");
        assert_eq!(db.lookup("SEA")[0].kind, NavaidKind::VorDme);
        assert_eq!(db.lookup("SEA")[0].freq_hz, 116_800_000);
        assert_eq!(db.lookup("HH")[0].kind, NavaidKind::Ndb);
        assert_eq!(db.lookup("HH")[0].freq_hz, 278_000);
    }

    #[test]
    fn vor_band_edges() {
        assert!(is_valid_vor_freq(108.0));
        assert!(is_valid_vor_freq(117.95));
        assert!(!is_valid_vor_freq(112.0));
        assert!(!is_valid_vor_freq(107.95));
        // a LOC channel is not a VOR
        assert!(!is_valid_vor_freq(108.10));
        assert!(is_valid_loc_freq(108.10));
    }

    #[test]
    fn rejects_nonsense_frequency() {
        assert!(NavaidDb::parse("XX,NOWHERE,55.55,0,0,0,50.0,8.0,100,ED,0\n").is_err());
    }
}
