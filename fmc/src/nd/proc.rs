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

//! Terminal procedures and their path/terminator legs.
//!
//! A procedure segment is one of the 23 ARINC-424-style path/terminator
//! kinds. The kind fixes which fields exist, so the leg is a sum type
//! ([`PathTerm`]) rather than a struct of optionals.

use crate::geom::{coord_from_str, is_valid_arc_radius, is_valid_hdg, is_valid_spd, Coordinate3};
use crate::nd::{NavaidDb, Runway, Waypoint, WaypointDb};

/// Procedure kind. The departure family is `Sid*`; everything from `Star`
/// on belongs to the arrival family.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProcKind {
    /// Runway-specific departure portion.
    Sid,
    /// Common departure portion ("ALL" transition).
    SidCommon,
    /// Departure transition to an enroute fix.
    SidTrans,
    /// Runway-specific arrival portion.
    Star,
    /// Common arrival portion ("ALL" transition).
    StarCommon,
    /// Arrival transition from an enroute fix.
    StarTrans,
    /// Approach transition.
    FinalTrans,
    /// Final approach.
    Final,
}

impl ProcKind {
    pub fn is_departure(&self) -> bool {
        matches!(self, ProcKind::Sid | ProcKind::SidCommon | ProcKind::SidTrans)
    }

    pub fn is_arrival(&self) -> bool {
        !self.is_departure()
    }
}

/// Final approach subkind from the procedure type code.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FinalKind {
    Ils,
    Vor,
    Ndb,
    Rnav,
    Lda,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum TurnDir {
    #[default]
    Any,
    Left,
    Right,
}

impl TurnDir {
    fn parse(s: &str) -> Option<TurnDir> {
        match s.trim() {
            "0" => Some(TurnDir::Any),
            "1" => Some(TurnDir::Left),
            "2" => Some(TurnDir::Right),
            _ => None,
        }
    }
}

/// Altitude limit, feet.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum AltLimit {
    #[default]
    None,
    At(u32),
    AtOrAbove(u32),
    AtOrBelow(u32),
    /// `alt1 >= alt >= alt2`.
    Between(u32, u32),
}

impl AltLimit {
    pub fn is_none(&self) -> bool {
        matches!(self, AltLimit::None)
    }

    /// Adjusts `alt` to satisfy the limit.
    pub fn adjust(&self, alt: f64) -> f64 {
        match *self {
            AltLimit::None => alt,
            AltLimit::At(a) => a as f64,
            AltLimit::AtOrAbove(a) => alt.max(a as f64),
            AltLimit::AtOrBelow(a) => alt.min(a as f64),
            AltLimit::Between(a1, a2) => alt.min(a1 as f64).max(a2 as f64),
        }
    }
}

/// Speed limit, knots.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum SpeedLimit {
    #[default]
    None,
    At(u32),
}

impl SpeedLimit {
    pub fn is_none(&self) -> bool {
        matches!(self, SpeedLimit::None)
    }
}

/// Heading or course command with an optional forced turn direction.
#[derive(Clone, PartialEq, Debug)]
pub struct HdgCmd {
    pub hdg: f64,
    pub turn: TurnDir,
}

/// Radial termination condition.
#[derive(Clone, PartialEq, Debug)]
pub struct Radial {
    pub navaid: Waypoint,
    pub radial: f64,
}

/// DME arc command (AF).
#[derive(Clone, PartialEq, Debug)]
pub struct DmeArc {
    pub navaid: Waypoint,
    pub start_radial: f64,
    pub end_radial: f64,
    pub radius_nm: f64,
    pub cw: bool,
}

/// Fixed-radius arc command (RF).
#[derive(Clone, PartialEq, Debug)]
pub struct RadiusArc {
    pub ctr_wpt: Waypoint,
    pub radius_nm: f64,
    pub cw: bool,
}

/// Holding pattern command (HA/HF/HM).
#[derive(Clone, PartialEq, Debug)]
pub struct Hold {
    pub wpt: Waypoint,
    pub inbd_crs: f64,
    pub leg_len: f64,
    pub turn_right: bool,
}

/// Procedure turn command (PI).
#[derive(Clone, PartialEq, Debug)]
pub struct ProcTurn {
    pub startpt: Waypoint,
    pub outbd_radial: f64,
    pub outbd_turn_hdg: f64,
    pub max_excrs_dist: f64,
    pub max_excrs_time: f64,
    pub turn_right: bool,
    pub navaid: Waypoint,
}

/// The 23 path/terminator kinds with exactly the fields each kind defines.
#[derive(Clone, PartialEq, Debug)]
pub enum PathTerm {
    /// AF: DME arc to a fix.
    ArcToFix { arc: DmeArc, fix: Waypoint },
    /// CA: course to an altitude.
    CrsToAlt { cmd: HdgCmd, alt: AltLimit },
    /// CD: course to a DME distance.
    CrsToDme {
        cmd: HdgCmd,
        navaid: Waypoint,
        dist_nm: f64,
    },
    /// CF: course to a fix, optionally via a navaid.
    CrsToFix {
        navaid: Option<Waypoint>,
        crs: f64,
        turn: TurnDir,
        fix: Waypoint,
    },
    /// CI: course to an intercept of the next leg.
    CrsToIntcp { cmd: HdgCmd, navaid: Option<Waypoint> },
    /// CR: course to a radial crossing.
    CrsToRadial { cmd: HdgCmd, radial: Radial },
    /// DF: direct to a fix.
    DirToFix { fix: Waypoint },
    /// FA: fix and course to an altitude.
    FixToAlt {
        fix: Waypoint,
        crs: f64,
        alt: AltLimit,
    },
    /// FC: fix and course for a distance.
    FixToDist {
        fix: Waypoint,
        crs: f64,
        dist_nm: f64,
    },
    /// FD: fix and course to a DME distance.
    FixToDme {
        fix: Waypoint,
        crs: f64,
        navaid: Waypoint,
        dist_nm: f64,
    },
    /// FM: fix and course, manual termination.
    FixToManual { fix: Waypoint, crs: f64 },
    /// HA: hold to an altitude.
    HoldToAlt { hold: Hold, alt: AltLimit },
    /// HF: hold, terminating at the hold fix.
    HoldToFix { hold: Hold },
    /// HM: hold, manual termination.
    HoldToManual { hold: Hold },
    /// IF: initial fix.
    InitFix { fix: Waypoint },
    /// PI: procedure turn.
    ProcTurnLeg { turn: ProcTurn },
    /// RF: fixed-radius arc to a fix.
    RadiusArcToFix { arc: RadiusArc, fix: Waypoint },
    /// TF: track to a fix.
    TrkToFix { fix: Waypoint },
    /// VA: heading to an altitude.
    HdgToAlt { cmd: HdgCmd, alt: AltLimit },
    /// VD: heading to a DME distance.
    HdgToDme {
        cmd: HdgCmd,
        navaid: Waypoint,
        dist_nm: f64,
    },
    /// VI: heading to an intercept of the next leg.
    HdgToIntcp { cmd: HdgCmd, navaid: Option<Waypoint> },
    /// VM: heading, manual termination.
    HdgToManual { cmd: HdgCmd },
    /// VR: heading to a radial crossing.
    HdgToRadial { cmd: HdgCmd, radial: Radial },
}

impl PathTerm {
    /// The two-letter path/terminator code.
    pub fn code(&self) -> &'static str {
        match self {
            PathTerm::ArcToFix { .. } => "AF",
            PathTerm::CrsToAlt { .. } => "CA",
            PathTerm::CrsToDme { .. } => "CD",
            PathTerm::CrsToFix { .. } => "CF",
            PathTerm::CrsToIntcp { .. } => "CI",
            PathTerm::CrsToRadial { .. } => "CR",
            PathTerm::DirToFix { .. } => "DF",
            PathTerm::FixToAlt { .. } => "FA",
            PathTerm::FixToDist { .. } => "FC",
            PathTerm::FixToDme { .. } => "FD",
            PathTerm::FixToManual { .. } => "FM",
            PathTerm::HoldToAlt { .. } => "HA",
            PathTerm::HoldToFix { .. } => "HF",
            PathTerm::HoldToManual { .. } => "HM",
            PathTerm::InitFix { .. } => "IF",
            PathTerm::ProcTurnLeg { .. } => "PI",
            PathTerm::RadiusArcToFix { .. } => "RF",
            PathTerm::TrkToFix { .. } => "TF",
            PathTerm::HdgToAlt { .. } => "VA",
            PathTerm::HdgToDme { .. } => "VD",
            PathTerm::HdgToIntcp { .. } => "VI",
            PathTerm::HdgToManual { .. } => "VM",
            PathTerm::HdgToRadial { .. } => "VR",
        }
    }
}

/// One procedure segment: a path/terminator leg plus its generic
/// constraints.
#[derive(Clone, PartialEq, Debug)]
pub struct ProcSeg {
    pub leg: PathTerm,
    pub alt_lim: AltLimit,
    pub spd_lim: SpeedLimit,
    pub overfly: bool,
}

impl ProcSeg {
    pub fn new(leg: PathTerm) -> Self {
        ProcSeg {
            leg,
            alt_lim: AltLimit::None,
            spd_lim: SpeedLimit::None,
            overfly: false,
        }
    }

    /// The initial waypoint of the segment, for the kinds that define one.
    /// All non-SID procedures must start with a segment that has one.
    pub fn start_wpt(&self) -> Option<&Waypoint> {
        match &self.leg {
            PathTerm::CrsToFix { fix, .. } => Some(fix),
            PathTerm::FixToDist { fix, .. }
            | PathTerm::FixToDme { fix, .. }
            | PathTerm::FixToManual { fix, .. }
            | PathTerm::FixToAlt { fix, .. }
            | PathTerm::InitFix { fix } => Some(fix),
            PathTerm::ProcTurnLeg { turn } => Some(&turn.startpt),
            PathTerm::HoldToAlt { hold, .. }
            | PathTerm::HoldToFix { hold }
            | PathTerm::HoldToManual { hold } => Some(&hold.wpt),
            _ => None,
        }
    }

    /// The terminating waypoint of the segment, for the kinds that end in
    /// one.
    pub fn end_wpt(&self) -> Option<&Waypoint> {
        match &self.leg {
            PathTerm::ArcToFix { fix, .. }
            | PathTerm::CrsToFix { fix, .. }
            | PathTerm::DirToFix { fix }
            | PathTerm::RadiusArcToFix { fix, .. }
            | PathTerm::TrkToFix { fix }
            | PathTerm::InitFix { fix } => Some(fix),
            PathTerm::HdgToIntcp { navaid, .. } => navaid.as_ref(),
            PathTerm::HoldToAlt { hold, .. }
            | PathTerm::HoldToFix { hold }
            | PathTerm::HoldToManual { hold } => Some(&hold.wpt),
            _ => None,
        }
    }

    /// Rewrites the terminating waypoint. Panics for kinds with no waypoint
    /// terminator; callers check the kind first.
    pub fn set_end_wpt(&mut self, wpt: &Waypoint) {
        match &mut self.leg {
            PathTerm::ArcToFix { fix, .. }
            | PathTerm::CrsToFix { fix, .. }
            | PathTerm::DirToFix { fix }
            | PathTerm::RadiusArcToFix { fix, .. }
            | PathTerm::TrkToFix { fix }
            | PathTerm::InitFix { fix } => *fix = wpt.clone(),
            PathTerm::HdgToIntcp { navaid, .. } => *navaid = Some(wpt.clone()),
            PathTerm::HoldToAlt { hold, .. }
            | PathTerm::HoldToFix { hold }
            | PathTerm::HoldToManual { hold } => hold.wpt = wpt.clone(),
            other => panic!("{} leg takes no terminator fix", other.code()),
        }
    }

    pub fn code(&self) -> &'static str {
        self.leg.code()
    }
}

/// A departure, arrival, approach or transition attached to an airport.
#[derive(Clone, PartialEq, Debug)]
pub struct Procedure {
    pub kind: ProcKind,
    pub name: String,
    /// Owning airport ICAO.
    pub arpt_icao: String,
    /// Transition name for the `*Trans` kinds.
    pub tr_name: String,
    /// The runway the procedure serves, where kind-specific.
    pub rwy: Option<Runway>,
    pub final_kind: Option<FinalKind>,
    /// Segments beyond this count belong to the go-around.
    pub num_main_segs: usize,
    pub segs: Vec<ProcSeg>,
}

impl Procedure {
    /// The procedure's start waypoint: the departure runway threshold for
    /// SIDs, the first segment's start waypoint otherwise.
    pub fn start_wpt(&self) -> Option<Waypoint> {
        match self.kind {
            ProcKind::Sid => {
                let rwy = self.rwy.as_ref()?;
                Some(Waypoint::new(&rwy.id, rwy.thr_pos.to_2d()))
            }
            _ => self.segs.first()?.start_wpt().cloned(),
        }
    }

    /// The last segment's end waypoint, if it has one.
    pub fn end_wpt(&self) -> Option<Waypoint> {
        self.segs.last()?.end_wpt().cloned()
    }
}

/// Resolves a fix or navaid name appearing in a procedure segment line to
/// the candidate nearest `refpt`. When both a fix and a navaid of the name
/// exist, the closer one wins.
pub(crate) fn resolve_proc_wpt(
    name: &str,
    refpt: Coordinate3,
    wptdb: Option<&WaypointDb>,
    navaiddb: Option<&NavaidDb>,
) -> Option<Waypoint> {
    let refpt = refpt.to_2d();
    let mut best: Option<Waypoint> = None;
    let mut min_dist = f64::INFINITY;

    if let Some(db) = wptdb {
        for wpt in db.lookup(name) {
            let d = refpt.dist(&wpt.pos);
            if d < min_dist {
                min_dist = d;
                best = Some(Waypoint::new(name, wpt.pos));
            }
        }
    }
    if let Some(db) = navaiddb {
        for navaid in db.lookup(name) {
            let d = refpt.dist(&navaid.pos.to_2d());
            if d < min_dist {
                min_dist = d;
                best = Some(Waypoint::new(name, navaid.pos.to_2d()));
            }
        }
    }
    best
}

/// Parses the five altitude/speed limit columns (`alt_type,alt1,alt2,
/// spd_type,spd1`).
fn parse_alt_spd(comps: &[&str]) -> Option<(AltLimit, SpeedLimit)> {
    if comps.len() < 5 {
        return None;
    }
    let num = |s: &str| s.trim().parse::<u32>().ok();
    let altnum = |s: &str| {
        let v = num(s)?;
        crate::geom::is_valid_alt(v as f64).then_some(v)
    };

    let alt = match comps[0].trim() {
        "0" => AltLimit::None,
        "1" => AltLimit::At(altnum(comps[1])?),
        "2" => AltLimit::AtOrAbove(altnum(comps[1])?),
        "3" => AltLimit::AtOrBelow(altnum(comps[1])?),
        "4" => AltLimit::Between(altnum(comps[1])?, altnum(comps[2])?),
        _ => return None,
    };
    let spd = match comps[3].trim() {
        "0" => SpeedLimit::None,
        "1" => {
            let v = num(comps[4])?;
            if !is_valid_spd(v as f64) {
                return None;
            }
            SpeedLimit::At(v)
        }
        _ => return None,
    };
    Some((alt, spd))
}

/// Parses a `<name>,<lat>,<lon>` waypoint column triple.
fn parse_seg_wpt(comps: &[&str]) -> Option<Waypoint> {
    if comps.len() < 3 || comps[0].trim().is_empty() {
        return None;
    }
    let pos = coord_from_str(comps[1], comps[2])?;
    Some(Waypoint::new(comps[0].trim(), pos))
}

/// Optional navaid column: a single space means "absent".
fn optional_navaid(
    name: &str,
    refpt: Coordinate3,
    navaiddb: Option<&NavaidDb>,
) -> Option<Waypoint> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    resolve_proc_wpt(name, refpt, None, navaiddb)
}

impl ProcSeg {
    /// Parses one procedure segment line. The first column is the
    /// path/terminator code; the column layout is fixed per kind. Returns
    /// `None` on any malformation, which rejects the surrounding procedure
    /// block (and only it).
    pub(crate) fn parse(
        line: &str,
        refpt: Coordinate3,
        wptdb: &WaypointDb,
        navaiddb: &NavaidDb,
    ) -> Option<ProcSeg> {
        let comps: Vec<&str> = line.split(',').collect();
        let ncomps = comps.len();
        let hdg = |s: &str| {
            let h: f64 = s.trim().parse().ok()?;
            is_valid_hdg(h).then_some(h)
        };
        let dist = |s: &str| s.trim().parse::<f64>().ok();
        let navaid =
            |name: &str| resolve_proc_wpt(name.trim(), refpt, None, Some(navaiddb));

        let (leg, lims) = match comps[0].trim() {
            "AF" => {
                if ncomps != 17 {
                    return None;
                }
                let dir = comps[4].trim();
                if dir != "1" && dir != "2" {
                    return None;
                }
                let radius_nm = dist(comps[7])?;
                if !is_valid_arc_radius(radius_nm) {
                    return None;
                }
                (
                    PathTerm::ArcToFix {
                        arc: DmeArc {
                            navaid: navaid(comps[5])?,
                            start_radial: hdg(comps[8])?,
                            end_radial: hdg(comps[6])?,
                            radius_nm,
                            cw: dir == "2",
                        },
                        fix: parse_seg_wpt(&comps[1..4])?,
                    },
                    parse_alt_spd(&comps[9..14])?,
                )
            }
            "CA" => {
                if ncomps != 11 {
                    return None;
                }
                let (alt, spd) = parse_alt_spd(&comps[3..8])?;
                if alt.is_none() {
                    // altitude constraint is required for CA segs
                    return None;
                }
                (
                    PathTerm::CrsToAlt {
                        cmd: HdgCmd {
                            hdg: hdg(comps[2])?,
                            turn: TurnDir::parse(comps[1])?,
                        },
                        alt,
                    },
                    (alt, spd),
                )
            }
            "CD" => {
                if ncomps != 18 {
                    return None;
                }
                (
                    PathTerm::CrsToDme {
                        cmd: HdgCmd {
                            hdg: hdg(comps[8])?,
                            turn: TurnDir::parse(comps[2])?,
                        },
                        navaid: navaid(comps[5])?,
                        dist_nm: dist(comps[9])?,
                    },
                    parse_alt_spd(&comps[10..15])?,
                )
            }
            "CF" => {
                if ncomps != 18 {
                    return None;
                }
                (
                    PathTerm::CrsToFix {
                        navaid: optional_navaid(comps[5], refpt, Some(navaiddb)),
                        crs: hdg(comps[8])?,
                        turn: TurnDir::parse(comps[4])?,
                        fix: parse_seg_wpt(&comps[1..4])?,
                    },
                    parse_alt_spd(&comps[10..15])?,
                )
            }
            "CI" => {
                if ncomps != 13 {
                    return None;
                }
                (
                    PathTerm::CrsToIntcp {
                        cmd: HdgCmd {
                            hdg: hdg(comps[4])?,
                            turn: TurnDir::parse(comps[1])?,
                        },
                        navaid: optional_navaid(comps[2], refpt, Some(navaiddb)),
                    },
                    parse_alt_spd(&comps[5..10])?,
                )
            }
            "CR" => {
                if ncomps != 13 {
                    return None;
                }
                (
                    PathTerm::CrsToRadial {
                        cmd: HdgCmd {
                            hdg: hdg(comps[4])?,
                            turn: TurnDir::parse(comps[1])?,
                        },
                        radial: Radial {
                            navaid: navaid(comps[2])?,
                            radial: hdg(comps[3])?,
                        },
                    },
                    parse_alt_spd(&comps[5..10])?,
                )
            }
            "DF" => {
                if ncomps != 16 {
                    return None;
                }
                (
                    PathTerm::DirToFix {
                        fix: parse_seg_wpt(&comps[1..4])?,
                    },
                    parse_alt_spd(&comps[8..13])?,
                )
            }
            "FA" => {
                if ncomps != 17 {
                    return None;
                }
                let (alt, spd) = parse_alt_spd(&comps[9..14])?;
                if alt.is_none() {
                    return None;
                }
                (
                    PathTerm::FixToAlt {
                        fix: parse_seg_wpt(&comps[1..4])?,
                        crs: hdg(comps[8])?,
                        alt,
                    },
                    (alt, spd),
                )
            }
            "FC" => {
                if ncomps != 18 {
                    return None;
                }
                (
                    PathTerm::FixToDist {
                        fix: parse_seg_wpt(&comps[1..4])?,
                        crs: hdg(comps[8])?,
                        dist_nm: dist(comps[9])?,
                    },
                    parse_alt_spd(&comps[10..15])?,
                )
            }
            "FD" => {
                if ncomps != 18 {
                    return None;
                }
                (
                    PathTerm::FixToDme {
                        fix: parse_seg_wpt(&comps[1..4])?,
                        crs: hdg(comps[8])?,
                        navaid: navaid(comps[5])?,
                        dist_nm: dist(comps[7])?,
                    },
                    parse_alt_spd(&comps[10..15])?,
                )
            }
            "FM" => {
                if ncomps != 17 {
                    return None;
                }
                (
                    PathTerm::FixToManual {
                        fix: parse_seg_wpt(&comps[1..4])?,
                        crs: hdg(comps[8])?,
                    },
                    parse_alt_spd(&comps[9..14])?,
                )
            }
            code @ ("HA" | "HF" | "HM") => {
                if ncomps != 19 {
                    return None;
                }
                let turn = comps[4].trim();
                if turn != "1" && turn != "2" {
                    return None;
                }
                let hold = Hold {
                    wpt: parse_seg_wpt(&comps[1..4])?,
                    inbd_crs: hdg(comps[8])?,
                    leg_len: dist(comps[9])?,
                    turn_right: turn == "2",
                };
                let (alt, spd) = parse_alt_spd(&comps[10..15])?;
                let leg = match code {
                    "HA" => {
                        if alt.is_none() {
                            // alt constraint is mandatory on HA segs
                            return None;
                        }
                        PathTerm::HoldToAlt { hold, alt }
                    }
                    "HF" => PathTerm::HoldToFix { hold },
                    _ => PathTerm::HoldToManual { hold },
                };
                (leg, (alt, spd))
            }
            "IF" => {
                if ncomps != 15 {
                    return None;
                }
                (
                    PathTerm::InitFix {
                        fix: parse_seg_wpt(&comps[1..4])?,
                    },
                    parse_alt_spd(&comps[7..12])?,
                )
            }
            "PI" => {
                if ncomps != 18 {
                    return None;
                }
                let dir = comps[4].trim();
                if dir != "1" && dir != "2" {
                    return None;
                }
                (
                    PathTerm::ProcTurnLeg {
                        turn: ProcTurn {
                            startpt: parse_seg_wpt(&comps[1..4])?,
                            outbd_turn_hdg: hdg(comps[6])?,
                            max_excrs_dist: dist(comps[7])?,
                            outbd_radial: hdg(comps[8])?,
                            max_excrs_time: dist(comps[9])?,
                            turn_right: dir == "1",
                            navaid: navaid(comps[5])?,
                        },
                    },
                    parse_alt_spd(&comps[10..15])?,
                )
            }
            "RF" => {
                if ncomps != 16 {
                    return None;
                }
                let dir = comps[4].trim();
                if dir != "1" && dir != "2" {
                    return None;
                }
                let radius_nm = dist(comps[7])?;
                if !is_valid_arc_radius(radius_nm) {
                    return None;
                }
                (
                    PathTerm::RadiusArcToFix {
                        arc: RadiusArc {
                            ctr_wpt: resolve_proc_wpt(
                                comps[5].trim(),
                                refpt,
                                Some(wptdb),
                                None,
                            )?,
                            radius_nm,
                            cw: dir == "2",
                        },
                        fix: parse_seg_wpt(&comps[1..4])?,
                    },
                    parse_alt_spd(&comps[8..13])?,
                )
            }
            "TF" => {
                if ncomps != 18 {
                    return None;
                }
                (
                    PathTerm::TrkToFix {
                        fix: parse_seg_wpt(&comps[1..4])?,
                    },
                    parse_alt_spd(&comps[10..15])?,
                )
            }
            "VA" => {
                if ncomps != 11 {
                    return None;
                }
                let (alt, spd) = parse_alt_spd(&comps[3..8])?;
                if alt.is_none() {
                    return None;
                }
                (
                    PathTerm::HdgToAlt {
                        cmd: HdgCmd {
                            hdg: hdg(comps[2])?,
                            turn: TurnDir::parse(comps[1])?,
                        },
                        alt,
                    },
                    (alt, spd),
                )
            }
            "VD" => {
                if ncomps != 18 {
                    return None;
                }
                (
                    PathTerm::HdgToDme {
                        cmd: HdgCmd {
                            hdg: hdg(comps[8])?,
                            turn: TurnDir::parse(comps[3])?,
                        },
                        navaid: navaid(comps[5])?,
                        dist_nm: dist(comps[9])?,
                    },
                    parse_alt_spd(&comps[10..15])?,
                )
            }
            "VI" => {
                if ncomps != 13 {
                    return None;
                }
                (
                    PathTerm::HdgToIntcp {
                        cmd: HdgCmd {
                            hdg: hdg(comps[4])?,
                            turn: TurnDir::parse(comps[1])?,
                        },
                        navaid: optional_navaid(comps[2], refpt, Some(navaiddb)),
                    },
                    parse_alt_spd(&comps[5..10])?,
                )
            }
            "VM" => {
                if ncomps != 13 {
                    return None;
                }
                (
                    PathTerm::HdgToManual {
                        cmd: HdgCmd {
                            hdg: hdg(comps[4])?,
                            turn: TurnDir::parse(comps[3])?,
                        },
                    },
                    parse_alt_spd(&comps[5..10])?,
                )
            }
            "VR" => {
                if ncomps != 13 {
                    return None;
                }
                (
                    PathTerm::HdgToRadial {
                        cmd: HdgCmd {
                            hdg: hdg(comps[4])?,
                            turn: TurnDir::parse(comps[1])?,
                        },
                        radial: Radial {
                            navaid: navaid(comps[2])?,
                            radial: hdg(comps[3])?,
                        },
                    },
                    parse_alt_spd(&comps[5..10])?,
                )
            }
            _ => return None,
        };

        let (alt_lim, spd_lim) = lims;
        Some(ProcSeg {
            leg,
            alt_lim,
            spd_lim,
            overfly: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Coordinate;

    fn dbs() -> (WaypointDb, NavaidDb) {
        let wptdb = WaypointDb::parse("ANEKI,50.046389,8.993056,ED\n").expect("waypoints");
        let navaiddb =
            NavaidDb::parse("FFM,FRANKFURT,114.90,0,1,0,50.052500,8.636389,364,ED,0\n")
                .expect("navaids");
        (wptdb, navaiddb)
    }

    fn refpt() -> Coordinate3 {
        Coordinate3::new(50.033306, 8.570456, 364.0)
    }

    #[test]
    fn parses_tf_leg() {
        let (wptdb, navaiddb) = dbs();
        let seg = ProcSeg::parse(
            "TF,ANEKI,50.046389,8.993056,0, ,0,0,0,0,2,4000,0,0,0,0,0,0",
            refpt(),
            &wptdb,
            &navaiddb,
        )
        .expect("TF should parse");
        assert_eq!(seg.code(), "TF");
        assert_eq!(seg.alt_lim, AltLimit::AtOrAbove(4000));
        assert_eq!(seg.end_wpt().expect("end").name, "ANEKI");
        assert!(seg.start_wpt().is_none());
    }

    #[test]
    fn parses_ca_leg_and_requires_alt() {
        let (wptdb, navaiddb) = dbs();
        let seg = ProcSeg::parse(
            "CA,0,250.0,2,1500,0,0,0,0,0,0",
            refpt(),
            &wptdb,
            &navaiddb,
        )
        .expect("CA should parse");
        assert_eq!(seg.code(), "CA");
        assert_eq!(seg.alt_lim, AltLimit::AtOrAbove(1500));
        assert!(seg.end_wpt().is_none());

        // CA without an altitude limit is malformed
        assert!(ProcSeg::parse(
            "CA,0,250.0,0,0,0,0,0,0,0,0",
            refpt(),
            &wptdb,
            &navaiddb
        )
        .is_none());
    }

    #[test]
    fn parses_cd_leg_with_navaid_resolution() {
        let (wptdb, navaiddb) = dbs();
        let seg = ProcSeg::parse(
            "CD,0,0,0,0,FFM,0,0,248.0,15.0,0,0,0,0,0,0,0,0",
            refpt(),
            &wptdb,
            &navaiddb,
        )
        .expect("CD should parse");
        match &seg.leg {
            PathTerm::CrsToDme {
                navaid, dist_nm, ..
            } => {
                assert_eq!(navaid.name, "FFM");
                assert_eq!(*dist_nm, 15.0);
            }
            other => panic!("wrong leg kind {}", other.code()),
        }
    }

    #[test]
    fn hold_copies_fix_into_terminator() {
        let (wptdb, navaiddb) = dbs();
        let seg = ProcSeg::parse(
            "HF,ANEKI,50.046389,8.993056,2,0,0,0,112.0,4.0,0,0,0,0,0,0,0,0,0",
            refpt(),
            &wptdb,
            &navaiddb,
        )
        .expect("HF should parse");
        assert_eq!(seg.start_wpt().expect("start").name, "ANEKI");
        assert_eq!(seg.end_wpt().expect("end").name, "ANEKI");
    }

    #[test]
    fn unknown_code_is_rejected() {
        let (wptdb, navaiddb) = dbs();
        assert!(ProcSeg::parse("ZZ,1,2,3", refpt(), &wptdb, &navaiddb).is_none());
    }
}
