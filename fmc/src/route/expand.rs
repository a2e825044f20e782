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

//! Leg expansion: resolves each route leg's end position by propagating the
//! previous leg's end forward, and emits the raw (pre-join) trajectory
//! segments.

use log::debug;

use crate::geom::{
    geo_displace_mag, geo_midpoint, hdg2dir, nm2met, vect_circ_isect, vect_vect_isect, Coordinate,
    FlatPlaneProj, WGS84,
};
use crate::nd::{PathTerm, ProcSeg};
use crate::route::leg_group::RouteLeg;
use crate::route::seg::{RouteSeg, SegJoin};
use crate::wmm::MagModel;

/// Displacement guess for altitude-terminated legs, NM. The real end point
/// depends on the vertical profile; such segments carry the alt-capture
/// flag.
const ALT_GUESS_DISPLACE: f64 = 100.0;

/// First non-disco leg after `i`.
pub(crate) fn next_ndisc_leg(legs: &[RouteLeg], i: usize) -> Option<usize> {
    legs.iter()
        .enumerate()
        .skip(i + 1)
        .find(|(_, rl)| !rl.is_disco())
        .map(|(idx, _)| idx)
}

/// Best intersection of a magnetic course from `cur_pos` with a circle of
/// `radius_m` around `center`: the closest intersection ahead of the
/// current position in the direction of travel.
fn find_best_circ_isect(
    cur_pos: Coordinate,
    mag_hdg: f64,
    center: Coordinate,
    radius_m: f64,
    wmm: &MagModel,
) -> Coordinate {
    let midpt = geo_midpoint(cur_pos, center);
    let fpp = FlatPlaneProj::gnomo(midpt, 0.0, Some(&WGS84), true);

    let cur_pos_v = fpp.geo2fpp(cur_pos);
    let dir_v = hdg2dir(wmm.mag2true(mag_hdg, cur_pos.at_elev(0.0)));
    let center_v = fpp.geo2fpp(center);
    if cur_pos_v.is_null() || center_v.is_null() {
        return Coordinate::NULL;
    }

    let isects = vect_circ_isect(dir_v, cur_pos_v, center_v, radius_m, false);
    let ahead: Vec<_> = isects
        .into_iter()
        .filter(|i| (*i - cur_pos_v).same_dir(dir_v))
        .collect();

    ahead
        .into_iter()
        .min_by(|a, b| {
            let da = (*a - cur_pos_v).abs();
            let db = (*b - cur_pos_v).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|i| fpp.fpp2geo(i))
        .unwrap_or(Coordinate::NULL)
}

/// End position of a distance-terminated leg (CD, FC, FD, VD).
fn dist_leg_end(cur_pos: Coordinate, seg: &ProcSeg, wmm: &MagModel) -> Coordinate {
    let (start, hdg, center, dist_nm) = match &seg.leg {
        PathTerm::CrsToDme {
            cmd,
            navaid,
            dist_nm,
        } => (cur_pos, cmd.hdg, navaid.pos, *dist_nm),
        PathTerm::FixToDist { fix, crs, dist_nm } => (fix.pos, *crs, fix.pos, *dist_nm),
        PathTerm::FixToDme {
            fix,
            crs,
            navaid,
            dist_nm,
        } => (fix.pos, *crs, navaid.pos, *dist_nm),
        PathTerm::HdgToDme {
            cmd,
            navaid,
            dist_nm,
        } => (cur_pos, cmd.hdg, navaid.pos, *dist_nm),
        _ => return Coordinate::NULL,
    };
    if start.is_null() {
        debug!(
            "cannot resolve {} leg: missing start position",
            seg.code()
        );
        return Coordinate::NULL;
    }
    find_best_circ_isect(start, hdg, center, nm2met(dist_nm), wmm)
}

/// End position of a radial-terminated leg (CR, VR): intersect the course
/// with the radial on a gnomonic plane centered between start and navaid,
/// accepting only intersections in the direction of travel.
fn radial_leg_end(cur_pos: Coordinate, seg: &ProcSeg, wmm: &MagModel) -> Coordinate {
    let (cmd, radial) = match &seg.leg {
        PathTerm::CrsToRadial { cmd, radial } | PathTerm::HdgToRadial { cmd, radial } => {
            (cmd, radial)
        }
        _ => return Coordinate::NULL,
    };
    if cur_pos.is_null() {
        return Coordinate::NULL;
    }

    let fpp = FlatPlaneProj::gnomo(
        geo_midpoint(cur_pos, radial.navaid.pos),
        0.0,
        Some(&WGS84),
        true,
    );
    let dir_v = hdg2dir(wmm.mag2true(cmd.hdg, cur_pos.at_elev(0.0)));
    let radial_dir_v = hdg2dir(wmm.mag2true(radial.radial, radial.navaid.pos.at_elev(0.0)));
    let navaid_v = fpp.geo2fpp(radial.navaid.pos);
    let cur_pos_v = fpp.geo2fpp(cur_pos);
    if navaid_v.is_null() || cur_pos_v.is_null() {
        return Coordinate::NULL;
    }

    match vect_vect_isect(dir_v, cur_pos_v, radial_dir_v, navaid_v, false) {
        Some(isect) if (isect - cur_pos_v).same_dir(dir_v) => fpp.fpp2geo(isect),
        _ => Coordinate::NULL,
    }
}

/// End position of an intercept-terminated leg (CI, VI): generate the next
/// leg's segment and intersect the commanded course with it.
fn intcp_leg_end(
    cur_pos: Coordinate,
    legs: &[RouteLeg],
    i: usize,
    wmm: &MagModel,
) -> Coordinate {
    let Some(next_i) = next_ndisc_leg(legs, i) else {
        return Coordinate::NULL;
    };
    if cur_pos.is_null() {
        return Coordinate::NULL;
    }
    let Some(seg) = legs[i].seg() else {
        return Coordinate::NULL;
    };
    let hdg = match &seg.leg {
        PathTerm::CrsToIntcp { cmd, .. } | PathTerm::HdgToIntcp { cmd, .. } => cmd.hdg,
        _ => return Coordinate::NULL,
    };

    let Some(next_seg) = find_leg_seg(legs, next_i, cur_pos, wmm) else {
        return Coordinate::NULL;
    };

    match next_seg.kind {
        crate::route::seg::SegKind::Direct { start, end } => {
            let fpp = FlatPlaneProj::gnomo(cur_pos, 0.0, Some(&WGS84), true);
            let cur_pos_v = fpp.geo2fpp(cur_pos);
            let start_v = fpp.geo2fpp(start);
            let end_v = fpp.geo2fpp(end);
            if cur_pos_v.is_null() || start_v.is_null() || end_v.is_null() {
                return Coordinate::NULL;
            }
            let s2e = end_v - start_v;
            let dir_v = hdg2dir(wmm.mag2true(hdg, cur_pos.at_elev(0.0)));
            match vect_vect_isect(dir_v, cur_pos_v, s2e, start_v, false) {
                Some(isect) if (isect - cur_pos_v).same_dir(dir_v) => fpp.fpp2geo(isect),
                _ => Coordinate::NULL,
            }
        }
        crate::route::seg::SegKind::Arc { center, .. } => {
            find_best_circ_isect(cur_pos, hdg, center, next_seg.arc_radius(), wmm)
        }
    }
}

/// Computes a leg's end position given the propagated current position.
/// Pure in (`cur_pos`, leg data, trailing legs, magnetic model).
pub(crate) fn leg_end_pos(
    cur_pos: Coordinate,
    legs: &[RouteLeg],
    i: usize,
    wmm: &MagModel,
) -> Coordinate {
    let Some(seg) = legs[i].seg() else {
        // discontinuity: the propagated position is lost
        return Coordinate::NULL;
    };

    match &seg.leg {
        // kinds whose end waypoint is right on the leg
        PathTerm::ArcToFix { fix, .. }
        | PathTerm::CrsToFix { fix, .. }
        | PathTerm::DirToFix { fix }
        | PathTerm::RadiusArcToFix { fix, .. }
        | PathTerm::TrkToFix { fix }
        | PathTerm::InitFix { fix } => fix.pos,
        PathTerm::HoldToAlt { hold, .. }
        | PathTerm::HoldToFix { hold }
        | PathTerm::HoldToManual { hold } => hold.wpt.pos,

        PathTerm::CrsToDme { .. }
        | PathTerm::FixToDist { .. }
        | PathTerm::FixToDme { .. }
        | PathTerm::HdgToDme { .. } => dist_leg_end(cur_pos, seg, wmm),

        PathTerm::CrsToRadial { .. } | PathTerm::HdgToRadial { .. } => {
            radial_leg_end(cur_pos, seg, wmm)
        }

        PathTerm::CrsToIntcp { .. } | PathTerm::HdgToIntcp { .. } => {
            intcp_leg_end(cur_pos, legs, i, wmm)
        }

        // altitude-terminated legs have no lateral end point; the vertical
        // profile decides where they end
        PathTerm::CrsToAlt { .. } | PathTerm::HdgToAlt { .. } | PathTerm::FixToAlt { .. } => {
            Coordinate::NULL
        }

        // manual termination has no automatic end
        PathTerm::FixToManual { .. } | PathTerm::HdgToManual { .. } => Coordinate::NULL,

        PathTerm::ProcTurnLeg { .. } => Coordinate::NULL,
    }
}

/// Completes a route segment for a leg whose start position is known.
pub(crate) fn complete_seg(seg: &ProcSeg, start: Coordinate, wmm: &MagModel) -> Option<RouteSeg> {
    let direct = |end: Coordinate| {
        if start.is_null() || end.is_null() {
            None
        } else {
            Some(RouteSeg::direct(start, end, SegJoin::Track))
        }
    };
    let alt_capture = |end: Coordinate| {
        direct(end).map(|mut rs| {
            rs.alt_capture = true;
            rs
        })
    };

    match &seg.leg {
        PathTerm::ArcToFix { arc, fix } => {
            let arc_start = geo_displace_mag(
                wmm,
                arc.navaid.pos,
                arc.start_radial,
                nm2met(arc.radius_nm),
            );
            if arc_start.is_null() {
                return None;
            }
            Some(RouteSeg::arc(
                arc_start,
                fix.pos,
                arc.navaid.pos,
                arc.cw,
                SegJoin::Track,
            ))
        }
        PathTerm::RadiusArcToFix { arc, fix } => {
            if start.is_null() {
                return None;
            }
            Some(RouteSeg::arc(
                start,
                fix.pos,
                arc.ctr_wpt.pos,
                arc.cw,
                SegJoin::Track,
            ))
        }
        PathTerm::CrsToAlt { cmd, .. } | PathTerm::HdgToAlt { cmd, .. } => {
            if start.is_null() {
                return None;
            }
            alt_capture(geo_displace_mag(wmm, start, cmd.hdg, nm2met(ALT_GUESS_DISPLACE)))
        }
        PathTerm::FixToAlt { fix, crs, .. } => {
            let end = geo_displace_mag(wmm, fix.pos, *crs, nm2met(ALT_GUESS_DISPLACE));
            if end.is_null() {
                return None;
            }
            let mut rs = RouteSeg::direct(fix.pos, end, SegJoin::Track);
            rs.alt_capture = true;
            Some(rs)
        }
        PathTerm::CrsToDme { .. } | PathTerm::HdgToDme { .. } => {
            direct(dist_leg_end(start, seg, wmm))
        }
        PathTerm::FixToDist { fix, crs, dist_nm } => {
            let end = geo_displace_mag(wmm, fix.pos, *crs, nm2met(*dist_nm));
            if end.is_null() {
                return None;
            }
            Some(RouteSeg::direct(fix.pos, end, SegJoin::Track))
        }
        PathTerm::FixToDme { fix, .. } => {
            let end = dist_leg_end(start, seg, wmm);
            if end.is_null() {
                return None;
            }
            Some(RouteSeg::direct(fix.pos, end, SegJoin::Track))
        }
        PathTerm::CrsToRadial { .. } | PathTerm::HdgToRadial { .. } => {
            direct(radial_leg_end(start, seg, wmm))
        }
        PathTerm::CrsToFix { fix, .. }
        | PathTerm::DirToFix { fix }
        | PathTerm::TrkToFix { fix }
        | PathTerm::InitFix { fix } => direct(fix.pos),
        PathTerm::HoldToAlt { hold, .. }
        | PathTerm::HoldToFix { hold }
        | PathTerm::HoldToManual { hold } => direct(hold.wpt.pos),
        PathTerm::ProcTurnLeg { turn } => direct(turn.startpt.pos),
        PathTerm::CrsToIntcp { .. }
        | PathTerm::HdgToIntcp { .. }
        | PathTerm::FixToManual { .. }
        | PathTerm::HdgToManual { .. } => None,
    }
}

/// Constructs the leg segment for the leg at `i`, for kinds with a definite
/// start: AF (arc), FA/FC/FD (start on their fix), and IF (connects to the
/// following leg).
pub(crate) fn find_leg_seg(
    legs: &[RouteLeg],
    i: usize,
    oldpos: Coordinate,
    wmm: &MagModel,
) -> Option<RouteSeg> {
    let seg = legs[i].seg()?;
    match &seg.leg {
        PathTerm::ArcToFix { .. }
        | PathTerm::FixToAlt { .. }
        | PathTerm::FixToDist { .. }
        | PathTerm::FixToDme { .. } => complete_seg(seg, oldpos, wmm),
        PathTerm::InitFix { fix } => {
            let next_i = next_ndisc_leg(legs, i)?;
            let pos = fix.pos;
            complete_seg(legs[next_i].seg()?, pos, wmm)
        }
        PathTerm::ProcTurnLeg { .. } => None,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nd::{HdgCmd, Radial, TurnDir, Waypoint};
    use world_magnetic_model::time::Date;

    fn wmm() -> MagModel {
        MagModel::new(Date::from_ordinal_date(2026, 100).expect("date")).expect("model")
    }

    fn wpt(name: &str, lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(name, Coordinate::new(lat, lon))
    }

    fn leg(seg: PathTerm) -> RouteLeg {
        RouteLeg::from_seg(ProcSeg::new(seg))
    }

    #[test]
    fn direct_leg_ends_on_fix() {
        let legs = vec![leg(PathTerm::DirToFix {
            fix: wpt("AAA", 50.0, 8.0),
        })];
        let wmm = wmm();
        let end = leg_end_pos(Coordinate::new(49.0, 8.0), &legs, 0, &wmm);
        assert!(end.pos_eq(&Coordinate::new(50.0, 8.0)));
    }

    #[test]
    fn disco_loses_position() {
        let legs = vec![RouteLeg::disco()];
        let wmm = wmm();
        assert!(leg_end_pos(Coordinate::new(49.0, 8.0), &legs, 0, &wmm).is_null());
    }

    #[test]
    fn dist_leg_intersects_circle_ahead() {
        // Heading roughly north from south of the navaid must terminate on
        // the near side of the 10 NM DME circle.
        let navaid = wpt("FFM", 50.0, 8.0);
        let wmm = wmm();
        let legs = vec![leg(PathTerm::HdgToDme {
            cmd: HdgCmd {
                hdg: wmm.true2mag(360.0, Coordinate::new(49.0, 8.0).at_elev(0.0)),
                turn: TurnDir::Any,
            },
            navaid,
            dist_nm: 10.0,
        })];
        let end = leg_end_pos(Coordinate::new(49.0, 8.0), &legs, 0, &wmm);
        assert!(!end.is_null());
        // below the navaid, 10 NM off: about 49.83 deg latitude
        assert!(end.lat < 50.0 && end.lat > 49.7, "end {end}");
        let dist = crate::geom::gc_distance(end, Coordinate::new(50.0, 8.0));
        assert!((dist - nm2met(10.0)).abs() < 100.0, "dist {dist}");
    }

    #[test]
    fn dist_leg_needs_start() {
        let legs = vec![leg(PathTerm::HdgToDme {
            cmd: HdgCmd {
                hdg: 360.0,
                turn: TurnDir::Any,
            },
            navaid: wpt("FFM", 50.0, 8.0),
            dist_nm: 10.0,
        })];
        assert!(leg_end_pos(Coordinate::NULL, &legs, 0, &wmm()).is_null());
    }

    #[test]
    fn radial_leg_ahead_only() {
        let wmm = wmm();
        let cur = Coordinate::new(49.0, 8.0);
        let navaid = wpt("FFM", 49.5, 9.0);
        // fly north, cross the navaid's 270 radial (pointing west)
        let legs = vec![leg(PathTerm::HdgToRadial {
            cmd: HdgCmd {
                hdg: wmm.true2mag(360.0, cur.at_elev(0.0)),
                turn: TurnDir::Any,
            },
            radial: Radial {
                navaid: navaid.clone(),
                radial: wmm.true2mag(270.0, navaid.pos.at_elev(0.0)),
            },
        })];
        let end = leg_end_pos(cur, &legs, 0, &wmm);
        assert!(!end.is_null());
        assert!((end.lat - 49.5).abs() < 0.02, "end {end}");
        assert!((end.lon - 8.0).abs() < 0.02, "end {end}");
    }

    #[test]
    fn intcp_leg_crosses_next_track() {
        let wmm = wmm();
        let cur = Coordinate::new(49.0, 8.0);
        // next leg runs from (49.5, 7) east to (49.5, 10); intercept by
        // flying north
        let legs = vec![
            leg(PathTerm::HdgToIntcp {
                cmd: HdgCmd {
                    hdg: wmm.true2mag(360.0, cur.at_elev(0.0)),
                    turn: TurnDir::Any,
                },
                navaid: None,
            }),
            leg(PathTerm::FixToDist {
                fix: wpt("XYZ", 49.5, 7.0),
                crs: wmm.true2mag(90.0, Coordinate::new(49.5, 7.0).at_elev(0.0)),
                dist_nm: 120.0,
            }),
        ];
        let end = leg_end_pos(cur, &legs, 0, &wmm);
        assert!(!end.is_null());
        assert!((end.lat - 49.5).abs() < 0.05, "end {end}");
    }

    #[test]
    fn alt_leg_has_no_lateral_end() {
        let legs = vec![leg(PathTerm::CrsToAlt {
            cmd: HdgCmd {
                hdg: 250.0,
                turn: TurnDir::Any,
            },
            alt: crate::nd::AltLimit::AtOrAbove(1500),
        })];
        assert!(leg_end_pos(Coordinate::new(50.0, 8.0), &legs, 0, &wmm()).is_null());
    }

    #[test]
    fn alt_seg_is_flagged_alt_capture() {
        let seg = ProcSeg::new(PathTerm::CrsToAlt {
            cmd: HdgCmd {
                hdg: 250.0,
                turn: TurnDir::Any,
            },
            alt: crate::nd::AltLimit::AtOrAbove(1500),
        });
        let rs = complete_seg(&seg, Coordinate::new(50.0, 8.0), &wmm()).expect("seg");
        assert!(rs.alt_capture);
    }
}
