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

//! Segment joiner: turn transitions between consecutive trajectory
//! segments.
//!
//! All intersections run on a gnomonic projection centered at the outbound
//! segment's start point, where geodesics are straight lines and arcs stay
//! near-circular. The projection error over the distances involved is an
//! order of magnitude below RNP values of interest.

use crate::geom::{
    circ_circ_isect, dir2hdg, hdg2dir, is_on_arc, kt2mps, rel_hdg, vect_circ_isect,
    vect_vect_isect, Coordinate, FlatPlaneProj, Vec2,
};
use crate::route::seg::{RouteSeg, SegJoin, SegKind};

/// Heading changes below this stay unjoined (degrees).
const ARC_JOIN_THR: f64 = 1.0;
/// Standard rate turn, degrees per second.
const STD_RATE_TURN: f64 = 3.0;
/// Track re-intercept angle (degrees).
const STD_INTCP_ANGLE: f64 = 30.0;
/// Search-ray length for tangent/secant constructions, meters.
const INTCP_SRCH_DIST: f64 = 1e9;

/// Radius of a flight arc at `speed` knots and `turn_rate` degrees per
/// second, in meters.
pub(crate) fn calc_arc_radius(speed: f64, turn_rate: f64) -> f64 {
    ((360.0 / turn_rate) * kt2mps(speed)) / (2.0 * std::f64::consts::PI)
}

fn point_is_on_arc(p: Vec2, c: Vec2, s: Vec2, e: Vec2, cw: bool) -> bool {
    let p_angle = dir2hdg(p - c);
    let angle1 = dir2hdg(s - c);
    let angle2 = dir2hdg(e - c);
    is_on_arc(p_angle, angle1, angle2, cw)
}

/// What happens to the inbound segment.
enum Rs1Act {
    /// Shorten to end at the given position and mark joined.
    SetEnd(Coordinate),
    /// The segment got consumed by the transition entirely.
    Remove,
    /// Leave geometry alone, just mark joined.
    JustJoin,
}

/// What happens to the outbound segment.
enum Rs2Act {
    SetStart(Coordinate),
    /// The transition reaches the outbound endpoint directly.
    Remove,
    Keep,
}

struct JoinPlan {
    rs1: Rs1Act,
    inserted: Vec<RouteSeg>,
    rs2: Rs2Act,
}

impl JoinPlan {
    fn pass_through() -> Self {
        JoinPlan {
            rs1: Rs1Act::JustJoin,
            inserted: Vec::new(),
            rs2: Rs2Act::Keep,
        }
    }
}

/// Applies a join plan to the segment list at position `i` (the inbound
/// segment; `i + 1` is the outbound one).
fn apply(segs: &mut Vec<RouteSeg>, i: usize, plan: JoinPlan) {
    match plan.rs2 {
        Rs2Act::SetStart(pos) => segs[i + 1].set_start(pos),
        Rs2Act::Remove => {
            segs.remove(i + 1);
        }
        Rs2Act::Keep => (),
    }
    for (k, s) in plan.inserted.into_iter().enumerate() {
        segs.insert(i + 1 + k, s);
    }
    match plan.rs1 {
        Rs1Act::SetEnd(pos) => {
            segs[i].set_end(pos);
            segs[i].join = SegJoin::Simple;
        }
        Rs1Act::Remove => {
            segs.remove(i);
        }
        Rs1Act::JustJoin => segs[i].join = SegJoin::Simple,
    }
}

/// Inbound geometry in projected space: `p1` is the direct start or the arc
/// center, `leg1_dir` the direction of travel at `p2`.
struct Inbound {
    p1: Vec2,
    leg1_dir: Vec2,
    /// Projected arc start for an arc inbound.
    p0: Option<Vec2>,
    cw: bool,
}

fn project_inbound(rs1: &RouteSeg, fpp: &FlatPlaneProj, p2: Vec2) -> Inbound {
    match rs1.kind {
        SegKind::Direct { start, .. } => {
            let p1 = fpp.geo2fpp(start);
            Inbound {
                p1,
                leg1_dir: (p2 - p1).set_abs(1.0),
                p0: None,
                cw: false,
            }
        }
        SegKind::Arc {
            start, center, cw, ..
        } => {
            let p1 = fpp.geo2fpp(center);
            Inbound {
                p1,
                leg1_dir: (p2 - p1).norm(cw).set_abs(1.0),
                p0: Some(fpp.geo2fpp(start)),
                cw,
            }
        }
    }
}

/// Joins a segment to a following DIRECT segment: a single transition arc
/// when it honors the RNP, a track-rejoin or direct-to rejoin otherwise.
fn join_dir(rs1: &RouteSeg, rs2: &RouteSeg, r: f64, rnp: f64, follow_track: bool) -> JoinPlan {
    let SegKind::Direct {
        start: rs2_start,
        end: rs2_end,
    } = rs2.kind
    else {
        return JoinPlan::pass_through();
    };

    let fpp = FlatPlaneProj::gnomo(rs2_start, 0.0, None, true);
    let p2 = fpp.geo2fpp(rs2_start);
    let p3 = fpp.geo2fpp(rs2_end);
    let inb = project_inbound(rs1, &fpp, p2);
    let (p1, leg1_dir) = (inb.p1, inb.leg1_dir);
    let leg2 = p3 - p2;
    let rhdg = rel_hdg(dir2hdg(leg1_dir), dir2hdg(leg2));
    let cw = rhdg >= 0.0;

    if rhdg.abs() < ARC_JOIN_THR {
        // shallow enough to just pass through
        return JoinPlan::pass_through();
    }

    let reintcp = || {
        if follow_track {
            join_dir_reintcp_trk(rs1, &fpp, r, rnp, p1, p2, p3, leg2, rhdg, cw)
        } else {
            join_dir_reintcp_dir(rs1, &fpp, r, rnp, p1, p2, p3, rhdg, cw)
        }
    };

    if rhdg.abs() > 180.0 - ARC_JOIN_THR {
        // almost a complete course reversal, a single turn cannot do it
        return reintcp();
    }

    // dp2 displaces leg2 in parallel towards the join's inner angle
    let dp2 = leg2.norm(cw).set_abs(r);
    let (c, i1) = match rs1.kind {
        SegKind::Direct { .. } => {
            let leg1 = p2 - p1;
            // dp1 displaces leg1 the same way; the displaced legs'
            // intersection is the transition arc's center
            let dp1 = leg1_dir.norm(cw).set_abs(r);
            let Some(c) = vect_vect_isect(leg1, p1 + dp1, leg2, p2 + dp2, false) else {
                return reintcp();
            };
            let Some(i1) = vect_vect_isect(dp1, c, leg1, p1, false) else {
                return reintcp();
            };
            // tangent point past our source point
            if p1.dist(p2) - i1.dist(p2) <= 0.0 {
                return reintcp();
            }
            (c, i1)
        }
        SegKind::Arc { .. } => {
            let outer = (inb.cw && rhdg < 0.0) || (!inb.cw && rhdg > 0.0);
            let g = p2.dist(p1);
            // the turn must not be too tight to execute
            if !outer && g <= r {
                return reintcp();
            }
            let mut vs = vect_circ_isect(leg2, p2 + dp2, p1, if outer { g + r } else { g - r },
                false);
            vs.sort_by(|a, b| {
                a.dist(p2)
                    .partial_cmp(&b.dist(p2))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let Some(&c) = vs.first() else {
                return reintcp();
            };
            let hits = vect_circ_isect((c - p1).set_abs(INTCP_SRCH_DIST), p1, p1, g, true);
            let Some(&i1) = hits.first() else {
                return reintcp();
            };
            let p0 = inb.p0.unwrap_or(Vec2::NULL);
            if i1 == p0 || !point_is_on_arc(i1, p1, p0, p2, inb.cw) {
                return reintcp();
            }
            (c, i1)
        }
    };

    if c.dist(p2) - r > rnp {
        // arc deviates too far from the joining waypoint
        return reintcp();
    }
    let Some(i2) = vect_vect_isect(dp2, c, leg2, p2, false) else {
        return reintcp();
    };
    if i2.dist(p2) >= leg2.abs() {
        // arc would join beyond the outbound leg
        return reintcp();
    }

    let i1_pos = fpp.fpp2geo(i1);
    let i2_pos = fpp.fpp2geo(i2);
    let c_pos = fpp.fpp2geo(c);

    JoinPlan {
        rs1: Rs1Act::SetEnd(i1_pos),
        inserted: vec![RouteSeg::arc(i1_pos, i2_pos, c_pos, cw, SegJoin::Simple)],
        rs2: Rs2Act::SetStart(i2_pos),
    }
}

/// Track-rejoin: a first arc grazing the RNP boundary, a re-intercept line
/// at the standard angle and a smoothing arc back onto the outbound track.
/// Degrades to the tight-turn variant, then to a forced flyover (RNP 0),
/// then to a direct-to rejoin.
#[allow(clippy::too_many_arguments)]
fn join_dir_reintcp_trk(
    rs1: &RouteSeg,
    fpp: &FlatPlaneProj,
    r: f64,
    rnp: f64,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    leg2: Vec2,
    rhdg: f64,
    cw: bool,
) -> JoinPlan {
    let mut rs1_remove = false;
    // when no track rejoin fits, degrade to a direct-to rejoin
    let fallback = || join_dir_reintcp_dir(rs1, fpp, r, rnp, p1, p2, p3, rhdg, cw);

    // place the first arc so it grazes the outbound at RNP from p2
    let p2_c_len = rnp + r;
    let p2_i1_len = (p2_c_len * p2_c_len - r * r).sqrt();
    let leg2_len = leg2.abs();

    let (i1, c1) = match rs1.kind {
        SegKind::Direct { .. } => {
            let leg1 = p2 - p1;
            let mut p1_i1_len = leg1.abs() - p2_i1_len;
            if p1_i1_len < 0.0 {
                // leg1 is being shortened to nothing
                p1_i1_len = 0.0;
                rs1_remove = true;
            }
            let i1 = p1 + leg1.set_abs(p1_i1_len);
            let c1 = i1 + leg1.norm(cw).set_abs(r);
            (i1, c1)
        }
        SegKind::Arc {
            start, cw: cw1, ..
        } => {
            let outer = (cw1 && rhdg < 0.0) || (!cw1 && rhdg > 0.0);
            let g = p2.dist(p1);
            if !outer && g < r {
                return fallback();
            }
            let srch_g = if outer { g + r } else { g - r };
            let srch_r = srch_g.min(r + rnp);
            let vs = circ_circ_isect(p1, srch_g, p2, srch_r);
            if vs.is_empty() {
                return fallback();
            }
            let c1 = if vs.len() == 2 {
                let rhdg1 = rel_hdg(dir2hdg(p2 - p1), dir2hdg(vs[0] - p2));
                if (cw1 && rhdg1 <= 0.0) || (!cw1 && rhdg1 >= 0.0) {
                    vs[0]
                } else {
                    vs[1]
                }
            } else {
                vs[0]
            };
            let hits = vect_circ_isect((c1 - p1).set_abs(INTCP_SRCH_DIST), p1, p1, g, true);
            let Some(&first_hit) = hits.first() else {
                return fallback();
            };
            let mut i1 = first_hit;
            let p0 = fpp.geo2fpp(start);
            if i1 == p0 || !point_is_on_arc(i1, p1, p0, p2, cw1) {
                i1 = p0;
                rs1_remove = true;
            }
            (i1, c1)
        }
    };
    let i1_pos = fpp.fpp2geo(i1);
    let c1_pos = fpp.fpp2geo(c1);

    // `t' is where the re-intercept line leaves the first arc
    let c1_t = leg2
        .rot(if cw {
            STD_INTCP_ANGLE - 90.0
        } else {
            90.0 - STD_INTCP_ANGLE
        })
        .set_abs(r);
    let t = c1 + c1_t;

    let smooth_len = (STD_INTCP_ANGLE / 2.0).to_radians().tan() * r;
    // `i2' is where the re-intercept line crosses the outbound leg
    let t_i2_dir = c1_t.norm(cw).set_abs(INTCP_SRCH_DIST);
    let i2 = vect_vect_isect(t_i2_dir, t, leg2, p2, true);

    let rs1_act = |rs1_remove: bool| {
        if rs1_remove {
            Rs1Act::Remove
        } else {
            Rs1Act::SetEnd(i1_pos)
        }
    };

    // the intercept must happen before reaching p3 with room to spare for
    // the smoothing arc
    if let Some(i2) = i2.filter(|&i2| {
        i2.dist(t) > smooth_len && i2.dist(p2) + smooth_len + rnp < leg2_len
    }) {
        let t_i2 = i2 - t;
        let i3 = t + t_i2.set_abs(t_i2.abs() - smooth_len);
        let i4 = p2 + leg2.set_abs(i2.dist(p2) + smooth_len);
        let c3 = i4 + leg2.norm(!cw).set_abs(r);

        let t_pos = fpp.fpp2geo(t);
        let i3_pos = fpp.fpp2geo(i3);
        let i4_pos = fpp.fpp2geo(i4);
        let c3_pos = fpp.fpp2geo(c3);

        return JoinPlan {
            rs1: rs1_act(rs1_remove),
            inserted: vec![
                RouteSeg::arc(i1_pos, t_pos, c1_pos, cw, SegJoin::Simple),
                RouteSeg::direct(t_pos, i3_pos, SegJoin::Simple),
                RouteSeg::arc(i3_pos, i4_pos, c3_pos, !cw, SegJoin::Simple),
            ],
            rs2: Rs2Act::SetStart(i4_pos),
        };
    }

    // tight-turn variant: continue on the first arc and rejoin as sharply
    // as possible
    let p2m = p2 + leg2.norm(!cw).set_abs(r);
    let mut vs = vect_circ_isect(leg2, p2m, c1, 2.0 * r, false);
    if vs.is_empty() {
        // final resort: force the flyover with RNP 0
        if rnp != 0.0 {
            return join_dir_reintcp_trk(rs1, fpp, r, 0.0, p1, p2, p3, leg2, rhdg, cw);
        }
        return fallback();
    }
    vs.sort_by(|a, b| {
        a.dist(p3)
            .partial_cmp(&b.dist(p3))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let c2 = vs[0];
    let c2_pos = fpp.fpp2geo(c2);
    let c1_c2 = c2 - c1;
    let hits = vect_circ_isect(c1_c2, c1, c1, r, true);
    let Some(&t2) = hits.first() else {
        return fallback();
    };
    let t3 = vect_vect_isect(leg2.norm(cw), c2, leg2, p2, true);

    if let Some(t3) = t3 {
        let t2_pos = fpp.fpp2geo(t2);
        let t3_pos = fpp.fpp2geo(t3);
        JoinPlan {
            rs1: rs1_act(rs1_remove),
            inserted: vec![
                RouteSeg::arc(i1_pos, t2_pos, c1_pos, cw, SegJoin::Simple),
                RouteSeg::arc(t2_pos, t3_pos, c2_pos, !cw, SegJoin::Simple),
            ],
            rs2: Rs2Act::SetStart(t3_pos),
        }
    } else {
        // rejoin directly towards p3 from the first arc
        let c1_p3 = p3 - c1;
        let (t2, reaches_p3) = if c1_p3.abs() <= r {
            let hits = vect_circ_isect(c1_p3.set_abs(2.0 * r), c1, c1, r, true);
            let Some(&t2) = hits.first() else {
                return fallback();
            };
            (t2, true)
        } else {
            let p3_c1_t2_angle = (r / c1_p3.abs()).acos().to_degrees();
            let c1_t2 = c1_p3
                .rot(if cw { -p3_c1_t2_angle } else { p3_c1_t2_angle })
                .set_abs(r);
            (c1 + c1_t2, false)
        };

        if !point_is_on_arc(p2, c1, i1, t2, cw) {
            return fallback();
        }

        let t2_pos = fpp.fpp2geo(t2);
        JoinPlan {
            rs1: rs1_act(rs1_remove),
            inserted: vec![RouteSeg::arc(i1_pos, t2_pos, c1_pos, cw, SegJoin::Simple)],
            rs2: if reaches_p3 {
                Rs2Act::Remove
            } else {
                Rs2Act::SetStart(t2_pos)
            },
        }
    }
}

/// Direct-to rejoin: one arc at the RNP boundary, then the tangent line
/// from the outbound endpoint.
#[allow(clippy::too_many_arguments)]
fn join_dir_reintcp_dir(
    rs1: &RouteSeg,
    fpp: &FlatPlaneProj,
    r: f64,
    rnp: f64,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    rhdg: f64,
    cw: bool,
) -> JoinPlan {
    let errout = JoinPlan::pass_through;

    if rhdg.abs() < ARC_JOIN_THR {
        return errout();
    }

    let (i1, c) = match rs1.kind {
        SegKind::Direct { .. } => {
            let leg1 = p2 - p1;
            let dc = leg1.norm(cw).set_abs(r);

            let mut vs = vect_circ_isect(leg1, p1 + dc, p2, r + rnp, true);
            if vs.is_empty() {
                let i1 = p2;
                (i1, i1 + dc)
            } else {
                vs.sort_by(|a, b| {
                    a.dist(p1)
                        .partial_cmp(&b.dist(p1))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                let c = vs[0];
                match vect_vect_isect(-dc, c, leg1, p1, false) {
                    Some(i1)
                        if (i1 - p1).same_dir(leg1) && p1.dist(i1) <= p1.dist(p2) =>
                    {
                        (i1, c)
                    }
                    _ => {
                        let i1 = p2;
                        (i1, i1 + dc)
                    }
                }
            }
        }
        SegKind::Arc {
            start, cw: cw1, ..
        } => {
            let outer = (cw1 && !cw) || (!cw1 && cw);
            let g = (p2 - p1).abs();
            let srch_g = if outer { g + r } else { g - r };
            if srch_g <= 0.0 {
                return errout();
            }
            let vs = circ_circ_isect(p1, srch_g, p2, r + rnp);
            if vs.is_empty() {
                return errout();
            }
            let c_rhdg = rel_hdg(dir2hdg(p2 - p1), dir2hdg(vs[0] - p1));
            let mut c = vs[0];
            if vs.len() == 2 && ((cw1 && c_rhdg > 0.0) || (!cw1 && c_rhdg < 0.0)) {
                c = vs[1];
            }
            let p0 = fpp.geo2fpp(start);
            if !point_is_on_arc(c, p1, p0, p2, cw1) {
                let i1 = p0;
                let c = i1 + (i1 - p1).set_abs(if outer { r } else { -r });
                (i1, c)
            } else {
                let hits = vect_circ_isect((c - p1).set_abs(INTCP_SRCH_DIST), p1, p1, g, true);
                let Some(&i1) = hits.first() else {
                    return errout();
                };
                (i1, c)
            }
        }
    };

    let p3_c = c - p3;
    let p3_c_dist = p3_c.abs();
    let (i2, rs2_act) = if p3_c_dist < r {
        // the outbound endpoint is inside the turn, no rejoin possible
        return errout();
    } else if p3_c_dist == r {
        (p3, Rs2Act::Remove)
    } else {
        let theta = (r / p3_c_dist).asin().to_degrees();
        let p3_i2_hdg = dir2hdg(p3_c) - theta;
        let p3_i2_dist = (p3_c_dist * p3_c_dist - r * r).sqrt();
        let i2 = p3 + hdg2dir(p3_i2_hdg).set_abs(p3_i2_dist);
        (i2, Rs2Act::Keep)
    };

    let i1_pos = fpp.fpp2geo(i1);
    let c_pos = fpp.fpp2geo(c);
    let i2_pos = fpp.fpp2geo(i2);

    JoinPlan {
        rs1: Rs1Act::SetEnd(i1_pos),
        inserted: vec![RouteSeg::arc(i1_pos, i2_pos, c_pos, cw, SegJoin::Simple)],
        rs2: match rs2_act {
            Rs2Act::Keep => Rs2Act::SetStart(i2_pos),
            other => other,
        },
    }
}

fn join_arc_find_c1_i1(
    fpp: &FlatPlaneProj,
    p1: Vec2,
    p2: Vec2,
    r: f64,
    g: f64,
    outer: bool,
    rnp: f64,
    rhdg: f64,
    rs1_start: Coordinate,
    rs1_cw: bool,
) -> Option<(Vec2, Vec2, bool)> {
    let g1 = p2.dist(p1);
    let outer1 =
        (rhdg > 180.0 - ARC_JOIN_THR) || (rs1_cw && rhdg < 0.0) || (!rs1_cw && rhdg > 0.0);
    let srch_g1 = if outer1 { g1 + r } else { g1 - r };
    let srch_g = if outer { g + r } else { g - r };
    if srch_g <= 0.0 {
        return None;
    }
    let p0 = fpp.geo2fpp(rs1_start);

    let vs = circ_circ_isect(p2, r + rnp, p1, srch_g1);
    let mut c1 = Vec2::NULL;
    let mut i1 = Vec2::NULL;
    if !vs.is_empty() {
        let c1_rhdg = rel_hdg(dir2hdg(p2 - p1), dir2hdg(vs[0] - p1));
        let cand = if vs.len() == 2 && ((rs1_cw && c1_rhdg > 0.0) || (!rs1_cw && c1_rhdg < 0.0)) {
            vs[1]
        } else {
            vs[0]
        };
        let hits = vect_circ_isect((cand - p1).set_abs(INTCP_SRCH_DIST), p1, p1, g1, true);
        if let Some(&hit) = hits.first() {
            if point_is_on_arc(hit, p1, p0, p2, rs1_cw) {
                c1 = cand;
                i1 = hit;
            }
        }
    }
    if c1.is_null() {
        // the inbound arc got consumed; start the transition at its start
        let i1p = p0;
        return Some((i1p + (p1 - i1p).set_abs(r), i1p, true));
    }
    Some((c1, i1, false))
}

/// Joins a segment to a following ARC segment, either with one direct
/// transition arc or a two-arc reintercept crossing the outbound arc.
fn join_arc(rs1: &RouteSeg, rs2: &RouteSeg, r: f64, rnp: f64) -> JoinPlan {
    let SegKind::Arc {
        start: rs2_start,
        end: rs2_end,
        center: rs2_center,
        cw,
    } = rs2.kind
    else {
        return JoinPlan::pass_through();
    };
    let errout = JoinPlan::pass_through;

    let fpp = FlatPlaneProj::gnomo(rs2_start, 0.0, None, true);
    let p2 = fpp.geo2fpp(rs2_start);
    let p3 = fpp.geo2fpp(rs2_end);
    let inb = project_inbound(rs1, &fpp, p2);
    let (p1, leg1_dir) = (inb.p1, inb.leg1_dir);
    let c = fpp.geo2fpp(rs2_center);
    let g = c.dist(p2);
    let rhdg = rel_hdg(dir2hdg(leg1_dir), dir2hdg((p2 - c).norm(cw)));

    if rhdg.abs() < ARC_JOIN_THR {
        return JoinPlan::pass_through();
    }
    // joining the outbound arc from the outside: near course reversal, or
    // turning against the arc's own direction
    let outer = (rhdg.abs() > 180.0 - ARC_JOIN_THR) || (if cw { rhdg < 0.0 } else { rhdg > 0.0 });

    let mut rs1_remove = false;

    // attempt the direct transition arc first
    let mut c1 = Vec2::NULL;
    let mut i1 = Vec2::NULL;
    match rs1.kind {
        SegKind::Direct { .. } => {
            let leg1 = p2 - p1;
            let dp1 = leg1.norm(if outer { !cw } else { cw }).set_abs(r);
            if outer || g > r {
                // offset leg1 sideways by r and intersect the outbound
                // arc's radius +- r; the hit closer to p2 is the center
                let mut vs = vect_circ_isect(
                    leg1,
                    p1 + dp1,
                    c,
                    if outer { g + r } else { g - r },
                    true,
                );
                vs.sort_by(|a, b| {
                    a.dist(p2)
                        .partial_cmp(&b.dist(p2))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                if let Some(&cand) = vs.first() {
                    if cand.dist(p2) - r <= rnp {
                        if let Some(hit) = vect_vect_isect(-dp1, cand, leg1, p1, false) {
                            c1 = cand;
                            i1 = hit;
                        }
                    }
                }
            }
        }
        SegKind::Arc { cw: cw1, .. } => {
            let outer1 = (rhdg.abs() > 180.0 - ARC_JOIN_THR)
                || (cw1 && rhdg < 0.0)
                || (!cw1 && rhdg > 0.0);
            let g1 = p2.dist(p1);
            if (outer1 || g1 > r) && (outer || g > r) {
                let vs = circ_circ_isect(
                    p1,
                    if outer1 { g1 + r } else { g1 - r },
                    c,
                    if outer { g + r } else { g - r },
                );
                if !vs.is_empty() {
                    let c1_rhdg = rel_hdg(dir2hdg(p2 - p1), dir2hdg(vs[0] - p1));
                    let mut cand = vs[0];
                    if vs.len() == 2
                        && ((cw1 && c1_rhdg > 0.0)
                            || (!cw1 && c1_rhdg < 0.0)
                            || (outer == outer1 && vs[0].dist(p2) > vs[1].dist(p2))
                            || (outer != outer1 && vs[0].dist(p2) < vs[1].dist(p2)))
                    {
                        cand = vs[1];
                    }
                    if cand.dist(p2) - r <= rnp {
                        let hits = vect_circ_isect(
                            (cand - p1).set_abs(INTCP_SRCH_DIST),
                            p1,
                            p1,
                            g1,
                            true,
                        );
                        if let Some(&hit) = hits.first() {
                            c1 = cand;
                            i1 = hit;
                        }
                    }
                }
            }
        }
    }

    if !c1.is_null() {
        // single transition arc: the ray from the outbound center through
        // c1 hits the outbound arc at the hand-off point
        let hits = vect_circ_isect((c1 - c).set_abs(INTCP_SRCH_DIST), c, c, g, true);
        let Some(&i2) = hits.first() else {
            return errout();
        };

        let i1_pos = fpp.fpp2geo(i1);
        let i2_pos = fpp.fpp2geo(i2);
        let c1_pos = fpp.fpp2geo(c1);
        return JoinPlan {
            rs1: Rs1Act::SetEnd(i1_pos),
            inserted: vec![RouteSeg::arc(
                i1_pos,
                i2_pos,
                c1_pos,
                if outer { !cw } else { cw },
                SegJoin::Simple,
            )],
            rs2: Rs2Act::SetStart(i2_pos),
        };
    }

    if !(outer || g > r) {
        return errout();
    }

    // two-arc reintercept: cross the outbound arc and come back from the
    // other side with an opposite-direction arc
    let (c1, i1) = match rs1.kind {
        SegKind::Direct { .. } => {
            // place the first arc as far back from p2 as rnp allows
            let mut p2_i1_len = ((rnp + r) * (rnp + r) - r * r).sqrt();
            let leg1 = p2 - p1;
            if p2_i1_len > leg1.abs() {
                rs1_remove = true;
                p2_i1_len = leg1.abs();
            }
            let i1 = p2 + (-leg1).set_abs(p2_i1_len);
            let c1 = i1 + leg1.norm(if outer { !cw } else { cw }).set_abs(r);
            (c1, i1)
        }
        SegKind::Arc { start, cw: cw1, .. } => {
            match join_arc_find_c1_i1(&fpp, p1, p2, r, g, outer, rnp, rhdg, start, cw1) {
                Some((c1, i1, remove)) => {
                    rs1_remove = remove;
                    (c1, i1)
                }
                None => return errout(),
            }
        }
    };

    let mut vs = circ_circ_isect(c1, 2.0 * r, c, if outer { g - r } else { g + r });
    if vs.is_empty() {
        return errout();
    }
    vs.sort_by(|a, b| {
        b.dist(p2)
            .partial_cmp(&a.dist(p2))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let c2 = vs[0];
    let hits = vect_circ_isect((c2 - c1).set_abs(INTCP_SRCH_DIST), c1, c1, r, true);
    let Some(&i4) = hits.first() else {
        return errout();
    };
    let hits = vect_circ_isect((c2 - c).set_abs(INTCP_SRCH_DIST), c, c, g, true);
    let Some(&i5) = hits.first() else {
        return errout();
    };
    // the second arc must point towards the outbound arc without relooping
    let intcp_angle = rel_hdg(dir2hdg((i4 - c2).norm(cw)), dir2hdg((i4 - c).norm(cw)));
    if (!cw && intcp_angle >= 0.0) || (cw && intcp_angle <= 0.0) {
        return errout();
    }
    // and the rejoin must land on the outbound arc itself
    if !point_is_on_arc(i5, c, p2, p3, cw) {
        return errout();
    }

    let i1_pos = fpp.fpp2geo(i1);
    let i4_pos = fpp.fpp2geo(i4);
    let i5_pos = fpp.fpp2geo(i5);
    let c1_pos = fpp.fpp2geo(c1);
    let c2_pos = fpp.fpp2geo(c2);

    JoinPlan {
        rs1: if rs1_remove {
            Rs1Act::Remove
        } else {
            Rs1Act::SetEnd(i1_pos)
        },
        inserted: vec![
            RouteSeg::arc(
                i1_pos,
                i4_pos,
                c1_pos,
                if outer { !cw } else { cw },
                SegJoin::Simple,
            ),
            RouteSeg::arc(
                i4_pos,
                i5_pos,
                c2_pos,
                if outer { cw } else { !cw },
                SegJoin::Simple,
            ),
        ],
        rs2: Rs2Act::SetStart(i5_pos),
    }
}

/// Creates a smooth joint between the segments at `i` and `i + 1`,
/// inserting transition segments as needed. `wpt_rnp` is the maximum
/// allowed deviation from their meeting point in meters, `spd` the ground
/// speed in knots.
pub(crate) fn join_pair(segs: &mut Vec<RouteSeg>, i: usize, wpt_rnp: f64, spd: f64) {
    if segs[i].join == SegJoin::Simple {
        return;
    }
    let r = calc_arc_radius(spd, STD_RATE_TURN);
    let rs1 = segs[i];
    let rs2 = segs[i + 1];

    let plan = if !rs2.is_arc() {
        join_dir(&rs1, &rs2, r, wpt_rnp, rs1.join == SegJoin::Track)
    } else {
        join_arc(&rs1, &rs2, r, wpt_rnp)
    };
    apply(segs, i, plan);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{gc_distance, geo_displace, nm2met};

    #[test]
    fn std_rate_radius_at_250_kt() {
        // 250 kt at 3 deg/s: r = (360/3)*128.6 / 2pi, about 2454 m
        let r = calc_arc_radius(250.0, STD_RATE_TURN);
        assert!((r - 2454.0).abs() < 5.0, "r = {r}");
    }

    /// A->B on 090, B->C on 180, 250 kt, RNP 2 NM: one transition arc
    /// around B.
    #[test]
    fn ninety_degree_join_single_arc() {
        let b = Coordinate::new(50.0, 8.0);
        let a = geo_displace(b, 270.0, nm2met(30.0));
        let c_end = geo_displace(b, 180.0, nm2met(30.0));

        let mut segs = vec![
            RouteSeg::direct(a, b, SegJoin::Track),
            RouteSeg::direct(b, c_end, SegJoin::Track),
        ];
        join_pair(&mut segs, 0, nm2met(2.0), 250.0);

        assert_eq!(segs.len(), 3, "expected inserted transition arc");
        let arc = &segs[1];
        assert!(arc.is_arc());
        // the arc's radius must match the standard rate turn
        let r = calc_arc_radius(250.0, STD_RATE_TURN);
        assert!(
            (arc.arc_radius() - r).abs() < 20.0,
            "arc radius {} vs {}",
            arc.arc_radius(),
            r
        );
        // the arc center must stay within RNP of B
        let center = match arc.kind {
            SegKind::Arc { center, .. } => center,
            _ => unreachable!(),
        };
        assert!(gc_distance(center, b) <= nm2met(2.0) + 1.0);
        // inbound was shortened before B, outbound starts after B
        assert!(gc_distance(segs[0].end(), b) > 100.0);
        assert!(gc_distance(segs[2].start(), b) > 100.0);
        // right turn from east to south
        match arc.kind {
            SegKind::Arc { cw, .. } => assert!(cw),
            _ => unreachable!(),
        }
    }

    #[test]
    fn shallow_join_passes_through() {
        let b = Coordinate::new(50.0, 8.0);
        let a = geo_displace(b, 270.0, nm2met(20.0));
        let c_end = geo_displace(b, 90.5, nm2met(20.0));

        let mut segs = vec![
            RouteSeg::direct(a, b, SegJoin::Track),
            RouteSeg::direct(b, c_end, SegJoin::Track),
        ];
        join_pair(&mut segs, 0, nm2met(1.0), 250.0);

        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].join, SegJoin::Simple);
        assert!(segs[0].end().pos_eq(&b));
    }

    #[test]
    fn course_reversal_track_rejoin() {
        // 150 degree turn: the single arc cannot hold RNP, expect a
        // multi-segment reintercept (more than one inserted segment).
        let b = Coordinate::new(50.0, 8.0);
        let a = geo_displace(b, 270.0, nm2met(40.0));
        let c_end = geo_displace(b, 240.0, nm2met(40.0));

        let mut segs = vec![
            RouteSeg::direct(a, b, SegJoin::Track),
            RouteSeg::direct(b, c_end, SegJoin::Track),
        ];
        join_pair(&mut segs, 0, nm2met(1.0), 250.0);

        assert!(segs.len() > 3, "got {} segments", segs.len());
        // every inserted transition is already joined
        for rs in &segs[1..segs.len() - 1] {
            assert_eq!(rs.join, SegJoin::Simple);
        }
    }

    #[test]
    fn join_onto_arc_single_transition() {
        // inbound direct roughly tangential onto a DME arc
        let ctr = Coordinate::new(50.0, 8.0);
        let arc_start = geo_displace(ctr, 180.0, nm2met(12.0));
        let arc_end = geo_displace(ctr, 90.0, nm2met(12.0));
        let a = geo_displace(arc_start, 250.0, nm2met(25.0));

        let mut segs = vec![
            RouteSeg::direct(a, arc_start, SegJoin::Track),
            RouteSeg::arc(arc_start, arc_end, ctr, false, SegJoin::Track),
        ];
        join_pair(&mut segs, 0, nm2met(2.0), 250.0);

        assert!(segs.len() >= 3, "expected transition arcs");
        assert_eq!(segs[0].join, SegJoin::Simple);
    }
}
