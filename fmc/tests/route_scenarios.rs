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

//! Route editing scenarios against an inline navigation database.

use std::rc::Rc;

use world_magnetic_model::time::Date;

use fmc::error::Error;
use fmc::fms::FMS;
use fmc::nd::{Airport, AirwayDb, NavDatabase, NavaidDb, ProcKind, WaypointDb};
use fmc::route::Route;
use fmc::wmm::MagModel;

const AIRPORTS: &str = "\
X,1501,07JAN04FEB15,U,Y

A,EDDF,FRANKFURT MAIN,50.033306,8.570456,364,5000,6000,13123,0
R,25C,249,13123,197,1,110.70,249,50.040494,8.586531,362,3.00,0,0,0
R,25L,249,13123,197,1,110.95,249,50.027917,8.534050,362,3.00,0,0,0
R,07C,69,13123,197,1,110.55,69,50.032761,8.560106,363,3.00,0,0,0

A,EDDM,MUNICH,48.353783,11.786086,1487,5000,6000,13123,0
R,08R,83,13123,197,1,108.70,83,48.350439,11.751017,1448,3.00,0,0,0
R,26L,263,13123,197,1,109.35,263,48.344533,11.804936,1448,3.00,0,0,0
";

const WAYPOINTS: &str = "\
ANEKI,50.046389,8.993056,ED
ROKIL,48.750000,10.600000,ED
MIQ,48.570225,11.597502,ED
BETOS,48.200000,12.300000,ED
SEA,47.435372,-122.309775,K1
ELN,47.370833,-120.442500,K1
PSC,46.263333,-119.110833,K1
BOI,43.552500,-116.192222,K1
";

const NAVAIDS: &str = "\
FFM,FRANKFURT,114.90,0,1,0,50.052500,8.636389,364,ED,0
SEA,SEATTLE,116.80,0,1,0,47.435372,-122.309775,354,K1,0
";

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

const EDDF_PROCS: &str = "\
SID,ANEK7W,25C,2
CA,0,248.0,2,1500,0,0,0,0,0,0
TF,ANEKI,50.046389,8.993056,0, ,0,0,0,0,0,0,0,0,0,0,0,0
";

const EDDM_PROCS: &str = "\
STAR,ROKIL1A,08R,3
IF,ANEKI,50.046389,8.993056,0,0,0,0,0,0,0,0,0,0,0
TF,ROKIL,48.750000,10.600000,0, ,0,0,0,0,0,0,0,0,0,0,0,0
TF,MIQ,48.570225,11.597502,0, ,0,0,0,0,0,0,0,0,0,0,0,0

STAR,ROKIL1A,26L,3
IF,ANEKI,50.046389,8.993056,0,0,0,0,0,0,0,0,0,0,0
TF,ROKIL,48.750000,10.600000,0, ,0,0,0,0,0,0,0,0,0,0,0,0
TF,BETOS,48.200000,12.300000,0, ,0,0,0,0,0,0,0,0,0,0,0,0

STAR,BETOS1B,26L,2
IF,ANEKI,50.046389,8.993056,0,0,0,0,0,0,0,0,0,0,0
TF,BETOS,48.200000,12.300000,0, ,0,0,0,0,0,0,0,0,0,0,0,0

FINAL,ILS08R,08R,I,2
IF,MIQ,48.570225,11.597502,0,0,0,0,0,0,0,0,0,0,0
TF,RW08R,48.350439,11.751017,0, ,0,0,0,0,0,0,0,0,0,0,0,0

FINAL,ILS26L,26L,I,2
IF,BETOS,48.200000,12.300000,0,0,0,0,0,0,0,0,0,0,0
TF,RW26L,48.344533,11.804936,0, ,0,0,0,0,0,0,0,0,0,0,0,0
";

const ACFT_PERF: &str = "\
VERSION,1
ACFTTYPE,B738
ENGTYPE,CFM56-7B26
MAXTHR,117300
REFZFW,62700
MAXFUEL,20800
MAXGW,79000
THRDENS,3
0.4,0.45
0.8,0.75
1.3,1.0
THRISA,3
-30,1.1
0,1.0
40,0.82
SFCTHR,3
0.2,0.8
0.6,0.62
1.0,0.55
SFCDENS,3
0.4,1.25
0.8,1.1
1.3,1.0
SFCISA,3
-30,0.95
0,1.0
40,1.08
";

fn navdb() -> Rc<NavDatabase> {
    let wptdb = WaypointDb::parse(WAYPOINTS).expect("waypoints should parse");
    let navaiddb = NavaidDb::parse(NAVAIDS).expect("navaids should parse");
    let awydb = AirwayDb::parse(ATS).expect("airways should parse");
    let eddf = Airport::parse("EDDF", AIRPORTS, Some(EDDF_PROCS), &wptdb, &navaiddb)
        .expect("EDDF should parse");
    let eddm = Airport::parse("EDDM", AIRPORTS, Some(EDDM_PROCS), &wptdb, &navaiddb)
        .expect("EDDM should parse");
    let wmm = MagModel::new(Date::from_ordinal_date(2026, 100).expect("date"))
        .expect("mag model should open");
    Rc::new(NavDatabase::from_parts(
        wptdb,
        navaiddb,
        awydb,
        vec![eddf, eddm],
        wmm,
    ))
}

/// Checks the structural invariants that must hold after any edit: no
/// boundary or adjacent discontinuities, departures at the head, arrivals
/// at the tail, no two consecutive legs ending at the same fix, and airway
/// groups expanding to the airway's own waypoint path.
fn assert_invariants(route: &Route) {
    let groups = route.leg_groups();
    if let Some(first) = groups.first() {
        assert!(!first.is_disco(), "leading discontinuity");
    }
    if let Some(last) = groups.last() {
        assert!(!last.is_disco(), "trailing discontinuity");
    }
    for pair in groups.windows(2) {
        assert!(
            !(pair[0].is_disco() && pair[1].is_disco()),
            "adjacent discontinuities"
        );
    }

    // departure procedures strictly at the head, arrivals strictly at the
    // tail
    let mut seen_non_departure = false;
    let mut seen_arrival = false;
    for rlg in groups {
        match rlg.proc().map(|p| p.kind) {
            Some(kind) if kind.is_departure() => {
                assert!(
                    !seen_non_departure && !seen_arrival,
                    "departure procedure not at head"
                );
            }
            Some(_) => seen_arrival = true,
            None => {
                seen_non_departure = true;
                assert!(!seen_arrival, "non-procedure group after the arrivals");
            }
        }
    }

    // no two consecutive legs ending at the same fix; initial-fix legs are
    // exempt since a procedure's IF legitimately repeats the hand-off fix
    let legs: Vec<_> = route.legs().collect();
    for pair in legs.windows(2) {
        if pair[1].seg().map(|s| s.code()) == Some("IF") {
            continue;
        }
        if let (Some(a), Some(b)) = (pair[0].end_wpt(), pair[1].end_wpt()) {
            assert!(
                !a.pos_eq(b),
                "consecutive legs both end at {}",
                a.name
            );
        }
    }

    // airway groups with both endpoints expand to the airway's own path
    for rlg in groups {
        let (Some(awy), Some(start), Some(end)) =
            (rlg.airway(), rlg.start_wpt(), rlg.end_wpt())
        else {
            continue;
        };
        let Some(mut i) = awy.seg_starting_at(start) else {
            panic!("airway group start not on airway");
        };
        for leg in rlg.legs() {
            let want = &awy.segs[i].to;
            let got = leg.end_wpt().expect("airway legs end in fixes");
            assert_eq!(got, want, "airway leg mismatch on {}", awy.name);
            i += 1;
        }
        assert_eq!(&awy.segs[i - 1].to, end, "airway end fix mismatch");
    }

    // the flat leg list is the concatenation of the groups' legs
    let flat: Vec<_> = route.legs().collect();
    let concat: Vec<_> = groups.iter().flat_map(|g| g.legs().iter()).collect();
    assert_eq!(flat.len(), concat.len());
}

fn wpt(route: &Route, name: &str) -> fmc::nd::Waypoint {
    route.navdb().waypoints().lookup(name)[0].as_ref().clone()
}

/// Scenario: basic route EDDF -> EDDM with SID, STAR and ILS approach.
#[test]
fn basic_route_eddf_eddm() {
    let mut route = Route::new(navdb());

    route.set_dep_arpt(Some("EDDF")).expect("dep airport");
    route.set_arr_arpt(Some("EDDM")).expect("arr airport");
    route.set_dep_rwy(Some("25C")).expect("dep runway");
    route.set_sid(Some("ANEK7W")).expect("SID");
    assert_invariants(&route);

    route.set_star(Some("ROKIL1A")).expect("STAR");
    assert_invariants(&route);

    route.set_appr(Some("ILS08R")).expect("approach");
    assert_invariants(&route);

    let groups = route.leg_groups();
    assert!(!groups.is_empty());

    let first = groups[0].proc().expect("head group is a procedure");
    assert_eq!(first.kind, ProcKind::Sid);
    assert_eq!(first.name, "ANEK7W");
    assert_eq!(first.rwy.as_ref().expect("SID runway").id, "25C");

    let last = groups[groups.len() - 1]
        .proc()
        .expect("tail group is a procedure");
    assert_eq!(last.kind, ProcKind::Final);
    assert_eq!(last.name, "ILS08R");

    assert!(groups.iter().all(|g| !g.is_disco()), "route has discos");

    // the STAR survived the approach refresh
    assert_eq!(route.star().expect("STAR kept").name, "ROKIL1A");
    assert!(route.update_needed());
}

/// Scenario: two airways inserted back to back connect at their published
/// intersection.
#[test]
fn airway_intersection_connects() {
    let mut route = Route::new(navdb());

    let sea = wpt(&route, "SEA");
    let dir = route.insert_direct(&sea, None).expect("direct SEA");
    let j70 = route.insert_airway("J70", Some(dir)).expect("insert J70");
    assert_invariants(&route);

    // J70 got its start from the direct but has no legs yet
    let j70_idx = route
        .leg_groups()
        .iter()
        .position(|g| g.id() == j70)
        .expect("J70 group");
    assert_eq!(
        route.leg_groups()[j70_idx]
            .start_wpt()
            .expect("J70 start")
            .name,
        "SEA"
    );
    assert!(route.leg_groups()[j70_idx].legs().is_empty());

    let _j146 = route.insert_airway("J146", Some(j70)).expect("insert J146");
    assert_invariants(&route);

    // the connection algorithm found PSC as the shared fix and rebuilt J70
    let groups = route.leg_groups();
    let j70_rlg = groups
        .iter()
        .find(|g| g.id() == j70)
        .expect("J70 still present");
    assert_eq!(j70_rlg.end_wpt().expect("J70 end").name, "PSC");
    let ends: Vec<_> = j70_rlg
        .legs()
        .iter()
        .map(|l| l.end_wpt().expect("leg fix").name.clone())
        .collect();
    assert_eq!(ends, ["ELN", "PSC"]);

    let j146_rlg = groups
        .iter()
        .find(|g| g.airway().map(|a| a.name == "J146").unwrap_or(false))
        .expect("J146 group");
    assert_eq!(j146_rlg.start_wpt().expect("J146 start").name, "PSC");
}

/// Scenario: a SID that is not published for the selected runway is
/// rejected.
#[test]
fn sid_for_wrong_runway_is_invalid() {
    let mut route = Route::new(navdb());
    route.set_dep_arpt(Some("EDDF")).expect("dep airport");
    route.set_dep_rwy(Some("25L")).expect("dep runway");

    assert_eq!(route.set_sid(Some("ANEK7W")).unwrap_err(), Error::InvalidSid);
    assert!(route.sid().is_none());
    assert_invariants(&route);
}

/// Scenario: changing the approach re-resolves the STAR against the new
/// runway and clears it when it no longer applies.
#[test]
fn approach_change_refreshes_star() {
    let mut route = Route::new(navdb());
    route.set_arr_arpt(Some("EDDM")).expect("arr airport");
    route.set_appr(Some("ILS26L")).expect("approach 26L");
    route.set_star(Some("BETOS1B")).expect("STAR 26L");
    assert_invariants(&route);
    assert_eq!(route.star().expect("STAR set").name, "BETOS1B");

    // BETOS1B is only published for 26L: switching to 08R clears it
    route.set_appr(Some("ILS08R")).expect("approach 08R");
    assert!(route.star().is_none(), "STAR should be cleared");
    assert_eq!(route.appr().expect("approach kept").name, "ILS08R");
    assert_invariants(&route);
}

/// The STAR survives an approach change when it exists for the new runway.
#[test]
fn approach_change_keeps_matching_star() {
    let mut route = Route::new(navdb());
    route.set_arr_arpt(Some("EDDM")).expect("arr airport");
    route.set_appr(Some("ILS26L")).expect("approach 26L");
    route.set_star(Some("ROKIL1A")).expect("STAR");

    route.set_appr(Some("ILS08R")).expect("approach 08R");
    assert_eq!(route.star().expect("STAR kept").name, "ROKIL1A");
    // and it now carries the 08R-specific legs (ending at MIQ)
    let star_rlg = route
        .leg_groups()
        .iter()
        .find(|g| g.proc().map(|p| p.kind == ProcKind::Star).unwrap_or(false))
        .expect("STAR group");
    assert_eq!(star_rlg.end_wpt().expect("STAR end").name, "MIQ");
    assert_invariants(&route);
}

/// Scenario: a 90 degree join between two directs produces a standard-rate
/// transition arc around the shared waypoint.
#[test]
fn trajectory_joins_directs_with_arc() {
    let mut route = Route::new(navdb());

    let a = wpt(&route, "SEA");
    let b = wpt(&route, "ELN");
    let c = wpt(&route, "PSC");
    route.insert_leg(&a, None).expect("leg A");
    route.insert_leg(&b, Some(0)).expect("leg B");
    route.insert_leg(&c, Some(1)).expect("leg C");
    assert_invariants(&route);

    assert!(route.update_needed());
    let segs = route.build_trajectory(250.0, 2.0).to_vec();
    assert!(!route.update_needed());

    assert!(
        segs.len() >= 3,
        "expected a transition arc, got {} segs",
        segs.len()
    );
    assert!(segs.iter().any(|s| s.is_arc()), "no arc in trajectory");

    // arc radii are consistent between center-start and center-end
    for seg in &segs {
        if let fmc::route::SegKind::Arc { start, end, center, .. } = seg.kind {
            let r1 = fmc::geom::gc_distance(center, start);
            let r2 = fmc::geom::gc_distance(center, end);
            assert!((r1 - r2).abs() < 0.1, "arc radii differ: {r1} vs {r2}");
        }
    }
}

/// The full scenario route expands into a trajectory seeded at the
/// departure runway threshold.
#[test]
fn full_route_trajectory_starts_at_threshold() {
    let mut route = Route::new(navdb());
    route.set_dep_arpt(Some("EDDF")).expect("dep airport");
    route.set_arr_arpt(Some("EDDM")).expect("arr airport");
    route.set_dep_rwy(Some("25C")).expect("dep runway");
    route.set_sid(Some("ANEK7W")).expect("SID");
    route.set_star(Some("ROKIL1A")).expect("STAR");
    route.set_appr(Some("ILS08R")).expect("approach");

    let thr = route.dep_rwy().expect("runway").thr_pos.to_2d();
    let segs = route.build_trajectory(280.0, 1.0).to_vec();
    assert!(!segs.is_empty());
    assert!(
        fmc::geom::gc_distance(segs[0].start(), thr) < 1.0,
        "trajectory must start at the runway threshold"
    );
    assert!(!route.update_needed());
}

/// Procedure groups cannot be deleted directly.
#[test]
fn deleting_procedure_group_is_invalid() {
    let mut route = Route::new(navdb());
    route.set_dep_arpt(Some("EDDF")).expect("dep airport");
    route.set_dep_rwy(Some("25C")).expect("dep runway");
    route.set_sid(Some("ANEK7W")).expect("SID");

    let sid_id = route.leg_groups()[0].id();
    assert_eq!(
        route.delete_leg_group(sid_id).unwrap_err(),
        Error::InvalidDelete
    );
}

/// Inserting a leg in front of the departure procedure is refused.
#[test]
fn insert_before_sid_is_invalid() {
    let mut route = Route::new(navdb());
    route.set_dep_arpt(Some("EDDF")).expect("dep airport");
    route.set_dep_rwy(Some("25C")).expect("dep runway");
    route.set_sid(Some("ANEK7W")).expect("SID");

    let rokil = wpt(&route, "ROKIL");
    assert_eq!(
        route.insert_leg(&rokil, None).unwrap_err(),
        Error::InvalidEntry
    );
}

/// Replacing the departure airport drops its runway, procedures and leg
/// groups.
#[test]
fn replacing_dep_airport_clears_links() {
    let mut route = Route::new(navdb());
    route.set_dep_arpt(Some("EDDF")).expect("dep airport");
    route.set_dep_rwy(Some("25C")).expect("dep runway");
    route.set_sid(Some("ANEK7W")).expect("SID");
    assert!(route.sid().is_some());

    route.set_dep_arpt(Some("EDDM")).expect("new dep airport");
    assert!(route.dep_rwy().is_none());
    assert!(route.sid().is_none());
    assert!(route
        .leg_groups()
        .iter()
        .all(|g| g.proc().map(|p| p.arpt_icao != "EDDF").unwrap_or(true)));
    assert_invariants(&route);
}

/// Duplicate consecutive legs are refused.
#[test]
fn duplicate_leg_is_refused() {
    let mut route = Route::new(navdb());
    let sea = wpt(&route, "SEA");
    route.insert_leg(&sea, None).expect("leg SEA");
    assert_eq!(
        route.insert_leg(&sea, Some(0)).unwrap_err(),
        Error::DuplicateLeg
    );
}

/// Deleting a middle leg of an airway splits it with a discontinuity.
#[test]
fn deleting_airway_middle_leg_splits() {
    let mut route = Route::new(navdb());
    let sea = wpt(&route, "SEA");
    let dir = route.insert_direct(&sea, None).expect("direct SEA");
    let j70 = route.insert_airway("J70", Some(dir)).expect("J70");
    route.awy_set_end_wpt(j70, "PSC").expect("J70 end");
    assert_invariants(&route);

    // flat legs: [DF SEA, DF ELN, DF PSC]; delete ELN
    let before = route.num_legs();
    assert_eq!(before, 3);
    route.delete_leg(1).expect("delete middle leg");
    assert_invariants(&route);

    let names: Vec<_> = route
        .legs()
        .filter_map(|l| l.end_wpt().map(|w| w.name.clone()))
        .collect();
    assert!(!names.contains(&"ELN".to_string()), "ELN still present");
    assert!(names.contains(&"PSC".to_string()), "PSC lost");
}

/// The FMS decoder draws sequence numbers from the route.
#[test]
fn fms_decodes_radial_dme_for_route() {
    let acft = fmc::perf::AircraftPerf::parse(ACFT_PERF).expect("perf should parse");
    let fms = FMS::from_parts(
        Rc::try_unwrap(navdb()).expect("sole owner"),
        acft,
    );
    let mut route = fms.new_route();

    let d = fms.decode_wpt(&mut route, "SEA330/10").expect("decode");
    assert_eq!(d.wpts.len(), 2, "fix and VOR candidates");
    assert!(d.wpts.iter().all(|w| w.name == "SEA01"));

    let d2 = fms.decode_wpt(&mut route, "SEA330/20").expect("decode");
    assert!(d2.wpts.iter().all(|w| w.name == "SEA02"));
}
