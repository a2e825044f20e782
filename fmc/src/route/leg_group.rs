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

use crate::nd::{
    AltLimit, Airway, PathTerm, ProcSeg, Procedure, SpeedLimit, Waypoint,
};

/// One leg of the route: a procedure segment with overridable constraints,
/// or a discontinuity marker.
#[derive(Clone, PartialEq, Debug)]
pub struct RouteLeg {
    /// `None` marks a discontinuity leg.
    pub(crate) seg: Option<ProcSeg>,
    pub(crate) alt_ovrd: Option<AltLimit>,
    pub(crate) spd_ovrd: Option<SpeedLimit>,
}

impl RouteLeg {
    pub(crate) fn disco() -> Self {
        RouteLeg {
            seg: None,
            alt_ovrd: None,
            spd_ovrd: None,
        }
    }

    pub(crate) fn from_seg(seg: ProcSeg) -> Self {
        RouteLeg {
            seg: Some(seg),
            alt_ovrd: None,
            spd_ovrd: None,
        }
    }

    /// Creates a direct-to-fix (DF) leg.
    pub(crate) fn direct_to(fix: &Waypoint) -> Self {
        Self::from_seg(ProcSeg::new(PathTerm::DirToFix { fix: fix.clone() }))
    }

    pub fn is_disco(&self) -> bool {
        self.seg.is_none()
    }

    pub fn seg(&self) -> Option<&ProcSeg> {
        self.seg.as_ref()
    }

    /// The leg's end waypoint, if its kind terminates in one.
    pub fn end_wpt(&self) -> Option<&Waypoint> {
        self.seg.as_ref().and_then(|s| s.end_wpt())
    }

    pub fn start_wpt(&self) -> Option<&Waypoint> {
        self.seg.as_ref().and_then(|s| s.start_wpt())
    }

    /// The active altitude limit: the override if the UI set one, the
    /// underlying procedure segment's otherwise.
    pub fn alt_lim(&self) -> AltLimit {
        self.alt_ovrd
            .or_else(|| self.seg.as_ref().map(|s| s.alt_lim))
            .unwrap_or_default()
    }

    /// The active speed limit, override first.
    pub fn spd_lim(&self) -> SpeedLimit {
        self.spd_ovrd
            .or_else(|| self.seg.as_ref().map(|s| s.spd_lim))
            .unwrap_or_default()
    }
}

/// What a leg group expands from.
#[derive(Clone, Debug)]
pub enum LegGroupKind {
    Airway(Rc<Airway>),
    Direct,
    Proc(Rc<Procedure>),
    Disco,
}

/// A contiguous run of route legs sharing one source: an airway span, a
/// direct-to, a procedure, or a discontinuity.
#[derive(Clone, Debug)]
pub struct RouteLegGroup {
    pub(crate) id: super::RlgId,
    pub(crate) kind: LegGroupKind,
    pub(crate) start_wpt: Option<Waypoint>,
    pub(crate) end_wpt: Option<Waypoint>,
    pub(crate) legs: Vec<RouteLeg>,
}

impl RouteLegGroup {
    pub(crate) fn new_airway(awy: Rc<Airway>) -> Self {
        RouteLegGroup {
            id: super::RlgId::PLACEHOLDER,
            kind: LegGroupKind::Airway(awy),
            start_wpt: None,
            end_wpt: None,
            legs: Vec::new(),
        }
    }

    pub(crate) fn new_direct(end: &Waypoint) -> Self {
        RouteLegGroup {
            id: super::RlgId::PLACEHOLDER,
            kind: LegGroupKind::Direct,
            start_wpt: None,
            end_wpt: Some(end.clone()),
            legs: Vec::new(),
        }
    }

    pub(crate) fn new_proc(proc: Rc<Procedure>) -> Self {
        let legs: Vec<RouteLeg> = proc
            .segs
            .iter()
            .map(|seg| RouteLeg::from_seg(seg.clone()))
            .collect();
        let start_wpt = proc.start_wpt();
        let rlg = RouteLegGroup {
            id: super::RlgId::PLACEHOLDER,
            kind: LegGroupKind::Proc(proc),
            start_wpt,
            end_wpt: None,
            legs,
        };
        let end_wpt = rlg.find_end_wpt();
        RouteLegGroup { end_wpt, ..rlg }
    }

    pub(crate) fn new_disco() -> Self {
        RouteLegGroup {
            id: super::RlgId::PLACEHOLDER,
            kind: LegGroupKind::Disco,
            start_wpt: None,
            end_wpt: None,
            legs: vec![RouteLeg::disco()],
        }
    }

    /// The group's stable handle.
    pub fn id(&self) -> super::RlgId {
        self.id
    }

    pub fn is_disco(&self) -> bool {
        matches!(self.kind, LegGroupKind::Disco)
    }

    pub fn is_airway(&self) -> bool {
        matches!(self.kind, LegGroupKind::Airway(_))
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.kind, LegGroupKind::Direct)
    }

    pub fn is_proc(&self) -> bool {
        matches!(self.kind, LegGroupKind::Proc(_))
    }

    pub fn airway(&self) -> Option<&Rc<Airway>> {
        match &self.kind {
            LegGroupKind::Airway(awy) => Some(awy),
            _ => None,
        }
    }

    pub fn proc(&self) -> Option<&Rc<Procedure>> {
        match &self.kind {
            LegGroupKind::Proc(proc) => Some(proc),
            _ => None,
        }
    }

    pub fn start_wpt(&self) -> Option<&Waypoint> {
        self.start_wpt.as_ref()
    }

    pub fn end_wpt(&self) -> Option<&Waypoint> {
        self.end_wpt.as_ref()
    }

    pub fn legs(&self) -> &[RouteLeg] {
        &self.legs
    }

    /// The first leg's start waypoint.
    pub(crate) fn find_start_wpt(&self) -> Option<Waypoint> {
        self.legs.first().and_then(|rl| rl.start_wpt().cloned())
    }

    /// The last leg's end waypoint.
    pub(crate) fn find_end_wpt(&self) -> Option<Waypoint> {
        self.legs.last().and_then(|rl| rl.end_wpt().cloned())
    }

    /// Checks whether `wpt` immediately follows the group's current span on
    /// the airway itself (`head == false`), or immediately precedes it
    /// (`head == true`). Used to extend an airway group by one waypoint
    /// instead of spawning a direct.
    pub(crate) fn awy_fix_adjacent(&self, wpt: &Waypoint, head: bool) -> bool {
        let Some(awy) = self.airway() else {
            return false;
        };
        let (Some(start), Some(end)) = (&self.start_wpt, &self.end_wpt) else {
            return false;
        };
        let probe = if head { wpt } else { end };
        match awy.seg_starting_at(probe) {
            Some(i) => {
                let target = if head { start } else { wpt };
                &awy.segs[i].to == target
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Coordinate;
    use crate::nd::AirwaySeg;

    fn wpt(name: &str, lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(name, Coordinate::new(lat, lon))
    }

    fn awy() -> Rc<Airway> {
        Rc::new(Airway {
            name: "T104".to_string(),
            segs: vec![
                AirwaySeg {
                    from: wpt("AAA", 50.0, 8.0),
                    to: wpt("BBB", 50.5, 8.5),
                },
                AirwaySeg {
                    from: wpt("BBB", 50.5, 8.5),
                    to: wpt("CCC", 51.0, 9.0),
                },
                AirwaySeg {
                    from: wpt("CCC", 51.0, 9.0),
                    to: wpt("DDD", 51.5, 9.5),
                },
            ],
        })
    }

    #[test]
    fn awy_fix_adjacency() {
        let mut rlg = RouteLegGroup::new_airway(awy());
        rlg.start_wpt = Some(wpt("BBB", 50.5, 8.5));
        rlg.end_wpt = Some(wpt("CCC", 51.0, 9.0));

        // DDD immediately follows the span's end on the airway
        assert!(rlg.awy_fix_adjacent(&wpt("DDD", 51.5, 9.5), false));
        // AAA immediately precedes the span's start
        assert!(rlg.awy_fix_adjacent(&wpt("AAA", 50.0, 8.0), true));
        // DDD does not precede the start
        assert!(!rlg.awy_fix_adjacent(&wpt("DDD", 51.5, 9.5), true));
    }

    #[test]
    fn override_falls_back_to_seg_limit() {
        let mut leg = RouteLeg::direct_to(&wpt("AAA", 50.0, 8.0));
        assert_eq!(leg.alt_lim(), AltLimit::None);
        leg.alt_ovrd = Some(AltLimit::AtOrAbove(5000));
        assert_eq!(leg.alt_lim(), AltLimit::AtOrAbove(5000));
    }

    #[test]
    fn disco_has_no_wpts() {
        let leg = RouteLeg::disco();
        assert!(leg.is_disco());
        assert!(leg.end_wpt().is_none());
    }
}
