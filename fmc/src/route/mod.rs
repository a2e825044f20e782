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

//! The active flight plan.
//!
//! A [`Route`] holds the selected airports, runway and procedures, the
//! editable list of leg groups with their expanded legs, and the lazily
//! rebuilt trajectory. Every editing operation reestablishes the leg-group
//! invariants before returning: neighbors reconnect or get separated by
//! exactly one discontinuity, airways share endpoints with their neighbors,
//! duplicates are eliminated, and departure procedures stay at the head
//! while arrival procedures stay at the tail.

use std::rc::Rc;

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::geom::{Coordinate, Coordinate3};
use crate::nd::{
    is_valid_rwy_id, Airport, AltLimit, NavDatabase, PathTerm, ProcKind, Procedure, Runway,
    SpeedLimit, Waypoint,
};

mod decode;
mod expand;
mod join;
mod leg_group;
mod seg;

pub use decode::{Decoded, WptDecoder};
pub use leg_group::{LegGroupKind, RouteLeg, RouteLegGroup};
pub use seg::{RouteSeg, SegJoin, SegKind};

/// Stable handle of a route leg group, valid until the group is removed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RlgId(u64);

impl RlgId {
    /// Placeholder until the route assigns the real handle on insertion.
    pub(crate) const PLACEHOLDER: RlgId = RlgId(0);
}

/// Waypoint-option equality: an unset endpoint never equals anything.
fn wpt_eq(a: Option<&Waypoint>, b: Option<&Waypoint>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// Outcome of a successful leg-group connection attempt.
enum Connected {
    /// Connected; the groups between the pair still await removal.
    Pending,
    /// Connected and cleaned up internally (the next group may be gone).
    Done,
}

fn navprocs_related(a: &Procedure, b: &Procedure) -> bool {
    a.arpt_icao == b.arpt_icao
        && (a.kind.is_departure() == b.kind.is_departure())
}

#[derive(Debug)]
pub struct Route {
    navdb: Rc<NavDatabase>,

    dep: Option<Rc<Airport>>,
    arr: Option<Rc<Airport>>,
    altn1: Option<Rc<Airport>>,
    altn2: Option<Rc<Airport>>,
    dep_rwy: Option<Runway>,

    sid: Option<Rc<Procedure>>,
    sidcm: Option<Rc<Procedure>>,
    sidtr: Option<Rc<Procedure>>,
    star: Option<Rc<Procedure>>,
    starcm: Option<Rc<Procedure>>,
    startr: Option<Rc<Procedure>>,
    apprtr: Option<Rc<Procedure>>,
    appr: Option<Rc<Procedure>>,

    leg_groups: Vec<RouteLegGroup>,
    segs: Vec<RouteSeg>,
    segs_dirty: bool,

    /// Sequence counter for generated fix names (see the waypoint decoder).
    wpt_seq: u32,
    next_rlg_id: u64,
}

impl Route {
    /// Creates an empty route deriving its navigation data from `navdb`.
    pub fn new(navdb: Rc<NavDatabase>) -> Route {
        Route {
            navdb,
            dep: None,
            arr: None,
            altn1: None,
            altn2: None,
            dep_rwy: None,
            sid: None,
            sidcm: None,
            sidtr: None,
            star: None,
            starcm: None,
            startr: None,
            apprtr: None,
            appr: None,
            leg_groups: Vec::new(),
            segs: Vec::new(),
            segs_dirty: false,
            wpt_seq: 0,
            next_rlg_id: 1,
        }
    }

    pub fn navdb(&self) -> &Rc<NavDatabase> {
        &self.navdb
    }

    /////////////////////////////////////////////////////////////////////////
    // Accessors
    /////////////////////////////////////////////////////////////////////////

    pub fn dep_arpt(&self) -> Option<&Rc<Airport>> {
        self.dep.as_ref()
    }

    pub fn arr_arpt(&self) -> Option<&Rc<Airport>> {
        self.arr.as_ref()
    }

    pub fn altn1_arpt(&self) -> Option<&Rc<Airport>> {
        self.altn1.as_ref()
    }

    pub fn altn2_arpt(&self) -> Option<&Rc<Airport>> {
        self.altn2.as_ref()
    }

    pub fn dep_rwy(&self) -> Option<&Runway> {
        self.dep_rwy.as_ref()
    }

    /// The selected departure procedure (runway-specific part preferred).
    pub fn sid(&self) -> Option<&Rc<Procedure>> {
        self.sid.as_ref().or(self.sidcm.as_ref())
    }

    pub fn sidtr(&self) -> Option<&Rc<Procedure>> {
        self.sidtr.as_ref()
    }

    /// The selected arrival procedure (runway-specific part preferred).
    pub fn star(&self) -> Option<&Rc<Procedure>> {
        self.star.as_ref().or(self.starcm.as_ref())
    }

    pub fn startr(&self) -> Option<&Rc<Procedure>> {
        self.startr.as_ref()
    }

    pub fn appr(&self) -> Option<&Rc<Procedure>> {
        self.appr.as_ref()
    }

    pub fn apprtr(&self) -> Option<&Rc<Procedure>> {
        self.apprtr.as_ref()
    }

    pub fn leg_groups(&self) -> &[RouteLegGroup] {
        &self.leg_groups
    }

    /// The flat leg list: the concatenation of every leg group's legs in
    /// group order.
    pub fn legs(&self) -> impl Iterator<Item = &RouteLeg> {
        self.leg_groups.iter().flat_map(|rlg| rlg.legs.iter())
    }

    pub fn num_legs(&self) -> usize {
        self.leg_groups.iter().map(|rlg| rlg.legs.len()).sum()
    }

    /// Whether the trajectory needs a rebuild.
    pub fn update_needed(&self) -> bool {
        self.segs_dirty
    }

    /// The most recently built trajectory.
    pub fn segs(&self) -> &[RouteSeg] {
        &self.segs
    }

    /// The waypoint sequence counter, exposed for the decoder.
    pub(crate) fn wpt_seq_mut(&mut self) -> &mut u32 {
        &mut self.wpt_seq
    }

    fn idx_of_id(&self, id: RlgId) -> Option<usize> {
        self.leg_groups.iter().position(|rlg| rlg.id == id)
    }

    pub fn group_id(&self, idx: usize) -> Option<RlgId> {
        self.leg_groups.get(idx).map(|rlg| rlg.id)
    }

    /// Maps a flat leg index to (group index, leg index within the group).
    fn locate_leg(&self, flat: usize) -> Option<(usize, usize)> {
        let mut off = 0;
        for (g, rlg) in self.leg_groups.iter().enumerate() {
            if flat < off + rlg.legs.len() {
                return Some((g, flat - off));
            }
            off += rlg.legs.len();
        }
        None
    }

    fn flat_index(&self, group: usize, leg: usize) -> usize {
        self.leg_groups[..group]
            .iter()
            .map(|rlg| rlg.legs.len())
            .sum::<usize>()
            + leg
    }

    /////////////////////////////////////////////////////////////////////////
    // Leg group basics
    /////////////////////////////////////////////////////////////////////////

    fn insert_group(&mut self, pos: usize, mut rlg: RouteLegGroup) -> RlgId {
        let id = RlgId(self.next_rlg_id);
        self.next_rlg_id += 1;
        rlg.id = id;
        self.leg_groups.insert(pos, rlg);
        id
    }

    /// First non-disco group after `after` (or from the head).
    fn next_ndisc(&self, after: Option<usize>) -> Option<usize> {
        let start = after.map(|i| i + 1).unwrap_or(0);
        (start..self.leg_groups.len()).find(|&i| !self.leg_groups[i].is_disco())
    }

    /// First non-disco group before `before` (or from the tail).
    fn prev_ndisc(&self, before: Option<usize>) -> Option<usize> {
        let end = before.unwrap_or(self.leg_groups.len());
        (0..end).rev().find(|&i| !self.leg_groups[i].is_disco())
    }

    /// Removes the groups strictly between `p` and `n`, returning how many
    /// were removed.
    fn bring_together(&mut self, p: usize, n: usize) -> usize {
        let removed = n - p - 1;
        if removed > 0 {
            self.leg_groups.drain(p + 1..n);
            self.segs_dirty = true;
        }
        removed
    }

    fn only_disco_between(&self, p: usize, n: usize) -> bool {
        n == p + 2 && self.leg_groups[p + 1].is_disco()
    }

    /// Removes group `idx` and reconnects its former neighbors.
    fn bypass_group(&mut self, idx: usize, allow_mod: bool, allow_add_legs: bool) {
        let prev = self.prev_ndisc(Some(idx));
        let next = self.next_ndisc(Some(idx));
        self.leg_groups.remove(idx);
        self.segs_dirty = true;
        let next = next.map(|i| i - 1);
        self.rlg_connect(prev, next, allow_mod, allow_add_legs);
    }

    /////////////////////////////////////////////////////////////////////////
    // Leg rebuilds
    /////////////////////////////////////////////////////////////////////////

    /// Regenerates an airway group's legs from the airway's segment chain
    /// between its endpoints. With `lookup`, the airway object itself is
    /// re-looked-up first so the orientation matches the endpoints. Legs
    /// whose end fix is unchanged keep their constraint overrides.
    fn update_awy_legs(&mut self, idx: usize, lookup: bool) {
        let navdb = Rc::clone(&self.navdb);
        let rlg = &mut self.leg_groups[idx];

        if lookup {
            let name = match rlg.airway() {
                Some(awy) => awy.name.clone(),
                None => return,
            };
            let end_name = rlg.end_wpt.as_ref().map(|w| w.name.clone());
            match navdb
                .airways()
                .lookup(&name, rlg.start_wpt.as_ref(), end_name.as_deref())
            {
                Some((awy, _)) => rlg.kind = LegGroupKind::Airway(awy),
                None => {
                    warn!("airway {name} no longer resolves, clearing legs");
                    rlg.start_wpt = None;
                    rlg.end_wpt = None;
                }
            }
        }

        let (Some(start), Some(end)) = (rlg.start_wpt.clone(), rlg.end_wpt.clone()) else {
            // missing an endpoint, the group cannot contain legs
            if !rlg.legs.is_empty() {
                rlg.legs.clear();
                self.segs_dirty = true;
            }
            return;
        };

        let Some(awy) = rlg.airway().cloned() else {
            return;
        };
        let Some(mut i) = awy.seg_starting_at(&start) else {
            warn!(
                "airway {}: start fix {} not on airway, clearing legs",
                awy.name, start.name
            );
            rlg.legs.clear();
            self.segs_dirty = true;
            return;
        };

        let mut new_legs: Vec<RouteLeg> = Vec::new();
        while i < awy.segs.len() && awy.segs[i].from != end {
            let to = &awy.segs[i].to;
            // keep the old leg (with its overrides) when it still matches
            let reuse = rlg
                .legs
                .get(new_legs.len())
                .filter(|rl| wpt_eq(rl.end_wpt(), Some(to)))
                .cloned();
            new_legs.push(reuse.unwrap_or_else(|| RouteLeg::direct_to(to)));
            i += 1;
        }

        if rlg.legs != new_legs {
            rlg.legs = new_legs;
            self.segs_dirty = true;
        }
    }

    /// Ensures a direct group's single DF leg ends at its end waypoint.
    fn update_direct_leg(&mut self, idx: usize) {
        let rlg = &mut self.leg_groups[idx];
        let Some(end) = rlg.end_wpt.clone() else {
            return;
        };
        let ok = rlg.legs.len() == 1 && wpt_eq(rlg.legs[0].end_wpt(), Some(&end));
        if !ok {
            rlg.legs = vec![RouteLeg::direct_to(&end)];
            self.segs_dirty = true;
        }
    }

    /////////////////////////////////////////////////////////////////////////
    // Leg group connection
    /////////////////////////////////////////////////////////////////////////

    /// Attempts to connect the leg groups at `p` and `n` per the
    /// airway/direct/procedure policy matrix. With [`Connected::Pending`]
    /// the caller still removes the (disco) groups between them;
    /// [`Connected::Done`] means the connection already cleaned up after
    /// itself (and may have deleted `n`).
    fn try_connect(
        &mut self,
        p: usize,
        n: usize,
        allow_mod: bool,
        allow_add_legs: bool,
    ) -> Result<Connected> {
        let navdb = Rc::clone(&self.navdb);

        enum Prev {
            Awy,
            DirOrProc,
        }
        let prev_kind = match &self.leg_groups[p].kind {
            LegGroupKind::Airway(_) => Prev::Awy,
            LegGroupKind::Direct | LegGroupKind::Proc(_) => Prev::DirOrProc,
            LegGroupKind::Disco => return Ok(Connected::Pending),
        };
        if self.leg_groups[n].is_disco() {
            return Ok(Connected::Pending);
        }

        match prev_kind {
            Prev::Awy => match self.leg_groups[n].kind.clone() {
                LegGroupKind::Airway(next_awy) => {
                    // AWY -> AWY: find an intersection starting at the
                    // previous airway's start fix
                    if wpt_eq(
                        self.leg_groups[p].end_wpt.as_ref(),
                        self.leg_groups[n].start_wpt.as_ref(),
                    ) {
                        return Ok(Connected::Pending);
                    }
                    if !allow_mod || !allow_add_legs {
                        return Err(Error::AwyAwyMismatch);
                    }
                    let prev_awy_name = self.leg_groups[p]
                        .airway()
                        .map(|a| a.name.clone())
                        .unwrap_or_default();
                    let prev_start_name = match &self.leg_groups[p].start_wpt {
                        Some(w) => w.name.clone(),
                        None => return Err(Error::AwyAwyMismatch),
                    };
                    let Some(isect) = navdb.airways().awy_intersection(
                        &prev_awy_name,
                        &prev_start_name,
                        &next_awy.name,
                    ) else {
                        return Err(Error::AwyAwyMismatch);
                    };
                    trace!(
                        "airway isect {prev_awy_name} x {}: {}",
                        next_awy.name,
                        isect.name
                    );
                    self.leg_groups[p].end_wpt = Some(isect.clone());
                    self.leg_groups[n].start_wpt = Some(isect.clone());
                    // the shrink may fold the next airway onto itself;
                    // resolve by clearing its end and reconnecting forward
                    let end_overlap = wpt_eq(
                        self.leg_groups[n].end_wpt.as_ref(),
                        Some(&isect),
                    );
                    if end_overlap {
                        self.leg_groups[n].end_wpt = None;
                    }
                    self.update_awy_legs(p, true);
                    self.update_awy_legs(n, true);
                    if end_overlap {
                        let nn = self.next_ndisc(Some(n));
                        self.rlg_connect(Some(n), nn, allow_mod, allow_add_legs);
                    }
                    self.segs_dirty = true;
                    Ok(Connected::Pending)
                }
                LegGroupKind::Direct => {
                    // AWY -> DIRECT
                    if self.leg_groups[p].end_wpt.is_some() {
                        if wpt_eq(
                            self.leg_groups[p].end_wpt.as_ref(),
                            self.leg_groups[n].end_wpt.as_ref(),
                        ) {
                            // airway and direct both end at the same fix
                            return Err(Error::AwyWptMismatch);
                        }
                        if self.leg_groups[n].start_wpt.is_some() && !allow_mod {
                            return Err(Error::AwyWptMismatch);
                        }
                        self.leg_groups[n].start_wpt = self.leg_groups[p].end_wpt.clone();
                        self.update_direct_leg(n);
                        self.segs_dirty = true;
                        Ok(Connected::Pending)
                    } else {
                        // the airway has no endpoint yet: try locating the
                        // direct's fix on the airway and absorb the direct
                        if !allow_mod {
                            return Err(Error::AwyWptMismatch);
                        }
                        let awy_name = self.leg_groups[p]
                            .airway()
                            .map(|a| a.name.clone())
                            .unwrap_or_default();
                        let start = self.leg_groups[p].start_wpt.clone();
                        let Some(dir_end) = self.leg_groups[n].end_wpt.clone() else {
                            return Err(Error::AwyWptMismatch);
                        };
                        let Some((newawy, endfix)) = navdb.airways().lookup(
                            &awy_name,
                            start.as_ref(),
                            Some(&dir_end.name),
                        ) else {
                            return Err(Error::AwyWptMismatch);
                        };
                        if !wpt_eq(endfix.as_ref(), Some(&dir_end)) {
                            return Err(Error::AwyWptMismatch);
                        }
                        self.leg_groups[p].kind = LegGroupKind::Airway(newawy);
                        self.leg_groups[p].end_wpt = Some(dir_end);
                        self.update_awy_legs(p, false);
                        // absorb the direct: drop the discos, then the
                        // direct itself
                        let removed = self.bring_together(p, n);
                        self.leg_groups.remove(n - removed);
                        self.segs_dirty = true;
                        Ok(Connected::Done)
                    }
                }
                LegGroupKind::Proc(_) => {
                    // AWY -> PROC: extend the airway to the procedure start
                    if wpt_eq(
                        self.leg_groups[p].end_wpt.as_ref(),
                        self.leg_groups[n].start_wpt.as_ref(),
                    ) {
                        return Ok(Connected::Pending);
                    }
                    if !allow_mod {
                        return Err(Error::AwyProcMismatch);
                    }
                    let awy_name = self.leg_groups[p]
                        .airway()
                        .map(|a| a.name.clone())
                        .unwrap_or_default();
                    let start = self.leg_groups[p].start_wpt.clone();
                    let Some(proc_start) = self.leg_groups[n].start_wpt.clone() else {
                        return Err(Error::AwyProcMismatch);
                    };
                    let Some((newawy, _)) = navdb.airways().lookup(
                        &awy_name,
                        start.as_ref(),
                        Some(&proc_start.name),
                    ) else {
                        return Err(Error::AwyProcMismatch);
                    };
                    self.leg_groups[p].kind = LegGroupKind::Airway(newawy);
                    self.leg_groups[p].end_wpt = Some(proc_start);
                    self.update_awy_legs(p, false);
                    self.segs_dirty = true;
                    Ok(Connected::Pending)
                }
                LegGroupKind::Disco => Ok(Connected::Pending),
            },
            Prev::DirOrProc => match self.leg_groups[n].kind.clone() {
                LegGroupKind::Airway(next_awy) => {
                    // [DIRECT|PROC] -> AWY: hook the airway's start onto the
                    // previous group's end fix, minding its orientation
                    if wpt_eq(
                        self.leg_groups[p].end_wpt.as_ref(),
                        self.leg_groups[n].start_wpt.as_ref(),
                    ) {
                        return Ok(Connected::Pending);
                    }
                    if !allow_mod {
                        return Err(Error::AwyProcMismatch);
                    }
                    let Some(prev_end) = self.leg_groups[p].end_wpt.clone() else {
                        return Err(Error::AwyProcMismatch);
                    };
                    let end_name = self.leg_groups[n]
                        .end_wpt
                        .as_ref()
                        .map(|w| w.name.clone());
                    let Some((newawy, newendfix)) = navdb.airways().lookup(
                        &next_awy.name,
                        Some(&prev_end),
                        end_name.as_deref(),
                    ) else {
                        return Err(Error::AwyProcMismatch);
                    };
                    if self.leg_groups[n].end_wpt.is_some()
                        && !wpt_eq(self.leg_groups[n].end_wpt.as_ref(), newendfix.as_ref())
                    {
                        return Err(Error::AwyProcMismatch);
                    }
                    self.leg_groups[n].kind = LegGroupKind::Airway(newawy);
                    self.leg_groups[n].start_wpt = Some(prev_end);
                    self.update_awy_legs(n, false);
                    self.segs_dirty = true;
                    Ok(Connected::Pending)
                }
                LegGroupKind::Direct => {
                    // [DIRECT|PROC] -> DIRECT
                    if self.leg_groups[p].end_wpt.is_none() {
                        return Err(Error::WptProcMismatch);
                    }
                    if wpt_eq(
                        self.leg_groups[p].end_wpt.as_ref(),
                        self.leg_groups[n].end_wpt.as_ref(),
                    ) {
                        if !allow_mod {
                            return Err(Error::DuplicateLeg);
                        }
                        // kill the duplicate and reconnect across it
                        let removed = self.bring_together(p, n);
                        let n = n - removed;
                        let new_next = self.next_ndisc(Some(n));
                        self.leg_groups.remove(n);
                        self.segs_dirty = true;
                        let new_next = new_next.map(|i| i - 1);
                        self.rlg_connect(Some(p), new_next, true, allow_add_legs);
                        return Ok(Connected::Done);
                    }
                    if self.leg_groups[n].start_wpt.is_some() && !allow_mod {
                        return Err(Error::WptProcMismatch);
                    }
                    self.leg_groups[n].start_wpt = self.leg_groups[p].end_wpt.clone();
                    Ok(Connected::Pending)
                }
                LegGroupKind::Proc(next_proc) => {
                    // [DIRECT|PROC] -> PROC
                    if wpt_eq(
                        self.leg_groups[p].end_wpt.as_ref(),
                        self.leg_groups[n].start_wpt.as_ref(),
                    ) {
                        return Ok(Connected::Pending);
                    }
                    let Some(prev_proc) = self.leg_groups[p].proc().cloned() else {
                        // a direct cannot intercept a procedure
                        return Err(Error::WptProcMismatch);
                    };
                    // sequenced procedures count as continuous provided
                    // they end in a suitable intercept leg
                    if navprocs_related(&prev_proc, &next_proc) && self.proc_rlgs_intc(p, n) {
                        if let Some(new_end) = self.leg_groups[p].find_end_wpt() {
                            // display convenience only; segment generation
                            // ignores the endpoint fields
                            self.leg_groups[p].end_wpt = Some(new_end);
                        }
                        return Ok(Connected::Pending);
                    }
                    Err(Error::WptProcMismatch)
                }
                LegGroupKind::Disco => Ok(Connected::Pending),
            },
        }
    }

    /// Brings two leg groups together (removing anything in between) and
    /// attempts to connect them; on failure leaves exactly one
    /// discontinuity between them. `None` stands for the route boundary, in
    /// which case stray boundary discontinuities are trimmed.
    fn rlg_connect(
        &mut self,
        prev: Option<usize>,
        next: Option<usize>,
        allow_mod: bool,
        allow_add_legs: bool,
    ) {
        match (prev, next) {
            (None, None) => (),
            (None, Some(n)) => {
                // anything before `n` can only be boundary discos
                if n > 0 {
                    debug_assert!(self.leg_groups[..n].iter().all(|g| g.is_disco()));
                    self.leg_groups.drain(..n);
                    self.segs_dirty = true;
                }
            }
            (Some(p), None) => {
                if p + 1 < self.leg_groups.len() {
                    debug_assert!(self.leg_groups[p + 1..].iter().all(|g| g.is_disco()));
                    self.leg_groups.drain(p + 1..);
                    self.segs_dirty = true;
                }
            }
            (Some(p), Some(n)) => {
                debug_assert!(p < n);
                match self.try_connect(p, n, allow_mod, allow_add_legs) {
                    Ok(Connected::Pending) => {
                        self.bring_together(p, n);
                    }
                    Ok(Connected::Done) => (),
                    Err(e) => {
                        if !self.only_disco_between(p, n) {
                            trace!("connect failed ({e}), inserting disco");
                            self.bring_together(p, n);
                            self.insert_group(p + 1, RouteLegGroup::new_disco());
                            self.segs_dirty = true;
                        }
                    }
                }
            }
        }
    }

    /// Reconnects a group with both of its non-disco neighbors.
    fn connect_neigh(&mut self, id: RlgId, allow_mod: bool, allow_add_legs: bool) {
        if let Some(idx) = self.idx_of_id(id) {
            let prev = self.prev_ndisc(Some(idx));
            self.rlg_connect(prev, Some(idx), allow_mod, allow_add_legs);
        }
        // the group may have moved or vanished during the first connect
        if let Some(idx) = self.idx_of_id(id) {
            let next = self.next_ndisc(Some(idx));
            self.rlg_connect(Some(idx), next, allow_mod, allow_add_legs);
        }
    }

    /// Whether the procedures of groups `p` and `n` intercept: shared
    /// endpoint fixes, or a computable intercept from `p`'s final
    /// course-to-intercept leg onto `n`.
    fn proc_rlgs_intc(&self, p: usize, n: usize) -> bool {
        let end1 = self.leg_groups[p].find_end_wpt();
        let start2 = self.leg_groups[n].find_start_wpt();
        if let (Some(e), Some(s)) = (&end1, &start2) {
            if e.pos_eq(s) {
                return true;
            }
        }

        let Some(last) = self.leg_groups[p].legs.last() else {
            return false;
        };
        let intc_capable = matches!(
            last.seg().map(|s| &s.leg),
            Some(PathTerm::CrsToIntcp { .. })
                | Some(PathTerm::HdgToIntcp { .. })
                | Some(PathTerm::ProcTurnLeg { .. })
        );
        if !intc_capable {
            return false;
        }

        let Some((start_pos, start_group)) = self.first_start_pos(Some(p)) else {
            return false;
        };
        let flat: Vec<RouteLeg> = self.legs().cloned().collect();
        let from = start_group.map(|g| self.flat_index(g, 0)).unwrap_or(0);
        let targ = self.flat_index(p, self.leg_groups[p].legs.len() - 1);

        let mut cur = start_pos.to_2d();
        for i in from..targ {
            cur = expand::leg_end_pos(cur, &flat, i, self.navdb.wmm());
        }
        !expand::leg_end_pos(cur, &flat, targ, self.navdb.wmm()).is_null()
    }

    /////////////////////////////////////////////////////////////////////////
    // Airport setters
    /////////////////////////////////////////////////////////////////////////

    /// Removes every reference the route holds into `arpt`: the departure
    /// runway, the procedure selections and any procedure leg groups.
    fn remove_arpt_links(&mut self, icao: &str) {
        if self.dep.as_ref().map(|a| a.icao == icao).unwrap_or(false) {
            self.dep_rwy = None;
        }
        macro_rules! clear_proc {
            ($($f:ident),*) => {
                $(if self.$f.as_ref().map(|p| p.arpt_icao == icao).unwrap_or(false) {
                    self.$f = None;
                })*
            };
        }
        clear_proc!(sid, sidcm, sidtr, star, starcm, startr, apprtr, appr);

        while let Some(idx) = self.leg_groups.iter().position(|rlg| {
            rlg.proc().map(|p| p.arpt_icao == icao).unwrap_or(false)
        }) {
            self.bypass_group(idx, false, false);
        }
        self.segs_dirty = true;
    }

    fn set_arpt(
        &mut self,
        which: fn(&mut Route) -> &mut Option<Rc<Airport>>,
        icao: Option<&str>,
    ) -> Result<()> {
        let new_arpt = match icao {
            Some(icao) => {
                if which(self)
                    .as_ref()
                    .map(|a| a.icao == icao)
                    .unwrap_or(false)
                {
                    return Ok(());
                }
                Some(self.navdb.airport(icao).ok_or(Error::ArptNotFound)?)
            }
            None => None,
        };

        if let Some(old) = which(self).clone() {
            self.remove_arpt_links(&old.icao.clone());
        }
        *which(self) = new_arpt;
        self.segs_dirty = true;
        Ok(())
    }

    pub fn set_dep_arpt(&mut self, icao: Option<&str>) -> Result<()> {
        debug!("set dep arpt: {icao:?}");
        self.set_arpt(|r| &mut r.dep, icao)
    }

    pub fn set_arr_arpt(&mut self, icao: Option<&str>) -> Result<()> {
        debug!("set arr arpt: {icao:?}");
        self.set_arpt(|r| &mut r.arr, icao)
    }

    pub fn set_altn1_arpt(&mut self, icao: Option<&str>) -> Result<()> {
        self.set_arpt(|r| &mut r.altn1, icao)
    }

    pub fn set_altn2_arpt(&mut self, icao: Option<&str>) -> Result<()> {
        self.set_arpt(|r| &mut r.altn2, icao)
    }

    /// Sets the departure runway. Requires a departure airport; clears any
    /// selected departure procedures.
    pub fn set_dep_rwy(&mut self, rwy_id: Option<&str>) -> Result<()> {
        let Some(dep) = self.dep.clone() else {
            return Err(Error::ArptNotFound);
        };

        let Some(rwy_id) = rwy_id else {
            self.set_sid(None)?;
            self.dep_rwy = None;
            self.segs_dirty = true;
            return Ok(());
        };

        // single-digit entries get their leading zero restored
        let id = if rwy_id.len() == 1 {
            format!("0{rwy_id}")
        } else {
            rwy_id.to_string()
        };
        if !is_valid_rwy_id(&id) {
            return Err(Error::InvalidRwy);
        }
        let rwy = dep.find_rwy(&id).ok_or(Error::InvalidRwy)?.clone();

        if self.dep_rwy.as_ref().map(|r| r.id != rwy.id).unwrap_or(true) {
            self.set_sid(None)?;
            self.dep_rwy = Some(rwy);
            self.segs_dirty = true;
        }
        Ok(())
    }

    /////////////////////////////////////////////////////////////////////////
    // Procedure setters
    /////////////////////////////////////////////////////////////////////////

    fn find_navproc(
        arpt: &Airport,
        kind: ProcKind,
        name: &str,
        tr_or_rwy: Option<&str>,
    ) -> Option<Rc<Procedure>> {
        arpt.procs
            .iter()
            .find(|proc| {
                if proc.kind != kind || proc.name != name {
                    return false;
                }
                match kind {
                    ProcKind::SidTrans | ProcKind::StarTrans | ProcKind::FinalTrans => {
                        tr_or_rwy.map(|tr| tr == proc.tr_name).unwrap_or(false)
                    }
                    ProcKind::Sid | ProcKind::Star => match tr_or_rwy {
                        Some(rwy) => {
                            proc.rwy.as_ref().map(|r| r.id == rwy).unwrap_or(false)
                        }
                        None => true,
                    },
                    _ => true,
                }
            })
            .map(Rc::clone)
    }

    fn find_proc_rlg(&self, kind: ProcKind) -> Option<usize> {
        self.leg_groups
            .iter()
            .position(|rlg| rlg.proc().map(|p| p.kind == kind).unwrap_or(false))
    }

    fn delete_proc_rlg(&mut self, kind: ProcKind) {
        if let Some(idx) = self.find_proc_rlg(kind) {
            self.bypass_group(idx, false, false);
        }
    }

    /// Inserts a procedure leg group after `after` (or at the head) without
    /// connecting it.
    fn insert_proc_rlg(&mut self, proc: Rc<Procedure>, after: Option<usize>) -> RlgId {
        let pos = after.map(|i| i + 1).unwrap_or(0);
        let id = self.insert_group(pos, RouteLegGroup::new_proc(proc));
        self.segs_dirty = true;
        id
    }

    /// Selects the standard departure. Deletes any previously selected
    /// departure procedures, including the transition.
    pub fn set_sid(&mut self, sid_name: Option<&str>) -> Result<()> {
        let Some(dep_rwy) = self.dep_rwy.clone() else {
            if sid_name.is_none() && self.sid.is_none() && self.sidcm.is_none() {
                return Ok(());
            }
            return Err(Error::InvalidEntry);
        };
        let dep = self.dep.clone().ok_or(Error::ArptNotFound)?;

        let Some(sid_name) = sid_name else {
            self.delete_proc_rlg(ProcKind::Sid);
            self.delete_proc_rlg(ProcKind::SidCommon);
            self.delete_proc_rlg(ProcKind::SidTrans);
            self.sidtr = None;
            self.sidcm = None;
            self.sid = None;
            return Ok(());
        };

        debug!("set SID {sid_name} (rwy {})", dep_rwy.id);
        let sid = Self::find_navproc(&dep, ProcKind::Sid, sid_name, Some(&dep_rwy.id));
        let sidcm = Self::find_navproc(&dep, ProcKind::SidCommon, sid_name, None);
        if sid.is_none() && sidcm.is_none() {
            return Err(Error::InvalidSid);
        }

        self.delete_proc_rlg(ProcKind::Sid);
        self.delete_proc_rlg(ProcKind::SidCommon);
        self.delete_proc_rlg(ProcKind::SidTrans);

        if let Some(sid) = &sid {
            let id = self.insert_proc_rlg(Rc::clone(sid), None);
            self.connect_neigh(id, true, false);
        }
        if let Some(sidcm) = &sidcm {
            let after = self.find_proc_rlg(ProcKind::Sid);
            let id = self.insert_proc_rlg(Rc::clone(sidcm), after);
            self.connect_neigh(id, true, false);
        }

        self.sid = sid;
        self.sidcm = sidcm;
        self.sidtr = None;
        Ok(())
    }

    /// Selects the departure transition. Requires a departure procedure.
    pub fn set_sidtr(&mut self, tr_name: Option<&str>) -> Result<()> {
        if self.sid.is_none() && self.sidcm.is_none() {
            return Err(Error::InvalidEntry);
        }
        let dep = self.dep.clone().ok_or(Error::ArptNotFound)?;

        let Some(tr_name) = tr_name else {
            self.delete_proc_rlg(ProcKind::SidTrans);
            self.sidtr = None;
            return Ok(());
        };

        let sid_name = self
            .sid
            .as_ref()
            .or(self.sidcm.as_ref())
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let sidtr = Self::find_navproc(&dep, ProcKind::SidTrans, &sid_name, Some(tr_name))
            .ok_or(Error::InvalidTrans)?;

        self.delete_proc_rlg(ProcKind::SidTrans);

        // the transition follows the common part when present
        let after = self
            .find_proc_rlg(ProcKind::SidCommon)
            .or_else(|| self.find_proc_rlg(ProcKind::Sid));
        let id = self.insert_proc_rlg(Rc::clone(&sidtr), after);
        self.connect_neigh(id, true, false);

        self.sidtr = Some(sidtr);
        Ok(())
    }

    /// Selects the standard arrival. When an approach is selected, the
    /// runway-specific arrival is resolved against the approach runway.
    pub fn set_star(&mut self, star_name: Option<&str>) -> Result<()> {
        let arr = self.arr.clone().ok_or(Error::ArptNotFound)?;

        let Some(star_name) = star_name else {
            self.delete_proc_rlg(ProcKind::StarTrans);
            self.delete_proc_rlg(ProcKind::StarCommon);
            self.delete_proc_rlg(ProcKind::Star);
            self.startr = None;
            self.starcm = None;
            self.star = None;
            return Ok(());
        };

        debug!("set STAR {star_name}");
        let rwy_id = self
            .appr
            .as_ref()
            .and_then(|appr| appr.rwy.as_ref().map(|r| r.id.clone()));
        let starcm = Self::find_navproc(&arr, ProcKind::StarCommon, star_name, None);
        let star = Self::find_navproc(&arr, ProcKind::Star, star_name, rwy_id.as_deref());
        if starcm.is_none() && star.is_none() {
            return Err(Error::InvalidStar);
        }

        self.delete_proc_rlg(ProcKind::StarTrans);
        self.delete_proc_rlg(ProcKind::StarCommon);
        self.delete_proc_rlg(ProcKind::Star);

        // arrivals go in front of any approach groups, otherwise at the
        // tail
        let appr_rlg = self
            .find_proc_rlg(ProcKind::FinalTrans)
            .or_else(|| self.find_proc_rlg(ProcKind::Final));

        if let Some(starcm) = &starcm {
            let after = match appr_rlg.map(|i| self.prev_ndisc(Some(i))) {
                Some(prev) => prev,
                None => self.prev_ndisc(None),
            };
            let id = self.insert_proc_rlg(Rc::clone(starcm), after);
            self.connect_neigh(id, true, false);
        }
        if let Some(star) = &star {
            let appr_rlg = self
                .find_proc_rlg(ProcKind::FinalTrans)
                .or_else(|| self.find_proc_rlg(ProcKind::Final));
            let after = match appr_rlg.map(|i| self.prev_ndisc(Some(i))) {
                Some(prev) => prev,
                None => self.prev_ndisc(None),
            };
            let id = self.insert_proc_rlg(Rc::clone(star), after);
            self.connect_neigh(id, true, false);
        }

        self.star = star;
        self.starcm = starcm;
        self.startr = None;
        Ok(())
    }

    /// Selects the arrival transition. Requires an arrival procedure.
    pub fn set_startr(&mut self, tr_name: Option<&str>) -> Result<()> {
        if self.star.is_none() && self.starcm.is_none() {
            return Err(Error::InvalidEntry);
        }
        let arr = self.arr.clone().ok_or(Error::ArptNotFound)?;

        let Some(tr_name) = tr_name else {
            self.delete_proc_rlg(ProcKind::StarTrans);
            self.startr = None;
            return Ok(());
        };

        let star_name = self
            .star
            .as_ref()
            .or(self.starcm.as_ref())
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let startr = Self::find_navproc(&arr, ProcKind::StarTrans, &star_name, Some(tr_name))
            .ok_or(Error::InvalidTrans)?;

        self.delete_proc_rlg(ProcKind::StarTrans);

        // the transition precedes the arrival it feeds
        let next = self
            .find_proc_rlg(ProcKind::StarCommon)
            .or_else(|| self.find_proc_rlg(ProcKind::Star))
            .or_else(|| self.find_proc_rlg(ProcKind::FinalTrans))
            .or_else(|| self.find_proc_rlg(ProcKind::Final));
        let after = match next.map(|i| self.prev_ndisc(Some(i))) {
            Some(prev) => prev,
            None => self.prev_ndisc(None),
        };
        let id = self.insert_proc_rlg(Rc::clone(&startr), after);
        self.connect_neigh(id, true, false);

        self.startr = Some(startr);
        Ok(())
    }

    /// Selects the final approach. The arrival procedure is re-resolved
    /// against the new approach runway and cleared if it no longer applies.
    pub fn set_appr(&mut self, appr_name: Option<&str>) -> Result<()> {
        let arr = self.arr.clone().ok_or(Error::ArptNotFound)?;

        let Some(appr_name) = appr_name else {
            self.delete_proc_rlg(ProcKind::FinalTrans);
            self.delete_proc_rlg(ProcKind::Final);
            self.apprtr = None;
            self.appr = None;
            return Ok(());
        };

        debug!("set approach {appr_name}");
        let appr = Self::find_navproc(&arr, ProcKind::Final, appr_name, None)
            .ok_or(Error::InvalidFinal)?;

        self.delete_proc_rlg(ProcKind::FinalTrans);
        self.delete_proc_rlg(ProcKind::Final);

        let after = self.prev_ndisc(None);
        let id = self.insert_proc_rlg(Rc::clone(&appr), after);
        self.connect_neigh(id, true, false);

        self.appr = Some(appr);
        self.apprtr = None;

        // the STAR depends on the approach runway and may need a refresh
        let star_name = self
            .star
            .as_ref()
            .or(self.starcm.as_ref())
            .map(|p| p.name.clone());
        if let Some(star_name) = star_name {
            let tr_name = self.startr.as_ref().map(|p| p.tr_name.clone());
            if self.set_star(Some(&star_name)).is_err() {
                // not applicable to this approach anymore
                warn!("STAR {star_name} not applicable to {appr_name}, clearing");
                self.set_star(None)?;
            } else if let Some(tr_name) = tr_name {
                let _ = self.set_startr(Some(&tr_name));
            }
        }
        Ok(())
    }

    /// Selects the approach transition. Requires a final approach.
    pub fn set_apprtr(&mut self, tr_name: Option<&str>) -> Result<()> {
        if self.appr.is_none() {
            return Err(Error::InvalidEntry);
        }
        let arr = self.arr.clone().ok_or(Error::ArptNotFound)?;

        let Some(tr_name) = tr_name else {
            self.delete_proc_rlg(ProcKind::FinalTrans);
            self.apprtr = None;
            return Ok(());
        };

        let appr_name = self
            .appr
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let apprtr = Self::find_navproc(&arr, ProcKind::FinalTrans, &appr_name, Some(tr_name))
            .ok_or(Error::InvalidTrans)?;

        self.delete_proc_rlg(ProcKind::FinalTrans);

        let next = self.find_proc_rlg(ProcKind::Final);
        let after = match next.map(|i| self.prev_ndisc(Some(i))) {
            Some(prev) => prev,
            None => self.prev_ndisc(None),
        };
        let id = self.insert_proc_rlg(Rc::clone(&apprtr), after);
        self.connect_neigh(id, true, false);

        self.apprtr = Some(apprtr);
        Ok(())
    }

    /////////////////////////////////////////////////////////////////////////
    // Leg group editing
    /////////////////////////////////////////////////////////////////////////

    /// Inserts an airway leg group without endpoints after the group
    /// `after` (`None` inserts at the head). The airway produces no legs
    /// until an end fix is set.
    pub fn insert_airway(&mut self, awyname: &str, after: Option<RlgId>) -> Result<RlgId> {
        let navdb = Rc::clone(&self.navdb);
        let (awy, _) = navdb
            .airways()
            .lookup(awyname, None, None)
            .ok_or(Error::InvalidAwy)?;

        let after_idx = match after {
            Some(id) => Some(self.idx_of_id(id).ok_or(Error::InvalidEntry)?),
            None => None,
        };
        self.check_insert_position(after_idx)?;

        let pos = after_idx.map(|i| i + 1).unwrap_or(0);
        let id = self.insert_group(pos, RouteLegGroup::new_airway(awy));
        self.connect_neigh(id, true, true);
        self.segs_dirty = true;
        Ok(id)
    }

    /// Departure procedures stay at the head, arrivals at the tail: no
    /// insertion before the departure or after the start of the arrivals.
    fn check_insert_position(&self, after: Option<usize>) -> Result<()> {
        if let Some(next) = self.next_ndisc(after) {
            if self.leg_groups[next]
                .proc()
                .map(|p| p.kind.is_departure())
                .unwrap_or(false)
            {
                return Err(Error::InvalidEntry);
            }
        }
        if let Some(after) = after {
            if self.leg_groups[after]
                .proc()
                .map(|p| p.kind.is_arrival())
                .unwrap_or(false)
            {
                return Err(Error::InvalidEntry);
            }
        }
        Ok(())
    }

    /// Sets the end fix of an airway leg group, expanding its legs.
    pub fn awy_set_end_wpt(&mut self, id: RlgId, wptname: &str) -> Result<()> {
        let navdb = Rc::clone(&self.navdb);
        let idx = self.idx_of_id(id).ok_or(Error::InvalidEntry)?;
        let rlg = &self.leg_groups[idx];
        let Some(awy) = rlg.airway() else {
            return Err(Error::InvalidEntry);
        };

        let Some(start) = rlg.start_wpt.clone() else {
            return Err(Error::AwyWptMismatch);
        };
        let Some((newawy, end_wpt)) =
            navdb.airways().lookup(&awy.name, Some(&start), Some(wptname))
        else {
            return Err(Error::AwyWptMismatch);
        };

        let rlg = &mut self.leg_groups[idx];
        rlg.kind = LegGroupKind::Airway(newawy);
        rlg.end_wpt = end_wpt;

        self.connect_neigh(id, false, false);
        if let Some(idx) = self.idx_of_id(id) {
            self.update_awy_legs(idx, false);
        }
        self.segs_dirty = true;
        Ok(())
    }

    /// Inserts a direct-to leg group ending at `fix` after the group
    /// `after` (`None` inserts at the head).
    pub fn insert_direct(&mut self, fix: &Waypoint, after: Option<RlgId>) -> Result<RlgId> {
        let after_idx = match after {
            Some(id) => Some(self.idx_of_id(id).ok_or(Error::InvalidEntry)?),
            None => None,
        };
        self.check_insert_position(after_idx)?;
        Ok(self.insert_direct_at(fix, after_idx))
    }

    fn insert_direct_at(&mut self, fix: &Waypoint, after: Option<usize>) -> RlgId {
        trace!("insert direct {}", fix.name);
        let pos = after.map(|i| i + 1).unwrap_or(0);
        let id = self.insert_group(pos, RouteLegGroup::new_direct(fix));
        if let Some(idx) = self.idx_of_id(id) {
            self.update_direct_leg(idx);
        }
        self.connect_neigh(id, true, false);
        self.segs_dirty = true;
        id
    }

    /// Deletes a leg group and reconnects its neighbors. Procedure groups
    /// cannot be deleted this way; clear them through the procedure
    /// setters.
    pub fn delete_leg_group(&mut self, id: RlgId) -> Result<()> {
        let idx = self.idx_of_id(id).ok_or(Error::InvalidEntry)?;
        let rlg = &self.leg_groups[idx];
        if rlg.is_proc() {
            return Err(Error::InvalidDelete);
        }
        let allow_mod = rlg.is_disco();
        self.bypass_group(idx, allow_mod, false);
        self.segs_dirty = true;
        Ok(())
    }

    /////////////////////////////////////////////////////////////////////////
    // Leg editing
    /////////////////////////////////////////////////////////////////////////

    fn leg_check_dup(&self, loc: Option<(usize, usize)>, fix: &Waypoint) -> bool {
        let Some((g, l)) = loc else {
            return false;
        };
        let leg = &self.leg_groups[g].legs[l];
        let is_init = matches!(leg.seg().map(|s| &s.leg), Some(PathTerm::InitFix { .. }));
        !is_init && leg.end_wpt().map(|w| w.pos_eq(fix)).unwrap_or(false)
    }

    /// Appends a leg ending at `fix` to an airway or terminal-procedure
    /// group.
    fn rlg_append_direct(&mut self, id: RlgId, fix: &Waypoint) {
        let Some(idx) = self.idx_of_id(id) else {
            return;
        };
        self.leg_groups[idx].end_wpt = Some(fix.clone());
        if self.leg_groups[idx].is_airway() {
            self.update_awy_legs(idx, true);
        } else {
            self.leg_groups[idx].legs.push(RouteLeg::direct_to(fix));
        }
        self.connect_neigh(id, false, false);
        self.segs_dirty = true;
    }

    /// Prepends a leg ending at `fix` in front of an airway group: the
    /// airway is re-anchored at `fix` and a new direct leads into it.
    fn rlg_prepend_direct(&mut self, id: RlgId, fix: &Waypoint) {
        let Some(idx) = self.idx_of_id(id) else {
            return;
        };
        self.leg_groups[idx].start_wpt = Some(fix.clone());
        self.update_awy_legs(idx, true);
        let prev = self.prev_ndisc(Some(idx));
        self.insert_direct_at(fix, prev);
    }

    /// Splits an airway group in two at the given internal leg bounds.
    /// `rl1` is the last leg kept in the first half, `rl2` the first leg of
    /// the second half (either may be `None` for "nothing kept"). When the
    /// halves don't meet, `join` bridges them with a direct, otherwise a
    /// discontinuity separates them.
    fn awy_split(
        &mut self,
        idx: usize,
        rl1: Option<usize>,
        rl2: Option<usize>,
        join: bool,
    ) {
        let awy1 = &self.leg_groups[idx];
        let awy1_id = awy1.id;
        let awy1_start = awy1.start_wpt.clone();
        let awy1_end = match rl1 {
            Some(l) => awy1.legs[l].end_wpt().cloned(),
            None => awy1.start_wpt.clone(),
        };
        let awy2_start = match rl2 {
            Some(l) => {
                if l == 0 {
                    awy1.start_wpt.clone()
                } else {
                    awy1.legs[l - 1].end_wpt().cloned()
                }
            }
            None => awy1.end_wpt.clone(),
        };
        let awy2_end = awy1.end_wpt.clone();
        let awy = awy1.airway().cloned();

        // second half
        let awy2_id = if !wpt_eq(awy2_start.as_ref(), awy2_end.as_ref()) {
            let awy = awy.clone().expect("airway group");
            let mut rlg = RouteLegGroup::new_airway(awy);
            rlg.start_wpt = awy2_start.clone();
            rlg.end_wpt = awy2_end;
            let id = self.insert_group(idx + 1, rlg);
            self.update_awy_legs(idx + 1, false);
            Some(id)
        } else {
            None
        };

        // bridging direct
        let dir_id = if !wpt_eq(awy1_end.as_ref(), awy2_start.as_ref()) && join {
            match &awy2_start {
                Some(end) => {
                    let mut rlg = RouteLegGroup::new_direct(end);
                    rlg.start_wpt = awy1_end.clone();
                    let id = self.insert_group(idx + 1, rlg);
                    self.update_direct_leg(idx + 1);
                    Some(id)
                }
                None => None,
            }
        } else {
            None
        };

        // first half: shrink or bypass
        let awy1_kept = if !wpt_eq(awy1_start.as_ref(), awy1_end.as_ref()) {
            self.leg_groups[idx].end_wpt = awy1_end;
            self.update_awy_legs(idx, false);
            true
        } else {
            self.bypass_group(idx, true, false);
            false
        };

        if awy1_kept {
            self.connect_neigh(awy1_id, true, false);
        }
        if let Some(id) = dir_id {
            self.connect_neigh(id, true, false);
        }
        if let Some(id) = awy2_id {
            self.connect_neigh(id, true, false);
        }

        self.segs_dirty = true;
    }

    /// Shortens a procedure group up to (exclusive) the leg at `lim`,
    /// from the left or the right, and reconnects it.
    fn shorten_proc(&mut self, idx: usize, lim: usize, left: bool) {
        let id = self.leg_groups[idx].id;
        {
            let rlg = &mut self.leg_groups[idx];
            if left {
                rlg.legs.drain(..lim);
                rlg.start_wpt = rlg.find_start_wpt();
            } else {
                rlg.legs.drain(lim + 1..);
                rlg.end_wpt = rlg.find_end_wpt();
            }
        }
        self.connect_neigh(id, false, false);
        self.segs_dirty = true;
    }

    /// Directly inserts a leg terminating at `fix` after the leg at flat
    /// index `after` (`None` inserts at the route head). Aware of the
    /// surrounding leg groups: extends airways and terminal procedures
    /// where possible instead of spawning a new direct group.
    pub fn insert_leg(&mut self, fix: &Waypoint, after: Option<usize>) -> Result<()> {
        let prev_loc = match after {
            Some(flat) => Some(self.locate_leg(flat).ok_or(Error::InvalidEntry)?),
            None => None,
        };
        let next_flat = after.map(|i| i + 1).unwrap_or(0);
        let next_loc = self.locate_leg(next_flat);

        if self.leg_check_dup(prev_loc, fix) || self.leg_check_dup(next_loc, fix) {
            return Err(Error::DuplicateLeg);
        }

        match (prev_loc, next_loc) {
            (Some((pg, pl)), Some((ng, nl))) => {
                if pg != ng {
                    let prev_id = self.leg_groups[pg].id;
                    let next_id = self.leg_groups[ng].id;
                    // extend the airway when the fix immediately follows it
                    if self.leg_groups[pg].awy_fix_adjacent(fix, false) {
                        self.rlg_append_direct(prev_id, fix);
                    } else if self.leg_groups[pg].is_proc()
                        && self.leg_groups[ng].is_proc()
                        && self.leg_groups[pg].proc().map(|p| p.arpt_icao.clone())
                            == self.leg_groups[ng].proc().map(|p| p.arpt_icao.clone())
                    {
                        // don't split sequential procedures, append instead
                        self.rlg_append_direct(prev_id, fix);
                    } else if self.leg_groups[ng].awy_fix_adjacent(fix, true) {
                        self.rlg_prepend_direct(next_id, fix);
                    } else {
                        self.insert_direct_at(fix, Some(pg));
                    }
                } else if self.leg_groups[pg].is_airway() {
                    // a leg inside an airway splits it
                    let id_before = self.leg_groups[pg].id;
                    self.awy_split(pg, Some(pl), Some(nl), false);
                    if let Some(idx) = self.idx_of_id(id_before) {
                        self.insert_direct_at(fix, Some(idx));
                    } else {
                        self.insert_direct_at(fix, None);
                    }
                } else {
                    // procedures get internally expanded with a DF leg
                    let rlg = &mut self.leg_groups[pg];
                    rlg.legs.insert(pl + 1, RouteLeg::direct_to(fix));
                    self.segs_dirty = true;
                }
            }
            (Some((pg, _)), None) => {
                let prev_id = self.leg_groups[pg].id;
                if self.leg_groups[pg].awy_fix_adjacent(fix, false) {
                    self.rlg_append_direct(prev_id, fix);
                } else if self.leg_groups[pg]
                    .proc()
                    .map(|p| p.kind.is_arrival())
                    .unwrap_or(false)
                {
                    // terminal procedures extend in place; they must stay
                    // last in the group sequence
                    self.rlg_append_direct(prev_id, fix);
                } else {
                    self.insert_direct_at(fix, Some(pg));
                }
            }
            (None, Some((ng, _))) => {
                let next_id = self.leg_groups[ng].id;
                if self.leg_groups[ng].awy_fix_adjacent(fix, true) {
                    self.rlg_prepend_direct(next_id, fix);
                } else if self.leg_groups[ng]
                    .proc()
                    .map(|p| p.kind.is_departure())
                    .unwrap_or(false)
                {
                    // nothing goes in front of the departure
                    return Err(Error::InvalidEntry);
                } else {
                    self.insert_direct_at(fix, None);
                }
            }
            (None, None) => {
                self.insert_direct_at(fix, None);
            }
        }
        self.segs_dirty = true;
        Ok(())
    }

    /// Collapses the route between the legs at flat indices `target` and
    /// `source` (`target` earlier): every intervening leg group is removed
    /// and the boundary groups are trimmed.
    pub fn move_leg(&mut self, target: usize, source: usize) -> Result<()> {
        if target >= source {
            return Err(Error::InvalidEntry);
        }
        // the last non-disco leg before the target
        let prev_loc = (0..target)
            .rev()
            .filter_map(|i| self.locate_leg(i))
            .find(|&(g, l)| !self.leg_groups[g].legs[l].is_disco());
        let (src_g, src_l) = self.locate_leg(source).ok_or(Error::InvalidEntry)?;
        self.locate_leg(target).ok_or(Error::InvalidEntry)?;

        let prev_g = prev_loc.map(|(g, _)| g);
        let src_id = self.leg_groups[src_g].id;

        if prev_g != Some(src_g) {
            // remove every group strictly between them
            let lo = prev_g.map(|g| g + 1).unwrap_or(0);
            if lo < src_g {
                self.leg_groups.drain(lo..src_g);
                self.segs_dirty = true;
            }
            if let Some((pg, pl)) = prev_loc {
                match &self.leg_groups[pg].kind {
                    LegGroupKind::Airway(_) => self.awy_split(pg, Some(pl), None, false),
                    LegGroupKind::Proc(_) => self.shorten_proc(pg, pl, false),
                    LegGroupKind::Direct => self.connect_neigh(src_id, true, false),
                    LegGroupKind::Disco => (),
                }
            }
            if let Some(src_idx) = self.idx_of_id(src_id) {
                match &self.leg_groups[src_idx].kind {
                    LegGroupKind::Airway(_) => {
                        let next_l = src_l + 1;
                        let rl2 = (next_l < self.leg_groups[src_idx].legs.len())
                            .then_some(next_l);
                        self.awy_split(src_idx, None, rl2, true);
                    }
                    LegGroupKind::Proc(_) => self.shorten_proc(src_idx, src_l, true),
                    LegGroupKind::Direct => self.connect_neigh(src_id, true, false),
                    LegGroupKind::Disco => (),
                }
            }
        } else {
            // both bounds inside one group
            let (pg, pl) = prev_loc.ok_or(Error::InvalidEntry)?;
            match &self.leg_groups[pg].kind {
                LegGroupKind::Airway(_) => {
                    let next_l = src_l + 1;
                    let rl2 = (next_l < self.leg_groups[pg].legs.len()).then_some(next_l);
                    self.awy_split(pg, Some(pl), rl2, true);
                }
                LegGroupKind::Proc(_) => {
                    // procedure legs between the bounds simply go away; the
                    // segment generator deals with whatever remains
                    self.leg_groups[pg].legs.drain(pl + 1..src_l);
                    self.segs_dirty = true;
                }
                _ => return Err(Error::InvalidEntry),
            }
        }
        self.segs_dirty = true;
        Ok(())
    }

    /// Deletes the leg at flat index `flat`, splitting or shortening its
    /// owning group as needed.
    pub fn delete_leg(&mut self, flat: usize) -> Result<()> {
        let (g, l) = self.locate_leg(flat).ok_or(Error::InvalidEntry)?;
        let id = self.leg_groups[g].id;
        let nlegs = self.leg_groups[g].legs.len();

        match &self.leg_groups[g].kind {
            LegGroupKind::Airway(_) => {
                let has_prev = l > 0;
                let has_next = l + 1 < nlegs;
                if has_prev && has_next {
                    // split the airway, leaving a disco at the gap
                    self.awy_split(g, Some(l - 1), Some(l + 1), false);
                } else if has_prev {
                    // shorten from the right
                    let rlg = &mut self.leg_groups[g];
                    rlg.end_wpt = rlg.legs[l - 1].end_wpt().cloned();
                    self.update_awy_legs(g, false);
                    if let Some(idx) = self.idx_of_id(id) {
                        let next = self.next_ndisc(Some(idx));
                        self.rlg_connect(Some(idx), next, false, false);
                    }
                } else if has_next {
                    // shorten from the left
                    let rlg = &mut self.leg_groups[g];
                    rlg.start_wpt = rlg.legs[l].end_wpt().cloned();
                    self.update_awy_legs(g, false);
                    if let Some(idx) = self.idx_of_id(id) {
                        let prev = self.prev_ndisc(Some(idx));
                        self.rlg_connect(prev, Some(idx), false, false);
                    }
                } else {
                    self.bypass_group(g, false, false);
                }
            }
            LegGroupKind::Proc(_) => {
                if nlegs == 1 {
                    self.bypass_group(g, false, false);
                } else if l == 0 {
                    self.leg_groups[g].legs.remove(0);
                    if let Some(start) = self.leg_groups[g].find_start_wpt() {
                        self.leg_groups[g].start_wpt = Some(start);
                        self.connect_neigh(id, false, false);
                    }
                } else if l + 1 == nlegs {
                    self.leg_groups[g].legs.pop();
                    if let Some(end) = self.leg_groups[g].find_end_wpt() {
                        self.leg_groups[g].end_wpt = Some(end);
                        self.connect_neigh(id, false, false);
                    }
                } else {
                    self.leg_groups[g].legs.remove(l);
                }
            }
            LegGroupKind::Direct => self.bypass_group(g, false, false),
            LegGroupKind::Disco => self.bypass_group(g, true, false),
        }
        self.segs_dirty = true;
        Ok(())
    }

    /// Overrides the altitude limit of the leg at flat index `flat`. The
    /// override shadows the underlying procedure constraint without
    /// touching it.
    pub fn set_leg_alt_lim(&mut self, flat: usize, lim: AltLimit) -> Result<()> {
        let (g, l) = self.locate_leg(flat).ok_or(Error::InvalidEntry)?;
        let leg = &mut self.leg_groups[g].legs[l];
        if leg.alt_ovrd != Some(lim) {
            leg.alt_ovrd = Some(lim);
            self.segs_dirty = true;
        }
        Ok(())
    }

    /// Overrides the speed limit of the leg at flat index `flat`.
    pub fn set_leg_spd_lim(&mut self, flat: usize, lim: SpeedLimit) -> Result<()> {
        let (g, l) = self.locate_leg(flat).ok_or(Error::InvalidEntry)?;
        let leg = &mut self.leg_groups[g].legs[l];
        if leg.spd_ovrd != Some(lim) {
            leg.spd_ovrd = Some(lim);
            self.segs_dirty = true;
        }
        Ok(())
    }

    /////////////////////////////////////////////////////////////////////////
    // Trajectory
    /////////////////////////////////////////////////////////////////////////

    /// The first suitable trajectory start position: the departure runway
    /// threshold, the departure airport reference point, or the start fix
    /// of the earliest leg group that has one (searching no further than
    /// `lim_group`).
    fn first_start_pos(&self, lim_group: Option<usize>) -> Option<(Coordinate3, Option<usize>)> {
        if let Some(rwy) = &self.dep_rwy {
            return Some((rwy.thr_pos, None));
        }
        if let Some(dep) = &self.dep {
            return Some((dep.refpt, None));
        }
        for (i, rlg) in self.leg_groups.iter().enumerate() {
            if let Some(wpt) = &rlg.start_wpt {
                return Some((wpt.pos.at_elev(0.0), Some(i)));
            }
            if Some(i) == lim_group {
                break;
            }
        }
        None
    }

    /// Rebuilds the trajectory: expands the legs from the start position
    /// into raw segments, then joins consecutive segments with transition
    /// arcs honoring `rnp_nm` at ground speed `gs_kts`. Clears the dirty
    /// flag. An empty result is a legal transient state during editing.
    pub fn build_trajectory(&mut self, gs_kts: f64, rnp_nm: f64) -> &[RouteSeg] {
        let navdb = Rc::clone(&self.navdb);
        let wmm = navdb.wmm();

        let Some((start3, start_group)) = self.first_start_pos(None) else {
            self.segs.clear();
            self.segs_dirty = false;
            return &self.segs;
        };
        let flat: Vec<RouteLeg> = self.legs().cloned().collect();
        let from = start_group
            .map(|g| self.flat_index(g, 0))
            .unwrap_or(0);

        let mut raw: Vec<RouteSeg> = Vec::new();
        let mut cur = start3.to_2d();
        for i in from..flat.len() {
            if flat[i].is_disco() {
                cur = Coordinate::NULL;
                continue;
            }
            let end = expand::leg_end_pos(cur, &flat, i, wmm);
            let seg = if !cur.is_null() {
                flat[i]
                    .seg()
                    .and_then(|s| expand::complete_seg(s, cur, wmm))
                    .or_else(|| {
                        // a leg whose shape needs the next leg still moves
                        // the position along its computed course
                        if end.is_null() || end.pos_eq(&cur) {
                            None
                        } else {
                            Some(RouteSeg::direct(cur, end, SegJoin::Track))
                        }
                    })
            } else {
                // the position was lost; legs that define their own start
                // re-anchor the trajectory
                expand::find_leg_seg(&flat, i, cur, wmm)
            };

            if let Some(rs) = seg {
                let degenerate = rs.start().pos_eq(&rs.end());
                if !degenerate {
                    raw.push(rs);
                }
            }
            cur = if !end.is_null() {
                end
            } else if let Some(rs) = seg {
                rs.end()
            } else {
                Coordinate::NULL
            };
        }

        debug!("trajectory: {} raw segments", raw.len());

        let rnp_m = crate::geom::nm2met(rnp_nm);
        let mut out: Vec<RouteSeg> = Vec::new();
        for rs in raw {
            out.push(rs);
            if out.len() >= 2 {
                let i = out.len() - 2;
                join::join_pair(&mut out, i, rnp_m, gs_kts);
            }
        }
        if let Some(last) = out.last_mut() {
            last.join = SegJoin::Simple;
        }

        self.segs = out;
        self.segs_dirty = false;
        &self.segs
    }
}
