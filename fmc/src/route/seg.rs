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

use crate::geom::{coord_to_ecef, Coordinate, WGS84};

/// How a trajectory segment wants to be joined to its successor.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SegJoin {
    /// No transition construction; the segments simply meet.
    Simple,
    /// Construct a turn transition, rejoining the successor's track when a
    /// single arc cannot honor the RNP.
    Track,
}

/// Geometry of one trajectory segment.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum SegKind {
    Direct {
        start: Coordinate,
        end: Coordinate,
    },
    Arc {
        start: Coordinate,
        end: Coordinate,
        center: Coordinate,
        cw: bool,
    },
}

/// One segment of the flyable trajectory.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RouteSeg {
    pub kind: SegKind,
    pub join: SegJoin,
    /// The end point is a vertical-profile estimate; the segment is flown
    /// in altitude-capture mode rather than to the point.
    pub alt_capture: bool,
}

impl RouteSeg {
    pub fn direct(start: Coordinate, end: Coordinate, join: SegJoin) -> Self {
        RouteSeg {
            kind: SegKind::Direct { start, end },
            join,
            alt_capture: false,
        }
    }

    pub fn arc(start: Coordinate, end: Coordinate, center: Coordinate, cw: bool, join: SegJoin) -> Self {
        RouteSeg {
            kind: SegKind::Arc {
                start,
                end,
                center,
                cw,
            },
            join,
            alt_capture: false,
        }
    }

    pub fn start(&self) -> Coordinate {
        match self.kind {
            SegKind::Direct { start, .. } | SegKind::Arc { start, .. } => start,
        }
    }

    pub fn end(&self) -> Coordinate {
        match self.kind {
            SegKind::Direct { end, .. } | SegKind::Arc { end, .. } => end,
        }
    }

    pub fn set_start(&mut self, pos: Coordinate) {
        match &mut self.kind {
            SegKind::Direct { start, .. } | SegKind::Arc { start, .. } => *start = pos,
        }
    }

    pub fn set_end(&mut self, pos: Coordinate) {
        match &mut self.kind {
            SegKind::Direct { end, .. } | SegKind::Arc { end, .. } => *end = pos,
        }
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.kind, SegKind::Arc { .. })
    }

    /// The radius of an arc segment in meters, from the ECEF chord between
    /// center and start.
    pub fn arc_radius(&self) -> f64 {
        match self.kind {
            SegKind::Arc { start, center, .. } => {
                (coord_to_ecef(center, &WGS84) - coord_to_ecef(start, &WGS84)).abs()
            }
            SegKind::Direct { .. } => f64::NAN,
        }
    }
}
