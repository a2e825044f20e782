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

//! # The Flight Management Computer (FMC) Core
//!
//! This crate is the computational core of an open flight management
//! computer: from a navigation database, an aircraft performance file and
//! pilot input it maintains an active flight plan and expands it into a
//! flyable geometric trajectory of geodesic segments and circular arcs
//! joined by turn transitions that respect aircraft dynamics.
//!
//! ## Overview
//!
//! At the top sits the [`FMS`], which owns the navigation databases, the
//! magnetic model and the performance model. A [`Route`] is created from it
//! and edited through operations that keep the flight plan structurally
//! sound: airways reconnect to their neighbors, procedures stay in one
//! piece, duplicates disappear and discontinuities mark the places where
//! reconnection is impossible.
//!
//! ```no_run
//! # use std::path::Path;
//! use fmc::fms::FMS;
//!
//! # fn main() -> Result<(), fmc::error::Error> {
//! let fms = FMS::open(Path::new("navdata"), Path::new("B738.perf"))?;
//! let mut route = fms.new_route();
//!
//! route.set_dep_arpt(Some("EDDF"))?;
//! route.set_arr_arpt(Some("EDDM"))?;
//! route.set_dep_rwy(Some("25C"))?;
//! route.set_sid(Some("ANEK7W"))?;
//! route.set_appr(Some("ILS08R"))?;
//!
//! // expand the plan into a flyable trajectory at 280 kt with RNP 1 NM
//! for seg in route.build_trajectory(280.0, 1.0) {
//!     println!("{seg:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`FMS`]: fms::FMS
//! [`Route`]: route::Route
//!
//! # Acronyms & Abbreviations
//!
//! - **AIRAC** the 28-day navigation data revision cycle
//! - **FMC/FMS** Flight Management Computer/System
//! - **RNP** Required Navigation Performance, the maximum acceptable
//!   lateral deviation at a waypoint
//! - **SID/STAR** standard instrument departure/arrival
//! - **WMM** World Magnetic Model

pub mod error;
pub mod fms;
pub mod geom;
pub mod nd;
pub mod perf;
pub mod route;
pub mod wmm;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::fms::FMS;
    pub use crate::geom::{Coordinate, Coordinate3};
    pub use crate::nd::{Airport, NavDatabase, Procedure, Runway, Waypoint};
    pub use crate::route::{RlgId, Route, RouteLeg, RouteLegGroup, RouteSeg};
    pub use crate::wmm::MagModel;
}
