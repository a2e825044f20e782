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

//! Flight Management System handle.
//!
//! [`FMS`] owns the subsystems with dependencies on one another: the
//! navigation databases with the magnetic model, the waypoint-entry
//! decoder, and the aircraft performance model. Routes are created from an
//! FMS and share its databases.

use std::path::Path;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::nd::NavDatabase;
use crate::perf::{AircraftPerf, FlightPerf};
use crate::route::{Decoded, Route, WptDecoder};

/// The FMS: navigation data, decoder and performance model in one place.
#[derive(Debug)]
pub struct FMS {
    navdb: Rc<NavDatabase>,
    decoder: WptDecoder,
    acft: AircraftPerf,
    flt: FlightPerf,
}

impl FMS {
    /// Opens an FMS from a navigation database directory and an aircraft
    /// performance file.
    pub fn open(navdata_dir: &Path, acft_perf_file: &Path) -> Result<FMS> {
        let navdb = NavDatabase::open(navdata_dir)?;
        let perf = std::fs::read_to_string(acft_perf_file)
            .map_err(|e| Error::Io(format!("{}: {e}", acft_perf_file.display())))?;
        let acft = AircraftPerf::parse(&perf)?;
        Ok(Self::from_parts(navdb, acft))
    }

    /// Builds an FMS from already-opened parts.
    pub fn from_parts(navdb: NavDatabase, acft: AircraftPerf) -> FMS {
        let flt = FlightPerf::new(&acft);
        FMS {
            navdb: Rc::new(navdb),
            decoder: WptDecoder::new(),
            acft,
            flt,
        }
    }

    pub fn navdb(&self) -> &Rc<NavDatabase> {
        &self.navdb
    }

    /// Whether the navigation database's validity period covers today.
    pub fn navdb_is_current(&self) -> bool {
        self.navdb.is_current()
    }

    /// Creates a new, empty route sharing this FMS's databases.
    pub fn new_route(&self) -> Route {
        Route::new(Rc::clone(&self.navdb))
    }

    /// Decodes a pilot-entered waypoint string for `route` (the route owns
    /// the sequence counter for generated fix names).
    pub fn decode_wpt(&self, route: &mut Route, name: &str) -> Result<Decoded> {
        self.decoder.decode(name, &self.navdb, route.wpt_seq_mut())
    }

    pub fn decoder_mut(&mut self) -> &mut WptDecoder {
        &mut self.decoder
    }

    pub fn acft_perf(&self) -> &AircraftPerf {
        &self.acft
    }

    pub fn flt_perf(&self) -> &FlightPerf {
        &self.flt
    }

    pub fn flt_perf_mut(&mut self) -> &mut FlightPerf {
        &mut self.flt
    }
}
