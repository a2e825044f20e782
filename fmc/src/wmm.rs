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

//! World Magnetic Model oracle.
//!
//! Everything that converts between magnetic and true references goes
//! through [`MagModel`]; the numerics live in the `world_magnetic_model`
//! crate which embeds the current model coefficients.

use log::warn;

use world_magnetic_model::time::Date;
use world_magnetic_model::uom::si::angle::degree;
use world_magnetic_model::uom::si::f32::{Angle, Length};
use world_magnetic_model::uom::si::length::foot;
use world_magnetic_model::GeomagneticField;

use crate::error::{Error, Result};
use crate::geom::Coordinate3;

/// Magnetic declination oracle for one evaluation date.
#[derive(Copy, Clone, Debug)]
pub struct MagModel {
    date: Date,
}

impl MagModel {
    /// Constructs the model for `date`. Fails with [`Error::MagModelRange`]
    /// when the date falls outside the embedded model's validity window.
    pub fn new(date: Date) -> Result<Self> {
        // Probe once so an out-of-range date fails construction rather than
        // every later conversion.
        GeomagneticField::new(
            Length::new::<foot>(0.0),
            Angle::new::<degree>(0.0),
            Angle::new::<degree>(0.0),
            date,
        )
        .map_err(|_| Error::MagModelRange)?;
        Ok(MagModel { date })
    }

    /// Constructs the model for the current date.
    pub fn now() -> Result<Self> {
        use chrono::Datelike;
        let today = chrono::Utc::now().date_naive();
        let date = Date::from_ordinal_date(today.year(), today.ordinal() as u16)
            .map_err(|_| Error::MagModelRange)?;
        Self::new(date)
    }

    pub fn date(&self) -> Date {
        self.date
    }

    /// Magnetic declination in degrees at `pos`, positive east. Degrades to
    /// zero inside the model's blackout zones so geometry never sees NaN.
    pub fn declination(&self, pos: Coordinate3) -> f64 {
        match GeomagneticField::new(
            Length::new::<foot>(pos.elev_ft as f32),
            Angle::new::<degree>(pos.lat as f32),
            Angle::new::<degree>(pos.lon as f32),
            self.date,
        ) {
            Ok(field) => field.declination().get::<degree>() as f64,
            Err(_) => {
                warn!("no declination at {} {}, assuming zero", pos.lat, pos.lon);
                0.0
            }
        }
    }

    /// Converts a magnetic heading at `pos` to a true heading.
    pub fn mag2true(&self, m: f64, pos: Coordinate3) -> f64 {
        m + self.declination(pos)
    }

    /// Converts a true heading at `pos` to a magnetic heading.
    pub fn true2mag(&self, t: f64, pos: Coordinate3) -> f64 {
        t - self.declination(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> MagModel {
        MagModel::new(Date::from_ordinal_date(2026, 100).expect("valid date"))
            .expect("date within model range")
    }

    #[test]
    fn out_of_range_date_fails() {
        let date = Date::from_ordinal_date(1995, 1).expect("valid date");
        assert!(MagModel::new(date).is_err());
    }

    #[test]
    fn mag_true_round_trip() {
        let wmm = model();
        let pos = Coordinate3::new(47.26, 11.344, 1907.0);
        let m = wmm.true2mag(wmm.mag2true(330.0, pos), pos);
        assert!((m - 330.0).abs() < 1e-9);
    }

    #[test]
    fn seattle_declination_is_east() {
        let wmm = model();
        // The Puget Sound area has roughly 15 degrees east variation.
        let d = wmm.declination(Coordinate3::new(47.435, -122.309, 0.0));
        assert!(d > 10.0 && d < 20.0, "declination {d}");
    }
}
