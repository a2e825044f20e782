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

//! Crate error taxonomy. Every mutating route operation returns one of
//! these; the geometry layer expresses "no result" with null coordinates
//! instead, so no error ever carries NaN positions.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, PartialEq, Debug)]
pub enum Error {
    /// Requested airport ICAO not in the database.
    ArptNotFound,
    /// Attempt to delete a leg group forbidden for this operation.
    InvalidDelete,
    /// No intersection of two airways.
    AwyAwyMismatch,
    /// Airway and waypoint do not connect.
    AwyWptMismatch,
    /// Airway and procedure start/end do not align.
    AwyProcMismatch,
    /// Direct leg ends at a point not on the next procedure.
    WptProcMismatch,
    /// Airway name not in the database.
    InvalidAwy,
    /// Attempt to add a leg identical to an adjacent existing leg.
    DuplicateLeg,
    /// Attempt violates a structural rule (e.g. inserting before a SID).
    InvalidEntry,
    /// Requested runway not found for this airport.
    InvalidRwy,
    /// Requested SID not found for this airport/runway.
    InvalidSid,
    /// Requested STAR not found for this airport/runway.
    InvalidStar,
    /// Requested final approach not found for this airport.
    InvalidFinal,
    /// Requested transition not found for this procedure.
    InvalidTrans,
    /// Waypoint decoder returned nothing.
    NotInDatabase,
    /// Vertical constraint not satisfiable.
    UnableNextAlt,
    /// Evaluation date outside the magnetic model's validity window.
    MagModelRange,
    /// Navigation or performance file I/O failure.
    Io(String),
    /// Malformed database or performance file content.
    Parse {
        file: String,
        line: usize,
        msg: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ArptNotFound => write!(f, "airport not found in database"),
            Error::InvalidDelete => write!(f, "cannot delete this leg group"),
            Error::AwyAwyMismatch => write!(f, "airways do not intersect"),
            Error::AwyWptMismatch => write!(f, "airway and waypoint do not connect"),
            Error::AwyProcMismatch => write!(f, "airway and procedure do not align"),
            Error::WptProcMismatch => write!(f, "waypoint not on procedure"),
            Error::InvalidAwy => write!(f, "airway not in database"),
            Error::DuplicateLeg => write!(f, "duplicate leg"),
            Error::InvalidEntry => write!(f, "invalid entry"),
            Error::InvalidRwy => write!(f, "invalid runway"),
            Error::InvalidSid => write!(f, "invalid SID"),
            Error::InvalidStar => write!(f, "invalid STAR"),
            Error::InvalidFinal => write!(f, "invalid final approach"),
            Error::InvalidTrans => write!(f, "invalid transition"),
            Error::NotInDatabase => write!(f, "not in database"),
            Error::UnableNextAlt => write!(f, "unable next altitude"),
            Error::MagModelRange => {
                write!(f, "date outside the magnetic model validity window")
            }
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
            Error::Parse { file, line, msg } => write!(f, "{file}:{line}: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
