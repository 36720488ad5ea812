//! Location access classification
//!
//! Every tracked package carries exactly one of four classifications:
//! - `NoLocation`: observed requesting location, nothing assigned yet
//! - `FixedLocation`: served a fixed, user-chosen location
//! - `CoarseLocation`: served an approximate location
//! - `FineLocation`: served a precise location

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Class of location access recorded for a package.
///
/// The discriminant is the integer persisted in the `location_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAccessType {
    NoLocation = 0,
    FixedLocation = 1,
    CoarseLocation = 2,
    FineLocation = 3,
}

impl LocationAccessType {
    /// Display label, indexed by the persisted integer
    pub const LABELS: [&'static str; 4] = ["no_location", "fixed_location", "coarse_location", "fine_location"];

    /// Get the string representation of the classification
    pub fn as_str(&self) -> &'static str {
        Self::LABELS[self.code() as usize]
    }

    /// Integer stored in the database
    pub fn code(&self) -> i64 {
        *self as i64
    }

    /// Get all classifications, in persisted order
    pub fn all() -> &'static [LocationAccessType] {
        &[
            LocationAccessType::NoLocation,
            LocationAccessType::FixedLocation,
            LocationAccessType::CoarseLocation,
            LocationAccessType::FineLocation,
        ]
    }
}

impl TryFrom<i64> for LocationAccessType {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(LocationAccessType::NoLocation),
            1 => Ok(LocationAccessType::FixedLocation),
            2 => Ok(LocationAccessType::CoarseLocation),
            3 => Ok(LocationAccessType::FineLocation),
            _ => Err(Error::InvalidAccessType(code.to_string())),
        }
    }
}

impl FromStr for LocationAccessType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "no_location" | "none" | "no" | "0" => Ok(LocationAccessType::NoLocation),
            "fixed_location" | "fixed" | "1" => Ok(LocationAccessType::FixedLocation),
            "coarse_location" | "coarse" | "2" => Ok(LocationAccessType::CoarseLocation),
            "fine_location" | "fine" | "3" => Ok(LocationAccessType::FineLocation),
            _ => Err(Error::InvalidAccessType(s.to_string())),
        }
    }
}

impl std::fmt::Display for LocationAccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for LocationAccessType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for LocationAccessType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        LocationAccessType::try_from(code).map_err(|_| FromSqlError::OutOfRange(code))
    }
}
