// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.


pub mod calibration_store;

pub use calibration_store::{CalibrationRecord, JsonCalibrationFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("calibration storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("calibration record is malformed: {0}")]
    Format(#[from] serde_json::Error),
    #[error("stored calibration record is invalid (factor {scale_factor}, offset {tare_offset})")]
    InvalidRecord { scale_factor: f64, tare_offset: f64 },
}

pub trait CalibrationAccessor {
    /// Read the persisted calibration. `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<CalibrationRecord>, PersistenceError>;

    /// Replace the persisted calibration with `record`. Either the old or the new record
    /// survives an interruption, never a partial one.
    fn save(&self, record: &CalibrationRecord) -> Result<(), PersistenceError>;
}

impl<T: CalibrationAccessor + ?Sized> CalibrationAccessor for &T {
    fn load(&self) -> Result<Option<CalibrationRecord>, PersistenceError> {
        (**self).load()
    }

    fn save(&self, record: &CalibrationRecord) -> Result<(), PersistenceError> {
        (**self).save(record)
    }
}
