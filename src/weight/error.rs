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


use crate::storage::PersistenceError;
use embedded_hal::digital::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("strain gauge not ready within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("clock line error: {0:?}")]
    ClockPin(ErrorKind),
    #[error("data line error: {0:?}")]
    DataPin(ErrorKind),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no valid reading obtained from {requested} samples")]
    NoValidReading {
        requested: usize,
        last_error: Option<TransportError>,
    },
    #[error("reading too small for calibration ({delta:.1} raw units)")]
    InsufficientSignal { delta: f64 },
    #[error("invalid calibration mass {0} kg")]
    InvalidCalibrationMass(f64),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("weighing system has not been initialised")]
    NotInitialized,
    #[error("weighing system has been shut down")]
    Shutdown,
}
