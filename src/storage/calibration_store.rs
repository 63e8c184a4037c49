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


use crate::storage::{CalibrationAccessor, PersistenceError};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_CALIBRATION_PATH: &str = "data/calibration.json";
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;
pub const DEFAULT_TARE_OFFSET: f64 = 0.0;

fn default_scale_factor() -> f64 {
    DEFAULT_SCALE_FACTOR
}

fn default_tare_offset() -> f64 {
    DEFAULT_TARE_OFFSET
}

/// Zero offset and raw-units-per-kilogram factor. Records are replaced wholesale, never edited
/// in place, and the factor can never be zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(rename = "calibration_factor", default = "default_scale_factor")]
    scale_factor: f64,
    #[serde(default = "default_tare_offset")]
    tare_offset: f64,
    /// Seconds since the unix epoch
    #[serde(rename = "timestamp", default)]
    saved_at: f64,
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

impl CalibrationRecord {
    pub fn new(scale_factor: f64, tare_offset: f64) -> Option<Self> {
        let record = Self {
            scale_factor,
            tare_offset,
            saved_at: now_seconds(),
        };
        record.is_valid().then_some(record)
    }

    pub fn is_valid(&self) -> bool {
        self.scale_factor.is_finite() && self.scale_factor != 0.0 && self.tare_offset.is_finite()
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn tare_offset(&self) -> f64 {
        self.tare_offset
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        let seconds = self.saved_at.floor();
        let nanos = ((self.saved_at - seconds) * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(seconds as i64, nanos)
    }

    /// Same scale factor, new zero point. The offset must be finite.
    pub fn with_tare_offset(&self, tare_offset: f64) -> Self {
        Self {
            scale_factor: self.scale_factor,
            tare_offset,
            saved_at: now_seconds(),
        }
    }

    /// Same zero point, new scale factor.
    pub fn with_scale_factor(&self, scale_factor: f64) -> Option<Self> {
        Self::new(scale_factor, self.tare_offset)
    }
}

/// Calibration kept as a small JSON document on disk.
pub struct JsonCalibrationFile {
    path: PathBuf,
}

impl JsonCalibrationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for JsonCalibrationFile {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_PATH)
    }
}

impl CalibrationAccessor for JsonCalibrationFile {
    fn load(&self) -> Result<Option<CalibrationRecord>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: CalibrationRecord = serde_json::from_str(&contents)?;
        if !record.is_valid() {
            return Err(PersistenceError::InvalidRecord {
                scale_factor: record.scale_factor,
                tare_offset: record.tare_offset,
            });
        }
        debug!("Read calibration from {}", self.path.display());
        Ok(Some(record))
    }

    fn save(&self, record: &CalibrationRecord) -> Result<(), PersistenceError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(directory)?;

        // write next to the target so the rename stays on one filesystem
        let mut staged = NamedTempFile::new_in(directory)?;
        serde_json::to_writer_pretty(&mut staged, record)?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        debug!("Calibration saved to {}", self.path.display());
        Ok(())
    }
}
