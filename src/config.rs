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


use crate::application::weighing_manager::MonitorSettings;
use crate::storage::calibration_store::{
    DEFAULT_CALIBRATION_PATH, DEFAULT_SCALE_FACTOR, DEFAULT_TARE_OFFSET,
};
use crate::storage::CalibrationRecord;
use crate::weight::interface::hx711::Hx711Gain;
use crate::weight::{ScaleTiming, DEFAULT_CALIBRATION_SAMPLES, DEFAULT_TARE_SAMPLES, DEFAULT_WEIGHT_SAMPLES};
use embassy_time::Duration;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(&'static str),
}

/// Deployment settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub gpio_chip: String,
    pub data_pin: u32,
    pub clock_pin: u32,
    pub gain: Hx711Gain,
    pub calibration_path: PathBuf,
    pub default_scale_factor: f64,
    pub default_tare_offset: f64,
    pub ready_timeout_ms: u64,
    pub sample_period_ms: u64,
    pub weight_samples: usize,
    pub tare_samples: usize,
    pub calibration_samples: usize,
    pub tare_settle_ms: u64,
    pub calibration_settle_ms: u64,
    pub verification_delay_ms: u64,
    pub detection_threshold_kg: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            gpio_chip: "/dev/gpiochip0".to_string(),
            data_pin: 5,
            clock_pin: 6,
            gain: Hx711Gain::default(),
            calibration_path: PathBuf::from(DEFAULT_CALIBRATION_PATH),
            default_scale_factor: DEFAULT_SCALE_FACTOR,
            default_tare_offset: DEFAULT_TARE_OFFSET,
            ready_timeout_ms: 1000,
            sample_period_ms: 500,
            weight_samples: DEFAULT_WEIGHT_SAMPLES,
            tare_samples: DEFAULT_TARE_SAMPLES,
            calibration_samples: DEFAULT_CALIBRATION_SAMPLES,
            tare_settle_ms: 2000,
            calibration_settle_ms: 3000,
            verification_delay_ms: 1000,
            detection_threshold_kg: 0.01,
        }
    }
}

impl ScaleConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_calibration().is_none() {
            return Err(ConfigError::Invalid(
                "default_scale_factor must be finite and non-zero",
            ));
        }
        if self.weight_samples == 0 || self.tare_samples == 0 || self.calibration_samples == 0 {
            return Err(ConfigError::Invalid("sample counts must be at least 1"));
        }
        if self.sample_period_ms == 0 {
            return Err(ConfigError::Invalid("sample_period_ms must be at least 1"));
        }
        if self.ready_timeout_ms == 0 {
            return Err(ConfigError::Invalid("ready_timeout_ms must be at least 1"));
        }
        Ok(())
    }

    pub fn default_calibration(&self) -> Option<CalibrationRecord> {
        CalibrationRecord::new(self.default_scale_factor, self.default_tare_offset)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn timing(&self) -> ScaleTiming {
        ScaleTiming {
            tare_settle: Duration::from_millis(self.tare_settle_ms),
            calibration_settle: Duration::from_millis(self.calibration_settle_ms),
            verification_delay: Duration::from_millis(self.verification_delay_ms),
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            period: Duration::from_millis(self.sample_period_ms),
            samples: self.weight_samples,
            detection_threshold_kg: self.detection_threshold_kg,
        }
    }
}
