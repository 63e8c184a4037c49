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


use crate::storage::{CalibrationAccessor, CalibrationRecord};
use crate::weight::error::ScaleError;
use crate::weight::filter::read_average;
use crate::weight::interface::StrainGaugeInterface;
use crate::weight::{WeighingSystem, DEFAULT_WEIGHT_SAMPLES};
use chrono::{DateTime, Utc};
use embassy_time::{Duration, Timer};
use log::{debug, info, trace, warn};
use serde::Serialize;
use strum::Display;

/// Readings closer to zero than this (1 g) are reported as exactly zero.
pub const DEAD_ZONE_KG: f64 = 0.001;
/// Smallest tared signal, in raw units, a calibration mass has to produce.
pub const MIN_CALIBRATION_DELTA: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleState {
    Uninitialized,
    Ready,
    Taring,
    Calibrating,
    Shutdown,
}

/// Pauses that give the operator time to clear the scale or place the reference mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTiming {
    pub tare_settle: Duration,
    pub calibration_settle: Duration,
    pub verification_delay: Duration,
}

impl Default for ScaleTiming {
    fn default() -> Self {
        Self {
            tare_settle: Duration::from_secs(2),
            calibration_settle: Duration::from_secs(3),
            verification_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightReading {
    pub kg: f64,
    pub sensor_fault: bool,
}

impl WeightReading {
    pub fn valid(kg: f64) -> Self {
        Self {
            kg,
            sensor_fault: false,
        }
    }

    pub fn fault() -> Self {
        Self {
            kg: 0.0,
            sensor_fault: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub scale_factor: f64,
    pub known_weight_kg: f64,
    pub measured_kg: f64,
    pub error_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleStatus {
    pub state: ScaleState,
    pub calibration_factor: f64,
    pub tare_offset: f64,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Applies tare and scale factor to an averaged raw reading. Never negative, noise around
/// zero snaps to 0.0.
pub fn weight_from_raw(raw: f64, calibration: &CalibrationRecord) -> f64 {
    let tared_reading = raw - calibration.tare_offset();
    let weight_kg = tared_reading / calibration.scale_factor();
    if weight_kg.abs() < DEAD_ZONE_KG {
        return 0.0;
    }
    weight_kg.max(0.0)
}

pub struct WeightScale<StrainGauge, Store> {
    strain_gauge: StrainGauge,
    store: Store,
    calibration: CalibrationRecord,
    state: ScaleState,
    timing: ScaleTiming,
}

impl<StrainGauge, Store> WeightScale<StrainGauge, Store>
where
    StrainGauge: StrainGaugeInterface,
    Store: CalibrationAccessor,
{
    /// `defaults` are used until [`initialize`](Self::initialize) has loaded the stored
    /// calibration, and afterwards if nothing usable was stored.
    pub fn new(
        strain_gauge: StrainGauge,
        store: Store,
        defaults: CalibrationRecord,
        timing: ScaleTiming,
    ) -> Self {
        Self {
            strain_gauge,
            store,
            calibration: defaults,
            state: ScaleState::Uninitialized,
            timing,
        }
    }

    /// Construct and initialise in one go.
    pub async fn start(
        strain_gauge: StrainGauge,
        store: Store,
        defaults: CalibrationRecord,
        timing: ScaleTiming,
    ) -> Result<Self, ScaleError> {
        let mut scale = Self::new(strain_gauge, store, defaults, timing);
        scale.initialize().await?;
        Ok(scale)
    }

    pub async fn initialize(&mut self) -> Result<(), ScaleError> {
        match self.state {
            ScaleState::Uninitialized => {}
            ScaleState::Shutdown => return Err(ScaleError::Shutdown),
            _ => return Ok(()),
        }

        self.strain_gauge.initialize().await?;
        self.calibration = self.load_stored_calibration();
        debug!(
            "Loaded calibration: factor = {}, tare = {}",
            self.calibration.scale_factor(),
            self.calibration.tare_offset()
        );
        self.state = ScaleState::Ready;
        Ok(())
    }

    fn load_stored_calibration(&self) -> CalibrationRecord {
        let defaults = self.calibration;
        match self.store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!("No calibration stored, using defaults");
                if let Err(e) = self.store.save(&defaults) {
                    warn!("Unable to store default calibration: {}", e);
                }
                defaults
            }
            Err(e) => {
                warn!("Unable to load calibration, using defaults: {}", e);
                defaults
            }
        }
    }

    pub fn state(&self) -> ScaleState {
        self.state
    }

    pub fn calibration(&self) -> &CalibrationRecord {
        &self.calibration
    }

    pub fn status(&self) -> ScaleStatus {
        ScaleStatus {
            state: self.state,
            calibration_factor: self.calibration.scale_factor(),
            tare_offset: self.calibration.tare_offset(),
            saved_at: self.calibration.saved_at(),
        }
    }

    fn ensure_ready(&self) -> Result<(), ScaleError> {
        match self.state {
            ScaleState::Ready => Ok(()),
            ScaleState::Uninitialized => Err(ScaleError::NotInitialized),
            ScaleState::Shutdown => Err(ScaleError::Shutdown),
            ScaleState::Taring | ScaleState::Calibrating => {
                warn!("Previous {} did not complete", self.state);
                Ok(())
            }
        }
    }

    async fn weigh(&mut self, samples: usize) -> Result<f64, ScaleError> {
        let raw_reading = read_average(&mut self.strain_gauge, samples).await?;
        let weight_kg = weight_from_raw(raw_reading, &self.calibration);
        trace!("Raw reading = {}, weight = {} kg", raw_reading, weight_kg);
        Ok(weight_kg)
    }

    /// Like [`measure`](Self::measure) but hands back the acquisition error.
    pub async fn read_weight(&mut self, samples: usize) -> Result<f64, ScaleError> {
        self.ensure_ready()?;
        self.weigh(samples).await
    }

    pub async fn measure(&mut self, samples: usize) -> WeightReading {
        match self.read_weight(samples).await {
            Ok(weight_kg) => WeightReading::valid(weight_kg),
            Err(e) => {
                warn!("Error reading weight: {}", e);
                WeightReading::fault()
            }
        }
    }

    pub async fn get_weight(&mut self, samples: usize) -> f64 {
        self.measure(samples).await.kg
    }

    fn commit(&mut self, record: CalibrationRecord) -> Result<(), ScaleError> {
        self.store.save(&record)?;
        self.calibration = record;
        Ok(())
    }

    /// Makes the current load the zero point. Returns the new offset.
    pub async fn tare(&mut self, samples: usize) -> Result<f64, ScaleError> {
        self.ensure_ready()?;
        self.state = ScaleState::Taring;
        let result = self.take_tare(samples).await;
        self.state = ScaleState::Ready;
        result
    }

    async fn take_tare(&mut self, samples: usize) -> Result<f64, ScaleError> {
        info!("Taring scale, ensure the scale is empty");
        Timer::after(self.timing.tare_settle).await;

        let tare_offset = read_average(&mut self.strain_gauge, samples).await?;
        self.commit(self.calibration.with_tare_offset(tare_offset))?;
        info!("Scale tared. New offset: {}", tare_offset);
        Ok(tare_offset)
    }

    /// Derives the scale factor from a reference mass sitting on the tared scale.
    pub async fn calibrate(
        &mut self,
        known_weight_kg: f64,
        samples: usize,
    ) -> Result<CalibrationReport, ScaleError> {
        self.ensure_ready()?;
        self.state = ScaleState::Calibrating;
        let result = self.take_calibration(known_weight_kg, samples).await;
        self.state = ScaleState::Ready;
        result
    }

    async fn take_calibration(
        &mut self,
        known_weight_kg: f64,
        samples: usize,
    ) -> Result<CalibrationReport, ScaleError> {
        info!("Calibrating with {}kg, place the known weight on the scale", known_weight_kg);
        Timer::after(self.timing.calibration_settle).await;

        let raw_reading = read_average(&mut self.strain_gauge, samples).await?;
        let tared_reading = raw_reading - self.calibration.tare_offset();
        if tared_reading.abs() < MIN_CALIBRATION_DELTA {
            return Err(ScaleError::InsufficientSignal {
                delta: tared_reading,
            });
        }
        if !known_weight_kg.is_finite() || known_weight_kg <= 0.0 {
            return Err(ScaleError::InvalidCalibrationMass(known_weight_kg));
        }

        let scale_factor = tared_reading / known_weight_kg;
        let record = self
            .calibration
            .with_scale_factor(scale_factor)
            .ok_or(ScaleError::InvalidCalibrationMass(known_weight_kg))?;
        self.commit(record)?;
        info!("Calibration complete. Factor: {}", scale_factor);

        Timer::after(self.timing.verification_delay).await;
        let measured_kg = self
            .weigh(DEFAULT_WEIGHT_SAMPLES)
            .await
            .unwrap_or_else(|e| {
                warn!("Unable to verify calibration: {}", e);
                0.0
            });
        let error_percent = (measured_kg - known_weight_kg).abs() / known_weight_kg * 100.0;
        info!(
            "Verification: expected = {}kg, measured = {:.3}kg, error = {:.1}%",
            known_weight_kg, measured_kg, error_percent
        );

        Ok(CalibrationReport {
            scale_factor,
            known_weight_kg,
            measured_kg,
            error_percent,
        })
    }

    /// Powers the converter down. Terminal, every later operation fails.
    pub async fn cleanup(&mut self) -> Result<(), ScaleError> {
        if self.state == ScaleState::Shutdown {
            return Ok(());
        }
        self.state = ScaleState::Shutdown;
        self.strain_gauge.power_down().await?;
        info!("Weight sensor cleanup complete");
        Ok(())
    }
}

impl<StrainGauge, Store> WeighingSystem for WeightScale<StrainGauge, Store>
where
    StrainGauge: StrainGaugeInterface,
    Store: CalibrationAccessor,
{
    type Error = ScaleError;

    async fn measure(&mut self, samples: usize) -> WeightReading {
        WeightScale::measure(self, samples).await
    }

    async fn tare(&mut self, samples: usize) -> Result<(), Self::Error> {
        WeightScale::tare(self, samples).await.map(|_| ())
    }

    async fn calibrate(
        &mut self,
        known_weight_kg: f64,
        samples: usize,
    ) -> Result<CalibrationReport, Self::Error> {
        WeightScale::calibrate(self, known_weight_kg, samples).await
    }

    async fn status(&mut self) -> ScaleStatus {
        WeightScale::status(self)
    }

    async fn cleanup(&mut self) -> Result<(), Self::Error> {
        WeightScale::cleanup(self).await
    }
}
