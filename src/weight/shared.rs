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


use crate::storage::CalibrationAccessor;
use crate::weight::error::ScaleError;
use crate::weight::interface::StrainGaugeInterface;
use crate::weight::weight::{CalibrationReport, ScaleStatus, WeightReading, WeightScale};
use crate::weight::WeighingSystem;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

/// Single owner of the weighing hardware, shared between the acquisition worker and the request
/// path. Every operation holds the lock from its first frame to its last, so frame exchanges and
/// calibration writes never interleave.
pub struct ScaleHandle<StrainGauge, Store> {
    scale: Mutex<CriticalSectionRawMutex, WeightScale<StrainGauge, Store>>,
}

impl<StrainGauge, Store> ScaleHandle<StrainGauge, Store>
where
    StrainGauge: StrainGaugeInterface,
    Store: CalibrationAccessor,
{
    pub fn new(scale: WeightScale<StrainGauge, Store>) -> Self {
        Self {
            scale: Mutex::new(scale),
        }
    }

    pub fn into_inner(self) -> WeightScale<StrainGauge, Store> {
        self.scale.into_inner()
    }
}

impl<StrainGauge, Store> WeighingSystem for &ScaleHandle<StrainGauge, Store>
where
    StrainGauge: StrainGaugeInterface,
    Store: CalibrationAccessor,
{
    type Error = ScaleError;

    async fn measure(&mut self, samples: usize) -> WeightReading {
        self.scale.lock().await.measure(samples).await
    }

    async fn tare(&mut self, samples: usize) -> Result<(), Self::Error> {
        self.scale.lock().await.tare(samples).await.map(|_| ())
    }

    async fn calibrate(
        &mut self,
        known_weight_kg: f64,
        samples: usize,
    ) -> Result<CalibrationReport, Self::Error> {
        self.scale
            .lock()
            .await
            .calibrate(known_weight_kg, samples)
            .await
    }

    async fn status(&mut self) -> ScaleStatus {
        self.scale.lock().await.status()
    }

    async fn cleanup(&mut self) -> Result<(), Self::Error> {
        self.scale.lock().await.cleanup().await
    }
}
