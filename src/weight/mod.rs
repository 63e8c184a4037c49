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


pub mod error;
pub mod filter;
pub mod frame;
pub mod interface;
pub mod messaging;
pub mod shared;
#[allow(clippy::module_inception)]
pub mod weight;

pub use error::{ScaleError, TransportError};
pub use shared::ScaleHandle;
pub use weight::{CalibrationReport, ScaleState, ScaleStatus, ScaleTiming, WeightReading, WeightScale};

pub const DEFAULT_WEIGHT_SAMPLES: usize = 5;
pub const DEFAULT_TARE_SAMPLES: usize = 20;
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 20;

#[allow(async_fn_in_trait)]
pub trait WeighingSystem {
    type Error;

    /// Weight in kilograms together with whether acquisition failed. The weight is 0.0 on
    /// failure.
    async fn measure(&mut self, samples: usize) -> WeightReading;

    /// Never fails, a sensor fault reads as an empty scale.
    async fn get_weight(&mut self, samples: usize) -> f64 {
        self.measure(samples).await.kg
    }

    async fn tare(&mut self, samples: usize) -> Result<(), Self::Error>;

    async fn calibrate(
        &mut self,
        known_weight_kg: f64,
        samples: usize,
    ) -> Result<CalibrationReport, Self::Error>;

    async fn status(&mut self) -> ScaleStatus;

    async fn cleanup(&mut self) -> Result<(), Self::Error>;
}
