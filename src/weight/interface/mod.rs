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


pub mod hx711;
#[cfg(test)]
pub(crate) mod simulated;

use crate::weight::error::TransportError;
use embassy_time::Duration;

#[allow(async_fn_in_trait)]
pub trait StrainGaugeInterface {
    /// Initialise the gauge and make it ready for taking readings. Will put it into an initialised,
    /// powered up state.
    async fn initialize(&mut self) -> Result<(), TransportError>;

    /// Block until the device signals a finished conversion, or fail once `timeout` has elapsed.
    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), TransportError>;

    /// Gets next reading from the strain gauge. If the gauge is powered down then
    /// this function is expected to power up the device and get the reading.
    async fn get_next_reading(&mut self) -> Result<i32, TransportError>;

    /// Power down the strain gauge
    async fn power_down(&mut self) -> Result<(), TransportError>;

    /// Power up the strain gauge
    async fn power_up(&mut self) -> Result<(), TransportError>;

    /// Power cycle to recover from a desynchronised frame.
    async fn reset(&mut self) -> Result<(), TransportError> {
        self.power_down().await?;
        self.power_up().await
    }
}
