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


use crate::weight::error::TransportError;
use crate::weight::frame::{RawFrame, VALID_DATA_BITS};
use crate::weight::interface::StrainGaugeInterface;
use embassy_time::{block_for, Duration, Instant, Timer};
use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use log::trace;
use serde::Deserialize;

/// Selects the input channel and gain of the conversion that follows the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Hx711Gain {
    #[default]
    #[serde(rename = "128")]
    Gain128,
    #[serde(rename = "64")]
    Gain64,
    #[serde(rename = "32b")]
    Gain32ChannelB,
}

impl Hx711Gain {
    pub fn tick_count(&self) -> usize {
        match self {
            Hx711Gain::Gain128 => 25,
            Hx711Gain::Gain64 => 27,
            Hx711Gain::Gain32ChannelB => 26,
        }
    }
}

const POWER_MODE_CHANGE_DELAY: Duration = Duration::from_micros(60);
const CLK_HALF_PERIOD: Duration = Duration::from_micros(1);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(1);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(1);

/// Bit-banged two wire link to an HX711. Owns both lines for as long as it lives, dropping it
/// releases them.
pub struct Hx711<CLK, DATA> {
    clock_pin: CLK,
    data_pin: DATA,
    gain_clocks: usize,
    ready_timeout: Duration,
    powered_up: bool,
}

impl<CLK, DATA> Hx711<CLK, DATA>
where
    CLK: OutputPin,
    DATA: InputPin,
{
    pub fn new(clock_pin: CLK, data_pin: DATA, gain: Hx711Gain) -> Self {
        Self {
            clock_pin,
            data_pin,
            gain_clocks: gain.tick_count(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            powered_up: false,
        }
    }

    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn is_powered_up(&self) -> bool {
        self.powered_up
    }

    fn clock_high(&mut self) -> Result<(), TransportError> {
        self.clock_pin
            .set_high()
            .map_err(|e| TransportError::ClockPin(e.kind()))
    }

    fn clock_low(&mut self) -> Result<(), TransportError> {
        self.clock_pin
            .set_low()
            .map_err(|e| TransportError::ClockPin(e.kind()))
    }

    fn data_is_high(&mut self) -> Result<bool, TransportError> {
        self.data_pin
            .is_high()
            .map_err(|e| TransportError::DataPin(e.kind()))
    }

    /// Clocks one complete frame out of the device. No await point in here: once the first pulse
    /// has gone out the frame runs to completion within the timing budget.
    fn shift_in_frame(&mut self) -> Result<RawFrame, TransportError> {
        let mut data: u32 = 0;
        for pulse in 0..self.gain_clocks {
            self.clock_high()?;
            block_for(CLK_HALF_PERIOD);
            if pulse < VALID_DATA_BITS {
                data <<= 1;
                if self.data_is_high()? {
                    data |= 0x1;
                }
            }
            self.clock_low()?;
            block_for(CLK_HALF_PERIOD);
        }
        Ok(RawFrame::from_bits(data))
    }

    pub fn read_raw_frame(&mut self) -> Result<RawFrame, TransportError> {
        let frame = self.shift_in_frame();
        if frame.is_err() {
            // a clock left high for more than 60us powers the device down
            let _ = self.clock_pin.set_low();
        }
        frame
    }
}

impl<CLK, DATA> StrainGaugeInterface for Hx711<CLK, DATA>
where
    CLK: OutputPin,
    DATA: InputPin,
{
    async fn initialize(&mut self) -> Result<(), TransportError> {
        self.power_up().await
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), TransportError> {
        let start = Instant::now();
        loop {
            // DOUT goes low when conversion is ready
            if !self.data_is_high()? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(TransportError::Timeout {
                    timeout_ms: timeout.as_millis(),
                });
            }
            Timer::after(READY_POLL_INTERVAL).await;
        }
    }

    async fn get_next_reading(&mut self) -> Result<i32, TransportError> {
        if !self.powered_up {
            self.power_up().await?;
        }

        self.wait_ready(self.ready_timeout).await?;
        let frame = self.read_raw_frame()?;
        trace!("Frame {:#08x} = {}", frame.bits(), frame.decode());
        Ok(frame.decode())
    }

    async fn power_down(&mut self) -> Result<(), TransportError> {
        self.clock_high()?;
        Timer::after(POWER_MODE_CHANGE_DELAY).await;
        self.powered_up = false;
        Ok(())
    }

    async fn power_up(&mut self) -> Result<(), TransportError> {
        self.clock_low()?;
        Timer::after(POWER_MODE_CHANGE_DELAY).await;
        self.powered_up = true;
        Ok(())
    }
}
