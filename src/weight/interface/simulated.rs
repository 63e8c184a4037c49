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


//! Software model of an HX711 behind embedded-hal pins, plus a gauge wrapper that watches for
//! overlapping frame exchanges.

use crate::weight::error::TransportError;
use crate::weight::frame::{RawFrame, VALID_DATA_BITS};
use crate::weight::interface::StrainGaugeInterface;
use core::convert::Infallible;
use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct DeviceModel {
    conversions: VecDeque<i32>,
    steady: Option<i32>,
    frame_pulses: usize,
    shifting: Option<u32>,
    pulses: usize,
    clock_high: bool,
    frames_completed: usize,
    pulses_in_last_frame: usize,
    protocol_violations: usize,
}

impl DeviceModel {
    fn conversion_ready(&self) -> bool {
        !self.conversions.is_empty() || self.steady.is_some()
    }

    fn rising_edge(&mut self) {
        if self.clock_high {
            return;
        }
        self.clock_high = true;
        match self.shifting {
            Some(_) => {
                self.pulses += 1;
                if self.pulses > self.frame_pulses {
                    self.protocol_violations += 1;
                }
            }
            None if self.conversion_ready() => {
                let value = self
                    .conversions
                    .pop_front()
                    .or(self.steady)
                    .unwrap_or_default();
                self.shifting = Some(RawFrame::encode(value).bits());
                self.pulses = 1;
            }
            // idle and not ready, clock held high means power down
            None => {}
        }
    }

    fn falling_edge(&mut self) {
        if !self.clock_high {
            return;
        }
        self.clock_high = false;
        if self.shifting.is_some() && self.pulses >= self.frame_pulses {
            self.shifting = None;
            self.frames_completed += 1;
            self.pulses_in_last_frame = self.pulses;
            self.pulses = 0;
        }
    }

    fn data_high(&self) -> bool {
        match self.shifting {
            Some(bits) if (1..=VALID_DATA_BITS).contains(&self.pulses) => {
                (bits >> (VALID_DATA_BITS - self.pulses)) & 0x1 == 0x1
            }
            Some(_) => true,
            None => !self.conversion_ready(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct SimulatedHx711 {
    model: Arc<Mutex<DeviceModel>>,
}

impl SimulatedHx711 {
    pub fn new() -> Self {
        Self::with_frame_pulses(25)
    }

    pub fn with_frame_pulses(frame_pulses: usize) -> Self {
        Self {
            model: Arc::new(Mutex::new(DeviceModel {
                conversions: VecDeque::new(),
                steady: None,
                frame_pulses,
                shifting: None,
                pulses: 0,
                clock_high: false,
                frames_completed: 0,
                pulses_in_last_frame: 0,
                protocol_violations: 0,
            })),
        }
    }

    /// Device that always has `value` ready once the queue is drained.
    pub fn steady(value: i32) -> Self {
        let sim = Self::new();
        sim.set_steady(Some(value));
        sim
    }

    pub fn pins(&self) -> (SimClock, SimData) {
        (
            SimClock {
                model: self.model.clone(),
            },
            SimData {
                model: self.model.clone(),
            },
        )
    }

    pub fn queue(&self, values: &[i32]) {
        self.model.lock().unwrap().conversions.extend(values);
    }

    pub fn set_steady(&self, value: Option<i32>) {
        self.model.lock().unwrap().steady = value;
    }

    pub fn frames_completed(&self) -> usize {
        self.model.lock().unwrap().frames_completed
    }

    pub fn pulses_in_last_frame(&self) -> usize {
        self.model.lock().unwrap().pulses_in_last_frame
    }

    pub fn protocol_violations(&self) -> usize {
        self.model.lock().unwrap().protocol_violations
    }

    pub fn clock_is_high(&self) -> bool {
        self.model.lock().unwrap().clock_high
    }
}

pub(crate) struct SimClock {
    model: Arc<Mutex<DeviceModel>>,
}

impl ErrorType for SimClock {
    type Error = Infallible;
}

impl OutputPin for SimClock {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.model.lock().unwrap().falling_edge();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.model.lock().unwrap().rising_edge();
        Ok(())
    }
}

pub(crate) struct SimData {
    model: Arc<Mutex<DeviceModel>>,
}

impl ErrorType for SimData {
    type Error = Infallible;
}

impl InputPin for SimData {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.model.lock().unwrap().data_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.model.lock().unwrap().data_high())
    }
}

/// Counts exchanges that start while another one is still in flight.
#[derive(Clone, Default)]
pub(crate) struct ExchangeMonitor {
    active: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
    exchanges: Arc<AtomicUsize>,
}

impl ExchangeMonitor {
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

pub(crate) struct InstrumentedGauge<G> {
    inner: G,
    monitor: ExchangeMonitor,
}

impl<G> InstrumentedGauge<G> {
    pub fn new(inner: G, monitor: ExchangeMonitor) -> Self {
        Self { inner, monitor }
    }
}

impl<G: StrainGaugeInterface> StrainGaugeInterface for InstrumentedGauge<G> {
    async fn initialize(&mut self) -> Result<(), TransportError> {
        self.inner.initialize().await
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.inner.wait_ready(timeout).await
    }

    async fn get_next_reading(&mut self) -> Result<i32, TransportError> {
        if self.monitor.active.fetch_add(1, Ordering::SeqCst) != 0 {
            self.monitor.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        // yield so that a competing caller gets the chance to start an exchange
        embassy_futures::yield_now().await;
        let reading = self.inner.get_next_reading().await;
        self.monitor.active.fetch_sub(1, Ordering::SeqCst);
        self.monitor.exchanges.fetch_add(1, Ordering::SeqCst);
        reading
    }

    async fn power_down(&mut self) -> Result<(), TransportError> {
        self.inner.power_down().await
    }

    async fn power_up(&mut self) -> Result<(), TransportError> {
        self.inner.power_up().await
    }
}
