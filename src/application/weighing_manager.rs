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


use crate::weight::messaging::{WeightChannelPublisher, WeightEvents};
use crate::weight::{WeighingSystem, DEFAULT_WEIGHT_SAMPLES};
use core::cell::Cell;
use core::fmt::Display;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use log::{debug, info, warn};
use serde::Serialize;

pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub period: Duration,
    pub samples: usize,
    pub detection_threshold_kg: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(500),
            samples: DEFAULT_WEIGHT_SAMPLES,
            detection_threshold_kg: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub weight_kg: f64,
    pub is_measuring: bool,
    pub sensor_fault: bool,
}

/// Latest result of the periodic measurement, readable from any thread without touching the
/// hardware lock.
pub struct MonitorState {
    snapshot: BlockingMutex<CriticalSectionRawMutex, Cell<MonitorSnapshot>>,
}

impl MonitorState {
    pub const fn new() -> Self {
        Self {
            snapshot: BlockingMutex::new(Cell::new(MonitorSnapshot {
                weight_kg: 0.0,
                is_measuring: false,
                sensor_fault: false,
            })),
        }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshot.lock(|s| s.get())
    }

    fn update(&self, snapshot: MonitorSnapshot) {
        self.snapshot.lock(|s| s.set(snapshot));
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls the weighing system on a fixed cadence and publishes the results.
pub struct WeighingManager<'a, WS> {
    weight_scale: WS,
    weight_channel_publisher: WeightChannelPublisher<'a>,
    monitor: &'a MonitorState,
    settings: MonitorSettings,
}

impl<'a, WS> WeighingManager<'a, WS>
where
    WS: WeighingSystem,
    WS::Error: Display,
{
    pub fn new(
        weight_scale: WS,
        weight_channel_publisher: WeightChannelPublisher<'a>,
        monitor: &'a MonitorState,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            weight_scale,
            weight_channel_publisher,
            monitor,
            settings,
        }
    }

    /// Measures every period until `stop` is signalled, then shuts the weighing system down.
    pub async fn run(&mut self, stop: &StopSignal) {
        let mut periodic_timer = Ticker::every(self.settings.period);
        loop {
            match select(stop.wait(), periodic_timer.next()).await {
                Either::First(_) => break,
                Either::Second(_) => self.do_measurement().await,
            }
        }

        info!("Stopping weight monitoring");
        if let Err(e) = self.weight_scale.cleanup().await {
            warn!("Error during weight sensor cleanup: {}", e);
        }
        self.weight_channel_publisher
            .publish_immediate(WeightEvents::Shutdown);
    }

    async fn do_measurement(&mut self) {
        let reading = self.weight_scale.measure(self.settings.samples).await;
        let was_measuring = self.monitor.snapshot().is_measuring;
        let is_measuring = reading.kg > self.settings.detection_threshold_kg;

        self.monitor.update(MonitorSnapshot {
            weight_kg: reading.kg,
            is_measuring,
            sensor_fault: reading.sensor_fault,
        });

        if reading.sensor_fault {
            self.weight_channel_publisher
                .publish_immediate(WeightEvents::SensorFault);
        } else {
            self.weight_channel_publisher
                .publish_immediate(WeightEvents::WeightUpdate(reading.kg));
        }

        match (was_measuring, is_measuring) {
            (false, true) => {
                debug!("Load detected: {:.3} kg", reading.kg);
                self.weight_channel_publisher
                    .publish_immediate(WeightEvents::LoadDetected(reading.kg));
            }
            (true, false) => {
                debug!("Load removed");
                self.weight_channel_publisher
                    .publish_immediate(WeightEvents::LoadRemoved);
            }
            _ => {}
        }
    }
}
