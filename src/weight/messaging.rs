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


use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum WeightEvents {
    WeightUpdate(f64),
    SensorFault,
    /// Load rose above the detection threshold, the point at which food gets identified.
    LoadDetected(f64),
    LoadRemoved,
    Shutdown,
}

const CHANNEL_DEPTH: usize = 10;
const CHANNEL_SUBS: usize = 2;
const CHANNEL_PUBS: usize = 1;

pub type WeightChannel = PubSubChannel<CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelSubscriber<'a> = Subscriber<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelPublisher<'a> = Publisher<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
