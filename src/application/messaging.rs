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


use core::str::FromStr;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use thiserror::Error;

/// Operator requests arriving from outside the acquisition loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApiRequest {
    Tare,
    Calibrate { weight: f64 },
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRequestError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("calibrate needs the reference weight in kg")]
    MissingWeight,
    #[error("'{0}' is not a weight")]
    InvalidWeight(String),
}

impl FromStr for ApiRequest {
    type Err = ParseRequestError;

    /// Console syntax: `tare`, `calibrate <kg>` or `status`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or(ParseRequestError::Empty)?;
        match command.to_lowercase().as_str() {
            "tare" => Ok(ApiRequest::Tare),
            "status" => Ok(ApiRequest::Status),
            "calibrate" => {
                let weight = words.next().ok_or(ParseRequestError::MissingWeight)?;
                let weight = weight
                    .parse::<f64>()
                    .map_err(|_| ParseRequestError::InvalidWeight(weight.to_string()))?;
                Ok(ApiRequest::Calibrate { weight })
            }
            _ => Err(ParseRequestError::UnknownCommand(command.to_string())),
        }
    }
}

const REQUEST_CHANNEL_DEPTH: usize = 4;

pub type RequestChannel = Channel<CriticalSectionRawMutex, ApiRequest, REQUEST_CHANNEL_DEPTH>;
pub type RequestChannelReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, ApiRequest, REQUEST_CHANNEL_DEPTH>;
pub type RequestChannelSender<'a> = Sender<'a, CriticalSectionRawMutex, ApiRequest, REQUEST_CHANNEL_DEPTH>;
