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


use crate::application::messaging::ApiRequest;
use crate::application::weighing_manager::MonitorState;
use crate::weight::{ScaleState, WeighingSystem, DEFAULT_CALIBRATION_SAMPLES, DEFAULT_TARE_SAMPLES};
use chrono::{DateTime, SecondsFormat, Utc};
use core::fmt::Display;
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusResponse>,
}

impl ApiResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            status: None,
        }
    }

    fn failed(error: impl Display) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
            status: None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":\"{}\"}}", e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    pub weight: f64,
    pub is_measuring: bool,
    pub sensor_fault: bool,
    pub state: ScaleState,
    pub calibration_factor: f64,
    pub tare_offset: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibrated_at: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Default, Deserialize)]
struct CalibrationBody {
    #[serde(default)]
    weight: f64,
}

fn round_to_grams(kg: f64) -> f64 {
    (kg * 1000.0).round() / 1000.0
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Turns operator requests into scale operations and JSON-shaped replies.
pub struct ScaleApi<'a, WS> {
    weight_scale: WS,
    monitor: &'a MonitorState,
    tare_samples: usize,
    calibration_samples: usize,
}

impl<'a, WS> ScaleApi<'a, WS>
where
    WS: WeighingSystem,
    WS::Error: Display,
{
    pub fn new(weight_scale: WS, monitor: &'a MonitorState) -> Self {
        Self {
            weight_scale,
            monitor,
            tare_samples: DEFAULT_TARE_SAMPLES,
            calibration_samples: DEFAULT_CALIBRATION_SAMPLES,
        }
    }

    pub fn with_samples(mut self, tare_samples: usize, calibration_samples: usize) -> Self {
        self.tare_samples = tare_samples;
        self.calibration_samples = calibration_samples;
        self
    }

    pub async fn handle(&mut self, request: ApiRequest) -> ApiResponse {
        match request {
            ApiRequest::Tare => self.tare().await,
            ApiRequest::Calibrate { weight } => self.calibrate(weight).await,
            ApiRequest::Status => {
                let status = self.status().await;
                ApiResponse {
                    success: true,
                    message: None,
                    error: None,
                    status: Some(status),
                }
            }
        }
    }

    pub async fn tare(&mut self) -> ApiResponse {
        match self.weight_scale.tare(self.tare_samples).await {
            Ok(()) => ApiResponse::ok("Scale tared successfully"),
            Err(e) => {
                warn!("Tare request failed: {}", e);
                ApiResponse::failed(e)
            }
        }
    }

    pub async fn calibrate(&mut self, weight: f64) -> ApiResponse {
        if !weight.is_finite() || weight <= 0.0 {
            return ApiResponse::failed("Invalid weight value");
        }

        match self
            .weight_scale
            .calibrate(weight, self.calibration_samples)
            .await
        {
            Ok(report) => {
                info!(
                    "Calibration request done, factor {} ({:.1}% error)",
                    report.scale_factor, report.error_percent
                );
                ApiResponse::ok(format!("Calibrated with {:?}kg", weight))
            }
            Err(e) => {
                warn!("Calibration request failed: {}", e);
                ApiResponse::failed(e)
            }
        }
    }

    /// Accepts a `{"weight": <kg>}` body. A missing weight counts as zero.
    pub async fn calibrate_json(&mut self, body: &str) -> ApiResponse {
        match serde_json::from_str::<CalibrationBody>(body) {
            Ok(body) => self.calibrate(body.weight).await,
            Err(e) => ApiResponse::failed(e),
        }
    }

    /// Served from the last periodic measurement, the strain gauge is not touched.
    pub async fn status(&mut self) -> StatusResponse {
        let snapshot = self.monitor.snapshot();
        let scale = self.weight_scale.status().await;
        StatusResponse {
            weight: round_to_grams(snapshot.weight_kg),
            is_measuring: snapshot.is_measuring,
            sensor_fault: snapshot.sensor_fault,
            state: scale.state,
            calibration_factor: scale.calibration_factor,
            tare_offset: scale.tare_offset,
            calibrated_at: scale.saved_at.map(rfc3339),
            timestamp: rfc3339(Utc::now()),
        }
    }
}
