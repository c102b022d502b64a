// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Signal strength to distance estimation.
//!
//! Log-distance path loss: `d = 10 ^ ((tx_power - rssi) / (10 * n))`, where
//! `tx_power` is the RSSI measured at one metre and `n` the path-loss
//! exponent (2.0 in free space).

use serde::{Deserialize, Serialize};

/// Calibration used to turn RSSI readings into attenuation and distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalModel {
    /// RSSI at one metre (dBm).
    pub tx_power: i16,
    /// Path-loss exponent.
    pub path_loss_exponent: f64,
}

impl Default for SignalModel {
    fn default() -> Self {
        SignalModel {
            tx_power: -59,
            path_loss_exponent: 2.0,
        }
    }
}

impl SignalModel {
    /// Signal loss in dB relative to the one-metre reference, clamped to 0..=255.
    pub fn attenuation(&self, rssi: i16) -> u8 {
        (self.tx_power as i32 - rssi as i32).clamp(0, u8::MAX as i32) as u8
    }

    /// Estimated distance in metres.
    pub fn distance(&self, rssi: i16) -> f64 {
        let exponent = (self.tx_power as f64 - rssi as f64) / (10.0 * self.path_loss_exponent);
        10f64.powf(exponent)
    }
}
