//! System configuration parameters
//!
//! All tunable parameters for the AirLogger.  Defaults reproduce the bench
//! setup the gas curves were characterised on; any field can be overridden
//! by a `config.json` on the SD card (see [`crate::adapters::sd_card`]).

use serde::{Deserialize, Serialize};

use crate::app::sample::ClockState;
use crate::pins;
use crate::sensors::calibration::CalibrationPolicy;
use crate::sensors::gas::{GasChannelConfig, curves};

/// ADC front-end shared by the three gas channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdcConfig {
    /// Sensor supply / full-scale voltage Vc.  The board's divider maps the
    /// ADC full-scale input to this voltage at the sensor.
    pub supply_voltage: f32,
    /// ADC resolution in bits.
    pub resolution_bits: u8,
    /// Conversions averaged per channel update.
    pub samples_per_update: u8,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            supply_voltage: 5.0,
            resolution_bits: 12,
            samples_per_update: 5,
        }
    }
}

/// On-card log representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// One comma-delimited line per sample.
    Csv,
    /// The labelled console block, verbatim.
    Block,
}

/// What `main` does when the card cannot be brought up at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageFailurePolicy {
    /// Stop and idle forever; a stalled device is the visible symptom.
    Halt,
    /// Keep sampling and print to the console only.
    ConsoleOnly,
}

fn short_string(s: &str) -> heapless::String<16> {
    let mut out = heapless::String::new();
    let _ = out.push_str(s);
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// VFS path the FAT volume is mounted at.
    pub mount_point: heapless::String<16>,
    /// Log file name relative to the mount point.
    pub data_file: heapless::String<16>,
    pub format: LogFormat,
    /// Prefix each CSV line with the RTC timestamp.
    pub csv_timestamp: bool,
    pub on_init_failure: StorageFailurePolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mount_point: short_string("/sdcard"),
            data_file: short_string("data.txt"),
            format: LogFormat::Csv,
            csv_timestamp: false,
            on_init_failure: StorageFailurePolicy::Halt,
        }
    }
}

/// Core logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    // --- Timing ---
    /// Heater pre-heat delay before anything is read (milliseconds)
    pub warmup_ms: u32,
    /// Delay at the end of every sample cycle (milliseconds)
    pub loop_interval_ms: u32,
    /// Maximum wait for a particulate frame (milliseconds)
    pub particulate_timeout_ms: u32,

    // --- Calibration ---
    /// Clean-air samples averaged into R0
    pub calibration_samples: u32,
    /// Delay between calibration samples (milliseconds)
    pub calibration_interval_ms: u32,
    pub calibration_policy: CalibrationPolicy,

    // --- Gas sensors ---
    pub adc: AdcConfig,
    /// MQ-2, MQ-135, MQ-8 in log-column order.
    pub gas_channels: [GasChannelConfig; 3],

    // --- RTC ---
    /// Written to the RTC once at boot; `None` keeps the RTC's own time.
    pub boot_clock: Option<ClockState>,

    // --- Storage ---
    pub storage: StorageConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            // Timing
            warmup_ms: 12_000,
            loop_interval_ms: 2_000,
            particulate_timeout_ms: 1_000,

            // Calibration
            calibration_samples: 300,
            calibration_interval_ms: 1_000,
            calibration_policy: CalibrationPolicy::IncludeAll,

            // Gas sensors
            adc: AdcConfig::default(),
            gas_channels: [
                GasChannelConfig::new("LPG", pins::MQ2_ADC_GPIO, 4.58, 9.83, curves::MQ2_LPG),
                GasChannelConfig::new("CO2", pins::MQ135_ADC_GPIO, 21.10, 3.6, curves::MQ135_CO2),
                GasChannelConfig::new("H2", pins::MQ8_ADC_GPIO, 9.75, 70.0, curves::MQ8_H2),
            ],

            // RTC
            boot_clock: Some(ClockState::new(2019, 12, 25, 12, 30, 0)),

            // Storage
            storage: StorageConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Range-check every field.  Out-of-range values are rejected, never
    /// clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.warmup_ms > 600_000 {
            return Err("warmup_ms must be 0–600000");
        }
        if !(500..=60_000).contains(&self.loop_interval_ms) {
            return Err("loop_interval_ms must be 500–60000");
        }
        if !(100..=10_000).contains(&self.particulate_timeout_ms) {
            return Err("particulate_timeout_ms must be 100–10000");
        }
        if !(1..=10_000).contains(&self.calibration_samples) {
            return Err("calibration_samples must be 1–10000");
        }
        if self.calibration_interval_ms > 60_000 {
            return Err("calibration_interval_ms must be 0–60000");
        }
        if !(self.adc.supply_voltage > 0.0 && self.adc.supply_voltage <= 12.0) {
            return Err("adc.supply_voltage must be in (0, 12]");
        }
        if !(8..=16).contains(&self.adc.resolution_bits) {
            return Err("adc.resolution_bits must be 8–16");
        }
        if !(1..=64).contains(&self.adc.samples_per_update) {
            return Err("adc.samples_per_update must be 1–64");
        }
        for ch in &self.gas_channels {
            if !(ch.load_resistance_kohm > 0.0 && ch.load_resistance_kohm.is_finite()) {
                return Err("gas load_resistance_kohm must be positive");
            }
            if !(ch.clean_air_ratio > 0.0 && ch.clean_air_ratio.is_finite()) {
                return Err("gas clean_air_ratio must be positive");
            }
            if !(ch.curve.a > 0.0 && ch.curve.a.is_finite() && ch.curve.b.is_finite()) {
                return Err("gas curve needs finite a > 0 and finite b");
            }
        }
        if let Some(clock) = &self.boot_clock {
            clock.validate()?;
        }
        if self.storage.data_file.is_empty() {
            return Err("storage.data_file must not be empty");
        }
        Ok(())
    }

    /// Console labels of the gas channels, in column order.
    pub fn gas_labels(&self) -> [&str; 3] {
        [
            self.gas_channels[0].label.as_str(),
            self.gas_channels[1].label.as_str(),
            self.gas_channels[2].label.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = LoggerConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.calibration_samples >= 1);
        assert!(c.particulate_timeout_ms < c.loop_interval_ms);
        assert_eq!(c.gas_labels(), ["LPG", "CO2", "H2"]);
    }

    #[test]
    fn serde_roundtrip() {
        let c = LoggerConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: LoggerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let c: LoggerConfig =
            serde_json::from_str(r#"{ "calibration_samples": 10, "boot_clock": null }"#).unwrap();
        assert_eq!(c.calibration_samples, 10);
        assert_eq!(c.boot_clock, None);
        assert_eq!(c.loop_interval_ms, LoggerConfig::default().loop_interval_ms);
    }

    #[test]
    fn coefficients_are_runtime_configurable() {
        let json = r#"{ "gas_channels": [
            { "label": "CO",  "pin": 4, "load_resistance_kohm": 4.58, "clean_air_ratio": 9.83,
              "curve": { "a": 36974.0, "b": -3.109 } },
            { "label": "NH4", "pin": 5, "load_resistance_kohm": 21.1, "clean_air_ratio": 3.6,
              "curve": { "a": 102.2, "b": -2.473 } },
            { "label": "CH4", "pin": 6, "load_resistance_kohm": 9.75, "clean_air_ratio": 70.0,
              "curve": { "a": 8.0e13, "b": -6.666 } } ] }"#;
        let c: LoggerConfig = serde_json::from_str(json).unwrap();
        assert!(c.validate().is_ok());
        assert_eq!(c.gas_channels[1].curve, curves::MQ135_NH4);
        assert_eq!(c.gas_labels(), ["CO", "NH4", "CH4"]);
    }

    #[test]
    fn zero_calibration_samples_rejected() {
        let c = LoggerConfig {
            calibration_samples: 0,
            ..LoggerConfig::default()
        };
        assert_eq!(c.validate(), Err("calibration_samples must be 1–10000"));
    }

    #[test]
    fn invalid_boot_clock_rejected() {
        let c = LoggerConfig {
            boot_clock: Some(ClockState::new(2019, 2, 30, 0, 0, 0)),
            ..LoggerConfig::default()
        };
        assert!(c.validate().is_err());
    }
}
