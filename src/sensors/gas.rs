//! MQ-series metal-oxide gas sensor channel.
//!
//! The sensor's heated element forms the top half of a divider with a fixed
//! load resistor RL; the ADC reads the voltage across RL.  From that voltage
//! we recover the sensing resistance
//!
//! ```text
//! Rs = Vc · RL / Vout − RL
//! ```
//!
//! and normalise it by the clean-air baseline R0.  Concentration follows the
//! bench-fitted power law `ppm = a · (Rs/R0)^b`.
//!
//! R0 is unset until [`calibration`](super::calibration) commits it; until
//! then every concentration is reported as missing.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::AnalogPort;
use crate::config::AdcConfig;

/// Exponential regression coefficients for one target gas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasCurve {
    pub a: f32,
    pub b: f32,
}

impl GasCurve {
    pub const fn new(a: f32, b: f32) -> Self {
        Self { a, b }
    }

    /// `a · ratio^b`, or `None` when the ratio is not a positive finite number
    /// or the result is not a finite non-negative concentration.
    pub fn concentration(&self, ratio: f32) -> Option<f32> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return None;
        }
        let ppm = self.a * ratio.powf(self.b);
        (ppm.is_finite() && ppm >= 0.0).then_some(ppm)
    }

    /// Look up a bench-characterised curve by sensor model and gas name
    /// (case-insensitive), e.g. `("MQ-135", "co2")`.
    pub fn preset(sensor: &str, gas: &str) -> Option<Self> {
        curves::ALL
            .iter()
            .find(|(s, g, _)| s.eq_ignore_ascii_case(sensor) && g.eq_ignore_ascii_case(gas))
            .map(|(_, _, c)| *c)
    }
}

/// Bench-characterised curves from the sensor datasheets.
pub mod curves {
    use super::GasCurve;

    pub const MQ2_H2: GasCurve = GasCurve::new(987.99, -2.162);
    pub const MQ2_LPG: GasCurve = GasCurve::new(574.25, -2.222);
    pub const MQ2_CO: GasCurve = GasCurve::new(36974.0, -3.109);
    pub const MQ2_ALCOHOL: GasCurve = GasCurve::new(3616.1, -2.675);
    pub const MQ2_PROPANE: GasCurve = GasCurve::new(658.71, -2.168);

    pub const MQ135_CO: GasCurve = GasCurve::new(605.18, -3.937);
    pub const MQ135_ALCOHOL: GasCurve = GasCurve::new(77.255, -3.18);
    pub const MQ135_CO2: GasCurve = GasCurve::new(110.47, -2.862);
    pub const MQ135_TOLUENE: GasCurve = GasCurve::new(44.947, -3.445);
    pub const MQ135_NH4: GasCurve = GasCurve::new(102.2, -2.473);
    pub const MQ135_ACETONE: GasCurve = GasCurve::new(34.668, -3.369);

    pub const MQ8_H2: GasCurve = GasCurve::new(976.97, -0.688);
    pub const MQ8_LPG: GasCurve = GasCurve::new(10_000_000.0, -3.123);
    pub const MQ8_CH4: GasCurve = GasCurve::new(80_000_000_000_000.0, -6.666);
    pub const MQ8_CO: GasCurve = GasCurve::new(2_000_000_000_000_000_000.0, -8.074);
    pub const MQ8_ALCOHOL: GasCurve = GasCurve::new(76101.0, -1.86);

    pub(super) const ALL: &[(&str, &str, GasCurve)] = &[
        ("MQ-2", "H2", MQ2_H2),
        ("MQ-2", "LPG", MQ2_LPG),
        ("MQ-2", "CO", MQ2_CO),
        ("MQ-2", "Alcohol", MQ2_ALCOHOL),
        ("MQ-2", "Propane", MQ2_PROPANE),
        ("MQ-135", "CO", MQ135_CO),
        ("MQ-135", "Alcohol", MQ135_ALCOHOL),
        ("MQ-135", "CO2", MQ135_CO2),
        ("MQ-135", "Toluene", MQ135_TOLUENE),
        ("MQ-135", "NH4", MQ135_NH4),
        ("MQ-135", "Acetone", MQ135_ACETONE),
        ("MQ-8", "H2", MQ8_H2),
        ("MQ-8", "LPG", MQ8_LPG),
        ("MQ-8", "CH4", MQ8_CH4),
        ("MQ-8", "CO", MQ8_CO),
        ("MQ-8", "Alcohol", MQ8_ALCOHOL),
    ];
}

/// Static wiring and characterisation of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasChannelConfig {
    /// Name of the target gas, used on the console.
    pub label: heapless::String<16>,
    /// ADC-capable GPIO the sensor output is wired to.
    pub pin: u8,
    /// Load resistance RL (kΩ).
    pub load_resistance_kohm: f32,
    /// Rs/R0 of this sensor in clean air, from the datasheet.
    pub clean_air_ratio: f32,
    pub curve: GasCurve,
}

impl GasChannelConfig {
    pub fn new(label: &str, pin: u8, load_resistance_kohm: f32, clean_air_ratio: f32, curve: GasCurve) -> Self {
        let mut l = heapless::String::new();
        for c in label.chars() {
            if l.push(c).is_err() {
                break;
            }
        }
        Self {
            label: l,
            pin,
            load_resistance_kohm,
            clean_air_ratio,
            curve,
        }
    }
}

/// Cached result of the last [`GasChannel::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct AnalogSample {
    volts: f32,
    /// Every ADC read in the update failed.
    faulty: bool,
}

/// One analog gas sensor channel.
#[derive(Debug, Clone)]
pub struct GasChannel {
    config: GasChannelConfig,
    supply_voltage: f32,
    adc_full_scale: f32,
    samples_per_update: u8,
    last: Option<AnalogSample>,
    r0: Option<f32>,
}

impl GasChannel {
    pub fn new(config: GasChannelConfig, adc: &AdcConfig) -> Self {
        Self {
            config,
            supply_voltage: adc.supply_voltage,
            adc_full_scale: ((1u32 << adc.resolution_bits) - 1) as f32,
            samples_per_update: adc.samples_per_update.max(1),
            last: None,
            r0: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn config(&self) -> &GasChannelConfig {
        &self.config
    }

    /// Swap the regression curve (retarget the channel at another gas).
    pub fn set_curve(&mut self, curve: GasCurve) {
        self.config.curve = curve;
    }

    /// Sample the pin, averaging `samples_per_update` conversions, and cache
    /// the resulting sensor voltage for the calls that follow.
    pub fn update(&mut self, adc: &mut impl AnalogPort) {
        let mut sum = 0u32;
        let mut ok = 0u32;
        for _ in 0..self.samples_per_update {
            match adc.read_raw(self.config.pin) {
                Ok(raw) => {
                    sum += raw as u32;
                    ok += 1;
                }
                Err(e) => warn!("{}: {}", self.config.label, e),
            }
        }

        self.last = Some(if ok == 0 {
            AnalogSample {
                volts: 0.0,
                faulty: true,
            }
        } else {
            let avg = sum as f32 / ok as f32;
            AnalogSample {
                volts: avg * self.supply_voltage / self.adc_full_scale,
                faulty: false,
            }
        });
    }

    /// Sensor voltage from the last update (0.0 before any update).
    pub fn volts(&self) -> f32 {
        self.last.map_or(0.0, |s| s.volts)
    }

    /// Whether the last update produced a usable reading.
    pub fn sample_is_valid(&self) -> bool {
        matches!(self.last, Some(s) if !s.faulty) && self.sensed_resistance() > 0.0
    }

    /// Sensing-element resistance Rs (kΩ), clamped at zero.
    pub fn sensed_resistance(&self) -> f32 {
        let v = self.volts();
        if v <= 0.0 || v >= self.supply_voltage {
            return 0.0;
        }
        let rl = self.config.load_resistance_kohm;
        let rs = self.supply_voltage * rl / v - rl;
        if rs.is_finite() { rs.max(0.0) } else { 0.0 }
    }

    /// Rs / R0.  0.0 when the channel is uncalibrated or has no sample.
    pub fn resistance_ratio(&self) -> f32 {
        match self.r0 {
            Some(r0) if r0 > 0.0 => self.sensed_resistance() / r0,
            _ => 0.0,
        }
    }

    /// R0 implied by the current sample if the air is clean.  Does not
    /// modify the channel.
    pub fn calibrate_sample(&self, clean_air_ratio: f32) -> f32 {
        if clean_air_ratio <= 0.0 {
            return 0.0;
        }
        self.sensed_resistance() / clean_air_ratio
    }

    /// Commit the clean-air baseline.
    pub fn set_r0(&mut self, value: f32) {
        self.r0 = Some(value);
    }

    pub fn r0(&self) -> Option<f32> {
        self.r0
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.r0, Some(r0) if r0 > 0.0)
    }

    /// Gas concentration (ppm) for the last sample, or `None` when the
    /// channel is uncalibrated or the sample is a sensor fault.
    pub fn concentration(&self) -> Option<f32> {
        if !self.is_calibrated() {
            return None;
        }
        self.config.curve.concentration(self.resistance_ratio())
    }
}
