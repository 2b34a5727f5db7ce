//! Clean-air baseline (R0) calibration for the gas channels.
//!
//! All channels are sampled in lockstep: every iteration updates each
//! channel once and then sleeps once, so the routine takes
//! `samples × interval` regardless of the channel count.  Each channel's R0
//! is the mean of its per-sample `Rs / clean_air_ratio`.

use core::num::NonZeroU32;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{AnalogPort, TimePort};
use crate::config::LoggerConfig;
use crate::error::{Error, Result};

use super::gas::GasChannel;

/// What to do with a sample whose ADC read failed or saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPolicy {
    /// Average it in anyway.
    IncludeAll,
    /// Re-read up to `max_attempts` times, then drop it from that channel's
    /// average.
    RejectInvalid { max_attempts: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationPlan {
    samples: NonZeroU32,
    interval_ms: u32,
    policy: CalibrationPolicy,
}

impl CalibrationPlan {
    pub fn new(samples: u32, interval_ms: u32, policy: CalibrationPolicy) -> Result<Self> {
        let samples =
            NonZeroU32::new(samples).ok_or(Error::Config("calibration needs at least one sample"))?;
        Ok(Self {
            samples,
            interval_ms,
            policy,
        })
    }

    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        Self::new(
            config.calibration_samples,
            config.calibration_interval_ms,
            config.calibration_policy,
        )
    }

    pub fn samples(&self) -> u32 {
        self.samples.get()
    }
}

/// Outcome for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibration {
    /// R0 committed to the channel; `None` if every sample was rejected.
    pub r0: Option<f32>,
    pub accepted: u32,
    pub rejected: u32,
}

/// Drive every channel through the plan and commit the averaged R0s.
///
/// Never fails: faulty samples are handled per the plan's policy and a
/// channel that ends up with R0 = 0 simply keeps reporting missing
/// concentrations.  Re-running overwrites the previous R0.
pub fn calibrate(
    channels: &mut [GasChannel],
    adc: &mut impl AnalogPort,
    time: &mut impl TimePort,
    plan: &CalibrationPlan,
) -> Vec<ChannelCalibration> {
    let n = plan.samples.get();
    info!(
        "START | Calibration ({} samples × {} ms)",
        n, plan.interval_ms
    );

    let mut sums = vec![0.0f32; channels.len()];
    let mut report = vec![
        ChannelCalibration {
            r0: None,
            accepted: 0,
            rejected: 0,
        };
        channels.len()
    ];

    for _ in 0..n {
        for (idx, ch) in channels.iter_mut().enumerate() {
            ch.update(adc);

            if let CalibrationPolicy::RejectInvalid { max_attempts } = plan.policy {
                let mut attempts = 0;
                while !ch.sample_is_valid() && attempts < max_attempts {
                    ch.update(adc);
                    attempts += 1;
                }
                if !ch.sample_is_valid() {
                    report[idx].rejected += 1;
                    continue;
                }
            }

            sums[idx] += ch.calibrate_sample(ch.config().clean_air_ratio);
            report[idx].accepted += 1;
        }
        time.delay_ms(plan.interval_ms);
    }

    for ((ch, sum), entry) in channels.iter_mut().zip(&sums).zip(report.iter_mut()) {
        if entry.accepted == 0 {
            warn!("{}: every calibration sample rejected, R0 unchanged", ch.label());
            continue;
        }
        let r0 = sum / entry.accepted as f32;
        ch.set_r0(r0);
        entry.r0 = Some(r0);
        if r0 > 0.0 {
            info!("{}: R0 = {:.4} kΩ ({} rejected)", ch.label(), r0, entry.rejected);
        } else {
            warn!("{}: R0 = 0, check wiring; readings will be missing", ch.label());
        }
    }

    info!("END | Calibration");
    report
}
