//! Application service: the hexagonal core.
//!
//! [`SampleLoop`] owns the gas channels and the particulate values carried
//! between cycles.  All I/O flows through port traits injected at call
//! sites, so the whole loop runs on the host against mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ RecordSink
//!                 │       SampleLoop        │
//!   TimePort ◀──  │ gas · PM · climate · RTC│
//!                 └────────────────────────┘
//! ```

use log::{debug, error, info, warn};

use crate::config::{LoggerConfig, StorageFailurePolicy};
use crate::error::{Error, Result};
use crate::sensors::calibration::{self, CalibrationPlan, ChannelCalibration};
use crate::sensors::gas::GasChannel;

use super::ports::{AnalogPort, RecordSink, SensorPort, StorageError, StoragePort, TimePort};
use super::sample::{ParticulateReading, SensorSample};

/// Where the loop is within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    ReadingParticulate,
    ReadingGases,
    ReadingClimate,
    ReadingClock,
    Emitting,
}

// ───────────────────────────────────────────────────────────────
// SampleLoop
// ───────────────────────────────────────────────────────────────

pub struct SampleLoop {
    channels: [GasChannel; 3],
    particulate_timeout_ms: u32,
    interval_ms: u32,
    /// Carried forward when a particulate read times out or is corrupt.
    last_particulates: ParticulateReading,
    phase: LoopPhase,
    cycles: u64,
}

impl SampleLoop {
    /// Build the loop from configuration.  Channels start uncalibrated.
    pub fn new(config: &LoggerConfig) -> Self {
        let channels = config
            .gas_channels
            .clone()
            .map(|ch| GasChannel::new(ch, &config.adc));
        Self {
            channels,
            particulate_timeout_ms: config.particulate_timeout_ms,
            interval_ms: config.loop_interval_ms,
            last_particulates: ParticulateReading::default(),
            phase: LoopPhase::Idle,
            cycles: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// (Re)compute every channel's R0 from clean-air samples.
    pub fn calibrate(
        &mut self,
        adc: &mut impl AnalogPort,
        time: &mut impl TimePort,
        plan: &CalibrationPlan,
    ) -> Vec<ChannelCalibration> {
        calibration::calibrate(&mut self.channels, adc, time, plan)
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Read every sensor once, hand the sample to `sink` and return it.
    ///
    /// Never fails: a silent particulate sensor keeps the previous PM
    /// values, and climate / clock / gas faults become missing fields.
    pub fn run_cycle(
        &mut self,
        hw: &mut impl SensorPort,
        sink: &mut impl RecordSink,
    ) -> SensorSample {
        self.cycles += 1;

        // 1. Particulates
        self.phase = LoopPhase::ReadingParticulate;
        match hw.read_particulates(self.particulate_timeout_ms) {
            Some(p) => self.last_particulates = p,
            None => debug!("cycle {}: keeping previous PM values", self.cycles),
        }

        // 2. Gases
        self.phase = LoopPhase::ReadingGases;
        let mut gases = [None; 3];
        for (out, ch) in gases.iter_mut().zip(self.channels.iter_mut()) {
            ch.update(hw);
            *out = ch.concentration();
        }

        // 3. Temperature / humidity
        self.phase = LoopPhase::ReadingClimate;
        let (temperature_c, humidity_pct) = match hw.read_climate() {
            Ok(c) => (Some(c.temperature_c), Some(c.humidity_pct)),
            Err(e) => {
                warn!("DHT22: {}", e);
                (None, None)
            }
        };

        // 4. Wall clock
        self.phase = LoopPhase::ReadingClock;
        let timestamp = match hw.now() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("RTC: {}", e);
                None
            }
        };

        // 5. Emit
        self.phase = LoopPhase::Emitting;
        let sample = SensorSample {
            particulates: self.last_particulates,
            gases,
            temperature_c,
            humidity_pct,
            timestamp,
        };
        sink.emit(&sample);

        self.phase = LoopPhase::Idle;
        sample
    }

    /// Sample forever, sleeping the configured interval after each cycle.
    pub fn run(
        &mut self,
        hw: &mut impl SensorPort,
        time: &mut impl TimePort,
        sink: &mut impl RecordSink,
    ) -> ! {
        info!("Sampling every {} ms", self.interval_ms);
        loop {
            self.run_cycle(hw, sink);
            time.delay_ms(self.interval_ms);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Completed cycles since startup.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn channels(&self) -> &[GasChannel; 3] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [GasChannel; 3] {
        &mut self.channels
    }

    pub fn last_particulates(&self) -> ParticulateReading {
        self.last_particulates
    }
}

// ───────────────────────────────────────────────────────────────
// Startup sequence
// ───────────────────────────────────────────────────────────────

/// How the logger came up.
pub enum Startup {
    /// Storage mounted; records go to the console and the card.
    Logging(SampleLoop),
    /// Storage failed under [`StorageFailurePolicy::ConsoleOnly`].
    ConsoleOnly(SampleLoop),
    /// Storage failed under [`StorageFailurePolicy::Halt`]; calibration
    /// never ran and no cycle may follow.
    Halted(StorageError),
}

/// Warm up, bring every peripheral up and calibrate.
///
/// Sensor bring-up problems are logged and tolerated; the affected fields
/// simply read as missing later.  A storage failure is resolved through
/// `config.storage.on_init_failure`, and under `Halt` this returns before
/// any calibration read.  A bad config is the only error.
pub fn bootstrap(
    config: &LoggerConfig,
    hw: &mut impl SensorPort,
    storage: &mut impl StoragePort,
    time: &mut impl TimePort,
) -> Result<Startup> {
    config.validate().map_err(Error::Config)?;
    let plan = CalibrationPlan::from_config(config)?;

    info!("START | Warm-up ({} ms)", config.warmup_ms);
    time.delay_ms(config.warmup_ms);

    if let Err(e) = hw.prepare() {
        warn!("PMS5003: prepare failed: {}", e);
    }

    if let Err(e) = hw.init() {
        warn!("RTC: init failed: {}", e);
    }
    if let Some(clock) = &config.boot_clock {
        match hw.set_time(clock) {
            Ok(()) => info!("RTC set to {}", clock),
            Err(e) => warn!("RTC: set failed: {}", e),
        }
    }

    let storage_ok = match storage.init() {
        Ok(()) => {
            info!("Storage ready");
            true
        }
        Err(e) => match config.storage.on_init_failure {
            StorageFailurePolicy::Halt => {
                error!("Storage failed ({}), halting", e);
                return Ok(Startup::Halted(e));
            }
            StorageFailurePolicy::ConsoleOnly => {
                warn!("Storage failed ({}), logging to console only", e);
                false
            }
        },
    };

    let mut sample_loop = SampleLoop::new(config);
    sample_loop.calibrate(hw, time, &plan);
    Ok(if storage_ok {
        Startup::Logging(sample_loop)
    } else {
        Startup::ConsoleOnly(sample_loop)
    })
}

/// Idle forever; a stalled logger is the visible symptom.
pub fn halt(time: &mut impl TimePort) -> ! {
    loop {
        time.delay_ms(1_000);
    }
}
