//! Mock hardware adapters for integration tests.
//!
//! Records every port call so tests can assert on the full interaction
//! history without touching real ADC/UART/I²C/SD peripherals.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};

use airlogger::app::ports::{
    AnalogPort, ClimatePort, Clock, ParticulatePort, RecordSink, RtcPort, SensorError,
    SerialError, SerialPort, StorageError, StoragePort, TimePort,
};
use airlogger::app::sample::{ClimateReading, ClockState, ParticulateReading, SensorSample};

// ── MockSensors ───────────────────────────────────────────────

/// Every sensor port in one struct, scripted per test.
pub struct MockSensors {
    /// Raw ADC value per pin; `None` makes the read fail.
    pub adc: HashMap<u8, Option<u16>>,
    pub adc_reads: u32,
    /// One entry consumed per particulate read; empty = timeout.
    pub particulates: VecDeque<Option<ParticulateReading>>,
    pub prepared: bool,
    pub climate: Result<ClimateReading, SensorError>,
    pub rtc: Option<ClockState>,
    pub rtc_initialised: bool,
    pub rtc_fail: bool,
}

#[allow(dead_code)]
impl MockSensors {
    pub fn new() -> Self {
        Self {
            adc: HashMap::new(),
            adc_reads: 0,
            particulates: VecDeque::new(),
            prepared: false,
            climate: Ok(ClimateReading {
                temperature_c: 22.5,
                humidity_pct: 41.0,
            }),
            rtc: None,
            rtc_initialised: false,
            rtc_fail: false,
        }
    }

    /// Same raw value on every pin.
    pub fn with_adc(mut self, raw: u16) -> Self {
        for pin in [4, 5, 6] {
            self.adc.insert(pin, Some(raw));
        }
        self
    }

    pub fn push_pm(&mut self, pm1_0: f32, pm2_5: f32, pm10_0: f32) {
        self.particulates.push_back(Some(ParticulateReading {
            pm1_0,
            pm2_5,
            pm10_0,
        }));
    }
}

impl Default for MockSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogPort for MockSensors {
    fn read_raw(&mut self, pin: u8) -> Result<u16, SensorError> {
        self.adc_reads += 1;
        self.adc
            .get(&pin)
            .copied()
            .flatten()
            .ok_or(SensorError::AdcReadFailed)
    }
}

impl ParticulatePort for MockSensors {
    fn prepare(&mut self) -> Result<(), SerialError> {
        self.prepared = true;
        Ok(())
    }

    fn read_particulates(&mut self, _timeout_ms: u32) -> Option<ParticulateReading> {
        self.particulates.pop_front().flatten()
    }
}

impl ClimatePort for MockSensors {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate
    }
}

impl RtcPort for MockSensors {
    fn init(&mut self) -> Result<(), SensorError> {
        if self.rtc_fail {
            return Err(SensorError::BusError);
        }
        self.rtc_initialised = true;
        Ok(())
    }

    fn set_time(&mut self, time: &ClockState) -> Result<(), SensorError> {
        if self.rtc_fail {
            return Err(SensorError::BusError);
        }
        self.rtc = Some(*time);
        Ok(())
    }

    fn now(&mut self) -> Result<ClockState, SensorError> {
        if self.rtc_fail {
            return Err(SensorError::BusError);
        }
        self.rtc.ok_or(SensorError::OutOfRange)
    }
}

// ── MockRtc ───────────────────────────────────────────────────

/// Stand-alone RTC for tests that use the real `HardwareAdapter`.
#[derive(Default)]
pub struct MockRtc {
    pub time: Option<ClockState>,
}

impl RtcPort for MockRtc {
    fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn set_time(&mut self, time: &ClockState) -> Result<(), SensorError> {
        self.time = Some(*time);
        Ok(())
    }

    fn now(&mut self) -> Result<ClockState, SensorError> {
        self.time.ok_or(SensorError::OutOfRange)
    }
}

// ── ScriptedSerial ────────────────────────────────────────────

/// UART that answers each read with the next scripted chunk.
#[derive(Default)]
pub struct ScriptedSerial {
    pub written: Vec<u8>,
    pub rx: VecDeque<Vec<u8>>,
}

impl SerialPort for ScriptedSerial {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, SerialError> {
        let Some(mut chunk) = self.rx.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.rx.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

/// Clock that advances 1 ms every time it is read.
#[derive(Default)]
pub struct StepClock(pub Cell<u64>);

impl Clock for StepClock {
    fn uptime_ms(&self) -> u64 {
        let t = self.0.get();
        self.0.set(t + 1);
        t
    }
}

// ── MockTime ──────────────────────────────────────────────────

/// Virtual time: delays are recorded and advance the clock instantly.
#[derive(Default)]
pub struct MockTime {
    pub now: u64,
    pub delays: Vec<u32>,
}

impl Clock for MockTime {
    fn uptime_ms(&self) -> u64 {
        self.now
    }
}

impl TimePort for MockTime {
    fn delay_ms(&mut self, ms: u32) {
        self.now += ms as u64;
        self.delays.push(ms);
    }
}

// ── MockStorage ───────────────────────────────────────────────

pub struct MockStorage {
    pub files: HashMap<String, String>,
    pub init_result: Result<(), StorageError>,
    pub init_calls: u32,
    pub fail_appends: bool,
    mounted: bool,
}

#[allow(dead_code)]
impl MockStorage {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            init_result: Ok(()),
            init_calls: 0,
            fail_appends: false,
            mounted: false,
        }
    }

    pub fn missing_card() -> Self {
        Self {
            init_result: Err(StorageError::InitFailed),
            ..Self::new()
        }
    }

    pub fn file(&self, name: &str) -> &str {
        self.files.get(name).map_or("", String::as_str)
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for MockStorage {
    fn init(&mut self) -> Result<(), StorageError> {
        self.init_calls += 1;
        self.mounted = self.init_result.is_ok();
        self.init_result
    }

    fn append(&mut self, file: &str, text: &str) -> Result<(), StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        if self.fail_appends {
            return Err(StorageError::IoError);
        }
        self.files.entry(file.to_string()).or_default().push_str(text);
        Ok(())
    }

    fn read_to_string(&self, file: &str) -> Result<String, StorageError> {
        self.files.get(file).cloned().ok_or(StorageError::NotFound)
    }
}

// ── CollectSink ───────────────────────────────────────────────

/// Keeps every emitted sample.
#[derive(Default)]
pub struct CollectSink {
    pub samples: Vec<SensorSample>,
}

impl RecordSink for CollectSink {
    fn emit(&mut self, sample: &SensorSample) {
        self.samples.push(*sample);
    }
}
