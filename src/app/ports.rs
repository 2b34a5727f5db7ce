//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SampleLoop (domain)
//! ```
//!
//! Driven adapters (ADC, UART, I²C, GPIO, SD card, console) implement these
//! traits.  The [`SampleLoop`](super::service::SampleLoop) consumes them via
//! generics, so the domain core never touches hardware directly and every
//! path can be exercised on the host with mocks.

use crate::config::LoggerConfig;

use super::sample::{ClimateReading, ClockState, ParticulateReading, SensorSample};

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One-shot ADC access for the analog gas sensors.
pub trait AnalogPort {
    /// Read one raw conversion from the ADC channel wired to `pin`.
    fn read_raw(&mut self, pin: u8) -> Result<u16, SensorError>;
}

/// Byte-level UART link to the particulate sensor.
pub trait SerialPort {
    /// Write every byte of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// Block for up to `timeout_ms` until at least one byte is available and
    /// copy what is buffered into `buf`.  `Ok(0)` means the wait expired.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, SerialError>;
}

/// Particulate-matter sensor (request/response).
pub trait ParticulatePort {
    /// Put the sensor into request/response mode and wake it.
    fn prepare(&mut self) -> Result<(), SerialError>;

    /// Request one reading and wait up to `timeout_ms` for a valid frame.
    /// `None` on timeout or a corrupt frame.
    fn read_particulates(&mut self, timeout_ms: u32) -> Option<ParticulateReading>;
}

/// Temperature / relative humidity sensor.
pub trait ClimatePort {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError>;
}

/// External real-time clock.
pub trait RtcPort {
    /// Configure the device's control register.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Write wall-clock time.
    fn set_time(&mut self, time: &ClockState) -> Result<(), SensorError>;

    /// Read wall-clock time.
    fn now(&mut self) -> Result<ClockState, SensorError>;
}

/// Everything the sample loop reads from in one cycle.
pub trait SensorPort: AnalogPort + ParticulatePort + ClimatePort + RtcPort {}

impl<T: AnalogPort + ParticulatePort + ClimatePort + RtcPort> SensorPort for T {}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
pub trait Clock {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;
}

/// Monotonic time plus the blocking delays the cooperative loop sleeps in.
pub trait TimePort: Clock {
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Output ports (driven adapters: domain → console / SD card)
// ───────────────────────────────────────────────────────────────

/// Destination for completed samples.  Adapters decide the representation.
pub trait RecordSink {
    fn emit(&mut self, sample: &SensorSample);
}

impl<T: RecordSink + ?Sized> RecordSink for &mut T {
    fn emit(&mut self, sample: &SensorSample) {
        (**self).emit(sample);
    }
}

/// An absent destination (e.g. the card failed to mount) drops the sample.
impl<T: RecordSink> RecordSink for Option<T> {
    fn emit(&mut self, sample: &SensorSample) {
        if let Some(sink) = self {
            sink.emit(sample);
        }
    }
}

/// Fan-out: every destination sees every sample, independently.
impl<A: RecordSink, B: RecordSink> RecordSink for (A, B) {
    fn emit(&mut self, sample: &SensorSample) {
        self.0.emit(sample);
        self.1.emit(sample);
    }
}

/// Removable file storage.
///
/// Implementations MUST NOT hold a file open between calls: each `append`
/// opens, writes and closes, so a power cut can only lose the line in flight.
pub trait StoragePort {
    /// Bring the medium up.  Idempotent: once it has failed it keeps
    /// returning the same error without touching the hardware again.
    fn init(&mut self) -> Result<(), StorageError>;

    /// Append `text` to `file`, creating it if needed.
    fn append(&mut self, file: &str, text: &str) -> Result<(), StorageError>;

    /// Read a whole (small) file.
    fn read_to_string(&self, file: &str) -> Result<String, StorageError>;
}

/// Loads startup configuration.
pub trait ConfigPort {
    /// Returns [`LoggerConfig::default()`] if no stored config exists.
    /// Invalid values are rejected with [`ConfigError::ValidationFailed`],
    /// never silently clamped.
    fn load(&self) -> Result<LoggerConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error.
    AdcReadFailed,
    /// The device did not answer in time.
    Timeout,
    /// Frame integrity check failed.
    ChecksumMismatch,
    /// I²C transaction failed.
    BusError,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// UART write failed or was short.
    WriteFailed,
    /// UART read failed.
    ReadFailed,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Card missing, unformatted, or the mount failed.
    InitFailed,
    /// The medium was never brought up.
    NotMounted,
    /// Requested file does not exist.
    NotFound,
    /// Open / write / close failed.
    IoError,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config file on the medium.
    NotFound,
    /// Config file is not valid JSON for [`LoggerConfig`].
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::Timeout => write!(f, "sensor timeout"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::BusError => write!(f, "I2C bus error"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl core::fmt::Display for SerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "UART write failed"),
            Self::ReadFailed => write!(f, "UART read failed"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InitFailed => write!(f, "storage init failed"),
            Self::NotMounted => write!(f, "storage not mounted"),
            Self::NotFound => write!(f, "file not found"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
