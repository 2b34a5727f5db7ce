//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the ADC, the particulate sensor, the climate sensor and the RTC,
//! exposing them together as a [`SensorPort`](crate::app::ports::SensorPort).
//! This is the only module in the system that wires drivers to buses.  On
//! non-espidf targets the ADC reads the `hw_init` simulation values.

use log::warn;

use crate::app::ports::{
    AnalogPort, ClimatePort, ParticulatePort, RtcPort, SensorError, SerialError,
};
use crate::app::sample::{ClimateReading, ClockState, ParticulateReading};
use crate::drivers::hw_init;
use crate::pins;

// ── ADC1 ──────────────────────────────────────────────────────

/// Oneshot ADC1 reads for the gas channels (configured by `hw_init`).
#[derive(Default)]
pub struct GasAdc;

impl AnalogPort for GasAdc {
    fn read_raw(&mut self, pin: u8) -> Result<u16, SensorError> {
        let channel = pins::adc1_channel(pin).ok_or(SensorError::AdcReadFailed)?;
        hw_init::adc1_read(channel).map_err(|rc| {
            warn!("ADC1 CH{}: read failed (rc={})", channel, rc);
            SensorError::AdcReadFailed
        })
    }
}

// ── UART ──────────────────────────────────────────────────────

/// UART link to the PMS5003.
#[cfg(target_os = "espidf")]
pub struct UartSerial {
    uart: esp_idf_hal::uart::UartDriver<'static>,
}

#[cfg(target_os = "espidf")]
impl UartSerial {
    pub fn new(uart: esp_idf_hal::uart::UartDriver<'static>) -> Self {
        Self { uart }
    }
}

#[cfg(target_os = "espidf")]
impl crate::app::ports::SerialPort for UartSerial {
    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), SerialError> {
        while !bytes.is_empty() {
            match self.uart.write(bytes) {
                Ok(0) | Err(_) => return Err(SerialError::WriteFailed),
                Ok(n) => bytes = &bytes[n..],
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, SerialError> {
        let ticks = esp_idf_hal::delay::TickType::new_millis(timeout_ms as u64).ticks();
        self.uart.read(buf, ticks).map_err(|_| SerialError::ReadFailed)
    }
}

// ── HardwareAdapter ───────────────────────────────────────────

/// Concrete adapter that combines all sensor hardware behind port traits.
pub struct HardwareAdapter<P, C, R> {
    adc: GasAdc,
    particulate: P,
    climate: C,
    rtc: R,
}

impl<P, C, R> HardwareAdapter<P, C, R>
where
    P: ParticulatePort,
    C: ClimatePort,
    R: RtcPort,
{
    pub fn new(particulate: P, climate: C, rtc: R) -> Self {
        Self {
            adc: GasAdc,
            particulate,
            climate,
            rtc,
        }
    }
}

impl<P, C, R> AnalogPort for HardwareAdapter<P, C, R> {
    fn read_raw(&mut self, pin: u8) -> Result<u16, SensorError> {
        self.adc.read_raw(pin)
    }
}

impl<P: ParticulatePort, C, R> ParticulatePort for HardwareAdapter<P, C, R> {
    fn prepare(&mut self) -> Result<(), SerialError> {
        self.particulate.prepare()
    }

    fn read_particulates(&mut self, timeout_ms: u32) -> Option<ParticulateReading> {
        self.particulate.read_particulates(timeout_ms)
    }
}

impl<P, C: ClimatePort, R> ClimatePort for HardwareAdapter<P, C, R> {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate.read_climate()
    }
}

impl<P, C, R: RtcPort> RtcPort for HardwareAdapter<P, C, R> {
    fn init(&mut self) -> Result<(), SensorError> {
        self.rtc.init()
    }

    fn set_time(&mut self, time: &ClockState) -> Result<(), SensorError> {
        self.rtc.set_time(time)
    }

    fn now(&mut self) -> Result<ClockState, SensorError> {
        self.rtc.now()
    }
}
