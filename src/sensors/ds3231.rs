//! Maxim DS3231 temperature-compensated real-time clock (I²C, 0x68).
//!
//! Timekeeping registers 0x00–0x06 hold seconds, minutes, hours, weekday,
//! date, month/century and year as packed BCD.  The clock always runs in
//! 24-hour mode; a 12-hour value found on the device is converted on read.

use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{RtcPort, SensorError};
use crate::app::sample::ClockState;

pub const ADDRESS: u8 = 0x68;

const REG_TIME: u8 = 0x00;
const REG_CONTROL: u8 = 0x0E;

/// INTCN set, oscillator and square wave left at power-on defaults.
const CONTROL_DEFAULT: u8 = 0x04;

const HOUR_12H: u8 = 0x40;
const HOUR_PM: u8 = 0x20;
const MONTH_CENTURY: u8 = 0x80;

fn to_bcd(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

fn from_bcd(v: u8) -> Option<u8> {
    let (hi, lo) = (v >> 4, v & 0x0F);
    (hi < 10 && lo < 10).then_some(hi * 10 + lo)
}

/// Pack a validated time into registers 0x00–0x06.
pub fn encode_registers(t: &ClockState) -> [u8; 7] {
    let century = if t.year >= 2100 { MONTH_CENTURY } else { 0 };
    [
        to_bcd(t.second),
        to_bcd(t.minute),
        to_bcd(t.hour),
        t.weekday(),
        to_bcd(t.day),
        to_bcd(t.month) | century,
        to_bcd((t.year % 100) as u8),
    ]
}

/// Unpack registers 0x00–0x06.  `None` on malformed BCD or an impossible
/// date (e.g. the oscillator stopped and the registers hold garbage).
pub fn decode_registers(r: &[u8; 7]) -> Option<ClockState> {
    let hour = if r[2] & HOUR_12H != 0 {
        let h = from_bcd(r[2] & 0x1F)? % 12;
        if r[2] & HOUR_PM != 0 { h + 12 } else { h }
    } else {
        from_bcd(r[2] & 0x3F)?
    };
    let century = if r[5] & MONTH_CENTURY != 0 { 100 } else { 0 };
    let t = ClockState {
        year: 2000 + century + from_bcd(r[6])? as u16,
        month: from_bcd(r[5] & 0x1F)?,
        day: from_bcd(r[4] & 0x3F)?,
        hour,
        minute: from_bcd(r[1] & 0x7F)?,
        second: from_bcd(r[0] & 0x7F)?,
    };
    t.validate().ok().map(|_| t)
}

pub struct Ds3231<I> {
    i2c: I,
}

impl<I: I2c> Ds3231<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> RtcPort for Ds3231<I> {
    fn init(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(ADDRESS, &[REG_CONTROL, CONTROL_DEFAULT])
            .map_err(|_| SensorError::BusError)
    }

    fn set_time(&mut self, time: &ClockState) -> Result<(), SensorError> {
        if time.validate().is_err() {
            return Err(SensorError::OutOfRange);
        }
        let mut buf = [0u8; 8];
        buf[0] = REG_TIME;
        buf[1..].copy_from_slice(&encode_registers(time));
        self.i2c
            .write(ADDRESS, &buf)
            .map_err(|_| SensorError::BusError)
    }

    fn now(&mut self) -> Result<ClockState, SensorError> {
        let mut regs = [0u8; 7];
        self.i2c
            .write_read(ADDRESS, &[REG_TIME], &mut regs)
            .map_err(|_| SensorError::BusError)?;
        decode_registers(&regs).ok_or_else(|| {
            warn!("DS3231: invalid time registers {:02X?}", regs);
            SensorError::OutOfRange
        })
    }
}
