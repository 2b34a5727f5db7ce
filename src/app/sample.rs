//! Values produced by one pass of the sample loop.
//!
//! Everything here is plain data: a [`SensorSample`] is built once per cycle,
//! handed to the sinks by reference and then dropped.  Nothing is shared
//! between cycles except the particulate values the loop deliberately
//! carries forward.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Wall-clock time as mirrored from the RTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockState {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Range-check the fields.  Applied to configured boot times, to times
    /// written to the RTC and to every RTC reading; a reading that fails
    /// comes through as a missing timestamp.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(2000..=2199).contains(&self.year) {
            return Err("clock year must be 2000–2199");
        }
        if !(1..=12).contains(&self.month) {
            return Err("clock month must be 1–12");
        }
        if self.day == 0 || self.day > days_in_month(self.year, self.month) {
            return Err("clock day out of range for month");
        }
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err("clock time of day out of range");
        }
        Ok(())
    }

    /// ISO weekday, 1 = Monday … 7 = Sunday.
    pub fn weekday(&self) -> u8 {
        // Sakamoto's method (0 = Sunday).
        const T: [u32; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
        let month = self.month.clamp(1, 12);
        // Shifted by 400 years (a whole cycle) so year 0 cannot underflow.
        let year = self.year as u32 + 400;
        let y = if month < 3 { year - 1 } else { year };
        let idx = (month - 1) as usize;
        let dow = (y + y / 4 - y / 100 + y / 400 + T[idx] + self.day as u32) % 7;
        if dow == 0 { 7 } else { dow as u8 }
    }

    /// Parse the `YYYY-MM-DDThh:mm:ss` form produced by `Display`.
    pub fn parse_iso(s: &str) -> Option<Self> {
        let (date, time) = s.split_once('T')?;
        let mut d = date.splitn(3, '-');
        let mut t = time.splitn(3, ':');
        Some(Self {
            year: d.next()?.parse().ok()?,
            month: d.next()?.parse().ok()?,
            day: d.next()?.parse().ok()?,
            hour: t.next()?.parse().ok()?,
            minute: t.next()?.parse().ok()?,
            second: t.next()?.parse().ok()?,
        })
    }
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Atmospheric-environment mass concentrations from the optical sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticulateReading {
    /// PM1.0 (µg/m³).
    pub pm1_0: f32,
    /// PM2.5 (µg/m³).
    pub pm2_5: f32,
    /// PM10 (µg/m³).
    pub pm10_0: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// One complete reading of every sensor.
///
/// Optional fields are *missing* (sensor fault, uncalibrated channel), never
/// NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSample {
    pub particulates: ParticulateReading,
    /// Gas concentrations in channel order (ppm).
    pub gases: [Option<f32>; 3],
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub timestamp: Option<ClockState>,
}
