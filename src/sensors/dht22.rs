//! DHT22 / AM2302 temperature and relative-humidity sensor.
//!
//! Single-wire protocol: the host pulls the line low for ≥1 ms, releases
//! it, and the sensor answers with an 80 µs low / 80 µs high preamble
//! followed by 40 bits.  Each bit starts with a ~50 µs low; the length of
//! the following high pulse encodes the value (~27 µs = 0, ~70 µs = 1).
//!
//! Frame (5 bytes, MSB first):
//! ```text
//! ┌────────────────┬─────────────────────────┬──────────┐
//! │ RH × 10 (u16)  │ T × 10 (bit 15 = sign)  │ checksum │
//! └────────────────┴─────────────────────────┴──────────┘
//! ```
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-banged with raw GPIO sys calls inside a critical section.
//! On host/test: decodes a frame injected via [`sim_set_frame`].

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU64, Ordering};

use crate::app::ports::{ClimatePort, SensorError};
use crate::app::sample::ClimateReading;

/// High pulses longer than this are a `1` bit.
const BIT_THRESHOLD_US: u32 = 40;

/// 50.0 %RH, 21.5 °C.
#[cfg(not(target_os = "espidf"))]
static SIM_FRAME: AtomicU64 = AtomicU64::new(0x01_F4_00_D7_CC);

/// Inject the raw frame the host build will "receive".
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_frame(frame: [u8; 5]) {
    let packed = frame.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    SIM_FRAME.store(packed, Ordering::Relaxed);
}

/// Assemble the 40 measured high-pulse widths into frame bytes.
pub fn bits_from_pulses(high_us: &[u32; 40]) -> [u8; 5] {
    let mut out = [0u8; 5];
    for (i, &width) in high_us.iter().enumerate() {
        if width > BIT_THRESHOLD_US {
            out[i / 8] |= 0x80 >> (i % 8);
        }
    }
    out
}

/// Verify the checksum and convert a raw frame.
pub fn decode(frame: [u8; 5]) -> Result<ClimateReading, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != frame[4] {
        return Err(SensorError::ChecksumMismatch);
    }

    let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 / 10.0;
    let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as f32 / 10.0;
    let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };

    if !(0.0..=100.0).contains(&humidity) || !(-40.0..=80.0).contains(&temperature) {
        return Err(SensorError::OutOfRange);
    }
    Ok(ClimateReading {
        temperature_c: temperature,
        humidity_pct: humidity,
    })
}

pub struct Dht22 {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    gpio: i32,
}

impl Dht22 {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }

    #[cfg(target_os = "espidf")]
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        use esp_idf_sys::*;

        let pin = self.gpio;

        // Spin until the line leaves `level`; returns the time spent there.
        fn wait_while(pin: i32, level: i32, timeout_us: i64) -> Option<u32> {
            // SAFETY: timer and GPIO level reads are plain register accesses.
            let start = unsafe { esp_timer_get_time() };
            loop {
                let elapsed = unsafe { esp_timer_get_time() } - start;
                if unsafe { gpio_get_level(pin) } != level {
                    return Some(elapsed as u32);
                }
                if elapsed > timeout_us {
                    return None;
                }
            }
        }

        // SAFETY: the pin is owned by this driver; start pulse timing only.
        unsafe {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD);
            gpio_set_level(pin, 0);
            esp_rom_delay_us(1_200);
            gpio_set_level(pin, 1);
            esp_rom_delay_us(30);
        }

        let pulses = esp_idf_hal::interrupt::free(|| -> Option<[u32; 40]> {
            // Preamble: line low then high ~80 µs each.
            wait_while(pin, 1, 100)?;
            wait_while(pin, 0, 100)?;
            wait_while(pin, 1, 100)?;
            let mut high = [0u32; 40];
            for width in high.iter_mut() {
                wait_while(pin, 0, 100)?;
                *width = wait_while(pin, 1, 100)?;
            }
            Some(high)
        });

        pulses
            .map(|p| bits_from_pulses(&p))
            .ok_or(SensorError::Timeout)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        let packed = SIM_FRAME.load(Ordering::Relaxed);
        let mut frame = [0u8; 5];
        for (i, b) in frame.iter_mut().enumerate() {
            *b = (packed >> (8 * (4 - i))) as u8;
        }
        Ok(frame)
    }
}

impl ClimatePort for Dht22 {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        decode(self.read_frame()?)
    }
}
