//! GPIO / peripheral pin assignments for the AirLogger board (ESP32-S3).
//!
//! Pins that drivers address by number (ADC1 gas inputs, the DHT22 line)
//! and the bus speeds.  The UART, I²C and SPI pins are typed peripherals
//! moved out of `Peripherals` in `main.rs`:
//!
//! | Bus              | Pins                                  |
//! |------------------|---------------------------------------|
//! | UART1 (PMS5003)  | TX GPIO17, RX GPIO18                  |
//! | I²C0 (DS3231)    | SDA GPIO8, SCL GPIO9                  |
//! | SPI2 (SD card)   | SCK GPIO12, MOSI GPIO11, MISO GPIO13, CS GPIO10 |

// ---------------------------------------------------------------------------
// Gas sensors, analog (ADC1)
// ---------------------------------------------------------------------------

/// MQ-2 (LPG / smoke).  ADC1 channel 3.
pub const MQ2_ADC_GPIO: u8 = 4;
/// MQ-135 (CO2 / air quality).  ADC1 channel 4.
pub const MQ135_ADC_GPIO: u8 = 5;
/// MQ-8 (H2).  ADC1 channel 5.
pub const MQ8_ADC_GPIO: u8 = 6;

/// ADC1 channel for a GPIO on the ESP32-S3 (GPIO1–GPIO10 → CH0–CH9).
pub const fn adc1_channel(gpio: u8) -> Option<u32> {
    match gpio {
        1..=10 => Some(gpio as u32 - 1),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// DHT22 single-wire bus (open-drain, 10 kΩ pull-up)
// ---------------------------------------------------------------------------

pub const DHT22_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// I²C bus (DS3231 RTC)
// ---------------------------------------------------------------------------

pub const I2C_BAUD_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// UART1 (PMS5003)
// ---------------------------------------------------------------------------

pub const PMS_UART_BAUD: u32 = 9_600;
