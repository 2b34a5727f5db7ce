//! Sensor drivers and the gas-sensor signal chain.
//!
//! | Module          | Device                    | Bus            |
//! |-----------------|---------------------------|----------------|
//! | [`gas`]         | MQ-2 / MQ-135 / MQ-8      | ADC1           |
//! | [`calibration`] | R0 baseline for [`gas`]   | none           |
//! | [`pms5003`]     | Plantower PMS5003         | UART1 9600 8N1 |
//! | [`dht22`]       | DHT22 / AM2302            | single-wire    |
//! | [`ds3231`]      | DS3231 RTC                | I²C 0x68       |
//!
//! Each driver implements one sensor port from [`crate::app::ports`]; the
//! [`HardwareAdapter`](crate::adapters::hardware::HardwareAdapter) bundles
//! them for the sample loop.

pub mod calibration;
pub mod dht22;
pub mod ds3231;
pub mod gas;
pub mod pms5003;
