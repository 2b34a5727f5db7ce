//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to                   |
//! |-------------|-------------------|-------------------------------|
//! | `hardware`  | AnalogPort        | ESP32 ADC1 (oneshot)          |
//! |             | ParticulatePort   | PMS5003 over UART1            |
//! |             | ClimatePort       | DHT22 single-wire GPIO        |
//! |             | RtcPort           | DS3231 over I²C               |
//! | `log_sink`  | RecordSink        | Serial log output             |
//! | `file_sink` | RecordSink        | Any `StoragePort`             |
//! | `sd_card`   | StoragePort       | FAT on SPI SD card            |
//! |             | ConfigPort        | `config.json` on the card     |
//! | `time`      | TimePort          | ESP32 system timer / FreeRTOS |

pub mod file_sink;
pub mod hardware;
pub mod log_sink;
pub mod sd_card;
pub mod time;
