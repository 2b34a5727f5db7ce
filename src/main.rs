//! AirLogger Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative sample loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        ConsoleSink    FileSink    Esp32Time   │
//! │  (ADC·PMS·DHT·RTC)      (RecordSink)   (RecordSink)(TimePort)  │
//! │  SdCardStorage (StoragePort + ConfigPort)                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            SampleLoop (pure logic)                     │    │
//! │  │  calibration · gas regression · record formats         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::uart::{self, UartDriver};

use airlogger::adapters::file_sink::FileSink;
use airlogger::adapters::hardware::{HardwareAdapter, UartSerial};
use airlogger::adapters::log_sink::ConsoleSink;
use airlogger::adapters::sd_card::{SdCardStorage, SdSpiBus};
use airlogger::adapters::time::Esp32TimeAdapter;
use airlogger::app::ports::{ConfigPort, StoragePort};
use airlogger::app::service::{bootstrap, halt, Startup};
use airlogger::config::LoggerConfig;
use airlogger::sensors::dht22::Dht22;
use airlogger::sensors::ds3231::Ds3231;
use airlogger::sensors::pms5003::Pms5003;
use airlogger::{drivers, pins};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AirLogger v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let io = peripherals.pins;

    // ── 2. Card + config (or defaults) ────────────────────────
    let defaults = LoggerConfig::default();
    let mut storage = SdCardStorage::new(
        &defaults.storage.mount_point,
        SdSpiBus {
            spi: peripherals.spi2,
            sck: io.gpio12.into(),
            mosi: io.gpio11.into(),
            miso: io.gpio13.into(),
            cs: io.gpio10.into(),
        },
    );
    let config = match storage.init() {
        Ok(()) => match storage.load() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Config rejected ({}), using defaults", e);
                defaults
            }
        },
        // bootstrap() reports the mount failure below.
        Err(_) => defaults,
    };

    // ── 3. Initialise hardware peripherals ────────────────────
    let gas_pins = config.gas_channels.each_ref().map(|ch| ch.pin);
    if let Err(e) = drivers::hw_init::init_peripherals(&gas_pins) {
        error!("HAL init failed: {}, halting", e);
        halt(&mut Esp32TimeAdapter::new());
    }

    let uart = UartDriver::new(
        peripherals.uart1,
        io.gpio17,
        io.gpio18,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart::config::Config::default().baudrate(Hertz(pins::PMS_UART_BAUD)),
    )?;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        io.gpio8,
        io.gpio9,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ)),
    )?;

    let mut hw = HardwareAdapter::new(
        Pms5003::new(UartSerial::new(uart), Esp32TimeAdapter::new()),
        Dht22::new(pins::DHT22_GPIO),
        Ds3231::new(i2c),
    );
    let mut time = Esp32TimeAdapter::new();

    // ── 4. Warm-up, bring-up, calibration ─────────────────────
    let (mut sample_loop, file_sink) = match bootstrap(&config, &mut hw, &mut storage, &mut time)? {
        Startup::Logging(sample_loop) => (sample_loop, Some(FileSink::new(storage, &config))),
        Startup::ConsoleOnly(sample_loop) => (sample_loop, None),
        Startup::Halted(_) => halt(&mut time),
    };

    // ── 5. Sample loop ────────────────────────────────────────
    info!("System ready. Entering sample loop.");
    let mut sinks = (ConsoleSink::new(config.gas_labels()), file_sink);
    sample_loop.run(&mut hw, &mut time, &mut sinks)
}
