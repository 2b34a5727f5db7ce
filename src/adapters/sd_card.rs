//! SD-card storage adapter.
//!
//! Implements both [`StoragePort`] and [`ConfigPort`] for the AirLogger.
//!
//! - **`target_os = "espidf"`**: mounts a FAT volume from an SPI-attached
//!   card at the configured mount point via `esp-idf-svc`; files are then
//!   ordinary `std::fs` paths through the ESP-IDF VFS.
//! - **`not(target_os = "espidf")`**: the mount point is a host directory;
//!   a missing directory behaves like a missing card.
//!
//! Every append opens the file, writes and closes it again.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::LoggerConfig;

#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin};
#[cfg(target_os = "espidf")]
use esp_idf_hal::spi::SPI2;

/// Config file looked up next to the data file.
pub const CONFIG_FILE: &str = "config.json";

/// Peripherals the SPI card slot is wired to.
#[cfg(target_os = "espidf")]
pub struct SdSpiBus {
    pub spi: SPI2,
    pub sck: AnyOutputPin,
    pub mosi: AnyOutputPin,
    pub miso: AnyInputPin,
    pub cs: AnyOutputPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountState {
    Unmounted,
    Mounted,
    Failed(StorageError),
}

pub struct SdCardStorage {
    root: PathBuf,
    state: MountState,
    #[cfg(target_os = "espidf")]
    bus: Option<SdSpiBus>,
}

impl SdCardStorage {
    #[cfg(target_os = "espidf")]
    pub fn new(mount_point: &str, bus: SdSpiBus) -> Self {
        Self {
            root: PathBuf::from(mount_point),
            state: MountState::Unmounted,
            bus: Some(bus),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            root: mount_point.into(),
            state: MountState::Unmounted,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.state == MountState::Mounted
    }

    #[cfg(target_os = "espidf")]
    fn mount(&mut self) -> Result<(), StorageError> {
        use esp_idf_hal::sd::spi::SdSpiHostDriver;
        use esp_idf_hal::sd::{SdCardConfiguration, SdCardDriver};
        use esp_idf_hal::spi::{SpiDriver, SpiDriverConfig};
        use esp_idf_svc::fs::fatfs::Fatfs;
        use esp_idf_svc::io::vfs::MountedFatfs;

        let bus = self.bus.take().ok_or(StorageError::InitFailed)?;
        let mount_point = self.root.to_str().ok_or(StorageError::InitFailed)?;

        let spi = SpiDriver::new(
            bus.spi,
            bus.sck,
            bus.mosi,
            Some(bus.miso),
            &SpiDriverConfig::default(),
        )
        .map_err(|e| {
            warn!("SD: SPI bus init failed: {}", e);
            StorageError::InitFailed
        })?;

        let host = SdSpiHostDriver::new(
            spi,
            Some(bus.cs),
            AnyIOPin::none(),
            AnyIOPin::none(),
            AnyIOPin::none(),
            None,
        )
        .map_err(|e| {
            warn!("SD: SPI host init failed: {}", e);
            StorageError::InitFailed
        })?;

        let card = SdCardDriver::new_spi(host, &SdCardConfiguration::new()).map_err(|e| {
            warn!("SD: card not responding: {}", e);
            StorageError::InitFailed
        })?;

        let fatfs = Fatfs::new_sdcard(0, card).map_err(|e| {
            warn!("SD: FAT driver failed: {}", e);
            StorageError::InitFailed
        })?;

        let mounted = MountedFatfs::mount(fatfs, mount_point, 4).map_err(|e| {
            warn!("SD: mount at {} failed: {}", mount_point, e);
            StorageError::InitFailed
        })?;
        // The volume stays mounted for the life of the firmware.
        Box::leak(Box::new(mounted));
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn mount(&mut self) -> Result<(), StorageError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            warn!("SD(sim): {} is not a directory", self.root.display());
            Err(StorageError::InitFailed)
        }
    }
}

impl StoragePort for SdCardStorage {
    fn init(&mut self) -> Result<(), StorageError> {
        match self.state {
            MountState::Mounted => Ok(()),
            MountState::Failed(e) => Err(e),
            MountState::Unmounted => match self.mount() {
                Ok(()) => {
                    info!("SD: mounted at {}", self.root.display());
                    self.state = MountState::Mounted;
                    Ok(())
                }
                Err(e) => {
                    self.state = MountState::Failed(e);
                    Err(e)
                }
            },
        }
    }

    fn append(&mut self, file: &str, text: &str) -> Result<(), StorageError> {
        if !self.is_mounted() {
            return Err(StorageError::NotMounted);
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(file))
            .map_err(|_| StorageError::IoError)?;
        f.write_all(text.as_bytes())
            .and_then(|_| f.flush())
            .map_err(|_| StorageError::IoError)
    }

    fn read_to_string(&self, file: &str) -> Result<String, StorageError> {
        if !self.is_mounted() {
            return Err(StorageError::NotMounted);
        }
        std::fs::read_to_string(self.root.join(file)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::IoError,
        })
    }
}

impl ConfigPort for SdCardStorage {
    fn load(&self) -> Result<LoggerConfig, ConfigError> {
        let text = match self.read_to_string(CONFIG_FILE) {
            Ok(text) => text,
            Err(StorageError::NotFound) => {
                info!("No {} on card, using defaults", CONFIG_FILE);
                return Ok(LoggerConfig::default());
            }
            Err(_) => return Err(ConfigError::IoError),
        };
        let config: LoggerConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("{}: {}", CONFIG_FILE, e);
            ConfigError::Corrupted
        })?;
        config.validate().map_err(ConfigError::ValidationFailed)?;
        info!("Loaded {}", CONFIG_FILE);
        Ok(config)
    }
}
