//! SD-card record sink.
//!
//! Appends one record per sample through a [`StoragePort`].  A failed append
//! is counted and remembered, never propagated: the console keeps working
//! and the next sample tries again.

use log::warn;

use crate::app::ports::{RecordSink, StorageError, StoragePort};
use crate::app::record::{console_block, csv_line};
use crate::app::sample::SensorSample;
use crate::config::{LogFormat, LoggerConfig};

/// Append outcomes since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub written: u32,
    pub failed: u32,
    pub last_error: Option<StorageError>,
}

pub struct FileSink<S> {
    storage: S,
    file: heapless::String<16>,
    format: LogFormat,
    with_timestamp: bool,
    labels: [heapless::String<16>; 3],
    stats: WriteStats,
}

impl<S: StoragePort> FileSink<S> {
    pub fn new(storage: S, config: &LoggerConfig) -> Self {
        Self {
            storage,
            file: config.storage.data_file.clone(),
            format: config.storage.format,
            with_timestamp: config.storage.csv_timestamp,
            labels: config.gas_channels.clone().map(|ch| ch.label),
            stats: WriteStats::default(),
        }
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn render(&self, sample: &SensorSample) -> String {
        match self.format {
            LogFormat::Csv => csv_line(sample, self.with_timestamp),
            LogFormat::Block => console_block(
                sample,
                [
                    self.labels[0].as_str(),
                    self.labels[1].as_str(),
                    self.labels[2].as_str(),
                ],
            ),
        }
    }
}

impl<S: StoragePort> RecordSink for FileSink<S> {
    fn emit(&mut self, sample: &SensorSample) {
        let text = self.render(sample);
        match self.storage.append(&self.file, &text) {
            Ok(()) => self.stats.written += 1,
            Err(e) => {
                self.stats.failed += 1;
                self.stats.last_error = Some(e);
                warn!("{}: append failed ({}), {} failures so far", self.file, e, self.stats.failed);
            }
        }
    }
}
