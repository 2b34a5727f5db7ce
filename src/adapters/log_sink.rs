//! Log-based record sink adapter.
//!
//! Implements [`RecordSink`] by writing the labelled console block to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::info;

use crate::app::ports::RecordSink;
use crate::app::record::console_block;
use crate::app::sample::SensorSample;

/// Adapter that logs every [`SensorSample`] to the serial console.
pub struct ConsoleSink {
    labels: [heapless::String<16>; 3],
}

impl ConsoleSink {
    /// `labels` name the gas columns, in channel order.
    pub fn new(labels: [&str; 3]) -> Self {
        Self {
            labels: labels.map(|l| {
                let mut s = heapless::String::new();
                for c in l.chars() {
                    if s.push(c).is_err() {
                        break;
                    }
                }
                s
            }),
        }
    }
}

impl RecordSink for ConsoleSink {
    fn emit(&mut self, sample: &SensorSample) {
        let labels = [
            self.labels[0].as_str(),
            self.labels[1].as_str(),
            self.labels[2].as_str(),
        ];
        for line in console_block(sample, labels).lines() {
            info!("{}", line);
        }
    }
}
