//! Fuzz target: `parse_csv_line`
//!
//! Arbitrary text must never panic the storage-line parser, and any line it
//! accepts must re-render to a line that parses to the same sample.
//!
//! cargo fuzz run fuzz_record_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use airlogger::app::record::{csv_line, parse_csv_line};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(sample) = parse_csv_line(text) else {
        return;
    };

    let finite = [sample.particulates.pm1_0, sample.particulates.pm2_5, sample.particulates.pm10_0]
        .into_iter()
        .chain(sample.gases.into_iter().flatten())
        .chain(sample.temperature_c)
        .chain(sample.humidity_pct)
        .all(f32::is_finite);
    if !finite {
        return;
    }

    let line = csv_line(&sample, sample.timestamp.is_some());
    let again = parse_csv_line(&line).expect("rendered line must parse");
    assert_eq!(again.timestamp, sample.timestamp);
    assert_eq!(again.gases.map(|g| g.is_some()), sample.gases.map(|g| g.is_some()));
});
