//! Textual projections of a [`SensorSample`].
//!
//! Storage line (fixed column order, no header, no escaping):
//!
//! ```text
//! [timestamp,]PM1.0,PM2.5,PM10.0,gasA,gasB,gasC,temperature,humidity\n
//! ```
//!
//! Values are printed with two decimals.  A missing value is an empty field.
//! The console block is for humans only and is never parsed back.

use core::fmt::{self, Write as _};

use super::sample::{ClockState, ParticulateReading, SensorSample};

/// Number of value columns in a storage line.
pub const VALUE_COLUMNS: usize = 8;

/// Separator printed after every console block.
pub const SEPARATOR: &str = "*************************************************";

/// Why a storage line could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Neither 8 nor 9 comma-separated fields.
    FieldCount(usize),
    /// Field at this zero-based column is not a number.
    BadNumber(usize),
    /// Particulate columns may not be empty.
    MissingParticulate(usize),
    /// Leading timestamp column is malformed.
    BadTimestamp,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected 8 or 9 fields, got {}", n),
            Self::BadNumber(col) => write!(f, "column {} is not a number", col),
            Self::MissingParticulate(col) => write!(f, "particulate column {} is empty", col),
            Self::BadTimestamp => write!(f, "malformed timestamp"),
        }
    }
}

fn push_value(out: &mut String, value: Option<f32>) {
    if let Some(v) = value {
        let _ = write!(out, "{:.2}", v);
    }
}

/// Render one storage line, newline-terminated.
pub fn csv_line(sample: &SensorSample, with_timestamp: bool) -> String {
    let mut out = String::with_capacity(96);
    if with_timestamp {
        if let Some(ts) = sample.timestamp {
            let _ = write!(out, "{}", ts);
        }
        out.push(',');
    }

    let p = &sample.particulates;
    let values = [
        Some(p.pm1_0),
        Some(p.pm2_5),
        Some(p.pm10_0),
        sample.gases[0],
        sample.gases[1],
        sample.gases[2],
        sample.temperature_c,
        sample.humidity_pct,
    ];
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_value(&mut out, v);
    }
    out.push('\n');
    out
}

fn parse_opt(field: &str, col: usize) -> Result<Option<f32>, RecordError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    field.parse::<f32>().map(Some).map_err(|_| RecordError::BadNumber(col))
}

fn parse_required(field: &str, col: usize) -> Result<f32, RecordError> {
    parse_opt(field, col)?.ok_or(RecordError::MissingParticulate(col))
}

/// Parse a storage line back into a sample.  Accepts lines with or without
/// the leading timestamp column and with or without the trailing newline.
pub fn parse_csv_line(line: &str) -> Result<SensorSample, RecordError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: heapless::Vec<&str, { VALUE_COLUMNS + 1 }> = {
        let mut v = heapless::Vec::new();
        for field in line.split(',') {
            v.push(field)
                .map_err(|_| RecordError::FieldCount(line.split(',').count()))?;
        }
        v
    };

    let (timestamp, values) = match fields.len() {
        VALUE_COLUMNS => (None, &fields[..]),
        n if n == VALUE_COLUMNS + 1 => {
            let ts = fields[0].trim();
            let ts = if ts.is_empty() {
                None
            } else {
                Some(ClockState::parse_iso(ts).ok_or(RecordError::BadTimestamp)?)
            };
            (ts, &fields[1..])
        }
        n => return Err(RecordError::FieldCount(n)),
    };

    Ok(SensorSample {
        particulates: ParticulateReading {
            pm1_0: parse_required(values[0], 0)?,
            pm2_5: parse_required(values[1], 1)?,
            pm10_0: parse_required(values[2], 2)?,
        },
        gases: [
            parse_opt(values[3], 3)?,
            parse_opt(values[4], 4)?,
            parse_opt(values[5], 5)?,
        ],
        temperature_c: parse_opt(values[6], 6)?,
        humidity_pct: parse_opt(values[7], 7)?,
        timestamp,
    })
}

struct Field(Option<f32>);

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{:.2}", v),
            None => f.write_str("--"),
        }
    }
}

/// Labelled multi-line console block, one `\n`-terminated line per row,
/// ending with [`SEPARATOR`].
pub fn console_block(sample: &SensorSample, gas_labels: [&str; 3]) -> String {
    let p = &sample.particulates;
    let mut out = String::with_capacity(256);
    if let Some(ts) = sample.timestamp {
        let _ = writeln!(out, "| Time: {}\t|", ts);
    }
    let _ = writeln!(
        out,
        "| PM 1.0: {:.2}\t| PM 2.5: {:.2}\t| PM 10.0: {:.2}\t|",
        p.pm1_0, p.pm2_5, p.pm10_0
    );
    let _ = writeln!(
        out,
        "| {}: {}\t| {}: {}\t| {}: {}\t|",
        gas_labels[0],
        Field(sample.gases[0]),
        gas_labels[1],
        Field(sample.gases[1]),
        gas_labels[2],
        Field(sample.gases[2]),
    );
    let _ = writeln!(
        out,
        "| Temperature: {}\t| Humidity: {}\t|",
        Field(sample.temperature_c),
        Field(sample.humidity_pct)
    );
    out.push_str(SEPARATOR);
    out.push('\n');
    out
}
