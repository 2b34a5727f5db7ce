//! Plantower PMS5003 laser particulate sensor (UART, 9600 8N1).
//!
//! Host → sensor commands (7 bytes):
//! ```text
//! ┌──────┬──────┬─────┬───────┬───────┬──────────────┐
//! │ 0x42 │ 0x4D │ CMD │ DATAH │ DATAL │ CHK (BE u16) │
//! └──────┴──────┴─────┴───────┴───────┴──────────────┘
//! ```
//!
//! Sensor → host frame (32 bytes):
//! ```text
//! ┌──────┬──────┬──────────────┬───────────────────────┬──────────────┐
//! │ 0x42 │ 0x4D │ LEN = 28 (BE)│ 13 × BE u16 data words │ CHK (BE u16) │
//! └──────┴──────┴──────────────┴───────────────────────┴──────────────┘
//! ```
//!
//! Both checksums are the 16-bit sum of every preceding byte.  The sensor is
//! run in passive mode: each read sends a request and waits for exactly one
//! frame.  The decoder accumulates bytes across partial UART reads the same
//! way regardless of how the bytes are chunked.

use core::fmt;

use log::{debug, warn};

use crate::app::ports::{Clock, ParticulatePort, SerialError, SerialPort};
use crate::app::sample::ParticulateReading;

const START_1: u8 = 0x42;
const START_2: u8 = 0x4D;

/// Total frame size including start bytes and checksum.
pub const FRAME_LEN: usize = 32;

/// Value of the length field: data words plus checksum.
const FRAME_BODY_LEN: u16 = 28;

/// Passive-mode host commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PassiveMode,
    ActiveMode,
    RequestRead,
    Sleep,
    WakeUp,
}

impl Command {
    const fn code(self) -> (u8, u16) {
        match self {
            Self::PassiveMode => (0xE1, 0x0000),
            Self::ActiveMode => (0xE1, 0x0001),
            Self::RequestRead => (0xE2, 0x0000),
            Self::Sleep => (0xE4, 0x0000),
            Self::WakeUp => (0xE4, 0x0001),
        }
    }

    /// Wire bytes for this command.
    pub fn encode(self) -> [u8; 7] {
        let (cmd, data) = self.code();
        let [dh, dl] = data.to_be_bytes();
        let mut out = [START_1, START_2, cmd, dh, dl, 0, 0];
        let sum = checksum(&out[..5]);
        out[5..].copy_from_slice(&sum.to_be_bytes());
        out
    }
}

fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Every field of one decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PmsFrame {
    /// PM1.0 / PM2.5 / PM10 (µg/m³), CF=1 standard particle.
    pub pm_cf1: [u16; 3],
    /// PM1.0 / PM2.5 / PM10 (µg/m³), atmospheric environment.
    pub pm_atm: [u16; 3],
    /// Particles per 0.1 L beyond 0.3 / 0.5 / 1.0 / 2.5 / 5.0 / 10 µm.
    pub particle_counts: [u16; 6],
}

impl PmsFrame {
    /// Parse a complete 32-byte frame, verifying header, length and checksum.
    pub fn parse(raw: &[u8; FRAME_LEN]) -> Result<Self, FrameError> {
        if raw[0] != START_1 || raw[1] != START_2 {
            return Err(FrameError::BadHeader);
        }
        let len = u16::from_be_bytes([raw[2], raw[3]]);
        if len != FRAME_BODY_LEN {
            return Err(FrameError::BadLength(len));
        }
        let expected = u16::from_be_bytes([raw[30], raw[31]]);
        let computed = checksum(&raw[..30]);
        if expected != computed {
            return Err(FrameError::ChecksumMismatch { expected, computed });
        }

        let word = |i: usize| u16::from_be_bytes([raw[4 + 2 * i], raw[5 + 2 * i]]);
        Ok(Self {
            pm_cf1: [word(0), word(1), word(2)],
            pm_atm: [word(3), word(4), word(5)],
            particle_counts: [word(6), word(7), word(8), word(9), word(10), word(11)],
        })
    }

    /// Atmospheric-environment mass concentrations.
    pub fn atmospheric(&self) -> ParticulateReading {
        ParticulateReading {
            pm1_0: self.pm_atm[0] as f32,
            pm2_5: self.pm_atm[1] as f32,
            pm10_0: self.pm_atm[2] as f32,
        }
    }

    /// Serialise to wire format (used by simulators and tests).
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut raw = [0u8; FRAME_LEN];
        raw[0] = START_1;
        raw[1] = START_2;
        raw[2..4].copy_from_slice(&FRAME_BODY_LEN.to_be_bytes());
        let words = self
            .pm_cf1
            .iter()
            .chain(&self.pm_atm)
            .chain(&self.particle_counts);
        for (i, w) in words.enumerate() {
            raw[4 + 2 * i..6 + 2 * i].copy_from_slice(&w.to_be_bytes());
        }
        // Word 12 is reserved and left zero.
        let sum = checksum(&raw[..30]);
        raw[30..].copy_from_slice(&sum.to_be_bytes());
        raw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    BadHeader,
    BadLength(u16),
    ChecksumMismatch { expected: u16, computed: u16 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadHeader => write!(f, "bad frame header"),
            Self::BadLength(len) => write!(f, "bad frame length {}", len),
            Self::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum mismatch (frame 0x{:04X}, computed 0x{:04X})",
                expected, computed
            ),
        }
    }
}

/// Decoder state machine.
enum DecoderState {
    /// Hunting for the first start byte.
    Sync,
    /// Got 0x42, expecting 0x4D.
    SyncSecond,
    /// Header matched, collecting the rest of the frame.
    Body { collected: usize },
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    state: DecoderState,
    buf: [u8; FRAME_LEN],
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Sync,
            buf: [0; FRAME_LEN],
        }
    }

    /// Feed one byte.  Returns `Some` once a frame is complete, either
    /// decoded or rejected; the decoder then hunts for the next header.
    pub fn feed_byte(&mut self, byte: u8) -> Option<Result<PmsFrame, FrameError>> {
        match &mut self.state {
            DecoderState::Sync => {
                if byte == START_1 {
                    self.state = DecoderState::SyncSecond;
                }
                None
            }
            DecoderState::SyncSecond => {
                self.state = match byte {
                    START_2 => {
                        self.buf[0] = START_1;
                        self.buf[1] = START_2;
                        DecoderState::Body { collected: 2 }
                    }
                    START_1 => DecoderState::SyncSecond,
                    _ => DecoderState::Sync,
                };
                None
            }
            DecoderState::Body { collected } => {
                self.buf[*collected] = byte;
                *collected += 1;

                if *collected == 4 {
                    let len = u16::from_be_bytes([self.buf[2], self.buf[3]]);
                    if len != FRAME_BODY_LEN {
                        self.state = DecoderState::Sync;
                        return Some(Err(FrameError::BadLength(len)));
                    }
                }

                if *collected == FRAME_LEN {
                    self.state = DecoderState::Sync;
                    return Some(PmsFrame::parse(&self.buf));
                }
                None
            }
        }
    }

    /// Reset decoder state (e.g. before a fresh request).
    pub fn reset(&mut self) {
        self.state = DecoderState::Sync;
    }
}

/// Passive-mode PMS5003 driver over any [`SerialPort`].
pub struct Pms5003<S, C> {
    serial: S,
    clock: C,
    decoder: FrameDecoder,
}

impl<S: SerialPort, C: Clock> Pms5003<S, C> {
    pub fn new(serial: S, clock: C) -> Self {
        Self {
            serial,
            clock,
            decoder: FrameDecoder::new(),
        }
    }

    pub fn send(&mut self, command: Command) -> Result<(), SerialError> {
        self.serial.write_all(&command.encode())
    }

    /// Request one frame and wait up to `timeout_ms` for a valid one.
    /// Malformed frames are skipped; `None` means timeout or a UART error.
    pub fn read_frame(&mut self, timeout_ms: u32) -> Option<PmsFrame> {
        self.decoder.reset();
        if let Err(e) = self.send(Command::RequestRead) {
            warn!("PMS5003: request failed: {}", e);
            return None;
        }

        let start = self.clock.uptime_ms();
        let mut chunk = [0u8; FRAME_LEN];
        loop {
            let elapsed = self.clock.uptime_ms().saturating_sub(start);
            if elapsed >= timeout_ms as u64 {
                warn!("PMS5003: no frame within {} ms", timeout_ms);
                return None;
            }
            let remaining = (timeout_ms as u64 - elapsed) as u32;

            let n = match self.serial.read(&mut chunk, remaining) {
                Ok(0) => {
                    warn!("PMS5003: no frame within {} ms", timeout_ms);
                    return None;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!("PMS5003: {}", e);
                    return None;
                }
            };

            for &byte in &chunk[..n] {
                match self.decoder.feed_byte(byte) {
                    Some(Ok(frame)) => {
                        debug!("PMS5003: {:?}", frame);
                        return Some(frame);
                    }
                    // Command ACKs and line glitches; keep hunting until the deadline.
                    Some(Err(e)) => debug!("PMS5003: skipped ({})", e),
                    None => {}
                }
            }
        }
    }

    /// Release the underlying serial port (tests inspect what was sent).
    pub fn into_inner(self) -> (S, C) {
        (self.serial, self.clock)
    }
}

impl<S: SerialPort, C: Clock> ParticulatePort for Pms5003<S, C> {
    fn prepare(&mut self) -> Result<(), SerialError> {
        self.send(Command::PassiveMode)?;
        self.send(Command::WakeUp)
    }

    fn read_particulates(&mut self, timeout_ms: u32) -> Option<ParticulateReading> {
        self.read_frame(timeout_ms).map(|f| f.atmospheric())
    }
}
