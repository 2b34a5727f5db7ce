//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the sampling rules for the AirLogger: the
//! startup sequence, the per-cycle read order and the record formats.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod ports;
pub mod record;
pub mod sample;
pub mod service;
