//! EmonDmon power meter poller.
//!
//! Reads voltage, current, power, frequency and power factor from an
//! EmonDmon meter over Modbus TCP. Each measurement is an IEEE-754 float
//! held in two consecutive holding registers, high word first.
//!
//! # Reading order
//!
//! ```text
//! Selection -> measurement ids -> register address -> read 2 registers -> f32
//! ```
//!
//! Reads are strictly sequential over one connection per poll, with
//! [`poller::READ_PACING`] between consecutive reads.

pub mod catalog;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod poller;
pub mod render;

pub use catalog::{GraphId, RegisterAddress};
pub use client::{DeviceClient, ModbusDevice};
pub use config::{DeviceConfig, PollConfig, Selection};
pub use decode::{RawRegisterPair, decode};
pub use error::PollerError;
pub use poller::{MeasurementReading, PollReport, Poller, poll_device};
