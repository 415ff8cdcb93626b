//! Core types for the CAN telemetry decoder library
//!
//! This module defines the types that flow through the acquisition pipeline:
//! raw frames as received from the bus, decoded signal values, and the
//! library error taxonomy.

use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Raw CAN frame as received from the bus
///
/// This represents a single received frame before any signal decoding.
/// Produced once per received frame and discarded after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// CAN arbitration ID (11-bit or 29-bit)
    pub can_id: u32,
    /// Frame payload bytes (0-8 bytes for classic CAN)
    pub data: Vec<u8>,
    /// True if this is an extended (29-bit) CAN ID
    pub is_extended: bool,
}

impl RawFrame {
    /// Create a standard-ID frame from a payload slice
    pub fn new(can_id: u32, data: &[u8]) -> Self {
        Self {
            can_id,
            data: data.to_vec(),
            is_extended: can_id > 0x7FF,
        }
    }

    /// Get the data length code (DLC) - number of payload bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// Errors that can occur during acquisition, decoding, or persistence
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Signal '{signal}' needs payload bytes {start}..{end} but frame has {dlc}")]
    ShortPayload {
        signal: String,
        start: usize,
        end: usize,
        dlc: usize,
    },

    #[error("Snapshot commit failed: {0}")]
    Persist(String),

    #[error("Invalid signal catalog: {0}")]
    InvalidCatalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded telemetry value in engineering units
///
/// Every field starts out `Unknown` and stays that way until the first
/// frame carrying it is decoded, so "no data yet" is distinguishable from
/// a measured zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalValue {
    /// Temperature in degrees Celsius
    Temperature(f64),
    /// Volume in US gallons
    Volume(f64),
    /// Boolean fault flag
    Flag(bool),
    /// Not yet received
    Unknown,
}

impl SignalValue {
    /// Numeric payload, if this value carries one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Temperature(v) | SignalValue::Volume(v) => Some(*v),
            SignalValue::Flag(v) => Some(if *v { 1.0 } else { 0.0 }),
            SignalValue::Unknown => None,
        }
    }

    /// True if a value has been received for this field
    pub fn is_known(&self) -> bool {
        !matches!(self, SignalValue::Unknown)
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Temperature(v) | SignalValue::Volume(v) => write!(f, "{:.2}", v),
            SignalValue::Flag(v) => write!(f, "{}", if *v { "True" } else { "False" }),
            SignalValue::Unknown => Ok(()),
        }
    }
}

/// One signal's decode outcome for a single frame
///
/// A short payload produces an `Err` for that signal only; the other
/// signals carried by the same frame decode independently.
#[derive(Debug)]
pub struct SignalRead {
    /// Output name of the signal (snapshot column name)
    pub name: String,
    /// Decoded value, or the per-signal decode fault
    pub value: Result<SignalValue>,
}
