//! Latest-value telemetry state
//!
//! Holds the most recently decoded value for each signal. Fields never
//! received stay [`SignalValue::Unknown`] rather than defaulting to zero,
//! so a reader can tell "no data yet" from "measured zero". Each `apply`
//! overwrites exactly one field; decoding one frame never touches fields
//! carried by other frames.

use crate::types::SignalValue;
use std::collections::HashMap;

/// A consistent copy of all currently known telemetry values
///
/// Exactly one logical snapshot exists at a time; this type is the
/// independent copy handed to the snapshot writer each acquisition cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    values: HashMap<String, SignalValue>,
}

impl TelemetrySnapshot {
    /// Value for a signal name, `Unknown` if never received
    pub fn get(&self, name: &str) -> SignalValue {
        self.values.get(name).copied().unwrap_or(SignalValue::Unknown)
    }

    /// Number of signals with a known value
    pub fn num_known(&self) -> usize {
        self.values.values().filter(|v| v.is_known()).count()
    }
}

/// Mutable latest-value store, owned exclusively by the acquisition loop
#[derive(Debug, Default)]
pub struct TelemetryState {
    values: HashMap<String, SignalValue>,
}

impl TelemetryState {
    /// Create an empty state (all fields unknown)
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored value for one signal
    pub fn apply(&mut self, name: &str, value: SignalValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Take a consistent, independent copy of the current values
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            values: self.values.clone(),
        }
    }
}
