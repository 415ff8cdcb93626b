//! Signal catalog: the frame-to-signal wire contract
//!
//! A [`SignalSpec`] describes how one telemetry signal is packed into a CAN
//! frame: which arbitration ID carries it, which payload bytes to read, in
//! which byte order, and how to convert the raw integer into engineering
//! units. The [`SignalCatalog`] groups the specs by frame ID and is fixed at
//! startup - it is configuration, not derived data.
//!
//! # Default wire layout (rev B)
//!
//! | frame ID | bytes | order | encoding          | output name            |
//! |----------|-------|-------|-------------------|------------------------|
//! | `0x3E0`  | 0..2  | BE    | u16 deci-Kelvin   | `coolant_temp_celsius` |
//! | `0x3E0`  | 6..8  | BE    | u16 deci-Kelvin   | `oil_temp_celsius`     |
//! | `0x3E2`  | 0..2  | BE    | u16 deci-liters   | `fuel_level_gallons`   |
//! | `0x3E4`  | 7     | -     | bit 7             | `abs_error`            |
//! | `0x3E4`  | 7     | -     | bit 6             | `check_engine`         |
//!
//! The layout is a hardware/firmware contract and cannot be derived from the
//! frames themselves. Deployments on firmware with a different layout
//! replace the whole table through configuration instead of editing code:
//! a wrong byte order still yields a valid (wrong) integer, so there is no
//! runtime error to catch it.

use crate::types::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coolant and oil temperature frame
pub const FRAME_ENGINE_TEMPS: u32 = 0x3E0;
/// Fuel level frame
pub const FRAME_FUEL_LEVEL: u32 = 0x3E2;
/// ABS error and check-engine light frame
pub const FRAME_FAULT_FLAGS: u32 = 0x3E4;

/// 1 liter = 0.264172 US gallons
pub const LITERS_TO_GALLONS: f64 = 0.264172;

/// Byte order for multi-byte signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Big-endian (Motorola format)
    BigEndian,
    /// Little-endian (Intel format)
    LittleEndian,
}

/// Physical interpretation of a signal
///
/// The kind selects both the field width in the payload and the
/// `SignalValue` variant the codec produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// 2-byte unsigned field, scaled to degrees Celsius
    Temperature,
    /// 2-byte unsigned field, scaled to US gallons
    Volume,
    /// 1-byte field tested against `bit_mask`
    Flag,
}

impl SignalKind {
    /// Number of payload bytes this kind of signal occupies
    pub fn width(&self) -> usize {
        match self {
            SignalKind::Temperature | SignalKind::Volume => 2,
            SignalKind::Flag => 1,
        }
    }
}

/// Extraction and conversion rules for one telemetry signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    /// Arbitration ID of the frame carrying this signal
    pub frame_id: u32,
    /// Output name (also the snapshot column name)
    pub name: String,
    /// Physical interpretation (selects field width and value variant)
    pub kind: SignalKind,
    /// First payload byte of the field
    pub start_byte: usize,
    /// Byte order for multi-byte fields
    #[serde(default = "default_byte_order")]
    pub byte_order: ByteOrder,
    /// Bit mask for flag signals (required for `kind = "flag"`)
    #[serde(default)]
    pub bit_mask: Option<u8>,
    /// Scale factor applied to the raw integer
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Offset added after scaling
    #[serde(default)]
    pub offset: f64,
    /// Engineering unit, for diagnostics
    #[serde(default)]
    pub unit: Option<String>,
}

fn default_byte_order() -> ByteOrder {
    ByteOrder::BigEndian
}

fn default_scale() -> f64 {
    1.0
}

impl SignalSpec {
    /// Payload byte range this signal reads
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start_byte..self.start_byte + self.kind.width()
    }
}

/// Read-only table of signal specs, grouped by arbitration ID
///
/// One frame ID maps to 1..N specs (e.g. `0x3E0` carries both coolant and
/// oil temperature at disjoint byte offsets).
#[derive(Debug, Clone)]
pub struct SignalCatalog {
    /// Specs keyed by frame ID, in declaration order within each frame
    by_frame: HashMap<u32, Vec<SignalSpec>>,
    /// Total number of specs
    num_signals: usize,
}

impl SignalCatalog {
    /// Build a catalog from a list of specs, validating it
    ///
    /// Rejects empty tables, duplicate output names, and flag specs without
    /// a bit mask - a catalog that passes here decodes without surprises.
    pub fn from_specs(specs: Vec<SignalSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(TelemetryError::InvalidCatalog(
                "catalog contains no signals".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.clone()) {
                return Err(TelemetryError::InvalidCatalog(format!(
                    "duplicate signal name '{}'",
                    spec.name
                )));
            }
            if spec.kind == SignalKind::Flag && spec.bit_mask.is_none() {
                return Err(TelemetryError::InvalidCatalog(format!(
                    "flag signal '{}' has no bit_mask",
                    spec.name
                )));
            }
            if spec.byte_range().end > 8 {
                return Err(TelemetryError::InvalidCatalog(format!(
                    "signal '{}' reads bytes {:?}, beyond the 8-byte CAN payload",
                    spec.name,
                    spec.byte_range()
                )));
            }
        }

        let num_signals = specs.len();
        let mut by_frame: HashMap<u32, Vec<SignalSpec>> = HashMap::new();
        for spec in specs {
            by_frame.entry(spec.frame_id).or_default().push(spec);
        }

        Ok(Self {
            by_frame,
            num_signals,
        })
    }

    /// Get all specs carried by a given frame ID
    pub fn specs_for(&self, can_id: u32) -> Option<&[SignalSpec]> {
        self.by_frame.get(&can_id).map(|v| v.as_slice())
    }

    /// All arbitration IDs in the catalog, sorted (for bus filter setup)
    pub fn frame_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.by_frame.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Total number of signal specs
    pub fn num_signals(&self) -> usize {
        self.num_signals
    }

    /// The authoritative rev-B wire layout (see module docs)
    pub fn rev_b() -> Self {
        let specs = vec![
            SignalSpec {
                frame_id: FRAME_ENGINE_TEMPS,
                name: "coolant_temp_celsius".to_string(),
                kind: SignalKind::Temperature,
                start_byte: 0,
                byte_order: ByteOrder::BigEndian,
                bit_mask: None,
                // raw is deci-Kelvin
                scale: 0.1,
                offset: -273.15,
                unit: Some("°C".to_string()),
            },
            SignalSpec {
                frame_id: FRAME_ENGINE_TEMPS,
                name: "oil_temp_celsius".to_string(),
                kind: SignalKind::Temperature,
                start_byte: 6,
                byte_order: ByteOrder::BigEndian,
                bit_mask: None,
                scale: 0.1,
                offset: -273.15,
                unit: Some("°C".to_string()),
            },
            SignalSpec {
                frame_id: FRAME_FUEL_LEVEL,
                name: "fuel_level_gallons".to_string(),
                kind: SignalKind::Volume,
                start_byte: 0,
                byte_order: ByteOrder::BigEndian,
                bit_mask: None,
                // raw is deci-liters, converted straight to gallons
                scale: 0.1 * LITERS_TO_GALLONS,
                offset: 0.0,
                unit: Some("gal".to_string()),
            },
            SignalSpec {
                frame_id: FRAME_FAULT_FLAGS,
                name: "abs_error".to_string(),
                kind: SignalKind::Flag,
                start_byte: 7,
                byte_order: ByteOrder::BigEndian,
                bit_mask: Some(0b1000_0000),
                scale: 1.0,
                offset: 0.0,
                unit: None,
            },
            SignalSpec {
                frame_id: FRAME_FAULT_FLAGS,
                name: "check_engine".to_string(),
                kind: SignalKind::Flag,
                start_byte: 7,
                byte_order: ByteOrder::BigEndian,
                bit_mask: Some(0b0100_0000),
                scale: 1.0,
                offset: 0.0,
                unit: None,
            },
        ];

        Self::from_specs(specs).expect("built-in catalog is valid")
    }
}

impl Default for SignalCatalog {
    fn default() -> Self {
        Self::rev_b()
    }
}
