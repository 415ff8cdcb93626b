//! Atomic snapshot persistence
//!
//! Serializes a [`TelemetrySnapshot`] into a fixed-schema two-line CSV
//! record (header + one data row) and commits it with all-or-nothing
//! visibility: the record is written to a fresh temp file in the target's
//! directory, flushed to durable storage, then renamed onto the target in
//! a single atomic replace. A poller reading the target at any moment sees
//! either the previous complete record or the new complete record, never a
//! truncated or mixed one. If anything fails before the rename, the temp
//! file is discarded and the previous record stays valid.
//!
//! Rendering: floats with fixed 2-decimal precision, flags as
//! `True`/`False`, never-received fields as empty cells. The writer always
//! replaces the whole file; it never appends.

use crate::state::TelemetrySnapshot;
use crate::types::{Result, SignalValue, TelemetryError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Snapshot file schema, fixed once at startup
///
/// The schema is deployment configuration: consumers rely on the exact
/// column set and order, so it is never inferred from existing file
/// contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSchema {
    /// Celsius-only columns
    #[default]
    Celsius,
    /// Adds derived Fahrenheit columns next to each Celsius temperature
    Fahrenheit,
}

/// One snapshot file column: header name, source signal, and conversion
struct Column {
    header: &'static str,
    source: &'static str,
    convert: Conversion,
}

enum Conversion {
    None,
    CelsiusToFahrenheit,
}

const CELSIUS_COLUMNS: &[Column] = &[
    Column {
        header: "coolant_temp_celsius",
        source: "coolant_temp_celsius",
        convert: Conversion::None,
    },
    Column {
        header: "oil_temp_celsius",
        source: "oil_temp_celsius",
        convert: Conversion::None,
    },
    Column {
        header: "fuel_level_gallons",
        source: "fuel_level_gallons",
        convert: Conversion::None,
    },
    Column {
        header: "abs_error",
        source: "abs_error",
        convert: Conversion::None,
    },
    Column {
        header: "check_engine",
        source: "check_engine",
        convert: Conversion::None,
    },
];

const FAHRENHEIT_COLUMNS: &[Column] = &[
    Column {
        header: "coolant_temp_celsius",
        source: "coolant_temp_celsius",
        convert: Conversion::None,
    },
    Column {
        header: "coolant_temp_fahrenheit",
        source: "coolant_temp_celsius",
        convert: Conversion::CelsiusToFahrenheit,
    },
    Column {
        header: "oil_temp_celsius",
        source: "oil_temp_celsius",
        convert: Conversion::None,
    },
    Column {
        header: "oil_temp_fahrenheit",
        source: "oil_temp_celsius",
        convert: Conversion::CelsiusToFahrenheit,
    },
    Column {
        header: "fuel_level_gallons",
        source: "fuel_level_gallons",
        convert: Conversion::None,
    },
    Column {
        header: "abs_error",
        source: "abs_error",
        convert: Conversion::None,
    },
    Column {
        header: "check_engine",
        source: "check_engine",
        convert: Conversion::None,
    },
];

impl SnapshotSchema {
    fn columns(&self) -> &'static [Column] {
        match self {
            SnapshotSchema::Celsius => CELSIUS_COLUMNS,
            SnapshotSchema::Fahrenheit => FAHRENHEIT_COLUMNS,
        }
    }
}

/// Atomic snapshot file writer
#[derive(Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
    schema: SnapshotSchema,
}

impl SnapshotWriter {
    /// Create a writer targeting `path` with a fixed schema
    pub fn new(path: impl Into<PathBuf>, schema: SnapshotSchema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    /// Target path of the persisted snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commit a snapshot with all-or-nothing visibility
    pub fn commit(&self, snapshot: &TelemetrySnapshot) -> Result<()> {
        let staged = self.stage(snapshot)?;
        staged.persist(&self.path).map_err(|e| {
            // persist consumed the temp file; its Drop removed it
            TelemetryError::Persist(format!(
                "atomic replace of {:?} failed: {}",
                self.path, e.error
            ))
        })?;
        log::debug!("Committed snapshot to {:?}", self.path);
        Ok(())
    }

    /// Write the full record to a synced temp file next to the target
    ///
    /// Split from [`commit`](Self::commit) so the crash window between
    /// staging and the atomic replace is testable: dropping the returned
    /// temp file leaves the previously committed artifact untouched.
    fn stage(&self, snapshot: &TelemetrySnapshot) -> Result<NamedTempFile> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(self.render(snapshot).as_bytes())?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    /// Render the two-line record (header + data row)
    fn render(&self, snapshot: &TelemetrySnapshot) -> String {
        let columns = self.schema.columns();
        let header: Vec<&str> = columns.iter().map(|c| c.header).collect();
        let row: Vec<String> = columns
            .iter()
            .map(|c| Self::render_cell(snapshot.get(c.source), &c.convert))
            .collect();
        format!("{}\r\n{}\r\n", header.join(","), row.join(","))
    }

    fn render_cell(value: SignalValue, convert: &Conversion) -> String {
        let value = match (convert, value) {
            (Conversion::CelsiusToFahrenheit, SignalValue::Temperature(c)) => {
                SignalValue::Temperature(c * 9.0 / 5.0 + 32.0)
            }
            (_, v) => v,
        };
        value.to_string()
    }
}
