//! CAN Telemetry Decoder Library
//!
//! Decodes periodic broadcast frames from a vehicle CAN bus into
//! engineering-unit telemetry values and persists the latest snapshot to a
//! file that external consumers can poll.
//!
//! # Architecture
//!
//! The pipeline is strictly linear:
//! bus -> acquisition loop -> signal codec -> telemetry state -> snapshot
//! writer -> storage.
//!
//! This library covers the parts with real correctness contracts:
//! - Frame-to-signal decoding with per-signal byte order, scaling, and
//!   offset ([`SignalCodec`], [`SignalCatalog`])
//! - Latest-value state that distinguishes "no data yet" from "measured
//!   zero" ([`TelemetryState`])
//! - All-or-nothing snapshot persistence - a poller never observes a torn
//!   write ([`SnapshotWriter`])
//! - The acquisition cycle with its timeout and backoff policy
//!   ([`AcquisitionLoop`], driven through the [`FrameSource`] trait)
//!
//! The library does NOT:
//! - Open or configure the CAN device (the daemon implements
//!   [`FrameSource`] over SocketCAN)
//! - Transmit frames or reassemble multi-frame (ISO-TP) messages
//! - Keep any history - exactly one latest snapshot exists
//!
//! # Example Usage
//!
//! ```no_run
//! use can_telemetry_decoder::{
//!     AcquisitionLoop, FrameSource, LoopConfig, RawFrame, Result,
//!     SignalCatalog, SnapshotSchema, SnapshotWriter,
//! };
//! use std::sync::atomic::AtomicBool;
//! use std::time::Duration;
//!
//! struct MyBus;
//! impl FrameSource for MyBus {
//!     fn recv(&mut self, _timeout: Duration) -> Result<Option<RawFrame>> {
//!         Ok(None) // timeout
//!     }
//! }
//!
//! let writer = SnapshotWriter::new("telemetry.csv", SnapshotSchema::Celsius);
//! let mut pipeline = AcquisitionLoop::new(
//!     MyBus,
//!     SignalCatalog::default(),
//!     writer,
//!     LoopConfig::default(),
//! );
//! let running = AtomicBool::new(true);
//! pipeline.run(&running).unwrap();
//! ```

// Public modules
pub mod acquisition;
pub mod codec;
pub mod signals;
pub mod snapshot;
pub mod state;
pub mod types;

// Re-export main types for convenience
pub use acquisition::{AcquisitionLoop, FrameSource, LoopConfig};
pub use codec::SignalCodec;
pub use signals::{ByteOrder, SignalCatalog, SignalKind, SignalSpec};
pub use snapshot::{SnapshotSchema, SnapshotWriter};
pub use state::{TelemetrySnapshot, TelemetryState};
pub use types::{RawFrame, Result, SignalRead, SignalValue, TelemetryError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
