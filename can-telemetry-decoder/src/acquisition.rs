//! Acquisition loop
//!
//! Drives the pipeline: receive a frame (blocking with timeout), decode it,
//! fold the decoded signals into the telemetry state, and commit a snapshot
//! copy. One cycle walks Idle -> Receiving -> Decoding -> Persisting and
//! back to Idle; a bus-level error detours through a fixed backoff pause
//! instead, so a dead bus cannot spin the loop tight.
//!
//! A receive timeout is not an error - the cycle skips decoding and
//! persists the unchanged snapshot, so pollers keep seeing a fresh commit
//! even on a quiet bus. Shutdown is cooperative: the flag is observed at
//! cycle boundaries, and the in-flight cycle (including its commit) always
//! completes, so termination never leaves a partial snapshot behind.

use crate::codec::SignalCodec;
use crate::signals::SignalCatalog;
use crate::snapshot::SnapshotWriter;
use crate::state::TelemetryState;
use crate::types::{RawFrame, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Source of raw CAN frames
///
/// The seam between the acquisition loop and the bus driver. The daemon
/// implements it over SocketCAN; tests implement it with scripted frames.
pub trait FrameSource {
    /// Block until a frame arrives or the timeout elapses
    ///
    /// `Ok(None)` means the timeout elapsed with no frame - not an error.
    /// `Err` is a bus-level fault and triggers the loop's error backoff.
    fn recv(&mut self, timeout: Duration) -> Result<Option<RawFrame>>;
}

/// Timing policy for the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum time to block waiting for a frame per cycle
    pub recv_timeout: Duration,
    /// Fixed pause after a bus-level error
    pub error_backoff: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            recv_timeout: Duration::from_secs(10),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// The single-threaded acquisition pipeline
///
/// Owns the bus handle, the telemetry state, and the snapshot writer;
/// nothing else mutates them, so no locking is involved.
pub struct AcquisitionLoop<S: FrameSource> {
    source: S,
    catalog: SignalCatalog,
    state: TelemetryState,
    writer: SnapshotWriter,
    config: LoopConfig,
}

impl<S: FrameSource> AcquisitionLoop<S> {
    /// Assemble the pipeline
    pub fn new(source: S, catalog: SignalCatalog, writer: SnapshotWriter, config: LoopConfig) -> Self {
        Self {
            source,
            catalog,
            state: TelemetryState::new(),
            writer,
            config,
        }
    }

    /// Run until `running` is cleared
    ///
    /// All faults except startup belong to the loop and are recovered
    /// locally, so this only returns after a graceful shutdown request.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        log::info!(
            "Acquisition loop started ({} signals on {} frame IDs, snapshot -> {:?})",
            self.catalog.num_signals(),
            self.catalog.frame_ids().len(),
            self.writer.path()
        );

        while running.load(Ordering::SeqCst) {
            self.cycle();
        }

        log::info!("Acquisition loop stopped");
        Ok(())
    }

    /// One Idle -> Receiving -> Decoding -> Persisting cycle
    fn cycle(&mut self) {
        match self.source.recv(self.config.recv_timeout) {
            Ok(Some(frame)) => self.decode_into_state(&frame),
            Ok(None) => {
                log::debug!("Receive timeout, no new data this cycle");
            }
            Err(e) => {
                // ErrorBackoff: log, pause, back to Idle without persisting
                log::error!("Bus error: {}", e);
                std::thread::sleep(self.config.error_backoff);
                return;
            }
        }

        if let Err(e) = self.writer.commit(&self.state.snapshot()) {
            // Previous snapshot stays authoritative on disk
            log::error!("Snapshot commit failed: {}", e);
        }
    }

    /// Apply every successfully decoded signal; faulted signals keep their
    /// previous value
    fn decode_into_state(&mut self, frame: &RawFrame) {
        log::debug!("Received frame ID 0x{:X} ({} bytes)", frame.can_id, frame.dlc());
        for read in SignalCodec::new(&self.catalog).decode(frame) {
            match read.value {
                Ok(value) => self.state.apply(&read.name, value),
                Err(e) => log::warn!("Decode fault: {}", e),
            }
        }
    }

    /// Current telemetry values (for inspection and tests)
    pub fn snapshot(&self) -> crate::state::TelemetrySnapshot {
        self.state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{FRAME_ENGINE_TEMPS, FRAME_FUEL_LEVEL};
    use crate::snapshot::SnapshotSchema;
    use crate::types::TelemetryError;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    /// Scripted frame source; clears the shared flag once the script is
    /// exhausted so `run` terminates.
    struct ScriptedSource {
        script: VecDeque<Result<Option<RawFrame>>>,
        running: Arc<AtomicBool>,
    }

    impl FrameSource for ScriptedSource {
        fn recv(&mut self, _timeout: Duration) -> Result<Option<RawFrame>> {
            match self.script.pop_front() {
                Some(step) => {
                    if self.script.is_empty() {
                        self.running.store(false, Ordering::SeqCst);
                    }
                    step
                }
                None => {
                    self.running.store(false, Ordering::SeqCst);
                    Ok(None)
                }
            }
        }
    }

    fn run_script(
        script: Vec<Result<Option<RawFrame>>>,
    ) -> (crate::state::TelemetrySnapshot, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.csv");
        let running = Arc::new(AtomicBool::new(true));
        let source = ScriptedSource {
            script: script.into(),
            running: running.clone(),
        };
        let writer = SnapshotWriter::new(&path, SnapshotSchema::Celsius);
        let config = LoopConfig {
            recv_timeout: Duration::from_millis(1),
            error_backoff: Duration::from_millis(1),
        };
        let mut pipeline = AcquisitionLoop::new(source, SignalCatalog::default(), writer, config);
        pipeline.run(&running).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        (pipeline.snapshot(), contents)
    }

    #[test]
    fn test_frames_flow_into_snapshot_file() {
        let (snapshot, contents) = run_script(vec![
            Ok(Some(RawFrame::new(
                FRAME_ENGINE_TEMPS,
                &[0x0A, 0xB2, 0, 0, 0, 0, 0x0A, 0xA0],
            ))),
            Ok(Some(RawFrame::new(FRAME_FUEL_LEVEL, &[0x01, 0x90, 0, 0, 0, 0, 0, 0]))),
        ]);

        assert_eq!(snapshot.num_known(), 3);
        assert!(contents.ends_with("0.65,-1.15,10.57,,\r\n"));
    }

    #[test]
    fn test_timeout_persists_unchanged_snapshot() {
        let (snapshot, contents) = run_script(vec![
            Ok(Some(RawFrame::new(FRAME_FUEL_LEVEL, &[0x01, 0x90, 0, 0, 0, 0, 0, 0]))),
            Ok(None),
        ]);

        let gallons = snapshot.get("fuel_level_gallons").as_f64().unwrap();
        assert!((gallons - 10.56688).abs() < 1e-6);
        assert!(contents.ends_with(",,10.57,,\r\n"));
    }

    #[test]
    fn test_bus_error_backs_off_and_recovers() {
        let (snapshot, _) = run_script(vec![
            Err(TelemetryError::Bus("controller restarted".to_string())),
            Ok(Some(RawFrame::new(FRAME_FUEL_LEVEL, &[0x00, 0x64, 0, 0, 0, 0, 0, 0]))),
        ]);

        // 100 deci-liters = 10 L
        let gallons = snapshot.get("fuel_level_gallons").as_f64().unwrap();
        assert!((gallons - 10.0 * 0.264172).abs() < 1e-6);
    }

    #[test]
    fn test_unrecognized_id_leaves_state_untouched() {
        let (snapshot, contents) = run_script(vec![Ok(Some(RawFrame::new(0x372, &[0xFF; 8])))]);
        assert_eq!(snapshot.num_known(), 0);
        assert!(contents.ends_with(",,,,\r\n"));
    }

    #[test]
    fn test_short_frame_keeps_prior_value() {
        let (snapshot, _) = run_script(vec![
            Ok(Some(RawFrame::new(
                FRAME_ENGINE_TEMPS,
                &[0x0A, 0xB2, 0, 0, 0, 0, 0x0A, 0xA0],
            ))),
            // Too short for the oil field; coolant still updates
            Ok(Some(RawFrame::new(FRAME_ENGINE_TEMPS, &[0x0B, 0x54]))),
        ]);

        let coolant = snapshot.get("coolant_temp_celsius").as_f64().unwrap();
        let oil = snapshot.get("oil_temp_celsius").as_f64().unwrap();
        assert!((coolant - (2900.0 / 10.0 - 273.15)).abs() < 1e-9);
        assert!((oil - (-1.15)).abs() < 1e-9, "oil must keep its prior value");
    }
}
