//! SocketCAN frame source
//!
//! Thin OS glue between the Linux SocketCAN subsystem and the decoder
//! library's [`FrameSource`] seam. Opens the interface, installs one
//! arbitration-ID filter per catalog frame, and maps the socket's timeout
//! errors to the loop's "no new data this cycle" outcome.
//!
//! Bitrate is configured by system tooling (`ip link set can0 type can
//! bitrate ...`), not here.

use can_telemetry_decoder::{FrameSource, RawFrame, Result, TelemetryError};
use socketcan::{
    CanError as SocketCanError, CanFilter, CanFrame, CanSocket, EmbeddedFrame, Frame, Socket,
    SocketOptions,
};
use std::io::ErrorKind;
use std::time::Duration;

/// Standard-frame arbitration ID mask
const CAN_MASK_STANDARD: u32 = 0x7FF;

/// A live SocketCAN interface, filtered to the catalog's frame IDs
pub struct SocketCanSource {
    socket: CanSocket,
    channel: String,
    read_timeout: Option<Duration>,
}

impl SocketCanSource {
    /// Open an interface and install receive filters
    ///
    /// Any failure here is a startup fault: the caller exits non-zero
    /// before the acquisition loop begins.
    pub fn open(channel: &str, frame_ids: &[u32]) -> Result<Self> {
        let socket = CanSocket::open(channel).map_err(|e| {
            TelemetryError::Bus(format!(
                "failed to open CAN interface '{}': {}",
                channel, e
            ))
        })?;

        let filters: Vec<CanFilter> = frame_ids
            .iter()
            .map(|&id| CanFilter::new(id, CAN_MASK_STANDARD))
            .collect();
        socket.set_filters(filters.as_slice()).map_err(|e| {
            TelemetryError::Bus(format!(
                "failed to install filters on '{}': {}",
                channel, e
            ))
        })?;

        log::info!(
            "CAN interface '{}' open, filtering {} frame IDs",
            channel,
            frame_ids.len()
        );

        Ok(Self {
            socket,
            channel: channel.to_string(),
            read_timeout: None,
        })
    }
}

impl FrameSource for SocketCanSource {
    fn recv(&mut self, timeout: Duration) -> Result<Option<RawFrame>> {
        if self.read_timeout != Some(timeout) {
            self.socket
                .set_read_timeout(timeout)
                .map_err(|e| TelemetryError::Bus(format!("set_read_timeout failed: {}", e)))?;
            self.read_timeout = Some(timeout);
        }

        match self.socket.read_frame() {
            Ok(CanFrame::Data(frame)) => Ok(Some(RawFrame {
                can_id: frame.raw_id(),
                data: frame.data().to_vec(),
                is_extended: frame.is_extended(),
            })),
            Ok(CanFrame::Remote(frame)) => {
                // No payload to decode; treat like an idle cycle
                log::trace!("Ignoring remote frame ID 0x{:X}", frame.raw_id());
                Ok(None)
            }
            Ok(CanFrame::Error(frame)) => Err(TelemetryError::Bus(format!(
                "error frame on '{}': {}",
                self.channel,
                SocketCanError::from(frame)
            ))),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(TelemetryError::Bus(format!(
                "receive on '{}' failed: {}",
                self.channel, e
            ))),
        }
    }
}
