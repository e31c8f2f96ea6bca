/*!
In-process controller simulation.

[`channel_pair`] connects a [`ChannelTransport`] to a [`ControllerEnd`]
through `crossbeam` channels. [`SimulatedController`] drives the controller
end on its own thread: it decodes every frame it receives and answers with
an ACK, which lets the sender run without hardware.
*/

use crate::error::{Result, SenderError};
use crate::frame::Frame;
use crate::protocol::ACK_BYTE;
use crate::transport::Transport;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sender side of an in-process link
pub struct ChannelTransport {
    outbound: Option<Sender<Vec<u8>>>,
    inbound: Receiver<u8>,
}

/// Controller side of an in-process link
pub struct ControllerEnd {
    /// Raw writes from the sender, one message per `write` call
    pub frames: Receiver<Vec<u8>>,
    /// Bytes for the sender to read back
    pub replies: Sender<u8>,
}

/// Create a connected transport/controller pair
pub fn channel_pair() -> (ChannelTransport, ControllerEnd) {
    let (frame_tx, frame_rx) = unbounded();
    let (reply_tx, reply_rx) = unbounded();
    (
        ChannelTransport {
            outbound: Some(frame_tx),
            inbound: reply_rx,
        },
        ControllerEnd {
            frames: frame_rx,
            replies: reply_tx,
        },
    )
}

impl Transport for ChannelTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| SenderError::connection("channel transport is closed"))?;
        outbound
            .send(bytes.to_vec())
            .map_err(|_| SenderError::connection("controller hung up"))
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        match self.inbound.recv_timeout(timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SenderError::connection("controller hung up")),
        }
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the sender lets the controller thread see the hang-up
        self.outbound.take();
        Ok(())
    }
}

/// Behavior of the simulated controller
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Time the controller takes before acknowledging a frame
    pub ack_latency: Duration,

    /// Stop acknowledging after this many frames
    pub ack_limit: Option<usize>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            ack_latency: Duration::from_millis(20),
            ack_limit: None,
        }
    }
}

/// A stepper controller stand-in running on its own thread
pub struct SimulatedController {
    handle: JoinHandle<usize>,
}

impl SimulatedController {
    /// Start serving `end`. The thread exits once the sender closes its side.
    pub fn spawn(end: ControllerEnd, settings: SimulatorSettings) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("sim-controller".to_string())
            .spawn(move || Self::serve(end, settings))?;
        Ok(Self { handle })
    }

    /// Wait for the controller to finish and return how many frames it accepted
    pub fn join(self) -> usize {
        self.handle.join().unwrap_or_else(|_| {
            warn!("Simulated controller thread panicked");
            0
        })
    }

    fn serve(end: ControllerEnd, settings: SimulatorSettings) -> usize {
        info!("🧪 Simulated controller ready");
        let mut accepted = 0usize;

        for raw in end.frames.iter() {
            match Frame::decode(&raw) {
                Ok(position) => {
                    accepted += 1;
                    info!("🧪 Controller moving to {} (frame {})", position, accepted);
                }
                Err(e) => {
                    warn!("🧪 Controller rejected frame: {}", e);
                    continue;
                }
            }

            if settings.ack_limit.is_some_and(|limit| accepted > limit) {
                debug!("🧪 ACK limit reached, staying silent");
                continue;
            }

            thread::sleep(settings.ack_latency);
            if end.replies.send(ACK_BYTE).is_err() {
                break;
            }
        }

        info!("🧪 Simulated controller stopped after {} frames", accepted);
        accepted
    }
}
