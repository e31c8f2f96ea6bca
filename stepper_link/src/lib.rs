/*!
# Stepper Link

Streams motion commands from a GCode file to a stepper-driver controller
over a serial link, one frame at a time, each paced by a single-byte
acknowledgment.

## Core Types

- [`Position`] - Fixed-point X/Y/Z target
- [`Frame`] - Wire encoding of a position
- [`Transport`] - Byte channel to the controller
- [`AckWaiter`] - Bounded, cancellable wait for the ACK byte
- [`AbortFlag`] - Write-once operator stop request
- [`Dispatcher`] - The send/wait loop over a whole file

## Modules

- [`gcode`] - Motion line recognition
- [`frame`] - Frame encoding and decoding
- [`transport`] - Transport trait and serial port implementation
- [`ack`] - Acknowledgment waiting
- [`abort`] - Stop flag and operator stop sources
- [`dispatch`] - Dispatch loop
- [`sim`] - In-process simulated controller
- [`report`] - Run outcome and summary
- [`settings`] - Timing settings
- [`position`] - Fixed-point coordinates
- [`error`] - Error types
*/

pub mod abort;
pub mod ack;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod gcode;
pub mod position;
pub mod report;
pub mod settings;
pub mod sim;
pub mod transport;

// Re-export commonly used types
pub use abort::{spawn_stop_watcher, AbortFlag, ConsoleStopSource, StopSource};
pub use ack::{AckOutcome, AckWaiter};
pub use dispatch::Dispatcher;
pub use error::{Result, SenderError};
pub use frame::Frame;
pub use gcode::parse_line;
pub use position::{Axis, Position, Sign};
pub use report::{DispatchState, RunOutcome, RunReport};
pub use settings::TimingSettings;
pub use sim::{channel_pair, ChannelTransport, SimulatedController, SimulatorSettings};
pub use transport::{SerialConfig, SerialTransport, Transport};

/// Protocol constants
pub mod protocol {
    use std::time::Duration;

    /// Coordinates are sent as integers in thousandths of a unit
    pub const SCALE_FACTOR: i64 = 1000;

    /// The controller's "frame accepted" reply
    pub const ACK_BYTE: u8 = 0xAA;

    /// Time the controller has to acknowledge a frame
    pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Longest single read while waiting for an ACK
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Delay between an ACK and the next command
    pub const PACING_DELAY: Duration = Duration::from_millis(500);

    /// Serial baud rate used when none is configured
    pub const DEFAULT_BAUD_RATE: u32 = 9600;
}
