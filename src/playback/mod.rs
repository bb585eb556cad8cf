//! Clock-driven decode and present loop.
//!
//! The session is generic over its collaborators so the pacing logic can be
//! exercised with synthetic sources and sinks.

use crate::error::PlayerError;
use crate::media::PtsCandidates;

mod clock;
mod session;

pub use clock::PlaybackClock;
pub use session::{PlaybackSession, SessionReport};

/// Source of demuxed packets from one container.
pub trait PacketSource {
    type Packet;

    /// Next packet; `None` once the source is exhausted. Any other failure
    /// aborts the session.
    fn next_packet(&mut self) -> Result<Option<Self::Packet>, PlayerError>;

    /// Whether the packet belongs to the selected video stream.
    fn is_selected(&self, packet: &Self::Packet) -> bool;
}

/// Decoder turning packets into frames, with an end-of-stream drain mode.
pub trait FrameDecoder {
    type Packet;
    type Frame: TimedFrame;

    /// Submit one packet; `None` means no picture was produced.
    fn decode(&mut self, packet: Self::Packet) -> Result<Option<Self::Frame>, PlayerError>;

    /// Submit a flush packet; `None` means the decoder is fully drained.
    fn drain(&mut self) -> Result<Option<Self::Frame>, PlayerError>;
}

/// Decoded frames expose their timestamp candidates for policy selection.
pub trait TimedFrame {
    fn timestamps(&self) -> PtsCandidates;
}

/// Converts a decoded frame into the fixed display pixel layout.
pub trait FrameConverter {
    type In;
    type Out;

    /// Convert one frame. The output may borrow converter-owned storage
    /// that is reused across frames.
    fn convert(&mut self, frame: &Self::In) -> Result<&Self::Out, PlayerError>;
}

/// Display sink with a near-zero-latency cancel check.
pub trait Presenter {
    type Frame;

    fn present(&mut self, frame: &Self::Frame) -> Result<(), PlayerError>;

    /// Poll for a user-cancel event without blocking.
    fn poll_cancel(&mut self) -> bool;
}
