use std::collections::VecDeque;

use ac_ffmpeg::codec::Decoder;
use ac_ffmpeg::codec::video::{VideoDecoder, VideoFrame};
use ac_ffmpeg::packet::Packet;
use ac_ffmpeg::time::Timestamp;

use crate::error::PlayerError;
use crate::media::{MediaSource, PtsCandidates};
use crate::playback::{FrameDecoder, TimedFrame};

/// Decoded frame together with its timestamp candidates.
pub struct DecodedFrame {
    pub frame: VideoFrame,
    pub candidates: PtsCandidates,
}

/// Video decoder wrapper.
///
/// FFmpeg reports the reordered PTS on the frame itself; the decode-order
/// candidate comes from the DTS values of submitted packets, popped as
/// frames come out. The best-effort candidate falls back to decode order
/// when the reordered timestamp is missing.
pub struct StreamDecoder {
    decoder: VideoDecoder,
    pending_dts: VecDeque<Option<i64>>,
    flushed: bool,
}

impl StreamDecoder {
    pub fn from_source(source: &MediaSource) -> Result<Self, PlayerError> {
        let decoder = VideoDecoder::from_stream(source.selected_stream())
            .map_err(|err| PlayerError::setup("creating video decoder", err))?
            .build()
            .map_err(|err| PlayerError::setup("opening video decoder", err))?;

        Ok(Self {
            decoder,
            pending_dts: VecDeque::new(),
            flushed: false,
        })
    }

    /// Submit one packet; `None` means the decoder buffered it without
    /// producing a picture.
    pub fn decode(&mut self, packet: Packet) -> Result<Option<DecodedFrame>, PlayerError> {
        self.pending_dts.push_back(raw_timestamp(packet.dts()));

        self.decoder
            .push(packet)
            .map_err(|err| PlayerError::playback(format!("submitting packet: {err}")))?;

        self.take_frame()
    }

    /// Submit a flush packet; `None` means the decoder is fully drained.
    pub fn drain(&mut self) -> Result<Option<DecodedFrame>, PlayerError> {
        if !self.flushed {
            self.decoder
                .flush()
                .map_err(|err| PlayerError::playback(format!("flushing decoder: {err}")))?;
            self.flushed = true;
        }

        self.take_frame()
    }

    fn take_frame(&mut self) -> Result<Option<DecodedFrame>, PlayerError> {
        match self.decoder.take() {
            Ok(Some(frame)) => {
                let reordered = raw_timestamp(frame.pts());
                let decode_order = self.pending_dts.pop_front().flatten();

                let candidates = PtsCandidates {
                    best_effort: reordered.or(decode_order),
                    reordered,
                    decode_order,
                };

                Ok(Some(DecodedFrame { frame, candidates }))
            }
            Ok(None) => Ok(None),
            Err(err) => Err(PlayerError::playback(format!("decoding frame: {err}"))),
        }
    }
}

impl TimedFrame for DecodedFrame {
    fn timestamps(&self) -> PtsCandidates {
        self.candidates
    }
}

impl FrameDecoder for StreamDecoder {
    type Packet = Packet;
    type Frame = DecodedFrame;

    fn decode(&mut self, packet: Packet) -> Result<Option<DecodedFrame>, PlayerError> {
        StreamDecoder::decode(self, packet)
    }

    fn drain(&mut self) -> Result<Option<DecodedFrame>, PlayerError> {
        StreamDecoder::drain(self)
    }
}

fn raw_timestamp(ts: Timestamp) -> Option<i64> {
    if ts.is_null() {
        None
    } else {
        Some(ts.timestamp())
    }
}
