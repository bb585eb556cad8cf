//! The decode, pace and present loop.

use log::{debug, info};

use crate::error::PlayerError;
use crate::media::{PtsPolicy, Rational};
use crate::playback::clock::PlaybackClock;
use crate::playback::{FrameConverter, FrameDecoder, PacketSource, Presenter, TimedFrame};

/// Loop phase: pulling real packets, flushing the decoder, or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reading,
    Draining,
    Done,
}

/// Outcome of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Frames decoded, converted and presented.
    pub frames_presented: u64,
    /// Whether the user cancelled playback before the stream finished.
    pub cancelled: bool,
}

/// Single-threaded playback driver.
///
/// Owns the clock and all collaborators for the lifetime of the session;
/// everything is released when the session is dropped, on every exit path.
pub struct PlaybackSession<S, D, C, P>
where
    S: PacketSource,
    D: FrameDecoder<Packet = S::Packet>,
    C: FrameConverter<In = D::Frame>,
    P: Presenter<Frame = C::Out>,
{
    source: S,
    decoder: D,
    converter: C,
    presenter: P,
    clock: PlaybackClock,
    policy: PtsPolicy,
}

impl<S, D, C, P> PlaybackSession<S, D, C, P>
where
    S: PacketSource,
    D: FrameDecoder<Packet = S::Packet>,
    C: FrameConverter<In = D::Frame>,
    P: Presenter<Frame = C::Out>,
{
    pub fn new(
        source: S,
        decoder: D,
        converter: C,
        presenter: P,
        time_base: Rational,
        policy: PtsPolicy,
    ) -> Self {
        Self {
            source,
            decoder,
            converter,
            presenter,
            clock: PlaybackClock::new(time_base),
            policy,
        }
    }

    /// Run the session to completion, end-of-stream drain included.
    ///
    /// The drain phase keeps feeding flush packets until the decoder reports
    /// no more pictures, so frames buffered inside the decoder are never
    /// dropped at end of stream.
    pub fn run(mut self) -> Result<SessionReport, PlayerError> {
        let mut phase = Phase::Reading;
        let mut frames_presented = 0u64;
        let mut cancelled = false;

        while phase != Phase::Done && !cancelled {
            let decoded = match phase {
                Phase::Reading => match self.source.next_packet()? {
                    Some(packet) => {
                        if !self.source.is_selected(&packet) {
                            // foreign stream: no decode, no pacing
                            continue;
                        }
                        self.decoder.decode(packet)?
                    }
                    None => {
                        debug!("packet source exhausted, draining decoder");
                        phase = Phase::Draining;
                        continue;
                    }
                },
                Phase::Draining => match self.decoder.drain()? {
                    Some(frame) => Some(frame),
                    None => {
                        phase = Phase::Done;
                        continue;
                    }
                },
                Phase::Done => break,
            };

            // Only frame timestamps drive the clock; an iteration without a
            // picture leaves the anchor untouched.
            let Some(frame) = decoded else { continue };

            let pts = self.policy.select(&frame.timestamps());
            let delay = self.clock.observe(pts);
            self.clock.wait(delay);

            let output = self.converter.convert(&frame)?;
            self.presenter.present(output)?;
            frames_presented += 1;
            debug!("presented frame {frames_presented} (pts {pts:?}, delay {delay}us)");

            if self.presenter.poll_cancel() {
                info!("playback cancelled by user after {frames_presented} frames");
                cancelled = true;
            }
        }

        Ok(SessionReport {
            frames_presented,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::media::PtsCandidates;

    /// Packet for the synthetic pipeline: a stream index plus an optional
    /// PTS that the fake decoder copies onto its frames.
    #[derive(Debug, Clone, Copy)]
    struct FakePacket {
        stream_index: usize,
        pts: Option<i64>,
    }

    fn video_packet(pts: i64) -> FakePacket {
        FakePacket {
            stream_index: 0,
            pts: Some(pts),
        }
    }

    fn untimed_packet() -> FakePacket {
        FakePacket {
            stream_index: 0,
            pts: None,
        }
    }

    struct FakeSource {
        packets: VecDeque<FakePacket>,
        fail: bool,
    }

    impl FakeSource {
        fn new(packets: Vec<FakePacket>) -> Self {
            Self {
                packets: packets.into(),
                fail: false,
            }
        }
    }

    impl PacketSource for FakeSource {
        type Packet = FakePacket;

        fn next_packet(&mut self) -> Result<Option<FakePacket>, PlayerError> {
            if self.fail {
                return Err(PlayerError::playback("synthetic read error"));
            }
            Ok(self.packets.pop_front())
        }

        fn is_selected(&self, packet: &FakePacket) -> bool {
            packet.stream_index == 0
        }
    }

    struct FakeFrame {
        pts: Option<i64>,
    }

    impl TimedFrame for FakeFrame {
        fn timestamps(&self) -> PtsCandidates {
            PtsCandidates {
                best_effort: self.pts,
                reordered: self.pts,
                decode_order: self.pts,
            }
        }
    }

    /// Decoder that holds back `latency` packets before producing output,
    /// then emits one frame per packet in submission order.
    struct FakeDecoder {
        buffered: VecDeque<FakePacket>,
        latency: usize,
        decode_calls: Arc<AtomicU64>,
    }

    impl FakeDecoder {
        fn new(latency: usize) -> Self {
            Self {
                buffered: VecDeque::new(),
                latency,
                decode_calls: Arc::new(AtomicU64::new(0)),
            }
        }
    }

    impl FrameDecoder for FakeDecoder {
        type Packet = FakePacket;
        type Frame = FakeFrame;

        fn decode(&mut self, packet: FakePacket) -> Result<Option<FakeFrame>, PlayerError> {
            self.decode_calls.fetch_add(1, Ordering::Relaxed);
            self.buffered.push_back(packet);
            if self.buffered.len() > self.latency {
                let out = self.buffered.pop_front().map(|p| FakeFrame { pts: p.pts });
                Ok(out)
            } else {
                Ok(None)
            }
        }

        fn drain(&mut self) -> Result<Option<FakeFrame>, PlayerError> {
            Ok(self.buffered.pop_front().map(|p| FakeFrame { pts: p.pts }))
        }
    }

    /// Decoder that swallows the packet at position `gap`, emitting no
    /// picture for that one iteration.
    struct GappyDecoder {
        seen: u64,
        gap: u64,
    }

    impl FrameDecoder for GappyDecoder {
        type Packet = FakePacket;
        type Frame = FakeFrame;

        fn decode(&mut self, packet: FakePacket) -> Result<Option<FakeFrame>, PlayerError> {
            self.seen += 1;
            if self.seen == self.gap {
                return Ok(None);
            }
            Ok(Some(FakeFrame { pts: packet.pts }))
        }

        fn drain(&mut self) -> Result<Option<FakeFrame>, PlayerError> {
            Ok(None)
        }
    }

    struct NoopConverter;

    impl FrameConverter for NoopConverter {
        type In = FakeFrame;
        type Out = ();

        fn convert(&mut self, _frame: &FakeFrame) -> Result<&(), PlayerError> {
            Ok(&())
        }
    }

    struct CountingPresenter {
        presented: Arc<AtomicU64>,
        cancel_after: Option<u64>,
    }

    impl CountingPresenter {
        fn new(cancel_after: Option<u64>) -> Self {
            Self {
                presented: Arc::new(AtomicU64::new(0)),
                cancel_after,
            }
        }
    }

    impl Presenter for CountingPresenter {
        type Frame = ();

        fn present(&mut self, _frame: &()) -> Result<(), PlayerError> {
            self.presented.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn poll_cancel(&mut self) -> bool {
            self.cancel_after
                .is_some_and(|n| self.presented.load(Ordering::Relaxed) >= n)
        }
    }

    fn session(
        source: FakeSource,
        decoder: FakeDecoder,
        presenter: CountingPresenter,
        time_base: Rational,
    ) -> PlaybackSession<FakeSource, FakeDecoder, NoopConverter, CountingPresenter> {
        PlaybackSession::new(
            source,
            decoder,
            NoopConverter,
            presenter,
            time_base,
            PtsPolicy::BestEffort,
        )
    }

    #[test]
    fn paces_a_one_second_stream_in_about_a_second() {
        // 30 frames at time base 1/30 with PTS 0..29 spans one second.
        let packets = (0..30).map(video_packet).collect();
        let source = FakeSource::new(packets);
        let time_base = Rational::new(1, 30).unwrap();

        let start = Instant::now();
        let report = session(source, FakeDecoder::new(0), CountingPresenter::new(None), time_base)
            .run()
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(report.frames_presented, 30);
        assert!(!report.cancelled);
        assert!(elapsed >= Duration::from_millis(900), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "elapsed {elapsed:?}");
    }

    #[test]
    fn decoder_gap_does_not_reset_pacing() {
        // A mid-stream iteration without a picture must leave the anchor
        // alone: the remaining frames keep their original schedule and the
        // stream still finishes in about a second.
        let packets = (0..10).map(video_packet).collect();
        let source = FakeSource::new(packets);
        let time_base = Rational::new(1, 10).unwrap();

        let start = Instant::now();
        let report = PlaybackSession::new(
            source,
            GappyDecoder { seen: 0, gap: 6 },
            NoopConverter,
            CountingPresenter::new(None),
            time_base,
            PtsPolicy::BestEffort,
        )
        .run()
        .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(report.frames_presented, 9);
        assert!(elapsed >= Duration::from_millis(850), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1200), "elapsed {elapsed:?}");
    }

    #[test]
    fn missing_timestamps_play_unpaced() {
        let packets = (0..30).map(|_| untimed_packet()).collect();
        let source = FakeSource::new(packets);
        let time_base = Rational::new(1, 30).unwrap();

        let start = Instant::now();
        let report = session(source, FakeDecoder::new(0), CountingPresenter::new(None), time_base)
            .run()
            .unwrap();

        assert_eq!(report.frames_presented, 30);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn cancel_stops_after_first_presented_frame() {
        let packets = (0..30).map(|_| untimed_packet()).collect();
        let source = FakeSource::new(packets);
        let time_base = Rational::new(1, 30).unwrap();

        let report = session(
            source,
            FakeDecoder::new(0),
            CountingPresenter::new(Some(1)),
            time_base,
        )
        .run()
        .unwrap();

        assert_eq!(report.frames_presented, 1);
        assert!(report.cancelled);
    }

    #[test]
    fn foreign_stream_packets_never_reach_the_decoder() {
        let mut packets = Vec::new();
        for _ in 0..5 {
            packets.push(untimed_packet());
            packets.push(FakePacket {
                stream_index: 1,
                pts: None,
            });
        }
        let source = FakeSource::new(packets);
        let decoder = FakeDecoder::new(0);
        let decode_calls = Arc::clone(&decoder.decode_calls);
        let time_base = Rational::new(1, 30).unwrap();

        let report = session(source, decoder, CountingPresenter::new(None), time_base)
            .run()
            .unwrap();

        assert_eq!(report.frames_presented, 5);
        assert_eq!(decode_calls.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn drain_presents_every_buffered_frame() {
        let packets = (0..10).map(|_| untimed_packet()).collect();
        let source = FakeSource::new(packets);
        let time_base = Rational::new(1, 30).unwrap();

        // Three frames stay buffered inside the decoder when the source runs
        // out; the drain phase must still present all ten.
        let report = session(source, FakeDecoder::new(3), CountingPresenter::new(None), time_base)
            .run()
            .unwrap();

        assert_eq!(report.frames_presented, 10);
        assert!(!report.cancelled);
    }

    #[test]
    fn source_error_aborts_the_session() {
        let mut source = FakeSource::new(vec![]);
        source.fail = true;
        let time_base = Rational::new(1, 30).unwrap();

        let err = session(source, FakeDecoder::new(0), CountingPresenter::new(None), time_base)
            .run()
            .unwrap_err();

        assert!(matches!(err, PlayerError::Playback(_)));
    }

    #[test]
    fn empty_stream_presents_nothing() {
        let source = FakeSource::new(vec![]);
        let time_base = Rational::new(1, 30).unwrap();

        let report = session(source, FakeDecoder::new(0), CountingPresenter::new(None), time_base)
            .run()
            .unwrap();

        assert_eq!(report.frames_presented, 0);
        assert!(!report.cancelled);
    }
}
