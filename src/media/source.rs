use std::fs::File;
use std::path::Path;

use ac_ffmpeg::codec::VideoCodecParameters;
use ac_ffmpeg::codec::video::PixelFormat;
use ac_ffmpeg::format::demuxer::{Demuxer, DemuxerWithStreamInfo};
use ac_ffmpeg::format::io::IO;
use ac_ffmpeg::format::stream::Stream;
use ac_ffmpeg::packet::Packet;

use crate::error::PlayerError;
use crate::media::Rational;
use crate::playback::PacketSource;

/// Metadata of the selected video stream, probed once at open time.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: usize,
    pub height: usize,
    pub time_base: Rational,
    pub duration_secs: Option<f64>,
    pub frames: Option<u64>,
    pub nominal_fps: Option<f64>,
}

/// Demuxer wrapper that pulls packets from a media file and knows which of
/// its streams is the selected video stream.
pub struct MediaSource {
    demuxer: DemuxerWithStreamInfo<File>,
    info: StreamInfo,
    pixel_format: PixelFormat,
}

impl MediaSource {
    /// Open a media file and select its primary video stream.
    ///
    /// Any failure here (unreadable file, no video stream, malformed time
    /// base) is a setup failure and aborts before the loop starts.
    pub fn open(path: &Path) -> Result<Self, PlayerError> {
        let file = File::open(path)
            .map_err(|err| PlayerError::setup(format!("opening {}", path.display()), err))?;

        let io = IO::from_seekable_read_stream(file);

        let demuxer = Demuxer::builder()
            .build(io)
            .map_err(|err| PlayerError::setup("creating demuxer", err))?
            .find_stream_info(None)
            .map_err(|(_, err)| PlayerError::setup("probing stream info", err))?;

        let (index, stream) = demuxer
            .streams()
            .iter()
            .enumerate()
            .find(|(_, stream)| stream.codec_parameters().is_video_codec())
            .ok_or_else(|| PlayerError::setup("selecting video stream", "no video stream found"))?;

        let params = stream
            .codec_parameters()
            .into_video_codec_parameters()
            .ok_or_else(|| {
                PlayerError::setup("selecting video stream", "stream has no video parameters")
            })?;

        let info = Self::probe_stream(index, stream, &params)?;
        let pixel_format = params.pixel_format();

        Ok(Self {
            demuxer,
            info,
            pixel_format,
        })
    }

    fn probe_stream(
        index: usize,
        stream: &Stream,
        params: &VideoCodecParameters,
    ) -> Result<StreamInfo, PlayerError> {
        let tb = stream.time_base();
        let time_base = Rational::new(tb.num() as u32, tb.den() as u32)?;

        let duration_secs = stream
            .duration()
            .as_micros()
            .map(|us| us as f64 / 1_000_000.0);
        let frames = stream.frames();

        Ok(StreamInfo {
            index,
            codec: stream
                .codec_parameters()
                .decoder_name()
                .unwrap_or("unknown")
                .to_string(),
            width: params.width(),
            height: params.height(),
            time_base,
            duration_secs,
            frames,
            nominal_fps: nominal_fps(frames, duration_secs),
        })
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Native pixel layout of the selected stream.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub(crate) fn selected_stream(&self) -> &Stream {
        &self.demuxer.streams()[self.info.index]
    }

    /// Next demuxed packet; `None` once the source is exhausted. Any other
    /// read error is fatal for the session.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, PlayerError> {
        self.demuxer
            .take()
            .map_err(|err| PlayerError::playback(format!("reading packet: {err}")))
    }
}

impl PacketSource for MediaSource {
    type Packet = Packet;

    fn next_packet(&mut self) -> Result<Option<Packet>, PlayerError> {
        MediaSource::next_packet(self)
    }

    fn is_selected(&self, packet: &Packet) -> bool {
        packet.stream_index() == self.info.index
    }
}

/// Nominal frame rate derived from container frame count and duration; the
/// demuxer wrapper does not expose the codec-level frame rate directly.
fn nominal_fps(frames: Option<u64>, duration_secs: Option<f64>) -> Option<f64> {
    match (frames, duration_secs) {
        (Some(frames), Some(secs)) if secs > 0.0 => Some(frames as f64 / secs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::nominal_fps;

    #[test]
    fn fps_is_frames_over_duration() {
        assert_eq!(nominal_fps(Some(300), Some(10.0)), Some(30.0));
    }

    #[test]
    fn fps_is_unknown_without_both_inputs() {
        assert_eq!(nominal_fps(None, Some(10.0)), None);
        assert_eq!(nominal_fps(Some(300), None), None);
    }

    #[test]
    fn fps_guards_a_zero_duration() {
        assert_eq!(nominal_fps(Some(300), Some(0.0)), None);
    }
}
