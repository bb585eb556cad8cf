use ac_ffmpeg::codec::video::scaler::{Algorithm, VideoFrameScaler};
use ac_ffmpeg::codec::video::{self, VideoFrame};

use crate::error::PlayerError;
use crate::media::{DecodedFrame, MediaSource, RawFrame};
use crate::playback::FrameConverter;

/// Converts decoded frames into tightly packed BGR24 buffers for display.
///
/// Geometry is preserved; only the pixel layout changes. The packed output
/// frame is owned by the converter and reused across frames, so callers get
/// a borrowed view instead of a fresh allocation.
pub struct BgrConverter {
    scaler: VideoFrameScaler,
    out: RawFrame,
}

impl BgrConverter {
    pub fn from_source(source: &MediaSource) -> Result<Self, PlayerError> {
        let info = source.info();
        let target = video::frame::get_pixel_format("bgr24");

        let scaler = VideoFrameScaler::builder()
            .source_pixel_format(source.pixel_format())
            .source_width(info.width)
            .source_height(info.height)
            .target_pixel_format(target)
            .target_width(info.width)
            .target_height(info.height)
            .algorithm(Algorithm::Bicubic)
            .build()
            .map_err(|err| PlayerError::setup("creating pixel converter", err))?;

        Ok(Self {
            scaler,
            out: RawFrame {
                data: Vec::new(),
                width: info.width,
                height: info.height,
            },
        })
    }

    /// Scale one decoded frame and strip stride padding from the output.
    pub fn convert(&mut self, frame: &VideoFrame) -> Result<&RawFrame, PlayerError> {
        let scaled = self
            .scaler
            .scale(frame)
            .map_err(|err| PlayerError::playback(format!("converting frame: {err}")))?;

        let planes = scaled.planes();
        let row = self.out.width * 3;

        self.out.data.resize(row * self.out.height, 0);
        pack_rows(
            &mut self.out.data,
            planes[0].data(),
            planes[0].line_size(),
            row,
            self.out.height,
        );

        Ok(&self.out)
    }
}

impl FrameConverter for BgrConverter {
    type In = DecodedFrame;
    type Out = RawFrame;

    fn convert(&mut self, frame: &DecodedFrame) -> Result<&RawFrame, PlayerError> {
        BgrConverter::convert(self, &frame.frame)
    }
}

/// Copy `height` rows of `row` bytes from a stride-padded source into a
/// contiguous destination. A padding-free source is a single copy.
fn pack_rows(dst: &mut [u8], src: &[u8], stride: usize, row: usize, height: usize) {
    if stride == row && src.len() >= dst.len() {
        dst.copy_from_slice(&src[..row * height]);
        return;
    }

    for r in 0..height {
        dst[r * row..(r + 1) * row].copy_from_slice(&src[r * stride..r * stride + row]);
    }
}

#[cfg(test)]
mod tests {
    use super::pack_rows;

    #[test]
    fn pack_rows_copies_unpadded_source_in_one_shot() {
        let src: Vec<u8> = (0..12).collect();
        let mut dst = vec![0u8; 12];

        pack_rows(&mut dst, &src, 6, 6, 2);
        assert_eq!(dst, src);
    }

    #[test]
    fn pack_rows_strips_stride_padding() {
        // two rows of 4 payload bytes, each padded with 2 bytes
        let src = vec![1, 2, 3, 4, 9, 9, 5, 6, 7, 8, 9, 9];
        let mut dst = vec![0u8; 8];

        pack_rows(&mut dst, &src, 6, 4, 2);
        assert_eq!(dst, [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
