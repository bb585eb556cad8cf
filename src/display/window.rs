use log::warn;
use opencv::core::Mat;
use opencv::highgui;
use opencv::prelude::*;

use crate::error::PlayerError;
use crate::media::RawFrame;
use crate::playback::Presenter;

/// ESC is the only cancel input.
const CANCEL_KEY: i32 = 0x1b;

/// Display window backed by OpenCV's highgui.
///
/// The window is created once at setup and destroyed on drop, so it is
/// released on every exit path including cancellation and fatal errors.
pub struct VideoWindow {
    title: String,
}

impl VideoWindow {
    pub fn open(title: &str) -> Result<Self, PlayerError> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .map_err(|err| PlayerError::setup("opening display window", err))?;

        Ok(Self {
            title: title.to_string(),
        })
    }
}

impl Presenter for VideoWindow {
    type Frame = RawFrame;

    /// Display one tightly packed BGR24 buffer. Display faults are logged
    /// and ignored; a rendering hiccup never aborts the session.
    fn present(&mut self, frame: &RawFrame) -> Result<(), PlayerError> {
        match Mat::from_slice(&frame.data) {
            Ok(flat) => match flat.reshape(3, frame.height as i32) {
                Ok(bgr) => {
                    if let Err(err) = highgui::imshow(&self.title, &bgr) {
                        warn!("imshow failed: {err}");
                    }
                }
                Err(err) => warn!("frame reshape failed: {err}"),
            },
            Err(err) => warn!("frame wrap failed: {err}"),
        }

        Ok(())
    }

    fn poll_cancel(&mut self) -> bool {
        match highgui::wait_key(1) {
            Ok(key) => key == CANCEL_KEY,
            Err(err) => {
                warn!("wait_key failed: {err}");
                false
            }
        }
    }
}

impl Drop for VideoWindow {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.title);
    }
}
