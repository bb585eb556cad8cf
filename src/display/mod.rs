//! Frame presentation.

mod window;

pub use window::VideoWindow;
