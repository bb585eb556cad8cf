use std::path::PathBuf;

use crate::media::PtsPolicy;

/// Runtime options, resolved once at startup and fixed for the session.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Input media file.
    pub input: PathBuf,
    /// Which decoder timestamp drives pacing.
    pub pts_policy: PtsPolicy,
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
