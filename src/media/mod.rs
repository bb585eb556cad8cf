//! Media demuxing, decoding and pixel conversion via FFmpeg.

use std::fmt;
use std::str::FromStr;

use crate::error::PlayerError;

mod decoder;
mod scaler;
mod source;

pub use decoder::{DecodedFrame, StreamDecoder};
pub use scaler::BgrConverter;
pub use source::{MediaSource, StreamInfo};

/// Stream time base: duration of one PTS unit as a rational number of
/// seconds. A zero denominator is rejected at construction, so a `Rational`
/// held anywhere downstream is always safe to divide by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    num: u32,
    den: u32,
}

impl Rational {
    pub fn new(num: u32, den: u32) -> Result<Self, PlayerError> {
        if den == 0 {
            return Err(PlayerError::setup(
                "validating stream time base",
                "time base denominator is zero",
            ));
        }
        Ok(Self { num, den })
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn den(&self) -> u32 {
        self.den
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Timestamp candidates the decoder reports for one frame.
///
/// `None` stands for FFmpeg's `AV_NOPTS_VALUE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PtsCandidates {
    /// Reordered PTS when present, decode-order DTS otherwise.
    pub best_effort: Option<i64>,
    /// PTS of the packet the frame was reordered from.
    pub reordered: Option<i64>,
    /// DTS of the packet submitted when the frame came out.
    pub decode_order: Option<i64>,
}

/// Which timestamp candidate drives pacing. Fixed once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PtsPolicy {
    #[default]
    BestEffort,
    Reordered,
    DecodeOrder,
}

impl PtsPolicy {
    pub fn select(&self, candidates: &PtsCandidates) -> Option<i64> {
        match self {
            PtsPolicy::BestEffort => candidates.best_effort,
            PtsPolicy::Reordered => candidates.reordered,
            PtsPolicy::DecodeOrder => candidates.decode_order,
        }
    }
}

impl FromStr for PtsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-effort" => Ok(PtsPolicy::BestEffort),
            "reordered" => Ok(PtsPolicy::Reordered),
            "decode-order" => Ok(PtsPolicy::DecodeOrder),
            other => Err(format!("unknown pts policy: {other}")),
        }
    }
}

/// Converted frame ready for display: tightly packed BGR24, no stride
/// padding.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_rejects_zero_denominator() {
        let err = Rational::new(1, 0).unwrap_err();
        assert!(err.is_setup());
    }

    #[test]
    fn rational_keeps_components() {
        let tb = Rational::new(1, 30).unwrap();
        assert_eq!(tb.num(), 1);
        assert_eq!(tb.den(), 30);
    }

    #[test]
    fn policy_selects_its_candidate() {
        let candidates = PtsCandidates {
            best_effort: Some(1),
            reordered: Some(2),
            decode_order: Some(3),
        };
        assert_eq!(PtsPolicy::BestEffort.select(&candidates), Some(1));
        assert_eq!(PtsPolicy::Reordered.select(&candidates), Some(2));
        assert_eq!(PtsPolicy::DecodeOrder.select(&candidates), Some(3));
    }

    #[test]
    fn policy_parses_cli_names() {
        assert_eq!("best-effort".parse(), Ok(PtsPolicy::BestEffort));
        assert_eq!("reordered".parse(), Ok(PtsPolicy::Reordered));
        assert_eq!("decode-order".parse(), Ok(PtsPolicy::DecodeOrder));
        assert!("reverse".parse::<PtsPolicy>().is_err());
    }
}
