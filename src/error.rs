use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
///
/// All of these indicate caller input problems or an honoured cancellation,
/// never transient conditions, so nothing is retried internally. The core
/// returns these as values; presenting them is the calling layer's job.
#[derive(Debug, Error, Serialize, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("coordinate ({x}, {y}) channel {channel} is outside the image")]
    OutOfBounds { x: u32, y: u32, channel: u32 },

    #[error("region selects no pixels")]
    EmptyRegion,

    #[error("sample buffer holds {got} samples, expected {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("unsupported channel count {0}, expected 1, 3 or 4")]
    UnsupportedChannelCount(u32),

    #[error("report contains no region statistics")]
    EmptyReport,

    #[error("report format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("malformed report: {0}")]
    MalformedReport(String),

    #[error("analysis was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
