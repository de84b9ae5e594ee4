use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::noise::NoiseEstimate;
use crate::analysis::statistics::ChannelStatistics;
use crate::buffer::{PixelBuffer, SampleKind};
use crate::error::{AnalysisError, Result};
use crate::roi::Region;

/// Version of the serialized report layout. Bumped on any field rename or
/// representation change.
pub const FORMAT_VERSION: u32 = 1;

/// Identity of the analysed image; never the pixel data itself.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageIdentity {
    /// Caller-chosen identifier, typically the source path or a stack index.
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub sample_kind: SampleKind,
}

impl ImageIdentity {
    pub fn of(id: impl Into<String>, buffer: &PixelBuffer) -> Self {
        Self {
            id: id.into(),
            width: buffer.width(),
            height: buffer.height(),
            channels: buffer.channels(),
            sample_kind: buffer.sample_kind(),
        }
    }
}

/// One analysed region with its user-facing label.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReportEntry {
    pub label: String,
    pub region: Region,
    pub statistics: ChannelStatistics,
}

/// Immutable result of one user-triggered analysis action.
///
/// Serializes to a versioned JSON document so results can be saved alongside
/// the source image reference and reloaded without recomputation. The
/// undefined SNR state round-trips as its tagged sentinel, never as a stand-in
/// number.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisReport {
    format_version: u32,
    timestamp: DateTime<Utc>,
    source: ImageIdentity,
    entries: Vec<ReportEntry>,
    noise: Option<NoiseEstimate>,
}

impl AnalysisReport {
    /// Assemble a report. At least one statistics entry is required.
    pub fn new(
        source: ImageIdentity,
        entries: Vec<ReportEntry>,
        noise: Option<NoiseEstimate>,
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(AnalysisError::EmptyReport);
        }
        Ok(Self {
            format_version: FORMAT_VERSION,
            timestamp: Utc::now(),
            source,
            entries,
            noise,
        })
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &ImageIdentity {
        &self.source
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn noise(&self) -> Option<&NoiseEstimate> {
        self.noise.as_ref()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::MalformedReport(e.to_string()))
    }

    /// Load a previously exported report. Reports written by a newer layout
    /// version are rejected rather than misread.
    pub fn from_json(json: &str) -> Result<Self> {
        let report: Self = serde_json::from_str(json)
            .map_err(|e| AnalysisError::MalformedReport(e.to_string()))?;
        if report.format_version > FORMAT_VERSION {
            return Err(AnalysisError::UnsupportedVersion {
                found: report.format_version,
                supported: FORMAT_VERSION,
            });
        }
        if report.entries.is_empty() {
            return Err(AnalysisError::EmptyReport);
        }
        Ok(report)
    }
}
