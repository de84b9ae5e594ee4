//! ROI signal/noise analysis core for the PixelScope image viewer.
//!
//! The GUI hands this crate a decoded [`PixelBuffer`] and one or more
//! user-drawn regions; the crate answers with per-region statistics, a noise
//! estimate, and a serializable [`AnalysisReport`]. It never decodes files,
//! renders anything, or touches the UI.
//!
//! ```
//! use pixelscope_core::{
//!     AnalysisReport, ImageIdentity, NoiseAnalyzer, PixelBuffer, Rect, Region, ReportEntry,
//!     StatisticsEngine,
//! };
//!
//! let buffer = PixelBuffer::from_u16(4, 4, 1, vec![100; 16])?;
//! let roi = Region::Rect(Rect::new(0, 0, 4, 4));
//!
//! let statistics = StatisticsEngine::new().compute(&buffer, &roi, None)?;
//! let noise = NoiseAnalyzer::new().estimate(&buffer, &roi, &roi)?;
//!
//! let report = AnalysisReport::new(
//!     ImageIdentity::of("frame-0", &buffer),
//!     vec![ReportEntry { label: "ROI 1".into(), region: roi, statistics }],
//!     Some(noise),
//! )?;
//! let json = report.to_json()?;
//! # assert!(json.contains("format_version"));
//! # Ok::<(), pixelscope_core::AnalysisError>(())
//! ```

pub mod analysis;
pub mod buffer;
pub mod error;
pub mod report;
pub mod roi;

pub use analysis::{
    ChannelStatistics, Histogram, HistogramBin, LineProfile, LineProfilePoint, NoiseAnalyzer,
    NoiseConfig, NoiseEstimate, NoiseWarning, PercentileValue, RegionStatistics, Snr, SnrDecibels,
    StatisticsConfig, StatisticsEngine,
};
pub use buffer::{PixelBuffer, SampleKind};
pub use error::{AnalysisError, Result};
pub use report::{AnalysisReport, ImageIdentity, ReportEntry, FORMAT_VERSION};
pub use roi::{PixelMask, Point, Polygon, Rect, Region, RegionGeometry, RegionSelector};
