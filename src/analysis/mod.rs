pub mod histogram;
pub mod noise;
pub mod statistics;

pub use histogram::{Histogram, HistogramBin};
pub use noise::{NoiseAnalyzer, NoiseConfig, NoiseEstimate, NoiseWarning, Snr, SnrDecibels};
pub use statistics::{
    ChannelStatistics, LineProfile, LineProfilePoint, PercentileValue, RegionStatistics,
    StatisticsConfig, StatisticsEngine, DEFAULT_PERCENTILES, REC601_LUMA_WEIGHTS,
};
