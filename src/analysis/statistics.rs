use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::analysis::histogram::{percentile, Histogram};
use crate::buffer::PixelBuffer;
use crate::error::{AnalysisError, Result};
use crate::roi::{Rect, Region, RegionSelector};

/// Rec. 601 broadcast luma weights, the default for combining RGB channels.
pub const REC601_LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Percentiles reported when the caller does not ask for a specific set.
pub const DEFAULT_PERCENTILES: [f64; 5] = [5.0, 25.0, 50.0, 75.0, 95.0];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatisticsConfig {
    /// Histogram bin count; `None` uses the buffer's suggested default
    /// (256 for 8-bit samples, 1024 for 16-bit).
    pub bins: Option<u32>,
    /// Percentiles to report, in percent.
    pub percentiles: Vec<f64>,
    /// Channel weights for the luma-combined view of multi-channel buffers.
    pub luma_weights: [f64; 3],
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            bins: None,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            luma_weights: REC601_LUMA_WEIGHTS,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value: f64,
}

/// Scalar statistics over one region and one channel view.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RegionStatistics {
    pub pixel_count: u64,
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub histogram: Histogram,
    pub percentiles: Vec<PercentileValue>,
}

/// Statistics for the requested channel selection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ChannelStatistics {
    /// One channel, or the only channel of a grayscale buffer.
    Single(RegionStatistics),
    /// Every channel of a multi-channel buffer plus the weighted luma
    /// combination (alpha excluded from the combination).
    PerChannel {
        channels: Vec<RegionStatistics>,
        luma: RegionStatistics,
    },
}

impl ChannelStatistics {
    /// The single-number view used by downstream consumers: the sole channel
    /// for grayscale input, the luma combination otherwise.
    pub fn primary(&self) -> &RegionStatistics {
        match self {
            ChannelStatistics::Single(stats) => stats,
            ChannelStatistics::PerChannel { luma, .. } => luma,
        }
    }
}

/// One point of a column-averaged intensity profile over a rectangle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LineProfilePoint {
    pub idx: u32,
    pub value: f64,
}

pub type LineProfile = Vec<LineProfilePoint>;

/// How sample values are read for one statistics pass.
enum ChannelView {
    Single(u32),
    Luma([f64; 3]),
}

impl ChannelView {
    fn value(&self, buffer: &PixelBuffer, x: u32, y: u32) -> f64 {
        match self {
            ChannelView::Single(c) => buffer.sample_unchecked(x, y, *c),
            ChannelView::Luma(weights) => weights
                .iter()
                .enumerate()
                .map(|(c, w)| w * buffer.sample_unchecked(x, y, c as u32))
                .sum(),
        }
    }
}

/// Computes per-region statistics: Welford mean/variance, min/max, histogram
/// and interpolated percentiles.
///
/// Stateless per invocation; the same engine can be shared across threads.
/// An attached `CancellationToken` is polled between rows of the rasterized
/// region, so long-running passes over large regions stop promptly without
/// producing partial results.
pub struct StatisticsEngine {
    config: StatisticsConfig,
    cancel: Option<CancellationToken>,
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self { config: StatisticsConfig::default(), cancel: None }
    }

    pub fn with_config(config: StatisticsConfig) -> Self {
        Self { config, cancel: None }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Compute statistics for `region` on `buffer`.
    ///
    /// With `channel` given, only that channel is read. Without it, a
    /// grayscale buffer yields `Single` statistics while a multi-channel
    /// buffer yields per-channel statistics plus the luma combination.
    pub fn compute(
        &self,
        buffer: &PixelBuffer,
        region: &Region,
        channel: Option<u32>,
    ) -> Result<ChannelStatistics> {
        let normalized = RegionSelector::normalize(region, buffer)?;
        let coords = RegionSelector::rasterize(&normalized);
        debug!("computing statistics over {} pixels", coords.len());

        match channel {
            Some(c) => {
                if c >= buffer.channels() {
                    let &(x, y) = &coords[0];
                    return Err(AnalysisError::OutOfBounds { x, y, channel: c });
                }
                let stats = self.compute_view(buffer, &coords, &ChannelView::Single(c))?;
                Ok(ChannelStatistics::Single(stats))
            }
            None if buffer.channels() == 1 => {
                let stats = self.compute_view(buffer, &coords, &ChannelView::Single(0))?;
                Ok(ChannelStatistics::Single(stats))
            }
            None => {
                let channels = (0..buffer.channels())
                    .into_par_iter()
                    .map(|c| self.compute_view(buffer, &coords, &ChannelView::Single(c)))
                    .collect::<Result<Vec<_>>>()?;
                let luma =
                    self.compute_view(buffer, &coords, &ChannelView::Luma(self.config.luma_weights))?;
                Ok(ChannelStatistics::PerChannel { channels, luma })
            }
        }
    }

    /// Column-averaged intensity profile over a rectangle, ordered by column
    /// index. Used by the plotting collaborator.
    pub fn line_profile(
        &self,
        buffer: &PixelBuffer,
        rect: &Rect,
        channel: u32,
    ) -> Result<LineProfile> {
        let normalized = match RegionSelector::normalize(&Region::Rect(rect.clone()), buffer)? {
            Region::Rect(rect) => rect,
            _ => unreachable!("rect normalizes to rect"),
        };
        if channel >= buffer.channels() {
            return Err(AnalysisError::OutOfBounds {
                x: normalized.pos.x,
                y: normalized.pos.y,
                channel,
            });
        }

        let mut profile = Vec::with_capacity(normalized.width as usize);
        for x in normalized.pos.x..normalized.right() {
            self.check_cancelled()?;
            let mut column_sum = 0.0;
            for y in normalized.pos.y..normalized.bottom() {
                column_sum += buffer.sample_unchecked(x, y, channel);
            }
            profile.push(LineProfilePoint {
                idx: x,
                value: column_sum / normalized.height as f64,
            });
        }
        Ok(profile)
    }

    /// Single pass over the rasterized coordinates. Welford's update keeps
    /// the variance numerically stable on large regions where a naive
    /// sum-of-squares pass would cancel catastrophically.
    fn compute_view(
        &self,
        buffer: &PixelBuffer,
        coords: &[(u32, u32)],
        view: &ChannelView,
    ) -> Result<RegionStatistics> {
        let mut count = 0u64;
        let mut mean = 0.0f64;
        let mut m2 = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut values = Vec::with_capacity(coords.len());

        let mut current_row = None;
        for &(x, y) in coords {
            if current_row != Some(y) {
                self.check_cancelled()?;
                current_row = Some(y);
            }
            let value = view.value(buffer, x, y);

            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);

            min = min.min(value);
            max = max.max(value);
            values.push(value);
        }

        let variance = (m2 / count as f64).max(0.0);
        let bins = self.config.bins.unwrap_or_else(|| buffer.suggested_bin_count());
        let histogram = Histogram::from_values(&values, bins);

        values.sort_unstable_by(|a, b| a.total_cmp(b));
        let percentiles = self
            .config
            .percentiles
            .iter()
            .map(|&pct| PercentileValue { percentile: pct, value: percentile(&values, pct) })
            .collect();

        Ok(RegionStatistics {
            pixel_count: count,
            mean,
            variance,
            std_dev: variance.sqrt(),
            min,
            max,
            histogram,
            percentiles,
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(AnalysisError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_buffer(width: u32, height: u32, value: u16) -> PixelBuffer {
        PixelBuffer::from_u16(width, height, 1, vec![value; (width * height) as usize]).unwrap()
    }

    fn full_rect(buffer: &PixelBuffer) -> Region {
        Region::Rect(Rect::new(0, 0, buffer.width(), buffer.height()))
    }

    fn single(stats: ChannelStatistics) -> RegionStatistics {
        match stats {
            ChannelStatistics::Single(stats) => stats,
            other => panic!("expected single-channel statistics, got {:?}", other),
        }
    }

    #[test]
    fn uniform_image_has_zero_variance() {
        // 4x4, all pixels 100, whole-image rect.
        let buffer = uniform_buffer(4, 4, 100);
        let engine = StatisticsEngine::new();
        let stats = single(engine.compute(&buffer, &full_rect(&buffer), None).unwrap());

        assert_eq!(stats.pixel_count, 16);
        assert_eq!(stats.mean, 100.0);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 100.0);
    }

    #[test]
    fn histogram_counts_sum_to_pixel_count() {
        let samples: Vec<u16> = (0..64).map(|i| (i * 97 % 1021) as u16).collect();
        let buffer = PixelBuffer::from_u16(8, 8, 1, samples).unwrap();
        let engine = StatisticsEngine::new();
        let stats = single(engine.compute(&buffer, &full_rect(&buffer), None).unwrap());
        assert_eq!(stats.histogram.total_count(), stats.pixel_count);
    }

    #[test]
    fn std_dev_is_square_root_of_variance() {
        let samples: Vec<u16> = (0..100).map(|i| (i * 31 % 257) as u16).collect();
        let buffer = PixelBuffer::from_u16(10, 10, 1, samples).unwrap();
        let engine = StatisticsEngine::new();
        let stats = single(engine.compute(&buffer, &full_rect(&buffer), None).unwrap());
        assert!(stats.variance >= 0.0);
        assert!((stats.std_dev - stats.variance.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn repeated_computation_is_bit_identical() {
        let samples: Vec<u16> = (0..256).map(|i| (i * 53 % 1789) as u16).collect();
        let buffer = PixelBuffer::from_u16(16, 16, 1, samples).unwrap();
        let region = Region::Rect(Rect::new(3, 2, 9, 11));
        let engine = StatisticsEngine::new();

        let first = engine.compute(&buffer, &region, None).unwrap();
        let second = engine.compute(&buffer, &region, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn single_pixel_region_has_zero_variance() {
        let buffer = uniform_buffer(4, 4, 77);
        let engine = StatisticsEngine::new();
        let region = Region::Rect(Rect::new(1, 1, 1, 1));
        let stats = single(engine.compute(&buffer, &region, None).unwrap());
        assert_eq!(stats.pixel_count, 1);
        assert_eq!(stats.variance, 0.0);
    }

    #[test]
    fn welford_matches_two_pass_reference() {
        let samples: Vec<u16> = (0..64).map(|i| (i * i % 997) as u16).collect();
        let buffer = PixelBuffer::from_u16(8, 8, 1, samples.clone()).unwrap();
        let engine = StatisticsEngine::new();
        let stats = single(engine.compute(&buffer, &full_rect(&buffer), None).unwrap());

        let n = samples.len() as f64;
        let mean: f64 = samples.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance: f64 =
            samples.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        assert!((stats.mean - mean).abs() < 1e-9);
        assert!((stats.variance - variance).abs() < 1e-6);
    }

    #[test]
    fn multichannel_reports_per_channel_and_luma() {
        // 2x2 RGB, R=100, G=50, B=0 everywhere.
        let samples = vec![100u8, 50, 0].repeat(4);
        let buffer = PixelBuffer::from_u8(2, 2, 3, samples).unwrap();
        let engine = StatisticsEngine::new();

        match engine.compute(&buffer, &full_rect(&buffer), None).unwrap() {
            ChannelStatistics::PerChannel { channels, luma } => {
                assert_eq!(channels.len(), 3);
                assert_eq!(channels[0].mean, 100.0);
                assert_eq!(channels[1].mean, 50.0);
                assert_eq!(channels[2].mean, 0.0);
                let expected = 0.299 * 100.0 + 0.587 * 50.0;
                assert!((luma.mean - expected).abs() < 1e-12);
            }
            other => panic!("expected per-channel statistics, got {:?}", other),
        }
    }

    #[test]
    fn explicit_channel_selects_one_channel() {
        let samples = vec![100u8, 50, 0].repeat(4);
        let buffer = PixelBuffer::from_u8(2, 2, 3, samples).unwrap();
        let engine = StatisticsEngine::new();
        let stats = single(engine.compute(&buffer, &full_rect(&buffer), Some(1)).unwrap());
        assert_eq!(stats.mean, 50.0);
    }

    #[test]
    fn invalid_channel_is_out_of_bounds() {
        let buffer = uniform_buffer(4, 4, 1);
        let engine = StatisticsEngine::new();
        let err = engine.compute(&buffer, &full_rect(&buffer), Some(3)).unwrap_err();
        assert!(matches!(err, AnalysisError::OutOfBounds { channel: 3, .. }));
    }

    #[test]
    fn cancellation_returns_cancelled_not_partial() {
        let buffer = uniform_buffer(64, 64, 9);
        let token = CancellationToken::new();
        token.cancel();
        let engine = StatisticsEngine::new().with_cancellation(token);
        assert_eq!(
            engine.compute(&buffer, &full_rect(&buffer), None).unwrap_err(),
            AnalysisError::Cancelled
        );
    }

    #[test]
    fn percentiles_interpolate_over_region() {
        let buffer = PixelBuffer::from_u16(2, 2, 1, vec![10, 20, 30, 40]).unwrap();
        let config = StatisticsConfig {
            percentiles: vec![50.0],
            ..StatisticsConfig::default()
        };
        let engine = StatisticsEngine::with_config(config);
        let stats = single(engine.compute(&buffer, &full_rect(&buffer), None).unwrap());
        assert_eq!(stats.percentiles, vec![PercentileValue { percentile: 50.0, value: 25.0 }]);
    }

    #[test]
    fn line_profile_averages_columns() {
        // Columns 0..3 hold constant values 1, 2, 3.
        let samples = vec![1u16, 2, 3, 1, 2, 3];
        let buffer = PixelBuffer::from_u16(3, 2, 1, samples).unwrap();
        let engine = StatisticsEngine::new();
        let profile = engine.line_profile(&buffer, &Rect::new(0, 0, 3, 2), 0).unwrap();
        assert_eq!(
            profile,
            vec![
                LineProfilePoint { idx: 0, value: 1.0 },
                LineProfilePoint { idx: 1, value: 2.0 },
                LineProfilePoint { idx: 2, value: 3.0 },
            ]
        );
    }
}
