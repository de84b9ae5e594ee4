use log::debug;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::analysis::statistics::{StatisticsConfig, StatisticsEngine};
use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::roi::{Region, RegionSelector};

/// Signal-to-noise ratio. `Undefined` is the explicit state for a zero noise
/// floor; it never degrades into infinity, NaN or a numeric placeholder.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "state", content = "value")]
pub enum Snr {
    Ratio(f64),
    Undefined,
}

/// SNR expressed in decibels; carries its unit in the serialized tag.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "unit", content = "value")]
pub enum SnrDecibels {
    #[serde(rename = "db")]
    Decibels(f64),
    #[serde(rename = "undefined")]
    Undefined,
}

/// Non-fatal condition attached to an estimate that is still returned.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind")]
pub enum NoiseWarning {
    /// The background region's spread exceeds the flatness threshold, so the
    /// noise floor read from it is lower confidence.
    NonUniformBackground { background_std_dev: f64, threshold: f64 },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NoiseConfig {
    /// Background std-dev above `flatness_threshold * |background mean|`
    /// flags the estimate as `NonUniformBackground`.
    pub flatness_threshold: f64,
    /// Also report the SNR in decibels.
    pub decibel: bool,
    /// Passed through to the statistics passes (luma weights, bins).
    pub statistics: StatisticsConfig,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            flatness_threshold: 0.1,
            decibel: false,
            statistics: StatisticsConfig::default(),
        }
    }
}

/// Noise floor and SNR computed from a signal region against a background
/// region assumed to contain no signal.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NoiseEstimate {
    /// Background region standard deviation.
    pub noise_std_dev: f64,
    pub background_mean: f64,
    /// Background-subtracted signal: signal mean minus background mean.
    pub signal_level: f64,
    pub snr: Snr,
    /// Present when decibel output was requested.
    pub snr_db: Option<SnrDecibels>,
    /// The regions actually measured, after normalization.
    pub signal_region: Region,
    pub background_region: Region,
    pub warning: Option<NoiseWarning>,
}

/// Estimates the noise floor from a background region and derives the SNR of
/// a signal region against it.
pub struct NoiseAnalyzer {
    config: NoiseConfig,
    engine: StatisticsEngine,
}

impl Default for NoiseAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseAnalyzer {
    pub fn new() -> Self {
        Self::with_config(NoiseConfig::default())
    }

    pub fn with_config(config: NoiseConfig) -> Self {
        let engine = StatisticsEngine::with_config(config.statistics.clone());
        Self { config, engine }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.engine = StatisticsEngine::with_config(self.config.statistics.clone())
            .with_cancellation(token);
        self
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Estimate the SNR of `signal_region` using `background_region` as the
    /// noise reference. Multi-channel buffers are measured on their
    /// luma-combined view.
    pub fn estimate(
        &self,
        buffer: &PixelBuffer,
        signal_region: &Region,
        background_region: &Region,
    ) -> Result<NoiseEstimate> {
        let signal_region = RegionSelector::normalize(signal_region, buffer)?;
        let background_region = RegionSelector::normalize(background_region, buffer)?;

        let signal = self.engine.compute(buffer, &signal_region, None)?;
        let background = self.engine.compute(buffer, &background_region, None)?;
        let signal = signal.primary();
        let background = background.primary();

        let noise_std_dev = background.std_dev;
        let signal_level = signal.mean - background.mean;

        let snr = if noise_std_dev > 0.0 {
            Snr::Ratio(signal_level / noise_std_dev)
        } else {
            Snr::Undefined
        };

        let snr_db = self.config.decibel.then(|| match snr {
            Snr::Ratio(ratio) if ratio > 0.0 => SnrDecibels::Decibels(20.0 * ratio.log10()),
            _ => SnrDecibels::Undefined,
        });

        let threshold = self.config.flatness_threshold * background.mean.abs();
        let warning = (noise_std_dev > threshold).then(|| {
            debug!(
                "background std-dev {} exceeds flatness threshold {}",
                noise_std_dev, threshold
            );
            NoiseWarning::NonUniformBackground {
                background_std_dev: noise_std_dev,
                threshold,
            }
        });

        Ok(NoiseEstimate {
            noise_std_dev,
            background_mean: background.mean,
            signal_level,
            snr,
            snr_db,
            signal_region,
            background_region,
            warning,
        })
    }
}
