use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistogramBin {
    /// Lower edge of the bin; the upper edge is `lower + bin_width`.
    pub lower: f64,
    pub count: u32,
}

/// Histogram anchored at the observed min/max of the region being analysed,
/// not the full image range, so narrow regions keep their resolution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub bin_width: f64,
    pub min: f64,
    pub max: f64,
}

impl Histogram {
    /// Bin `values` into `bin_count` equal-width bins spanning the observed
    /// range. A constant-valued region collapses into the first bin.
    ///
    /// Every input value lands in exactly one bin, so the counts always sum
    /// to `values.len()`.
    pub fn from_values(values: &[f64], bin_count: u32) -> Self {
        debug_assert!(!values.is_empty());
        let bin_count = bin_count.max(1);

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        let bin_width = if range > 0.0 { range / bin_count as f64 } else { 1.0 };

        let mut bins: Vec<HistogramBin> = (0..bin_count)
            .map(|i| HistogramBin { lower: min + i as f64 * bin_width, count: 0 })
            .collect();

        let last = bin_count as usize - 1;
        for &value in values {
            let idx = (((value - min) / bin_width) as usize).min(last);
            bins[idx].count += 1;
        }

        Self { bins, bin_width, min, max }
    }

    pub fn total_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count as u64).sum()
    }
}

/// Percentile over ascending `sorted` values, linearly interpolated between
/// neighbouring order statistics. Nearest-rank would round away the sub-bin
/// precision the noise estimator depends on.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}
