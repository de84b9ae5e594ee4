use image::{ImageBuffer, Luma, Rgb, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::roi::Rect;

/// Storage type of the decoded samples.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    U8,
    U16,
    F32,
}

impl SampleKind {
    pub fn bit_depth(&self) -> u32 {
        match self {
            SampleKind::U8 => 8,
            SampleKind::U16 => 16,
            SampleKind::F32 => 32,
        }
    }
}

#[derive(Clone, Debug)]
enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

/// Immutable view over a decoded raster image.
///
/// Samples are stored row-major, channels interleaved, exactly as the
/// decoding collaborator hands them over. The analysis core never mutates
/// a buffer; shared references can be read from any number of threads.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u32,
    samples: Samples,
}

impl PixelBuffer {
    pub fn from_u8(width: u32, height: u32, channels: u32, samples: Vec<u8>) -> Result<Self> {
        Self::validated(width, height, channels, samples.len())?;
        Ok(Self { width, height, channels, samples: Samples::U8(samples) })
    }

    pub fn from_u16(width: u32, height: u32, channels: u32, samples: Vec<u16>) -> Result<Self> {
        Self::validated(width, height, channels, samples.len())?;
        Ok(Self { width, height, channels, samples: Samples::U16(samples) })
    }

    pub fn from_f32(width: u32, height: u32, channels: u32, samples: Vec<f32>) -> Result<Self> {
        Self::validated(width, height, channels, samples.len())?;
        Ok(Self { width, height, channels, samples: Samples::F32(samples) })
    }

    fn validated(width: u32, height: u32, channels: u32, len: usize) -> Result<()> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(AnalysisError::UnsupportedChannelCount(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if width == 0 || height == 0 || len != expected {
            return Err(AnalysisError::ShapeMismatch { expected, got: len });
        }
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn sample_kind(&self) -> SampleKind {
        match self.samples {
            Samples::U8(_) => SampleKind::U8,
            Samples::U16(_) => SampleKind::U16,
            Samples::F32(_) => SampleKind::F32,
        }
    }

    pub fn bit_depth(&self) -> u32 {
        self.sample_kind().bit_depth()
    }

    /// Default histogram bin count for this buffer's sample type.
    pub fn suggested_bin_count(&self) -> u32 {
        match self.sample_kind() {
            SampleKind::U8 => 256,
            SampleKind::U16 => 1024,
            SampleKind::F32 => 256,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Bounds-checked sample read.
    pub fn sample(&self, x: u32, y: u32, channel: u32) -> Result<f64> {
        if !self.contains(x, y) || channel >= self.channels {
            return Err(AnalysisError::OutOfBounds { x, y, channel });
        }
        Ok(self.sample_unchecked(x, y, channel))
    }

    /// Bulk read of one channel over a rectangular sub-range, row-major.
    pub fn rect_samples(&self, rect: &Rect, channel: u32) -> Result<Vec<f64>> {
        let right = rect.pos.x.saturating_add(rect.width);
        let bottom = rect.pos.y.saturating_add(rect.height);
        if right > self.width || bottom > self.height || channel >= self.channels {
            return Err(AnalysisError::OutOfBounds { x: rect.pos.x, y: rect.pos.y, channel });
        }

        let mut out = Vec::with_capacity(rect.width as usize * rect.height as usize);
        for y in rect.pos.y..bottom {
            for x in rect.pos.x..right {
                out.push(self.sample_unchecked(x, y, channel));
            }
        }
        Ok(out)
    }

    pub(crate) fn sample_unchecked(&self, x: u32, y: u32, channel: u32) -> f64 {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels as usize
            + channel as usize;
        match &self.samples {
            Samples::U8(data) => data[idx] as f64,
            Samples::U16(data) => data[idx] as f64,
            Samples::F32(data) => data[idx] as f64,
        }
    }
}

impl TryFrom<&ImageBuffer<Luma<u8>, Vec<u8>>> for PixelBuffer {
    type Error = AnalysisError;

    fn try_from(image: &ImageBuffer<Luma<u8>, Vec<u8>>) -> Result<Self> {
        PixelBuffer::from_u8(image.width(), image.height(), 1, image.as_raw().clone())
    }
}

impl TryFrom<&ImageBuffer<Luma<u16>, Vec<u16>>> for PixelBuffer {
    type Error = AnalysisError;

    fn try_from(image: &ImageBuffer<Luma<u16>, Vec<u16>>) -> Result<Self> {
        PixelBuffer::from_u16(image.width(), image.height(), 1, image.as_raw().clone())
    }
}

impl TryFrom<&ImageBuffer<Rgb<u8>, Vec<u8>>> for PixelBuffer {
    type Error = AnalysisError;

    fn try_from(image: &ImageBuffer<Rgb<u8>, Vec<u8>>) -> Result<Self> {
        PixelBuffer::from_u8(image.width(), image.height(), 3, image.as_raw().clone())
    }
}

impl TryFrom<&ImageBuffer<Rgba<u8>, Vec<u8>>> for PixelBuffer {
    type Error = AnalysisError;

    fn try_from(image: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<Self> {
        PixelBuffer::from_u8(image.width(), image.height(), 4, image.as_raw().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::Point;

    #[test]
    fn rejects_mismatched_sample_length() {
        let err = PixelBuffer::from_u8(4, 4, 1, vec![0; 15]).unwrap_err();
        assert_eq!(err, AnalysisError::ShapeMismatch { expected: 16, got: 15 });
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let err = PixelBuffer::from_u8(2, 2, 2, vec![0; 8]).unwrap_err();
        assert_eq!(err, AnalysisError::UnsupportedChannelCount(2));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(PixelBuffer::from_u16(0, 4, 1, Vec::new()).is_err());
        assert!(PixelBuffer::from_u16(4, 0, 1, Vec::new()).is_err());
    }

    #[test]
    fn sample_access_is_bounds_checked() {
        let buffer = PixelBuffer::from_u16(3, 2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(buffer.sample(2, 1, 0).unwrap(), 6.0);
        assert_eq!(
            buffer.sample(3, 0, 0).unwrap_err(),
            AnalysisError::OutOfBounds { x: 3, y: 0, channel: 0 }
        );
        assert_eq!(
            buffer.sample(0, 0, 1).unwrap_err(),
            AnalysisError::OutOfBounds { x: 0, y: 0, channel: 1 }
        );
    }

    #[test]
    fn rect_samples_row_major() {
        let buffer = PixelBuffer::from_u8(3, 3, 1, (0..9).collect()).unwrap();
        let rect = Rect { pos: Point { x: 1, y: 1 }, width: 2, height: 2 };
        assert_eq!(buffer.rect_samples(&rect, 0).unwrap(), vec![4.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn rect_samples_rejects_escaping_rect() {
        let buffer = PixelBuffer::from_u8(3, 3, 1, vec![0; 9]).unwrap();
        let rect = Rect { pos: Point { x: 2, y: 2 }, width: 2, height: 1 };
        assert!(matches!(
            buffer.rect_samples(&rect, 0),
            Err(AnalysisError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn converts_from_luma16_image() {
        let image = ImageBuffer::from_pixel(4, 4, Luma([100u16]));
        let buffer = PixelBuffer::try_from(&image).unwrap();
        assert_eq!(buffer.sample_kind(), SampleKind::U16);
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.sample(3, 3, 0).unwrap(), 100.0);
    }

    #[test]
    fn converts_from_rgb_image() {
        let image = ImageBuffer::from_pixel(2, 2, Rgb([10u8, 20, 30]));
        let buffer = PixelBuffer::try_from(&image).unwrap();
        assert_eq!(buffer.channels(), 3);
        assert_eq!(buffer.sample(1, 1, 2).unwrap(), 30.0);
    }
}
