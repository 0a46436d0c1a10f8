use image::RgbImage;

use crate::types::ContrastLevel;

const LUMA_R: u32 = 19_595;
const LUMA_G: u32 = 38_470;
const LUMA_B: u32 = 7_471;
const LUMA_ROUND: u32 = 0x8000;

/// Brightness summary of an image on the 0-255 luma scale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LumaStatistics {
    pub mean: f64,
    pub std_deviation: f64,
}

impl LumaStatistics {
    #[inline]
    pub fn contrast(&self) -> ContrastLevel {
        ContrastLevel::classify(self.std_deviation)
    }
}

pub fn luma_statistics(image: &RgbImage) -> LumaStatistics {
    let gray = to_grayscale(image.as_raw(), 3);
    let (mean, std_deviation) = compute_mean_std(&gray);
    LumaStatistics {
        mean,
        std_deviation,
    }
}

/// Population mean and standard deviation.
pub fn compute_mean_std(data: &[u8]) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let sum: u64 = data.iter().map(|&x| x as u64).sum();
    let mean = sum as f64 / data.len() as f64;
    let variance = data.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / data.len() as f64;
    (mean, variance.sqrt())
}

/// ITU-R 601-2 luma in 16-bit fixed point, rounded to nearest.
pub fn to_grayscale(data: &[u8], channels: usize) -> Vec<u8> {
    match channels {
        3 | 4 => data
            .chunks_exact(channels)
            .map(|px| {
                let weighted = px[0] as u32 * LUMA_R + px[1] as u32 * LUMA_G + px[2] as u32 * LUMA_B;
                ((weighted + LUMA_ROUND) >> 16) as u8
            })
            .collect(),
        _ => data.to_vec(),
    }
}
