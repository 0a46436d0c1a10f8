//! Median-cut palette quantization.
//!
//! Deterministic for a given image: the color histogram is ordered, box
//! selection breaks ties by position and nearest-color lookup breaks ties by
//! the lower palette index.

use std::collections::{BTreeMap, HashMap};

use image::imageops::{self, ColorMap};
use image::{Rgb, RgbImage};

const CHANNELS: usize = 3;

/// An ordered set of representative colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb<u8>>) -> Self {
        Self { colors }
    }

    #[inline]
    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Index of the closest entry by squared Euclidean distance.
    pub fn nearest(&self, color: &Rgb<u8>) -> usize {
        let mut best = 0;
        let mut best_dist = u32::MAX;
        for (i, entry) in self.colors.iter().enumerate() {
            let dist = distance_sq(entry, color);
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best
    }
}

impl ColorMap for Palette {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Rgb<u8>) -> usize {
        self.nearest(color)
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        self.colors.get(index).copied()
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        if let Some(&entry) = self.colors.get(self.nearest(color)) {
            *color = entry;
        }
    }
}

#[inline]
fn distance_sq(a: &Rgb<u8>, b: &Rgb<u8>) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(&x, &y)| {
            let d = i32::from(x) - i32::from(y);
            (d * d) as u32
        })
        .sum()
}

/// Result of quantizing an image: a palette and one index per pixel,
/// row-major.
#[derive(Debug, Clone)]
pub struct Quantized {
    pub palette: Palette,
    pub indices: Vec<u8>,
}

#[derive(Debug)]
struct ColorBox {
    entries: Vec<([u8; CHANNELS], u64)>,
}

impl ColorBox {
    fn channel_range(&self, channel: usize) -> u8 {
        let (lo, hi) = self
            .entries
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), (c, _)| {
                (lo.min(c[channel]), hi.max(c[channel]))
            });
        hi.saturating_sub(lo)
    }

    /// Widest channel and its range; the first channel wins ties.
    fn widest_channel(&self) -> (usize, u8) {
        (0..CHANNELS).fold((0, 0), |best, ch| {
            let range = self.channel_range(ch);
            if range > best.1 { (ch, range) } else { best }
        })
    }

    fn split(mut self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.widest_channel();
        self.entries.sort_by_key(|(c, _)| (c[channel], *c));

        let total: u64 = self.entries.iter().map(|(_, n)| n).sum();
        let half = total.div_ceil(2);
        let mut acc = 0;
        let mut cut = self.entries.len() - 1;
        for (i, (_, n)) in self.entries.iter().enumerate() {
            acc += n;
            if acc >= half {
                cut = i + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.entries.len() - 1);

        let upper = self.entries.split_off(cut);
        (self, ColorBox { entries: upper })
    }

    fn mean_color(&self) -> Rgb<u8> {
        let total: u64 = self.entries.iter().map(|(_, n)| n).sum();
        let mut rgb = [0u8; CHANNELS];
        if total == 0 {
            return Rgb(rgb);
        }
        for (ch, out) in rgb.iter_mut().enumerate() {
            let sum: u64 = self.entries.iter().map(|(c, n)| u64::from(c[ch]) * n).sum();
            *out = ((sum + total / 2) / total) as u8;
        }
        Rgb(rgb)
    }
}

/// Builds a palette of at most `max_colors` entries. An image with fewer
/// distinct colors than `max_colors` gets one entry per distinct color.
pub fn median_cut(image: &RgbImage, max_colors: usize) -> Palette {
    let mut histogram: BTreeMap<[u8; CHANNELS], u64> = BTreeMap::new();
    for pixel in image.pixels() {
        *histogram.entry(pixel.0).or_insert(0) += 1;
    }
    if histogram.is_empty() || max_colors == 0 {
        return Palette::new(Vec::new());
    }

    let mut boxes = vec![ColorBox {
        entries: histogram.into_iter().collect(),
    }];

    while boxes.len() < max_colors {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.entries.len() > 1)
            .fold(None, |best: Option<(usize, u8)>, (i, b)| {
                let range = b.widest_channel().1;
                match best {
                    Some((_, r)) if r >= range => best,
                    _ => Some((i, range)),
                }
            });
        let Some((index, _)) = candidate else {
            break;
        };
        let (lower, upper) = boxes.remove(index).split();
        boxes.insert(index, upper);
        boxes.insert(index, lower);
    }

    Palette::new(boxes.iter().map(ColorBox::mean_color).collect())
}

/// Quantizes to at most `max_colors` (1..=256) colors. With `dither`, the
/// quantization error is diffused Floyd-Steinberg style before indexing.
pub fn quantize(image: &RgbImage, max_colors: u16, dither: bool) -> Quantized {
    let palette = median_cut(image, usize::from(max_colors.min(256)));
    if palette.is_empty() {
        return Quantized {
            palette,
            indices: Vec::new(),
        };
    }

    let indices = if dither {
        let mut diffused = image.clone();
        imageops::dither(&mut diffused, &palette);
        imageops::index_colors(&diffused, &palette).into_raw()
    } else {
        let mut cache: HashMap<[u8; CHANNELS], u8> = HashMap::new();
        image
            .pixels()
            .map(|p| {
                *cache
                    .entry(p.0)
                    .or_insert_with(|| palette.nearest(p) as u8)
            })
            .collect()
    };

    Quantized { palette, indices }
}

/// Up to `k` representative colors, most populous first. Equal populations
/// keep the order in which their color first appears in the image.
pub fn ranked_colors(image: &RgbImage, k: u16) -> Vec<Rgb<u8>> {
    let quantized = quantize(image, k, false);
    let mut counts: Vec<(u8, u64)> = Vec::new();
    let mut slot: HashMap<u8, usize> = HashMap::new();
    for &index in &quantized.indices {
        let pos = *slot.entry(index).or_insert_with(|| {
            counts.push((index, 0));
            counts.len() - 1
        });
        counts[pos].1 += 1;
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(usize::from(k))
        .filter_map(|(index, _)| quantized.palette.colors().get(usize::from(index)).copied())
        .collect()
}
