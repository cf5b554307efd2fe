//! Perceptual gradient refinement.
//!
//! Downsamples a thumbnail, averages its visible pixels, snaps the average
//! to the closest hue in a small table and pairs it with a fixed partner hue.

use image::imageops::FilterType;

use crate::constants::{SAMPLE_ALPHA_THRESHOLD, SAMPLE_SIZE};
use crate::error::ColorError;
use crate::gradient::{Gradient, Hue, Palette};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn distance_sq(self, other: Rgb) -> u32 {
        let dr = i32::from(self.0) - i32::from(other.0);
        let dg = i32::from(self.1) - i32::from(other.1);
        let db = i32::from(self.2) - i32::from(other.2);
        (dr * dr + dg * dg + db * db) as u32
    }
}

// Tailwind 600 swatches, except stone which uses 400 so pale screenshots
// land on a neutral.
const ANCHORS: &[(Hue, Rgb)] = &[
    (Hue::Slate, Rgb(71, 85, 105)),
    (Hue::Stone, Rgb(168, 162, 158)),
    (Hue::Red, Rgb(220, 38, 38)),
    (Hue::Orange, Rgb(234, 88, 12)),
    (Hue::Amber, Rgb(217, 119, 6)),
    (Hue::Yellow, Rgb(202, 138, 4)),
    (Hue::Lime, Rgb(101, 163, 13)),
    (Hue::Green, Rgb(22, 163, 74)),
    (Hue::Emerald, Rgb(5, 150, 105)),
    (Hue::Teal, Rgb(13, 148, 136)),
    (Hue::Cyan, Rgb(8, 145, 178)),
    (Hue::Sky, Rgb(2, 132, 199)),
    (Hue::Blue, Rgb(37, 99, 235)),
    (Hue::Indigo, Rgb(79, 70, 229)),
    (Hue::Violet, Rgb(124, 58, 237)),
    (Hue::Purple, Rgb(147, 51, 234)),
    (Hue::Fuchsia, Rgb(192, 38, 211)),
    (Hue::Pink, Rgb(219, 39, 119)),
    (Hue::Rose, Rgb(225, 29, 72)),
];

/// Second stop paired with each anchor hue.
pub fn complement(hue: Hue) -> Hue {
    match hue {
        Hue::Slate => Hue::Sky,
        Hue::Stone => Hue::Amber,
        Hue::Red => Hue::Yellow,
        Hue::Orange => Hue::Pink,
        Hue::Amber => Hue::Orange,
        Hue::Yellow => Hue::Pink,
        Hue::Lime => Hue::Emerald,
        Hue::Green => Hue::Blue,
        Hue::Emerald => Hue::Teal,
        Hue::Teal => Hue::Lime,
        Hue::Cyan => Hue::Blue,
        Hue::Sky => Hue::Indigo,
        Hue::Blue => Hue::Violet,
        Hue::Indigo => Hue::Purple,
        Hue::Violet => Hue::Fuchsia,
        Hue::Purple => Hue::Pink,
        Hue::Fuchsia => Hue::Rose,
        Hue::Pink => Hue::Rose,
        Hue::Rose => Hue::Orange,
    }
}

/// Closest entry of `table` to `target` by Euclidean RGB distance.
pub fn nearest<T: Copy>(target: Rgb, table: &[(T, Rgb)]) -> Option<T> {
    table
        .iter()
        .min_by_key(|(_, rgb)| target.distance_sq(*rgb))
        .map(|(value, _)| *value)
}

/// Mean color of the pixels whose alpha is above the threshold, measured
/// on a `SAMPLE_SIZE` square downsample.
pub fn mean_color(image_bytes: &[u8]) -> Result<Rgb, ColorError> {
    let img = image::load_from_memory(image_bytes)?;
    let small = img
        .resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
        .to_rgba8();

    let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);
    for pixel in small.pixels() {
        let [pr, pg, pb, pa] = pixel.0;
        if pa > SAMPLE_ALPHA_THRESHOLD {
            r += u64::from(pr);
            g += u64::from(pg);
            b += u64::from(pb);
            count += 1;
        }
    }

    if count == 0 {
        return Err(ColorError::Transparent);
    }

    Ok(Rgb(
        (r / count) as u8,
        (g / count) as u8,
        (b / count) as u8,
    ))
}

pub fn gradient_for_color(color: Rgb, palette: Palette) -> Gradient {
    let hue = nearest(color, ANCHORS).unwrap_or(Hue::Slate);
    palette.gradient(hue, complement(hue))
}

/// Refined gradient for a thumbnail image.
pub fn sample_gradient(image_bytes: &[u8], palette: Palette) -> Result<Gradient, ColorError> {
    let color = mean_color(image_bytes)?;
    Ok(gradient_for_color(color, palette))
}
