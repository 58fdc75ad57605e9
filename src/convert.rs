// convert.rs -- Conversions between pixel representations.
//
//   Image<Rgb> → Image<u8>   grayscale, BT.601 luma, 14-bit fixed point
//   Image<u8>  → Image<Rgb>  gray replicated into all three channels
//   Image<f32> → Image<u8>   clamp + round (after blurring)
//
// The grayscale weights are the BT.601 ones (0.299, 0.587, 0.114) scaled
// by 2^14 and rounded so they sum to exactly 16384. A white pixel stays
// 255 and a gray pixel (r == g == b) maps back to itself.

use crate::image::{Image, Pixel, Rgb};

const GRAY_SHIFT: u32 = 14;
const GRAY_R: u32 = 4899;
const GRAY_G: u32 = 9617;
const GRAY_B: u32 = 1868;
const GRAY_ROUND: u32 = 1 << (GRAY_SHIFT - 1);

/// Luma of a single RGB pixel.
#[inline]
pub fn luma(p: Rgb) -> u8 {
    let y = GRAY_R * p.r as u32 + GRAY_G * p.g as u32 + GRAY_B * p.b as u32 + GRAY_ROUND;
    // Max is 255 * 16384 + 8192 >> 14 = 255, so the cast cannot wrap.
    (y >> GRAY_SHIFT) as u8
}

/// Convert a packed RGB image to single-channel grayscale.
pub fn rgb_to_gray(src: &Image<Rgb>) -> Image<u8> {
    src.map(luma)
}

/// Expand a single-channel image to RGB by copying the value into every
/// channel, so downstream consumers always see three channels.
pub fn gray_to_rgb(src: &Image<u8>) -> Image<Rgb> {
    src.map(Rgb::splat)
}

/// Convert an Image<f32> with raw intensity values to Image<u8>.
/// Clamps to [0, 255] and rounds.
pub fn f32_raw_to_u8(src: &Image<f32>) -> Image<u8> {
    src.map(u8::from_f32)
}
