// convolution.rs -- Separable 1D convolution and the Gaussian pre-filter.
//
// The edge chain smooths the grayscale frame with a 5×5 Gaussian before
// taking gradients. A Gaussian is separable, K = g * g^T, so the 2D
// filter is two 1D passes:
//
//   convolve_rows()  horizontal pass, any Pixel type in, f32 out
//   convolve_cols()  vertical pass, f32 in, f32 out
//
// which costs O(2k) per pixel instead of O(k²).
//
// BORDER HANDLING
// ───────────────
// Out-of-range taps are mapped back into the row or column:
//
//   Replicate    ... a a | a b c d | d d ...   (Sobel)
//   Reflect101   ... c b | a b c d | c b ...   (Gaussian blur)
//
// Reflect101 mirrors about the edge pixel without repeating it. Either
// way a constant frame filters to itself all the way to the border.

use crate::convert::f32_raw_to_u8;
use crate::image::{Image, Pixel};

/// How taps that fall outside the image are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Border {
    /// Repeat the edge pixel.
    #[default]
    Replicate,
    /// Mirror about the edge pixel, excluding it.
    Reflect101,
}

impl Border {
    /// Map a possibly out-of-range coordinate into `0..len`. `len > 0`.
    #[inline]
    fn resolve(self, p: isize, len: usize) -> usize {
        let n = len as isize;
        match self {
            Border::Replicate => p.clamp(0, n - 1) as usize,
            Border::Reflect101 => {
                if n == 1 {
                    return 0;
                }
                // Kernels wider than the image can need several bounces.
                let mut p = p;
                while p < 0 || p >= n {
                    p = if p < 0 { -p } else { 2 * (n - 1) - p };
                }
                p as usize
            }
        }
    }
}

/// Sum of `kernel` taps centered at `x`, resolving out-of-range taps
/// through `border`.
#[inline]
fn border_tap<F: Fn(usize) -> f32>(
    x: usize,
    len: usize,
    kernel: &[f32],
    border: Border,
    sample: F,
) -> f32 {
    let half = kernel.len() / 2;
    kernel.iter().enumerate().fold(0.0f32, |acc, (ki, &kv)| {
        let sx = border.resolve(x as isize + ki as isize - half as isize, len);
        acc + sample(sx) * kv
    })
}

fn check_kernel(kernel: &[f32]) {
    assert!(!kernel.is_empty(), "kernel must not be empty");
    assert!(kernel.len() % 2 == 1, "kernel length must be odd (got {})", kernel.len());
}

/// Convolve each row of `src` with a centered 1D kernel (horizontal pass),
/// replicating edge pixels.
pub fn convolve_rows<T: Pixel>(src: &Image<T>, kernel: &[f32]) -> Image<f32> {
    convolve_rows_with(src, kernel, Border::Replicate)
}

/// Horizontal pass with an explicit border mode.
///
/// Interior pixels, where the window never leaves the row, skip the border
/// mapping and use unchecked reads.
pub fn convolve_rows_with<T: Pixel>(src: &Image<T>, kernel: &[f32], border: Border) -> Image<f32> {
    check_kernel(kernel);

    let w = src.width();
    let h = src.height();
    let half = kernel.len() / 2;
    let mut dst = Image::<f32>::new(w, h);
    if w == 0 {
        return dst;
    }

    for y in 0..h {
        for x in 0..w {
            let acc = if x >= half && x + half < w {
                let mut acc = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    // SAFETY: x - half >= 0 and x + half < w.
                    acc += unsafe { src.get_unchecked(x + ki - half, y) }.to_f32() * kv;
                }
                acc
            } else {
                border_tap(x, w, kernel, border, |sx| src.get(sx, y).to_f32())
            };
            // SAFETY: x < w, y < h by loop bounds.
            unsafe { dst.set_unchecked(x, y, acc) };
        }
    }
    dst
}

/// Convolve each column of `src` with a centered 1D kernel (vertical pass),
/// replicating edge pixels.
pub fn convolve_cols(src: &Image<f32>, kernel: &[f32]) -> Image<f32> {
    convolve_cols_with(src, kernel, Border::Replicate)
}

/// Vertical pass with an explicit border mode.
pub fn convolve_cols_with(src: &Image<f32>, kernel: &[f32], border: Border) -> Image<f32> {
    check_kernel(kernel);

    let w = src.width();
    let h = src.height();
    let half = kernel.len() / 2;
    let mut dst = Image::<f32>::new(w, h);
    if h == 0 {
        return dst;
    }

    for y in 0..h {
        let interior = y >= half && y + half < h;
        for x in 0..w {
            let acc = if interior {
                let mut acc = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    // SAFETY: y - half >= 0 and y + half < h.
                    acc += unsafe { src.get_unchecked(x, y + ki - half) } * kv;
                }
                acc
            } else {
                border_tap(y, h, kernel, border, |sy| src.get(x, sy))
            };
            unsafe { dst.set_unchecked(x, y, acc) };
        }
    }
    dst
}

/// Full separable 2D convolution: horizontal pass then vertical pass.
///
/// # Panics
/// Panics if either kernel is empty or has even length.
pub fn convolve_separable<T: Pixel>(
    src: &Image<T>,
    kernel_row: &[f32],
    kernel_col: &[f32],
) -> Image<f32> {
    convolve_separable_with(src, kernel_row, kernel_col, Border::Replicate)
}

/// Separable 2D convolution with the same border mode on both passes.
pub fn convolve_separable_with<T: Pixel>(
    src: &Image<T>,
    kernel_row: &[f32],
    kernel_col: &[f32],
    border: Border,
) -> Image<f32> {
    let intermediate = convolve_rows_with(src, kernel_row, border);
    convolve_cols_with(&intermediate, kernel_col, border)
}

/// Generate a normalized 1D Gaussian kernel of length `2 * half_size + 1`.
///
/// # Examples
/// ```
/// let k = edgeview::convolution::gaussian_kernel_1d(2, 1.4);
/// assert_eq!(k.len(), 5);
/// assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
/// ```
pub fn gaussian_kernel_1d(half_size: usize, sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "sigma must be positive");
    let len = 2 * half_size + 1;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..len)
        .map(|i| {
            let x = i as f32 - half_size as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Gaussian-blur an 8-bit image with a square `ksize`×`ksize` kernel.
///
/// Borders are mirrored (`Border::Reflect101`). The result is rounded back
/// to u8, so the gradient stage sees the same quantized intensities a
/// display would.
///
/// # Panics
/// Panics if `ksize` is even or `sigma <= 0`.
pub fn gaussian_blur(src: &Image<u8>, ksize: usize, sigma: f32) -> Image<u8> {
    assert!(ksize % 2 == 1, "kernel size must be odd (got {ksize})");
    let k = gaussian_kernel_1d(ksize / 2, sigma);
    f32_raw_to_u8(&convolve_separable_with(src, &k, &k, Border::Reflect101))
}
