// gradient.rs -- 3×3 Sobel gradients for the edge detector.
//
// Sobel kernels are separable:
//   Sobel_x: row [-1, 0, 1] (derivative), col [1, 2, 1] (smoothing)
//   Sobel_y: row [ 1, 2, 1] (smoothing),  col [-1, 0, 1] (derivative)
//
// Output is unnormalized, so for u8 input each component lies in
// [-1020, 1020]. The edge thresholds (50 / 150) are defined on this scale
// applied to the L1 magnitude |gx| + |gy|.
//
// Border handling (clamp) is inherited from convolve_separable.

use crate::convolution::convolve_separable;
use crate::image::{Image, Pixel};

const SOBEL_DERIV: [f32; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

/// Horizontal gradient. Positive where intensity increases to the right.
pub fn sobel_x<T: Pixel>(src: &Image<T>) -> Image<f32> {
    convolve_separable(src, &SOBEL_DERIV, &SOBEL_SMOOTH)
}

/// Vertical gradient. Positive where intensity increases downward.
pub fn sobel_y<T: Pixel>(src: &Image<T>) -> Image<f32> {
    convolve_separable(src, &SOBEL_SMOOTH, &SOBEL_DERIV)
}

/// Both gradients at once.
pub fn sobel_xy<T: Pixel>(src: &Image<T>) -> (Image<f32>, Image<f32>) {
    (sobel_x(src), sobel_y(src))
}

/// L1 gradient magnitude |gx| + |gy|, per pixel.
pub fn l1_magnitude(gx: &Image<f32>, gy: &Image<f32>) -> Image<f32> {
    assert_eq!(gx.width(), gy.width(), "gradient widths differ");
    assert_eq!(gx.height(), gy.height(), "gradient heights differ");
    let mut mag = Image::<f32>::new(gx.width(), gx.height());
    for y in 0..gx.height() {
        let (rx, ry) = (gx.row(y), gy.row(y));
        for (dst, (a, b)) in mag.row_mut(y).iter_mut().zip(rx.iter().zip(ry)) {
            *dst = a.abs() + b.abs();
        }
    }
    mag
}
