// canny.rs -- Two-threshold (Canny) edge detector.
//
// Input is an already-smoothed 8-bit grayscale frame. Output is a binary
// edge map: 255 on edges, 0 elsewhere.
//
//   1. Sobel gradients gx, gy and L1 magnitude m = |gx| + |gy|.
//   2. Non-maximum suppression along the gradient direction, quantized
//      into four sectors (0°, 45°, 90°, 135°). A pixel survives only if it
//      is a local maximum across the edge.
//   3. Double threshold: m > high → strong edge; low < m <= high → weak
//      candidate; otherwise discarded.
//   4. Hysteresis: weak candidates 8-connected (directly or transitively)
//      to a strong edge are promoted; the rest are dropped.
//
// SECTOR TEST
// ───────────
// With ax = |gx|, ay = |gy|:
//   ay < tan(22.5°)·ax  → gradient is horizontal, compare left / right
//   ay > tan(67.5°)·ax  → gradient is vertical,   compare up / down
//   otherwise           → diagonal; the sign of gx·gy picks which one
//
// Ties: in the horizontal and vertical sectors the pixel must be strictly
// greater than the "before" neighbor and greater-or-equal to the "after"
// neighbor, so of two pixels sharing a peak exactly one survives. The
// diagonal sectors require strictly greater on both sides.
//
// Magnitudes outside the frame count as zero, so pixels on the image
// border can still be edges.

use crate::gradient::{l1_magnitude, sobel_xy};
use crate::image::Image;

const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

/// Per-pixel classification after non-maximum suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Suppressed,
    Weak,
    Strong,
}

/// Canny edge detector with fixed hysteresis thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CannyDetector {
    /// Candidates need a magnitude strictly above this.
    pub low_threshold: f32,
    /// Seeds need a magnitude strictly above this.
    pub high_threshold: f32,
}

impl CannyDetector {
    /// # Panics
    /// Panics if `low_threshold > high_threshold` or either is negative.
    pub fn new(low_threshold: f32, high_threshold: f32) -> Self {
        assert!(
            low_threshold >= 0.0 && low_threshold <= high_threshold,
            "thresholds must satisfy 0 <= low <= high (got {low_threshold}, {high_threshold})"
        );
        CannyDetector { low_threshold, high_threshold }
    }

    /// Run the detector on a grayscale image.
    pub fn detect(&self, src: &Image<u8>) -> Image<u8> {
        let w = src.width();
        let h = src.height();
        let mut edges = Image::<u8>::new(w, h);
        if w == 0 || h == 0 {
            return edges;
        }

        let (gx, gy) = sobel_xy(src);
        let mag = l1_magnitude(&gx, &gy);
        let classes = self.suppress(&gx, &gy, &mag);

        // Hysteresis: flood from every strong pixel through weak ones.
        let mut stack: Vec<(usize, usize)> = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if classes.get(x, y) == Class::Strong as u8 && edges.get(x, y) == 0 {
                    edges.set(x, y, 255);
                    stack.push((x, y));
                    while let Some((cx, cy)) = stack.pop() {
                        for (nx, ny) in neighbors8(cx, cy, w, h) {
                            if edges.get(nx, ny) == 0 && classes.get(nx, ny) != Class::Suppressed as u8 {
                                edges.set(nx, ny, 255);
                                stack.push((nx, ny));
                            }
                        }
                    }
                }
            }
        }
        edges
    }

    /// Non-maximum suppression + double threshold, one class byte per pixel.
    fn suppress(&self, gx: &Image<f32>, gy: &Image<f32>, mag: &Image<f32>) -> Image<u8> {
        let w = mag.width();
        let h = mag.height();
        let mut classes = Image::<u8>::filled(w, h, Class::Suppressed as u8);

        // Zero outside the frame.
        let m_at = |x: isize, y: isize| -> f32 {
            if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
                0.0
            } else {
                mag.get(x as usize, y as usize)
            }
        };

        for y in 0..h {
            for x in 0..w {
                let m = mag.get(x, y);
                if m <= self.low_threshold {
                    continue;
                }

                let dx = gx.get(x, y);
                let dy = gy.get(x, y);
                let ax = dx.abs();
                let ay = dy.abs();
                let (xi, yi) = (x as isize, y as isize);

                let is_max = if ay < TAN_22_5 * ax {
                    m > m_at(xi - 1, yi) && m >= m_at(xi + 1, yi)
                } else if ay > TAN_67_5 * ax {
                    m > m_at(xi, yi - 1) && m >= m_at(xi, yi + 1)
                } else {
                    // Same signs: gradient points down-right, the edge runs
                    // down-left, so compare the ↖ and ↘ neighbors.
                    let s: isize = if (dx < 0.0) != (dy < 0.0) { -1 } else { 1 };
                    m > m_at(xi - s, yi - 1) && m > m_at(xi + s, yi + 1)
                };

                if is_max {
                    let class = if m > self.high_threshold { Class::Strong } else { Class::Weak };
                    classes.set(x, y, class as u8);
                }
            }
        }
        classes
    }
}

impl Default for CannyDetector {
    /// Thresholds 50 / 150 on the 0–255 intensity scale.
    fn default() -> Self {
        CannyDetector::new(50.0, 150.0)
    }
}

/// In-bounds 8-neighbors of (x, y).
fn neighbors8(x: usize, y: usize, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    const OFFSETS: [(isize, isize); 8] = [
        (-1, -1), (0, -1), (1, -1),
        (-1, 0),           (1, 0),
        (-1, 1),  (0, 1),  (1, 1),
    ];
    OFFSETS.into_iter().filter_map(move |(ox, oy)| {
        let nx = x as isize + ox;
        let ny = y as isize + oy;
        if nx >= 0 && ny >= 0 && (nx as usize) < w && (ny as usize) < h {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    })
}
