// tests/test_filters.rs -- Integration tests for the edge filter chain:
// convolution, Gaussian blur, Sobel and Canny through the public API.

use edgeview::canny::CannyDetector;
use edgeview::convolution::{convolve_separable, gaussian_blur, gaussian_kernel_1d};
use edgeview::gradient::{l1_magnitude, sobel_xy};
use edgeview::image::Image;

// ===== Convolution =====

#[test]
fn separable_gaussian_preserves_mean() {
    // The kernel sums to 1, so apart from border effects the mean is kept.
    let mut img: Image<u8> = Image::new(32, 32);
    for y in 0..32 {
        for x in 0..32 {
            img.set(x, y, ((x * 7 + y * 13) % 256) as u8);
        }
    }

    let n = (img.width() * img.height()) as f32;
    let mean_before: f32 = img.pixels().map(|(_, _, v)| v as f32).sum::<f32>() / n;

    let k = gaussian_kernel_1d(2, 1.4);
    let blurred = convolve_separable(&img, &k, &k);

    let mean_after: f32 = blurred.pixels().map(|(_, _, v)| v).sum::<f32>() / n;

    assert!(
        (mean_before - mean_after).abs() < 2.0,
        "mean shifted too much: {mean_before} → {mean_after}"
    );
}

#[test]
fn horizontal_gradient_survives_vertical_blur() {
    // kernel_row = identity, kernel_col = gaussian: structure along x
    // is untouched.
    let mut img = Image::<f32>::new(20, 20);
    for y in 0..20 {
        for x in 0..20 {
            img.set(x, y, x as f32 * 10.0);
        }
    }

    let identity = vec![0.0, 0.0, 1.0, 0.0, 0.0];
    let gauss = gaussian_kernel_1d(2, 1.4);
    let out = convolve_separable(&img, &identity, &gauss);

    for y in 3..17 {
        for x in 3..17 {
            assert!(
                (out.get(x, y) - img.get(x, y)).abs() < 1e-3,
                "horizontal gradient damaged at ({x},{y})"
            );
        }
    }
}

#[test]
fn gaussian_blur_keeps_step_monotonic() {
    let mut img = Image::<u8>::new(16, 4);
    for y in 0..4 {
        for x in 8..16 {
            img.set(x, y, 200);
        }
    }
    let out = gaussian_blur(&img, 5, 1.4);
    let row = out.row(1);
    assert!(row.windows(2).all(|p| p[0] <= p[1]), "row not monotonic: {row:?}");
    assert_eq!(row[0], 0);
    assert_eq!(row[15], 200);
    assert!(row[7] > 0 && row[8] < 200);
}

// ===== Gradients =====

#[test]
fn diagonal_step_has_both_components() {
    // Everything with x + y >= 10 is bright.
    let mut img = Image::<u8>::new(12, 12);
    for y in 0..12 {
        for x in 0..12 {
            if x + y >= 10 {
                img.set(x, y, 100);
            }
        }
    }
    let (gx, gy) = sobel_xy(&img);
    let (x, y) = (5, 5);
    assert!(gx.get(x, y) > 0.0 && gy.get(x, y) > 0.0);
    let mag = l1_magnitude(&gx, &gy);
    assert!((mag.get(x, y) - (gx.get(x, y) + gy.get(x, y))).abs() < 1e-4);
}

// ===== Canny on blurred input =====

#[test]
fn blurred_horizontal_step_gives_one_row() {
    let mut img = Image::<u8>::new(12, 16);
    for y in 8..16 {
        for x in 0..12 {
            img.set(x, y, 180);
        }
    }
    let edges = CannyDetector::default().detect(&gaussian_blur(&img, 5, 1.4));

    let rows: Vec<usize> = (0..16)
        .filter(|&y| edges.row(y).iter().any(|&v| v == 255))
        .collect();
    assert_eq!(rows.len(), 1, "edge rows: {rows:?}");
    assert!(rows[0] == 7 || rows[0] == 8, "edge row {}", rows[0]);
    assert!(edges.row(rows[0]).iter().all(|&v| v == 255));
}

#[test]
fn dark_top_rows_edge_follows_mirrored_border() {
    // Rows 0-1 dark, the rest bright. Mirroring at the top border makes
    // the blurred column [44, 69, 131, 178, 200, ...], whose steepest
    // gradient is at row 2.
    let mut img = Image::filled(12, 16, 200u8);
    for y in 0..2 {
        for x in 0..12 {
            img.set(x, y, 0);
        }
    }
    let blurred = gaussian_blur(&img, 5, 1.4);
    let column: Vec<u8> = (0..5).map(|y| blurred.get(5, y)).collect();
    assert_eq!(column, vec![44, 69, 131, 178, 200]);

    let edges = CannyDetector::default().detect(&blurred);
    let rows: Vec<usize> = (0..16).filter(|&y| edges.get(5, y) == 255).collect();
    assert_eq!(rows, vec![2]);
    assert!(edges.row(2).iter().all(|&v| v == 255));
}

#[test]
fn higher_thresholds_find_fewer_edges() {
    let mut img = Image::<u8>::new(24, 24);
    for y in 0..24 {
        for x in 0..24 {
            img.set(x, y, (((x / 4) + (y / 4)) % 2 * 90 + (x * 3) % 40) as u8);
        }
    }
    let blurred = gaussian_blur(&img, 5, 1.4);
    let count = |det: CannyDetector| {
        det.detect(&blurred).pixels().filter(|&(_, _, v)| v == 255).count()
    };
    let loose = count(CannyDetector::new(20.0, 60.0));
    let strict = count(CannyDetector::new(100.0, 300.0));
    assert!(loose >= strict, "loose {loose} < strict {strict}");
    assert!(loose > 0);
}
