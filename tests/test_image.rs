// tests/test_image.rs -- Integration tests for Image<Rgb>, byte packing
// and the gray conversions the edge path relies on.
//
// Only the public API is used here; the container's own accessors are
// covered by the unit tests in src/image.rs.

use edgeview::convert;
use edgeview::image::{Image, Rgb};

fn gradient_rgb(w: usize, h: usize) -> Image<Rgb> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            img.set(x, y, Rgb::new((x * 10) as u8, (y * 10) as u8, (x + y) as u8));
        }
    }
    img
}

// ===== Rgb =====

#[test]
fn rgb_channel_order_is_r_g_b() {
    let p = Rgb::new(1, 2, 3);
    assert_eq!(p.to_array(), [1, 2, 3]);
    assert_eq!((p.r, p.g, p.b), (1, 2, 3));
    assert_eq!(Rgb::splat(9).to_array(), [9, 9, 9]);
    assert_eq!(Rgb::default(), Rgb::new(0, 0, 0));
}

#[test]
fn rgb_is_three_bytes() {
    assert_eq!(std::mem::size_of::<Rgb>(), 3);
    let pixels = [Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)];
    let bytes: &[u8] = bytemuck::cast_slice(&pixels);
    assert_eq!(bytes, &[1, 2, 3, 4, 5, 6]);
}

// ===== to_rgb_bytes =====

#[test]
fn rgb_bytes_follow_row_major_order() {
    let img = gradient_rgb(3, 2);
    let bytes = img.to_rgb_bytes();
    assert_eq!(bytes.len(), 3 * 2 * 3);
    for (i, px) in bytes.chunks_exact(3).enumerate() {
        let (x, y) = (i % 3, i / 3);
        assert_eq!(px, &img.get(x, y).to_array(), "pixel {i} at ({x}, {y})");
    }
}

#[test]
fn rgb_bytes_are_packed_without_stride_padding() {
    let mut img: Image<Rgb> = Image::new_with_stride(2, 2, 4);
    img.set(0, 0, Rgb::new(1, 2, 3));
    img.set(1, 1, Rgb::new(7, 8, 9));
    let bytes = img.to_rgb_bytes();
    assert_eq!(bytes.len(), 2 * 2 * 3);
    assert_eq!(&bytes[0..3], &[1, 2, 3]);
    assert_eq!(&bytes[3..9], &[0; 6]);
    assert_eq!(&bytes[9..12], &[7, 8, 9]);
}

#[test]
fn rgb_bytes_of_empty_image() {
    let img: Image<Rgb> = Image::new(0, 3);
    assert!(img.to_rgb_bytes().is_empty());
}

#[test]
fn index_and_get_agree_on_rgb() {
    let mut img = gradient_rgb(4, 3);
    img[(2, 1)] = Rgb::new(200, 100, 50);
    assert_eq!(img.get(2, 1), Rgb::new(200, 100, 50));
    assert_eq!(img[(3, 2)], Rgb::new(30, 20, 5));
}

// ===== Conversions =====

#[test]
fn gray_roundtrip_through_rgb() {
    let data = vec![0u8, 1, 127, 128, 254, 255];
    let img = Image::from_vec(6, 1, data.clone());
    let back = convert::rgb_to_gray(&convert::gray_to_rgb(&img));
    for (i, &expected) in data.iter().enumerate() {
        assert_eq!(back.get(i, 0), expected, "roundtrip mismatch at pixel {i}");
    }
}

#[test]
fn gray_to_rgb_bytes_repeat_each_sample() {
    let img = Image::from_vec(2, 2, vec![0u8, 255, 40, 90]);
    let bytes = convert::gray_to_rgb(&img).to_rgb_bytes();
    assert_eq!(bytes, vec![0, 0, 0, 255, 255, 255, 40, 40, 40, 90, 90, 90]);
}

#[test]
fn luma_weights_green_heaviest() {
    let r = convert::luma(Rgb::new(255, 0, 0));
    let g = convert::luma(Rgb::new(0, 255, 0));
    let b = convert::luma(Rgb::new(0, 0, 255));
    assert!(g > r && r > b, "r={r} g={g} b={b}");
    assert_eq!(convert::luma(Rgb::splat(77)), 77);
}

#[test]
fn rgb_to_gray_keeps_dimensions() {
    let gray = convert::rgb_to_gray(&gradient_rgb(5, 3));
    assert_eq!((gray.width(), gray.height()), (5, 3));
    assert_eq!(gray.get(0, 0), 0);
}

#[test]
fn raw_f32_conversion_rounds_and_saturates() {
    let img = Image::from_vec(4, 1, vec![-3.0f32, 41.6, 128.4, 300.0]);
    let out = convert::f32_raw_to_u8(&img);
    assert_eq!(out.row(0), &[0, 42, 128, 255]);
}
