// yuv.rs -- NV21 frame views and YUV → RGB conversion.
//
// NV21 LAYOUT (width = 4, height = 2 → 12 bytes)
// ──────────────────────────────────────────────
//
//   Y Y Y Y      luma plane: one byte per pixel, width × height
//   Y Y Y Y
//   V U V U      chroma plane: height/2 rows of width bytes,
//                one V,U pair per 2×2 pixel block (V first)
//
// Pixel (x, y) reads Y at `y * width + x` and its chroma pair at
// `width * height + (y / 2) * width + (x / 2) * 2`.
//
// `RawFrame` is the only way into the pipeline. Its constructor checks
// dimensions and buffer length up front, so the conversion loops below
// index through slices that are already known to be long enough.
//
// COLOR TRANSFORM
// ───────────────
// ITU-R BT.601, limited range, fixed point with a 20-bit shift:
//
//   C = max(Y - 16, 0) · 1.164
//   R = C + 1.596 · (V - 128)
//   G = C - 0.813 · (V - 128) - 0.391 · (U - 128)
//   B = C + 2.018 · (U - 128)
//
// Each coefficient is pre-multiplied by 2^20; a half-unit is added before
// the shift to round to nearest. Results saturate to [0, 255].
//
// The second half of this file packs a three-plane YUV 4:2:0 capture
// (separate Y, U and V planes, each with its own row and pixel stride, as
// delivered by mobile camera APIs) into a tight NV21 buffer.

use thiserror::Error;

use crate::image::{Image, Rgb};

const SHIFT: u32 = 20;
const ROUND: i32 = 1 << (SHIFT - 1);
const COEF_Y: i32 = 1_220_542;
const COEF_RV: i32 = 1_673_527;
const COEF_GV: i32 = -852_492;
const COEF_GU: i32 = -409_993;
const COEF_BU: i32 = 2_116_026;

/// Errors from validating frame geometry or buffer sizes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame dimensions must be positive (got {width}×{height})")]
    ZeroDimension { width: usize, height: usize },

    #[error("4:2:0 chroma needs even dimensions (got {width}×{height})")]
    OddDimension { width: usize, height: usize },

    #[error("frame size {width}×{height} overflows usize")]
    DimensionOverflow { width: usize, height: usize },

    #[error("frame buffer too small: need {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("{plane} plane too small: need {expected} bytes, got {actual}")]
    PlaneTooSmall { plane: &'static str, expected: usize, actual: usize },

    #[error("{plane} plane has invalid strides (row {row_stride}, pixel {pixel_stride})")]
    InvalidStride { plane: &'static str, row_stride: usize, pixel_stride: usize },
}

/// Bytes needed for an NV21 frame of the given size, after validating
/// the dimensions.
pub fn nv21_len(width: usize, height: usize) -> Result<usize, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::ZeroDimension { width, height });
    }
    if width % 2 != 0 || height % 2 != 0 {
        return Err(FrameError::OddDimension { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|luma| luma.checked_add(luma / 2))
        .ok_or(FrameError::DimensionOverflow { width, height })
}

// ---------------------------------------------------------------------------
// RawFrame
// ---------------------------------------------------------------------------

/// A borrowed, validated NV21 frame.
///
/// Construction guarantees `luma.len() == width * height` and
/// `chroma.len() == width * height / 2`; trailing bytes in the caller's
/// buffer are ignored.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    luma: &'a [u8],
    chroma: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> RawFrame<'a> {
    /// Validate `data` as an NV21 frame of `width`×`height`.
    pub fn new(data: &'a [u8], width: usize, height: usize) -> Result<Self, FrameError> {
        let expected = nv21_len(width, height)?;
        if data.len() < expected {
            return Err(FrameError::BufferTooSmall { expected, actual: data.len() });
        }
        let (luma, rest) = data.split_at(width * height);
        Ok(RawFrame {
            luma,
            chroma: &rest[..width * height / 2],
            width,
            height,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Luma bytes of row `y`.
    #[inline]
    pub fn luma_row(&self, y: usize) -> &'a [u8] {
        &self.luma[y * self.width..(y + 1) * self.width]
    }

    /// Interleaved V,U bytes shared by rows `2 * cy` and `2 * cy + 1`.
    #[inline]
    pub fn chroma_row(&self, cy: usize) -> &'a [u8] {
        &self.chroma[cy * self.width..(cy + 1) * self.width]
    }
}

/// Convert one Y, U, V triple to RGB.
#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Rgb {
    let c = (y as i32 - 16).max(0) * COEF_Y;
    let u = u as i32 - 128;
    let v = v as i32 - 128;

    let r = (c + COEF_RV * v + ROUND) >> SHIFT;
    let g = (c + COEF_GV * v + COEF_GU * u + ROUND) >> SHIFT;
    let b = (c + COEF_BU * u + ROUND) >> SHIFT;
    Rgb::new(saturate(r), saturate(g), saturate(b))
}

#[inline]
fn saturate(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Convert an NV21 frame to packed RGB with the same dimensions.
pub fn nv21_to_rgb(frame: &RawFrame<'_>) -> Image<Rgb> {
    let w = frame.width();
    let h = frame.height();
    let mut dst = Image::<Rgb>::new(w, h);

    for y in 0..h {
        let luma = frame.luma_row(y);
        let chroma = frame.chroma_row(y / 2);
        let out = dst.row_mut(y);
        // Two pixels per chroma pair.
        for (i, pair) in chroma.chunks_exact(2).enumerate() {
            let (v, u) = (pair[0], pair[1]);
            out[2 * i] = yuv_to_rgb(luma[2 * i], u, v);
            out[2 * i + 1] = yuv_to_rgb(luma[2 * i + 1], u, v);
        }
    }
    dst
}

// ---------------------------------------------------------------------------
// Three-plane YUV 4:2:0 → NV21
// ---------------------------------------------------------------------------

/// One plane of a planar/semi-planar YUV 4:2:0 image.
///
/// `row_stride` is the byte distance between rows; `pixel_stride` the byte
/// distance between adjacent samples in a row (1 for planar, 2 when the
/// camera hands out U and V as views into one interleaved buffer).
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl<'a> Plane<'a> {
    pub fn new(data: &'a [u8], row_stride: usize, pixel_stride: usize) -> Self {
        Plane { data, row_stride, pixel_stride }
    }

    /// Bytes needed to address `cols` × `rows` samples, or an error if the
    /// strides cannot describe such a plane.
    fn required_len(&self, name: &'static str, cols: usize, rows: usize) -> Result<usize, FrameError> {
        let bad = || FrameError::InvalidStride {
            plane: name,
            row_stride: self.row_stride,
            pixel_stride: self.pixel_stride,
        };
        if self.pixel_stride == 0 {
            return Err(bad());
        }
        // Bytes from the first to the last sample of one row, inclusive.
        let row_span = cols
            .saturating_sub(1)
            .checked_mul(self.pixel_stride)
            .and_then(|n| n.checked_add(1))
            .ok_or_else(bad)?;
        if self.row_stride < row_span {
            return Err(bad());
        }
        rows.saturating_sub(1)
            .checked_mul(self.row_stride)
            .and_then(|n| n.checked_add(row_span))
            .ok_or_else(bad)
    }

    fn check(&self, name: &'static str, cols: usize, rows: usize) -> Result<(), FrameError> {
        let expected = self.required_len(name, cols, rows)?;
        if self.data.len() < expected {
            return Err(FrameError::PlaneTooSmall { plane: name, expected, actual: self.data.len() });
        }
        Ok(())
    }

    #[inline]
    fn sample(&self, col: usize, row: usize) -> u8 {
        self.data[row * self.row_stride + col * self.pixel_stride]
    }
}

/// Pack Y, U and V planes of a `width`×`height` 4:2:0 image into NV21.
///
/// Row padding in the luma plane is dropped; chroma samples are read
/// through each plane's own strides and interleaved V first.
pub fn pack_nv21(
    y: Plane<'_>,
    u: Plane<'_>,
    v: Plane<'_>,
    width: usize,
    height: usize,
) -> Result<Vec<u8>, FrameError> {
    let total = nv21_len(width, height)?;
    let (cw, ch) = (width / 2, height / 2);
    y.check("Y", width, height)?;
    u.check("U", cw, ch)?;
    v.check("V", cw, ch)?;

    let mut out = Vec::with_capacity(total);
    for row in 0..height {
        if y.pixel_stride == 1 {
            let start = row * y.row_stride;
            out.extend_from_slice(&y.data[start..start + width]);
        } else {
            out.extend((0..width).map(|col| y.sample(col, row)));
        }
    }
    for row in 0..ch {
        for col in 0..cw {
            out.push(v.sample(col, row));
            out.push(u.sample(col, row));
        }
    }
    debug_assert_eq!(out.len(), total);
    Ok(out)
}
