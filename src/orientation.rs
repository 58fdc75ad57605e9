// orientation.rs -- Right-angle rotations for sensor-mount correction.
//
// Camera sensors are mounted at a fixed angle relative to the display.
// Most phone back cameras deliver landscape frames that must be turned
// 90° clockwise to appear upright in portrait, which is the default.
//
// Index mapping for a source of size w × h (clockwise rotations):
//
//   None          (x, y) → (x,         y)          out: w × h
//   Clockwise90   (x, y) → (h - 1 - y, x)          out: h × w
//   Clockwise180  (x, y) → (w - 1 - x, h - 1 - y)  out: w × h
//   Clockwise270  (x, y) → (y,         w - 1 - x)  out: h × w

use std::fmt;

use crate::image::{Image, Pixel};

/// A clockwise rotation by a multiple of 90°.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    None,
    #[default]
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    /// Parse a clockwise angle in degrees. Only 0, 90, 180 and 270 are valid.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise90),
            180 => Some(Rotation::Clockwise180),
            270 => Some(Rotation::Clockwise270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Rotation::Clockwise90 => Rotation::Clockwise270,
            Rotation::Clockwise270 => Rotation::Clockwise90,
            other => other,
        }
    }

    /// Whether width and height trade places.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::Clockwise270)
    }

    /// Output dimensions for a `width`×`height` input.
    pub fn output_size(self, width: usize, height: usize) -> (usize, usize) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}° cw", self.degrees())
    }
}

/// Rotate `src` clockwise by `rotation` into a freshly allocated image.
pub fn rotate<T: Pixel>(src: &Image<T>, rotation: Rotation) -> Image<T> {
    let w = src.width();
    let h = src.height();
    let (ow, oh) = rotation.output_size(w, h);

    if rotation == Rotation::None {
        // Compact copy (drops any stride padding).
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            data.extend_from_slice(src.row(y));
        }
        return Image::from_vec(w, h, data);
    }

    let mut dst = Image::<T>::new(ow, oh);
    for y in 0..h {
        for (x, &p) in src.row(y).iter().enumerate() {
            let (dx, dy) = match rotation {
                Rotation::Clockwise90 => (h - 1 - y, x),
                Rotation::Clockwise180 => (w - 1 - x, h - 1 - y),
                Rotation::Clockwise270 => (y, w - 1 - x),
                Rotation::None => (x, y),
            };
            // SAFETY: each mapping is a bijection onto [0, ow) × [0, oh).
            unsafe { dst.set_unchecked(dx, dy, p) };
        }
    }
    dst
}
