//! Raw rectangle → UI-viewport frame decoding.
//!
//! A successfully captured 32-bpp Raw rectangle is interpreted as a
//! four-channel image, cropped by a fixed horizontal margin and
//! resampled to the UI viewport. The crop offset compensates for the
//! constant margin the fixed capture region produces relative to the
//! viewport; both are hardcoded together (see
//! [`crate::rfb::session::CAPTURE_REGION`]).

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::MirrorError;

// ── Constants ────────────────────────────────────────────────────

/// UI viewport width — the fixed logical coordinate space in which
/// gestures are captured and frames are displayed.
pub const UI_WIDTH: u32 = 320;

/// UI viewport height.
pub const UI_HEIGHT: u32 = 700;

/// Left edge of the fixed crop applied before resampling.
const CROP_LEFT: u32 = 20;

/// Right edge (exclusive) of the fixed crop.
const CROP_RIGHT: u32 = 300;

// ── RawRect ──────────────────────────────────────────────────────

/// One Raw-encoded rectangle as read off the wire: position, size,
/// and exactly `width * height * 4` payload bytes.
#[derive(Debug, Clone)]
pub struct RawRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Pixel bytes in row-major order, 4 bytes per pixel.
    pub data: Vec<u8>,
}

// ── Frame ────────────────────────────────────────────────────────

/// A decoded frame at exactly the UI viewport size.
///
/// Ephemeral: produced and consumed per capture cycle. Equality is
/// pixel equality and exists solely so the capture loop can skip
/// publishing a frame identical to the previous one.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.image.dimensions() == other.image.dimensions()
            && self.image.as_raw() == other.image.as_raw()
    }
}

impl Eq for Frame {}

impl Frame {
    /// Frame width in pixels (always [`UI_WIDTH`]).
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels (always [`UI_HEIGHT`]).
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The underlying RGBA image.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the frame, returning the RGBA image.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

// ── decode ───────────────────────────────────────────────────────

/// Decode a 32-bpp Raw rectangle into a viewport-sized [`Frame`].
///
/// The payload length must equal `width * height * 4`; a short or
/// mismatched payload invalidates the whole frame — there is no
/// partial rendering.
pub fn decode(rect: RawRect) -> Result<Frame, MirrorError> {
    let (w, h) = (rect.width as u32, rect.height as u32);
    let expected = w as usize * h as usize * 4;
    if rect.data.len() != expected {
        return Err(MirrorError::Decode(format!(
            "payload length {} does not match {w}x{h}x4",
            rect.data.len()
        )));
    }

    let image = RgbaImage::from_raw(w, h, rect.data)
        .ok_or_else(|| MirrorError::Decode("pixel buffer rejected".into()))?;

    // Fixed crop (20,0)–(300,700), clamped to the decoded size for
    // undersized rectangles, then an area-correct resample back to
    // the full viewport.
    let crop_w = CROP_RIGHT.min(w).saturating_sub(CROP_LEFT.min(w));
    let crop_h = UI_HEIGHT.min(h);
    if crop_w == 0 || crop_h == 0 {
        return Err(MirrorError::Decode(format!(
            "rectangle {w}x{h} smaller than the crop margin"
        )));
    }
    let cropped = imageops::crop_imm(&image, CROP_LEFT.min(w), 0, crop_w, crop_h).to_image();
    let resized = imageops::resize(&cropped, UI_WIDTH, UI_HEIGHT, FilterType::Lanczos3);

    Ok(Frame { image: resized })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rect(w: u16, h: u16, rgba: [u8; 4]) -> RawRect {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(w as usize * h as usize * 4)
            .collect();
        RawRect {
            x: 0,
            y: 0,
            width: w,
            height: h,
            data,
        }
    }

    #[test]
    fn decode_produces_viewport_size() {
        let frame = decode(solid_rect(320, 700, [10, 20, 30, 255])).unwrap();
        assert_eq!(frame.width(), UI_WIDTH);
        assert_eq!(frame.height(), UI_HEIGHT);
        // Solid input stays solid through crop and resample.
        assert_eq!(frame.image().get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(frame.image().get_pixel(319, 699).0, [10, 20, 30, 255]);
    }

    #[test]
    fn decode_rejects_short_payload() {
        let mut rect = solid_rect(320, 700, [0, 0, 0, 255]);
        rect.data.truncate(rect.data.len() - 1);
        assert!(matches!(decode(rect), Err(MirrorError::Decode(_))));
    }

    #[test]
    fn decode_rejects_oversized_payload() {
        let mut rect = solid_rect(16, 16, [0, 0, 0, 255]);
        rect.data.push(0);
        assert!(decode(rect).is_err());
    }

    #[test]
    fn decode_rejects_degenerate_rect() {
        let rect = solid_rect(10, 10, [0, 0, 0, 255]);
        // Narrower than the left crop margin.
        assert!(decode(rect).is_err());
    }

    #[test]
    fn identical_frames_compare_equal() {
        let a = decode(solid_rect(320, 700, [1, 2, 3, 255])).unwrap();
        let b = decode(solid_rect(320, 700, [1, 2, 3, 255])).unwrap();
        let c = decode(solid_rect(320, 700, [9, 9, 9, 255])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
