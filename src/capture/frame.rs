use fast_image_resize as fr;
use fr::images::Image;

use crate::error::{Error, Result};

pub const CHANNELS: usize = 3;

/// One BGR24 image from the camera.
///
/// Every holder owns its own copy; frames are never shared between threads
/// by reference. `sequence` is stamped by the `FrameSource` when the frame is
/// installed and only ever grows, so readers can tell a fresh frame from one
/// they have already seen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl Frame {
    /// Frame holding no valid data, as the shared slot is at startup.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidFrame(format!(
                "{}x{} BGR frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence: 0,
        })
    }

    /// Solid-color frame, used for probe writes and tests.
    pub fn filled(width: u32, height: u32, bgr: Bgr) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&bgr.0);
        }
        Self {
            data,
            width,
            height,
            sequence: 0,
        }
    }

    /// Replace the contents, reusing the existing allocation.
    pub fn set_bgr(&mut self, width: u32, height: u32, bytes: &[u8]) -> Result<()> {
        let expected = width as usize * height as usize * CHANNELS;
        if bytes.len() != expected {
            return Err(Error::InvalidFrame(format!(
                "{}x{} BGR frame needs {} bytes, got {}",
                width,
                height,
                expected,
                bytes.len()
            )));
        }
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Bgr> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some(Bgr([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]))
    }

    fn put_pixel(&mut self, x: u32, y: u32, color: Bgr) {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[offset..offset + CHANNELS].copy_from_slice(&color.0);
    }

    /// Draw a one pixel outline, clipped to the frame.
    pub fn draw_rectangle(&mut self, rect: Rect, color: Bgr) {
        if self.is_empty() || rect.is_empty() {
            return;
        }
        let Some((left, top, right, bottom)) = rect.clip(self.width, self.height) else {
            return;
        };

        for x in left..=right {
            if rect.y >= 0 {
                self.put_pixel(x, top, color);
            }
            if rect.bottom() < self.height as i64 {
                self.put_pixel(x, bottom, color);
            }
        }
        for y in top..=bottom {
            if rect.x >= 0 {
                self.put_pixel(left, y, color);
            }
            if rect.right() < self.width as i64 {
                self.put_pixel(right, y, color);
            }
        }
    }

    /// Resample to `width` x `height` with a cubic filter.
    pub fn resized(&self, width: u32, height: u32) -> Result<Frame> {
        if self.is_empty() || width == 0 || height == 0 {
            return Err(Error::InvalidFrame("cannot resize an empty frame".into()));
        }
        if self.width == width && self.height == height {
            return Ok(self.clone());
        }

        let src_image = Image::from_vec_u8(
            self.width,
            self.height,
            self.data.clone(),
            fr::PixelType::U8x3,
        )
        .map_err(|e| Error::Resize(e.to_string()))?;
        let mut dst_image = Image::new(width, height, fr::PixelType::U8x3);

        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom));
        let mut resizer = fr::Resizer::new();
        resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| Error::Resize(e.to_string()))?;

        let mut frame = Frame::from_bgr(dst_image.buffer().to_vec(), width, height)?;
        frame.sequence = self.sequence;
        Ok(frame)
    }

    /// Pixel data reordered to RGB, for image encoders.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(CHANNELS) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        rgb
    }
}

/// A BGR color triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bgr(pub [u8; 3]);

impl Bgr {
    pub const BLACK: Bgr = Bgr([0, 0, 0]);
    pub const RED: Bgr = Bgr([0, 0, 255]);
    pub const BLUE: Bgr = Bgr([255, 0, 0]);
}

/// Axis-aligned rectangle in frame coordinates. May extend past the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn right(&self) -> i64 {
        self.x as i64 + self.width as i64 - 1
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64 - 1
    }

    /// Inclusive pixel bounds inside a `width` x `height` frame.
    fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let left = (self.x as i64).max(0);
        let top = (self.y as i64).max(0);
        let right = self.right().min(width as i64 - 1);
        let bottom = self.bottom().min(height as i64 - 1);
        if left > right || top > bottom {
            return None;
        }
        Some((left as u32, top as u32, right as u32, bottom as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame() {
        let frame = Frame::empty();
        assert!(frame.is_empty());
        assert_eq!(frame.pixel(0, 0), None);
    }

    #[test]
    fn test_from_bgr_rejects_wrong_length() {
        assert!(Frame::from_bgr(vec![0; 10], 2, 2).is_err());
        assert!(Frame::from_bgr(vec![0; 12], 2, 2).is_ok());
    }

    #[test]
    fn test_draw_rectangle_outline_only() {
        let mut frame = Frame::filled(6, 6, Bgr::BLACK);
        frame.draw_rectangle(Rect::new(1, 1, 4, 4), Bgr::RED);

        assert_eq!(frame.pixel(1, 1), Some(Bgr::RED));
        assert_eq!(frame.pixel(4, 1), Some(Bgr::RED));
        assert_eq!(frame.pixel(1, 4), Some(Bgr::RED));
        assert_eq!(frame.pixel(4, 4), Some(Bgr::RED));
        assert_eq!(frame.pixel(2, 2), Some(Bgr::BLACK));
        assert_eq!(frame.pixel(0, 0), Some(Bgr::BLACK));
        assert_eq!(frame.pixel(5, 5), Some(Bgr::BLACK));
    }

    #[test]
    fn test_draw_rectangle_clips_to_frame() {
        let mut frame = Frame::filled(4, 4, Bgr::BLACK);
        frame.draw_rectangle(Rect::new(-2, -2, 4, 4), Bgr::BLUE);

        // Only the right and bottom edges fall inside the frame.
        assert_eq!(frame.pixel(1, 0), Some(Bgr::BLUE));
        assert_eq!(frame.pixel(0, 1), Some(Bgr::BLUE));
        assert_eq!(frame.pixel(0, 0), Some(Bgr::BLACK));

        let mut frame = Frame::filled(4, 4, Bgr::BLACK);
        frame.draw_rectangle(Rect::new(10, 10, 3, 3), Bgr::BLUE);
        assert_eq!(frame, Frame::filled(4, 4, Bgr::BLACK));
    }

    #[test]
    fn test_resized_keeps_color() {
        let frame = Frame::filled(16, 12, Bgr([10, 20, 30]));
        let small = frame.resized(8, 6).unwrap();
        assert_eq!(small.width(), 8);
        assert_eq!(small.height(), 6);
        assert_eq!(small.pixel(3, 3), Some(Bgr([10, 20, 30])));
    }

    #[test]
    fn test_to_rgb_swaps_channels() {
        let frame = Frame::filled(1, 1, Bgr([1, 2, 3]));
        assert_eq!(frame.to_rgb(), vec![3, 2, 1]);
    }
}
