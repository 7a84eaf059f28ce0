use std::path::Path;

use crate::capture::Frame;
use crate::error::{Error, Result};
use crate::shared::constants;

/// Thumbnail size for a `width` x `height` clip: a tenth of a 640 px wide
/// frame at the same aspect ratio, plus a fixed margin. 16:9 gives 79x51,
/// 4:3 gives 79x63.
pub fn thumbnail_size(width: u32, height: u32) -> (u32, u32) {
    let base = constants::THUMBNAIL_BASE_WIDTH;
    let scaled_h = (base as u64 * height as u64 / width.max(1) as u64) as u32;
    (base + constants::THUMBNAIL_MARGIN, scaled_h + constants::THUMBNAIL_MARGIN)
}

/// Shrink `frame` to thumbnail size and save it as JPEG at `path`.
pub fn write_thumbnail(frame: &Frame, path: &Path) -> Result<()> {
    if frame.is_empty() {
        return Err(Error::InvalidFrame("no lead frame for thumbnail".into()));
    }
    let (width, height) = thumbnail_size(frame.width(), frame.height());
    let small = frame.resized(width, height)?;

    let image = image::RgbImage::from_raw(width, height, small.to_rgb())
        .ok_or_else(|| Error::InvalidFrame("thumbnail buffer size mismatch".into()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save_with_format(path, image::ImageFormat::Jpeg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Bgr;

    #[test]
    fn test_thumbnail_size() {
        assert_eq!(thumbnail_size(1280, 720), (79, 51));
        assert_eq!(thumbnail_size(640, 480), (79, 63));
        assert_eq!(thumbnail_size(0, 0), (79, 15));
    }

    #[test]
    fn test_write_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumbnails").join("t.jpg");
        write_thumbnail(&Frame::filled(160, 120, Bgr::BLUE), &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (79, 63));
        let px = decoded.get_pixel(40, 30);
        // JPEG is lossy; blue must still dominate
        assert!(px[2] > 200 && px[0] < 60, "{:?}", px);
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_thumbnail(&Frame::empty(), &dir.path().join("t.jpg")).is_err());
    }
}
