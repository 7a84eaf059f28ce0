use std::path::Path;

use super::fourcc::FourCc;
use crate::capture::Frame;
use crate::error::Result;

/// An open native video writer.
pub trait VideoSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the file. Writes after release are errors.
    fn release(&mut self) -> Result<()>;
}

/// Native (in-process) encoding and container inspection.
pub trait VideoBackend: Send + Sync {
    /// Open a writer for `codec`. Fails with `Error::EncoderOpen` when the
    /// backend cannot encode with it.
    fn open_writer(
        &self,
        path: &Path,
        codec: FourCc,
        fps: f64,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn VideoSink>>;

    /// Codec the container at `path` reports for its video stream.
    fn read_codec(&self, path: &Path) -> Result<FourCc>;
}

#[cfg(feature = "opencv")]
pub use self::opencv_backend::OpenCvBackend;

#[cfg(feature = "opencv")]
mod opencv_backend {
    use std::path::Path;

    use opencv::{core, prelude::*, videoio};

    use super::{VideoBackend, VideoSink};
    use crate::capture::Frame;
    use crate::codec::FourCc;
    use crate::error::{Error, Result};

    /// OpenCV `videoio` writer and reader.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct OpenCvBackend;

    struct OpenCvSink {
        writer: videoio::VideoWriter,
        mat: Mat,
        width: u32,
        height: u32,
        released: bool,
    }

    fn path_str(path: &Path) -> Result<&str> {
        path.to_str()
            .ok_or_else(|| Error::InvalidFrame(format!("non UTF-8 path {}", path.display())))
    }

    impl VideoBackend for OpenCvBackend {
        fn open_writer(
            &self,
            path: &Path,
            codec: FourCc,
            fps: f64,
            width: u32,
            height: u32,
        ) -> Result<Box<dyn VideoSink>> {
            let encoder_open = || Error::EncoderOpen {
                path: path.to_path_buf(),
                codec,
            };
            let size = core::Size::new(width as i32, height as i32);
            // Unsupported codecs surface either as an exception or as a
            // writer that never opened, depending on the backend.
            let writer = videoio::VideoWriter::new(path_str(path)?, codec.to_i32(), fps, size, true)
                .map_err(|_| encoder_open())?;
            if !writer.is_opened().unwrap_or(false) {
                return Err(encoder_open());
            }

            let mat = Mat::new_rows_cols_with_default(
                height as i32,
                width as i32,
                core::CV_8UC3,
                core::Scalar::all(0.0),
            )?;
            Ok(Box::new(OpenCvSink {
                writer,
                mat,
                width,
                height,
                released: false,
            }))
        }

        fn read_codec(&self, path: &Path) -> Result<FourCc> {
            let mut reader = videoio::VideoCapture::from_file(path_str(path)?, videoio::CAP_ANY)?;
            if !reader.is_opened()? {
                return Err(Error::DeviceOpen(format!("cannot read back {}", path.display())));
            }
            let fourcc = reader.get(videoio::CAP_PROP_FOURCC)? as i64 as i32;
            let _ = reader.release();
            Ok(FourCc::from_i32(fourcc))
        }
    }

    impl VideoSink for OpenCvSink {
        fn write(&mut self, frame: &Frame) -> Result<()> {
            if self.released {
                return Err(Error::InvalidFrame("write after release".into()));
            }
            if frame.width() != self.width || frame.height() != self.height {
                return Err(Error::InvalidFrame(format!(
                    "frame is {}x{}, writer expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                )));
            }
            self.mat.data_bytes_mut()?.copy_from_slice(frame.data());
            self.writer.write(&self.mat)?;
            Ok(())
        }

        fn release(&mut self) -> Result<()> {
            if !self.released {
                self.released = true;
                self.writer.release()?;
            }
            Ok(())
        }
    }

    impl Drop for OpenCvSink {
        fn drop(&mut self) {
            let _ = self.release();
        }
    }
}
