use super::frame::Frame;
use crate::error::Result;

/// A physical capture device as seen by the acquisition loop.
pub trait CaptureDevice: Send {
    fn is_opened(&self) -> bool;

    /// Read the next frame into `frame`.
    ///
    /// `Ok(false)` means no frame was available this time; `frame` may then
    /// hold garbage and must not be published.
    fn read_into(&mut self, frame: &mut Frame) -> Result<bool>;
}

#[cfg(feature = "opencv")]
pub use self::opencv_camera::OpenCvCamera;

#[cfg(feature = "opencv")]
mod opencv_camera {
    use opencv::{core, prelude::*, videoio};

    use super::CaptureDevice;
    use crate::capture::frame::{Frame, CHANNELS};
    use crate::error::{Error, Result};

    pub struct OpenCvCamera {
        capture: videoio::VideoCapture,
        mat: Mat,
        index: u32,
    }

    impl OpenCvCamera {
        /// Open camera `index` and request a `width` x `height` stream.
        pub fn open(index: u32, width: u32, height: u32) -> Result<Self> {
            // CAP_ANY lets OpenCV pick V4L2 / AVFoundation / Media Foundation
            let mut capture = videoio::VideoCapture::new(index as i32, videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(Error::DeviceOpen(format!("camera index {}", index)));
            }

            let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64);
            let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64);

            let actual_w = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
            let actual_h = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
            crate::utils::logger::info(&format!(
                "Camera {} opened: requested {}x{}, got {}x{}",
                index, width, height, actual_w, actual_h
            ));

            Ok(Self {
                capture,
                mat: Mat::default(),
                index,
            })
        }
    }

    impl CaptureDevice for OpenCvCamera {
        fn is_opened(&self) -> bool {
            self.capture.is_opened().unwrap_or(false)
        }

        fn read_into(&mut self, frame: &mut Frame) -> Result<bool> {
            if !self.capture.read(&mut self.mat)? || self.mat.empty() {
                return Ok(false);
            }
            if self.mat.typ() != core::CV_8UC3 {
                return Err(Error::InvalidFrame(format!(
                    "camera {} delivered {} channel frames",
                    self.index,
                    self.mat.channels()
                )));
            }

            let width = self.mat.cols() as u32;
            let height = self.mat.rows() as u32;
            if self.mat.is_continuous() {
                frame.set_bgr(width, height, self.mat.data_bytes()?)?;
            } else {
                let packed = self.mat.try_clone()?;
                frame.set_bgr(width, height, packed.data_bytes()?)?;
            }
            debug_assert_eq!(frame.data().len(), (width * height) as usize * CHANNELS);
            Ok(true)
        }
    }
}
