pub mod device;
pub mod frame;
pub mod source;

pub use device::CaptureDevice;
#[cfg(feature = "opencv")]
pub use device::OpenCvCamera;
pub use frame::{Bgr, Frame, Rect};
pub use source::{FrameSource, StopOutcome};
