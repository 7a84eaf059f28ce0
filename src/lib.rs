pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod recorder;
pub mod shared;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use capture::{Frame, FrameSource, Rect};
pub use codec::{CodecCapabilityProbe, CodecTable, EncodePath, FourCc};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use recorder::{Recorder, RecorderEvent, RecorderSettings};
