pub mod backend;
pub mod fourcc;
pub mod probe;

#[cfg(feature = "opencv")]
pub use backend::OpenCvBackend;
pub use backend::{VideoBackend, VideoSink};
pub use fourcc::FourCc;
pub use probe::{
    default_candidates, raw_codec, CodecCandidate, CodecCapabilityProbe, CodecDescriptor,
    CodecTable, EncodePath, EncoderKind,
};
