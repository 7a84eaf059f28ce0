use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use super::backend::VideoBackend;
use super::fourcc::FourCc;
use crate::capture::{Bgr, Frame};
use crate::error::Result;
use crate::shared::constants;
use crate::utils::{file_utils::RemoveOnDrop, logger};

/// A codec worth probing and how the external encoder names it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecCandidate {
    pub fourcc: FourCc,
    pub name: String,
    pub encoder_name: String,
}

impl CodecCandidate {
    pub fn new(fourcc: FourCc, name: &str, encoder_name: &str) -> Self {
        Self {
            fourcc,
            name: name.to_string(),
            encoder_name: encoder_name.to_string(),
        }
    }
}

/// Distinguishes native test clips of concurrent `probe` calls.
static TEST_CLIP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn raw_codec() -> FourCc {
    FourCc::new(constants::RAW_VIDEO_CODEC)
}

/// Raw video plus the two lossless codecs clips are usually kept in.
pub fn default_candidates() -> Vec<CodecCandidate> {
    vec![
        CodecCandidate::new(raw_codec(), "Raw Video", "rawvideo"),
        CodecCandidate::new(FourCc::new(*b"FFV1"), "FFV1 Lossless Video", "ffv1"),
        CodecCandidate::new(FourCc::new(*b"LAGS"), "Lagarith Lossless Video", "lagarith"),
    ]
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CodecDescriptor {
    pub fourcc: FourCc,
    pub name: String,
    pub encoder_name: String,
    pub native_supported: bool,
    pub external_supported: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderKind {
    Native,
    External,
}

/// How a recording reaches its final codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodePath {
    /// The native writer produces the final file directly.
    Native(FourCc),
    /// Record with the native `raw` codec, then re-encode to `target` with
    /// the external encoder's `encoder_codec`.
    External {
        raw: FourCc,
        target: FourCc,
        encoder_codec: String,
    },
}

impl EncodePath {
    /// Codec the native writer is opened with.
    pub fn writer_codec(&self) -> FourCc {
        match self {
            EncodePath::Native(codec) => *codec,
            EncodePath::External { raw, .. } => *raw,
        }
    }

    /// Codec of the finished clip.
    pub fn final_codec(&self) -> FourCc {
        match self {
            EncodePath::Native(codec) => *codec,
            EncodePath::External { target, .. } => *target,
        }
    }

    pub fn needs_transcode(&self) -> bool {
        matches!(self, EncodePath::External { .. })
    }
}

/// Probed capabilities. Read-only once built, apart from `remove_support`.
#[derive(Clone, Debug, Serialize)]
pub struct CodecTable {
    raw_codec: FourCc,
    codecs: Vec<CodecDescriptor>,
}

impl CodecTable {
    pub fn from_descriptors(raw_codec: FourCc, codecs: Vec<CodecDescriptor>) -> Self {
        Self { raw_codec, codecs }
    }

    pub fn descriptors(&self) -> &[CodecDescriptor] {
        &self.codecs
    }

    pub fn descriptor(&self, fourcc: FourCc) -> Option<&CodecDescriptor> {
        self.codecs.iter().find(|d| d.fourcc == fourcc)
    }

    pub fn raw_codec(&self) -> FourCc {
        self.raw_codec
    }

    pub fn is_native_supported(&self, fourcc: FourCc) -> bool {
        self.descriptor(fourcc).is_some_and(|d| d.native_supported)
    }

    pub fn is_external_supported(&self, fourcc: FourCc) -> bool {
        self.descriptor(fourcc).is_some_and(|d| d.external_supported)
    }

    /// Codecs usable through at least one path.
    pub fn supported_codecs(&self) -> Vec<FourCc> {
        self.codecs
            .iter()
            .filter(|d| d.native_supported || d.external_supported)
            .map(|d| d.fourcc)
            .collect()
    }

    pub fn codec_name(&self, fourcc: FourCc) -> Option<&str> {
        self.descriptor(fourcc).map(|d| d.name.as_str())
    }

    pub fn encoder_name(&self, fourcc: FourCc) -> Option<&str> {
        self.descriptor(fourcc).map(|d| d.encoder_name.as_str())
    }

    pub fn remove_support(&mut self, fourcc: FourCc, kind: EncoderKind) {
        if let Some(d) = self.codecs.iter_mut().find(|d| d.fourcc == fourcc) {
            match kind {
                EncoderKind::Native => d.native_supported = false,
                EncoderKind::External => d.external_supported = false,
            }
        }
    }

    /// Pick how to record `requested`: natively when possible, otherwise raw
    /// plus an external re-encode.
    pub fn encode_path(&self, requested: FourCc) -> Option<EncodePath> {
        if self.is_native_supported(requested) {
            return Some(EncodePath::Native(requested));
        }
        if self.is_external_supported(requested) && self.is_native_supported(self.raw_codec) {
            let encoder_codec = self.encoder_name(requested)?.to_string();
            return Some(EncodePath::External {
                raw: self.raw_codec,
                target: requested,
                encoder_codec,
            });
        }
        None
    }
}

/// Determines empirically which codecs can be written natively and which
/// the external encoder can produce.
pub struct CodecCapabilityProbe {
    backend: Arc<dyn VideoBackend>,
    encoder_path: PathBuf,
    scratch_dir: PathBuf,
}

impl CodecCapabilityProbe {
    pub fn new(backend: Arc<dyn VideoBackend>, encoder_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            encoder_path: encoder_path.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory the native test clips are written to.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Test every candidate on both paths. Never fails: any error marks the
    /// affected capability unsupported. Safe to call repeatedly.
    pub fn probe(&self, candidates: &[CodecCandidate]) -> CodecTable {
        let encoder_listing = self.list_encoder_capabilities();

        let codecs: Vec<CodecDescriptor> = candidates
            .par_iter()
            .map(|candidate| {
                let native_supported = self.test_native(candidate.fourcc);
                let external_supported = encoder_listing
                    .as_deref()
                    .is_some_and(|lines| encoder_supports(lines, &candidate.encoder_name));

                logger::info(&format!(
                    "Codec {} ({}): native={} external={}",
                    candidate.fourcc, candidate.name, native_supported, external_supported
                ));

                CodecDescriptor {
                    fourcc: candidate.fourcc,
                    name: candidate.name.clone(),
                    encoder_name: candidate.encoder_name.clone(),
                    native_supported,
                    external_supported,
                }
            })
            .collect();

        CodecTable::from_descriptors(raw_codec(), codecs)
    }

    fn test_native(&self, fourcc: FourCc) -> bool {
        let tag: String = fourcc
            .to_string()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = self.scratch_dir.join(format!(
            "{}_{}_{}_{}{}",
            constants::PROBE_FILE_STEM,
            tag,
            std::process::id(),
            TEST_CLIP_COUNTER.fetch_add(1, Ordering::Relaxed),
            constants::CLIP_EXTENSION
        ));
        let _cleanup = RemoveOnDrop(&path);

        match self.write_and_read_back(&path, fourcc) {
            Ok(written) if written == fourcc => true,
            Ok(written) => {
                logger::info(&format!(
                    "Native writer asked for {} but wrote {}",
                    fourcc, written
                ));
                false
            }
            Err(e) => {
                logger::debug(&format!("Native test for {} failed: {}", fourcc, e));
                false
            }
        }
    }

    fn write_and_read_back(&self, path: &Path, fourcc: FourCc) -> Result<FourCc> {
        let mut writer = self.backend.open_writer(
            path,
            fourcc,
            constants::PROBE_FPS,
            constants::PROBE_WIDTH,
            constants::PROBE_HEIGHT,
        )?;
        writer.write(&Frame::filled(
            constants::PROBE_WIDTH,
            constants::PROBE_HEIGHT,
            Bgr::BLACK,
        ))?;
        writer.release()?;
        drop(writer);

        self.backend.read_codec(path)
    }

    fn list_encoder_capabilities(&self) -> Option<Vec<String>> {
        let output = Command::new(&self.encoder_path)
            .arg(constants::ENCODER_LIST_FLAG)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => Some(
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .map(str::to_string)
                    .collect(),
            ),
            Ok(output) => {
                logger::info(&format!(
                    "External encoder {} exited with {}",
                    self.encoder_path.display(),
                    output.status
                ));
                None
            }
            Err(e) => {
                logger::info(&format!(
                    "External encoder {} unavailable: {}",
                    self.encoder_path.display(),
                    e
                ));
                None
            }
        }
    }
}

/// Whether a `-codecs` listing has a video codec line for `encoder_name`
/// with the encode flag set, e.g. ` DEV.LS ffv1   FFmpeg video codec #1`.
pub fn encoder_supports(lines: &[String], encoder_name: &str) -> bool {
    if encoder_name.is_empty() {
        return false;
    }
    lines.iter().any(|line| {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(flags), Some(codec)) => {
                let flags = flags.as_bytes();
                flags.len() == 6 && flags[1] == b'E' && flags[2] == b'V' && codec == encoder_name
            }
            _ => false,
        }
    })
}
