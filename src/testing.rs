//! Hardware-free stand-ins for the camera, the native video backend and the
//! external encoder.

use crossbeam_channel::{Receiver, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::frame::CHANNELS;
use crate::capture::{CaptureDevice, Frame};
use crate::codec::{FourCc, VideoBackend, VideoSink};
use crate::error::{Error, Result};
use crate::recorder::{TranscodeJob, TranscodeProcess, Transcoder};
use crate::utils::sync::lock;

const CLIP_MAGIC: &[u8; 4] = b"FAKE";

/// Camera producing uniform grey frames whose level changes on every read.
pub(crate) struct FakeCamera {
    width: u32,
    height: u32,
    opened: bool,
    delay: Duration,
    reads: u64,
    fail_after: Option<u64>,
    block_after: Option<(u64, Duration)>,
    stall_on: Option<(u64, Duration)>,
}

impl FakeCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            opened: true,
            delay: Duration::from_millis(1),
            reads: 0,
            fail_after: None,
            block_after: None,
            stall_on: None,
        }
    }

    pub fn closed() -> Self {
        Self {
            opened: false,
            ..Self::new(4, 4)
        }
    }

    /// Time each read takes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every read after the first `reads` fails.
    pub fn failing_after(mut self, reads: u64) -> Self {
        self.fail_after = Some(reads);
        self
    }

    /// Every read after the first `reads` hangs for `stall`.
    pub fn blocking_after(mut self, reads: u64, stall: Duration) -> Self {
        self.block_after = Some((reads, stall));
        self
    }

    /// Read number `read` hangs for `stall` and yields nothing; later reads
    /// produce frames again.
    pub fn stalling_once(mut self, read: u64, stall: Duration) -> Self {
        self.stall_on = Some((read, stall));
        self
    }
}

impl CaptureDevice for FakeCamera {
    fn is_opened(&self) -> bool {
        self.opened
    }

    fn read_into(&mut self, frame: &mut Frame) -> Result<bool> {
        self.reads += 1;
        if let Some((after, stall)) = self.block_after {
            if self.reads > after {
                thread::sleep(stall);
                return Ok(false);
            }
        }
        if let Some((read, stall)) = self.stall_on {
            if self.reads == read {
                thread::sleep(stall);
                return Ok(false);
            }
        }
        if self.fail_after.is_some_and(|after| self.reads > after) {
            return Err(Error::InvalidFrame("simulated read failure".into()));
        }
        thread::sleep(self.delay);

        let level = (self.reads % 251) as u8;
        let len = self.width as usize * self.height as usize * CHANNELS;
        frame.set_bgr(self.width, self.height, &vec![level; len])?;
        Ok(true)
    }
}

/// Backend writing a small tagged file per clip and keeping every written
/// frame in memory.
#[derive(Default)]
pub(crate) struct FakeBackend {
    substitutions: Vec<(FourCc, FourCc)>,
    rejected: Vec<FourCc>,
    frames: Arc<Mutex<Vec<Frame>>>,
    opened: Mutex<Vec<FourCc>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Silently write `actual` when asked for `requested`.
    pub fn substituting(mut self, requested: FourCc, actual: FourCc) -> Self {
        self.substitutions.push((requested, actual));
        self
    }

    pub fn rejecting(mut self, codec: FourCc) -> Self {
        self.rejected.push(codec);
        self
    }

    pub fn written_frames(&self) -> Vec<Frame> {
        lock(&self.frames).clone()
    }

    /// Codecs of every writer opened so far, in order.
    pub fn codecs_opened(&self) -> Vec<FourCc> {
        lock(&self.opened).clone()
    }
}

impl VideoBackend for FakeBackend {
    fn open_writer(
        &self,
        path: &Path,
        codec: FourCc,
        _fps: f64,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn VideoSink>> {
        if self.rejected.contains(&codec) {
            return Err(Error::EncoderOpen {
                path: path.to_path_buf(),
                codec,
            });
        }
        let written = self
            .substitutions
            .iter()
            .find(|(requested, _)| *requested == codec)
            .map_or(codec, |(_, actual)| *actual);

        let mut header = CLIP_MAGIC.to_vec();
        header.extend_from_slice(&written.as_bytes());
        fs::write(path, header)?;
        lock(&self.opened).push(codec);

        Ok(Box::new(FakeSink {
            width,
            height,
            frames: Arc::clone(&self.frames),
            released: false,
        }))
    }

    fn read_codec(&self, path: &Path) -> Result<FourCc> {
        let bytes = fs::read(path)?;
        if bytes.len() < 8 || &bytes[..4] != CLIP_MAGIC {
            return Err(Error::InvalidFrame(format!(
                "{} is not a fake clip",
                path.display()
            )));
        }
        Ok(FourCc::new([bytes[4], bytes[5], bytes[6], bytes[7]]))
    }
}

struct FakeSink {
    width: u32,
    height: u32,
    frames: Arc<Mutex<Vec<Frame>>>,
    released: bool,
}

impl VideoSink for FakeSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        if self.released {
            return Err(Error::InvalidFrame("write after release".into()));
        }
        if frame.width() != self.width || frame.height() != self.height {
            return Err(Error::InvalidFrame(format!(
                "{}x{} frame for a {}x{} clip",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        lock(&self.frames).push(frame.clone());
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        Ok(())
    }
}

/// Transcoder whose jobs run until the test releases them.
#[derive(Default)]
pub(crate) struct GatedTranscoder {
    started: Mutex<Vec<(TranscodeJob, Sender<bool>)>>,
}

impl GatedTranscoder {
    /// Let the `index`-th started job finish, waiting for it to start first.
    /// A successful job leaves an encoded file at its destination.
    pub fn release(&self, index: usize, success: bool) {
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            if let Some((_, gate)) = lock(&self.started).get(index) {
                gate.send(success).unwrap();
                return;
            }
            assert!(Instant::now() < deadline, "job {} never started", index);
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Transcoder for GatedTranscoder {
    fn start(&self, job: &TranscodeJob) -> Result<Box<dyn TranscodeProcess>> {
        let (gate, wait) = crossbeam_channel::bounded(1);
        lock(&self.started).push((job.clone(), gate));
        Ok(Box::new(GatedProcess {
            wait,
            destination: job.destination.clone(),
        }))
    }
}

struct GatedProcess {
    wait: Receiver<bool>,
    destination: PathBuf,
}

impl TranscodeProcess for GatedProcess {
    fn wait(&mut self) -> Result<bool> {
        let success = self
            .wait
            .recv()
            .map_err(|_| Error::Subprocess("transcoder dropped".into()))?;
        if success {
            fs::write(&self.destination, b"encoded")?;
        }
        Ok(success)
    }
}
