use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::device::CaptureDevice;
use super::frame::Frame;
use crate::error::{Error, Result};
use crate::utils::{logger, sync::lock};

/// Back-off after a failed device read so a dead device does not spin a core.
const READ_RETRY_DELAY: Duration = Duration::from_millis(2);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The acquisition thread exited and was joined.
    Joined,
    /// The thread did not exit within the stop timeout and was left behind.
    Abandoned,
    /// Acquisition was not running.
    NotRunning,
}

/// Owns the capture device and keeps the freshest frame available to any
/// number of readers.
///
/// The acquisition loop reads as fast as the device allows into a private
/// scratch frame, then swaps it into the shared slot under the lock. Readers
/// copy out under the same lock, so they only ever see complete frames and
/// never wait on device I/O.
pub struct FrameSource {
    slot: Arc<Mutex<Frame>>,
    device_open: AtomicBool,
    worker: Mutex<Option<Worker>>,
    parked: Mutex<Option<Box<dyn CaptureDevice>>>,
    stop_timeout: Duration,
}

/// One acquisition thread and the token that keeps it running. Each thread
/// gets its own token so an abandoned thread stays stopped across reopens.
struct Worker {
    run: Arc<AtomicBool>,
    handle: JoinHandle<Box<dyn CaptureDevice>>,
}

impl FrameSource {
    pub fn new(stop_timeout: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Frame::empty())),
            device_open: AtomicBool::new(false),
            worker: Mutex::new(None),
            parked: Mutex::new(None),
            stop_timeout,
        }
    }

    /// Open OpenCV camera `index` at the requested resolution and start acquiring.
    #[cfg(feature = "opencv")]
    pub fn open(&self, index: u32, width: u32, height: u32) -> Result<()> {
        if self.is_acquiring() {
            return Err(Error::AlreadyOpen);
        }
        match super::device::OpenCvCamera::open(index, width, height) {
            Ok(camera) => self.open_device(Box::new(camera)),
            Err(e) => {
                lock(&self.parked).take();
                self.device_open.store(false, Ordering::SeqCst);
                logger::error(&format!("Could not open camera {}: {}", index, e));
                Err(e)
            }
        }
    }

    /// Take ownership of an opened device, prime the slot with one synchronous
    /// read and start the acquisition loop.
    pub fn open_device(&self, mut device: Box<dyn CaptureDevice>) -> Result<()> {
        if self.is_acquiring() {
            return Err(Error::AlreadyOpen);
        }
        // a new open attempt replaces any stopped device, even if it fails
        lock(&self.parked).take();
        if !device.is_opened() {
            self.device_open.store(false, Ordering::SeqCst);
            logger::error("Capture device reported closed on open");
            return Err(Error::DeviceOpen("device is not opened".into()));
        }
        self.device_open.store(true, Ordering::SeqCst);

        let run = Arc::new(AtomicBool::new(true));
        let mut scratch = Frame::empty();
        match device.read_into(&mut scratch) {
            Ok(true) => {
                install(&self.slot, &mut scratch, &run);
            }
            Ok(false) => logger::warn("Priming read returned no frame"),
            Err(e) => logger::warn(&format!("Priming read failed: {}", e)),
        }

        self.spawn(device, run)
    }

    /// Restart acquisition on the device kept from the last `stop`.
    pub fn resume(&self) -> Result<()> {
        if self.is_acquiring() {
            return Err(Error::AlreadyOpen);
        }
        let device = lock(&self.parked)
            .take()
            .ok_or_else(|| Error::DeviceOpen("no stopped device to resume".into()))?;
        self.spawn(device, Arc::new(AtomicBool::new(true)))
    }

    fn spawn(&self, mut device: Box<dyn CaptureDevice>, run: Arc<AtomicBool>) -> Result<()> {
        let token = Arc::clone(&run);
        let slot = Arc::clone(&self.slot);

        let spawned = thread::Builder::new()
            .name("frame-acquisition".into())
            .spawn(move || {
                logger::debug("Acquisition thread started");
                let mut scratch = Frame::empty();
                let mut frames_read = 0u64;
                let mut failed_reads = 0u64;

                while token.load(Ordering::SeqCst) {
                    match device.read_into(&mut scratch) {
                        Ok(true) => {
                            if install(&slot, &mut scratch, &token) {
                                frames_read += 1;
                            }
                        }
                        Ok(false) => {
                            failed_reads += 1;
                            thread::sleep(READ_RETRY_DELAY);
                        }
                        Err(e) => {
                            failed_reads += 1;
                            // first failure and then every 1024th
                            if failed_reads & 0x3ff == 1 {
                                logger::debug(&format!("Device read failed: {}", e));
                            }
                            thread::sleep(READ_RETRY_DELAY);
                        }
                    }
                }

                logger::debug(&format!(
                    "Acquisition thread exiting. Frames read: {}, failed reads: {}",
                    frames_read, failed_reads
                ));
                device
            });

        match spawned {
            Ok(handle) => {
                *lock(&self.worker) = Some(Worker { run, handle });
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copy of the current shared frame. May be empty before the first read.
    pub fn latest_frame(&self) -> Frame {
        lock(&self.slot).clone()
    }

    /// Copy of the shared frame only if it is newer than `sequence`.
    pub fn latest_frame_after(&self, sequence: u64) -> Option<Frame> {
        let slot = lock(&self.slot);
        if slot.sequence() > sequence {
            Some(slot.clone())
        } else {
            None
        }
    }

    /// Stop the acquisition loop and join it, waiting at most the stop
    /// timeout. Idempotent.
    pub fn stop(&self) -> StopOutcome {
        let Some(worker) = lock(&self.worker).take() else {
            return StopOutcome::NotRunning;
        };
        worker.run.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + self.stop_timeout;
        while !worker.handle.is_finished() {
            if Instant::now() >= deadline {
                // the thread keeps its device and drops it once the read returns
                logger::warn(&format!(
                    "Acquisition thread did not exit within {:?}; abandoning it",
                    self.stop_timeout
                ));
                return StopOutcome::Abandoned;
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }

        match worker.handle.join() {
            Ok(device) => *lock(&self.parked) = Some(device),
            Err(_) => {
                logger::error("Acquisition thread panicked");
                self.device_open.store(false, Ordering::SeqCst);
            }
        }
        StopOutcome::Joined
    }

    /// Whether the device was opened successfully. Independent of whether the
    /// acquisition loop is currently running.
    pub fn is_open(&self) -> bool {
        if let Some(device) = lock(&self.parked).as_ref() {
            return device.is_opened();
        }
        self.device_open.load(Ordering::SeqCst)
    }

    pub fn is_acquiring(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .is_some_and(|worker| worker.run.load(Ordering::SeqCst))
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Publish `scratch` unless `run` was cleared. The sequence is stamped under
/// the slot lock so published sequences always increase.
fn install(slot: &Mutex<Frame>, scratch: &mut Frame, run: &AtomicBool) -> bool {
    let mut shared = lock(slot);
    if !run.load(Ordering::SeqCst) {
        return false;
    }
    scratch.set_sequence(shared.sequence() + 1);
    std::mem::swap(&mut *shared, scratch);
    true
}
