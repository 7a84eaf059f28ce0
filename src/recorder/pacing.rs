use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::capture::Frame;
use crate::codec::VideoSink;
use crate::sync::{FramePacer, PacerStats};
use crate::utils::{logger, sync::lock};

/// Outcome of one pacing loop.
#[derive(Debug, Clone, Copy)]
pub struct PacingReport {
    /// Wall time from the start of the loop to the release of the writer.
    pub elapsed: Duration,
    pub frames_written: u64,
    pub stats: PacerStats,
}

pub(crate) struct PacingLoop<'a> {
    pub sink: Box<dyn VideoSink>,
    pub lead: Frame,
    pub working: &'a Mutex<Frame>,
    pub running: &'a AtomicBool,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl PacingLoop<'_> {
    /// Write the lead frame, then the working frame once per period until
    /// `running` clears. Empty working frames are skipped.
    pub fn run(mut self) -> PacingReport {
        let started = Instant::now();
        let mut pacer = FramePacer::starting_at(self.fps, started);
        let mut frames_written = 0u64;
        let mut failed_writes = 0u64;

        if !self.lead.is_empty() {
            let lead = std::mem::replace(&mut self.lead, Frame::empty());
            self.write(&lead, &mut frames_written, &mut failed_writes);
        }

        loop {
            pacer.wait_for_next_tick();
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            let frame = lock(self.working).clone();
            if frame.is_empty() {
                continue;
            }
            self.write(&frame, &mut frames_written, &mut failed_writes);
        }

        if let Err(e) = self.sink.release() {
            logger::error(&format!("Failed to release video writer: {}", e));
        }
        let elapsed = started.elapsed();
        let stats = pacer.stats();
        logger::debug(&format!(
            "Pacing loop done: {} frames in {:?} ({:.2} fps, {} late ticks, {} failed writes)",
            frames_written,
            elapsed,
            stats.effective_fps(elapsed),
            stats.late_ticks,
            failed_writes
        ));

        PacingReport {
            elapsed,
            frames_written,
            stats,
        }
    }

    fn write(&mut self, frame: &Frame, written: &mut u64, failed: &mut u64) {
        let result = if frame.width() == self.width && frame.height() == self.height {
            self.sink.write(frame)
        } else {
            frame
                .resized(self.width, self.height)
                .and_then(|resized| self.sink.write(&resized))
        };
        match result {
            Ok(()) => *written += 1,
            Err(e) => {
                *failed += 1;
                if *failed == 1 {
                    logger::error(&format!("Failed to write frame: {}", e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Bgr;
    use crate::codec::{FourCc, VideoBackend};
    use crate::testing::FakeBackend;
    use std::sync::Arc;
    use std::thread;

    fn run_for(
        backend: &FakeBackend,
        lead: Frame,
        working: Frame,
        duration: Duration,
    ) -> PacingReport {
        let dir = tempfile::tempdir().unwrap();
        let sink = backend
            .open_writer(&dir.path().join("clip.avi"), FourCc::new(*b"IYUV"), 25.0, 8, 6)
            .unwrap();
        let working = Arc::new(Mutex::new(working));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let (working, running) = (Arc::clone(&working), Arc::clone(&running));
            thread::spawn(move || {
                PacingLoop {
                    sink,
                    lead,
                    working: &working,
                    running: &running,
                    fps: 25.0,
                    width: 8,
                    height: 6,
                }
                .run()
            })
        };
        thread::sleep(duration);
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap()
    }

    #[test]
    fn test_cadence_and_lead_frame() {
        let backend = FakeBackend::new();
        let lead = Frame::filled(8, 6, Bgr::RED);
        let report = run_for(
            &backend,
            lead.clone(),
            Frame::filled(8, 6, Bgr::BLUE),
            Duration::from_secs(1),
        );

        let frames = backend.written_frames();
        assert_eq!(frames.len() as u64, report.frames_written);
        assert!(
            (20..=32).contains(&frames.len()),
            "{} frames written in {:?}",
            frames.len(),
            report.elapsed
        );
        assert_eq!(frames[0].data(), lead.data());
        assert!(frames[1..].iter().all(|f| f.pixel(0, 0) == Some(Bgr::BLUE)));
    }

    #[test]
    fn test_empty_frames_are_skipped() {
        let backend = FakeBackend::new();
        let report = run_for(
            &backend,
            Frame::empty(),
            Frame::empty(),
            Duration::from_millis(200),
        );
        assert_eq!(report.frames_written, 0);
        assert!(report.stats.ticks >= 3);
    }

    #[test]
    fn test_mismatched_frames_are_resized() {
        let backend = FakeBackend::new();
        run_for(
            &backend,
            Frame::filled(16, 12, Bgr::RED),
            Frame::filled(32, 24, Bgr::BLUE),
            Duration::from_millis(200),
        );
        let frames = backend.written_frames();
        assert!(frames.len() >= 2);
        assert!(frames.iter().all(|f| f.width() == 8 && f.height() == 6));
    }
}
