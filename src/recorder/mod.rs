pub mod events;
pub mod log;
pub mod naming;
pub mod pacing;
pub mod relay;
pub mod thumbnail;
pub mod transcode;

pub use events::{EventBus, RecorderEvent};
pub use log::{JsonRecordingLog, LogEntry, RecordingLog};
pub use naming::ClipPaths;
pub use pacing::PacingReport;
pub use relay::Annotation;
pub use transcode::{
    ExternalEncoder, JobId, JobRegistry, TranscodeJob, TranscodeProcess, Transcoder,
};

use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::capture::{Frame, FrameSource, Rect};
use crate::codec::{EncodePath, VideoBackend};
use crate::error::{Error, Result};
use crate::shared::constants;
use crate::utils::file_utils::{ensure_dir, remove_if_exists, replace_file};
use crate::utils::time_utils::format_length;
use crate::utils::{logger, sync::lock};

/// Everything a `Recorder` needs to know about its clips, validated up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecorderSettings {
    pub video_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Draw the detection rectangle into recorded frames.
    pub annotate: bool,
    pub encode_path: EncodePath,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopping,
}

struct ActiveSession {
    paths: ClipPaths,
    lead: Frame,
    started: Instant,
    running: Arc<AtomicBool>,
    pacing: JoinHandle<PacingReport>,
    relay: JoinHandle<u64>,
}

/// State shared with transcode waiter threads, which outlive `stop_recording`.
struct Shared {
    state: Mutex<SessionState>,
    jobs: JobRegistry,
    events: EventBus,
}

impl Shared {
    fn set_state(&self, state: SessionState) {
        *lock(&self.state) = state;
    }

    /// Return to Idle; announces `RecordingStopped` if no job is in flight.
    fn enter_idle(&self) {
        let mut state = lock(&self.state);
        *state = SessionState::Idle;
        if self.jobs.is_empty() {
            self.events.publish(RecorderEvent::RecordingStopped);
        }
    }

    fn finish_job(&self, job: &TranscodeJob, success: bool) {
        if success {
            if let Err(e) = remove_if_exists(&job.source) {
                logger::error(&format!(
                    "{}: failed to remove {}: {}",
                    job.id,
                    job.source.display(),
                    e
                ));
            }
        } else {
            // keep the raw clip under the final name so the log entry stays valid
            logger::warn(&format!(
                "{}: encoding failed, keeping raw clip as {}",
                job.id,
                job.destination.display()
            ));
            if let Err(e) = replace_file(&job.source, &job.destination) {
                logger::error(&format!("{}: failed to keep raw clip: {}", job.id, e));
                if let Err(e) = remove_if_exists(&job.source) {
                    logger::error(&format!(
                        "{}: failed to remove {}: {}",
                        job.id,
                        job.source.display(),
                        e
                    ));
                }
            }
        }
        logger::info(&format!("{} finished (success: {})", job.id, success));
        self.events.publish(RecorderEvent::TranscodeFinished {
            job: job.id,
            success,
        });

        let state = lock(&self.state);
        if let Some((_, remaining)) = self.jobs.remove(job.id) {
            if remaining == 0 && *state == SessionState::Idle {
                self.events.publish(RecorderEvent::RecordingStopped);
            }
        }
    }
}

/// Records paced clips from a `FrameSource`.
///
/// One session at a time: `setup` starts a relay thread that copies (and
/// optionally annotates) source frames into a working buffer and a pacing
/// thread that writes that buffer at the output rate. `stop_recording` joins
/// both and either discards the clip or keeps it, handing it to the external
/// encoder when the target codec cannot be written natively.
///
/// The recorder is fully at rest when the session is Idle and no transcode
/// job is in flight; `RecordingStopped` is published on every transition
/// into that state.
pub struct Recorder {
    source: Arc<FrameSource>,
    backend: Arc<dyn VideoBackend>,
    transcoder: Arc<dyn Transcoder>,
    log: Arc<dyn RecordingLog>,
    settings: RecorderSettings,
    annotation: Arc<Mutex<Annotation>>,
    session: Mutex<Option<ActiveSession>>,
    shared: Arc<Shared>,
}

impl Recorder {
    pub fn new(
        source: Arc<FrameSource>,
        backend: Arc<dyn VideoBackend>,
        transcoder: Arc<dyn Transcoder>,
        log: Arc<dyn RecordingLog>,
        settings: RecorderSettings,
    ) -> Result<Self> {
        ensure_dir(&settings.video_dir.join(constants::THUMBNAIL_DIR_NAME))?;
        logger::info(&format!(
            "Recorder ready: {}x{} @ {} fps into {} ({:?})",
            settings.width,
            settings.height,
            settings.fps,
            settings.video_dir.display(),
            settings.encode_path
        ));

        Ok(Self {
            source,
            backend,
            transcoder,
            log,
            settings,
            annotation: Arc::new(Mutex::new(Annotation::default())),
            session: Mutex::new(None),
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                jobs: JobRegistry::default(),
                events: EventBus::default(),
            }),
        })
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> Receiver<RecorderEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.shared.state)
    }

    pub fn pending_jobs(&self) -> Vec<TranscodeJob> {
        self.shared.jobs.jobs()
    }

    pub fn is_at_rest(&self) -> bool {
        let state = lock(&self.shared.state);
        *state == SessionState::Idle && self.shared.jobs.is_empty()
    }

    /// Rectangle drawn by the relay thread in annotated mode, red when
    /// `positive`. Takes effect on the next relayed frame.
    pub fn set_rectangle(&self, rect: Rect, positive: bool) {
        *lock(&self.annotation) = Annotation {
            rect: Some(rect),
            positive,
        };
    }

    pub fn clear_rectangle(&self) {
        *lock(&self.annotation) = Annotation::default();
    }

    /// Start a session whose first written frame is `lead`. No-op while a
    /// session is active. Fails without starting any thread when the writer
    /// cannot be opened.
    pub fn setup(&self, lead: Frame) -> Result<()> {
        let mut session = lock(&self.session);
        if session.is_some() {
            return Ok(());
        }

        let settings = &self.settings;
        let paths = ClipPaths::allocate(&settings.video_dir, &chrono::Local::now());
        let codec = settings.encode_path.writer_codec();
        let sink = match self.backend.open_writer(
            &paths.temp,
            codec,
            settings.fps as f64,
            settings.width,
            settings.height,
        ) {
            Ok(sink) => sink,
            Err(e) => {
                logger::error(&format!(
                    "Could not open writer for {} with {}: {}",
                    paths.temp.display(),
                    codec,
                    e
                ));
                let _ = remove_if_exists(&paths.temp);
                return Err(e);
            }
        };

        let working = Arc::new(Mutex::new(self.source.latest_frame()));
        let running = Arc::new(AtomicBool::new(true));

        let relay = {
            let source = Arc::clone(&self.source);
            let working = Arc::clone(&working);
            let running = Arc::clone(&running);
            let annotation = settings.annotate.then(|| Arc::clone(&self.annotation));
            thread::Builder::new()
                .name("recorder-relay".into())
                .spawn(move || relay::run(&source, &working, annotation.as_deref(), &running))
        };
        let relay = match relay {
            Ok(handle) => handle,
            Err(e) => {
                drop(sink);
                let _ = remove_if_exists(&paths.temp);
                return Err(e.into());
            }
        };

        let pacing = {
            let lead = lead.clone();
            let working = Arc::clone(&working);
            let running = Arc::clone(&running);
            let (fps, width, height) = (settings.fps as f64, settings.width, settings.height);
            thread::Builder::new()
                .name("recorder-pacing".into())
                .spawn(move || {
                    pacing::PacingLoop {
                        sink,
                        lead,
                        working: &working,
                        running: &running,
                        fps,
                        width,
                        height,
                    }
                    .run()
                })
        };
        let pacing = match pacing {
            Ok(handle) => handle,
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                let _ = relay.join();
                let _ = remove_if_exists(&paths.temp);
                return Err(e.into());
            }
        };

        logger::info(&format!("Recording started: {}", paths.temp.display()));
        *session = Some(ActiveSession {
            paths,
            lead,
            started: Instant::now(),
            running,
            pacing,
            relay,
        });
        self.shared.set_state(SessionState::Recording);
        self.shared.events.publish(RecorderEvent::RecordingStarted);
        Ok(())
    }

    /// End the active session. No-op when idle.
    ///
    /// Returns an error when a kept clip could not be finalized or logged;
    /// the recorder is back to Idle either way.
    pub fn stop_recording(&self, keep: bool) -> Result<()> {
        let mut session = lock(&self.session);
        let Some(active) = session.take() else {
            return Ok(());
        };
        self.shared.set_state(SessionState::Stopping);

        active.running.store(false, Ordering::SeqCst);
        let elapsed = match active.pacing.join() {
            Ok(report) => {
                logger::info(&format!(
                    "Recording stopped after {:?}, {} frames written",
                    report.elapsed, report.frames_written
                ));
                report.elapsed
            }
            Err(_) => {
                logger::error("Pacing thread panicked");
                active.started.elapsed()
            }
        };
        if active.relay.join().is_err() {
            logger::error("Relay thread panicked");
        }

        let paths = active.paths;
        if !keep {
            if let Err(e) = remove_if_exists(&paths.temp) {
                logger::error(&format!(
                    "Failed to remove {}: {}",
                    paths.temp.display(),
                    e
                ));
            }
            self.shared.enter_idle();
            return Ok(());
        }

        if let Err(e) = thumbnail::write_thumbnail(&active.lead, &paths.thumbnail) {
            logger::warn(&format!(
                "Could not write thumbnail {}: {}",
                paths.thumbnail.display(),
                e
            ));
        }
        let entry = LogEntry {
            pathname: self.settings.video_dir.to_string_lossy().into_owned(),
            date_time: paths.timestamp.clone(),
            length: format_length(elapsed),
        };

        match &self.settings.encode_path {
            EncodePath::Native(_) => {
                let result = replace_file(&paths.temp, &paths.final_path)
                    .map_err(Error::from)
                    .and_then(|()| self.append_log(entry));
                if let Err(e) = &result {
                    logger::error(&format!(
                        "Failed to keep {}: {}",
                        paths.final_path.display(),
                        e
                    ));
                }
                self.shared.enter_idle();
                result
            }
            EncodePath::External { encoder_codec, .. } => {
                let logged = self.append_log(entry);
                let job = {
                    let mut state = lock(&self.shared.state);
                    let job = self
                        .shared
                        .jobs
                        .insert(paths.temp, paths.final_path, encoder_codec);
                    *state = SessionState::Idle;
                    job
                };
                self.spawn_transcode(job);
                logged
            }
        }
    }

    fn append_log(&self, entry: LogEntry) -> Result<()> {
        self.log.append(&entry)?;
        logger::info(&format!(
            "Logged recording {} ({})",
            entry.date_time, entry.length
        ));
        self.shared.events.publish(RecorderEvent::LogUpdated(entry));
        Ok(())
    }

    fn spawn_transcode(&self, job: TranscodeJob) {
        let shared = Arc::clone(&self.shared);
        let transcoder = Arc::clone(&self.transcoder);
        let waiter_job = job.clone();
        let spawned = thread::Builder::new()
            .name(format!("transcode-{}", job.id))
            .spawn(move || {
                let success = transcode::run_job(transcoder.as_ref(), &waiter_job);
                shared.finish_job(&waiter_job, success);
            });
        if let Err(e) = spawned {
            logger::error(&format!("{}: could not start waiter thread: {}", job.id, e));
            self.shared.finish_job(&job, false);
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        let _ = self.stop_recording(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Bgr;
    use crate::codec::{raw_codec, FourCc};
    use crate::testing::{FakeBackend, FakeCamera, GatedTranscoder};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    const W: u32 = 16;
    const H: u32 = 12;

    fn ffv1() -> FourCc {
        FourCc::new(*b"FFV1")
    }

    fn external() -> EncodePath {
        EncodePath::External {
            raw: raw_codec(),
            target: ffv1(),
            encoder_codec: "ffv1".into(),
        }
    }

    struct Rig {
        dir: tempfile::TempDir,
        source: Arc<FrameSource>,
        backend: Arc<FakeBackend>,
        transcoder: Arc<GatedTranscoder>,
        log: Arc<JsonRecordingLog>,
        recorder: Recorder,
        events: Receiver<RecorderEvent>,
    }

    fn rig_with(camera: FakeCamera, encode_path: EncodePath, annotate: bool) -> Rig {
        rig_with_backend(camera, encode_path, annotate, FakeBackend::new())
    }

    fn rig_with_backend(
        camera: FakeCamera,
        encode_path: EncodePath,
        annotate: bool,
        backend: FakeBackend,
    ) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FrameSource::new(Duration::from_secs(2)));
        source.open_device(Box::new(camera)).unwrap();
        let backend = Arc::new(backend);
        let transcoder = Arc::new(GatedTranscoder::default());
        let log = Arc::new(JsonRecordingLog::new(dir.path().join("logs.json")));
        let settings = RecorderSettings {
            video_dir: dir.path().join("videos"),
            width: W,
            height: H,
            fps: 25,
            annotate,
            encode_path,
        };
        let recorder = Recorder::new(
            Arc::clone(&source),
            backend.clone(),
            transcoder.clone(),
            log.clone(),
            settings,
        )
        .unwrap();
        let events = recorder.subscribe();
        Rig {
            dir,
            source,
            backend,
            transcoder,
            log,
            recorder,
            events,
        }
    }

    fn rig(encode_path: EncodePath) -> Rig {
        rig_with(FakeCamera::new(W, H), encode_path, false)
    }

    fn video_dir(rig: &Rig) -> PathBuf {
        rig.dir.path().join("videos")
    }

    fn clips(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn drain(events: &Receiver<RecorderEvent>) -> Vec<RecorderEvent> {
        events.try_iter().collect()
    }

    fn count_stopped(events: &[RecorderEvent]) -> usize {
        events
            .iter()
            .filter(|e| **e == RecorderEvent::RecordingStopped)
            .count()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn record(rig: &Rig, duration: Duration) {
        rig.recorder.setup(rig.source.latest_frame()).unwrap();
        thread::sleep(duration);
    }

    #[test]
    fn test_discarded_recording_leaves_nothing() {
        let rig = rig(EncodePath::Native(ffv1()));
        record(&rig, Duration::from_millis(100));
        assert_eq!(rig.recorder.state(), SessionState::Recording);

        rig.recorder.stop_recording(false).unwrap();
        assert!(clips(&video_dir(&rig)).is_empty());
        assert!(rig.log.entries().unwrap().is_empty());
        assert!(rig.recorder.is_at_rest());
        assert_eq!(
            drain(&rig.events),
            vec![RecorderEvent::RecordingStarted, RecorderEvent::RecordingStopped]
        );
    }

    #[test]
    fn test_native_recording_is_kept() {
        let rig = rig(EncodePath::Native(ffv1()));
        record(&rig, Duration::from_millis(1200));
        rig.recorder.stop_recording(true).unwrap();

        let names = clips(&video_dir(&rig));
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("Capture--") && names[0].ends_with(".avi"));
        assert!(!names[0].contains("temp"));

        let entries = rig.log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].length, "00:01");
        assert_eq!(entries[0].pathname, video_dir(&rig).to_string_lossy());
        assert_eq!(names[0], format!("Capture--{}.avi", entries[0].date_time));

        let thumbnail = video_dir(&rig)
            .join("thumbnails")
            .join(format!("{}.jpg", entries[0].date_time));
        assert!(thumbnail.exists());

        let events = drain(&rig.events);
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], RecorderEvent::LogUpdated(entries[0].clone()));
        assert_eq!(events[2], RecorderEvent::RecordingStopped);
        assert_eq!(rig.backend.codecs_opened(), vec![ffv1()]);
    }

    #[test]
    fn test_external_recording_stops_after_transcode() {
        let rig = rig(external());
        record(&rig, Duration::from_millis(100));
        rig.recorder.stop_recording(true).unwrap();

        // logged right away, stopped only once the job is done
        assert_eq!(rig.log.entries().unwrap().len(), 1);
        assert_eq!(rig.recorder.state(), SessionState::Idle);
        assert!(!rig.recorder.is_at_rest());
        let jobs = rig.recorder.pending_jobs();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].source.exists());
        assert_eq!(jobs[0].codec, "ffv1");
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count_stopped(&drain(&rig.events)), 0);

        rig.transcoder.release(0, true);
        wait_until(|| rig.recorder.is_at_rest());
        let events = drain(&rig.events);
        assert_eq!(count_stopped(&events), 1);
        assert_eq!(
            events.last(),
            Some(&RecorderEvent::RecordingStopped),
            "{:?}",
            events
        );
        assert!(events.contains(&RecorderEvent::TranscodeFinished {
            job: jobs[0].id,
            success: true
        }));
        assert!(!jobs[0].source.exists());
        assert!(jobs[0].destination.exists());
        assert_eq!(rig.backend.codecs_opened(), vec![raw_codec()]);
    }

    #[test]
    fn test_jobs_finishing_out_of_order() {
        let rig = rig(external());
        record(&rig, Duration::from_millis(60));
        rig.recorder.stop_recording(true).unwrap();
        record(&rig, Duration::from_millis(60));
        rig.recorder.stop_recording(true).unwrap();

        let jobs = rig.recorder.pending_jobs();
        assert_eq!(jobs.len(), 2);
        assert_ne!(jobs[0].source, jobs[1].source);

        rig.transcoder.release(1, true);
        wait_until(|| rig.recorder.pending_jobs().len() == 1);
        assert!(jobs[0].source.exists());
        assert!(!jobs[1].source.exists());
        assert_eq!(count_stopped(&drain(&rig.events)), 0);

        rig.transcoder.release(0, true);
        wait_until(|| rig.recorder.is_at_rest());
        assert!(!jobs[0].source.exists());
        assert_eq!(count_stopped(&drain(&rig.events)), 1);
        assert_eq!(rig.log.entries().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_transcode_keeps_raw_clip() {
        let rig = rig(external());
        record(&rig, Duration::from_millis(100));
        rig.recorder.stop_recording(true).unwrap();
        let job = rig.recorder.pending_jobs().remove(0);

        rig.transcoder.release(0, false);
        wait_until(|| rig.recorder.is_at_rest());
        assert!(!job.source.exists());
        assert!(job.destination.exists());
        assert_eq!(rig.log.entries().unwrap().len(), 1);

        let events = drain(&rig.events);
        assert!(events.contains(&RecorderEvent::TranscodeFinished {
            job: job.id,
            success: false
        }));
        assert_eq!(count_stopped(&events), 1);
    }

    #[test]
    fn test_unkeepable_raw_clip_is_removed() {
        let rig = rig(external());
        record(&rig, Duration::from_millis(100));
        rig.recorder.stop_recording(true).unwrap();
        let job = rig.recorder.pending_jobs().remove(0);

        // a directory in the way makes the rename fail
        fs::create_dir_all(job.destination.join("blocker")).unwrap();
        rig.transcoder.release(0, false);
        wait_until(|| rig.recorder.is_at_rest());

        assert!(!job.source.exists());
        assert!(job.destination.is_dir());
        let events = drain(&rig.events);
        assert!(events.contains(&RecorderEvent::TranscodeFinished {
            job: job.id,
            success: false
        }));
        assert_eq!(count_stopped(&events), 1);
    }

    #[test]
    fn test_writer_open_failure_aborts_setup() {
        let rig = rig_with_backend(
            FakeCamera::new(W, H),
            EncodePath::Native(ffv1()),
            false,
            FakeBackend::new().rejecting(ffv1()),
        );
        let result = rig.recorder.setup(rig.source.latest_frame());
        assert!(matches!(result, Err(Error::EncoderOpen { .. })));
        assert_eq!(rig.recorder.state(), SessionState::Idle);
        assert!(drain(&rig.events).is_empty());
        assert!(clips(&video_dir(&rig)).is_empty());
    }

    #[test]
    fn test_setup_and_stop_are_idempotent() {
        let rig = rig(EncodePath::Native(ffv1()));
        rig.recorder.stop_recording(true).unwrap();
        assert!(drain(&rig.events).is_empty());

        record(&rig, Duration::from_millis(50));
        rig.recorder.setup(Frame::empty()).unwrap();
        rig.recorder.stop_recording(false).unwrap();
        rig.recorder.stop_recording(false).unwrap();

        assert_eq!(rig.backend.codecs_opened().len(), 1);
        assert_eq!(
            drain(&rig.events),
            vec![RecorderEvent::RecordingStarted, RecorderEvent::RecordingStopped]
        );
    }

    #[test]
    fn test_output_rate_follows_fps() {
        let rig = rig(EncodePath::Native(ffv1()));
        record(&rig, Duration::from_secs(1));
        rig.recorder.stop_recording(false).unwrap();

        let written = rig.backend.written_frames().len();
        assert!((20..=32).contains(&written), "{} frames in 1s", written);
    }

    #[test]
    fn test_lead_frame_is_written_first() {
        let rig = rig(EncodePath::Native(ffv1()));
        let lead = Frame::filled(W, H, Bgr::RED);
        rig.recorder.setup(lead.clone()).unwrap();
        thread::sleep(Duration::from_millis(150));
        rig.recorder.stop_recording(false).unwrap();

        let frames = rig.backend.written_frames();
        assert!(frames.len() > 1);
        assert_eq!(frames[0].data(), lead.data());
        assert!(frames[1..].iter().all(|f| f.pixel(0, 0) != Some(Bgr::RED)));
    }

    #[test]
    fn test_frames_are_written_at_recording_size() {
        let rig = rig_with(FakeCamera::new(32, 24), EncodePath::Native(ffv1()), false);
        record(&rig, Duration::from_millis(150));
        rig.recorder.stop_recording(false).unwrap();

        let frames = rig.backend.written_frames();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f.width() == W && f.height() == H));
    }

    #[test]
    fn test_annotated_recording_marks_changed_rectangle() {
        let camera = FakeCamera::new(W, H).with_delay(Duration::from_millis(60));
        let rig = rig_with(camera, EncodePath::Native(ffv1()), true);
        record(&rig, Duration::from_millis(100));
        rig.recorder.set_rectangle(Rect::new(1, 1, 5, 5), true);
        thread::sleep(Duration::from_millis(400));
        rig.recorder.stop_recording(false).unwrap();

        let frames = rig.backend.written_frames();
        let marked = frames
            .iter()
            .filter(|f| f.pixel(1, 1) == Some(Bgr::RED))
            .count();
        assert!(marked >= 1, "rectangle never recorded");
        assert!(marked < frames.len());
    }

    #[test]
    fn test_plain_recording_ignores_rectangle() {
        let rig = rig(EncodePath::Native(ffv1()));
        record(&rig, Duration::from_millis(50));
        rig.recorder.set_rectangle(Rect::new(1, 1, 5, 5), true);
        thread::sleep(Duration::from_millis(150));
        rig.recorder.stop_recording(false).unwrap();

        let frames = rig.backend.written_frames();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f.pixel(1, 1) != Some(Bgr::RED)));
    }

    #[test]
    fn test_drop_discards_active_session() {
        let rig = rig(EncodePath::Native(ffv1()));
        record(&rig, Duration::from_millis(50));
        let dir = video_dir(&rig);
        let Rig {
            recorder, source, ..
        } = rig;
        drop(recorder);
        source.stop();
        assert!(clips(&dir).is_empty());
    }
}
