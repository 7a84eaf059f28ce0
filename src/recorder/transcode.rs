use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::utils::{logger, sync::lock};

/// Stable handle of one transcode job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Re-encode of one raw temporary clip into its final codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscodeJob {
    pub id: JobId,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Codec name as the external encoder knows it, e.g. `ffv1`.
    pub codec: String,
}

/// In-flight transcode jobs, keyed by id.
#[derive(Default)]
pub struct JobRegistry {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, TranscodeJob>>,
}

impl JobRegistry {
    pub fn insert(&self, source: PathBuf, destination: PathBuf, codec: &str) -> TranscodeJob {
        let id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let job = TranscodeJob {
            id,
            source,
            destination,
            codec: codec.to_string(),
        };
        lock(&self.jobs).insert(id, job.clone());
        job
    }

    /// Remove a job, returning it with the number of jobs still in flight.
    pub fn remove(&self, id: JobId) -> Option<(TranscodeJob, usize)> {
        let mut jobs = lock(&self.jobs);
        let job = jobs.remove(&id)?;
        Some((job, jobs.len()))
    }

    pub fn len(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn jobs(&self) -> Vec<TranscodeJob> {
        let mut jobs: Vec<_> = lock(&self.jobs).values().cloned().collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }
}

/// A running encoder.
pub trait TranscodeProcess: Send {
    /// Block until the encoder exits; `Ok(true)` on a clean exit.
    fn wait(&mut self) -> Result<bool>;
}

impl TranscodeProcess for Child {
    fn wait(&mut self) -> Result<bool> {
        Ok(Child::wait(self)?.success())
    }
}

pub trait Transcoder: Send + Sync {
    fn start(&self, job: &TranscodeJob) -> Result<Box<dyn TranscodeProcess>>;
}

/// ffmpeg-compatible encoder binary run as a subprocess.
pub struct ExternalEncoder {
    program: PathBuf,
}

impl ExternalEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `-i <source> -vcodec <codec> <destination>`, quietened.
    pub fn args(job: &TranscodeJob) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            job.source.clone().into_os_string(),
            "-vcodec".into(),
            job.codec.clone().into(),
            job.destination.clone().into_os_string(),
        ]
    }
}

impl Transcoder for ExternalEncoder {
    fn start(&self, job: &TranscodeJob) -> Result<Box<dyn TranscodeProcess>> {
        let child = Command::new(&self.program)
            .args(Self::args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::Subprocess(format!("failed to start {}: {}", self.program.display(), e))
            })?;
        Ok(Box::new(child))
    }
}

/// Run `job` to completion. True only when the encoder exited cleanly and
/// left a destination file behind.
pub(crate) fn run_job(transcoder: &dyn Transcoder, job: &TranscodeJob) -> bool {
    logger::info(&format!(
        "{}: encoding {} -> {} ({})",
        job.id,
        job.source.display(),
        job.destination.display(),
        job.codec
    ));
    let exited_cleanly = match transcoder.start(job) {
        Ok(mut process) => match process.wait() {
            Ok(success) => success,
            Err(e) => {
                logger::error(&format!("{}: waiting for encoder failed: {}", job.id, e));
                false
            }
        },
        Err(e) => {
            logger::error(&format!("{}: {}", job.id, e));
            false
        }
    };
    exited_cleanly && job.destination.exists()
}
