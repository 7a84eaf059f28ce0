use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;
use crate::utils::sync::lock;

/// One kept recording, as listed by the clip browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Directory holding the clip and its `thumbnails/` folder.
    #[serde(rename = "Pathname")]
    pub pathname: String,
    /// Clip timestamp, joins the entry with its video and thumbnail files.
    #[serde(rename = "DateTime")]
    pub date_time: String,
    /// `MM:SS`
    #[serde(rename = "Length")]
    pub length: String,
}

/// Persistent list of kept recordings.
pub trait RecordingLog: Send + Sync {
    fn append(&self, entry: &LogEntry) -> Result<()>;

    fn entries(&self) -> Result<Vec<LogEntry>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LogDocument {
    #[serde(default)]
    videos: Vec<LogEntry>,
}

/// `RecordingLog` stored as a JSON document.
///
/// The file is re-read on every append so entries removed by other tools
/// in the meantime stay removed.
pub struct JsonRecordingLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonRecordingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<LogDocument> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(LogDocument::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LogDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &LogDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(document)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl RecordingLog for JsonRecordingLog {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        let _guard = lock(&self.write_lock);
        let mut document = self.read_document()?;
        document.videos.push(entry.clone());
        self.write_document(&document)
    }

    fn entries(&self) -> Result<Vec<LogEntry>> {
        let _guard = lock(&self.write_lock);
        Ok(self.read_document()?.videos)
    }
}
