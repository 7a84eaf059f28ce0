use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};

use crate::shared::constants;
use crate::utils::time_utils::clip_timestamp;

/// File locations of one recording session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipPaths {
    pub timestamp: String,
    /// `<dir>/Capture--<timestamp>temp.avi`, written while recording.
    pub temp: PathBuf,
    /// `<dir>/Capture--<timestamp>.avi`
    pub final_path: PathBuf,
    /// `<dir>/thumbnails/<timestamp>.jpg`
    pub thumbnail: PathBuf,
}

impl ClipPaths {
    pub fn for_timestamp(dir: &Path, timestamp: &str) -> Self {
        let base = format!("{}{}", constants::CLIP_PREFIX, timestamp);
        Self {
            timestamp: timestamp.to_string(),
            temp: dir.join(format!(
                "{}{}{}",
                base,
                constants::TEMP_SUFFIX,
                constants::CLIP_EXTENSION
            )),
            final_path: dir.join(format!("{}{}", base, constants::CLIP_EXTENSION)),
            thumbnail: dir
                .join(constants::THUMBNAIL_DIR_NAME)
                .join(format!("{}.{}", timestamp, constants::THUMBNAIL_EXTENSION)),
        }
    }

    /// Paths for a session started at `at`. A second session within the
    /// same second gets `-1`, `-2`, ... appended to the timestamp.
    pub fn allocate<Tz: TimeZone>(dir: &Path, at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let base = clip_timestamp(at);
        let mut paths = Self::for_timestamp(dir, &base);
        let mut n = 1;
        while paths.in_use() {
            paths = Self::for_timestamp(dir, &format!("{}-{}", base, n));
            n += 1;
        }
        paths
    }

    fn in_use(&self) -> bool {
        self.temp.exists() || self.final_path.exists() || self.thumbnail.exists()
    }
}
