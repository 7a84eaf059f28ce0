use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::codec::{EncodePath, FourCc};
use crate::error::{Error, Result};
use crate::recorder::RecorderSettings;
use crate::shared::constants;

/// Application settings, read once at startup and handed to each component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera_index: u32,
    pub camera_width: u32,
    pub camera_height: u32,
    /// Four character code of the codec clips are kept in.
    pub video_codec: String,
    pub output_fps: u32,
    pub record_with_rectangle: bool,
    pub video_dir: PathBuf,
    /// External encoder binary, looked up on `PATH` when not absolute.
    pub encoder_path: PathBuf,
    /// Recording log; `<video_dir>/logs.json` when unset.
    pub log_file: Option<PathBuf>,
    pub stop_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_index: constants::DEFAULT_CAMERA_INDEX,
            camera_width: constants::DEFAULT_CAMERA_WIDTH,
            camera_height: constants::DEFAULT_CAMERA_HEIGHT,
            video_codec: constants::DEFAULT_VIDEO_CODEC.to_string(),
            output_fps: constants::OUTPUT_FPS,
            record_with_rectangle: false,
            video_dir: default_video_dir(),
            encoder_path: PathBuf::from(constants::DEFAULT_ENCODER_PATH),
            log_file: None,
            stop_timeout_ms: constants::DEFAULT_STOP_TIMEOUT_MS,
        }
    }
}

fn default_video_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::document_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::APP_NAME)
        .join(constants::VIDEO_DIR_NAME)
}

impl AppConfig {
    /// `<config dir>/Skywatch/skywatch.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::APP_NAME)
            .join(constants::CONFIG_FILE)
    }

    /// Read the config at `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera_width == 0 || self.camera_height == 0 {
            return Err(Error::Config(format!(
                "camera size {}x{} must be non-zero",
                self.camera_width, self.camera_height
            )));
        }
        if self.output_fps == 0 || self.output_fps > constants::MAX_OUTPUT_FPS {
            return Err(Error::Config(format!(
                "output fps {} must be between 1 and {}",
                self.output_fps,
                constants::MAX_OUTPUT_FPS
            )));
        }
        if self.video_dir.as_os_str().is_empty() {
            return Err(Error::Config("video directory is not set".into()));
        }
        self.codec()?;
        Ok(())
    }

    pub fn codec(&self) -> Result<FourCc> {
        self.video_codec.parse()
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.video_dir.join(constants::RECORDING_LOG_FILE))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Validated recorder settings for clips reaching their codec through
    /// `encode_path`.
    pub fn recorder_settings(&self, encode_path: EncodePath) -> Result<RecorderSettings> {
        self.validate()?;
        Ok(RecorderSettings {
            video_dir: self.video_dir.clone(),
            width: self.camera_width,
            height: self.camera_height,
            fps: self.output_fps,
            annotate: self.record_with_rectangle,
            encode_path,
        })
    }
}
