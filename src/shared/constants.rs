pub const APP_NAME: &str = "Skywatch";

pub const CONFIG_FILE: &str = "skywatch.json";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "capture.log";
pub const RECORDING_LOG_FILE: &str = "logs.json";

/// Output cadence of recorded clips.
pub const OUTPUT_FPS: u32 = 25;
pub const MAX_OUTPUT_FPS: u32 = 240;

pub const DEFAULT_CAMERA_INDEX: u32 = 0;
pub const DEFAULT_CAMERA_WIDTH: u32 = 640;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 480;
pub const DEFAULT_VIDEO_CODEC: &str = "FFV1";
pub const DEFAULT_ENCODER_PATH: &str = "ffmpeg";
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2000;

pub const VIDEO_DIR_NAME: &str = "Videos";
pub const THUMBNAIL_DIR_NAME: &str = "thumbnails";
pub const THUMBNAIL_EXTENSION: &str = "jpg";
pub const CLIP_PREFIX: &str = "Capture--";
pub const TEMP_SUFFIX: &str = "temp";
pub const CLIP_EXTENSION: &str = ".avi";
pub const CLIP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d--%H-%M-%S";

// 64 px of a 640 wide frame plus a 15 px margin
pub const THUMBNAIL_BASE_WIDTH: u32 = 64;
pub const THUMBNAIL_MARGIN: u32 = 15;

pub const RAW_VIDEO_CODEC: [u8; 4] = *b"IYUV";

pub const PROBE_FILE_STEM: &str = "codec_probe_Wa8F7bVL3lmF4ngf";
pub const PROBE_WIDTH: u32 = 640;
pub const PROBE_HEIGHT: u32 = 480;
pub const PROBE_FPS: f64 = 25.0;
pub const ENCODER_LIST_FLAG: &str = "-codecs";
