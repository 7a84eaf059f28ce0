pub mod file_utils;
pub mod logger;
pub mod sync;
pub mod time_utils;
