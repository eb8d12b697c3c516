//! Finished results and the playback-time caption lookup.

pub mod caption;
pub mod result_cache;

pub use caption::{active_index, SubtitleTrack};
pub use result_cache::ResultCache;
