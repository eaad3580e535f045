use std::sync::Once;

use ffmpeg_sys_next::avformat_network_init;

pub mod catalog;
pub mod context;
pub mod pace;
pub mod packet;
pub mod pipeline;
pub mod rescale;
pub mod stream;

static FFMPEG_INIT: Once = Once::new();

/// Process-wide FFmpeg initialization. Runs once, safe from any thread.
pub(crate) fn initialize_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        // SAFETY: avformat_network_init only touches global protocol state
        // and must run before any network-backed format is opened.
        unsafe {
            avformat_network_init();
        }
    });
}
