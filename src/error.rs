use libc::c_int;
use thiserror::Error;

use crate::util::ffmpeg_utils::av_err2str;

pub type Result<T> = std::result::Result<T, Error>;

/// A raw FFmpeg error code. Displays as the library's own message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvError(pub c_int);

impl AvError {
    pub fn code(&self) -> c_int {
        self.0
    }
}

impl std::fmt::Display for AvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", av_err2str(self.0))
    }
}

impl From<c_int> for AvError {
    fn from(code: c_int) -> Self {
        Self(code)
    }
}

/// Everything that can abort a run. Each variant names the stage that
/// failed; the wrapped [`AvError`] carries the collaborator's diagnostic.
#[derive(Debug, Error)]
pub enum Error {
    #[error("error opening input: {0}")]
    InputOpen(AvError),

    #[error("error finding stream info: {0}")]
    StreamProbe(AvError),

    #[error("no video or audio stream found")]
    NoStreamFound,

    #[error("cannot allocate output context: {0}")]
    OutputAlloc(AvError),

    #[error("cannot open output io: {0}")]
    IoOpen(AvError),

    #[error("failed allocating output stream: {0}")]
    StreamCreate(AvError),

    #[error("failed to copy codec parameters: {0}")]
    CodecParamCopy(AvError),

    #[error("error writing output header: {0}")]
    HeaderWrite(AvError),

    #[error("error during demuxing: {0}")]
    DemuxRead(AvError),

    #[error("error muxing packet: {0}")]
    Mux(AvError),

    #[error("url contains an interior NUL byte")]
    InvalidUrl(#[from] std::ffi::NulError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_sys_next::AVERROR;

    #[test]
    fn test_display_names_the_stage() {
        let error = Error::InputOpen(AvError(AVERROR(libc::ENOENT)));
        let text = error.to_string();
        assert!(text.starts_with("error opening input:"), "{text}");
    }

    #[test]
    fn test_no_stream_found_display() {
        assert_eq!(
            Error::NoStreamFound.to_string(),
            "no video or audio stream found"
        );
    }
}
