use ffmpeg_next::Rational;
use ffmpeg_sys_next::{
    avcodec_parameters_alloc, avcodec_parameters_copy, avcodec_parameters_free,
    AVCodecParameters, AVERROR,
};

use crate::error::{AvError, Error, Result};

/// Kind of elementary stream this tool carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Owned copy of a stream's codec parameters.
///
/// The block is opaque to the rest of the crate: it is cloned verbatim out
/// of the input stream at discovery time and copied verbatim again into the
/// output stream the muxer allocates. Remultiplexing never inspects it.
pub struct CodecParams {
    inner: *mut AVCodecParameters,
}

// SAFETY: CodecParams exclusively owns its AVCodecParameters allocation;
// it is moved between threads, never shared.
unsafe impl Send for CodecParams {}

impl CodecParams {
    /// Allocate an empty parameter block.
    pub fn empty() -> Result<Self> {
        // SAFETY: avcodec_parameters_alloc returns a valid zeroed block or
        // null; null is checked immediately. The block is freed in Drop.
        let inner = unsafe { avcodec_parameters_alloc() };
        if inner.is_null() {
            return Err(Error::StreamProbe(AvError(AVERROR(libc::ENOMEM))));
        }
        Ok(Self { inner })
    }

    /// Clone the parameters out of a raw FFmpeg block.
    ///
    /// # Safety
    /// `src` must point to a valid `AVCodecParameters`.
    pub(crate) unsafe fn from_raw(src: *const AVCodecParameters) -> Result<Self> {
        let params = Self::empty()?;
        let ret = avcodec_parameters_copy(params.inner, src);
        if ret < 0 {
            return Err(Error::StreamProbe(AvError(ret)));
        }
        Ok(params)
    }

    /// Copy these parameters into a raw FFmpeg block.
    ///
    /// # Safety
    /// `dst` must point to a valid, writable `AVCodecParameters`.
    pub(crate) unsafe fn copy_into(
        &self,
        dst: *mut AVCodecParameters,
    ) -> std::result::Result<(), AvError> {
        let ret = avcodec_parameters_copy(dst, self.inner);
        if ret < 0 {
            return Err(AvError(ret));
        }
        Ok(())
    }
}

impl Drop for CodecParams {
    fn drop(&mut self) {
        // SAFETY: inner was allocated by avcodec_parameters_alloc and is
        // released exactly once; avcodec_parameters_free nulls the pointer.
        unsafe {
            avcodec_parameters_free(&mut self.inner);
        }
    }
}

impl std::fmt::Debug for CodecParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecParams").finish_non_exhaustive()
    }
}

/// Metadata for one selectable input stream.
///
/// Immutable once discovered; the catalog borrows these for selection and
/// the muxer copies the parameter block when it allocates output streams.
#[derive(Debug)]
pub struct MediaStream {
    index: usize,
    time_base: Rational,
    kind: MediaKind,
    params: CodecParams,
}

impl MediaStream {
    pub fn new(index: usize, time_base: Rational, kind: MediaKind, params: CodecParams) -> Self {
        Self {
            index,
            time_base,
            kind,
            params,
        }
    }

    /// The index of the stream within the input.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Seconds per timestamp unit on this stream.
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn params(&self) -> &CodecParams {
        &self.params
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == MediaKind::Audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_accessors() {
        let video = MediaStream::new(
            0,
            Rational::new(1, 90000),
            MediaKind::Video,
            CodecParams::empty().unwrap(),
        );
        assert!(video.is_video());
        assert!(!video.is_audio());
        assert_eq!(video.index(), 0);
    }

    #[test]
    fn test_codec_params_roundtrip() {
        let src = CodecParams::empty().unwrap();
        let dst = CodecParams::empty().unwrap();
        // SAFETY: both blocks are valid allocations from empty().
        unsafe {
            src.copy_into(dst.inner).unwrap();
        }
    }
}
