use std::ffi::CString;
use std::ptr::{null, null_mut};

use ffmpeg_next::Rational;
use ffmpeg_sys_next::{
    av_interleaved_write_frame, av_new_packet, av_packet_alloc, av_packet_free, av_write_trailer,
    avformat_alloc_output_context2, avformat_free_context, avformat_new_stream,
    avformat_write_header, avio_closep, avio_open, AVFormatContext, AVERROR, AVFMT_NOFILE,
    AVIO_FLAG_WRITE, AV_NOPTS_VALUE, AV_PKT_FLAG_KEY,
};
use libc::c_int;
use log::{debug, warn};

use crate::core::initialize_ffmpeg;
use crate::core::packet::Packet;
use crate::core::pipeline::Muxer;
use crate::core::stream::MediaStream;
use crate::error::{AvError, Error, Result};
use crate::util::ffmpeg_utils::av_err2str;

/// Muxer backed by an FFmpeg output context.
///
/// The value is constructed inert; [`open`](Muxer::open) allocates the
/// output session and, for destinations that need one, the io channel.
/// Both are released exactly once when the value is dropped, whether or
/// not the session got as far as a trailer.
pub struct FfmpegMuxer {
    url: String,
    format: String,
    fmt_ctx: *mut AVFormatContext,
    io_opened: bool,
}

// SAFETY: FfmpegMuxer exclusively owns its AVFormatContext; it is moved
// between threads, never shared, and no custom io callbacks are registered.
unsafe impl Send for FfmpegMuxer {}

impl FfmpegMuxer {
    /// Prepare a muxer for `url` in the given container format. No FFmpeg
    /// resource is touched until [`open`](Muxer::open).
    pub fn new(url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: format.into(),
            fmt_ctx: null_mut(),
            io_opened: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Muxer for FfmpegMuxer {
    fn open(&mut self) -> Result<()> {
        initialize_ffmpeg();
        debug_assert!(self.fmt_ctx.is_null(), "output opened twice");

        let url = CString::new(self.url.as_str())?;
        let format = CString::new(self.format.as_str())?;

        // SAFETY: avformat_alloc_output_context2 yields a valid context or
        // leaves the pointer null. From the moment fmt_ctx is stored, Drop
        // releases it on every exit path, so the io-open failure below
        // leaks nothing.
        unsafe {
            let ret = avformat_alloc_output_context2(
                &mut self.fmt_ctx,
                null_mut(),
                format.as_ptr(),
                url.as_ptr(),
            );
            if ret < 0 || self.fmt_ctx.is_null() {
                self.fmt_ctx = null_mut();
                let code = if ret < 0 { ret } else { AVERROR(libc::ENOMEM) };
                return Err(Error::OutputAlloc(AvError(code)));
            }

            if (*(*self.fmt_ctx).oformat).flags & AVFMT_NOFILE == 0 {
                let ret = avio_open(&mut (*self.fmt_ctx).pb, url.as_ptr(), AVIO_FLAG_WRITE);
                if ret < 0 {
                    return Err(Error::IoOpen(AvError(ret)));
                }
                self.io_opened = true;
            }
        }

        debug!("output {} ({}) opened", self.url, self.format);
        Ok(())
    }

    fn add_stream(&mut self, input: &MediaStream) -> Result<usize> {
        // SAFETY: fmt_ctx is a valid output context (open() succeeded
        // before the catalog allocates streams). avformat_new_stream
        // returns a stream owned by the context, or null.
        unsafe {
            let stream = avformat_new_stream(self.fmt_ctx, null());
            if stream.is_null() {
                return Err(Error::StreamCreate(AvError(AVERROR(libc::ENOMEM))));
            }
            input
                .params()
                .copy_into((*stream).codecpar)
                .map_err(Error::CodecParamCopy)?;
            // Codec tags are container-specific; the muxer picks its own.
            (*(*stream).codecpar).codec_tag = 0;
            Ok((*stream).index.max(0) as usize)
        }
    }

    fn write_header(&mut self) -> Result<()> {
        // SAFETY: fmt_ctx is valid and its streams are fully parameterized.
        let ret = unsafe { avformat_write_header(self.fmt_ctx, null_mut()) };
        if ret < 0 {
            return Err(Error::HeaderWrite(AvError(ret)));
        }
        Ok(())
    }

    fn stream_time_base(&self, stream_index: usize) -> Rational {
        // SAFETY: stream_index came from add_stream on this same context;
        // the bounds check below is purely defensive.
        unsafe {
            let nb_streams = (*self.fmt_ctx).nb_streams as usize;
            debug_assert!(stream_index < nb_streams, "unknown output stream");
            if stream_index >= nb_streams {
                return Rational::new(1, 1_000_000);
            }
            let stream = *(*self.fmt_ctx).streams.add(stream_index);
            Rational::from((*stream).time_base)
        }
    }

    fn write_packet(&mut self, packet: Packet) -> Result<()> {
        // SAFETY: the AVPacket shell lives only in this scope and is freed
        // on every path; av_interleaved_write_frame takes ownership of the
        // packet's contents even when it fails.
        unsafe {
            let mut pkt = av_packet_alloc();
            if pkt.is_null() {
                return Err(Error::Mux(AvError(AVERROR(libc::ENOMEM))));
            }
            let ret = av_new_packet(pkt, packet.data.len() as c_int);
            if ret < 0 {
                av_packet_free(&mut pkt);
                return Err(Error::Mux(AvError(ret)));
            }
            if !packet.data.is_empty() {
                std::ptr::copy_nonoverlapping(packet.data.as_ptr(), (*pkt).data, packet.data.len());
            }
            (*pkt).stream_index = packet.stream_index as c_int;
            (*pkt).pts = packet.pts.unwrap_or(AV_NOPTS_VALUE);
            (*pkt).dts = packet.dts.unwrap_or(AV_NOPTS_VALUE);
            (*pkt).duration = packet.duration;
            (*pkt).pos = packet.pos.unwrap_or(-1);
            if packet.key {
                (*pkt).flags |= AV_PKT_FLAG_KEY;
            }

            let ret = av_interleaved_write_frame(self.fmt_ctx, pkt);
            av_packet_free(&mut pkt);
            if ret < 0 {
                return Err(Error::Mux(AvError(ret)));
            }
        }
        Ok(())
    }

    fn write_trailer(&mut self) {
        if self.fmt_ctx.is_null() {
            return;
        }
        // SAFETY: the pipeline writes the trailer only after a successful
        // header write on this same context.
        let ret = unsafe { av_write_trailer(self.fmt_ctx) };
        if ret < 0 {
            warn!("error writing trailer: {}", av_err2str(ret));
        }
    }
}

impl Drop for FfmpegMuxer {
    fn drop(&mut self) {
        // SAFETY: release happens exactly once on every exit path. The io
        // channel is closed only if this muxer opened one (avio_closep
        // nulls pb), then the context itself is freed and nulled.
        unsafe {
            if !self.fmt_ctx.is_null() {
                if self.io_opened {
                    avio_closep(&mut (*self.fmt_ctx).pb);
                    self.io_opened = false;
                }
                avformat_free_context(self.fmt_ctx);
                self.fmt_ctx = null_mut();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inert_until_opened() {
        let muxer = FfmpegMuxer::new("out.ts", "mpegts");
        assert_eq!(muxer.url(), "out.ts");
        // Dropping without open() must be a no-op, not a double free.
    }

    #[test]
    fn test_unknown_format_fails_to_open() {
        let mut muxer = FfmpegMuxer::new("out.bin", "no_such_format");
        let result = muxer.open();
        assert!(matches!(result, Err(Error::OutputAlloc(_))));
    }

    #[test]
    fn test_trailer_without_open_is_a_no_op() {
        let mut muxer = FfmpegMuxer::new("out.ts", "mpegts");
        muxer.write_trailer();
    }
}
