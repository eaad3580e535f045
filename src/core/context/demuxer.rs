use std::ffi::CString;
use std::path::Path;
use std::ptr::{null, null_mut};

use ffmpeg_next::Rational;
use ffmpeg_sys_next::AVMediaType::{AVMEDIA_TYPE_AUDIO, AVMEDIA_TYPE_VIDEO};
use ffmpeg_sys_next::{
    av_dict_free, av_dict_get, av_dict_set, av_find_best_stream, av_packet_alloc, av_packet_free,
    av_packet_unref, av_read_frame, avformat_alloc_context, avformat_close_input,
    avformat_find_stream_info, avformat_open_input, AVFormatContext, AVMediaType, AVPacket,
    AVERROR, AVERROR_EOF, AV_DICT_DONT_OVERWRITE, AV_DICT_MATCH_CASE, AV_NOPTS_VALUE,
    AV_PKT_FLAG_KEY, EAGAIN,
};
use log::debug;

use crate::core::catalog::BestStreamScorer;
use crate::core::initialize_ffmpeg;
use crate::core::packet::Packet;
use crate::core::pipeline::Demuxer;
use crate::core::stream::{CodecParams, MediaKind, MediaStream};
use crate::error::{AvError, Error, Result};

/// Demuxer backed by an FFmpeg input context.
///
/// [`open`](Self::open) opens and probes the container in one step; the
/// stream list and the library's best-stream hints are cached there so no
/// further probing io happens during streaming. The input context and the
/// scratch packet are released exactly once when the value is dropped.
pub struct FfmpegDemuxer {
    fmt_ctx: *mut AVFormatContext,
    pkt: *mut AVPacket,
    streams: Vec<MediaStream>,
    best_video: Option<usize>,
    best_audio: Option<usize>,
}

// SAFETY: FfmpegDemuxer exclusively owns its AVFormatContext and AVPacket.
// It is moved between threads, never shared, and open() registers no custom
// io or interrupt callbacks.
unsafe impl Send for FfmpegDemuxer {}

impl FfmpegDemuxer {
    /// Open and probe `path`.
    pub fn open(path: &Path) -> Result<Self> {
        initialize_ffmpeg();

        let url = CString::new(path.to_string_lossy().into_owned())?;

        // SAFETY: every allocation below is paired with its release on each
        // error path; once the struct exists, Drop takes over that duty.
        // avformat_open_input takes ownership of fmt_ctx on success and
        // nulls it on failure.
        unsafe {
            let mut fmt_ctx = avformat_alloc_context();
            if fmt_ctx.is_null() {
                return Err(Error::InputOpen(AvError(AVERROR(libc::ENOMEM))));
            }

            let mut format_opts = null_mut();
            let scan_all_pmts = CString::new("scan_all_pmts")?;
            if av_dict_get(format_opts, scan_all_pmts.as_ptr(), null(), AV_DICT_MATCH_CASE)
                .is_null()
            {
                let one = CString::new("1")?;
                av_dict_set(
                    &mut format_opts,
                    scan_all_pmts.as_ptr(),
                    one.as_ptr(),
                    AV_DICT_DONT_OVERWRITE,
                );
            }

            let ret = avformat_open_input(&mut fmt_ctx, url.as_ptr(), null(), &mut format_opts);
            av_dict_free(&mut format_opts);
            if ret < 0 {
                avformat_close_input(&mut fmt_ctx);
                return Err(Error::InputOpen(AvError(ret)));
            }

            // Header-level stream info is enough for a remux; skip the
            // frame-rate and timestamp probing passes.
            (*fmt_ctx).fps_probe_size = 0;
            (*fmt_ctx).max_ts_probe = 0;

            let ret = avformat_find_stream_info(fmt_ctx, null_mut());
            if ret < 0 {
                avformat_close_input(&mut fmt_ctx);
                return Err(Error::StreamProbe(AvError(ret)));
            }

            let mut demuxer = Self {
                fmt_ctx,
                pkt: null_mut(),
                streams: Vec::new(),
                best_video: None,
                best_audio: None,
            };

            let pkt = av_packet_alloc();
            if pkt.is_null() {
                return Err(Error::InputOpen(AvError(AVERROR(libc::ENOMEM))));
            }
            demuxer.pkt = pkt;

            demuxer.streams = extract_streams(fmt_ctx)?;
            demuxer.best_video = best_index(fmt_ctx, AVMEDIA_TYPE_VIDEO);
            demuxer.best_audio = best_index(fmt_ctx, AVMEDIA_TYPE_AUDIO);

            for stream in &demuxer.streams {
                debug!(
                    "input stream {}: {:?}, time_base {}/{}",
                    stream.index(),
                    stream.kind(),
                    stream.time_base().numerator(),
                    stream.time_base().denominator(),
                );
            }

            Ok(demuxer)
        }
    }

    /// Scorer seeded with FFmpeg's own best-stream choices for this input.
    pub fn best_stream_scorer(&self) -> BestStreamScorer {
        BestStreamScorer::new(self.best_video, self.best_audio)
    }
}

impl Demuxer for FfmpegDemuxer {
    fn streams(&self) -> &[MediaStream] {
        &self.streams
    }

    /// Read the next packet's scalars and payload. Returns `Ok(None)` at
    /// end of stream.
    ///
    /// `EAGAIN` (common with network inputs) is retried with a 10 ms sleep
    /// up to 500 times before surfacing as a read error.
    fn read_packet(&mut self) -> Result<Option<Packet>> {
        const MAX_EAGAIN_RETRIES: u32 = 500;

        // SAFETY: self.pkt is a valid AVPacket allocated in open().
        // av_packet_unref resets it for reuse, av_read_frame fills it, and
        // the payload is copied out before the next unref.
        unsafe {
            av_packet_unref(self.pkt);

            let mut eagain_retries: u32 = 0;
            loop {
                let ret = av_read_frame(self.fmt_ctx, self.pkt);
                if ret == AVERROR(EAGAIN) {
                    eagain_retries += 1;
                    if eagain_retries > MAX_EAGAIN_RETRIES {
                        return Err(Error::DemuxRead(AvError(ret)));
                    }
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    continue;
                }
                if ret < 0 {
                    if ret == AVERROR_EOF {
                        return Ok(None);
                    }
                    return Err(Error::DemuxRead(AvError(ret)));
                }
                break;
            }

            let pkt = &*self.pkt;
            let data = if pkt.data.is_null() || pkt.size <= 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(pkt.data, pkt.size as usize).to_vec()
            };

            let packet = Packet {
                stream_index: pkt.stream_index.max(0) as usize,
                pts: (pkt.pts != AV_NOPTS_VALUE).then_some(pkt.pts),
                dts: (pkt.dts != AV_NOPTS_VALUE).then_some(pkt.dts),
                duration: pkt.duration,
                data,
                pos: (pkt.pos >= 0).then_some(pkt.pos),
                key: pkt.flags & AV_PKT_FLAG_KEY != 0,
            };
            av_packet_unref(self.pkt);
            Ok(Some(packet))
        }
    }
}

impl Drop for FfmpegDemuxer {
    fn drop(&mut self) {
        // SAFETY: both pointers were allocated in open() and are released
        // exactly once; the free functions null their argument.
        unsafe {
            if !self.pkt.is_null() {
                av_packet_free(&mut self.pkt);
            }
            if !self.fmt_ctx.is_null() {
                avformat_close_input(&mut self.fmt_ctx);
            }
        }
    }
}

/// Collect the video and audio streams of a probed input. Other stream
/// kinds never enter the catalog.
///
/// # Safety
/// `fmt_ctx` must be a fully probed, valid `AVFormatContext`.
unsafe fn extract_streams(fmt_ctx: *mut AVFormatContext) -> Result<Vec<MediaStream>> {
    let nb_streams = (*fmt_ctx).nb_streams as usize;
    let streams_ptr = (*fmt_ctx).streams;
    if nb_streams > 0 && streams_ptr.is_null() {
        return Err(Error::NoStreamFound);
    }

    let mut streams = Vec::new();
    for i in 0..nb_streams {
        let raw_stream = *streams_ptr.add(i);
        if raw_stream.is_null() || (*raw_stream).codecpar.is_null() {
            continue;
        }
        let kind = match (*(*raw_stream).codecpar).codec_type {
            AVMEDIA_TYPE_VIDEO => MediaKind::Video,
            AVMEDIA_TYPE_AUDIO => MediaKind::Audio,
            _ => continue,
        };
        let params = CodecParams::from_raw((*raw_stream).codecpar)?;
        streams.push(MediaStream::new(
            (*raw_stream).index.max(0) as usize,
            Rational::from((*raw_stream).time_base),
            kind,
            params,
        ));
    }
    Ok(streams)
}

/// The index `av_find_best_stream` would pick for `media_type`, if any.
///
/// # Safety
/// `fmt_ctx` must be a fully probed, valid `AVFormatContext`.
unsafe fn best_index(fmt_ctx: *mut AVFormatContext, media_type: AVMediaType) -> Option<usize> {
    let best = av_find_best_stream(fmt_ctx, media_type, -1, -1, null_mut(), 0);
    if best < 0 {
        return None;
    }
    Some(best as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_not_found() {
        let result = FfmpegDemuxer::open(Path::new("not_found.mp4"));
        assert!(matches!(result, Err(Error::InputOpen(_))));
    }
}
