use ffmpeg_next::Rational;

use crate::core::pipeline::Muxer;
use crate::core::stream::{MediaKind, MediaStream};
use crate::error::{Error, Result};

/// Scoring strategy for picking the "best" stream of a kind.
///
/// The heuristic itself is opaque to the catalog; the catalog only keeps
/// the highest-scoring candidate per kind.
pub trait StreamScorer {
    fn score(&self, stream: &MediaStream) -> i64;
}

/// Scorer seeded with the demuxer's own best-stream choices.
///
/// [`FfmpegDemuxer::best_stream_scorer`] builds one from the indices
/// `av_find_best_stream` picked at open time, so the selection heuristic
/// stays in the library while the catalog keeps only "max score per kind".
///
/// [`FfmpegDemuxer::best_stream_scorer`]: crate::core::context::demuxer::FfmpegDemuxer::best_stream_scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct BestStreamScorer {
    best_video: Option<usize>,
    best_audio: Option<usize>,
}

impl BestStreamScorer {
    pub fn new(best_video: Option<usize>, best_audio: Option<usize>) -> Self {
        Self {
            best_video,
            best_audio,
        }
    }
}

impl StreamScorer for BestStreamScorer {
    fn score(&self, stream: &MediaStream) -> i64 {
        let best = match stream.kind() {
            MediaKind::Video => self.best_video,
            MediaKind::Audio => self.best_audio,
        };
        i64::from(best == Some(stream.index()))
    }
}

/// Streams chosen for a session: at most one per kind, at least one overall.
pub struct Selection<'a> {
    pub video: Option<&'a MediaStream>,
    pub audio: Option<&'a MediaStream>,
}

/// Pick the best video and the best audio stream, if present.
///
/// Fails with [`Error::NoStreamFound`] when the input carries neither kind.
/// No output resource is touched here.
pub fn select<'a>(streams: &'a [MediaStream], scorer: &dyn StreamScorer) -> Result<Selection<'a>> {
    let video = best_of(streams, MediaKind::Video, scorer);
    let audio = best_of(streams, MediaKind::Audio, scorer);
    if video.is_none() && audio.is_none() {
        return Err(Error::NoStreamFound);
    }
    Ok(Selection { video, audio })
}

fn best_of<'a>(
    streams: &'a [MediaStream],
    kind: MediaKind,
    scorer: &dyn StreamScorer,
) -> Option<&'a MediaStream> {
    let mut best: Option<(&MediaStream, i64)> = None;
    for stream in streams.iter().filter(|s| s.kind() == kind) {
        let score = scorer.score(stream);
        match best {
            // Strictly greater, so the first of equals wins.
            Some((_, top)) if score <= top => {}
            _ => best = Some((stream, score)),
        }
    }
    best.map(|(stream, _)| stream)
}

/// One input stream bound to the output stream allocated for it.
#[derive(Debug, Clone, Copy)]
pub struct MappedStream {
    pub input_index: usize,
    pub input_time_base: Rational,
    pub kind: MediaKind,
    pub output_index: usize,
    pub output_time_base: Rational,
}

struct PendingStream {
    input_index: usize,
    input_time_base: Rational,
    kind: MediaKind,
    output_index: usize,
}

/// Output streams allocated but not yet bound to their final time bases.
///
/// MPEG-TS rewrites stream time bases when the header is written, so the
/// mapping is only completed by [`PendingMapping::bind`] after
/// `write_header`.
pub struct PendingMapping {
    video: Option<PendingStream>,
    audio: Option<PendingStream>,
}

/// Allocate one output stream per selected input, copying codec parameters
/// verbatim into the output session.
pub fn allocate<M: Muxer + ?Sized>(
    selection: &Selection<'_>,
    muxer: &mut M,
) -> Result<PendingMapping> {
    let mut video = None;
    if let Some(input) = selection.video {
        video = Some(allocate_one(input, muxer)?);
    }
    let mut audio = None;
    if let Some(input) = selection.audio {
        audio = Some(allocate_one(input, muxer)?);
    }
    Ok(PendingMapping { video, audio })
}

fn allocate_one<M: Muxer + ?Sized>(input: &MediaStream, muxer: &mut M) -> Result<PendingStream> {
    let output_index = muxer.add_stream(input)?;
    Ok(PendingStream {
        input_index: input.index(),
        input_time_base: input.time_base(),
        kind: input.kind(),
        output_index,
    })
}

impl PendingMapping {
    /// Capture the muxer's post-header time bases and produce the final,
    /// read-only mapping.
    pub fn bind<M: Muxer + ?Sized>(self, muxer: &M) -> StreamMapping {
        let bind_one = |pending: PendingStream| MappedStream {
            input_index: pending.input_index,
            input_time_base: pending.input_time_base,
            kind: pending.kind,
            output_index: pending.output_index,
            output_time_base: muxer.stream_time_base(pending.output_index),
        };
        StreamMapping {
            video: self.video.map(bind_one),
            audio: self.audio.map(bind_one),
        }
    }
}

/// Read-only association between the selected input streams and their
/// output counterparts.
#[derive(Debug)]
pub struct StreamMapping {
    video: Option<MappedStream>,
    audio: Option<MappedStream>,
}

impl StreamMapping {
    /// Route a source stream index to its mapping. `None` means the packet
    /// belongs to no selected stream and must be dropped.
    pub fn route(&self, source_index: usize) -> Option<&MappedStream> {
        [self.video.as_ref(), self.audio.as_ref()]
            .into_iter()
            .flatten()
            .find(|mapped| mapped.input_index == source_index)
    }

    pub fn video(&self) -> Option<&MappedStream> {
        self.video.as_ref()
    }

    pub fn audio(&self) -> Option<&MappedStream> {
        self.audio.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::CodecParams;

    fn stream(index: usize, kind: MediaKind) -> MediaStream {
        MediaStream::new(
            index,
            Rational::new(1, 90000),
            kind,
            CodecParams::empty().unwrap(),
        )
    }

    struct IndexScorer;

    impl StreamScorer for IndexScorer {
        fn score(&self, stream: &MediaStream) -> i64 {
            stream.index() as i64
        }
    }

    struct FlatScorer;

    impl StreamScorer for FlatScorer {
        fn score(&self, _stream: &MediaStream) -> i64 {
            0
        }
    }

    #[test]
    fn test_picks_max_score_per_kind() {
        let streams = vec![
            stream(0, MediaKind::Video),
            stream(1, MediaKind::Video),
            stream(2, MediaKind::Audio),
            stream(3, MediaKind::Audio),
        ];
        let selection = select(&streams, &IndexScorer).unwrap();
        assert_eq!(selection.video.unwrap().index(), 1);
        assert_eq!(selection.audio.unwrap().index(), 3);
    }

    #[test]
    fn test_first_of_equals_wins() {
        let streams = vec![stream(0, MediaKind::Video), stream(1, MediaKind::Video)];
        let selection = select(&streams, &FlatScorer).unwrap();
        assert_eq!(selection.video.unwrap().index(), 0);
    }

    #[test]
    fn test_single_kind_is_enough() {
        let streams = vec![stream(0, MediaKind::Audio)];
        let selection = select(&streams, &FlatScorer).unwrap();
        assert!(selection.video.is_none());
        assert_eq!(selection.audio.unwrap().index(), 0);
    }

    #[test]
    fn test_no_streams_is_an_error() {
        let result = select(&[], &FlatScorer);
        assert!(matches!(result, Err(Error::NoStreamFound)));
    }

    #[test]
    fn test_best_stream_scorer_prefers_hinted_index() {
        let streams = vec![
            stream(0, MediaKind::Video),
            stream(1, MediaKind::Video),
            stream(2, MediaKind::Audio),
        ];
        let scorer = BestStreamScorer::new(Some(1), Some(2));
        let selection = select(&streams, &scorer).unwrap();
        assert_eq!(selection.video.unwrap().index(), 1);
        assert_eq!(selection.audio.unwrap().index(), 2);
    }
}
