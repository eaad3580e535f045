use ffmpeg_next::Rational;
use log::info;

use crate::core::catalog::{self, MappedStream, StreamScorer};
use crate::core::pace::{CancelFlag, PacingGate};
use crate::core::packet::Packet;
use crate::core::rescale::{rescale_q, rescale_ts};
use crate::core::stream::{MediaKind, MediaStream};
use crate::error::Result;

/// Packet source collaborator. Opening and probing happen before a value of
/// this type exists; dropping it releases the input session.
pub trait Demuxer {
    /// Video and audio streams discovered at open time.
    fn streams(&self) -> &[MediaStream];

    /// Read the next packet, blocking. `Ok(None)` is clean end of stream
    /// and is the only non-error way a session finishes.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// Packet sink collaborator. Dropping it releases the output session and
/// its io channel, whether or not a trailer was written.
pub trait Muxer {
    /// Allocate the output session and open its io channel if the
    /// destination needs one. Called only after stream selection succeeds.
    fn open(&mut self) -> Result<()>;

    /// Allocate one output stream carrying a verbatim copy of `input`'s
    /// codec parameters. Returns the new stream's index.
    fn add_stream(&mut self, input: &MediaStream) -> Result<usize>;

    /// Write the container header.
    fn write_header(&mut self) -> Result<()>;

    /// The time base the muxer settled on for `stream_index`. Meaningful
    /// only after [`write_header`](Muxer::write_header); MPEG-TS rewrites
    /// time bases at that point.
    fn stream_time_base(&self, stream_index: usize) -> Rational;

    /// Write one packet, already rebased onto the output stream.
    fn write_packet(&mut self, packet: Packet) -> Result<()>;

    /// Write the container trailer on clean end of stream.
    fn write_trailer(&mut self);
}

/// Totals accumulated over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub video_frames: u64,
    pub packets_written: u64,
    pub packets_dropped: u64,
}

const PROGRESS_INTERVAL: u64 = 100;

/// Drive one full remux session.
///
/// Selects the best streams, sets up the output, then loops:
/// read, classify against the stream mapping, rescale onto the output time
/// base, gate to the wall clock, write. Packets from unselected streams are
/// dropped without side effects. Clean end of stream (and cooperative
/// cancellation) end the loop through the trailer; every error aborts
/// immediately and leaves cleanup to the collaborators' drop handlers.
pub fn run<D: Demuxer, M: Muxer>(
    demuxer: &mut D,
    muxer: &mut M,
    scorer: &dyn StreamScorer,
    cancel: &CancelFlag,
) -> Result<RunSummary> {
    let selection = catalog::select(demuxer.streams(), scorer)?;
    muxer.open()?;
    let pending = catalog::allocate(&selection, muxer)?;
    muxer.write_header()?;
    let mapping = pending.bind(muxer);

    let mut gate = PacingGate::new();
    let mut summary = RunSummary::default();

    while !cancel.is_cancelled() {
        let Some(packet) = demuxer.read_packet()? else {
            break;
        };
        let Some(route) = mapping.route(packet.stream_index) else {
            summary.packets_dropped += 1;
            continue;
        };
        let kind = route.kind;
        let packet = rebase(packet, route);
        gate.wait_until_due(packet.dts, route.output_time_base, cancel);
        muxer.write_packet(packet)?;
        summary.packets_written += 1;
        if kind == MediaKind::Video {
            summary.video_frames += 1;
            if summary.video_frames % PROGRESS_INTERVAL == 0 {
                info!("wrote {} video frames", summary.video_frames);
            }
        }
    }

    muxer.write_trailer();
    Ok(summary)
}

/// Move a packet from its input stream onto the mapped output stream.
fn rebase(mut packet: Packet, route: &MappedStream) -> Packet {
    packet.stream_index = route.output_index;
    packet.pts = rescale_ts(packet.pts, route.input_time_base, route.output_time_base);
    packet.dts = rescale_ts(packet.dts, route.input_time_base, route.output_time_base);
    packet.duration = rescale_q(packet.duration, route.input_time_base, route.output_time_base);
    packet.pos = None;
    packet
}
