//! Real-time paced remultiplexing.
//!
//! `tscast` reads a local media file, selects its best video and audio
//! streams, and rewrites their packets into an MPEG-TS output no faster
//! than real playback time, so the destination can be consumed as a live
//! stream. Container probing and serialization belong to FFmpeg, reached
//! through the [`Demuxer`] and [`Muxer`] collaborator seams; the packet
//! pipeline between those seams is what this crate implements.
//!
//! # Example
//!
//! ```rust,ignore
//! use tscast::{CancelFlag, FfmpegDemuxer, FfmpegMuxer};
//!
//! let mut demuxer = FfmpegDemuxer::open(std::path::Path::new("test.mp4"))?;
//! let scorer = demuxer.best_stream_scorer();
//! let mut muxer = FfmpegMuxer::new("udp://127.0.0.1:1234", "mpegts");
//! let summary = tscast::run(&mut demuxer, &mut muxer, &scorer, &CancelFlag::new())?;
//! println!("wrote {} packets", summary.packets_written);
//! ```

pub mod core;
pub mod error;
pub(crate) mod util;

pub use crate::core::catalog::{BestStreamScorer, StreamScorer};
pub use crate::core::context::demuxer::FfmpegDemuxer;
pub use crate::core::context::muxer::FfmpegMuxer;
pub use crate::core::pace::{CancelFlag, PacingGate};
pub use crate::core::packet::Packet;
pub use crate::core::pipeline::{run, Demuxer, Muxer, RunSummary};
pub use crate::core::stream::{CodecParams, MediaKind, MediaStream};
pub use crate::error::{Error, Result};
