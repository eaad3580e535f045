/// One demuxed packet, exclusively owned while in flight.
///
/// Timestamps are `None` when the container carried no value
/// (`AV_NOPTS_VALUE` at the FFI boundary); `None` is distinct from 0 and is
/// never rescaled. The payload is an owned copy of the packet data, so a
/// `Packet` has no lifetime ties to the demuxer that produced it.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    /// Index of the stream this packet was read from.
    pub stream_index: usize,
    /// Presentation timestamp in stream time-base units, if known.
    pub pts: Option<i64>,
    /// Decode timestamp in stream time-base units, if known.
    pub dts: Option<i64>,
    /// Duration in stream time-base units. 0 when unknown.
    pub duration: i64,
    /// Compressed payload.
    pub data: Vec<u8>,
    /// Byte position in the source container, if known.
    pub pos: Option<i64>,
    /// Whether this packet starts with a keyframe.
    pub key: bool,
}
