//! Message codec for link framing
//!
//! Every payload travels as a `u32` little-endian byte count followed by
//! exactly that many bytes of UTF-8. Framing errors are transport faults and
//! end the stream; a frame whose payload does not parse is handed up as an
//! `Err` item so the reader can drop it and keep going.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{InboundMessage, MessageError, OutboundMessage};

/// Maximum frame payload size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Size of the length prefix
const HEADER_LEN: usize = 4;

/// A decoded inbound frame; `Err` when only the payload was bad
pub type InboundFrame = Result<InboundMessage, MessageError>;

/// A decoded outbound frame; `Err` when only the payload was bad
pub type OutboundFrame = Result<OutboundMessage, MessageError>;

/// Link codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Stream ended inside a frame: expected {expected} bytes, received {received}")]
    ShortFrame { expected: usize, received: usize },
}

/// Codec used by the host bridge: decodes device messages, encodes
/// host messages
#[derive(Debug, Clone)]
pub struct HostCodec {
    max_frame_size: usize,
}

impl HostCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Create a codec with a custom frame size limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for HostCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HostCodec {
    type Item = InboundFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_frame(src, self.max_frame_size)?
            .map(|payload| payload_str(&payload).and_then(InboundMessage::parse)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => check_clean_eof(src).map(|()| None),
        }
    }
}

impl Encoder<OutboundMessage> for HostCodec {
    type Error = CodecError;

    fn encode(&mut self, item: OutboundMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item.to_payload().as_bytes(), dst, self.max_frame_size)
    }
}

/// Codec used on the device side: decodes host messages, encodes device
/// messages
#[derive(Debug, Clone)]
pub struct PeerCodec {
    max_frame_size: usize,
}

impl PeerCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl Default for PeerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PeerCodec {
    type Item = OutboundFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_frame(src, self.max_frame_size)?
            .map(|payload| payload_str(&payload).and_then(OutboundMessage::parse)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => check_clean_eof(src).map(|()| None),
        }
    }
}

impl Encoder<InboundMessage> for PeerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: InboundMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item.to_payload().as_bytes(), dst, self.max_frame_size)
    }
}

fn payload_str(payload: &[u8]) -> Result<&str, MessageError> {
    std::str::from_utf8(payload).map_err(|_| MessageError::InvalidUtf8)
}

/// Decode a length-prefixed frame
fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<BytesMut>, CodecError> {
    // Need at least 4 bytes for length prefix
    if src.len() < HEADER_LEN {
        return Ok(None);
    }

    // Peek at length without consuming
    let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;

    if len > max_frame_size {
        return Err(CodecError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }

    // Check if we have the full frame
    if src.len() < HEADER_LEN + len {
        src.reserve(HEADER_LEN + len - src.len());
        return Ok(None);
    }

    src.advance(HEADER_LEN);
    Ok(Some(src.split_to(len)))
}

/// Anything left over at end of stream is a frame cut short
fn check_clean_eof(src: &BytesMut) -> Result<(), CodecError> {
    if src.is_empty() {
        return Ok(());
    }

    let expected = if src.len() >= HEADER_LEN {
        u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize
    } else {
        HEADER_LEN
    };
    let received = src.len().saturating_sub(HEADER_LEN);

    Err(CodecError::ShortFrame { expected, received })
}

/// Encode a length-prefixed frame
fn encode_frame(payload: &[u8], dst: &mut BytesMut, max_frame_size: usize) -> Result<(), CodecError> {
    if payload.len() > max_frame_size {
        return Err(CodecError::FrameTooLarge {
            size: payload.len(),
            max: max_frame_size,
        });
    }

    dst.reserve(HEADER_LEN + payload.len());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::FramedRead;

    #[test]
    fn test_outbound_frame_layout() {
        let mut codec = HostCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(OutboundMessage::remove(1), &mut buf).unwrap();

        assert_eq!(&buf[..], b"\x03\x00\x00\x000;1");
    }

    #[test]
    fn test_host_to_peer_roundtrip() {
        let mut host = HostCodec::new();
        let mut peer = PeerCodec::new();

        let msg = OutboundMessage::add(5, "X", "T", "B");
        let mut buf = BytesMut::new();
        host.encode(msg.clone(), &mut buf).unwrap();

        let decoded = peer.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(decoded, msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_peer_to_host_roundtrip() {
        let mut host = HostCodec::new();
        let mut peer = PeerCodec::new();

        let msg = InboundMessage::add("0|com.chat|7", "Alice", "lunch?")
            .with_app("Chat", "com.chat")
            .with_content_intent("yes");
        let mut buf = BytesMut::new();
        peer.encode(msg.clone(), &mut buf).unwrap();

        let decoded = host.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_inbound_minimal_frame() {
        let payload = b"1;1;0;0;0;0;0;15";
        let mut buf = BytesMut::new();
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(payload);

        let msg = HostCodec::new().decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(msg.key, "5");
        assert_eq!(msg.action, crate::InboundAction::Add);
        assert!(msg.title.is_empty() && msg.body.is_empty() && msg.content_intent.is_empty());
    }

    #[test]
    fn test_partial_frame() {
        let mut host = HostCodec::new();
        let mut buf = BytesMut::new();
        PeerCodec::new()
            .encode(InboundMessage::remove("12"), &mut buf)
            .unwrap();

        let mut partial = buf.split_to(6);
        assert!(host.decode(&mut partial).unwrap().is_none());

        partial.unsplit(buf);
        assert!(host.decode(&mut partial).unwrap().is_some());
    }

    #[test]
    fn test_malformed_payload_is_item_error() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(3);
        buf.put_slice(b"abc");
        PeerCodec::new()
            .encode(InboundMessage::remove("9"), &mut buf)
            .unwrap();

        let mut host = HostCodec::new();
        assert!(matches!(
            host.decode(&mut buf).unwrap(),
            Some(Err(MessageError::TruncatedLengthTable { .. }))
        ));
        // The next frame is still readable
        let next = host.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(next.key, "9");
    }

    #[test]
    fn test_invalid_utf8_is_item_error() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(2);
        buf.put_slice(&[0xff, 0xfe]);

        assert!(matches!(
            HostCodec::new().decode(&mut buf).unwrap(),
            Some(Err(MessageError::InvalidUtf8))
        ));
    }

    #[test]
    fn test_frame_too_large_on_decode() {
        let mut codec = HostCodec::with_max_frame_size(8);
        let mut buf = BytesMut::new();
        buf.put_u32_le(9);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::FrameTooLarge { size: 9, max: 8 })
        ));
    }

    #[test]
    fn test_frame_too_large_on_encode() {
        let mut codec = HostCodec::with_max_frame_size(4);
        let mut buf = BytesMut::new();

        let result = codec.encode(OutboundMessage::add(1, "App", "Title", "Body"), &mut buf);
        assert!(matches!(result, Err(CodecError::FrameTooLarge { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_buffer() {
        let mut host = HostCodec::new();
        let mut peer = PeerCodec::new();
        let mut buf = BytesMut::new();

        let messages = [
            OutboundMessage::add(3, "A", "t", "b"),
            OutboundMessage::moved(3),
            OutboundMessage::remove(3),
        ];
        for msg in messages.iter().cloned() {
            host.encode(msg, &mut buf).unwrap();
        }

        for expected in &messages {
            let decoded = peer.decode(&mut buf).unwrap().unwrap().unwrap();
            assert_eq!(&decoded, expected);
        }
        assert!(peer.decode(&mut buf).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_frame_at_eof_is_transport_fault() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut frames = FramedRead::new(reader, HostCodec::new());

        // Declare 12 bytes, deliver 3, then close
        writer.write_all(&12u32.to_le_bytes()).await.unwrap();
        writer.write_all(b"1;1").await.unwrap();
        drop(writer);

        match frames.next().await {
            Some(Err(CodecError::ShortFrame { expected, received })) => {
                assert_eq!(expected, 12);
                assert_eq!(received, 3);
            }
            other => panic!("expected short frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clean_eof_ends_stream() {
        let (writer, reader) = tokio::io::duplex(64);
        let mut frames = FramedRead::new(reader, HostCodec::new());
        drop(writer);

        assert!(frames.next().await.is_none());
    }
}
