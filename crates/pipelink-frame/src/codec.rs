use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: payload length (4, big-endian).
pub const HEADER_SIZE: usize = 4;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default number of bytes requested from the channel per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// One complete, length-delimited message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Take the payload out of the frame.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────────┐
/// │ Length (4B BE)   │ Payload          │
/// │ unsigned         │ (Length bytes)   │
/// └──────────────────┴──────────────────┘
/// ```
///
/// Fails without touching `dst` when the payload exceeds `max_frame_size`
/// (or what the length field can express).
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut, max_frame_size: usize) -> Result<()> {
    let max = max_frame_size.min(u32::MAX as usize);
    if payload.len() > max {
        return Err(FrameError::TooLarge {
            size: payload.len(),
            max,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the frame bytes and leaves any following
/// bytes in place. An oversized declared length is rejected as soon as the
/// header is available, before any payload is buffered.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Frame>> {
    let Some(payload_len) = declared_length(src) else {
        return Ok(None);
    };

    if payload_len > max_frame_size {
        return Err(FrameError::TooLarge {
            size: payload_len,
            max: max_frame_size,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { payload }))
}

fn declared_length(src: &[u8]) -> Option<usize> {
    let header: [u8; HEADER_SIZE] = src.get(..HEADER_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(header) as usize)
}

/// Configuration for frame encoding and decoding.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Bytes requested from the channel per read. Default: 8 KiB.
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let payload = b"hello, pipelink!";

        encode_frame(payload, &mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE + payload.len());
        assert_eq!(&buf[..HEADER_SIZE], &[0, 0, 0, 16]);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();

        assert_eq!(frame.payload.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_length_is_big_endian() {
        let mut buf = BytesMut::new();
        encode_frame(&[7u8; 0x0102], &mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(&buf[..HEADER_SIZE], &[0x00, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn test_decode_declared_length_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32(32 * 1024 * 1024);

        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE);
        assert!(matches!(
            result,
            Err(FrameError::TooLarge {
                size: 33_554_432,
                max: DEFAULT_MAX_FRAME_SIZE
            })
        ));
    }

    #[test]
    fn test_encode_too_large_leaves_buffer_untouched() {
        let mut buf = BytesMut::new();
        let result = encode_frame(b"12345", &mut buf, 4);
        assert!(matches!(
            result,
            Err(FrameError::TooLarge { size: 5, max: 4 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_payload_at_limit_is_accepted() {
        let mut buf = BytesMut::new();
        encode_frame(b"1234", &mut buf, 4).unwrap();
        let frame = decode_frame(&mut buf, 4).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"1234");
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        encode_frame(b"second", &mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        buf.put_slice(&[0x00, 0x00]);

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(f1.payload.as_ref(), b"first");

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(f2.payload.as_ref(), b"second");

        assert!(decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .is_none());
        assert_eq!(buf.as_ref(), &[0x00, 0x00]);
    }

    #[test]
    fn test_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_frame_wire_size() {
        let frame = Frame::new(Bytes::from_static(b"test"));
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
    }
}
