//! Length-prefixed message framing over blocking byte channels.
//!
//! Every message on the wire is a 4-byte big-endian payload length followed
//! by exactly that many payload bytes. There is no magic, version or checksum:
//! payload interpretation belongs to the layer above.
//!
//! Callers only ever see complete frames. A stream that ends mid-frame is
//! reported as [`FrameError::TruncatedStream`] rather than delivered short.

pub mod codec;
pub mod error;
pub mod framer;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_READ_CHUNK_SIZE, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use framer::Framer;
pub use reader::FrameReader;
pub use writer::FrameWriter;
