//! Multiplex frame protocol
//!
//! Defines the internal frame format carried on the shared link between
//! the local proxy endpoint and the relay, and the streaming codec that
//! reads frames off an ordered byte stream.

mod codec;
mod frame;

pub use codec::{write_frame, FrameReader};
pub use frame::{Frame, FrameType, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN, PROTO_VERSION};
