//! Stream multiplexing over the shared link
//!
//! One client↔relay session carries many logical streams over a single
//! ordered transport connection. This module owns the machinery both
//! roles share: the per-stream reassembly buffer, the stream table, the
//! single-writer link queue, and the per-stream ingress/egress pumps.

mod link;
mod reassembly;
mod stream;
mod table;

pub use link::{spawn_link_writer, LINK_QUEUE_DEPTH};
pub use reassembly::ReassemblyBuffer;
pub use stream::{run_stream, StreamEvent, STREAM_CHUNK_SIZE, STREAM_EVENT_QUEUE_DEPTH};
pub use table::StreamTable;
