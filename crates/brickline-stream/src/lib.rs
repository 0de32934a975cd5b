//! Brickline Stream - chunked stream transfers over the brick protocol
//!
//! Payloads too large for one packet (display pixel buffers, byte
//! streams) are exposed by devices as "low level" functions that move one
//! fixed-size chunk per request. This crate turns those per-chunk calls
//! into whole logical transfers:
//! - `write_stream` splits a payload into chunks and drives the
//!   send/ack loop, including short-write accumulation
//! - `read_stream` reassembles chunked responses, detects out-of-sync
//!   chunks and drains the wire before reporting them
//! - transfers against the same (device, function) pair are serialized
//!   in submission order; different pairs never contend

pub mod element;
pub mod engine;
pub mod error;
pub mod options;
pub mod registry;
pub mod transport;

pub use element::StreamElement;
pub use engine::{StreamConfig, StreamEngine, StreamWrite, MAX_STREAM_LENGTH};
pub use error::StreamError;
pub use options::{load_options, EngineOptions};
pub use registry::StreamSlots;
pub use transport::{Transport, TransportError};
