//! Brickline Core - wire-level types for the brick protocol
//!
//! This crate provides the foundational pieces the stream engine builds on:
//! - Packet framing (8-byte header, error-code flags, sequence numbers)
//! - Wire format descriptors with pack/unpack of typed payload values
//! - Chunk slicing for streamed transfers
//! - Base58 device UID handling

pub mod chunk;
pub mod packet;
pub mod uid;
pub mod wire;

pub use chunk::{chunk_count, chunk_data};
pub use packet::{Packet, PacketError, PacketHeader, SequenceNumber};
pub use uid::{Uid, UidError};
pub use wire::{pack, unpack, FieldKind, FormatDescriptor, Value, WireError};
