//! Transport seam between the stream engine and the connection layer
//!
//! The engine only needs two primitives from the layer below: send a
//! request and await its correlated response, or send a request for which
//! the device will not reply. Framing, socket handling and response
//! correlation by sequence number live behind this trait.

use brickline_core::{Packet, Uid};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,
    #[error("Device {0} not reachable")]
    Unreachable(Uid),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Low-level request transport for one connection
pub trait Transport: Send + Sync {
    /// Send a request and await the correlated response packet
    fn request(
        &self,
        uid: Uid,
        function_id: u8,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<Packet, TransportError>> + Send;

    /// Send a request for which no response is expected
    fn send(
        &self,
        uid: Uid,
        function_id: u8,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
