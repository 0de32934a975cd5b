//! Chunked stream transfer engine
//!
//! Device functions that move more data than fits into one packet are
//! exposed as "low level" calls carrying `(total length, chunk offset,
//! chunk data)`. This module drives those calls as whole transfers:
//! `write_stream` splits a payload into fixed-size chunks and walks the
//! send/ack loop, `read_stream` reassembles chunked responses and drains
//! the wire when a chunk arrives out of sync. Transfers against the same
//! (device, function) pair are serialized in submission order.

use brickline_core::{chunk_count, chunk_data, wire, FormatDescriptor, Packet, Uid, Value, WireError};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::element::StreamElement;
use crate::error::StreamError;
use crate::options::EngineOptions;
use crate::registry::StreamSlots;
use crate::transport::Transport;

/// Largest logical payload the wire can describe (the length field is u16)
pub const MAX_STREAM_LENGTH: usize = 65535;

/// Static description of one streaming function
///
/// The request payload is the window fields followed by
/// `(total_length: u16, chunk_offset: u16, chunk_data)`; read responses
/// carry `(total_length: u16, chunk_offset: u16, chunk_data)`, with the
/// length field absent when `fixed_length` is set. Short-write responses
/// lead with the written element count.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub function_id: u8,
    /// Elements per wire chunk - a protocol constant, e.g. 432 or 464
    pub chunk_len: u16,
    /// Declared total length for streams that never send one on the wire
    pub fixed_length: Option<u16>,
    /// The whole stream always fits into a single chunk
    pub single_chunk: bool,
    /// Write acks report how many elements were actually consumed
    pub short_write: bool,
    /// Whether the device acknowledges write chunks
    pub response_expected: bool,
    /// Request payload layout
    pub request_format: FormatDescriptor,
    /// Response payload layout
    pub response_format: FormatDescriptor,
}

/// Outcome of a completed stream write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamWrite {
    /// Plain write: every element was sent
    Complete,
    /// Short-write function: total element count the device reported
    Written(usize),
}

/// One reassembled response chunk
struct ReadChunk<E> {
    total: u16,
    offset: u16,
    data: Vec<E>,
}

/// Drives chunked stream transfers over a transport
pub struct StreamEngine<T: Transport> {
    transport: T,
    slots: StreamSlots,
    options: EngineOptions,
}

impl<T: Transport> StreamEngine<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, EngineOptions::default())
    }

    pub fn with_options(transport: T, options: EngineOptions) -> Self {
        Self {
            transport,
            slots: StreamSlots::new(),
            options,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Write a whole payload to a streaming function
    ///
    /// `window` holds the fixed leading request fields (addressing,
    /// window coordinates). Returns the device-reported written total
    /// for short-write functions, `Complete` otherwise.
    pub async fn write_stream<E: StreamElement>(
        &self,
        uid: Uid,
        config: &StreamConfig,
        window: &[Value],
        data: &[E],
    ) -> Result<StreamWrite, StreamError> {
        if data.len() > MAX_STREAM_LENGTH {
            return Err(StreamError::InvalidParameter);
        }

        let _slot = self.slots.acquire(uid, config.function_id).await;

        let chunk_len = config.chunk_len as usize;
        let total_len = config.fixed_length.unwrap_or(data.len() as u16);
        debug!(
            uid = %uid,
            function_id = config.function_id,
            total = data.len(),
            chunks = chunk_count(data.len(), chunk_len),
            "Starting stream write"
        );

        if !config.response_expected {
            // Unacknowledged writes go out back-to-back
            if config.single_chunk {
                let payload = write_payload(config, window, total_len, 0, data)?;
                self.transport.send(uid, config.function_id, payload).await?;
            } else {
                let mut offset = 0usize;
                while offset < data.len() {
                    let payload = write_payload(config, window, total_len, offset as u16, data)?;
                    self.transport.send(uid, config.function_id, payload).await?;
                    offset += chunk_len;
                }
            }
            return Ok(StreamWrite::Complete);
        }

        // Acknowledged writes move one chunk per round trip. The first
        // chunk is always sent, even for an empty payload.
        let mut written = 0usize;
        let mut offset = 0usize;
        loop {
            let payload = write_payload(config, window, total_len, offset as u16, data)?;
            trace!(uid = %uid, function_id = config.function_id, offset, "Sending chunk");
            let packet = self.request(uid, config.function_id, payload).await?;
            offset += chunk_len;

            if config.short_write {
                let count = written_count(config, &packet)?;
                written += count;
                if count < chunk_len {
                    // the device stopped early; this was the last chunk
                    break;
                }
            }

            if config.single_chunk || offset >= data.len() {
                break;
            }
        }

        debug!(uid = %uid, function_id = config.function_id, written, "Stream write complete");
        Ok(if config.short_write {
            StreamWrite::Written(written)
        } else {
            StreamWrite::Complete
        })
    }

    /// Read a whole payload from a streaming function
    ///
    /// Each low-level request returns "the next chunk" - the device keeps
    /// the read cursor, no offset is sent. The first response establishes
    /// the total length; every later chunk must arrive exactly at the
    /// assembled length or the stream is out of sync.
    pub async fn read_stream<E: StreamElement>(
        &self,
        uid: Uid,
        config: &StreamConfig,
        window: &[Value],
    ) -> Result<Vec<E>, StreamError> {
        let _slot = self.slots.acquire(uid, config.function_id).await;

        let request = wire::pack(window, &config.request_format)?;
        debug!(uid = %uid, function_id = config.function_id, "Starting stream read");

        let packet = self.request(uid, config.function_id, request.clone()).await?;
        let first = read_chunk::<E>(config, &packet)?;
        let total = first.total as usize;

        if config.single_chunk {
            let mut data = first.data;
            data.truncate(total);
            return Ok(data);
        }

        if first.offset != 0 {
            return Err(self
                .drain_out_of_sync::<E>(uid, config, &request, first.offset, total)
                .await);
        }

        let mut data = first.data;
        while data.len() < total {
            let packet = self.request(uid, config.function_id, request.clone()).await?;
            let chunk = read_chunk::<E>(config, &packet)?;
            trace!(
                uid = %uid,
                function_id = config.function_id,
                offset = chunk.offset,
                assembled = data.len(),
                "Received chunk"
            );

            if chunk.offset as usize != data.len() {
                return Err(self
                    .drain_out_of_sync::<E>(uid, config, &request, chunk.offset, chunk.total as usize)
                    .await);
            }
            data.extend_from_slice(&chunk.data);
        }

        data.truncate(total);
        debug!(uid = %uid, function_id = config.function_id, total, "Stream read complete");
        Ok(data)
    }

    /// Consume the remainder of a derailed read stream
    ///
    /// The wire has no abort primitive; the device keeps pushing
    /// continuation chunks until its cursor reaches the declared end. The
    /// only way to keep the connection usable is to request and discard
    /// them, then report the failure.
    async fn drain_out_of_sync<E: StreamElement>(
        &self,
        uid: Uid,
        config: &StreamConfig,
        request: &[u8],
        mut offset: u16,
        mut total: usize,
    ) -> StreamError {
        let chunk_len = config.chunk_len as usize;

        while (offset as usize) + chunk_len < total {
            let packet = match self.request(uid, config.function_id, request.to_vec()).await {
                Ok(packet) => packet,
                Err(err) => return err,
            };
            let chunk = match read_chunk::<E>(config, &packet) {
                Ok(chunk) => chunk,
                Err(err) => return err,
            };
            offset = chunk.offset;
            total = chunk.total as usize;
        }

        warn!(
            uid = %uid,
            function_id = config.function_id,
            "Stream out of sync, remainder drained"
        );
        StreamError::OutOfSync
    }

    /// Issue one low-level request, bounded by the configured timeout,
    /// and classify a non-zero response error code
    async fn request(
        &self,
        uid: Uid,
        function_id: u8,
        payload: Vec<u8>,
    ) -> Result<Packet, StreamError> {
        let pending = self.transport.request(uid, function_id, payload);
        let packet = match self.options.request_timeout() {
            Some(limit) => timeout(limit, pending)
                .await
                .map_err(|_| StreamError::Timeout)??,
            None => pending.await?,
        };

        match packet.error_code() {
            0 => Ok(packet),
            code => Err(StreamError::from_error_code(code)),
        }
    }
}

/// Build one chunk request payload: window fields, then
/// `(total_length, chunk_offset, chunk_data)`
fn write_payload<E: StreamElement>(
    config: &StreamConfig,
    window: &[Value],
    total_len: u16,
    offset: u16,
    data: &[E],
) -> Result<Vec<u8>, StreamError> {
    let chunk = chunk_data(data, offset as usize, config.chunk_len as usize, E::FILLER);
    let mut values = Vec::with_capacity(window.len() + 3);
    values.extend_from_slice(window);
    values.push(Value::Uint16(total_len));
    values.push(Value::Uint16(offset));
    values.push(E::pack_chunk(&chunk));
    Ok(wire::pack(&values, &config.request_format)?)
}

/// Parse one read response into `(total, offset, data)`
fn read_chunk<E: StreamElement>(
    config: &StreamConfig,
    packet: &Packet,
) -> Result<ReadChunk<E>, StreamError> {
    if packet.payload.is_empty() && config.response_format.wire_len() > 0 {
        return Err(WireError::Truncated {
            needed: config.response_format.wire_len(),
            got: 0,
        }
        .into());
    }

    let values = wire::unpack(&packet.payload, &config.response_format)?;
    let mut fields = values.iter();

    let total = match config.fixed_length {
        Some(length) => length,
        None => expect_u16(fields.next())?,
    };
    let offset = expect_u16(fields.next())?;
    let expected_fields = if config.fixed_length.is_some() { 2 } else { 3 };
    let data = match fields.next() {
        Some(value) => E::unpack_chunk(value)?,
        None => {
            return Err(StreamError::Wire(WireError::ArityMismatch {
                expected: expected_fields,
                got: values.len(),
            }))
        }
    };

    Ok(ReadChunk {
        total,
        offset,
        data,
    })
}

/// Extract the written element count from a short-write ack
fn written_count(config: &StreamConfig, packet: &Packet) -> Result<usize, StreamError> {
    let values = wire::unpack(&packet.payload, &config.response_format)?;
    values
        .first()
        .and_then(Value::as_usize)
        .ok_or(StreamError::Wire(WireError::KindMismatch {
            expected: brickline_core::FieldKind::Uint16,
        }))
}

fn expect_u16(value: Option<&Value>) -> Result<u16, StreamError> {
    value
        .and_then(Value::as_u16)
        .ok_or(StreamError::Wire(WireError::KindMismatch {
            expected: brickline_core::FieldKind::Uint16,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    /// Transport that must never be reached
    struct UnreachableTransport;

    impl Transport for UnreachableTransport {
        async fn request(
            &self,
            _uid: Uid,
            _function_id: u8,
            _payload: Vec<u8>,
        ) -> Result<Packet, TransportError> {
            panic!("no wire traffic expected");
        }

        async fn send(
            &self,
            _uid: Uid,
            _function_id: u8,
            _payload: Vec<u8>,
        ) -> Result<(), TransportError> {
            panic!("no wire traffic expected");
        }
    }

    fn bool_write_config() -> StreamConfig {
        StreamConfig {
            function_id: 1,
            chunk_len: 432,
            fixed_length: None,
            single_chunk: false,
            short_write: false,
            response_expected: true,
            request_format: FormatDescriptor::parse("H H ?432").unwrap(),
            response_format: FormatDescriptor::empty(),
        }
    }

    #[tokio::test]
    async fn test_oversized_payload_sends_nothing() {
        let engine = StreamEngine::new(UnreachableTransport);
        let data = vec![false; MAX_STREAM_LENGTH + 1];

        let result = engine
            .write_stream(Uid::new(1), &bool_write_config(), &[], &data)
            .await;
        assert!(matches!(result, Err(StreamError::InvalidParameter)));
    }

    #[test]
    fn test_write_payload_layout() {
        let config = StreamConfig {
            request_format: FormatDescriptor::parse("H H H ?432").unwrap(),
            ..bool_write_config()
        };
        let mut data = vec![false; 500];
        data[432] = true;

        let payload = write_payload(&config, &[Value::Uint16(7)], 500, 432, &data).unwrap();

        let format = FormatDescriptor::parse("H H H ?432").unwrap();
        let values = wire::unpack(&payload, &format).unwrap();
        assert_eq!(values[0], Value::Uint16(7));
        assert_eq!(values[1], Value::Uint16(500));
        assert_eq!(values[2], Value::Uint16(432));
        match &values[3] {
            Value::Array(items) => {
                assert_eq!(items.len(), 432);
                assert_eq!(items[0], Value::Bool(true));
                // 500 - 432 = 68 real elements, rest is filler
                assert_eq!(items[68], Value::Bool(false));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }
}
