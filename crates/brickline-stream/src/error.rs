//! Stream transfer error taxonomy

use brickline_core::packet::{ERROR_CODE_FUNCTION_NOT_SUPPORTED, ERROR_CODE_INVALID_PARAMETER};
use brickline_core::WireError;
use thiserror::Error;

use crate::transport::TransportError;

/// Terminal outcome of a failed stream transfer
///
/// One low-level failure terminates the whole logical transfer; nothing
/// is retried. `OutOfSync` never appears on the wire - it is synthesized
/// by the read reassembly when a chunk offset does not match the
/// assembled length.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Bad input size, or the device reported error code 1
    #[error("Invalid parameter")]
    InvalidParameter,
    /// The device firmware does not implement the function (code 2)
    #[error("Function not supported by device")]
    FunctionNotSupported,
    /// Any other non-zero wire error code
    #[error("Device reported unknown error (code {0})")]
    Unknown(u8),
    /// A chunk arrived at an offset that does not match the assembled
    /// length; the remainder of the stream was drained and discarded
    #[error("Stream out of sync")]
    OutOfSync,
    /// The device did not answer within the configured request timeout
    #[error("Request timed out")]
    Timeout,
    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl StreamError {
    /// Classify a non-zero response error code
    pub fn from_error_code(code: u8) -> Self {
        match code {
            ERROR_CODE_INVALID_PARAMETER => Self::InvalidParameter,
            ERROR_CODE_FUNCTION_NOT_SUPPORTED => Self::FunctionNotSupported,
            code => Self::Unknown(code),
        }
    }
}
