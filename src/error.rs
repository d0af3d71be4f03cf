use std::time::Duration;

use thiserror::Error;

use crate::models::ResultCode;
use crate::transport::TransportError;

/// Error type for client operations and control-point requests.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no control response within {0:?}")]
    Timeout(Duration),

    #[error("control channel closed")]
    Closed,

    #[error("control indication arrived with no outstanding request")]
    UnsolicitedIndication,

    #[error("peripheral rejected op code {op_code:#04x}: {result:?}")]
    OperationFailed { op_code: u8, result: ResultCode },
}

/// Error type for payload decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("quality bits out of range: {0}")]
    InvalidQuality(u8),

    #[error("state bits out of range: {0}")]
    InvalidState(u8),

    #[error("unknown result code: {0:#04x}")]
    InvalidResultCode(u8),

    #[error("indication is not a control response: leading byte {0:#04x}")]
    NotAResponse(u8),
}
