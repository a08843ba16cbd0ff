//! Codec boundary
//!
//! The state machine only sees typed [`Request`]/[`Response`] values; a
//! [`MessageCodec`] turns them into bytes and back. EXI lives outside this
//! crate. [`JsonCodec`] is used by the simulator and the tests.

use tracing::debug;

use crate::error::CodecError;
use crate::message::{Request, Response};

/// Byte encoding of the EVSE side of the protocol
pub trait MessageCodec: Send {
    fn decode(&self, bytes: &[u8]) -> Result<Request, CodecError>;
    fn encode(&self, response: &Response) -> Result<Vec<u8>, CodecError>;
}

/// Internally tagged JSON (`{"type": "DcPreCharge", ...}`)
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// EV side: encode a request
    pub fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(request)?)
    }

    /// EV side: decode a response
    pub fn decode_response(&self, bytes: &[u8]) -> Result<Response, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyPayload);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl MessageCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Request, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyPayload);
        }
        let request: Request = serde_json::from_slice(bytes)?;
        debug!("Decoded {} ({} bytes)", request.message_type(), bytes.len());
        Ok(request)
    }

    fn encode(&self, response: &Response) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(response)?)
    }
}
