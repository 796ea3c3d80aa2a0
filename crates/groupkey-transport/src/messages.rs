//! Wire responses.
//!
//! ```text
//! Data:     0x01 || payload
//! Negative: 0x00 || NEGATIVE_BODY
//! ```
//!
//! Every negative response encodes to the same bytes, whatever the reason.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Body carried by every negative response.
pub const NEGATIVE_BODY: &[u8; 16] = b"groupkey-nack-v1";

const TAG_NEGATIVE: u8 = 0x00;
const TAG_DATA: u8 = 0x01;

/// The answer to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The content published under the requested name.
    Data(Bytes),
    /// Nothing is available for the requested name.
    Negative,
}

impl Response {
    /// Whether this is a negative response.
    pub fn is_negative(&self) -> bool {
        matches!(self, Response::Negative)
    }

    /// The payload of a data response.
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Response::Data(payload) => Some(payload),
            Response::Negative => None,
        }
    }

    /// Encode for the wire.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Response::Data(payload) => {
                let mut buf = BytesMut::with_capacity(1 + payload.len());
                buf.put_u8(TAG_DATA);
                buf.put_slice(payload);
                buf.freeze()
            }
            Response::Negative => {
                let mut buf = BytesMut::with_capacity(1 + NEGATIVE_BODY.len());
                buf.put_u8(TAG_NEGATIVE);
                buf.put_slice(NEGATIVE_BODY);
                buf.freeze()
            }
        }
    }

    /// Decode from the wire.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.split_first() {
            Some((&TAG_DATA, payload)) => Ok(Response::Data(Bytes::copy_from_slice(payload))),
            Some((&TAG_NEGATIVE, body)) if body == NEGATIVE_BODY => Ok(Response::Negative),
            Some((&TAG_NEGATIVE, _)) => Err(TransportError::Encoding(
                "malformed negative response".into(),
            )),
            Some((tag, _)) => Err(TransportError::Encoding(format!(
                "unknown response tag {tag:#04x}"
            ))),
            None => Err(TransportError::Encoding("empty response".into())),
        }
    }
}
