// ABOUTME: Request/response data types for the face detection wire protocol

use bytes::Bytes;
use num_enum::TryFromPrimitive;

/// The four magic bytes that open every frame, in transmission order.
pub const MAGIC: [u8; 4] = [0x31, 0x72, 0x10, 0x23];

/// The same four bytes, read as a little-endian `u32`.
pub const MAGIC_U32: u32 = 0x2310_7231;

/// Request operation byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum RequestOp {
    Detect = 0,
    Replace = 1,
}

/// Response operation byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ResponseOp {
    Image = 2,
    Error = 3,
}

/// A fully decoded request frame.
#[derive(Debug, Clone)]
pub struct Request {
    pub op: RequestOp,
    pub primary: Bytes,
    pub secondary: Option<Bytes>,
}

impl Request {
    pub fn detect(primary: Bytes) -> Self {
        Request { op: RequestOp::Detect, primary, secondary: None }
    }

    pub fn replace(primary: Bytes, secondary: Bytes) -> Self {
        Request { op: RequestOp::Replace, primary, secondary: Some(secondary) }
    }
}

/// A response frame, ready to serialize.
#[derive(Debug, Clone)]
pub enum Response {
    Image(Bytes),
    Error(String),
}
