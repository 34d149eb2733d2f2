//! Versioned binary encodings
//!
//! Every wire type is encoded as `version (1) || type tag (1) || fields`, with
//! fixed-width fields: canonical little-endian scalars and compressed
//! Ristretto points, 32 bytes each.

use curve25519_dalek::scalar::Scalar;

use super::curve::{self, Point, POINT_SIZE, SCALAR_SIZE};
use super::error::{PreError, PreResult};

/// Current wire-format version
pub const CODEC_VERSION: u8 = 1;
/// Size of the `version || type tag` header
pub const HEADER_SIZE: usize = 2;

/// Type tags following the version byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    PrivateKey = 0x01,
    PublicKey = 0x02,
    Capsule = 0x03,
    ReEncryptedCapsule = 0x04,
    ReEncryptionKey = 0x05,
}

impl TryFrom<u8> for WireType {
    type Error = PreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::PrivateKey),
            0x02 => Ok(Self::PublicKey),
            0x03 => Ok(Self::Capsule),
            0x04 => Ok(Self::ReEncryptedCapsule),
            0x05 => Ok(Self::ReEncryptionKey),
            other => Err(PreError::validation(format!("unknown type tag: {other:#04x}"))),
        }
    }
}

/// Read the header and return the wire type, checking the version
pub(crate) fn peek_header(bytes: &[u8]) -> PreResult<WireType> {
    if bytes.len() < HEADER_SIZE {
        return Err(PreError::validation("encoding too short for header"));
    }
    if bytes[0] != CODEC_VERSION {
        return Err(PreError::validation(format!(
            "unsupported codec version {}, expected {}",
            bytes[0], CODEC_VERSION
        )));
    }
    WireType::try_from(bytes[1])
}

/// Fixed-size encoder
pub(crate) struct Writer<const N: usize> {
    buf: [u8; N],
    pos: usize,
}

impl<const N: usize> Writer<N> {
    pub(crate) fn new(wire_type: WireType) -> Self {
        let mut buf = [0u8; N];
        buf[0] = CODEC_VERSION;
        buf[1] = wire_type as u8;
        Self {
            buf,
            pos: HEADER_SIZE,
        }
    }

    pub(crate) fn bytes(mut self, data: &[u8]) -> Self {
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        self
    }

    pub(crate) fn point(self, point: &Point) -> Self {
        self.bytes(&curve::point_to_bytes(point))
    }

    pub(crate) fn scalar(self, scalar: &Scalar) -> Self {
        self.bytes(scalar.as_bytes())
    }

    pub(crate) fn finish(self) -> [u8; N] {
        debug_assert_eq!(self.pos, N, "encoder did not fill its buffer");
        self.buf
    }
}

/// Fixed-size decoder over a slice whose length and header were already checked
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Check the exact length and the header, then position after it
    pub(crate) fn new(bytes: &'a [u8], expected: WireType, size: usize) -> PreResult<Self> {
        let wire_type = peek_header(bytes)?;
        if wire_type != expected {
            return Err(PreError::validation(format!(
                "unexpected type tag, expected {:?}, got {:?}",
                expected, wire_type
            )));
        }
        if bytes.len() != size {
            return Err(PreError::validation(format!(
                "invalid {:?} size, expected {}, got {}",
                expected,
                size,
                bytes.len()
            )));
        }
        Ok(Self {
            bytes,
            pos: HEADER_SIZE,
        })
    }

    pub(crate) fn take(&mut self, n: usize) -> &'a [u8] {
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    pub(crate) fn point(&mut self) -> PreResult<Point> {
        curve::point_from_bytes(self.take(POINT_SIZE))
    }

    pub(crate) fn nonidentity_point(&mut self) -> PreResult<Point> {
        curve::nonidentity_point_from_bytes(self.take(POINT_SIZE))
    }

    pub(crate) fn scalar(&mut self) -> PreResult<Scalar> {
        curve::scalar_from_bytes(self.take(SCALAR_SIZE))
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// Encoding used by the serde and hex helpers
pub(crate) trait Encode {
    fn encode(&self) -> PreResult<Vec<u8>>;
}

/// Decode hex with an optional `0x` prefix
pub(crate) fn decode_hex(hex: &str) -> PreResult<Vec<u8>> {
    let hex = hex.trim();
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    hex::decode(hex).map_err(|e| PreError::validation(format!("hex decode error: {e}")))
}

/// Implement serde for a type as its codec byte string
///
/// Binary formats get raw bytes; self-describing formats such as JSON may hand
/// back a sequence, which is accepted too.
macro_rules! impl_serde_bytes {
    ($ty:ty, $expecting:literal) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                let bytes = $crate::crypto::codec::Encode::encode(self)
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_bytes(&bytes)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                use serde::de::{Error, Visitor};
                use std::fmt;

                struct BytesVisitor;

                impl<'de> Visitor<'de> for BytesVisitor {
                    type Value = $ty;

                    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                        formatter.write_str($expecting)
                    }

                    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                    where
                        E: Error,
                    {
                        <$ty>::from_bytes(v).map_err(E::custom)
                    }

                    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
                    where
                        A: serde::de::SeqAccess<'de>,
                    {
                        let mut bytes = Vec::new();
                        while let Some(byte) = seq.next_element::<u8>()? {
                            bytes.push(byte);
                        }
                        <$ty>::from_bytes(&bytes).map_err(A::Error::custom)
                    }
                }

                deserializer.deserialize_byte_buf(BytesVisitor)
            }
        }
    };
}

pub(crate) use impl_serde_bytes;
