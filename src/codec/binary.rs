use std::io::{ErrorKind, Read, Write};

use bincode::config::Config;
use bincode::de::Decoder;
use bincode::de::read::Reader;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use derive_more::{Deref, From, Into};
use snafu::{ResultExt, Snafu};

/// Fixed-width little-endian integers, so every length prefix is exactly 8 bytes.
pub fn wire_config() -> impl Config {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// Declared lengths are only trusted this far ahead of the bytes actually read.
const READ_CHUNK_SIZE: usize = 64 * 1024;
const PREALLOCATED_ELEMENTS: usize = 1024;

/// Raw payload of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, From, Into, Deref)]
pub struct Contents(Vec<u8>);

impl<Context> Decode<Context> for Contents {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let declared = u64::decode(decoder)?;
        let len = decoded_len(declared)?;
        decoder.claim_container_read::<u8>(len)?;

        // A corrupt prefix must run out of input, not out of memory.
        let mut bytes = Vec::with_capacity(len.min(READ_CHUNK_SIZE));
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(READ_CHUNK_SIZE);
            let start = bytes.len();
            bytes.resize(start + chunk, 0);
            decoder.reader().read(&mut bytes[start..])?;
            remaining -= chunk;
        }
        Ok(Self(bytes))
    }
}

fn decoded_len(declared: u64) -> Result<usize, DecodeError> {
    usize::try_from(declared).map_err(|_| DecodeError::OutsideUsizeRange(declared))
}

impl From<&[u8]> for Contents {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Writes `bytes` preceded by their length.
pub fn encode_blob<W: Write>(bytes: &[u8], writer: &mut W) -> Result<usize, CodecError> {
    bincode::encode_into_std_write(bytes, writer, wire_config()).context(EncodeSnafu)
}

/// Reads one length-prefixed blob. Exactly the declared number of bytes must
/// be available, otherwise the read fails.
pub fn decode_blob<R: Read>(reader: &mut R) -> Result<Contents, CodecError> {
    bincode::decode_from_std_read::<Contents, _, _>(reader, wire_config()).context(DecodeSnafu)
}

/// Writes the element count followed by each element's own encoding, in order.
pub fn encode_list<T: Encode + 'static, W: Write>(
    elements: &[T],
    writer: &mut W,
) -> Result<usize, CodecError> {
    bincode::encode_into_std_write(elements, writer, wire_config()).context(EncodeSnafu)
}

/// Reads an element count and then that many elements. Storage grows with the
/// elements actually decoded, not with the declared count.
pub fn decode_list<T: Decode<()>, R: Read>(reader: &mut R) -> Result<Vec<T>, CodecError> {
    let declared: u64 =
        bincode::decode_from_std_read(reader, wire_config()).context(DecodeSnafu)?;
    let count = decoded_len(declared).context(DecodeSnafu)?;

    let mut elements = Vec::with_capacity(count.min(PREALLOCATED_ELEMENTS));
    for _ in 0..count {
        elements.push(bincode::decode_from_std_read(reader, wire_config()).context(DecodeSnafu)?);
    }
    Ok(elements)
}

#[derive(Debug, Snafu)]
pub enum CodecError {
    #[snafu(display("Failed to encode binary section"))]
    EncodeError { source: EncodeError },
    #[snafu(display("Failed to decode binary section"))]
    DecodeError { source: DecodeError },
}

impl CodecError {
    /// Whether decoding stopped because the input ended before the declared length.
    pub fn is_truncated(&self) -> bool {
        match self {
            CodecError::DecodeError {
                source: DecodeError::Io { inner, .. },
            } => inner.kind() == ErrorKind::UnexpectedEof,
            CodecError::DecodeError {
                source: DecodeError::UnexpectedEnd { .. },
            } => true,
            _ => false,
        }
    }
}
