//! Length-prefixed binary encoding shared by every transferable section.
//!
//! Each variable-length unit on the wire, whether a byte blob or a list of
//! elements, is preceded by its length or element count as a fixed 8-byte
//! little-endian integer.

mod binary;

pub use binary::{
    CodecError, Contents, decode_blob, decode_list, encode_blob, encode_list, wire_config,
};
