use std::io::{Read, Write};

use snafu::{ResultExt, Snafu, ensure};
use tracing::debug;

use crate::codec::{CodecError, Contents, decode_blob, decode_list, encode_blob, encode_list};
use crate::snapshot::{Entry, MetadataCodec};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

fn boxed<E: std::error::Error + Send + Sync + 'static>(error: E) -> BoxedError {
    Box::new(error)
}

/// A metadata tree and the payloads its file entries point at.
///
/// On the wire a snapshot is the metadata section (8-byte length followed by
/// the metadata codec's bytes) and then the content section (8-byte count
/// followed by each length-prefixed payload).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    root: Entry,
    contents: Vec<Contents>,
}

impl Snapshot {
    pub fn new(root: Entry, contents: Vec<Contents>) -> Self {
        Self { root, contents }
    }

    pub fn root(&self) -> &Entry {
        &self.root
    }

    pub fn contents(&self) -> &[Contents] {
        &self.contents
    }

    pub fn into_parts(self) -> (Entry, Vec<Contents>) {
        (self.root, self.contents)
    }

    pub fn encode<M: MetadataCodec, W: Write>(
        &self,
        codec: &M,
        writer: &mut W,
    ) -> Result<(), ContainerError> {
        let metadata = codec
            .encode(&self.root)
            .map_err(boxed)
            .context(MetadataEncodeSnafu)?;
        encode_blob(&metadata, writer).context(MetadataSectionSnafu)?;
        encode_list(&self.contents, writer).context(ContentSectionSnafu)?;
        debug!(
            "Encoded snapshot with {} metadata bytes and {} payloads",
            metadata.len(),
            self.contents.len()
        );
        Ok(())
    }

    pub fn decode<M: MetadataCodec, R: Read>(
        codec: &M,
        reader: &mut R,
    ) -> Result<Self, ContainerError> {
        let metadata = decode_blob(reader).context(MetadataSectionSnafu)?;
        let root = codec
            .decode(&metadata)
            .map_err(boxed)
            .context(MetadataDecodeSnafu)?;
        let contents = decode_list(reader).context(ContentSectionSnafu)?;
        debug!(
            "Decoded snapshot with {} metadata bytes and {} payloads",
            metadata.len(),
            contents.len()
        );
        Ok(Self { root, contents })
    }

    pub fn to_bytes<M: MetadataCodec>(&self, codec: &M) -> Result<Vec<u8>, ContainerError> {
        let mut buffer = Vec::new();
        self.encode(codec, &mut buffer)?;
        Ok(buffer)
    }

    /// Decodes a snapshot that must span all of `bytes`.
    pub fn from_bytes<M: MetadataCodec>(codec: &M, bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut reader = bytes;
        let snapshot = Self::decode(codec, &mut reader)?;
        ensure!(
            reader.is_empty(),
            TrailingBytesSnafu {
                count: reader.len()
            }
        );
        Ok(snapshot)
    }
}

#[derive(Debug, Snafu)]
pub enum ContainerError {
    #[snafu(display("Failed to encode the metadata tree"))]
    MetadataEncodeError { source: BoxedError },
    #[snafu(display("Failed to decode the metadata tree"))]
    MetadataDecodeError { source: BoxedError },
    #[snafu(display("Malformed metadata section"))]
    MetadataSectionError { source: CodecError },
    #[snafu(display("Malformed content section"))]
    ContentSectionError { source: CodecError },
    #[snafu(display("Found {} unexpected bytes after the content section", count))]
    TrailingBytes { count: usize },
}
