use crate::snapshot::Entry;

/// Encoder for the metadata tree. The container treats its output as an
/// opaque byte section.
pub trait MetadataCodec {
    type Error: std::error::Error + Send + Sync + 'static;

    fn encode(&self, root: &Entry) -> Result<Vec<u8>, Self::Error>;
    fn decode(&self, bytes: &[u8]) -> Result<Entry, Self::Error>;
}

/// Metadata tree as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataCodec;

impl MetadataCodec for JsonMetadataCodec {
    type Error = serde_json::Error;

    fn encode(&self, root: &Entry) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(root)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Entry, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::{Duration, SystemTime};

    #[test]
    fn json_codec_preserves_the_tree() {
        let modified_at = Some(SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 123));
        let root = Entry::folder(
            modified_at,
            BTreeMap::from([
                ("file.txt".to_string(), Entry::file(modified_at, Some(0))),
                ("old.txt".to_string(), Entry::file(None, None).tombstone()),
                ("empty".to_string(), Entry::default()),
            ]),
        );

        let bytes = JsonMetadataCodec.encode(&root).expect("Failed to encode");
        let decoded = JsonMetadataCodec.decode(&bytes).expect("Failed to decode");

        assert_eq!(decoded, root);
    }

    #[test]
    fn json_codec_rejects_empty_input() {
        assert!(JsonMetadataCodec.decode(&[]).is_err());
    }
}
