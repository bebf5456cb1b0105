use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Metadata node describing one path of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub kind: EntryKind,
    /// `None` when no modification time was ever recorded for the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<SystemTime>,
    /// The path was present in the previous snapshot but is gone now.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    Folder {
        children: BTreeMap<String, Entry>,
    },
    File {
        /// Position of the payload in the snapshot's content list. `None`
        /// when the content was not captured because the file is unchanged.
        content_index: Option<usize>,
    },
}

fn is_false(value: &bool) -> bool {
    !value
}

impl Entry {
    pub fn folder(modified_at: Option<SystemTime>, children: BTreeMap<String, Entry>) -> Self {
        Self {
            kind: EntryKind::Folder { children },
            modified_at,
            is_deleted: false,
        }
    }

    pub fn file(modified_at: Option<SystemTime>, content_index: Option<usize>) -> Self {
        Self {
            kind: EntryKind::File { content_index },
            modified_at,
            is_deleted: false,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, EntryKind::Folder { .. })
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Entry>> {
        match &self.kind {
            EntryKind::Folder { children } => Some(children),
            EntryKind::File { .. } => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Entry> {
        self.children().and_then(|children| children.get(name))
    }

    pub fn content_index(&self) -> Option<usize> {
        match self.kind {
            EntryKind::File { content_index } => content_index,
            EntryKind::Folder { .. } => None,
        }
    }

    /// Deletion marker for this path. Keeps kind and timestamp, drops the
    /// content reference and children, which belong to an older snapshot.
    pub fn tombstone(&self) -> Self {
        let kind = match self.kind {
            EntryKind::Folder { .. } => EntryKind::Folder {
                children: BTreeMap::new(),
            },
            EntryKind::File { .. } => EntryKind::File {
                content_index: None,
            },
        };

        Self {
            kind,
            modified_at: self.modified_at,
            is_deleted: true,
        }
    }

    /// Counts the entries of this subtree, this node included.
    pub fn summarize(&self) -> EntrySummary {
        let mut summary = EntrySummary::default();
        self.accumulate(&mut summary);
        summary
    }

    fn accumulate(&self, summary: &mut EntrySummary) {
        if self.is_deleted {
            summary.deleted += 1;
            return;
        }

        match &self.kind {
            EntryKind::Folder { children } => {
                summary.folders += 1;
                for child in children.values() {
                    child.accumulate(summary);
                }
            }
            EntryKind::File {
                content_index: Some(_),
            } => summary.captured_files += 1,
            EntryKind::File {
                content_index: None,
            } => summary.unchanged_files += 1,
        }
    }
}

impl Default for Entry {
    /// An empty folder with no recorded timestamp.
    fn default() -> Self {
        Self::folder(None, BTreeMap::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntrySummary {
    pub folders: usize,
    pub captured_files: usize,
    pub unchanged_files: usize,
    pub deleted: usize,
}
