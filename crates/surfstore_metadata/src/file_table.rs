// The metadata store's file table (spec.md §3, "FileTable" / "FileEntry").

use std::collections::HashMap;

/// The wire-level sentinel blocklist a deleted file is reported with
/// (spec.md §3 invariant 3: `deleted? <=> blocklist == ["0"]`).
pub const DELETED_SENTINEL: &str = "0";

/// Internal per-file record. A deleted file always has `blocklist ==
/// [DELETED_SENTINEL]`; callers must never construct a `deleted: true`
/// entry with any other blocklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub version: u32,
    pub blocklist: Vec<String>,
    pub deleted: bool,
}

impl FileEntry {
    pub fn written(version: u32, blocklist: Vec<String>) -> Self {
        Self { version, blocklist, deleted: false }
    }

    pub fn deleted(version: u32) -> Self {
        Self { version, blocklist: vec![DELETED_SENTINEL.to_string()], deleted: true }
    }
}

/// A mapping from filename to [`FileEntry`]. Absent key means the file has
/// never existed; a `ReadFile` on an absent key reports `{version: 0,
/// blocklist: []}` rather than an error (spec.md §4.3).
pub type FileTable = HashMap<String, FileEntry>;

/// The version a write to `filename` must supply to be accepted: one more
/// than the file's current version, or `1` if the file has never existed.
pub fn next_version(table: &FileTable, filename: &str) -> u32 {
    table.get(filename).map(|entry| entry.version).unwrap_or(0) + 1
}

/// The version currently on record for `filename`, or `0` if absent.
pub fn current_version(table: &FileTable, filename: &str) -> u32 {
    table.get(filename).map(|entry| entry.version).unwrap_or(0)
}
