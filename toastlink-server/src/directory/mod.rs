//! Persisted allow-list of notification source apps
//!
//! Every app that has raised a host notification gets one entry. New apps
//! are allowed by default; the host layer edits the list wholesale through
//! [`AppDirectory::save`].

mod record;
mod store;

pub use record::RecordError;
pub use store::{DirectoryStore, FileStore, MemoryStore};

use tracing::{debug, warn};

use toastlink_utils::Result;

use record::{decode_records, encode_record};

/// One app in the allow-list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppDirectoryEntry {
    /// Identity of the app that raised the notification
    pub key: String,
    pub display_name: String,
    /// Whether notifications of this app are mirrored
    pub allowed: bool,
    /// Encoded icon image; empty when unavailable
    pub icon: Vec<u8>,
    /// Drop this entry on the next save (never persisted)
    pub marked_for_deletion: bool,
}

impl AppDirectoryEntry {
    /// A newly seen app, allowed by default
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, icon: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            allowed: true,
            icon,
            marked_for_deletion: false,
        }
    }
}

/// Outcome of [`AppDirectory::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Records loaded
    pub records: usize,
    /// Trailing bytes that did not form a record
    pub unparsed_bytes: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.unparsed_bytes == 0
    }
}

/// The allow-list, held in memory and mirrored to a [`DirectoryStore`]
pub struct AppDirectory {
    store: Box<dyn DirectoryStore>,
    entries: Vec<AppDirectoryEntry>,
}

impl AppDirectory {
    /// Create an empty directory over `store` without reading it
    pub fn new(store: impl DirectoryStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            entries: Vec::new(),
        }
    }

    /// Create a directory and load whatever `store` already holds
    pub fn open(store: impl DirectoryStore + 'static) -> Result<Self> {
        let mut directory = Self::new(store);
        directory.load()?;
        Ok(directory)
    }

    /// Replace the in-memory entries with the persisted ones
    ///
    /// Parsing stops at the first record that does not parse; whatever
    /// follows is reported and ignored.
    pub fn load(&mut self) -> Result<LoadReport> {
        let data = self.store.read_all()?;
        let decoded = decode_records(&data);

        let report = LoadReport {
            records: decoded.entries.len(),
            unparsed_bytes: data.len() - decoded.consumed,
        };

        if let Some(reason) = decoded.stopped_by {
            warn!(
                records = report.records,
                unparsed_bytes = report.unparsed_bytes,
                "App directory is corrupt past the last good record: {}",
                reason
            );
        } else {
            debug!(records = report.records, "Loaded app directory");
        }

        self.entries = decoded.entries;
        Ok(report)
    }

    /// First entry with `key`
    pub fn lookup(&self, key: &str) -> Option<&AppDirectoryEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Whether notifications of `key` should be mirrored; unknown apps are not
    pub fn is_allowed(&self, key: &str) -> bool {
        self.lookup(key).map(|e| e.allowed).unwrap_or(false)
    }

    /// Add an entry, appending its record to the store
    ///
    /// The in-memory list only changes once the store accepted the record.
    pub fn upsert(&mut self, entry: AppDirectoryEntry) -> Result<()> {
        let mut bytes = Vec::new();
        encode_record(&entry, &mut bytes);
        self.store.append(&bytes)?;

        debug!(key = %entry.key, allowed = entry.allowed, "Added app directory entry");
        self.entries.push(entry);
        Ok(())
    }

    /// Rewrite the store from `entries`, dropping those marked for deletion
    pub fn save(&mut self, entries: Vec<AppDirectoryEntry>) -> Result<()> {
        let kept: Vec<AppDirectoryEntry> = entries
            .into_iter()
            .filter(|e| !e.marked_for_deletion)
            .collect();

        let mut bytes = Vec::new();
        for entry in &kept {
            encode_record(entry, &mut bytes);
        }
        self.store.replace(&bytes)?;

        debug!(records = kept.len(), "Saved app directory");
        self.entries = kept;
        Ok(())
    }

    pub fn entries(&self) -> &[AppDirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for AppDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppDirectory")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use toastlink_utils::ToastlinkError;

    /// Store whose writes always fail
    struct ReadOnlyStore;

    impl DirectoryStore for ReadOnlyStore {
        fn read_all(&self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn append(&self, _bytes: &[u8]) -> Result<()> {
            Err(ToastlinkError::directory("read-only"))
        }

        fn replace(&self, _bytes: &[u8]) -> Result<()> {
            Err(ToastlinkError::directory("read-only"))
        }
    }

    // ==================== Load / Lookup ====================

    #[test]
    fn test_upsert_then_load() {
        let store = MemoryStore::new();
        let mut directory = AppDirectory::new(store.clone());

        directory
            .upsert(AppDirectoryEntry::new("Mail", "Mail", vec![1, 2, 3]))
            .unwrap();

        let mut reopened = AppDirectory::new(store);
        let report = reopened.load().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.records, 1);

        let entry = reopened.lookup("Mail").unwrap();
        assert_eq!(entry.key, "Mail");
        assert!(entry.allowed);
        assert_eq!(entry.icon, vec![1, 2, 3]);
    }

    #[test]
    fn test_lookup_returns_first_match() {
        let store = MemoryStore::new();
        let mut directory = AppDirectory::new(store);

        directory
            .upsert(AppDirectoryEntry::new("Chat", "first", Vec::new()))
            .unwrap();
        directory
            .upsert(AppDirectoryEntry::new("Chat", "second", Vec::new()))
            .unwrap();

        assert_eq!(directory.lookup("Chat").unwrap().display_name, "first");
        assert!(directory.lookup("Other").is_none());
    }

    #[test]
    fn test_is_allowed() {
        let mut directory = AppDirectory::new(MemoryStore::new());
        let mut blocked = AppDirectoryEntry::new("Games", "Games", Vec::new());
        blocked.allowed = false;

        directory
            .upsert(AppDirectoryEntry::new("Mail", "Mail", Vec::new()))
            .unwrap();
        directory.upsert(blocked).unwrap();

        assert!(directory.is_allowed("Mail"));
        assert!(!directory.is_allowed("Games"));
        assert!(!directory.is_allowed("Unknown"));
    }

    #[test]
    fn test_load_reports_trailing_garbage() {
        let mut data = Vec::new();
        encode_record(&AppDirectoryEntry::new("Mail", "Mail", vec![7]), &mut data);
        data.extend_from_slice(&[4, b'C', b'h']);

        let mut directory = AppDirectory::new(MemoryStore::with_data(data));
        let report = directory.load().unwrap();

        assert_eq!(report.records, 1);
        assert_eq!(report.unparsed_bytes, 3);
        assert!(!report.is_clean());
        assert!(directory.contains("Mail"));
    }

    #[test]
    fn test_open_file_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notificationApps");

        {
            let mut directory = AppDirectory::open(FileStore::new(&path)).unwrap();
            assert!(directory.is_empty());
            directory
                .upsert(AppDirectoryEntry::new("Chat", "Chat", vec![9, 9]))
                .unwrap();
        }

        let directory = AppDirectory::open(FileStore::new(&path)).unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.lookup("Chat").unwrap().icon, vec![9, 9]);
    }

    // ==================== Save ====================

    #[test]
    fn test_save_skips_marked_entries() {
        let store = MemoryStore::new();
        let mut directory = AppDirectory::new(store.clone());

        directory
            .upsert(AppDirectoryEntry::new("Mail", "Mail", Vec::new()))
            .unwrap();
        directory
            .upsert(AppDirectoryEntry::new("Chat", "Chat", Vec::new()))
            .unwrap();

        let mut edited = directory.entries().to_vec();
        edited[0].marked_for_deletion = true;
        edited[1].allowed = false;
        directory.save(edited).unwrap();

        assert_eq!(directory.len(), 1);
        assert!(!directory.is_allowed("Chat"));

        let reopened = AppDirectory::open(store).unwrap();
        assert!(!reopened.contains("Mail"));
        assert!(!reopened.lookup("Chat").unwrap().allowed);
        assert!(!reopened.lookup("Chat").unwrap().marked_for_deletion);
    }

    #[test]
    fn test_failed_upsert_leaves_memory_untouched() {
        let mut directory = AppDirectory::new(ReadOnlyStore);
        let result = directory.upsert(AppDirectoryEntry::new("Mail", "Mail", Vec::new()));

        assert!(matches!(result, Err(ToastlinkError::Directory(_))));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_failed_save_leaves_memory_untouched() {
        let mut directory = AppDirectory::new(ReadOnlyStore);
        let result = directory.save(vec![AppDirectoryEntry::new("Mail", "Mail", Vec::new())]);

        assert!(result.is_err());
        assert!(directory.is_empty());
    }
}
