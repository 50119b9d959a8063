//! Metadata store aligned with the vector index.
//!
//! Position `i` holds the display fields for row `i` of the index. The store is
//! built in the same pass as the index (see [`crate::index::LoadedIndex`]) and is
//! read-only afterwards. It is persisted as a JSON sidecar: an ordered array of
//! `{id, title, abstract}` objects.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

use crate::index::persist::StagedFile;
use crate::models::MetadataRecord;

/// Errors that can occur when reading the metadata store.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Lookup past the end of the store
    #[error("metadata row {index} out of range (store has {len} rows)")]
    OutOfRange { index: usize, len: usize },

    /// Sidecar file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar file is not a valid record list
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Ordered, read-only sequence of metadata records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: Vec<MetadataRecord>,
}

impl MetadataStore {
    pub fn new(records: Vec<MetadataRecord>) -> Self {
        Self { records }
    }

    /// Record at row `index`.
    ///
    /// # Errors
    /// Returns `MetadataError::OutOfRange` if `index` is not a valid row.
    pub fn get(&self, index: usize) -> MetadataResult<&MetadataRecord> {
        self.records.get(index).ok_or(MetadataError::OutOfRange {
            index,
            len: self.records.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.iter()
    }

    /// Vectorizer input for every row, in row order.
    pub fn documents(&self) -> Vec<String> {
        self.records.iter().map(MetadataRecord::document_text).collect()
    }

    /// xxh3 digest of every record in row order.
    ///
    /// The index file carries the fingerprint of the store it was built with,
    /// so a sidecar from another snapshot is detected on load.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for record in &self.records {
            hasher.update(&record.id.to_le_bytes());
            hasher.update(record.title.as_bytes());
            hasher.update(&[0]);
            if let Some(abstract_text) = &record.abstract_text {
                hasher.update(&[1]);
                hasher.update(abstract_text.as_bytes());
            }
            hasher.update(&[0]);
        }
        hasher.digest()
    }

    /// Write the store as a JSON array to a staged file for `path`.
    pub(crate) fn stage(&self, path: &Path) -> MetadataResult<StagedFile> {
        let staged = StagedFile::write(path, |writer| {
            serde_json::to_writer(writer, &self.records).map_err(std::io::Error::from)
        })?;
        Ok(staged)
    }

    /// Read a store previously written by [`stage`](Self::stage).
    pub fn load(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let records: Vec<MetadataRecord> = serde_json::from_reader(reader)?;
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, title: &str) -> MetadataRecord {
        MetadataRecord {
            id,
            title: title.to_string(),
            abstract_text: Some(format!("abstract of {}", title)),
        }
    }

    #[test]
    fn test_get_in_and_out_of_range() {
        let store = MetadataStore::new(vec![record(1, "A"), record(2, "B")]);
        assert_eq!(store.get(1).unwrap().id, 2);
        match store.get(2) {
            Err(MetadataError::OutOfRange { index, len }) => {
                assert_eq!(index, 2);
                assert_eq!(len, 2);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_documents_follow_row_order() {
        let store = MetadataStore::new(vec![record(5, "First"), record(3, "Second")]);
        assert_eq!(
            store.documents(),
            vec!["First abstract of First", "Second abstract of Second"]
        );
    }

    #[test]
    fn test_sidecar_round_trip_keeps_order_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let store = MetadataStore::new(vec![
            record(9, "Z"),
            MetadataRecord {
                id: 4,
                title: "No abstract".to_string(),
                abstract_text: None,
            },
        ]);
        store.stage(&path).unwrap().commit().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"abstract\""));

        let loaded = MetadataStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_fingerprint_tracks_ids_and_content() {
        let store = MetadataStore::new(vec![record(1, "A"), record(2, "B")]);
        assert_eq!(
            store.fingerprint(),
            MetadataStore::new(vec![record(1, "A"), record(2, "B")]).fingerprint()
        );
        assert_ne!(
            store.fingerprint(),
            MetadataStore::new(vec![record(3, "A"), record(4, "B")]).fingerprint()
        );
        assert_ne!(
            store.fingerprint(),
            MetadataStore::new(vec![record(2, "B"), record(1, "A")]).fingerprint()
        );

        let mut edited = vec![record(1, "A"), record(2, "B")];
        edited[1].abstract_text = None;
        assert_ne!(store.fingerprint(), MetadataStore::new(edited).fingerprint());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MetadataStore::load(dir.path().join("missing.json")),
            Err(MetadataError::Io(_))
        ));
    }
}
