use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::key::BlockKey;
use crate::core::record::Record;
use crate::utils::validation::is_valid_sha256;

use super::{Storage, StorageError};

/// File extension for key files
pub const DEFAULT_EXTENSION: &str = "jsonl";

/// JSONL files sharded by the sha-256 digest of each key.
///
/// `put` reads the key's file, appends, and rewrites the whole file; `put_all`
/// replaces it outright. Replacement goes through a temporary file in the same
/// directory followed by a rename.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
    extension: String,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hex sha-256 of the key's canonical form
    #[must_use]
    pub fn digest(key: &BlockKey) -> String {
        hex::encode(Sha256::digest(key.canonical().as_bytes()))
    }

    /// `<root>/<digest[0..2]>/<digest[2..4]>/<digest>.<extension>`
    #[must_use]
    pub fn path_for(&self, key: &BlockKey) -> PathBuf {
        let digest = Self::digest(key);
        self.root
            .join(&digest[..2])
            .join(&digest[2..4])
            .join(format!("{digest}.{}", self.extension))
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<Record>>, StorageError> {
        if !path.exists() {
            return Ok(None);
        }

        // Lines are parsed as bytes so invalid UTF-8 surfaces as a parse error
        let mut reader = BufReader::new(fs::File::open(path)?);
        let mut records = Vec::new();
        let mut buf = Vec::new();
        let mut line = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line += 1;
            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record = serde_json::from_slice(&buf).map_err(|source| {
                warn!("Unreadable record at {}:{}", path.display(), line);
                StorageError::Deserialization {
                    path: path.to_path_buf(),
                    line,
                    source,
                }
            })?;
            records.push(record);
        }
        Ok(Some(records))
    }

    fn write(&self, path: &Path, values: &[Record]) -> Result<(), StorageError> {
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(&mut tmp);
            for value in values {
                serde_json::to_writer(&mut writer, value)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| StorageError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    fn is_key_file(&self, path: &Path) -> bool {
        path.is_file()
            && path.extension().is_some_and(|ext| ext == self.extension.as_str())
            && path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(is_valid_sha256)
    }
}

fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

impl Storage for DiskStorage {
    fn contains(&self, key: &BlockKey) -> bool {
        self.path_for(key).exists()
    }

    fn len(&self) -> Result<usize, StorageError> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for first in subdirectories(&self.root)? {
            for second in subdirectories(&first)? {
                for entry in fs::read_dir(&second)? {
                    if self.is_key_file(&entry?.path()) {
                        count += 1;
                    }
                }
            }
        }
        Ok(count)
    }

    fn get(&mut self, key: &BlockKey) -> Result<Option<Vec<Record>>, StorageError> {
        self.read(&self.path_for(key))
    }

    fn put(&mut self, key: &BlockKey, value: Record) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let mut values = self.read(&path)?.unwrap_or_default();
        values.push(value);
        debug!(key = %key, records = values.len(), "rewriting key file");
        self.write(&path, &values)
    }

    fn put_all(&mut self, key: &BlockKey, values: Vec<Record>) -> Result<(), StorageError> {
        debug!(key = %key, records = values.len(), "replacing key file");
        self.write(&self.path_for(key), &values)
    }

    fn open(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::from_value;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: serde_json::Value) -> Record {
        from_value(value).unwrap()
    }

    #[test]
    fn test_digest_of_canonical_form() {
        assert_eq!(
            DiskStorage::digest(&BlockKey::custom("key1")),
            "68afe9671f659b10d58e9fdc132542dc07553a29a421c5ae9b4defbebe1f6244"
        );
        assert_eq!(
            DiskStorage::digest(&BlockKey::Unblocked),
            "74234e98afe7498fb5daf1f36ac2d78acc339464f950703b8c019892f982b90b"
        );
    }

    #[test]
    fn test_path_layout() {
        let storage = DiskStorage::new("/data");
        let path = storage.path_for(&BlockKey::custom("key1"));
        assert_eq!(
            path,
            PathBuf::from(
                "/data/68/af/68afe9671f659b10d58e9fdc132542dc07553a29a421c5ae9b4defbebe1f6244.jsonl"
            )
        );
    }

    #[test]
    fn test_custom_extension() {
        let storage = DiskStorage::new("/data").with_extension("ndjson");
        let path = storage.path_for(&BlockKey::custom("key1"));
        assert_eq!(path.extension().unwrap(), "ndjson");
    }

    #[test]
    fn test_put_get() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let key = BlockKey::custom("key1");
        storage.put(&key, record(json!({"x": 1}))).unwrap();
        assert_eq!(storage.get(&key).unwrap(), Some(vec![record(json!({"x": 1}))]));
    }

    #[test]
    fn test_put_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let key = BlockKey::custom("key1");
        storage.put(&key, record(json!({"x": 1}))).unwrap();
        storage.put(&key, record(json!({"x": 2}))).unwrap();
        storage.put(&key, record(json!({"x": 1}))).unwrap();
        assert_eq!(
            storage.get(&key).unwrap(),
            Some(vec![
                record(json!({"x": 1})),
                record(json!({"x": 2})),
                record(json!({"x": 1}))
            ])
        );

        let content = fs::read_to_string(storage.path_for(&key)).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_get_unknown_key() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        assert!(storage.get(&BlockKey::custom("nope")).unwrap().is_none());
        assert!(!storage.contains(&BlockKey::custom("nope")));
    }

    #[test]
    fn test_contains_and_len() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        storage.put(&BlockKey::custom("key1"), record(json!({"x": 1}))).unwrap();
        storage.put(&BlockKey::custom("key2"), record(json!({"y": 2}))).unwrap();
        storage.put(&BlockKey::custom("key2"), record(json!({"y": 3}))).unwrap();
        assert!(storage.contains(&BlockKey::custom("key1")));
        assert_eq!(storage.len().unwrap(), 2);
    }

    #[test]
    fn test_len_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let key = BlockKey::custom("key1");
        storage.put(&key, record(json!({"x": 1}))).unwrap();
        let shard = storage.path_for(&key).parent().unwrap().to_path_buf();
        fs::write(shard.join("notes.jsonl"), "{}\n").unwrap();
        fs::write(shard.join("backup.bak"), "{}\n").unwrap();
        assert_eq!(storage.len().unwrap(), 1);
    }

    #[test]
    fn test_len_of_missing_root() {
        let dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(dir.path().join("not-yet"));
        assert_eq!(storage.len().unwrap(), 0);
    }

    #[test]
    fn test_open_creates_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("root");
        let mut storage = DiskStorage::new(&root);
        storage.open().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_put_all_replaces() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let key = BlockKey::custom("key1");
        storage.put(&key, record(json!({"x": 1}))).unwrap();
        storage
            .put_all(&key, vec![record(json!({"x": 7})), record(json!({"x": 8}))])
            .unwrap();
        assert_eq!(
            storage.get(&key).unwrap(),
            Some(vec![record(json!({"x": 7})), record(json!({"x": 8}))])
        );
        assert_eq!(storage.len().unwrap(), 1);
    }

    #[test]
    fn test_distinct_keys_never_share_a_file() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let keys: Vec<BlockKey> = (0..200).map(|i| BlockKey::custom(format!("k{i}"))).collect();
        for (i, key) in keys.iter().enumerate() {
            storage.put(key, record(json!({"i": i}))).unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(storage.get(key).unwrap(), Some(vec![record(json!({"i": i}))]));
        }
        assert_eq!(storage.len().unwrap(), 200);
    }

    #[test]
    fn test_corrupt_file_only_fails_its_key() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let good = BlockKey::custom("good");
        let bad = BlockKey::custom("bad");
        storage.put(&good, record(json!({"x": 1}))).unwrap();
        storage.put(&bad, record(json!({"x": 2}))).unwrap();
        fs::write(storage.path_for(&bad), "{\"x\": 2}\nnot json\n").unwrap();

        match storage.get(&bad) {
            Err(StorageError::Deserialization { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected deserialization error, got {other:?}"),
        }
        assert_eq!(storage.get(&good).unwrap(), Some(vec![record(json!({"x": 1}))]));
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let good = BlockKey::custom("good");
        let bad = BlockKey::custom("bad");
        storage.put(&good, record(json!({"x": 1}))).unwrap();
        storage.put(&bad, record(json!({"x": 1}))).unwrap();
        fs::write(storage.path_for(&bad), b"{\"x\": 1}\n{\"x\": \"\xff\"}\n").unwrap();

        match storage.get(&bad) {
            Err(StorageError::Deserialization { path, line, .. }) => {
                assert_eq!(path, storage.path_for(&bad));
                assert_eq!(line, 2);
            }
            other => panic!("expected deserialization error, got {other:?}"),
        }
        assert_eq!(storage.get(&good).unwrap(), Some(vec![record(json!({"x": 1}))]));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let key = BlockKey::custom("key1");
        storage.put(&key, record(json!({"x": 1}))).unwrap();
        fs::write(storage.path_for(&key), "{\"x\": 1}\n\n  \n{\"x\": 2}").unwrap();
        assert_eq!(
            storage.get(&key).unwrap(),
            Some(vec![record(json!({"x": 1})), record(json!({"x": 2}))])
        );
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let key = BlockKey::field("letter", &json!("a"));
        {
            let mut storage = DiskStorage::new(dir.path());
            storage.put(&key, record(json!({"name": "alpha"}))).unwrap();
            storage.close().unwrap();
        }
        let mut reopened = DiskStorage::new(dir.path());
        assert_eq!(
            reopened.get(&key).unwrap(),
            Some(vec![record(json!({"name": "alpha"}))])
        );
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let mut storage = DiskStorage::new(dir.path());
        let key = BlockKey::custom("key1");
        storage.put(&key, record(json!({"x": 1}))).unwrap();
        let shard = storage.path_for(&key).parent().unwrap().to_path_buf();
        assert_eq!(fs::read_dir(shard).unwrap().count(), 1);
    }
}
