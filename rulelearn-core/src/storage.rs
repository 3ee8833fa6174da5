use crate::cache::{AlignmentCacheKey, AlignmentCacheValue, AlignmentStage};
use crate::types::WordAlignment;
use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub type WordAlignmentCache = AlignmentCacheValue<Vec<WordAlignment>>;
pub type TreeAlignmentCache = AlignmentCacheValue<Vec<String>>;

/// Storage abstraction for caching aligner results
pub trait AlignmentStorage {
    fn get_word_alignments(&self, key: &AlignmentCacheKey) -> Result<Option<WordAlignmentCache>>;
    fn store_word_alignments(&self, key: &AlignmentCacheKey, value: &WordAlignmentCache) -> Result<()>;

    fn get_tree_alignments(&self, key: &AlignmentCacheKey) -> Result<Option<TreeAlignmentCache>>;
    fn store_tree_alignments(&self, key: &AlignmentCacheKey, value: &TreeAlignmentCache) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(cache_dir.join(AlignmentStage::Word.dir_name()))?;
        fs::create_dir_all(cache_dir.join(AlignmentStage::Tree.dir_name()))?;
        Ok(Self { cache_dir })
    }

    fn entry_path(&self, key: &AlignmentCacheKey) -> PathBuf {
        self.cache_dir
            .join(key.stage.dir_name())
            .join(format!("{}.json", key.to_cache_hash()))
    }

    fn read<T: DeserializeOwned>(&self, key: &AlignmentCacheKey) -> Result<Option<T>> {
        let path = self.entry_path(key);
        if path.exists() {
            let json_str = fs::read_to_string(&path)?;
            let value: T = serde_json::from_str(&json_str)
                .map_err(|e| anyhow!("Failed to deserialize cached {} alignments: {}", key.stage.dir_name(), e))?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn write<T: Serialize>(&self, key: &AlignmentCacheKey, value: &T) -> Result<()> {
        let json_str = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow!("Failed to serialize {} alignments: {}", key.stage.dir_name(), e))?;
        fs::write(self.entry_path(key), json_str)?;
        Ok(())
    }
}

impl AlignmentStorage for FileStorage {
    fn get_word_alignments(&self, key: &AlignmentCacheKey) -> Result<Option<WordAlignmentCache>> {
        self.read(key)
    }

    fn store_word_alignments(&self, key: &AlignmentCacheKey, value: &WordAlignmentCache) -> Result<()> {
        self.write(key, value)
    }

    fn get_tree_alignments(&self, key: &AlignmentCacheKey) -> Result<Option<TreeAlignmentCache>> {
        self.read(key)
    }

    fn store_tree_alignments(&self, key: &AlignmentCacheKey, value: &TreeAlignmentCache) -> Result<()> {
        self.write(key, value)
    }
}

/// Calculate hash for configuration data (for the cache key)
pub fn calculate_config_hash<T: Serialize>(config: &T) -> Result<String> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| anyhow!("Failed to serialize config for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate hash for aligner input (for the cache key)
pub fn calculate_input_hash<T: Serialize>(input: &T) -> Result<String> {
    let input_json = serde_json::to_string(input)
        .map_err(|e| anyhow!("Failed to serialize aligner input for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(input_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// No-op storage implementation that disables all caching
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl AlignmentStorage for NoOpStorage {
    fn get_word_alignments(&self, _key: &AlignmentCacheKey) -> Result<Option<WordAlignmentCache>> {
        Ok(None) // Always cache miss
    }

    fn store_word_alignments(&self, _key: &AlignmentCacheKey, _value: &WordAlignmentCache) -> Result<()> {
        Ok(())
    }

    fn get_tree_alignments(&self, _key: &AlignmentCacheKey) -> Result<Option<TreeAlignmentCache>> {
        Ok(None)
    }

    fn store_tree_alignments(&self, _key: &AlignmentCacheKey, _value: &TreeAlignmentCache) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(stage: AlignmentStage, input: &str) -> AlignmentCacheKey {
        AlignmentCacheKey::new(stage, input.to_string(), "cfg".to_string())
    }

    #[test]
    fn test_input_hash_consistency() {
        let corpus = vec![(vec![0u32, 1], vec![1u32, 0])];
        let hash1 = calculate_input_hash(&corpus).unwrap();
        let hash2 = calculate_input_hash(&corpus).unwrap();
        assert_eq!(hash1, hash2);

        let other = vec![(vec![0u32, 1], vec![0u32, 1])];
        assert_ne!(hash1, calculate_input_hash(&other).unwrap());
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();

        let word_key = key(AlignmentStage::Word, "abc");
        assert!(storage.get_word_alignments(&word_key).unwrap().is_none());

        let links = vec![WordAlignment::from([(0, vec![1]), (1, vec![0])])];
        storage
            .store_word_alignments(&word_key, &AlignmentCacheValue::new(links.clone(), 12))
            .unwrap();
        let cached = storage.get_word_alignments(&word_key).unwrap().unwrap();
        assert_eq!(cached.output, links);
        assert_eq!(cached.processing_time_ms, 12);

        let tree_key = key(AlignmentStage::Tree, "abc");
        assert!(storage.get_tree_alignments(&tree_key).unwrap().is_none());
        let lines = vec!["0 ( 3 ) 3 ( 0 )".to_string()];
        storage
            .store_tree_alignments(&tree_key, &AlignmentCacheValue::new(lines.clone(), 0))
            .unwrap();
        assert_eq!(storage.get_tree_alignments(&tree_key).unwrap().unwrap().output, lines);
    }

    #[test]
    fn test_noop_storage_always_misses() {
        let storage = NoOpStorage::new();
        let k = key(AlignmentStage::Word, "abc");
        storage
            .store_word_alignments(&k, &AlignmentCacheValue::new(vec![], 0))
            .unwrap();
        assert!(storage.get_word_alignments(&k).unwrap().is_none());
    }
}
