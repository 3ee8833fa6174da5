use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version constants for cache invalidation
pub mod versions {
    pub const RULELEARN_VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PROCESSING_VERSION: &str = "1.0.0";
}

/// Which aligner produced a cached result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStage {
    Word,
    Tree,
}

impl AlignmentStage {
    pub fn dir_name(self) -> &'static str {
        match self {
            AlignmentStage::Word => "word",
            AlignmentStage::Tree => "tree",
        }
    }
}

/// Cache key: aligner input + aligner config → aligner output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AlignmentCacheKey {
    pub stage: AlignmentStage,
    pub input_hash: String,
    pub config_hash: String,
    pub processing_version: String,
}

impl AlignmentCacheKey {
    pub fn new(stage: AlignmentStage, input_hash: String, config_hash: String) -> Self {
        Self {
            stage,
            input_hash,
            config_hash,
            processing_version: versions::PROCESSING_VERSION.to_string(),
        }
    }

    /// Compute cache key hash for storage
    pub fn to_cache_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.stage.dir_name());
        hasher.update(&self.input_hash);
        hasher.update(&self.config_hash);
        hasher.update(&self.processing_version);
        format!("{:x}", hasher.finalize())
    }
}

/// Cached aligner output with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentCacheValue<T> {
    pub output: T,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub cache_version: String,
}

impl<T> AlignmentCacheValue<T> {
    pub fn new(output: T, processing_time_ms: u64) -> Self {
        Self {
            output,
            created_at: Utc::now(),
            processing_time_ms,
            cache_version: versions::RULELEARN_VERSION.to_string(),
        }
    }
}
