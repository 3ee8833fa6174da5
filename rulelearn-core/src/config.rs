use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    "|||".to_string()
}

fn default_root_tag() -> String {
    "S".to_string()
}

fn default_root_lemma() -> String {
    "root".to_string()
}

fn default_eflomal_binary() -> PathBuf {
    PathBuf::from("eflomal")
}

fn default_model() -> u32 {
    3
}

fn default_null_prior() -> f64 {
    0.2
}

fn default_cache_dir() -> String {
    ".rulelearn_cache".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerConfig {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub word_aligner: WordAlignerConfig,
    #[serde(default)]
    pub tree_aligner: TreeAlignerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Splits source from target in single-file bilingual corpora
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Tag of the node wrapping lines with several top-level units
    #[serde(default = "default_root_tag")]
    pub root_tag: String,
    #[serde(default = "default_root_lemma")]
    pub root_lemma: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            root_tag: default_root_tag(),
            root_lemma: default_root_lemma(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordAlignerBackend {
    #[default]
    Eflomal,
    /// Precomputed `i-j` links read from `alignments`
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordAlignerConfig {
    #[serde(default)]
    pub backend: WordAlignerBackend,
    #[serde(default = "default_eflomal_binary")]
    pub binary: PathBuf,
    /// eflomal model: 1 IBM1, 2 +HMM, 3 +fertility
    #[serde(default = "default_model")]
    pub model: u32,
    #[serde(default = "default_null_prior")]
    pub null_prior: f64,
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// One line of `i-j` links per sentence, for the fixed backend
    #[serde(default)]
    pub alignments: Option<PathBuf>,
}

impl Default for WordAlignerConfig {
    fn default() -> Self {
        Self {
            backend: WordAlignerBackend::default(),
            binary: default_eflomal_binary(),
            model: default_model(),
            null_prior: default_null_prior(),
            extra_args: Vec::new(),
            alignments: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeAlignerBackend {
    #[default]
    Builtin,
    External,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeAlignerConfig {
    #[serde(default)]
    pub backend: TreeAlignerBackend,
    /// Executable for the external backend
    #[serde(default)]
    pub binary: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Builtin backend: fail when an internal node cannot be aligned
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Keep rules that only exist thanks to a virtual grouping
    #[serde(default = "default_true")]
    pub include_virtual: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            include_virtual: true,
        }
    }
}

/// What to do with rules that share a pattern but disagree on the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    #[default]
    KeepAll,
    /// Highest weight per pattern, earliest rule on ties
    Majority,
    DropConflicting,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keep_all" | "keep-all" => Ok(Self::KeepAll),
            "majority" => Ok(Self::Majority),
            "drop_conflicting" | "drop-conflicting" => Ok(Self::DropConflicting),
            other => Err(anyhow::anyhow!("unknown conflict policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write `weight:` before each pattern
    #[serde(default)]
    pub write_weights: bool,
    #[serde(default)]
    pub min_weight: u32,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

impl LearnerConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LearnerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {p}: {e}");
                eprintln!("⚠️  Failed to load config from {}, using defaults", p);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config: LearnerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.corpus.separator, "|||");
        assert_eq!(config.corpus.root_tag, "S");
        assert_eq!(config.word_aligner.backend, WordAlignerBackend::Eflomal);
        assert_eq!(config.word_aligner.model, 3);
        assert_eq!(config.tree_aligner.backend, TreeAlignerBackend::Builtin);
        assert!(config.extraction.include_virtual);
        assert!(!config.output.write_weights);
        assert_eq!(config.output.conflict_policy, ConflictPolicy::KeepAll);
        assert!(config.cache.enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "
word_aligner:
  backend: fixed
  alignments: links.txt
output:
  conflict_policy: drop_conflicting
  min_weight: 2
";
        let config: LearnerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.word_aligner.backend, WordAlignerBackend::Fixed);
        assert_eq!(config.word_aligner.alignments, Some(PathBuf::from("links.txt")));
        assert_eq!(config.word_aligner.null_prior, 0.2);
        assert_eq!(config.output.conflict_policy, ConflictPolicy::DropConflicting);
        assert_eq!(config.output.min_weight, 2);
        assert_eq!(config.corpus.separator, "|||");
    }

    #[test]
    fn yaml_round_trip() {
        let config = LearnerConfig::default();
        let yaml = config.to_yaml().unwrap();
        let back: LearnerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.cache.dir, config.cache.dir);
        assert_eq!(back.output.conflict_policy, config.output.conflict_policy);
    }

    #[test]
    fn missing_file_falls_back() {
        let config = LearnerConfig::load_with_fallback(Some("/nonexistent/rulelearn.yaml"));
        assert_eq!(config.corpus.root_lemma, "root");
    }

    #[test]
    fn conflict_policy_from_str() {
        assert_eq!("majority".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Majority);
        assert_eq!(
            "drop-conflicting".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::DropConflicting
        );
        assert!("vote".parse::<ConflictPolicy>().is_err());
    }
}
