// Rulelearn Core Library
//
// Learns structural transfer rules from a parallel treebank.
// Main interface for turning aligned tree pairs into a rule file.

pub mod aligners;
pub mod alignment;
pub mod cache;
pub mod config;
pub mod error;
pub mod processor;
pub mod reader;
pub mod rules;
pub mod storage;
pub mod tree;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use aligners::{TreeAligner, WordAligner};
pub use config::LearnerConfig;
pub use error::{AlignerError, AlignmentError, TreeParseError};
pub use processor::{CorpusProcessor, PipelineStages};
pub use reader::CorpusReader;
pub use rules::{Corpus, Rule, RuleRegistry, RuleReport, RuleWriter};
pub use tree::{Lu, Sentence};
