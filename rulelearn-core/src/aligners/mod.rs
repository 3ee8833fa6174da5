//! Aligner traits and backend enums
//!
//! Word aligners turn token-id sequences into leaf links. Tree aligners
//! turn the printed tree notation into the augmented notation that
//! [`Sentence::add_tree_alignment`] consumes. Both run over the whole
//! corpus in one call.
//!
//! [`Sentence::add_tree_alignment`]: crate::tree::Sentence::add_tree_alignment

use crate::config::{TreeAlignerBackend, TreeAlignerConfig, WordAlignerBackend, WordAlignerConfig};
use crate::error::AlignerError;
use crate::types::{TokenPair, WordAlignment};
use anyhow::{anyhow, Result};

pub mod builtin;
pub mod eflomal;
pub mod external;
pub mod fixed;

pub use builtin::BuiltinTreeAligner;
pub use eflomal::EflomalAligner;
pub use external::ExternalTreeAligner;
pub use fixed::FixedWordAligner;

/// Backend trait for word alignment
pub trait WordAligner: Send + Sync {
    /// One alignment per input pair, in order
    fn align(&self, corpus: &[TokenPair]) -> Result<Vec<WordAlignment>>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;

    /// Whether results may be reused from the alignment cache
    fn cacheable(&self) -> bool {
        true
    }
}

/// Backend trait for tree alignment
pub trait TreeAligner: Send + Sync {
    /// One output line per input line, in order
    fn align(&self, lines: &[String]) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

pub enum WordAlignerImpl {
    Eflomal(EflomalAligner),
    Fixed(FixedWordAligner),
}

impl WordAlignerImpl {
    pub fn from_config(config: &WordAlignerConfig) -> Result<Self> {
        Ok(match config.backend {
            WordAlignerBackend::Eflomal => Self::Eflomal(EflomalAligner::from_config(config)),
            WordAlignerBackend::Fixed => {
                let path = config
                    .alignments
                    .as_ref()
                    .ok_or_else(|| anyhow!("fixed word aligner needs an alignments file"))?;
                Self::Fixed(FixedWordAligner::from_file(path)?)
            }
        })
    }
}

impl WordAligner for WordAlignerImpl {
    fn align(&self, corpus: &[TokenPair]) -> Result<Vec<WordAlignment>> {
        match self {
            WordAlignerImpl::Eflomal(aligner) => aligner.align(corpus),
            WordAlignerImpl::Fixed(aligner) => aligner.align(corpus),
        }
    }

    fn name(&self) -> &str {
        match self {
            WordAlignerImpl::Eflomal(aligner) => aligner.name(),
            WordAlignerImpl::Fixed(aligner) => aligner.name(),
        }
    }

    fn cacheable(&self) -> bool {
        match self {
            WordAlignerImpl::Eflomal(aligner) => aligner.cacheable(),
            WordAlignerImpl::Fixed(aligner) => aligner.cacheable(),
        }
    }
}

pub enum TreeAlignerImpl {
    Builtin(BuiltinTreeAligner),
    External(ExternalTreeAligner),
}

impl TreeAlignerImpl {
    pub fn from_config(config: &TreeAlignerConfig) -> Result<Self> {
        Ok(match config.backend {
            TreeAlignerBackend::Builtin => {
                Self::Builtin(BuiltinTreeAligner::new().with_strict(config.strict))
            }
            TreeAlignerBackend::External => {
                let binary = config
                    .binary
                    .clone()
                    .ok_or_else(|| anyhow!("external tree aligner needs a binary path"))?;
                Self::External(ExternalTreeAligner::new(binary, config.args.clone()))
            }
        })
    }
}

impl TreeAligner for TreeAlignerImpl {
    fn align(&self, lines: &[String]) -> Result<Vec<String>> {
        match self {
            TreeAlignerImpl::Builtin(aligner) => aligner.align(lines),
            TreeAlignerImpl::External(aligner) => aligner.align(lines),
        }
    }

    fn name(&self) -> &str {
        match self {
            TreeAlignerImpl::Builtin(aligner) => aligner.name(),
            TreeAlignerImpl::External(aligner) => aligner.name(),
        }
    }
}

/// Parse one line of `i-j` links (0-based source and target positions).
pub fn parse_links(program: &str, line: &str) -> Result<WordAlignment, AlignerError> {
    let mut alignment = WordAlignment::new();
    for pair in line.split_whitespace() {
        let parsed = pair
            .split_once('-')
            .and_then(|(i, j)| Some((i.parse::<usize>().ok()?, j.parse::<usize>().ok()?)));
        let Some((i, j)) = parsed else {
            return Err(AlignerError::Unreadable {
                program: program.to_string(),
                reason: format!("bad link '{pair}'"),
            });
        };
        let targets = alignment.entry(i).or_default();
        if !targets.contains(&j) {
            targets.push(j);
        }
    }
    Ok(alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_links_accumulating_one_to_many() {
        let links = parse_links("test", "0-1 1-0 1-2 1-0").unwrap();
        assert_eq!(links, WordAlignment::from([(0, vec![1]), (1, vec![0, 2])]));
        assert!(parse_links("test", "  ").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_links() {
        assert!(matches!(
            parse_links("eflomal", "0-1 2:3"),
            Err(AlignerError::Unreadable { .. })
        ));
        assert!(parse_links("eflomal", "0-x").is_err());
    }

    #[test]
    fn backends_need_their_inputs() {
        let word = WordAlignerConfig {
            backend: WordAlignerBackend::Fixed,
            ..WordAlignerConfig::default()
        };
        assert!(WordAlignerImpl::from_config(&word).is_err());

        let tree = TreeAlignerConfig {
            backend: TreeAlignerBackend::External,
            ..TreeAlignerConfig::default()
        };
        assert!(TreeAlignerImpl::from_config(&tree).is_err());

        let builtin = TreeAlignerImpl::from_config(&TreeAlignerConfig::default()).unwrap();
        assert_eq!(builtin.name(), "builtin");
    }
}
