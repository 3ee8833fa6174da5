use super::{parse_links, WordAligner};
use crate::error::AlignmentError;
use crate::types::{TokenPair, WordAlignment};
use anyhow::{Context, Result};
use std::path::Path;

/// Replays alignments computed elsewhere, one entry per sentence.
#[derive(Debug, Clone, Default)]
pub struct FixedWordAligner {
    alignments: Vec<WordAlignment>,
}

impl FixedWordAligner {
    pub fn new(alignments: Vec<WordAlignment>) -> Self {
        Self { alignments }
    }

    /// Parse `i-j` link lines, one line per sentence.
    pub fn parse(text: &str) -> Result<Self> {
        let alignments = text
            .lines()
            .map(|line| parse_links("fixed", line))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(alignments))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading word alignments from {}", path.display()))?;
        Self::parse(&text)
    }
}

impl WordAligner for FixedWordAligner {
    fn align(&self, corpus: &[TokenPair]) -> Result<Vec<WordAlignment>> {
        if corpus.len() != self.alignments.len() {
            return Err(AlignmentError::SentenceCountMismatch {
                expected: corpus.len(),
                got: self.alignments.len(),
            }
            .into());
        }
        Ok(self.alignments.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }

    // the links file can change under an unchanged config
    fn cacheable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_parsed_lines() {
        let aligner = FixedWordAligner::parse("0-1 1-0\n\n0-0\n").unwrap();
        let corpus = vec![(vec![0, 1], vec![0, 1]), (vec![2], vec![3]), (vec![4], vec![5])];
        let links = aligner.align(&corpus).unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(links[0], WordAlignment::from([(0, vec![1]), (1, vec![0])]));
        assert!(links[1].is_empty());
    }

    #[test]
    fn count_mismatch_is_fatal() {
        let aligner = FixedWordAligner::parse("0-0").unwrap();
        let err = aligner.align(&[]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AlignmentError>(),
            Some(&AlignmentError::SentenceCountMismatch { expected: 0, got: 1 })
        );
    }
}
