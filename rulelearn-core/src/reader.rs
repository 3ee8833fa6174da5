//! Corpus input
//!
//! Either two parallel files holding one tree per line, or a single file
//! with both sides on each line split by the configured separator.

use crate::config::CorpusConfig;
use crate::error::TreeParseError;
use crate::tree::Lu;
use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use tracing::debug;

pub type TreePair = (Lu, Lu);

#[derive(Debug, Clone)]
pub struct CorpusReader {
    separator: String,
    root_lemma: String,
    root_tag: String,
}

impl Default for CorpusReader {
    fn default() -> Self {
        Self::from_config(&CorpusConfig::default())
    }
}

impl CorpusReader {
    pub fn from_config(config: &CorpusConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            root_lemma: config.root_lemma.clone(),
            root_tag: config.root_tag.clone(),
        }
    }

    /// Parse one side of one sentence. A line that is not a single
    /// phrase is wrapped in a root unit.
    pub fn parse_line(&self, line: &str) -> Result<Lu, TreeParseError> {
        let mut units = Lu::parse_sequence(line)?;
        if units.len() == 1 && !units[0].is_leaf() {
            return Ok(units.remove(0));
        }
        Ok(Lu::new(&self.root_lemma, &[self.root_tag.as_str()], units))
    }

    pub fn read_parallel(&self, source: &Path, target: &Path) -> Result<Vec<TreePair>> {
        let sl = std::fs::read_to_string(source)
            .with_context(|| format!("reading {}", source.display()))?;
        let tl = std::fs::read_to_string(target)
            .with_context(|| format!("reading {}", target.display()))?;
        self.parse_parallel(&sl, &tl)
    }

    pub fn parse_parallel(&self, sl: &str, tl: &str) -> Result<Vec<TreePair>> {
        let sl: Vec<&str> = sl.lines().collect();
        let tl: Vec<&str> = tl.lines().collect();
        if sl.len() != tl.len() {
            bail!("source has {} lines but target has {}", sl.len(), tl.len());
        }
        self.parse_pairs(sl.into_iter().zip(tl))
    }

    pub fn read_bilingual(&self, path: &Path) -> Result<Vec<TreePair>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        self.parse_bilingual(&text)
    }

    pub fn parse_bilingual(&self, text: &str) -> Result<Vec<TreePair>> {
        let mut halves = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                halves.push(("", ""));
                continue;
            }
            let (sl, tl) = line.split_once(self.separator.as_str()).ok_or_else(|| {
                anyhow!("line {}: no '{}' separator", i + 1, self.separator)
            })?;
            halves.push((sl, tl));
        }
        self.parse_pairs(halves)
    }

    fn parse_pairs<'a>(
        &self,
        lines: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Vec<TreePair>> {
        let mut pairs = Vec::new();
        for (i, (sl, tl)) in lines.into_iter().enumerate() {
            let line_no = i + 1;
            match (sl.trim().is_empty(), tl.trim().is_empty()) {
                (true, true) => {
                    debug!(line = line_no, "skipping blank line");
                    continue;
                }
                (false, false) => {}
                _ => bail!("line {line_no}: one side is blank"),
            }
            let sl = self
                .parse_line(sl)
                .with_context(|| format!("line {line_no}: source tree"))?;
            let tl = self
                .parse_line(tl)
                .with_context(|| format!("line {line_no}: target tree"))?;
            pairs.push((sl, tl));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_phrase_is_kept() {
        let lu = CorpusReader::default()
            .parse_line("^x<NP>{^a<adj>$ ^b<n>$}$")
            .unwrap();
        assert_eq!(lu.lemma, "x");
        assert_eq!(lu.children.len(), 2);
    }

    #[test]
    fn several_units_are_wrapped() {
        let lu = CorpusReader::default()
            .parse_line("^a<det>$ ^b<n>$")
            .unwrap();
        assert_eq!(lu.lemma, "root");
        assert_eq!(lu.tags, vec!["S"]);
        assert_eq!(lu.children.len(), 2);
    }

    #[test]
    fn single_leaf_is_wrapped() {
        let lu = CorpusReader::default().parse_line("^a<n>$").unwrap();
        assert_eq!(lu.lemma, "root");
        assert_eq!(lu.children, vec![Lu::new("a", &["n"], vec![])]);
    }

    #[test]
    fn bilingual_lines_split_on_separator() {
        let text = "^a<n>$ ^b<adj>$ ||| ^c<adj>$ ^d<n>$\n\n^e<v>$|||^f<v>$\n";
        let pairs = CorpusReader::default().parse_bilingual(text).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1.children[1].lemma, "d");
        assert_eq!(pairs[1].0.children[0].lemma, "e");
    }

    #[test]
    fn missing_separator_names_the_line() {
        let err = CorpusReader::default()
            .parse_bilingual("^a<n>$ ||| ^b<n>$\n^c<n>$\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn parallel_sides_must_agree() {
        let reader = CorpusReader::default();
        assert!(reader.parse_parallel("^a<n>$\n^b<n>$\n", "^c<n>$\n").is_err());
        assert!(reader.parse_parallel("^a<n>$\n\n", "^c<n>$\n^d<n>$\n").is_err());
        let pairs = reader
            .parse_parallel("^a<n>$\n\n^b<n>$\n", "^c<n>$\n\n^d<n>$\n")
            .unwrap();
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn parse_errors_carry_context() {
        let err = CorpusReader::default()
            .parse_parallel("^a<n>$\n^b<n\n", "^c<n>$\n^d<n>$\n")
            .unwrap_err();
        assert_eq!(err.to_string(), "line 2: source tree");
    }

    #[test]
    fn reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let sl = dir.path().join("corpus.sl");
        let tl = dir.path().join("corpus.tl");
        std::fs::write(&sl, "^a<det>$ ^b<n>$\n").unwrap();
        std::fs::write(&tl, "^c<n>$ ^d<det>$\n").unwrap();
        let pairs = CorpusReader::default().read_parallel(&sl, &tl).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(CorpusReader::default()
            .read_bilingual(&dir.path().join("missing.txt"))
            .is_err());
    }
}
