//! eflomal word aligner backend
//!
//! Writes both sides in eflomal's plain-text corpus format to temporary
//! files, runs the binary and reads back the forward links.

use super::{parse_links, WordAligner};
use crate::config::WordAlignerConfig;
use crate::error::{AlignerError, AlignmentError};
use crate::types::{TokenPair, WordAlignment};
use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Sentences at least this long are written as empty.
const MAX_SENTENCE_LEN: usize = 0x400;

pub struct EflomalAligner {
    binary: PathBuf,
    model: u32,
    null_prior: f64,
    extra_args: Vec<String>,
}

impl EflomalAligner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::from_config(&WordAlignerConfig {
            binary: binary.into(),
            ..WordAlignerConfig::default()
        })
    }

    pub fn from_config(config: &WordAlignerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            model: config.model,
            null_prior: config.null_prior,
            extra_args: config.extra_args.clone(),
        }
    }

    /// Sampling schedule scaled to corpus size.
    pub fn iteration_args(n_sentences: usize) -> Vec<String> {
        let iters = ((5000.0 / (n_sentences.max(1) as f64).sqrt()).round() as usize).max(2);
        let iters4 = (iters / 4).max(1);
        vec![
            "-1".to_string(),
            iters4.max(2).to_string(),
            "-2".to_string(),
            iters4.to_string(),
            "-3".to_string(),
            iters.to_string(),
        ]
    }

    fn arguments(&self, n_sentences: usize) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.model.to_string(),
            "-n".to_string(),
            "1".to_string(),
            "-N".to_string(),
            self.null_prior.to_string(),
        ];
        args.extend(Self::iteration_args(n_sentences));
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }
}

/// `<n_sents> <vocab_size>` header, then `<len> id id ...` per sentence.
pub fn write_text<W: Write>(out: &mut W, sentences: &[&[u32]]) -> io::Result<()> {
    let vocab_size = sentences
        .iter()
        .flat_map(|s| s.iter())
        .max()
        .map_or(0, |&max| max as usize + 1);
    writeln!(out, "{} {}", sentences.len(), vocab_size)?;
    for sentence in sentences {
        if sentence.len() >= MAX_SENTENCE_LEN {
            writeln!(out, "0")?;
            continue;
        }
        write!(out, "{}", sentence.len())?;
        for id in sentence.iter() {
            write!(out, " {id}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

impl WordAligner for EflomalAligner {
    fn align(&self, corpus: &[TokenPair]) -> Result<Vec<WordAlignment>> {
        if corpus.is_empty() {
            return Ok(Vec::new());
        }

        let sl: Vec<&[u32]> = corpus.iter().map(|(s, _)| s.as_slice()).collect();
        let tl: Vec<&[u32]> = corpus.iter().map(|(_, t)| t.as_slice()).collect();

        let mut sl_file = NamedTempFile::new()?;
        write_text(&mut sl_file, &sl)?;
        sl_file.flush()?;
        let mut tl_file = NamedTempFile::new()?;
        write_text(&mut tl_file, &tl)?;
        tl_file.flush()?;
        let links_file = NamedTempFile::new()?;

        let args = self.arguments(corpus.len());
        info!(sentences = corpus.len(), "running eflomal");
        debug!(?args, "eflomal arguments");

        let output = Command::new(&self.binary)
            .arg("-s")
            .arg(sl_file.path())
            .arg("-t")
            .arg(tl_file.path())
            .arg("-f")
            .arg(links_file.path())
            .arg("-q")
            .args(&args)
            .output()
            .map_err(|source| AlignerError::Spawn {
                program: self.program(),
                source,
            })?;
        if !output.status.success() {
            return Err(AlignerError::ExitStatus {
                program: self.program(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let text = std::fs::read_to_string(links_file.path()).map_err(|e| AlignerError::Unreadable {
            program: self.program(),
            reason: e.to_string(),
        })?;
        let alignments = text
            .lines()
            .map(|line| parse_links(&self.program(), line))
            .collect::<Result<Vec<_>, _>>()?;
        if alignments.len() != corpus.len() {
            return Err(AlignmentError::SentenceCountMismatch {
                expected: corpus.len(),
                got: alignments.len(),
            }
            .into());
        }
        Ok(alignments)
    }

    fn name(&self) -> &str {
        "eflomal"
    }
}
