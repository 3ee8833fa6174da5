use crate::aligners::{TreeAligner, TreeAlignerImpl, WordAligner, WordAlignerImpl};
use crate::alignment::Vocabulary;
use crate::cache::{AlignmentCacheKey, AlignmentCacheValue, AlignmentStage};
use crate::config::LearnerConfig;
use crate::reader::TreePair;
use crate::rules::{Corpus, RuleRegistry};
use crate::storage::{
    calculate_config_hash, calculate_input_hash, AlignmentStorage, FileStorage, NoOpStorage,
};
use crate::tree::Sentence;
use crate::types::*;
use anyhow::{bail, Context, Result};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics: lets you inspect/compare each boundary
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStages {
    pub word_alignments: Vec<WordAlignment>,
    pub tree_aligner_input: Vec<String>,
    pub tree_aligner_output: Vec<String>,
    pub corpus: Corpus,
    #[serde(serialize_with = "serialize_registry")]
    pub rules: RuleRegistry,
}

fn serialize_registry<S: Serializer>(registry: &RuleRegistry, s: S) -> Result<S::Ok, S::Error> {
    registry.rules().serialize(s)
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = (duration.as_secs_f64() / total.as_secs_f64()) * 100.0;
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

pub struct CorpusProcessor {
    word_aligner: Box<dyn WordAligner>,
    tree_aligner: Box<dyn TreeAligner>,
    storage: Box<dyn AlignmentStorage + Send + Sync>,
}

impl CorpusProcessor {
    /// Create CorpusProcessor with full dependency injection
    pub fn new_with_dependencies(
        word_aligner: Box<dyn WordAligner>,
        tree_aligner: Box<dyn TreeAligner>,
        storage: Box<dyn AlignmentStorage + Send + Sync>,
    ) -> Self {
        Self {
            word_aligner,
            tree_aligner,
            storage,
        }
    }

    /// Backends and cache as named by the config
    pub fn from_config(config: &LearnerConfig) -> Result<Self> {
        let word_aligner = Box::new(WordAlignerImpl::from_config(&config.word_aligner)?);
        let tree_aligner = Box::new(TreeAlignerImpl::from_config(&config.tree_aligner)?);
        let storage: Box<dyn AlignmentStorage + Send + Sync> = if config.cache.enabled {
            Box::new(FileStorage::new(&config.cache.dir)?)
        } else {
            Box::new(NoOpStorage::new())
        };
        Ok(Self::new_with_dependencies(word_aligner, tree_aligner, storage))
    }

    /// Trees → aligned sentences → deduplicated rules, keeping every
    /// intermediate stage.
    pub fn process(
        &self,
        pairs: &[TreePair],
        config: &LearnerConfig,
        enable_profiling: bool,
        skip_cache: bool,
    ) -> Result<PipelineStages> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(enable_profiling);
        println!("📄 Learning rules from {} sentence pairs", pairs.len());

        let mut sentences: Vec<Sentence> = profiler.time_step("1. Trees → Sentences", || {
            pairs.iter().map(|(sl, tl)| Sentence::new(sl, tl)).collect()
        });

        let tokens: Vec<TokenPair> = profiler.time_step("2. Vocabulary", || {
            let mut vocabulary = Vocabulary::new();
            sentences.iter().map(|s| vocabulary.encode(s)).collect()
        });

        let word_alignments = self.word_alignments(&tokens, config, &mut profiler, skip_cache)?;
        if word_alignments.len() != sentences.len() {
            bail!(
                "{} returned {} alignments for {} sentences",
                self.word_aligner.name(),
                word_alignments.len(),
                sentences.len()
            );
        }

        profiler.time_step("4. Word Alignment Ingestion", || {
            for (i, (sentence, alignment)) in sentences.iter_mut().zip(&word_alignments).enumerate() {
                sentence
                    .add_word_alignment(alignment)
                    .with_context(|| format!("sentence {}: word alignment", i + 1))?;
            }
            Ok::<(), anyhow::Error>(())
        })?;

        let tree_aligner_input: Vec<String> = sentences.iter().map(Sentence::print_tree).collect();
        let tree_aligner_output =
            self.tree_alignments(&tree_aligner_input, config, &mut profiler, skip_cache)?;
        if tree_aligner_output.len() != sentences.len() {
            bail!(
                "{} returned {} lines for {} sentences",
                self.tree_aligner.name(),
                tree_aligner_output.len(),
                sentences.len()
            );
        }

        profiler.time_step("6. Tree Alignment Ingestion", || {
            for (i, (sentence, line)) in sentences.iter_mut().zip(&tree_aligner_output).enumerate() {
                sentence
                    .add_tree_alignment(line)
                    .with_context(|| format!("sentence {}: tree alignment '{}'", i + 1, line))?;
            }
            Ok::<(), anyhow::Error>(())
        })?;

        let corpus = Corpus::new(sentences);
        let rules = profiler.time_step("7. Rule Extraction", || corpus.get_rules());

        let conflicts = rules.conflict_groups();
        if !conflicts.is_empty() {
            warn!(groups = conflicts.len(), "patterns with conflicting rules");
        }
        let conflict_free = rules.conflict_free().count();
        info!(rules = rules.len(), conflict_free, "extraction finished");
        println!(
            "📋 Extracted {} rules ({} conflict-free)",
            rules.len(),
            conflict_free
        );

        profiler.print_summary();
        println!(
            "⏱️  Total processing time: {:.0}ms",
            start_time.elapsed().as_millis()
        );

        Ok(PipelineStages {
            word_alignments,
            tree_aligner_input,
            tree_aligner_output,
            corpus,
            rules,
        })
    }

    fn word_alignments(
        &self,
        tokens: &[TokenPair],
        config: &LearnerConfig,
        profiler: &mut StepProfiler,
        skip_cache: bool,
    ) -> Result<Vec<WordAlignment>> {
        let use_cache = !skip_cache && self.word_aligner.cacheable();
        let cache_key = AlignmentCacheKey::new(
            AlignmentStage::Word,
            calculate_input_hash(&tokens)?,
            calculate_config_hash(&config.word_aligner)?,
        );

        if skip_cache {
            println!("🚫 Skipping cache lookup (--skip-cache enabled)");
        } else if use_cache {
            let cached = profiler.time_step("3a. Word Alignment Cache Lookup", || {
                self.storage.get_word_alignments(&cache_key)
            })?;
            if let Some(cached) = cached {
                println!("🎯 Cache hit: Found word alignments for corpus + config combination");
                return Ok(cached.output);
            }
        }

        info!(
            aligner = self.word_aligner.name(),
            sentences = tokens.len(),
            "running word aligner"
        );
        let started = Instant::now();
        let output = profiler.time_step("3. Word Alignment", || self.word_aligner.align(tokens))?;

        if use_cache {
            let value = AlignmentCacheValue::new(output.clone(), started.elapsed().as_millis() as u64);
            self.storage.store_word_alignments(&cache_key, &value)?;
        }
        Ok(output)
    }

    fn tree_alignments(
        &self,
        lines: &[String],
        config: &LearnerConfig,
        profiler: &mut StepProfiler,
        skip_cache: bool,
    ) -> Result<Vec<String>> {
        let cache_key = AlignmentCacheKey::new(
            AlignmentStage::Tree,
            calculate_input_hash(&lines)?,
            calculate_config_hash(&config.tree_aligner)?,
        );

        if !skip_cache {
            let cached = profiler.time_step("5a. Tree Alignment Cache Lookup", || {
                self.storage.get_tree_alignments(&cache_key)
            })?;
            if let Some(cached) = cached {
                println!("🎯 Cache hit: Found tree alignments for corpus + config combination");
                return Ok(cached.output);
            }
        }

        info!(
            aligner = self.tree_aligner.name(),
            sentences = lines.len(),
            "running tree aligner"
        );
        let started = Instant::now();
        let output = profiler.time_step("5. Tree Alignment", || self.tree_aligner.align(lines))?;

        if !skip_cache {
            let value = AlignmentCacheValue::new(output.clone(), started.elapsed().as_millis() as u64);
            self.storage.store_tree_alignments(&cache_key, &value)?;
        }
        Ok(output)
    }
}
