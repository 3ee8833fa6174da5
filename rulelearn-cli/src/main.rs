use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

// Import from rulelearn-core
use rulelearn_core::config::{TreeAlignerBackend, WordAlignerBackend};
use rulelearn_core::rules::Selection;
use rulelearn_core::{
    CorpusProcessor, CorpusReader, LearnerConfig, PipelineStages, RuleReport, RuleWriter,
};

// Import CLI utilities
use rulelearn::ToolLocator;

#[derive(Parser)]
#[command(name = "rulelearn")]
#[command(about = "Learn structural transfer rules from a parsed parallel corpus")]
struct Args {
    /// Source-side trees, one per line (with --target)
    #[arg(short, long, requires = "target")]
    source: Option<PathBuf>,

    /// Target-side trees, one per line (with --source)
    #[arg(short, long, requires = "source")]
    target: Option<PathBuf>,

    /// Single bilingual file, source and target split by the separator
    #[arg(long, conflicts_with_all = ["source", "target"])]
    corpus: Option<PathBuf>,

    /// Separator for --corpus lines (overrides config)
    #[arg(long)]
    separator: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Show the default config and available options, then exit
    #[arg(long)]
    show_configs: bool,

    /// Rule file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Also write a JSON report of every rule, weight and conflict
    #[arg(long)]
    report: Option<String>,

    /// Word aligner backend: eflomal or fixed
    #[arg(long)]
    word_aligner: Option<String>,

    /// Precomputed `i-j` alignments, one line per sentence (implies fixed)
    #[arg(long)]
    alignments: Option<PathBuf>,

    /// eflomal executable
    #[arg(long)]
    eflomal: Option<PathBuf>,

    /// Tree aligner backend: builtin or external
    #[arg(long)]
    tree_aligner: Option<String>,

    /// External tree aligner executable (implies external)
    #[arg(long)]
    tree_aligner_bin: Option<PathBuf>,

    /// Fail when the builtin tree aligner leaves internal nodes unaligned
    #[arg(long)]
    strict: bool,

    /// keep_all, majority or drop_conflicting
    #[arg(long)]
    conflict_policy: Option<String>,

    /// Only write rules seen at least this many extra times
    #[arg(long)]
    min_weight: Option<u32>,

    /// Leave out rules that depend on virtual bracketings
    #[arg(long)]
    no_virtual: bool,

    /// Prefix each pattern with its weight
    #[arg(long)]
    write_weights: bool,

    /// Alignment cache directory
    #[arg(long)]
    cache_dir: Option<String>,

    /// Skip cache and force fresh alignment (useful for development/testing)
    #[arg(long)]
    skip_cache: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Dump all intermediate pipeline stage outputs to a directory
    /// Captures: word alignments, tree aligner input/output, sentences and rules
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output (default: test_outputs/stages)
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    println!("🦀 Rulelearn Transfer Rule Learner");

    if args.show_configs {
        show_help()?;
        return Ok(());
    }

    let mut config = LearnerConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }
    apply_overrides(&mut config, &args)?;

    let reader = CorpusReader::from_config(&config.corpus);
    let (pairs, input_path) = match (&args.corpus, &args.source, &args.target) {
        (Some(corpus), _, _) => (reader.read_bilingual(corpus)?, corpus.clone()),
        (None, Some(source), Some(target)) => {
            (reader.read_parallel(source, target)?, source.clone())
        }
        _ => {
            println!("⚠️  No corpus given.");
            println!("   Use --corpus <file> or --source <file> --target <file>.");
            return Ok(());
        }
    };
    println!("📄 Read {} sentence pairs from: {}", pairs.len(), input_path.display());

    let processor = CorpusProcessor::from_config(&config)?;
    let stages = match processor.process(&pairs, &config, args.profile, args.skip_cache) {
        Ok(stages) => stages,
        Err(e) => {
            eprintln!("❌ Processing failed: {e:#}");
            std::process::exit(1);
        }
    };

    if args.dump_stages {
        println!("\n🔬 Pipeline stage dump");
        save_stages(&stages, &args.stages_dir)?;
        println!("✅ All stages dumped to: {}", args.stages_dir);
    }

    let selection = Selection {
        policy: config.output.conflict_policy,
        min_weight: config.output.min_weight,
        include_virtual: config.extraction.include_virtual,
    };
    let selected = stages.rules.select(&selection);

    let output_path = if let Some(output) = &args.output {
        output.clone()
    } else {
        let input_name = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("corpus");
        let config_suffix = args
            .config
            .as_ref()
            .and_then(|p| Path::new(p).file_stem())
            .and_then(|s| s.to_str())
            .map(|s| format!("_{s}"))
            .unwrap_or_default();
        format!("{input_name}{config_suffix}_rules.rtx")
    };

    RuleWriter::from_config(&config.output).write_to_file(Path::new(&output_path), &selected)?;
    println!("✅ Successfully learned rules");
    println!("📊 Rule metrics:");
    println!("   - Extracted: {}", stages.rules.len());
    println!("   - Written: {}", selected.len());
    println!("   - Conflict groups: {}", stages.rules.conflict_groups().len());
    println!("💾 Rules saved to: {}", output_path);

    if let Some(report_path) = &args.report {
        RuleReport::new(&stages.rules, stages.corpus.len()).save_to_json(report_path)?;
        println!("💾 Report saved to: {}", report_path);
    }

    Ok(())
}

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut LearnerConfig, args: &Args) -> Result<()> {
    if let Some(separator) = &args.separator {
        config.corpus.separator = separator.clone();
    }

    if let Some(backend) = &args.word_aligner {
        config.word_aligner.backend = match backend.as_str() {
            "eflomal" => WordAlignerBackend::Eflomal,
            "fixed" => WordAlignerBackend::Fixed,
            other => return Err(anyhow!("unknown word aligner '{other}'")),
        };
    }
    if let Some(alignments) = &args.alignments {
        config.word_aligner.backend = WordAlignerBackend::Fixed;
        config.word_aligner.alignments = Some(alignments.clone());
    }
    if let Some(eflomal) = &args.eflomal {
        config.word_aligner.binary = eflomal.clone();
    }

    if let Some(backend) = &args.tree_aligner {
        config.tree_aligner.backend = match backend.as_str() {
            "builtin" => TreeAlignerBackend::Builtin,
            "external" => TreeAlignerBackend::External,
            other => return Err(anyhow!("unknown tree aligner '{other}'")),
        };
    }
    if let Some(binary) = &args.tree_aligner_bin {
        config.tree_aligner.backend = TreeAlignerBackend::External;
        config.tree_aligner.binary = Some(binary.clone());
    }
    if args.strict {
        config.tree_aligner.strict = true;
    }

    if let Some(policy) = &args.conflict_policy {
        config.output.conflict_policy = policy.parse()?;
    }
    if let Some(min_weight) = args.min_weight {
        config.output.min_weight = min_weight;
    }
    if args.no_virtual {
        config.extraction.include_virtual = false;
    }
    if args.write_weights {
        config.output.write_weights = true;
    }

    if let Some(cache_dir) = &args.cache_dir {
        config.cache.dir = cache_dir.clone();
    } else if args.config.is_none() {
        if let Some(dir) = ToolLocator::default_cache_dir() {
            config.cache.dir = dir.to_string_lossy().into_owned();
        }
    }

    // Resolve executables up front so a missing tool fails before alignment
    let locator = ToolLocator::new()?;
    if config.word_aligner.backend == WordAlignerBackend::Eflomal {
        let binary = locator.find(&config.word_aligner.binary)?;
        println!("🔧 Using eflomal: {}", binary.display());
        config.word_aligner.binary = binary;
    }
    if config.tree_aligner.backend == TreeAlignerBackend::External {
        if let Some(binary) = &config.tree_aligner.binary {
            let binary = locator.find(binary)?;
            println!("🔧 Using tree aligner: {}", binary.display());
            config.tree_aligner.binary = Some(binary);
        }
    }

    Ok(())
}

fn show_help() -> Result<()> {
    println!("\n📋 Default Configuration:");
    println!("{}", LearnerConfig::default().to_yaml()?);

    println!("📋 Available Options:");
    println!("  --corpus <path>             Bilingual file, one 'source ||| target' pair per line");
    println!("  --source/--target <path>    Parallel files, one tree per line");
    println!("  --config <path>             Load custom config file");
    println!("  --output <path>             Rule file path (auto-generated if not specified)");
    println!("  --report <path>             JSON report with weights and conflicts");
    println!("  --alignments <path>         Precomputed word alignments instead of eflomal");
    println!("  --tree-aligner-bin <path>   External tree aligner instead of the builtin one");
    println!("  --conflict-policy <policy>  keep_all, majority or drop_conflicting");

    println!("\n📄 Tree Format:");
    println!("  ^lemma<tag1><tag2>{{^child<tag>$ ...}}$");
    println!("  Lines with several top-level units are wrapped in ^root<S>{{...}}$");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- --corpus corpus.txt");
    println!("  cargo run -- -s corpus.sl -t corpus.tl -o rules.rtx");
    println!("  cargo run -- --corpus corpus.txt --alignments links.txt --conflict-policy majority");
    Ok(())
}

fn save_stages(stages: &PipelineStages, output_dir: &str) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)?;

    // Stage 1: Word alignments
    let wa_path = format!("{}/stage1_word_alignments.json", output_dir);
    fs::write(&wa_path, serde_json::to_string_pretty(&stages.word_alignments)?)?;
    println!("  💾 {} ({} sentences)", wa_path, stages.word_alignments.len());

    // Stage 2a: Tree aligner input
    let ti_path = format!("{}/stage2a_tree_input.txt", output_dir);
    fs::write(&ti_path, stages.tree_aligner_input.join("\n") + "\n")?;
    println!("  💾 {}", ti_path);

    // Stage 2b: Tree aligner output
    let to_path = format!("{}/stage2b_tree_output.txt", output_dir);
    fs::write(&to_path, stages.tree_aligner_output.join("\n") + "\n")?;
    println!("  💾 {}", to_path);

    // Stage 3: Aligned sentences
    let corpus_path = format!("{}/stage3_sentences.json", output_dir);
    fs::write(&corpus_path, serde_json::to_string_pretty(&stages.corpus)?)?;
    println!("  💾 {} ({} sentences)", corpus_path, stages.corpus.len());

    // Stage 4: Every extracted rule, before selection
    let rules_path = format!("{}/stage4_rules.json", output_dir);
    fs::write(&rules_path, serde_json::to_string_pretty(stages.rules.rules())?)?;
    println!("  💾 {} ({} rules)", rules_path, stages.rules.len());

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "sentences": stages.corpus.len(),
            "virtual_nodes": stages
                .corpus
                .sentences()
                .iter()
                .map(|s| s.left_virtual().len() + s.right_virtual().len())
                .sum::<usize>(),
            "rules": stages.rules.len(),
            "conflict_groups": stages.rules.conflict_groups().len(),
        }
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}
