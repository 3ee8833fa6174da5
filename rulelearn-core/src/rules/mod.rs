// Rule induction - from aligned sentences to a rule file
// Implementations live in:
// - rule.rs: Rule, output slots, redundancy and conflicts
// - extractor.rs: per-sentence extraction over aligned subtrees
// - corpus.rs: corpus-wide dedup, weights and conflict selection
// - writer.rs: tag declarations and rule file syntax
// - report.rs: JSON run summary

pub mod corpus;
pub mod extractor;
pub mod report;
pub mod rule;
pub mod writer;

pub use corpus::{ConflictGroup, Corpus, RuleRegistry, Selection};
pub use report::{ReportedRule, RuleReport};
pub use rule::{OrderSlot, Rule, RuleKey};
pub use writer::{RuleWriter, TagRegistry};
