use super::rule::{Rule, RuleKey};
use crate::config::ConflictPolicy;
use crate::tree::Sentence;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// All sentences of a bilingual corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    sentences: Vec<Sentence>,
}

impl Corpus {
    pub fn new(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Rules of every sentence, deduplicated and weighted.
    pub fn get_rules(&self) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        self.collect_rules(&mut registry);
        registry
    }

    pub fn collect_rules(&self, registry: &mut RuleRegistry) {
        for (i, sentence) in self.sentences.iter().enumerate() {
            let rules = sentence.get_rules();
            debug!(sentence = i, rules = rules.len(), "extracted rules");
            registry.extend(rules);
        }
    }
}

/// Rules sharing one input pattern that disagree on their output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub pattern: Vec<String>,
    /// Positions in the registry, in first-seen order
    pub members: Vec<usize>,
}

/// Deduplicated rule list in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    index: HashMap<RuleKey, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, or bump the weight of the one it duplicates.
    /// Returns the rule's position.
    pub fn insert(&mut self, rule: Rule) -> usize {
        let key = rule.key();
        if let Some(&pos) = self.index.get(&key) {
            self.rules[pos].weight += 1;
            return pos;
        }
        let pos = self.rules.len();
        self.rules.push(rule);
        self.index.insert(key, pos);
        pos
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = Rule>) {
        for rule in rules {
            self.insert(rule);
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_conflict_free(&self, pos: usize) -> bool {
        let rule = &self.rules[pos];
        !self.rules.iter().any(|other| rule.conflicts(other))
    }

    /// Rules that conflict with no other rule in the registry.
    pub fn conflict_free(&self) -> impl Iterator<Item = &Rule> {
        let conflicted = self.conflicted_positions();
        self.rules
            .iter()
            .enumerate()
            .filter(move |(pos, _)| !conflicted.contains(pos))
            .map(|(_, r)| r)
    }

    /// Positions of every rule that belongs to a conflict group.
    pub fn conflicted_positions(&self) -> HashSet<usize> {
        self.conflict_groups()
            .into_iter()
            .flat_map(|g| g.members)
            .collect()
    }

    pub fn conflict_groups(&self) -> Vec<ConflictGroup> {
        group_conflicts(&self.rules.iter().enumerate().collect::<Vec<_>>())
    }

    /// Rules that go into the rule file, in registry order.
    pub fn select(&self, options: &Selection) -> Vec<&Rule> {
        let survivors: Vec<(usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| options.include_virtual || !r.is_virtual)
            .filter(|(_, r)| r.weight >= options.min_weight)
            .collect();

        match options.policy {
            ConflictPolicy::KeepAll => survivors.into_iter().map(|(_, r)| r).collect(),
            ConflictPolicy::DropConflicting => {
                let groups = group_conflicts(&survivors);
                let conflicted: HashSet<usize> =
                    groups.into_iter().flat_map(|g| g.members).collect();
                survivors
                    .into_iter()
                    .filter(|(pos, _)| !conflicted.contains(pos))
                    .map(|(_, r)| r)
                    .collect()
            }
            ConflictPolicy::Majority => {
                let mut losers = HashSet::new();
                for group in group_conflicts(&survivors) {
                    let winner = group
                        .members
                        .iter()
                        .copied()
                        .reduce(|best, pos| {
                            if self.rules[pos].weight > self.rules[best].weight {
                                pos
                            } else {
                                best
                            }
                        });
                    losers.extend(group.members.into_iter().filter(|&pos| Some(pos) != winner));
                }
                survivors
                    .into_iter()
                    .filter(|(pos, _)| !losers.contains(pos))
                    .map(|(_, r)| r)
                    .collect()
            }
        }
    }
}

/// How [`RuleRegistry::select`] filters rules.
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub policy: ConflictPolicy,
    pub min_weight: u32,
    pub include_virtual: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            policy: ConflictPolicy::KeepAll,
            min_weight: 0,
            include_virtual: true,
        }
    }
}

fn group_conflicts(rules: &[(usize, &Rule)]) -> Vec<ConflictGroup> {
    let mut by_pattern: Vec<ConflictGroup> = Vec::new();
    let mut slot: HashMap<&[String], usize> = HashMap::new();
    for &(pos, rule) in rules {
        match slot.get(rule.pattern.as_slice()) {
            Some(&g) => by_pattern[g].members.push(pos),
            None => {
                slot.insert(&rule.pattern, by_pattern.len());
                by_pattern.push(ConflictGroup {
                    pattern: rule.pattern.clone(),
                    members: vec![pos],
                });
            }
        }
    }
    // deduplicated rules with equal patterns always conflict
    by_pattern.retain(|g| g.members.len() > 1);
    by_pattern
}
