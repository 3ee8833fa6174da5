use super::rule::Rule;
use crate::config::OutputConfig;
use crate::types::WILDCARD;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

/// Every symbol a rule file has to declare.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: BTreeSet<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tag: &str) {
        if tag != WILDCARD && !tag.is_empty() {
            self.tags.insert(tag.to_string());
        }
    }

    pub fn register_rule(&mut self, rule: &Rule) {
        self.register(&rule.parent);
        for tag in &rule.pattern {
            self.register(tag);
        }
    }

    /// Sorted
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Renders rules in the transfer-rule file syntax.
#[derive(Debug, Clone, Default)]
pub struct RuleWriter {
    write_weights: bool,
}

impl RuleWriter {
    pub fn new(write_weights: bool) -> Self {
        Self { write_weights }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.write_weights)
    }

    pub fn rule_line(&self, rule: &Rule) -> String {
        let weight = if self.write_weights {
            format!("{}: ", rule.weight)
        } else {
            String::new()
        };
        format!(
            "{} -> {}{} {{ {} }} ;",
            rule.parent,
            weight,
            rule.pattern.join(" "),
            rule.output_string()
        )
    }

    /// Declaration block, a blank line, then one rule per line.
    pub fn render(&self, rules: &[&Rule]) -> String {
        let mut tags = TagRegistry::new();
        for rule in rules {
            tags.register_rule(rule);
        }

        let mut out = String::new();
        for tag in tags.iter() {
            let _ = writeln!(out, "{tag}: _;");
        }
        out.push('\n');
        for rule in rules {
            out.push_str(&self.rule_line(rule));
            out.push('\n');
        }
        out
    }

    pub fn write_to_file(&self, path: &Path, rules: &[&Rule]) -> Result<()> {
        std::fs::write(path, self.render(rules))
            .with_context(|| format!("writing rules to {}", path.display()))
    }
}
