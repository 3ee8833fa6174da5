use super::corpus::{ConflictGroup, RuleRegistry};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JSON summary of one learning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub sentence_count: usize,
    pub rule_count: usize,
    pub conflict_free_count: usize,
    pub rules: Vec<ReportedRule>,
    pub conflicts: Vec<ConflictGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedRule {
    /// Rule in file syntax, without the trailing `;`
    pub rule: String,
    pub parent: String,
    pub pattern: Vec<String>,
    pub weight: u32,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    pub conflict_free: bool,
}

impl RuleReport {
    pub fn new(registry: &RuleRegistry, sentence_count: usize) -> Self {
        let conflicted = registry.conflicted_positions();
        let rules: Vec<ReportedRule> = registry
            .rules()
            .iter()
            .enumerate()
            .map(|(pos, rule)| ReportedRule {
                rule: rule.to_string(),
                parent: rule.parent.clone(),
                pattern: rule.pattern.clone(),
                weight: rule.weight,
                is_virtual: rule.is_virtual,
                conflict_free: !conflicted.contains(&pos),
            })
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            sentence_count,
            rule_count: rules.len(),
            conflict_free_count: rules.iter().filter(|r| r.conflict_free).count(),
            rules,
            conflicts: registry.conflict_groups(),
        }
    }

    pub fn save_to_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
