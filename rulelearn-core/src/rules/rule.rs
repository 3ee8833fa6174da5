use serde::{Deserialize, Serialize};
use std::fmt;

/// One output position of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSlot {
    /// Emit the pattern element at this 0-based position
    Input(usize),
    /// Emit the literal at this 0-based position of `inserts`
    Insert(usize),
}

/// A learned reordering/insertion rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Phrase-level tag this rule builds
    pub parent: String,
    /// Input tags, one per source child
    pub pattern: Vec<String>,
    pub order: Vec<OrderSlot>,
    /// `lemma@tag` literals with no source counterpart
    pub inserts: Vec<String>,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    /// Additional occurrences seen after the first
    pub weight: u32,
}

/// The identity of a rule for deduplication: everything but weight and
/// the virtual flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    parent: String,
    pattern: Vec<String>,
    order: Vec<OrderSlot>,
    inserts: Vec<String>,
}

impl Rule {
    pub fn new(
        parent: impl Into<String>,
        pattern: Vec<String>,
        order: Vec<OrderSlot>,
        inserts: Vec<String>,
        is_virtual: bool,
    ) -> Self {
        Self {
            parent: parent.into(),
            pattern,
            order,
            inserts,
            is_virtual,
            weight: 0,
        }
    }

    /// Same parent, pattern, order and inserts.
    pub fn redundant(&self, other: &Rule) -> bool {
        self.parent == other.parent
            && self.pattern == other.pattern
            && self.order == other.order
            && self.inserts == other.inserts
    }

    /// Same pattern but some other difference.
    pub fn conflicts(&self, other: &Rule) -> bool {
        self.pattern == other.pattern && !self.redundant(other)
    }

    pub fn key(&self) -> RuleKey {
        RuleKey {
            parent: self.parent.clone(),
            pattern: self.pattern.clone(),
            order: self.order.clone(),
            inserts: self.inserts.clone(),
        }
    }

    /// Total times the rule was extracted across the corpus.
    pub fn occurrences(&self) -> u32 {
        self.weight + 1
    }

    /// Output part as written in a rule file: 1-based input positions
    /// and quoted literals separated by `_`.
    pub fn output_string(&self) -> String {
        self.order
            .iter()
            .map(|slot| match *slot {
                OrderSlot::Input(i) => (i + 1).to_string(),
                OrderSlot::Insert(i) => quote(self.inserts.get(i).map_or("", String::as_str)),
            })
            .collect::<Vec<_>>()
            .join(" _ ")
    }
}

fn quote(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len() + 2);
    out.push('"');
    for c in literal.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} {{ {} }}",
            self.parent,
            self.pattern.join(" "),
            self.output_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reorder() -> Rule {
        Rule::new(
            "NP",
            vec!["adj".into(), "n".into()],
            vec![OrderSlot::Input(1), OrderSlot::Input(0)],
            vec![],
            false,
        )
    }

    #[test]
    fn redundancy_ignores_weight_and_virtual_flag() {
        let a = reorder();
        let mut b = reorder();
        b.weight = 7;
        b.is_virtual = true;
        assert!(a.redundant(&b));
        assert!(!a.conflicts(&b));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn conflict_needs_same_pattern() {
        let a = reorder();
        let mut b = reorder();
        b.order = vec![OrderSlot::Input(0), OrderSlot::Input(1)];
        assert!(a.conflicts(&b));

        let mut c = reorder();
        c.pattern = vec!["n".into(), "adj".into()];
        assert!(!a.conflicts(&c));
        assert!(!a.redundant(&c));
    }

    #[test]
    fn different_parent_is_a_conflict() {
        let a = reorder();
        let mut b = reorder();
        b.parent = "SN".into();
        assert!(a.conflicts(&b));
    }

    #[test]
    fn displays_one_based_positions_and_literals() {
        assert_eq!(reorder().to_string(), "NP -> adj n { 2 _ 1 }");
        let ins = Rule::new(
            "NP",
            vec!["n".into()],
            vec![OrderSlot::Insert(0), OrderSlot::Input(0)],
            vec!["el@det".into()],
            false,
        );
        assert_eq!(ins.to_string(), r#"NP -> n { "el@det" _ 1 }"#);
    }

    #[test]
    fn literals_escape_quotes_and_backslashes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
