use super::rule::{OrderSlot, Rule};
use crate::tree::Sentence;
use crate::types::*;
use std::collections::BTreeSet;
use std::iter;
use tracing::debug;

impl Sentence {
    /// Every rule this sentence supports, one per consistent combination of
    /// aligned node pair and candidate bracketings.
    pub fn get_rules(&self) -> Vec<Rule> {
        let sources = (self.sl_root()..self.tl_root()).chain(self.left_virtual().iter().copied());

        let mut rules = Vec::new();
        for n in sources {
            let node = self.node(n);
            if node.is_leaf() || !node.has_label() {
                continue;
            }
            for &o in &node.alignment {
                let target = self.node(o);
                if target.side != Side::Right {
                    continue;
                }
                for slch in &node.children_options {
                    for tlch in &target.children_options {
                        if let Some(rule) = self.derive_rule(n, o, slch, tlch) {
                            rules.push(rule);
                        }
                    }
                }
            }
        }
        rules
    }

    fn derive_rule(&self, n: NodeId, o: NodeId, slch: &[NodeId], tlch: &[NodeId]) -> Option<Rule> {
        let reached: BTreeSet<NodeId> = slch
            .iter()
            .flat_map(|&s| self.subtree(s))
            .flat_map(|d| self.node(d).alignment.iter().copied())
            .collect();
        let target_leaves: BTreeSet<NodeId> =
            tlch.iter().flat_map(|&t| self.leaves_under(t)).collect();
        if reached.is_disjoint(&target_leaves) {
            debug!(source = n, target = o, ?slch, ?tlch, "no shared alignment, skipping");
            return None;
        }

        let mut order = Vec::with_capacity(tlch.len());
        let mut inserts = Vec::new();
        for &t in tlch {
            if self.subtree(t).all(|d| self.node(d).alignment.is_empty()) {
                order.push(OrderSlot::Insert(inserts.len()));
                inserts.push(self.node(t).literal());
                continue;
            }
            let aligned = &self.node(t).alignment;
            match slch.iter().position(|s| aligned.contains(s)) {
                Some(i) => order.push(OrderSlot::Input(i)),
                None => {
                    debug!(source = n, target = o, child = t, "target child aligned outside bracketing");
                    return None;
                }
            }
        }

        let node = self.node(n);
        let parent = node.primary_tag().unwrap_or(WILDCARD);
        let pattern = slch
            .iter()
            .map(|&s| self.node(s).pattern_tag().to_string())
            .collect();
        let is_virtual = slch
            .iter()
            .chain(iter::once(&n))
            .any(|i| self.left_virtual().contains(i))
            || tlch
                .iter()
                .chain(iter::once(&o))
                .any(|i| self.right_virtual().contains(i));

        Some(Rule::new(parent, pattern, order, inserts, is_virtual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Lu;

    fn sentence(sl: &str, tl: &str) -> Sentence {
        Sentence::new(&Lu::parse(sl).unwrap(), &Lu::parse(tl).unwrap())
    }

    #[test]
    fn reorders_two_children() {
        let mut s = sentence(
            "^NP<NP>{^big<adj>$ ^dog<n>$}$",
            "^NP<NP>{^perro<n>$ ^grande<adj>$}$",
        );
        s.add_word_alignment(&WordAlignment::from([(0, vec![1]), (1, vec![0])]))
            .unwrap();
        s.add_tree_alignment("0 ( 3 ) 3 ( 0 )").unwrap();

        let rules = s.get_rules();
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.parent, "NP");
        assert_eq!(rule.pattern, vec!["adj", "n"]);
        assert_eq!(rule.order, vec![OrderSlot::Input(1), OrderSlot::Input(0)]);
        assert!(rule.inserts.is_empty());
        assert!(!rule.is_virtual);
        assert_eq!(rule.weight, 0);
    }

    #[test]
    fn unaligned_target_subtree_is_an_insertion() {
        let mut s = sentence("^NP<NP>{^dog<n>$}$", "^NP<NP>{^el<det><def>$ ^perro<n>$}$");
        s.add_word_alignment(&WordAlignment::from([(0, vec![1])])).unwrap();
        s.add_tree_alignment("0 ( 2 ) 2 ( 0 )").unwrap();

        let rules = s.get_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].inserts, vec!["el@det"]);
        assert_eq!(rules[0].order, vec![OrderSlot::Insert(0), OrderSlot::Input(0)]);
        assert!(!rules[0]
            .order
            .iter()
            .any(|slot| matches!(slot, OrderSlot::Input(i) if *i >= 1)));
    }

    #[test]
    fn aborts_when_target_child_aligns_outside_bracketing() {
        // a b stay together in the source but split in the target
        let mut s = sentence(
            "^S<S>{^X<X>{^a<a>$ ^b<b>$}$ ^c<c>$}$",
            "^S<S>{^X<X>{^a2<a>$ ^c2<c>$}$ ^b2<b>$}$",
        );
        s.add_word_alignment(&WordAlignment::from([(0, vec![0]), (1, vec![2]), (2, vec![1])]))
            .unwrap();
        s.add_tree_alignment("1 ( 6 ) 6 ( 1 ) 0 ( 5 ) 5 ( 0 )").unwrap();
        assert!(s.get_rules().is_empty());
    }

    #[test]
    fn skips_pairs_with_disjoint_alignment() {
        let mut s = sentence(
            "^NP<NP>{^a<a>$ ^b<b>$}$",
            "^NP<NP>{^c<c>$ ^d<d>$}$",
        );
        s.add_tree_alignment("0 ( 3 )").unwrap();
        assert!(s.get_rules().is_empty());
    }

    #[test]
    fn unlabelled_and_leaf_sources_are_ignored() {
        let mut s = sentence("^x<*>{^a<n>$}$", "^y<*>{^b<n>$}$");
        s.add_word_alignment(&WordAlignment::from([(0, vec![0])])).unwrap();
        s.add_tree_alignment("0 ( 2 )").unwrap();
        assert!(s.get_rules().is_empty());
    }

    #[test]
    fn virtual_bracketings_yield_extra_rules() {
        let mut s = sentence(
            "^S<S>{^a<det>$ ^b<n>$ ^c<vb>$}$",
            "^S<S>{^x<vb>$ ^y<det>$ ^z<n>$}$",
        );
        s.add_word_alignment(&WordAlignment::from([(0, vec![1]), (1, vec![2]), (2, vec![0])]))
            .unwrap();
        s.add_tree_alignment("L8 [ 1 2 ] 8 ( 9 ) R9 [ 6 7 ] 9 ( 8 ) 0 ( 4 ) 4 ( 0 )")
            .unwrap();

        let rules = s.get_rules();
        let shown: Vec<(String, bool)> = rules
            .iter()
            .map(|r| (r.to_string(), r.is_virtual))
            .collect();
        assert_eq!(
            shown,
            vec![
                ("S -> det n vb { 3 _ 1 _ 2 }".to_string(), false),
                ("S -> det_n vb { 2 _ 1 }".to_string(), true),
                ("det_n -> det n { 1 _ 2 }".to_string(), true),
            ]
        );
    }
}
