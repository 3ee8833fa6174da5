//! In-process tree aligner
//!
//! Reads the printed tree notation (node count, then `L<i>`/`R<i>` nodes
//! with children and current leaf links), aligns every source/target pair
//! whose leaf yields contain each other's link evidence, and introduces a
//! virtual node for an unaligned internal node when its counterpart is a
//! contiguous run of children under a single lowest containing node.

use super::TreeAligner;
use crate::alignment::notation::{self, Item};
use crate::error::{AlignerError, AlignmentError};
use crate::types::{NodeId, Side};
use anyhow::Result;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct BuiltinTreeAligner {
    strict: bool,
}

impl BuiltinTreeAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail instead of leaving internal nodes unaligned.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Align one sentence, returning the output notation line.
    pub fn align_line(&self, line: &str) -> Result<String, AlignmentError> {
        let mut tree = AlignTree::parse(line)?;
        tree.align();
        Ok(tree.render())
    }
}

impl TreeAligner for BuiltinTreeAligner {
    fn align(&self, lines: &[String]) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let mut tree = AlignTree::parse(line)?;
            tree.align();
            if self.strict {
                let unaligned = tree.unaligned_internal();
                if !unaligned.is_empty() {
                    return Err(AlignerError::Incomplete {
                        sentence: i,
                        unaligned,
                    }
                    .into());
                }
            }
            out.push(tree.render());
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

#[derive(Debug, Clone)]
struct AlignNode {
    side: Side,
    is_virtual: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    align: BTreeSet<NodeId>,
}

impl AlignNode {
    fn new(side: Side) -> Self {
        Self {
            side,
            is_virtual: false,
            parent: None,
            children: Vec::new(),
            align: BTreeSet::new(),
        }
    }
}

type Yield = BTreeSet<NodeId>;

struct AlignTree {
    nodes: Vec<AlignNode>,
}

impl AlignTree {
    fn parse(line: &str) -> Result<Self, AlignmentError> {
        let mut items = notation::parse(line)?.into_iter();
        let count = match items.next() {
            Some(Item::Select(count)) => count,
            _ => {
                return Err(AlignmentError::BadToken {
                    token: line.split_whitespace().next().unwrap_or_default().to_string(),
                })
            }
        };

        let mut slots: Vec<Option<AlignNode>> = vec![None; count];
        let mut current: Option<NodeId> = None;
        let unknown = |index: NodeId| AlignmentError::UnknownNode { index, nodes: count };
        for item in items {
            match item {
                Item::Introduce(side, index) => {
                    let slot = slots.get_mut(index).ok_or(unknown(index))?;
                    *slot = Some(AlignNode::new(side));
                    current = Some(index);
                }
                Item::Select(index) => {
                    slots.get(index).ok_or(unknown(index))?;
                    current = Some(index);
                }
                Item::Children(list) | Item::Alignment(list)
                    if list.iter().any(|&i| i >= count) =>
                {
                    let bad = list.iter().copied().find(|&i| i >= count).unwrap_or(count);
                    return Err(unknown(bad));
                }
                Item::Children(list) => {
                    let node = current.ok_or(AlignmentError::NoContext { open: '[' })?;
                    let node = slots[node].as_mut().ok_or(unknown(node))?;
                    node.children.extend(list);
                }
                Item::Alignment(list) => {
                    let node = current.ok_or(AlignmentError::NoContext { open: '(' })?;
                    let node = slots[node].as_mut().ok_or(unknown(node))?;
                    node.align.extend(list);
                }
            }
        }

        let mut nodes = Vec::with_capacity(count);
        for (index, slot) in slots.into_iter().enumerate() {
            nodes.push(slot.ok_or(unknown(index))?);
        }
        for parent in 0..nodes.len() {
            for child in nodes[parent].children.clone() {
                nodes[child].parent = Some(parent);
            }
        }
        Ok(Self { nodes })
    }

    fn leaf_yield(&self, root: NodeId) -> Yield {
        let mut out = Yield::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            if node.children.is_empty() {
                out.insert(n);
            } else {
                stack.extend(node.children.iter().copied());
            }
        }
        out
    }

    /// Every linked leaf of `small` links into `large`, and at least one does.
    fn contains(&self, small: &Yield, large: &Yield) -> bool {
        let mut evidence = false;
        for &leaf in small {
            let links = &self.nodes[leaf].align;
            if links.is_empty() {
                continue;
            }
            if !links.iter().any(|a| large.contains(a)) {
                return false;
            }
            evidence = true;
        }
        evidence
    }

    fn highest(&self, set: &HashSet<NodeId>) -> BTreeSet<NodeId> {
        set.iter()
            .copied()
            .filter(|&n| self.nodes[n].parent.map_or(true, |p| !set.contains(&p)))
            .collect()
    }

    fn lowest(&self, set: &HashSet<NodeId>) -> BTreeSet<NodeId> {
        set.iter()
            .copied()
            .filter(|&n| !self.nodes[n].children.iter().any(|c| set.contains(c)))
            .collect()
    }

    fn align(&mut self) {
        let ids = |side: Side| -> Vec<NodeId> {
            (0..self.nodes.len())
                .filter(|&i| self.nodes[i].side == side)
                .collect()
        };
        let left = ids(Side::Left);
        let right = ids(Side::Right);
        let yields: Vec<Yield> = (0..self.nodes.len()).map(|n| self.leaf_yield(n)).collect();

        // (l, r) pairs where the first's evidence lies inside the second
        let mut l_in_r = HashSet::new();
        let mut r_in_l = HashSet::new();
        for &l in &left {
            for &r in &right {
                if self.contains(&yields[l], &yields[r]) {
                    l_in_r.insert((l, r));
                }
                if self.contains(&yields[r], &yields[l]) {
                    r_in_l.insert((l, r));
                }
            }
        }
        for &(l, r) in &l_in_r {
            if r_in_l.contains(&(l, r)) {
                self.nodes[l].align.insert(r);
                self.nodes[r].align.insert(l);
            }
        }

        let todo = |side: &[NodeId]| -> Vec<NodeId> {
            side.iter()
                .copied()
                .filter(|&n| !self.nodes[n].children.is_empty() && self.nodes[n].align.is_empty())
                .collect()
        };
        let ltodo = todo(&left);
        let rtodo = todo(&right);

        for l in ltodo {
            let inner: HashSet<NodeId> =
                right.iter().copied().filter(|&r| r_in_l.contains(&(l, r))).collect();
            let outer: HashSet<NodeId> =
                right.iter().copied().filter(|&r| l_in_r.contains(&(l, r))).collect();
            self.insert_virtual(l, Side::Right, &inner, &outer);
        }
        for r in rtodo {
            let inner: HashSet<NodeId> =
                left.iter().copied().filter(|&l| l_in_r.contains(&(l, r))).collect();
            let outer: HashSet<NodeId> =
                left.iter().copied().filter(|&l| r_in_l.contains(&(l, r))).collect();
            self.insert_virtual(r, Side::Left, &inner, &outer);
        }
    }

    /// Group the `inner` nodes under a new virtual node on `side` if they
    /// form a contiguous run of children of the single lowest `outer` node.
    fn insert_virtual(
        &mut self,
        unaligned: NodeId,
        side: Side,
        inner: &HashSet<NodeId>,
        outer: &HashSet<NodeId>,
    ) {
        let members = self.highest(inner);
        let parents = self.lowest(outer);
        let Some(&parent) = parents.iter().next().filter(|_| parents.len() == 1) else {
            debug!(node = unaligned, candidates = parents.len(), "no single containing node");
            return;
        };
        let Some(run) = contiguous_run(&self.nodes[parent].children, &members) else {
            debug!(node = unaligned, parent, "counterpart is not a contiguous run");
            return;
        };

        let v = self.nodes.len();
        let mut node = AlignNode::new(side);
        node.is_virtual = true;
        node.parent = Some(parent);
        node.children = run;
        node.align.insert(unaligned);
        self.nodes.push(node);
        self.nodes[unaligned].align.insert(v);
    }

    fn unaligned_internal(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&n| !self.nodes[n].children.is_empty() && self.nodes[n].align.is_empty())
            .collect()
    }

    fn render(&self) -> String {
        let mut items = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            if node.children.is_empty() {
                continue;
            }
            if node.is_virtual {
                items.push(Item::Introduce(node.side, id));
                items.push(Item::Children(node.children.clone()));
            }
            items.push(Item::Select(id));
            items.push(Item::Alignment(node.align.iter().copied().collect()));
        }
        notation::render(&items)
    }
}

/// `children` trimmed to the span of `members`, if that span holds every
/// member and nothing else. Runs of one child are rejected.
fn contiguous_run(children: &[NodeId], members: &BTreeSet<NodeId>) -> Option<Vec<NodeId>> {
    let start = children.iter().position(|c| members.contains(c))?;
    let end = children.iter().rposition(|c| members.contains(c))?;
    let run = &children[start..=end];
    if run.len() < 2
        || run.len() != members.len()
        || !run.iter().all(|c| members.contains(c))
    {
        return None;
    }
    Some(run.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Lu, Sentence};
    use crate::types::WordAlignment;

    fn printed(sl: &str, tl: &str, links: WordAlignment) -> String {
        let mut s = Sentence::new(&Lu::parse(sl).unwrap(), &Lu::parse(tl).unwrap());
        s.add_word_alignment(&links).unwrap();
        s.print_tree()
    }

    #[test]
    fn aligns_mutually_containing_nodes() {
        let line = printed(
            "^NP<NP>{^big<adj>$ ^dog<n>$}$",
            "^NP<NP>{^perro<n>$ ^grande<adj>$}$",
            WordAlignment::from([(0, vec![1]), (1, vec![0])]),
        );
        let out = BuiltinTreeAligner::new().align_line(&line).unwrap();
        assert_eq!(out, "0 ( 3 ) 3 ( 0 )");
    }

    #[test]
    fn introduces_virtual_node_for_flat_side() {
        let line = printed(
            "^S<S>{^a<det>$ ^b<n>$ ^c<vb>$}$",
            "^S<S>{^x<vb>$ ^NP<NP>{^y<det>$ ^z<n>$}$}$",
            WordAlignment::from([(0, vec![1]), (1, vec![2]), (2, vec![0])]),
        );
        let out = BuiltinTreeAligner::new().align_line(&line).unwrap();
        assert_eq!(out, "0 ( 4 ) 4 ( 0 ) 6 ( 9 ) L9 [ 1 2 ] 9 ( 6 )");
    }

    #[test]
    fn unlinked_leaves_do_not_block_containment() {
        // "el" has no source counterpart
        let line = printed(
            "^NP<NP>{^dog<n>$}$",
            "^NP<NP>{^el<det>$ ^perro<n>$}$",
            WordAlignment::from([(0, vec![1])]),
        );
        let out = BuiltinTreeAligner::new().align_line(&line).unwrap();
        assert_eq!(out, "0 ( 2 4 ) 2 ( 0 1 )");
    }

    #[test]
    fn nodes_without_evidence_stay_unaligned() {
        let line = printed("^NP<NP>{^a<a>$ ^b<b>$}$", "^NP<NP>{^c<c>$ ^d<d>$}$", WordAlignment::new());
        let out = BuiltinTreeAligner::new().align_line(&line).unwrap();
        assert_eq!(out, "0 ( ) 3 ( )");

        let strict = BuiltinTreeAligner::new().with_strict(true);
        let err = strict.align(&[line]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AlignerError>(),
            Some(AlignerError::Incomplete { sentence: 0, .. })
        ));
    }

    #[test]
    fn contiguous_run_trims_and_checks() {
        let members: BTreeSet<NodeId> = [2, 3].into_iter().collect();
        assert_eq!(contiguous_run(&[1, 2, 3, 4], &members), Some(vec![2, 3]));
        let gapped: BTreeSet<NodeId> = [1, 3].into_iter().collect();
        assert_eq!(contiguous_run(&[1, 2, 3], &gapped), None);
        let single: BTreeSet<NodeId> = [2].into_iter().collect();
        assert_eq!(contiguous_run(&[1, 2, 3], &single), None);
        let outside: BTreeSet<NodeId> = [2, 3, 9].into_iter().collect();
        assert_eq!(contiguous_run(&[1, 2, 3], &outside), None);
    }

    #[test]
    fn rejects_malformed_input() {
        let aligner = BuiltinTreeAligner::new();
        assert!(matches!(
            aligner.align_line("L0 [ ] ( )"),
            Err(AlignmentError::BadToken { .. })
        ));
        assert_eq!(
            aligner.align_line("2 L0 [ 1 ] ( )"),
            Err(AlignmentError::UnknownNode { index: 1, nodes: 2 })
        );
        assert_eq!(
            aligner.align_line("1 L0 [ 4 ] ( )"),
            Err(AlignmentError::UnknownNode { index: 4, nodes: 1 })
        );
    }
}
