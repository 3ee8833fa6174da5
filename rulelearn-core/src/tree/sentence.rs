use super::lu::Lu;
use crate::alignment::notation::{self, Item};
use crate::error::AlignmentError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One node of a sentence pair, source or target side.
///
/// Nodes live in the owning [`Sentence`]'s flat list and refer to each
/// other by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub index: NodeId,
    pub lemma: String,
    pub tags: Vec<String>,
    pub side: Side,
    pub is_virtual: bool,
    /// Default bracketing
    pub children: Vec<NodeId>,
    /// Every valid bracketing, the default one first
    pub children_options: Vec<Grouping>,
    /// Corresponding nodes on the opposite side
    pub alignment: BTreeSet<NodeId>,
}

impl Node {
    fn new(index: NodeId, lemma: String, tags: Vec<String>, side: Side) -> Self {
        Self {
            index,
            lemma,
            tags,
            side,
            is_virtual: false,
            children: Vec::new(),
            children_options: Vec::new(),
            alignment: BTreeSet::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    /// Tag used when this node appears in a rule pattern.
    pub fn pattern_tag(&self) -> &str {
        self.primary_tag().unwrap_or(WILDCARD)
    }

    /// True if at least one tag is a real label rather than the wildcard.
    pub fn has_label(&self) -> bool {
        self.tags.iter().any(|t| t != WILDCARD)
    }

    /// `lemma@tag`, the literal emitted when this node is inserted.
    pub fn literal(&self) -> String {
        format!("{}@{}", self.lemma, self.pattern_tag())
    }

    /// Record another bracketing; returns false if it was already known.
    pub fn add_children_option(&mut self, grouping: Grouping) -> bool {
        if self.children_options.contains(&grouping) {
            return false;
        }
        self.children_options.push(grouping);
        true
    }
}

/// A source/target tree pair flattened into one indexed node list.
///
/// Source nodes come first in pre-order, then target nodes, then any
/// virtual nodes the tree aligner introduces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    nodes: Vec<Node>,
    tl_root: NodeId,
    left_leaves: Vec<NodeId>,
    right_leaves: Vec<NodeId>,
    left_virtual: Vec<NodeId>,
    right_virtual: Vec<NodeId>,
}

impl Sentence {
    pub fn new(sl: &Lu, tl: &Lu) -> Self {
        let mut nodes = Vec::with_capacity(sl.len() + tl.len());
        flatten(sl, Side::Left, &mut nodes);
        let tl_root = nodes.len();
        flatten(tl, Side::Right, &mut nodes);

        for node in &mut nodes {
            node.children_options.push(node.children.clone());
        }

        let leaves = |side: Side| -> Vec<NodeId> {
            nodes
                .iter()
                .filter(|n| n.side == side && n.is_leaf())
                .map(|n| n.index)
                .collect()
        };
        let left_leaves = leaves(Side::Left);
        let right_leaves = leaves(Side::Right);

        Self {
            nodes,
            tl_root,
            left_leaves,
            right_leaves,
            left_virtual: Vec::new(),
            right_virtual: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// # Panics
    ///
    /// Panics if `index` is not a node of this sentence; use [`Sentence::get`]
    /// for ids that have not been checked.
    pub fn node(&self, index: NodeId) -> &Node {
        &self.nodes[index]
    }

    pub fn get(&self, index: NodeId) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub(crate) fn node_mut(&mut self, index: NodeId) -> &mut Node {
        &mut self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn sl_root(&self) -> NodeId {
        0
    }

    pub fn tl_root(&self) -> NodeId {
        self.tl_root
    }

    pub fn left_leaves(&self) -> &[NodeId] {
        &self.left_leaves
    }

    pub fn right_leaves(&self) -> &[NodeId] {
        &self.right_leaves
    }

    pub fn leaves(&self, side: Side) -> &[NodeId] {
        match side {
            Side::Left => &self.left_leaves,
            Side::Right => &self.right_leaves,
        }
    }

    pub fn left_virtual(&self) -> &[NodeId] {
        &self.left_virtual
    }

    pub fn right_virtual(&self) -> &[NodeId] {
        &self.right_virtual
    }

    pub fn is_virtual(&self, index: NodeId) -> bool {
        self.nodes.get(index).is_some_and(|n| n.is_virtual)
    }

    /// Error unless `index` names an existing node.
    pub fn check(&self, index: NodeId) -> Result<(), AlignmentError> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(AlignmentError::UnknownNode {
                index,
                nodes: self.nodes.len(),
            })
        }
    }

    /// Append an empty virtual node on `side`.
    pub(crate) fn add_virtual(&mut self, side: Side) -> NodeId {
        let index = self.nodes.len();
        let mut node = Node::new(index, String::new(), Vec::new(), side);
        node.is_virtual = true;
        self.nodes.push(node);
        match side {
            Side::Left => self.left_virtual.push(index),
            Side::Right => self.right_virtual.push(index),
        }
        index
    }

    /// Link two nodes in both directions.
    pub(crate) fn link(&mut self, a: NodeId, b: NodeId) {
        self.nodes[a].alignment.insert(b);
        self.nodes[b].alignment.insert(a);
    }

    /// Pre-order walk of `root` and its descendants along default bracketings.
    pub fn subtree(&self, root: NodeId) -> Subtree<'_> {
        Subtree {
            sentence: self,
            stack: vec![root],
        }
    }

    /// Leaf indices under `root` (just `root` if it is a leaf).
    pub fn leaves_under(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.subtree(root).filter(move |&i| self.nodes[i].is_leaf())
    }

    /// Render the tree-aligner input line: node count, then every node
    /// with its side marker, default children and current alignment.
    pub fn print_tree(&self) -> String {
        let mut items = Vec::with_capacity(self.nodes.len() * 3 + 1);
        items.push(Item::Select(self.nodes.len()));
        for node in &self.nodes {
            items.push(Item::Introduce(node.side, node.index));
            items.push(Item::Children(node.children.clone()));
            items.push(Item::Alignment(node.alignment.iter().copied().collect()));
        }
        notation::render(&items)
    }
}

fn flatten(root: &Lu, side: Side, nodes: &mut Vec<Node>) {
    let mut stack: Vec<(&Lu, Option<NodeId>)> = vec![(root, None)];
    while let Some((lu, parent)) = stack.pop() {
        let index = nodes.len();
        nodes.push(Node::new(index, lu.lemma.clone(), lu.tags.clone(), side));
        if let Some(parent) = parent {
            nodes[parent].children.push(index);
        }
        stack.extend(lu.children.iter().rev().map(|ch| (ch, Some(index))));
    }
}

/// Pre-order iterator over node indices of a sentence subtree.
pub struct Subtree<'a> {
    sentence: &'a Sentence,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Subtree<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let index = self.stack.pop()?;
        self.stack
            .extend(self.sentence.nodes[index].children.iter().rev().copied());
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(sl: &str, tl: &str) -> Sentence {
        Sentence::new(&Lu::parse(sl).unwrap(), &Lu::parse(tl).unwrap())
    }

    #[test]
    fn indices_are_unique_and_source_first() {
        let s = sentence(
            "^S<S>{^NP<NP>{^the<det>$ ^dog<n>$}$ ^sleep<vblex>$}$",
            "^S<S>{^NP<NP>{^el<det>$ ^perro<n>$}$ ^dormir<vblex>$}$",
        );
        assert_eq!(s.len(), 10);
        for (i, node) in s.nodes().iter().enumerate() {
            assert_eq!(node.index, i);
        }
        assert_eq!(s.tl_root(), 5);
        assert!(s
            .nodes()
            .iter()
            .filter(|n| n.side == Side::Left)
            .all(|n| n.index < s.tl_root()));
    }

    #[test]
    fn children_follow_preorder() {
        let s = sentence("^S<S>{^NP<NP>{^a<det>$ ^b<n>$}$ ^c<v>$}$", "^x<n>$");
        assert_eq!(s.node(0).children, vec![1, 4]);
        assert_eq!(s.node(1).children, vec![2, 3]);
        assert_eq!(s.node(0).children_options, vec![vec![1, 4]]);
        assert_eq!(s.node(2).children_options, vec![Vec::<NodeId>::new()]);
    }

    #[test]
    fn leaves_are_partitioned_by_side() {
        let s = sentence(
            "^NP<NP>{^big<adj>$ ^dog<n>$}$",
            "^NP<NP>{^perro<n>$ ^grande<adj>$}$",
        );
        assert_eq!(s.left_leaves(), &[1, 2]);
        assert_eq!(s.right_leaves(), &[4, 5]);
        assert!(s.left_virtual().is_empty());
    }

    #[test]
    fn subtree_walk_includes_root() {
        let s = sentence("^S<S>{^NP<NP>{^a<det>$ ^b<n>$}$ ^c<v>$}$", "^x<n>$");
        assert_eq!(s.subtree(0).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(s.subtree(1).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(s.leaves_under(0).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(s.leaves_under(3).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn prints_tree_aligner_input() {
        let mut s = sentence("^NP<NP>{^big<adj>$ ^dog<n>$}$", "^perro<n>$");
        s.link(2, 3);
        assert_eq!(
            s.print_tree(),
            "4 L0 [ 1 2 ] ( ) L1 [ ] ( ) L2 [ ] ( 3 ) R3 [ ] ( 2 )"
        );
    }

    #[test]
    fn get_returns_none_past_the_last_node() {
        let s = sentence("^a<n>$", "^b<n>$");
        assert_eq!(s.get(1).map(|n| n.lemma.as_str()), Some("b"));
        assert!(s.get(2).is_none());
    }

    #[test]
    fn literal_uses_wildcard_without_tags() {
        let mut s = sentence("^a<n>$", "^el<det><def>$");
        assert_eq!(s.node(1).literal(), "el@det");
        let v = s.add_virtual(Side::Right);
        assert_eq!(s.node(v).pattern_tag(), "*");
        assert!(!s.node(v).has_label());
        assert_eq!(s.right_virtual(), &[v]);
    }
}
