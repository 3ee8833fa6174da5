use super::notation::{self, Item};
use crate::error::AlignmentError;
use crate::tree::Sentence;
use crate::types::*;
use tracing::trace;

impl Sentence {
    /// Apply one line of tree-aligner output.
    ///
    /// `L<n>`/`R<n>` introduces virtual node `n`, which must be the next
    /// free index. A bare index selects the node that following `( )` and
    /// `[ ]` lists apply to. List entries may name virtual nodes introduced
    /// later on the same line. Once the line is applied, every `[ ]` list
    /// must name nodes on its owner's side that are not its ancestors. New
    /// virtual nodes are then labelled from their children and their
    /// groupings are spread to every node whose bracketings contain them.
    pub fn add_tree_alignment(&mut self, line: &str) -> Result<(), AlignmentError> {
        let items = notation::parse(line)?;
        let first_new = self.len();
        let mut current: Option<NodeId> = None;
        let mut referenced = Vec::new();
        let mut groupings: Vec<(NodeId, Grouping)> = Vec::new();

        for item in items {
            match item {
                Item::Introduce(side, index) => {
                    if index != self.len() {
                        return Err(AlignmentError::UnexpectedVirtualIndex {
                            expected: self.len(),
                            found: index,
                        });
                    }
                    current = Some(self.add_virtual(side));
                }
                Item::Select(index) => {
                    self.check(index)?;
                    current = Some(index);
                }
                Item::Alignment(targets) => {
                    let node = current.ok_or(AlignmentError::NoContext { open: '(' })?;
                    referenced.extend_from_slice(&targets);
                    self.node_mut(node).alignment.extend(targets);
                }
                Item::Children(grouping) => {
                    let node = current.ok_or(AlignmentError::NoContext { open: '[' })?;
                    if grouping.is_empty() {
                        continue;
                    }
                    if !self.is_virtual(node) && self.node(node).is_leaf() {
                        return Err(AlignmentError::ChildrenOnLeaf { node });
                    }
                    referenced.extend_from_slice(&grouping);
                    groupings.push((node, grouping.clone()));
                    let node = self.node_mut(node);
                    if node.children.is_empty() {
                        node.children = grouping.clone();
                    }
                    node.add_children_option(grouping);
                }
            }
        }

        for index in referenced {
            self.check(index)?;
        }
        for (node, grouping) in &groupings {
            self.check_grouping(*node, grouping)?;
        }

        let new_virtual: Vec<NodeId> = (first_new..self.len()).collect();
        for &v in &new_virtual {
            self.label_virtual(v);
        }
        for &v in &new_virtual {
            self.propagate_grouping(v);
        }
        Ok(())
    }

    /// A child must sit on its parent's side and must not reach back to it.
    fn check_grouping(&self, node: NodeId, grouping: &[NodeId]) -> Result<(), AlignmentError> {
        for &child in grouping {
            if self.node(child).side != self.node(node).side {
                return Err(AlignmentError::CrossSideChild { node, child });
            }
            if self.reaches(child, node) {
                return Err(AlignmentError::CyclicChild { node, child });
            }
        }
        Ok(())
    }

    /// True if `to` is `from` or lies below it in any bracketing.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = vec![false; self.len()];
        let mut stack = vec![from];
        while let Some(n) = stack.pop() {
            if n == to {
                return true;
            }
            if std::mem::replace(&mut seen[n], true) {
                continue;
            }
            stack.extend(self.node(n).children_options.iter().flatten().copied());
        }
        false
    }

    /// Virtual nodes are tagged with their children's primary tags joined by `_`.
    fn label_virtual(&mut self, v: NodeId) {
        let label = self
            .node(v)
            .children
            .iter()
            .map(|&c| self.node(c).pattern_tag())
            .collect::<Vec<_>>()
            .join("_");
        self.node_mut(v).tags = vec![label];
    }

    /// Give every other node an extra bracketing wherever one of `v`'s
    /// groupings occurs as a contiguous run of its children.
    fn propagate_grouping(&mut self, v: NodeId) {
        let groupings = self.node(v).children_options.clone();
        for nd in 0..self.len() {
            if nd == v {
                continue;
            }
            let mut found = Vec::new();
            for existing in &self.node(nd).children_options {
                for grouping in &groupings {
                    if let Some(start) = find_run(existing, grouping) {
                        let mut replaced = existing[..start].to_vec();
                        replaced.push(v);
                        replaced.extend_from_slice(&existing[start + grouping.len()..]);
                        found.push(replaced);
                    }
                }
            }
            for grouping in found {
                if self.node_mut(nd).add_children_option(grouping) {
                    trace!(node = nd, virtual_node = v, "added bracketing");
                }
            }
        }
    }
}

/// Start of the first contiguous occurrence of `needle` in `haystack`.
fn find_run(haystack: &[NodeId], needle: &[NodeId]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
