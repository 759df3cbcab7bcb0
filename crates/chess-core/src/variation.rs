//! Tree of engine-suggested moves rooted at one corrective move.

use shakmaty::{Chess, Move};

use crate::position::{after, legal_uci, uci_of};

/// A move plus its continuations. Children are owned exclusively by their
/// parent; a tree is never shared or cyclic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationNode {
    pub mv: Move,
    pub uci: String,
    pub children: Vec<VariationNode>,
}

impl VariationNode {
    pub fn new(mv: Move) -> Self {
        let uci = uci_of(&mv);
        Self {
            mv,
            uci,
            children: Vec::new(),
        }
    }

    /// Plies on the longest root-to-leaf path (a lone root is 1).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Root followed by the first child at every level.
    pub fn main_line(&self) -> Vec<&str> {
        let mut line = vec![self.uci.as_str()];
        let mut node = self;
        while let Some(first) = node.children.first() {
            line.push(first.uci.as_str());
            node = first;
        }
        line
    }

    /// Every root-to-leaf path as move codes.
    pub fn paths(&self) -> Vec<Vec<String>> {
        if self.children.is_empty() {
            return vec![vec![self.uci.clone()]];
        }
        self.children
            .iter()
            .flat_map(Self::paths)
            .map(|mut tail| {
                tail.insert(0, self.uci.clone());
                tail
            })
            .collect()
    }

    /// True when every move on every root-to-node path is legal, replaying
    /// from `pos`.
    pub fn is_legal_from(&self, pos: &Chess) -> bool {
        match legal_uci(pos, &self.uci) {
            Some(mv) => {
                let next = after(pos, &mv);
                self.children.iter().all(|child| child.is_legal_from(&next))
            }
            None => false,
        }
    }
}
