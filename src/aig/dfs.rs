//! Provides a DFS visitor to allow simple AIG traversal.
//!
//! See [`Dfs`] for details.

use std::collections::HashSet;

use crate::{Aig, AigNodeRef, NodeId};

/// A simple DFS visitor over the fanin cones of an AIG.
///
/// Nodes are yielded in preorder. You can:
/// - start a DFS from a node using [`from_node`]
/// - or visit all the AIG by starting from the outputs using [`from_outputs`].
///
/// In the latter case, it will start by the fanin of the first output,
/// then explore all non-previously-explored nodes from the fanin of the second output,
/// and so on until all the outputs have been processed.
///
/// Nodes are immutable, so the visitor holds its own references and does not borrow the AIG.
///
/// [`from_node`]: Dfs::from_node
/// [`from_outputs`]: Dfs::from_outputs
///
/// ```rust
/// use aigprove::{Aig, dfs::Dfs};
/// let mut aig = Aig::new();
/// let x = aig.add_input(1).unwrap();
/// let y = aig.add_input(2).unwrap();
/// let o = aig.and(&x, &y).unwrap();
/// aig.add_output_edge(&o).unwrap();
/// let ids: Vec<_> = Dfs::from_outputs(&aig).map(|node| node.get_id()).collect();
/// assert_eq!(ids[0], 3);
/// assert_eq!(ids.len(), 3);
/// ```
pub struct Dfs {
    /// All nodes on the stack have not been visited yet, and are already in `seen`.
    /// The remaining starting points are in `starts`, they may have been visited meanwhile.
    stack: Vec<AigNodeRef>,
    seen: HashSet<NodeId>,
    starts: Vec<AigNodeRef>,
}

impl Dfs {
    /// Create a DFS from the initial start node.
    /// You will only browse the fanin of this node.
    pub fn from_node(start: AigNodeRef) -> Self {
        Dfs {
            seen: HashSet::from([start.get_id()]),
            stack: vec![start],
            starts: Vec::new(),
        }
    }

    /// Create a DFS from the outputs of the given AIG.
    /// It will explore all the nodes reachable from an output, first output first.
    pub fn from_outputs(aig: &Aig) -> Self {
        let mut starts: Vec<AigNodeRef> = aig
            .get_outputs()
            .iter()
            .rev()
            .map(|output| output.get_node())
            .collect();
        match starts.pop() {
            Some(start) => {
                let mut dfs = Dfs::from_node(start);
                dfs.starts = starts;
                dfs
            }
            None => Dfs {
                stack: Vec::new(),
                seen: HashSet::new(),
                starts,
            },
        }
    }

    /// Returns true if we are ready to start again! Else false, we are done.
    fn new_start(&mut self) -> bool {
        while let Some(node) = self.starts.pop() {
            if self.seen.insert(node.get_id()) {
                self.stack.push(node);
                return true;
            }
        }
        false
    }
}

impl Iterator for Dfs {
    type Item = AigNodeRef;

    fn next(&mut self) -> Option<AigNodeRef> {
        if self.stack.is_empty() && !self.new_start() {
            return None;
        }

        let node = self.stack.pop()?;
        for child in node.get_fanins() {
            if self.seen.insert(child.get_node_id()) {
                self.stack.push(child.get_node());
            }
        }
        Some(node)
    }
}
