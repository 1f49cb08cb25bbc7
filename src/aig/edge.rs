//! An [`AigEdge`] points at an [`AigNode`] and can be complemented (indicates the presence of a NOT gate).
//!
//! [`AigNode`]: crate::AigNode

use std::ops::Not;

use crate::NodeId;

use super::AigNodeRef;

/// A directed edge representing a fanin (or an output) of AIG nodes.
///
/// The edge can carry an inverter according to the value of `complement`.
///
/// For example:
///
/// ```rust
/// use aigprove::Aig;
/// let aig = Aig::new();
/// let fanin_false = aig.false_edge();
/// let fanin_true = aig.true_edge();
/// assert_eq!(fanin_false, !fanin_true);
/// ```
#[derive(Clone, Debug, Eq)]
pub struct AigEdge {
    /// The node the edge is refering to.
    pub(super) node: AigNodeRef,
    /// Set to true if signal should be inverted.
    pub(super) complement: bool,
}

impl Not for AigEdge {
    type Output = Self;

    fn not(mut self) -> Self::Output {
        self.complement = !self.complement;
        self
    }
}

impl PartialEq for AigEdge {
    fn eq(&self, other: &Self) -> bool {
        self.complement == other.complement && self.get_node_id() == other.get_node_id()
    }
}

impl From<&AigEdge> for (NodeId, bool) {
    fn from(edge: &AigEdge) -> Self {
        (edge.get_node_id(), edge.get_complement())
    }
}

impl AigEdge {
    pub fn new(node: AigNodeRef, complement: bool) -> Self {
        AigEdge { node, complement }
    }

    pub fn get_node(&self) -> AigNodeRef {
        self.node.clone()
    }

    pub fn get_node_id(&self) -> NodeId {
        self.node.get_id()
    }

    pub fn get_complement(&self) -> bool {
        self.complement
    }

    /// Returns the same edge, complemented iff `complement` is set.
    pub fn complement_if(self, complement: bool) -> Self {
        if complement { !self } else { self }
    }

    pub fn is_cst_false(&self) -> bool {
        self.get_node_id() == 0 && !self.complement
    }

    pub fn is_cst_true(&self) -> bool {
        self.get_node_id() == 0 && self.complement
    }

    pub fn is_cst(&self) -> bool {
        self.get_node_id() == 0
    }

    pub fn is_complement_of(&self, other: &AigEdge) -> bool {
        self.get_node_id() == other.get_node_id() && self.get_complement() ^ other.get_complement()
    }
}
