use std::rc::{Rc, Weak};

use super::AigEdge;

/// A node id.
///
/// The constant node [`AigNode::False`] has id 0 by convention. Also, id must be unique.
pub type NodeId = u64;

/// An AIG node.
///
/// Each node has an id. By convention, id for constant node `False` is 0. The id must be unique.
///
/// Nodes are immutable once created: a network is transformed by rebuilding it
/// through the structural hashing table, never by patching nodes in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AigNode {
    /// The constant low/false signal.
    False,
    /// A primary input.
    Input(NodeId),
    /// An AND gate with two fanins.
    And {
        id: NodeId,
        fanin0: AigEdge,
        fanin1: AigEdge,
    },
}

/// A wrapper for AIG nodes to allow multiple references to it.
pub type AigNodeRef = Rc<AigNode>;

/// A non-counting reference to an AIG node - used internally.
pub(crate) type AigNodeWeak = Weak<AigNode>;

impl AigNode {
    /// Returns a new and gate.
    pub fn and(id: NodeId, fanin0: AigEdge, fanin1: AigEdge) -> Self {
        if id == 0 {
            panic!(
                "Hey, you are trying to create an AND gate with id=0. \
                Id=0 is reserved for the constant node AigNode::False."
            )
        }
        AigNode::And { id, fanin0, fanin1 }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, AigNode::False)
    }

    pub fn is_input(&self) -> bool {
        matches!(self, AigNode::Input(_))
    }

    pub fn is_and(&self) -> bool {
        matches!(self, AigNode::And { .. })
    }

    pub fn get_id(&self) -> NodeId {
        match *self {
            AigNode::False => 0,
            AigNode::Input(id) => id,
            AigNode::And { id, .. } => id,
        }
    }

    pub fn get_fanins(&self) -> Vec<AigEdge> {
        match self {
            AigNode::And { fanin0, fanin1, .. } => vec![fanin0.clone(), fanin1.clone()],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{AigEdge, AigNode};

    #[test]
    #[should_panic]
    fn add_node_test_invalid_and_id0() {
        let nf = Rc::new(AigNode::False);
        let _ = AigNode::and(0, AigEdge::new(nf.clone(), false), AigEdge::new(nf, false));
    }

    #[test]
    fn node_kinds() {
        let nf = Rc::new(AigNode::False);
        let i1 = Rc::new(AigNode::Input(1));
        let a2 = AigNode::and(2, AigEdge::new(i1.clone(), false), AigEdge::new(nf, true));
        assert!(a2.is_and());
        assert_eq!(a2.get_id(), 2);
        assert_eq!(a2.get_fanins().len(), 2);
        assert!(i1.is_input());
        assert!(i1.get_fanins().is_empty());
    }
}
