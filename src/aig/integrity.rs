use std::{collections::HashMap, rc::Rc};

use crate::{Aig, AigEdge, AigError, AigNode, AigNodeRef, NodeId, Result};

impl Aig {
    /// Checking if the AIG structure is correct.
    /// This function was written for debug purposes, as the library is supposed to maintain
    /// integrity of the AIG at any moment.
    pub fn check_integrity(&self) -> Result<()> {
        // Checking that all nodes have relevant id
        // and perform some individual integrity checks
        for (&id, weak_node) in &self.nodes {
            if let Some(node) = weak_node.upgrade() {
                if node.get_id() != id {
                    return Err(AigError::InvalidState("incoherent node id".to_string()));
                }

                self.check_node_integrity(&node)?;
            }
        }

        for (&id, input) in &self.inputs {
            if !matches!(input.as_ref(), AigNode::Input(i) if *i == id) {
                return Err(AigError::InvalidState(format!(
                    "input map entry {} holds node {:?}",
                    id, input
                )));
            }
        }

        // Checking that all outputs are registered as nodes
        for output in &self.outputs {
            self.check_edge_integrity(output).map_err(|_| {
                AigError::InvalidState(format!(
                    "output ({}, {}) refers to a node which is not in the aig",
                    output.get_node_id(),
                    output.get_complement(),
                ))
            })?;
        }

        Ok(())
    }

    /// Check the integrity for an individual node, that is:
    /// - check that only `False` have id 0
    /// - check that fanins (`AigEdge`) of and gates are valid too
    ///   (ie they refer to a known node for this AIG)
    fn check_node_integrity(&self, node: &AigNodeRef) -> Result<()> {
        match node.as_ref() {
            AigNode::False => {
                if !Rc::ptr_eq(node, &self.node_false) {
                    return Err(AigError::InvalidState("invalid false node".to_string()));
                }
            }
            AigNode::Input(id) => {
                if *id == 0 {
                    return Err(AigError::IdZeroButNotFalse);
                }
            }
            AigNode::And {
                id, fanin0, fanin1, ..
            } => {
                if *id == 0 {
                    return Err(AigError::IdZeroButNotFalse);
                }
                if *id >= self.next_id {
                    return Err(AigError::InvalidState(format!(
                        "and gate {} is beyond the next free id {}",
                        id, self.next_id
                    )));
                }
                self.check_edge_integrity(fanin0)?;
                self.check_edge_integrity(fanin1)?;
            }
        }
        Ok(())
    }

    fn check_edge_integrity(&self, fanin: &AigEdge) -> Result<()> {
        let id = fanin.get_node_id();
        match self.get_node(id) {
            Some(node) if Rc::ptr_eq(&node, &fanin.node) => Ok(()),
            _ => Err(AigError::InvalidState(format!(
                "edge pointing at node {} which is not in the AIG anymore",
                id
            ))),
        }
    }

    /// Tests if the AIG is in canonical (structurally hashed) form:
    /// - no and gate has a constant fanin
    /// - no and gate uses the same node twice (`x & x` or `x & !x`)
    /// - fanins are ordered, such as for all gate z = and(a, b), $id(z) \gt id(a) \gt id(b)$
    /// - no two gates have the same fanins.
    ///
    /// AIGs built with [`Aig::and`] always pass this check, use [`Aig::strash`] to get there.
    pub fn check_strashed(&self) -> Result<()> {
        self.check_integrity()?;

        let mut seen: HashMap<(NodeId, bool, NodeId, bool), NodeId> = HashMap::new();
        for node in self.nodes.values().filter_map(|weak| weak.upgrade()) {
            if let AigNode::And {
                id, fanin0, fanin1, ..
            } = node.as_ref()
            {
                let (i0, i1) = (fanin0.get_node_id(), fanin1.get_node_id());
                if fanin0.is_cst() || fanin1.is_cst() {
                    return Err(AigError::InvalidState(format!(
                        "and gate {} has a constant fanin",
                        id
                    )));
                }
                if i0 == i1 {
                    return Err(AigError::InvalidState(format!(
                        "and gate {} uses node {} twice",
                        id, i0
                    )));
                }
                if *id <= i0 || i0 < i1 {
                    return Err(AigError::InvalidState(format!(
                        "and gate {} has unordered fanins {} and {}",
                        id, i0, i1
                    )));
                }
                let key = (i0, fanin0.get_complement(), i1, fanin1.get_complement());
                if let Some(other) = seen.insert(key, *id) {
                    return Err(AigError::InvalidState(format!(
                        "and gates {} and {} are structurally identical",
                        other, id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Convenience wrapper around [`Aig::check_strashed`].
    pub fn is_strashed(&self) -> bool {
        self.check_strashed().is_ok()
    }
}
