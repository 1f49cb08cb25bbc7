use std::collections::HashMap;

use crate::{Aig, AigEdge, AigError, AigNode, NodeId, Result};

/// Translates an edge of a source AIG into the target AIG, given the node mapping.
pub(crate) fn map_edge(map: &HashMap<NodeId, AigEdge>, edge: &AigEdge) -> Result<AigEdge> {
    let id = edge.get_node_id();
    map.get(&id)
        .cloned()
        .map(|mapped| mapped.complement_if(edge.get_complement()))
        .ok_or(AigError::NodeDoesNotExist(id))
}

impl Aig {
    /// A brand new AIG with the same primary inputs (same ids, same order) and no output.
    pub fn empty_like(&self) -> Result<Aig> {
        let mut aig = Aig::new();
        for id in self.get_inputs_id() {
            aig.add_input(id)?;
        }
        Ok(aig)
    }

    /// Copies the logic of `self` into `target`, which must declare every input of `self`.
    ///
    /// The and gates reachable from the outputs are visited in topological order, and `gate`
    /// builds each of them in `target` from its already translated fanins.
    /// Returns the translated outputs, `target` outputs are left untouched.
    pub(crate) fn copy_into_with<F>(&self, target: &mut Aig, mut gate: F) -> Result<Vec<AigEdge>>
    where
        F: FnMut(&mut Aig, &AigNode, AigEdge, AigEdge) -> Result<AigEdge>,
    {
        let mut map: HashMap<NodeId, AigEdge> = HashMap::new();
        map.insert(0, target.false_edge());
        for id in self.get_inputs_id() {
            map.insert(id, target.input_edge(id)?);
        }

        for node in self.get_topological_sort() {
            if let AigNode::And {
                id, fanin0, fanin1, ..
            } = node.as_ref()
            {
                let f0 = map_edge(&map, fanin0)?;
                let f1 = map_edge(&map, fanin1)?;
                let edge = gate(target, &node, f0, f1)?;
                map.insert(*id, edge);
            }
        }

        self.outputs
            .iter()
            .map(|output| map_edge(&map, output))
            .collect()
    }

    /// Rebuilds the whole AIG, `gate` being responsible for each and gate (see [`Aig::copy_into_with`]).
    pub(crate) fn rebuild_with<F>(&self, gate: F) -> Result<Aig>
    where
        F: FnMut(&mut Aig, &AigNode, AigEdge, AigEdge) -> Result<AigEdge>,
    {
        let mut aig = self.empty_like()?;
        let outputs = self.copy_into_with(&mut aig, gate)?;
        for output in &outputs {
            aig.add_output_edge(output)?;
        }
        aig.update();
        Ok(aig)
    }

    /// Returns a structurally hashed copy of the AIG.
    ///
    /// We are not just incrementing reference counters, but instead creating
    /// brand new nodes, completely unrelated with the previous AIG.
    /// Every gate goes through [`Aig::and`], so the result is in canonical form,
    /// has no dangling logic, and keeps the inputs (ids and order) and the outputs (order).
    pub fn strash(&self) -> Result<Aig> {
        let aig = self.rebuild_with(|aig, _, f0, f1| aig.and(&f0, &f1))?;
        aig.check_integrity()?;
        Ok(aig)
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{Aig, AigNode};

    #[test]
    fn strash_merges_duplicates() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        aig.add_node(AigNode::and(3, y.clone(), x.clone())).unwrap();
        aig.add_node(AigNode::and(4, x.clone(), y.clone())).unwrap();
        aig.add_output(3, false).unwrap();
        aig.add_output(4, true).unwrap();
        aig.update();
        assert_eq!(aig.node_count(), 2);

        let s = aig.strash().unwrap();
        assert_eq!(s.node_count(), 1);
        assert_eq!(s.get_inputs_id(), vec![1, 2]);
        let outputs = s.get_outputs();
        assert!(outputs[0].is_complement_of(&outputs[1]));
    }

    #[test]
    fn strash_is_a_deep_copy() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let o = aig.and(&x, &y).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();

        let s = aig.strash().unwrap();
        assert_eq!(aig, s);
        assert!(!Rc::ptr_eq(
            &aig.get_node(3).unwrap(),
            &s.get_node(3).unwrap()
        ));
    }

    #[test]
    fn strash_keeps_unused_inputs() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        aig.add_input(2).unwrap();
        aig.add_output_edge(&!x).unwrap();
        let s = aig.strash().unwrap();
        assert_eq!(s.input_count(), 2);
        assert_eq!(s.evaluate(&[false, true]).unwrap(), vec![true]);
    }
}
