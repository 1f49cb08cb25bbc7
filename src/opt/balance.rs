//! Depth reduction of AND trees.
//!
//! An and gate whose only use is a non complemented fanin of another and gate is absorbed into
//! that gate: both belong to the same multi-input AND (a "supergate"). Each supergate is rebuilt
//! as a tree where the two shallowest operands are always combined first.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, HashSet},
};

use crate::{Aig, AigEdge, AigNode, AigNodeRef, NodeId, Result, aig::map_edge};

/// Ids of the and gates absorbed by their single fanout.
fn interior_nodes(aig: &Aig, order: &[AigNodeRef]) -> HashSet<NodeId> {
    let mut fanouts: HashMap<NodeId, usize> = HashMap::new();
    let mut complemented: HashSet<NodeId> = HashSet::new();
    for node in order {
        for fanin in node.get_fanins() {
            *fanouts.entry(fanin.get_node_id()).or_default() += 1;
            if fanin.get_complement() {
                complemented.insert(fanin.get_node_id());
            }
        }
    }
    let outputs: HashSet<NodeId> = aig
        .get_outputs()
        .iter()
        .map(AigEdge::get_node_id)
        .collect();

    order
        .iter()
        .filter(|node| node.is_and())
        .map(|node| node.get_id())
        .filter(|id| {
            fanouts.get(id) == Some(&1) && !complemented.contains(id) && !outputs.contains(id)
        })
        .collect()
}

/// Operands of the supergate rooted at `root` (edges of the source AIG).
///
/// Returns `None` when two operands are complementary, ie when the supergate is constant false.
fn supergate_leaves(root: &AigNodeRef, interior: &HashSet<NodeId>) -> Option<Vec<AigEdge>> {
    let mut leaves: Vec<AigEdge> = Vec::new();
    let mut stack = root.get_fanins();
    while let Some(edge) = stack.pop() {
        if !edge.get_complement() && interior.contains(&edge.get_node_id()) {
            stack.extend(edge.get_node().get_fanins());
        } else if leaves.iter().any(|leaf| leaf.is_complement_of(&edge)) {
            return None;
        } else if !leaves.contains(&edge) {
            leaves.push(edge);
        }
    }
    Some(leaves)
}

/// Level of an edge of the AIG being built.
fn level(levels: &HashMap<NodeId, u32>, edge: &AigEdge) -> u32 {
    levels.get(&edge.get_node_id()).copied().unwrap_or(0)
}

/// AND of all `operands`, pairing the lowest levels first.
fn balanced_and(
    aig: &mut Aig,
    levels: &mut HashMap<NodeId, u32>,
    operands: Vec<AigEdge>,
) -> Result<AigEdge> {
    let mut edges = Vec::with_capacity(operands.len() * 2);
    let mut heap = BinaryHeap::new();
    for edge in operands {
        heap.push(Reverse((level(levels, &edge), edges.len())));
        edges.push(edge);
    }

    loop {
        let Some(Reverse((_, i))) = heap.pop() else {
            return Ok(aig.true_edge());
        };
        let Some(Reverse((_, j))) = heap.pop() else {
            return Ok(edges[i].clone());
        };
        let edge = aig.and(&edges[i], &edges[j])?;
        if edge.get_node().is_and() {
            let new_level = level(levels, &edges[i]).max(level(levels, &edges[j])) + 1;
            levels.entry(edge.get_node_id()).or_insert(new_level);
        }
        heap.push(Reverse((level(levels, &edge), edges.len())));
        edges.push(edge);
    }
}

/// Rebuilds the network with balanced AND trees.
pub fn balance(aig: &Aig) -> Result<Aig> {
    let order = aig.get_topological_sort();
    let interior = interior_nodes(aig, &order);

    let mut new = aig.empty_like()?;
    let mut map: HashMap<NodeId, AigEdge> = HashMap::from([(0, new.false_edge())]);
    for id in aig.get_inputs_id() {
        map.insert(id, new.input_edge(id)?);
    }
    let mut levels: HashMap<NodeId, u32> = HashMap::new();

    for node in &order {
        if let AigNode::And { id, .. } = node.as_ref() {
            if interior.contains(id) {
                continue;
            }
            let edge = match supergate_leaves(node, &interior) {
                Some(leaves) => {
                    let operands = leaves
                        .iter()
                        .map(|leaf| map_edge(&map, leaf))
                        .collect::<Result<Vec<_>>>()?;
                    balanced_and(&mut new, &mut levels, operands)?
                }
                None => new.false_edge(),
            };
            map.insert(*id, edge);
        }
    }

    for output in aig.get_outputs() {
        let edge = map_edge(&map, &output)?;
        new.add_output_edge(&edge)?;
    }
    new.update();

    log::trace!(
        "balance: {} -> {} levels, {} -> {} nodes",
        aig.level_count(),
        new.level_count(),
        aig.node_count(),
        new.node_count()
    );
    Ok(new)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn equivalent(a: &Aig, b: &Aig) -> bool {
        let n = a.input_count();
        (0..1u32 << n).all(|bits| {
            let v: Vec<bool> = (0..n).map(|k| bits >> k & 1 == 1).collect();
            a.evaluate(&v).unwrap() == b.evaluate(&v).unwrap()
        })
    }

    #[test]
    fn chain_becomes_tree() {
        let mut aig = Aig::new();
        let inputs: Vec<AigEdge> = (1..=8).map(|id| aig.add_input(id).unwrap()).collect();
        let mut o = inputs[0].clone();
        for x in &inputs[1..] {
            o = aig.and(&o, x).unwrap();
        }
        aig.add_output_edge(&o).unwrap();
        aig.update();
        assert_eq!(aig.level_count(), 7);

        let new = balance(&aig).unwrap();
        assert_eq!(new.level_count(), 3);
        assert_eq!(new.node_count(), 7);
        assert!(new.is_strashed());
        assert!(equivalent(&aig, &new));
    }

    #[test]
    fn shared_and_complemented_gates_are_kept() {
        // s = x & y is used twice, n = z & w only through its complement
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let z = aig.add_input(3).unwrap();
        let w = aig.add_input(4).unwrap();
        let s = aig.and(&x, &y).unwrap();
        let n = aig.and(&z, &w).unwrap();
        let a = aig.and(&s, &z).unwrap();
        let b = aig.and(&s, &!n.clone()).unwrap();
        aig.add_output_edge(&a).unwrap();
        aig.add_output_edge(&b).unwrap();
        aig.update();

        let new = balance(&aig).unwrap();
        assert_eq!(new.node_count(), aig.node_count());
        assert!(equivalent(&aig, &new));
    }

    #[test]
    fn duplicated_and_opposite_operands() {
        // (x & y) & (x & !y) = 0 once the supergate is flattened
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let l = aig.and(&x, &y).unwrap();
        let r = aig.and(&x, &!y.clone()).unwrap();
        let o = aig.and(&l, &r).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();

        let new = balance(&aig).unwrap();
        assert!(equivalent(&aig, &new));
        assert_eq!(new.output_constant(0), Some(false));
    }
}
