//! Cut-based refactoring.
//!
//! Every and gate is looked at through a small reconvergence-driven cut. The function of the gate
//! over the cut leaves is computed as a truth table. When the gate turns out to be constant, or does
//! not depend on all the leaves, it is re-synthesized from its true support by Shannon expansion,
//! and the new cone is kept if it is smaller.

use std::collections::{HashMap, HashSet};

use crate::{Aig, AigEdge, AigError, AigNode, AigNodeRef, NodeId, Result};

/// Largest supported cut: a truth table fits in one `u64`.
const MAX_CUT_SIZE: usize = 6;

/// `VAR_MASKS[j]` is the truth table of the j-th leaf.
const VAR_MASKS: [u64; MAX_CUT_SIZE] = [
    0xAAAA_AAAA_AAAA_AAAA,
    0xCCCC_CCCC_CCCC_CCCC,
    0xF0F0_F0F0_F0F0_F0F0,
    0xFF00_FF00_FF00_FF00,
    0xFFFF_0000_FFFF_0000,
    0xFFFF_FFFF_0000_0000,
];

/// Parameters of [`refactor_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefactorParams {
    /// Maximum number of leaves of a cut (at most 6).
    pub cut_size: usize,
}

impl Default for RefactorParams {
    fn default() -> Self {
        RefactorParams {
            cut_size: MAX_CUT_SIZE,
        }
    }
}

/// A cut of a node: its leaves and the and gates between the leaves and the root (root included).
struct Cut {
    leaves: Vec<AigNodeRef>,
    inner: Vec<AigNodeRef>,
}

/// Grows a cut from the fanins of `root`, expanding first the leaves adding the fewest new leaves.
fn reconvergence_cut(root: &AigNodeRef, cut_size: usize) -> Cut {
    let mut visited: HashSet<NodeId> = HashSet::from([root.get_id()]);
    let mut leaves = Vec::new();
    for fanin in root.get_fanins() {
        if visited.insert(fanin.get_node_id()) {
            leaves.push(fanin.get_node());
        }
    }
    let mut inner = vec![root.clone()];

    loop {
        let best = leaves
            .iter()
            .enumerate()
            .filter(|(_, leaf)| leaf.is_and())
            .map(|(k, leaf)| {
                let new_leaves = leaf
                    .get_fanins()
                    .iter()
                    .filter(|fanin| !visited.contains(&fanin.get_node_id()))
                    .count();
                (new_leaves, k)
            })
            .min();

        match best {
            Some((new_leaves, k)) if leaves.len() + new_leaves <= cut_size + 1 => {
                let leaf = leaves.swap_remove(k);
                for fanin in leaf.get_fanins() {
                    if visited.insert(fanin.get_node_id()) {
                        leaves.push(fanin.get_node());
                    }
                }
                inner.push(leaf);
            }
            _ => break,
        }
    }

    Cut { leaves, inner }
}

/// Truth table of the cut root over the cut leaves.
fn cut_truth_table(cut: &Cut) -> Result<u64> {
    let mut tables: HashMap<NodeId, u64> = HashMap::new();
    for (leaf, mask) in cut.leaves.iter().zip(VAR_MASKS) {
        tables.insert(leaf.get_id(), mask);
    }

    // Gates are created after their fanins, ids give a topological order
    let mut inner = cut.inner.clone();
    inner.sort_by_key(|node| node.get_id());
    for node in &inner {
        if let AigNode::And {
            id, fanin0, fanin1, ..
        } = node.as_ref()
        {
            let table = |edge: &AigEdge| -> Result<u64> {
                let t = *tables
                    .get(&edge.get_node_id())
                    .ok_or(AigError::NodeDoesNotExist(edge.get_node_id()))?;
                Ok(if edge.get_complement() { !t } else { t })
            };
            let t = table(fanin0)? & table(fanin1)?;
            tables.insert(*id, t);
        }
    }

    let root = cut
        .inner
        .first()
        .ok_or(AigError::InvalidState("empty cut".to_string()))?;
    tables
        .get(&root.get_id())
        .copied()
        .ok_or(AigError::NodeDoesNotExist(root.get_id()))
}

/// Cofactors of `table` with respect to leaf `var`, as full tables.
fn cofactors(table: u64, var: usize) -> (u64, u64) {
    let mask = VAR_MASKS[var];
    let shift = 1 << var;
    let pos = table & mask;
    let neg = table & !mask;
    (neg | (neg << shift), pos | (pos >> shift))
}

/// Leaves the function depends on.
fn support(table: u64, n_leaves: usize) -> Vec<usize> {
    (0..n_leaves)
        .filter(|&var| {
            let (neg, pos) = cofactors(table, var);
            neg != pos
        })
        .collect()
}

/// Builds `table` over `leaves` by Shannon expansion on `vars` (last one first).
fn synthesize(aig: &mut Aig, table: u64, vars: &[usize], leaves: &[AigEdge]) -> Result<AigEdge> {
    if table == 0 {
        return Ok(aig.false_edge());
    }
    if table == u64::MAX {
        return Ok(aig.true_edge());
    }
    let Some((&var, rest)) = vars.split_last() else {
        return Err(AigError::InvalidState(format!(
            "truth table {:#x} is not constant but has no support",
            table
        )));
    };
    let (neg, pos) = cofactors(table, var);
    if neg == pos {
        return synthesize(aig, neg, rest, leaves);
    }
    let then_edge = synthesize(aig, pos, rest, leaves)?;
    let else_edge = synthesize(aig, neg, rest, leaves)?;
    aig.mux(&leaves[var], &then_edge, &else_edge)
}

/// Number of and gates between `edge` and the `leaves`.
fn cone_size(edge: &AigEdge, leaves: &HashSet<NodeId>) -> usize {
    let mut seen = HashSet::new();
    let mut stack = vec![edge.get_node()];
    while let Some(node) = stack.pop() {
        if !node.is_and() || leaves.contains(&node.get_id()) || !seen.insert(node.get_id()) {
            continue;
        }
        for fanin in node.get_fanins() {
            stack.push(fanin.get_node());
        }
    }
    seen.len()
}

/// `f0 & f1`, re-synthesized from its cut when this makes it smaller.
fn and_refactor(aig: &mut Aig, f0: &AigEdge, f1: &AigEdge, params: &RefactorParams) -> Result<AigEdge> {
    let edge = aig.and(f0, f1)?;
    let node = edge.get_node();
    if !node.is_and() {
        return Ok(edge);
    }

    let cut = reconvergence_cut(&node, params.cut_size.min(MAX_CUT_SIZE));
    let table = cut_truth_table(&cut)?;
    let vars = support(table, cut.leaves.len());
    if table != 0 && table != u64::MAX && vars.len() == cut.leaves.len() {
        return Ok(edge);
    }

    let leaves: Vec<AigEdge> = cut
        .leaves
        .iter()
        .map(|leaf| AigEdge::new(leaf.clone(), false))
        .collect();
    let candidate = synthesize(aig, table, &vars, &leaves)?;
    let leaf_ids: HashSet<NodeId> = cut.leaves.iter().map(|leaf| leaf.get_id()).collect();
    if cone_size(&candidate, &leaf_ids) < cut.inner.len() {
        Ok(candidate.complement_if(edge.get_complement()))
    } else {
        Ok(edge)
    }
}

/// Refactors the network with default parameters.
pub fn refactor(aig: &Aig) -> Result<Aig> {
    refactor_with(aig, &RefactorParams::default())
}

/// Rebuilds the network, refactoring every gate.
pub fn refactor_with(aig: &Aig, params: &RefactorParams) -> Result<Aig> {
    let new = aig.rebuild_with(|target, _, f0, f1| and_refactor(target, &f0, &f1, params))?;
    log::trace!(
        "refactor: {} -> {} nodes",
        aig.node_count(),
        new.node_count()
    );
    Ok(new)
}
