//! Reduced ordered binary decision diagrams, and the collapsing of an AIG into one.
//!
//! The diagram of every output is built bottom-up over the AIG. Construction gives up as soon as
//! the manager holds more nodes than allowed, which keeps the memory of a collapse bounded.

use std::collections::HashMap;

use crate::{Aig, AigEdge, AigNode, NodeId, Result, dfs::Dfs};

/// Reference to a node of a [`BddManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BddRef(u32);

impl BddRef {
    pub const FALSE: BddRef = BddRef(0);
    pub const TRUE: BddRef = BddRef(1);

    pub fn is_const(self) -> bool {
        self.0 < 2
    }
}

#[derive(Debug, Clone, Copy)]
struct BddNode {
    /// Position of the variable in the order, terminals are below every variable.
    var: u32,
    low: BddRef,
    high: BddRef,
}

/// A BDD manager with a bounded number of nodes.
#[derive(Debug)]
pub struct BddManager {
    nodes: Vec<BddNode>,
    unique: HashMap<(u32, BddRef, BddRef), BddRef>,
    and_cache: HashMap<(BddRef, BddRef), BddRef>,
    not_cache: HashMap<BddRef, BddRef>,
    node_limit: usize,
}

impl BddManager {
    /// A manager holding at most `node_limit` nodes (terminals included), 0 for no limit.
    pub fn new(node_limit: usize) -> Self {
        let terminal = BddNode {
            var: u32::MAX,
            low: BddRef::FALSE,
            high: BddRef::FALSE,
        };
        BddManager {
            nodes: vec![terminal, terminal],
            unique: HashMap::new(),
            and_cache: HashMap::new(),
            not_cache: HashMap::new(),
            node_limit,
        }
    }

    /// Number of nodes, terminals included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn var_of(&self, f: BddRef) -> u32 {
        self.nodes[f.0 as usize].var
    }

    /// The node `if var then high else low`, `None` when the limit is reached.
    fn make(&mut self, var: u32, low: BddRef, high: BddRef) -> Option<BddRef> {
        if low == high {
            return Some(low);
        }
        if let Some(&node) = self.unique.get(&(var, low, high)) {
            return Some(node);
        }
        if self.node_limit > 0 && self.nodes.len() >= self.node_limit {
            return None;
        }
        let node = BddRef(self.nodes.len() as u32);
        self.nodes.push(BddNode { var, low, high });
        self.unique.insert((var, low, high), node);
        Some(node)
    }

    /// The diagram of the variable at position `var` of the order.
    pub fn var(&mut self, var: u32) -> Option<BddRef> {
        self.make(var, BddRef::FALSE, BddRef::TRUE)
    }

    /// Cofactors of `f` with respect to the variable at position `var`.
    fn cofactors(&self, f: BddRef, var: u32) -> (BddRef, BddRef) {
        let node = self.nodes[f.0 as usize];
        if node.var == var {
            (node.low, node.high)
        } else {
            (f, f)
        }
    }

    pub fn not(&mut self, f: BddRef) -> Option<BddRef> {
        match f {
            BddRef::FALSE => return Some(BddRef::TRUE),
            BddRef::TRUE => return Some(BddRef::FALSE),
            _ => (),
        }
        if let Some(&res) = self.not_cache.get(&f) {
            return Some(res);
        }
        let node = self.nodes[f.0 as usize];
        let low = self.not(node.low)?;
        let high = self.not(node.high)?;
        let res = self.make(node.var, low, high)?;
        self.not_cache.insert(f, res);
        Some(res)
    }

    pub fn and(&mut self, f: BddRef, g: BddRef) -> Option<BddRef> {
        if f == BddRef::FALSE || g == BddRef::FALSE {
            return Some(BddRef::FALSE);
        }
        if f == BddRef::TRUE || f == g {
            return Some(g);
        }
        if g == BddRef::TRUE {
            return Some(f);
        }
        let key = (f.min(g), f.max(g));
        if let Some(&res) = self.and_cache.get(&key) {
            return Some(res);
        }

        let var = self.var_of(f).min(self.var_of(g));
        let (f0, f1) = self.cofactors(f, var);
        let (g0, g1) = self.cofactors(g, var);
        let low = self.and(f0, g0)?;
        let high = self.and(f1, g1)?;
        let res = self.make(var, low, high)?;
        self.and_cache.insert(key, res);
        Some(res)
    }

    /// Value of `f` for an assignment given in variable order.
    pub fn eval(&self, mut f: BddRef, assignment: &[bool]) -> bool {
        while !f.is_const() {
            let node = self.nodes[f.0 as usize];
            f = if assignment[node.var as usize] {
                node.high
            } else {
                node.low
            };
        }
        f == BddRef::TRUE
    }
}

/// Variable order: the inputs in order of first appearance in a depth-first traversal
/// of the outputs, followed by the unused inputs.
fn dfs_order(aig: &Aig) -> Vec<NodeId> {
    let mut order: Vec<NodeId> = Dfs::from_outputs(aig)
        .filter(|node| node.is_input())
        .map(|node| node.get_id())
        .collect();
    for id in aig.get_inputs_id() {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}

/// Diagrams of the outputs of `aig`, `None` when the manager overflows.
fn build(aig: &Aig, manager: &mut BddManager, order: &[NodeId]) -> Option<Vec<BddRef>> {
    let mut bdds: HashMap<NodeId, BddRef> = HashMap::from([(0, BddRef::FALSE)]);
    for (position, &id) in order.iter().enumerate() {
        bdds.insert(id, manager.var(position as u32)?);
    }

    let edge_bdd = |manager: &mut BddManager, bdds: &HashMap<NodeId, BddRef>, edge: &AigEdge| {
        let f = *bdds.get(&edge.get_node_id())?;
        if edge.get_complement() {
            manager.not(f)
        } else {
            Some(f)
        }
    };

    for node in aig.get_topological_sort() {
        if let AigNode::And {
            id, fanin0, fanin1, ..
        } = node.as_ref()
        {
            let f = edge_bdd(manager, &bdds, fanin0)?;
            let g = edge_bdd(manager, &bdds, fanin1)?;
            let res = manager.and(f, g)?;
            bdds.insert(*id, res);
        }
    }

    aig.get_outputs()
        .iter()
        .map(|output| edge_bdd(manager, &bdds, output))
        .collect()
}

/// Collapses `aig` into BDDs and rebuilds it as a tree of multiplexers.
///
/// With `reorder`, variables follow a depth-first traversal of the outputs, which keeps related
/// inputs close to each other; otherwise they follow the input declaration order.
/// Returns `None` when more than `node_limit` BDD nodes would be needed.
pub fn collapse(aig: &Aig, node_limit: usize, reorder: bool) -> Result<Option<Aig>> {
    let order = if reorder {
        dfs_order(aig)
    } else {
        aig.get_inputs_id()
    };
    let mut manager = BddManager::new(node_limit);
    let Some(outputs) = build(aig, &mut manager, &order) else {
        log::debug!("bdd: node limit {} reached", node_limit);
        return Ok(None);
    };
    log::debug!("bdd: {} nodes", manager.node_count());

    let mut new = aig.empty_like()?;
    let inputs: Vec<AigEdge> = order
        .iter()
        .map(|&id| new.input_edge(id))
        .collect::<Result<_>>()?;

    // Indexed by BddRef, children always have smaller references than their parents
    let mut edges: Vec<AigEdge> = vec![new.false_edge(), new.true_edge()];
    for node in manager.nodes.iter().skip(2) {
        let low = edges[node.low.0 as usize].clone();
        let high = edges[node.high.0 as usize].clone();
        let edge = new.mux(&inputs[node.var as usize], &high, &low)?;
        edges.push(edge);
    }
    for output in outputs {
        new.add_output_edge(&edges[output.0 as usize])?;
    }
    new.update();
    Ok(Some(new))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn xor_chain(n: NodeId) -> Aig {
        let mut aig = Aig::new();
        let xs: Vec<AigEdge> = (1..=n).map(|id| aig.add_input(id).unwrap()).collect();
        let mut o = aig.false_edge();
        for x in &xs {
            o = aig.xor(&o, x).unwrap();
        }
        aig.add_output_edge(&o).unwrap();
        aig.update();
        aig
    }

    #[test]
    fn manager_is_canonical() {
        let mut m = BddManager::new(0);
        let x = m.var(0).unwrap();
        let y = m.var(1).unwrap();
        let xy = m.and(x, y).unwrap();
        assert_eq!(m.and(y, x), Some(xy));
        let nx = m.not(x).unwrap();
        assert_eq!(m.and(x, nx), Some(BddRef::FALSE));
        assert_eq!(m.not(nx), Some(x));
        assert!(m.eval(xy, &[true, true]));
        assert!(!m.eval(xy, &[true, false]));
    }

    #[test]
    fn collapse_keeps_function() {
        let aig = xor_chain(4);
        let new = collapse(&aig, 0, true).unwrap().unwrap();
        for bits in 0..16u32 {
            let v: Vec<bool> = (0..4).map(|k| bits >> k & 1 == 1).collect();
            assert_eq!(new.evaluate(&v).unwrap(), aig.evaluate(&v).unwrap());
        }
    }

    #[test]
    fn equivalent_miter_collapses_to_false() {
        // x & (y | z) against (x & y) | (x & z)
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let z = aig.add_input(3).unwrap();
        let yz = aig.or(&y, &z).unwrap();
        let a = aig.and(&x, &yz).unwrap();
        let xy = aig.and(&x, &y).unwrap();
        let xz = aig.and(&x, &z).unwrap();
        let b = aig.or(&xy, &xz).unwrap();
        let o = aig.xor(&a, &b).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();
        assert_eq!(aig.output_constant(0), None);

        let new = collapse(&aig, 0, false).unwrap().unwrap();
        assert_eq!(new.output_constant(0), Some(false));
        assert_eq!(new.node_count(), 0);
    }

    #[test]
    fn node_limit_gives_up() {
        let aig = xor_chain(8);
        assert!(collapse(&aig, 5, true).unwrap().is_none());
        assert!(collapse(&aig, 0, true).unwrap().is_some());
    }

    #[test]
    fn dfs_order_appends_unused_inputs() {
        let mut aig = Aig::new();
        aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        aig.add_output_edge(&y).unwrap();
        assert_eq!(dfs_order(&aig), vec![2, 1]);
    }
}
