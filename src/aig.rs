//! Module defining the [`Aig`] struct, as well as [`AigNode`], [`AigEdge`] and some others relevant structs.
//!
//! To start proving combinational equivalence, check [`crate::miter`] and [`crate::prove`] docs.

mod copy;
pub mod dfs;
pub mod edge;
pub mod error;
mod integrity;
pub mod node;
mod parser;
pub mod sim;
mod writer;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    rc::{Rc, Weak},
};

pub(crate) use copy::map_edge;
pub use edge::AigEdge;
pub use error::{AigError, ParserError, Result};
pub(crate) use node::AigNodeWeak;
pub use node::{AigNode, AigNodeRef, NodeId};

/// Key of the structural hashing table: both fanins (higher id first) with their complement flags.
type StrashKey = (NodeId, bool, NodeId, bool);

fn strash_key(fanin0: &AigEdge, fanin1: &AigEdge) -> StrashKey {
    (
        fanin0.get_node_id(),
        fanin0.get_complement(),
        fanin1.get_node_id(),
        fanin1.get_complement(),
    )
}

/// A whole combinational AIG.
///
/// Nodes are immutable and reference counted. The AIG only tracks them through weak references:
/// a node lives as long as it is reachable from an output, or kept alive artificially.
/// Freshly created nodes are kept alive until the next call to [`.update()`], which removes
/// all nodes that are no longer used by anyone.
///
/// [`.update()`]: Aig::update
///
/// New AND gates should be created with [`Aig::and`], which performs constant propagation and
/// structural hashing: two gates with the same fanins are always the same node. An AIG built only
/// through [`Aig::and`] (and its derived helpers) is in canonical form, see [`Aig::check_strashed`].
///
/// Transformations never patch an AIG in place. They build a new AIG instead (see
/// [`Aig::strash`]), which is the reason why [`Aig`] is not [`Clone`]: two AIGs never share nodes.
#[derive(Debug)]
pub struct Aig {
    nodes: HashMap<NodeId, AigNodeWeak>,
    /// Inputs must be kept artificially alive as
    /// we don't want to remove them even if the outputs do not depend on them.
    /// Ordered by id, which is the declaration order of the inputs.
    inputs: BTreeMap<NodeId, AigNodeRef>,
    outputs: Vec<AigEdge>,
    /// Structural hashing table for AND gates.
    strash: HashMap<StrashKey, AigNodeWeak>,
    keep_nodes_alive: Vec<AigNodeRef>,
    /// Next id handed out to an AND gate created by [`Aig::and`].
    next_id: NodeId,
    node_false: AigNodeRef,
}

impl Default for Aig {
    fn default() -> Self {
        Aig::new()
    }
}

impl Aig {
    /// Create a brand new AIG (constant node [`AigNode::False`] included).
    pub fn new() -> Self {
        let node_false = Rc::new(AigNode::False);
        let nodes = HashMap::from([(0, Rc::downgrade(&node_false))]);
        Aig {
            nodes,
            inputs: BTreeMap::new(),
            outputs: Vec::new(),
            strash: HashMap::new(),
            keep_nodes_alive: Vec::new(),
            next_id: 1,
            node_false,
        }
    }

    /// Retrieves a node from its id.
    pub fn get_node(&self, id: NodeId) -> Option<AigNodeRef> {
        self.nodes.get(&id)?.upgrade()
    }

    /// The constant false signal.
    pub fn false_edge(&self) -> AigEdge {
        AigEdge::new(self.node_false.clone(), false)
    }

    /// The constant true signal.
    pub fn true_edge(&self) -> AigEdge {
        AigEdge::new(self.node_false.clone(), true)
    }

    /// Call this function when you are done with your rewrite.
    /// All nodes that are not part of the AIG anymore (ie not reachable from an output) will be deleted.
    pub fn update(&mut self) {
        // Stop keeping nodes artificially alive
        self.keep_nodes_alive.clear();

        // Removing no longer valid entries from the nodes and the hashing table
        self.nodes
            .retain(|_, weak_node| weak_node.upgrade().is_some());
        self.strash
            .retain(|_, weak_node| weak_node.upgrade().is_some());
    }

    /// Retrieves inputs reference, in declaration order.
    pub fn get_inputs(&self) -> Vec<AigNodeRef> {
        self.inputs.values().cloned().collect()
    }

    /// Retrieves inputs id, in declaration order.
    pub fn get_inputs_id(&self) -> Vec<NodeId> {
        self.inputs.keys().copied().collect()
    }

    /// Returns the edge pointing at input `id`.
    pub fn input_edge(&self, id: NodeId) -> Result<AigEdge> {
        self.inputs
            .get(&id)
            .map(|input| AigEdge::new(input.clone(), false))
            .ok_or(AigError::NodeDoesNotExist(id))
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Retrieves outputs reference.
    pub fn get_outputs(&self) -> Vec<AigEdge> {
        self.outputs.clone()
    }

    pub fn get_output(&self, index: usize) -> Option<&AigEdge> {
        self.outputs.get(index)
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Returns the value of output `index` if it is structurally constant.
    pub fn output_constant(&self, index: usize) -> Option<bool> {
        self.outputs
            .get(index)
            .filter(|output| output.is_cst())
            .map(|output| output.get_complement())
    }

    /// Checks that the edge points at a node owned by this AIG.
    fn check_owned(&self, edge: &AigEdge) -> Result<()> {
        let id = edge.get_node_id();
        match self.get_node(id) {
            Some(node) if Rc::ptr_eq(&node, &edge.node) => Ok(()),
            Some(_) => Err(AigError::ForeignNode(id)),
            None => Err(AigError::NodeDoesNotExist(id)),
        }
    }

    fn check_valid_node_to_add(&self, node: &AigNode) -> Result<()> {
        match node {
            AigNode::False => Ok(()),
            AigNode::Input(id) => {
                if *id == 0 {
                    Err(AigError::IdZeroButNotFalse)
                } else {
                    Ok(())
                }
            }
            AigNode::And {
                id, fanin0, fanin1, ..
            } => {
                if *id == 0 {
                    Err(AigError::IdZeroButNotFalse)
                } else {
                    self.check_owned(fanin0)?;
                    self.check_owned(fanin1)
                }
            }
        }
    }

    /// Create a new (or retrieve existing) node within the AIG.
    /// This will fail if a different node with the same id already exists in the AIG,
    /// or if a node uses id 0 (reserved for constant node [`AigNode::False`]).
    ///
    /// This is the raw constructor: unlike [`Aig::and`], it does not simplify nor hash the gate,
    /// so it can build AIGs which are not in canonical form.
    ///
    /// ```rust
    /// use aigprove::{Aig, AigEdge, AigNode};
    /// let mut aig = Aig::new();
    /// let node_false = aig.add_node(AigNode::False).unwrap();
    /// let i1 = aig.add_node(AigNode::Input(1)).unwrap();
    /// let i1_ = aig.add_node(AigNode::Input(1)).unwrap(); // will simply retrieve the existing node
    /// assert_eq!(i1, i1_);
    ///
    /// let and_gate =
    ///     aig.add_node(AigNode::and(
    ///         2,
    ///         AigEdge::new(i1.clone(), false),
    ///         AigEdge::new(i1.clone(), true)
    ///     )).unwrap(); // represent i1 ^ !i1 so will be false all the time (just an example)
    /// assert!(aig.check_strashed().is_err());
    ///
    /// // Some stuff we cannot do
    /// // Node with id 0
    /// assert!(aig.add_node(AigNode::Input(0)).is_err());
    /// // Id 1 is already taken by an input
    /// assert!(
    ///     aig.add_node(AigNode::and(
    ///         1,
    ///         AigEdge::new(i1.clone(), false),
    ///         AigEdge::new(i1.clone(), false)
    ///     ))
    ///     .is_err()
    /// );
    /// ```
    pub fn add_node(&mut self, node: AigNode) -> Result<AigNodeRef> {
        self.check_valid_node_to_add(&node)?;

        let id = node.get_id();
        match self.get_node(id) {
            // No node with this id, let's create a new one
            None => {
                let n = Rc::new(node);
                self.nodes.insert(id, Rc::downgrade(&n));
                self.keep_nodes_alive.push(n.clone());
                self.next_id = self.next_id.max(id + 1);
                match n.as_ref() {
                    AigNode::Input(_) => {
                        self.inputs.insert(id, n.clone());
                    }
                    AigNode::And { fanin0, fanin1, .. } => {
                        self.strash
                            .entry(strash_key(fanin0, fanin1))
                            .or_insert_with(|| Rc::downgrade(&n));
                    }
                    AigNode::False => (),
                };
                Ok(n)
            }
            // A node was found, maybe it is just the one we're trying to create
            Some(n) => {
                if *n == node {
                    Ok(n)
                } else {
                    Err(AigError::DuplicateId(id))
                }
            }
        }
    }

    /// Declare a new primary input (or retrieve the existing one).
    ///
    /// Declare every input before building gates: [`Aig::and`] numbers new gates after the
    /// largest id in use, so a later input may ask for an id already given to a gate, which
    /// fails with [`AigError::DuplicateId`].
    pub fn add_input(&mut self, id: NodeId) -> Result<AigEdge> {
        let node = self.add_node(AigNode::Input(id))?;
        Ok(AigEdge::new(node, false))
    }

    /// Returns an edge implementing `a AND b`, creating a gate only when needed.
    ///
    /// Trivial cases are simplified (`x & 0`, `x & 1`, `x & x`, `x & !x`), fanins are ordered
    /// (fanin0 has the larger id) and an existing gate with the same fanins is reused.
    ///
    /// ```rust
    /// use aigprove::Aig;
    /// let mut aig = Aig::new();
    /// let x = aig.add_input(1).unwrap();
    /// let y = aig.add_input(2).unwrap();
    /// let xy = aig.and(&x, &y).unwrap();
    /// assert_eq!(aig.and(&y, &x).unwrap(), xy);
    /// assert!(aig.and(&x, &!x.clone()).unwrap().is_cst_false());
    /// ```
    pub fn and(&mut self, a: &AigEdge, b: &AigEdge) -> Result<AigEdge> {
        self.check_owned(a)?;
        self.check_owned(b)?;

        if a.is_cst_false() || b.is_cst_false() || a.is_complement_of(b) {
            return Ok(self.false_edge());
        }
        if a.is_cst_true() || a == b {
            return Ok(b.clone());
        }
        if b.is_cst_true() {
            return Ok(a.clone());
        }

        let (fanin0, fanin1) = if a.get_node_id() > b.get_node_id() {
            (a, b)
        } else {
            (b, a)
        };
        let key = strash_key(fanin0, fanin1);
        if let Some(node) = self.strash.get(&key).and_then(Weak::upgrade) {
            return Ok(AigEdge::new(node, false));
        }

        let id = self.next_id;
        self.next_id += 1;
        let node = Rc::new(AigNode::and(id, fanin0.clone(), fanin1.clone()));
        self.nodes.insert(id, Rc::downgrade(&node));
        self.strash.insert(key, Rc::downgrade(&node));
        self.keep_nodes_alive.push(node.clone());
        Ok(AigEdge::new(node, false))
    }

    /// `a OR b`, as `!(!a AND !b)`.
    pub fn or(&mut self, a: &AigEdge, b: &AigEdge) -> Result<AigEdge> {
        Ok(!self.and(&!a.clone(), &!b.clone())?)
    }

    /// `a XOR b`, using three AND gates.
    pub fn xor(&mut self, a: &AigEdge, b: &AigEdge) -> Result<AigEdge> {
        let l = self.and(a, &!b.clone())?;
        let r = self.and(&!a.clone(), b)?;
        self.or(&l, &r)
    }

    /// `if sel then t else e`.
    pub fn mux(&mut self, sel: &AigEdge, t: &AigEdge, e: &AigEdge) -> Result<AigEdge> {
        let l = self.and(sel, t)?;
        let r = self.and(&!sel.clone(), e)?;
        self.or(&l, &r)
    }

    /// Mark an existing node as an output.
    pub fn add_output(&mut self, id: NodeId, complement: bool) -> Result<()> {
        let node = self.get_node(id).ok_or(AigError::NodeDoesNotExist(id))?;
        self.outputs.push(AigEdge::new(node, complement));
        Ok(())
    }

    /// Mark an edge of this AIG as an output.
    pub fn add_output_edge(&mut self, edge: &AigEdge) -> Result<()> {
        self.check_owned(edge)?;
        self.outputs.push(edge.clone());
        Ok(())
    }

    /// Returns a topological sort of the nodes reachable from the outputs
    /// (fanins always come before their fanouts).
    ///
    /// Nodes are immutable and must exist before being used as a fanin, so an AIG cannot contain a cycle.
    pub fn get_topological_sort(&self) -> Vec<AigNodeRef> {
        let mut sort = Vec::new();
        let mut done = HashSet::new();

        for output in &self.outputs {
            let mut stack: Vec<(AigNodeRef, bool)> = vec![(output.get_node(), false)];

            while let Some((node, last_time)) = stack.pop() {
                let id = node.get_id();

                // Post order
                if last_time {
                    if done.insert(id) {
                        sort.push(node);
                    }
                    continue;
                }

                if done.contains(&id) {
                    continue;
                }

                stack.push((node.clone(), true));
                for fanin in node.get_fanins() {
                    if !done.contains(&fanin.get_node_id()) {
                        stack.push((fanin.get_node(), false));
                    }
                }
            }
        }

        sort
    }

    /// Returns the AND gates reachable from the outputs, in topological order.
    pub fn get_and_nodes(&self) -> Vec<AigNodeRef> {
        self.get_topological_sort()
            .into_iter()
            .filter(|node| node.is_and())
            .collect()
    }

    /// Number of AND gates reachable from the outputs.
    pub fn node_count(&self) -> usize {
        self.get_and_nodes().len()
    }

    /// Logic level of every node reachable from the outputs (inputs and constant are at level 0).
    pub fn get_levels(&self) -> HashMap<NodeId, u32> {
        let mut levels = HashMap::new();
        for node in self.get_topological_sort() {
            let level = node
                .get_fanins()
                .iter()
                .map(|fanin| levels.get(&fanin.get_node_id()).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            levels.insert(node.get_id(), level);
        }
        levels
    }

    /// Number of logic levels, ie the largest level of an output.
    pub fn level_count(&self) -> u32 {
        let levels = self.get_levels();
        self.outputs
            .iter()
            .filter_map(|output| levels.get(&output.get_node_id()).copied())
            .max()
            .unwrap_or(0)
    }

    /// Evaluates the outputs for one input assignment (given in declaration order).
    pub fn evaluate(&self, inputs: &[bool]) -> Result<Vec<bool>> {
        let patterns: Vec<Vec<u64>> = inputs
            .iter()
            .map(|&value| vec![if value { u64::MAX } else { 0 }])
            .collect();
        let values = self.simulate(&patterns)?;
        Ok(self
            .outputs
            .iter()
            .map(|output| sim::edge_words(&values, output)[0] & 1 == 1)
            .collect())
    }
}

impl PartialEq for Aig {
    /// Compares the two AIGs. They are equal iff:
    /// - their inputs are equal
    /// - their outputs are equal
    /// - their valid nodes are equal.
    fn eq(&self, other: &Self) -> bool {
        self.outputs == other.outputs
            && self.get_inputs_id() == other.get_inputs_id()
            && self
                .nodes
                .iter()
                .filter_map(|(&id, weak)| Some((id, weak.upgrade()?)))
                .collect::<HashMap<NodeId, AigNodeRef>>()
                == other
                    .nodes
                    .iter()
                    .filter_map(|(&id, weak)| Some((id, weak.upgrade()?)))
                    .collect::<HashMap<NodeId, AigNodeRef>>()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_node_test() {
        let mut aig = Aig::new();

        // Adding legit nodes
        let nf = AigNode::False;
        let rnf = aig.add_node(nf.clone()).unwrap();
        assert_eq!(*rnf, nf);
        let i1 = AigNode::Input(1);
        let ri1 = aig.add_node(i1.clone()).unwrap();
        assert_eq!(*ri1, i1);
        let a2 = AigNode::and(
            2,
            AigEdge::new(rnf.clone(), false),
            AigEdge::new(ri1.clone(), false),
        );
        let ra2 = aig.add_node(a2.clone()).unwrap();
        assert_eq!(*ra2, a2);

        // Now, trying to add some illegal nodes
        assert!(
            aig.add_node(AigNode::and(
                1,
                AigEdge::new(rnf.clone(), false),
                AigEdge::new(rnf.clone(), false)
            ))
            .is_err()
        );

        // Trying to re-add existing nodes (legal)
        assert_eq!(*aig.add_node(nf.clone()).unwrap(), nf);
        assert_eq!(*aig.add_node(i1.clone()).unwrap(), i1);
        assert_eq!(*aig.add_node(a2.clone()).unwrap(), a2);
    }

    #[test]
    fn add_node_test_invalid_input_id0() {
        let mut a = Aig::new();
        assert!(a.add_node(AigNode::Input(0)).is_err());
    }

    #[test]
    fn add_node_test_foreign_dependency() {
        let mut a = Aig::new();
        let mut b = Aig::new();

        let fake_input = b.add_input(1).unwrap();
        assert!(a.add_node(AigNode::and(2, fake_input.clone(), fake_input.clone())).is_err());
        a.add_input(1).unwrap();
        assert!(matches!(
            a.and(&fake_input, &fake_input),
            Err(AigError::ForeignNode(1))
        ));
    }

    #[test]
    fn and_simplifications() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let t = aig.true_edge();
        let f = aig.false_edge();

        assert_eq!(aig.and(&x, &f).unwrap(), f);
        assert_eq!(aig.and(&t, &x).unwrap(), x);
        assert_eq!(aig.and(&x, &t).unwrap(), x);
        assert_eq!(aig.and(&x, &x).unwrap(), x);
        assert_eq!(aig.and(&x, &!x.clone()).unwrap(), f);

        let xy = aig.and(&x, &y).unwrap();
        let yx = aig.and(&y, &x).unwrap();
        assert_eq!(xy, yx);
        assert_ne!(aig.and(&!x.clone(), &y).unwrap(), xy);

        // Fanin0 has the larger id
        if let AigNode::And { fanin0, fanin1, .. } = xy.get_node().as_ref() {
            assert!(fanin0.get_node_id() > fanin1.get_node_id());
        } else {
            panic!("expected an and gate");
        }
    }

    #[test]
    fn derived_gates_truth_tables() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let s = aig.add_input(3).unwrap();
        let or = aig.or(&x, &y).unwrap();
        let xor = aig.xor(&x, &y).unwrap();
        let mux = aig.mux(&s, &x, &y).unwrap();
        aig.add_output_edge(&or).unwrap();
        aig.add_output_edge(&xor).unwrap();
        aig.add_output_edge(&mux).unwrap();
        aig.update();

        for bits in 0..8u32 {
            let (vx, vy, vs) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let out = aig.evaluate(&[vx, vy, vs]).unwrap();
            assert_eq!(out, vec![vx | vy, vx ^ vy, if vs { vx } else { vy }]);
        }
    }

    #[test]
    fn node_lifetime() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let z = aig.add_input(3).unwrap();

        // Now let's create the following AIG
        //   A1  A2
        //  / \ / \
        // I1  I2  I3
        // A1 is not an output, so A1 should be cleared (but I1 is kept alive)
        // and A2 is an output, so A2, I2, I3 will be kept alive
        let a1 = aig.and(&x, &y).unwrap().get_node_id();
        let a2 = aig.and(&y, &z).unwrap();
        aig.add_output_edge(&a2).unwrap();
        aig.update();
        assert!(aig.get_node(1).is_some());
        assert!(aig.get_node(a1).is_none());
        assert!(aig.get_node(a2.get_node_id()).is_some());
        assert_eq!(aig.node_count(), 1);

        // The hashing table forgot about A1, which gets a fresh id
        let a1_again = aig.and(&x, &y).unwrap();
        assert_ne!(a1_again.get_node_id(), a1);
    }

    #[test]
    fn counts_and_levels() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let z = aig.add_input(3).unwrap();
        let xy = aig.and(&x, &y).unwrap();
        let xyz = aig.and(&xy, &z).unwrap();
        aig.add_output_edge(&!xyz).unwrap();
        aig.update();

        assert_eq!(aig.node_count(), 2);
        assert_eq!(aig.level_count(), 2);
        assert_eq!(aig.output_constant(0), None);
        assert_eq!(aig.get_topological_sort().last().unwrap().get_id(), 5);
    }

    #[test]
    fn output_constant_test() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let f = aig.and(&x, &!x.clone()).unwrap();
        aig.add_output_edge(&f).unwrap();
        aig.add_output_edge(&!f).unwrap();
        aig.add_output_edge(&x).unwrap();
        assert_eq!(aig.output_constant(0), Some(false));
        assert_eq!(aig.output_constant(1), Some(true));
        assert_eq!(aig.output_constant(2), None);
        assert_eq!(aig.output_constant(3), None);
    }

    #[test]
    fn input_after_gates_may_clash() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let xy = aig.and(&x, &y).unwrap();
        assert_eq!(xy.get_node_id(), 3);
        assert!(matches!(aig.add_input(3), Err(AigError::DuplicateId(3))));
        // Fresh ids are still fine, and gates go on after them
        aig.add_input(4).unwrap();
        let z = aig.input_edge(4).unwrap();
        assert_eq!(aig.and(&xy, &z).unwrap().get_node_id(), 5);
    }

    #[test]
    fn aig_eq_test() {
        let build = || {
            let mut a = Aig::new();
            let a1 = a.add_input(1).unwrap();
            let a2 = a.add_input(2).unwrap();
            let a3 = a.and(&a1, &a2).unwrap();
            // Not used, deleted by update
            a.and(&!a1, &!a2).unwrap();
            a.add_output_edge(&a3).unwrap();
            a.update();
            a
        };
        assert_eq!(build(), build());

        let mut c = Aig::new();
        c.add_input(1).unwrap();
        c.add_input(3).unwrap();
        assert_ne!(build(), c);
    }
}
