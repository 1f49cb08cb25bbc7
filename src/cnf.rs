//! SAT formulas in conjunctive normal form, and the Tseitin translation of AIG cones.
//!
//! To decide whether an AIG output can be true:
//! - encode its fanin cone with a [`ConeEncoder`]
//! - assert the output literal with a unit clause
//! - check the resulting [`Cnf`] with a SAT solver, see [`crate::sat`].

use std::{collections::HashMap, fmt, ops::Not};

use crate::{AigEdge, AigNode, AigNodeRef, NodeId};

/// A SAT literal in DIMACS convention: variable `v >= 1` is `Lit(v)`, its negation is `Lit(-v)`.
///
/// Note that all AIG nodes do not correspond to a SAT literal.
/// For example, [`AigNode::False`] node do not map to any literal, but rather is omitted
/// as false boolean variables can be removed from a clause without changing the problem.
/// Clauses that contain a true boolean variable (ie a complemented edge to [`AigNode::False`] node)
/// are obviously true and don't need to be emitted.
///
/// These cases are handled by [`LitRes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit(i64);

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Lit(-self.0)
    }
}

impl From<i64> for Lit {
    fn from(value: i64) -> Self {
        if value == 0 {
            panic!("Tried to create a Lit from 0. 0 is not a valid literal in DIMACS format.");
        }
        Lit(value)
    }
}

impl Lit {
    /// The (1-based) variable of the literal.
    pub fn var(self) -> u32 {
        self.0.unsigned_abs() as u32
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

/// A literal once constants are taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitRes {
    False,
    True,
    Lit(Lit),
}

impl Not for LitRes {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            LitRes::False => LitRes::True,
            LitRes::True => LitRes::False,
            LitRes::Lit(lit) => LitRes::Lit(!lit),
        }
    }
}

impl From<Lit> for LitRes {
    fn from(value: Lit) -> Self {
        LitRes::Lit(value)
    }
}

/// A SAT clause.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause(Vec<Lit>);

impl Clause {
    /// A new empty clause.
    pub fn new() -> Self {
        Clause(Vec::new())
    }

    /// Returns the true SAT clause once we got rid of `True` and `False` literals.
    /// If there is a `True`, then the Clause is obviously satisfied, so we return None.
    /// `False` literals are omitted, and real literals are added to the clause.
    ///
    /// A clause made of `False` literals only is returned empty: the formula is then trivially UNSAT.
    pub fn from_lit_res(lits: Vec<LitRes>) -> Option<Clause> {
        let mut literals = Vec::new();

        for lit_res in lits {
            match lit_res {
                LitRes::True => return None,
                LitRes::False => (),
                LitRes::Lit(lit) => literals.push(lit),
            }
        }

        Some(Clause(literals))
    }

    pub fn lits(&self) -> &[Lit] {
        &self.0
    }
}

impl From<Vec<Lit>> for Clause {
    fn from(value: Vec<Lit>) -> Self {
        Clause(value)
    }
}

/// A SAT CNF that can be passed to a SAT solver, usually filled by a [`ConeEncoder`].
///
/// Prints in DIMACS format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cnf {
    clauses: Vec<Clause>,
    var_count: u32,
}

impl Cnf {
    /// A new empty CNF.
    pub fn new() -> Self {
        Cnf::default()
    }

    /// Add the given clause to the CNF.
    pub fn add_clause(&mut self, clause: Clause) {
        if let Some(max) = clause.0.iter().map(|lit| lit.var()).max() {
            self.var_count = self.var_count.max(max);
        }
        self.clauses.push(clause);
    }

    /// Add the given clause to the CNF, else does nothing.
    pub fn add_clause_if(&mut self, clause: Option<Clause>) {
        if let Some(c) = clause {
            self.add_clause(c);
        }
    }

    /// Add clauses that encode `z = AND(a, b)`.
    pub fn add_and(&mut self, a: LitRes, b: LitRes, z: Lit) {
        let z = LitRes::from(z);
        self.add_clause_if(Clause::from_lit_res(vec![a, !z]));
        self.add_clause_if(Clause::from_lit_res(vec![b, !z]));
        self.add_clause_if(Clause::from_lit_res(vec![!a, !b, z]));
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Number of variables, ie the largest variable used.
    pub fn var_count(&self) -> u32 {
        self.var_count
    }

    /// Makes sure variables up to `n` are accounted for, even if unused by any clause.
    pub fn reserve_vars(&mut self, n: u32) {
        self.var_count = self.var_count.max(n);
    }
}

impl fmt::Display for Cnf {
    /// DIMACS format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "p cnf {} {}", self.var_count, self.clauses.len())?;
        for clause in &self.clauses {
            for lit in &clause.0 {
                write!(f, "{} ", lit.0)?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

/// Tseitin translation of AIG cones into a [`Cnf`].
///
/// Every node gets its own SAT variable the first time it is met, so cones sharing logic
/// can be encoded incrementally: only the new part of a cone produces clauses.
#[derive(Debug)]
pub struct ConeEncoder {
    cnf: Cnf,
    litmap: HashMap<NodeId, Lit>,
    next_var: i64,
}

impl Default for ConeEncoder {
    fn default() -> Self {
        ConeEncoder::new()
    }
}

impl ConeEncoder {
    pub fn new() -> Self {
        ConeEncoder {
            cnf: Cnf::new(),
            litmap: HashMap::new(),
            next_var: 1,
        }
    }

    /// Returns a yet unused SAT literal.
    pub fn fresh_lit(&mut self) -> Lit {
        let lit = Lit::from(self.next_var);
        self.next_var += 1;
        self.cnf.reserve_vars(lit.var());
        lit
    }

    /// The literal of an already encoded node.
    pub fn lit_of(&self, id: NodeId) -> Option<Lit> {
        self.litmap.get(&id).copied()
    }

    /// Encodes the fanin cone of `edge` (skipping already encoded nodes) and returns its literal.
    pub fn encode(&mut self, edge: &AigEdge) -> LitRes {
        self.encode_node(edge.get_node());
        self.edge_lit(edge)
    }

    fn edge_lit(&self, edge: &AigEdge) -> LitRes {
        let lit = match self.litmap.get(&edge.get_node_id()) {
            _ if edge.is_cst() => LitRes::False,
            Some(&lit) => LitRes::from(lit),
            // Not encoded yet
            None => LitRes::False,
        };
        if edge.get_complement() { !lit } else { lit }
    }

    fn encode_node(&mut self, root: AigNodeRef) {
        let mut stack = vec![root];
        let mut new_gates = Vec::new();

        while let Some(node) = stack.pop() {
            let id = node.get_id();
            if node.is_false() || self.litmap.contains_key(&id) {
                continue;
            }
            let lit = self.fresh_lit();
            self.litmap.insert(id, lit);
            for fanin in node.get_fanins() {
                stack.push(fanin.get_node());
            }
            if node.is_and() {
                new_gates.push(node);
            }
        }

        for node in new_gates {
            if let AigNode::And {
                id, fanin0, fanin1, ..
            } = node.as_ref()
            {
                let a = self.edge_lit(fanin0);
                let b = self.edge_lit(fanin1);
                let z = self.litmap[id];
                self.cnf.add_and(a, b, z);
            }
        }
    }

    /// Adds a clause to the underlying formula.
    pub fn add_clause_if(&mut self, clause: Option<Clause>) {
        self.cnf.add_clause_if(clause);
    }

    pub fn cnf(&self) -> &Cnf {
        &self.cnf
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Aig;

    #[test]
    fn not_lit_test() {
        let l1 = Lit(1);
        assert_eq!(!l1, Lit(-1));
        assert_eq!((!l1).var(), 1);
        assert!((!l1).is_negative());
    }

    #[test]
    fn not_lit_res_test() {
        let ltrue = LitRes::True;
        let lfalse = LitRes::False;
        let l1 = LitRes::Lit(Lit(1));
        assert_eq!(!lfalse, ltrue);
        assert_eq!(!l1, LitRes::Lit(!Lit(1)));
    }

    #[test]
    fn clause_from_lit_res_test() {
        let ltrue = LitRes::True;
        let lfalse = LitRes::False;
        let l1 = Lit(1);
        let l2 = Lit(2);
        let lr1 = LitRes::Lit(l1);
        let lr2 = LitRes::Lit(l2);

        assert_eq!(
            Clause::from_lit_res(vec![lfalse, lfalse]).unwrap(),
            Clause::new()
        );
        assert!(Clause::from_lit_res(vec![lfalse, ltrue, lr1]).is_none());
        assert_eq!(
            Clause::from_lit_res(vec![lr1, lfalse, lr2]).unwrap(),
            Clause(vec![l1, l2])
        );
    }

    #[test]
    fn add_clause_test() {
        let c = Clause::from(vec![Lit(1), Lit(-4)]);

        let mut cnf = Cnf::new();
        cnf.add_clause(c.clone());
        assert_eq!(cnf.clauses(), &[c.clone()]);
        assert_eq!(cnf.var_count(), 4);

        cnf.add_clause_if(None);
        assert_eq!(cnf.clauses().len(), 1);
        assert_eq!(cnf.to_string(), "p cnf 4 1\n1 -4 0\n");
    }

    #[test]
    #[should_panic]
    fn invalid_lit_from_test() {
        _ = Lit::from(0);
    }

    #[test]
    fn encode_cone() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let a = aig.and(&x, &y).unwrap();
        let o = aig.or(&a, &x).unwrap();

        let mut encoder = ConeEncoder::new();
        let lit = encoder.encode(&o);
        // 2 inputs and 2 gates
        assert_eq!(encoder.cnf().var_count(), 4);
        assert_eq!(encoder.cnf().clauses().len(), 6);
        assert!(matches!(lit, LitRes::Lit(l) if l.is_negative()));

        // Already encoded, nothing new
        encoder.encode(&a);
        assert_eq!(encoder.cnf().clauses().len(), 6);
        assert!(encoder.lit_of(1).is_some());

        assert_eq!(encoder.encode(&aig.true_edge()), LitRes::True);
    }
}
