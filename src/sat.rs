//! A small bounded CDCL SAT solver.
//!
//! Two watched literals, first-UIP clause learning, activity-based decisions and phase saving.
//! Every call to [`Solver::solve`] can be bounded by a number of conflicts and a number of
//! clause inspections, so that callers can share a global resource budget between many calls.
//!
//! ```rust
//! use aigprove::{cnf::{Clause, Cnf, Lit}, sat::{SatResult, Solver}};
//! let mut cnf = Cnf::new();
//! cnf.add_clause(Clause::from(vec![Lit::from(1), Lit::from(2)]));
//! cnf.add_clause(Clause::from(vec![Lit::from(-1)]));
//! let mut solver = Solver::from_cnf(&cnf);
//! assert_eq!(solver.solve(), SatResult::Sat);
//! assert_eq!(solver.value(Lit::from(2)), Some(true));
//! ```

use crate::cnf::{Cnf, Lit};

/// Internal literal: `2 * var + negated`, variables starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Code(u32);

impl Code {
    fn from_lit(lit: Lit) -> Self {
        Code(2 * (lit.var() - 1) + lit.is_negative() as u32)
    }

    fn var(self) -> usize {
        (self.0 >> 1) as usize
    }

    fn is_neg(self) -> bool {
        self.0 & 1 == 1
    }

    fn not(self) -> Self {
        Code(self.0 ^ 1)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

fn code_value(values: &[Option<bool>], code: Code) -> Option<bool> {
    values[code.var()].map(|v| v ^ code.is_neg())
}

/// Outcome of a bounded SAT call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// A resource limit was reached before the answer.
    Unknown,
}

/// Cumulative solver statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SatStats {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    /// Clause visits during propagation.
    pub inspects: u64,
}

/// Variable order: a max-heap on activities.
#[derive(Debug)]
struct VarOrder {
    activity: Vec<f64>,
    var_inc: f64,
    heap: Vec<usize>,
    /// Position in heap for each variable (`usize::MAX` if not in heap)
    heap_pos: Vec<usize>,
}

const VAR_DECAY: f64 = 0.95;

impl Default for VarOrder {
    fn default() -> Self {
        VarOrder {
            activity: Vec::new(),
            var_inc: 1.0,
            heap: Vec::new(),
            heap_pos: Vec::new(),
        }
    }
}

impl VarOrder {
    fn new_var(&mut self) {
        let var = self.activity.len();
        self.activity.push(0.0);
        self.heap_pos.push(usize::MAX);
        self.insert(var);
    }

    fn bump(&mut self, var: usize) {
        self.activity[var] += self.var_inc;

        // Rescale if activity gets too large
        if self.activity[var] > 1e100 {
            for a in &mut self.activity {
                *a *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }

        if self.heap_pos[var] != usize::MAX {
            self.percolate_up(self.heap_pos[var]);
        }
    }

    fn decay(&mut self) {
        self.var_inc /= VAR_DECAY;
    }

    fn insert(&mut self, var: usize) {
        if self.heap_pos[var] == usize::MAX {
            let pos = self.heap.len();
            self.heap.push(var);
            self.heap_pos[var] = pos;
            self.percolate_up(pos);
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let last = self.heap.pop()?;
        if self.heap.is_empty() {
            self.heap_pos[last] = usize::MAX;
            return Some(last);
        }
        let top = self.heap[0];
        self.heap_pos[top] = usize::MAX;
        self.heap[0] = last;
        self.heap_pos[last] = 0;
        self.percolate_down(0);
        Some(top)
    }

    fn percolate_up(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        let act = self.activity[var];

        while pos > 0 {
            let parent = (pos - 1) / 2;
            let parent_var = self.heap[parent];
            if self.activity[parent_var] >= act {
                break;
            }
            self.heap[pos] = parent_var;
            self.heap_pos[parent_var] = pos;
            pos = parent;
        }
        self.heap[pos] = var;
        self.heap_pos[var] = pos;
    }

    fn percolate_down(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        let act = self.activity[var];

        loop {
            let left = 2 * pos + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let best_child = if right < self.heap.len()
                && self.activity[self.heap[right]] > self.activity[self.heap[left]]
            {
                right
            } else {
                left
            };
            if act >= self.activity[self.heap[best_child]] {
                break;
            }
            let child_var = self.heap[best_child];
            self.heap[pos] = child_var;
            self.heap_pos[child_var] = pos;
            pos = best_child;
        }
        self.heap[pos] = var;
        self.heap_pos[var] = pos;
    }
}

/// The solver. Clauses can be added between calls to [`Solver::solve`].
#[derive(Debug, Default)]
pub struct Solver {
    /// Clause database (original and learned), the first two literals are watched.
    clauses: Vec<Vec<Code>>,
    /// `watches[c]` lists the clauses watching literal `c`.
    watches: Vec<Vec<usize>>,
    values: Vec<Option<bool>>,
    levels: Vec<u32>,
    /// The clause that implied each assignment (None for decisions and level 0 facts).
    reasons: Vec<Option<usize>>,
    /// Saved polarity of each variable.
    phase: Vec<bool>,
    seen: Vec<bool>,
    order: VarOrder,
    trail: Vec<Code>,
    /// Index in trail where each decision level starts.
    trail_lim: Vec<usize>,
    qhead: usize,
    /// Set once the formula is known to be UNSAT.
    unsat: bool,
    conflict_limit: u64,
    inspect_limit: u64,
    stats: SatStats,
    model: Vec<bool>,
}

impl Solver {
    /// A solver without variables nor clauses.
    pub fn new() -> Self {
        Solver::default()
    }

    /// A solver loaded with all the clauses of `cnf`.
    pub fn from_cnf(cnf: &Cnf) -> Self {
        let mut solver = Solver::new();
        solver.reserve_vars(cnf.var_count());
        for clause in cnf.clauses() {
            solver.add_clause(clause.lits());
        }
        solver
    }

    /// Maximum number of conflicts per call to [`Solver::solve`], 0 for no limit.
    pub fn set_conflict_limit(&mut self, limit: u64) {
        self.conflict_limit = limit;
    }

    /// Maximum number of clause inspections per call to [`Solver::solve`], 0 for no limit.
    pub fn set_inspect_limit(&mut self, limit: u64) {
        self.inspect_limit = limit;
    }

    pub fn stats(&self) -> SatStats {
        self.stats
    }

    pub fn var_count(&self) -> usize {
        self.values.len()
    }

    /// Makes sure variables `1..=n` exist.
    pub fn reserve_vars(&mut self, n: u32) {
        while self.values.len() < n as usize {
            self.values.push(None);
            self.levels.push(0);
            self.reasons.push(None);
            self.phase.push(false);
            self.seen.push(false);
            self.watches.push(Vec::new());
            self.watches.push(Vec::new());
            self.order.new_var();
        }
    }

    fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    fn enqueue(&mut self, code: Code, reason: Option<usize>) {
        let var = code.var();
        self.values[var] = Some(!code.is_neg());
        self.levels[var] = self.decision_level();
        self.reasons[var] = reason;
        self.trail.push(code);
    }

    /// Adds a clause. Must be called outside of [`Solver::solve`] (ie at decision level 0).
    pub fn add_clause(&mut self, lits: &[Lit]) {
        if self.unsat {
            return;
        }
        if let Some(max) = lits.iter().map(|lit| lit.var()).max() {
            self.reserve_vars(max);
        }

        let mut codes: Vec<Code> = lits.iter().map(|&lit| Code::from_lit(lit)).collect();
        codes.sort_by_key(|c| c.0);
        codes.dedup();

        let mut kept = Vec::with_capacity(codes.len());
        for (k, &code) in codes.iter().enumerate() {
            // Tautology, x and !x are next to each other once sorted
            if k + 1 < codes.len() && codes[k + 1] == code.not() {
                return;
            }
            match code_value(&self.values, code) {
                Some(true) => return,
                Some(false) => (),
                None => kept.push(code),
            }
        }

        match kept.len() {
            0 => self.unsat = true,
            1 => self.enqueue(kept[0], None),
            _ => {
                self.watch_clause(kept);
            }
        }
    }

    fn watch_clause(&mut self, clause: Vec<Code>) -> usize {
        let cref = self.clauses.len();
        self.watches[clause[0].index()].push(cref);
        self.watches[clause[1].index()].push(cref);
        self.clauses.push(clause);
        cref
    }

    /// Propagates the trail, returns the conflicting clause if any.
    fn propagate(&mut self) -> Option<usize> {
        while self.qhead < self.trail.len() {
            let false_lit = self.trail[self.qhead].not();
            self.qhead += 1;

            // Take ownership of watch list to avoid borrow issues
            let mut ws = std::mem::take(&mut self.watches[false_lit.index()]);
            let mut kept = 0;
            let mut conflict = None;
            let mut i = 0;

            while i < ws.len() {
                let cref = ws[i];
                i += 1;
                self.stats.inspects += 1;

                let clause = &mut self.clauses[cref];
                // Make sure the false literal is in position 1
                if clause[0] == false_lit {
                    clause.swap(0, 1);
                }
                let first = clause[0];

                // If first literal is true, clause is satisfied
                if code_value(&self.values, first) == Some(true) {
                    ws[kept] = cref;
                    kept += 1;
                    continue;
                }

                // Look for a new literal to watch
                let new_watch = (2..clause.len())
                    .find(|&k| code_value(&self.values, clause[k]) != Some(false));
                if let Some(k) = new_watch {
                    clause.swap(1, k);
                    self.watches[clause[1].index()].push(cref);
                    continue;
                }

                // Clause is unit or conflicting
                ws[kept] = cref;
                kept += 1;
                if code_value(&self.values, first) == Some(false) {
                    conflict = Some(cref);
                    while i < ws.len() {
                        ws[kept] = ws[i];
                        kept += 1;
                        i += 1;
                    }
                } else {
                    self.stats.propagations += 1;
                    self.enqueue(first, Some(cref));
                }
            }

            ws.truncate(kept);
            self.watches[false_lit.index()] = ws;

            if conflict.is_some() {
                self.qhead = self.trail.len();
                return conflict;
            }
        }
        None
    }

    /// First-UIP conflict analysis, returns the learned clause (asserting literal first)
    /// and the backtrack level.
    fn analyze(&mut self, conflict: usize) -> (Vec<Code>, u32) {
        let level = self.decision_level();
        let mut learnt = vec![Code(0)];
        let mut pending = 0;
        let mut index = self.trail.len();
        let mut cref = conflict;
        let mut uip = None;

        loop {
            // In a reason clause, position 0 holds the implied literal
            let start = usize::from(uip.is_some());
            for k in start..self.clauses[cref].len() {
                let code = self.clauses[cref][k];
                let var = code.var();
                if self.seen[var] || self.levels[var] == 0 {
                    continue;
                }
                self.seen[var] = true;
                self.order.bump(var);
                if self.levels[var] >= level {
                    pending += 1;
                } else {
                    learnt.push(code);
                }
            }

            // Most recent marked literal of the trail
            let p = loop {
                index -= 1;
                let p = self.trail[index];
                if self.seen[p.var()] {
                    break p;
                }
            };
            self.seen[p.var()] = false;
            pending -= 1;
            uip = Some(p);

            if pending == 0 {
                break;
            }
            match self.reasons[p.var()] {
                Some(reason) => cref = reason,
                None => break,
            }
        }

        if let Some(p) = uip {
            learnt[0] = p.not();
        }
        for code in &learnt[1..] {
            self.seen[code.var()] = false;
        }

        // Second highest level goes to position 1
        let mut backtrack_level = 0;
        if learnt.len() > 1 {
            let mut max_idx = 1;
            for k in 2..learnt.len() {
                if self.levels[learnt[k].var()] > self.levels[learnt[max_idx].var()] {
                    max_idx = k;
                }
            }
            learnt.swap(1, max_idx);
            backtrack_level = self.levels[learnt[1].var()];
        }

        (learnt, backtrack_level)
    }

    fn backtrack(&mut self, level: u32) {
        if self.decision_level() <= level {
            return;
        }
        let limit = self.trail_lim[level as usize];
        while self.trail.len() > limit {
            if let Some(code) = self.trail.pop() {
                let var = code.var();
                self.phase[var] = !code.is_neg();
                self.values[var] = None;
                self.reasons[var] = None;
                self.order.insert(var);
            }
        }
        self.trail_lim.truncate(level as usize);
        self.qhead = self.trail.len();
    }

    /// Picks an unassigned variable, returns false if all of them are assigned.
    fn decide(&mut self) -> bool {
        while let Some(var) = self.order.pop() {
            if self.values[var].is_none() {
                self.trail_lim.push(self.trail.len());
                self.stats.decisions += 1;
                let code = Code(2 * var as u32 + !self.phase[var] as u32);
                self.enqueue(code, None);
                return true;
            }
        }
        false
    }

    fn limits_reached(&self, start: &SatStats) -> bool {
        (self.conflict_limit > 0 && self.stats.conflicts - start.conflicts >= self.conflict_limit)
            || (self.inspect_limit > 0
                && self.stats.inspects - start.inspects >= self.inspect_limit)
    }

    /// Solves the current formula within the limits.
    ///
    /// On [`SatResult::Sat`], the model can be read with [`Solver::value`].
    /// The solver is back at decision level 0 afterwards, so clauses can be added for the next call.
    pub fn solve(&mut self) -> SatResult {
        if self.unsat {
            return SatResult::Unsat;
        }
        let start = self.stats;

        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;

                if self.decision_level() == 0 {
                    self.unsat = true;
                    return SatResult::Unsat;
                }

                let (learnt, backtrack_level) = self.analyze(conflict);
                self.backtrack(backtrack_level);
                if learnt.len() == 1 {
                    self.enqueue(learnt[0], None);
                } else {
                    let asserting = learnt[0];
                    let cref = self.watch_clause(learnt);
                    self.enqueue(asserting, Some(cref));
                }
                self.order.decay();

                if self.limits_reached(&start) {
                    self.backtrack(0);
                    return SatResult::Unknown;
                }
            } else {
                if self.limits_reached(&start) {
                    self.backtrack(0);
                    return SatResult::Unknown;
                }
                if !self.decide() {
                    self.model = self.values.iter().map(|v| v.unwrap_or(false)).collect();
                    self.backtrack(0);
                    return SatResult::Sat;
                }
            }
        }
    }

    /// Value of `lit` in the model found by the last successful call to [`Solver::solve`].
    pub fn value(&self, lit: Lit) -> Option<bool> {
        self.model
            .get(lit.var() as usize - 1)
            .map(|&v| v ^ lit.is_negative())
    }
}
