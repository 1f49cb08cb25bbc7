//! The engines sequenced by the prover, behind the [`Engines`] trait.

use crate::{
    Aig, Result, bdd,
    cnf::{Clause, ConeEncoder, LitRes},
    fraig::{self, FraigParams},
    opt::{self, RefactorParams},
    sat::{SatResult, Solver},
};

use super::Model;

/// Limits of one engine call, 0 meaning no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Work units (SAT conflicts).
    pub work: u64,
    /// Probes (clause inspections).
    pub probes: u64,
}

impl Limits {
    pub fn new(work: u64, probes: u64) -> Self {
        Limits { work, probes }
    }
}

/// Resources consumed by one engine call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Consumption {
    pub work: u64,
    pub probes: u64,
}

impl Consumption {
    pub fn new(work: u64, probes: u64) -> Self {
        Consumption { work, probes }
    }
}

/// What an engine found out about the output of a miter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Undecided,
    /// The output can be true, with a witness when the engine has one.
    Sat(Option<Model>),
    Unsat,
}

impl Verdict {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Verdict::Undecided)
    }
}

/// Verdict and consumption of a budgeted engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRun {
    pub verdict: Verdict,
    pub consumed: Consumption,
}

impl EngineRun {
    pub fn new(verdict: Verdict, consumed: Consumption) -> Self {
        EngineRun { verdict, consumed }
    }

    /// A run deciding nothing and costing nothing.
    pub fn undecided() -> Self {
        EngineRun::new(Verdict::Undecided, Consumption::default())
    }
}

/// The engines used by [`crate::prove::prove_with`].
///
/// Every method has a default implementation calling the engines of this crate, so an
/// implementation only overrides what it wants to change.
/// Networks given to the engines have a single output, and engines return new networks instead
/// of modifying them.
pub trait Engines {
    /// Bounded SAT check of the output.
    fn sat(&mut self, aig: &Aig, limits: Limits) -> Result<EngineRun> {
        sat_check(aig, limits)
    }

    fn rewrite(&mut self, aig: &Aig) -> Result<Aig> {
        opt::rewrite(aig)
    }

    fn refactor(&mut self, aig: &Aig) -> Result<Aig> {
        opt::refactor(aig)
    }

    fn balance(&mut self, aig: &Aig) -> Result<Aig> {
        opt::balance(aig)
    }

    /// Fraiging with a per-pair conflict limit (`limits.work`) and a total probe limit.
    /// The returned network always replaces the given one.
    fn fraig(&mut self, aig: &Aig, limits: Limits) -> Result<(Aig, EngineRun)> {
        fraig_check(aig, &FraigParams::default(), limits)
    }

    /// BDD collapse, `None` when the node limit is exceeded.
    fn collapse(&mut self, aig: &Aig, node_limit: usize, reorder: bool) -> Result<Option<Aig>> {
        bdd::collapse(aig, node_limit, reorder)
    }
}

/// The engines of this crate, with configurable refactoring and fraiging.
#[derive(Debug, Clone, Default)]
pub struct DefaultEngines {
    pub refactor: RefactorParams,
    /// Simulation and seed of fraiging. Its limits are set by the prover on each call.
    pub fraig: FraigParams,
}

impl Engines for DefaultEngines {
    fn refactor(&mut self, aig: &Aig) -> Result<Aig> {
        opt::refactor_with(aig, &self.refactor)
    }

    fn fraig(&mut self, aig: &Aig, limits: Limits) -> Result<(Aig, EngineRun)> {
        fraig_check(aig, &self.fraig, limits)
    }
}

/// Encodes the output cone, asserts the output, and solves within the limits.
///
/// Inputs outside of the cone are set to false in the model.
pub fn sat_check(aig: &Aig, limits: Limits) -> Result<EngineRun> {
    let Some(output) = aig.get_output(0) else {
        return Ok(EngineRun::undecided());
    };

    let mut encoder = ConeEncoder::new();
    let lit = encoder.encode(output);
    match lit {
        LitRes::False => return Ok(EngineRun::new(Verdict::Unsat, Consumption::default())),
        LitRes::True => {
            let model = Model::zeros(aig.input_count());
            return Ok(EngineRun::new(Verdict::Sat(Some(model)), Consumption::default()));
        }
        LitRes::Lit(_) => encoder.add_clause_if(Clause::from_lit_res(vec![lit])),
    }

    log::trace!("sat instance:\n{}", encoder.cnf());
    let mut solver = Solver::from_cnf(encoder.cnf());
    solver.set_conflict_limit(limits.work);
    solver.set_inspect_limit(limits.probes);
    let result = solver.solve();
    let stats = solver.stats();
    let consumed = Consumption::new(stats.conflicts, stats.inspects);
    log::debug!(
        "sat: {:?} after {} conflicts, {} inspects",
        result,
        stats.conflicts,
        stats.inspects
    );

    let verdict = match result {
        SatResult::Unsat => Verdict::Unsat,
        SatResult::Unknown => Verdict::Undecided,
        SatResult::Sat => {
            let values = aig
                .get_inputs_id()
                .into_iter()
                .map(|id| {
                    encoder
                        .lit_of(id)
                        .and_then(|lit| solver.value(lit))
                        .unwrap_or(false)
                })
                .collect();
            Verdict::Sat(Some(Model::new(values)))
        }
    };
    Ok(EngineRun::new(verdict, consumed))
}

/// Fraigs the network and reads a verdict out of it.
pub fn fraig_check(aig: &Aig, params: &FraigParams, limits: Limits) -> Result<(Aig, EngineRun)> {
    let params = FraigParams {
        pair_conflict_limit: limits.work,
        inspect_limit: limits.probes,
        ..*params
    };
    let result = fraig::fraig(aig, &params)?;
    let consumed = Consumption::new(result.stats.conflicts, result.stats.inspects);

    let verdict = match result.counterexample {
        Some(values) => Verdict::Sat(Some(Model::new(values))),
        None if result.aig.output_constant(0) == Some(false) => Verdict::Unsat,
        None => Verdict::Undecided,
    };
    Ok((result.aig, EngineRun::new(verdict, consumed)))
}
