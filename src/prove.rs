//! Escalating multi-engine proof of a miter.
//!
//! The output of a miter is always false iff the two compared circuits are equivalent.
//! [`prove`] tries to decide it with increasingly expensive engines, all sharing one
//! [`ResourceBudget`]:
//! - a SAT attempt with a growing conflict limit,
//! - local optimizations (rewrite, refactor, balance), which may turn the output into a constant,
//! - fraiging, which merges equivalent nodes found by simulation and SAT.
//!
//! These three stages are repeated `iters` times. If no verdict is reached, a BDD collapse can
//! be tried, then one last SAT attempt decides the final answer.
//!
//! ```rust
//! use aigprove::{Aig, prove::{ProofOutcome, ProveParams, check_equivalence}};
//! // x & y against !(!x | !y)
//! let mut a = Aig::new();
//! let x = a.add_input(1).unwrap();
//! let y = a.add_input(2).unwrap();
//! let o = a.and(&x, &y).unwrap();
//! a.add_output_edge(&o).unwrap();
//!
//! let mut b = Aig::new();
//! let x = b.add_input(1).unwrap();
//! let y = b.add_input(2).unwrap();
//! let o = b.or(&!x, &!y).unwrap();
//! b.add_output_edge(&!o).unwrap();
//!
//! let mut params = ProveParams::default();
//! let (outcome, _) = check_equivalence(&a, &b, &mut params).unwrap();
//! assert_eq!(outcome, ProofOutcome::Unsat);
//! ```

mod budget;
mod engines;
mod handle;
mod local;
mod outcome;
mod params;

use std::time::Instant;

use log::Level;
use thiserror::Error;

use crate::{Aig, Result, miter::build_miter};

pub use budget::ResourceBudget;
pub use engines::{
    Consumption, DefaultEngines, EngineRun, Engines, Limits, Verdict, fraig_check, sat_check,
};
pub use handle::NetworkHandle;
pub use outcome::{Model, ProofOutcome};
pub use params::{ProveParams, StageSchedule};

/// Error returned when a network cannot be given to the prover.
#[derive(Debug, Error)]
pub enum ProveError {
    /// The prover works on miters, which have exactly one output.
    #[error("the network to prove must have exactly one output, it has {0}")]
    OutputCount(usize),

    /// The network must be structurally hashed, see [`Aig::check_strashed`].
    #[error("the network to prove is not structurally hashed: {0}")]
    NotStrashed(String),
}

/// Checks the network can be proven.
fn check_preconditions(aig: &Aig) -> Result<()> {
    if aig.output_count() != 1 {
        return Err(ProveError::OutputCount(aig.output_count()).into());
    }
    aig.check_strashed()
        .map_err(|e| ProveError::NotStrashed(e.to_string()))?;
    Ok(())
}

/// Progress reports, at `info` level in verbose mode.
struct Progress {
    level: Level,
    start: Instant,
}

impl Progress {
    fn new(verbose: bool) -> Self {
        Progress {
            level: if verbose { Level::Info } else { Level::Debug },
            start: Instant::now(),
        }
    }

    fn stage(&self, name: &str, aig: &Aig) {
        if !log::log_enabled!(self.level) {
            return;
        }
        log::log!(
            self.level,
            "{:<12} nodes = {:>7}  levels = {:>5}  time = {:.2?}",
            name,
            aig.node_count(),
            aig.level_count(),
            self.start.elapsed()
        );
    }

    fn message(&self, message: &str) {
        log::log!(self.level, "{}", message);
    }
}

/// Proves the single output of the network is always false, with the engines of this crate.
///
/// See [`prove_with`].
pub fn prove(handle: &mut NetworkHandle, params: &mut ProveParams) -> Result<ProofOutcome> {
    prove_with(handle, params, &mut DefaultEngines::default())
}

/// Proves the single output of the network is always false.
///
/// The network must have exactly one output and be structurally hashed, otherwise an error is
/// returned and nothing is attempted. On return, `handle` holds the last network built by the
/// engines and `params.budget` the resources consumed, on top of what it already held.
///
/// An engine failing is not an error of the proof: it is logged and the proof ends with
/// [`ProofOutcome::Timeout`].
pub fn prove_with<E: Engines + ?Sized>(
    handle: &mut NetworkHandle,
    params: &mut ProveParams,
    engines: &mut E,
) -> Result<ProofOutcome> {
    check_preconditions(handle.get())?;

    let progress = Progress::new(params.verbose);
    for line in params.summary() {
        progress.message(&line);
    }
    progress.stage("start", handle.get());

    let verdict = match escalate(handle, params, engines, &progress) {
        Ok(verdict) => verdict,
        Err(e) => {
            log::warn!("engine failure, giving up: {}", e);
            Verdict::Undecided
        }
    };

    let outcome = match verdict {
        Verdict::Undecided => ProofOutcome::Timeout,
        Verdict::Unsat => ProofOutcome::Unsat,
        Verdict::Sat(Some(model)) => ProofOutcome::Sat(model),
        Verdict::Sat(None) => ProofOutcome::Sat(Model::zeros(handle.get().input_count())),
    };
    progress.message(&format!(
        "result: {} (work = {}, probes = {})",
        outcome, params.budget.work_used, params.budget.probe_used
    ));
    Ok(outcome)
}

/// The escalation loop, [`Verdict::Undecided`] meaning timeout.
fn escalate<E: Engines + ?Sized>(
    handle: &mut NetworkHandle,
    params: &mut ProveParams,
    engines: &mut E,
    progress: &Progress,
) -> Result<Verdict> {
    if params.budget.exceeded() {
        progress.message("global resource limit reached before the start");
        return Ok(Verdict::Undecided);
    }

    // Plain SAT
    if !params.use_rewriting && !params.use_fraiging {
        let limits = Limits::new(params.last_resort_limit, params.budget.remaining_probes());
        let run = engines.sat(handle.get(), limits)?;
        params.budget.add(run.consumed);
        progress.stage("SAT solving", handle.get());
        return Ok(run.verdict);
    }

    let mut verdict = Verdict::Undecided;
    for i in 0..params.iters {
        progress.message(&params.iteration_summary(i));

        // SAT
        let limits = Limits::new(params.mitering.limit(i), params.budget.remaining_probes());
        let run = engines.sat(handle.get(), limits)?;
        params.budget.add(run.consumed);
        progress.stage("SAT solving", handle.get());
        if run.verdict.is_decided() {
            verdict = run.verdict;
            break;
        }
        if params.budget.exceeded() {
            progress.message("reached global resource limit");
            return Ok(Verdict::Undecided);
        }

        // Local optimizations
        if params.use_rewriting {
            let steps = params.rewriting.limit(i);
            let constant = local::optimize(handle, engines, steps)?;
            progress.stage("rewriting", handle.get());
            match constant {
                Some(false) => {
                    verdict = Verdict::Unsat;
                    break;
                }
                Some(true) => {
                    verdict = Verdict::Sat(None);
                    break;
                }
                None => (),
            }
        }

        // Fraiging
        if params.use_fraiging {
            let limits = Limits::new(params.fraiging.limit(i), params.budget.remaining_probes());
            let (aig, run) = engines.fraig(handle.get(), limits)?;
            handle.replace(aig);
            params.budget.add(run.consumed);
            progress.stage("fraiging", handle.get());
            if run.verdict.is_decided() {
                verdict = run.verdict;
                break;
            }
            if params.budget.exceeded() {
                progress.message("reached global resource limit");
                return Ok(Verdict::Undecided);
            }
        }
    }

    // BDDs
    if !verdict.is_decided() && params.use_bdds {
        progress.message(&format!(
            "attempting BDDs with node limit {}",
            params.bdd_node_limit
        ));
        match engines.collapse(handle.get(), params.bdd_node_limit, params.bdd_reorder)? {
            Some(aig) => {
                handle.replace(aig);
                progress.stage("BDD building", handle.get());
                if handle.get().output_constant(0) == Some(false) {
                    verdict = Verdict::Unsat;
                }
            }
            None => progress.message("BDD building: node limit exceeded"),
        }
    }

    // Last resort SAT
    if !verdict.is_decided() {
        progress.message(&format!(
            "final SAT with conflict limit {}",
            params.last_resort_limit
        ));
        let limits = Limits::new(params.last_resort_limit, params.budget.remaining_probes());
        let run = engines.sat(handle.get(), limits)?;
        params.budget.add(run.consumed);
        progress.stage("final SAT", handle.get());
        verdict = run.verdict;
    }

    Ok(verdict)
}

/// Checks the equivalence of two circuits with the same inputs and number of outputs.
///
/// Builds their miter and proves it. Returns the outcome, and the network the proof ended with.
/// A [`ProofOutcome::Sat`] model is a counterexample: an input assignment on which the two
/// circuits differ.
pub fn check_equivalence(a: &Aig, b: &Aig, params: &mut ProveParams) -> Result<(ProofOutcome, Aig)> {
    let miter = build_miter(a, b)?;
    let mut handle = NetworkHandle::new(miter);
    let outcome = prove(&mut handle, params)?;
    Ok((outcome, handle.into_inner()))
}
