//! Functionally reduced AIGs (fraiging).
//!
//! Random simulation splits the nodes into candidate equivalence classes: two nodes whose
//! simulation signatures are equal (or complementary) may compute the same function. Each candidate
//! pair is then checked with a bounded SAT call while the network is rebuilt, and proven pairs are
//! merged. Constant nodes are candidates too, through the class of the `False` node.
//!
//! On a miter, fraiging doubles as a decision procedure: a simulation pattern making the output
//! true is a counterexample, and a miter whose output merges with `False` is proven.

use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::{
    Aig, AigEdge, AigError, AigNode, AigNodeRef, NodeId, Result,
    aig::{
        map_edge,
        sim::{SimWords, edge_words},
    },
    cnf::{Clause, ConeEncoder},
    sat::{SatResult, Solver},
};

/// Maximum number of 64-bit simulation words per node.
const MAX_SIM_WORDS: usize = 32;
/// Bound on the total size of the simulation table, in words.
const SIM_TABLE_WORDS: usize = 1 << 27;

/// Parameters of [`fraig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FraigParams {
    /// Number of 64-bit simulation words per node, 0 to size it from the network.
    pub sim_words: usize,
    /// Seed of the random patterns.
    pub seed: u64,
    /// Maximum number of conflicts for each candidate pair, 0 for no limit.
    pub pair_conflict_limit: u64,
    /// Maximum number of clause inspections for the whole call, 0 for no limit.
    pub inspect_limit: u64,
}

impl Default for FraigParams {
    fn default() -> Self {
        FraigParams {
            sim_words: 0,
            seed: 0x0F4A_16ED,
            pair_conflict_limit: 100,
            inspect_limit: 0,
        }
    }
}

/// Counters of a [`fraig`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FraigStats {
    /// Candidate pairs proven equivalent and merged.
    pub proved: u64,
    /// Candidate pairs told apart by the SAT solver.
    pub disproved: u64,
    /// Candidate pairs left undecided because of a limit.
    pub sat_fails: u64,
    pub conflicts: u64,
    pub inspects: u64,
}

/// Result of a [`fraig`] call.
#[derive(Debug)]
pub struct FraigResult {
    /// The reduced network.
    pub aig: Aig,
    /// Input assignment (declaration order) making an output true, if one was met.
    pub counterexample: Option<Vec<bool>>,
    pub stats: FraigStats,
}

/// Number of simulation words used for `aig`.
fn sim_words(aig: &Aig, params: &FraigParams) -> usize {
    if params.sim_words > 0 {
        return params.sim_words;
    }
    let size = aig.node_count() + aig.input_count() + 1;
    (SIM_TABLE_WORDS / size).clamp(1, MAX_SIM_WORDS)
}

/// Input assignment of pattern `bit` of the simulation.
fn pattern(patterns: &[SimWords], bit: usize) -> Vec<bool> {
    patterns
        .iter()
        .map(|words| words[bit / 64] >> (bit % 64) & 1 == 1)
        .collect()
}

/// First simulation pattern making one of the outputs true.
fn simulated_counterexample(
    aig: &Aig,
    patterns: &[SimWords],
    values: &HashMap<NodeId, SimWords>,
) -> Option<Vec<bool>> {
    aig.get_outputs().iter().find_map(|output| {
        edge_words(values, output)
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .map(|(w, word)| pattern(patterns, 64 * w + word.trailing_zeros() as usize))
    })
}

/// Signature of a node up to complementation, and whether it was complemented.
fn normalized(words: &[u64]) -> (Vec<u64>, bool) {
    let phase = words.first().is_some_and(|w| w & 1 == 1);
    if phase {
        (words.iter().map(|w| !w).collect(), true)
    } else {
        (words.to_vec(), false)
    }
}

/// Bounded SAT check of `a == b` in `aig`.
struct PairCheck {
    result: SatResult,
    conflicts: u64,
    inspects: u64,
    /// Assignment of the inputs telling `a` and `b` apart, on [`SatResult::Sat`].
    counterexample: Vec<bool>,
}

fn check_pair(aig: &Aig, a: &AigEdge, b: &AigEdge, conflicts: u64, inspects: u64) -> PairCheck {
    let mut encoder = ConeEncoder::new();
    let la = encoder.encode(a);
    let lb = encoder.encode(b);
    // a != b
    encoder.add_clause_if(Clause::from_lit_res(vec![la, lb]));
    encoder.add_clause_if(Clause::from_lit_res(vec![!la, !lb]));

    let mut solver = Solver::from_cnf(encoder.cnf());
    solver.set_conflict_limit(conflicts);
    solver.set_inspect_limit(inspects);
    let result = solver.solve();

    let counterexample = if result == SatResult::Sat {
        aig.get_inputs_id()
            .into_iter()
            .map(|id| {
                encoder
                    .lit_of(id)
                    .and_then(|lit| solver.value(lit))
                    .unwrap_or(false)
            })
            .collect()
    } else {
        Vec::new()
    };

    PairCheck {
        result,
        conflicts: solver.stats().conflicts,
        inspects: solver.stats().inspects,
        counterexample,
    }
}

/// Fraigs `aig`: simulates it, then rebuilds it merging the candidate pairs proven by SAT.
///
/// Any pattern met on the way (random or from a disproved pair) that sets an output to true is
/// returned as a counterexample.
///
/// The inspection limit bounds the SAT effort of the whole call: once it is spent, the
/// remaining gates are copied as they are.
pub fn fraig(aig: &Aig, params: &FraigParams) -> Result<FraigResult> {
    let n_words = sim_words(aig, params);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);
    let patterns: Vec<SimWords> = (0..aig.input_count())
        .map(|_| (0..n_words).map(|_| rng.next_u64()).collect())
        .collect();
    let values = aig.simulate(&patterns)?;

    let mut counterexample = simulated_counterexample(aig, &patterns, &values);
    if counterexample.is_some() {
        log::debug!("fraig: counterexample found by simulation");
    }

    // Representative of each class: the first node met, the constant and inputs coming first
    let order = aig.get_topological_sort();
    let mut classes: HashMap<Vec<u64>, (NodeId, bool)> = HashMap::new();
    classes.insert(vec![0; n_words], (0, false));
    let mut candidates: HashMap<NodeId, (NodeId, bool)> = HashMap::new();
    let inputs = aig.get_inputs();
    let nodes = inputs.iter().chain(order.iter().filter(|node| node.is_and()));
    for node in nodes {
        let Some(words) = values.get(&node.get_id()) else {
            continue;
        };
        let (signature, phase) = normalized(words);
        match classes.get(&signature) {
            Some(&(repr, repr_phase)) => {
                candidates.insert(node.get_id(), (repr, phase != repr_phase));
            }
            None => {
                classes.insert(signature, (node.get_id(), phase));
            }
        }
    }

    let mut new = aig.empty_like()?;
    let mut map: HashMap<NodeId, AigEdge> = HashMap::from([(0, new.false_edge())]);
    for id in aig.get_inputs_id() {
        map.insert(id, new.input_edge(id)?);
    }
    let mut stats = FraigStats::default();

    for node in &order {
        let AigNode::And {
            id, fanin0, fanin1, ..
        } = node.as_ref()
        else {
            continue;
        };
        let f0 = map_edge(&map, fanin0)?;
        let f1 = map_edge(&map, fanin1)?;
        let mut edge = new.and(&f0, &f1)?;

        let budget_left = params.inspect_limit == 0 || stats.inspects < params.inspect_limit;
        if let Some(&(repr, complement)) = candidates.get(id).filter(|_| budget_left) {
            let repr_edge = map_edge(&map, &AigEdge::new(existing_node(aig, repr)?, complement))?;
            if repr_edge != edge {
                let inspects = match params.inspect_limit {
                    0 => 0,
                    limit => limit - stats.inspects,
                };
                let check =
                    check_pair(&new, &edge, &repr_edge, params.pair_conflict_limit, inspects);
                stats.conflicts += check.conflicts;
                stats.inspects += check.inspects;
                match check.result {
                    SatResult::Unsat => {
                        stats.proved += 1;
                        edge = repr_edge;
                    }
                    SatResult::Sat => {
                        stats.disproved += 1;
                        if counterexample.is_none()
                            && aig.evaluate(&check.counterexample)?.contains(&true)
                        {
                            counterexample = Some(check.counterexample);
                        }
                    }
                    SatResult::Unknown => stats.sat_fails += 1,
                }
            }
        }
        map.insert(*id, edge);
    }

    for output in aig.get_outputs() {
        let edge = map_edge(&map, &output)?;
        new.add_output_edge(&edge)?;
    }
    new.update();

    log::debug!(
        "fraig: {} -> {} nodes, {} proved, {} disproved, {} undecided, {} conflicts, {} inspects",
        aig.node_count(),
        new.node_count(),
        stats.proved,
        stats.disproved,
        stats.sat_fails,
        stats.conflicts,
        stats.inspects
    );

    Ok(FraigResult {
        aig: new,
        counterexample,
        stats,
    })
}

/// A node of `aig` that must exist.
fn existing_node(aig: &Aig, id: NodeId) -> Result<AigNodeRef> {
    aig.get_node(id).ok_or(AigError::NodeDoesNotExist(id))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sim_words_are_bounded() {
        let aig = Aig::new();
        assert_eq!(sim_words(&aig, &FraigParams::default()), MAX_SIM_WORDS);
        let params = FraigParams {
            sim_words: 3,
            ..Default::default()
        };
        assert_eq!(sim_words(&aig, &params), 3);
    }

    #[test]
    fn redundant_logic_is_merged() {
        // x & (y & z) and (x & y) & z are the same function
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let z = aig.add_input(3).unwrap();
        let yz = aig.and(&y, &z).unwrap();
        let l = aig.and(&x, &yz).unwrap();
        let xy = aig.and(&x, &y).unwrap();
        let r = aig.and(&xy, &z).unwrap();
        aig.add_output_edge(&l).unwrap();
        aig.add_output_edge(&r).unwrap();
        aig.update();
        assert_eq!(aig.node_count(), 4);

        let result = fraig(&aig, &FraigParams::default()).unwrap();
        assert!(result.counterexample.is_some());
        assert_eq!(result.stats.proved, 1);
        assert_eq!(result.aig.node_count(), 2);
        let outputs = result.aig.get_outputs();
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn equivalent_miter_becomes_constant() {
        // x ^ y against (x | y) & !(x & y)
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let a = aig.xor(&x, &y).unwrap();
        let o = aig.or(&x, &y).unwrap();
        let n = aig.and(&x, &y).unwrap();
        let b = aig.and(&o, &!n).unwrap();
        let miter = aig.xor(&a, &b).unwrap();
        aig.add_output_edge(&miter).unwrap();
        aig.update();

        let result = fraig(&aig, &FraigParams::default()).unwrap();
        assert_eq!(result.counterexample, None);
        assert_eq!(result.aig.output_constant(0), Some(false));
    }

    #[test]
    fn simulation_finds_counterexample() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let o = aig.and(&x, &!y.clone()).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();

        let result = fraig(&aig, &FraigParams::default()).unwrap();
        assert_eq!(result.counterexample, Some(vec![true, false]));
        assert_eq!(result.stats, FraigStats::default());
    }

    #[test]
    fn exhausted_inspections_stop_the_checks() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let a = aig.xor(&x, &y).unwrap();
        let o = aig.or(&x, &y).unwrap();
        let n = aig.and(&x, &y).unwrap();
        let b = aig.and(&o, &!n).unwrap();
        let miter = aig.xor(&a, &b).unwrap();
        aig.add_output_edge(&miter).unwrap();
        aig.update();

        let params = FraigParams {
            inspect_limit: 1,
            ..Default::default()
        };
        let result = fraig(&aig, &params).unwrap();
        assert!(result.stats.inspects >= 1);
        assert_eq!(result.stats.proved + result.stats.disproved + result.stats.sat_fails, 1);
    }
}
