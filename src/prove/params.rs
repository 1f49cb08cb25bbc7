use std::fmt;

use super::ResourceBudget;

/// Geometric growth of the effort given to a stage: `limit(i) = floor(start * factor^i)`.
///
/// ```rust
/// use aigprove::prove::StageSchedule;
/// let schedule = StageSchedule::new(100, 2.0);
/// assert_eq!(schedule.limit(2), 400);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSchedule {
    pub start: u64,
    pub factor: f64,
}

impl StageSchedule {
    pub fn new(start: u64, factor: f64) -> Self {
        StageSchedule { start, factor }
    }

    /// Limit of the stage at the given iteration, truncated toward zero.
    pub fn limit(&self, iteration: u32) -> u64 {
        // The cast saturates on overflow
        (self.start as f64 * self.factor.powf(iteration as f64)).floor() as u64
    }
}

impl fmt::Display for StageSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "start = {}, factor = {}", self.start, self.factor)
    }
}

/// Parameters of a proof, see [`crate::prove::prove`].
///
/// The budget also carries the running totals: after a call, `budget.work_used` and
/// `budget.probe_used` tell how much was consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProveParams {
    /// Maximum number of iterations of the escalation loop.
    pub iters: u32,
    /// Use the local optimizations (rewrite, refactor, balance).
    pub use_rewriting: bool,
    /// Use fraiging.
    pub use_fraiging: bool,
    /// Try a BDD collapse once the iterations are exhausted.
    pub use_bdds: bool,
    /// Report the progress of each stage at `info` level instead of `debug`.
    pub verbose: bool,

    /// Conflict limit of the SAT attempt of each iteration.
    pub mitering: StageSchedule,
    /// Number of local optimization steps of each iteration.
    pub rewriting: StageSchedule,
    /// Per-pair conflict limit of the fraiging of each iteration.
    pub fraiging: StageSchedule,
    /// Conflict limit of the last SAT attempt, 0 for no limit.
    pub last_resort_limit: u64,

    /// Global ceilings and running totals.
    pub budget: ResourceBudget,

    /// Maximum number of BDD nodes.
    pub bdd_node_limit: usize,
    /// Order the BDD variables along a traversal of the network.
    pub bdd_reorder: bool,
}

impl Default for ProveParams {
    fn default() -> Self {
        ProveParams {
            iters: 6,
            use_rewriting: true,
            use_fraiging: true,
            use_bdds: false,
            verbose: false,
            mitering: StageSchedule::new(5000, 2.0),
            rewriting: StageSchedule::new(3, 1.0),
            fraiging: StageSchedule::new(2, 8.0),
            last_resort_limit: 0,
            budget: ResourceBudget::default(),
            bdd_node_limit: 1_000_000,
            bdd_reorder: true,
        }
    }
}

impl ProveParams {
    /// One line per group of settings, as printed in verbose mode.
    pub fn summary(&self) -> Vec<String> {
        vec![
            format!(
                "iterations = {}, rewriting = {}, fraiging = {}, BDDs = {}",
                self.iters, self.use_rewriting, self.use_fraiging, self.use_bdds
            ),
            format!(
                "mitering: {}; rewriting: {}; fraiging: {}; last resort limit = {}",
                self.mitering, self.rewriting, self.fraiging, self.last_resort_limit
            ),
            format!(
                "resource limits: work = {}, probes = {}",
                self.budget.work_limit, self.budget.probe_limit
            ),
        ]
    }

    /// The limits of each stage at iteration `i` (0-based).
    pub fn iteration_summary(&self, i: u32) -> String {
        format!(
            "ITERATION {}: mitering limit = {}, rewriting steps = {}, fraiging limit = {}",
            i + 1,
            self.mitering.limit(i),
            self.rewriting.limit(i),
            self.fraiging.limit(i)
        )
    }
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::*;

    #[test_case(100, 2.0, 0 => 100)]
    #[test_case(100, 2.0, 1 => 200)]
    #[test_case(100, 2.0, 2 => 400)]
    #[test_case(3, 1.0, 5 => 3)]
    #[test_case(2, 8.0, 3 => 1024)]
    #[test_case(5, 1.5, 1 => 7 ; "truncated toward zero")]
    #[test_case(0, 8.0, 4 => 0)]
    fn schedule(start: u64, factor: f64, iteration: u32) -> u64 {
        StageSchedule::new(start, factor).limit(iteration)
    }

    #[test]
    fn huge_limits_saturate() {
        assert_eq!(StageSchedule::new(u64::MAX, 8.0).limit(30), u64::MAX);
    }

    #[test]
    fn defaults() {
        let params = ProveParams::default();
        assert_eq!(params.iters, 6);
        assert!(params.use_rewriting && params.use_fraiging);
        assert!(!params.use_bdds);
        assert_eq!(params.mitering.limit(1), 10_000);
        assert_eq!(params.budget, ResourceBudget::default());
    }

    #[test]
    fn summaries() {
        let params = ProveParams {
            budget: ResourceBudget::new(0, 1000),
            ..Default::default()
        };
        assert_eq!(
            params.summary(),
            vec![
                "iterations = 6, rewriting = true, fraiging = true, BDDs = false",
                "mitering: start = 5000, factor = 2; rewriting: start = 3, factor = 1; \
                 fraiging: start = 2, factor = 8; last resort limit = 0",
                "resource limits: work = 0, probes = 1000",
            ]
        );
        assert_eq!(
            params.iteration_summary(1),
            "ITERATION 2: mitering limit = 10000, rewriting steps = 3, fraiging limit = 16"
        );
    }
}
