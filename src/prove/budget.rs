use super::Consumption;

/// Resources consumed by a proof, against optional global ceilings.
///
/// Work units are SAT conflicts, probes are clause inspections. A ceiling of 0 means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceBudget {
    pub work_limit: u64,
    pub probe_limit: u64,
    pub work_used: u64,
    pub probe_used: u64,
}

impl ResourceBudget {
    /// A budget with the given ceilings and nothing consumed yet.
    pub fn new(work_limit: u64, probe_limit: u64) -> Self {
        ResourceBudget {
            work_limit,
            probe_limit,
            ..Default::default()
        }
    }

    pub fn add(&mut self, consumed: Consumption) {
        self.work_used = self.work_used.saturating_add(consumed.work);
        self.probe_used = self.probe_used.saturating_add(consumed.probes);
    }

    /// True iff a (nonzero) ceiling is reached.
    pub fn exceeded(&self) -> bool {
        (self.work_limit > 0 && self.work_used >= self.work_limit)
            || (self.probe_limit > 0 && self.probe_used >= self.probe_limit)
    }

    /// Probes left before the ceiling, 0 when there is no ceiling.
    ///
    /// Matches the convention of engine limits, where 0 means unbounded. Only meaningful while
    /// the budget is not exceeded.
    pub fn remaining_probes(&self) -> u64 {
        if self.probe_limit == 0 {
            0
        } else {
            self.probe_limit.saturating_sub(self.probe_used)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unbounded_never_exceeded() {
        let mut budget = ResourceBudget::default();
        budget.add(Consumption::new(u64::MAX, u64::MAX));
        budget.add(Consumption::new(1, 1));
        assert!(!budget.exceeded());
        assert_eq!(budget.work_used, u64::MAX);
        assert_eq!(budget.remaining_probes(), 0);
    }

    #[test]
    fn ceilings_are_inclusive() {
        let mut budget = ResourceBudget::new(0, 10);
        budget.add(Consumption::new(100, 9));
        assert!(!budget.exceeded());
        assert_eq!(budget.remaining_probes(), 1);
        budget.add(Consumption::new(0, 1));
        assert!(budget.exceeded());

        let mut budget = ResourceBudget::new(5, 0);
        budget.add(Consumption::new(5, 0));
        assert!(budget.exceeded());
    }
}
