use std::fmt;

/// Values of the primary inputs, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Model(Vec<bool>);

impl Model {
    pub fn new(values: Vec<bool>) -> Self {
        Model(values)
    }

    /// The all-false assignment of `n` inputs.
    pub fn zeros(n: usize) -> Self {
        Model(vec![false; n])
    }

    pub fn values(&self) -> &[bool] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<bool>> for Model {
    fn from(values: Vec<bool>) -> Self {
        Model(values)
    }
}

impl fmt::Display for Model {
    /// One character per input, `0` or `1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &value in &self.0 {
            write!(f, "{}", if value { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// Final answer of a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    /// The resources ran out before an answer.
    Timeout,
    /// The output can be true, the model is a witness.
    Sat(Model),
    /// The output is always false.
    Unsat,
}

impl ProofOutcome {
    /// Numeric status: -1 for timeout, 0 for sat, 1 for unsat.
    pub fn code(&self) -> i32 {
        match self {
            ProofOutcome::Timeout => -1,
            ProofOutcome::Sat(_) => 0,
            ProofOutcome::Unsat => 1,
        }
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            ProofOutcome::Sat(model) => Some(model),
            _ => None,
        }
    }
}

impl fmt::Display for ProofOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofOutcome::Timeout => write!(f, "UNDECIDED"),
            ProofOutcome::Sat(_) => write!(f, "SAT"),
            ProofOutcome::Unsat => write!(f, "UNSAT"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_and_display() {
        assert_eq!(ProofOutcome::Timeout.code(), -1);
        assert_eq!(ProofOutcome::Unsat.code(), 1);
        let sat = ProofOutcome::Sat(Model::new(vec![true, false, true]));
        assert_eq!(sat.code(), 0);
        assert_eq!(sat.to_string(), "SAT");
        assert_eq!(sat.model().unwrap().to_string(), "101");
        assert_eq!(ProofOutcome::Unsat.model(), None);
    }

    #[test]
    fn zeros() {
        let model = Model::zeros(3);
        assert_eq!(model.values(), &[false, false, false]);
        assert_eq!(model.len(), 3);
        assert!(Model::zeros(0).is_empty());
    }
}
