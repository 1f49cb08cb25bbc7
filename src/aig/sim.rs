//! Bit-parallel simulation: every signal carries a vector of 64-bit words, one pattern per bit.

use std::collections::HashMap;

use crate::{Aig, AigEdge, AigError, AigNode, NodeId, Result};

/// Simulation words of a node, as returned by [`Aig::simulate`].
pub type SimWords = Vec<u64>;

/// Words carried by `edge`, complemented if needed.
///
/// Nodes missing from `values` (not reachable from an output) simulate as constant 0.
pub fn edge_words(values: &HashMap<NodeId, SimWords>, edge: &AigEdge) -> SimWords {
    let words = values
        .get(&edge.get_node_id())
        .cloned()
        .unwrap_or_default();
    if edge.get_complement() {
        words.into_iter().map(|w| !w).collect()
    } else {
        words
    }
}

impl Aig {
    /// Simulates the AIG on the given patterns.
    ///
    /// `patterns[k]` are the words of the k-th input (declaration order), all of the same length.
    /// Returns the words of every node reachable from an output, plus all the inputs.
    pub fn simulate(&self, patterns: &[SimWords]) -> Result<HashMap<NodeId, SimWords>> {
        let inputs = self.get_inputs_id();
        if patterns.len() != inputs.len() {
            return Err(AigError::InvalidState(format!(
                "simulation needs {} input patterns, got {}",
                inputs.len(),
                patterns.len()
            )));
        }
        let n_words = patterns.first().map(Vec::len).unwrap_or(1);
        if patterns.iter().any(|p| p.len() != n_words) {
            return Err(AigError::InvalidState(
                "simulation patterns have different lengths".to_string(),
            ));
        }

        let mut values: HashMap<NodeId, SimWords> = HashMap::from([(0, vec![0; n_words])]);
        for (id, words) in inputs.into_iter().zip(patterns) {
            values.insert(id, words.clone());
        }

        for node in self.get_topological_sort() {
            if let AigNode::And {
                id, fanin0, fanin1, ..
            } = node.as_ref()
            {
                let w0 = &values[&fanin0.get_node_id()];
                let w1 = &values[&fanin1.get_node_id()];
                let (c0, c1) = (fanin0.get_complement(), fanin1.get_complement());
                let words = w0
                    .iter()
                    .zip(w1)
                    .map(|(&a, &b)| {
                        let a = if c0 { !a } else { a };
                        let b = if c1 { !b } else { b };
                        a & b
                    })
                    .collect();
                values.insert(*id, words);
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simulate_and_xor() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let a = aig.and(&x, &y).unwrap();
        let o = aig.xor(&x, &y).unwrap();
        aig.add_output_edge(&a).unwrap();
        aig.add_output_edge(&o).unwrap();

        let values = aig
            .simulate(&[vec![0b1100, u64::MAX], vec![0b1010, 0]])
            .unwrap();
        assert_eq!(edge_words(&values, &a), vec![0b1000, 0]);
        assert_eq!(edge_words(&values, &o), vec![0b0110, u64::MAX]);
        assert_eq!(edge_words(&values, &!o), vec![!0b0110, 0]);
    }

    #[test]
    fn wrong_pattern_count() {
        let mut aig = Aig::new();
        aig.add_input(1).unwrap();
        assert!(aig.simulate(&[]).is_err());
        assert!(aig.evaluate(&[true, false]).is_err());
    }
}
