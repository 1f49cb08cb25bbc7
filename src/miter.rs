//! Generate miters between two circuits.
//!
//! To prove combinational equivalence checking (CEC) between two circuits `a` and `b`:
//! - generate the miter of `a` and `b` with [`build_miter`]
//! - prove its single output is always false, see [`crate::prove`].
//!
//! If the output can be true, the two circuits are **not equivalent**,
//! and the input assignment making it true is a counterexample.

use thiserror::Error;

use crate::{Aig, NodeId, Result};

/// Error returned when the creation of a miter fails.
#[derive(Debug, Error)]
pub enum MiterError {
    /// Creation of a miter failed because the two AIGs have different inputs.
    /// We are just checking for the inputs id, they should correspond.
    #[error("AIGs have different inputs : {0:?} vs {1:?}")]
    MiterDifferentInputs(Vec<NodeId>, Vec<NodeId>),

    /// Creation of a miter failed because the two AIGs have a different number of outputs.
    /// Outputs are paired by position.
    #[error("trying to construct a miter between AIGs with {0} and {1} outputs")]
    MiterDifferentOutputs(usize, usize),

    /// There is nothing to compare.
    #[error("trying to construct a miter between AIGs without outputs")]
    MiterNoOutputs,
}

/// Builds the miter of `a` and `b`: a new single-output AIG, true iff the two AIGs disagree.
///
/// For background on what is a miter, please check
/// [Verification of large synthesized designs](https://doi.org/10.1109/ICCAD.1993.580110) by D. Brand.
///
/// The k-th output of `a` is compared with the k-th output of `b` through a XOR,
/// and the output of the miter is the OR of all these XORs.
/// Both AIGs are copied through the structural hashing table, so shared logic is merged and
/// structurally identical circuits give a constant false output.
///
/// This will fail if the given AIGs have different inputs (ie inputs with different ids)
/// or a different number of outputs.
///
/// ```rust
/// use aigprove::{Aig, miter::build_miter};
/// let mut a = Aig::new();
/// let x = a.add_input(1).unwrap();
/// let y = a.add_input(2).unwrap();
/// let o = a.and(&x, &y).unwrap();
/// a.add_output_edge(&o).unwrap();
///
/// let mut b = Aig::new();
/// let x = b.add_input(1).unwrap();
/// let y = b.add_input(2).unwrap();
/// let o = b.and(&y, &x).unwrap();
/// b.add_output_edge(&o).unwrap();
///
/// let miter = build_miter(&a, &b).unwrap();
/// assert_eq!(miter.output_constant(0), Some(false));
/// ```
pub fn build_miter(a: &Aig, b: &Aig) -> Result<Aig> {
    // Checking inputs
    if a.get_inputs_id() != b.get_inputs_id() {
        return Err(MiterError::MiterDifferentInputs(a.get_inputs_id(), b.get_inputs_id()).into());
    }

    // Checking outputs
    if a.output_count() != b.output_count() {
        return Err(MiterError::MiterDifferentOutputs(a.output_count(), b.output_count()).into());
    }
    if a.output_count() == 0 {
        return Err(MiterError::MiterNoOutputs.into());
    }

    let mut miter = a.empty_like()?;
    let outputs_a = a.copy_into_with(&mut miter, |aig, _, f0, f1| aig.and(&f0, &f1))?;
    let outputs_b = b.copy_into_with(&mut miter, |aig, _, f0, f1| aig.and(&f0, &f1))?;

    let mut output = miter.false_edge();
    for (oa, ob) in outputs_a.iter().zip(&outputs_b) {
        let diff = miter.xor(oa, ob)?;
        output = miter.or(&output, &diff)?;
    }
    miter.add_output_edge(&output)?;
    miter.update();

    log::debug!(
        "miter built: {} inputs, {} outputs compared, {} nodes",
        miter.input_count(),
        outputs_a.len(),
        miter.node_count()
    );

    Ok(miter)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::AigError;

    fn and_or(swap: bool) -> Aig {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let a = if swap {
            aig.and(&y, &x).unwrap()
        } else {
            aig.and(&x, &y).unwrap()
        };
        let o = aig.or(&x, &y).unwrap();
        aig.add_output_edge(&a).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();
        aig
    }

    #[test]
    fn identical_circuits_give_constant_miter() {
        let miter = build_miter(&and_or(false), &and_or(true)).unwrap();
        assert_eq!(miter.output_count(), 1);
        assert_eq!(miter.output_constant(0), Some(false));
        assert_eq!(miter.node_count(), 0);
        assert_eq!(miter.get_inputs_id(), vec![1, 2]);
    }

    #[test]
    fn swapped_outputs_are_distinguished() {
        let a = and_or(false);
        let mut b = Aig::new();
        let x = b.add_input(1).unwrap();
        let y = b.add_input(2).unwrap();
        let o = b.or(&x, &y).unwrap();
        let n = b.and(&x, &y).unwrap();
        b.add_output_edge(&o).unwrap();
        b.add_output_edge(&n).unwrap();

        let miter = build_miter(&a, &b).unwrap();
        assert_eq!(miter.output_constant(0), None);
        for bits in 0..4u32 {
            let (vx, vy) = (bits & 1 != 0, bits & 2 != 0);
            // x & y differs from x | y iff exactly one input is set
            assert_eq!(miter.evaluate(&[vx, vy]).unwrap(), vec![vx ^ vy]);
        }
    }

    #[test]
    fn different_inputs() {
        let a = and_or(false);
        let mut b = Aig::new();
        b.add_input(1).unwrap();
        b.add_input(3).unwrap();
        assert!(matches!(
            build_miter(&a, &b),
            Err(AigError::MiterError(MiterError::MiterDifferentInputs(_, _)))
        ));
    }

    #[test]
    fn different_outputs() {
        let a = and_or(false);
        let mut b = Aig::new();
        let x = b.add_input(1).unwrap();
        b.add_input(2).unwrap();
        b.add_output_edge(&x).unwrap();
        assert!(matches!(
            build_miter(&a, &b),
            Err(AigError::MiterError(MiterError::MiterDifferentOutputs(2, 1)))
        ));

        let mut c = Aig::new();
        c.add_input(1).unwrap();
        c.add_input(2).unwrap();
        assert!(matches!(
            build_miter(&c, &c),
            Err(AigError::MiterError(MiterError::MiterNoOutputs))
        ));
    }
}
