use crate::Result;

use super::{Engines, NetworkHandle};

/// The passes of the local optimization driver, applied in rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Pass {
    Rewrite,
    Refactor,
    Balance,
}

impl Pass {
    const ROTATION: [Pass; 3] = [Pass::Rewrite, Pass::Refactor, Pass::Balance];

    pub(super) fn nth(step: u64) -> Pass {
        Pass::ROTATION[(step % 3) as usize]
    }
}

/// Applies up to `steps` local optimizations (rewrite, refactor, balance, rewrite, ...).
///
/// Stops as soon as the output becomes a constant and returns its value.
pub(super) fn optimize<E: Engines + ?Sized>(
    handle: &mut NetworkHandle,
    engines: &mut E,
    steps: u64,
) -> Result<Option<bool>> {
    for step in 0..steps {
        let aig = handle.get();
        let new = match Pass::nth(step) {
            Pass::Rewrite => engines.rewrite(aig)?,
            Pass::Refactor => engines.refactor(aig)?,
            Pass::Balance => engines.balance(aig)?,
        };
        handle.replace(new);

        if let Some(value) = handle.get().output_constant(0) {
            log::trace!("local optimization: constant {} after {} steps", value, step + 1);
            return Ok(Some(value));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Aig;

    #[derive(Default)]
    struct Recorder {
        passes: Vec<Pass>,
    }

    impl Engines for Recorder {
        fn rewrite(&mut self, aig: &Aig) -> Result<Aig> {
            self.passes.push(Pass::Rewrite);
            aig.strash()
        }

        fn refactor(&mut self, aig: &Aig) -> Result<Aig> {
            self.passes.push(Pass::Refactor);
            aig.strash()
        }

        fn balance(&mut self, aig: &Aig) -> Result<Aig> {
            self.passes.push(Pass::Balance);
            aig.strash()
        }
    }

    fn and_gate() -> Aig {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let o = aig.and(&x, &y).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();
        aig
    }

    #[test]
    fn passes_rotate() {
        let mut handle = NetworkHandle::new(and_gate());
        let mut engines = Recorder::default();
        assert_eq!(optimize(&mut handle, &mut engines, 5).unwrap(), None);
        assert_eq!(
            engines.passes,
            vec![
                Pass::Rewrite,
                Pass::Refactor,
                Pass::Balance,
                Pass::Rewrite,
                Pass::Refactor
            ]
        );
    }

    #[test]
    fn zero_steps_does_nothing() {
        let mut handle = NetworkHandle::new(and_gate());
        let mut engines = Recorder::default();
        assert_eq!(optimize(&mut handle, &mut engines, 0).unwrap(), None);
        assert!(engines.passes.is_empty());
    }

    #[test]
    fn stops_on_constant() {
        // x & (x | y) & !x
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let o = aig.or(&x, &y).unwrap();
        let o = aig.and(&!x.clone(), &o).unwrap();
        let o = aig.and(&o, &x).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();
        assert_eq!(aig.output_constant(0), None);

        let mut handle = NetworkHandle::new(aig);
        let mut engines = crate::prove::DefaultEngines::default();
        assert_eq!(optimize(&mut handle, &mut engines, 3).unwrap(), Some(false));
    }
}
