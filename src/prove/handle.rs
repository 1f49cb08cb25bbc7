use crate::Aig;

/// Owner of the single live network of a proof.
///
/// Engines never modify a network in place: each step builds a new one, which replaces the
/// current network through [`NetworkHandle::replace`]. The previous network is dropped right
/// away, so no two networks of a proof are alive at the same time.
#[derive(Debug)]
pub struct NetworkHandle {
    aig: Aig,
}

impl NetworkHandle {
    pub fn new(aig: Aig) -> Self {
        NetworkHandle { aig }
    }

    /// The current network.
    pub fn get(&self) -> &Aig {
        &self.aig
    }

    /// Replaces the current network, which is dropped.
    pub fn replace(&mut self, aig: Aig) {
        self.aig = aig;
    }

    pub fn into_inner(self) -> Aig {
        self.aig
    }
}

impl From<Aig> for NetworkHandle {
    fn from(aig: Aig) -> Self {
        NetworkHandle::new(aig)
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn replaced_network_is_dropped() {
        let mut aig = Aig::new();
        let x = aig.add_input(1).unwrap();
        let y = aig.add_input(2).unwrap();
        let o = aig.and(&x, &y).unwrap();
        aig.add_output_edge(&o).unwrap();
        aig.update();
        let weak = Rc::downgrade(&o.get_node());
        drop(o);
        drop(x);
        drop(y);

        let mut handle = NetworkHandle::new(aig);
        assert!(weak.upgrade().is_some());
        let copy = handle.get().strash().unwrap();
        handle.replace(copy);
        assert!(weak.upgrade().is_none());
        assert_eq!(handle.get().node_count(), 1);
    }
}
