//! Two-level AIG rewriting.
//!
//! When creating `a & b`, the fanins of `a` and `b` are inspected too. The rules are those of
//! Brummayer and Biere, "Local Two-Level And-Inverter Graph Minimization without Blowup":
//! contradiction, idempotence, subsumption, substitution and resolution.

use crate::{Aig, AigEdge, Result};

/// Children of `edge` if it points at an and gate.
fn children(edge: &AigEdge) -> Option<(AigEdge, AigEdge)> {
    let fanins = edge.get_node().get_fanins();
    match fanins.as_slice() {
        [f0, f1] => Some((f0.clone(), f1.clone())),
        _ => None,
    }
}

/// Rules where only `a` is looked into.
fn asymmetric(aig: &mut Aig, a: &AigEdge, b: &AigEdge) -> Result<Option<AigEdge>> {
    let Some((a0, a1)) = children(a) else {
        return Ok(None);
    };

    if !a.get_complement() {
        // Contradiction: (x & y) & !x = 0
        if a0.is_complement_of(b) || a1.is_complement_of(b) {
            return Ok(Some(aig.false_edge()));
        }
        // Idempotence: (x & y) & x = x & y
        if a0 == *b || a1 == *b {
            return Ok(Some(a.clone()));
        }
    } else {
        // Subsumption: !(!x & y) & x = x
        if a0.is_complement_of(b) || a1.is_complement_of(b) {
            return Ok(Some(b.clone()));
        }
        // Substitution: !(x & y) & x = !y & x
        if a0 == *b {
            return aig.and(&!a1, b).map(Some);
        }
        if a1 == *b {
            return aig.and(&!a0, b).map(Some);
        }
    }

    Ok(None)
}

/// Rules where both `a` and `b` are looked into.
fn symmetric(aig: &mut Aig, a: &AigEdge, b: &AigEdge) -> Result<Option<AigEdge>> {
    let (Some((a0, a1)), Some((b0, b1))) = (children(a), children(b)) else {
        return Ok(None);
    };
    let a_children = [&a0, &a1];
    let b_children = [&b0, &b1];

    match (a.get_complement(), b.get_complement()) {
        (false, false) => {
            // Contradiction: (x & y) & (!x & z) = 0
            let clash = a_children
                .iter()
                .any(|x| b_children.iter().any(|y| x.is_complement_of(y)));
            if clash {
                return Ok(Some(aig.false_edge()));
            }
        }
        (true, false) => {
            // Subsumption: !(!x & y) & (x & z) = x & z
            let subsumed = a_children
                .iter()
                .any(|x| b_children.iter().any(|y| x.is_complement_of(y)));
            if subsumed {
                return Ok(Some(b.clone()));
            }
            // Substitution: !(x & y) & (x & z) = !y & (x & z)
            if b_children.contains(&&a0) {
                return aig.and(&!a1, b).map(Some);
            }
            if b_children.contains(&&a1) {
                return aig.and(&!a0, b).map(Some);
            }
        }
        (false, true) => return symmetric(aig, b, a),
        (true, true) => {
            // Resolution: !(x & y) & !(x & !y) = !x
            for (x, y) in [(&a0, &a1), (&a1, &a0)] {
                for (u, v) in [(&b0, &b1), (&b1, &b0)] {
                    if x == u && y.is_complement_of(v) {
                        return Ok(Some(!x.clone()));
                    }
                }
            }
        }
    }

    Ok(None)
}

/// `a & b`, simplified with the two-level rules when one of them applies.
pub(super) fn and_two_level(aig: &mut Aig, a: &AigEdge, b: &AigEdge) -> Result<AigEdge> {
    if a.is_cst() || b.is_cst() || a.get_node_id() == b.get_node_id() {
        return aig.and(a, b);
    }
    if let Some(edge) = asymmetric(aig, a, b)? {
        return Ok(edge);
    }
    if let Some(edge) = asymmetric(aig, b, a)? {
        return Ok(edge);
    }
    if let Some(edge) = symmetric(aig, a, b)? {
        return Ok(edge);
    }
    aig.and(a, b)
}

/// Rebuilds the network, applying two-level rewriting to every gate.
pub fn rewrite(aig: &Aig) -> Result<Aig> {
    let new = aig.rebuild_with(|target, _, f0, f1| and_two_level(target, &f0, &f1))?;
    log::trace!(
        "rewrite: {} -> {} nodes",
        aig.node_count(),
        new.node_count()
    );
    Ok(new)
}
