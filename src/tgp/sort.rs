//! Painter's algorithm ordering

use super::primitives::Quad;

/// Draw order for `quads`: farthest first, insertion order among equal depths
pub fn sort_quads(quads: &[Quad]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..quads.len()).collect();
    order.sort_unstable_by(|&a, &b| {
        let (qa, qb) = (&quads[a], &quads[b]);
        qb.z.total_cmp(&qa.z).then(qa.seq.cmp(&qb.seq))
    });
    order
}
