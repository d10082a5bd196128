use std::cmp::Ordering;

use noesis_graph::NodeId;

/// Open-set entry. `BinaryHeap` is a max-heap, so the ordering is reversed:
/// the greatest entry has the lowest `f`, then the lowest `g`, then the
/// earliest insertion.
#[derive(Debug, Clone, Copy)]
pub struct FrontierEntry {
    /// `g + w·h`.
    pub f: f64,
    /// Cost from the start.
    pub g: f64,
    /// Node to expand.
    pub node: NodeId,
    /// Insertion sequence number.
    pub seq: u64,
}

impl FrontierEntry {
    /// Ascending rank: lower f, then lower g, then earlier insertion.
    #[must_use]
    pub fn rank(&self, other: &Self) -> Ordering {
        self.f
            .total_cmp(&other.f)
            .then_with(|| self.g.total_cmp(&other.g))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn entry(f: f64, g: f64, seq: u64) -> FrontierEntry {
        FrontierEntry {
            f,
            g,
            node: NodeId::from_raw(u128::from(seq)),
            seq,
        }
    }

    #[test]
    fn pops_lowest_f_then_g_then_seq() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(2.0, 1.0, 0));
        heap.push(entry(1.0, 0.9, 1));
        heap.push(entry(1.0, 0.4, 2));
        heap.push(entry(1.0, 0.4, 3));
        heap.push(entry(0.5, 0.5, 4));
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![4, 2, 3, 1, 0]);
    }
}
