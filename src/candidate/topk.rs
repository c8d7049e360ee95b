//! Top-K candidate tracking for detections.

use crate::bbox::BBox;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Scored box for one prior and class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Index of the prior the box was decoded from.
    pub prior_idx: usize,
    /// Class label.
    pub label: usize,
    /// Confidence score.
    pub score: f32,
    /// Decoded box.
    pub bbox: BBox,
}

/// Ranks candidates by descending score, then ascending prior index, then
/// ascending label. `Less` means `a` ranks ahead of `b`.
pub fn candidate_cmp_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.prior_idx.cmp(&b.prior_idx))
        .then_with(|| a.label.cmp(&b.label))
}

/// Sorts candidates by rank with deterministic tie-breaking.
pub fn sort_candidates_desc(candidates: &mut [Candidate]) {
    candidates.sort_by(candidate_cmp_desc);
}

/// Heap entry ordered so the worst-ranked candidate sits on top.
struct Ranked(Candidate);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        candidate_cmp_desc(&self.0, &other.0)
    }
}

/// Bounded selection of the `k` best-ranked candidates, O(log k) per push.
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Ranked>,
}

impl TopK {
    /// Creates a new Top-K collector.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    /// Pushes a candidate, evicting the worst-ranked one if at capacity.
    pub fn push(&mut self, candidate: Candidate) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(Ranked(candidate));
            return;
        }
        if let Some(worst) = self.heap.peek() {
            if candidate_cmp_desc(&candidate, &worst.0) == Ordering::Less {
                self.heap.pop();
                self.heap.push(Ranked(candidate));
            }
        }
    }

    /// Number of retained candidates.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true when nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the retained candidates, best first.
    pub fn into_sorted_desc(self) -> Vec<Candidate> {
        // ascending by `Ranked` order is best first
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|ranked| ranked.0)
            .collect()
    }
}

impl Extend<Candidate> for TopK {
    fn extend<I: IntoIterator<Item = Candidate>>(&mut self, iter: I) {
        for candidate in iter {
            self.push(candidate);
        }
    }
}
