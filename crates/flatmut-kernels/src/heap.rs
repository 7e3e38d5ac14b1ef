//! Bounded top-k selection.
//!
//! `TopK` keeps the `k` best `(distance, id)` pairs seen so far. The worst
//! retained entry sits on top of a binary heap so a new candidate is
//! compared against one element. Ties on distance prefer the smaller id.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Which end of the distance range wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapOrder {
    /// Keep the smallest distances (max-heap). Used for dissimilarities.
    Smallest,
    /// Keep the largest scores (min-heap). Used for similarities.
    Largest,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Oriented so that larger means worse.
    rank: f32,
    distance: f32,
    id: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .total_cmp(&other.rank)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Fixed-capacity top-k accumulator.
#[derive(Debug, Clone)]
pub struct TopK {
    k: usize,
    order: HeapOrder,
    heap: BinaryHeap<Entry>,
}

impl TopK {
    pub fn new(k: usize, order: HeapOrder) -> Self {
        Self {
            k,
            order,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
        }
    }

    /// Keeps the `k` smallest distances.
    pub fn smallest(k: usize) -> Self {
        Self::new(k, HeapOrder::Smallest)
    }

    /// Keeps the `k` largest scores.
    pub fn largest(k: usize) -> Self {
        Self::new(k, HeapOrder::Largest)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn order(&self) -> HeapOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Distance of the worst retained entry once the heap is full.
    ///
    /// Candidates that do not beat this value are rejected by [`push`](Self::push).
    pub fn threshold(&self) -> Option<f32> {
        if self.heap.len() < self.k {
            return None;
        }
        self.heap.peek().map(|e| e.distance)
    }

    /// Offer a candidate. Returns true when it was retained.
    ///
    /// NaN distances are never retained.
    pub fn push(&mut self, distance: f32, id: usize) -> bool {
        if self.k == 0 || distance.is_nan() {
            return false;
        }
        let entry = Entry {
            rank: match self.order {
                HeapOrder::Smallest => distance,
                HeapOrder::Largest => -distance,
            },
            distance,
            id,
        };

        if self.heap.len() < self.k {
            self.heap.push(entry);
            return true;
        }
        match self.heap.peek() {
            Some(worst) if entry < *worst => {
                self.heap.pop();
                self.heap.push(entry);
                true
            }
            _ => false,
        }
    }

    /// Retained `(distance, id)` pairs, best first.
    pub fn into_sorted(self) -> Vec<(f32, usize)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.distance, e.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_smallest_keeps_k_best() {
        let mut top = TopK::smallest(2);
        for (d, id) in [(5.0, 0), (1.0, 1), (3.0, 2), (0.5, 3)] {
            top.push(d, id);
        }
        assert_eq!(top.into_sorted(), vec![(0.5, 3), (1.0, 1)]);
    }

    #[test]
    fn test_largest_keeps_k_best() {
        let mut top = TopK::largest(3);
        for (d, id) in [(5.0, 0), (1.0, 1), (3.0, 2), (0.5, 3)] {
            top.push(d, id);
        }
        assert_eq!(top.into_sorted(), vec![(5.0, 0), (3.0, 2), (1.0, 1)]);
    }

    #[test]
    fn test_ties_prefer_smaller_id() {
        let mut top = TopK::smallest(2);
        top.push(1.0, 7);
        top.push(1.0, 3);
        top.push(1.0, 5);
        assert_eq!(top.into_sorted(), vec![(1.0, 3), (1.0, 5)]);
    }

    #[test]
    fn test_nan_and_zero_k_rejected() {
        let mut top = TopK::smallest(2);
        assert!(!top.push(f32::NAN, 0));
        assert!(top.is_empty());

        let mut none = TopK::largest(0);
        assert!(!none.push(1.0, 0));
        assert!(none.into_sorted().is_empty());
    }

    #[test]
    fn test_threshold() {
        let mut top = TopK::smallest(2);
        top.push(4.0, 0);
        assert_eq!(top.threshold(), None);
        top.push(2.0, 1);
        assert_eq!(top.threshold(), Some(4.0));
        top.push(1.0, 2);
        assert_eq!(top.threshold(), Some(2.0));
    }

    proptest! {
        #[test]
        fn prop_matches_full_sort(
            dists in proptest::collection::vec(-1000.0f32..1000.0, 0..64),
            k in 1usize..10,
        ) {
            let mut top = TopK::smallest(k);
            for (id, d) in dists.iter().enumerate() {
                top.push(*d, id);
            }

            let mut expected: Vec<(f32, usize)> =
                dists.iter().copied().enumerate().map(|(id, d)| (d, id)).collect();
            expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            expected.truncate(k);

            prop_assert_eq!(top.into_sorted(), expected);
        }
    }
}
