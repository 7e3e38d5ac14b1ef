//! Candidate-restricting predicates.
//!
//! A selector answers "may this id appear in the results?". Searches take an
//! `Option<&dyn IdSelector>`; `None` means every id is a candidate.

use std::collections::HashSet;

/// Boolean filter over ids.
///
/// The flat index evaluates selectors against labels, the ids callers see,
/// not against internal storage slots. A recycled slot answers to its new
/// label only.
pub trait IdSelector {
    fn is_member(&self, id: u64) -> bool;
}

impl<F> IdSelector for F
where
    F: Fn(u64) -> bool,
{
    fn is_member(&self, id: u64) -> bool {
        self(id)
    }
}

/// Ids in the half-open range `[min, max)`.
#[derive(Debug, Clone, Copy)]
pub struct IdSelectorRange {
    pub min: u64,
    pub max: u64,
}

impl IdSelectorRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }
}

impl IdSelector for IdSelectorRange {
    fn is_member(&self, id: u64) -> bool {
        self.min <= id && id < self.max
    }
}

/// An explicit set of ids.
#[derive(Debug, Clone, Default)]
pub struct IdSelectorArray {
    ids: HashSet<u64>,
}

impl IdSelectorArray {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl IdSelector for IdSelectorArray {
    fn is_member(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }
}

/// One bit per id, LSB first within each byte. Ids past the end are excluded.
#[derive(Debug, Clone, Default)]
pub struct IdSelectorBitmap {
    bits: Vec<u8>,
}

impl IdSelectorBitmap {
    pub fn new(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    /// Bitmap with exactly the given ids set.
    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        let mut bits = Vec::new();
        for id in ids {
            let byte = (id / 8) as usize;
            if bits.len() <= byte {
                bits.resize(byte + 1, 0);
            }
            bits[byte] |= 1 << (id % 8);
        }
        Self { bits }
    }
}

impl IdSelector for IdSelectorBitmap {
    fn is_member(&self, id: u64) -> bool {
        let byte = (id / 8) as usize;
        self.bits
            .get(byte)
            .is_some_and(|b| b & (1 << (id % 8)) != 0)
    }
}

/// Inverts another selector.
#[derive(Debug, Clone)]
pub struct IdSelectorNot<S>(pub S);

impl<S: IdSelector> IdSelector for IdSelectorNot<S> {
    fn is_member(&self, id: u64) -> bool {
        !self.0.is_member(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        let sel = IdSelectorRange::new(2, 5);
        assert!(!sel.is_member(1));
        assert!(sel.is_member(2));
        assert!(sel.is_member(4));
        assert!(!sel.is_member(5));
    }

    #[test]
    fn test_array() {
        let sel = IdSelectorArray::new([1, 9, 42]);
        assert_eq!(sel.len(), 3);
        assert!(sel.is_member(42));
        assert!(!sel.is_member(2));
    }

    #[test]
    fn test_bitmap() {
        let sel = IdSelectorBitmap::from_ids([0, 3, 17]);
        assert!(sel.is_member(0));
        assert!(sel.is_member(3));
        assert!(sel.is_member(17));
        assert!(!sel.is_member(16));
        assert!(!sel.is_member(1000));

        let raw = IdSelectorBitmap::new(vec![0b0000_0010]);
        assert!(raw.is_member(1));
        assert!(!raw.is_member(0));
    }

    #[test]
    fn test_not_and_closure() {
        let odd = |id: u64| id % 2 == 1;
        assert!(odd.is_member(3));

        let even = IdSelectorNot(odd);
        assert!(even.is_member(4));
        assert!(!even.is_member(5));

        let dyn_sel: &dyn IdSelector = &IdSelectorNot(IdSelectorRange::new(0, 10));
        assert!(dyn_sel.is_member(10));
    }
}
