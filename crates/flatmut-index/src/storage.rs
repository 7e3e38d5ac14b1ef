//! Encoded storage engine.
//!
//! Owns the code buffer and every piece of slot bookkeeping:
//! - code buffer: `physical_count * code_len` code elements, slot `s` at
//!   `[s * code_len, (s + 1) * code_len)`
//! - tombstone bitmap: one bit per slot
//! - free list: tombstoned slots, recycled smallest first
//! - label indirection: `slot -> label` (dense) and `label -> slot` (sparse)
//!
//! Deleting only flips the tombstone bit and queues the slot. The old label
//! keeps resolving to its dead slot until an insert recycles that slot, at
//! which point the old label is retired and a fresh one is minted.

use std::collections::{BTreeSet, HashMap, HashSet};

use flatmut_kernels::{CodePacker, CodePackerFlat};
use flatmut_types::{Label, MetricType, Slot};
use tracing::{debug, info};

use crate::codec::VectorCodec;
use crate::error::IndexError;

/// One bit per slot.
#[derive(Debug, Clone, Default)]
struct TombstoneBitmap {
    words: Vec<u64>,
    len: usize,
}

impl TombstoneBitmap {
    fn try_reserve(&mut self, additional: usize) -> Result<(), std::collections::TryReserveError> {
        let needed = (self.len + additional).div_ceil(64);
        self.words
            .try_reserve(needed.saturating_sub(self.words.len()))
    }

    fn push(&mut self, bit: bool) {
        if self.len % 64 == 0 {
            self.words.push(0);
        }
        self.len += 1;
        if bit {
            self.set(self.len - 1);
        }
    }

    fn get(&self, i: usize) -> bool {
        i < self.len && ((self.words[i / 64] >> (i % 64)) & 1) != 0
    }

    fn set(&mut self, i: usize) {
        self.words[i / 64] |= 1 << (i % 64);
    }

    fn unset(&mut self, i: usize) {
        self.words[i / 64] &= !(1 << (i % 64));
    }

    fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }
}

/// Growable column of fixed-size codes with tombstones and slot recycling.
#[derive(Debug, Clone)]
pub struct FlatCodes<C: VectorCodec> {
    codec: C,
    metric: MetricType,
    codes: Vec<C::Code>,
    deleted: TombstoneBitmap,
    free_slots: BTreeSet<Slot>,
    slot_to_label: Vec<Label>,
    label_to_slot: HashMap<Label, Slot>,
    pending_removals: usize,
    next_label: Label,
}

impl<C: VectorCodec> FlatCodes<C> {
    /// Create empty storage. Fails for zero-dimensional codecs.
    pub fn new(codec: C, metric: MetricType) -> Result<Self, IndexError> {
        if codec.dimension() == 0 || codec.code_len() == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self {
            codec,
            metric,
            codes: Vec::new(),
            deleted: TombstoneBitmap::default(),
            free_slots: BTreeSet::new(),
            slot_to_label: Vec::new(),
            label_to_slot: HashMap::new(),
            pending_removals: 0,
            next_label: 0,
        })
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn dimension(&self) -> usize {
        self.codec.dimension()
    }

    pub fn metric(&self) -> MetricType {
        self.metric
    }

    pub fn is_trained(&self) -> bool {
        self.codec.is_trained()
    }

    /// Bytes per slot.
    pub fn code_size(&self) -> usize {
        self.codec.code_size()
    }

    /// Slots ever allocated, live or tombstoned.
    pub fn physical_count(&self) -> usize {
        self.slot_to_label.len()
    }

    /// Tombstoned slots awaiting recycling.
    pub fn pending_removals(&self) -> usize {
        self.pending_removals
    }

    /// Live vectors.
    pub fn len(&self) -> usize {
        self.physical_count() - self.pending_removals
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label the next inserted vector will receive.
    pub fn next_label(&self) -> Label {
        self.next_label
    }

    /// Slots the code buffer holds without reallocating.
    pub fn code_capacity(&self) -> usize {
        self.codes.capacity() / self.codec.code_len()
    }

    /// Current (or last, if tombstoned) label of a slot.
    pub fn label_of(&self, slot: Slot) -> Option<Label> {
        self.slot_to_label.get(slot).copied()
    }

    /// Slot a label resolves to. Retired labels resolve to nothing.
    pub fn slot_of(&self, label: Label) -> Option<Slot> {
        self.label_to_slot.get(&label).copied()
    }

    pub fn is_deleted(&self, slot: Slot) -> bool {
        self.deleted.get(slot)
    }

    /// Free slots in the order they will be recycled.
    pub fn free_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.free_slots.iter().copied()
    }

    /// Reserve room for `additional` more slots.
    pub fn reserve(&mut self, additional: usize) -> Result<(), IndexError> {
        let code_len = self.codec.code_len();
        let elements = additional
            .checked_mul(code_len)
            .ok_or_else(|| IndexError::CapacityExhausted(format!("{} slots", additional)))?;
        let exhausted = |e: std::collections::TryReserveError| {
            IndexError::CapacityExhausted(format!("{} slots: {}", additional, e))
        };
        self.codes.try_reserve(elements).map_err(exhausted)?;
        self.deleted.try_reserve(additional).map_err(exhausted)?;
        self.slot_to_label.try_reserve(additional).map_err(exhausted)?;
        self.label_to_slot.try_reserve(additional).map_err(exhausted)?;
        Ok(())
    }

    /// Insert `x.len() / dimension` vectors and return their labels in input order.
    ///
    /// Free slots are recycled smallest first; the rest are appended. Room for
    /// every vector is reserved before any bookkeeping changes, so an
    /// allocation failure leaves the storage untouched.
    pub fn add(&mut self, x: &[f32]) -> Result<Vec<Label>, IndexError> {
        if !self.is_trained() {
            return Err(IndexError::NotTrained);
        }
        let dim = self.dimension();
        if x.len() % dim != 0 {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: x.len() % dim,
            });
        }
        let n = x.len() / dim;
        if n == 0 {
            return Ok(Vec::new());
        }

        self.reserve(n)?;
        let mut labels = Vec::new();
        labels
            .try_reserve_exact(n)
            .map_err(|e| IndexError::CapacityExhausted(e.to_string()))?;

        let code_len = self.codec.code_len();
        let mut recycled = 0usize;
        for v in x.chunks_exact(dim) {
            let label = self.next_label;
            self.next_label += 1;

            let slot = match self.free_slots.pop_first() {
                Some(slot) => {
                    let start = slot * code_len;
                    self.codec
                        .encode(v, &mut self.codes[start..start + code_len]);
                    self.deleted.unset(slot);
                    let retired = self.slot_to_label[slot];
                    self.label_to_slot.remove(&retired);
                    self.slot_to_label[slot] = label;
                    self.pending_removals -= 1;
                    recycled += 1;
                    slot
                }
                None => {
                    let slot = self.slot_to_label.len();
                    let start = self.codes.len();
                    self.codes.resize(start + code_len, C::Code::default());
                    self.codec.encode(v, &mut self.codes[start..]);
                    self.deleted.push(false);
                    self.slot_to_label.push(label);
                    slot
                }
            };
            self.label_to_slot.insert(label, slot);
            labels.push(label);
        }

        debug!(
            added = n,
            recycled = recycled,
            appended = n - recycled,
            total = self.physical_count(),
            "Added vectors"
        );
        Ok(labels)
    }

    /// Tombstone the slots behind `labels` and return the pending-removal count.
    ///
    /// All labels are validated before anything changes: an unknown label,
    /// an already tombstoned slot, or a label repeated within the call
    /// fails the whole call.
    pub fn mark_deleted(&mut self, labels: &[Label]) -> Result<usize, IndexError> {
        let mut slots = Vec::with_capacity(labels.len());
        let mut seen = HashSet::with_capacity(labels.len());
        for &label in labels {
            let slot = self
                .slot_of(label)
                .ok_or(IndexError::LabelNotFound(label))?;
            if self.deleted.get(slot) || !seen.insert(slot) {
                return Err(IndexError::AlreadyDeleted { label, slot });
            }
            slots.push(slot);
        }

        for slot in slots {
            self.deleted.set(slot);
            self.free_slots.insert(slot);
            self.pending_removals += 1;
        }
        debug_assert_eq!(self.free_slots.len(), self.pending_removals);
        debug_assert_eq!(self.deleted.count_ones(), self.pending_removals);

        debug!(
            deleted = labels.len(),
            pending = self.pending_removals,
            "Marked vectors deleted"
        );
        Ok(self.pending_removals)
    }

    /// Code of one slot. Tombstoned slots keep their last code.
    pub fn code(&self, slot: Slot) -> Result<&[C::Code], IndexError> {
        self.codes_range(slot, 1)
    }

    /// Raw bytes of one slot, `code_size()` long.
    pub fn code_bytes(&self, slot: Slot) -> Result<&[u8], IndexError> {
        self.code(slot).map(bytemuck::cast_slice)
    }

    /// The whole code buffer as bytes, `physical_count() * code_size()` long.
    pub fn codes_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.codes)
    }

    /// Codes of slots `[start, start + n)`. Empty ranges always succeed.
    pub fn codes_range(&self, start: Slot, n: usize) -> Result<&[C::Code], IndexError> {
        if n == 0 {
            return Ok(&[]);
        }
        let total = self.physical_count();
        match start.checked_add(n) {
            Some(end) if end <= total => {
                let code_len = self.codec.code_len();
                Ok(&self.codes[start * code_len..end * code_len])
            }
            _ => Err(IndexError::OutOfBounds {
                start,
                len: n,
                total,
            }),
        }
    }

    /// Decode slots `[start, start + n)` into `n * dimension` floats.
    pub fn reconstruct_n(&self, start: Slot, n: usize) -> Result<Vec<f32>, IndexError> {
        let codes = self.codes_range(start, n)?;
        let dim = self.dimension();
        let mut out = vec![0.0f32; n * dim];
        if n > 0 {
            for (code, row) in codes
                .chunks_exact(self.codec.code_len())
                .zip(out.chunks_exact_mut(dim))
            {
                self.codec.decode(code, row);
            }
        }
        Ok(out)
    }

    /// Decode one slot.
    pub fn reconstruct_slot(&self, slot: Slot) -> Result<Vec<f32>, IndexError> {
        self.reconstruct_n(slot, 1)
    }

    /// Decode the vector a label currently resolves to.
    pub fn reconstruct(&self, label: Label) -> Result<Vec<f32>, IndexError> {
        let slot = self
            .slot_of(label)
            .ok_or(IndexError::LabelNotFound(label))?;
        self.reconstruct_slot(slot)
    }

    /// Drop every vector. Labels restart from zero; buffer capacity is kept.
    pub fn reset(&mut self) {
        let dropped = self.physical_count();
        self.codes.clear();
        self.deleted.clear();
        self.free_slots.clear();
        self.slot_to_label.clear();
        self.label_to_slot.clear();
        self.pending_removals = 0;
        self.next_label = 0;
        info!(dropped = dropped, "Reset storage");
    }

    /// Packer for moving this storage's codes in and out of blocks.
    pub fn code_packer(&self) -> CodePackerFlat {
        CodePackerFlat::new(self.code_size())
    }

    /// Serialize slots `[start, start + n)` into packer blocks, one after another.
    ///
    /// Tombstoned slots are included; their bytes are intact until recycled.
    pub fn pack_codes(&self, start: Slot, n: usize) -> Result<Vec<u8>, IndexError> {
        let packer = self.code_packer();
        let codes: &[u8] = bytemuck::cast_slice(self.codes_range(start, n)?);
        let per_block = packer.nvec() * packer.code_size();
        let mut out = Vec::new();
        out.try_reserve(n * packer.block_size())
            .map_err(|e| IndexError::CapacityExhausted(format!("{} packed slots: {}", n, e)))?;
        for chunk in codes.chunks_exact(per_block) {
            let mut block = vec![0u8; packer.block_size()];
            packer.pack_all(chunk, &mut block)?;
            out.extend_from_slice(&block);
        }
        Ok(out)
    }
}
