// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

/*!
Contiguous storage for one batch of featurized molecules.

Every model input and output gets a single row-major buffer with one row
per molecule, so an inferer can hand a sub-range straight to Tract
without gathering.
*/

use std::ops::Range;
use tract_core::tract_data::TVec;

/// Data container for a single named slot in a batch.
#[derive(Debug, Clone)]
pub(crate) struct BatchSlot {
    /// The slot name in the model API.
    pub(crate) name: String,

    /// The data store.
    pub(crate) data: Vec<f32>,

    /// Number of values per molecule.
    pub(crate) count: usize,
}

impl BatchSlot {
    fn new(name: String, count: usize, rows: usize) -> Self {
        Self {
            name,
            data: vec![0.0; rows * count],
            count,
        }
    }

    #[inline]
    fn view(&self, range: Range<usize>) -> &[f32] {
        &self.data[range.start * self.count..range.end * self.count]
    }

    #[inline]
    fn view_mut(&mut self, range: Range<usize>) -> &mut [f32] {
        &mut self.data[range.start * self.count..range.end * self.count]
    }
}

fn slots_for(shapes: &[(String, Vec<usize>)], rows: usize) -> TVec<BatchSlot> {
    shapes
        .iter()
        .map(|(name, shape)| BatchSlot::new(name.to_owned(), shape.iter().product(), rows))
        .collect()
}

/// A batch of molecules with room for every model input and output.
#[derive(Debug, Clone)]
pub struct MoleculeBatch {
    smiles: Vec<String>,
    pub(crate) inputs: TVec<BatchSlot>,
    pub(crate) outputs: TVec<BatchSlot>,
}

impl MoleculeBatch {
    /// Allocate zeroed storage for `smiles` against the provided model API.
    pub fn for_shapes(
        smiles: Vec<String>,
        inputs: &[(String, Vec<usize>)],
        outputs: &[(String, Vec<usize>)],
    ) -> Self {
        let rows = smiles.len();
        Self {
            inputs: slots_for(inputs, rows),
            outputs: slots_for(outputs, rows),
            smiles,
        }
    }

    /// The molecules in this batch, in order.
    pub fn smiles(&self) -> &[String] {
        &self.smiles
    }

    /// Number of molecules in the batch.
    pub fn len(&self) -> usize {
        self.smiles.len()
    }

    /// Whether the batch holds no molecules.
    pub fn is_empty(&self) -> bool {
        self.smiles.is_empty()
    }

    /// The full input buffer at `slot`.
    pub fn input(&self, slot: usize) -> &[f32] {
        &self.inputs[slot].data
    }

    /// The full output buffer at `slot`.
    pub fn output(&self, slot: usize) -> &[f32] {
        &self.outputs[slot].data
    }

    /// The input buffer and per-molecule width at `slot`, for featurization.
    pub(crate) fn input_mut(&mut self, slot: usize) -> (&mut [f32], usize) {
        let slot = &mut self.inputs[slot];
        (&mut slot.data, slot.count)
    }

    /// A view of the molecules in `range`.
    pub fn view(&mut self, range: Range<usize>) -> BatchView<'_> {
        assert!(range.end <= self.len(), "view out of range: {:?}", range);
        BatchView {
            batch: self,
            range,
        }
    }
}

/// A view over a consecutive run of molecules in a [`MoleculeBatch`].
pub struct BatchView<'a> {
    batch: &'a mut MoleculeBatch,
    range: Range<usize>,
}

impl<'a> BatchView<'a> {
    /// View of the input at location `slot`.
    pub fn input_slot(&self, slot: usize) -> &[f32] {
        self.batch.inputs[slot].view(self.range.clone())
    }

    /// Retrieve the input name for `slot`.
    pub fn input_name(&self, slot: usize) -> &str {
        &self.batch.inputs[slot].name
    }

    /// View of the output at location `slot`.
    pub fn output_slot(&self, slot: usize) -> &[f32] {
        self.batch.outputs[slot].view(self.range.clone())
    }

    /// A mutable view of the output at location `slot`.
    pub fn output_slot_mut(&mut self, slot: usize) -> &mut [f32] {
        self.batch.outputs[slot].view_mut(self.range.clone())
    }

    /// Retrieve the output name for `slot`.
    pub fn output_name(&self, slot: usize) -> &str {
        &self.batch.outputs[slot].name
    }

    /// The SMILES covered by this view.
    pub fn smiles(&self) -> &[String] {
        &self.batch.smiles[self.range.clone()]
    }

    /// The number of molecules in this view.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.range.len()
    }
}
