// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

#![warn(clippy::all)]

/*!
Inferers run a property model over a [`BatchView`] of featurized
molecules. They differ in how they deal with the batch dimension of the
underlying Tract plan; the prediction pipeline only ever talks to the
[`Inferer`] trait.

## Choosing an inferer

| Inferer   | Batch size   | Memory use                          | Performance |
| --------- | ------------ | ----------------------------------- | ----------- |
| Basic     | 1            | Fixed                               | Linear with number of molecules |
| Fixed     | Known, exact | Linear with configured batch sizes  | Optimal if the loader batch size is configured |
| Memoizing | Unknown      | Linear with number of batch sizes   | Optimal, high cost for a new batch size |
| Dynamic   | Unknown      | Fixed                               | Good scaling but high overhead |

A loader hands out full batches of the configured size and one shorter
tail batch. A fixed inferer built for the loader batch size, or a
memoizing inferer, is usually the right pick for screening runs.
 */

use anyhow::Result;
use tract_core::prelude::{tvec, TValue, TVec, Tensor};

mod basic;
mod dynamic;
mod fixed;
mod helpers;
mod memoizing;

pub use basic::BasicInferer;
pub use dynamic::DynamicInferer;
pub use fixed::FixedBatchInferer;
pub use memoizing::MemoizingDynamicInferer;

use crate::{batch::BatchView, model_api::ModelApi};

/// The main workhorse shared by all model flavours.
pub trait Inferer {
    /// Query the inferer for how many molecules it can deal with in a single run.
    fn select_batch_size(&self, max_count: usize) -> usize;

    /// Execute the model on the provided view, writing every model
    /// output into the matching output slot.
    fn infer_raw(&self, batch: &mut BatchView<'_>) -> Result<(), anyhow::Error>;

    /// Retrieve the name and shapes of the model inputs.
    fn input_shapes(&self) -> &[(String, Vec<usize>)];

    /// Retrieve the name and shapes of the model outputs.
    fn output_shapes(&self) -> &[(String, Vec<usize>)];
}

impl<T> Inferer for Box<T>
where
    T: Inferer + ?Sized,
{
    fn select_batch_size(&self, max_count: usize) -> usize {
        self.as_ref().select_batch_size(max_count)
    }

    fn infer_raw(&self, batch: &mut BatchView<'_>) -> Result<(), anyhow::Error> {
        self.as_ref().infer_raw(batch)
    }

    fn input_shapes(&self) -> &[(String, Vec<usize>)] {
        self.as_ref().input_shapes()
    }

    fn output_shapes(&self) -> &[(String, Vec<usize>)] {
        self.as_ref().output_shapes()
    }
}

/// Helper trait to provide helper functions for loadable models.
pub trait InfererProvider {
    /// Build a [`BasicInferer`].
    fn build_basic(self) -> Result<BasicInferer>;

    /// Build a [`FixedBatchInferer`].
    fn build_fixed(self, sizes: &[usize]) -> Result<FixedBatchInferer>;

    /// Build a [`MemoizingDynamicInferer`].
    fn build_memoizing(self, preload_sizes: &[usize]) -> Result<MemoizingDynamicInferer>;

    /// Build a [`DynamicInferer`].
    fn build_dynamic(self) -> Result<DynamicInferer>;
}

/// Builder for inferers.
pub struct InfererBuilder<P: InfererProvider> {
    provider: P,
}

impl<P> InfererBuilder<P>
where
    P: InfererProvider,
{
    /// Begin the building process from the provided model provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Build a [`BasicInferer`].
    pub fn build_basic(self) -> Result<BasicInferer> {
        self.provider.build_basic()
    }

    /// Build a [`FixedBatchInferer`].
    pub fn build_fixed(self, sizes: &[usize]) -> Result<FixedBatchInferer> {
        self.provider.build_fixed(sizes)
    }

    /// Build a [`DynamicInferer`].
    pub fn build_dynamic(self) -> Result<DynamicInferer> {
        self.provider.build_dynamic()
    }

    /// Build a [`MemoizingDynamicInferer`].
    pub fn build_memoizing(self, preload_sizes: &[usize]) -> Result<MemoizingDynamicInferer> {
        self.provider.build_memoizing(preload_sizes)
    }
}

/// Assemble one `[len, ..shape]` tensor per model input from the view.
fn build_inputs(batch: &BatchView<'_>, model_api: &ModelApi) -> Result<TVec<TValue>> {
    let size = batch.len();
    let mut inputs = TVec::default();

    for (idx, (name, shape)) in model_api.inputs.iter().enumerate() {
        anyhow::ensure!(
            name == batch.input_name(idx),
            "input slot {} is {:?} but the model expects {:?}",
            idx,
            batch.input_name(idx),
            name
        );

        let mut full_shape = tvec![size];
        full_shape.extend_from_slice(shape);

        let total_count: usize = full_shape.iter().product();
        anyhow::ensure!(
            total_count == batch.input_slot(idx).len(),
            "mismatched number of features: expected {:?}, got {:?} for shape {:?}",
            total_count,
            batch.input_slot(idx).len(),
            full_shape
        );

        let tensor = Tensor::from_shape(&full_shape, batch.input_slot(idx))?;
        inputs.push(tensor.into());
    }

    Ok(inputs)
}

/// Copy the plan results back into the output slots of the view.
fn write_outputs(
    batch: &mut BatchView<'_>,
    model_api: &ModelApi,
    result: TVec<TValue>,
) -> Result<()> {
    for (idx, (name, _)) in model_api.outputs.iter().enumerate() {
        let value = result
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("model produced no value for output {:?}", name))?
            .as_slice::<f32>()?;

        let slot = batch.output_slot_mut(idx);
        anyhow::ensure!(
            slot.len() == value.len(),
            "output {:?} has {} values, expected {}",
            name,
            value.len(),
            slot.len()
        );
        slot.copy_from_slice(value);
    }

    Ok(())
}
