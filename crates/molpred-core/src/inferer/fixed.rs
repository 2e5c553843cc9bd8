use super::{build_inputs, helpers, write_outputs, Inferer};
use crate::{batch::BatchView, model_api::ModelApi};
use anyhow::{Context, Result};

use tract_core::prelude::*;
use tract_hir::prelude::*;

/// A reliable batched inferer that is a good fit if you know the loader batch size and want stable performance.
///
/// It'll subdivide a batch into minibatches if the sizes don't fit perfectly. To make this work, it always holds a
/// single-molecule plan as well to ensure all data is consumed; such as the tail batch of 7 molecules left over when
/// screening 107 molecules with a batch size of 50.
///
/// You can configure a number of different batch sizes, and the largest one that fits will be used. For example; if you
/// use a setup of [1, 2, 4, 8] as your supported batch sizes a batch of 15 molecules would run each plan once.
///
/// # Pros
///
/// * Good and predictable performance if you know the batch size
/// * Flexible if you sometimes get extra data to deal with
///
/// # Cons
///
/// * Mini-batches add overhead
/// * Diminishing returns on each supported batch size.
pub struct FixedBatchInferer {
    model_api: ModelApi,
    models: Vec<BatchedModel>,
}

fn fixup_sizes(sizes: &[usize]) -> Vec<usize> {
    let mut sizes: Vec<usize> = sizes.iter().copied().filter(|size| *size > 0).collect();
    if !sizes.contains(&1) {
        sizes.push(1);
    }
    sizes.sort_unstable();
    sizes.dedup();
    sizes.reverse();

    sizes
}

impl FixedBatchInferer {
    /// Create an inferer for the provided `inference` model.
    ///
    /// # Errors
    ///
    /// Will only forward errors from the [`tract_core::model::Graph`] optimization and graph building steps.
    pub fn from_model(model: InferenceModel, sizes: &[usize]) -> TractResult<Self> {
        let model_api = ModelApi::for_model(&model)?;

        let models = fixup_sizes(sizes)
            .into_iter()
            .map(|size| {
                helpers::build_model(model.clone(), &model_api.inputs, size as i32)
                    .map(|plan| BatchedModel { size, plan })
            })
            .collect::<TractResult<Vec<_>>>()?;

        Ok(Self { models, model_api })
    }

    /// Create an inferer for the provided typed model.
    ///
    /// # Errors
    ///
    /// Will only forward errors from the [`tract_core::model::Graph`] optimization and graph building steps.
    pub fn from_typed(model: TypedModel, sizes: &[usize]) -> TractResult<Self> {
        let model_api = ModelApi::for_typed_model(&model)?;

        let models = fixup_sizes(sizes)
            .into_iter()
            .map(|size| {
                helpers::build_typed(model.clone(), size).map(|plan| BatchedModel { size, plan })
            })
            .collect::<TractResult<Vec<_>>>()?;

        Ok(Self { models, model_api })
    }

    /// The batch sizes this inferer holds plans for, largest first.
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.models.iter().map(|plan| plan.size)
    }
}

impl Inferer for FixedBatchInferer {
    fn select_batch_size(&self, max_count: usize) -> usize {
        // Find the largest batch size below or equal to max_count; the
        // size-1 plan always matches.
        self.sizes().find(|size| *size <= max_count).unwrap_or(1)
    }

    fn infer_raw(&self, batch: &mut BatchView<'_>) -> Result<(), anyhow::Error> {
        let plan = self
            .models
            .iter()
            .find(|plan| plan.size == batch.len())
            .with_context(|| format!("looking for a plan with size {:?}", batch.len()))?;

        let inputs = build_inputs(batch, &self.model_api)?;
        let result = plan.plan.run(inputs)?;
        write_outputs(batch, &self.model_api, result)
    }

    fn input_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model_api.inputs
    }

    fn output_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model_api.outputs
    }
}

struct BatchedModel {
    size: usize,
    plan: TypedSimplePlan<TypedModel>,
}

#[cfg(test)]
mod tests {
    use super::fixup_sizes;

    #[test]
    fn always_includes_single_plan() {
        assert_eq!(fixup_sizes(&[8, 2]), vec![8, 2, 1]);
        assert_eq!(fixup_sizes(&[]), vec![1]);
    }

    #[test]
    fn drops_zero_and_duplicates() {
        assert_eq!(fixup_sizes(&[0, 4, 4, 1, 16]), vec![16, 4, 1]);
    }
}
