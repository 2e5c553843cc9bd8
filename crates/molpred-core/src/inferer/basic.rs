/*!
A basic unbatched inferer that doesn't require a lot of custom setup or management.
 */
use super::{build_inputs, helpers, write_outputs, Inferer};
use crate::{batch::BatchView, model_api::ModelApi};
use anyhow::Result;
use tract_core::prelude::{TractResult, TypedModel, TypedSimplePlan};
use tract_hir::prelude::InferenceModel;

/// The most basic inferer provided will deal with a single molecule at
/// a time, at the cost of reduced (but predictable) performance per
/// molecule.
///
/// # Pros
///
/// * Requires no tuning
/// * Very predictable performance across different workloads
///
/// # Cons
///
/// * Scales linearly with the number of molecules
pub struct BasicInferer {
    model: TypedSimplePlan<TypedModel>,
    model_api: ModelApi,
}

impl BasicInferer {
    /// Create an inferer for the provided `inference` model.
    ///
    /// # Errors
    ///
    /// Will only forward errors from the [`tract_core::model::Graph`] optimization and graph building steps.
    pub fn from_model(model: InferenceModel) -> TractResult<Self> {
        let model_api = ModelApi::for_model(&model)?;
        let model = helpers::build_model(model, &model_api.inputs, 1i32)?;

        Ok(Self { model, model_api })
    }

    /// Create an inferer for the provided `typed` model.
    ///
    /// # Errors
    ///
    /// Will only forward errors from the [`tract_core::model::Graph`] optimization and graph building steps.
    pub fn from_typed(model: TypedModel) -> TractResult<Self> {
        let model_api = ModelApi::for_typed_model(&model)?;
        let model = helpers::build_typed(model, 1)?;

        Ok(Self { model, model_api })
    }
}

impl Inferer for BasicInferer {
    fn select_batch_size(&self, _: usize) -> usize {
        1
    }

    fn infer_raw(&self, batch: &mut BatchView<'_>) -> Result<(), anyhow::Error> {
        anyhow::ensure!(
            batch.len() == 1,
            "basic inferer runs one molecule at a time, got {}",
            batch.len()
        );

        let inputs = build_inputs(batch, &self.model_api)?;
        let result = self.model.run(inputs)?;
        write_outputs(batch, &self.model_api, result)
    }

    fn input_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model_api.inputs
    }

    fn output_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model_api.outputs
    }
}
