use super::{build_inputs, helpers, write_outputs, Inferer};
use crate::{batch::BatchView, model_api::ModelApi};
use anyhow::Result;
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use std::{
    collections::{hash_map::Entry, HashMap},
    ops::Deref,
};
use tract_core::prelude::*;
use tract_hir::prelude::*;

/// The dynamic memoizing batch inferer generates execution plans to
/// fit each batch perfectly, with a hefty up-front cost for each new
/// batch size.
///
/// A screening run produces at most two batch sizes; the loader batch
/// size and the tail. This makes memoizing a good default when the
/// batch size is a runtime setting, as only the first batch of each
/// size pays for planning.
///
/// If you know some batch sizes ahead of time, you can preload the
/// inferer with those plans to avoid having to build them at runtime.
///
/// # Pros
///
/// * Optimal amortized performance without tuning
///
/// # Cons
///
/// * Widely varying batch sizes will build and keep many plans
pub struct MemoizingDynamicInferer {
    symbol: Symbol,
    model: TypedModel,
    model_api: ModelApi,
    model_cache: RwLock<HashMap<usize, TypedSimplePlan<TypedModel>>>,
}

impl MemoizingDynamicInferer {
    /// Create an inferer for the provided `inference` model.
    ///
    /// # Errors
    ///
    /// Will only forward errors from the [`tract_core::model::Graph`] optimization and graph building steps.
    pub fn from_model(model: InferenceModel, preloaded_sizes: &[usize]) -> TractResult<Self> {
        let model_api = ModelApi::for_model(&model)?;

        let (symbol, model) = helpers::build_symbolic_model(model, &model_api.inputs)?;
        let this = Self {
            symbol,
            model,
            model_api,
            model_cache: Default::default(),
        };

        for size in preloaded_sizes {
            this.get_concrete_model(*size)?;
        }

        Ok(this)
    }

    /// Create an inferer for the provided `typed` model.
    ///
    /// # Errors
    ///
    /// Will only forward errors from the [`tract_core::model::Graph`] optimization and graph building steps.
    pub fn from_typed(mut model: TypedModel, preloaded_sizes: &[usize]) -> TractResult<Self> {
        let model_api = ModelApi::for_typed_model(&model)?;

        let symbol = helpers::build_symbolic_typed(&mut model)?;
        let this = Self {
            symbol,
            model,
            model_api,
            model_cache: Default::default(),
        };

        for size in preloaded_sizes {
            this.get_concrete_model(*size)?;
        }

        Ok(this)
    }

    /// Number of plans built so far.
    pub fn cached_sizes(&self) -> usize {
        self.model_cache.read().len()
    }

    fn get_concrete_model(
        &self,
        size: usize,
    ) -> TractResult<impl Deref<Target = TypedSimplePlan<TypedModel>> + '_> {
        let cache = self.model_cache.upgradable_read();
        let cache = {
            if !cache.contains_key(&size) {
                let mut content = RwLockUpgradableReadGuard::upgrade(cache);
                if let Entry::Vacant(e) = content.entry(size) {
                    log::debug!("building plan for batch size {}", size);
                    e.insert(helpers::concretize(&self.model, &self.symbol, size)?);
                }

                RwLockWriteGuard::downgrade(content)
            } else {
                RwLockUpgradableReadGuard::downgrade(cache)
            }
        };

        Ok(RwLockReadGuard::map(cache, |c| &c[&size]))
    }
}

impl Inferer for MemoizingDynamicInferer {
    fn select_batch_size(&self, max_count: usize) -> usize {
        max_count
    }

    fn infer_raw(&self, batch: &mut BatchView<'_>) -> Result<(), anyhow::Error> {
        let inputs = build_inputs(batch, &self.model_api)?;
        let result = self.get_concrete_model(batch.len())?.run(inputs)?;
        write_outputs(batch, &self.model_api, result)
    }

    fn input_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model_api.inputs
    }

    fn output_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model_api.outputs
    }
}
