/*!

# Molpred Core

Batched inference for molecular property models on top of Tract.

A prediction is a short pipeline: a [`dataset::MoleculeDataset`] of
SMILES strings is split into batches by a [`loader::MoleculeDataLoader`],
each batch is featurized and pushed through an [`inferer::Inferer`], and
the concatenated output is optionally mapped back to physical units with
a [`scaler::StandardScaler`].

```no_run
# use molpred_core::prelude::*;
# fn load() -> BasicInferer { unimplemented!() }
let inferer = load();
let featurizer = |_smiles: &str, _slot: &str, out: &mut [f32]| {
    out.fill(0.0);
    Ok::<_, anyhow::Error>(())
};

let config = PredictConfig::default();
let predictions = predict(&inferer, &featurizer, ["CCO", "c1ccccc1"], &config, None)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
 */

#![warn(rust_2018_idioms)]

pub use tract_core;
pub use tract_hir;

pub mod batch;
pub mod dataset;
pub mod error;
pub mod inferer;
pub mod loader;
mod model_api;
pub mod predict;
pub mod scaler;

/// Most core utilities are re-exported here.
pub mod prelude {
    pub use super::batch::{BatchView, MoleculeBatch};
    pub use super::dataset::{Featurizer, MoleculeDatapoint, MoleculeDataset, PrecomputedFeatures};
    pub use super::error::PredictError;
    pub use super::inferer::{
        BasicInferer, DynamicInferer, FixedBatchInferer, Inferer, InfererBuilder, InfererProvider,
        MemoizingDynamicInferer,
    };
    pub use super::loader::MoleculeDataLoader;
    pub use super::model_api::ModelApi;
    pub use super::predict::{predict, predict_batches, PredictConfig, Predictions};
    pub use super::scaler::StandardScaler;
}
