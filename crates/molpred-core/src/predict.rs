// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

/*!
The prediction pipeline: dataset → loader → inferer → post-processing.

```no_run
# use molpred_core::prelude::*;
# fn load() -> MemoizingDynamicInferer { unimplemented!() }
# fn scaler() -> StandardScaler { unimplemented!() }
let inferer = load();
let features = PrecomputedFeatures::from_json_lines(std::fs::File::open("features.jsonl")?)?;
let config = PredictConfig {
    uncertainty: true,
    ..PredictConfig::default()
};

match predict(&inferer, &features, ["CCO"], &config, Some(&scaler()))? {
    Predictions::Uncertain { means, variances } => println!("{} ± {}", means, variances),
    Predictions::Values(values) => println!("{}", values),
}
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

use crate::{
    dataset::{Featurizer, MoleculeDataset},
    error::PredictError,
    inferer::Inferer,
    loader::MoleculeDataLoader,
    model_api::output_position,
    scaler::StandardScaler,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tract_core::prelude::tract_ndarray::{s, Array2};

/// Tunables for a prediction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    /// Number of molecules per loader batch.
    pub batch_size: usize,

    /// Loader threads used for featurization; 0 featurizes inline.
    pub num_workers: usize,

    /// Whether the model emits interleaved mean/variance columns.
    pub uncertainty: bool,

    /// The model output holding the predictions. Defaults to the first output.
    pub output: Option<String>,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            num_workers: 0,
            uncertainty: false,
            output: None,
        }
    }
}

/// The post-processed model output, one row per input molecule.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// An N×M array of predictions.
    Values(Array2<f32>),

    /// Two N×(M/2) arrays split from the interleaved mean/variance columns.
    Uncertain {
        means: Array2<f32>,
        variances: Array2<f32>,
    },
}

impl Predictions {
    /// Number of molecules predicted on.
    pub fn len(&self) -> usize {
        match self {
            Predictions::Values(values) => values.nrows(),
            Predictions::Uncertain { means, .. } => means.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The predicted values, or the means when uncertainty is predicted.
    pub fn values(&self) -> &Array2<f32> {
        match self {
            Predictions::Values(values) => values,
            Predictions::Uncertain { means, .. } => means,
        }
    }

    /// The predicted variances, if any.
    pub fn variances(&self) -> Option<&Array2<f32>> {
        match self {
            Predictions::Values(_) => None,
            Predictions::Uncertain { variances, .. } => Some(variances),
        }
    }
}

/// Predict on `smis` with `inferer`, featurizing with `featurizer`.
///
/// Output rows follow the order of `smis`. See [`predict_batches`] for how
/// the raw output is post-processed.
pub fn predict<F, I, S>(
    inferer: &dyn Inferer,
    featurizer: &F,
    smis: I,
    config: &PredictConfig,
    scaler: Option<&StandardScaler>,
) -> Result<Predictions, PredictError>
where
    F: Featurizer + ?Sized,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let dataset = MoleculeDataset::from_smiles(smis);
    let loader = MoleculeDataLoader::new(
        &dataset,
        featurizer,
        inferer.input_shapes(),
        inferer.output_shapes(),
        config.batch_size,
        config.num_workers,
    )?;

    predict_batches(
        inferer,
        loader,
        config.uncertainty,
        scaler,
        config.output.as_deref(),
    )
}

/// Run every batch of `loader` through `inferer` and post-process.
///
/// The loader must be built for the inferer's input and output shapes.
///
/// Each batch is split into the chunk sizes the inferer asks for. The rows
/// of the selected output are concatenated into an N×M array. Without
/// `uncertainty` the array is inverse-transformed by `scaler`. With it,
/// even columns are means and odd columns variances; the scaler
/// inverse-transforms the means and multiplies the variances by the
/// squared task std.
pub fn predict_batches<F>(
    inferer: &dyn Inferer,
    loader: MoleculeDataLoader<'_, F>,
    uncertainty: bool,
    scaler: Option<&StandardScaler>,
    output: Option<&str>,
) -> Result<Predictions, PredictError>
where
    F: Featurizer + ?Sized,
{
    check_shapes("input", inferer.input_shapes(), loader.input_shapes())?;
    check_shapes("output", inferer.output_shapes(), loader.output_shapes())?;

    let outputs = inferer.output_shapes();
    let (slot, width) = match output {
        Some(name) => output_position(outputs, name)
            .ok_or_else(|| PredictError::UnknownOutput(name.to_owned()))?,
        None => outputs
            .first()
            .map(|(_, shape)| (0, shape.iter().product()))
            .ok_or(PredictError::NoOutputs)?,
    };

    if uncertainty && width % 2 != 0 {
        return Err(PredictError::OddUncertaintyWidth(width));
    }

    if let Some(scaler) = scaler {
        let tasks = if uncertainty { width / 2 } else { width };
        if scaler.len() != tasks {
            return Err(PredictError::ScalerMismatch {
                expected: scaler.len(),
                found: tasks,
            });
        }
    }

    let start = Instant::now();
    let total_batches = loader.len();
    log::debug!(
        "predicting {} batches of up to {} molecules",
        total_batches,
        loader.batch_size()
    );

    let mut preds = Vec::new();
    let mut molecules = 0;

    for (batch_idx, batch) in loader.enumerate() {
        let mut batch = batch?;
        let len = batch.len();

        let mut offset = 0;
        while offset < len {
            let size = inferer.select_batch_size(len - offset).clamp(1, len - offset);
            let mut view = batch.view(offset..offset + size);
            inferer
                .infer_raw(&mut view)
                .map_err(PredictError::Inference)?;
            offset += size;
        }

        preds.extend_from_slice(batch.output(slot));
        molecules += len;

        log::debug!(
            "inference batch {}/{}: {} molecules",
            batch_idx + 1,
            total_batches,
            len
        );
    }

    log::info!(
        "predicted {} molecules in {:.2} ms",
        molecules,
        start.elapsed().as_secs_f64() * 1000.0
    );

    let preds = Array2::from_shape_vec((molecules, width), preds)
        .map_err(|e| PredictError::Inference(e.into()))?;

    if uncertainty {
        let means = preds.slice(s![.., 0..;2]);
        let variances = preds.slice(s![.., 1..;2]);

        return Ok(match scaler {
            Some(scaler) => Predictions::Uncertain {
                means: scaler.inverse_transform(means)?,
                variances: scaler.scale_variances(variances)?,
            },
            None => Predictions::Uncertain {
                means: means.to_owned(),
                variances: variances.to_owned(),
            },
        });
    }

    match scaler {
        Some(scaler) => Ok(Predictions::Values(scaler.inverse_transform(preds.view())?)),
        None => Ok(Predictions::Values(preds)),
    }
}

fn check_shapes(
    kind: &'static str,
    expected: &[(String, Vec<usize>)],
    found: &[(String, Vec<usize>)],
) -> Result<(), PredictError> {
    if expected != found {
        return Err(PredictError::ShapeMismatch {
            kind,
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }

    Ok(())
}
