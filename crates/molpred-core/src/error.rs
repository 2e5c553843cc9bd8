// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use thiserror::Error;

/// Errors that can be returned by the prediction pipeline.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("failed featurizing {smiles:?}: {source}")]
    Featurize {
        smiles: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("model has no output named {0:?}")]
    UnknownOutput(String),

    #[error("model has no outputs")]
    NoOutputs,

    #[error("uncertainty needs interleaved mean/variance columns but the model emits {0}")]
    OddUncertaintyWidth(usize),

    #[error("scaler covers {expected} tasks but the predictions have {found}")]
    ScalerMismatch { expected: usize, found: usize },

    #[error("loader {kind} shapes {found:?} do not match the model's {expected:?}")]
    ShapeMismatch {
        kind: &'static str,
        expected: Vec<(String, Vec<usize>)>,
        found: Vec<(String, Vec<usize>)>,
    },

    #[error("failed building worker pool: {0}")]
    WorkerPool(String),

    #[error("inference failed: {0}")]
    Inference(anyhow::Error),
}
