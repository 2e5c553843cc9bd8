// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

/*!
Iterates a [`MoleculeDataset`] in featurized batches.

The loader owns the only parallelism in the pipeline: with workers
configured, the molecules of a batch are featurized on a dedicated rayon
pool. Each worker writes into its own rows of the batch buffers, so batch
contents and order never depend on the worker count.
*/

use crate::{
    batch::MoleculeBatch,
    dataset::{Featurizer, MoleculeDatapoint, MoleculeDataset},
    error::PredictError,
};

#[cfg(feature = "threaded")]
use rayon::prelude::*;

/// Batches and featurizes a dataset for an inferer with the given API.
pub struct MoleculeDataLoader<'a, F: Featurizer + ?Sized> {
    dataset: &'a MoleculeDataset,
    featurizer: &'a F,
    inputs: &'a [(String, Vec<usize>)],
    outputs: &'a [(String, Vec<usize>)],
    batch_size: usize,
    #[cfg(feature = "threaded")]
    pool: Option<rayon::ThreadPool>,
    cursor: usize,
    failed: bool,
}

impl<'a, F> MoleculeDataLoader<'a, F>
where
    F: Featurizer + ?Sized,
{
    /// Create a loader handing out batches of `batch_size` molecules.
    ///
    /// With `num_workers == 0` featurization runs on the calling thread.
    pub fn new(
        dataset: &'a MoleculeDataset,
        featurizer: &'a F,
        inputs: &'a [(String, Vec<usize>)],
        outputs: &'a [(String, Vec<usize>)],
        batch_size: usize,
        num_workers: usize,
    ) -> Result<Self, PredictError> {
        if batch_size == 0 {
            return Err(PredictError::InvalidBatchSize);
        }

        #[cfg(not(feature = "threaded"))]
        if num_workers > 0 {
            log::warn!(
                "built without the `threaded` feature; ignoring {} loader workers",
                num_workers
            );
        }

        Ok(Self {
            dataset,
            featurizer,
            inputs,
            outputs,
            batch_size,
            #[cfg(feature = "threaded")]
            pool: build_pool(num_workers)?,
            cursor: 0,
            failed: false,
        })
    }

    /// The number of batches this loader produces in total.
    pub fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Whether the loader produces no batches at all.
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// The configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The model inputs this loader featurizes for.
    pub fn input_shapes(&self) -> &'a [(String, Vec<usize>)] {
        self.inputs
    }

    /// The model outputs batches are allocated for.
    pub fn output_shapes(&self) -> &'a [(String, Vec<usize>)] {
        self.outputs
    }

    fn load(&self, points: &[MoleculeDatapoint]) -> Result<MoleculeBatch, PredictError> {
        let smiles = points.iter().map(|point| point.smiles.clone()).collect();
        let mut batch = MoleculeBatch::for_shapes(smiles, self.inputs, self.outputs);

        for (idx, (name, _)) in self.inputs.iter().enumerate() {
            let (data, count) = batch.input_mut(idx);
            if count == 0 {
                continue;
            }

            self.fill_slot(points, name, data, count)?;
        }

        Ok(batch)
    }

    #[cfg(feature = "threaded")]
    fn fill_slot(
        &self,
        points: &[MoleculeDatapoint],
        slot: &str,
        data: &mut [f32],
        count: usize,
    ) -> Result<(), PredictError> {
        match &self.pool {
            Some(pool) => pool.install(|| {
                points
                    .par_iter()
                    .zip(data.par_chunks_mut(count))
                    .try_for_each(|(point, row)| featurize_one(self.featurizer, point, slot, row))
            }),
            None => fill_sequential(self.featurizer, points, slot, data, count),
        }
    }

    #[cfg(not(feature = "threaded"))]
    fn fill_slot(
        &self,
        points: &[MoleculeDatapoint],
        slot: &str,
        data: &mut [f32],
        count: usize,
    ) -> Result<(), PredictError> {
        fill_sequential(self.featurizer, points, slot, data, count)
    }
}

#[cfg(feature = "threaded")]
fn build_pool(num_workers: usize) -> Result<Option<rayon::ThreadPool>, PredictError> {
    if num_workers == 0 {
        return Ok(None);
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .thread_name(|idx| format!("molpred-loader-{}", idx))
        .build()
        .map(Some)
        .map_err(|e| PredictError::WorkerPool(e.to_string()))
}

fn featurize_one<F: Featurizer + ?Sized>(
    featurizer: &F,
    point: &MoleculeDatapoint,
    slot: &str,
    row: &mut [f32],
) -> Result<(), PredictError> {
    featurizer
        .featurize(&point.smiles, slot, row)
        .map_err(|source| PredictError::Featurize {
            smiles: point.smiles.clone(),
            source,
        })
}

fn fill_sequential<F: Featurizer + ?Sized>(
    featurizer: &F,
    points: &[MoleculeDatapoint],
    slot: &str,
    data: &mut [f32],
    count: usize,
) -> Result<(), PredictError> {
    points
        .iter()
        .zip(data.chunks_mut(count))
        .try_for_each(|(point, row)| featurize_one(featurizer, point, slot, row))
}

impl<'a, F> Iterator for MoleculeDataLoader<'a, F>
where
    F: Featurizer + ?Sized,
{
    type Item = Result<MoleculeBatch, PredictError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.dataset.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.dataset.len());
        let points = self.dataset.slice(self.cursor..end);
        self.cursor = end;

        let batch = self.load(points);
        self.failed = batch.is_err();
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }

        let remaining = (self.dataset.len() - self.cursor).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}
