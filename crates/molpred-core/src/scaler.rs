// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

/*!
Per-task standardization of prediction targets.

Models are trained on standardized targets, so their raw output lives in
standard-deviation units. [`StandardScaler::inverse_transform`] maps it
back; [`StandardScaler::variance_scale`] does the same for predicted
variances.
*/

use crate::error::PredictError;
use serde::{Deserialize, Serialize};
use tract_core::prelude::tract_ndarray::{Array2, ArrayView2, Axis, Zip};

/// Column-wise mean and standard deviation of the training targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f32>,
    pub stds: Vec<f32>,
}

impl StandardScaler {
    /// Create a scaler from explicit statistics.
    pub fn new(means: Vec<f32>, stds: Vec<f32>) -> Result<Self, PredictError> {
        if means.len() != stds.len() {
            return Err(PredictError::ScalerMismatch {
                expected: means.len(),
                found: stds.len(),
            });
        }

        Ok(Self { means, stds })
    }

    /// Fit on an N×T array of targets, ignoring NaN entries.
    ///
    /// A task without any finite target gets a mean of 0 and a std of 1;
    /// a constant task gets a std of 1.
    pub fn fit(targets: ArrayView2<'_, f32>) -> Self {
        let mut means = Vec::with_capacity(targets.ncols());
        let mut stds = Vec::with_capacity(targets.ncols());

        for column in targets.axis_iter(Axis(1)) {
            let values: Vec<f64> = column
                .iter()
                .filter(|v| !v.is_nan())
                .map(|v| *v as f64)
                .collect();

            if values.is_empty() {
                means.push(0.0);
                stds.push(1.0);
                continue;
            }

            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();

            means.push(mean as f32);
            stds.push(if std == 0.0 || std.is_nan() { 1.0 } else { std as f32 });
        }

        Self { means, stds }
    }

    /// Number of tasks covered by this scaler.
    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    fn check(&self, width: usize) -> Result<(), PredictError> {
        if self.means.len() != width || self.stds.len() != width {
            return Err(PredictError::ScalerMismatch {
                expected: self.means.len().min(self.stds.len()),
                found: width,
            });
        }

        Ok(())
    }

    /// Standardize: `(x - mean) / std` per column.
    pub fn transform(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, PredictError> {
        self.check(x.ncols())?;

        let mut out = x.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            Zip::from(&mut row)
                .and(&self.means[..])
                .and(&self.stds[..])
                .for_each(|v, mean, std| *v = (*v - mean) / std);
        }

        Ok(out)
    }

    /// Undo standardization: `x * std + mean` per column. NaN stays NaN.
    pub fn inverse_transform(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, PredictError> {
        self.check(x.ncols())?;

        let mut out = x.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            Zip::from(&mut row)
                .and(&self.means[..])
                .and(&self.stds[..])
                .for_each(|v, mean, std| *v = *v * std + mean);
        }

        Ok(out)
    }

    /// Per-task factor mapping a standardized variance to physical units.
    pub fn variance_scale(&self) -> Vec<f32> {
        self.stds.iter().map(|std| std * std).collect()
    }

    /// Multiply each variance column by the square of its task std.
    pub fn scale_variances(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, PredictError> {
        self.check(x.ncols())?;

        let scale = self.variance_scale();
        let mut out = x.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            Zip::from(&mut row)
                .and(&scale[..])
                .for_each(|v, factor| *v *= factor);
        }

        Ok(out)
    }
}
