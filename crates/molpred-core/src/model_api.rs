// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use tract_core::{model::TypedModel, tract_data::TractResult};
use tract_hir::{infer::Factoid, prelude::InferenceModel};

/// The `ModelApi` describes the inputs and outputs for a model.
///
/// Shapes exclude the leading batch dimension, so an input of `[N, 2048]`
/// is reported as `[2048]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelApi {
    /// The named model inputs.
    pub inputs: Vec<(String, Vec<usize>)>,

    /// The named model outputs.
    pub outputs: Vec<(String, Vec<usize>)>,
}

fn clean_name(raw: &str, strip_index: bool) -> String {
    let name = raw.split(':').next().unwrap_or(raw);
    if strip_index {
        name.strip_suffix("_0").unwrap_or(name).to_owned()
    } else {
        name.to_owned()
    }
}

impl ModelApi {
    /// Extract the model API from the provided inference model.
    pub fn for_model(model: &InferenceModel) -> TractResult<Self> {
        let mut inputs: Vec<(String, Vec<usize>)> = Default::default();
        for input_outlet in model.input_outlets()? {
            let node = model.node(input_outlet.node);
            let input_shape = &model.input_fact(input_outlet.node)?.shape;

            inputs.push((
                clean_name(&node.name, false),
                input_shape
                    .dims()
                    .filter_map(|value| value.concretize().and_then(|v| v.to_i64().ok()))
                    .map(|val| val as usize)
                    .collect(),
            ));
        }

        let mut outputs: Vec<(String, Vec<usize>)> = Default::default();
        for (idx, output_outlet) in model.output_outlets()?.iter().enumerate() {
            let label = model
                .outlet_labels
                .get(output_outlet)
                .cloned()
                .unwrap_or_else(|| model.node(output_outlet.node).name.clone());

            let output_shape = &model.output_fact(idx)?.shape;
            outputs.push((
                clean_name(&label, false),
                output_shape
                    .dims()
                    .filter_map(|value| value.concretize().and_then(|v| v.to_i64().ok()))
                    .map(|val| val as usize)
                    .collect(),
            ));
        }

        Ok(Self { outputs, inputs })
    }

    /// Extract the model API from the provided typed model.
    pub fn for_typed_model(model: &TypedModel) -> TractResult<Self> {
        let mut inputs: Vec<(String, Vec<usize>)> = Default::default();

        for input_outlet in model.input_outlets()? {
            let node = model.node(input_outlet.node);
            let input_shape = &model.input_fact(input_outlet.node)?.shape;

            inputs.push((
                clean_name(&node.name, true),
                input_shape
                    .iter()
                    .filter_map(|dim| dim.to_i64().map(|v| v as usize).ok())
                    .collect(),
            ));
        }

        let mut outputs: Vec<(String, Vec<usize>)> = Default::default();

        for (idx, output_outlet) in model.outputs.iter().enumerate() {
            let label = model
                .outlet_labels
                .get(output_outlet)
                .cloned()
                .unwrap_or_else(|| model.node(output_outlet.node).name.clone());

            let output_shape = &model.output_fact(idx)?.shape;
            let clean_shape = output_shape
                .iter()
                .filter_map(|dim| dim.to_i64().map(|v| v as usize).ok())
                .collect();

            outputs.push((clean_name(&label, true), clean_shape));
        }

        Ok(Self { outputs, inputs })
    }

    /// Position and per-molecule width of the output called `name`.
    pub fn output(&self, name: &str) -> Option<(usize, usize)> {
        output_position(&self.outputs, name)
    }
}

/// Position and per-molecule width of `name` among `outputs`.
pub(crate) fn output_position(
    outputs: &[(String, Vec<usize>)],
    name: &str,
) -> Option<(usize, usize)> {
    outputs
        .iter()
        .position(|(k, _)| k == name)
        .map(|idx| (idx, outputs[idx].1.iter().product()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_port_and_index() {
        assert_eq!(clean_name("preds:0", false), "preds");
        assert_eq!(clean_name("preds_0", true), "preds");
        assert_eq!(clean_name("preds_0", false), "preds_0");
    }

    #[test]
    fn finds_output_width() {
        let api = ModelApi {
            inputs: vec![("fp".to_owned(), vec![2048])],
            outputs: vec![
                ("hidden".to_owned(), vec![4, 8]),
                ("preds".to_owned(), vec![6]),
            ],
        };

        assert_eq!(api.output("hidden"), Some((0, 32)));
        assert_eq!(api.output("preds"), Some((1, 6)));
        assert_eq!(api.output("missing"), None);
    }
}
