// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use tract_core::{
    model::{TypedModel, TypedSimplePlan},
    prelude::{Symbol, SymbolValues, ToDim},
    tract_data::{tvec, TractResult},
};
use tract_hir::prelude::{Datum, InferenceFact, InferenceModel, InferenceModelExt};

/// Name of the symbolic batch dimension in every plan we build.
pub(super) const BATCH_SYMBOL: &str = "N";

fn set_batched_input_facts<D: ToDim>(
    model: &mut InferenceModel,
    inputs: &[(String, Vec<usize>)],
    batch_dim: D,
) -> TractResult<()> {
    let outlets = model.output_outlets()?.len();
    for output in 0..outlets {
        model.set_output_fact(output, Default::default())?;
    }

    for (idx, (_name, shape)) in inputs.iter().enumerate() {
        let mut full_shape = tvec!(batch_dim.to_dim());

        full_shape.extend(shape.iter().map(|v| (*v as i32).into()));
        model.set_input_fact(idx, InferenceFact::dt_shape(f32::datum_type(), full_shape))?;
    }

    Ok(())
}

/// Type the model with a symbolic batch dimension.
pub(super) fn build_symbolic_model(
    mut model: InferenceModel,
    inputs: &[(String, Vec<usize>)],
) -> TractResult<(Symbol, TypedModel)> {
    let symbol = model.symbols.sym(BATCH_SYMBOL);
    set_batched_input_facts(&mut model, inputs, symbol.clone())?;

    let model = model.into_typed()?.into_decluttered()?;
    Ok((symbol, model))
}

/// Type, optimize and plan the model for a concrete batch dimension.
pub(super) fn build_model<D: ToDim>(
    mut model: InferenceModel,
    inputs: &[(String, Vec<usize>)],
    batch_dim: D,
) -> TractResult<TypedSimplePlan<TypedModel>> {
    set_batched_input_facts(&mut model, inputs, batch_dim)?;

    model
        .into_typed()?
        .into_decluttered()?
        .into_optimized()?
        .into_runnable()
}

pub(super) fn build_symbolic_typed(model: &mut TypedModel) -> TractResult<Symbol> {
    model.declutter()?;
    Ok(model.symbols.sym(BATCH_SYMBOL))
}

/// Concretize the batch symbol of a typed model and plan it.
pub(super) fn build_typed(
    model: TypedModel,
    batch_size: usize,
) -> TractResult<TypedSimplePlan<TypedModel>> {
    let symbol = model.symbols.sym(BATCH_SYMBOL);
    concretize(&model, &symbol, batch_size)
}

pub(super) fn concretize(
    model: &TypedModel,
    symbol: &Symbol,
    batch_size: usize,
) -> TractResult<TypedSimplePlan<TypedModel>> {
    model
        .concretize_dims(&SymbolValues::default().with(symbol, batch_size as i64))?
        .into_decluttered()?
        .into_optimized()?
        .into_runnable()
}
