// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use super::load::{load_model, InfererKind};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Print the inputs and outputs of a model.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct ApiArgs {
    /// The model file - ONNX, NNEF or MPRD format.
    file: PathBuf,
}

pub(super) fn describe_api(config: ApiArgs) -> Result<()> {
    let model = load_model(&config.file, InfererKind::Basic, 1)?;

    println!("Inputs:");
    for (name, shape) in model.inferer.input_shapes() {
        println!("\t{:40}: {:?}", name, shape);
    }

    println!("\nOutputs:");
    for (name, shape) in model.inferer.output_shapes() {
        println!("\t{:40}: {:?}", name, shape);
    }

    if let Some(meta) = &model.meta {
        println!("\nPackage:");
        println!("\t{:40}: {}", "uncertainty", meta.uncertainty);
        if let Some(output) = &meta.output {
            println!("\t{:40}: {}", "output", output);
        }
        if let Some(scaler) = &meta.scaler {
            println!("\t{:40}: {} tasks", "scaler", scaler.len());
        }
    }

    Ok(())
}
