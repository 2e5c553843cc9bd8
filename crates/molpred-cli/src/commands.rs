// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use anyhow::Result;
use clap::Parser;

mod api;
mod load;
mod package;
mod predict;
mod to_nnef;

/// The command to run.
#[derive(Parser, Debug)]
pub(crate) enum Command {
    Predict(predict::Args),
    Api(api::ApiArgs),
    Package(package::PackageArgs),
    ToNnef(to_nnef::ToNnefArgs),
}

pub(crate) fn run(command: Command) -> Result<()> {
    match command {
        Command::Predict(config) => predict::predict(config),
        Command::Api(config) => api::describe_api(config),
        Command::Package(config) => package::package(config),
        Command::ToNnef(config) => to_nnef::onnx_to_nnef(config),
    }
}
