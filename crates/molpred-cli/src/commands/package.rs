// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use super::load::kind_for_path;
use anyhow::{bail, Context, Result};
use clap::Parser;
use molpred::asset::{ModelPackage, PackageMeta};
use molpred::core::prelude::StandardScaler;
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// Package a model with its target scaler and output settings.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct PackageArgs {
    /// The source ONNX or NNEF tar file.
    in_file: PathBuf,

    /// The destination MPRD file.
    out_file: PathBuf,

    /// JSON file with the target scaler, `{"means": [..], "stds": [..]}`.
    #[clap(short, long)]
    scaler: Option<PathBuf>,

    /// The model emits interleaved mean/variance columns.
    #[clap(long)]
    uncertainty: bool,

    /// The output holding the predictions, when it isn't the first.
    #[clap(short, long)]
    output: Option<String>,

    /// Compress the package body.
    #[clap(long)]
    compress: bool,
}

pub(crate) fn read_scaler(path: &Path) -> Result<StandardScaler> {
    let reader = File::open(path).with_context(|| format!("failed opening {:?}", path))?;
    let scaler: StandardScaler = serde_json::from_reader(reader)
        .with_context(|| format!("invalid scaler in {:?}", path))?;

    // Rebuild to validate the column counts.
    Ok(StandardScaler::new(scaler.means, scaler.stds)?)
}

pub(super) fn package(config: PackageArgs) -> Result<()> {
    let kind = match kind_for_path(&config.in_file)? {
        Some(kind) => kind,
        None => bail!("already a package: {:?}", config.in_file),
    };

    match config.out_file.extension().and_then(|ext| ext.to_str()) {
        Some("mprd") => {}
        _ => bail!("unexpected extension: {:?}", config.out_file),
    }

    let meta = PackageMeta {
        scaler: config.scaler.as_deref().map(read_scaler).transpose()?,
        uncertainty: config.uncertainty,
        output: config.output,
    };

    let reader = File::open(&config.in_file)?;
    let package = ModelPackage::from_reader(kind, meta, reader)?;

    // Fail here rather than at prediction time on a broken model.
    package.load_basic().context("model does not load")?;

    let bytes = package.serialize(config.compress)?;

    let mut out = tempfile::NamedTempFile::new()?;
    out.write_all(&bytes)?;

    std::fs::copy(&out, &config.out_file)?;
    log::info!(
        "packaged {} model into {:?} ({} bytes)",
        kind,
        config.out_file,
        bytes.len()
    );

    Ok(())
}
