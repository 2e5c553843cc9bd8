// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use super::load::{load_model, InfererKind};
use super::package::read_scaler;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use molpred::core::prelude::{
    predict as run_predict, PrecomputedFeatures, PredictConfig, Predictions,
};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    path::PathBuf,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Predict properties for a list of molecules.
///
/// Features are read from a JSON lines file with one object per molecule,
/// `{"smiles": "CCO", "features": {"<input>": [..]}}`. Settings stored in a
/// package are used unless overridden.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct Args {
    /// The model file - ONNX, NNEF or MPRD format.
    model: PathBuf,

    /// File with one SMILES per line. Anything after the first whitespace is ignored.
    smiles: PathBuf,

    /// Precomputed features for the molecules.
    #[clap(short, long)]
    features: PathBuf,

    /// Number of molecules per batch.
    #[clap(short, long, default_value_t = 50)]
    batch_size: usize,

    /// Loader threads used for featurization. 0 featurizes inline.
    #[clap(short = 'j', long, default_value_t = 0)]
    workers: usize,

    /// The model emits interleaved mean/variance columns.
    #[clap(long, conflicts_with = "no_uncertainty")]
    uncertainty: bool,

    /// Read the output as plain values, even for a package predicting uncertainty.
    #[clap(long)]
    no_uncertainty: bool,

    /// JSON file with the target scaler.
    #[clap(short, long)]
    scaler: Option<PathBuf>,

    /// The output holding the predictions.
    #[clap(short, long)]
    output: Option<String>,

    /// Which inferer to run the model with.
    #[clap(long, value_enum, default_value_t = InfererKind::Memoizing)]
    inferer: InfererKind,

    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct Record<'a> {
    smiles: &'a str,
    values: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variances: Option<Vec<f32>>,
}

/// Settle the uncertainty mode from the packaged setting and the flags.
fn resolve_uncertainty(packaged: Option<bool>, on: bool, off: bool) -> bool {
    let requested = match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };

    match (packaged, requested) {
        (Some(packaged), Some(requested)) if packaged != requested => {
            log::warn!(
                "overriding packaged uncertainty mode {} with {}",
                packaged,
                requested
            );
            requested
        }
        (packaged, requested) => requested.or(packaged).unwrap_or(false),
    }
}

/// Read the SMILES column of a file, skipping blank lines.
fn read_smiles(reader: impl Read) -> Result<Vec<String>> {
    let mut smiles = vec![];
    for line in BufReader::new(reader).lines() {
        if let Some(token) = line?.split_whitespace().next() {
            smiles.push(token.to_owned());
        }
    }

    Ok(smiles)
}

fn records<'a>(smiles: &'a [String], preds: &Predictions) -> Vec<Record<'a>> {
    let variances = preds.variances();
    smiles
        .iter()
        .zip(preds.values().rows())
        .enumerate()
        .map(|(idx, (smiles, values))| Record {
            smiles,
            values: values.to_vec(),
            variances: variances.map(|v| v.row(idx).to_vec()),
        })
        .collect()
}

fn write_text(out: &mut impl Write, records: &[Record<'_>]) -> Result<()> {
    for record in records {
        write!(out, "{}", record.smiles)?;
        match &record.variances {
            Some(variances) => {
                for (mean, var) in record.values.iter().zip(variances) {
                    write!(out, "\t{}\t{}", mean, var)?;
                }
            }
            None => {
                for value in &record.values {
                    write!(out, "\t{}", value)?;
                }
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

pub(super) fn predict(config: Args) -> Result<()> {
    let model = load_model(&config.model, config.inferer, config.batch_size)?;
    let (packaged_uncertainty, packaged_scaler, packaged_output) = match model.meta {
        Some(meta) => (Some(meta.uncertainty), meta.scaler, meta.output),
        None => (None, None, None),
    };

    let uncertainty =
        resolve_uncertainty(packaged_uncertainty, config.uncertainty, config.no_uncertainty);

    let scaler = match (&config.scaler, packaged_scaler) {
        (Some(path), packaged) => {
            if packaged.is_some() {
                log::warn!("overriding packaged scaler with {:?}", path);
            }
            Some(read_scaler(path)?)
        }
        (None, packaged) => packaged,
    };

    let output = match (config.output, packaged_output) {
        (Some(name), Some(packaged)) if name != packaged => {
            log::warn!("overriding packaged output {:?} with {:?}", packaged, name);
            Some(name)
        }
        (name, packaged) => name.or(packaged),
    };

    let predict_config = PredictConfig {
        batch_size: config.batch_size,
        num_workers: config.workers,
        uncertainty,
        output,
    };

    let smiles = read_smiles(
        File::open(&config.smiles).with_context(|| format!("failed opening {:?}", config.smiles))?,
    )?;
    let features = PrecomputedFeatures::from_json_lines(
        File::open(&config.features)
            .with_context(|| format!("failed opening {:?}", config.features))?,
    )?;
    log::info!(
        "loaded {} molecules and features for {}",
        smiles.len(),
        features.len()
    );

    let preds = run_predict(
        model.inferer.as_ref(),
        &features,
        smiles.iter().cloned(),
        &predict_config,
        scaler.as_ref(),
    )?;

    let records = records(&smiles, &preds);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match config.format {
        OutputFormat::Text => write_text(&mut out, &records)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &records)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
