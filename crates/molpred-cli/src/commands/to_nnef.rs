// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use anyhow::{bail, Result};
use clap::Parser;
use molpred::asset::ModelPackage;
use std::{fs::File, io::Write, path::PathBuf};

/// Convert an ONNX model or ONNX package to NNEF.
///
/// Packages keep their metadata and stay packages.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct ToNnefArgs {
    /// The source ONNX or MPRD file.
    in_file: PathBuf,

    /// The destination NNEF tar or MPRD file.
    out_file: PathBuf,

    /// The desired batch size. Default: a symbolic batch size.
    #[clap(short = 'b', long = "batch-size")]
    batch_size: Option<usize>,

    /// Compress the output when writing a package.
    #[clap(long)]
    compress: bool,
}

pub(super) fn onnx_to_nnef(config: ToNnefArgs) -> Result<()> {
    let ToNnefArgs {
        in_file,
        out_file,
        batch_size,
        compress,
    } = config;

    let mut reader = File::open(&in_file)?;
    let in_ext = in_file.extension().and_then(|ext| ext.to_str());
    let out_ext = out_file.extension().and_then(|ext| ext.to_str());

    let mut bytes = match (in_ext, out_ext) {
        (Some("onnx"), _) if molpred::nnef::is_nnef_tar(&out_file) => {
            molpred::onnx::to_nnef(&mut reader, batch_size)?
        }
        (Some("mprd"), Some("mprd")) => ModelPackage::deserialize(&mut reader)?
            .to_nnef(batch_size)?
            .serialize(compress)?,
        (Some("onnx") | Some("mprd"), _) => bail!("unexpected extension: {:?}", out_file),
        (Some(ext), _) => bail!("unexpected extension: {:?}", ext),
        (None, _) => bail!("file without extension: {:?}", in_file),
    };
    bytes.shrink_to_fit();

    let mut out = tempfile::NamedTempFile::new()?;
    out.write_all(&bytes)?;

    std::fs::copy(&out, &out_file)?;
    log::info!("wrote {} bytes to {:?}", bytes.len(), out_file);

    Ok(())
}
