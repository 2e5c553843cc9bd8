use anyhow::{bail, Result};
use clap::ValueEnum;
use molpred::asset::{ModelKind, ModelPackage, PackageMeta};
use molpred::core::prelude::{Inferer, InfererBuilder, InfererProvider};
use std::{fs::File, path::Path};

/// Which inferer flavour to run the model with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum InfererKind {
    Basic,
    Fixed,
    Memoizing,
    Dynamic,
}

/// A model ready for prediction, with its metadata when loaded from a package.
pub(crate) struct LoadedModel {
    pub(crate) inferer: Box<dyn Inferer>,
    pub(crate) meta: Option<PackageMeta>,
}

/// The model kind implied by a file name, or `None` for a package.
pub(crate) fn kind_for_path(path: &Path) -> Result<Option<ModelKind>> {
    if molpred::nnef::is_nnef_tar(path) {
        return Ok(Some(ModelKind::Nnef));
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("onnx") => Ok(Some(ModelKind::Onnx)),
        Some("mprd") => Ok(None),
        Some(other) => bail!("unknown file type {:?}", other),
        None => bail!("missing file extension {:?}", path),
    }
}

fn build<P: InfererProvider>(
    builder: InfererBuilder<P>,
    kind: InfererKind,
    batch_size: usize,
) -> Result<Box<dyn Inferer>> {
    Ok(match kind {
        InfererKind::Basic => Box::new(builder.build_basic()?),
        InfererKind::Fixed => Box::new(builder.build_fixed(&[batch_size])?),
        InfererKind::Memoizing => Box::new(builder.build_memoizing(&[batch_size])?),
        InfererKind::Dynamic => Box::new(builder.build_dynamic()?),
    })
}

fn build_package(
    package: &ModelPackage,
    kind: InfererKind,
    batch_size: usize,
) -> Result<Box<dyn Inferer>> {
    Ok(match kind {
        InfererKind::Basic => Box::new(package.load_basic()?),
        InfererKind::Fixed => Box::new(package.load_fixed(&[batch_size])?),
        InfererKind::Memoizing => Box::new(package.load_memoizing(&[batch_size])?),
        InfererKind::Dynamic => Box::new(package.load_dynamic()?),
    })
}

/// Load an ONNX, NNEF or packaged model as the requested inferer flavour.
pub(crate) fn load_model(path: &Path, kind: InfererKind, batch_size: usize) -> Result<LoadedModel> {
    let mut reader = File::open(path)?;

    let loaded = match kind_for_path(path)? {
        Some(ModelKind::Onnx) => LoadedModel {
            inferer: build(molpred::onnx::builder(&mut reader), kind, batch_size)?,
            meta: None,
        },
        Some(ModelKind::Nnef) => LoadedModel {
            inferer: build(molpred::nnef::builder(&mut reader), kind, batch_size)?,
            meta: None,
        },
        None => {
            let package = ModelPackage::deserialize(&mut reader)?;
            log::info!("loaded {} package from {:?}", package.kind(), path);
            LoadedModel {
                inferer: build_package(&package, kind, batch_size)?,
                meta: Some(package.meta().clone()),
            }
        }
    };

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_from_extension() {
        assert_eq!(
            kind_for_path(Path::new("model.onnx")).unwrap(),
            Some(ModelKind::Onnx)
        );
        assert_eq!(
            kind_for_path(Path::new("model.nnef.tar")).unwrap(),
            Some(ModelKind::Nnef)
        );
        assert_eq!(kind_for_path(Path::new("model.mprd")).unwrap(), None);
        assert!(kind_for_path(Path::new("model.tar")).is_err());
        assert!(kind_for_path(Path::new("model")).is_err());
    }
}
