// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use molpred_asset::{ModelKind, ModelPackage, PackageMeta, MAGIC, VERSION};
use molpred_core::prelude::{predict, Inferer, Predictions, StandardScaler};
use molpred_nnef::tract_nnef::{self, prelude::*, tract_core::ops::math::mul};

fn solubility_meta() -> PackageMeta {
    PackageMeta {
        scaler: Some(StandardScaler::new(vec![-3.05, 1.2], vec![2.1, 0.4]).unwrap()),
        uncertainty: true,
        output: Some("preds".to_owned()),
    }
}

fn model_bytes() -> Vec<u8> {
    (0..4096u32).map(|v| (v % 251) as u8).collect()
}

#[test]
fn test_reload_package() {
    let package = ModelPackage::new(ModelKind::Onnx, solubility_meta(), model_bytes());

    for compress in [false, true] {
        let bytes = package.serialize(compress).expect("serializable package");
        let loaded = ModelPackage::deserialize(bytes.as_slice()).expect("valid package");

        assert_eq!(loaded.kind(), ModelKind::Onnx);
        assert_eq!(loaded.meta(), &solubility_meta());
        assert_eq!(loaded.data(), model_bytes().as_slice());
    }
}

#[test]
fn test_compression_shrinks_repetitive_model() {
    let package = ModelPackage::new(ModelKind::Nnef, PackageMeta::default(), vec![0u8; 1 << 16]);

    let raw = package.serialize(false).unwrap();
    let compressed = package.serialize(true).unwrap();

    assert_eq!(compressed[5], 1);
    assert!(compressed.len() < raw.len() / 4);
}

#[test]
fn test_config_from_package() {
    let package = ModelPackage::new(ModelKind::Onnx, solubility_meta(), model_bytes());
    let config = package.predict_config(64, 2);

    assert_eq!(config.batch_size, 64);
    assert_eq!(config.num_workers, 2);
    assert!(config.uncertainty);
    assert_eq!(config.output.as_deref(), Some("preds"));
    assert_eq!(package.scaler().map(|s| s.len()), Some(2));
}

#[test]
fn test_rejects_bad_magic() {
    let mut bytes = ModelPackage::new(ModelKind::Onnx, PackageMeta::default(), model_bytes())
        .serialize(false)
        .unwrap();
    bytes[0] = b'C';

    let err = ModelPackage::deserialize(bytes.as_slice()).unwrap_err();
    assert!(err.to_string().contains("unexpected magic"), "{}", err);
}

#[test]
fn test_rejects_bad_preamble() {
    let good = ModelPackage::new(ModelKind::Onnx, PackageMeta::default(), model_bytes())
        .serialize(false)
        .unwrap();

    let mut version = good.clone();
    version[4] = VERSION + 1;
    assert!(ModelPackage::deserialize(version.as_slice()).is_err());

    let mut reserved = good.clone();
    reserved[6] = 1;
    assert!(ModelPackage::deserialize(reserved.as_slice()).is_err());

    let mut kind = good.clone();
    kind[7] = 9;
    assert!(ModelPackage::deserialize(kind.as_slice()).is_err());

    let mut flag = good;
    flag[5] = 3;
    assert!(ModelPackage::deserialize(flag.as_slice()).is_err());
}

#[test]
fn test_rejects_truncated() {
    assert!(ModelPackage::deserialize(&MAGIC[..2]).is_err());

    let mut header = MAGIC.to_vec();
    header.extend([VERSION, 0, 0, 1]);
    assert!(ModelPackage::deserialize(header.as_slice()).is_err());

    // Metadata length pointing past the end of the body.
    header.extend(100u32.to_le_bytes());
    header.extend(b"{}");
    let err = ModelPackage::deserialize(header.as_slice()).unwrap_err();
    assert!(err.to_string().contains("metadata"), "{}", err);
}

#[test]
fn test_nnef_package_converts_to_itself() {
    let package = ModelPackage::new(ModelKind::Nnef, solubility_meta(), model_bytes());
    let converted = package.to_nnef(None).unwrap();

    assert_eq!(converted.kind(), ModelKind::Nnef);
    assert_eq!(converted.meta(), package.meta());
    assert_eq!(converted.data(), package.data());
}

/// `preds[N, 2] = fp[N, 2] * [1, 10]`, written as a NNEF tar.
fn scaling_model_tar() -> Vec<u8> {
    let mut model = TypedModel::default();
    let batch = model.symbols.sym("N");
    let fp = model
        .add_source("fp", f32::fact([batch.to_dim(), 2.to_dim()]))
        .unwrap();
    let weights = model
        .add_const("weights", tensor2(&[[1.0f32, 10.0]]))
        .unwrap();
    let preds = model.wire_node("preds", mul(), &[fp, weights]).unwrap();
    model.set_output_outlets(&preds).unwrap();

    let mut bytes = vec![];
    tract_nnef::nnef()
        .with_tract_core()
        .write(&model, &mut bytes)
        .unwrap();
    bytes
}

fn by_length(smiles: &str, _slot: &str, out: &mut [f32]) -> anyhow::Result<()> {
    out.fill(smiles.len() as f32);
    Ok(())
}

#[test]
fn test_predict_from_compressed_package() {
    let meta = PackageMeta {
        scaler: Some(StandardScaler::new(vec![1.0], vec![2.0]).unwrap()),
        uncertainty: true,
        output: None,
    };
    let bytes = ModelPackage::new(ModelKind::Nnef, meta, scaling_model_tar())
        .serialize(true)
        .unwrap();
    let package = ModelPackage::deserialize(bytes.as_slice()).unwrap();
    let config = package.predict_config(3, 0);

    let inferers: Vec<Box<dyn Inferer>> = vec![
        Box::new(package.load_basic().unwrap()),
        Box::new(package.load_fixed(&[2]).unwrap()),
        Box::new(package.load_memoizing(&[]).unwrap()),
        Box::new(package.load_dynamic().unwrap()),
    ];

    let smiles: Vec<String> = (1..=7).map(|n| "C".repeat(n)).collect();
    for inferer in inferers {
        let preds = predict(
            inferer.as_ref(),
            &by_length,
            smiles.clone(),
            &config,
            package.scaler(),
        )
        .unwrap();

        match preds {
            Predictions::Uncertain { means, variances } => {
                // len * 2 + 1 and len * 10 * 4
                assert_eq!(
                    means.column(0).to_vec(),
                    vec![3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0]
                );
                assert_eq!(variances[[0, 0]], 40.0);
                assert_eq!(variances[[6, 0]], 280.0);
            }
            other => panic!("expected uncertain predictions, got {:?}", other),
        }
    }
}
