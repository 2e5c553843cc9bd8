// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

use std::cell::RefCell;

use molpred_core::prelude::*;
use molpred_core::tract_core::prelude::tract_ndarray::{array, Array2};

/// A stand-in model: every output column `j` of every output is
/// `sum(fp) + j`.
struct TestInferer {
    preferred: Option<usize>,
    calls: RefCell<Vec<usize>>,
    in_shapes: Vec<(String, Vec<usize>)>,
    out_shapes: Vec<(String, Vec<usize>)>,
}

impl TestInferer {
    fn new(width: usize) -> Self {
        Self {
            preferred: None,
            calls: RefCell::new(vec![]),
            in_shapes: vec![("fp".to_owned(), vec![3])],
            out_shapes: vec![("preds".to_owned(), vec![width])],
        }
    }

    fn with_preferred(mut self, size: usize) -> Self {
        self.preferred = Some(size);
        self
    }
}

impl Inferer for TestInferer {
    fn select_batch_size(&self, max_count: usize) -> usize {
        self.preferred.map_or(max_count, |size| size.min(max_count))
    }

    fn infer_raw(&self, batch: &mut BatchView<'_>) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(batch.len());

        let sums: Vec<f32> = batch.input_slot(0).chunks(3).map(|row| row.iter().sum()).collect();
        for slot in 0..self.out_shapes.len() {
            let width: usize = self.out_shapes[slot].1.iter().product();
            let out = batch.output_slot_mut(slot);
            for (row, sum) in out.chunks_mut(width).zip(&sums) {
                for (j, v) in row.iter_mut().enumerate() {
                    *v = sum + j as f32;
                }
            }
        }

        Ok(())
    }

    fn input_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.in_shapes
    }

    fn output_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.out_shapes
    }
}

fn by_length(smiles: &str, _slot: &str, out: &mut [f32]) -> anyhow::Result<()> {
    out.fill(smiles.len() as f32);
    Ok(())
}

const CHAINS: [&str; 5] = ["C", "CC", "CCC", "CCCC", "CCCCC"];

fn config(batch_size: usize) -> PredictConfig {
    PredictConfig {
        batch_size,
        ..PredictConfig::default()
    }
}

#[test]
fn values_follow_input_order() {
    let inf = TestInferer::new(2);
    let preds = predict(&inf, &by_length, CHAINS, &config(2), None).unwrap();

    assert_eq!(
        preds,
        Predictions::Values(array![
            [3.0, 4.0],
            [6.0, 7.0],
            [9.0, 10.0],
            [12.0, 13.0],
            [15.0, 16.0]
        ])
    );
    assert_eq!(*inf.calls.borrow(), vec![2, 2, 1]);
}

#[test]
fn splits_batches_for_preferred_size() {
    let inf = TestInferer::new(1).with_preferred(2);
    let preds = predict(&inf, &by_length, CHAINS, &config(5), None).unwrap();

    assert_eq!(preds.len(), 5);
    assert_eq!(*inf.calls.borrow(), vec![2, 2, 1]);
    assert_eq!(preds.values().column(0).to_vec(), vec![3.0, 6.0, 9.0, 12.0, 15.0]);
}

#[test]
fn inverse_scales_values() {
    let inf = TestInferer::new(2);
    let scaler = StandardScaler::new(vec![1.0, -1.0], vec![2.0, 0.5]).unwrap();
    let preds = predict(&inf, &by_length, ["C", "CC"], &config(50), Some(&scaler)).unwrap();

    assert_eq!(preds, Predictions::Values(array![[7.0, 1.0], [13.0, 2.5]]));
}

#[test]
fn splits_interleaved_uncertainty() {
    let inf = TestInferer::new(4);
    let config = PredictConfig {
        uncertainty: true,
        ..config(1)
    };

    let preds = predict(&inf, &by_length, ["C", "CC"], &config, None).unwrap();
    assert_eq!(
        preds,
        Predictions::Uncertain {
            means: array![[3.0, 5.0], [6.0, 8.0]],
            variances: array![[4.0, 6.0], [7.0, 9.0]],
        }
    );
}

#[test]
fn scales_uncertainty_per_task() {
    let inf = TestInferer::new(4);
    let scaler = StandardScaler::new(vec![1.0, -1.0], vec![2.0, 0.5]).unwrap();
    let config = PredictConfig {
        uncertainty: true,
        ..config(2)
    };

    let preds = predict(&inf, &by_length, ["C"], &config, Some(&scaler)).unwrap();
    assert_eq!(preds.values(), &array![[7.0, 1.5]]);
    assert_eq!(preds.variances(), Some(&array![[16.0, 1.5]]));
}

#[test]
fn rejects_odd_uncertainty_width() {
    let inf = TestInferer::new(3);
    let config = PredictConfig {
        uncertainty: true,
        ..config(2)
    };

    let err = predict(&inf, &by_length, CHAINS, &config, None).unwrap_err();
    assert!(matches!(err, PredictError::OddUncertaintyWidth(3)));
    assert!(inf.calls.borrow().is_empty());
}

#[test]
fn rejects_mismatched_scaler() {
    let inf = TestInferer::new(3);
    let scaler = StandardScaler::new(vec![0.0], vec![1.0]).unwrap();

    let err = predict(&inf, &by_length, CHAINS, &config(2), Some(&scaler)).unwrap_err();
    assert!(matches!(
        err,
        PredictError::ScalerMismatch {
            expected: 1,
            found: 3
        }
    ));
    assert!(inf.calls.borrow().is_empty());

    // With uncertainty the scaler covers the mean columns only.
    let config = PredictConfig {
        uncertainty: true,
        ..config(2)
    };
    let scaler = StandardScaler::new(vec![0.0; 4], vec![1.0; 4]).unwrap();
    let err = predict(&TestInferer::new(4), &by_length, CHAINS, &config, Some(&scaler))
        .unwrap_err();
    assert!(matches!(
        err,
        PredictError::ScalerMismatch {
            expected: 4,
            found: 2
        }
    ));
}

#[test]
fn rejects_loader_for_other_model() {
    let inf = TestInferer::new(2);
    let dataset = MoleculeDataset::from_smiles(CHAINS);

    let loader =
        MoleculeDataLoader::new(&dataset, &by_length, inf.input_shapes(), &[], 2, 0).unwrap();
    let err = predict_batches(&inf, loader, false, None, None).unwrap_err();
    assert!(matches!(err, PredictError::ShapeMismatch { kind: "output", .. }));

    let inputs = vec![("fp".to_owned(), vec![4])];
    let loader =
        MoleculeDataLoader::new(&dataset, &by_length, &inputs, inf.output_shapes(), 2, 0).unwrap();
    let err = predict_batches(&inf, loader, false, None, None).unwrap_err();
    assert!(matches!(err, PredictError::ShapeMismatch { kind: "input", .. }));

    assert!(inf.calls.borrow().is_empty());
}

#[test]
fn empty_input_gives_empty_arrays() {
    let inf = TestInferer::new(4);
    let preds = predict(&inf, &by_length, Vec::<String>::new(), &config(8), None).unwrap();
    assert_eq!(preds, Predictions::Values(Array2::zeros((0, 4))));

    let config = PredictConfig {
        uncertainty: true,
        ..config(8)
    };
    let preds = predict(&inf, &by_length, Vec::<String>::new(), &config, None).unwrap();
    assert!(preds.is_empty());
    assert_eq!(preds.values().dim(), (0, 2));
    assert_eq!(preds.variances().map(|v| v.dim()), Some((0, 2)));
    assert!(inf.calls.borrow().is_empty());
}

#[test]
fn reports_failing_molecule() {
    let inf = TestInferer::new(1);
    let picky = |smiles: &str, _slot: &str, out: &mut [f32]| -> anyhow::Result<()> {
        anyhow::ensure!(!smiles.contains('N'), "unsupported element");
        out.fill(1.0);
        Ok(())
    };

    let err = predict(&inf, &picky, ["CC", "CCN", "CCC"], &config(1), None).unwrap_err();
    match err {
        PredictError::Featurize { smiles, source } => {
            assert_eq!(smiles, "CCN");
            assert_eq!(source.to_string(), "unsupported element");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The first batch ran before the second failed to load.
    assert_eq!(*inf.calls.borrow(), vec![1]);
}

#[test]
fn picks_named_output() {
    let mut inf = TestInferer::new(1);
    inf.out_shapes.push(("uncertain".to_owned(), vec![2]));

    let config = PredictConfig {
        uncertainty: true,
        output: Some("uncertain".to_owned()),
        ..config(4)
    };
    let preds = predict(&inf, &by_length, ["CC"], &config, None).unwrap();
    assert_eq!(preds.values(), &array![[6.0]]);
    assert_eq!(preds.variances(), Some(&array![[7.0]]));

    let config = PredictConfig {
        output: Some("logits".to_owned()),
        ..config
    };
    let err = predict(&inf, &by_length, ["CC"], &config, None).unwrap_err();
    assert!(matches!(err, PredictError::UnknownOutput(name) if name == "logits"));
}

#[test]
fn rejects_zero_batch_size() {
    let inf = TestInferer::new(1);
    let err = predict(&inf, &by_length, CHAINS, &config(0), None).unwrap_err();
    assert!(matches!(err, PredictError::InvalidBatchSize));
}

#[test]
fn config_defaults_from_json() {
    let config: PredictConfig = serde_json::from_str(r#"{"uncertainty": true}"#).unwrap();
    assert_eq!(
        config,
        PredictConfig {
            batch_size: 50,
            num_workers: 0,
            uncertainty: true,
            output: None,
        }
    );
}

#[cfg(feature = "threaded")]
#[test]
fn workers_do_not_change_results() {
    let smiles: Vec<String> = (1..=37).map(|n| "C".repeat(n)).collect();

    let inline = predict(
        &TestInferer::new(2),
        &by_length,
        smiles.clone(),
        &config(8),
        None,
    )
    .unwrap();

    let threaded_config = PredictConfig {
        num_workers: 3,
        ..config(8)
    };
    let threaded = predict(
        &TestInferer::new(2),
        &by_length,
        smiles,
        &threaded_config,
        None,
    )
    .unwrap();

    assert_eq!(inline, threaded);
    assert_eq!(inline.values()[[36, 0]], 111.0);
}
