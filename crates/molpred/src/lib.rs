/*!

# Molpred

Molpred runs pretrained molecular property models over lists of SMILES,
in batches, and maps the output back to physical units.

## Molpred Core

The core crate holds the prediction pipeline: datasets, the batch
loader, inferers over Tract plans and the target scaler.

```no_run
# fn load_bytes(s: &str) -> std::io::Cursor<Vec<u8>> { std::io::Cursor::new(vec![]) }
use molpred_core::prelude::{predict, PrecomputedFeatures, PredictConfig};

let inferer = molpred_onnx::builder(load_bytes("solubility.onnx")).build_memoizing(&[50])?;
let features = PrecomputedFeatures::from_json_lines(load_bytes("features.jsonl"))?;

let predictions = predict(&inferer, &features, ["CCO", "CC(=O)O"], &PredictConfig::default(), None)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Molpred Asset

A model package keeps ONNX or NNEF data together with its target scaler
and uncertainty mode, so a prediction run needs a single file.

```no_run
# fn load_bytes(s: &str) -> Vec<u8> { vec![] }
# fn scaler() -> molpred_core::prelude::StandardScaler { unimplemented!() }
use molpred_asset::{ModelKind, ModelPackage, PackageMeta};

let meta = PackageMeta {
    scaler: Some(scaler()),
    uncertainty: true,
    output: None,
};
let package = ModelPackage::new(ModelKind::Onnx, meta, load_bytes("solubility.onnx"));

let inferer = package.load_fixed(&[50])?;
let config = package.predict_config(50, 4);
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Molpred ONNX and Molpred NNEF

These are simple intermediates helping Molpred Asset, but can also be used directly.
*/

#![warn(rust_2018_idioms)]

pub use molpred_asset as asset;
pub use molpred_core as core;
pub use molpred_nnef as nnef;
pub use molpred_onnx as onnx;
