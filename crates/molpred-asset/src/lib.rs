/*!
A packaged model keeps a property model together with what is needed to
read its output: the target scaler it was trained against, whether it
predicts its own uncertainty and which output holds the predictions.

The layout is a short preamble followed by the body:

| bytes   | content |
| ------- | ------- |
| 0..4    | magic `MPRD` |
| 4       | format version |
| 5       | compression flag (1 = snappy framed body) |
| 6       | reserved, zero |
| 7       | [`ModelKind`] |
| 8..     | body: little-endian `u32` metadata length, JSON [`PackageMeta`], model bytes |
*/

use anyhow::{bail, Context, Result};
use molpred_core::prelude::{
    BasicInferer, DynamicInferer, FixedBatchInferer, MemoizingDynamicInferer, PredictConfig,
    StandardScaler,
};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};

pub const VERSION: u8 = 1;

/// Magic used to ensure packages are valid.
pub const MAGIC: [u8; 4] = [b'M', b'P', b'R', b'D'];

/// ModelKind denotes what kind of model is contained inside a [`ModelPackage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModelKind {
    /// Used for a package containing ONNX ModelProto data.
    Onnx = 1,

    /// Used for a package containing a NNEF tar.
    Nnef = 2,
}

impl TryFrom<u8> for ModelKind {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ModelKind::Onnx),
            2 => Ok(ModelKind::Nnef),
            v => bail!("unexpected model kind: {:?}", v),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Onnx => f.pad("onnx"),
            ModelKind::Nnef => f.pad("nnef"),
        }
    }
}

/// How to interpret the output of a packaged model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageMeta {
    /// Scaler fit on the training targets.
    pub scaler: Option<StandardScaler>,

    /// Whether the model emits interleaved mean/variance columns.
    pub uncertainty: bool,

    /// The output holding the predictions, when it isn't the first.
    pub output: Option<String>,
}

/// A model with its prediction metadata.
#[derive(Debug, Clone)]
pub struct ModelPackage {
    kind: ModelKind,
    meta: PackageMeta,
    data: Vec<u8>,
}

fn read_exact_or_bail(reader: &mut impl Read, buf: &mut [u8], what: &str) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let count = reader.read(&mut buf[filled..])?;
        if count == 0 {
            bail!(
                "too few bytes available for {}, expected {} but got {}",
                what,
                buf.len(),
                filled
            );
        }
        filled += count;
    }

    Ok(())
}

impl ModelPackage {
    /// Create a new package from parts.
    ///
    /// Note: Does not validate the model data.
    pub fn new<Data: Into<Vec<u8>>>(kind: ModelKind, meta: PackageMeta, data: Data) -> Self {
        Self {
            kind,
            meta,
            data: data.into(),
        }
    }

    /// Create a new package from a reader and a kind.
    ///
    /// Note: Does not validate the model data.
    pub fn from_reader<Reader: Read>(
        kind: ModelKind,
        meta: PackageMeta,
        mut reader: Reader,
    ) -> Result<Self> {
        let mut buf = vec![];
        reader.read_to_end(&mut buf)?;

        Ok(Self::new(kind, meta, buf))
    }

    /// Deserialize from raw bytes.
    ///
    /// Note: Only the framing and metadata are validated. The model itself is
    /// checked when creating an inferer.
    pub fn deserialize(mut reader: impl Read) -> Result<Self> {
        let mut magic: [u8; 4] = [0; 4];
        read_exact_or_bail(&mut reader, &mut magic, "magic")?;

        if magic != MAGIC {
            bail!(
                "unexpected magic: expected 'MPRD' found {}",
                String::from_utf8_lossy(&magic)
            );
        }

        let mut preamble: [u8; 4] = [0; 4];
        read_exact_or_bail(&mut reader, &mut preamble, "preamble")?;
        let [version, compressed, reserved, kind] = preamble;

        if version != VERSION {
            bail!("unsupported package version {}", version);
        }

        if reserved != 0 {
            bail!("unexpected non-zero reserved byte in preamble: {}", reserved);
        }

        let kind = kind.try_into()?;

        let mut body = vec![];
        match compressed {
            0 => {
                reader.read_to_end(&mut body)?;
            }
            1 => {
                snap::read::FrameDecoder::new(reader).read_to_end(&mut body)?;
            }
            flag => bail!("unexpected compression flag: {}", flag),
        }

        let mut body = Cursor::new(body);
        let mut len = [0u8; 4];
        read_exact_or_bail(&mut body, &mut len, "metadata length")?;
        let len = u32::from_le_bytes(len) as usize;

        let offset = body.position() as usize;
        let body = body.into_inner();
        if body.len() < offset + len {
            bail!(
                "too few bytes available for metadata, expected {} but got {}",
                len,
                body.len() - offset
            );
        }

        let meta = serde_json::from_slice(&body[offset..offset + len])
            .context("invalid package metadata")?;
        let data = body[offset + len..].to_vec();

        Ok(Self { kind, meta, data })
    }

    /// Serialize to raw bytes.
    ///
    /// If compression is enabled the body is written as a snappy frame stream.
    ///
    /// The buffer returned will not contain any extra unused bytes.
    pub fn serialize(&self, compress: bool) -> Result<Vec<u8>> {
        let meta = serde_json::to_vec(&self.meta)?;
        let meta_len = u32::try_from(meta.len()).context("package metadata too large")?;

        let mut output = vec![];
        output.write_all(&MAGIC)?;

        let compress_flag: u8 = if compress { 1 } else { 0 };
        let preamble: [u8; 4] = [VERSION, compress_flag, 0, self.kind as u8];
        output.write_all(&preamble)?;

        if compress {
            let mut encoder = snap::write::FrameEncoder::new(&mut output);
            encoder.write_all(&meta_len.to_le_bytes())?;
            encoder.write_all(&meta)?;
            encoder.write_all(&self.data)?;
            encoder.flush()?;
        } else {
            output.write_all(&meta_len.to_le_bytes())?;
            output.write_all(&meta)?;
            output.write_all(&self.data)?;
        }

        output.shrink_to_fit();

        Ok(output)
    }

    /// Get the kind of this package.
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Get the prediction metadata.
    pub fn meta(&self) -> &PackageMeta {
        &self.meta
    }

    /// Get the model data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The packaged scaler, if any.
    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.meta.scaler.as_ref()
    }

    /// A prediction config honoring the packaged uncertainty mode and output.
    pub fn predict_config(&self, batch_size: usize, num_workers: usize) -> PredictConfig {
        PredictConfig {
            batch_size,
            num_workers,
            uncertainty: self.meta.uncertainty,
            output: self.meta.output.clone(),
        }
    }

    /// Load a simple unbatched inferer from this package.
    ///
    /// See [`BasicInferer`] for more details.
    pub fn load_basic(&self) -> Result<BasicInferer> {
        let mut cursor = Cursor::new(&self.data);
        match self.kind {
            ModelKind::Onnx => molpred_onnx::builder(&mut cursor).build_basic(),
            ModelKind::Nnef => molpred_nnef::builder(&mut cursor).build_basic(),
        }
    }

    /// Load a batching inferer from this package with fixed batch sizes.
    ///
    /// See [`FixedBatchInferer`] for more details.
    pub fn load_fixed(&self, sizes: &[usize]) -> Result<FixedBatchInferer> {
        let mut cursor = Cursor::new(&self.data);
        match self.kind {
            ModelKind::Onnx => molpred_onnx::builder(&mut cursor).build_fixed(sizes),
            ModelKind::Nnef => molpred_nnef::builder(&mut cursor).build_fixed(sizes),
        }
    }

    /// Load a memoizing inferer from this package.
    ///
    /// See [`MemoizingDynamicInferer`] for more details.
    pub fn load_memoizing(&self, preload_sizes: &[usize]) -> Result<MemoizingDynamicInferer> {
        let mut cursor = Cursor::new(&self.data);
        match self.kind {
            ModelKind::Onnx => molpred_onnx::builder(&mut cursor).build_memoizing(preload_sizes),
            ModelKind::Nnef => molpred_nnef::builder(&mut cursor).build_memoizing(preload_sizes),
        }
    }

    /// Load a dynamic inferer from this package.
    ///
    /// See [`DynamicInferer`] for more details.
    pub fn load_dynamic(&self) -> Result<DynamicInferer> {
        let mut cursor = Cursor::new(&self.data);
        match self.kind {
            ModelKind::Onnx => molpred_onnx::builder(&mut cursor).build_dynamic(),
            ModelKind::Nnef => molpred_nnef::builder(&mut cursor).build_dynamic(),
        }
    }

    /// Convert this package to a NNEF package, keeping the metadata.
    ///
    /// NNEF packages are returned unchanged.
    pub fn to_nnef(&self, batch_size: Option<usize>) -> Result<Self> {
        let data = match self.kind {
            ModelKind::Nnef => return Ok(self.clone()),
            ModelKind::Onnx => molpred_onnx::to_nnef(&mut Cursor::new(&self.data), batch_size)?,
        };

        Ok(Self {
            kind: ModelKind::Nnef,
            meta: self.meta.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_byte() {
        assert_eq!(ModelKind::try_from(1).unwrap(), ModelKind::Onnx);
        assert_eq!(ModelKind::try_from(2).unwrap(), ModelKind::Nnef);
        assert!(ModelKind::try_from(0).is_err());
        assert_eq!(format!("{:>5}", ModelKind::Nnef), " nnef");
    }

    #[test]
    fn preamble_layout() {
        let package = ModelPackage::new(ModelKind::Nnef, PackageMeta::default(), vec![7u8; 3]);
        let bytes = package.serialize(false).unwrap();

        assert_eq!(&bytes[0..4], b"MPRD");
        assert_eq!(&bytes[4..8], [VERSION, 0, 0, 2]);

        let meta_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        assert_eq!(bytes.len(), 12 + meta_len + 3);
        assert_eq!(&bytes[12 + meta_len..], [7, 7, 7]);
    }
}
