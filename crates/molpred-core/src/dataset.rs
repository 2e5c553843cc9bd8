// Copyright © 2026, The Molpred Authors, all rights reserved.
// Created: 14 October 2026

/*!
Molecule datasets and the featurization seam.

Turning a SMILES string into model inputs is left to the caller through
[`Featurizer`]. The crate only ships [`PrecomputedFeatures`], a lookup over
features computed elsewhere.
*/

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read},
};

/// A single molecule to predict on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeDatapoint {
    pub smiles: String,
}

impl MoleculeDatapoint {
    pub fn new(smiles: impl Into<String>) -> Self {
        Self {
            smiles: smiles.into(),
        }
    }
}

/// An ordered collection of molecules.
#[derive(Debug, Clone, Default)]
pub struct MoleculeDataset {
    data: Vec<MoleculeDatapoint>,
}

impl MoleculeDataset {
    pub fn new(data: Vec<MoleculeDatapoint>) -> Self {
        Self { data }
    }

    /// Build a dataset with one datapoint per string, preserving order.
    pub fn from_smiles<I, S>(smis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(smis.into_iter().map(MoleculeDatapoint::new).collect())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MoleculeDatapoint> + '_ {
        self.data.iter()
    }

    /// The datapoints in `range`.
    pub fn slice(&self, range: std::ops::Range<usize>) -> &[MoleculeDatapoint] {
        &self.data[range]
    }

    pub fn smiles(&self) -> impl Iterator<Item = &str> + '_ {
        self.data.iter().map(|point| point.smiles.as_str())
    }
}

/// Produces model inputs for a molecule.
///
/// `out` is the storage for one molecule in input `slot` and always has
/// exactly the per-molecule element count of that input. Featurizers are
/// shared across loader workers, hence the `Sync` bound.
pub trait Featurizer: Sync {
    fn featurize(&self, smiles: &str, slot: &str, out: &mut [f32]) -> Result<()>;
}

impl<F> Featurizer for F
where
    F: Fn(&str, &str, &mut [f32]) -> Result<()> + Sync,
{
    fn featurize(&self, smiles: &str, slot: &str, out: &mut [f32]) -> Result<()> {
        self(smiles, slot, out)
    }
}

#[derive(Deserialize)]
struct FeatureRecord {
    smiles: String,
    features: HashMap<String, Vec<f32>>,
}

/// A featurizer backed by features computed ahead of time.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedFeatures {
    features: HashMap<String, HashMap<String, Vec<f32>>>,
}

impl PrecomputedFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the features of `smiles` for input `slot`.
    pub fn insert(&mut self, smiles: impl Into<String>, slot: impl Into<String>, data: Vec<f32>) {
        self.features
            .entry(smiles.into())
            .or_default()
            .insert(slot.into(), data);
    }

    /// Load features from JSON lines of the form
    /// `{"smiles": "CCO", "features": {"fingerprint": [0.0, 1.0]}}`.
    ///
    /// Blank lines are skipped. A later record for the same SMILES
    /// replaces the slots it names.
    pub fn from_json_lines(reader: impl Read) -> Result<Self> {
        let mut this = Self::new();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: FeatureRecord = serde_json::from_str(&line)
                .with_context(|| format!("invalid feature record on line {}", line_no + 1))?;

            for (slot, data) in record.features {
                this.insert(record.smiles.clone(), slot, data);
            }
        }

        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Featurizer for PrecomputedFeatures {
    fn featurize(&self, smiles: &str, slot: &str, out: &mut [f32]) -> Result<()> {
        let slots = match self.features.get(smiles) {
            Some(slots) => slots,
            None => bail!("no precomputed features"),
        };

        let data = slots
            .get(slot)
            .with_context(|| format!("no precomputed features for input {:?}", slot))?;

        if data.len() != out.len() {
            bail!(
                "input {:?} expects {} values per molecule but {} were precomputed",
                slot,
                out.len(),
                data.len()
            );
        }

        out.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_keeps_order() {
        let dataset = MoleculeDataset::from_smiles(["CCO", "C", "c1ccccc1"]);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.smiles().collect::<Vec<_>>(), ["CCO", "C", "c1ccccc1"]);
        assert_eq!(dataset.slice(1..3)[0].smiles, "C");
    }

    #[test]
    fn loads_json_lines() {
        let text = r#"{"smiles": "CCO", "features": {"fp": [1.0, 0.0]}}

{"smiles": "C", "features": {"fp": [0.0, 1.0], "extra": [3.0]}}
"#;
        let features = PrecomputedFeatures::from_json_lines(text.as_bytes()).unwrap();
        assert_eq!(features.len(), 2);

        let mut out = [0.0; 2];
        features.featurize("C", "fp", &mut out).unwrap();
        assert_eq!(out, [0.0, 1.0]);

        let mut out = [0.0; 1];
        features.featurize("C", "extra", &mut out).unwrap();
        assert_eq!(out, [3.0]);
    }

    #[test]
    fn reports_bad_line() {
        let text = "{\"smiles\": \"CCO\", \"features\": {}}\nnot json\n";
        let err = PrecomputedFeatures::from_json_lines(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
    }

    #[test]
    fn rejects_missing_and_mismatched() {
        let mut features = PrecomputedFeatures::new();
        features.insert("CCO", "fp", vec![1.0, 2.0]);

        let mut out = [0.0; 2];
        assert!(features.featurize("CC", "fp", &mut out).is_err());
        assert!(features.featurize("CCO", "graph", &mut out).is_err());

        let mut short = [0.0; 3];
        assert!(features.featurize("CCO", "fp", &mut short).is_err());
    }

    #[test]
    fn closures_are_featurizers() {
        let featurizer = |smiles: &str, _slot: &str, out: &mut [f32]| -> Result<()> {
            out.fill(smiles.len() as f32);
            Ok(())
        };

        let mut out = [0.0; 3];
        featurizer.featurize("CCO", "fp", &mut out).unwrap();
        assert_eq!(out, [3.0, 3.0, 3.0]);
    }
}
