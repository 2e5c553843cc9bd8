/*! Contains utilities for using molpred with NNEF.

If you're going to load NNEF files on a thread; consider using
`init_thread` when creating it - otherwise the first NNEF model will
cause a noticeable spike.
*/

use anyhow::Result;

use molpred_core::prelude::{
    BasicInferer, DynamicInferer, FixedBatchInferer, InfererBuilder, InfererProvider,
    MemoizingDynamicInferer,
};
use std::{
    ffi::OsStr,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
};
use tract_nnef::{framework::Nnef, prelude::*};

pub use tract_nnef;

thread_local!(
    /// We create and cache the NNEF on a per-thread basis. This is noticeably expensive to create, so we ensure it only has to happen once.
    static NNEF: Rc<Nnef> = Rc::new(tract_nnef::nnef().with_tract_core())
);

/// Initialize the thread-local NNEF instance.
///
/// To ensure fast loading molpred uses a thread-local instance of the
/// NNEF framework. If you don't want to pay for initialization on
/// first-time load you can call this earlier to ensure it's set up
/// ahead of time.
pub fn init_thread() {
    NNEF.with(|_| {})
}

/// Utility function to check if a file name is `.nnef.tar`.
pub fn is_nnef_tar(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(OsStr::to_str) {
        if ext != "tar" {
            return false;
        }

        let stem = match path.file_stem().and_then(OsStr::to_str).map(PathBuf::from) {
            Some(p) => p,
            None => return false,
        };

        if let Some(ext) = stem.extension().and_then(OsStr::to_str) {
            return ext == "nnef";
        }
    }

    false
}

fn model_for_reader(reader: &mut dyn Read) -> Result<TypedModel> {
    NNEF.with(|n| n.model_for_read(reader))
}

/// A reader for providing NNEF data.
pub struct NnefData<T: Read>(pub T);

impl<T> NnefData<T>
where
    T: Read,
{
    fn load(&mut self) -> Result<TypedModel> {
        model_for_reader(&mut self.0)
    }
}

impl<T> InfererProvider for NnefData<T>
where
    T: Read,
{
    /// Build a [`BasicInferer`].
    fn build_basic(mut self) -> Result<BasicInferer> {
        let model = self.load()?;
        BasicInferer::from_typed(model)
    }

    /// Build a [`FixedBatchInferer`].
    fn build_fixed(mut self, sizes: &[usize]) -> Result<FixedBatchInferer> {
        let model = self.load()?;
        FixedBatchInferer::from_typed(model, sizes)
    }

    /// Build a [`MemoizingDynamicInferer`].
    fn build_memoizing(mut self, preload_sizes: &[usize]) -> Result<MemoizingDynamicInferer> {
        let model = self.load()?;
        MemoizingDynamicInferer::from_typed(model, preload_sizes)
    }

    /// Build a [`DynamicInferer`].
    fn build_dynamic(mut self) -> Result<DynamicInferer> {
        let model = self.load()?;
        DynamicInferer::from_typed(model)
    }
}

/// Utility function for creating an [`InfererBuilder`] for [`NnefData`].
pub fn builder<T: Read>(read: T) -> InfererBuilder<NnefData<T>> {
    InfererBuilder::new(NnefData(read))
}

#[cfg(test)]
mod tests {
    use super::is_nnef_tar;
    use std::path::Path;

    #[test]
    fn recognizes_nnef_tar() {
        assert!(is_nnef_tar(Path::new("models/solubility.nnef.tar")));
        assert!(!is_nnef_tar(Path::new("models/solubility.tar")));
        assert!(!is_nnef_tar(Path::new("models/solubility.onnx")));
        assert!(!is_nnef_tar(Path::new("nnef.tar")));
    }
}
