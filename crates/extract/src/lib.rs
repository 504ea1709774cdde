mod consts;
pub mod error;
mod extractor;
pub mod models;
pub mod normalize;
pub mod tag;

use std::path::Path;

pub use crate::consts::{
    DEFAULT_ROOT_LABEL, MERGED_PREFIX, ONLYDESKTOP_PREFIX, ONLYMIC_PREFIX, SUPPORTED_EXTENSIONS, UNMERGABLE_PREFIX,
    UPLOADED_PREFIX,
};
use crate::error::Result;
pub use crate::extractor::Extractor;
pub use crate::tag::{Tag, Tagged, classify, is_supported};
use crate::models::{CollectionChain, MetadataRecord};

/// Easy, top-level entrypoint for deriving the [`MetadataRecord`] of a
/// recording below `root`.
///
/// The root's folder name doubles as the label for missing folder levels; use
/// [`Extractor::with_label`] to pick a different one.
pub fn extract(path: &Path, root: &Path) -> Result<MetadataRecord> {
    Extractor::new(root).metadata(path)
}

/// Collection names for a recording below `root`, nearest folder first.
pub fn collection_chain(path: &Path, root: &Path) -> Result<CollectionChain> {
    Extractor::new(root).chain(path)
}
