//! Replacement sources for rewriting bundles and assets files.
//!
//! A rewrite is described by a [`ReplacerSet`]: an ordered map from a key
//! (an entry name for bundles, an object path id for assets files) to a
//! [`Replacer`] saying where the new bytes come from. Keys without a replacer
//! are copied from the original unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlepatch::edit::{Replacer, ReplacerSet};
//!
//! let mut replacers = ReplacerSet::new();
//! replacers.insert("CAB-1234".to_string(), Replacer::from_file("patched/CAB-1234")?)?;
//! replacers.insert("CAB-1234.resS".to_string(), Replacer::FromBuffer(vec![0; 16]))?;
//!
//! // A second replacer for the same entry is a contract violation.
//! assert!(replacers.insert("CAB-1234".to_string(), Replacer::CopyOriginal).is_err());
//! # Ok::<(), bundlepatch::Error>(())
//! ```

mod replacer;
mod set;

pub use replacer::{OriginalData, RegionSource, Replacer};
pub use set::ReplacerSet;
