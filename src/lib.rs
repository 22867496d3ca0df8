//! Downgrades java class files, so that code compiled for a newer java runs on an older one.
//!
//! Calls to methods the older java doesn't have are replaced with code doing the same thing using only
//! what's available there, sometimes with the help of shim classes that need to be shipped with the
//! downgraded code.
//!
//! The replacements of one step down (like from java 11 to java 10) are collected in a
//! [`ReplacerRegistry`], which a [`DowngradingTransformer`] applies to every call site of a class.
//! A [`TransformerManager`] chains the steps together:
//! ```
//! use duke::tree::class::{ClassAccess, ClassFile, ClassName};
//! use duke::tree::version::Version;
//! use dukedown::TransformerManager;
//!
//! let manager = TransformerManager::new().unwrap();
//! let class = ClassFile::new(Version::V13, ClassAccess::from(0x0021), ClassName::from_static("a/Main"), Some(ClassName::JAVA_LANG_OBJECT), Vec::new());
//!
//! let (class, result) = dukedown::transform(class, Version::V1_8, &manager).unwrap();
//! assert_eq!(class.version, Version::V1_8);
//! assert!(!result.requires_frames);
//! ```

pub mod batch;
pub mod chain;
pub mod context;
pub mod hooks;
pub mod replacer;
pub mod result;
pub mod synth;
pub mod transformer;

use anyhow::Result;
use duke::tree::class::ClassFile;
use duke::tree::version::Version;

pub use batch::{BatchOptions, BatchReport, BatchRunner};
pub use chain::TransformerManager;
pub use context::ReplaceContext;
pub use replacer::{CallKind, InvocationSite, MethodCallReplacer, ReplacerRegistry};
pub use result::DowngradeResult;
pub use transformer::{CancelFlag, DowngradingTransformer, TransformOptions};

/// Downgrades `class` to `target` with the default [`TransformOptions`].
///
/// The returned class is the same as the given one if it's already at or below `target`.
pub fn transform(mut class: ClassFile, target: Version, manager: &TransformerManager) -> Result<(ClassFile, DowngradeResult)> {
	let result = manager.transform(&mut class, target, &TransformOptions::default())?;
	Ok((class, result))
}
