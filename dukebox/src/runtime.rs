//! The support classes downgraded code may call into.
//!
//! A downgrade can replace a call with a call into a shim class, like `dukedown/runtime/java/lang/Runtime`.
//! Those classes need to be shipped together with the downgraded code, so they're copied from here into
//! the output.

use anyhow::{anyhow, Context, Result};
use log::debug;
use duke::tree::class::ClassName;
use crate::entry::Entry;
use crate::provider::ClassProvider;

/// The set of shim classes available for copying.
pub struct RuntimeSupport {
	provider: Box<dyn ClassProvider + Send>,
}

impl std::fmt::Debug for RuntimeSupport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RuntimeSupport").finish_non_exhaustive()
	}
}

impl RuntimeSupport {
	pub fn new(provider: Box<dyn ClassProvider + Send>) -> RuntimeSupport {
		RuntimeSupport { provider }
	}

	/// Returns the entries to copy for the shim class `shim`: the class itself, and all classes nested into it.
	///
	/// Returns `None` if the shim class isn't available.
	pub fn resolve(&mut self, shim: &ClassName) -> Result<Option<Vec<Entry>>> {
		let Some(bytes) = self.provider.class_bytes(shim)? else {
			return Ok(None);
		};

		let mut entries = vec![Entry::new(shim.to_file_name(), bytes)];
		for nested in self.provider.nested_classes(shim)? {
			let bytes = self.provider.class_bytes(&nested)?
				.with_context(|| anyhow!("nested class {nested} of shim {shim} is listed, but can't be read"))?;
			entries.push(Entry::new(nested.to_file_name(), bytes));
		}
		debug!("resolved shim {shim} to {} entries", entries.len());
		Ok(Some(entries))
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::tree::class::ClassName;
	use crate::entry::Entry;
	use crate::provider::MemClassProvider;
	use crate::runtime::RuntimeSupport;

	#[test]
	fn resolve() {
		let mut provider = MemClassProvider::new();
		provider.insert(ClassName::from_static("dukedown/runtime/java/lang/Runtime"), vec![1]);
		provider.insert(ClassName::from_static("dukedown/runtime/java/lang/Runtime$Version"), vec![2]);
		provider.insert(ClassName::from_static("dukedown/runtime/java/io/NullOutputStream"), vec![3]);

		let mut support = RuntimeSupport::new(Box::new(provider));

		let entries = support.resolve(&ClassName::from_static("dukedown/runtime/java/lang/Runtime")).unwrap();
		assert_eq!(entries, Some(vec![
			Entry::new("dukedown/runtime/java/lang/Runtime.class", vec![1]),
			Entry::new("dukedown/runtime/java/lang/Runtime$Version.class", vec![2]),
		]));

		assert_eq!(support.resolve(&ClassName::from_static("dukedown/runtime/Missing")).unwrap(), None);
	}
}
