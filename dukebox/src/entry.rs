use std::fmt::{Debug, Formatter};
use anyhow::Result;

/// A file of a jar or a directory, identified by its `/` separated path.
#[derive(Clone, PartialEq, Eq)]
pub struct Entry {
	pub name: String,
	pub data: Vec<u8>,
}

impl Entry {
	pub fn new(name: impl Into<String>, data: Vec<u8>) -> Entry {
		Entry { name: name.into(), data }
	}

	pub fn is_class(&self) -> bool {
		self.name.ends_with(".class")
	}
}

/// [`Debug`] only prints the name and the size, not the contents.
impl Debug for Entry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Entry")
			.field("name", &self.name)
			.field("size", &self.data.len())
			.finish()
	}
}

/// Something entries can be read from.
///
/// Directories aren't returned as entries. The order of the entries is deterministic.
pub trait EntrySource {
	fn entries(&mut self) -> Result<Vec<Entry>>;
}

/// Something entries can be written to.
pub trait EntrySink {
	fn put(&mut self, name: &str, data: &[u8]) -> Result<()>;
}

/// Hands out the entries, leaving the vector empty.
impl EntrySource for Vec<Entry> {
	fn entries(&mut self) -> Result<Vec<Entry>> {
		Ok(std::mem::take(self))
	}
}

impl EntrySink for Vec<Entry> {
	fn put(&mut self, name: &str, data: &[u8]) -> Result<()> {
		self.push(Entry::new(name, data.to_vec()));
		Ok(())
	}
}

/// Checks that a name can be used as a relative path, so that writing it doesn't escape the target.
pub(crate) fn check_entry_name(name: &str) -> Result<()> {
	if name.is_empty() || name.starts_with('/') || name.contains('\\') {
		anyhow::bail!("entry name {name:?} is not a relative `/` separated path");
	}
	if name.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
		anyhow::bail!("entry name {name:?} contains an empty, `.` or `..` part");
	}
	Ok(())
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::entry::{check_entry_name, Entry, EntrySink, EntrySource};

	#[test]
	fn vec_source_and_sink() {
		let mut sink: Vec<Entry> = Vec::new();
		sink.put("a/B.class", &[1, 2, 3]).unwrap();
		sink.put("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n").unwrap();

		let entries = sink.entries().unwrap();
		assert!(sink.is_empty());
		assert_eq!(entries.len(), 2);
		assert!(entries[0].is_class());
		assert!(!entries[1].is_class());
		assert_eq!(format!("{:?}", entries[0]), "Entry { name: \"a/B.class\", size: 3 }");
	}

	#[test]
	fn entry_names() {
		check_entry_name("a/B.class").unwrap();
		check_entry_name("module-info.class").unwrap();

		for name in ["", "/etc/passwd", "a/../../b", "a//b", "./a", "a\\b", "a/"] {
			assert!(check_entry_name(name).is_err(), "{name:?} must be rejected");
		}
	}
}
