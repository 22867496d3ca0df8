//! Looking up class files by their internal name.

use std::fmt::{Debug, Formatter};
use std::io::{Read, Seek};
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use duke::tree::class::ClassName;
use crate::archive::ArchiveDir;

/// Something class files can be looked up in.
pub trait ClassProvider {
	/// Returns the bytes of the class file for `name`, or `None` if this provider doesn't know that class.
	fn class_bytes(&mut self, name: &ClassName) -> Result<Option<Vec<u8>>>;

	/// Returns the names of the classes nested into `name`, like `a/B$C` and `a/B$C$D` for `a/B`.
	///
	/// This only looks at the names, so it also returns local and anonymous classes.
	fn nested_classes(&self, name: &ClassName) -> Result<Vec<ClassName>>;
}

/// Looks up classes in a jar, and then in a parent provider, if there's one.
pub struct ArchiveClassProvider<R> {
	dir: ArchiveDir<R>,
	parent: Option<Box<dyn ClassProvider + Send>>,
}

impl<R> Debug for ArchiveClassProvider<R> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ArchiveClassProvider")
			.field("dir", &self.dir)
			.field("has_parent", &self.parent.is_some())
			.finish()
	}
}

impl<R: Read + Seek> ArchiveClassProvider<R> {
	pub fn new(dir: ArchiveDir<R>) -> ArchiveClassProvider<R> {
		ArchiveClassProvider { dir, parent: None }
	}

	pub fn with_parent(dir: ArchiveDir<R>, parent: Box<dyn ClassProvider + Send>) -> ArchiveClassProvider<R> {
		ArchiveClassProvider { dir, parent: Some(parent) }
	}

	/// Gives back the jar, closing it once dropped.
	pub fn into_inner(self) -> ArchiveDir<R> {
		self.dir
	}
}

fn nested_in<'a>(names: impl Iterator<Item=&'a str>, name: &ClassName) -> Result<Vec<ClassName>> {
	let prefix = format!("{name}$");
	names
		.filter_map(|file| file.strip_suffix(".class"))
		.filter(|class| class.starts_with(&prefix))
		.map(ClassName::try_from)
		.collect()
}

impl<R: Read + Seek> ClassProvider for ArchiveClassProvider<R> {
	fn class_bytes(&mut self, name: &ClassName) -> Result<Option<Vec<u8>>> {
		let file = name.to_file_name();
		if let Some(bytes) = self.dir.read(&file)? {
			return Ok(Some(bytes));
		}
		match &mut self.parent {
			Some(parent) => parent.class_bytes(name)
				.with_context(|| anyhow!("in parent provider of {:?}", self.dir.name())),
			None => Ok(None),
		}
	}

	fn nested_classes(&self, name: &ClassName) -> Result<Vec<ClassName>> {
		let mut nested = nested_in(self.dir.names(), name)
			.with_context(|| anyhow!("invalid class file name in {:?}", self.dir.name()))?;
		if let Some(parent) = &self.parent {
			for class in parent.nested_classes(name)? {
				if !nested.contains(&class) {
					nested.push(class);
				}
			}
		}
		Ok(nested)
	}
}

/// Class files held in memory, keyed by their internal name.
#[derive(Debug, Clone, Default)]
pub struct MemClassProvider {
	classes: IndexMap<ClassName, Vec<u8>>,
}

impl MemClassProvider {
	pub fn new() -> MemClassProvider {
		MemClassProvider::default()
	}

	/// Adds a class, returning the bytes previously stored for that name.
	pub fn insert(&mut self, name: ClassName, bytes: Vec<u8>) -> Option<Vec<u8>> {
		self.classes.insert(name, bytes)
	}
}

impl ClassProvider for MemClassProvider {
	fn class_bytes(&mut self, name: &ClassName) -> Result<Option<Vec<u8>>> {
		Ok(self.classes.get(name).cloned())
	}

	fn nested_classes(&self, name: &ClassName) -> Result<Vec<ClassName>> {
		let prefix = format!("{name}$");
		Ok(self.classes.keys()
			.filter(|class| class.as_str().starts_with(&prefix))
			.cloned()
			.collect())
	}
}
