//! Directory trees of class files, like the output directory of a compiler.

use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use walkdir::WalkDir;
use crate::entry::{check_entry_name, Entry, EntrySink, EntrySource};

/// Reads all files below a directory. Entry names are the paths relative to the directory, separated by `/`.
#[derive(Debug, Clone)]
pub struct DirSource {
	root: PathBuf,
}

impl DirSource {
	pub fn new(root: impl Into<PathBuf>) -> DirSource {
		DirSource { root: root.into() }
	}
}

fn entry_name(root: &Path, path: &Path) -> Result<String> {
	let relative = path.strip_prefix(root)
		.with_context(|| anyhow!("{path:?} is not inside of {root:?}"))?;

	let mut parts = Vec::new();
	for component in relative.components() {
		let part = component.as_os_str().to_str()
			.ok_or_else(|| anyhow!("path {path:?} is not valid unicode"))?;
		parts.push(part);
	}
	Ok(parts.join("/"))
}

impl EntrySource for DirSource {
	fn entries(&mut self) -> Result<Vec<Entry>> {
		WalkDir::new(&self.root)
			.sort_by_file_name() // make it deterministic
			.into_iter()
			.filter(|entry| entry.as_ref().map_or(true, |entry| entry.file_type().is_file()))
			.map(|entry| {
				let path = entry?.into_path();
				let data = std::fs::read(&path)
					.with_context(|| anyhow!("failed to read {path:?}"))?;
				Ok(Entry::new(entry_name(&self.root, &path)?, data))
			})
			.collect()
	}
}

/// Writes entries as files below a directory, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct DirSink {
	root: PathBuf,
}

impl DirSink {
	pub fn new(root: impl Into<PathBuf>) -> DirSink {
		DirSink { root: root.into() }
	}
}

impl EntrySink for DirSink {
	fn put(&mut self, name: &str, data: &[u8]) -> Result<()> {
		check_entry_name(name)?;

		let target = self.root.join(name);
		if let Some(parent) = target.parent() {
			std::fs::create_dir_all(parent)
				.with_context(|| anyhow!("failed to create parent directories for {target:?}"))?;
		}
		std::fs::write(&target, data)
			.with_context(|| anyhow!("failed to write {target:?}"))
	}
}
