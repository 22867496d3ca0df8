//! Jars, opened as directory-like handles.

use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexSet;
use log::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{DateTime, ZipArchive, ZipWriter};
use crate::entry::{check_entry_name, Entry, EntrySink, EntrySource};

/// An opened jar, navigable like a directory.
pub struct ArchiveDir<R> {
	name: String,
	zip: ZipArchive<R>,
}

impl<R> Debug for ArchiveDir<R> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ArchiveDir").field("name", &self.name).finish_non_exhaustive()
	}
}

impl ArchiveDir<BufReader<File>> {
	/// Opens the jar at `path`. Prefer [`with_archive`] if the jar is only needed for a while.
	pub fn open(path: impl AsRef<Path>) -> Result<ArchiveDir<BufReader<File>>> {
		let path = path.as_ref();
		let file = File::open(path)
			.with_context(|| anyhow!("could not open file {path:?}"))?;
		ArchiveDir::new(path.display().to_string(), BufReader::new(file))
	}
}

impl<R: Read + Seek> ArchiveDir<R> {
	/// Reads the central directory of the zip in `reader`. The `name` is only used for messages.
	pub fn new(name: impl Into<String>, reader: R) -> Result<ArchiveDir<R>> {
		let name = name.into();
		let zip = ZipArchive::new(reader)
			.with_context(|| anyhow!("failed to read zip archive from {name:?}"))?;
		debug!("opened {name:?} with {} entries", zip.len());
		Ok(ArchiveDir { name, zip })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The names of all entries, including directories, in the order of the central directory.
	pub fn names(&self) -> impl Iterator<Item=&str> {
		self.zip.file_names()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.names().any(|x| x == name)
	}

	/// Checks if `path` is a directory, either by having a directory entry, or by having entries inside it.
	///
	/// The empty path is the root, and always a directory.
	pub fn is_dir(&self, path: &str) -> bool {
		let path = path.trim_end_matches('/');
		if path.is_empty() {
			return true;
		}
		let prefix = format!("{path}/");
		self.names().any(|name| name.starts_with(&prefix))
	}

	/// Lists the direct children of the directory `path`. Directories end with a `/`.
	pub fn list(&self, path: &str) -> Vec<String> {
		let path = path.trim_end_matches('/');
		let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };

		let mut children = IndexSet::new();
		for name in self.names() {
			if let Some(rest) = name.strip_prefix(prefix.as_str()) {
				match rest.split_once('/') {
					Some((dir, _)) => children.insert(format!("{dir}/")),
					None if !rest.is_empty() => children.insert(rest.to_owned()),
					None => false,
				};
			}
		}
		children.into_iter().collect()
	}

	/// Reads the contents of the entry `name`, or returns `None` if there's no such entry.
	pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
		match self.zip.by_name(name) {
			Ok(mut file) => {
				let mut data = Vec::new();
				file.read_to_end(&mut data)
					.with_context(|| anyhow!("failed to read {name:?} from {:?}", self.name))?;
				Ok(Some(data))
			},
			Err(ZipError::FileNotFound) => Ok(None),
			Err(e) => Err(anyhow!("could not get file {name:?} from zip {:?}: {e}", self.name)),
		}
	}
}

impl<R: Read + Seek> EntrySource for ArchiveDir<R> {
	fn entries(&mut self) -> Result<Vec<Entry>> {
		let mut entries = Vec::with_capacity(self.zip.len());
		for index in 0..self.zip.len() {
			let mut file = self.zip.by_index(index)
				.with_context(|| anyhow!("failed to get entry {index} of {:?}", self.name))?;
			if file.is_dir() {
				continue;
			}

			let capacity = file.size().try_into().unwrap_or(0);
			let mut data = Vec::with_capacity(capacity);
			file.read_to_end(&mut data)
				.with_context(|| anyhow!("failed to read {:?} from {:?}", file.name(), self.name))?;
			entries.push(Entry::new(file.name(), data));
		}
		Ok(entries)
	}
}

/// Writes entries into a zip.
///
/// Parent directories are added automatically. All entries get the same timestamp, so that writing the
/// same entries twice gives the same bytes.
pub struct ZipSink<W: Write + Seek> {
	zip: ZipWriter<W>,
	directories: IndexSet<String>,
	files: IndexSet<String>,
}

impl<W: Write + Seek> ZipSink<W> {
	pub fn new(writer: W) -> ZipSink<W> {
		ZipSink {
			zip: ZipWriter::new(writer),
			directories: IndexSet::new(),
			files: IndexSet::new(),
		}
	}

	fn options() -> SimpleFileOptions {
		SimpleFileOptions::default().last_modified_time(DateTime::default())
	}

	/// The names of the files written so far, in order.
	pub fn written(&self) -> impl Iterator<Item=&str> {
		self.files.iter().map(String::as_str)
	}

	/// Writes the central directory, and returns the writer.
	pub fn finish(self) -> Result<W> {
		self.zip.finish().context("failed to finish writing zip")
	}
}

impl<W: Write + Seek> EntrySink for ZipSink<W> {
	fn put(&mut self, name: &str, data: &[u8]) -> Result<()> {
		check_entry_name(name)?;
		if self.files.contains(name) {
			bail!("entry {name:?} was already written");
		}

		let mut parents = Vec::new();
		let mut x = name;
		while let Some((left, _)) = x.rsplit_once('/') {
			parents.push(left);
			x = left;
		}
		for parent in parents.into_iter().rev() {
			if self.directories.insert(parent.to_owned()) {
				self.zip.add_directory(parent, Self::options())
					.with_context(|| anyhow!("failed to add directory {parent:?}"))?;
			}
		}

		self.zip.start_file(name, Self::options())
			.with_context(|| anyhow!("failed to start entry {name:?}"))?;
		self.zip.write_all(data)
			.with_context(|| anyhow!("failed to write entry {name:?}"))?;
		self.files.insert(name.to_owned());
		Ok(())
	}
}

/// Opens the jar at `path`, and runs `f` on it. The jar is closed afterward, also if `f` fails.
pub fn with_archive<T>(path: impl AsRef<Path>, f: impl FnOnce(&mut ArchiveDir<BufReader<File>>) -> Result<T>) -> Result<T> {
	let path = path.as_ref();
	let mut dir = ArchiveDir::open(path)?;
	let result = f(&mut dir);
	drop(dir);
	result.with_context(|| anyhow!("while working on archive {path:?}"))
}

/// Creates a jar at `path`, and runs `f` to fill it.
///
/// The jar is finished and synced to disk afterward, also if `f` fails. An error while finishing is
/// returned: if `f` succeeded, as is, and if `f` failed too, attached to the error of `f`.
pub fn with_output_archive<T>(path: impl AsRef<Path>, f: impl FnOnce(&mut ZipSink<BufWriter<File>>) -> Result<T>) -> Result<T> {
	let path = path.as_ref();
	let file = File::create(path)
		.with_context(|| anyhow!("could not create file {path:?}"))?;
	let mut sink = ZipSink::new(BufWriter::new(file));

	let result = f(&mut sink);

	let count = sink.files.len();
	let finished = sink.finish()
		.and_then(|writer| writer.into_inner().context("failed to flush"))
		.and_then(|file| file.sync_all().context("failed to sync"))
		.with_context(|| anyhow!("failed to finish archive {path:?}"));

	match (result, finished) {
		(Ok(value), Ok(())) => {
			info!("wrote {count} entries to {path:?}");
			Ok(value)
		},
		(Ok(_), Err(finish)) => Err(finish),
		(Err(e), Ok(())) => Err(e),
		(Err(e), Err(finish)) => Err(e.context(format!("additionally: {finish:#}"))),
	}
}
