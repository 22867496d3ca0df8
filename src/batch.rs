//! Downgrading all classes of a jar or a directory at once.

use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexSet;
use log::{debug, info, warn};
use rayon::prelude::*;
use duke::codec::{ClassCodec, ClassHeader};
use duke::tree::class::ClassName;
use duke::tree::version::Version;
use dukebox::runtime::RuntimeSupport;
use dukebox::{Entry, EntrySink, EntrySource};
use crate::chain::TransformerManager;
use crate::result::DowngradeResult;
use crate::transformer::TransformOptions;

#[derive(Debug, Clone)]
pub struct BatchOptions {
	pub target: Version,
	/// Abort on the first class that fails to downgrade, instead of writing it through unchanged.
	pub strict: bool,
	/// Copy the shim classes the downgraded classes reference into the output.
	pub copy_shims: bool,
	pub transform: TransformOptions,
}

impl Default for BatchOptions {
	fn default() -> Self {
		BatchOptions {
			target: Version::V1_8,
			strict: false,
			copy_shims: true,
			transform: TransformOptions::default(),
		}
	}
}

/// What a batch did, entry names listed in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
	pub transformed: Vec<String>,
	/// Classes that didn't need any downgrading.
	pub unchanged: Vec<String>,
	/// Entries that aren't classes, copied as they are.
	pub resources: Vec<String>,
	/// Classes that failed to downgrade, with the error. Only filled if not strict.
	pub failed: Vec<(String, String)>,
	/// The entries written for shim classes.
	pub shims: Vec<String>,
	/// The shim classes referenced by all downgraded classes.
	pub dependencies: IndexSet<ClassName>,
}

/// Downgrades a single entry, returning `None` if it's not a class or doesn't need downgrading.
fn process(entry: &Entry, manager: &TransformerManager, codec: &dyn ClassCodec, options: &BatchOptions) -> Result<Option<(Vec<u8>, DowngradeResult)>> {
	if !entry.is_class() {
		return Ok(None);
	}

	let header = ClassHeader::read(&entry.data)?;
	if header.version <= options.target {
		return Ok(None);
	}

	let mut class = codec.read(&entry.data)?;
	let result = manager.transform(&mut class, options.target, &options.transform)?;
	let data = codec.write(&class, result.frames())?;
	Ok(Some((data, result)))
}

/// Runs a [`TransformerManager`] over every class of an [`EntrySource`].
#[derive(Debug)]
pub struct BatchRunner<'a> {
	manager: &'a TransformerManager,
	options: BatchOptions,
	runtime: Option<RuntimeSupport>,
}

impl<'a> BatchRunner<'a> {
	pub fn new(manager: &'a TransformerManager, options: BatchOptions) -> BatchRunner<'a> {
		BatchRunner { manager, options, runtime: None }
	}

	/// Sets where the shim classes are copied from.
	pub fn with_runtime_support(mut self, runtime: RuntimeSupport) -> BatchRunner<'a> {
		self.runtime = Some(runtime);
		self
	}

	pub fn options(&self) -> &BatchOptions {
		&self.options
	}

	/// Reads all entries from `source`, downgrades the classes in parallel, and writes everything into `sink`.
	///
	/// Entries are written in the order they're read in, followed by the shim classes. In strict mode
	/// nothing is written if any class fails.
	pub fn run(&mut self, source: &mut dyn EntrySource, sink: &mut dyn EntrySink, codec: &dyn ClassCodec) -> Result<BatchReport> {
		let entries = source.entries()?;
		debug!("downgrading {} entries to {}", entries.len(), self.options.target);

		let manager = self.manager;
		let options = &self.options;
		let outcomes: Vec<Result<Option<(Vec<u8>, DowngradeResult)>>> = entries
			.par_iter()
			.map(|entry| process(entry, manager, codec, options))
			.collect();

		if options.transform.cancel.as_ref().is_some_and(|flag| flag.is_cancelled()) {
			bail!("batch was cancelled");
		}

		if options.strict {
			if let Some((entry, Err(e))) = entries.iter().zip(&outcomes).find(|(_, outcome)| outcome.is_err()) {
				bail!("failed to downgrade {}: {e:#}", entry.name);
			}
		}

		let mut report = BatchReport::default();
		let mut written = IndexSet::new();
		for (entry, outcome) in entries.iter().zip(outcomes) {
			match outcome {
				Ok(Some((data, result))) => {
					sink.put(&entry.name, &data)?;
					report.dependencies.extend(result.dependencies);
					report.transformed.push(entry.name.clone());
				},
				Ok(None) => {
					sink.put(&entry.name, &entry.data)?;
					if entry.is_class() {
						report.unchanged.push(entry.name.clone());
					} else {
						report.resources.push(entry.name.clone());
					}
				},
				Err(e) => {
					warn!("failed to downgrade {}, writing it unchanged: {e:#}", entry.name);
					sink.put(&entry.name, &entry.data)?;
					report.failed.push((entry.name.clone(), format!("{e:#}")));
				},
			}
			written.insert(entry.name.clone());
		}

		if self.options.copy_shims {
			self.copy_shims(sink, &mut report, &mut written)?;
		}

		info!(
			"downgraded {} classes, {} unchanged, {} failed, {} resources and {} shim entries written",
			report.transformed.len(), report.unchanged.len(), report.failed.len(), report.resources.len(), report.shims.len(),
		);
		Ok(report)
	}

	fn copy_shims(&mut self, sink: &mut dyn EntrySink, report: &mut BatchReport, written: &mut IndexSet<String>) -> Result<()> {
		let dependencies: Vec<ClassName> = report.dependencies.iter().cloned().collect();
		for shim in &dependencies {
			let entries = match &mut self.runtime {
				Some(runtime) => runtime.resolve(shim)
					.with_context(|| anyhow!("failed to read shim {shim}"))?,
				None => None,
			};

			let Some(entries) = entries else {
				if self.options.strict {
					bail!("shim class {shim} is referenced, but not available");
				}
				warn!("shim class {shim} is referenced, but not available, the output won't run without it");
				continue;
			};

			for entry in entries {
				// a shim may already be in the input, or be nested in another shim
				if written.insert(entry.name.clone()) {
					sink.put(&entry.name, &entry.data)?;
					report.shims.push(entry.name);
				}
			}
		}
		Ok(())
	}
}
