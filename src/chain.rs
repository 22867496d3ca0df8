//! The downgrading steps from java 13 down to java 8, and applying several of them in a row.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use duke::tree::class::ClassFile;
use duke::tree::version::Version;
use crate::hooks::strip_nest_privacy;
use crate::replacer::{CallKind, ReplacerRegistry};
use crate::result::DowngradeResult;
use crate::synth::{collections, io, misc, runtime, strings};
use crate::transformer::{DowngradingTransformer, TransformOptions};

/// The rules for downgrading from java 13 to java 12.
pub fn java13_to_java12() -> Result<DowngradingTransformer> {
	let mut r = ReplacerRegistry::new();

	for desc in [
		"(Ljava/nio/file/Path;)Ljava/nio/file/FileSystem;",
		"(Ljava/nio/file/Path;Ljava/util/Map;)Ljava/nio/file/FileSystem;",
		"(Ljava/nio/file/Path;Ljava/util/Map;Ljava/lang/ClassLoader;)Ljava/nio/file/FileSystem;",
	] {
		r.exact(CallKind::Static, "java/nio/file/FileSystems", "newFileSystem", desc, io::file_systems_new_file_system)?;
	}

	DowngradingTransformer::new(Version::V13, Version::V12, r)
}

/// Downgrading from java 12 to java 11 only needs the version to be lowered.
pub fn java12_to_java11() -> Result<DowngradingTransformer> {
	DowngradingTransformer::new(Version::V12, Version::V11, ReplacerRegistry::new())
}

/// The rules for downgrading from java 11 to java 10.
pub fn java11_to_java10() -> Result<DowngradingTransformer> {
	let mut r = ReplacerRegistry::new();

	r.exact(CallKind::Virtual, "java/lang/String", "isBlank", "()Z", strings::is_blank)?;
	r.exact(CallKind::Virtual, "java/lang/String", "strip", "()Ljava/lang/String;", strings::strip)?;
	r.exact(CallKind::Virtual, "java/lang/String", "stripLeading", "()Ljava/lang/String;", strings::strip_leading)?;
	r.exact(CallKind::Virtual, "java/lang/String", "stripTrailing", "()Ljava/lang/String;", strings::strip_trailing)?;

	r.any(CallKind::Static, "java/nio/file/Files", "readString", io::files_read_string)?;
	r.any(CallKind::Static, "java/nio/file/Path", "of", misc::path_of)?;

	for optional in ["java/util/Optional", "java/util/OptionalDouble", "java/util/OptionalInt", "java/util/OptionalLong"] {
		r.exact(CallKind::Virtual, optional, "isEmpty", "()Z", misc::optional_is_empty)?;
	}
	for collection in ["java/util/Collection", "java/util/List", "java/util/Set"] {
		r.exact(CallKind::Interface, collection, "toArray", "(Ljava/util/function/IntFunction;)[Ljava/lang/Object;", misc::collection_to_array)?;
	}
	r.exact(CallKind::Static, "java/lang/Character", "toString", "(I)Ljava/lang/String;", misc::character_to_string)?;

	r.exact(CallKind::Virtual, "java/util/zip/Inflater", "setInput", "(Ljava/nio/ByteBuffer;)V", io::inflater)?;
	r.exact(CallKind::Virtual, "java/util/zip/Inflater", "inflate", "(Ljava/nio/ByteBuffer;)I", io::inflater)?;
	r.exact(CallKind::Virtual, "java/util/zip/Deflater", "setInput", "(Ljava/nio/ByteBuffer;)V", io::deflater)?;
	r.exact(CallKind::Virtual, "java/util/zip/Deflater", "deflate", "(Ljava/nio/ByteBuffer;)I", io::deflater)?;
	r.exact(CallKind::Static, "java/io/OutputStream", "nullOutputStream", "()Ljava/io/OutputStream;", io::null_output_stream)?;

	Ok(DowngradingTransformer::new(Version::V11, Version::V10, r)?
		.with_hook(strip_nest_privacy))
}

/// Downgrading from java 10 to java 9 only needs the version to be lowered.
pub fn java10_to_java9() -> Result<DowngradingTransformer> {
	DowngradingTransformer::new(Version::V10, Version::V9, ReplacerRegistry::new())
}

/// The rules for downgrading from java 9 to java 8.
pub fn java9_to_java8() -> Result<DowngradingTransformer> {
	let mut r = ReplacerRegistry::new();

	r.any(CallKind::Static, "java/util/List", "of", collections::list_of)?;
	r.any(CallKind::Static, "java/util/Set", "of", collections::set_of)?;
	r.exact(CallKind::Static, "java/util/Map", "entry", "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/util/Map$Entry;", collections::map_entry)?;

	r.exact(CallKind::Virtual, "java/io/InputStream", "readAllBytes", "()[B", io::input_stream)?;
	r.exact(CallKind::Virtual, "java/io/InputStream", "transferTo", "(Ljava/io/OutputStream;)J", io::input_stream)?;

	r.exact(CallKind::Static, "java/lang/Runtime", "version", "()Ljava/lang/Runtime$Version;", runtime::runtime_version)?;
	r.any(CallKind::Static, "java/lang/Runtime$Version", "parse", runtime::version_method)?;
	for name in runtime::VERSION_METHODS {
		r.any(CallKind::Virtual, "java/lang/Runtime$Version", name, runtime::version_method)?;
	}

	Ok(DowngradingTransformer::new(Version::V9, Version::V1_8, r)?
		.with_hook(runtime::retarget_runtime_version))
}

/// A chain of [`DowngradingTransformer`]s, each one taking over where the one before stops.
#[derive(Debug)]
pub struct TransformerManager {
	/// Ordered from the highest source version down.
	steps: Vec<DowngradingTransformer>,
}

impl TransformerManager {
	/// The chain from java 13 down to java 8.
	pub fn new() -> Result<TransformerManager> {
		TransformerManager::with_steps(vec![
			java13_to_java12()?,
			java12_to_java11()?,
			java11_to_java10()?,
			java10_to_java9()?,
			java9_to_java8()?,
		])
	}

	/// Creates a chain from the given steps, which must be ordered from the highest source version down,
	/// with each step starting at the target of the one before.
	pub fn with_steps(steps: Vec<DowngradingTransformer>) -> Result<TransformerManager> {
		if steps.is_empty() {
			bail!("a transformer chain needs at least one step");
		}
		for pair in steps.windows(2) {
			if pair[0].target() != pair[1].source() {
				bail!("step to {} is followed by a step from {}, but steps must be contiguous", pair[0].target(), pair[1].source());
			}
		}
		Ok(TransformerManager { steps })
	}

	pub fn steps(&self) -> &[DowngradingTransformer] {
		&self.steps
	}

	/// The highest version classes can have to be downgraded.
	pub fn highest_source(&self) -> Version {
		self.steps.first().map_or(Version::V1_8, DowngradingTransformer::source)
	}

	/// The lowest version classes can be downgraded to.
	pub fn lowest_target(&self) -> Version {
		self.steps.last().map_or(Version::V1_8, DowngradingTransformer::target)
	}

	/// The steps needed to go from the highest source version down to `target`.
	pub fn steps_to(&self, target: Version) -> impl Iterator<Item=&DowngradingTransformer> + '_ {
		self.steps.iter().filter(move |step| step.target() >= target)
	}

	/// Downgrades `class` to `target`, by running every step between its version and `target`.
	///
	/// A class already at or below `target` is left untouched.
	pub fn transform(&self, class: &mut ClassFile, target: Version, options: &TransformOptions) -> Result<DowngradeResult> {
		let mut result = DowngradeResult::new(target);

		if class.version <= target {
			debug!("{} already has version {}, not downgrading it to {target}", class.name, class.version);
			return Ok(result);
		}
		if class.version > self.highest_source() {
			bail!("class {} has version {}, only classes up to {} can be downgraded", class.name, class.version, self.highest_source());
		}
		if target < self.lowest_target() {
			bail!("can't downgrade to {target}, the lowest supported target is {}", self.lowest_target());
		}

		let from = class.version;
		for step in self.steps_to(target) {
			if class.version > step.target() {
				step.transform(class, &mut result, options)
					.with_context(|| anyhow!("failed to downgrade class {} from {} to {}", class.name, step.source(), step.target()))?;
			}
		}

		info!("downgraded {} from {from} to {}, replacing {} call sites", class.name, class.version, result.replaced_call_sites);
		for diagnostic in &result.diagnostics {
			warn!("{}: {diagnostic}", class.name);
		}
		Ok(result)
	}
}
