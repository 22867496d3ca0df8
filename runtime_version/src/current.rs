use std::sync::OnceLock;
use anyhow::{anyhow, Context, Result};
use log::debug;
use crate::Version;

static CURRENT: OnceLock<Version> = OnceLock::new();

const VARIABLES: [&str; 2] = ["JAVA_RUNTIME_VERSION", "JAVA_VERSION"];

/// Returns the version of the runtime this process belongs to.
///
/// The version is taken from the `JAVA_RUNTIME_VERSION` environment variable, or from `JAVA_VERSION` if
/// that one isn't set. It's computed once, and then reused. Failures aren't remembered, a later call tries again.
pub fn current() -> Result<&'static Version> {
	if let Some(version) = CURRENT.get() {
		return Ok(version);
	}

	let version = detect(|name| std::env::var(name).ok())?;
	// two threads may both get here, they computed the same value
	Ok(CURRENT.get_or_init(|| version))
}

fn detect(lookup: impl Fn(&str) -> Option<String>) -> Result<Version> {
	let (variable, value) = VARIABLES.iter()
		.find_map(|&name| lookup(name).map(|value| (name, value)))
		.ok_or_else(|| anyhow!("cannot determine the runtime version, none of {VARIABLES:?} is set"))?;

	debug!("runtime version from {variable}: {value:?}");

	Version::parse(&value)
		.with_context(|| anyhow!("failed to parse the runtime version from {variable}"))
}
