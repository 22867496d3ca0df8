use anyhow::{anyhow, bail, Context, Result};
use crate::Version;

// The grammar for version strings is:
//   Version:
//     Number ["-" Pre] ["+" [Build]] ["-" Optional]
//
//   Number:
//     [1-9][0-9]* ( ("." "0")* "." [1-9][0-9]* )*
//   Pre:
//     [a-zA-Z0-9]+
//   Build:
//     "0" | [1-9][0-9]*
//   Optional:
//     [-a-zA-Z0-9.]+
//
// with these extra rules:
// - a "+" must be followed by a build, or by an optional without a pre,
// - an optional without a build needs either a pre or a "+".
pub(crate) fn parse(s: &str) -> Result<Version> {
	match parse_modern(s) {
		Ok(version) => Ok(version),
		Err(e) if s.starts_with("1.8") && s.contains('_') => {
			parse_legacy(s)
				.with_context(|| anyhow!("invalid version string {s:?}, not in the legacy format, and not in the modern one: {e:#}"))
		},
		Err(e) => Err(e),
	}
}

/// Parses a version number, which must fit into a java `int`.
fn parse_number(s: &str) -> Result<u32> {
	let number: i32 = s.parse().with_context(|| anyhow!("number {s:?} doesn't fit into an int"))?;
	u32::try_from(number).with_context(|| anyhow!("number {s:?} is negative"))
}

fn parse_modern(s: &str) -> Result<Version> {
	if s.is_empty() {
		bail!("empty version string");
	}

	let number_end = s.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(s.len());
	let (number, rest) = s.split_at(number_end);

	let components = parse_components(number)
		.with_context(|| anyhow!("invalid version string {s:?}"))?;

	let mut version = Version { components, pre: None, build: None, optional: None };
	if rest.is_empty() {
		return Ok(version);
	}

	let mut rest = rest;
	if let Some(after_dash) = rest.strip_prefix('-') {
		let pre_end = after_dash.find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(after_dash.len());
		if pre_end > 0 {
			let (pre, after) = after_dash.split_at(pre_end);
			version.pre = Some(pre.to_owned());
			rest = after;
		}
	}

	let mut plus = false;
	if let Some(after_plus) = rest.strip_prefix('+') {
		plus = true;
		let build_end = if after_plus.starts_with('0') {
			1
		} else {
			after_plus.find(|c: char| !c.is_ascii_digit()).unwrap_or(after_plus.len())
		};
		let (build, after) = after_plus.split_at(build_end);
		if !build.is_empty() {
			version.build = Some(parse_number(build).with_context(|| anyhow!("invalid build number in {s:?}"))?);
		}
		rest = after;
	}

	if let Some(optional) = rest.strip_prefix('-') {
		if optional.is_empty() || !optional.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
			bail!("invalid version string {s:?}: optional information {optional:?} must consist of letters, digits, `-` and `.`");
		}
		version.optional = Some(optional.to_owned());
	} else if !rest.is_empty() {
		bail!("invalid version string {s:?}: unexpected {rest:?}");
	}

	if version.build.is_none() {
		if plus {
			if version.optional.is_none() {
				bail!("invalid version string {s:?}: `+` found with neither build nor optional information");
			}
			if version.pre.is_some() {
				bail!("invalid version string {s:?}: `+` found with pre-release and optional information, but no build");
			}
		} else if version.optional.is_some() && version.pre.is_none() {
			bail!("invalid version string {s:?}: optional information must be preceded by a pre-release or `+`");
		}
	}

	Ok(version)
}

/// Parses `11.0.2`. Components may not have leading zeros, and only the first one may not be zero, as well
/// as the last one if there's more than one.
fn parse_components(number: &str) -> Result<Vec<u32>> {
	let parts: Vec<&str> = number.split('.').collect();

	let mut components = Vec::with_capacity(parts.len());
	for (index, part) in parts.iter().enumerate() {
		if part.is_empty() {
			bail!("version number {number:?} has an empty component");
		}
		let zero = *part == "0";
		if part.starts_with('0') && !zero {
			bail!("component {part:?} of version number {number:?} has a leading zero");
		}
		if zero && index == 0 {
			bail!("version number {number:?} must not start with zero");
		}
		if zero && index == parts.len() - 1 {
			bail!("version number {number:?} must not end with zero");
		}
		components.push(parse_number(part)?);
	}
	Ok(components)
}

/// Parses `1.8.0_292-b10`.
fn parse_legacy(s: &str) -> Result<Version> {
	let (number, after) = s.split_once('_')
		.ok_or_else(|| anyhow!("legacy version string {s:?} has no `_`"))?;
	let (build, optional) = match after.split_once('-') {
		Some((build, optional)) => (build, Some(optional.to_owned())),
		None => (after, None),
	};

	let mut components = number.split('.')
		.map(|part| {
			if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
				bail!("invalid component {part:?} in legacy version number {number:?}");
			}
			parse_number(part)
		})
		.collect::<Result<Vec<u32>>>()?;
	while components.len() > 1 && components.last() == Some(&0) {
		components.pop();
	}

	if build.is_empty() || !build.bytes().all(|b| b.is_ascii_digit()) {
		bail!("invalid build number {build:?} in legacy version string {s:?}");
	}
	let build = parse_number(build)?;

	Ok(Version { components, pre: None, build: Some(build), optional })
}
