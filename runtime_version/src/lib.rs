//! Java runtime version strings, like `11.0.2+9`, `17-ea+19` or `1.8.0_292-b10`.
//!
//! Downgraded programs can't use `Runtime.version()` on old runtimes, so they get this parser and
//! comparator instead. Parsing follows the format of `Runtime.Version`, and additionally accepts the
//! legacy format used up to java 8.
//!
//! ```
//! use runtime_version::Version;
//!
//! let eleven = Version::parse("11").unwrap();
//! let update = Version::parse("11.0.1").unwrap();
//! let early_access = Version::parse("17-ea+19").unwrap();
//!
//! assert!(eleven < update);
//! assert!(update < early_access);
//! assert_eq!(early_access.feature(), 17);
//! ```

mod current;
mod parse;

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use anyhow::{Error, Result};

pub use current::current;

/// A parsed runtime version.
///
/// The [`Ord`] implementation compares the version number, then the pre-release information, then the
/// build number, then the optional information. See [`Version::cmp_ignore_optional`] for leaving out
/// the last one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
	components: Vec<u32>,
	pre: Option<String>,
	build: Option<u32>,
	optional: Option<String>,
}

impl Version {
	/// Parses a version string.
	///
	/// Strings in the legacy format (`1.8.0_292-b10`) are accepted if they don't parse as a modern
	/// version string. The legacy format gets normalized: trailing zero components are removed, the part after the
	/// `_` becomes the build number and the part after the next `-` the optional information.
	pub fn parse(s: &str) -> Result<Version> {
		parse::parse(s)
	}

	/// The version number, like `[11, 0, 2]`. This is never empty.
	pub fn components(&self) -> &[u32] {
		&self.components
	}

	fn component(&self, index: usize) -> u32 {
		self.components.get(index).copied().unwrap_or(0)
	}

	pub fn feature(&self) -> u32 {
		self.component(0)
	}

	pub fn interim(&self) -> u32 {
		self.component(1)
	}

	pub fn update(&self) -> u32 {
		self.component(2)
	}

	pub fn patch(&self) -> u32 {
		self.component(3)
	}

	/// The same as [`Version::feature`].
	pub fn major(&self) -> u32 {
		self.feature()
	}

	/// The same as [`Version::interim`].
	pub fn minor(&self) -> u32 {
		self.interim()
	}

	/// The same as [`Version::update`].
	pub fn security(&self) -> u32 {
		self.update()
	}

	pub fn pre(&self) -> Option<&str> {
		self.pre.as_deref()
	}

	pub fn build(&self) -> Option<u32> {
		self.build
	}

	pub fn optional(&self) -> Option<&str> {
		self.optional.as_deref()
	}

	/// Compares two versions without looking at the optional information.
	pub fn cmp_ignore_optional(&self, other: &Version) -> Ordering {
		self.components.cmp(&other.components)
			.then_with(|| compare_pre(self.pre(), other.pre()))
			.then_with(|| self.build.cmp(&other.build))
	}

	/// Checks if two versions are equal, not looking at the optional information.
	pub fn eq_ignore_optional(&self, other: &Version) -> bool {
		self.components == other.components && self.pre == other.pre && self.build == other.build
	}
}

/// An absent pre-release sorts higher than any present one. Numeric ones sort lower than non-numeric
/// ones, and are compared by value.
fn compare_pre(a: Option<&str>, b: Option<&str>) -> Ordering {
	fn is_numeric(s: &str) -> bool {
		!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
	}
	fn compare_numeric(a: &str, b: &str) -> Ordering {
		let a = a.trim_start_matches('0');
		let b = b.trim_start_matches('0');
		a.len().cmp(&b.len()).then_with(|| a.cmp(b))
	}

	match (a, b) {
		(None, None) => Ordering::Equal,
		(None, Some(_)) => Ordering::Greater,
		(Some(_), None) => Ordering::Less,
		(Some(a), Some(b)) => match (is_numeric(a), is_numeric(b)) {
			(true, true) => compare_numeric(a, b),
			(true, false) => Ordering::Less,
			(false, true) => Ordering::Greater,
			(false, false) => compare_utf16(a, b),
		},
	}
}

/// Compares like `String.compareTo` does, on UTF-16 code units.
fn compare_utf16(a: &str, b: &str) -> Ordering {
	a.encode_utf16().cmp(b.encode_utf16())
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		self.cmp_ignore_optional(other)
			.then_with(|| match (&self.optional, &other.optional) {
				(None, None) => Ordering::Equal,
				(None, Some(_)) => Ordering::Less,
				(Some(_), None) => Ordering::Greater,
				(Some(a), Some(b)) => compare_utf16(a, b),
			})
			// numeric pre-releases like `01` and `1` compare equal by value, keep the order total
			.then_with(|| self.pre.cmp(&other.pre))
	}
}

/// Writes the version in the format it was parsed from. Legacy versions are written in the modern format.
impl Display for Version {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let mut first = true;
		for component in &self.components {
			if !first {
				f.write_str(".")?;
			}
			first = false;
			write!(f, "{component}")?;
		}

		if let Some(pre) = &self.pre {
			write!(f, "-{pre}")?;
		}

		if let Some(build) = self.build {
			write!(f, "+{build}")?;
			if let Some(optional) = &self.optional {
				write!(f, "-{optional}")?;
			}
		} else if let Some(optional) = &self.optional {
			let separator = if self.pre.is_some() { "-" } else { "+-" };
			write!(f, "{separator}{optional}")?;
		}
		Ok(())
	}
}

impl FromStr for Version {
	type Err = Error;

	fn from_str(s: &str) -> Result<Version> {
		Version::parse(s)
	}
}
