use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use anyhow::{bail, Result};

/// Represents a class file version.
///
/// Use the associated constants (like [`Version::V1_1`]) if you want that version.
///
/// Take a look at [the list of class file versions](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.1-200-B.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
	pub major: u16,
	pub minor: u16,
}

impl Version {
	pub const V1_1: Version = Version::new(45, 3);
	pub const V1_2: Version = Version::new(46, 0);
	pub const V1_3: Version = Version::new(47, 0);
	pub const V1_4: Version = Version::new(48, 0);
	pub const V1_5: Version = Version::new(49, 0);
	pub const V1_6: Version = Version::new(50, 0);
	pub const V1_7: Version = Version::new(51, 0);
	pub const V1_8: Version = Version::new(52, 0);
	pub const V9: Version = Version::new(53, 0);
	pub const V10: Version = Version::new(54, 0);
	pub const V11: Version = Version::new(55, 0);
	pub const V12: Version = Version::new(56, 0);
	pub const V13: Version = Version::new(57, 0);
	pub const V14: Version = Version::new(58, 0);
	pub const V15: Version = Version::new(59, 0);
	pub const V16: Version = Version::new(60, 0);
	pub const V17: Version = Version::new(61, 0);
	pub const V18: Version = Version::new(62, 0);
	pub const V19: Version = Version::new(63, 0);
	pub const V20: Version = Version::new(64, 0);
	pub const V21: Version = Version::new(65, 0);
	pub const V22: Version = Version::new(66, 0);
	pub const V23: Version = Version::new(67, 0);

	pub const fn new(major: u16, minor: u16) -> Version {
		Version { major, minor }
	}

	/// Maps a java release number (`8`, `11`, ...) to the class file version it compiles to.
	///
	/// Release `1` to `4` aren't accepted, there's no use in targeting them.
	pub fn from_release(release: u16) -> Result<Version> {
		match release {
			5..=23 => Ok(Version::new(44 + release, 0)),
			_ => bail!("unsupported java release {release}, expected something between 5 and 23"),
		}
	}

	/// The java release number this class file version belongs to, like `8` for `52.0`.
	pub fn release(&self) -> Option<u16> {
		self.major.checked_sub(44).filter(|&x| x >= 1)
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		self.major.cmp(&other.major)
			.then_with(|| self.minor.cmp(&other.minor))
	}
}

/// Writes the version as `major.minor`, followed by the java release, like `55.0 (java 11)`.
impl Display for Version {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}", self.major, self.minor)?;
		match self.release() {
			Some(release) if release <= 4 => write!(f, " (java 1.{release})"),
			Some(release) => write!(f, " (java {release})"),
			None => Ok(()),
		}
	}
}
