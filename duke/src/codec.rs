//! The boundary to the binary class file format.
//!
//! Parsing and writing class files is left to an implementation of [`ClassCodec`]. This crate only
//! looks at the fixed header, which is enough to tell which class files need any work.

use anyhow::{bail, Result};
use crate::tree::class::ClassFile;
use crate::tree::version::Version;

/// What the writer should do with the `StackMapTable` attributes of the methods.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameComputation {
	/// Write the frames as they were read.
	Keep,
	/// Compute new frames, as new jumps were inserted.
	Recompute,
}

/// Reads and writes class files.
///
/// Implementations must be usable from multiple threads at once, as batches of classes are
/// processed in parallel.
pub trait ClassCodec: Sync {
	fn read(&self, bytes: &[u8]) -> Result<ClassFile>;

	/// Writes a class file, assigning bytecode offsets to all labels.
	fn write(&self, class: &ClassFile, frames: FrameComputation) -> Result<Vec<u8>>;
}

/// The fixed start of every class file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClassHeader {
	pub version: Version,
}

impl ClassHeader {
	pub const MAGIC: u32 = 0xCAFE_BABE;

	pub fn read(bytes: &[u8]) -> Result<ClassHeader> {
		let Some(header) = bytes.get(..8) else {
			bail!("class file is too short: only {} bytes", bytes.len())
		};

		let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
		if magic != Self::MAGIC {
			bail!("wrong magic: expected {:#x}, got {magic:#x}", Self::MAGIC);
		}

		let minor = u16::from_be_bytes([header[4], header[5]]);
		let major = u16::from_be_bytes([header[6], header[7]]);

		Ok(ClassHeader { version: Version::new(major, minor) })
	}
}
