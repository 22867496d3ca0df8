use indexmap::IndexSet;
use duke::codec::FrameComputation;
use duke::tree::class::ClassName;
use duke::tree::version::Version;

/// What happened while downgrading a single class.
#[derive(Debug, Clone, PartialEq)]
pub struct DowngradeResult {
	/// The version the class was downgraded to.
	pub target: Version,
	/// Set if new jumps were inserted, so the `StackMapTable`s must be computed again when writing.
	pub requires_frames: bool,
	/// The shim classes the downgraded class now references.
	pub dependencies: IndexSet<ClassName>,
	/// Messages about things that didn't stop the downgrade.
	pub diagnostics: Vec<String>,
	pub replaced_call_sites: usize,
}

impl DowngradeResult {
	pub fn new(target: Version) -> DowngradeResult {
		DowngradeResult {
			target,
			requires_frames: false,
			dependencies: IndexSet::new(),
			diagnostics: Vec::new(),
			replaced_call_sites: 0,
		}
	}

	pub fn frames(&self) -> FrameComputation {
		if self.requires_frames {
			FrameComputation::Recompute
		} else {
			FrameComputation::Keep
		}
	}
}
