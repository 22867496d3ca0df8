use anyhow::{anyhow, Context, Error, Result};
use duke::tree::class::{ClassFile, ClassName};
use duke::tree::descriptor::ParsedMethodDescriptor;
use duke::tree::method::code::LvIndex;
use duke::tree::method::{Method, MethodDescriptor};
use crate::replacer::InvocationSite;
use crate::result::DowngradeResult;

/// Hands out local variable slots for temporaries of replacement code.
///
/// Slots are never reused, so temporaries of different replacements in the same method can't alias each
/// other, or any local variable the method already has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAllocator {
	next: u16,
}

impl LocalAllocator {
	/// Creates an allocator handing out slots starting at `first_free`, which should be the `max_locals` of the method.
	pub fn new(first_free: u16) -> LocalAllocator {
		LocalAllocator { next: first_free }
	}

	/// Allocates `size` slots, `2` for a `long` or `double`, `1` otherwise.
	pub fn allocate(&mut self, size: u16) -> Result<LvIndex> {
		let index = self.next;
		self.next = index.checked_add(size)
			.with_context(|| anyhow!("can't allocate {size} more local variable slots after {index}"))?;
		Ok(LvIndex { index })
	}

	/// The `max_locals` needed to hold every slot allocated so far.
	pub fn max_locals(&self) -> u16 {
		self.next
	}
}

/// Everything a [`MethodCallReplacer`][crate::replacer::MethodCallReplacer] gets to see about the call
/// site it replaces.
///
/// While replacing, the code of [`ReplaceContext::method`] is taken out of the method, so
/// `method.code` is `None`.
#[derive(Debug)]
pub struct ReplaceContext<'a> {
	pub class: &'a ClassFile,
	pub method: &'a Method,
	pub site: &'a InvocationSite,
	locals: &'a mut LocalAllocator,
	result: &'a mut DowngradeResult,
	helpers: Vec<Method>,
}

impl<'a> ReplaceContext<'a> {
	pub fn new(
		class: &'a ClassFile,
		method: &'a Method,
		site: &'a InvocationSite,
		locals: &'a mut LocalAllocator,
		result: &'a mut DowngradeResult,
	) -> ReplaceContext<'a> {
		ReplaceContext { class, method, site, locals, result, helpers: Vec::new() }
	}

	/// The descriptor of the call site.
	pub fn descriptor(&self) -> &MethodDescriptor {
		self.site.descriptor()
	}

	pub fn parsed_descriptor(&self) -> Result<ParsedMethodDescriptor> {
		self.descriptor().parse()
	}

	/// Allocates a fresh local variable for a temporary, see [`LocalAllocator::allocate`].
	pub fn allocate_local(&mut self, size: u16) -> Result<LvIndex> {
		self.locals.allocate(size)
	}

	/// Records that the replacement references the shim class `shim`, which must be shipped with the class.
	pub fn add_dependency(&mut self, shim: ClassName) {
		self.result.dependencies.insert(shim);
	}

	/// Records that the replacement contains jumps, so the frames of the method must be computed again.
	pub fn require_frames(&mut self) {
		self.result.requires_frames = true;
	}

	/// Records something the replacement does differently than the replaced method, to be reported to the user.
	///
	/// The same message is only recorded once per class.
	pub fn diagnostic(&mut self, message: impl Into<String>) {
		let message = message.into();
		if !self.result.diagnostics.contains(&message) {
			self.result.diagnostics.push(message);
		}
	}

	/// Asks for the static method `helper` to be added to [`ReplaceContext::class`], so the replacement can call it.
	///
	/// Helpers are added once all call sites of the class are replaced, and only if the class doesn't have a
	/// method with the same name and descriptor yet.
	pub fn add_helper(&mut self, helper: Method) {
		self.helpers.push(helper);
	}

	/// Takes the helpers asked for with [`ReplaceContext::add_helper`].
	pub fn take_helpers(&mut self) -> Vec<Method> {
		std::mem::take(&mut self.helpers)
	}

	/// The error for a call site with a descriptor the replacer has no code for.
	pub fn unsupported(&self) -> Error {
		anyhow!("unsupported method descriptor {} for {}", self.descriptor(), self.site)
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::tree::method::code::LvIndex;
	use crate::context::LocalAllocator;

	#[test]
	fn allocate() {
		let mut locals = LocalAllocator::new(3);
		assert_eq!(locals.allocate(1).unwrap(), LvIndex { index: 3 });
		assert_eq!(locals.allocate(2).unwrap(), LvIndex { index: 4 });
		assert_eq!(locals.allocate(1).unwrap(), LvIndex { index: 6 });
		assert_eq!(locals.max_locals(), 7);

		let mut full = LocalAllocator::new(u16::MAX - 2);
		assert_eq!(full.allocate(1).unwrap(), LvIndex { index: u16::MAX - 2 });
		assert!(full.allocate(2).is_err());
	}
}
