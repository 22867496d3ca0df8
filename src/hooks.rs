//! Changes to whole classes, run before any call site is looked at.

use anyhow::Result;
use log::debug;
use duke::tree::class::ClassFile;
use crate::result::DowngradeResult;

/// A change to a whole class, made before any call sites of it are replaced.
pub trait ClassHook: Send + Sync {
	fn pre_transform(&self, class: &mut ClassFile, result: &mut DowngradeResult) -> Result<()>;
}

impl<F> ClassHook for F
where
	F: Fn(&mut ClassFile, &mut DowngradeResult) -> Result<()> + Send + Sync,
{
	fn pre_transform(&self, class: &mut ClassFile, result: &mut DowngradeResult) -> Result<()> {
		self(class, result)
	}
}

/// Removes the `NestHost` and `NestMembers` attributes, and makes all private members accessible from the package.
///
/// Before java 11, classes nested into each other can't access each others private members, so they
/// become package private. Private methods of interfaces become public, as package private interface
/// methods aren't allowed.
///
/// Classes without nest attributes are left alone.
pub fn strip_nest_privacy(class: &mut ClassFile, _result: &mut DowngradeResult) -> Result<()> {
	if !class.has_nest_attributes() {
		return Ok(());
	}

	let interface = class.access.is_interface;
	for method in &mut class.methods {
		if method.access.is_private {
			method.access.is_private = false;
			if interface {
				method.access.is_public = true;
			}
		}
	}
	for field in &mut class.fields {
		field.access.is_private = false;
	}

	class.nest_host_class = None;
	class.nest_members = None;

	debug!("removed nest attributes of {}", class.name);
	Ok(())
}
