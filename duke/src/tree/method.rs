pub mod code;

use std::fmt::{Debug, Display, Formatter};
use anyhow::{bail, Result};
use crate::macros::make_name;
use crate::tree::attribute::Attribute;
use crate::tree::class::ClassName;
use crate::tree::descriptor::ParsedMethodDescriptor;
use crate::tree::method::code::Code;

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
	pub access: MethodAccess,
	pub name: MethodName,
	pub descriptor: MethodDescriptor,

	pub code: Option<Code>,
	pub exceptions: Option<Vec<ClassName>>,

	pub attributes: Vec<Attribute>,
}

impl Method {
	pub fn new(access: MethodAccess, name: MethodName, descriptor: MethodDescriptor) -> Method {
		Method {
			access,
			name,
			descriptor,

			code: None,
			exceptions: None,

			attributes: Vec::new(),
		}
	}

	/// The number of local variable slots the parameters (and the `this` reference of an instance method) take.
	pub fn argument_slots(&self) -> Result<u16> {
		let parsed = self.descriptor.parse()?;
		let this = if self.access.is_static { 0 } else { 1 };
		Ok(this + parsed.parameter_slots())
	}
}

#[derive(Copy, Clone, Default, Hash, Eq, PartialEq)]
pub struct MethodAccess {
	pub is_public: bool,
	pub is_private: bool,
	pub is_protected: bool,
	pub is_static: bool,
	pub is_final: bool,
	pub is_synchronized: bool,
	pub is_bridge: bool,
	pub is_varargs: bool,
	pub is_native: bool,
	pub is_abstract: bool,
	pub is_strict: bool,
	pub is_synthetic: bool,
}

impl Debug for MethodAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("MethodAccess { ")?;
		if self.is_public       { f.write_str("public ")?; }
		if self.is_private      { f.write_str("private ")?; }
		if self.is_protected    { f.write_str("protected ")?; }
		if self.is_static       { f.write_str("static ")?; }
		if self.is_final        { f.write_str("final ")?; }
		if self.is_synchronized { f.write_str("synchronized ")?; }
		if self.is_bridge       { f.write_str("bridge ")?; }
		if self.is_varargs      { f.write_str("varargs ")?; }
		if self.is_native       { f.write_str("native ")?; }
		if self.is_abstract     { f.write_str("abstract ")?; }
		if self.is_strict       { f.write_str("strict ")?; }
		if self.is_synthetic    { f.write_str("synthetic ")?; }
		f.write_str("}")
	}
}

impl From<u16> for MethodAccess {
	fn from(value: u16) -> Self {
		MethodAccess {
			is_public:       value & 0x0001 != 0,
			is_private:      value & 0x0002 != 0,
			is_protected:    value & 0x0004 != 0,
			is_static:       value & 0x0008 != 0,
			is_final:        value & 0x0010 != 0,
			is_synchronized: value & 0x0020 != 0,
			is_bridge:       value & 0x0040 != 0,
			is_varargs:      value & 0x0080 != 0,
			is_native:       value & 0x0100 != 0,
			is_abstract:     value & 0x0400 != 0,
			is_strict:       value & 0x0800 != 0,
			is_synthetic:    value & 0x1000 != 0,
		}
	}
}

impl From<MethodAccess> for u16 {
	fn from(value: MethodAccess) -> Self {
		(if value.is_public       { 0x0001 } else { 0 }) |
		(if value.is_private      { 0x0002 } else { 0 }) |
		(if value.is_protected    { 0x0004 } else { 0 }) |
		(if value.is_static       { 0x0008 } else { 0 }) |
		(if value.is_final        { 0x0010 } else { 0 }) |
		(if value.is_synchronized { 0x0020 } else { 0 }) |
		(if value.is_bridge       { 0x0040 } else { 0 }) |
		(if value.is_varargs      { 0x0080 } else { 0 }) |
		(if value.is_native       { 0x0100 } else { 0 }) |
		(if value.is_abstract     { 0x0400 } else { 0 }) |
		(if value.is_strict       { 0x0800 } else { 0 }) |
		(if value.is_synthetic    { 0x1000 } else { 0 })
	}
}

/// A reference to a method, as used by the `invoke*` instructions.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MethodRef {
	pub class: ClassName,
	pub name: MethodName,
	pub desc: MethodDescriptor,
}

impl MethodRef {
	pub const fn from_static(class: &'static str, name: &'static str, desc: &'static str) -> MethodRef {
		MethodRef {
			class: ClassName::from_static(class),
			name: MethodName::from_static(name),
			desc: MethodDescriptor::from_static(desc),
		}
	}
}

impl Display for MethodRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}{}", self.class, self.name, self.desc)
	}
}

make_name!(
	pub MethodName;
	is_valid(s) = if crate::tree::names::is_valid_method_name(s) {
		Ok(())
	} else {
		bail!("invalid method name: must be either `<init>`, `<clinit>` or non-empty and not contain any of `.`, `;`, `[`, `/`, `<` and `>`")
	};
);

impl MethodName {
	pub const INIT: MethodName = MethodName::from_static("<init>");
	pub const CLINIT: MethodName = MethodName::from_static("<clinit>");
}

make_name!(
	/// A method descriptor, like `(Ljava/nio/file/Path;)Ljava/lang/String;`.
	pub MethodDescriptor;
	is_valid(s) = ParsedMethodDescriptor::parse(s).map(|_| ());
);

impl MethodDescriptor {
	pub fn parse(&self) -> Result<ParsedMethodDescriptor> {
		ParsedMethodDescriptor::parse(self.as_str())
	}
}

impl From<&ParsedMethodDescriptor> for MethodDescriptor {
	fn from(value: &ParsedMethodDescriptor) -> Self {
		MethodDescriptor(std::borrow::Cow::Owned(value.write()))
	}
}
