use std::fmt::{Debug, Formatter};
use anyhow::{bail, Result};
use crate::macros::make_name;
use crate::tree::attribute::Attribute;
use crate::tree::class::ClassName;
use crate::tree::descriptor::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	pub access: FieldAccess,
	pub name: FieldName,
	pub descriptor: FieldDescriptor,

	pub attributes: Vec<Attribute>,
}

impl Field {
	pub fn new(access: FieldAccess, name: FieldName, descriptor: FieldDescriptor) -> Field {
		Field {
			access,
			name,
			descriptor,
			attributes: Vec::new(),
		}
	}
}

#[derive(Copy, Clone, Default, Hash, Eq, PartialEq)]
pub struct FieldAccess {
	pub is_public: bool,
	pub is_private: bool,
	pub is_protected: bool,
	pub is_static: bool,
	pub is_final: bool,
	pub is_volatile: bool,
	pub is_transient: bool,
	pub is_synthetic: bool,
	pub is_enum: bool,
}

impl Debug for FieldAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("FieldAccess { ")?;
		if self.is_public    { f.write_str("public ")?; }
		if self.is_private   { f.write_str("private ")?; }
		if self.is_protected { f.write_str("protected ")?; }
		if self.is_static    { f.write_str("static ")?; }
		if self.is_final     { f.write_str("final ")?; }
		if self.is_volatile  { f.write_str("volatile ")?; }
		if self.is_transient { f.write_str("transient ")?; }
		if self.is_synthetic { f.write_str("synthetic ")?; }
		if self.is_enum      { f.write_str("enum ")?; }
		f.write_str("}")
	}
}

impl From<u16> for FieldAccess {
	fn from(value: u16) -> Self {
		FieldAccess {
			is_public:    value & 0x0001 != 0,
			is_private:   value & 0x0002 != 0,
			is_protected: value & 0x0004 != 0,
			is_static:    value & 0x0008 != 0,
			is_final:     value & 0x0010 != 0,
			is_volatile:  value & 0x0040 != 0,
			is_transient: value & 0x0080 != 0,
			is_synthetic: value & 0x1000 != 0,
			is_enum:      value & 0x4000 != 0,
		}
	}
}

impl From<FieldAccess> for u16 {
	fn from(value: FieldAccess) -> Self {
		(if value.is_public    { 0x0001 } else { 0 }) |
		(if value.is_private   { 0x0002 } else { 0 }) |
		(if value.is_protected { 0x0004 } else { 0 }) |
		(if value.is_static    { 0x0008 } else { 0 }) |
		(if value.is_final     { 0x0010 } else { 0 }) |
		(if value.is_volatile  { 0x0040 } else { 0 }) |
		(if value.is_transient { 0x0080 } else { 0 }) |
		(if value.is_synthetic { 0x1000 } else { 0 }) |
		(if value.is_enum      { 0x4000 } else { 0 })
	}
}

/// A reference to a field, as used by `getfield` and friends.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldRef {
	pub class: ClassName,
	pub name: FieldName,
	pub desc: FieldDescriptor,
}

impl FieldRef {
	pub const fn from_static(class: &'static str, name: &'static str, desc: &'static str) -> FieldRef {
		FieldRef {
			class: ClassName::from_static(class),
			name: FieldName::from_static(name),
			desc: FieldDescriptor::from_static(desc),
		}
	}
}

make_name!(
	pub FieldName;
	is_valid(s) = if crate::tree::names::is_valid_unqualified_name(s) {
		Ok(())
	} else {
		bail!("invalid field name: must be non-empty and not contain any of `.`, `;`, `[` and `/`")
	};
);

make_name!(
	/// A field descriptor, like `I` or `Ljava/nio/charset/Charset;`.
	pub FieldDescriptor;
	is_valid(s) = Type::parse(s).map(|_| ());
);

impl FieldDescriptor {
	pub fn parse(&self) -> Result<Type> {
		Type::parse(self.as_str())
	}

	/// The number of slots a value of this type takes, `2` for `long` and `double`.
	pub fn size(&self) -> u16 {
		match self.as_str() {
			"J" | "D" => 2,
			_ => 1,
		}
	}
}
