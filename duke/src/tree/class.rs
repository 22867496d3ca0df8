use std::fmt::{Debug, Formatter};
use anyhow::bail;
use crate::macros::make_name;
use crate::tree::attribute::Attribute;
use crate::tree::field::Field;
use crate::tree::method::Method;
use crate::tree::version::Version;

/// A class file, with the parts a downgrade looks at modelled, and everything else kept as raw [`Attribute`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
	pub version: Version,
	pub access: ClassAccess,
	pub name: ClassName,
	pub super_class: Option<ClassName>,
	pub interfaces: Vec<ClassName>,

	pub fields: Vec<Field>,
	pub methods: Vec<Method>,

	/// The `NestHost` attribute. A class has either this, or [`ClassFile::nest_members`], or none of them.
	pub nest_host_class: Option<ClassName>,
	/// The `NestMembers` attribute.
	pub nest_members: Option<Vec<ClassName>>,

	pub attributes: Vec<Attribute>,
}

impl ClassFile {
	pub fn new(version: Version, access: ClassAccess, name: ClassName, super_class: Option<ClassName>, interfaces: Vec<ClassName>) -> ClassFile {
		ClassFile {
			version,
			access,
			name,
			super_class,
			interfaces,

			fields: Vec::new(),
			methods: Vec::new(),

			nest_host_class: None,
			nest_members: None,

			attributes: Vec::new(),
		}
	}

	/// Returns `true` if this class declares a nest host or nest members.
	pub fn has_nest_attributes(&self) -> bool {
		self.nest_host_class.is_some() || self.nest_members.is_some()
	}

	pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
		self.methods.iter().find(|m| m.name == name && m.descriptor == descriptor)
	}

	pub fn method_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut Method> {
		self.methods.iter_mut().find(|m| m.name == name && m.descriptor == descriptor)
	}

	pub fn field(&self, name: &str) -> Option<&Field> {
		self.fields.iter().find(|f| f.name == name)
	}
}

/// Represents the access flags a class can have.
///
/// Take a look at the [Java Virtual Machine Specification](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.1-200-E.1), for
/// the meanings of these fields, and what combinations are legal and which not.
#[derive(Copy, Clone, Default, PartialEq)]
pub struct ClassAccess {
	pub is_public: bool,
	pub is_final: bool,
	pub is_super: bool,
	pub is_interface: bool,
	pub is_abstract: bool,
	pub is_synthetic: bool,
	pub is_annotation: bool,
	pub is_enum: bool,
	pub is_module: bool,
}

impl Debug for ClassAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("ClassAccess { ")?;
		if self.is_public     { f.write_str("public ")?; }
		if self.is_final      { f.write_str("final ")?; }
		if self.is_super      { f.write_str("super ")?; }
		if self.is_interface  { f.write_str("interface ")?; }
		if self.is_abstract   { f.write_str("abstract ")?; }
		if self.is_synthetic  { f.write_str("synthetic ")?; }
		if self.is_annotation { f.write_str("annotation ")?; }
		if self.is_enum       { f.write_str("enum ")?; }
		if self.is_module     { f.write_str("module ")?; }
		f.write_str("}")
	}
}

/// Interprets an `u16` as the `access_flags` item of the `ClassFile` structure of the Java Virtual Machine Specification.
impl From<u16> for ClassAccess {
	fn from(value: u16) -> Self {
		ClassAccess {
			is_public:     value & 0x0001 != 0,
			is_final:      value & 0x0010 != 0,
			is_super:      value & 0x0020 != 0,
			is_interface:  value & 0x0200 != 0,
			is_abstract:   value & 0x0400 != 0,
			is_synthetic:  value & 0x1000 != 0,
			is_annotation: value & 0x2000 != 0,
			is_enum:       value & 0x4000 != 0,
			is_module:     value & 0x8000 != 0,
		}
	}
}

impl From<ClassAccess> for u16 {
	fn from(value: ClassAccess) -> Self {
		(if value.is_public     { 0x0001 } else { 0 }) |
		(if value.is_final      { 0x0010 } else { 0 }) |
		(if value.is_super      { 0x0020 } else { 0 }) |
		(if value.is_interface  { 0x0200 } else { 0 }) |
		(if value.is_abstract   { 0x0400 } else { 0 }) |
		(if value.is_synthetic  { 0x1000 } else { 0 }) |
		(if value.is_annotation { 0x2000 } else { 0 }) |
		(if value.is_enum       { 0x4000 } else { 0 }) |
		(if value.is_module     { 0x8000 } else { 0 })
	}
}

make_name!(
	/// Represents a class name in its internal form, like `java/lang/Thread`.
	///
	/// Array class names, like `[Ljava/lang/Object;`, are valid class names as well, as they can appear
	/// as the operand of `checkcast` and friends.
	///
	/// ```
	/// use duke::tree::class::ClassName;
	///
	/// let thread = ClassName::from_static("java/lang/Thread");
	/// assert_eq!(thread, "java/lang/Thread");
	/// assert!(ClassName::try_from("java.lang.Thread").is_err());
	/// ```
	pub ClassName;
	is_valid(s) = if crate::tree::names::is_valid_class_name(s) {
		Ok(())
	} else {
		bail!("invalid class name: must be either array field descriptor; or must consist out of `/` separated non-empty parts, and not contain any of `.`, `;`, `[`")
	};
);

impl ClassName {
	pub const JAVA_LANG_OBJECT: ClassName = ClassName::from_static("java/lang/Object");

	pub fn is_array(&self) -> bool {
		self.as_str().starts_with('[')
	}

	/// Returns the part of the name before the last `/`, or an empty string for the default package.
	pub fn package(&self) -> &str {
		self.as_str().rsplit_once('/').map_or("", |(package, _)| package)
	}

	/// The path of the class file inside a jar, like `java/lang/Thread.class`.
	pub fn to_file_name(&self) -> String {
		format!("{}.class", self.as_str())
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::tree::class::{ClassAccess, ClassName};

	#[test]
	fn access_round_trip() {
		for flags in [0x0001u16, 0x0021, 0x0601, 0x1000, 0x4031] {
			let access = ClassAccess::from(flags);
			assert_eq!(u16::from(access), flags);
		}
		assert!(ClassAccess::from(0x0200).is_interface);
	}

	#[test]
	fn names() {
		let name = ClassName::from_static("java/util/AbstractMap$SimpleImmutableEntry");
		assert_eq!(name.package(), "java/util");
		assert_eq!(name.to_file_name(), "java/util/AbstractMap$SimpleImmutableEntry.class");
		assert_eq!(ClassName::from_static("Main").package(), "");
		assert!(ClassName::try_from("[Ljava/lang/Object;").unwrap().is_array());
	}
}
