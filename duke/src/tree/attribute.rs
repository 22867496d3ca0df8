use java_string::JavaString;

/// An attribute the tree doesn't model, kept as its raw bytes so it can be written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
	pub name: JavaString,
	pub bytes: Vec<u8>,
}
