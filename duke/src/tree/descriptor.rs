use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;
use anyhow::{anyhow, bail, Context, Result};
use crate::tree::class::ClassName;

/// Represents a type.
///
/// In case of an array, use the [`Type::Array`] variant.
///
/// ```
/// use duke::tree::descriptor::{ArrayType, Type};
///
/// // the type of a java `int`
/// let int_type = Type::I;
///
/// // the type of a java `int[][]`
/// let int_array_type = Type::Array(2, ArrayType::I);
///
/// assert_ne!(int_type, int_array_type);
/// assert_eq!(Type::parse("[[I").unwrap(), int_array_type);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
	/// A `byte`. In rust, this is a `i8`.
	B,
	/// A `char`.
	C,
	/// A `double`. In rust, this is a `f64`.
	D,
	/// A `float`. In rust, this is a `f32`.
	F,
	/// An `int`. In rust, this is a `i32`.
	I,
	/// A `long`. In rust, this is a `i64`.
	J,
	/// A `short`. In rust, this is a `i16`.
	S,
	/// A `boolean`. In rust, this is a `bool`.
	Z,
	/// An instance of the class specified by [`ClassName`].
	Object(ClassName),
	/// An array type, represented by the dimension and the inner [`ArrayType`].
	Array(u8, ArrayType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayType {
	B,
	C,
	D,
	F,
	I,
	J,
	S,
	Z,
	Object(ClassName),
}

impl Type {
	/// Parses a field descriptor, like `I` or `[Ljava/lang/String;`.
	pub fn parse(descriptor: &str) -> Result<Type> {
		let mut chars = descriptor.chars().peekable();

		let t = read_field_type(&mut chars)
			.with_context(|| anyhow!("failed to read field descriptor {descriptor:?}"))?;

		if chars.peek().is_some() {
			bail!("expected end of field descriptor {descriptor:?}, got {:?} remaining", chars.collect::<String>());
		}

		Ok(t)
	}

	/// The number of local variable slots (and operand stack slots) a value of this type takes.
	pub fn size(&self) -> u16 {
		match self {
			Type::J | Type::D => 2,
			_ => 1,
		}
	}

	pub fn is_array(&self) -> bool {
		matches!(self, Type::Array(..))
	}

	pub fn is_reference(&self) -> bool {
		matches!(self, Type::Object(_) | Type::Array(..))
	}

	fn write_to(&self, string: &mut String) {
		fn write_class_name(class_name: &ClassName, string: &mut String) {
			string.push('L');
			string.push_str(class_name.as_str());
			string.push(';');
		}

		match self {
			Type::B => string.push('B'),
			Type::C => string.push('C'),
			Type::D => string.push('D'),
			Type::F => string.push('F'),
			Type::I => string.push('I'),
			Type::J => string.push('J'),
			Type::S => string.push('S'),
			Type::Z => string.push('Z'),
			Type::Object(class_name) => write_class_name(class_name, string),
			Type::Array(array_dimension, array_type) => {
				for _ in 0..*array_dimension {
					string.push('[');
				}
				match array_type {
					ArrayType::B => string.push('B'),
					ArrayType::C => string.push('C'),
					ArrayType::D => string.push('D'),
					ArrayType::F => string.push('F'),
					ArrayType::I => string.push('I'),
					ArrayType::J => string.push('J'),
					ArrayType::S => string.push('S'),
					ArrayType::Z => string.push('Z'),
					ArrayType::Object(class_name) => write_class_name(class_name, string),
				}
			},
		}
	}
}

/// Writes the type as a field descriptor.
impl Display for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let mut s = String::new();
		self.write_to(&mut s);
		f.write_str(&s)
	}
}

// The grammar for descriptors is:
//   FieldDescriptor:
//     FieldType
//
//   MethodDescriptor:
//     "(" FieldType* ")" ReturnDescriptor
//
//   ReturnDescriptor:
//     FieldType | "V"
//
//   FieldType:
//     "B" | "C" | "D" | "F" | "I" | "J" | "S" | "Z" |
//     "L" ClassName ";" |
//     "[" FieldType
fn read_field_type(chars: &mut Peekable<Chars>) -> Result<Type> {
	let mut array_dimension: u8 = 0;
	while chars.next_if_eq(&'[').is_some() {
		array_dimension = array_dimension.checked_add(1)
			.ok_or_else(|| anyhow!("array dimension is larger than 255"))?;
	}

	fn read_class_name(chars: &mut Peekable<Chars>) -> Result<ClassName> {
		let mut s = String::new();
		loop {
			match chars.next() {
				Some(';') => break,
				Some(c) => s.push(c),
				None => bail!("unexpected abrupt ending of descriptor"),
			}
		}
		if s.starts_with('[') {
			bail!("class name of an object type must not be an array: {s:?}");
		}
		ClassName::try_from(s)
	}

	let char = chars.next().ok_or_else(|| anyhow!("unexpected abrupt ending of descriptor"))?;
	let array_type = match char {
		'B' => ArrayType::B,
		'C' => ArrayType::C,
		'D' => ArrayType::D,
		'F' => ArrayType::F,
		'I' => ArrayType::I,
		'J' => ArrayType::J,
		'S' => ArrayType::S,
		'Z' => ArrayType::Z,
		'L' => ArrayType::Object(read_class_name(chars)?),
		x => bail!("unexpected char {x:?} in descriptor"),
	};

	Ok(if array_dimension == 0 {
		match array_type {
			ArrayType::B => Type::B,
			ArrayType::C => Type::C,
			ArrayType::D => Type::D,
			ArrayType::F => Type::F,
			ArrayType::I => Type::I,
			ArrayType::J => Type::J,
			ArrayType::S => Type::S,
			ArrayType::Z => Type::Z,
			ArrayType::Object(class_name) => Type::Object(class_name),
		}
	} else {
		Type::Array(array_dimension, array_type)
	})
}

/// A method descriptor, split into its parameter types and its return type.
///
/// A `return_type` of [`None`] means the method returns `void`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedMethodDescriptor {
	pub parameters: Vec<Type>,
	pub return_type: Option<Type>,
}

impl ParsedMethodDescriptor {
	pub(crate) fn parse(descriptor: &str) -> Result<ParsedMethodDescriptor> {
		let mut chars = descriptor.chars().peekable();

		if chars.next_if_eq(&'(').is_none() {
			bail!("method descriptor {descriptor:?} doesn't start with '('");
		}

		let mut parameters = Vec::new();
		while chars.next_if_eq(&')').is_none() {
			let parameter = read_field_type(&mut chars)
				.with_context(|| anyhow!("failed to read parameter descriptor of {descriptor:?}"))?;
			parameters.push(parameter);
		}

		let return_type = if chars.next_if_eq(&'V').is_some() {
			None
		} else {
			let return_type = read_field_type(&mut chars)
				.with_context(|| anyhow!("failed to read return descriptor of {descriptor:?}"))?;
			Some(return_type)
		};

		if chars.peek().is_some() {
			bail!("expected end of method descriptor {descriptor:?}, got {:?} remaining", chars.collect::<String>());
		}

		Ok(ParsedMethodDescriptor { parameters, return_type })
	}

	/// The number of operand stack slots the parameters take, not counting any receiver.
	pub fn parameter_slots(&self) -> u16 {
		self.parameters.iter().map(Type::size).sum()
	}

	/// The number of operand stack slots the return value takes, `0` for `void`.
	pub fn return_slots(&self) -> u16 {
		self.return_type.as_ref().map_or(0, Type::size)
	}

	pub fn write(&self) -> String {
		let mut s = String::from("(");
		for parameter in &self.parameters {
			parameter.write_to(&mut s);
		}
		s.push(')');
		match &self.return_type {
			Some(return_type) => return_type.write_to(&mut s),
			None => s.push('V'),
		}
		s
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::tree::class::ClassName;
	use crate::tree::descriptor::{ArrayType, ParsedMethodDescriptor, Type};

	#[test]
	fn field_types() {
		assert_eq!(Type::parse("I").unwrap(), Type::I);
		assert_eq!(Type::parse("Ljava/lang/Object;").unwrap(), Type::Object(ClassName::JAVA_LANG_OBJECT));
		assert_eq!(Type::parse("[[[D").unwrap(), Type::Array(3, ArrayType::D));
		assert_eq!(Type::parse("[Ljava/lang/String;").unwrap().to_string(), "[Ljava/lang/String;");

		assert!(Type::parse("").is_err());
		assert!(Type::parse("V").is_err());
		assert!(Type::parse("L;").is_err());
		assert!(Type::parse("II").is_err());
		assert!(Type::parse("Ljava/lang/Object").is_err());
	}

	#[test]
	fn method_descriptors() {
		let parsed = ParsedMethodDescriptor::parse("(Ljava/nio/file/Path;JD[I)Ljava/lang/String;").unwrap();
		assert_eq!(parsed.parameters, vec![
			Type::Object(ClassName::from_static("java/nio/file/Path")),
			Type::J,
			Type::D,
			Type::Array(1, ArrayType::I),
		]);
		assert_eq!(parsed.parameter_slots(), 6);
		assert_eq!(parsed.return_slots(), 1);
		assert_eq!(parsed.write(), "(Ljava/nio/file/Path;JD[I)Ljava/lang/String;");

		let void = ParsedMethodDescriptor::parse("()V").unwrap();
		assert_eq!(void.parameters, vec![]);
		assert_eq!(void.return_type, None);
		assert_eq!(void.return_slots(), 0);

		assert!(ParsedMethodDescriptor::parse("I").is_err());
		assert!(ParsedMethodDescriptor::parse("(I").is_err());
		assert!(ParsedMethodDescriptor::parse("(I)").is_err());
		assert!(ParsedMethodDescriptor::parse("(V)V").is_err());
		assert!(ParsedMethodDescriptor::parse("()VV").is_err());
	}
}
