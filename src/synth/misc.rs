//! Small replacements, most of them calling an older method doing the same.

use anyhow::Result;
use duke::tree::class::ClassName;
use duke::tree::method::code::{Instruction, InstructionList};
use duke::tree::method::{MethodDescriptor, MethodName, MethodRef};
use crate::context::ReplaceContext;
use crate::replacer::CallKind;
use crate::synth::invoke_static;

/// Replaces `Path.of` with `Paths.get`.
pub fn path_of(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	let get = match context.descriptor().as_str() {
		"(Ljava/lang/String;[Ljava/lang/String;)Ljava/nio/file/Path;" =>
			invoke_static("java/nio/file/Paths", "get", "(Ljava/lang/String;[Ljava/lang/String;)Ljava/nio/file/Path;"),
		"(Ljava/net/URI;)Ljava/nio/file/Path;" =>
			invoke_static("java/nio/file/Paths", "get", "(Ljava/net/URI;)Ljava/nio/file/Path;"),
		_ => return Err(context.unsupported()),
	};
	Ok(InstructionList::from(vec![get]))
}

/// Replaces `isEmpty()` of `Optional` and its primitive variants with `!isPresent()`.
pub fn optional_is_empty(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "()Z" {
		return Err(context.unsupported());
	}

	let is_present = MethodRef {
		class: context.site.owner().clone(),
		name: MethodName::from_static("isPresent"),
		desc: context.descriptor().clone(),
	};
	Ok(InstructionList::from(vec![
		// Optional
		Instruction::InvokeVirtual(is_present),
		Instruction::IConst1,
		Instruction::IXor,
		// boolean
	]))
}

/// Replaces `Collection.toArray(IntFunction)` with asking the function for an empty array, and passing that to `toArray(Object[])`.
pub fn collection_to_array(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "(Ljava/util/function/IntFunction;)[Ljava/lang/Object;" {
		return Err(context.unsupported());
	}

	let to_array = MethodRef {
		class: context.site.owner().clone(),
		name: context.site.name().clone(),
		desc: MethodDescriptor::from_static("([Ljava/lang/Object;)[Ljava/lang/Object;"),
	};
	let to_array = if context.site.kind == CallKind::Interface {
		Instruction::InvokeInterface(to_array)
	} else {
		Instruction::InvokeVirtual(to_array)
	};
	Ok(InstructionList::from(vec![
		// Collection IntFunction
		Instruction::IConst0,
		Instruction::InvokeInterface(MethodRef::from_static("java/util/function/IntFunction", "apply", "(I)Ljava/lang/Object;")),
		Instruction::CheckCast(ClassName::from_static("[Ljava/lang/Object;")),
		// Collection Object[]
		to_array,
		// Object[]
	]))
}

/// Replaces `Character.toString(int)` with `String.valueOf(Character.toChars(int))`.
pub fn character_to_string(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "(I)Ljava/lang/String;" {
		return Err(context.unsupported());
	}

	Ok(InstructionList::from(vec![
		// int
		invoke_static("java/lang/Character", "toChars", "(I)[C"),
		invoke_static("java/lang/String", "valueOf", "([C)Ljava/lang/String;"),
		// String
	]))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::tree::class::ClassName;
	use duke::tree::method::code::Instruction;
	use duke::tree::method::MethodRef;
	use crate::replacer::CallKind;
	use crate::synth::misc::{character_to_string, collection_to_array, optional_is_empty, path_of};
	use crate::synth::testing::replace;

	#[test]
	fn path_of_variants() {
		let (list, _) = replace(path_of, CallKind::Static, MethodRef::from_static("java/nio/file/Path", "of", "(Ljava/net/URI;)Ljava/nio/file/Path;")).unwrap();
		assert_eq!(list.iter().collect::<Vec<_>>(), vec![
			&Instruction::InvokeStatic(MethodRef::from_static("java/nio/file/Paths", "get", "(Ljava/net/URI;)Ljava/nio/file/Path;"), false),
		]);
		assert!(replace(path_of, CallKind::Static, MethodRef::from_static("java/nio/file/Path", "of", "(Ljava/lang/String;)Ljava/nio/file/Path;")).is_err());
	}

	#[test]
	fn is_empty_uses_the_receiver_type() {
		let (list, _) = replace(optional_is_empty, CallKind::Virtual, MethodRef::from_static("java/util/OptionalInt", "isEmpty", "()Z")).unwrap();
		assert_eq!(list.iter().next(), Some(&Instruction::InvokeVirtual(MethodRef::from_static("java/util/OptionalInt", "isPresent", "()Z"))));
	}

	#[test]
	fn to_array() {
		let (list, _) = replace(collection_to_array, CallKind::Interface, MethodRef::from_static("java/util/List", "toArray", "(Ljava/util/function/IntFunction;)[Ljava/lang/Object;")).unwrap();
		assert_eq!(list.iter().nth(2), Some(&Instruction::CheckCast(ClassName::from_static("[Ljava/lang/Object;"))));
		assert_eq!(list.iter().nth(3), Some(&Instruction::InvokeInterface(MethodRef::from_static("java/util/List", "toArray", "([Ljava/lang/Object;)[Ljava/lang/Object;"))));
	}

	#[test]
	fn code_point_to_string() {
		let (list, result) = replace(character_to_string, CallKind::Static, MethodRef::from_static("java/lang/Character", "toString", "(I)Ljava/lang/String;")).unwrap();
		assert_eq!(list.len(), 2);
		assert!(!result.requires_frames);
		// Character.toString(char) exists since java 1.0, and is never registered
		assert!(replace(character_to_string, CallKind::Static, MethodRef::from_static("java/lang/Character", "toString", "(C)Ljava/lang/String;")).is_err());
	}
}
