//! `List.of`, `Set.of` and `Map.entry`, added in java 9.
//!
//! The results are built from the java 8 collections and wrapped with `Collections.unmodifiable*`. Like
//! the java 9 methods, `null` elements throw a `NullPointerException`, and `Set.of` throws an
//! `IllegalArgumentException` for duplicate elements, with the same message.

use anyhow::Result;
use duke::tree::class::ClassName;
use duke::tree::descriptor::{ArrayType, Type};
use duke::tree::method::code::{Instruction, InstructionList, Loadable};
use crate::context::ReplaceContext;
use crate::synth::{invoke_interface, invoke_special, invoke_static, invoke_virtual, new, push_int, require_non_null};

const COLLECTIONS: &str = "java/util/Collections";
const ARRAY_LIST: &str = "java/util/ArrayList";
const HASH_SET: &str = "java/util/HashSet";
const LIST: &str = "java/util/List";
const SET: &str = "java/util/Set";

/// How the elements are passed to a `List.of` or `Set.of` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Elements {
	/// As that many `Object` arguments.
	Fixed(usize),
	/// As a single `Object[]` argument.
	Array,
}

fn elements(context: &ReplaceContext<'_>, returns: &'static str) -> Result<Elements> {
	let descriptor = context.parsed_descriptor()?;

	if descriptor.return_type != Some(Type::Object(ClassName::from_static(returns))) {
		return Err(context.unsupported());
	}

	let object = Type::Object(ClassName::JAVA_LANG_OBJECT);
	let object_array = Type::Array(1, ArrayType::Object(ClassName::JAVA_LANG_OBJECT));

	if descriptor.parameters == [object_array] {
		Ok(Elements::Array)
	} else if descriptor.parameters.iter().all(|parameter| *parameter == object) {
		Ok(Elements::Fixed(descriptor.parameters.len()))
	} else {
		Err(context.unsupported())
	}
}

fn element_count(context: &ReplaceContext<'_>, count: usize) -> Result<i32> {
	i32::try_from(count).map_err(|_| context.unsupported())
}

/// Replaces `List.of`, with any number of elements or with an array.
pub fn list_of(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	let list = match elements(context, LIST)? {
		Elements::Fixed(0) => InstructionList::from(vec![
			invoke_static(COLLECTIONS, "emptyList", "()Ljava/util/List;"),
		]),
		Elements::Fixed(1) => InstructionList::from(vec![
			require_non_null(),
			invoke_static(COLLECTIONS, "singletonList", "(Ljava/lang/Object;)Ljava/util/List;"),
		]),
		Elements::Fixed(count) => {
			let mut list = InstructionList::from(vec![
				// e1 ... en
				new(ARRAY_LIST),
				Instruction::Dup,
				push_int(element_count(context, count)?),
				invoke_special(ARRAY_LIST, "<init>", "(I)V"),
				// e1 ... en list
			]);
			// the elements are added from the top of the stack down, so in reverse order
			for _ in 0..count {
				list.try_extend([
					// ... e list
					Instruction::DupX1,
					Instruction::DupX1,
					Instruction::Pop,
					// ... list list e
					require_non_null(),
					invoke_interface(LIST, "add", "(Ljava/lang/Object;)Z"),
					Instruction::Pop,
					// ... list
				])?;
			}
			list.try_extend([
				// list
				Instruction::Dup,
				invoke_static(COLLECTIONS, "reverse", "(Ljava/util/List;)V"),
				invoke_static(COLLECTIONS, "unmodifiableList", "(Ljava/util/List;)Ljava/util/List;"),
				// List
			])?;
			list
		},
		Elements::Array => {
			let copy = context.allocate_local(1)?;
			context.require_frames();

			let mut list = InstructionList::new();
			let head = list.new_label();
			let end = list.new_label();
			list.try_extend([
				// array
				Instruction::Dup,
				Instruction::ArrayLength,
				Instruction::ANewArray(ClassName::JAVA_LANG_OBJECT),
				Instruction::AStore(copy),
				Instruction::IConst0,
				// array i
				Instruction::Label(head),
				Instruction::DupX1,
				Instruction::Swap,
				Instruction::DupX2,
				Instruction::ArrayLength,
				// array i i length
				Instruction::IfICmpGe(end),
				// array i
				Instruction::Dup2,
				Instruction::AALoad,
				require_non_null(),
				// array i e
				Instruction::Dup2,
				Instruction::ALoad(copy),
				Instruction::DupX2,
				Instruction::Pop,
				// array i e copy i e
				Instruction::AAStore,
				Instruction::Pop,
				Instruction::IConst1,
				Instruction::IAdd,
				// array i+1
				Instruction::Goto(head),
				Instruction::Label(end),
				// array i
				Instruction::Pop2,
				Instruction::ALoad(copy),
				invoke_static("java/util/Arrays", "asList", "([Ljava/lang/Object;)Ljava/util/List;"),
				invoke_static(COLLECTIONS, "unmodifiableList", "(Ljava/util/List;)Ljava/util/List;"),
				// List
			])?;
			list
		},
	};
	Ok(list)
}

/// Adds the elements of the array on the stack to a new set, one after another, and leaves the set wrapped as unmodifiable.
///
/// Each element is checked for `null` before it's added, and adding an element already present throws an
/// `IllegalArgumentException` naming it. This matches the order `Set.of` checks its elements in.
fn set_from_array(context: &mut ReplaceContext<'_>, list: &mut InstructionList) -> Result<()> {
	let array = context.allocate_local(1)?;
	let set = context.allocate_local(1)?;
	let index = context.allocate_local(1)?;
	context.require_frames();

	let head = list.new_label();
	let added = list.new_label();
	let end = list.new_label();
	const BUILDER: &str = "java/lang/StringBuilder";
	const EXCEPTION: &str = "java/lang/IllegalArgumentException";
	list.try_extend([
		// array
		Instruction::AStore(array),
		new(HASH_SET),
		Instruction::Dup,
		invoke_special(HASH_SET, "<init>", "()V"),
		Instruction::AStore(set),
		Instruction::IConst0,
		Instruction::IStore(index),
		//
		Instruction::Label(head),
		Instruction::ILoad(index),
		Instruction::ALoad(array),
		Instruction::ArrayLength,
		Instruction::IfICmpGe(end),
		Instruction::ALoad(set),
		Instruction::ALoad(array),
		Instruction::ILoad(index),
		Instruction::AALoad,
		require_non_null(),
		invoke_interface(SET, "add", "(Ljava/lang/Object;)Z"),
		// boolean
		Instruction::IfNe(added),
		new(EXCEPTION),
		Instruction::Dup,
		new(BUILDER),
		Instruction::Dup,
		Instruction::Ldc(Loadable::string("duplicate element: ")),
		invoke_special(BUILDER, "<init>", "(Ljava/lang/String;)V"),
		Instruction::ALoad(array),
		Instruction::ILoad(index),
		Instruction::AALoad,
		invoke_virtual(BUILDER, "append", "(Ljava/lang/Object;)Ljava/lang/StringBuilder;"),
		invoke_virtual(BUILDER, "toString", "()Ljava/lang/String;"),
		// exception exception message
		invoke_special(EXCEPTION, "<init>", "(Ljava/lang/String;)V"),
		Instruction::AThrow,
		Instruction::Label(added),
		//
		Instruction::IInc(index, 1),
		Instruction::Goto(head),
		Instruction::Label(end),
		Instruction::ALoad(set),
		invoke_static(COLLECTIONS, "unmodifiableSet", "(Ljava/util/Set;)Ljava/util/Set;"),
		// Set
	])
}

/// Replaces `Set.of`, with any number of elements or with an array.
///
/// Two or more elements are first put into an array, so they are checked in the order they are declared in.
pub fn set_of(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	let list = match elements(context, SET)? {
		Elements::Fixed(0) => InstructionList::from(vec![
			invoke_static(COLLECTIONS, "emptySet", "()Ljava/util/Set;"),
		]),
		Elements::Fixed(1) => InstructionList::from(vec![
			require_non_null(),
			invoke_static(COLLECTIONS, "singleton", "(Ljava/lang/Object;)Ljava/util/Set;"),
		]),
		Elements::Fixed(count) => {
			let mut list = InstructionList::from(vec![
				// e1 ... en
				push_int(element_count(context, count)?),
				Instruction::ANewArray(ClassName::JAVA_LANG_OBJECT),
				// e1 ... en array
			]);
			for index in (0..count).rev() {
				list.try_extend([
					// ... e array
					Instruction::DupX1,
					Instruction::Swap,
					// ... array array e
					push_int(element_count(context, index)?),
					Instruction::Swap,
					// ... array array index e
					Instruction::AAStore,
					// ... array
				])?;
			}
			set_from_array(context, &mut list)?;
			list
		},
		Elements::Array => {
			let mut list = InstructionList::new();
			set_from_array(context, &mut list)?;
			list
		},
	};
	Ok(list)
}

/// Replaces `Map.entry` with a new `AbstractMap.SimpleImmutableEntry`, after checking both arguments for `null`.
pub fn map_entry(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/util/Map$Entry;" {
		return Err(context.unsupported());
	}

	const ENTRY: &str = "java/util/AbstractMap$SimpleImmutableEntry";
	Ok(InstructionList::from(vec![
		// key value
		require_non_null(),
		Instruction::Swap,
		require_non_null(),
		Instruction::Swap,
		// key value
		new(ENTRY),
		Instruction::DupX2,
		Instruction::DupX2,
		Instruction::Pop,
		// entry entry key value
		invoke_special(ENTRY, "<init>", "(Ljava/lang/Object;Ljava/lang/Object;)V"),
		// entry
	]))
}
