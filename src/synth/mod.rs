//! The replacements for the individual call sites.
//!
//! Each function here is a [`MethodCallReplacer`][crate::replacer::MethodCallReplacer]. The comments
//! in the code show the operand stack after each instruction, top of stack to the right.

pub mod collections;
pub mod io;
pub mod misc;
pub mod runtime;
pub mod strings;

use anyhow::Result;
use duke::tree::class::ClassName;
use duke::tree::descriptor::Type;
use duke::tree::field::FieldRef;
use duke::tree::method::code::{Instruction, InstructionList, Loadable};
use duke::tree::method::{MethodDescriptor, MethodRef};
use crate::context::ReplaceContext;
use crate::replacer::CallKind;

fn invoke_static(class: &'static str, name: &'static str, desc: &'static str) -> Instruction {
	Instruction::InvokeStatic(MethodRef::from_static(class, name, desc), false)
}

fn invoke_virtual(class: &'static str, name: &'static str, desc: &'static str) -> Instruction {
	Instruction::InvokeVirtual(MethodRef::from_static(class, name, desc))
}

fn invoke_interface(class: &'static str, name: &'static str, desc: &'static str) -> Instruction {
	Instruction::InvokeInterface(MethodRef::from_static(class, name, desc))
}

fn invoke_special(class: &'static str, name: &'static str, desc: &'static str) -> Instruction {
	Instruction::InvokeSpecial(MethodRef::from_static(class, name, desc), false)
}

fn new(class: &'static str) -> Instruction {
	Instruction::New(ClassName::from_static(class))
}

fn get_static(class: &'static str, name: &'static str, desc: &'static str) -> Instruction {
	Instruction::GetStatic(FieldRef::from_static(class, name, desc))
}

fn require_non_null() -> Instruction {
	invoke_static("java/util/Objects", "requireNonNull", "(Ljava/lang/Object;)Ljava/lang/Object;")
}

/// The shortest instruction pushing `value`.
fn push_int(value: i32) -> Instruction {
	match value {
		-1 => Instruction::IConstM1,
		0 => Instruction::IConst0,
		1 => Instruction::IConst1,
		2 => Instruction::IConst2,
		3 => Instruction::IConst3,
		4 => Instruction::IConst4,
		5 => Instruction::IConst5,
		_ => {
			if let Ok(value) = i8::try_from(value) {
				Instruction::BiPush(value)
			} else if let Ok(value) = i16::try_from(value) {
				Instruction::SiPush(value)
			} else {
				Instruction::Ldc(Loadable::Integer(value))
			}
		},
	}
}

/// Replaces a call with a call to the static method of the same name in the shim class `shim`.
///
/// Calls to instance methods pass the receiver as the first argument.
fn call_static_shim(context: &mut ReplaceContext<'_>, shim: &'static str) -> Result<InstructionList> {
	let mut descriptor = context.parsed_descriptor()?;
	if context.site.kind != CallKind::Static {
		descriptor.parameters.insert(0, Type::Object(context.site.owner().clone()));
	}

	let shim = ClassName::from_static(shim);
	context.add_dependency(shim.clone());

	let method = MethodRef {
		class: shim,
		name: context.site.name().clone(),
		desc: MethodDescriptor::from(&descriptor),
	};
	Ok(InstructionList::from(vec![Instruction::InvokeStatic(method, false)]))
}
