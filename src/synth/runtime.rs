//! `Runtime.version()` and `Runtime.Version`, added in java 9.
//!
//! Calls are retargeted to shim classes reimplementing them. All other uses of `java/lang/Runtime$Version`
//! in a class, like field types, casts and method descriptors, are moved to the shim by
//! [`retarget_runtime_version`] before the call sites are looked at, so values of the shim type never
//! meet code expecting the real one. Generic signatures are left alone.

use anyhow::Result;
use log::debug;
use duke::tree::class::{ClassFile, ClassName};
use duke::tree::descriptor::{ArrayType, ParsedMethodDescriptor, Type};
use duke::tree::field::{FieldDescriptor, FieldRef};
use duke::tree::method::code::{Handle, InsnId, Instruction, InstructionList, Loadable};
use duke::tree::method::{MethodDescriptor, MethodRef};
use crate::context::ReplaceContext;
use crate::replacer::CallKind;
use crate::result::DowngradeResult;

pub const RUNTIME_SHIM: &str = "dukedown/runtime/java/lang/Runtime";
pub const VERSION_SHIM: &str = "dukedown/runtime/java/lang/Runtime$Version";

const VERSION: ClassName = ClassName::from_static("java/lang/Runtime$Version");
const RUNTIME: ClassName = ClassName::from_static("java/lang/Runtime");

/// The instance methods of `Runtime.Version` that are retargeted.
pub const VERSION_METHODS: [&str; 17] = [
	"feature", "interim", "update", "patch",
	"major", "minor", "security",
	"version", "pre", "build", "optional",
	"compareTo", "compareToIgnoreOptional", "equalsIgnoreOptional",
	"equals", "hashCode", "toString",
];

/// Replaces `Runtime.Version` in `t` with the shim, returning `true` if it did.
fn remap(t: &mut Type) -> bool {
	match t {
		Type::Object(class) | Type::Array(_, ArrayType::Object(class)) if *class == VERSION => {
			*class = ClassName::from_static(VERSION_SHIM);
			true
		},
		_ => false,
	}
}

fn remap_parsed(descriptor: &mut ParsedMethodDescriptor) -> bool {
	let mut changed = false;
	for t in descriptor.parameters.iter_mut().chain(descriptor.return_type.iter_mut()) {
		changed |= remap(t);
	}
	changed
}

/// The descriptor of the call site, with `Runtime.Version` replaced by its shim.
fn remapped_descriptor(context: &ReplaceContext<'_>) -> Result<MethodDescriptor> {
	let mut descriptor = context.parsed_descriptor()?;
	remap_parsed(&mut descriptor);
	Ok(MethodDescriptor::from(&descriptor))
}

fn is_replaced_call(method: &MethodRef) -> bool {
	method.class == VERSION || (method.class == RUNTIME && method.name == "version")
}

/// Moves the uses of `Runtime.Version` in a class over to the shim, remembering if there were any.
#[derive(Debug, Default)]
struct Retarget {
	version: bool,
	runtime: bool,
}

impl Retarget {
	fn field_descriptor(&mut self, descriptor: &mut FieldDescriptor) -> Result<()> {
		let mut t = descriptor.parse()?;
		if remap(&mut t) {
			*descriptor = FieldDescriptor::try_from(t.to_string())?;
			self.version = true;
		}
		Ok(())
	}

	fn method_descriptor(&mut self, descriptor: &mut MethodDescriptor) -> Result<()> {
		let mut parsed = descriptor.parse()?;
		if remap_parsed(&mut parsed) {
			*descriptor = MethodDescriptor::from(&parsed);
			self.version = true;
		}
		Ok(())
	}

	/// Array class names, like the operand of `anewarray [Ljava/lang/Runtime$Version;`, are changed as well.
	fn class_name(&mut self, class: &mut ClassName) -> Result<()> {
		if *class == VERSION {
			*class = ClassName::from_static(VERSION_SHIM);
			self.version = true;
		} else if class.is_array() {
			let mut t = Type::parse(class.as_str())?;
			if remap(&mut t) {
				*class = ClassName::try_from(t.to_string())?;
				self.version = true;
			}
		}
		Ok(())
	}

	fn field_ref(&mut self, field: &mut FieldRef) -> Result<()> {
		self.class_name(&mut field.class)?;
		self.field_descriptor(&mut field.desc)
	}

	fn method_ref(&mut self, method: &mut MethodRef) -> Result<()> {
		if method.class == RUNTIME && method.name == "version" {
			method.class = ClassName::from_static(RUNTIME_SHIM);
			self.runtime = true;
		}
		self.class_name(&mut method.class)?;
		self.method_descriptor(&mut method.desc)
	}

	/// Method handles can't be replaced like calls, so they are moved to the shims entirely.
	fn handle(&mut self, handle: &mut Handle) -> Result<()> {
		match handle {
			Handle::GetField(field) | Handle::GetStatic(field) |
			Handle::PutField(field) | Handle::PutStatic(field) => self.field_ref(field),
			Handle::InvokeVirtual(method) | Handle::InvokeStatic(method, _) | Handle::InvokeSpecial(method, _) |
			Handle::NewInvokeSpecial(method) | Handle::InvokeInterface(method) => self.method_ref(method),
		}
	}

	fn loadable(&mut self, loadable: &mut Loadable) -> Result<()> {
		match loadable {
			Loadable::Class(class) => self.class_name(class),
			Loadable::MethodHandle(handle) => self.handle(handle),
			Loadable::MethodType(descriptor) => self.method_descriptor(descriptor),
			Loadable::Dynamic(dynamic) => {
				self.field_descriptor(&mut dynamic.descriptor)?;
				self.handle(&mut dynamic.handle)?;
				dynamic.arguments.iter_mut().try_for_each(|argument| self.loadable(argument))
			},
			_ => Ok(()),
		}
	}

	fn instruction(&mut self, instruction: &mut Instruction) -> Result<()> {
		match instruction {
			Instruction::Ldc(loadable) => self.loadable(loadable),
			Instruction::GetStatic(field) | Instruction::PutStatic(field) |
			Instruction::GetField(field) | Instruction::PutField(field) => self.field_ref(field),
			Instruction::InvokeVirtual(method) | Instruction::InvokeSpecial(method, _) |
			Instruction::InvokeStatic(method, _) | Instruction::InvokeInterface(method) => {
				if is_replaced_call(method) {
					// the replacers take care of these
					Ok(())
				} else {
					self.method_ref(method)
				}
			},
			Instruction::InvokeDynamic(dynamic) => {
				self.method_descriptor(&mut dynamic.descriptor)?;
				self.handle(&mut dynamic.handle)?;
				dynamic.arguments.iter_mut().try_for_each(|argument| self.loadable(argument))
			},
			Instruction::New(class) | Instruction::ANewArray(class) | Instruction::CheckCast(class) |
			Instruction::InstanceOf(class) | Instruction::MultiANewArray(class, _) => self.class_name(class),
			_ => Ok(()),
		}
	}
}

/// Retargets the uses of `Runtime.Version` that aren't call sites to the shim.
///
/// This covers the descriptors of fields, methods and local variables, the descriptors of referenced
/// fields and methods, the class operands of `new`, `checkcast`, `instanceof` and array creation, constants
/// and `invokedynamic`s. Calls of `Runtime.version()` and of methods of `Runtime.Version` are left for
/// [`runtime_version`] and [`version_method`].
pub fn retarget_runtime_version(class: &mut ClassFile, result: &mut DowngradeResult) -> Result<()> {
	let mut retarget = Retarget::default();

	for field in &mut class.fields {
		retarget.field_descriptor(&mut field.descriptor)?;
	}
	for method in &mut class.methods {
		retarget.method_descriptor(&mut method.descriptor)?;

		let Some(code) = &mut method.code else {
			continue;
		};
		let ids: Vec<InsnId> = code.instructions.ids().collect();
		for id in ids {
			retarget.instruction(code.instructions.get_mut(id)?)?;
		}
		for lv in &mut code.local_variables {
			if let Some(descriptor) = &mut lv.descriptor {
				retarget.field_descriptor(descriptor)?;
			}
		}
	}

	if retarget.runtime {
		result.dependencies.insert(ClassName::from_static(RUNTIME_SHIM));
	}
	if retarget.version || retarget.runtime {
		result.dependencies.insert(ClassName::from_static(VERSION_SHIM));
		result.requires_frames = true;
		debug!("retargeted uses of java/lang/Runtime$Version in {} to {VERSION_SHIM}", class.name);
	}
	Ok(())
}

fn add_dependencies(context: &mut ReplaceContext<'_>) {
	context.add_dependency(ClassName::from_static(RUNTIME_SHIM));
	context.add_dependency(ClassName::from_static(VERSION_SHIM));
	// the values now have another type, which the old frames don't know about
	context.require_frames();
}

/// Replaces `Runtime.version()` with the shim.
pub fn runtime_version(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "()Ljava/lang/Runtime$Version;" {
		return Err(context.unsupported());
	}

	add_dependencies(context);
	Ok(InstructionList::from(vec![
		Instruction::InvokeStatic(MethodRef::from_static(RUNTIME_SHIM, "version", "()Ldukedown/runtime/java/lang/Runtime$Version;"), false),
	]))
}

/// Replaces calls of methods of `Runtime.Version` with calls of the same methods of the shim.
pub fn version_method(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	let method = MethodRef {
		class: ClassName::from_static(VERSION_SHIM),
		name: context.site.name().clone(),
		desc: remapped_descriptor(context)?,
	};
	let instruction = match context.site.kind {
		CallKind::Virtual => Instruction::InvokeVirtual(method),
		CallKind::Static => Instruction::InvokeStatic(method, false),
		CallKind::Special | CallKind::Interface => return Err(context.unsupported()),
	};

	add_dependencies(context);
	Ok(InstructionList::from(vec![instruction]))
}
