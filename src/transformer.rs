//! Downgrading a class by one step, like from java 11 to java 10.

use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use duke::analysis::{max_stack, StackEffect};
use duke::tree::class::ClassFile;
use duke::tree::method::code::{Code, InstructionList};
use duke::tree::method::Method;
use duke::tree::version::Version;
use crate::context::{LocalAllocator, ReplaceContext};
use crate::hooks::ClassHook;
use crate::replacer::{CallKind, InvocationSite, ReplacerRegistry};
use crate::result::DowngradeResult;

/// A flag to stop transforming from another thread.
///
/// The flag is only looked at between methods, so a method body is never left partially rewritten.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
	pub fn new() -> CancelFlag {
		CancelFlag::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

#[derive(Debug, Clone)]
pub struct TransformOptions {
	pub cancel: Option<CancelFlag>,
	/// Check that each replacement takes and leaves as many stack slots as the call it replaces.
	pub verify_stack_effects: bool,
}

impl Default for TransformOptions {
	fn default() -> Self {
		TransformOptions {
			cancel: None,
			verify_stack_effects: true,
		}
	}
}

impl TransformOptions {
	fn check_cancelled(&self) -> Result<()> {
		match &self.cancel {
			Some(flag) if flag.is_cancelled() => bail!("transformation was cancelled"),
			_ => Ok(()),
		}
	}
}

/// Downgrades classes from one version to the next lower one.
///
/// First all [`ClassHook`]s run on the class, then every call site with a rule in the registry gets
/// replaced, the helper methods the replacements call are added, and finally the version of the class is
/// lowered.
pub struct DowngradingTransformer {
	source: Version,
	target: Version,
	registry: ReplacerRegistry,
	hooks: Vec<Box<dyn ClassHook>>,
}

impl Debug for DowngradingTransformer {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DowngradingTransformer")
			.field("source", &self.source)
			.field("target", &self.target)
			.field("rules", &self.registry.len())
			.field("hooks", &self.hooks.len())
			.finish()
	}
}

impl DowngradingTransformer {
	pub fn new(source: Version, target: Version, registry: ReplacerRegistry) -> Result<DowngradingTransformer> {
		if target >= source {
			bail!("can't downgrade from {source} to {target}, as that's not lower");
		}
		Ok(DowngradingTransformer { source, target, registry, hooks: Vec::new() })
	}

	pub fn with_hook(mut self, hook: impl ClassHook + 'static) -> DowngradingTransformer {
		self.hooks.push(Box::new(hook));
		self
	}

	pub fn source(&self) -> Version {
		self.source
	}

	pub fn target(&self) -> Version {
		self.target
	}

	pub fn registry(&self) -> &ReplacerRegistry {
		&self.registry
	}

	pub fn hook_count(&self) -> usize {
		self.hooks.len()
	}

	/// Downgrades `class` to [`DowngradingTransformer::target`], recording what was done in `result`.
	///
	/// On error the class may be partially transformed, and should be thrown away.
	pub fn transform(&self, class: &mut ClassFile, result: &mut DowngradeResult, options: &TransformOptions) -> Result<()> {
		if class.version > self.source {
			bail!("class {} has version {}, but this step only transforms classes up to {}", class.name, class.version, self.source);
		}

		for hook in &self.hooks {
			hook.pre_transform(class, result)
				.with_context(|| anyhow!("failed to run hook on class {}", class.name))?;
		}

		if !self.registry.is_empty() {
			let mut helpers = Vec::new();
			for index in 0..class.methods.len() {
				options.check_cancelled()?;

				let Some(mut code) = class.methods[index].code.take() else {
					continue;
				};

				let method = &class.methods[index];
				let rewritten = self.rewrite_code(class, method, &mut code, &mut helpers, result, options)
					.with_context(|| anyhow!("in method {}.{}{}", class.name, method.name, method.descriptor));

				class.methods[index].code = Some(code);
				rewritten?;
			}

			for helper in helpers {
				if class.method(helper.name.as_str(), helper.descriptor.as_str()).is_none() {
					debug!("adding helper method {}{} to {}", helper.name, helper.descriptor, class.name);
					class.methods.push(helper);
				}
			}
		}

		class.version = self.target;
		Ok(())
	}

	fn rewrite_code(&self, class: &ClassFile, method: &Method, code: &mut Code, helpers: &mut Vec<Method>, result: &mut DowngradeResult, options: &TransformOptions) -> Result<()> {
		let first_free = code.max_locals.unwrap_or(0).max(method.argument_slots()?);
		let mut locals = LocalAllocator::new(first_free);
		let mut replaced = 0;

		let mut cursor = code.instructions.first();
		while let Some(id) = cursor {
			// move on first, as splicing removes the instruction
			cursor = code.instructions.next(id);

			let Some(site) = InvocationSite::of(code.instructions.get(id)?) else {
				continue;
			};
			let Some(replacer) = self.registry.lookup(&site) else {
				continue;
			};

			let mut context = ReplaceContext::new(class, method, &site, &mut locals, result);
			let replacement = replacer.replace(&mut context)
				.with_context(|| anyhow!("failed to replace {site}"))?;
			helpers.extend(context.take_helpers());

			if options.verify_stack_effects {
				verify_stack_effect(&site, &replacement)?;
			}

			debug!("replacing {site} in {}.{}{} with {} instructions", class.name, method.name, method.descriptor, replacement.len());
			code.instructions.splice(id, replacement)?;
			replaced += 1;
		}

		if replaced > 0 {
			code.check_labels()?;
			if locals.max_locals() > first_free || code.max_locals.is_none() {
				code.max_locals = Some(locals.max_locals());
			}
			code.max_stack = Some(max_stack(code)?);
			result.replaced_call_sites += replaced;
		}
		Ok(())
	}
}

/// Checks that `replacement` takes and leaves as many stack slots as the call site does.
pub fn verify_stack_effect(site: &InvocationSite, replacement: &InstructionList) -> Result<()> {
	let descriptor = site.descriptor().parse()?;
	let receiver = match site.kind {
		CallKind::Static => 0,
		CallKind::Virtual | CallKind::Special | CallKind::Interface => 1,
	};
	let consumed = receiver + descriptor.parameter_slots();
	let produced = descriptor.return_slots();

	let effect = StackEffect::of(replacement)
		.with_context(|| anyhow!("failed to analyse replacement of {site}"))?;
	if effect.consumed != consumed || effect.produced != produced {
		bail!(
			"replacement of {site} takes {} and leaves {} stack slots, but the call takes {consumed} and leaves {produced}",
			effect.consumed, effect.produced,
		);
	}
	Ok(())
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use duke::tree::class::{ClassAccess, ClassFile, ClassName};
	use duke::tree::method::code::{Code, Instruction, InstructionList, Label, LvIndex};
	use duke::tree::method::{Method, MethodAccess, MethodDescriptor, MethodName, MethodRef};
	use duke::tree::version::Version;
	use crate::context::ReplaceContext;
	use crate::replacer::{CallKind, ReplacerRegistry};
	use crate::result::DowngradeResult;
	use crate::transformer::{CancelFlag, DowngradingTransformer, TransformOptions};

	const IS_BLANK: MethodRef = MethodRef::from_static("java/lang/String", "isBlank", "()Z");

	/// `x.isBlank()` becomes `x.trim().isEmpty()`, with a needless temporary to see the locals getting raised.
	fn trim_is_empty(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
		let temp = context.allocate_local(1)?;
		Ok(InstructionList::from(vec![
			Instruction::AStore(temp),
			Instruction::ALoad(temp),
			Instruction::InvokeVirtual(MethodRef::from_static("java/lang/String", "trim", "()Ljava/lang/String;")),
			Instruction::InvokeVirtual(MethodRef::from_static("java/lang/String", "isEmpty", "()Z")),
		]))
	}

	fn wrong_effect(_: &mut ReplaceContext<'_>) -> Result<InstructionList> {
		Ok(InstructionList::from(vec![Instruction::IConst1]))
	}

	fn class_with(instructions: Vec<Instruction>) -> ClassFile {
		let mut class = ClassFile::new(Version::V11, ClassAccess::from(0x0021), ClassName::from_static("a/B"), Some(ClassName::JAVA_LANG_OBJECT), Vec::new());
		let mut method = Method::new(MethodAccess::from(0x0009), MethodName::from_static("blank"), MethodDescriptor::from_static("(Ljava/lang/String;)Z"));
		let mut code = Code::new(InstructionList::from(instructions));
		code.max_stack = Some(1);
		code.max_locals = Some(1);
		method.code = Some(code);
		class.methods.push(method);
		class
	}

	fn transformer(replacer: fn(&mut ReplaceContext<'_>) -> Result<InstructionList>) -> DowngradingTransformer {
		let mut registry = ReplacerRegistry::new();
		registry.exact(CallKind::Virtual, "java/lang/String", "isBlank", "()Z", replacer).unwrap();
		DowngradingTransformer::new(Version::V11, Version::V10, registry).unwrap()
	}

	#[test]
	fn replaces_and_fixes_up() {
		let end = Label::new(0);
		let mut class = class_with(vec![
			Instruction::ALoad(LvIndex { index: 0 }),
			Instruction::InvokeVirtual(IS_BLANK),
			Instruction::Label(end),
			Instruction::IReturn,
		]);
		let mut result = DowngradeResult::new(Version::V10);
		transformer(trim_is_empty).transform(&mut class, &mut result, &TransformOptions::default()).unwrap();

		assert_eq!(class.version, Version::V10);
		assert_eq!(result.replaced_call_sites, 1);
		assert!(!result.requires_frames);

		let code = class.methods[0].code.as_ref().unwrap();
		assert_eq!(code.max_locals, Some(2));
		assert_eq!(code.max_stack, Some(1));
		assert_eq!(code.instructions.iter().cloned().collect::<Vec<_>>(), vec![
			Instruction::ALoad(LvIndex { index: 0 }),
			Instruction::AStore(LvIndex { index: 1 }),
			Instruction::ALoad(LvIndex { index: 1 }),
			Instruction::InvokeVirtual(MethodRef::from_static("java/lang/String", "trim", "()Ljava/lang/String;")),
			Instruction::InvokeVirtual(MethodRef::from_static("java/lang/String", "isEmpty", "()Z")),
			Instruction::Label(end),
			Instruction::IReturn,
		]);
	}

	#[test]
	fn untouched_without_matches() {
		let mut class = class_with(vec![
			Instruction::ALoad(LvIndex { index: 0 }),
			Instruction::InvokeVirtual(MethodRef::from_static("java/lang/String", "isEmpty", "()Z")),
			Instruction::IReturn,
		]);
		let mut expected = class.clone();
		expected.version = Version::V10;

		let mut result = DowngradeResult::new(Version::V10);
		transformer(trim_is_empty).transform(&mut class, &mut result, &TransformOptions::default()).unwrap();
		assert_eq!(class, expected);
		assert_eq!(result, DowngradeResult::new(Version::V10));
	}

	#[test]
	fn rejects_wrong_stack_effect() {
		let instructions = vec![
			Instruction::ALoad(LvIndex { index: 0 }),
			Instruction::InvokeVirtual(IS_BLANK),
			Instruction::IReturn,
		];

		let mut class = class_with(instructions.clone());
		let error = transformer(wrong_effect)
			.transform(&mut class, &mut DowngradeResult::new(Version::V10), &TransformOptions::default())
			.unwrap_err();
		let message = format!("{error:#}");
		assert!(message.contains("in method a/B.blank(Ljava/lang/String;)Z"), "{message}");
		assert!(message.contains("takes 0 and leaves 1 stack slots, but the call takes 1 and leaves 1"), "{message}");

		// the code stays in the method, even if the replacement failed
		assert!(class.methods[0].code.is_some());
	}

	#[test]
	fn cancelled() {
		let mut class = class_with(vec![Instruction::ALoad(LvIndex { index: 0 }), Instruction::InvokeVirtual(IS_BLANK), Instruction::IReturn]);
		let flag = CancelFlag::new();
		flag.cancel();
		let options = TransformOptions { cancel: Some(flag), ..TransformOptions::default() };
		let result = transformer(trim_is_empty).transform(&mut class, &mut DowngradeResult::new(Version::V10), &options);
		assert!(result.is_err());
		assert_eq!(class.methods[0].code.as_ref().unwrap().instructions.len(), 3);
	}

	#[test]
	fn too_new() {
		let mut class = class_with(vec![Instruction::Return]);
		class.version = Version::V12;
		let result = transformer(trim_is_empty).transform(&mut class, &mut DowngradeResult::new(Version::V10), &TransformOptions::default());
		assert!(result.is_err());

		assert!(DowngradingTransformer::new(Version::V10, Version::V11, ReplacerRegistry::new()).is_err());
	}
}
