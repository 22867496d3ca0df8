//! Matching call sites against a table of replacement rules.

use std::fmt::{Debug, Display, Formatter};
use anyhow::{bail, Result};
use indexmap::IndexMap;
use indexmap::map::Entry;
use duke::tree::class::ClassName;
use duke::tree::method::code::{Instruction, InstructionList};
use duke::tree::method::{MethodDescriptor, MethodName, MethodRef};
use crate::context::ReplaceContext;

/// The kind of an invocation instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
	Virtual,
	Static,
	Special,
	Interface,
}

impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			CallKind::Virtual => "invokevirtual",
			CallKind::Static => "invokestatic",
			CallKind::Special => "invokespecial",
			CallKind::Interface => "invokeinterface",
		})
	}
}

/// A view of an invocation instruction, used for looking up rules.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationSite {
	pub kind: CallKind,
	pub method: MethodRef,
	/// If the instruction references an `InterfaceMethodRef`.
	pub interface: bool,
}

impl InvocationSite {
	/// Returns the call site for an `invoke*` instruction, or `None` for any other instruction.
	///
	/// `invokedynamic` has no owner class, so it's never a call site.
	pub fn of(instruction: &Instruction) -> Option<InvocationSite> {
		let (kind, method, interface) = match instruction {
			Instruction::InvokeVirtual(method) => (CallKind::Virtual, method, false),
			Instruction::InvokeStatic(method, interface) => (CallKind::Static, method, *interface),
			Instruction::InvokeSpecial(method, interface) => (CallKind::Special, method, *interface),
			Instruction::InvokeInterface(method) => (CallKind::Interface, method, true),
			_ => return None,
		};
		Some(InvocationSite { kind, method: method.clone(), interface })
	}

	pub fn owner(&self) -> &ClassName {
		&self.method.class
	}

	pub fn name(&self) -> &MethodName {
		&self.method.name
	}

	pub fn descriptor(&self) -> &MethodDescriptor {
		&self.method.desc
	}

	/// The instruction this call site was created from.
	pub fn to_instruction(&self) -> Instruction {
		let method = self.method.clone();
		match self.kind {
			CallKind::Virtual => Instruction::InvokeVirtual(method),
			CallKind::Static => Instruction::InvokeStatic(method, self.interface),
			CallKind::Special => Instruction::InvokeSpecial(method, self.interface),
			CallKind::Interface => Instruction::InvokeInterface(method),
		}
	}
}

impl Display for InvocationSite {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.kind, self.method)
	}
}

/// Creates the code replacing a single call site.
///
/// The returned code runs in place of the invocation: it must take exactly the values the invocation takes
/// from the operand stack, in the same order, and leave exactly the value the invocation returns.
///
/// If the descriptor of the call site isn't one the implementation knows about, it must return the
/// error of [`ReplaceContext::unsupported`] and not guess some code.
pub trait MethodCallReplacer: Send + Sync {
	fn replace(&self, context: &mut ReplaceContext<'_>) -> Result<InstructionList>;
}

impl<F> MethodCallReplacer for F
where
	F: Fn(&mut ReplaceContext<'_>) -> Result<InstructionList> + Send + Sync,
{
	fn replace(&self, context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
		self(context)
	}
}

/// Describes a registered rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleKey {
	pub kind: CallKind,
	pub owner: ClassName,
	pub name: MethodName,
	/// The descriptor the rule is for, or `None` if it's for any descriptor.
	pub descriptor: Option<MethodDescriptor>,
}

impl Display for RuleKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}.{}", self.kind, self.owner, self.name)?;
		match &self.descriptor {
			Some(descriptor) => write!(f, "{descriptor}"),
			None => f.write_str("(*)"),
		}
	}
}

#[derive(Default)]
struct RuleSet {
	exact: IndexMap<MethodDescriptor, Box<dyn MethodCallReplacer>>,
	any: Option<Box<dyn MethodCallReplacer>>,
}

/// The rules of one downgrading step, keyed by owner class, method name and call kind.
///
/// Built once, and only read afterwards, so it can be shared between threads.
#[derive(Default)]
pub struct ReplacerRegistry {
	rules: IndexMap<ClassName, IndexMap<MethodName, IndexMap<CallKind, RuleSet>>>,
	len: usize,
}

impl Debug for ReplacerRegistry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.rules().map(|rule| rule.to_string())).finish()
	}
}

impl ReplacerRegistry {
	pub fn new() -> ReplacerRegistry {
		ReplacerRegistry::default()
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Adds a rule. A `descriptor` of `None` makes the rule match any descriptor.
	///
	/// Registering the same key twice is an error. So is registering both a rule for any descriptor and a
	/// rule for a specific descriptor of the same call kind, owner and name, as those would overlap.
	pub fn register(
		&mut self,
		kind: CallKind,
		owner: ClassName,
		name: MethodName,
		descriptor: Option<MethodDescriptor>,
		replacer: impl MethodCallReplacer + 'static,
	) -> Result<()> {
		let key = RuleKey { kind, owner, name, descriptor };

		let set = self.rules.entry(key.owner.clone()).or_default()
			.entry(key.name.clone()).or_default()
			.entry(kind).or_default();

		match &key.descriptor {
			Some(descriptor) => {
				if set.any.is_some() {
					bail!("rule {key} overlaps with the rule for any descriptor");
				}
				match set.exact.entry(descriptor.clone()) {
					Entry::Occupied(_) => bail!("rule {key} is registered twice"),
					Entry::Vacant(e) => { e.insert(Box::new(replacer)); },
				}
			},
			None => {
				if set.any.is_some() {
					bail!("rule {key} is registered twice");
				}
				if !set.exact.is_empty() {
					bail!("rule {key} overlaps with the {} rule(s) for specific descriptors", set.exact.len());
				}
				set.any = Some(Box::new(replacer));
			},
		}
		self.len += 1;
		Ok(())
	}

	/// Adds a rule for a single descriptor.
	pub fn exact(&mut self, kind: CallKind, owner: &'static str, name: &'static str, descriptor: &'static str, replacer: impl MethodCallReplacer + 'static) -> Result<()> {
		self.register(
			kind,
			ClassName::from_static(owner),
			MethodName::from_static(name),
			Some(MethodDescriptor::from_static(descriptor)),
			replacer,
		)
	}

	/// Adds a rule for any descriptor.
	pub fn any(&mut self, kind: CallKind, owner: &'static str, name: &'static str, replacer: impl MethodCallReplacer + 'static) -> Result<()> {
		self.register(kind, ClassName::from_static(owner), MethodName::from_static(name), None, replacer)
	}

	/// Finds the rule for a call site, trying the rule for the exact descriptor first, and then the one for any descriptor.
	pub fn lookup(&self, site: &InvocationSite) -> Option<&dyn MethodCallReplacer> {
		let set = self.rules.get(site.owner().as_str())?
			.get(site.name().as_str())?
			.get(&site.kind)?;

		set.exact.get(site.descriptor().as_str())
			.or(set.any.as_ref())
			.map(|replacer| &**replacer)
	}

	/// Lists the registered rules, in the order they were registered in (grouped by owner and name).
	pub fn rules(&self) -> impl Iterator<Item=RuleKey> + '_ {
		self.rules.iter().flat_map(|(owner, names)| {
			names.iter().flat_map(move |(name, kinds)| {
				kinds.iter().flat_map(move |(kind, set)| {
					let exact = set.exact.keys().map(|descriptor| Some(descriptor.clone()));
					let any = set.any.as_ref().map(|_| None);
					exact.chain(any).map(move |descriptor| RuleKey {
						kind: *kind,
						owner: owner.clone(),
						name: name.clone(),
						descriptor,
					})
				})
			})
		})
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use duke::tree::method::code::{Instruction, InstructionList};
	use duke::tree::method::MethodRef;
	use crate::context::ReplaceContext;
	use crate::replacer::{CallKind, InvocationSite, ReplacerRegistry};

	fn pop(_: &mut ReplaceContext<'_>) -> Result<InstructionList> {
		Ok(InstructionList::from(vec![Instruction::Pop]))
	}

	fn nop(_: &mut ReplaceContext<'_>) -> Result<InstructionList> {
		Ok(InstructionList::from(vec![Instruction::Nop]))
	}

	fn site(kind: CallKind, class: &'static str, name: &'static str, desc: &'static str) -> InvocationSite {
		InvocationSite { kind, method: MethodRef::from_static(class, name, desc), interface: false }
	}

	#[test]
	fn sites() {
		let call = Instruction::InvokeStatic(MethodRef::from_static("java/util/List", "of", "()Ljava/util/List;"), true);
		let site = InvocationSite::of(&call).unwrap();
		assert_eq!(site.kind, CallKind::Static);
		assert!(site.interface);
		assert_eq!(site.to_string(), "invokestatic java/util/List.of()Ljava/util/List;");
		assert_eq!(site.to_instruction(), call);

		assert_eq!(InvocationSite::of(&Instruction::Pop), None);
	}

	#[test]
	fn exact_before_any() {
		let mut registry = ReplacerRegistry::new();
		registry.exact(CallKind::Virtual, "java/lang/String", "strip", "()Ljava/lang/String;", pop).unwrap();
		registry.any(CallKind::Static, "java/nio/file/Path", "of", nop).unwrap();
		registry.any(CallKind::Virtual, "java/nio/file/Path", "of", pop).unwrap();
		assert_eq!(registry.len(), 3);

		assert!(registry.lookup(&site(CallKind::Virtual, "java/lang/String", "strip", "()Ljava/lang/String;")).is_some());
		assert!(registry.lookup(&site(CallKind::Virtual, "java/lang/String", "strip", "(I)Ljava/lang/String;")).is_none());
		assert!(registry.lookup(&site(CallKind::Static, "java/lang/String", "strip", "()Ljava/lang/String;")).is_none());
		assert!(registry.lookup(&site(CallKind::Virtual, "java/lang/String", "trim", "()Ljava/lang/String;")).is_none());
		assert!(registry.lookup(&site(CallKind::Static, "java/nio/file/Path", "of", "(Ljava/net/URI;)Ljava/nio/file/Path;")).is_some());

		let rules: Vec<String> = registry.rules().map(|rule| rule.to_string()).collect();
		assert_eq!(rules, vec![
			"invokevirtual java/lang/String.strip()Ljava/lang/String;",
			"invokestatic java/nio/file/Path.of(*)",
			"invokevirtual java/nio/file/Path.of(*)",
		]);
	}

	#[test]
	fn duplicates_and_overlaps() {
		let mut registry = ReplacerRegistry::new();
		registry.exact(CallKind::Static, "java/util/Map", "entry", "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/util/Map$Entry;", nop).unwrap();
		assert!(registry.exact(CallKind::Static, "java/util/Map", "entry", "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/util/Map$Entry;", pop).is_err());
		assert!(registry.any(CallKind::Static, "java/util/Map", "entry", pop).is_err());

		registry.any(CallKind::Static, "java/util/List", "of", nop).unwrap();
		assert!(registry.any(CallKind::Static, "java/util/List", "of", nop).is_err());
		assert!(registry.exact(CallKind::Static, "java/util/List", "of", "()Ljava/util/List;", nop).is_err());

		assert_eq!(registry.len(), 2);
	}
}
