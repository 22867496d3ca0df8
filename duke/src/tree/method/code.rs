use std::fmt::{Debug, Display, Formatter};
use std::iter::successors;
use anyhow::{anyhow, bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use java_string::JavaString;
use crate::macros::make_name;
use crate::tree::attribute::Attribute;
use crate::tree::class::ClassName;
use crate::tree::field::{FieldDescriptor, FieldName, FieldRef};
use crate::tree::method::{MethodDescriptor, MethodName, MethodRef};

/// Represents the code of a method.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Code {
	pub max_stack: Option<u16>,
	pub max_locals: Option<u16>,

	pub instructions: InstructionList,
	pub exception_table: Vec<Exception>,

	pub line_numbers: Vec<(Label, u16)>,
	pub local_variables: Vec<Lv>,

	pub attributes: Vec<Attribute>,
}

impl Code {
	pub fn new(instructions: InstructionList) -> Code {
		Code {
			instructions,
			..Code::default()
		}
	}

	/// Checks that every label used by an instruction, the exception table, the line number table or
	/// the local variable table is defined exactly once in the instruction list.
	pub fn check_labels(&self) -> Result<()> {
		let defined = self.instructions.check_labels()?;

		let check = |label: &Label, what: &str| -> Result<()> {
			if defined.contains(label) {
				Ok(())
			} else {
				bail!("{what} uses {label}, which is not defined")
			}
		};

		for exception in &self.exception_table {
			check(&exception.start, "exception table entry")?;
			check(&exception.end, "exception table entry")?;
			check(&exception.handler, "exception table entry")?;
		}
		for (label, _) in &self.line_numbers {
			check(label, "line number entry")?;
		}
		for lv in &self.local_variables {
			check(&lv.range.start, "local variable entry")?;
			check(&lv.range.end, "local variable entry")?;
		}
		Ok(())
	}
}

make_name!(
	pub LocalVariableName;
	is_valid(s) = if crate::tree::names::is_valid_unqualified_name(s) {
		Ok(())
	} else {
		bail!("invalid local variable name: must be non-empty and not contain any of `.`, `;`, `[` and `/`")
	};
);

#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
	pub start: Label,
	pub end: Label,
	pub handler: Label,
	pub catch: Option<ClassName>,
}

/// Represents an index of a local variable.
///
/// If the local variable is of type `double` or `long`, it also occupies
/// the [`LvIndex`] with `index = index + 1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LvIndex {
	pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lv {
	pub range: LabelRange,
	pub name: LocalVariableName,
	pub descriptor: Option<FieldDescriptor>,
	pub index: LvIndex,
}

/// Represents a position in the code, using a method-local id.
///
/// Labels are placed into the code using [`Instruction::Label`], and referenced by jumps, switches,
/// the exception table and the debug tables. The id doesn't correspond to any bytecode offset, offsets
/// only come into existence when the code is written out.
///
/// Get new labels for a list using [`InstructionList::new_label`], so they never collide with the ones
/// already present.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
	pub(crate) id: u32,
}

impl Label {
	pub const fn new(id: u32) -> Label {
		Label { id }
	}

	pub fn id(&self) -> u32 {
		self.id
	}
}

impl Debug for Label {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "L{}", self.id)
	}
}

impl Display for Label {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "L{}", self.id)
	}
}

/// Represents a range of code.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRange {
	/// The start label, inclusive.
	pub start: Label,
	/// The end label, exclusive.
	pub end: Label,
}

/// Represents an instruction of the JVM.
///
/// Each instruction can either:
/// - hold no additional data, like [`Instruction::Nop`],
/// - hold some immediate value, like [`Instruction::BiPush`],
/// - hold a [local variable index][LvIndex], like [`Instruction::ILoad`] (note that this also represents the `iload_0` instruction for example),
/// - hold a [`Label`] for jumps, like [`Instruction::IfEq`],
/// - or hold other data the instruction needs.
///
/// [`Instruction::Label`] isn't an instruction of the JVM, it marks the position a [`Label`] refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
	Label(Label),
	Nop,
	AConstNull,
	IConstM1, IConst0, IConst1, IConst2, IConst3, IConst4, IConst5,
	LConst0, LConst1,
	FConst0, FConst1, FConst2,
	DConst0, DConst1,
	BiPush(i8),
	SiPush(i16),
	Ldc(Loadable),
	ILoad(LvIndex), LLoad(LvIndex), FLoad(LvIndex), DLoad(LvIndex), ALoad(LvIndex),
	IALoad, LALoad, FALoad, DALoad, AALoad, BALoad, CALoad, SALoad,
	IStore(LvIndex), LStore(LvIndex), FStore(LvIndex), DStore(LvIndex), AStore(LvIndex),
	IAStore, LAStore, FAStore, DAStore, AAStore, BAStore, CAStore, SAStore,
	Pop, Pop2,
	Dup, DupX1, DupX2,
	Dup2, Dup2X1, Dup2X2,
	Swap,
	IAdd, LAdd, FAdd, DAdd,
	ISub, LSub, FSub, DSub,
	IMul, LMul, FMul, DMul,
	IDiv, LDiv, FDiv, DDiv,
	IRem, LRem, FRem, DRem,
	INeg, LNeg, FNeg, DNeg,
	IShl, LShl,
	IShr, LShr,
	IUShr, LUShr,
	IAnd, LAnd,
	IOr, LOr,
	IXor, LXor,
	IInc(LvIndex, i16),
	I2L, I2F, I2D,
	L2I, L2F, L2D,
	F2I, F2L, F2D,
	D2I, D2L, D2F,
	I2B, I2C, I2S,
	LCmp,
	FCmpL, FCmpG,
	DCmpL, DCmpG,
	IfEq(Label), IfNe(Label), IfLt(Label), IfGe(Label), IfGt(Label), IfLe(Label),
	IfICmpEq(Label), IfICmpNe(Label), IfICmpLt(Label), IfICmpGe(Label), IfICmpGt(Label), IfICmpLe(Label),
	IfACmpEq(Label), IfACmpNe(Label),
	Goto(Label),
	Jsr(Label),
	Ret(LvIndex),
	TableSwitch {
		default: Label,
		low: i32,
		high: i32,
		table: Vec<Label>,
	},
	LookupSwitch {
		default: Label,
		/// Note that these must be ordered.
		pairs: Vec<(i32, Label)>
	},
	IReturn, LReturn, FReturn, DReturn, AReturn,
	Return,
	GetStatic(FieldRef),
	PutStatic(FieldRef),
	GetField(FieldRef),
	PutField(FieldRef),
	InvokeVirtual(MethodRef),
	/// The bool is `true` iff it's on an interface, so if it referenced an `InterfaceMethodRef` constant pool entry.
	InvokeSpecial(MethodRef, bool),
	/// The bool is `true` iff it's on an interface, so if it referenced an `InterfaceMethodRef` constant pool entry.
	InvokeStatic(MethodRef, bool),
	/// `invokeinterface` always uses an `InterfaceMethodRef` constant pool entry.
	InvokeInterface(MethodRef),
	InvokeDynamic(InvokeDynamic),
	New(ClassName),
	NewArray(ArrayType),
	ANewArray(ClassName),
	ArrayLength,
	AThrow,
	CheckCast(ClassName),
	InstanceOf(ClassName),
	MonitorEnter, MonitorExit,
	MultiANewArray(ClassName, u8),
	IfNull(Label), IfNonNull(Label),
}

impl Instruction {
	/// Returns the labels this instruction jumps to.
	///
	/// For [`Instruction::Label`] this is empty, as that one defines its label.
	pub fn jump_targets(&self) -> Vec<Label> {
		use Instruction::*;
		match self {
			IfEq(l) | IfNe(l) | IfLt(l) | IfGe(l) | IfGt(l) | IfLe(l) |
			IfICmpEq(l) | IfICmpNe(l) | IfICmpLt(l) | IfICmpGe(l) | IfICmpGt(l) | IfICmpLe(l) |
			IfACmpEq(l) | IfACmpNe(l) | IfNull(l) | IfNonNull(l) |
			Goto(l) | Jsr(l) => vec![*l],
			TableSwitch { default, table, .. } => {
				let mut labels = vec![*default];
				labels.extend(table.iter().copied());
				labels
			},
			LookupSwitch { default, pairs } => {
				let mut labels = vec![*default];
				labels.extend(pairs.iter().map(|(_, l)| *l));
				labels
			},
			_ => Vec::new(),
		}
	}

	/// Replaces every label of this instruction, both the defined one and jump targets.
	pub fn map_labels(&mut self, mut f: impl FnMut(Label) -> Label) {
		use Instruction::*;
		match self {
			Instruction::Label(l) |
			IfEq(l) | IfNe(l) | IfLt(l) | IfGe(l) | IfGt(l) | IfLe(l) |
			IfICmpEq(l) | IfICmpNe(l) | IfICmpLt(l) | IfICmpGe(l) | IfICmpGt(l) | IfICmpLe(l) |
			IfACmpEq(l) | IfACmpNe(l) | IfNull(l) | IfNonNull(l) |
			Goto(l) | Jsr(l) => *l = f(*l),
			TableSwitch { default, table, .. } => {
				*default = f(*default);
				for l in table {
					*l = f(*l);
				}
			},
			LookupSwitch { default, pairs } => {
				*default = f(*default);
				for (_, l) in pairs {
					*l = f(*l);
				}
			},
			_ => {},
		}
	}

	/// Returns the number of operand stack slots this instruction pops, and the number it pushes.
	///
	/// Slots are counted like the `max_stack` item does: `long` and `double` take two of them.
	/// The stack manipulating instructions (`dup` and friends) are described on the slot level, so
	/// `dup2` is `(2, 4)`, no matter if it copies one `long` or two `int`s.
	pub fn stack_effect(&self) -> Result<(u16, u16)> {
		use Instruction::*;
		Ok(match self {
			Instruction::Label(_) | Nop | IInc(..) | Goto(_) | Ret(_) | Return => (0, 0),

			AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5 |
			FConst0 | FConst1 | FConst2 | BiPush(_) | SiPush(_) => (0, 1),
			LConst0 | LConst1 | DConst0 | DConst1 => (0, 2),
			Ldc(loadable) => (0, loadable.size()),

			ILoad(_) | FLoad(_) | ALoad(_) => (0, 1),
			LLoad(_) | DLoad(_) => (0, 2),
			IStore(_) | FStore(_) | AStore(_) => (1, 0),
			LStore(_) | DStore(_) => (2, 0),

			IALoad | FALoad | AALoad | BALoad | CALoad | SALoad => (2, 1),
			LALoad | DALoad => (2, 2),
			IAStore | FAStore | AAStore | BAStore | CAStore | SAStore => (3, 0),
			LAStore | DAStore => (4, 0),

			Pop => (1, 0),
			Pop2 => (2, 0),
			Dup => (1, 2),
			DupX1 => (2, 3),
			DupX2 => (3, 4),
			Dup2 => (2, 4),
			Dup2X1 => (3, 5),
			Dup2X2 => (4, 6),
			Swap => (2, 2),

			IAdd | FAdd | ISub | FSub | IMul | FMul | IDiv | FDiv | IRem | FRem |
			IShl | IShr | IUShr | IAnd | IOr | IXor => (2, 1),
			LAdd | DAdd | LSub | DSub | LMul | DMul | LDiv | DDiv | LRem | DRem |
			LAnd | LOr | LXor => (4, 2),
			LShl | LShr | LUShr => (3, 2),
			INeg | FNeg => (1, 1),
			LNeg | DNeg => (2, 2),

			I2F | F2I | I2B | I2C | I2S => (1, 1),
			I2L | I2D | F2L | F2D => (1, 2),
			L2I | L2F | D2I | D2F => (2, 1),
			L2D | D2L => (2, 2),

			LCmp | DCmpL | DCmpG => (4, 1),
			FCmpL | FCmpG => (2, 1),

			IfEq(_) | IfNe(_) | IfLt(_) | IfGe(_) | IfGt(_) | IfLe(_) | IfNull(_) | IfNonNull(_) => (1, 0),
			IfICmpEq(_) | IfICmpNe(_) | IfICmpLt(_) | IfICmpGe(_) | IfICmpGt(_) | IfICmpLe(_) |
			IfACmpEq(_) | IfACmpNe(_) => (2, 0),
			Jsr(_) => (0, 1),
			TableSwitch { .. } | LookupSwitch { .. } => (1, 0),

			IReturn | FReturn | AReturn | AThrow => (1, 0),
			LReturn | DReturn => (2, 0),

			GetStatic(field) => (0, field.desc.size()),
			PutStatic(field) => (field.desc.size(), 0),
			GetField(field) => (1, field.desc.size()),
			PutField(field) => (1 + field.desc.size(), 0),

			InvokeVirtual(method) | InvokeSpecial(method, _) | InvokeInterface(method) => {
				let desc = method.desc.parse()
					.with_context(|| anyhow!("in invocation of {method}"))?;
				(1 + desc.parameter_slots(), desc.return_slots())
			},
			InvokeStatic(method, _) => {
				let desc = method.desc.parse()
					.with_context(|| anyhow!("in invocation of {method}"))?;
				(desc.parameter_slots(), desc.return_slots())
			},
			InvokeDynamic(indy) => {
				let desc = indy.descriptor.parse()
					.with_context(|| anyhow!("in invokedynamic {}{}", indy.name, indy.descriptor))?;
				(desc.parameter_slots(), desc.return_slots())
			},

			New(_) => (0, 1),
			NewArray(_) | ANewArray(_) | ArrayLength | CheckCast(_) | InstanceOf(_) => (1, 1),
			MonitorEnter | MonitorExit => (1, 0),
			MultiANewArray(_, dimensions) => (u16::from(*dimensions), 1),
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Loadable {
	Integer(i32),
	Float(f32),
	Long(i64),
	Double(f64),
	Class(ClassName),
	String(JavaString),
	MethodHandle(Handle),
	MethodType(MethodDescriptor),
	Dynamic(ConstantDynamic),
}

impl Loadable {
	/// Creates a [`Loadable::String`] from a rust string.
	pub fn string(s: &str) -> Loadable {
		Loadable::String(JavaString::from(s))
	}

	/// The number of stack slots the loaded value takes.
	pub fn size(&self) -> u16 {
		match self {
			Loadable::Long(_) | Loadable::Double(_) => 2,
			Loadable::Dynamic(dynamic) => dynamic.descriptor.size(),
			_ => 1,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Handle {
	GetField(FieldRef),
	GetStatic(FieldRef),
	PutField(FieldRef),
	PutStatic(FieldRef),
	InvokeVirtual(MethodRef),
	/// The bool is `true` iff the handle references an `InterfaceMethodRef`.
	InvokeStatic(MethodRef, bool),
	/// The bool is `true` iff the handle references an `InterfaceMethodRef`.
	InvokeSpecial(MethodRef, bool),
	NewInvokeSpecial(MethodRef),
	InvokeInterface(MethodRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDynamic {
	pub name: FieldName,
	pub descriptor: FieldDescriptor,
	pub handle: Handle,
	pub arguments: Vec<Loadable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeDynamic {
	pub name: MethodName,
	pub descriptor: MethodDescriptor,
	pub handle: Handle,
	pub arguments: Vec<Loadable>,
}

/// The element type of a `newarray` instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArrayType {
	Boolean,
	Char,
	Float,
	Double,
	Byte,
	Short,
	Int,
	Long,
}

mod atype {
	pub(super) const T_BOOLEAN: u8 = 4;
	pub(super) const T_CHAR: u8 = 5;
	pub(super) const T_FLOAT: u8 = 6;
	pub(super) const T_DOUBLE: u8 = 7;
	pub(super) const T_BYTE: u8 = 8;
	pub(super) const T_SHORT: u8 = 9;
	pub(super) const T_INT: u8 = 10;
	pub(super) const T_LONG: u8 = 11;
}

impl ArrayType {
	pub fn from_atype(atype: u8) -> Result<ArrayType> {
		match atype {
			atype::T_BOOLEAN => Ok(ArrayType::Boolean),
			atype::T_CHAR    => Ok(ArrayType::Char),
			atype::T_FLOAT   => Ok(ArrayType::Float),
			atype::T_DOUBLE  => Ok(ArrayType::Double),
			atype::T_BYTE    => Ok(ArrayType::Byte),
			atype::T_SHORT   => Ok(ArrayType::Short),
			atype::T_INT     => Ok(ArrayType::Int),
			atype::T_LONG    => Ok(ArrayType::Long),
			_ => bail!("unknown array type {atype:x}"),
		}
	}

	pub fn to_atype(self) -> u8 {
		match self {
			ArrayType::Boolean => atype::T_BOOLEAN,
			ArrayType::Char    => atype::T_CHAR,
			ArrayType::Float   => atype::T_FLOAT,
			ArrayType::Double  => atype::T_DOUBLE,
			ArrayType::Byte    => atype::T_BYTE,
			ArrayType::Short   => atype::T_SHORT,
			ArrayType::Int     => atype::T_INT,
			ArrayType::Long    => atype::T_LONG,
		}
	}
}

/// A handle to an instruction of an [`InstructionList`].
///
/// Handles stay valid while other instructions are inserted or removed. Using the handle of a removed
/// instruction is an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InsnId(usize);

#[derive(Debug, Clone)]
struct Node {
	instruction: Option<Instruction>,
	prev: Option<InsnId>,
	next: Option<InsnId>,
}

/// The instructions of a method body, as a doubly linked list stored in an arena.
///
/// Inserting and removing instructions never moves any other instruction, so both [`InsnId`]s and
/// [`Label`]s stay valid while the list is being rewritten.
#[derive(Debug, Clone, Default)]
pub struct InstructionList {
	nodes: Vec<Node>,
	first: Option<InsnId>,
	last: Option<InsnId>,
	len: usize,
	next_label: u32,
}

impl InstructionList {
	pub fn new() -> InstructionList {
		InstructionList::default()
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	fn node(&self, id: InsnId) -> Result<&Node> {
		self.nodes.get(id.0)
			.filter(|node| node.instruction.is_some())
			.ok_or_else(|| anyhow!("instruction {id:?} is not part of this list"))
	}

	fn node_mut(&mut self, id: InsnId) -> Result<&mut Node> {
		self.nodes.get_mut(id.0)
			.filter(|node| node.instruction.is_some())
			.ok_or_else(|| anyhow!("instruction {id:?} is not part of this list"))
	}

	/// Makes sure [`InstructionList::new_label`] never returns a label used by `instruction`.
	fn note_labels(&mut self, instruction: &Instruction) {
		let defined = match instruction {
			Instruction::Label(label) => Some(*label),
			_ => None,
		};
		let highest = instruction.jump_targets().into_iter().chain(defined).map(|l| l.id).max();
		if let Some(highest) = highest {
			self.next_label = self.next_label.max(highest.saturating_add(1));
		}
	}

	fn allocate(&mut self, instruction: Instruction, prev: Option<InsnId>, next: Option<InsnId>) -> InsnId {
		self.note_labels(&instruction);
		let id = InsnId(self.nodes.len());
		self.nodes.push(Node { instruction: Some(instruction), prev, next });
		self.len += 1;
		id
	}

	/// Appends an instruction to the end of the list.
	pub fn push(&mut self, instruction: Instruction) -> Result<InsnId> {
		let id = self.allocate(instruction, self.last, None);
		match self.last {
			Some(last) => self.node_mut(last)?.next = Some(id),
			None => self.first = Some(id),
		}
		self.last = Some(id);
		Ok(id)
	}

	pub fn insert_before(&mut self, anchor: InsnId, instruction: Instruction) -> Result<InsnId> {
		let prev = self.node(anchor)?.prev;
		let id = self.allocate(instruction, prev, Some(anchor));
		self.node_mut(anchor)?.prev = Some(id);
		match prev {
			Some(prev) => self.node_mut(prev)?.next = Some(id),
			None => self.first = Some(id),
		}
		Ok(id)
	}

	pub fn insert_after(&mut self, anchor: InsnId, instruction: Instruction) -> Result<InsnId> {
		let next = self.node(anchor)?.next;
		let id = self.allocate(instruction, Some(anchor), next);
		self.node_mut(anchor)?.next = Some(id);
		match next {
			Some(next) => self.node_mut(next)?.prev = Some(id),
			None => self.last = Some(id),
		}
		Ok(id)
	}

	/// Removes an instruction, returning it. The handle is invalid afterwards.
	pub fn remove(&mut self, id: InsnId) -> Result<Instruction> {
		let node = self.node_mut(id)?;
		let (prev, next) = (node.prev.take(), node.next.take());
		let instruction = node.instruction.take()
			.ok_or_else(|| anyhow!("instruction {id:?} is not part of this list"))?;

		match prev {
			Some(prev) => self.node_mut(prev)?.next = next,
			None => self.first = next,
		}
		match next {
			Some(next) => self.node_mut(next)?.prev = prev,
			None => self.last = prev,
		}
		self.len -= 1;
		Ok(instruction)
	}

	/// Replaces the instruction `anchor` with all the instructions of `replacement`.
	///
	/// Every label used in `replacement` gets replaced with a fresh label of this list, so that a
	/// replacement built on its own can never collide with the labels already present. Labels
	/// outside the replaced instruction are untouched.
	///
	/// Returns the handles of the inserted instructions, in order.
	pub fn splice(&mut self, anchor: InsnId, replacement: InstructionList) -> Result<Vec<InsnId>> {
		if let Instruction::Label(label) = self.get(anchor)? {
			bail!("cannot replace the definition of {label}, other code may jump to it");
		}

		let mut fresh: IndexMap<Label, Label> = IndexMap::new();
		let mut inserted = Vec::with_capacity(replacement.len());
		for mut instruction in replacement.into_instructions() {
			instruction.map_labels(|l| *fresh.entry(l).or_insert_with(|| {
				let label = Label::new(self.next_label);
				self.next_label += 1;
				label
			}));
			inserted.push(self.insert_before(anchor, instruction)?);
		}

		self.remove(anchor)?;
		Ok(inserted)
	}

	/// Appends all the instructions to the end of the list.
	pub fn try_extend(&mut self, instructions: impl IntoIterator<Item=Instruction>) -> Result<()> {
		for instruction in instructions {
			self.push(instruction)?;
		}
		Ok(())
	}

	/// Creates a new label that isn't used anywhere in this list yet.
	pub fn new_label(&mut self) -> Label {
		let label = Label::new(self.next_label);
		self.next_label += 1;
		label
	}

	pub fn get(&self, id: InsnId) -> Result<&Instruction> {
		self.node(id)?.instruction.as_ref()
			.ok_or_else(|| anyhow!("instruction {id:?} is not part of this list"))
	}

	pub fn get_mut(&mut self, id: InsnId) -> Result<&mut Instruction> {
		self.node_mut(id)?.instruction.as_mut()
			.ok_or_else(|| anyhow!("instruction {id:?} is not part of this list"))
	}

	pub fn first(&self) -> Option<InsnId> {
		self.first
	}

	pub fn last(&self) -> Option<InsnId> {
		self.last
	}

	pub fn next(&self, id: InsnId) -> Option<InsnId> {
		self.node(id).ok().and_then(|node| node.next)
	}

	pub fn prev(&self, id: InsnId) -> Option<InsnId> {
		self.node(id).ok().and_then(|node| node.prev)
	}

	/// Iterates over the handles of the instructions, in order.
	pub fn ids(&self) -> impl Iterator<Item=InsnId> + '_ {
		successors(self.first, move |&id| self.next(id))
	}

	/// Iterates over the instructions, in order.
	pub fn iter(&self) -> impl Iterator<Item=&Instruction> + '_ {
		self.ids().filter_map(move |id| self.get(id).ok())
	}

	pub fn into_instructions(self) -> Vec<Instruction> {
		let mut nodes = self.nodes;
		let mut instructions = Vec::with_capacity(self.len);
		let mut current = self.first;
		while let Some(id) = current {
			match nodes.get_mut(id.0) {
				Some(node) => {
					instructions.extend(node.instruction.take());
					current = node.next;
				},
				None => break,
			}
		}
		instructions
	}

	/// Checks that every label is defined at most once, and that every jump target is defined.
	///
	/// Returns the defined labels, in order.
	pub fn check_labels(&self) -> Result<IndexSet<Label>> {
		let mut defined = IndexSet::new();
		for instruction in self.iter() {
			if let Instruction::Label(label) = instruction {
				if !defined.insert(*label) {
					bail!("{label} is defined more than once");
				}
			}
		}
		for instruction in self.iter() {
			for target in instruction.jump_targets() {
				if !defined.contains(&target) {
					bail!("{instruction:?} jumps to {target}, which is not defined");
				}
			}
		}
		Ok(defined)
	}
}

impl PartialEq for InstructionList {
	fn eq(&self, other: &Self) -> bool {
		self.iter().eq(other.iter())
	}
}

impl FromIterator<Instruction> for InstructionList {
	fn from_iter<T: IntoIterator<Item=Instruction>>(iter: T) -> Self {
		InstructionList::from(iter.into_iter().collect::<Vec<_>>())
	}
}

/// Links the instructions up in order, the `n`th instruction gets the `n`th node.
impl From<Vec<Instruction>> for InstructionList {
	fn from(value: Vec<Instruction>) -> Self {
		let len = value.len();
		let mut list = InstructionList {
			nodes: Vec::with_capacity(len),
			first: (len > 0).then_some(InsnId(0)),
			last: len.checked_sub(1).map(InsnId),
			len: 0,
			next_label: 0,
		};
		for (index, instruction) in value.into_iter().enumerate() {
			let prev = index.checked_sub(1).map(InsnId);
			let next = (index + 1 < len).then_some(InsnId(index + 1));
			list.allocate(instruction, prev, next);
		}
		list
	}
}
