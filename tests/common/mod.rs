//! Runs replacement code on a tiny model of the JVM.
//!
//! Only the instructions and library methods the replacements use are supported. All values take one
//! stack slot, so `long`s and `double`s can't be used.

#![allow(dead_code)]

use std::path::PathBuf;
use anyhow::{anyhow, bail, Context, Result};
use duke::tree::class::{ClassAccess, ClassFile, ClassName};
use duke::tree::method::code::{Instruction, InstructionList, Label, Loadable};
use duke::tree::method::{Method, MethodAccess, MethodDescriptor, MethodName, MethodRef};
use duke::tree::version::Version;
use dukedown::context::{LocalAllocator, ReplaceContext};
use dukedown::replacer::{CallKind, InvocationSite, MethodCallReplacer};
use dukedown::result::DowngradeResult;
use dukedown::transformer::verify_stack_effect;
use dukedown::TransformerManager;

pub const NPE: &str = "java/lang/NullPointerException";
pub const IAE: &str = "java/lang/IllegalArgumentException";
pub const UOE: &str = "java/lang/UnsupportedOperationException";

/// Looks up the rule for the call site in the default chain, and returns the code replacing it in a static
/// method without any locals.
pub fn replacement(kind: CallKind, method: MethodRef) -> Result<(InstructionList, DowngradeResult)> {
	let site = InvocationSite { kind, method, interface: kind == CallKind::Interface };

	let manager = TransformerManager::new()?;
	let class = ClassFile::new(Version::V11, ClassAccess::from(0x0021), ClassName::from_static("test/Main"), Some(ClassName::JAVA_LANG_OBJECT), Vec::new());
	let test = Method::new(MethodAccess::from(0x0009), MethodName::from_static("test"), MethodDescriptor::from_static("()V"));

	for step in manager.steps() {
		if let Some(replacer) = step.registry().lookup(&site) {
			let mut locals = LocalAllocator::new(0);
			let mut result = DowngradeResult::new(step.target());
			let list = replacer.replace(&mut ReplaceContext::new(&class, &test, &site, &mut locals, &mut result))?;
			verify_stack_effect(&site, &list)?;
			return Ok((list, result));
		}
	}
	bail!("no rule for {site}")
}

/// `Character.isWhitespace(int)`.
pub fn java_is_whitespace(code_point: u32) -> bool {
	match char::from_u32(code_point) {
		// no-break spaces, and NEL, which isn't a java whitespace
		Some('\u{85}' | '\u{a0}' | '\u{2007}' | '\u{202f}') => false,
		Some('\u{1c}'..='\u{1f}') => true,
		Some(c) => c.is_whitespace(),
		None => false,
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
	Null,
	Int(i32),
	Ref(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
	/// Created with `new`, but not initialized yet.
	New(String),
	String(Vec<u16>),
	Chars(Vec<u16>),
	Bytes(Vec<u8>),
	Array(Vec<Value>),
	List { items: Vec<Value>, modifiable: bool },
	Set { items: Vec<Value>, modifiable: bool },
	Entry(Value, Value),
	Path(PathBuf),
	Charset(&'static str),
	Builder(Vec<u16>),
	Exception { class: String, message: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	/// The code ran to its end, leaving this operand stack.
	Returned(Vec<Value>),
	/// The code threw an exception of this class.
	Thrown(String),
}

impl Outcome {
	/// The single value left on the stack.
	pub fn value(&self) -> Result<Value> {
		match self {
			Outcome::Returned(stack) if stack.len() == 1 => Ok(stack[0]),
			outcome => bail!("expected a single value, got {outcome:?}"),
		}
	}
}

fn pop(stack: &mut Vec<Value>) -> Result<Value> {
	stack.pop().ok_or_else(|| anyhow!("operand stack underflow"))
}

fn pop_int(stack: &mut Vec<Value>) -> Result<i32> {
	match pop(stack)? {
		Value::Int(x) => Ok(x),
		value => bail!("expected an int, got {value:?}"),
	}
}

fn code_point_at(units: &[u16], index: usize) -> Option<u32> {
	let high = *units.get(index)?;
	match units.get(index + 1) {
		Some(&low) if (0xd800..0xdc00).contains(&high) && (0xdc00..0xe000).contains(&low) => {
			Some(0x10000 + ((u32::from(high) - 0xd800) << 10) + (u32::from(low) - 0xdc00))
		},
		_ => Some(u32::from(high)),
	}
}

fn code_point_before(units: &[u16], index: usize) -> Option<u32> {
	let low = *units.get(index.checked_sub(1)?)?;
	if (0xdc00..0xe000).contains(&low) && index >= 2 {
		let high = units[index - 2];
		if (0xd800..0xdc00).contains(&high) {
			return Some(0x10000 + ((u32::from(high) - 0xd800) << 10) + (u32::from(low) - 0xdc00));
		}
	}
	Some(u32::from(low))
}

#[derive(Debug, Default)]
pub struct Machine {
	pub heap: Vec<Object>,
	/// The message of the last exception thrown with `athrow`.
	pub message: Option<String>,
}

impl Machine {
	pub fn new() -> Machine {
		Machine::default()
	}

	pub fn alloc(&mut self, object: Object) -> Value {
		self.heap.push(object);
		Value::Ref(self.heap.len() - 1)
	}

	pub fn string(&mut self, s: &str) -> Value {
		self.alloc(Object::String(s.encode_utf16().collect()))
	}

	pub fn object(&self, value: Value) -> Result<&Object> {
		match value {
			Value::Ref(index) => self.heap.get(index).ok_or_else(|| anyhow!("dangling reference {index}")),
			value => bail!("expected a reference, got {value:?}"),
		}
	}

	fn object_mut(&mut self, value: Value) -> Result<&mut Object> {
		match value {
			Value::Ref(index) => self.heap.get_mut(index).ok_or_else(|| anyhow!("dangling reference {index}")),
			value => bail!("expected a reference, got {value:?}"),
		}
	}

	pub fn rust_string(&self, value: Value) -> Result<String> {
		match self.object(value)? {
			Object::String(units) => Ok(String::from_utf16(units)?),
			object => bail!("expected a string, got {object:?}"),
		}
	}

	fn units(&self, value: Value) -> Result<&[u16]> {
		match self.object(value)? {
			Object::String(units) => Ok(units),
			object => bail!("expected a string, got {object:?}"),
		}
	}

	/// The elements of a list or set, which must all be strings, and if it can be changed.
	pub fn collection(&self, value: Value) -> Result<(Vec<String>, bool)> {
		let (items, modifiable) = match self.object(value)? {
			Object::List { items, modifiable } | Object::Set { items, modifiable } => (items, *modifiable),
			object => bail!("expected a collection, got {object:?}"),
		};
		let strings = items.iter()
			.map(|item| self.rust_string(*item))
			.collect::<Result<_>>()?;
		Ok((strings, modifiable))
	}

	/// Like `Object.equals`, with strings compared by their contents.
	fn java_equals(&self, a: Value, b: Value) -> bool {
		a == b || matches!((self.object(a), self.object(b)), (Ok(Object::String(x)), Ok(Object::String(y))) if x == y)
	}

	/// Runs `code` with `stack` as the operand stack.
	pub fn run(&mut self, code: &InstructionList, stack: Vec<Value>) -> Result<Outcome> {
		let instructions: Vec<&Instruction> = code.iter().collect();
		let target = |label: &Label| -> Result<usize> {
			instructions.iter()
				.position(|i| matches!(i, Instruction::Label(l) if l == label))
				.ok_or_else(|| anyhow!("{label} is not defined"))
		};

		let mut stack = stack;
		let mut locals = vec![Value::Null; 16];
		let mut pc = 0;
		let mut steps = 0;
		while let Some(&instruction) = instructions.get(pc) {
			steps += 1;
			if steps > 1_000_000 {
				bail!("code doesn't terminate");
			}
			pc += 1;

			match instruction {
				Instruction::Label(_) | Instruction::CheckCast(_) => {},
				Instruction::IConstM1 => stack.push(Value::Int(-1)),
				Instruction::IConst0 => stack.push(Value::Int(0)),
				Instruction::IConst1 => stack.push(Value::Int(1)),
				Instruction::IConst2 => stack.push(Value::Int(2)),
				Instruction::IConst3 => stack.push(Value::Int(3)),
				Instruction::IConst4 => stack.push(Value::Int(4)),
				Instruction::IConst5 => stack.push(Value::Int(5)),
				Instruction::BiPush(x) => stack.push(Value::Int(i32::from(*x))),
				Instruction::SiPush(x) => stack.push(Value::Int(i32::from(*x))),
				Instruction::Ldc(Loadable::Integer(x)) => stack.push(Value::Int(*x)),
				Instruction::Ldc(Loadable::String(s)) => {
					let string = self.string(&s.to_string());
					stack.push(string);
				},
				Instruction::ILoad(lv) | Instruction::ALoad(lv) => {
					let value = *locals.get(lv.index as usize).context("local out of range")?;
					stack.push(value);
				},
				Instruction::IStore(lv) | Instruction::AStore(lv) => {
					let value = pop(&mut stack)?;
					*locals.get_mut(lv.index as usize).context("local out of range")? = value;
				},
				Instruction::IInc(lv, by) => {
					let local = locals.get_mut(lv.index as usize).context("local out of range")?;
					match local {
						Value::Int(x) => *x = x.wrapping_add(i32::from(*by)),
						value => bail!("iinc on {value:?}"),
					}
				},
				Instruction::AALoad => {
					let index = pop_int(&mut stack)?;
					let array = pop(&mut stack)?;
					if array == Value::Null {
						return Ok(Outcome::Thrown(NPE.to_owned()));
					}
					let Object::Array(items) = self.object(array)? else { bail!("aaload on a non array") };
					match usize::try_from(index).ok().and_then(|index| items.get(index)) {
						Some(value) => stack.push(*value),
						None => return Ok(Outcome::Thrown("java/lang/ArrayIndexOutOfBoundsException".to_owned())),
					}
				},
				Instruction::AAStore => {
					let value = pop(&mut stack)?;
					let index = pop_int(&mut stack)?;
					let array = pop(&mut stack)?;
					if array == Value::Null {
						return Ok(Outcome::Thrown(NPE.to_owned()));
					}
					let Object::Array(items) = self.object_mut(array)? else { bail!("aastore on a non array") };
					match usize::try_from(index).ok().and_then(|index| items.get_mut(index)) {
						Some(slot) => *slot = value,
						None => return Ok(Outcome::Thrown("java/lang/ArrayIndexOutOfBoundsException".to_owned())),
					}
				},
				Instruction::Pop => { pop(&mut stack)?; },
				Instruction::Pop2 => { pop(&mut stack)?; pop(&mut stack)?; },
				Instruction::Dup => {
					let v1 = pop(&mut stack)?;
					stack.extend([v1, v1]);
				},
				Instruction::DupX1 => {
					let v1 = pop(&mut stack)?;
					let v2 = pop(&mut stack)?;
					stack.extend([v1, v2, v1]);
				},
				Instruction::DupX2 => {
					let v1 = pop(&mut stack)?;
					let v2 = pop(&mut stack)?;
					let v3 = pop(&mut stack)?;
					stack.extend([v1, v3, v2, v1]);
				},
				Instruction::Dup2 => {
					let v1 = pop(&mut stack)?;
					let v2 = pop(&mut stack)?;
					stack.extend([v2, v1, v2, v1]);
				},
				Instruction::Swap => {
					let v1 = pop(&mut stack)?;
					let v2 = pop(&mut stack)?;
					stack.extend([v1, v2]);
				},
				Instruction::IAdd | Instruction::ISub | Instruction::IXor => {
					let b = pop_int(&mut stack)?;
					let a = pop_int(&mut stack)?;
					stack.push(Value::Int(match instruction {
						Instruction::IAdd => a.wrapping_add(b),
						Instruction::ISub => a.wrapping_sub(b),
						_ => a ^ b,
					}));
				},
				Instruction::IfEq(label) | Instruction::IfNe(label) => {
					let x = pop_int(&mut stack)?;
					let jump = if matches!(instruction, Instruction::IfEq(_)) { x == 0 } else { x != 0 };
					if jump {
						pc = target(label)?;
					}
				},
				Instruction::IfICmpEq(label) | Instruction::IfICmpNe(label) |
				Instruction::IfICmpLt(label) | Instruction::IfICmpGe(label) |
				Instruction::IfICmpGt(label) | Instruction::IfICmpLe(label) => {
					let b = pop_int(&mut stack)?;
					let a = pop_int(&mut stack)?;
					let jump = match instruction {
						Instruction::IfICmpEq(_) => a == b,
						Instruction::IfICmpNe(_) => a != b,
						Instruction::IfICmpLt(_) => a < b,
						Instruction::IfICmpGe(_) => a >= b,
						Instruction::IfICmpGt(_) => a > b,
						_ => a <= b,
					};
					if jump {
						pc = target(label)?;
					}
				},
				Instruction::Goto(label) => pc = target(label)?,
				Instruction::New(class) => {
					let object = self.alloc(Object::New(class.to_string()));
					stack.push(object);
				},
				Instruction::ANewArray(_) => {
					let Ok(length) = usize::try_from(pop_int(&mut stack)?) else {
						return Ok(Outcome::Thrown("java/lang/NegativeArraySizeException".to_owned()));
					};
					let array = self.alloc(Object::Array(vec![Value::Null; length]));
					stack.push(array);
				},
				Instruction::ArrayLength => {
					let array = pop(&mut stack)?;
					if array == Value::Null {
						return Ok(Outcome::Thrown(NPE.to_owned()));
					}
					let length = match self.object(array)? {
						Object::Array(items) => items.len(),
						Object::Chars(chars) => chars.len(),
						Object::Bytes(bytes) => bytes.len(),
						object => bail!("arraylength on {object:?}"),
					};
					stack.push(Value::Int(i32::try_from(length)?));
				},
				Instruction::AThrow => {
					let exception = pop(&mut stack)?;
					let (class, message) = match self.object(exception) {
						Ok(Object::Exception { class, message }) => (class.clone(), message.clone()),
						_ => (NPE.to_owned(), None),
					};
					self.message = message;
					return Ok(Outcome::Thrown(class));
				},
				Instruction::GetStatic(field) => {
					if field.class == "java/nio/charset/StandardCharsets" && field.name == "UTF_8" {
						let charset = self.alloc(Object::Charset("UTF-8"));
						stack.push(charset);
					} else {
						bail!("no static field {}.{}", field.class, field.name);
					}
				},
				Instruction::InvokeStatic(method, _) => {
					if let Some(thrown) = self.invoke(method, false, &mut stack)? {
						return Ok(Outcome::Thrown(thrown));
					}
				},
				Instruction::InvokeVirtual(method) | Instruction::InvokeSpecial(method, _) | Instruction::InvokeInterface(method) => {
					if let Some(thrown) = self.invoke(method, true, &mut stack)? {
						return Ok(Outcome::Thrown(thrown));
					}
				},
				instruction => bail!("unsupported instruction {instruction:?}"),
			}
		}
		Ok(Outcome::Returned(stack))
	}

	/// Runs a library method, returning the class of the exception it throws.
	fn invoke(&mut self, method: &MethodRef, instance: bool, stack: &mut Vec<Value>) -> Result<Option<String>> {
		let count = method.desc.parse()?.parameters.len();
		let at = stack.len().checked_sub(count).context("operand stack underflow")?;
		let args = stack.split_off(at);
		let receiver = if instance { pop(stack)? } else { Value::Null };

		if instance && receiver == Value::Null {
			return Ok(Some(NPE.to_owned()));
		}

		let key = format!("{}.{}{}", method.class, method.name, method.desc);
		let mut push = |value: Value| stack.push(value);
		match key.as_str() {
			"java/util/Objects.requireNonNull(Ljava/lang/Object;)Ljava/lang/Object;" => {
				if args[0] == Value::Null {
					return Ok(Some(NPE.to_owned()));
				}
				push(args[0]);
			},
			"java/util/Collections.emptyList()Ljava/util/List;" => {
				push(self.alloc(Object::List { items: Vec::new(), modifiable: false }));
			},
			"java/util/Collections.singletonList(Ljava/lang/Object;)Ljava/util/List;" => {
				push(self.alloc(Object::List { items: args, modifiable: false }));
			},
			"java/util/Collections.emptySet()Ljava/util/Set;" => {
				push(self.alloc(Object::Set { items: Vec::new(), modifiable: false }));
			},
			"java/util/Collections.singleton(Ljava/lang/Object;)Ljava/util/Set;" => {
				push(self.alloc(Object::Set { items: args, modifiable: false }));
			},
			"java/util/Collections.reverse(Ljava/util/List;)V" => {
				match self.object_mut(args[0])? {
					Object::List { items, .. } => items.reverse(),
					object => bail!("reverse of {object:?}"),
				}
			},
			"java/util/Collections.unmodifiableList(Ljava/util/List;)Ljava/util/List;" |
			"java/util/Collections.unmodifiableSet(Ljava/util/Set;)Ljava/util/Set;" => {
				let unmodifiable = match self.object(args[0])? {
					Object::List { items, .. } => Object::List { items: items.clone(), modifiable: false },
					Object::Set { items, .. } => Object::Set { items: items.clone(), modifiable: false },
					object => bail!("{key} of {object:?}"),
				};
				push(self.alloc(unmodifiable));
			},
			"java/util/Arrays.asList([Ljava/lang/Object;)Ljava/util/List;" => {
				if args[0] == Value::Null {
					return Ok(Some(NPE.to_owned()));
				}
				let Object::Array(items) = self.object(args[0])? else { bail!("asList of a non array") };
				let list = Object::List { items: items.clone(), modifiable: false };
				push(self.alloc(list));
			},
			"java/util/ArrayList.<init>(I)V" => {
				*self.object_mut(receiver)? = Object::List { items: Vec::new(), modifiable: true };
			},
			"java/util/HashSet.<init>(I)V" | "java/util/HashSet.<init>()V" => {
				*self.object_mut(receiver)? = Object::Set { items: Vec::new(), modifiable: true };
			},
			"java/util/List.add(Ljava/lang/Object;)Z" => {
				match self.object_mut(receiver)? {
					Object::List { items, modifiable: true } => items.push(args[0]),
					Object::List { .. } => return Ok(Some(UOE.to_owned())),
					object => bail!("List.add on {object:?}"),
				}
				push(Value::Int(1));
			},
			"java/util/Set.add(Ljava/lang/Object;)Z" => {
				let Object::Set { items, modifiable } = self.object(receiver)? else { bail!("Set.add on a non set") };
				if !modifiable {
					return Ok(Some(UOE.to_owned()));
				}
				let present = items.iter().any(|item| self.java_equals(*item, args[0]));
				if !present {
					if let Object::Set { items, .. } = self.object_mut(receiver)? {
						items.push(args[0]);
					}
				}
				push(Value::Int(if present { 0 } else { 1 }));
			},
			"java/util/AbstractMap$SimpleImmutableEntry.<init>(Ljava/lang/Object;Ljava/lang/Object;)V" => {
				*self.object_mut(receiver)? = Object::Entry(args[0], args[1]);
			},
			"java/util/Map$Entry.setValue(Ljava/lang/Object;)Ljava/lang/Object;" => {
				match self.object(receiver)? {
					Object::Entry(..) => return Ok(Some(UOE.to_owned())),
					object => bail!("setValue on {object:?}"),
				}
			},
			"java/lang/IllegalArgumentException.<init>(Ljava/lang/String;)V" => {
				let message = match args[0] {
					Value::Null => None,
					value => Some(self.rust_string(value)?),
				};
				*self.object_mut(receiver)? = Object::Exception { class: IAE.to_owned(), message };
			},
			"java/lang/StringBuilder.<init>(Ljava/lang/String;)V" => {
				let units = self.units(args[0])?.to_vec();
				*self.object_mut(receiver)? = Object::Builder(units);
			},
			"java/lang/StringBuilder.append(Ljava/lang/Object;)Ljava/lang/StringBuilder;" => {
				let appended: Vec<u16> = match args[0] {
					Value::Null => "null".encode_utf16().collect(),
					value => self.units(value)?.to_vec(),
				};
				match self.object_mut(receiver)? {
					Object::Builder(units) => units.extend(appended),
					object => bail!("append on {object:?}"),
				}
				push(receiver);
			},
			"java/lang/StringBuilder.toString()Ljava/lang/String;" => {
				let Object::Builder(units) = self.object(receiver)? else { bail!("toString on a non builder") };
				let string = Object::String(units.clone());
				push(self.alloc(string));
			},
			"java/lang/String.length()I" => {
				let length = self.units(receiver)?.len();
				push(Value::Int(i32::try_from(length)?));
			},
			"java/lang/String.codePointAt(I)I" | "java/lang/String.codePointBefore(I)I" => {
				let Value::Int(index) = args[0] else { bail!("expected an int index") };
				let units = self.units(receiver)?;
				let code_point = usize::try_from(index).ok().and_then(|index| if method.name == "codePointAt" {
					code_point_at(units, index)
				} else {
					code_point_before(units, index)
				});
				match code_point {
					Some(code_point) => push(Value::Int(i32::try_from(code_point)?)),
					None => return Ok(Some("java/lang/StringIndexOutOfBoundsException".to_owned())),
				}
			},
			"java/lang/String.substring(II)Ljava/lang/String;" => {
				let (Value::Int(start), Value::Int(end)) = (args[0], args[1]) else { bail!("expected int bounds") };
				let units = self.units(receiver)?;
				let (Ok(start), Ok(end)) = (usize::try_from(start), usize::try_from(end)) else {
					return Ok(Some("java/lang/StringIndexOutOfBoundsException".to_owned()));
				};
				if start > end || end > units.len() {
					return Ok(Some("java/lang/StringIndexOutOfBoundsException".to_owned()));
				}
				let sub = units[start..end].to_vec();
				push(self.alloc(Object::String(sub)));
			},
			"java/lang/String.<init>([BLjava/nio/charset/Charset;)V" => {
				let Object::Bytes(bytes) = self.object(args[0])? else { bail!("expected a byte array") };
				let units = match self.object(args[1])? {
					Object::Charset("UTF-8") => String::from_utf8_lossy(bytes).encode_utf16().collect(),
					Object::Charset("UTF-16BE") => bytes.chunks(2)
						.map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
						.collect(),
					object => bail!("unsupported charset {object:?}"),
				};
				*self.object_mut(receiver)? = Object::String(units);
			},
			"java/lang/String.valueOf([C)Ljava/lang/String;" => {
				let Object::Chars(chars) = self.object(args[0])? else { bail!("expected a char array") };
				let string = Object::String(chars.clone());
				push(self.alloc(string));
			},
			"java/lang/Character.isWhitespace(I)Z" => {
				let Value::Int(code_point) = args[0] else { bail!("expected an int") };
				let whitespace = u32::try_from(code_point).is_ok_and(java_is_whitespace);
				push(Value::Int(i32::from(whitespace)));
			},
			"java/lang/Character.charCount(I)I" => {
				let Value::Int(code_point) = args[0] else { bail!("expected an int") };
				push(Value::Int(if code_point >= 0x10000 { 2 } else { 1 }));
			},
			"java/lang/Character.toChars(I)[C" => {
				let Value::Int(code_point) = args[0] else { bail!("expected an int") };
				let Some(c) = u32::try_from(code_point).ok().and_then(char::from_u32) else {
					return Ok(Some(IAE.to_owned()));
				};
				let mut buffer = [0; 2];
				let chars = c.encode_utf16(&mut buffer).to_vec();
				push(self.alloc(Object::Chars(chars)));
			},
			"java/nio/file/Files.readAllBytes(Ljava/nio/file/Path;)[B" => {
				if args[0] == Value::Null {
					return Ok(Some(NPE.to_owned()));
				}
				let Object::Path(path) = self.object(args[0])? else { bail!("expected a path") };
				match std::fs::read(path) {
					Ok(bytes) => push(self.alloc(Object::Bytes(bytes))),
					Err(_) => return Ok(Some("java/io/IOException".to_owned())),
				}
			},
			_ => bail!("no library method {key}"),
		}
		Ok(None)
	}
}
