//! `String.isBlank`, `String.strip`, `String.stripLeading` and `String.stripTrailing`, added in java 11.
//!
//! All of them are replaced by loops over the code points of the string, using `Character.isWhitespace(int)`,
//! which is what java 11 uses to define whitespace for these methods.

use anyhow::Result;
use duke::tree::method::code::{Instruction, InstructionList, LvIndex};
use crate::context::ReplaceContext;
use crate::synth::{invoke_static, invoke_virtual};

const STRING: &str = "java/lang/String";

struct Scan {
	string: LvIndex,
	start: LvIndex,
	end: LvIndex,
	code_point: LvIndex,
}

impl Scan {
	/// Stores the string from the stack and sets up `start = 0` and `end = string.length()`.
	///
	/// A `null` string throws a `NullPointerException` here, just like calling the method on it would.
	fn begin(context: &mut ReplaceContext<'_>, list: &mut InstructionList) -> Result<Scan> {
		let scan = Scan {
			string: context.allocate_local(1)?,
			start: context.allocate_local(1)?,
			end: context.allocate_local(1)?,
			code_point: context.allocate_local(1)?,
		};
		context.require_frames();

		list.try_extend([
			// String
			Instruction::AStore(scan.string),
			//
			Instruction::IConst0,
			Instruction::IStore(scan.start),
			Instruction::ALoad(scan.string),
			invoke_virtual(STRING, "length", "()I"),
			Instruction::IStore(scan.end),
			//
		])?;
		Ok(scan)
	}

	/// Moves `start` forward over whitespace code points, but never past `end`.
	fn skip_leading(&self, list: &mut InstructionList) -> Result<()> {
		let head = list.new_label();
		let done = list.new_label();
		list.try_extend([
			Instruction::Label(head),
			Instruction::ILoad(self.start),
			Instruction::ILoad(self.end),
			Instruction::IfICmpGe(done),
			Instruction::ALoad(self.string),
			Instruction::ILoad(self.start),
			invoke_virtual(STRING, "codePointAt", "(I)I"),
			Instruction::IStore(self.code_point),
			Instruction::ILoad(self.code_point),
			invoke_static("java/lang/Character", "isWhitespace", "(I)Z"),
			Instruction::IfEq(done),
			Instruction::ILoad(self.start),
			Instruction::ILoad(self.code_point),
			invoke_static("java/lang/Character", "charCount", "(I)I"),
			Instruction::IAdd,
			Instruction::IStore(self.start),
			Instruction::Goto(head),
			Instruction::Label(done),
		])
	}

	/// Moves `end` backward over whitespace code points, but never before `start`.
	fn skip_trailing(&self, list: &mut InstructionList) -> Result<()> {
		let head = list.new_label();
		let done = list.new_label();
		list.try_extend([
			Instruction::Label(head),
			Instruction::ILoad(self.end),
			Instruction::ILoad(self.start),
			Instruction::IfICmpLe(done),
			Instruction::ALoad(self.string),
			Instruction::ILoad(self.end),
			invoke_virtual(STRING, "codePointBefore", "(I)I"),
			Instruction::IStore(self.code_point),
			Instruction::ILoad(self.code_point),
			invoke_static("java/lang/Character", "isWhitespace", "(I)Z"),
			Instruction::IfEq(done),
			Instruction::ILoad(self.end),
			Instruction::ILoad(self.code_point),
			invoke_static("java/lang/Character", "charCount", "(I)I"),
			Instruction::ISub,
			Instruction::IStore(self.end),
			Instruction::Goto(head),
			Instruction::Label(done),
		])
	}

	/// Pushes `string.substring(start, end)`.
	fn substring(&self, list: &mut InstructionList) -> Result<()> {
		list.try_extend([
			//
			Instruction::ALoad(self.string),
			Instruction::ILoad(self.start),
			Instruction::ILoad(self.end),
			// String int int
			invoke_virtual(STRING, "substring", "(II)Ljava/lang/String;"),
			// String
		])
	}
}

/// Replaces `String.isBlank()` with a scan for the first code point that isn't whitespace.
pub fn is_blank(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "()Z" {
		return Err(context.unsupported());
	}

	let mut list = InstructionList::new();
	let scan = Scan::begin(context, &mut list)?;
	scan.skip_leading(&mut list)?;

	let not_blank = list.new_label();
	let end = list.new_label();
	list.try_extend([
		//
		Instruction::ILoad(scan.start),
		Instruction::ILoad(scan.end),
		Instruction::IfICmpLt(not_blank),
		Instruction::IConst1,
		Instruction::Goto(end),
		Instruction::Label(not_blank),
		Instruction::IConst0,
		Instruction::Label(end),
		// boolean
	])?;
	Ok(list)
}

/// Replaces `String.strip()`, cutting whitespace code points off both ends.
pub fn strip(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "()Ljava/lang/String;" {
		return Err(context.unsupported());
	}

	let mut list = InstructionList::new();
	let scan = Scan::begin(context, &mut list)?;
	scan.skip_leading(&mut list)?;
	scan.skip_trailing(&mut list)?;
	scan.substring(&mut list)?;
	Ok(list)
}

/// Replaces `String.stripLeading()`.
pub fn strip_leading(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "()Ljava/lang/String;" {
		return Err(context.unsupported());
	}

	let mut list = InstructionList::new();
	let scan = Scan::begin(context, &mut list)?;
	scan.skip_leading(&mut list)?;
	scan.substring(&mut list)?;
	Ok(list)
}

/// Replaces `String.stripTrailing()`.
pub fn strip_trailing(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "()Ljava/lang/String;" {
		return Err(context.unsupported());
	}

	let mut list = InstructionList::new();
	let scan = Scan::begin(context, &mut list)?;
	scan.skip_trailing(&mut list)?;
	scan.substring(&mut list)?;
	Ok(list)
}
