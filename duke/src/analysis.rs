//! Operand stack height analysis over [`InstructionList`]s.
//!
//! This doesn't track types, only the number of slots on the operand stack. That's enough to
//! compute `max_stack` and to check that a piece of code takes and leaves the right amount of values.

use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use crate::tree::method::code::{Code, Instruction, InstructionList, Label};

/// How control continues after an instruction.
enum Flow {
	/// Continues with the next instruction.
	Next,
	/// Continues at one of the labels, never with the next instruction.
	Jump(Vec<Label>),
	/// Continues at the label or with the next instruction.
	Branch(Vec<Label>),
	/// Calls the subroutine at the label, and continues with the next instruction once it returns.
	Subroutine(Label),
	/// Leaves the code.
	Terminal,
}

fn flow(instruction: &Instruction) -> Flow {
	use Instruction::*;
	match instruction {
		Goto(_) | TableSwitch { .. } | LookupSwitch { .. } => Flow::Jump(instruction.jump_targets()),
		IfEq(_) | IfNe(_) | IfLt(_) | IfGe(_) | IfGt(_) | IfLe(_) |
		IfICmpEq(_) | IfICmpNe(_) | IfICmpLt(_) | IfICmpGe(_) | IfICmpGt(_) | IfICmpLe(_) |
		IfACmpEq(_) | IfACmpNe(_) | IfNull(_) | IfNonNull(_) => Flow::Branch(instruction.jump_targets()),
		Jsr(target) => Flow::Subroutine(*target),
		IReturn | LReturn | FReturn | DReturn | AReturn | Return | AThrow | Ret(_) => Flow::Terminal,
		_ => Flow::Next,
	}
}

struct Walk {
	/// The lowest height reached, counted from the entry height, so `0` or negative.
	lowest: i32,
	/// The highest height reached.
	highest: i32,
	/// The height when falling through the end of the code.
	exit: Option<i32>,
}

/// Follows control flow from each root, recording the height before every reachable instruction.
fn walk(instructions: &[&Instruction], roots: &[(usize, i32)]) -> Result<Walk> {
	let mut labels = IndexMap::new();
	for (index, instruction) in instructions.iter().enumerate() {
		if let Instruction::Label(label) = instruction {
			labels.insert(*label, index);
		}
	}
	let position = |label: &Label| -> Result<usize> {
		labels.get(label).copied()
			.ok_or_else(|| anyhow!("jump to {label}, which is not defined"))
	};

	let mut heights: Vec<Option<i32>> = vec![None; instructions.len()];
	let mut walk = Walk { lowest: 0, highest: 0, exit: None };
	let mut queue: Vec<(usize, i32)> = roots.to_vec();

	while let Some((index, height)) = queue.pop() {
		if index == instructions.len() {
			match walk.exit {
				Some(exit) if exit != height => bail!("inconsistent stack height at the end of the code: {exit} and {height}"),
				_ => walk.exit = Some(height),
			}
			continue;
		}

		let Some(instruction) = instructions.get(index) else {
			bail!("control flow leaves the code at index {index}");
		};
		match heights[index] {
			Some(known) if known == height => continue,
			Some(known) => bail!("inconsistent stack height before {instruction:?} (index {index}): {known} and {height}"),
			None => heights[index] = Some(height),
		}

		let (popped, pushed) = instruction.stack_effect()?;
		let after_pop = height - i32::from(popped);
		let after = after_pop + i32::from(pushed);
		walk.lowest = walk.lowest.min(after_pop);
		walk.highest = walk.highest.max(after);

		match flow(instruction) {
			Flow::Next => queue.push((index + 1, after)),
			Flow::Jump(targets) => {
				for target in &targets {
					queue.push((position(target)?, after));
				}
			},
			Flow::Branch(targets) => {
				for target in &targets {
					queue.push((position(target)?, after));
				}
				queue.push((index + 1, after));
			},
			Flow::Subroutine(target) => {
				// the return address is only on the stack inside the subroutine
				queue.push((position(&target)?, after));
				queue.push((index + 1, height));
			},
			Flow::Terminal => {},
		}
	}

	Ok(walk)
}

/// The effect a piece of code has on the operand stack, when run from start to end.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StackEffect {
	/// The number of slots taken from the stack the code was entered with.
	pub consumed: u16,
	/// The number of slots left on the stack, on top of the ones not consumed.
	pub produced: u16,
	/// The largest number of slots used at once, counted from the bottom of the consumed slots.
	pub max_depth: u16,
}

impl StackEffect {
	/// Computes the stack effect of a fragment of code, like a replacement for a single instruction.
	///
	/// The code must have a single stack height at its end, and must be able to reach its end.
	pub fn of(list: &InstructionList) -> Result<StackEffect> {
		let instructions: Vec<&Instruction> = list.iter().collect();
		let walk = walk(&instructions, &[(0, 0)])?;

		let exit = walk.exit
			.ok_or_else(|| anyhow!("code never reaches its end"))?;

		let consumed = -walk.lowest;
		let to_u16 = |x: i32| u16::try_from(x).with_context(|| anyhow!("stack height {x} out of range"));
		Ok(StackEffect {
			consumed: to_u16(consumed)?,
			produced: to_u16(exit + consumed)?,
			max_depth: to_u16(walk.highest + consumed)?,
		})
	}
}

/// Computes the `max_stack` of a method body, entering exception handlers with the exception on the stack.
pub fn max_stack(code: &Code) -> Result<u16> {
	let instructions: Vec<&Instruction> = code.instructions.iter().collect();

	let mut roots = vec![(0, 0)];
	for exception in &code.exception_table {
		let handler = instructions.iter()
			.position(|i| matches!(i, Instruction::Label(label) if *label == exception.handler))
			.ok_or_else(|| anyhow!("exception handler {} is not defined", exception.handler))?;
		roots.push((handler, 1));
	}

	let walk = walk(&instructions, &roots)?;
	if walk.lowest < 0 {
		bail!("operand stack underflow, the code takes {} slots it never pushed", -walk.lowest);
	}
	u16::try_from(walk.highest)
		.with_context(|| anyhow!("max stack of {} doesn't fit into an u16", walk.highest))
}
