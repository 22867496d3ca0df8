//! A tree model of java class files, made for rewriting method bodies in place.
//!
//! The model is centered around [`ClassFile`][tree::class::ClassFile]. Method bodies are stored as an
//! [`InstructionList`][tree::method::code::InstructionList], an arena of instructions with stable ids and
//! symbolic [`Label`][tree::method::code::Label]s, so that code can be spliced without invalidating any
//! jump targets.
//!
//! Reading and writing the binary format is not done here, see [`ClassCodec`][codec::ClassCodec] for the
//! interface an implementation of that has to provide.

pub mod analysis;
pub mod codec;
pub mod tree;

mod macros;
