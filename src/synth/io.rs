//! Replacements for methods of `java.io`, `java.nio.file` and `java.util.zip`.
//!
//! Some of these call into shim classes of the `dukedown/runtime` package, which must be shipped
//! together with the downgraded classes.

use anyhow::Result;
use duke::analysis::max_stack;
use duke::tree::class::ClassName;
use duke::tree::method::code::{Code, Exception, Instruction, InstructionList, Label, Loadable, LvIndex};
use duke::tree::method::{Method, MethodAccess, MethodDescriptor, MethodName, MethodRef};
use crate::context::ReplaceContext;
use crate::synth::{call_static_shim, get_static, invoke_interface, invoke_special, invoke_static, invoke_virtual, new, require_non_null};

pub const INFLATER_SHIM: &str = "dukedown/runtime/java/util/zip/Inflater";
pub const DEFLATER_SHIM: &str = "dukedown/runtime/java/util/zip/Deflater";
pub const INPUT_STREAM_SHIM: &str = "dukedown/runtime/java/io/InputStream";
pub const NULL_OUTPUT_STREAM_SHIM: &str = "dukedown/runtime/java/io/NullOutputStream";

pub const NEW_FILE_SYSTEM_HELPER: &str = "dukedown$newFileSystem";
pub const NEW_FILE_SYSTEM_DESC: &str = "(Ljava/nio/file/Path;Ljava/util/Map;Ljava/lang/ClassLoader;)Ljava/nio/file/FileSystem;";

/// Replaces `Files.readString(Path)` and `Files.readString(Path, Charset)` with reading all bytes and decoding them.
///
/// Unlike the java 11 method, malformed input is replaced instead of throwing. This is reported as a
/// diagnostic, as code catching the `MalformedInputException` now silently gets a different string.
pub fn files_read_string(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	let read_all_bytes = || invoke_static("java/nio/file/Files", "readAllBytes", "(Ljava/nio/file/Path;)[B");

	let mut list = match context.descriptor().as_str() {
		"(Ljava/nio/file/Path;)Ljava/lang/String;" => InstructionList::from(vec![
			// Path
			read_all_bytes(),
			get_static("java/nio/charset/StandardCharsets", "UTF_8", "Ljava/nio/charset/Charset;"),
			// byte[] Charset
		]),
		"(Ljava/nio/file/Path;Ljava/nio/charset/Charset;)Ljava/lang/String;" => InstructionList::from(vec![
			// Path Charset
			Instruction::Swap,
			read_all_bytes(),
			Instruction::Swap,
			// byte[] Charset
		]),
		_ => return Err(context.unsupported()),
	};
	list.try_extend([
		// byte[] Charset
		new("java/lang/String"),
		Instruction::DupX2,
		Instruction::DupX2,
		Instruction::Pop,
		// String String byte[] Charset
		invoke_special("java/lang/String", "<init>", "([BLjava/nio/charset/Charset;)V"),
		// String
	])?;
	context.diagnostic(format!("{} now replaces malformed input instead of throwing a MalformedInputException", context.site));
	Ok(list)
}

/// Replaces `Inflater.setInput(ByteBuffer)` and `Inflater.inflate(ByteBuffer)`.
pub fn inflater(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	match context.descriptor().as_str() {
		"(Ljava/nio/ByteBuffer;)V" | "(Ljava/nio/ByteBuffer;)I" => call_static_shim(context, INFLATER_SHIM),
		_ => Err(context.unsupported()),
	}
}

/// Replaces `Deflater.setInput(ByteBuffer)` and `Deflater.deflate(ByteBuffer)`.
pub fn deflater(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	match context.descriptor().as_str() {
		"(Ljava/nio/ByteBuffer;)V" | "(Ljava/nio/ByteBuffer;)I" => call_static_shim(context, DEFLATER_SHIM),
		_ => Err(context.unsupported()),
	}
}

/// Replaces `InputStream.readAllBytes()` and `InputStream.transferTo(OutputStream)`.
pub fn input_stream(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	match (context.site.name().as_str(), context.descriptor().as_str()) {
		("readAllBytes", "()[B") | ("transferTo", "(Ljava/io/OutputStream;)J") => call_static_shim(context, INPUT_STREAM_SHIM),
		_ => Err(context.unsupported()),
	}
}

/// Replaces `OutputStream.nullOutputStream()` with a new instance of an output stream discarding everything.
pub fn null_output_stream(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	if context.descriptor() != "()Ljava/io/OutputStream;" {
		return Err(context.unsupported());
	}

	context.add_dependency(ClassName::from_static(NULL_OUTPUT_STREAM_SHIM));
	Ok(InstructionList::from(vec![
		new(NULL_OUTPUT_STREAM_SHIM),
		Instruction::Dup,
		invoke_special(NULL_OUTPUT_STREAM_SHIM, "<init>", "()V"),
	]))
}

/// Replaces `FileSystems.newFileSystem(Path)`, `(Path, Map)` and `(Path, Map, ClassLoader)` with a call of a
/// helper method added to the class.
///
/// Missing arguments default to an empty map and no class loader.
pub fn file_systems_new_file_system(context: &mut ReplaceContext<'_>) -> Result<InstructionList> {
	let mut list = match context.descriptor().as_str() {
		"(Ljava/nio/file/Path;)Ljava/nio/file/FileSystem;" => InstructionList::from(vec![
			// Path
			invoke_static("java/util/Collections", "emptyMap", "()Ljava/util/Map;"),
			Instruction::AConstNull,
			// Path Map null
		]),
		"(Ljava/nio/file/Path;Ljava/util/Map;)Ljava/nio/file/FileSystem;" => InstructionList::from(vec![
			Instruction::AConstNull,
		]),
		"(Ljava/nio/file/Path;Ljava/util/Map;Ljava/lang/ClassLoader;)Ljava/nio/file/FileSystem;" => InstructionList::new(),
		_ => return Err(context.unsupported()),
	};

	let interface = context.class.access.is_interface;
	let helper = MethodRef {
		class: context.class.name.clone(),
		name: MethodName::from_static(NEW_FILE_SYSTEM_HELPER),
		desc: MethodDescriptor::from_static(NEW_FILE_SYSTEM_DESC),
	};
	list.push(Instruction::InvokeStatic(helper, interface))?;

	context.add_helper(new_file_system_helper(interface)?);
	context.require_frames();
	Ok(list)
}

/// Tries each provider of the iterator in `iterator`, returning the file system of the first one not throwing
/// an `UnsupportedOperationException`. Continues at `done` once all are tried.
fn try_providers(list: &mut InstructionList, exception_table: &mut Vec<Exception>, iterator: LvIndex, done: Label) -> Result<()> {
	const PROVIDER: &str = "java/nio/file/spi/FileSystemProvider";
	let provider = LvIndex { index: iterator.index + 1 };

	let head = list.new_label();
	let start = list.new_label();
	let end = list.new_label();
	let handler = list.new_label();
	exception_table.push(Exception {
		start,
		end,
		handler,
		catch: Some(ClassName::from_static("java/lang/UnsupportedOperationException")),
	});

	list.try_extend([
		Instruction::Label(head),
		Instruction::ALoad(iterator),
		invoke_interface("java/util/Iterator", "hasNext", "()Z"),
		Instruction::IfEq(done),
		Instruction::ALoad(iterator),
		invoke_interface("java/util/Iterator", "next", "()Ljava/lang/Object;"),
		Instruction::CheckCast(ClassName::from_static(PROVIDER)),
		Instruction::AStore(provider),
		Instruction::Label(start),
		Instruction::ALoad(provider),
		Instruction::ALoad(LvIndex { index: 0 }),
		Instruction::ALoad(LvIndex { index: 1 }),
		invoke_virtual(PROVIDER, "newFileSystem", "(Ljava/nio/file/Path;Ljava/util/Map;)Ljava/nio/file/FileSystem;"),
		Instruction::Label(end),
		Instruction::AReturn,
		Instruction::Label(handler),
		// UnsupportedOperationException
		Instruction::Pop,
		Instruction::Goto(head),
	])
}

/// The helper method for [`file_systems_new_file_system`], taking a path, an environment and a class loader.
///
/// The installed providers are asked first, then the ones the class loader finds, if it's not `null`.
/// Without any provider for the path a `ProviderNotFoundException` is thrown.
fn new_file_system_helper(interface: bool) -> Result<Method> {
	const NOT_FOUND: &str = "java/nio/file/ProviderNotFoundException";
	let loader = LvIndex { index: 2 };
	let iterator = LvIndex { index: 3 };

	let mut list = InstructionList::new();
	let mut exception_table = Vec::new();
	let installed_tried = list.new_label();
	let not_found = list.new_label();

	list.try_extend([
		Instruction::ALoad(LvIndex { index: 0 }),
		require_non_null(),
		Instruction::Pop,
		invoke_static("java/nio/file/spi/FileSystemProvider", "installedProviders", "()Ljava/util/List;"),
		invoke_interface("java/util/List", "iterator", "()Ljava/util/Iterator;"),
		Instruction::AStore(iterator),
	])?;
	try_providers(&mut list, &mut exception_table, iterator, installed_tried)?;
	list.try_extend([
		Instruction::Label(installed_tried),
		Instruction::ALoad(loader),
		Instruction::IfNull(not_found),
		Instruction::Ldc(Loadable::Class(ClassName::from_static("java/nio/file/spi/FileSystemProvider"))),
		Instruction::ALoad(loader),
		invoke_static("java/util/ServiceLoader", "load", "(Ljava/lang/Class;Ljava/lang/ClassLoader;)Ljava/util/ServiceLoader;"),
		invoke_virtual("java/util/ServiceLoader", "iterator", "()Ljava/util/Iterator;"),
		Instruction::AStore(iterator),
	])?;
	try_providers(&mut list, &mut exception_table, iterator, not_found)?;
	list.try_extend([
		Instruction::Label(not_found),
		new(NOT_FOUND),
		Instruction::Dup,
		Instruction::Ldc(Loadable::string("Provider not found")),
		invoke_special(NOT_FOUND, "<init>", "(Ljava/lang/String;)V"),
		Instruction::AThrow,
	])?;

	let mut code = Code::new(list);
	code.exception_table = exception_table;
	code.max_locals = Some(5);
	code.max_stack = Some(max_stack(&code)?);

	// private static synthetic, and public for interfaces, which can't have private methods before java 9
	let access = if interface { 0x1009 } else { 0x100a };
	let mut method = Method::new(MethodAccess::from(access), MethodName::from_static(NEW_FILE_SYSTEM_HELPER), MethodDescriptor::from_static(NEW_FILE_SYSTEM_DESC));
	method.code = Some(code);
	Ok(method)
}
