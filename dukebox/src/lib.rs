//! Crate for reading and writing the files a downgrade works on: jars, directories of class files, and
//! the runtime support classes that get copied next to downgraded code.
//!
//! Batches of files are read from an [`EntrySource`] and written into an [`EntrySink`]. Jars are
//! opened with [`with_archive`], which closes them again on every exit path.

pub mod archive;
pub mod dir;
mod entry;
pub mod provider;
pub mod runtime;

pub use archive::{with_archive, with_output_archive, ArchiveDir, ZipSink};
pub use entry::{Entry, EntrySink, EntrySource};
