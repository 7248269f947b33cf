pub mod editing;
pub mod error;
pub mod io;
pub mod suggestion;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::{AnnotatedDocument, Patch, PatchId, PatchLog, SelectionEvent, render};
pub use error::*;
pub use io::{DocumentId, DocumentStore, FileStore, MemoryStore};
pub use suggestion::*;
