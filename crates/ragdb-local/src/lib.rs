//! ragdb-local
//!
//! In-process `SearchBackend`: documents and vectors live in memory, lexical
//! scoring uses a RAM tantivy index. Used for offline runs and tests.
pub mod lexical;
pub mod predicate;
pub mod store;
pub mod tantivy_utils;

pub use lexical::LexicalIndex;
pub use store::LocalBackend;
