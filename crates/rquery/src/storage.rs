//! The friendlier name backend collaborators implement against. Re-exports
//! `rquery_ast::StorageHandle` rather than defining a new trait with a
//! blanket impl: a cross-crate `impl<S: StorageHandle> Storage for S` (or
//! the reverse) would need either `Storage` or `S` to be local in a way
//! that satisfies the orphan rules, and neither does, since `StorageHandle`
//! is foreign here and `S` is an unconstrained-by-locality type parameter.

pub use rquery_ast::{LazySeq, StorageHandle as Storage, Translator};
