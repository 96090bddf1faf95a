//! The minimal surface the AST itself needs from an external storage: just
//! enough to fetch the contents a `StoredItems` node refers to, and
//! optionally hand the whole AST to a native translator. The friendlier,
//! blanket-implemented `Storage` trait hosts actually implement against
//! lives in the `rquery` crate, which re-exports `StorageHandle` under that
//! name; see `rquery::storage`.

use std::fmt;

use crate::error::Result;
use crate::node::Node;
use crate::value::Value;

pub type LazySeq<'a> = Box<dyn Iterator<Item = Result<Value>> + 'a>;

/// What a backend must satisfy to be considered "native" (§4.6): accept a
/// well-formed AST rooted at the `StoredItems` it was found through, and
/// either answer it or decline with `ErrorKind::UnsupportedByBackend`.
pub trait Translator: fmt::Debug {
    fn execute(&self, ast: &Node) -> Result<Value>;
}

/// Identity + data access for a `StoredItems` reference. A storage backend
/// implements this (directly, or via `rquery::Storage`'s blanket impl) and
/// is wrapped in an `Rc` before being embedded in a node, so two references
/// to "the same storage" compare equal by pointer identity (see
/// `NodeKind`'s hand-written `PartialEq`).
pub trait StorageHandle: fmt::Debug {
    fn items(&self) -> LazySeq<'_>;

    fn translator(&self) -> Option<&dyn Translator> {
        None
    }
}
