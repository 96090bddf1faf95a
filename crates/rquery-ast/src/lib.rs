//! The AST for the rquery embedded query algebra: node taxonomy, the
//! `Value` result type, operator enums, the fluent builder surface,
//! structural traversal/rewrite, and the error type. Pure data and
//! construction logic -- no execution, no storage I/O -- analogous to how
//! `prqlc-ast` holds `Expr`/`ExprKind` independent of `prqlc`'s resolver
//! and codegen.

mod builder;
mod error;
mod fold;
mod node;
mod ops;
mod storage;
mod value;

pub use builder::{list, lift, mapping, tuple, Context};
pub use error::{Error, ErrorKind, Result};
pub use fold::{copy_replace, fold_node, NodeFold};
pub use node::{stored_items, CollectionKind, Node, NodeKind};
pub use ops::{ArithOp, CmpOp, LogicOp};
pub use storage::{LazySeq, StorageHandle, Translator};
pub use value::Value;
