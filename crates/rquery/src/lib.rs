//! Context stack, in-memory executor, and backend dispatch for the rquery
//! embedded query algebra. Paired with `rquery-ast`, this plays the role
//! `prqlc` plays against `prqlc-ast`: the side that actually runs a query,
//! as opposed to the side that only describes one.

mod context;
mod dispatch;
mod exec;
mod storage;

pub use context::ContextStack;
pub use dispatch::{execute_with, ExecOptions, Executable};
pub use exec::eval;
pub use storage::{LazySeq, Storage, Translator};

pub use rquery_ast::{
    list, lift, mapping, tuple, stored_items, ArithOp, CmpOp, Context, Error, ErrorKind, LogicOp,
    Node, NodeKind, Result, Value,
};
