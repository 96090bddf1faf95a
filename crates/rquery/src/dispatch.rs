//! Backend dispatch (§4.6): decide whether an AST can be handed off to a
//! storage-native `Translator`, falling back transparently to the
//! in-memory executor when it can't (or declines).

use rquery_ast::{ErrorKind, Node, NodeKind, Result, Value};

use crate::context::ContextStack;
use crate::exec::eval;
use crate::storage::Storage;

/// Threaded through `execute_with`; lets a host force in-memory evaluation
/// (e.g. to compare backend and fallback output for parity testing).
#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    pub allow_backend_dispatch: bool,
}

impl Default for ExecOptions {
    fn default() -> ExecOptions {
        ExecOptions {
            allow_backend_dispatch: true,
        }
    }
}

/// The deepest `subject` reachable by following only the unary/projection/
/// sequence-operator family -- never a `Binary`/`Compare`/`Logic`/`Regex`'s
/// second operand, nor a `Groupby`'s aggregates. This identifies the AST's
/// input source for dispatch purposes.
fn chain_leaf(node: &Node) -> &Node {
    match node.as_ref() {
        NodeKind::Not(s)
        | NodeKind::Neg(s)
        | NodeKind::Str(s)
        | NodeKind::Lower(s)
        | NodeKind::Upper(s)
        | NodeKind::Sum(s)
        | NodeKind::Min(s)
        | NodeKind::Max(s)
        | NodeKind::Len(s)
        | NodeKind::Distinct(s)
        | NodeKind::Attribute(s, _)
        | NodeKind::Index(s, _)
        | NodeKind::Slice(s, ..)
        | NodeKind::Filter(s, _)
        | NodeKind::Map(s, _)
        | NodeKind::Sort(s, _)
        | NodeKind::Groupby(s, ..)
        | NodeKind::One(s, _) => chain_leaf(s),
        _ => node,
    }
}

pub fn execute_with(root: &Node, storage: &dyn Storage, opts: &ExecOptions) -> Result<Value> {
    if opts.allow_backend_dispatch {
        if let NodeKind::StoredItems(_) = chain_leaf(root).as_ref() {
            if let Some(translator) = storage.translator() {
                match translator.execute(root) {
                    Ok(value) => return Ok(value),
                    Err(e) if e.kind == ErrorKind::UnsupportedByBackend => {
                        log::debug!("backend declined AST ({}), falling back in-memory", e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
    let mut ctx = ContextStack::new();
    eval(root, storage, &mut ctx)
}

/// Extension trait giving every `Node` an `.execute(&storage)` method.
pub trait Executable {
    fn execute(&self, storage: &dyn Storage) -> Result<Value>;
    fn execute_with(&self, storage: &dyn Storage, opts: &ExecOptions) -> Result<Value>;
}

impl Executable for Node {
    fn execute(&self, storage: &dyn Storage) -> Result<Value> {
        execute_with(self, storage, &ExecOptions::default())
    }

    fn execute_with(&self, storage: &dyn Storage, opts: &ExecOptions) -> Result<Value> {
        execute_with(self, storage, opts)
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use rquery_ast::{stored_items, Error, LazySeq, Translator};

    #[derive(Debug)]
    struct VecStorage {
        items: Vec<Value>,
    }

    impl Storage for VecStorage {
        fn items(&self) -> LazySeq<'_> {
            Box::new(self.items.iter().cloned().map(Ok))
        }
    }

    #[derive(Debug)]
    struct AlwaysDeclines;

    impl Translator for AlwaysDeclines {
        fn execute(&self, _ast: &Node) -> Result<Value> {
            Err(Error::new(ErrorKind::UnsupportedByBackend))
        }
    }

    #[derive(Debug)]
    struct DeclinedStorage {
        items: Vec<Value>,
        translator: AlwaysDeclines,
    }

    impl Storage for DeclinedStorage {
        fn items(&self) -> LazySeq<'_> {
            Box::new(self.items.iter().cloned().map(Ok))
        }
        fn translator(&self) -> Option<&dyn Translator> {
            Some(&self.translator)
        }
    }

    #[test]
    fn chain_leaf_walks_through_unary_chain() {
        let handle: Rc<dyn Storage> = Rc::new(VecStorage {
            items: vec![Value::Int(1)],
        });
        let root = stored_items(handle);
        let chained = root.len().sum();
        assert!(Node::ptr_eq(chain_leaf(&chained), &root));
    }

    #[test]
    fn dispatch_falls_back_when_translator_declines() {
        let storage = DeclinedStorage {
            items: vec![Value::Int(1), Value::Int(2)],
            translator: AlwaysDeclines,
        };
        let handle: Rc<dyn Storage> = Rc::new(DeclinedStorage {
            items: vec![Value::Int(1), Value::Int(2)],
            translator: AlwaysDeclines,
        });
        let root = stored_items(handle);
        let result = root.sum().execute(&storage).unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn force_in_memory_skips_translator_entirely() {
        let storage = VecStorage {
            items: vec![Value::Int(5)],
        };
        let handle: Rc<dyn Storage> = Rc::new(VecStorage {
            items: vec![Value::Int(5)],
        });
        let root = stored_items(handle);
        let opts = ExecOptions {
            allow_backend_dispatch: false,
        };
        let result = root.sum().execute_with(&storage, &opts).unwrap();
        assert_eq!(result, Value::Int(5));
    }
}
