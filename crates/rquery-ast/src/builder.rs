//! The user-facing builder surface (§4.2): the `Context` handle, the `lift`
//! entry point, and the full set of operator/method combinators on `Node`.
//!
//! Operator overloading is used where `std::ops` naturally returns a `Node`
//! (arithmetic, bitwise-as-logical, unary); everywhere else (comparisons,
//! attribute access, the sequence operators) this crate uses ordinary named
//! methods instead of trying to reproduce the source's attribute-lookup
//! hook, which Rust has no equivalent for.

use std::ops::{Add, BitAnd, BitOr, Deref, Div, Mul, Neg, Not, Sub};

use crate::error::Result;
use crate::node::{self, CollectionKind, Node, NodeKind};
use crate::ops::{ArithOp, CmpOp};
use crate::value::Value;

/// Wraps a `CurrentContext` node so user code can write `Context::new()` /
/// `Context::at(depth)` instead of the lower-level `node::current_context`.
/// Derefs to `Node`, so every inherent method on `Node` (`.attr()`,
/// `.filter()`, the comparison methods, …) is directly callable on a
/// `Context` without an explicit conversion.
#[derive(Debug, Clone)]
pub struct Context(Node);

impl Context {
    /// The innermost enclosing scope (depth 0).
    pub fn new() -> Context {
        Context(node::current_context(0).expect("depth 0 is always a valid scope depth"))
    }

    /// An outer enclosing scope. `depth` must be non-positive.
    pub fn at(depth: i64) -> Result<Context> {
        Ok(Context(node::current_context(depth)?))
    }

    /// Composes `depth` relative to `self`'s own depth, mirroring the
    /// source's `ContextRequest.__call__`, which returns
    /// `ContextRequest(self.scope_depth + more_depth)` -- not an absolute
    /// depth from 0.
    pub fn call(&self, depth: i64) -> Result<Context> {
        let NodeKind::CurrentContext(current) = self.0.as_ref() else {
            unreachable!("Context always wraps a CurrentContext node");
        };
        Context::at(current + depth)
    }

    pub fn node(&self) -> Node {
        self.0.clone()
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

impl Deref for Context {
    type Target = Node;
    fn deref(&self) -> &Node {
        &self.0
    }
}

impl From<Context> for Node {
    fn from(c: Context) -> Node {
        c.0
    }
}

/// Wraps an arbitrary host value in a `Literal` node. Every user-supplied
/// constant reaches the AST through here (or through the `From` impl below,
/// which delegates to it).
pub fn lift<T: Into<Value>>(v: T) -> Node {
    node::literal(v)
}

impl<T: Into<Value>> From<T> for Node {
    fn from(v: T) -> Node {
        lift(v)
    }
}

/// A list literal: each element is lifted independently.
pub fn list(items: Vec<Node>) -> Node {
    node::collection(CollectionKind::List, items)
}

/// A tuple literal.
pub fn tuple(items: Vec<Node>) -> Node {
    node::collection(CollectionKind::Tuple, items)
}

/// A mapping literal; `fields` gives each child its key, in declaration order.
pub fn mapping(fields: Vec<(String, Node)>) -> Node {
    let (keys, values) = fields.into_iter().unzip();
    node::collection(CollectionKind::Mapping(keys), values)
}

impl Node {
    // --- projection/selection ---

    pub fn attr(&self, name: impl Into<String>) -> Node {
        node::attribute(self.clone(), name.into())
    }

    pub fn index(&self, i: i64) -> Node {
        node::index(self.clone(), i)
    }

    pub fn slice(&self, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Node {
        node::slice(self.clone(), start, stop, step)
    }

    // --- sequence operators ---

    pub fn filter(&self, predicate: impl Into<Node>) -> Node {
        node::filter(self.clone(), predicate.into())
    }

    /// `predicate = true` conjoined with `attr(name).eq(value)` for each
    /// pair, under the innermost context -- the Rust rendering of the
    /// source's `filter(**kwargs)`.
    pub fn filter_eq(&self, pairs: &[(&str, Node)]) -> Node {
        let ctx = Context::new();
        let mut predicate = lift(true);
        for (name, value) in pairs {
            predicate = predicate.and(ctx.attr(*name).eq(value.clone()));
        }
        self.filter(predicate)
    }

    pub fn map(&self, new_value: impl Into<Node>) -> Node {
        node::map(self.clone(), new_value.into())
    }

    /// Sorts by each key in turn; a key that is `Neg(inner)` is unwrapped
    /// into `(inner, reverse = true)` so non-numeric keys can still be
    /// reverse-sorted. An empty slice sorts by element identity.
    pub fn sort(&self, keys: &[Node]) -> Node {
        if keys.is_empty() {
            return node::sort(self.clone(), vec![(Context::new().node(), false)]);
        }
        let pairs = keys
            .iter()
            .map(|k| match k.as_ref() {
                NodeKind::Neg(inner) => (inner.clone(), true),
                _ => (k.clone(), false),
            })
            .collect();
        node::sort(self.clone(), pairs)
    }

    /// Partitions by `key`; `aggregates` is evaluated per group with the
    /// group sequence bound as context. An empty `aggregates` defaults to a
    /// single `"elements"` aggregate holding the group sequence itself,
    /// mirroring the source's default.
    pub fn groupby(&self, key: impl Into<Node>, aggregates: &[(&str, Node)]) -> Result<Node> {
        let aggs: Vec<(String, Node)> = if aggregates.is_empty() {
            vec![("elements".to_string(), Context::new().node())]
        } else {
            aggregates
                .iter()
                .map(|(name, expr)| (name.to_string(), expr.clone()))
                .collect()
        };
        node::groupby(self.clone(), key.into(), aggs)
    }

    pub fn one(&self) -> Node {
        node::one(self.clone(), None)
    }

    pub fn one_or(&self, default: impl Into<Node>) -> Node {
        node::one(self.clone(), Some(default.into()))
    }

    // --- aggregates ---

    pub fn sum(&self) -> Node {
        node::sum(self.clone())
    }
    pub fn min(&self) -> Node {
        node::min(self.clone())
    }
    pub fn max(&self) -> Node {
        node::max(self.clone())
    }
    pub fn len(&self) -> Node {
        node::len(self.clone())
    }
    pub fn distinct(&self) -> Node {
        node::distinct(self.clone())
    }

    // --- string/cast ---

    pub fn str(&self) -> Node {
        node::str_cast(self.clone())
    }
    pub fn lower(&self) -> Node {
        node::lower(self.clone())
    }
    pub fn upper(&self) -> Node {
        node::upper(self.clone())
    }
    pub fn matches(&self, pattern: impl Into<Node>) -> Node {
        node::regex(self.clone(), pattern.into())
    }

    // --- comparisons (named: PartialEq/PartialOrd must return bool) ---

    pub fn eq(&self, rhs: impl Into<Node>) -> Node {
        node::compare(CmpOp::Eq, self.clone(), rhs.into())
    }
    pub fn ne(&self, rhs: impl Into<Node>) -> Node {
        node::compare(CmpOp::Ne, self.clone(), rhs.into())
    }
    pub fn lt(&self, rhs: impl Into<Node>) -> Node {
        node::compare(CmpOp::Lt, self.clone(), rhs.into())
    }
    pub fn le(&self, rhs: impl Into<Node>) -> Node {
        node::compare(CmpOp::Le, self.clone(), rhs.into())
    }
    pub fn gt(&self, rhs: impl Into<Node>) -> Node {
        node::compare(CmpOp::Gt, self.clone(), rhs.into())
    }
    pub fn ge(&self, rhs: impl Into<Node>) -> Node {
        node::compare(CmpOp::Ge, self.clone(), rhs.into())
    }

    /// Rust has no `**` operator.
    pub fn pow(&self, exponent: impl Into<Node>) -> Node {
        node::binary(ArithOp::Pow, self.clone(), exponent.into())
    }

    /// `&&`/`||` can't be overloaded (they don't take arbitrary operand
    /// types in Rust), so conjunction/disjunction are also reachable by
    /// name, matching `&`/`|` below.
    pub fn and(&self, rhs: impl Into<Node>) -> Node {
        node::and(self.clone(), rhs.into())
    }
    pub fn or(&self, rhs: impl Into<Node>) -> Node {
        node::or(self.clone(), rhs.into())
    }
}

impl<T: Into<Node>> Add<T> for Node {
    type Output = Node;
    fn add(self, rhs: T) -> Node {
        node::binary(ArithOp::Add, self, rhs.into())
    }
}
impl<T: Into<Node>> Sub<T> for Node {
    type Output = Node;
    fn sub(self, rhs: T) -> Node {
        node::binary(ArithOp::Sub, self, rhs.into())
    }
}
impl<T: Into<Node>> Mul<T> for Node {
    type Output = Node;
    fn mul(self, rhs: T) -> Node {
        node::binary(ArithOp::Mul, self, rhs.into())
    }
}
impl<T: Into<Node>> Div<T> for Node {
    type Output = Node;
    fn div(self, rhs: T) -> Node {
        node::binary(ArithOp::Div, self, rhs.into())
    }
}

impl<T: Into<Node>> BitAnd<T> for Node {
    type Output = Node;
    fn bitand(self, rhs: T) -> Node {
        node::and(self, rhs.into())
    }
}
impl<T: Into<Node>> BitOr<T> for Node {
    type Output = Node;
    fn bitor(self, rhs: T) -> Node {
        node::or(self, rhs.into())
    }
}

impl Not for Node {
    type Output = Node;
    fn not(self) -> Node {
        node::not(self)
    }
}
impl Neg for Node {
    type Output = Node;
    fn neg(self) -> Node {
        node::neg(self)
    }
}
