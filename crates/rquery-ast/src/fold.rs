//! Traversal & rewrite (§4.3), modeled on `prqlc`'s `RqFold`: a trait with
//! one overridable entry point per node, a default free-function
//! implementation that performs the actual pre-order recursion, and
//! `scope_depth` threaded generically so every caller gets the same
//! context-switching bookkeeping without repeating it.
//!
//! Which argument slots are context-switching is expressed here, in the
//! shape of `fold_node`'s recursion, rather than as a flag stored on
//! `NodeKind` (see the design note in SPEC_FULL.md §4.1).

use crate::node::{Node, NodeKind};

pub trait NodeFold {
    /// Called for every node, pre-order, with the scope depth in effect for
    /// *this* node (not any child). The default recurses into children,
    /// bumping the depth by one for context-switching slots, and rebuilds
    /// the node only if a child actually changed (`Rc::ptr_eq` check),
    /// preserving subtree sharing.
    fn fold_node(&mut self, node: &Node, depth: i64) -> Node {
        fold_node(self, node, depth)
    }
}

fn fold_child<F: NodeFold + ?Sized>(fold: &mut F, child: &Node, depth: i64) -> Node {
    fold.fold_node(child, depth)
}

fn rebuild1(orig: &Node, new_child: Node, mk: impl FnOnce(Node) -> NodeKind) -> Node {
    if Node::ptr_eq(&new_child, single_child(orig)) {
        orig.clone()
    } else {
        Node::new(mk(new_child))
    }
}

/// Only used by `rebuild1` to compare identity against the original child;
/// panics if `orig` isn't one of the single-child variants, which would be
/// a bug in this module, not in a caller.
fn single_child(orig: &Node) -> &Node {
    match orig.as_ref() {
        NodeKind::Not(s)
        | NodeKind::Neg(s)
        | NodeKind::Str(s)
        | NodeKind::Lower(s)
        | NodeKind::Upper(s)
        | NodeKind::Sum(s)
        | NodeKind::Min(s)
        | NodeKind::Max(s)
        | NodeKind::Len(s)
        | NodeKind::Distinct(s) => s,
        _ => unreachable!("rebuild1 called on a non-unary node"),
    }
}

pub fn fold_node<F: NodeFold + ?Sized>(fold: &mut F, node: &Node, depth: i64) -> Node {
    match node.as_ref() {
        NodeKind::Literal(_) | NodeKind::StoredItems(_) | NodeKind::CurrentContext(_) => {
            node.clone()
        }

        NodeKind::Collection(kind, children) => {
            let new_children: Vec<Node> =
                children.iter().map(|c| fold_child(fold, c, depth)).collect();
            if new_children
                .iter()
                .zip(children.iter())
                .all(|(a, b)| Node::ptr_eq(a, b))
            {
                node.clone()
            } else {
                Node::new(NodeKind::Collection(kind.clone(), new_children))
            }
        }

        NodeKind::Not(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Not)
        }
        NodeKind::Neg(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Neg)
        }
        NodeKind::Str(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Str)
        }
        NodeKind::Lower(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Lower)
        }
        NodeKind::Upper(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Upper)
        }
        NodeKind::Sum(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Sum)
        }
        NodeKind::Min(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Min)
        }
        NodeKind::Max(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Max)
        }
        NodeKind::Len(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Len)
        }
        NodeKind::Distinct(s) => {
            let s2 = fold_child(fold, s, depth);
            rebuild1(node, s2, NodeKind::Distinct)
        }

        NodeKind::Binary(op, lhs, rhs) => {
            let l2 = fold_child(fold, lhs, depth);
            let r2 = fold_child(fold, rhs, depth);
            if Node::ptr_eq(&l2, lhs) && Node::ptr_eq(&r2, rhs) {
                node.clone()
            } else {
                Node::new(NodeKind::Binary(*op, l2, r2))
            }
        }
        NodeKind::Compare(op, lhs, rhs) => {
            let l2 = fold_child(fold, lhs, depth);
            let r2 = fold_child(fold, rhs, depth);
            if Node::ptr_eq(&l2, lhs) && Node::ptr_eq(&r2, rhs) {
                node.clone()
            } else {
                Node::new(NodeKind::Compare(*op, l2, r2))
            }
        }
        NodeKind::Logic(op, lhs, rhs) => {
            let l2 = fold_child(fold, lhs, depth);
            let r2 = fold_child(fold, rhs, depth);
            if Node::ptr_eq(&l2, lhs) && Node::ptr_eq(&r2, rhs) {
                node.clone()
            } else {
                Node::new(NodeKind::Logic(*op, l2, r2))
            }
        }
        NodeKind::Regex(s, p) => {
            let s2 = fold_child(fold, s, depth);
            let p2 = fold_child(fold, p, depth);
            if Node::ptr_eq(&s2, s) && Node::ptr_eq(&p2, p) {
                node.clone()
            } else {
                Node::new(NodeKind::Regex(s2, p2))
            }
        }

        NodeKind::Attribute(s, name) => {
            let s2 = fold_child(fold, s, depth);
            if Node::ptr_eq(&s2, s) {
                node.clone()
            } else {
                Node::new(NodeKind::Attribute(s2, name.clone()))
            }
        }
        NodeKind::Index(s, i) => {
            let s2 = fold_child(fold, s, depth);
            if Node::ptr_eq(&s2, s) {
                node.clone()
            } else {
                Node::new(NodeKind::Index(s2, *i))
            }
        }
        NodeKind::Slice(s, start, stop, step) => {
            let s2 = fold_child(fold, s, depth);
            if Node::ptr_eq(&s2, s) {
                node.clone()
            } else {
                Node::new(NodeKind::Slice(s2, *start, *stop, *step))
            }
        }

        NodeKind::Filter(s, p) => {
            let s2 = fold_child(fold, s, depth);
            let p2 = fold_child(fold, p, depth + 1);
            if Node::ptr_eq(&s2, s) && Node::ptr_eq(&p2, p) {
                node.clone()
            } else {
                Node::new(NodeKind::Filter(s2, p2))
            }
        }
        NodeKind::Map(s, v) => {
            let s2 = fold_child(fold, s, depth);
            let v2 = fold_child(fold, v, depth + 1);
            if Node::ptr_eq(&s2, s) && Node::ptr_eq(&v2, v) {
                node.clone()
            } else {
                Node::new(NodeKind::Map(s2, v2))
            }
        }
        NodeKind::Sort(s, keys) => {
            let s2 = fold_child(fold, s, depth);
            let keys2: Vec<(Node, bool)> = keys
                .iter()
                .map(|(k, rev)| (fold_child(fold, k, depth + 1), *rev))
                .collect();
            let unchanged = Node::ptr_eq(&s2, s)
                && keys2.iter().zip(keys.iter()).all(|(a, b)| Node::ptr_eq(&a.0, &b.0));
            if unchanged {
                node.clone()
            } else {
                Node::new(NodeKind::Sort(s2, keys2))
            }
        }
        NodeKind::Groupby(s, k, aggs) => {
            let s2 = fold_child(fold, s, depth);
            let k2 = fold_child(fold, k, depth + 1);
            // Aggregates see the group sequence as their own innermost
            // context at evaluation time (§4.5), so they too are folded at
            // depth + 1, even though the key slot is the one formally
            // marked context-switching in the node taxonomy (§4.1).
            let aggs2: Vec<(String, Node)> = aggs
                .iter()
                .map(|(name, e)| (name.clone(), fold_child(fold, e, depth + 1)))
                .collect();
            let unchanged = Node::ptr_eq(&s2, s)
                && Node::ptr_eq(&k2, k)
                && aggs2.iter().zip(aggs.iter()).all(|(a, b)| Node::ptr_eq(&a.1, &b.1));
            if unchanged {
                node.clone()
            } else {
                Node::new(NodeKind::Groupby(s2, k2, aggs2))
            }
        }
        NodeKind::One(s, default) => {
            let s2 = fold_child(fold, s, depth);
            let d2 = default.as_ref().map(|d| fold_child(fold, d, depth));
            let unchanged = Node::ptr_eq(&s2, s)
                && match (&d2, default) {
                    (Some(a), Some(b)) => Node::ptr_eq(a, b),
                    (None, None) => true,
                    _ => false,
                };
            if unchanged {
                node.clone()
            } else {
                Node::new(NodeKind::One(s2, d2))
            }
        }
    }
}

/// The substitution primitive: every occurrence of an old node (compared
/// by identity) is replaced by its paired new node; untouched subtrees are
/// `Rc::clone`d, not rebuilt.
pub fn copy_replace(node: &Node, replacements: &[(Node, Node)]) -> Node {
    struct Replacer<'a> {
        replacements: &'a [(Node, Node)],
    }
    impl NodeFold for Replacer<'_> {
        fn fold_node(&mut self, node: &Node, depth: i64) -> Node {
            for (old, new) in self.replacements {
                if Node::ptr_eq(node, old) {
                    return new.clone();
                }
            }
            fold_node(self, node, depth)
        }
    }
    let mut replacer = Replacer { replacements };
    replacer.fold_node(node, 0)
}

/// Records the scope depth reported for every node visited, pre-order.
/// Used by property-based tests (§8 property 3); not part of the public API.
#[cfg(test)]
struct DepthRecorder {
    log: Vec<i64>,
}
#[cfg(test)]
impl NodeFold for DepthRecorder {
    fn fold_node(&mut self, node: &Node, depth: i64) -> Node {
        self.log.push(depth);
        fold_node(self, node, depth)
    }
}
