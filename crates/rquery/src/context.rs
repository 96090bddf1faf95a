//! The runtime half of context binding (§4.4): a stack of bound values,
//! grown on entry to a context-switching child and shrunk on exit. Index 0
//! (the most recently pushed) is the innermost scope; `get` resolves a
//! non-positive `NodeKind::CurrentContext` depth against it.

use rquery_ast::{Error, Result, Value};

#[derive(Debug, Default)]
pub struct ContextStack {
    bound: Vec<Value>,
}

impl ContextStack {
    pub fn new() -> ContextStack {
        ContextStack { bound: Vec::new() }
    }

    pub fn push(&mut self, value: Value) {
        log::trace!("context push at depth {}", self.bound.len());
        self.bound.push(value);
    }

    pub fn pop(&mut self) {
        self.bound.pop();
        log::trace!("context pop, {} scope(s) remain", self.bound.len());
    }

    /// `depth` is non-positive; `0` is the innermost (most recently pushed)
    /// scope, `-1` the next-outer, and so on.
    pub fn get(&self, depth: i64) -> Result<&Value> {
        let offset = (-depth) as usize;
        if offset >= self.bound.len() {
            return Err(Error::unbound_context(depth));
        }
        Ok(&self.bound[self.bound.len() - 1 - offset])
    }
}

/// Pushes `value` for the duration of `f`, guaranteeing the pop happens
/// even if `f` returns an error partway through evaluating a subtree.
pub fn with_pushed<T>(
    stack: &mut ContextStack,
    value: Value,
    f: impl FnOnce(&mut ContextStack) -> Result<T>,
) -> Result<T> {
    stack.push(value);
    let result = f(stack);
    stack.pop();
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_resolves_relative_to_most_recent_push() {
        let mut stack = ContextStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        assert_eq!(stack.get(0).unwrap(), &Value::Int(2));
        assert_eq!(stack.get(-1).unwrap(), &Value::Int(1));
        assert!(stack.get(-2).is_err());
    }

    #[test]
    fn with_pushed_pops_even_on_error() {
        let mut stack = ContextStack::new();
        let result: Result<()> = with_pushed(&mut stack, Value::Int(1), |_| {
            Err(Error::unbound_context(0))
        });
        assert!(result.is_err());
        assert!(stack.get(0).is_err());
    }
}
