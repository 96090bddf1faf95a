//! The in-memory executor (§4.5): evaluates an AST against a `ContextStack`,
//! producing a concrete `Value`. One pure recursive function, `eval`, maps
//! every `NodeKind` variant to a computation over already-evaluated operands
//! and, for the sequence operators, over a stream of per-element bindings.

use indexmap::IndexMap;
use itertools::Itertools;
use rquery_ast::{ArithOp, CmpOp, CollectionKind, Error, ErrorKind, LogicOp, Node, NodeKind, Result, Value};

use crate::context::{with_pushed, ContextStack};
use crate::storage::Storage;

pub fn eval(node: &Node, storage: &dyn Storage, ctx: &mut ContextStack) -> Result<Value> {
    match node.as_ref() {
        NodeKind::Literal(v) => Ok(v.clone()),

        NodeKind::StoredItems(_) => {
            let items: Result<Vec<Value>> = storage.items().collect();
            Ok(Value::Seq(items?))
        }

        NodeKind::CurrentContext(depth) => ctx.get(*depth).cloned(),

        NodeKind::Collection(kind, children) => {
            let values: Result<Vec<Value>> =
                children.iter().map(|c| eval(c, storage, ctx)).collect();
            let values = values?;
            Ok(match kind {
                CollectionKind::List => Value::Seq(values),
                CollectionKind::Tuple => Value::Tuple(values),
                CollectionKind::Mapping(keys) => {
                    let mut map = IndexMap::with_capacity(values.len());
                    for (k, v) in keys.iter().zip(values) {
                        map.insert(k.clone(), v);
                    }
                    Value::Map(map)
                }
            })
        }

        NodeKind::Not(s) => Ok(Value::Bool(!eval(s, storage, ctx)?.truthy())),
        NodeKind::Neg(s) => numeric_neg(eval(s, storage, ctx)?),

        NodeKind::Str(s) => Ok(Value::Str(eval(s, storage, ctx)?.to_string())),
        NodeKind::Lower(s) => string_map(eval(s, storage, ctx)?, str::to_lowercase),
        NodeKind::Upper(s) => string_map(eval(s, storage, ctx)?, str::to_uppercase),

        NodeKind::Sum(s) => aggregate_numeric(&eval(s, storage, ctx)?, "sum", |acc, x| acc + x),
        NodeKind::Min(s) => aggregate_numeric(&eval(s, storage, ctx)?, "min", f64::min),
        NodeKind::Max(s) => aggregate_numeric(&eval(s, storage, ctx)?, "max", f64::max),
        NodeKind::Len(s) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("len() requires a sequence"))?;
            Ok(Value::Int(items.len() as i64))
        }
        NodeKind::Distinct(s) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("distinct() requires a sequence"))?;
            Ok(Value::Seq(items.iter().unique().cloned().collect()))
        }

        NodeKind::Binary(op, lhs, rhs) => {
            eval_binary(*op, eval(lhs, storage, ctx)?, eval(rhs, storage, ctx)?)
        }
        NodeKind::Compare(op, lhs, rhs) => {
            eval_compare(*op, &eval(lhs, storage, ctx)?, &eval(rhs, storage, ctx)?)
        }
        NodeKind::Logic(op, lhs, rhs) => eval_logic(*op, lhs, rhs, storage, ctx),
        NodeKind::Regex(s, p) => {
            let subject = eval(s, storage, ctx)?;
            let pattern = eval(p, storage, ctx)?;
            let (subject, pattern) = (
                subject
                    .as_str()
                    .ok_or_else(|| Error::type_mismatch("matches() subject must be a string"))?,
                pattern
                    .as_str()
                    .ok_or_else(|| Error::type_mismatch("matches() pattern must be a string"))?,
            );
            let re = regex::Regex::new(pattern)
                .map_err(|e| Error::type_mismatch(format!("invalid regex: {e}")))?;
            Ok(Value::Bool(re.is_match(subject)))
        }

        NodeKind::Attribute(s, name) => {
            let v = eval(s, storage, ctx)?;
            let map = v
                .as_map()
                .ok_or_else(|| Error::type_mismatch(format!("no attribute \"{name}\" on a non-map value")))?;
            Ok(map.get(name).cloned().unwrap_or(Value::Null))
        }
        NodeKind::Index(s, i) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("index() requires a sequence"))?;
            let idx = resolve_index(*i, items.len())
                .ok_or_else(|| Error::type_mismatch(format!("index {i} out of range")))?;
            Ok(items[idx].clone())
        }
        NodeKind::Slice(s, start, stop, step) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("slice() requires a sequence"))?;
            Ok(Value::Seq(eval_slice(items, *start, *stop, *step)))
        }

        NodeKind::Filter(s, predicate) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("filter() requires a sequence"))?;
            log::trace!("filter over {} element(s)", items.len());
            let mut kept = Vec::new();
            for item in items {
                let truthy = with_pushed(ctx, item.clone(), |ctx| {
                    Ok(eval(predicate, storage, ctx)?.truthy())
                })?;
                if truthy {
                    kept.push(item.clone());
                }
            }
            Ok(Value::Seq(kept))
        }
        NodeKind::Map(s, new_value) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("map() requires a sequence"))?;
            log::trace!("map over {} element(s)", items.len());
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                let value =
                    with_pushed(ctx, item.clone(), |ctx| eval(new_value, storage, ctx))?;
                mapped.push(value);
            }
            Ok(Value::Seq(mapped))
        }
        NodeKind::Sort(s, keys) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("sort() requires a sequence"))?;
            log::trace!("sort over {} element(s), {} key(s)", items.len(), keys.len());
            let mut keyed: Vec<(Vec<Value>, Value)> = Vec::with_capacity(items.len());
            for item in items {
                let item_keys = with_pushed(ctx, item.clone(), |ctx| {
                    keys.iter()
                        .map(|(expr, _)| eval(expr, storage, ctx))
                        .collect::<Result<Vec<_>>>()
                })?;
                keyed.push((item_keys, item.clone()));
            }
            let reverses: Vec<bool> = keys.iter().map(|(_, rev)| *rev).collect();
            keyed.sort_by(|a, b| compare_key_vectors(&a.0, &b.0, &reverses));
            Ok(Value::Seq(keyed.into_iter().map(|(_, v)| v).collect()))
        }
        NodeKind::Groupby(s, key, aggs) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("groupby() requires a sequence"))?;
            let mut groups: IndexMap<Value, Vec<Value>> = IndexMap::new();
            for item in items {
                let k = with_pushed(ctx, item.clone(), |ctx| eval(key, storage, ctx))?;
                groups.entry(k).or_default().push(item.clone());
            }
            log::trace!("groupby produced {} partition(s)", groups.len());
            let mut rows = Vec::with_capacity(groups.len());
            for (k, group) in groups {
                let group_seq = Value::Seq(group);
                let mut row = IndexMap::with_capacity(aggs.len() + 1);
                row.insert("key".to_string(), k);
                with_pushed(ctx, group_seq, |ctx| {
                    for (name, expr) in aggs {
                        let value = eval(expr, storage, ctx)?;
                        row.insert(name.clone(), value);
                    }
                    Ok(())
                })?;
                rows.push(Value::Map(row));
            }
            Ok(Value::Seq(rows))
        }
        NodeKind::One(s, default) => {
            let v = eval(s, storage, ctx)?;
            let items = v
                .as_seq()
                .ok_or_else(|| Error::type_mismatch("one() requires a sequence"))?;
            match items.len() {
                0 => match default {
                    Some(d) => eval(d, storage, ctx),
                    None => Ok(Value::Null),
                },
                1 => Ok(items[0].clone()),
                _ => Err(Error::new(ErrorKind::MultipleResults)),
            }
        }
    }
}

fn numeric_neg(v: Value) -> Result<Value> {
    match v {
        Value::Int(i) => Ok(Value::Int(-i)),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(Error::type_mismatch(format!(
            "cannot negate a {}",
            other.display_kind()
        ))),
    }
}

fn string_map(v: Value, f: impl Fn(&str) -> String) -> Result<Value> {
    match v.as_str() {
        Some(s) => Ok(Value::Str(f(s))),
        None => Err(Error::type_mismatch(format!(
            "expected a string, got a {}",
            v.display_kind()
        ))),
    }
}

/// `Sum`/`Min`/`Max` all fail on an empty sequence (§4.5); the accumulator
/// seeds from the first element rather than a combinator-specific identity,
/// which is correct for all three and sidesteps `Min`/`Max` ever folding in
/// a spurious zero.
fn aggregate_numeric(v: &Value, name: &str, combine: impl Fn(f64, f64) -> f64) -> Result<Value> {
    let items = v
        .as_seq()
        .ok_or_else(|| Error::type_mismatch(format!("{name}() requires a sequence")))?;
    if items.is_empty() {
        return Err(Error::new(ErrorKind::EmptyAggregate));
    }
    let mut all_int = true;
    let mut acc = None;
    for item in items {
        let x = item
            .as_f64()
            .ok_or_else(|| Error::type_mismatch(format!("{name}() requires numeric elements")))?;
        if !matches!(item, Value::Int(_)) {
            all_int = false;
        }
        acc = Some(match acc {
            Some(prev) => combine(prev, x),
            None => x,
        });
    }
    let acc = acc.expect("non-empty sequence checked above");
    if all_int && acc.fract() == 0.0 {
        Ok(Value::Int(acc as i64))
    } else {
        Ok(Value::Float(acc))
    }
}

fn eval_binary(op: ArithOp, lhs: Value, rhs: Value) -> Result<Value> {
    let (a, b) = (
        lhs.as_f64()
            .ok_or_else(|| Error::type_mismatch("arithmetic operand must be numeric"))?,
        rhs.as_f64()
            .ok_or_else(|| Error::type_mismatch("arithmetic operand must be numeric"))?,
    );
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Pow => a.powf(b),
    };
    if matches!(lhs, Value::Int(_)) && matches!(rhs, Value::Int(_)) && result.fract() == 0.0 {
        Ok(Value::Int(result as i64))
    } else {
        Ok(Value::Float(result))
    }
}

fn eval_compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    let ordering = lhs.partial_cmp(rhs);
    let result = match op {
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
        CmpOp::Lt => ordering == Some(std::cmp::Ordering::Less),
        CmpOp::Le => matches!(
            ordering,
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        ),
        CmpOp::Gt => ordering == Some(std::cmp::Ordering::Greater),
        CmpOp::Ge => matches!(
            ordering,
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        ),
    };
    Ok(Value::Bool(result))
}

fn eval_logic(
    op: LogicOp,
    lhs: &Node,
    rhs: &Node,
    storage: &dyn Storage,
    ctx: &mut ContextStack,
) -> Result<Value> {
    let left = eval(lhs, storage, ctx)?.truthy();
    let decided = match op {
        LogicOp::And => !left,
        LogicOp::Or => left,
    };
    if decided {
        return Ok(Value::Bool(left));
    }
    Ok(Value::Bool(eval(rhs, storage, ctx)?.truthy()))
}

fn resolve_index(i: i64, len: usize) -> Option<usize> {
    let idx = if i < 0 { i + len as i64 } else { i };
    if idx < 0 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}

fn eval_slice(
    items: &[Value],
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Vec<Value> {
    let len = items.len() as i64;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Vec::new();
    }
    let (default_start, default_stop) = if step > 0 { (0, len) } else { (len - 1, -1) };
    let clamp = |v: i64| -> i64 {
        let v = if v < 0 { v + len } else { v };
        v.clamp(if step > 0 { 0 } else { -1 }, len)
    };
    let mut i = start.map(clamp).unwrap_or(default_start);
    let stop = stop.map(clamp).unwrap_or(default_stop);
    let mut out = Vec::new();
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        if i >= 0 && (i as usize) < items.len() {
            out.push(items[i as usize].clone());
        }
        i += step;
    }
    out
}

fn compare_key_vectors(a: &[Value], b: &[Value], reverses: &[bool]) -> std::cmp::Ordering {
    for ((x, y), reverse) in a.iter().zip(b.iter()).zip(reverses.iter()) {
        let ord = x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal);
        let ord = if *reverse { ord.reverse() } else { ord };
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}
