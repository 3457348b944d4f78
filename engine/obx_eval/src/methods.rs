//! Member, method, indexer and invocation dispatch.
//!
//! Host objects answer through the [`Object`](obx_value::Object) trait.
//! Strings, lists and functions have a small fixed set of built-in members
//! handled here with direct pattern matching.

use obx_value::{
    index_out_of_bounds, no_such_member, no_such_method, not_callable, not_indexable,
    null_reference, type_mismatch, wrong_arg_count, EvalError, EvalResult, QualifiedName, Value,
};

/// Name reported for null navigation through an indexer.
const INDEXER: &str = "[]";

// Argument helpers

#[inline]
fn require_args(method: &str, expected: usize, got: usize) -> Result<(), EvalError> {
    if expected == got {
        Ok(())
    } else {
        Err(wrong_arg_count(method, expected, got))
    }
}

fn require_str_arg<'a>(method: &str, args: &'a [Value], index: usize) -> Result<&'a str, EvalError> {
    let arg = args
        .get(index)
        .ok_or_else(|| wrong_arg_count(method, index + 1, args.len()))?;
    arg.as_str()
        .ok_or_else(|| type_mismatch("str", arg.kind_name()))
}

fn require_int_arg(method: &str, args: &[Value], index: usize) -> Result<i64, EvalError> {
    let arg = args
        .get(index)
        .ok_or_else(|| wrong_arg_count(method, index + 1, args.len()))?;
    arg.as_int()
        .ok_or_else(|| type_mismatch("int", arg.kind_name()))
}

fn len_to_value(len: usize) -> Value {
    Value::int(i64::try_from(len).unwrap_or(i64::MAX))
}

fn builtin_type(value: &Value) -> QualifiedName {
    QualifiedName::new(value.kind_name())
}

// Members

/// Read `member` from `target`.
pub fn read_member(target: &Value, member: &str) -> EvalResult {
    match target {
        Value::Null => Err(null_reference(member)),
        Value::Object(object) => object.get(member),
        Value::Str(s) => match member {
            "len" => Ok(len_to_value(s.chars().count())),
            "is_empty" => Ok(Value::Bool(s.is_empty())),
            _ => Err(no_such_member(member, &builtin_type(target))),
        },
        Value::List(items) => match member {
            "len" => Ok(len_to_value(items.len())),
            "is_empty" => Ok(Value::Bool(items.is_empty())),
            "first" => Ok(items.first().cloned().unwrap_or_default()),
            "last" => Ok(items.last().cloned().unwrap_or_default()),
            _ => Err(no_such_member(member, &builtin_type(target))),
        },
        Value::Function(function) => match member {
            "name" => Ok(Value::string(function.name().to_string())),
            _ => Err(no_such_member(member, &builtin_type(target))),
        },
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Char(_) => {
            Err(no_such_member(member, &builtin_type(target)))
        }
    }
}

// Methods

/// Call `method` on `receiver`.
pub fn call_method(receiver: &Value, method: &str, args: &[Value]) -> EvalResult {
    match receiver {
        Value::Null => Err(null_reference(method)),
        Value::Object(object) => object.call(method, args),
        Value::Str(s) => dispatch_str_method(s, method, args),
        Value::List(items) => dispatch_list_method(items, method, args),
        Value::Function(function) if method == "invoke" => function.invoke(args),
        _ => dispatch_common_method(receiver, method, args),
    }
}

fn dispatch_str_method(s: &str, method: &str, args: &[Value]) -> EvalResult {
    match method {
        "to_upper" => {
            require_args(method, 0, args.len())?;
            Ok(Value::string(s.to_uppercase()))
        }
        "to_lower" => {
            require_args(method, 0, args.len())?;
            Ok(Value::string(s.to_lowercase()))
        }
        "trim" => {
            require_args(method, 0, args.len())?;
            Ok(Value::string(s.trim()))
        }
        "contains" => {
            require_args(method, 1, args.len())?;
            Ok(Value::Bool(s.contains(require_str_arg(method, args, 0)?)))
        }
        "starts_with" => {
            require_args(method, 1, args.len())?;
            Ok(Value::Bool(s.starts_with(require_str_arg(method, args, 0)?)))
        }
        "ends_with" => {
            require_args(method, 1, args.len())?;
            Ok(Value::Bool(s.ends_with(require_str_arg(method, args, 0)?)))
        }
        "substring" => {
            require_args(method, 2, args.len())?;
            let start = require_int_arg(method, args, 0)?;
            let len = require_int_arg(method, args, 1)?;
            let (Ok(start), Ok(len)) = (usize::try_from(start), usize::try_from(len)) else {
                return Err(index_out_of_bounds(start.min(len)));
            };
            let count = s.chars().count();
            if start.saturating_add(len) > count {
                return Err(index_out_of_bounds(i64::try_from(start).unwrap_or(i64::MAX)));
            }
            Ok(Value::string(s.chars().skip(start).take(len).collect::<String>()))
        }
        _ => dispatch_common_method(&Value::string(s), method, args),
    }
}

fn dispatch_list_method(items: &[Value], method: &str, args: &[Value]) -> EvalResult {
    match method {
        "contains" => {
            require_args(method, 1, args.len())?;
            Ok(Value::Bool(items.iter().any(|item| item.equals(&args[0]))))
        }
        "index_of" => {
            require_args(method, 1, args.len())?;
            let found = items.iter().position(|item| item.equals(&args[0]));
            Ok(found.map_or(Value::int(-1), len_to_value))
        }
        _ => Err(no_such_method(method, "list")),
    }
}

/// Methods every built-in value answers.
fn dispatch_common_method(receiver: &Value, method: &str, args: &[Value]) -> EvalResult {
    match method {
        "to_str" => {
            require_args(method, 0, args.len())?;
            Ok(match receiver {
                Value::Str(_) => receiver.clone(),
                Value::Char(c) => Value::string(c.to_string()),
                _ => Value::string(receiver.to_string()),
            })
        }
        "equals" => {
            require_args(method, 1, args.len())?;
            Ok(Value::Bool(receiver.equals(&args[0])))
        }
        _ => Err(no_such_method(method, receiver.kind_name())),
    }
}

// Indexers

/// Apply the indexer of `target`.
pub fn index_value(target: &Value, args: &[Value]) -> EvalResult {
    match target {
        Value::Null => Err(null_reference(INDEXER)),
        Value::Object(object) => object.index(args),
        Value::List(items) => {
            require_args(INDEXER, 1, args.len())?;
            let i = require_int_arg(INDEXER, args, 0)?;
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| index_out_of_bounds(i))
        }
        Value::Str(s) => {
            require_args(INDEXER, 1, args.len())?;
            let i = require_int_arg(INDEXER, args, 0)?;
            usize::try_from(i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char)
                .ok_or_else(|| index_out_of_bounds(i))
        }
        _ => Err(not_indexable(&target.type_name())),
    }
}

// Invocation

/// Invoke a function value.
pub fn invoke_value(callee: &Value, args: &[Value]) -> EvalResult {
    match callee {
        Value::Function(function) => function.invoke(args),
        Value::Null => Err(null_reference("invoke")),
        _ => Err(not_callable(&callee.type_name())),
    }
}
