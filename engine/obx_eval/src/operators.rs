//! Binary operator implementations.
//!
//! Provides direct enum-based dispatch for built-in binary operations. The
//! type set is fixed, so pattern matching is preferred over trait objects.
//! User-defined operators never reach this module: a binary node with an
//! operator function calls that function instead.
//!
//! The short-circuit operators (`&&`, `||`, `??`) are evaluated by their own
//! node kinds and are rejected here.

use std::cmp::Ordering;

use obx_ir::BinaryOp;
use obx_value::{
    binary_type_mismatch, division_by_zero, integer_overflow, invalid_binary_op_for,
    modulo_by_zero, EvalError, EvalResult, Heap, Value,
};

// Helper functions for repetitive checked arithmetic patterns

/// Checked arithmetic operation with overflow handling.
#[inline]
fn checked_arith(result: Option<i64>, op_name: &'static str) -> EvalResult {
    result.map(Value::Int).ok_or_else(|| integer_overflow(op_name))
}

/// Checked division or remainder with zero guard.
#[inline]
fn checked_div<F>(divisor: i64, op: F, zero: fn() -> EvalError, op_name: &'static str) -> EvalResult
where
    F: FnOnce() -> Option<i64>,
{
    if divisor == 0 {
        Err(zero())
    } else {
        op().map(Value::Int).ok_or_else(|| integer_overflow(op_name))
    }
}

#[inline]
fn ordering_result(ord: Option<Ordering>, op: BinaryOp) -> Option<bool> {
    let ord = ord?;
    match op {
        BinaryOp::Eq => Some(ord == Ordering::Equal),
        BinaryOp::NotEq => Some(ord != Ordering::Equal),
        BinaryOp::Lt => Some(ord == Ordering::Less),
        BinaryOp::LtEq => Some(ord != Ordering::Greater),
        BinaryOp::Gt => Some(ord == Ordering::Greater),
        BinaryOp::GtEq => Some(ord != Ordering::Less),
        _ => None,
    }
}

/// Mixed int/float arithmetic promotes to float.
#[expect(
    clippy::cast_precision_loss,
    reason = "promotion to float is lossy by definition"
)]
#[inline]
pub(crate) fn int_to_float(n: i64) -> f64 {
    n as f64
}

const fn is_comparison(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
    )
}

// Direct Dispatch Function

/// Evaluate a built-in binary operation.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    if op.is_short_circuit() {
        return Err(invalid_binary_op_for("eager evaluation", op.as_symbol()));
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_int_binary(*a, *b, op),
        (Value::Float(a), Value::Float(b)) => eval_float_binary(*a, *b, op),
        (Value::Int(a), Value::Float(b)) => eval_float_binary(int_to_float(*a), *b, op),
        (Value::Float(a), Value::Int(b)) => eval_float_binary(*a, int_to_float(*b), op),
        (Value::Bool(a), Value::Bool(b)) => eval_bool_binary(*a, *b, op),
        (Value::Str(a), Value::Str(b)) => eval_string_binary(a, b, op),
        (Value::Char(a), Value::Char(b)) => eval_char_binary(*a, *b, op),
        (Value::List(a), Value::List(b)) => eval_list_binary(a, b, op),
        // Equality is defined between any two values once null or a
        // reference type is involved.
        (Value::Null | Value::Object(_) | Value::Function(_), _)
        | (_, Value::Null | Value::Object(_) | Value::Function(_)) => {
            eval_reference_binary(left, right, op)
        }
        _ => Err(binary_type_mismatch(&left.type_name(), &right.type_name())),
    }
}

// Type-Specific Evaluation Functions

/// Binary operations on integers.
fn eval_int_binary(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => checked_arith(a.checked_add(b), "addition"),
        BinaryOp::Sub => checked_arith(a.checked_sub(b), "subtraction"),
        BinaryOp::Mul => checked_arith(a.checked_mul(b), "multiplication"),
        BinaryOp::Div => checked_div(b, || a.checked_div(b), division_by_zero, "division"),
        BinaryOp::Mod => checked_div(b, || a.checked_rem(b), modulo_by_zero, "remainder"),
        BinaryOp::BitAnd => Ok(Value::Int(a & b)),
        BinaryOp::BitOr => Ok(Value::Int(a | b)),
        BinaryOp::BitXor => Ok(Value::Int(a ^ b)),
        BinaryOp::Shl | BinaryOp::Shr => {
            let shift = u32::try_from(b)
                .ok()
                .filter(|s| *s < 64)
                .ok_or_else(|| EvalError::new(format!("shift amount {b} out of range (0-63)")))?;
            Ok(Value::Int(if op == BinaryOp::Shl {
                a << shift
            } else {
                a >> shift
            }))
        }
        _ => ordering_result(Some(a.cmp(&b)), op)
            .map(Value::Bool)
            .ok_or_else(|| invalid_binary_op_for("integers", op.as_symbol())),
    }
}

/// Binary operations on floats.
///
/// Comparisons use `partial_cmp` for IEEE 754 semantics (NaN is unordered,
/// `-0.0 == 0.0`).
fn eval_float_binary(a: f64, b: f64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::Mod => Ok(Value::Float(a % b)),
        BinaryOp::NotEq => Ok(Value::Bool(a.partial_cmp(&b) != Some(Ordering::Equal))),
        _ if is_comparison(op) => Ok(Value::Bool(
            ordering_result(a.partial_cmp(&b), op).unwrap_or(false),
        )),
        _ => Err(invalid_binary_op_for("floats", op.as_symbol())),
    }
}

/// Binary operations on booleans. `&` and `|` are the non-short-circuit
/// logical operators.
fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        BinaryOp::BitAnd => Ok(Value::Bool(a & b)),
        BinaryOp::BitOr => Ok(Value::Bool(a | b)),
        BinaryOp::BitXor => Ok(Value::Bool(a ^ b)),
        _ => Err(invalid_binary_op_for("booleans", op.as_symbol())),
    }
}

/// Binary operations on strings.
fn eval_string_binary(a: &str, b: &str, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::string(format!("{a}{b}"))),
        // Lexicographic comparison
        _ => ordering_result(Some(a.cmp(b)), op)
            .map(Value::Bool)
            .ok_or_else(|| invalid_binary_op_for("strings", op.as_symbol())),
    }
}

/// Binary operations on characters.
fn eval_char_binary(a: char, b: char, op: BinaryOp) -> EvalResult {
    ordering_result(Some(a.cmp(&b)), op)
        .map(Value::Bool)
        .ok_or_else(|| invalid_binary_op_for("char", op.as_symbol()))
}

/// Binary operations on lists.
fn eval_list_binary(a: &Heap<Vec<Value>>, b: &Heap<Vec<Value>>, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => {
            let mut result = (**a).clone();
            result.extend_from_slice(b);
            Ok(Value::list(result))
        }
        BinaryOp::Eq => Ok(Value::Bool(**a == **b)),
        BinaryOp::NotEq => Ok(Value::Bool(**a != **b)),
        _ => Err(invalid_binary_op_for("lists", op.as_symbol())),
    }
}

/// Equality involving null, objects or functions.
fn eval_reference_binary(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left.equals(right))),
        BinaryOp::NotEq => Ok(Value::Bool(!left.equals(right))),
        _ => Err(binary_type_mismatch(&left.type_name(), &right.type_name())),
    }
}
