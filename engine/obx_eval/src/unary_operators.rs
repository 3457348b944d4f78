//! Unary operator and conversion implementations.
//!
//! Direct enum-based dispatch, like the binary operators. Conversions cover
//! the primitive kinds; conversion to a host type is a checked cast.

use obx_ir::UnaryOp;
use obx_value::{
    integer_overflow, invalid_conversion, invalid_unary_op_for, EvalResult, QualifiedName, Value,
};

use crate::operators::int_to_float;

/// Evaluate a built-in unary operation.
pub fn evaluate_unary(value: &Value, op: UnaryOp) -> EvalResult {
    match (value, op) {
        // Numeric negation
        (Value::Int(n), UnaryOp::Neg) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| integer_overflow("negation")),
        (Value::Float(f), UnaryOp::Neg) => Ok(Value::Float(-f)),

        // Logical not
        (Value::Bool(b), UnaryOp::Not) => Ok(Value::Bool(!b)),

        // Bitwise not
        (Value::Int(n), UnaryOp::BitNot) => Ok(Value::Int(!*n)),

        // Invalid combinations
        _ => Err(invalid_unary_op_for(&value.type_name(), op.as_symbol())),
    }
}

/// True if values can never be converted to `ty`.
///
/// Checked once when the node is built rather than on every evaluation.
pub fn is_unconvertible_target(ty: &QualifiedName) -> bool {
    !ty.is_generic() && matches!(ty.name(), "null" | "function")
}

/// Evaluate a built-in conversion.
///
/// `null` converts to every host type (a null reference) but to no
/// primitive kind.
pub fn evaluate_convert(value: &Value, ty: &QualifiedName) -> EvalResult {
    let target = if ty.is_generic() { "" } else { ty.name() };
    let fail = || invalid_conversion(&value.type_name(), &ty.to_string());
    match (value, target) {
        // Identity
        (Value::Int(_), "int")
        | (Value::Float(_), "float")
        | (Value::Bool(_), "bool")
        | (Value::Char(_), "char")
        | (Value::Str(_), "str")
        | (Value::List(_), "list")
        | (Value::Object(_), "object") => Ok(value.clone()),

        // Numeric
        (Value::Int(n), "float") => Ok(Value::Float(int_to_float(*n))),
        (Value::Float(f), "int") => float_to_int(*f).ok_or_else(fail),
        (Value::Char(c), "int") => Ok(Value::Int(i64::from(u32::from(*c)))),
        (Value::Int(n), "char") => u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .map(Value::Char)
            .ok_or_else(fail),

        // Text
        (Value::Int(_) | Value::Float(_) | Value::Bool(_), "str") => {
            Ok(Value::string(value.to_string()))
        }
        (Value::Char(c), "str") => Ok(Value::string(c.to_string())),
        (Value::Str(s), "int") => s.trim().parse::<i64>().map(Value::Int).map_err(|_| fail()),
        (Value::Str(s), "float") => s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail()),
        (Value::Str(s), "bool") => s.trim().parse::<bool>().map(Value::Bool).map_err(|_| fail()),

        // Host types: null, or a checked cast
        (Value::Null, _) if !is_primitive(target) => Ok(Value::Null),
        (Value::Object(_), _) if value.is_instance_of(ty, false) => Ok(value.clone()),

        _ => Err(fail()),
    }
}

fn is_primitive(name: &str) -> bool {
    matches!(
        name,
        "int" | "float" | "bool" | "char" | "str" | "list" | "null" | "function"
    )
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "range is checked before the cast"
)]
fn float_to_int(f: f64) -> Option<Value> {
    let (min, max) = (int_to_float(i64::MIN), int_to_float(i64::MAX));
    if f.is_finite() && f >= min && f < max {
        Some(Value::Int(f.trunc() as i64))
    } else {
        None
    }
}
